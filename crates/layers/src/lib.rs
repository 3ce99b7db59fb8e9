pub mod highlight;
pub mod symbology;

pub use highlight::*;
pub use symbology::*;
