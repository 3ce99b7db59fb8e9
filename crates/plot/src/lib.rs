pub mod format;
pub mod join;
pub mod picking;
pub mod scale;
pub mod selection;
pub mod surface;
pub mod visibility;

pub use format::format_value;
pub use join::{PairedPoint, join};
pub use picking::*;
pub use scale::*;
pub use selection::*;
pub use surface::*;
pub use visibility::*;
