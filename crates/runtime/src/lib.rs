pub mod debounce;
pub mod generation;

pub use debounce::*;
pub use generation::*;
