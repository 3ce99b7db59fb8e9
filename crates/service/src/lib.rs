pub mod map_service;
pub mod memory;
pub mod protocol;

pub use map_service::*;
pub use memory::{InMemoryMapService, ServiceCall};
pub use protocol::*;
