pub mod config;
pub mod fixture;
pub mod legend;
pub mod session;
pub mod tracker;

pub use config::{ConfigError, ExplorerConfig};
pub use fixture::{Fixture, FixtureError};
pub use legend::{LegendEntry, legend_entries};
pub use session::{Explorer, SessionError};
pub use tracker::ViewportTracker;
