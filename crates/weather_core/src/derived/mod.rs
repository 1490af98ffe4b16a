//! Services layered on top of the hourly timeline.

pub mod accumulation;
pub mod environment;
pub mod ground;
pub mod sea_state;

pub use accumulation::{AccumulationService, SnowIceState, SurfaceCondition};
pub use environment::{AlertSet, EnvironmentService, Severity};
pub use ground::GroundTemperature;
pub use sea_state::SeaStateSnapshot;
