pub mod config;
pub mod resources;

pub use config::{GantryConfig, LogSection, SchedulerSection, StateSection};
pub use resources::ResourceVector;
