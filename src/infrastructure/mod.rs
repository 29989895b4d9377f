//! 基础设施层: configuration and logging

pub mod config;
pub mod logging;

pub use config::{BeadConfig, BoxConfig, LoggingConfig};
pub use logging::init_logging;
