//! # SwKit Common
//!
//! Logging setup and configuration shared by the SwKit service-worker crates.
//!
//! ## Features
//!
//! - `tracing` subscriber setup (pretty, compact or JSON output)
//! - JSON worker configuration with defaults for every section

pub mod config;
pub mod logging;

pub use config::{
    CacheNameSettings, ConfigError, LogSettings, NavigationFallbackSettings, PrecacheSettings,
    RoutingSettings, WorkerConfig,
};
pub use logging::{init_logging, try_init_logging, LogConfig, LogFormat};
