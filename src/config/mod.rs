//! # Configuration System
//!
//! TOML-based configuration for the portal gate: parsing, defaults that
//! match the deployed portal policy, and validation run before the server
//! starts.
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! bind_port = 8080
//! upstream = "127.0.0.1:3000"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [rate_limit.auth]
//! max_points = 5
//! window_secs = 60
//!
//! [[access.protected]]
//! prefix = "/teacher"
//! roles = ["teacher", "admin"]
//! ```

mod error;
mod loader;
mod types;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use types::{LogFormat, LogLevel, LoggingConfig, PortalConfig, ServerSection};
pub use validation::{
    AccessRuleValidator, BasicValidator, ValidationError, ValidationResult, Validator,
};
