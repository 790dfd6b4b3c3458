//! Gateway node configuration.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     schema.rs (typed config structs with defaults)
//!     ← loader.rs (parse TOML file)
//!     ← watcher.rs (push fresh configs on file change)
//! ```

pub mod loader;
pub mod schema;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use watcher::ConfigWatcher;
