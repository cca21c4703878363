//! Shared infrastructure for kiln services
//!
//! - logging bootstrap
//! - layered configuration loading
//! - shutdown signal handling

pub mod config_loader;
pub mod logging;
pub mod shutdown;

pub use config_loader::{load_config, load_config_with_prefix};
pub use logging::{init_logging, LogConfig};
pub use shutdown::{wait_for_shutdown, ShutdownSignal};
