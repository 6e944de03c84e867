//! Theme Probe server: HTTP and CLI access to the theme capability prober.

pub mod config;
pub mod logging;
pub mod transport;

pub use config::{ConfigError, ConfigOverrides, ServerConfig};
pub use transport::{router, AppState, HttpTransport};
