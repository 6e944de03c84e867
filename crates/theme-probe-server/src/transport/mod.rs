//! Transports exposing the probe.

pub mod http;

pub use http::{router, AppState, HttpTransport};
