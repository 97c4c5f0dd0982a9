//! Application startup: logging, storage wiring and the HTTP server.

mod http;
mod logging;
mod storage;

pub use http::main_server;
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use storage::create_storage;
