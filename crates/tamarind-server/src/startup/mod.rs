//! Server startup: logging, storage, HTTP server and shutdown handling

pub mod http;
pub mod logging;
pub mod shutdown;
pub mod storage;

pub use http::{configure_app, main_server};
pub use logging::{LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::wait_for_shutdown_signal;
pub use storage::init_persistence;
