//! Logging utilities.
//!
//! Centralizes logger initialization. The crate itself only depends on the
//! `log` facade; this module wires up `env_logger` for binaries and tests
//! that want output.

mod init;

pub use init::{LoggingConfig, init_logging};
