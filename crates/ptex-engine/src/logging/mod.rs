//! Logging utilities.
//!
//! Library code only talks to the `log` facade; this module is the optional
//! `env_logger` setup for binaries and tests.

mod init;

pub use init::{LoggingConfig, init_logging};
