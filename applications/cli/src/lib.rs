//! Podline CLI Library
//!
//! Configuration, service wiring and maintenance commands behind the
//! `podline` binary. Exposed as a library for testing.

pub mod app;
pub mod commands;
pub mod config;
pub mod error;

pub use app::App;
pub use commands::Command;
pub use config::{AppConfig, AssumedConnection};
pub use error::{CliError, Result};
