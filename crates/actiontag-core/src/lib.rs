//! Core types for the action-tag language.
//!
//! Defines the typed [`Action`] union that parsed model output turns into,
//! the uniform [`ActionResult`] the executor reports back, error types, and
//! the TOML configuration shared by the parser, executor and binary.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ActionTagConfig, ExecutorConfig, GeneralConfig, ParserSettings};
pub use error::{ActionError, ConfigError, Result};
pub use types::*;
