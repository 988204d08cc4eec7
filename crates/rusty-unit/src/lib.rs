//! Command-line driver for the `synthesis` core: configuration loading and
//! the commands behind the `rusty-unit` binary.

pub mod commands;
pub mod config;

pub use config::AppConfig;
