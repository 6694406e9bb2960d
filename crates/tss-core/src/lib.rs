//! tss-core - Shared functionality for the TSS reconciliation tools
//!
//! Where things live on disk and how the tools are configured.

pub mod config;
pub mod paths;

pub use config::{Config, ConfigError};
pub use paths::Paths;
