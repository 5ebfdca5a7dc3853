//! Amethyst Core Library
//!
//! Shared building blocks for the Amethyst configuration engine: the error
//! taxonomy, the per-module configuration object and the CIDR matcher used
//! for access control.

pub mod cidr;
pub mod config;
pub mod error;

pub use config::{ConfigObject, CoreSettings, Scope, CORE_MODULE};
pub use error::{Error, ErrorKind, Result};

/// Amethyst version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Product name reported in the `Server` header
pub const PRODUCT: &str = "Amethyst";

/// Host platform reported by `ServerTokens full`
pub const PLATFORM: &str = std::env::consts::OS;
