//! Process exit codes

/// Failure with no more specific code
pub const UNKNOWN: i32 = 1;

/// The host is not a platform Amethyst runs on
pub const BAD_ENVIRONMENT: i32 = 3;

/// The configuration could not be loaded
pub const BAD_CONFIG: i32 = 4;
