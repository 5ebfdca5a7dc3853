//! Amethyst TLS Module
//!
//! Contributes the `TLS*` directives under the module identity `tls` and
//! checks after configuration that an enabled engine has something to serve
//! with. Terminating TLS itself is left to the server runtime.

mod module;
mod settings;

pub use module::{MODULE_NAME, TlsModule};
pub use settings::{TlsSettings, TlsSettingsError};
