//! Amethyst configuration loader
//!
//! This crate turns Amethyst configuration files into a configuration object
//! and an event table: the files are parsed into a tree of directives and
//! blocks, every statement is executed against the registered handlers, and
//! modules named by `LoadModule` contribute their own vocabulary along the
//! way.
//!
//! # Example
//!
//! ```rust,ignore
//! use amethyst_config::{NoModules, Session};
//! use std::sync::Arc;
//!
//! let source = r#"
//!     Listen 8080
//!     <Endpoint /api>
//!         Header X-Api yes
//!     </Endpoint>
//! "#;
//!
//! let loaded = Session::new(Arc::new(NoModules))
//!     .load_str(source, "amethyst.conf")
//!     .unwrap();
//! assert_eq!(loaded.config.core_settings().unwrap().port, Some(8080));
//! ```

mod builtins;
pub mod diagnostics;
pub mod engine;
pub mod events;
pub mod module;
pub mod parser;
pub mod registry;
pub mod session;

pub use builtins::CONNECTION_PRIORITY;
pub use diagnostics::{Diagnostic, Severity};
pub use engine::ExecutionFailed;
pub use events::{
    ConnectionInfo, Dispatched, EventArgs, EventFn, EventResult, EventStore, Frame, Priority,
    TableOrder,
};
pub use module::{BlockDef, DirectiveDef, EventDef, Module, ModuleSource, NoModules};
pub use parser::{ConfigFile, ConfigNode, Environment, Location, ParseErrors, parse, parse_file};
pub use registry::{BlockStack, Outcome, Registry, RegistryError};
pub use session::{LoadError, Loaded, LoaderOptions, Session};

use std::path::Path;
use std::sync::Arc;

/// Load a configuration file with default options
pub fn load(
    path: impl AsRef<Path>,
    source: Arc<dyn ModuleSource>,
) -> Result<Loaded, LoadError> {
    Session::new(source).load_file(path)
}
