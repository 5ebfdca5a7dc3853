//! Loading session
//!
//! A [`Session`] owns everything that changes while a configuration is
//! loaded: the directive/block registry, the event store, the set of loaded
//! modules, the environment used for interpolation and the diagnostics
//! reported so far. Nothing is process-global, so independent sessions can
//! load configurations side by side.

use crate::builtins::{CONNECTION_PRIORITY, CoreModule};
use crate::diagnostics::Diagnostic;
use crate::events::{EventArgs, EventResult, EventStore, POSTCONFIG};
use crate::module::{Module, ModuleSource};
use crate::parser::{ConfigFile, Environment, ParseErrors, parse, parse_file};
use crate::registry::{BlockStack, Registry};
use amethyst_core::{CORE_MODULE, ConfigObject, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Options controlling how a session resolves paths and the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Base for relative module locators, and for includes from
    /// configuration text that has no file of its own
    pub working_dir: PathBuf,

    /// Seed the session environment from the process environment
    pub inherit_environment: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            inherit_environment: true,
        }
    }
}

/// A successfully loaded configuration, ready for the runtime
#[derive(Debug)]
pub struct Loaded {
    pub config: ConfigObject,
    pub events: EventStore,
    pub env: Environment,
    /// Loaded module names, `core` first
    pub modules: Vec<String>,
    /// Non-fatal diagnostics
    pub warnings: Vec<Diagnostic>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration parsing failed")]
    Parse(Vec<Diagnostic>),

    #[error("configuration execution failed")]
    Execution(Vec<Diagnostic>),
}

impl LoadError {
    /// Every diagnostic reported before the load failed, warnings included
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            LoadError::Parse(d) | LoadError::Execution(d) => d,
        }
    }
}

pub struct Session {
    registry: Registry,
    events: EventStore,
    modules: Vec<String>,
    env: Environment,
    source: Arc<dyn ModuleSource>,
    options: LoaderOptions,
    diagnostics: Vec<Diagnostic>,
    /// Files currently being executed, outermost first
    files: Vec<PathBuf>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .field("events", &self.events)
            .field("modules", &self.modules)
            .field("options", &self.options)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        Self::with_options(source, LoaderOptions::default())
    }

    pub fn with_options(source: Arc<dyn ModuleSource>, options: LoaderOptions) -> Self {
        let env = if options.inherit_environment {
            Environment::from_process()
        } else {
            Environment::new()
        };

        let mut events = EventStore::new();
        for e in CoreModule.events() {
            events.register(CORE_MODULE, CONNECTION_PRIORITY.into(), &e.name, e.scope, e.handler);
        }

        Self {
            registry: Registry::with_builtins(),
            events,
            modules: vec![CORE_MODULE.to_string()],
            env,
            source,
            options,
            diagnostics: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Replace the session environment
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventStore {
        &mut self.events
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Loaded module names, `core` first
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn is_loaded(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }

    pub(crate) fn mark_loaded(&mut self, module: &str) {
        self.modules.push(module.to_string());
    }

    pub(crate) fn source(&self) -> Arc<dyn ModuleSource> {
        Arc::clone(&self.source)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Record a diagnostic
    pub fn report(&mut self, diagnostic: Diagnostic) {
        diagnostic.trace();
        self.diagnostics.push(diagnostic);
    }

    /// Anchor a relative path at the session working directory
    pub fn resolve_working(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.options.working_dir.join(path)
        }
    }

    /// Anchor a relative path at the directory of the file being executed
    pub fn resolve_relative(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let dir = self
            .files
            .last()
            .and_then(|f| f.parent())
            .filter(|d| !d.as_os_str().is_empty());
        match dir {
            Some(dir) => dir.join(path),
            None => self.resolve_working(path),
        }
    }

    fn canonical(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    pub(crate) fn enter_file(&mut self, path: &Path) {
        self.files.push(Self::canonical(path));
    }

    pub(crate) fn leave_file(&mut self) {
        self.files.pop();
    }

    /// Is `path` on the chain of files currently being executed
    pub(crate) fn is_executing(&self, path: &Path) -> bool {
        self.files.contains(&Self::canonical(path))
    }

    /// Load, execute and validate a configuration file
    pub fn load_file(self, path: impl AsRef<Path>) -> Result<Loaded, LoadError> {
        let parsed = parse_file(path);
        self.finish(parsed)
    }

    /// [`Session::load_file`] for configuration text; `name` labels diagnostics
    pub fn load_str(self, source: &str, name: impl AsRef<Path>) -> Result<Loaded, LoadError> {
        let parsed = parse(source, name);
        self.finish(parsed)
    }

    fn finish(mut self, parsed: Result<ConfigFile, ParseErrors>) -> Result<Loaded, LoadError> {
        let mut config = ConfigObject::new();
        let executed = self.execute(config.as_value_mut(), &BlockStack::new(), &parsed);

        if parsed.is_err() {
            return Err(LoadError::Parse(self.diagnostics));
        }
        if executed.is_err() {
            return Err(LoadError::Execution(self.diagnostics));
        }

        let mut failed = false;
        for r in self
            .events
            .dispatch(POSTCONFIG, config.as_value_mut(), &EventArgs::None)
        {
            if let EventResult::Fail(msg) = r.result {
                self.report(Diagnostic::error(ErrorKind::Validation, msg).with_context(r.module));
                failed = true;
            }
        }
        if failed {
            return Err(LoadError::Execution(self.diagnostics));
        }

        tracing::info!(
            "Configuration loaded ({} module(s), {} event handler(s))",
            self.modules.len(),
            self.events.len()
        );
        Ok(Loaded {
            config,
            events: self.events,
            env: self.env,
            modules: self.modules,
            warnings: self.diagnostics,
        })
    }
}
