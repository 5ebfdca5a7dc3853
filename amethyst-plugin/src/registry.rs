//! Module catalog

use amethyst_config::Module;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds a fresh instance of a module
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// Modules available to `LoadModule`, keyed by locator name
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<String, ModuleFactory>,
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("modules", &self.names())
            .finish()
    }
}

impl ModuleCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the modules shipped with Amethyst
    pub fn bundled() -> Self {
        let mut catalog = Self::new();
        catalog.register("mod_tls", || Box::new(amethyst_tls::TlsModule));
        catalog
    }

    /// Register a module factory; a later registration replaces an earlier one
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Module> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!("Registering module {} in catalog", name);
        self.modules.insert(name, Arc::new(factory));
    }

    /// Instantiate a module by name
    pub fn get(&self, name: &str) -> Option<Box<dyn Module>> {
        self.modules.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }
}
