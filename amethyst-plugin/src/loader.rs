//! `ModuleSource` backed by a catalog

use crate::registry::ModuleCatalog;
use amethyst_config::{Module, ModuleSource};
use amethyst_core::{Error, Result};
use std::path::Path;

/// Resolves a locator by its file stem, so `mods/mod_tls.so`, `mod_tls.js`
/// and `mod_tls` all name the `mod_tls` catalog entry
#[derive(Debug, Clone, Default)]
pub struct CatalogLoader {
    catalog: ModuleCatalog,
}

impl CatalogLoader {
    pub fn new(catalog: ModuleCatalog) -> Self {
        Self { catalog }
    }

    /// Loader over [`ModuleCatalog::bundled`]
    pub fn bundled() -> Self {
        Self::new(ModuleCatalog::bundled())
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }
}

impl ModuleSource for CatalogLoader {
    fn load(&self, locator: &Path) -> Result<Box<dyn Module>> {
        if locator.is_dir() {
            return Err(Error::module_load(format!(
                "expected a module file, found a directory: {}",
                locator.display()
            )));
        }
        let name = locator
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::module_load(format!("no such module: {}", locator.display())))?;

        match self.catalog.get(name) {
            Some(module) => {
                tracing::debug!("Resolved {} to catalog module {}", locator.display(), name);
                Ok(module)
            }
            None => Err(Error::module_load(format!("no such module: {}", locator.display()))),
        }
    }
}
