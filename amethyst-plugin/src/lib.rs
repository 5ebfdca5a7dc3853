//! Amethyst Module Catalog
//!
//! Modules are compiled in and registered by name in a [`ModuleCatalog`].
//! [`CatalogLoader`] resolves `LoadModule` locators against it.

mod loader;
mod registry;

pub use loader::CatalogLoader;
pub use registry::{ModuleCatalog, ModuleFactory};
