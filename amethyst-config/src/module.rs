//! Loadable module interface
//!
//! A module contributes directives, blocks and event handlers. It is found
//! through a [`ModuleSource`] when a configuration file says
//! `LoadModule <priority> <locator>`.

use crate::events::{EventArgs, EventFn, EventResult};
use crate::parser::Block;
use crate::registry::{BlockFn, BlockStack, DirectiveFn, Outcome};
use crate::session::Session;
use amethyst_core::{Error, Result, Scope};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// A directive contributed by a module
#[derive(Clone)]
pub struct DirectiveDef {
    pub name: String,
    pub scope: Scope,
    pub handler: Arc<DirectiveFn>,
}

impl DirectiveDef {
    /// Directive receiving the module's own subtree
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Session, &mut Value, &BlockStack, &[String]) -> Outcome + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            scope: Scope::Local,
            handler: Arc::new(handler),
        }
    }

    /// Directive written as a fallible function over the module's subtree
    pub fn checked<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Value, &BlockStack, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(name, move |_, config, stack, args| handler(config, stack, args).into())
    }

    /// Receive the whole configuration object instead
    pub fn global(mut self) -> Self {
        self.scope = Scope::Global;
        self
    }
}

/// A block contributed by a module
#[derive(Clone)]
pub struct BlockDef {
    pub name: String,
    pub handler: Arc<BlockFn>,
}

impl BlockDef {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Session, &mut Value, &BlockStack, &[String], &Block) -> Outcome
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }
}

/// An event handler contributed by a module
#[derive(Clone)]
pub struct EventDef {
    pub name: String,
    pub scope: Scope,
    pub handler: Arc<EventFn>,
}

impl EventDef {
    /// Handler receiving the module's own subtree
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Value, &EventArgs) -> EventResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            scope: Scope::Local,
            handler: Arc::new(handler),
        }
    }

    /// Receive the whole configuration object instead
    pub fn global(mut self) -> Self {
        self.scope = Scope::Global;
        self
    }
}

/// Capabilities of a loadable module
///
/// Every method is optional. Without [`Module::name`] the module is known by
/// the file stem of the locator it was loaded from.
pub trait Module: Send + Sync {
    fn name(&self) -> Option<&str> {
        None
    }

    fn directives(&self) -> Vec<DirectiveDef> {
        Vec::new()
    }

    fn blocks(&self) -> Vec<BlockDef> {
        Vec::new()
    }

    /// Event handlers; the one named `load` runs once right after merging
    fn events(&self) -> Vec<EventDef> {
        Vec::new()
    }
}

/// Resolves a module locator to a module
pub trait ModuleSource: Send + Sync {
    fn load(&self, locator: &Path) -> Result<Box<dyn Module>>;
}

/// Source that knows no modules
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModules;

impl ModuleSource for NoModules {
    fn load(&self, locator: &Path) -> Result<Box<dyn Module>> {
        Err(Error::module_load(format!("no such module: {}", locator.display())))
    }
}
