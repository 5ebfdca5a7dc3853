//! Directive and block registry
//!
//! Maps names to handlers. The registry starts out with the built-in `core`
//! vocabulary and grows as modules are loaded; names are never replaced.

use crate::builtins::CoreModule;
use crate::module::{BlockDef, DirectiveDef, Module};
use crate::parser::{Block, Unresolved};
use crate::session::Session;
use amethyst_core::{CORE_MODULE, Error, Scope};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Handler for a directive: `(session, scoped config, block stack, args)`
pub type DirectiveFn =
    dyn Fn(&mut Session, &mut Value, &BlockStack, &[String]) -> Outcome + Send + Sync;

/// Handler for a block: `(session, config, block stack, args, node)`
///
/// Block handlers always receive the whole configuration object and decide
/// themselves whether to run the children.
pub type BlockFn =
    dyn Fn(&mut Session, &mut Value, &BlockStack, &[String], &Block) -> Outcome + Send + Sync;

/// Result of running a handler
#[derive(Debug)]
pub enum Outcome {
    Ok,
    /// Reported against the statement that produced it
    Err(Error),
    /// Failed, with diagnostics already reported
    Failed,
    /// One diagnostic per unresolved variable
    EnvErr(Vec<Unresolved>),
    /// Reported as warnings; the statement still succeeds
    Warnings(Vec<String>),
}

impl From<amethyst_core::Result<()>> for Outcome {
    fn from(result: amethyst_core::Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Ok,
            Err(e) => Outcome::Err(e),
        }
    }
}

impl From<Error> for Outcome {
    fn from(err: Error) -> Self {
        Outcome::Err(err)
    }
}

/// Names of the blocks enclosing the statement being executed, outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockStack(Vec<String>);

impl BlockStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this stack with `name` entered
    pub fn with(&self, name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.push(name.into());
        Self(names)
    }

    pub fn innermost(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Scope error unless at the top level of the file
    pub fn require_top_level(&self) -> amethyst_core::Result<()> {
        match self.innermost() {
            None => Ok(()),
            Some(block) => Err(Error::scope(format!(
                "directive not allowed inside blocks (found inside {})",
                block
            ))),
        }
    }
}

#[derive(Clone)]
pub struct DirectiveEntry {
    pub module: String,
    pub scope: Scope,
    pub handler: Arc<DirectiveFn>,
}

#[derive(Clone)]
pub struct BlockEntry {
    pub module: String,
    pub handler: Arc<BlockFn>,
}

impl fmt::Debug for DirectiveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveEntry")
            .field("module", &self.module)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for BlockEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockEntry")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("directive {name:?} is already provided by module {owner:?}")]
    DuplicateDirective { name: String, owner: String },

    #[error("block {name:?} is already provided by module {owner:?}")]
    DuplicateBlock { name: String, owner: String },
}

/// Directive and block registry
#[derive(Debug, Default)]
pub struct Registry {
    directives: HashMap<String, DirectiveEntry>,
    blocks: HashMap<String, BlockEntry>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the `core` directives and blocks
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for d in CoreModule.directives() {
            registry.insert_directive(CORE_MODULE, d);
        }
        for b in CoreModule.blocks() {
            registry.insert_block(CORE_MODULE, b);
        }
        registry
    }

    fn insert_directive(&mut self, module: &str, def: DirectiveDef) {
        self.directives.insert(
            def.name,
            DirectiveEntry {
                module: module.to_string(),
                scope: def.scope,
                handler: def.handler,
            },
        );
    }

    fn insert_block(&mut self, module: &str, def: BlockDef) {
        self.blocks.insert(
            def.name,
            BlockEntry {
                module: module.to_string(),
                handler: def.handler,
            },
        );
    }

    /// Register a directive; an existing name is never replaced
    pub fn register_directive(
        &mut self,
        module: &str,
        name: &str,
        scope: Scope,
        handler: Arc<DirectiveFn>,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.directives.get(name) {
            return Err(RegistryError::DuplicateDirective {
                name: name.to_string(),
                owner: existing.module.clone(),
            });
        }
        tracing::debug!("Registering directive {} ({}, {})", name, module, scope);
        self.directives.insert(
            name.to_string(),
            DirectiveEntry {
                module: module.to_string(),
                scope,
                handler,
            },
        );
        Ok(())
    }

    /// Register a block; an existing name is never replaced
    pub fn register_block(
        &mut self,
        module: &str,
        name: &str,
        handler: Arc<BlockFn>,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.blocks.get(name) {
            return Err(RegistryError::DuplicateBlock {
                name: name.to_string(),
                owner: existing.module.clone(),
            });
        }
        tracing::debug!("Registering block {} ({})", name, module);
        self.blocks.insert(
            name.to_string(),
            BlockEntry {
                module: module.to_string(),
                handler,
            },
        );
        Ok(())
    }

    pub fn directive(&self, name: &str) -> Option<&DirectiveEntry> {
        self.directives.get(name)
    }

    pub fn block(&self, name: &str) -> Option<&BlockEntry> {
        self.blocks.get(name)
    }

    /// Module owning a directive name
    pub fn directive_owner(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(|e| e.module.as_str())
    }

    /// Module owning a block name
    pub fn block_owner(&self, name: &str) -> Option<&str> {
        self.blocks.get(name).map(|e| e.module.as_str())
    }
}
