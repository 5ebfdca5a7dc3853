//! `LoadModule <priority> <locator>`
//!
//! Loads a module through the session's [`ModuleSource`] and merges what it
//! contributes. All conflicts are checked before anything is merged, so a
//! rejected module leaves the session untouched.
//!
//! [`ModuleSource`]: crate::module::ModuleSource

use super::directives::arg;
use crate::events::{EventArgs, EventFn, EventResult, LOAD, Priority};
use crate::module::{BlockDef, DirectiveDef, EventDef, Module};
use crate::parser::Block;
use crate::registry::{BlockFn, BlockStack, DirectiveFn, Outcome, RegistryError};
use crate::session::Session;
use amethyst_core::config::{object_mut, subtree_mut};
use amethyst_core::{Error, Result, Scope};
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run module code, turning a panic into its message
pub(crate) fn guard<R>(f: impl FnOnce() -> R) -> std::result::Result<R, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn guarded_directive(module: &str, inner: Arc<DirectiveFn>) -> Arc<DirectiveFn> {
    let module = module.to_string();
    Arc::new(
        move |session: &mut Session, config: &mut Value, stack: &BlockStack, args: &[String]| {
            guard(|| inner(session, config, stack, args)).unwrap_or_else(|msg| {
                Outcome::Err(Error::module_load(format!("uncaught panic in module {module}: {msg}")))
            })
        },
    )
}

fn guarded_block(module: &str, inner: Arc<BlockFn>) -> Arc<BlockFn> {
    let module = module.to_string();
    Arc::new(
        move |session: &mut Session,
              config: &mut Value,
              stack: &BlockStack,
              args: &[String],
              block: &Block| {
            guard(|| inner(session, config, stack, args, block)).unwrap_or_else(|msg| {
                Outcome::Err(Error::module_load(format!("uncaught panic in module {module}: {msg}")))
            })
        },
    )
}

fn guarded_event(module: &str, inner: Arc<EventFn>) -> Arc<EventFn> {
    let module = module.to_string();
    Arc::new(move |config: &mut Value, args: &EventArgs| {
        guard(|| inner(config, args))
            .unwrap_or_else(|msg| EventResult::Fail(format!("uncaught panic in module {module}: {msg}")))
    })
}

/// Everything a module contributes, collected up front
struct Contribution {
    name: String,
    directives: Vec<DirectiveDef>,
    blocks: Vec<BlockDef>,
    events: Vec<EventDef>,
}

impl Contribution {
    fn collect(module: &dyn Module, locator: &Path) -> Result<Self> {
        let panicked = |msg: String| {
            Error::module_load(format!("module {} panicked: {}", locator.display(), msg))
        };
        let name = match guard(|| module.name().map(str::to_string)).map_err(panicked)? {
            Some(name) => name,
            None => locator
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::module_load(format!("cannot name module at {}", locator.display()))
                })?,
        };
        Ok(Self {
            name,
            directives: guard(|| module.directives()).map_err(panicked)?,
            blocks: guard(|| module.blocks()).map_err(panicked)?,
            events: guard(|| module.events()).map_err(panicked)?,
        })
    }

    /// Reject the module if any name belongs to another module
    fn check_conflicts(&self, session: &Session) -> Result<()> {
        for d in &self.directives {
            match session.registry().directive_owner(&d.name) {
                Some(owner) if owner != self.name => {
                    return Err(Error::module_load(format!(
                        "directive {:?} conflicts with module {:?}",
                        d.name, owner
                    )));
                }
                _ => {}
            }
        }
        for b in &self.blocks {
            match session.registry().block_owner(&b.name) {
                Some(owner) if owner != self.name => {
                    return Err(Error::module_load(format!(
                        "block {:?} conflicts with module {:?}",
                        b.name, owner
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Merge a module into the session, returning the messages of failed `load` hooks
pub(crate) fn install(
    session: &mut Session,
    config: &mut Value,
    module: &dyn Module,
    locator: &Path,
    priority: Priority,
) -> Result<Vec<String>> {
    let contribution = Contribution::collect(module, locator)?;
    let name = contribution.name.clone();

    if session.is_loaded(&name) {
        return Err(Error::module_load(format!("module {name:?} is already loaded")));
    }
    contribution.check_conflicts(session)?;

    session.mark_loaded(&name);
    object_mut(config).insert(name.clone(), Value::Object(Map::new()));

    for d in contribution.directives {
        let handler = guarded_directive(&name, d.handler);
        match session
            .registry_mut()
            .register_directive(&name, &d.name, d.scope, handler)
        {
            Ok(()) | Err(RegistryError::DuplicateDirective { .. }) => {}
            Err(e) => return Err(Error::module_load(e.to_string())),
        }
    }
    for b in contribution.blocks {
        let handler = guarded_block(&name, b.handler);
        match session.registry_mut().register_block(&name, &b.name, handler) {
            Ok(()) | Err(RegistryError::DuplicateBlock { .. }) => {}
            Err(e) => return Err(Error::module_load(e.to_string())),
        }
    }

    let mut hooks = Vec::new();
    let mut handlers = 0;
    for e in contribution.events {
        let handler = guarded_event(&name, e.handler);
        if e.name == LOAD {
            hooks.push((e.scope, handler));
        } else {
            session
                .events_mut()
                .register(&name, priority, &e.name, e.scope, handler);
            handlers += 1;
        }
    }

    tracing::info!(
        "Loaded module {} from {} (priority {}, {} event handler(s))",
        name,
        locator.display(),
        priority,
        handlers
    );

    let mut failures = Vec::new();
    for (scope, hook) in hooks {
        let result = match scope {
            Scope::Local => hook(subtree_mut(config, &name), &EventArgs::None),
            Scope::Global => hook(config, &EventArgs::None),
        };
        if let EventResult::Fail(msg) = result {
            failures.push(msg);
        }
    }
    Ok(failures)
}

fn load(session: &mut Session, config: &mut Value, args: &[String]) -> Result<Outcome> {
    let priority: Priority = arg(args, 0, "expected priority and path to module src")?.parse()?;
    let locator = arg(args, 1, "missing path to src file")?;
    if args.len() > 2 {
        return Err(Error::validation("expected exactly two arguments: priority and path"));
    }

    let locator = session.resolve_working(Path::new(locator));
    let source = session.source();
    let module = guard(|| source.load(&locator)).map_err(|msg| {
        Error::module_load(format!("module {} panicked while loading: {}", locator.display(), msg))
    })??;

    let failures = install(session, config, module.as_ref(), &locator, priority)?;
    if failures.is_empty() {
        return Ok(Outcome::Ok);
    }
    // reported, but the module stays loaded
    Ok(Outcome::Warnings(
        failures
            .into_iter()
            .map(|msg| format!("load handler failed: {msg}"))
            .collect(),
    ))
}

pub(super) fn load_module(
    session: &mut Session,
    config: &mut Value,
    _stack: &BlockStack,
    args: &[String],
) -> Outcome {
    load(session, config, args).unwrap_or_else(Outcome::Err)
}
