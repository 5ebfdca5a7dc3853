//! `core` blocks: endpoints and conditionals

use super::directives::arg;
use super::env::variable_name;
use crate::parser::Block;
use crate::registry::{BlockStack, Outcome};
use crate::session::Session;
use amethyst_core::config::{deep_merge, subtree_mut};
use amethyst_core::{CORE_MODULE, ConfigObject, Error, Result};
use serde_json::Value;

fn run_children(session: &mut Session, config: &mut Value, stack: &BlockStack, block: &Block) -> Outcome {
    match session.execute_nodes(config, &stack.with(block.name.as_str()), &block.children) {
        Ok(()) => Outcome::Ok,
        Err(_) => Outcome::Failed,
    }
}

fn run_if(
    cond: Result<bool>,
    session: &mut Session,
    config: &mut Value,
    stack: &BlockStack,
    block: &Block,
) -> Outcome {
    match cond {
        Ok(true) => run_children(session, config, stack, block),
        Ok(false) => Outcome::Ok,
        Err(e) => Outcome::Err(e),
    }
}

/// `<Endpoint path...>`
///
/// Children run against a scratch object holding an empty subtree for every
/// loaded module. Each module's result is then merged into
/// `core.endpoints[path][module]` for every listed path.
pub(super) fn endpoint(
    session: &mut Session,
    config: &mut Value,
    stack: &BlockStack,
    args: &[String],
    block: &Block,
) -> Outcome {
    if args.is_empty() {
        return Error::validation("expected at least one endpoint path").into();
    }

    let mut scratch = ConfigObject::with_modules(session.modules().to_vec()).into_value();
    let outcome = run_children(session, &mut scratch, stack, block);

    let endpoints = subtree_mut(subtree_mut(config, CORE_MODULE), "endpoints");
    if let Value::Object(modules) = &scratch {
        for path in args {
            let target = subtree_mut(endpoints, path);
            for (module, subtree) in modules {
                deep_merge(subtree_mut(target, module), subtree);
            }
        }
    }
    outcome
}

/// Compare a set variable against a value; `None` when it is unset
fn env_compare(session: &Session, args: &[String]) -> Result<Option<bool>> {
    let name = variable_name(arg(args, 0, "missing environment variable name")?)?;
    let value = arg(args, 1, "missing value to compare against")?;
    Ok(session.env().get(&name).map(|v| v == value))
}

fn env_is_set(session: &Session, args: &[String]) -> Result<bool> {
    let name = variable_name(arg(args, 0, "missing environment variable name")?)?;
    Ok(session.env().contains(&name))
}

/// `<IfEnvEq NAME value>`
pub(super) fn if_env_eq(
    session: &mut Session,
    config: &mut Value,
    stack: &BlockStack,
    args: &[String],
    block: &Block,
) -> Outcome {
    let cond = env_compare(session, args).map(|eq| eq == Some(true));
    run_if(cond, session, config, stack, block)
}

/// `<IfEnvNeq NAME value>`; an unset variable is not a mismatch
pub(super) fn if_env_neq(
    session: &mut Session,
    config: &mut Value,
    stack: &BlockStack,
    args: &[String],
    block: &Block,
) -> Outcome {
    let cond = env_compare(session, args).map(|eq| eq == Some(false));
    run_if(cond, session, config, stack, block)
}

/// `<IfEnv NAME>`
pub(super) fn if_env(
    session: &mut Session,
    config: &mut Value,
    stack: &BlockStack,
    args: &[String],
    block: &Block,
) -> Outcome {
    let cond = env_is_set(session, args);
    run_if(cond, session, config, stack, block)
}

/// `<IfNotEnv NAME>`
pub(super) fn if_not_env(
    session: &mut Session,
    config: &mut Value,
    stack: &BlockStack,
    args: &[String],
    block: &Block,
) -> Outcome {
    let cond = env_is_set(session, args).map(|set| !set);
    run_if(cond, session, config, stack, block)
}

/// `<IfModule name>`; names compare case-insensitively
pub(super) fn if_module(
    session: &mut Session,
    config: &mut Value,
    stack: &BlockStack,
    args: &[String],
    block: &Block,
) -> Outcome {
    let cond = arg(args, 0, "missing module name").map(|name| {
        session
            .modules()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(name))
    });
    run_if(cond, session, config, stack, block)
}
