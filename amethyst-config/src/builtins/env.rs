//! `SetEnv` and `UnsetEnv`
//!
//! Both act on the session environment, so later interpolation and the
//! `IfEnv*` blocks observe the change.

use super::directives::arg;
use crate::registry::{BlockStack, Outcome};
use crate::session::Session;
use amethyst_core::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ENV_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_][A-Z_0-9]*$").expect("valid variable name regex"));

/// Upper-cased variable name, validated
pub(super) fn variable_name(raw: &str) -> Result<String> {
    let name = raw.to_uppercase();
    if ENV_NAME_RE.is_match(&name) {
        Ok(name)
    } else {
        Err(Error::environment(format!("invalid environment variable name: {name:?}")))
    }
}

pub(super) fn set_env(
    session: &mut Session,
    _config: &mut Value,
    _stack: &BlockStack,
    args: &[String],
) -> Outcome {
    set_variable(session, args).into()
}

pub(super) fn unset_env(
    session: &mut Session,
    _config: &mut Value,
    _stack: &BlockStack,
    args: &[String],
) -> Outcome {
    unset_variable(session, args).into()
}

fn set_variable(session: &mut Session, args: &[String]) -> Result<()> {
    let name = variable_name(arg(args, 0, "no environment variable name specified")?)?;
    let value = arg(args, 1, "no environment variable value specified")?;
    tracing::debug!("SetEnv {}={}", name, value);
    session.env_mut().set(name, value);
    Ok(())
}

fn unset_variable(session: &mut Session, args: &[String]) -> Result<()> {
    let name = variable_name(arg(args, 0, "no environment variable name specified")?)?;
    match session.env_mut().unset(&name) {
        Some(_) => Ok(()),
        None => Err(Error::environment(format!("environment variable is not set: {name:?}"))),
    }
}
