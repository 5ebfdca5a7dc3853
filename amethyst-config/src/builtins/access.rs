//! Client access control: the `Require` directive and the `connection` gate

use crate::events::{EventArgs, EventResult};
use crate::registry::BlockStack;
use amethyst_core::cidr;
use amethyst_core::config::object_mut;
use amethyst_core::{Error, Result};
use serde_json::{Value, json};

const GRANT: &str = "grant_ip";
const DENY: &str = "deny_ip";

const LOCAL: [&str; 2] = ["::1", "127.0.0.0/8"];
const EVERYONE: [&str; 2] = ["0.0.0.0/0", "::/0"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Granted,
    Denied,
}

impl Action {
    fn parse(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "granted" => Some(Action::Granted),
            "denied" => Some(Action::Denied),
            _ => None,
        }
    }

    fn list(self) -> &'static str {
        match self {
            Action::Granted => GRANT,
            Action::Denied => DENY,
        }
    }
}

fn list_mut<'a>(config: &'a mut Value, key: &str) -> &'a mut Vec<Value> {
    let entry = object_mut(config)
        .entry(key.to_string())
        .or_insert_with(|| json!([]));
    if !entry.is_array() {
        *entry = json!([]);
    }
    match entry {
        Value::Array(list) => list,
        _ => unreachable!("entry was just replaced with an array"),
    }
}

fn push_unique(config: &mut Value, key: &str, spec: &str) {
    let list = list_mut(config, key);
    if !list.iter().any(|v| v.as_str() == Some(spec)) {
        list.push(json!(spec));
    }
}

fn replace(config: &mut Value, key: &str, specs: &[&str]) {
    object_mut(config).insert(key.to_string(), json!(specs));
}

/// `Require <id> granted|denied` or `Require <id> <id> <id>...`
///
/// Two arguments always mean an id and an action. An id is `local`, `all` (with an action only), an address or a subnet.
/// Subnets are stored by their network address.
pub(super) fn require(config: &mut Value, _stack: &BlockStack, args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err(Error::validation("must have at least one requirement"));
    }
    list_mut(config, GRANT);
    list_mut(config, DENY);

    if let [id, action] = args {
        return match Action::parse(action) {
            Some(action) => apply(config, id, action),
            None => Err(Error::validation(format!("unknown action: {action:?}"))),
        };
    }

    for id in args {
        if id.eq_ignore_ascii_case("local") {
            LOCAL.iter().for_each(|spec| push_unique(config, GRANT, spec));
        } else {
            push_unique(config, GRANT, &cidr::normalize(id)?);
        }
    }
    Ok(())
}

fn apply(config: &mut Value, id: &str, action: Action) -> Result<()> {
    match (id.to_lowercase().as_str(), action) {
        ("local", _) => LOCAL
            .iter()
            .for_each(|spec| push_unique(config, action.list(), spec)),
        ("all", Action::Granted) => {
            replace(config, GRANT, &[]);
            replace(config, DENY, &[]);
        }
        ("all", Action::Denied) => {
            replace(config, GRANT, &[]);
            replace(config, DENY, &EVERYONE);
        }
        _ => push_unique(config, action.list(), &cidr::normalize(id)?),
    }
    Ok(())
}

fn specs(config: &Value, key: &str) -> Vec<String> {
    config
        .get(key)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Close connections from clients the grant/deny lists refuse
pub(super) fn connection_gate(config: &mut Value, args: &EventArgs) -> EventResult {
    let EventArgs::Connection(info) = args else {
        return EventResult::Pass;
    };
    if cidr::is_admitted(&specs(config, GRANT), &specs(config, DENY), &info.client) {
        EventResult::Pass
    } else {
        EventResult::Close
    }
}
