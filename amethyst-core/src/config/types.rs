//! Configuration type definitions
//!
//! The configuration object is a JSON-like tree with one subtree per module.
//! Handlers mutate it in place while the configuration file is executed; the
//! runtime then reads it back, optionally through the typed [`CoreSettings`]
//! view of the `core` subtree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Name of the built-in module owning server-wide settings
pub const CORE_MODULE: &str = "core";

/// Which part of the configuration object a handler receives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only the owning module's subtree
    #[default]
    Local,
    /// The whole configuration object
    Global,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Local => write!(f, "module"),
            Scope::Global => write!(f, "global"),
        }
    }
}

/// Module name -> that module's private subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigObject(Value);

impl ConfigObject {
    /// Fresh object holding an empty `core` subtree
    pub fn new() -> Self {
        Self::with_modules([CORE_MODULE])
    }

    /// Object holding one empty subtree per listed module
    pub fn with_modules<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = modules
            .into_iter()
            .map(|m| (m.into(), Value::Object(Map::new())))
            .collect::<Map<_, _>>();
        Self(Value::Object(root))
    }

    /// Subtree of a module, if present
    pub fn module(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Subtree of a module, created empty when missing
    pub fn module_mut(&mut self, name: &str) -> &mut Value {
        subtree_mut(&mut self.0, name)
    }

    /// The `core` subtree
    pub fn core(&self) -> Option<&Value> {
        self.module(CORE_MODULE)
    }

    /// Module names present in the object
    pub fn modules(&self) -> Vec<&str> {
        self.0
            .as_object()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Typed view of the `core` subtree
    pub fn core_settings(&self) -> serde_json::Result<CoreSettings> {
        match self.core() {
            Some(core) => CoreSettings::deserialize(core),
            None => Ok(CoreSettings::default()),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Default for ConfigObject {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Value> for ConfigObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// View `value` as an object, replacing any non-object with `{}`
pub fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// Child object `key` of `value`, created empty when missing or not an object
pub fn subtree_mut<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    let child = object_mut(value)
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    child
}

/// Merge `src` into `dst`: objects merge key by key, anything else overwrites
pub fn deep_merge(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => {
            for (key, value) in s {
                match d.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        d.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (d, s) => *d = s.clone(),
    }
}

/// Typed view of the `core` subtree handed to the runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreSettings {
    /// Listening port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub pidfile: Option<String>,

    /// Connection timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub groupname: Option<String>,

    /// Addresses or subnets that may connect; empty allows everyone not denied
    #[serde(default)]
    pub grant_ip: Vec<String>,

    /// Addresses or subnets refused outright
    #[serde(default)]
    pub deny_ip: Vec<String>,

    /// Lower-cased header name -> value
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub logs: LogSettings,

    /// HTTP status code -> error document path
    #[serde(default)]
    pub webpages: BTreeMap<String, String>,

    /// Trust the forwarded client address
    #[serde(default)]
    pub proxy: Option<bool>,

    /// Endpoint path -> module -> module subtree
    #[serde(default)]
    pub endpoints: BTreeMap<String, Map<String, Value>>,
}

/// Logging settings collected from the configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Error log destinations
    #[serde(default)]
    pub error: Vec<String>,

    /// Access log format name -> format string
    #[serde(default)]
    pub access_format: BTreeMap<String, String>,

    #[serde(default)]
    pub timefmt: Option<String>,

    #[serde(default)]
    pub tz: Option<TimeZone>,
}

/// Time zone used when rendering log timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeZone {
    pub name: String,
    /// Offset in `+HHMM` form
    pub time: String,
}
