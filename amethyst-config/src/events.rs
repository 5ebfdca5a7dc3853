//! Priority-ordered event store
//!
//! Handlers are keyed by `(priority, module, event)`. Dispatch visits them in
//! ascending priority, then ascending module name, passing each either its
//! module's subtree or the whole configuration object. Every handler runs;
//! dispatch never short-circuits and returns all results to the caller.

use amethyst_core::config::subtree_mut;
use amethyst_core::{Error, Scope};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

/// Run once, right after the owning module is merged
pub const LOAD: &str = "load";
/// Fired after the whole configuration has executed successfully
pub const POSTCONFIG: &str = "postconfig";
/// Fired by the runtime for every inbound connection
pub const CONNECTION: &str = "connection";

static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+(\.[0-9]+)?$").expect("valid priority regex"));

/// Handler for an event: `(scoped config, args)`
pub type EventFn = dyn Fn(&mut Value, &EventArgs) -> EventResult + Send + Sync;

/// Dispatch order key; lower runs first
#[derive(Debug, Clone, Copy)]
pub struct Priority(f64);

impl Priority {
    pub fn new(value: f64) -> Self {
        // fold -0.0 into 0.0 so both sort and compare equal
        Self(if value == 0.0 { 0.0 } else { value })
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self::new(f64::from(value))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !PRIORITY_RE.is_match(s) {
            return Err(Error::validation(format!("invalid priority: not a number: {s:?}")));
        }
        s.parse::<f64>()
            .map(Self::new)
            .map_err(|e| Error::validation(format!("invalid priority {s:?}: {e}")))
    }
}

/// Arguments passed along with an event
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventArgs {
    #[default]
    None,
    Connection(ConnectionInfo),
    Value(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub client: IpAddr,
    pub local: Option<SocketAddr>,
}

/// Value returned by an event handler
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventResult {
    /// Nothing to report
    #[default]
    Pass,
    /// Close the connection
    Close,
    /// Handler reported an error
    Fail(String),
}

/// Result of one handler during dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub result: EventResult,
    pub module: String,
    pub priority: Priority,
    pub id: u64,
}

/// A registration as seen from outside the store
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: u64,
    pub priority: Priority,
    pub module: String,
    pub event: String,
    pub scope: Scope,
}

/// Row order for [`EventStore::table`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableOrder {
    #[default]
    Id,
    Priority,
    Module,
    Event,
}

struct Registration {
    id: u64,
    scope: Scope,
    handler: Arc<EventFn>,
}

/// Event store
#[derive(Default)]
pub struct EventStore {
    store: BTreeMap<Priority, BTreeMap<String, BTreeMap<String, Registration>>>,
    next_id: u64,
}

impl fmt::Debug for EventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore")
            .field("registrations", &self.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning its id
    ///
    /// Registering the same `(priority, module, event)` again replaces the
    /// handler and scope but keeps the first id.
    pub fn register(
        &mut self,
        module: &str,
        priority: Priority,
        event: &str,
        scope: Scope,
        handler: Arc<EventFn>,
    ) -> u64 {
        let slot = self
            .store
            .entry(priority)
            .or_default()
            .entry(module.to_string())
            .or_default();

        if let Some(existing) = slot.get_mut(event) {
            tracing::debug!(
                "Replacing handler for {} ({}, priority {}, id {})",
                event,
                module,
                priority,
                existing.id
            );
            existing.scope = scope;
            existing.handler = handler;
            return existing.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        tracing::debug!("Registering event {} ({}, priority {}, id {})", event, module, priority, id);
        slot.insert(event.to_string(), Registration { id, scope, handler });
        id
    }

    /// Registrations for `event` in dispatch order
    pub fn frames(&self, event: &str) -> Vec<Frame> {
        self.all_frames()
            .into_iter()
            .filter(|f| f.event == event)
            .collect()
    }

    /// Every registration, by priority then module then event name
    pub fn all_frames(&self) -> Vec<Frame> {
        let mut frames = Vec::new();
        for (priority, modules) in &self.store {
            for (module, events) in modules {
                for (event, reg) in events {
                    frames.push(Frame {
                        id: reg.id,
                        priority: *priority,
                        module: module.clone(),
                        event: event.clone(),
                        scope: reg.scope,
                    });
                }
            }
        }
        frames
    }

    /// Run every handler for `event` and collect the results
    pub fn dispatch(&self, event: &str, config: &mut Value, args: &EventArgs) -> Vec<Dispatched> {
        let mut results = Vec::new();
        for (priority, modules) in &self.store {
            for (module, events) in modules {
                let Some(reg) = events.get(event) else {
                    continue;
                };
                let result = match reg.scope {
                    Scope::Local => (reg.handler)(subtree_mut(config, module), args),
                    Scope::Global => (reg.handler)(config, args),
                };
                results.push(Dispatched {
                    result,
                    module: module.clone(),
                    priority: *priority,
                    id: reg.id,
                });
            }
        }
        tracing::trace!("Dispatched {} to {} handler(s)", event, results.len());
        results
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.store
            .values()
            .flat_map(|modules| modules.values())
            .map(|events| events.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every registration as a text table
    pub fn table(&self, order: TableOrder) -> String {
        let mut frames = self.all_frames();
        match order {
            TableOrder::Priority => {}
            TableOrder::Id => frames.sort_by_key(|f| f.id),
            TableOrder::Module => {
                frames.sort_by(|a, b| a.module.cmp(&b.module).then(a.id.cmp(&b.id)))
            }
            TableOrder::Event => frames.sort_by(|a, b| a.event.cmp(&b.event).then(a.id.cmp(&b.id))),
        }

        let rows: Vec<[String; 5]> = frames
            .iter()
            .map(|f| {
                [
                    f.id.to_string(),
                    f.priority.to_string(),
                    f.module.clone(),
                    f.event.clone(),
                    f.scope.to_string(),
                ]
            })
            .collect();

        let headers = ["ID", "Priority", "Module", "Event", "ConfigAccess"];
        let mut widths = headers.map(str::len);
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let render = |cells: &[&str]| {
            let mut line = String::new();
            for (cell, w) in cells.iter().zip(widths) {
                line.push_str(&format!("| {:^w$} ", cell, w = w));
            }
            line.push('|');
            line
        };

        let mut lines = vec![render(&headers)];
        let mut rule = String::new();
        for w in widths {
            rule.push('+');
            rule.push_str(&"-".repeat(w + 2));
        }
        rule.push('+');
        lines.push(rule);
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            lines.push(render(&cells));
        }
        lines.join("\n")
    }
}
