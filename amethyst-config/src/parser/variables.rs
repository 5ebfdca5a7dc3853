//! Environment variable interpolation
//!
//! Arguments may reference `$NAME` or `${NAME}`. A name starts with an ASCII
//! letter or underscore and continues with letters, digits or underscores.
//! A `$` that does not start a reference is kept literally.
//!
//! Lookups go through [`Environment`], a snapshot owned by the loading
//! session, so `SetEnv`/`UnsetEnv` never touch the process environment.

use std::collections::BTreeMap;
use std::fmt;

/// Environment variables visible to a configuration session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

/// A variable reference that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub name: String,
    pub message: String,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}: {}", self.name, self.message)
    }
}

impl Environment {
    /// Empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the process environment
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove a variable, returning its previous value
    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every `$NAME` and `${NAME}` in `input`
    ///
    /// All unresolved references are collected rather than stopping at the
    /// first one.
    pub fn interpolate(&self, input: &str) -> Result<String, Vec<Unresolved>> {
        let mut result = String::with_capacity(input.len());
        let mut missing = Vec::new();
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }

            match chars.peek() {
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        missing.push(Unresolved {
                            name,
                            message: "unterminated variable reference".to_string(),
                        });
                    } else if !is_identifier(&name) {
                        missing.push(Unresolved {
                            name,
                            message: "invalid variable name".to_string(),
                        });
                    } else {
                        self.substitute(&name, &mut result, &mut missing);
                    }
                }
                Some(&n) if n.is_ascii_alphabetic() || n == '_' => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if !(n.is_ascii_alphanumeric() || n == '_') {
                            break;
                        }
                        name.push(n);
                        chars.next();
                    }
                    self.substitute(&name, &mut result, &mut missing);
                }
                _ => result.push('$'),
            }
        }

        if missing.is_empty() {
            Ok(result)
        } else {
            Err(missing)
        }
    }

    /// Interpolate every argument, collecting failures across all of them
    pub fn interpolate_all(&self, args: &[String]) -> Result<Vec<String>, Vec<Unresolved>> {
        let mut resolved = Vec::with_capacity(args.len());
        let mut missing = Vec::new();
        for arg in args {
            match self.interpolate(arg) {
                Ok(value) => resolved.push(value),
                Err(mut errs) => missing.append(&mut errs),
            }
        }
        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(missing)
        }
    }

    fn substitute(&self, name: &str, out: &mut String, missing: &mut Vec<Unresolved>) {
        match self.get(name) {
            Some(value) => out.push_str(value),
            None => missing.push(Unresolved {
                name: name.to_string(),
                message: "no such environment variable".to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
