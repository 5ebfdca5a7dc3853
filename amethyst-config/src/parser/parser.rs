//! Parser for Amethyst configuration files
//!
//! Lines are lexed one at a time and assembled into a tree using a stack of
//! open blocks. A line that fails to lex is reported and skipped; parsing
//! carries on so that every problem in the file surfaces in one pass.

use super::ast::{Block, ConfigFile, ConfigNode, Directive, Location};
use super::lexer::{Line, lex_line};
use crate::diagnostics::Diagnostic;
use amethyst_core::ErrorKind;
use std::io;
use std::path::Path;
use thiserror::Error;

/// All problems found while parsing one file
#[derive(Debug, Clone, Error)]
#[error("configuration parsing failed with {} error(s)", .0.len())]
pub struct ParseErrors(pub Vec<Diagnostic>);

impl ParseErrors {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}

struct TreeBuilder {
    file: String,
    root: Vec<ConfigNode>,
    open: Vec<Block>,
    errors: Vec<Diagnostic>,
}

impl TreeBuilder {
    fn new(file: String) -> Self {
        Self {
            file,
            root: Vec::new(),
            open: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn location(&self, line: usize, col: usize) -> Location {
        Location {
            file: self.file.clone(),
            line,
            col,
        }
    }

    fn error(&mut self, line: usize, col: usize, message: impl Into<String>) {
        self.errors.push(
            Diagnostic::error(ErrorKind::Parse, message)
                .in_file(self.file.clone())
                .at_line(line)
                .at_col(col),
        );
    }

    fn append(&mut self, node: ConfigNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn line(&mut self, number: usize, text: &str) {
        let line = match lex_line(text) {
            Ok(line) => line,
            Err(e) => return self.error(number, e.col, e.message),
        };

        match line {
            Line::Blank => {}
            Line::Directive { name, args, col } => {
                let location = self.location(number, col);
                self.append(ConfigNode::Directive(Directive {
                    name,
                    args,
                    location,
                    raw: text.to_string(),
                }));
            }
            Line::Open { name, args, col } => {
                let location = self.location(number, col);
                self.open.push(Block {
                    name,
                    args,
                    children: Vec::new(),
                    location,
                    raw: text.to_string(),
                });
            }
            Line::Close { name, end, .. } => match self.open.last().map(|b| b.name.clone()) {
                Some(expected) if expected == name => {
                    if let Some(block) = self.open.pop() {
                        self.append(ConfigNode::Block(block));
                    }
                }
                Some(expected) => self.error(
                    number,
                    end,
                    format!("expected closing block for {} but got {}", expected, name),
                ),
                None => self.error(number, end, format!("unexpected closing block for {}", name)),
            },
        }
    }

    fn finish(mut self, lines: usize, last_len: usize) -> Result<Vec<ConfigNode>, ParseErrors> {
        if !self.open.is_empty() {
            self.error(lines, last_len + 1, "blocks still left on the stack");
        }
        if self.errors.is_empty() {
            Ok(self.root)
        } else {
            Err(ParseErrors(self.errors))
        }
    }
}

/// Parse configuration text; `file` is used for node locations and diagnostics
pub fn parse(source: &str, file: impl AsRef<Path>) -> Result<ConfigFile, ParseErrors> {
    let path = file.as_ref();
    let mut builder = TreeBuilder::new(path.display().to_string());

    let mut lines = 0;
    let mut last_len = 0;
    for (idx, raw) in source.split('\n').enumerate() {
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        builder.line(idx + 1, text);
        lines = idx + 1;
        last_len = text.chars().count();
    }

    let nodes = builder.finish(lines, last_len)?;
    tracing::debug!("Parsed {} top-level statement(s) from {}", nodes.len(), path.display());
    Ok(ConfigFile {
        path: path.to_path_buf(),
        nodes,
    })
}

/// Read and parse a configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<ConfigFile, ParseErrors> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| {
        let message = match e.kind() {
            io::ErrorKind::NotFound => "no such file".to_string(),
            io::ErrorKind::PermissionDenied => "insufficient permissions".to_string(),
            _ => e.to_string(),
        };
        ParseErrors(vec![
            Diagnostic::error(ErrorKind::Io, message).in_file(path.display().to_string()),
        ])
    })?;
    parse(&source, path)
}
