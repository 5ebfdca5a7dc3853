//! Syntax tree for Amethyst configuration files
//!
//! A file is a flat list of nodes; blocks own their children. Nodes are
//! immutable once parsed and carry the position of their first significant
//! character together with the raw source line.

use std::fmt;
use std::path::PathBuf;

/// Position of a node in its source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// File name as it was given to the parser
    pub file: String,
    /// 1-based line number
    pub line: usize,
    /// 1-based column of the first significant character
    pub col: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// A single-line statement: `Name arg1 "arg 2"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    pub location: Location,
    pub raw: String,
}

/// A tag pair with nested statements: `<Name args> ... </Name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: String,
    pub args: Vec<String>,
    pub children: Vec<ConfigNode>,
    /// Location of the opening tag
    pub location: Location,
    /// Raw text of the opening tag line
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNode {
    Directive(Directive),
    Block(Block),
}

impl ConfigNode {
    pub fn name(&self) -> &str {
        match self {
            ConfigNode::Directive(d) => &d.name,
            ConfigNode::Block(b) => &b.name,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            ConfigNode::Directive(d) => &d.args,
            ConfigNode::Block(b) => &b.args,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            ConfigNode::Directive(d) => &d.location,
            ConfigNode::Block(b) => &b.location,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            ConfigNode::Directive(d) => &d.raw,
            ConfigNode::Block(b) => &b.raw,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, ConfigNode::Block(_))
    }
}

/// A successfully parsed file; zero statements is valid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub nodes: Vec<ConfigNode>,
}

impl ConfigFile {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
