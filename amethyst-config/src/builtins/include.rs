//! `Include <pattern>`
//!
//! The last path segment of the pattern may contain `*` wildcards, each
//! matching one or more characters other than `/`. Matching files are parsed
//! and executed in sorted order against the same configuration object and
//! block stack. A relative pattern is taken relative to the including file.

use super::directives::arg;
use crate::parser::parse_file;
use crate::registry::{BlockStack, Outcome};
use crate::session::Session;
use amethyst_core::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub(super) fn include(
    session: &mut Session,
    config: &mut Value,
    stack: &BlockStack,
    args: &[String],
) -> Outcome {
    let files = match arg(args, 0, "no file pattern given")
        .map(|pattern| session.resolve_relative(Path::new(pattern)))
        .and_then(|pattern| expand(&pattern))
    {
        Ok(files) => files,
        Err(e) => return e.into(),
    };

    let mut failed = false;
    for file in files {
        if session.is_executing(&file) {
            return Error::validation(format!("include cycle detected: {}", file.display())).into();
        }
        tracing::debug!("Including {}", file.display());
        let parsed = parse_file(&file);
        if session.execute(config, stack, &parsed).is_err() {
            failed = true;
        }
    }

    if failed { Outcome::Failed } else { Outcome::Ok }
}

/// Files matched by `pattern`, sorted
///
/// A pattern without wildcards names exactly one file, which need not exist
/// yet; reading it reports the problem.
pub(crate) fn expand(pattern: &Path) -> Result<Vec<PathBuf>> {
    let name = pattern
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::validation(format!("not a file pattern: {}", pattern.display())))?;

    if !name.contains('*') {
        return Ok(vec![pattern.to_path_buf()]);
    }

    let dir = match pattern.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    if dir.to_string_lossy().contains('*') {
        return Err(Error::validation(
            "wildcards are only allowed in the last path segment",
        ));
    }

    let regex = name
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^/]+");
    let regex = Regex::new(&format!("^{regex}$"))
        .map_err(|e| Error::validation(format!("bad file pattern {name:?}: {e}")))?;

    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::validation(format!("cannot read directory {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let matched = entry.file_name().to_str().is_some_and(|n| regex.is_match(n));
        if matched && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
