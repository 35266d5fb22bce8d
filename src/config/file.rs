//! Reader for `KEY=VALUE` configuration files in the dotenv format.
//!
//! One assignment per line, `#` starts a comment, an optional `export ` prefix is accepted and
//! values may be wrapped in single or double quotes. `$NAME` in an unquoted or double-quoted
//! value is expanded, single quotes keep it literal. The file is parsed, never executed.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

pub type ConfigFileEntries = BTreeMap<String, String>;

pub fn read_config_file(path: &Path) -> Result<ConfigFileEntries> {
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    entries
        .map(|entry| {
            entry.with_context(|| format!("failed to parse config file {}", path.display()))
        })
        .collect()
}

/// Later assignments of the same key win.
pub fn parse_config_file(content: &str) -> Result<ConfigFileEntries> {
    dotenvy::from_read_iter(content.as_bytes())
        .map(|entry| entry.context("failed to parse config file"))
        .collect()
}
