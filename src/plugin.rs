use std::path::{Path, PathBuf};

use crate::constant;

/// A plugin file found on disk, with the category implied by its location
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginFile {
    pub path: PathBuf,
    /// Name of the directory the file sits in, or None for files at the root
    pub directory_category: Option<String>,
}

impl PluginFile {
    pub fn category(&self) -> &str {
        self.directory_category
            .as_deref()
            .unwrap_or(constant::DEFAULT_CATEGORY)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to evaluate: {0}")]
    Load(String),
    #[error("did not return a table")]
    NotATable,
    #[error("missing `name`")]
    MissingName,
    #[error("missing a `run` function")]
    MissingRun,
    #[error("option `{option}` has unknown type `{kind}`")]
    UnknownOptionType { option: String, kind: String },
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl From<mlua::Error> for PluginError {
    fn from(err: mlua::Error) -> Self {
        PluginError::Load(err.to_string())
    }
}

/// A plugin file that was skipped while loading
#[derive(Debug)]
pub struct LoadDiagnostic {
    pub path: PathBuf,
    pub error: PluginError,
}

/// Recursively collects plugin files beneath `root`, sorted by path so load
/// order (and therefore alias precedence) is stable. Unreadable directories
/// contribute nothing.
pub fn discover(root: &Path) -> Vec<PluginFile> {
    let mut out = vec![];
    walk(root, None, &mut out);
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

fn walk(dir: &Path, category: Option<&str>, out: &mut Vec<PluginFile>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let name = name.to_string();
            walk(&path, Some(&name), out);
        } else if is_plugin(&path) {
            out.push(PluginFile {
                path,
                directory_category: category.map(str::to_string),
            });
        }
    }
}

fn is_plugin(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| constant::PLUGIN_EXTENSIONS.contains(&e))
}
