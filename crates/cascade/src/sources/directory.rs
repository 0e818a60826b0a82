//! Recursive directory source

use super::{Source, SourceContext};
use crate::format::{load_data_file, DataFormat};
use crate::interpolate::interpolate;
use crate::merge::merge_into;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use types::{CascadeError, Result, Value};
use walkdir::WalkDir;

/// Root used when no `files` template is given
pub const DEFAULT_DIRECTORY_ROOT: &str = "etc";

/// Mirrors a directory hierarchy of data files into the tree
///
/// `root/d1/f1.json` lands at `d1.f1`; dots inside names become underscores.
/// A missing root contributes nothing.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Source for DirectorySource {
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value> {
        let values = ctx.template_values();
        let root = PathBuf::from(interpolate(&self.root, &values));
        let display = root.display().to_string();

        let tree = tokio::task::spawn_blocking(move || read_tree(&root))
            .await
            .map_err(|e| CascadeError::Io {
                path: display,
                message: e.to_string(),
            })??;

        Ok(ctx.expander.expand(tree, &values))
    }

    fn name(&self) -> String {
        format!("directory({})", self.root)
    }
}

fn read_tree(root: &Path) -> Result<Value> {
    let mut merged = Value::object();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_missing_root(&e, root) => {
                debug!(root = %root.display(), "Directory root missing, treating as empty");
                return Ok(Value::object());
            }
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Error reading configuration directory");
                let path = e.path().unwrap_or(root).display().to_string();
                return Err(match e.into_io_error() {
                    Some(io) => CascadeError::from_io(path, io),
                    None => CascadeError::Io {
                        path,
                        message: "filesystem loop".to_string(),
                    },
                });
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if !DataFormat::is_data_file(entry.path()) {
            debug!(path = %entry.path().display(), "Skipping non-data file");
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let key = tree_key(relative);
        let data = load_data_file(entry.path())?;
        debug!(path = %entry.path().display(), key = %key, "Loaded directory entry");
        // A non-empty mount always merges
        merge_into(&mut merged, data, Some(&key));
    }

    Ok(merged)
}

fn is_missing_root(err: &walkdir::Error, root: &Path) -> bool {
    err.path() == Some(root)
        && err
            .io_error()
            .map(|io| io.kind() == std::io::ErrorKind::NotFound)
            .unwrap_or(false)
}

/// `d1/f.1.json` -> `d1.f_1`
fn tree_key(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().replace('.', "_")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}
