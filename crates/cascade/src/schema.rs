//! Cascade manifest schema definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Declarative description of a cascade
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Environment name exposed to templates as `{env}`
    #[serde(default)]
    pub env_name: Option<String>,
    /// Roots the file-reading coercion tags are confined to; unrestricted when absent
    #[serde(default)]
    pub file_roots: Option<Vec<PathBuf>>,
    /// Sources in merge order
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

/// Kind of a manifest source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Obj,
    Args,
    Env,
    File,
    Envfile,
    Yaml,
    Directory,
    Remote,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceKind::Obj => "obj",
            SourceKind::Args => "args",
            SourceKind::Env => "env",
            SourceKind::File => "file",
            SourceKind::Envfile => "envfile",
            SourceKind::Yaml => "yaml",
            SourceKind::Directory => "directory",
            SourceKind::Remote => "remote",
        };
        f.write_str(name)
    }
}

/// One source entry; which fields apply depends on `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub kind: SourceKind,
    /// Literal tree (`obj`)
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Location template (`file`, `envfile`, `yaml`)
    #[serde(default)]
    pub path: Option<String>,
    /// Root directory template (`directory`)
    #[serde(default)]
    pub files: Option<String>,
    /// Explicit argument list (`args`); the process arguments otherwise
    #[serde(default)]
    pub input: Option<Vec<String>>,
    /// Document store base URL template (`remote`)
    #[serde(default)]
    pub url: Option<String>,
    /// Database template (`remote`)
    #[serde(default)]
    pub db: Option<String>,
    /// Collection template (`remote`)
    #[serde(default)]
    pub coll: Option<String>,
    /// Document id template (`remote`)
    #[serde(default)]
    pub id: Option<String>,
    /// Key filter pattern
    #[serde(default)]
    pub regexp: Option<String>,
    /// Key prefix filter, stripped from kept keys
    #[serde(default)]
    pub prefix: Option<String>,
    /// Missing location yields an empty tree
    #[serde(default)]
    pub ignore_missing: bool,
    /// Merge below this path
    #[serde(default)]
    pub mount: Option<String>,
}

impl SourceSpec {
    /// An entry of `kind` with every optional field unset
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            value: None,
            path: None,
            files: None,
            input: None,
            url: None,
            db: None,
            coll: None,
            id: None,
            regexp: None,
            prefix: None,
            ignore_missing: false,
            mount: None,
        }
    }
}
