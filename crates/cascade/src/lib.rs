//! Cascading configuration loader
//!
//! A [`CascadeConfig`] queues sources (literal trees, command-line flags,
//! environment variables, dotenv files, JSON/YAML files, directory trees and
//! remote documents) and resolves them in order into one merged [`Value`]
//! tree. Each source can read the configuration merged before it, both in
//! its location template and in `{path:default}` placeholders inside its
//! values, and tagged strings such as `#int:8080` are coerced after
//! substitution.

pub mod cascade;
pub mod coerce;
pub mod expand;
pub mod format;
pub mod interpolate;
pub mod live;
pub mod loader;
pub mod merge;
pub mod schema;
pub mod sources;
pub mod validation;

pub use cascade::{CascadeConfig, DoneOptions, Resolution, DEFAULT_ENV_NAME, ENV_NAME_VAR};
pub use coerce::{CoercionRegistry, FileAccessPolicy, Tag};
pub use expand::Expander;
pub use interpolate::interpolate;
pub use live::{ChangeListener, LiveConfig};
pub use loader::{env_name_provider, ManifestLoader};
pub use merge::{deep_merge, deep_merge_all, merge_into};
pub use schema::{Manifest, SourceKind, SourceSpec};
pub use sources::{DocumentLocation, DocumentStore, RemoteOptions, Source, SourceContext, SourceOptions};
pub use types::{CascadeError, Result, Value};
pub use validation::{ManifestIssue, ManifestValidator, Severity, ValidationReport};
