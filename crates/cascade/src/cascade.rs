//! Cascade engine: ordered task registration and sequential resolution

use crate::coerce::{CoercionRegistry, FileAccessPolicy};
use crate::expand::Expander;
use crate::live::LiveConfig;
use crate::merge::merge_into;
use crate::sources::{
    ArgsSource, DirectorySource, DocumentStore, EnvFileSource, EnvSource, FileSource,
    ObjectSource, RemoteOptions, RemoteSource, Source, SourceContext, SourceOptions, YamlSource,
    DEFAULT_DIRECTORY_ROOT,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::{CascadeError, Result, Value};

/// Environment variable naming the current environment
pub const ENV_NAME_VAR: &str = "CASCADE_ENV";

/// Environment name used when none is configured
pub const DEFAULT_ENV_NAME: &str = "development";

/// One queued source and where its result is merged
struct Task {
    source: Box<dyn Source>,
    mount: Option<String>,
}

/// Options for [`CascadeConfig::done`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DoneOptions {
    /// Hand back a [`LiveConfig`] instead of a plain tree
    pub extended: bool,
}

/// Outcome of [`CascadeConfig::done`]
#[derive(Debug)]
pub enum Resolution {
    Tree(Value),
    Live(LiveConfig),
}

/// Builder and executor for a configuration cascade
///
/// Builder calls only queue tasks. Resolution clears the accumulated tree,
/// then runs every task once, in registration order, each one completing
/// before the next starts. The first failing task aborts the rest.
pub struct CascadeConfig {
    tasks: Vec<Task>,
    config: Value,
    env_name: String,
    expander: Expander,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CascadeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeConfig")
            .field(
                "tasks",
                &self.tasks.iter().map(|t| t.source.name()).collect::<Vec<_>>(),
            )
            .field("env_name", &self.env_name)
            .finish()
    }
}

impl CascadeConfig {
    /// Create an empty cascade; the environment name comes from `CASCADE_ENV`
    pub fn new() -> Self {
        let env_name =
            std::env::var(ENV_NAME_VAR).unwrap_or_else(|_| DEFAULT_ENV_NAME.to_string());
        Self {
            tasks: Vec::new(),
            config: Value::object(),
            env_name,
            expander: Expander::default(),
        }
    }

    /// Override the environment name exposed to location templates as `{env}`
    pub fn with_env_name(mut self, env_name: impl Into<String>) -> Self {
        self.env_name = env_name.into();
        self
    }

    /// Restrict which paths the `#file`/`#jsfile`/`#yamlfile` tags may read
    pub fn with_file_access(mut self, policy: FileAccessPolicy) -> Self {
        self.expander = Expander::new(CoercionRegistry::new(policy));
        self
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Queue an arbitrary source, merged below `mount` when given
    pub fn source(mut self, source: impl Source + 'static, mount: Option<String>) -> Self {
        self.tasks.push(Task {
            source: Box::new(source),
            mount,
        });
        self
    }

    /// Queue a literal tree
    pub fn obj(self, value: impl Into<Value>) -> Self {
        self.source(ObjectSource::new(value), None)
    }

    /// Queue a literal tree merged below `mount`
    pub fn obj_at(self, value: impl Into<Value>, mount: impl Into<String>) -> Self {
        self.source(ObjectSource::new(value), Some(mount.into()))
    }

    /// Queue the process command-line arguments
    pub fn args(self, options: SourceOptions) -> Self {
        let mount = options.mount.clone();
        self.source(ArgsSource::new(options), mount)
    }

    /// Queue an explicit argument list
    pub fn args_from(self, input: Vec<String>, options: SourceOptions) -> Self {
        let mount = options.mount.clone();
        self.source(ArgsSource::from_input(input, options), mount)
    }

    /// Queue the process environment
    pub fn env(self, options: SourceOptions) -> Self {
        let mount = options.mount.clone();
        self.source(EnvSource::new(options), mount)
    }

    /// Queue an explicit set of environment-style variables
    pub fn env_from(
        self,
        vars: impl IntoIterator<Item = (String, String)>,
        options: SourceOptions,
    ) -> Self {
        let mount = options.mount.clone();
        self.source(EnvSource::from_vars(vars, options), mount)
    }

    /// Queue a JSON (or YAML, by extension) file
    pub fn file(self, template: impl Into<String>, options: SourceOptions) -> Self {
        let mount = options.mount.clone();
        self.source(FileSource::new(template, options), mount)
    }

    /// Queue a dotenv file
    pub fn envfile(self, template: impl Into<String>, options: SourceOptions) -> Self {
        let mount = options.mount.clone();
        self.source(EnvFileSource::new(template, options), mount)
    }

    /// Queue a YAML file
    pub fn yaml(self, template: impl Into<String>, options: SourceOptions) -> Self {
        let mount = options.mount.clone();
        self.source(YamlSource::new(template, options), mount)
    }

    /// Queue a directory tree of data files rooted at `files` (default `etc`)
    ///
    /// Only `mount` applies; key filters and `ignore_missing` are logged and
    /// dropped since a missing root already contributes nothing.
    pub fn directory(self, files: Option<String>, options: SourceOptions) -> Self {
        let root = files.unwrap_or_else(|| DEFAULT_DIRECTORY_ROOT.to_string());
        if options.regexp.is_some() || options.prefix.is_some() || options.ignore_missing {
            warn!(root = %root, "Directory sources ignore regexp, prefix and ignore_missing");
        }
        self.source(DirectorySource::new(root), options.mount)
    }

    /// Queue one document from a remote store
    pub fn remote(
        self,
        location: RemoteOptions,
        store: Arc<dyn DocumentStore>,
        options: SourceOptions,
    ) -> Self {
        self.source(RemoteSource::new(location, store), options.mount)
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The accumulated tree; after a failure it holds what earlier tasks merged
    pub fn accumulator(&self) -> &Value {
        &self.config
    }

    pub(crate) fn accumulator_mut(&mut self) -> &mut Value {
        &mut self.config
    }

    /// Run every task from scratch and return the merged tree
    pub async fn resolve(&mut self) -> Result<Value> {
        self.config = Value::object();
        info!(
            tasks = self.tasks.len(),
            env = %self.env_name,
            "Resolving configuration cascade"
        );

        for (index, task) in self.tasks.iter().enumerate() {
            let name = task.source.name();
            debug!(task = index, source = %name, mount = ?task.mount, "Loading source");

            let ctx = SourceContext {
                config: &self.config,
                env_name: &self.env_name,
                expander: &self.expander,
            };
            let value = task.source.load(&ctx).await.map_err(|e| {
                warn!(task = index, source = %name, error = %e, "Source failed, aborting cascade");
                e
            })?;

            if !merge_into(&mut self.config, value, task.mount.as_deref()) {
                warn!(task = index, source = %name, "Source produced a scalar root, aborting cascade");
                return Err(CascadeError::parse(
                    name,
                    "top-level value must be a mapping or an array",
                ));
            }
        }

        info!("Configuration cascade resolved");
        Ok(self.config.clone())
    }

    /// Terminal call: resolve into a plain tree or a [`LiveConfig`]
    pub async fn done(mut self, options: DoneOptions) -> Result<Resolution> {
        if options.extended {
            LiveConfig::load(self).await.map(Resolution::Live)
        } else {
            self.resolve().await.map(Resolution::Tree)
        }
    }
}
