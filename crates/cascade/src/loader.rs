//! Manifest loader: YAML manifest plus environment overrides into a cascade

use crate::cascade::{CascadeConfig, ENV_NAME_VAR};
use crate::coerce::FileAccessPolicy;
use crate::schema::{Manifest, SourceKind, SourceSpec};
use crate::sources::{DocumentStore, ObjectSource, RemoteOptions, SourceOptions};
use crate::validation::ManifestValidator;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use types::{CascadeError, Result, Value};

/// Loads cascade manifests from YAML files and environment variables
pub struct ManifestLoader;

/// Figment provider mapping `CASCADE_ENV` onto an `env_name` key
pub fn env_name_provider() -> Env {
    env_name_from(ENV_NAME_VAR)
}

fn env_name_from(var: &str) -> Env {
    Env::raw().only(&[var]).map(|_| "env_name".into())
}

impl ManifestLoader {
    /// Load a manifest from file, with `CASCADE_ENV` overriding `env_name`
    pub fn load<P: AsRef<Path>>(manifest_path: P) -> Result<Manifest> {
        let manifest_path = manifest_path.as_ref();

        if !manifest_path.exists() {
            return Err(CascadeError::NotFound {
                path: manifest_path.display().to_string(),
            });
        }

        let manifest: Manifest = Figment::new()
            .merge(Yaml::file(manifest_path))
            .merge(env_name_provider())
            .extract()
            .map_err(|e| CascadeError::Manifest(format!("Failed to parse manifest: {}", e)))?;

        Self::validate(&manifest)?;
        info!(
            path = %manifest_path.display(),
            sources = manifest.sources.len(),
            "Loaded cascade manifest"
        );
        Ok(manifest)
    }

    /// Load a manifest from a YAML string
    pub fn load_from_str(yaml_content: &str) -> Result<Manifest> {
        let manifest: Manifest = Figment::new()
            .merge(Yaml::string(yaml_content))
            .extract()
            .map_err(|e| CascadeError::Manifest(format!("Failed to parse manifest: {}", e)))?;

        Self::validate(&manifest)?;
        Ok(manifest)
    }

    fn validate(manifest: &Manifest) -> Result<()> {
        let report = ManifestValidator::validate(manifest);
        for issue in report.warnings() {
            warn!(field = %issue.location(), "{}", issue.message);
        }
        report.into_result()
    }

    /// Build a cascade from a validated manifest
    ///
    /// `store` backs `remote` sources; a manifest that declares one without a
    /// store is rejected.
    pub fn into_cascade(
        manifest: Manifest,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> Result<CascadeConfig> {
        let mut cascade = CascadeConfig::new();
        if let Some(env_name) = manifest.env_name {
            cascade = cascade.with_env_name(env_name);
        }
        if let Some(roots) = manifest.file_roots {
            cascade = cascade.with_file_access(FileAccessPolicy::AllowList(roots));
        }

        for (index, spec) in manifest.sources.into_iter().enumerate() {
            let options = source_options(index, &spec)?;
            cascade = match spec.kind {
                SourceKind::Obj => {
                    let value = spec.value.map(Value::from).unwrap_or_else(Value::object);
                    cascade.source(ObjectSource::new(value), options.mount)
                }
                SourceKind::Args => match spec.input {
                    Some(input) => cascade.args_from(input, options),
                    None => cascade.args(options),
                },
                SourceKind::Env => cascade.env(options),
                SourceKind::File => cascade.file(required(index, "path", spec.path)?, options),
                SourceKind::Envfile => {
                    cascade.envfile(required(index, "path", spec.path)?, options)
                }
                SourceKind::Yaml => cascade.yaml(required(index, "path", spec.path)?, options),
                SourceKind::Directory => cascade.directory(spec.files, options),
                SourceKind::Remote => {
                    let store = store.clone().ok_or_else(|| {
                        CascadeError::Manifest(format!(
                            "sources[{}]: remote source declared but no document store configured",
                            index
                        ))
                    })?;
                    let location = RemoteOptions {
                        url: required(index, "url", spec.url)?,
                        db: required(index, "db", spec.db)?,
                        coll: required(index, "coll", spec.coll)?,
                        id: required(index, "id", spec.id)?,
                    };
                    cascade.remote(location, store, options)
                }
            };
        }

        Ok(cascade)
    }
}

fn source_options(index: usize, spec: &SourceSpec) -> Result<SourceOptions> {
    let mut options = SourceOptions::new();
    if let Some(pattern) = &spec.regexp {
        let regexp = Regex::new(pattern).map_err(|e| {
            CascadeError::Manifest(format!("sources[{}].regexp: {}", index, e))
        })?;
        options = options.regexp(regexp);
    }
    if let Some(prefix) = &spec.prefix {
        options = options.prefix(prefix.clone());
    }
    if spec.ignore_missing {
        options = options.ignore_missing();
    }
    if let Some(mount) = &spec.mount {
        options = options.mount(mount.clone());
    }
    Ok(options)
}

fn required(index: usize, field: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| {
        CascadeError::Manifest(format!("sources[{}].{} is required", index, field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{DoneOptions, Resolution};
    use serde_json::json;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_from_string() {
        let yaml_content = r#"
env_name: staging
sources:
  - kind: obj
    value:
      port: 8080
  - kind: env
    prefix: APP_
    mount: app
  - kind: file
    path: "etc/{env}.json"
    ignore_missing: true
"#;

        let manifest = ManifestLoader::load_from_str(yaml_content).unwrap();
        assert_eq!(manifest.env_name.as_deref(), Some("staging"));
        assert_eq!(manifest.sources.len(), 3);
        assert_eq!(manifest.sources[1].kind, SourceKind::Env);
        assert_eq!(manifest.sources[1].mount.as_deref(), Some("app"));
        assert!(manifest.sources[2].ignore_missing);
    }

    #[test]
    fn test_validation_errors() {
        let result = ManifestLoader::load_from_str("sources:\n  - kind: yaml\n");
        assert!(matches!(result, Err(CascadeError::Manifest(_))));

        let result = ManifestLoader::load_from_str("sources:\n  - kind: nonsense\n");
        assert!(matches!(result, Err(CascadeError::Manifest(_))));
    }

    #[test]
    fn test_env_name_variable_overrides_manifest() {
        std::env::set_var("CASCADE_LOADER_TEST_ENV", "qa");
        let manifest: Manifest = Figment::new()
            .merge(Yaml::string("env_name: production\nsources: []\n"))
            .merge(env_name_from("CASCADE_LOADER_TEST_ENV"))
            .extract()
            .unwrap();
        std::env::remove_var("CASCADE_LOADER_TEST_ENV");
        assert_eq!(manifest.env_name.as_deref(), Some("qa"));

        let manifest: Manifest = Figment::new()
            .merge(Yaml::string("env_name: production\nsources: []\n"))
            .merge(env_name_from("CASCADE_LOADER_TEST_UNSET"))
            .extract()
            .unwrap();
        assert_eq!(manifest.env_name.as_deref(), Some("production"));
    }

    #[test]
    fn test_missing_manifest_file() {
        let dir = TempDir::new().unwrap();
        let result = ManifestLoader::load(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(CascadeError::NotFound { .. })));
    }

    #[test]
    fn test_remote_without_store_is_rejected() {
        let manifest = ManifestLoader::load_from_str(
            r#"
sources:
  - kind: remote
    url: "http://localhost:5984"
    db: config
    coll: "{env}"
    id: api
"#,
        )
        .unwrap();
        let result = ManifestLoader::into_cascade(manifest, None);
        assert!(matches!(result, Err(CascadeError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_manifest_file_resolves() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("qa.json"),
            r##"{"db": {"port": "#int:{base}"}}"##,
        )
        .unwrap();

        let mut manifest_file = NamedTempFile::new().unwrap();
        write!(
            manifest_file,
            r#"
env_name: qa
sources:
  - kind: obj
    value:
      base: "5432"
  - kind: file
    path: "{dir}/{{env}}.json"
  - kind: file
    path: "{dir}/missing.json"
    ignore_missing: true
  - kind: args
    input: ["--db__host", "localhost", "--skip"]
    regexp: "^db\\."
"#,
            dir = dir.path().display()
        )
        .unwrap();

        let manifest = ManifestLoader::load(manifest_file.path()).unwrap();
        let cascade = ManifestLoader::into_cascade(manifest, None).unwrap();
        assert_eq!(cascade.len(), 4);
        assert_eq!(cascade.env_name(), "qa");

        let Resolution::Tree(tree) = cascade.done(DoneOptions::default()).await.unwrap() else {
            panic!("expected a plain tree");
        };
        assert_eq!(
            tree,
            Value::from(json!({"base": "5432", "db": {"port": 5432, "host": "localhost"}}))
        );
    }
}
