//! Resolves a cascade manifest and renders the result

use crate::settings::{OutputFormat, Settings};
use anyhow::{anyhow, Context, Result};
use cascade::{DocumentStore, Manifest, ManifestLoader, SourceKind};
use document_client::HttpDocumentStore;
use std::sync::Arc;
use tracing::info;
use types::{get_path, Value};

/// One resolution run of the `cascade-config` binary
pub struct Application {
    settings: Settings,
    store: Arc<dyn DocumentStore>,
}

impl Application {
    pub fn new(settings: Settings) -> Result<Self> {
        let store = HttpDocumentStore::new(settings.store_timeout_seconds)
            .context("Failed to create document store client")?;

        Ok(Self {
            settings,
            store: Arc::new(store),
        })
    }

    /// Resolve the manifest and render the tree, or the value at `get`
    ///
    /// `trailing_args` feed every `args` source that has no explicit input.
    pub async fn run(&self, get: Option<&str>, trailing_args: &[String]) -> Result<String> {
        let manifest = ManifestLoader::load(&self.settings.manifest).with_context(|| {
            format!(
                "Failed to load manifest {}",
                self.settings.manifest.display()
            )
        })?;
        let manifest = self.apply_settings(manifest, trailing_args);

        let mut cascade = ManifestLoader::into_cascade(manifest, Some(self.store.clone()))?;
        info!(
            env = %cascade.env_name(),
            sources = cascade.len(),
            "Resolving manifest"
        );
        let tree = cascade
            .resolve()
            .await
            .context("Failed to resolve configuration")?;

        let selected = match get {
            Some(path) => get_path(&tree, path)
                .ok_or_else(|| anyhow!("No configuration value at {}", path))?,
            None => &tree,
        };
        render(selected, self.settings.output_format)
    }

    fn apply_settings(&self, mut manifest: Manifest, trailing_args: &[String]) -> Manifest {
        if let Some(env_name) = &self.settings.env_name {
            manifest.env_name = Some(env_name.clone());
        }
        if let Some(roots) = &self.settings.file_roots {
            manifest.file_roots = Some(roots.clone());
        }
        for spec in &mut manifest.sources {
            if spec.kind == SourceKind::Args && spec.input.is_none() {
                spec.input = Some(trailing_args.to_vec());
            }
        }
        manifest
    }
}

/// Serialize `value` in the requested format
pub fn render(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to render JSON output")
        }
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to render YAML output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn settings_for(manifest: PathBuf) -> Settings {
        Settings {
            manifest,
            ..Settings::default()
        }
    }

    #[test]
    fn test_render_formats() {
        let value = Value::from(serde_json::json!({"a": {"b": [1, true]}}));
        let json = render(&value, OutputFormat::Json).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&json).unwrap(),
            serde_json::json!({"a": {"b": [1, true]}})
        );
        let yaml = render(&value, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("b:"));
    }

    #[tokio::test]
    async fn test_run_with_trailing_args_and_remote() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/config/ci/worker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_id": "worker",
                "queue": "jobs-{env}"
            })))
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("cascade.yaml");
        std::fs::write(
            &manifest_path,
            format!(
                r#"
env_name: development
sources:
  - kind: obj
    value:
      store: "{uri}"
  - kind: args
  - kind: remote
    url: "{{store}}"
    db: config
    coll: "{{env}}"
    id: worker
    mount: worker
"#,
                uri = mock_server.uri()
            ),
        )
        .unwrap();

        let mut settings = settings_for(manifest_path);
        settings.env_name = Some("ci".to_string());
        let app = Application::new(settings).unwrap();

        let args = vec!["--threads".to_string(), "8".to_string()];
        let output = app.run(Some("worker"), &args).await.unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&output).unwrap(),
            serde_json::json!({"queue": "jobs-ci"})
        );

        let output = app.run(Some("threads"), &args).await.unwrap();
        assert_eq!(output, "8");
    }

    #[tokio::test]
    async fn test_missing_manifest_and_path() {
        let dir = TempDir::new().unwrap();
        let app = Application::new(settings_for(dir.path().join("absent.yaml"))).unwrap();
        assert!(app.run(None, &[]).await.is_err());

        let manifest_path = dir.path().join("cascade.yaml");
        std::fs::write(&manifest_path, "sources:\n  - kind: obj\n    value: {a: 1}\n").unwrap();
        let app = Application::new(settings_for(manifest_path)).unwrap();
        assert!(app.run(Some("b"), &[]).await.is_err());
        assert_eq!(app.run(Some("a"), &[]).await.unwrap(), "1");
    }
}
