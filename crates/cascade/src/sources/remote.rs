//! Remote document source

use super::{Source, SourceContext};
use crate::interpolate::interpolate;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use types::{Result, Value};

/// Identity field removed from fetched documents
pub const IDENTITY_FIELD: &str = "_id";

/// Where a single document lives, after template resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    pub url: String,
    pub db: String,
    pub coll: String,
    pub id: String,
}

/// A store that can fetch one document by id
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the document, `None` when it does not exist
    async fn fetch(&self, location: &DocumentLocation) -> Result<Option<Value>>;

    /// Name of the store implementation
    fn name(&self) -> &str;
}

/// Templates for the document location
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    pub url: String,
    pub db: String,
    pub coll: String,
    pub id: String,
}

/// Fetches one document from a [`DocumentStore`]
pub struct RemoteSource {
    options: RemoteOptions,
    store: Arc<dyn DocumentStore>,
}

impl RemoteSource {
    pub fn new(options: RemoteOptions, store: Arc<dyn DocumentStore>) -> Self {
        Self { options, store }
    }

    fn location(&self, values: &Value) -> DocumentLocation {
        DocumentLocation {
            url: interpolate(&self.options.url, values),
            db: interpolate(&self.options.db, values),
            coll: interpolate(&self.options.coll, values),
            id: interpolate(&self.options.id, values),
        }
    }
}

impl fmt::Debug for RemoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSource")
            .field("options", &self.options)
            .field("store", &self.store.name())
            .finish()
    }
}

#[async_trait]
impl Source for RemoteSource {
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value> {
        let values = ctx.template_values();
        let location = self.location(&values);

        let document = match self.store.fetch(&location).await? {
            Some(mut document) => {
                if let Some(map) = document.as_object_mut() {
                    map.remove(IDENTITY_FIELD);
                }
                document
            }
            None => {
                debug!(db = %location.db, coll = %location.coll, id = %location.id, "Remote document not found");
                Value::object()
            }
        };

        Ok(ctx.expander.expand(document, &values))
    }

    fn name(&self) -> String {
        format!(
            "remote({}/{}/{})",
            self.options.db, self.options.coll, self.options.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::Expander;
    use serde_json::json;
    use std::sync::Mutex;
    use types::CascadeError;

    struct StubStore {
        document: Option<Value>,
        seen: Mutex<Vec<DocumentLocation>>,
        fail: bool,
    }

    #[async_trait]
    impl DocumentStore for StubStore {
        async fn fetch(&self, location: &DocumentLocation) -> Result<Option<Value>> {
            self.seen.lock().unwrap().push(location.clone());
            if self.fail {
                return Err(CascadeError::Upstream {
                    service: "stub".to_string(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(self.document.clone())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn options() -> RemoteOptions {
        RemoteOptions {
            url: "http://{db_host:localhost}:5984".to_string(),
            db: "config".to_string(),
            coll: "{env}".to_string(),
            id: "{service}".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetches_resolved_location_and_strips_identity() {
        let store = Arc::new(StubStore {
            document: Some(Value::from(json!({"_id": "api", "port": "#int:{base_port}"}))),
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let expander = Expander::default();
        let config = Value::from(json!({"service": "api", "base_port": 8080}));
        let ctx = SourceContext {
            config: &config,
            env_name: "staging",
            expander: &expander,
        };

        let value = RemoteSource::new(options(), store.clone())
            .load(&ctx)
            .await
            .unwrap();
        assert_eq!(value, Value::from(json!({"port": 8080})));
        assert_eq!(
            store.seen.lock().unwrap()[0],
            DocumentLocation {
                url: "http://localhost:5984".to_string(),
                db: "config".to_string(),
                coll: "staging".to_string(),
                id: "api".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_not_found_is_empty_and_failure_propagates() {
        let expander = Expander::default();
        let config = Value::object();
        let ctx = SourceContext {
            config: &config,
            env_name: "development",
            expander: &expander,
        };

        let missing = Arc::new(StubStore {
            document: None,
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let value = RemoteSource::new(options(), missing).load(&ctx).await.unwrap();
        assert_eq!(value, Value::object());

        let failing = Arc::new(StubStore {
            document: None,
            seen: Mutex::new(Vec::new()),
            fail: true,
        });
        let err = RemoteSource::new(options(), failing).load(&ctx).await.unwrap_err();
        assert!(matches!(err, CascadeError::Upstream { .. }));
    }
}
