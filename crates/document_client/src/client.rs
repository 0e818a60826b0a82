//! HTTP document store implementation

use async_trait::async_trait;
use cascade::{DocumentLocation, DocumentStore};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use types::{DocumentError, Result, Value};

/// Default request timeout for document fetches
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

const STORE_NAME: &str = "http";

/// Fetches documents with `GET {url}/{db}/{coll}/{id}`
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    http_client: Client,
}

impl HttpDocumentStore {
    /// Create a store client with the given request timeout
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("cascade-config/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DocumentError::ConnectionFailed {
                store: STORE_NAME.to_string(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { http_client })
    }

    /// Build the document URL, percent-encoding each path segment
    fn document_url(location: &DocumentLocation) -> std::result::Result<Url, DocumentError> {
        let invalid = |message: String| DocumentError::ConnectionFailed {
            store: location.url.clone(),
            message,
        };

        let mut url = Url::parse(&location.url)
            .map_err(|e| invalid(format!("invalid store URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid("store URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend([&location.db, &location.coll, &location.id]);
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn fetch(&self, location: &DocumentLocation) -> Result<Option<Value>> {
        let url = Self::document_url(location)?;

        tracing::info!(
            db = %location.db,
            coll = %location.coll,
            id = %location.id,
            "Fetching remote configuration document"
        );

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| DocumentError::ConnectionFailed {
                store: location.url.clone(),
                message: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DocumentError::HttpError {
                store: location.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let raw_text = response
            .text()
            .await
            .map_err(|e| DocumentError::InvalidDocument {
                store: location.url.clone(),
                message: format!("error reading response body: {}", e),
            })?;

        parse_document(&location.url, &raw_text)
            .map(Some)
            .map_err(Into::into)
    }

    fn name(&self) -> &str {
        STORE_NAME
    }
}

/// A document must be a JSON object
fn parse_document(store: &str, raw_text: &str) -> std::result::Result<Value, DocumentError> {
    let json: serde_json::Value =
        serde_json::from_str(raw_text).map_err(|e| DocumentError::InvalidDocument {
            store: store.to_string(),
            message: format!("invalid JSON response: {}", e),
        })?;

    if !json.is_object() {
        return Err(DocumentError::InvalidDocument {
            store: store.to_string(),
            message: "document is not a JSON object".to_string(),
        });
    }
    Ok(Value::from(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade::{CascadeConfig, CascadeError, DoneOptions, RemoteOptions, Resolution, SourceOptions};
    use std::sync::Arc;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn location(url: String) -> DocumentLocation {
        DocumentLocation {
            url,
            db: "settings".to_string(),
            coll: "production".to_string(),
            id: "billing service".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_document() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/settings/production/billing%20service"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_id": "billing service",
                "port": 9000
            })))
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(5).unwrap();
        let document = store.fetch(&location(mock_server.uri())).await.unwrap();
        assert_eq!(
            document,
            Some(Value::from(serde_json::json!({"_id": "billing service", "port": 9000})))
        );
    }

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(5).unwrap();
        let document = store.fetch(&location(mock_server.uri())).await.unwrap();
        assert_eq!(document, None);
    }

    #[tokio::test]
    async fn test_server_error_and_bad_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/settings/production/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/settings/production/billing%20service"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let store = HttpDocumentStore::new(5).unwrap();

        let err = store.fetch(&location(mock_server.uri())).await.unwrap_err();
        assert!(matches!(err, CascadeError::Upstream { ref message, .. } if message.contains("503")));

        let mut broken = location(mock_server.uri());
        broken.id = "broken".to_string();
        let err = store.fetch(&broken).await.unwrap_err();
        assert!(matches!(err, CascadeError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let store = HttpDocumentStore::new(1).unwrap();
        let err = store
            .fetch(&location("http://127.0.0.1:1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, CascadeError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_remote_source_in_cascade() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/settings/staging/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_id": "api",
                "workers": "#int:{threads}"
            })))
            .mount(&mock_server)
            .await;

        let store: Arc<dyn DocumentStore> = Arc::new(HttpDocumentStore::new(5).unwrap());
        let cascade = CascadeConfig::new()
            .with_env_name("staging")
            .obj(Value::from(serde_json::json!({"store": mock_server.uri(), "threads": "4"})))
            .remote(
                RemoteOptions {
                    url: "{store}".to_string(),
                    db: "settings".to_string(),
                    coll: "{env}".to_string(),
                    id: "api".to_string(),
                },
                store,
                SourceOptions::new().mount("api"),
            );

        let Resolution::Tree(tree) = cascade.done(DoneOptions::default()).await.unwrap() else {
            panic!("expected a plain tree");
        };
        assert_eq!(
            tree,
            Value::from(serde_json::json!({
                "store": mock_server.uri(),
                "threads": "4",
                "api": {"workers": 4}
            }))
        );
    }
}
