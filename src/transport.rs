use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::error::{ClientError, Result};

#[cfg(test)]
use mockall::automock;

/// Raw reply from the backend: status code and undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode a 2xx body (`Value::Null` when empty); any other status
    /// becomes [`ClientError::Service`].
    pub fn into_json(self, path: &str) -> Result<Value> {
        if !self.is_success() {
            return Err(self.into_service_error(path));
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
            .map_err(|e| ClientError::Transport(format!("Malformed response from {path}: {e}")))
    }

    /// The service error for this reply, carrying the body's `error` field
    /// when there is one.
    pub fn into_service_error(self, path: &str) -> ClientError {
        let message = error_field(&self.body);
        tracing::warn!(
            status = self.status,
            path,
            error = message.as_deref().unwrap_or(""),
            "Backend returned an error status"
        );
        ClientError::Service {
            status: self.status,
            message,
        }
    }
}

/// JSON-over-HTTP boundary to the RAG backend.
///
/// Implementations send exactly one request per call and never retry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `path` (relative to the backend base URL) and return
    /// the reply whatever its status. Only connection-level failures are
    /// errors here.
    async fn post(&self, path: &str, body: &Value) -> Result<Reply>;

    /// POST and decode, treating any 2xx as success.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.post(path, body).await?.into_json(path)
    }
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Config("backend base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: &Value) -> Result<Reply> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Reply { status, body })
    }
}

/// Pull `{"error": "..."}` out of an error body, if it has one.
fn error_field(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod gated {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::oneshot;

    use super::{Reply, Transport};
    use crate::error::{ClientError, Result};

    /// Transport whose replies are released by the test, in any order.
    pub(crate) struct GatedTransport {
        gates: Mutex<VecDeque<oneshot::Receiver<Result<Reply>>>>,
    }

    impl GatedTransport {
        /// One gate per expected request, consumed in request order.
        pub(crate) fn new(gates: impl IntoIterator<Item = oneshot::Receiver<Result<Reply>>>) -> Self {
            Self {
                gates: Mutex::new(gates.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn post(&self, _path: &str, _body: &Value) -> Result<Reply> {
            let gate = self
                .gates
                .lock()
                .expect("gate mutex should not be poisoned")
                .pop_front()
                .expect("a gate per request");
            gate.await
                .unwrap_or_else(|_| Err(ClientError::Transport("gate dropped".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: &str) -> BackendConfig {
        BackendConfig {
            base_url: url.to_string(),
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let transport = HttpTransport::new(&backend("http://localhost:5000/")).expect("build");
        assert_eq!(transport.base_url(), "http://localhost:5000");
        assert_eq!(transport.url("/gen/npc"), "http://localhost:5000/gen/npc");
        assert_eq!(transport.url("ask"), "http://localhost:5000/ask");
    }

    #[test]
    fn test_empty_base_url_is_a_config_error() {
        let err = HttpTransport::new(&backend("  ")).err().expect("must fail");
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_error_field_extraction() {
        assert_eq!(
            error_field(r#"{"error": "model unavailable"}"#).as_deref(),
            Some("model unavailable")
        );
        assert_eq!(error_field(r#"{"message": "nope"}"#), None);
        assert_eq!(error_field("<html>502 Bad Gateway</html>"), None);
        assert_eq!(error_field(r#"{"error": null}"#), None);
    }

    #[test]
    fn test_reply_decoding() {
        assert_eq!(
            Reply::new(200, r#"{"answer": "x"}"#).into_json("/ask").expect("decode"),
            serde_json::json!({"answer": "x"})
        );
        assert_eq!(Reply::new(204, "").into_json("/gen/npc").expect("empty"), Value::Null);

        let err = Reply::new(200, "<html>").into_json("/ask").expect_err("malformed");
        assert!(matches!(err, ClientError::Transport(_)));

        let err = Reply::new(500, r#"{"error": "model unavailable"}"#)
            .into_json("/ask")
            .expect_err("service error");
        assert!(matches!(
            err,
            ClientError::Service { status: 500, message: Some(ref m) } if m == "model unavailable"
        ));

        let err = Reply::new(502, "Bad Gateway").into_json("/ask").expect_err("no message");
        assert!(matches!(err, ClientError::Service { status: 502, message: None }));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) is closed on any sane test host.
        let transport = HttpTransport::new(&backend("http://127.0.0.1:9")).expect("build");
        let err = transport
            .post_json("/ask", &serde_json::json!({"query": "x", "top_k": 1}))
            .await
            .expect_err("connection must fail");
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
