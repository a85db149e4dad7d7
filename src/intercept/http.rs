//! `reqwest`-backed executor

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{CallResponse, Executor, OutboundCall};
use crate::{Error, Result};

/// Executes calls over HTTP
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    /// Executor with a request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Executor over an existing client
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, call: OutboundCall) -> Result<CallResponse> {
        debug!(method = %call.method, url = %call.url, "Executing outbound call");

        let response = self
            .client
            .request(call.method, call.url)
            .headers(call.headers)
            .body(call.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(CallResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, Method, StatusCode};
    use axum::routing::post;
    use reqwest::header::HeaderValue;
    use std::net::SocketAddr;
    use url::Url;

    async fn echo(
        method: Method,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, [(&'static str, String); 1], String) {
        let trace = headers
            .get("x-trace-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        (
            StatusCode::ACCEPTED,
            [("x-seen-method", method.to_string())],
            format!("{trace}|{body}"),
        )
    }

    async fn serve() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/echo", post(echo));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_execute_round_trip() {
        let addr = serve().await;
        let executor = HttpExecutor::new(Duration::from_secs(5)).unwrap();

        let mut call = OutboundCall::new(
            Method::POST,
            Url::parse(&format!("http://{addr}/echo")).unwrap(),
        )
        .with_body(r#"{"room": 12}"#);
        call.headers.insert("x-trace-id", HeaderValue::from_static("abc123"));

        let response = executor.execute(call).await.unwrap();
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(response.headers.get("x-seen-method").unwrap(), "POST");
        assert_eq!(response.text(), r#"abc123|{"room": 12}"#);
    }

    #[tokio::test]
    async fn test_unrouted_method_status_is_returned() {
        let addr = serve().await;
        let executor = HttpExecutor::with_client(Client::new());

        let call = OutboundCall::new(
            Method::GET,
            Url::parse(&format!("http://{addr}/echo")).unwrap(),
        );
        let response = executor.execute(call).await.unwrap();
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let executor = HttpExecutor::new(Duration::from_secs(5)).unwrap();
        let call = OutboundCall::new(
            Method::GET,
            Url::parse(&format!("http://{addr}/echo")).unwrap(),
        );
        assert!(matches!(executor.execute(call).await, Err(Error::Http(_))));
    }
}
