//! Fault injector and mock responder together
//!
//! Spoofed calls leave the chain through an executor that hands them to the
//! responder router in-process; every other call gets a canned "real" answer.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::Request;
use bytes::Bytes;
use dr_squid::intercept::{CallChain, CallResponse, Executor, FaultInjector, OutboundCall};
use dr_squid::profile::{FaultProfile, StaticSource, profile_name};
use dr_squid::random::ScriptedRandom;
use dr_squid::responder::{MockResponder, TIMEOUT_STATUS, create_router};
use dr_squid::settings::EnvironmentSettings;
use dr_squid::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use tower::ServiceExt;
use url::Url;

const PROFILE: &str = r#"
enabled: true
services:
  - name: Legacy bookings
    pattern: "https://bookings.example.com/*"
    enabled: false
    behavior:
      failure:
        percentage: 100
        mock_status_code: 500
  - name: Bookings
    pattern: "https://bookings.example.com/*"
    enabled: true
    behavior:
      success:
        percentage: 50
        spoofed: true
        mock_status_code: 201
        mock_response_body: '{"booked": true}'
      failure:
        percentage: 30
        mock_status_code: 409
        mock_response_body: '{"error": "conflict"}'
      timeout:
        percentage: 20
        delay:
          type: range
          min_value_in_msecs: 5
          max_value_in_msecs: 10
"#;

const MOCK_HOST: &str = "mock.local";

struct LoopbackExecutor {
    mock: Router,
}

#[async_trait]
impl Executor for LoopbackExecutor {
    async fn execute(&self, call: OutboundCall) -> Result<CallResponse> {
        if call.url.host_str() != Some(MOCK_HOST) {
            return Ok(CallResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::from_static(b"from the real service"),
            });
        }

        let uri = match call.url.query() {
            Some(query) => format!("{}?{query}", call.url.path()),
            None => call.url.path().to_string(),
        };
        let request = Request::builder()
            .method(call.method)
            .uri(uri)
            .body(Body::from(call.body))
            .map_err(|e| Error::Transport(e.to_string()))?;
        let response = self
            .mock
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(CallResponse {
            status,
            headers,
            body,
        })
    }
}

fn chain(draw: u32) -> CallChain {
    let source = Arc::new(StaticSource::new().with(
        profile_name("booking-client", "staging"),
        FaultProfile::from_yaml(PROFILE).unwrap(),
    ));

    let responder = MockResponder::new(source.clone()).with_random(Arc::new(ScriptedRandom::new()));
    let mock = create_router(Arc::new(responder), "/v1/mock");

    let environment = EnvironmentSettings {
        client: Some("booking-client".into()),
        profile: None,
        active_profiles: vec!["default".into(), "staging".into()],
        mock_url: Some(format!("http://{MOCK_HOST}/v1/mock")),
    };
    let injector = FaultInjector::new(source, environment)
        .with_random(Arc::new(ScriptedRandom::new().with_ints([draw])));

    CallChain::builder(Arc::new(LoopbackExecutor { mock }))
        .interceptor(Arc::new(injector))
        .build()
}

fn booking() -> OutboundCall {
    OutboundCall::new(
        Method::POST,
        Url::parse("https://bookings.example.com/v2/reservations").unwrap(),
    )
    .with_body(r#"{"room": 12}"#)
}

#[tokio::test]
async fn test_spoofed_success_round_trip() {
    let response = chain(0).execute(booking()).await.unwrap();
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.text(), r#"{"booked": true}"#);
}

#[tokio::test]
async fn test_failure_round_trip() {
    let response = chain(50).execute(booking()).await.unwrap();
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.text(), r#"{"error": "conflict"}"#);
}

#[tokio::test]
async fn test_timeout_round_trip() {
    let response = chain(80).execute(booking()).await.unwrap();
    assert_eq!(response.status, TIMEOUT_STATUS);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_other_services_reach_the_real_service() {
    let call = OutboundCall::new(Method::GET, Url::parse("https://payments.example.com/").unwrap());
    let response = chain(0).execute(call).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "from the real service");
}
