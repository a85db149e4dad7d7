//! Mock responder.
//!
//! Receives the calls the fault injector rewrote, decodes the token they
//! carry and renders the outcome it names. The responder re-reads the profile
//! rather than trusting anything but the four token fields, so a profile edit
//! between the decision and the render is picked up.

mod server;

pub use server::{MockServer, create_router};

use std::sync::Arc;

use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::error::Skip;
use crate::logging::{self, report_skip};
use crate::matcher::find_by_pattern;
use crate::outcome::Outcome;
use crate::profile::{Delay, ProfileSource, profile_name};
use crate::random::{RandomSource, ThreadRandom};
use crate::token::MockToken;
use crate::{delay, gated_debug, gated_warn};

/// Status of every response the responder could not render as asked
pub const SENTINEL_STATUS: StatusCode = StatusCode::IM_A_TEAPOT;

/// Status rendered for the timeout outcome
pub const TIMEOUT_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Rendered response, always plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    /// Status code
    pub status: StatusCode,
    /// Body
    pub body: String,
}

impl MockResponse {
    fn sentinel(skip: &Skip) -> Self {
        Self {
            status: SENTINEL_STATUS,
            body: skip.to_string(),
        }
    }

    /// Whether this is the diagnostic response rather than a mocked outcome
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.status == SENTINEL_STATUS
    }
}

/// Renders decisions encoded in tokens
pub struct MockResponder {
    source: Arc<dyn ProfileSource>,
    random: Arc<dyn RandomSource>,
    cancel: CancellationToken,
}

impl MockResponder {
    /// Responder reading profiles from `source`
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self {
            source,
            random: Arc::new(ThreadRandom),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the random source
    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Abort pending delays when `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Render the response for `token`; an absent token is malformed
    pub async fn respond(&self, token: Option<&str>) -> MockResponse {
        match self.render(token).await {
            Ok(response) => response,
            Err(skip) => {
                report_skip(&skip, "Rendering sentinel response");
                MockResponse::sentinel(&skip)
            }
        }
    }

    async fn render(&self, token: Option<&str>) -> Result<MockResponse, Skip> {
        let token = MockToken::decode(token.ok_or(Skip::MalformedToken)?)?;
        let name = profile_name(&token.client_name, &token.profile);

        let config = self
            .source
            .get_config(&name)
            .await
            .ok_or_else(|| Skip::ConfigUnresolvable(name.clone()))?;
        if !config.is_enabled() {
            return Err(Skip::ConfigDisabled(name));
        }
        logging::apply_override(config.logging_level);

        if config.services().is_empty() {
            return Err(Skip::NoServicesConfigured(name));
        }

        let services = config.services();
        let Some(service) = find_by_pattern(services, &token.downstream_pattern) else {
            let disabled = services
                .iter()
                .find(|service| service.url_pattern == token.downstream_pattern);
            return Err(match disabled {
                Some(service) => Skip::ServiceDisabled(service.name.clone()),
                None => Skip::NoMatchingService(token.downstream_pattern.clone()),
            });
        };
        logging::apply_override(service.logging_level);

        let behavior = service
            .behavior
            .as_ref()
            .ok_or_else(|| Skip::NoBehaviorConfigured(service.name.clone()))?;
        let outcome: Outcome = token.status.parse()?;
        let missing = || Skip::MissingOutcomeConfig(outcome.as_str(), service.name.clone());

        let (spec, status, body): (Option<&Delay>, StatusCode, String) = match outcome {
            Outcome::Success => {
                let success = behavior.success.as_ref().ok_or_else(missing)?;
                if !success.spoofed {
                    return Err(Skip::NotSpoofed);
                }
                (
                    success.delay.as_ref(),
                    status_code(success.mock_status_code)?,
                    success.mock_response_body.clone(),
                )
            }
            Outcome::Failure => {
                let failure = behavior.failure.as_ref().ok_or_else(missing)?;
                let body = failure.mock_response_body.clone().unwrap_or_else(|| {
                    gated_warn!(service = %service.name, "No failure body configured, rendering empty body");
                    String::new()
                });
                (failure.delay.as_ref(), status_code(failure.mock_status_code)?, body)
            }
            Outcome::Timeout => {
                let timeout = behavior.timeout.as_ref().ok_or_else(missing)?;
                (timeout.delay.as_ref(), TIMEOUT_STATUS, String::new())
            }
        };

        let millis = delay::sample_or_zero(spec, self.random.as_ref());
        gated_debug!(service = %service.name, %outcome, millis, "Rendering mocked outcome");
        delay::wait(millis, &self.cancel)
            .await
            .map_err(|_| Skip::Interrupted)?;

        Ok(MockResponse { status, body })
    }
}

fn status_code(code: u16) -> Result<StatusCode, Skip> {
    StatusCode::from_u16(code).map_err(|_| Skip::InvalidStatusCode(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{FaultProfile, StaticSource};
    use crate::random::ScriptedRandom;
    use crate::token;

    const PROFILE: &str = r#"
enabled: true
services:
  - name: Hello
    pattern: "*hello*"
    enabled: true
    behavior:
      success:
        percentage: 70
        spoofed: true
        mock_status_code: 201
        mock_response_body: created
        delay:
          type: range
          min_value_in_msecs: 1
          max_value_in_msecs: 5
      failure:
        percentage: 20
        mock_status_code: 503
        mock_response_body: unavailable
      timeout:
        percentage: 10
        delay:
          type: fixed
          fixed_value_in_msecs: 5
  - name: Plain
    pattern: "*plain*"
    enabled: true
    behavior:
      success:
        percentage: 80
      failure:
        percentage: 20
        mock_status_code: 502
  - name: Off
    pattern: "*off*"
    enabled: false
    behavior:
      failure:
        percentage: 100
        mock_status_code: 500
  - name: Retired dup
    pattern: "*dup*"
    enabled: false
    behavior:
      failure:
        percentage: 100
        mock_status_code: 500
  - name: Dup
    pattern: "*dup*"
    enabled: true
    behavior:
      failure:
        percentage: 100
        mock_status_code: 503
        mock_response_body: boom
  - name: Teapot
    pattern: "*teapot*"
    enabled: true
    behavior:
      failure:
        percentage: 100
        mock_status_code: 1000
"#;

    fn responder() -> MockResponder {
        let source = StaticSource::new().with(
            profile_name("test-service", "test"),
            FaultProfile::from_yaml(PROFILE).unwrap(),
        );
        MockResponder::new(Arc::new(source)).with_random(Arc::new(ScriptedRandom::new()))
    }

    async fn respond(pattern: &str, status: &str) -> MockResponse {
        let token = token::encode("test-service", pattern, "test", status);
        responder().respond(Some(&token)).await
    }

    #[tokio::test]
    async fn test_spoofed_success() {
        let response = respond("*hello*", "success").await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body, "created");
    }

    #[tokio::test]
    async fn test_failure() {
        let response = respond("*hello*", "failure").await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body, "unavailable");
    }

    #[tokio::test]
    async fn test_timeout_is_empty_server_error() {
        let response = respond("*hello*", "timeout").await;
        assert_eq!(response.status, TIMEOUT_STATUS);
        assert!(response.body.is_empty());
        assert!(!response.is_sentinel());
    }

    #[tokio::test]
    async fn test_failure_without_body_is_empty() {
        let response = respond("*plain*", "failure").await;
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_non_spoofed_success_is_sentinel() {
        let response = respond("*plain*", "success").await;
        assert!(response.is_sentinel());
        assert_eq!(response.body, Skip::NotSpoofed.to_string());
    }

    #[tokio::test]
    async fn test_missing_timeout_config_is_sentinel() {
        let response = respond("*plain*", "timeout").await;
        assert!(response.is_sentinel());
        assert_eq!(
            response.body,
            Skip::MissingOutcomeConfig("timeout", "Plain".into()).to_string()
        );
    }

    #[tokio::test]
    async fn test_disabled_duplicate_does_not_shadow_enabled_service() {
        let response = respond("*dup*", "failure").await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body, "boom");
    }

    #[tokio::test]
    async fn test_resolution_failures_are_sentinel() {
        let cases = [
            ("*off*", "failure", Skip::ServiceDisabled("Off".into())),
            ("*nowhere*", "failure", Skip::NoMatchingService("*nowhere*".into())),
            ("*hello*", "meltdown", Skip::UnknownStatus("meltdown".into())),
            ("*teapot*", "failure", Skip::InvalidStatusCode(1000)),
        ];
        for (pattern, status, skip) in cases {
            let response = respond(pattern, status).await;
            assert_eq!(response.status, SENTINEL_STATUS, "{pattern} {status}");
            assert_eq!(response.body, skip.to_string());
        }
    }

    #[tokio::test]
    async fn test_bad_tokens_are_sentinel() {
        let responder = responder();
        for token in [None, Some(""), Some("!!!")] {
            let response = responder.respond(token).await;
            assert_eq!(response.status, SENTINEL_STATUS);
            assert_eq!(response.body, "Bad token!");
        }
    }

    #[tokio::test]
    async fn test_unknown_profile_is_sentinel() {
        let token = token::encode("someone-else", "*hello*", "test", "failure");
        let response = responder().respond(Some(&token)).await;
        assert_eq!(
            response.body,
            Skip::ConfigUnresolvable("drsquid.someone-else.test".into()).to_string()
        );
    }

    #[tokio::test]
    async fn test_interrupted_delay_is_sentinel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let token = token::encode("test-service", "*hello*", "test", "timeout");
        let response = responder()
            .with_cancellation(cancel)
            .respond(Some(&token))
            .await;
        assert!(response.is_sentinel());
        assert_eq!(response.body, Skip::Interrupted.to_string());
    }
}
