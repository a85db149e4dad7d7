//! Fault injection decision for outbound calls.
//!
//! Every check that fails reports why and lets the original call through
//! untouched. Only two things reach the caller as errors: the real call's own
//! failure, and a delay interrupted by shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{CallResponse, Interceptor, Next, OutboundCall};
use crate::error::Skip;
use crate::logging::{self, report_skip};
use crate::matcher::match_service;
use crate::outcome::{Buckets, Outcome};
use crate::profile::ProfileSource;
use crate::random::{RandomSource, ThreadRandom};
use crate::settings::EnvironmentSettings;
use crate::{Result, delay, gated_debug, gated_error, gated_info, gated_warn, token};

/// What to do with one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Execute the original call after sleeping
    Passthrough {
        /// Milliseconds to sleep first
        delay_ms: u64,
    },
    /// Send the call to the mock responder instead
    Spoof {
        /// Drawn outcome
        outcome: Outcome,
        /// Encoded decision
        token: String,
        /// Mock responder URL carrying the token
        target: Url,
    },
}

impl Decision {
    fn passthrough() -> Self {
        Self::Passthrough { delay_ms: 0 }
    }
}

/// Interceptor that injects faults according to the active profile
pub struct FaultInjector {
    source: Arc<dyn ProfileSource>,
    environment: EnvironmentSettings,
    random: Arc<dyn RandomSource>,
    cancel: CancellationToken,
}

impl FaultInjector {
    /// Injector reading profiles from `source`
    pub fn new(source: Arc<dyn ProfileSource>, environment: EnvironmentSettings) -> Self {
        Self {
            source,
            environment,
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

    /// Decide what happens to `call`; never fails
    pub async fn decide(&self, call: &OutboundCall) -> Decision {
        match self.evaluate(call).await {
            Ok(decision) => decision,
            Err(skip) => {
                report_skip(&skip, "Executing the original call");
                Decision::passthrough()
            }
        }
    }

    async fn evaluate(&self, call: &OutboundCall) -> std::result::Result<Decision, Skip> {
        let active = self.environment.resolve().ok_or(Skip::NoActiveProfile)?;
        let name = active.config_name();

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

        let url = call.url.as_str();
        let service = match_service(config.services(), url)
            .ok_or_else(|| Skip::NoMatchingService(url.to_string()))?;
        logging::apply_override(service.logging_level);

        service.check_method(&call.method)?;
        service.check_body(&call.body)?;

        let behavior = service
            .behavior
            .as_ref()
            .ok_or_else(|| Skip::NoBehaviorConfigured(service.name.clone()))?;
        let [success, failure, timeout] = behavior.percentages();
        let buckets = Buckets::compute(success, failure, timeout)?;
        let outcome = buckets.select(self.random.as_ref());
        gated_debug!(service = %service.name, %outcome, "Outcome drawn");

        if let (Outcome::Success, Some(success)) = (outcome, &behavior.success) {
            if !success.spoofed {
                let delay_ms = match &success.delay {
                    Some(spec) => delay::sample(spec, self.random.as_ref()),
                    None => {
                        gated_warn!(service = %service.name, "No delay configured for success, not sleeping");
                        0
                    }
                };
                return Ok(Decision::Passthrough { delay_ms });
            }
        }

        let mut target = self
            .environment
            .mock_endpoint()
            .ok_or(Skip::MockEndpointMissing)?;
        let token = token::encode(
            &active.client,
            &service.url_pattern,
            &active.profile,
            outcome.as_str(),
        );
        target.query_pairs_mut().append_pair("token", &token);

        Ok(Decision::Spoof {
            outcome,
            token,
            target,
        })
    }
}

#[async_trait]
impl Interceptor for FaultInjector {
    async fn handle(&self, call: OutboundCall, next: Next<'_>) -> Result<CallResponse> {
        match self.decide(&call).await {
            Decision::Passthrough { delay_ms } => {
                if let Err(e) = delay::wait(delay_ms, &self.cancel).await {
                    gated_error!(url = %call.url, error = %e, "Abandoning call");
                    return Err(e);
                }
                next.run(call).await
            }
            Decision::Spoof {
                outcome, target, ..
            } => {
                gated_info!(url = %call.url, %outcome, "Spoofing call through the mock responder");
                // Headers belong to the real downstream, credentials included
                let spoofed = OutboundCall::new(call.method, target).with_body(call.body);
                next.run(spoofed).await
            }
        }
    }
}
