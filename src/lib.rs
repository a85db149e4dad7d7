//! Dr. Squid
//!
//! Configuration-driven fault injection for outbound service calls.
//!
//! # Features
//!
//! - **Fault injector**: an [`intercept::Interceptor`] that matches outbound
//!   calls against a fault profile and either lets them through (optionally
//!   delayed) or rewrites them to the mock responder
//! - **Mock responder**: an HTTP service that decodes the decision token and
//!   renders the mocked success, failure or timeout
//! - **Data-store advice**: fails document or relational store calls with a
//!   synthetic fault
//! - **Delays**: fixed, uniform range and normal distributions
//!
//! Fault profiles are named `drsquid.<client>.<profile>` and re-read for every
//! decision, so edits take effect without a restart.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod datastore;
pub mod delay;
pub mod error;
pub mod intercept;
pub mod logging;
pub mod matcher;
pub mod outcome;
pub mod profile;
pub mod random;
pub mod responder;
pub mod settings;
pub mod token;

pub use error::{DataStoreFault, Error, Result, Skip};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to install subscriber: {e}")))?,
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to install subscriber: {e}")))?,
    }

    Ok(())
}
