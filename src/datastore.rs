//! Data-store fault advice.
//!
//! Wraps calls to a document or relational store. When the active profile has
//! an enabled rule for the store's kind, the call is never made and a
//! synthetic fault is returned in its place.

use std::future::Future;
use std::sync::Arc;

use crate::error::{DataStoreFault, Skip};
use crate::logging::{self, report_skip};
use crate::profile::{DataStoreKind, ProfileSource};
use crate::settings::EnvironmentSettings;
use crate::{Result, gated_info};

impl DataStoreKind {
    /// Fault raised for this kind of store
    #[must_use]
    pub fn fault(self) -> DataStoreFault {
        match self {
            Self::DocumentStore => DataStoreFault::DocumentStoreTimeout,
            Self::Relational => DataStoreFault::RelationalDataAccess,
        }
    }
}

/// Decides whether data-store calls fail
pub struct DataStoreAdvice {
    source: Arc<dyn ProfileSource>,
    environment: EnvironmentSettings,
}

impl DataStoreAdvice {
    /// Advice reading profiles from `source`
    pub fn new(source: Arc<dyn ProfileSource>, environment: EnvironmentSettings) -> Self {
        Self {
            source,
            environment,
        }
    }

    /// The fault to raise for a call to a `kind` store, if any
    ///
    /// # Errors
    ///
    /// Returns the configured fault when an enabled rule targets `kind`.
    pub async fn check(&self, kind: DataStoreKind) -> std::result::Result<(), DataStoreFault> {
        let Some(active) = self.environment.resolve() else {
            report_skip(&Skip::NoActiveProfile, "Executing the data-store call");
            return Ok(());
        };
        let name = active.config_name();

        let Some(config) = self.source.get_config(&name).await else {
            report_skip(&Skip::ConfigUnresolvable(name), "Executing the data-store call");
            return Ok(());
        };
        if !config.is_enabled() {
            report_skip(&Skip::ConfigDisabled(name), "Executing the data-store call");
            return Ok(());
        }
        logging::apply_override(config.logging_level);

        let Some(rule) = config
            .databases()
            .iter()
            .find(|rule| rule.enabled && rule.kind == kind)
        else {
            return Ok(());
        };
        logging::apply_override(rule.logging_level);

        let fault = kind.fault();
        gated_info!(store = %kind, %fault, "Failing data-store call");
        Err(fault)
    }

    /// Run `call` unless a rule for `kind` fails it first
    ///
    /// # Errors
    ///
    /// Returns the configured fault, or whatever `call` returns.
    pub async fn around<T, F, Fut>(&self, kind: DataStoreKind, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.check(kind).await?;
        call().await
    }
}
