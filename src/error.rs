//! Error types for Dr. Squid

use std::io;

use thiserror::Error;

use crate::logging::LoggingLevel;

/// Result type alias for Dr. Squid
pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures surfaced to the caller
#[derive(Error, Debug)]
pub enum Error {
    /// Service configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fault profile could not be parsed
    #[error("Fault profile error: {0}")]
    Profile(String),

    /// Transport error while executing a call
    #[error("Transport error: {0}")]
    Transport(String),

    /// A blocking delay was cancelled before it elapsed
    #[error("Delay of {0} ms interrupted")]
    Interrupted(u64),

    /// Configured data-store fault
    #[error(transparent)]
    DataStore(#[from] DataStoreFault),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Synthetic fault raised instead of a real data-store call
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStoreFault {
    /// Document store connection timed out
    #[error("Mongo connection timed out")]
    DocumentStoreTimeout,

    /// Relational store data access failure
    #[error("Data access failure on relational store")]
    RelationalDataAccess,
}

/// Reasons the fault pipeline declines to act on a call.
///
/// The interceptor recovers every variant by executing the original call, the
/// mock responder by rendering its sentinel response with the `Display` text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// No client or profile could be resolved from the environment
    #[error("No active client or profile, can't resolve a Dr. Squid profile")]
    NoActiveProfile,

    /// Profile does not exist in the configuration store
    #[error("Dr. Squid configuration \"{0}\" is missing")]
    ConfigUnresolvable(String),

    /// Profile exists but is switched off
    #[error("Dr. Squid is not enabled in configuration \"{0}\"")]
    ConfigDisabled(String),

    /// Profile has no services
    #[error("No services defined in configuration \"{0}\"")]
    NoServicesConfigured(String),

    /// No enabled service matched the call
    #[error("No enabled service matches \"{0}\"")]
    NoMatchingService(String),

    /// Service matched by pattern but is disabled
    #[error("Target service \"{0}\" is not enabled")]
    ServiceDisabled(String),

    /// Service is restricted to another HTTP method
    #[error("Methods don't match - configured: \"{configured}\", actual: \"{actual}\"")]
    MethodMismatch {
        /// Method on the service entry
        configured: String,
        /// Method of the intercepted call
        actual: String,
    },

    /// Request body lacks the service's keyword
    #[error("The request body doesn't contain the keyword \"{0}\"")]
    BodyKeywordMismatch(String),

    /// Service has no behavior block
    #[error("No behavior defined for service \"{0}\"")]
    NoBehaviorConfigured(String),

    /// Percentages are negative or do not add up to 100
    #[error(
        "Success, failure and timeout percentages must be non-negative and sum to 100, got {success}/{failure}/{timeout}"
    )]
    InvalidPercentageDistribution {
        /// Success weight
        success: i32,
        /// Failure weight
        failure: i32,
        /// Timeout weight
        timeout: i32,
    },

    /// Mock responder base URL is absent or unusable
    #[error("Can't call the mock responder, \"drsquid.url\" is not configured")]
    MockEndpointMissing,

    /// Token failed to decode or lacks a field
    #[error("Bad token!")]
    MalformedToken,

    /// Token carries a status other than success/failure/timeout
    #[error("Unsupported status type \"{0}\"")]
    UnknownStatus(String),

    /// Responder reached for a success that is not spoofed
    #[error("Success is not spoofed, and yet the mock responder was still called")]
    NotSpoofed,

    /// Drawn outcome has no sub-configuration on the service
    #[error("No {0} behavior configured for service \"{1}\"")]
    MissingOutcomeConfig(&'static str, String),

    /// Configured mock status is not a valid HTTP status
    #[error("Configured status code {0} is not a valid HTTP status")]
    InvalidStatusCode(u16),

    /// Delay discriminator not understood
    #[error("Unsupported delay type \"{0}\"")]
    UnsupportedDelayKind(String),

    /// Delay was interrupted while the responder slept
    #[error("Interrupted while sleeping")]
    Interrupted,
}

impl Skip {
    /// Severity the diagnostic is reported at
    #[must_use]
    pub fn level(&self) -> LoggingLevel {
        match self {
            Self::ConfigDisabled(_)
            | Self::NoMatchingService(_)
            | Self::MethodMismatch { .. }
            | Self::BodyKeywordMismatch(_) => LoggingLevel::Debug,
            Self::UnsupportedDelayKind(_) => LoggingLevel::Warn,
            _ => LoggingLevel::Error,
        }
    }
}
