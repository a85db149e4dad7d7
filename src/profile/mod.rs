//! Fault profile model.
//!
//! A fault profile describes, for one client running under one profile, which
//! downstream calls are subject to fault injection and how they should behave.
//! Profiles are plain data: they are parsed fresh for every decision and never
//! mutated afterwards.

pub mod source;

pub use source::{FileSystemSource, ProfileSource, StaticSource};

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Deserializer};

use crate::logging::LoggingLevel;
use crate::{Error, Result};

/// Prefix of every profile name
pub const PROFILE_PREFIX: &str = "drsquid";

/// Body rendered for a spoofed success when the profile does not set one
pub const DEFAULT_SUCCESS_BODY: &str = "spoofing success with drSquid";

/// Name under which the profile for `client` running as `profile` is stored
#[must_use]
pub fn profile_name(client: &str, profile: &str) -> String {
    format!("{PROFILE_PREFIX}.{client}.{profile}")
}

/// Fault injection profile for one client and profile
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FaultProfile {
    /// Master switch
    pub enabled: bool,
    /// Threshold applied when this profile is consulted
    pub logging_level: Option<LoggingLevel>,
    /// Outbound HTTP targets, in match order
    pub services: Vec<Service>,
    /// Data-store fault rules
    pub databases: Vec<DataStoreRule>,
}

impl FaultProfile {
    /// Parse a YAML profile document
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Profile(e.to_string()))
    }

    /// Whether fault injection is switched on
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Configured services
    #[must_use]
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Configured data-store rules
    #[must_use]
    pub fn databases(&self) -> &[DataStoreRule] {
        &self.databases
    }
}

/// One downstream target
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Service {
    /// Display name
    pub name: String,
    /// Free text
    #[serde(default)]
    pub description: Option<String>,
    /// Wildcard URL pattern, `*` matches any run of characters
    #[serde(rename = "pattern")]
    pub url_pattern: String,
    /// Only calls with this method match
    #[serde(default, deserialize_with = "deserialize_method")]
    pub method: Option<Method>,
    /// Only calls whose body contains this text match
    #[serde(default)]
    pub body_keyword: Option<String>,
    /// Disabled services never match
    pub enabled: bool,
    /// Threshold applied once this service is matched
    #[serde(default)]
    pub logging_level: Option<LoggingLevel>,
    /// Outcome weights and rendering
    #[serde(default)]
    pub behavior: Option<Behavior>,
}

fn deserialize_method<'de, D>(deserializer: D) -> std::result::Result<Option<Method>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|m| {
        Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
            .map_err(<D::Error as serde::de::Error>::custom)
    })
    .transpose()
}

/// Outcome configuration; any part may be absent and then weighs 0%
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Behavior {
    /// Success outcome
    pub success: Option<Success>,
    /// Failure outcome
    pub failure: Option<Failure>,
    /// Timeout outcome
    pub timeout: Option<Timeout>,
}

impl Behavior {
    /// Success, failure and timeout weights, absent parts counted as 0
    #[must_use]
    pub fn percentages(&self) -> [i32; 3] {
        [
            self.success.as_ref().map_or(0, |s| s.percentage),
            self.failure.as_ref().map_or(0, |f| f.percentage),
            self.timeout.as_ref().map_or(0, |t| t.percentage),
        ]
    }
}

/// Success outcome
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Success {
    /// Weight in percent
    pub percentage: i32,
    /// Rendered by the mock responder instead of calling the real downstream
    #[serde(default)]
    pub spoofed: bool,
    /// Status rendered when spoofed
    #[serde(default = "default_success_status")]
    pub mock_status_code: u16,
    /// Body rendered when spoofed
    #[serde(default = "default_success_body")]
    pub mock_response_body: String,
    /// Latency added before responding
    #[serde(default)]
    pub delay: Option<Delay>,
}

fn default_success_status() -> u16 {
    200
}

fn default_success_body() -> String {
    DEFAULT_SUCCESS_BODY.to_string()
}

/// Failure outcome
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Failure {
    /// Weight in percent
    pub percentage: i32,
    /// Status rendered
    pub mock_status_code: u16,
    /// Body rendered
    #[serde(default)]
    pub mock_response_body: Option<String>,
    /// Latency added before responding
    #[serde(default)]
    pub delay: Option<Delay>,
}

/// Timeout outcome, always rendered as an empty server error
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Timeout {
    /// Weight in percent
    pub percentage: i32,
    /// Time spent before giving up
    #[serde(default)]
    pub delay: Option<Delay>,
}

/// Delay specification in milliseconds.
///
/// Values are kept signed so that a bad profile still loads; invalid values
/// resolve to no delay when sampled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDelay")]
pub enum Delay {
    /// Always the same
    Fixed {
        /// Milliseconds
        value: i64,
    },
    /// Uniform over `[min, max]`
    Range {
        /// Lower bound, inclusive
        min: i64,
        /// Upper bound, inclusive
        max: i64,
    },
    /// Gaussian around `mean`
    Normal {
        /// Mean in milliseconds
        mean: i64,
        /// Standard deviation in milliseconds
        std_dev: i64,
    },
    /// Discriminator this build does not know
    Unsupported(String),
}

impl Delay {
    /// Discriminator as written in profiles
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Fixed { .. } => "fixed",
            Self::Range { .. } => "range",
            Self::Normal { .. } => "normal",
            Self::Unsupported(kind) => kind,
        }
    }
}

#[derive(Deserialize)]
struct RawDelay {
    #[serde(rename = "type")]
    kind: String,
    fixed_value_in_msecs: Option<i64>,
    min_value_in_msecs: Option<i64>,
    max_value_in_msecs: Option<i64>,
    mean_value_in_msecs: Option<i64>,
    std_value_in_msecs: Option<i64>,
}

impl TryFrom<RawDelay> for Delay {
    type Error = String;

    fn try_from(raw: RawDelay) -> std::result::Result<Self, Self::Error> {
        fn field(value: Option<i64>, name: &str, kind: &str) -> std::result::Result<i64, String> {
            value.ok_or_else(|| format!("{kind} delay requires \"{name}\""))
        }

        let kind = raw.kind.as_str();
        Ok(match kind {
            "fixed" => Self::Fixed {
                value: field(raw.fixed_value_in_msecs, "fixed_value_in_msecs", kind)?,
            },
            "range" => Self::Range {
                min: field(raw.min_value_in_msecs, "min_value_in_msecs", kind)?,
                max: field(raw.max_value_in_msecs, "max_value_in_msecs", kind)?,
            },
            "normal" => Self::Normal {
                mean: field(raw.mean_value_in_msecs, "mean_value_in_msecs", kind)?,
                std_dev: field(raw.std_value_in_msecs, "std_value_in_msecs", kind)?,
            },
            _ => Self::Unsupported(raw.kind),
        })
    }
}

/// Kind of data store a rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum DataStoreKind {
    /// Document database (Mongo)
    #[serde(rename = "MONGO", alias = "DOCUMENT_STORE")]
    DocumentStore,
    /// SQL database
    #[serde(rename = "SQL", alias = "RELATIONAL")]
    Relational,
}

impl fmt::Display for DataStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocumentStore => f.write_str("mongo"),
            Self::Relational => f.write_str("sql"),
        }
    }
}

/// Data-store fault rule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataStoreRule {
    /// Store the rule applies to
    #[serde(rename = "type")]
    pub kind: DataStoreKind,
    /// Informational only
    #[serde(default)]
    pub description: Option<String>,
    /// Disabled rules are ignored
    pub enabled: bool,
    /// Threshold applied when the rule fires
    #[serde(default)]
    pub logging_level: Option<LoggingLevel>,
}
