//! Service settings

use std::{path::Path, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::profile::profile_name;
use crate::{Error, Result};

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mock responder server
    pub server: ServerSettings,
    /// Where fault profiles are read from
    pub profiles: ProfileSettings,
    /// Client identity and mock endpoint
    pub environment: EnvironmentSettings,
}

impl Settings {
    /// Load settings from an optional YAML file and `DRSQUID_` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // DRSQUID_ENVIRONMENT__CLIENT=... etc.
        figment = figment.merge(Env::prefixed("DRSQUID_").split("__"));

        figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

/// Mock responder server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Path of the mock endpoint
    pub mock_path: String,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            mock_path: "/v1/mock".to_string(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Fault profile store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    /// Directory holding `drsquid.<client>.<profile>.yaml` files
    pub directory: PathBuf,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("config"),
        }
    }
}

/// Settings the surrounding application supplies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    /// Calling application
    pub client: Option<String>,
    /// Explicit profile, wins over `active_profiles`
    pub profile: Option<String>,
    /// Active profiles of the host application; the last one is used
    pub active_profiles: Vec<String>,
    /// Base URL of the mock responder endpoint
    pub mock_url: Option<String>,
}

/// Client and profile a decision runs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveProfile {
    /// Calling application
    pub client: String,
    /// Profile name
    pub profile: String,
}

impl ActiveProfile {
    /// Name of the fault profile to load
    #[must_use]
    pub fn config_name(&self) -> String {
        profile_name(&self.client, &self.profile)
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl EnvironmentSettings {
    /// Settings for `client` running as `profile`
    pub fn new(client: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            client: Some(client.into()),
            profile: Some(profile.into()),
            ..Self::default()
        }
    }

    /// Set the mock responder base URL
    #[must_use]
    pub fn with_mock_url(mut self, url: impl Into<String>) -> Self {
        self.mock_url = Some(url.into());
        self
    }

    /// Client and profile, `None` if either cannot be determined
    #[must_use]
    pub fn resolve(&self) -> Option<ActiveProfile> {
        let client = non_blank(self.client.as_ref())?;
        let profile = non_blank(self.profile.as_ref())
            .or_else(|| non_blank(self.active_profiles.last()))?;
        Some(ActiveProfile {
            client: client.to_string(),
            profile: profile.to_string(),
        })
    }

    /// Parsed mock responder URL, `None` if unset or unparsable
    #[must_use]
    pub fn mock_endpoint(&self) -> Option<Url> {
        let raw = non_blank(self.mock_url.as_ref())?;
        match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                crate::gated_error!(url = raw, error = %e, "Mock responder URL does not parse");
                None
            }
        }
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s", or "1500ms"
    /// when there is a sub-second part)
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" before "s", both end in 's'
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m.saturating_mul(60)))
                .map_err(serde::de::Error::custom)
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
