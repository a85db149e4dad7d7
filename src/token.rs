//! Decision tokens.
//!
//! The interceptor hands its decision to the mock responder as a base64
//! string of `clientName=<c>&downstreamPattern=<p>&profile=<pr>&status=<s>`.
//! Values are written unescaped and must not contain `&` or `=`.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Skip;

/// Token key for the client name
pub const CLIENT_NAME: &str = "clientName";
/// Token key for the matched service pattern
pub const DOWNSTREAM_PATTERN: &str = "downstreamPattern";
/// Token key for the profile
pub const PROFILE: &str = "profile";
/// Token key for the drawn outcome
pub const STATUS: &str = "status";

/// Build the token for a decision
#[must_use]
pub fn encode(client: &str, downstream_pattern: &str, profile: &str, status: &str) -> String {
    let query = format!(
        "{CLIENT_NAME}={client}&{DOWNSTREAM_PATTERN}={downstream_pattern}&{PROFILE}={profile}&{STATUS}={status}"
    );
    STANDARD.encode(query.as_bytes())
}

/// Split a token back into its fields, `None` if it is malformed
#[must_use]
pub fn decode(token: &str) -> Option<HashMap<String, String>> {
    let bytes = STANDARD.decode(token.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;

    let mut fields = HashMap::new();
    for segment in text.split('&') {
        let (key, value) = segment.split_once('=')?;
        if key.is_empty() || value.is_empty() {
            return None;
        }
        fields.insert(key.to_string(), value.to_string());
    }
    Some(fields)
}

/// Decoded decision context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockToken {
    /// Calling application
    pub client_name: String,
    /// Pattern of the service the call matched
    pub downstream_pattern: String,
    /// Profile the client ran under
    pub profile: String,
    /// Drawn outcome, not yet validated
    pub status: String,
}

impl MockToken {
    /// Encode to the wire form
    #[must_use]
    pub fn encode(&self) -> String {
        encode(
            &self.client_name,
            &self.downstream_pattern,
            &self.profile,
            &self.status,
        )
    }

    /// Decode and require all four fields
    pub fn decode(token: &str) -> Result<Self, Skip> {
        let mut fields = decode(token).ok_or(Skip::MalformedToken)?;
        let mut take = |key: &str| fields.remove(key).ok_or(Skip::MalformedToken);
        Ok(Self {
            client_name: take(CLIENT_NAME)?,
            downstream_pattern: take(DOWNSTREAM_PATTERN)?,
            profile: take(PROFILE)?,
            status: take(STATUS)?,
        })
    }
}
