//! Service matching.
//!
//! A service's `pattern` is a literal URL fragment where `*` stands for any
//! run of characters. The pattern is searched for anywhere in the call's URL,
//! so `*google.com*` and `google.com` both match `https://www.google.com/`.

use regex::Regex;
use reqwest::Method;

use crate::error::Skip;
use crate::gated_error;
use crate::profile::Service;

/// Compile a wildcard pattern: everything but `*` is literal, `*` becomes `(.*)`
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let source = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(.*)");
    Regex::new(&source)
}

/// Whether `pattern` occurs in `url`
#[must_use]
pub fn pattern_matches(pattern: &str, url: &str) -> bool {
    match compile_pattern(pattern) {
        Ok(re) => re.is_match(url),
        Err(e) => {
            gated_error!(pattern, error = %e, "Service pattern does not compile");
            false
        }
    }
}

/// First enabled service, in configured order, whose pattern occurs in `url`
#[must_use]
pub fn match_service<'a>(services: &'a [Service], url: &str) -> Option<&'a Service> {
    services
        .iter()
        .find(|service| service.enabled && pattern_matches(&service.url_pattern, url))
}

/// First enabled service whose pattern is exactly `pattern`
///
/// Disabled services are skipped the same way [`match_service`] skips them,
/// so a disabled duplicate never shadows the service a decision was made for.
#[must_use]
pub fn find_by_pattern<'a>(services: &'a [Service], pattern: &str) -> Option<&'a Service> {
    services
        .iter()
        .find(|service| service.enabled && service.url_pattern == pattern)
}

impl Service {
    /// Check the optional method filter
    pub fn check_method(&self, method: &Method) -> Result<(), Skip> {
        match &self.method {
            Some(configured) if configured != method => Err(Skip::MethodMismatch {
                configured: configured.to_string(),
                actual: method.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Check the optional body keyword filter
    pub fn check_body(&self, body: &[u8]) -> Result<(), Skip> {
        match &self.body_keyword {
            Some(keyword) if !String::from_utf8_lossy(body).contains(keyword.as_str()) => {
                Err(Skip::BodyKeywordMismatch(keyword.clone()))
            }
            _ => Ok(()),
        }
    }
}
