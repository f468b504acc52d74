//! Attribute validators
//!
//! Validators run during `validate` against configuration values. Null and
//! unknown values are never validated; required-ness is checked by
//! [`crate::schema::validate_config`] instead.

use crate::types::{AttributePath, Diagnostic, Dynamic};
use regex::Regex;
use std::net::IpAddr;
use std::sync::Arc;

pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

/// String length in bytes must fall within `min..=max`
pub struct StringLenBetween {
    pub min: usize,
    pub max: usize,
}

impl StringLenBetween {
    pub fn create(min: usize, max: usize) -> Arc<dyn Validator> {
        Arc::new(Self { min, max })
    }
}

impl Validator for StringLenBetween {
    fn description(&self) -> String {
        format!("length must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if s.len() < self.min || s.len() > self.max {
                diagnostics.push(
                    Diagnostic::error(
                        format!(
                            "expected length of {} to be in the range ({} - {})",
                            path, self.min, self.max
                        ),
                        format!("got length {}", s.len()),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// String must match a regular expression
pub struct StringMatch {
    pub pattern: Regex,
    pub message: String,
}

impl StringMatch {
    pub fn create(pattern: Regex, message: impl Into<String>) -> Arc<dyn Validator> {
        Arc::new(Self {
            pattern,
            message: message.into(),
        })
    }
}

impl Validator for StringMatch {
    fn description(&self) -> String {
        format!("must match {}", self.pattern.as_str())
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                let summary = if self.message.is_empty() {
                    format!("invalid value for {} (must match {})", path, self.pattern)
                } else {
                    format!("invalid value for {} ({})", path, self.message)
                };
                diagnostics.push(
                    Diagnostic::error(summary, format!("value {:?} does not match", s))
                        .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// String must be an absolute `https://` URL with a host
pub struct IsUrlWithHttps;

impl IsUrlWithHttps {
    pub fn create() -> Arc<dyn Validator> {
        Arc::new(Self)
    }
}

impl Validator for IsUrlWithHttps {
    fn description(&self) -> String {
        "must be a valid https URL".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(s) = value.as_str() else {
            return;
        };

        let problem = match url::Url::parse(s) {
            Err(e) => Some(format!("expected {} to be a valid url, got {}: {}", path, s, e)),
            Ok(u) if u.host_str().map_or(true, str::is_empty) => {
                Some(format!("expected {} to have a host, got {}", path, s))
            }
            Ok(u) if u.scheme() != "https" => Some(format!(
                "expected {} to have a url with schema of: \"https\", got {}",
                path, s
            )),
            Ok(_) => None,
        };

        if let Some(summary) = problem {
            diagnostics.push(Diagnostic::error(summary, "").with_attribute(path.clone()));
        }
    }
}

/// String must be an IPv4 or IPv6 network in CIDR notation
pub struct IsCidr;

impl IsCidr {
    pub fn create() -> Arc<dyn Validator> {
        Arc::new(Self)
    }

    pub fn is_valid(s: &str) -> bool {
        let Some((addr, prefix)) = s.split_once('/') else {
            return false;
        };
        let Ok(addr) = addr.parse::<IpAddr>() else {
            return false;
        };
        // leading '+' or zero-padded prefixes are rejected
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if prefix.len() > 1 && prefix.starts_with('0') {
            return false;
        }
        let max = if addr.is_ipv4() { 32 } else { 128 };
        prefix.parse::<u8>().map_or(false, |p| p <= max)
    }
}

impl Validator for IsCidr {
    fn description(&self) -> String {
        "must be a valid CIDR block".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !Self::is_valid(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("expected {} to be a valid IPv4 or IPv6 CIDR, got: {}", path, s),
                        "",
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Collection may hold at most `max` elements
pub struct SetSizeAtMost {
    pub max: usize,
}

impl SetSizeAtMost {
    pub fn create(max: usize) -> Arc<dyn Validator> {
        Arc::new(Self { max })
    }
}

impl Validator for SetSizeAtMost {
    fn description(&self) -> String {
        format!("must contain at most {} elements", self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(items) = value.as_list() {
            if items.len() > self.max {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{}: attribute supports {} item maximum", path, self.max),
                        format!("config has {} declared", items.len()),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}
