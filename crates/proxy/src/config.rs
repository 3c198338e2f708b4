//! Proxy configuration.
//!
//! The configuration is a JSON document read once at startup:
//!
//! ```json
//! {
//!     "ListenOn": "127.0.0.1:8080",
//!     "AllowTunnelsTo": "^[^:]+:443$",
//!     "RemoveElements": {
//!         "^http://news\\.example\\.com/": ["div.banner", "iframe"]
//!     },
//!     "ErrorTemplate": "error.html",
//!     "DialTimeoutSecs": 10,
//!     "HeadTimeoutSecs": 30
//! }
//! ```
//!
//! `RemoveElements` patterns see the absolute request URL exactly as the client sent it, so
//! `http://Example.com:80/` is not rewritten to `http://example.com/` before matching.
//!
//! Everything is validated while loading: patterns are compiled, selectors are parsed and the
//! error template is read. The resulting [`ProxyConfig`] never changes afterwards and is shared
//! between connections through an `Arc`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use scraper::Selector;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::error_page::DEFAULT_TEMPLATE;

const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HEAD_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    listen_on: String,
    allow_tunnels_to: String,
    #[serde(default)]
    remove_elements: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    error_template: Option<PathBuf>,
    #[serde(default = "default_dial_timeout_secs")]
    dial_timeout_secs: u64,
    #[serde(default = "default_head_timeout_secs")]
    head_timeout_secs: u64,
}

fn default_dial_timeout_secs() -> u64 {
    DEFAULT_DIAL_TIMEOUT_SECS
}

fn default_head_timeout_secs() -> u64 {
    DEFAULT_HEAD_TIMEOUT_SECS
}

/// A page rewrite rule: elements matching `selectors` are removed from pages whose URL matches
/// `pattern`.
#[derive(Debug, Clone)]
pub struct UrlRule {
    pattern: Regex,
    selectors: Vec<Selector>,
}

impl UrlRule {
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    listen_on: String,
    allow_tunnels_to: Regex,
    rules: Vec<UrlRule>,
    error_template: String,
    dial_timeout: Duration,
    head_timeout: Duration,
}

impl ProxyConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;

        let allow_tunnels_to = compile_pattern(&raw.allow_tunnels_to)?;

        let rules = raw
            .remove_elements
            .iter()
            .map(|(pattern, selectors)| {
                let pattern = compile_pattern(pattern)?;
                let selectors = selectors.iter().map(|selector| parse_selector(selector)).collect::<Result<_, _>>()?;
                Ok(UrlRule { pattern, selectors })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let error_template = match &raw.error_template {
            Some(path) => {
                fs::read_to_string(path).map_err(|source| ConfigError::Template { path: path.clone(), source })?
            }
            None => DEFAULT_TEMPLATE.to_string(),
        };

        Ok(Self {
            listen_on: raw.listen_on,
            allow_tunnels_to,
            rules,
            error_template,
            dial_timeout: Duration::from_secs(raw.dial_timeout_secs),
            head_timeout: Duration::from_secs(raw.head_timeout_secs),
        })
    }

    pub fn listen_on(&self) -> &str {
        &self.listen_on
    }

    pub fn allow_tunnels_to(&self) -> &Regex {
        &self.allow_tunnels_to
    }

    pub fn rules(&self) -> &[UrlRule] {
        &self.rules
    }

    pub fn error_template(&self) -> &str {
        &self.error_template
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    pub fn head_timeout(&self) -> Duration {
        self.head_timeout
    }

    /// Selectors of every rule whose pattern matches `url`, in rule order.
    pub fn selectors_for(&self, url: &str) -> Vec<Selector> {
        self.rules
            .iter()
            .filter(|rule| rule.pattern.is_match(url))
            .flat_map(|rule| rule.selectors.iter().cloned())
            .collect()
    }

    /// Replaces the listen address, used when the caller binds the listener itself.
    #[must_use]
    pub fn with_listen_on(mut self, listen_on: impl Into<String>) -> Self {
        self.listen_on = listen_on.into();
        self
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern { pattern: pattern.to_string(), source })
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::Selector { selector: selector.to_string(), reason: e.to_string() })
}
