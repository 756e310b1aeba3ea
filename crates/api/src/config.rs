//! Process configuration read from `HEIMDALL_*` environment variables.
//!
//! Parsing works over any `(key, value)` iterator so tests never touch the real
//! process environment. Values are read once at startup and then shared read-only.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use heimdall_core::resolve_namespaces;
use heimdall_kubehub::ListConstraints;

pub const ENV_ENABLED: &str = "HEIMDALL_JOBLOCATOR_K8S_OPERATOR_ENABLED";
pub const ENV_NAMESPACE_TO_WATCH: &str = "HEIMDALL_JOBLOCATOR_K8S_OPERATOR_NAMESPACE_TO_WATCH";
pub const ENV_LIST_LIMIT: &str = "HEIMDALL_LIST_LIMIT";
pub const ENV_LABEL_SELECTOR: &str = "HEIMDALL_LABEL_SELECTOR";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "HEIMDALL_FETCH_TIMEOUT_SECS";
const PATTERNS_PREFIX: &str = "HEIMDALL_PATTERNS_";
const ENDPOINT_PATTERNS_PREFIX: &str = "HEIMDALL_ENDPOINT_PATH_PATTERNS_";

/// Settings of the operator-backed job locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub enabled: bool,
    /// Raw comma-separated namespace setting, see [`resolve_namespaces`].
    pub namespace_to_watch: Option<String>,
    pub list_limit: Option<u32>,
    pub label_selector: Option<String>,
    pub fetch_timeout: Option<Duration>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self { enabled: true, namespace_to_watch: None, list_limit: None, label_selector: None, fetch_timeout: None }
    }
}

impl LocatorConfig {
    pub fn namespaces_to_watch(&self) -> Vec<String> {
        resolve_namespaces(self.namespace_to_watch.as_deref())
    }

    pub fn constraints(&self) -> ListConstraints {
        ListConstraints { limit: self.list_limit, label_selector: self.label_selector.clone(), timeout: self.fetch_timeout }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub joblocator: LocatorConfig,
    /// Display patterns for the dashboard, e.g. `display-name` → `$jobName`.
    pub patterns: BTreeMap<String, String>,
    /// Link templates, e.g. `flink-ui` → `https://flink.$namespace.example.com/$jobName`.
    pub endpoint_path_patterns: BTreeMap<String, String>,
}

/// Client-facing subset of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfigView {
    pub app_version: String,
    pub patterns: BTreeMap<String, String>,
    pub endpoint_path_patterns: BTreeMap<String, String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cfg = AppConfig::default();
        for (key, value) in vars {
            match key.as_str() {
                ENV_ENABLED => cfg.joblocator.enabled = parse_bool(&key, &value, true),
                ENV_NAMESPACE_TO_WATCH => cfg.joblocator.namespace_to_watch = Some(value),
                ENV_LIST_LIMIT => cfg.joblocator.list_limit = parse_num(&key, &value),
                ENV_LABEL_SELECTOR => {
                    cfg.joblocator.label_selector = Some(value).filter(|s| !s.trim().is_empty())
                }
                ENV_FETCH_TIMEOUT_SECS => {
                    cfg.joblocator.fetch_timeout = parse_num::<u64>(&key, &value).map(Duration::from_secs)
                }
                k => {
                    if let Some(rest) = k.strip_prefix(PATTERNS_PREFIX) {
                        cfg.patterns.insert(pattern_key(rest), value);
                    } else if let Some(rest) = k.strip_prefix(ENDPOINT_PATTERNS_PREFIX) {
                        cfg.endpoint_path_patterns.insert(pattern_key(rest), value);
                    }
                }
            }
        }
        cfg
    }

    pub fn view(&self) -> AppConfigView {
        AppConfigView {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            patterns: self.patterns.clone(),
            endpoint_path_patterns: self.endpoint_path_patterns.clone(),
        }
    }
}

/// `FLINK_UI` → `flink-ui`
fn pattern_key(raw: &str) -> String {
    raw.to_ascii_lowercase().replace('_', "-")
}

fn parse_bool(key: &str, value: &str, default: bool) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        _ => {
            warn!(key = %key, value = %value, default, "invalid boolean; using default");
            default
        }
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    match v.parse::<T>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(key = %key, value = %value, "invalid number; ignoring");
            None
        }
    }
}
