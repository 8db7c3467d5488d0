//! Configuration module for the keepalive service.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::probe::Target;

use serde_json::Value;
use std::env;
use std::time::Duration;

/// Highest numbered `KEEPALIVE_URL_<n>` slot that is consulted.
pub const MAX_NUMBERED_TARGETS: usize = 10;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the persisted history log (default: "keepalive-history.json")
    pub history_path: String,
    /// Per-probe deadline (default: 8s)
    pub probe_timeout: Duration,
    /// Whether the stats viewer refreshes on a timer at startup
    pub auto_refresh: bool,
    /// Period of the auto-refresh timer (default: 60s)
    pub refresh_interval: Duration,
    /// Keepalive endpoint polled by the stats viewer
    pub stats_source: String,
    /// Bound on one viewer fetch (default: 30s)
    pub stats_timeout: Duration,
    /// Default target list, used when a request does not supply its own
    pub targets: Vec<Target>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            history_path: "keepalive-history.json".to_string(),
            probe_timeout: Duration::from_millis(crate::probe::DEFAULT_TIMEOUT_MS),
            auto_refresh: false,
            refresh_interval: Duration::from_secs(60),
            stats_source: default_stats_source(8080),
            stats_timeout: crate::viewer::DEFAULT_FETCH_TIMEOUT,
            targets: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `KEEPALIVE_HTTP_PORT`: HTTP port (default: 8080)
    /// - `KEEPALIVE_HISTORY_PATH`: history file path (default: "keepalive-history.json")
    /// - `KEEPALIVE_PROBE_TIMEOUT_MS`: probe deadline in milliseconds (default: 8000)
    /// - `KEEPALIVE_AUTO_REFRESH`: enable the refresh timer (default: off)
    /// - `KEEPALIVE_REFRESH_SECS`: refresh period in seconds (default: 60)
    /// - `KEEPALIVE_STATS_SOURCE`: endpoint the viewer polls (default: this server)
    /// - `KEEPALIVE_STATS_TIMEOUT_SECS`: viewer fetch bound in seconds (default: 30)
    /// - `KEEPALIVE_PROJECTS` or `KEEPALIVE_URL_<n>`/`KEEPALIVE_KEY_<n>`/`KEEPALIVE_NAME_<n>`
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("KEEPALIVE_HTTP_PORT").and_then(|s| s.trim().parse().ok()) {
            cfg.http_port = port;
        }

        if let Some(path) = lookup("KEEPALIVE_HISTORY_PATH").filter(|s| !s.trim().is_empty()) {
            cfg.history_path = path;
        }

        if let Some(ms) = lookup("KEEPALIVE_PROBE_TIMEOUT_MS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            cfg.probe_timeout = Duration::from_millis(ms);
        }

        if let Some(flag) = lookup("KEEPALIVE_AUTO_REFRESH") {
            cfg.auto_refresh = parse_flag(&flag);
        }

        if let Some(secs) = lookup("KEEPALIVE_REFRESH_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            cfg.refresh_interval = Duration::from_secs(secs);
        }

        cfg.stats_source = lookup("KEEPALIVE_STATS_SOURCE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_stats_source(cfg.http_port));

        if let Some(secs) = lookup("KEEPALIVE_STATS_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            cfg.stats_timeout = Duration::from_secs(secs);
        }

        cfg.targets = targets_from_lookup(&lookup);

        cfg
    }
}

fn default_stats_source(port: u16) -> String {
    format!("http://127.0.0.1:{}/api/keepalive", port)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Read the default target list.
///
/// `KEEPALIVE_PROJECTS` wins when it holds a JSON array; elements that do not
/// describe a complete target are skipped. Anything else falls through to the
/// numbered slots, which may well be empty.
pub fn targets_from_lookup<F>(lookup: &F) -> Vec<Target>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(json) = lookup("KEEPALIVE_PROJECTS") {
        match serde_json::from_str::<Vec<Value>>(&json) {
            Ok(raw) => {
                return raw
                    .iter()
                    .map(|v| target_from_value(v).normalized())
                    .filter(Target::is_valid)
                    .collect();
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed KEEPALIVE_PROJECTS: {}", e);
            }
        }
    }

    let mut out = Vec::new();
    for i in 1..=MAX_NUMBERED_TARGETS {
        let url = lookup(&format!("KEEPALIVE_URL_{}", i)).filter(|s| !s.is_empty());
        let key = lookup(&format!("KEEPALIVE_KEY_{}", i)).filter(|s| !s.is_empty());
        let name = lookup(&format!("KEEPALIVE_NAME_{}", i)).filter(|s| !s.is_empty());

        if let (Some(url), Some(key)) = (url, key) {
            out.push(Target::new(url, key, name).normalized());
        }
    }
    out
}

/// Build a target from a loosely typed `{url, key, name?}` value.
///
/// Non-object values yield an empty (invalid) target.
pub fn target_from_value(value: &Value) -> Target {
    let field = |name: &str| value.get(name).unwrap_or(&Value::Null);

    Target::new(
        json_to_string(field("url")),
        json_to_string(field("key")),
        json_to_optional_string(field("name")),
    )
}

/// Loose string coercion for JSON-supplied target fields.
///
/// Strings pass through and other scalars are rendered. Null, `false` and
/// zero count as no value and become empty.
pub fn json_to_string(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Like [`json_to_string`], but an empty result means "no value".
pub fn json_to_optional_string(value: &Value) -> Option<String> {
    Some(json_to_string(value)).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.history_path, "keepalive-history.json");
        assert_eq!(cfg.probe_timeout, Duration::from_millis(8000));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(60));
        assert_eq!(cfg.stats_timeout, Duration::from_secs(30));
        assert!(!cfg.auto_refresh);
        assert!(cfg.targets.is_empty());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cfg = ServerConfig::from_lookup(lookup_from(&[
            ("KEEPALIVE_HTTP_PORT", "9090"),
            ("KEEPALIVE_PROBE_TIMEOUT_MS", "nope"),
            ("KEEPALIVE_AUTO_REFRESH", "Yes"),
            ("KEEPALIVE_REFRESH_SECS", "0"),
            ("KEEPALIVE_STATS_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(cfg.stats_timeout, Duration::from_secs(5));
        assert_eq!(cfg.http_port, 9090);
        assert_eq!(cfg.probe_timeout, Duration::from_millis(8000));
        assert!(cfg.auto_refresh);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(60));
        assert_eq!(cfg.stats_source, "http://127.0.0.1:9090/api/keepalive");
    }

    #[test]
    fn test_projects_json() {
        let targets = targets_from_lookup(&lookup_from(&[(
            "KEEPALIVE_PROJECTS",
            r#"[{"url":" `https://a.test/` ","key":"k1","name":"A"},{"url":"https://b.test","key":""}]"#,
        )]));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].endpoint_base, "https://a.test");
        assert_eq!(targets[0].credential, "k1");
        assert_eq!(targets[0].display_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_numbered_slots() {
        let targets = targets_from_lookup(&lookup_from(&[
            ("KEEPALIVE_URL_1", "https://one.test"),
            ("KEEPALIVE_KEY_1", "k1"),
            ("KEEPALIVE_URL_2", "https://two.test"),
            ("KEEPALIVE_URL_10", "https://ten.test"),
            ("KEEPALIVE_KEY_10", "k10"),
            ("KEEPALIVE_NAME_10", "Ten"),
            ("KEEPALIVE_URL_11", "https://eleven.test"),
            ("KEEPALIVE_KEY_11", "k11"),
        ]));
        let urls: Vec<_> = targets.iter().map(|t| t.endpoint_base.as_str()).collect();
        assert_eq!(urls, vec!["https://one.test", "https://ten.test"]);
        assert_eq!(targets[1].display_name.as_deref(), Some("Ten"));
    }

    #[test]
    fn test_malformed_projects_falls_through() {
        let targets = targets_from_lookup(&lookup_from(&[("KEEPALIVE_PROJECTS", "{not json")]));
        assert!(targets.is_empty());

        let targets = targets_from_lookup(&lookup_from(&[
            ("KEEPALIVE_PROJECTS", r#"{"url":"x"}"#),
            ("KEEPALIVE_URL_3", "https://three.test"),
            ("KEEPALIVE_KEY_3", "k3"),
        ]));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].endpoint_base, "https://three.test");
    }

    #[test]
    fn test_json_to_string() {
        assert_eq!(json_to_string(&serde_json::json!(null)), "");
        assert_eq!(json_to_string(&serde_json::json!("abc")), "abc");
        assert_eq!(json_to_string(&serde_json::json!(42)), "42");
        assert_eq!(json_to_optional_string(&serde_json::json!("")), None);
    }

    #[test]
    fn test_falsy_scalars_are_empty() {
        assert_eq!(json_to_string(&serde_json::json!(0)), "");
        assert_eq!(json_to_string(&serde_json::json!(0.0)), "");
        assert_eq!(json_to_string(&serde_json::json!(false)), "");
        assert_eq!(json_to_string(&serde_json::json!(7)), "7");
        assert!(!target_from_value(&serde_json::json!({"url": 0, "key": "k"}))
            .normalized()
            .is_valid());
    }

    #[test]
    fn test_projects_json_skips_non_objects() {
        for raw in [
            r#"[{"url":"https://a.test","key":"k1"}, 5]"#,
            r#"["junk", {"url":"https://a.test","key":"k1"}, null]"#,
        ] {
            let targets = targets_from_lookup(&lookup_from(&[
                ("KEEPALIVE_PROJECTS", raw),
                ("KEEPALIVE_URL_1", "https://slot.test"),
                ("KEEPALIVE_KEY_1", "sk"),
            ]));
            assert_eq!(targets.len(), 1, "projects {}", raw);
            assert_eq!(targets[0].endpoint_base, "https://a.test");
        }
    }
}
