//! Target sourcing for a round.

use crate::config::target_from_value;
use crate::probe::Target;

use serde_json::Value;

/// Where a round's targets came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// `{"projects": [...]}` in the request body
    BodyList,
    /// A single `{"url", "key", "name"?}` in the request body
    BodySingle,
    /// The configured default list
    Default,
}

/// Pick the targets for a request.
///
/// A body carrying either shape wins over the defaults. An absent, malformed
/// or unrecognized body silently falls back to `defaults`.
pub fn select_targets(body: &[u8], defaults: &[Target]) -> (Vec<Target>, TargetSource) {
    match targets_from_body(body) {
        Some((targets, source)) => (targets, source),
        None => (defaults.to_vec(), TargetSource::Default),
    }
}

fn targets_from_body(body: &[u8]) -> Option<(Vec<Target>, TargetSource)> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Ignoring unparseable request body: {}", e);
            return None;
        }
    };

    if let Some(projects) = value.get("projects").and_then(Value::as_array) {
        let targets = projects
            .iter()
            .map(target_from_value)
            .filter(|t| !t.endpoint_base.is_empty() && !t.credential.is_empty())
            .collect();
        return Some((targets, TargetSource::BodyList));
    }

    let single = target_from_value(&value);
    if !single.endpoint_base.is_empty() && !single.credential.is_empty() {
        return Some((vec![single], TargetSource::BodySingle));
    }

    None
}
