//! Rolling log maintenance and windowed aggregation.

use super::models::{AggregateStat, HistoryEntry, StatsWindow, DAY_MS, MAX_HISTORY_ENTRIES};
use crate::coordinator::RoundSummary;

use chrono::Utc;
use std::collections::HashMap;

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Record `round` at the current time.
pub fn append(log: &mut Vec<HistoryEntry>, round: &RoundSummary) {
    append_entry(
        log,
        HistoryEntry {
            timestamp: now_ms(),
            results: round.results.clone(),
        },
    );
}

/// Push `entry` and evict the oldest entries beyond the cap.
pub fn append_entry(log: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    log.push(entry);
    if log.len() > MAX_HISTORY_ENTRIES {
        let excess = log.len() - MAX_HISTORY_ENTRIES;
        log.drain(..excess);
    }
}

/// Entries no older than `window_days` before `now`, in log order.
pub fn filter_by_window(entries: &[HistoryEntry], window_days: i64, now: i64) -> Vec<HistoryEntry> {
    let cutoff = now - window_days * DAY_MS;
    entries
        .iter()
        .filter(|e| e.timestamp >= cutoff)
        .cloned()
        .collect()
}

/// [`filter_by_window`] for one of the named windows, relative to now.
pub fn filter_recent(entries: &[HistoryEntry], window: StatsWindow) -> Vec<HistoryEntry> {
    filter_by_window(entries, window.days(), now_ms())
}

/// Group every result by endpoint, in order of first appearance.
///
/// The latency mean is folded one sample at a time.
pub fn aggregate(entries: &[HistoryEntry]) -> Vec<AggregateStat> {
    let mut stats: Vec<AggregateStat> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for result in entries.iter().flat_map(|e| e.results.iter()) {
        let slot = *index.entry(result.endpoint_base.as_str()).or_insert_with(|| {
            stats.push(AggregateStat {
                display_name: result.display_name.clone(),
                endpoint_base: result.endpoint_base.clone(),
                sample_count: 0,
                success_count: 0,
                average_latency_ms: 0.0,
            });
            stats.len() - 1
        });

        let stat = &mut stats[slot];
        stat.sample_count += 1;
        if result.succeeded {
            stat.success_count += 1;
        }
        stat.average_latency_ms +=
            (result.elapsed_ms as f64 - stat.average_latency_ms) / stat.sample_count as f64;
    }

    stats
}
