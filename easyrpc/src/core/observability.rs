use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::info;

pub type Labels<'a> = &'a [(&'a str, &'a str)];

/// Counter for messages accepted by the channel
pub const MESSAGES_SENT_TOTAL: &str = "messages_sent_total";
/// Counter for messages the channel refused
pub const MESSAGES_FAILED_TOTAL: &str = "messages_failed_total";

pub trait MetricsSink: Send + Sync + 'static {
    fn incr_counter(&self, name: &str, value: u64, labels: Labels<'_>);
}

#[derive(Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr_counter(&self, _name: &str, _value: u64, _labels: Labels<'_>) {}
}

#[derive(Default)]
pub struct InMemoryMetrics {
    counters: DashMap<String, u64>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str, labels: Labels<'_>) -> u64 {
        self.counters
            .get(&format_metric_key(name, labels))
            .map_or(0, |v| *v.value())
    }

    pub fn snapshot_counters(&self) -> Vec<(String, u64)> {
        let mut items: Vec<_> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items
    }
}

impl MetricsSink for InMemoryMetrics {
    fn incr_counter(&self, name: &str, value: u64, labels: Labels<'_>) {
        let key = format_metric_key(name, labels);
        self.counters
            .entry(key)
            .and_modify(|v| *v = v.saturating_add(value))
            .or_insert(value);
    }
}

pub fn spawn_metrics_log_reporter(
    metrics: Arc<InMemoryMetrics>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let counters = metrics.snapshot_counters();
            if !counters.is_empty() {
                info!("metrics.counters: {:?}", counters);
            }
        }
    })
}

pub fn format_metric_key(name: &str, labels: Labels<'_>) -> String {
    if labels.is_empty() {
        return name.to_string();
    }

    let mut labels_vec: Vec<_> = labels.iter().map(|(k, v)| (*k, *v)).collect();
    labels_vec.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::with_capacity(name.len() + labels_vec.len() * 12);
    out.push_str(name);
    out.push('{');

    for (idx, (k, v)) in labels_vec.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }

    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_key_has_stable_label_order() {
        let a = format_metric_key(
            MESSAGES_SENT_TOTAL,
            &[("destination", "subscribe"), ("channel", "queue")],
        );
        let b = format_metric_key(
            MESSAGES_SENT_TOTAL,
            &[("channel", "queue"), ("destination", "subscribe")],
        );
        assert_eq!(a, b);
        assert_eq!(a, "messages_sent_total{channel=queue,destination=subscribe}");
    }

    #[test]
    fn in_memory_metrics_accumulates_values() {
        let metrics = InMemoryMetrics::new();
        metrics.incr_counter(MESSAGES_SENT_TOTAL, 1, &[("destination", "a")]);
        metrics.incr_counter(MESSAGES_SENT_TOTAL, 2, &[("destination", "a")]);
        metrics.incr_counter(MESSAGES_FAILED_TOTAL, 1, &[]);

        let counters = metrics.snapshot_counters();
        assert_eq!(counters.len(), 2);
        assert_eq!(metrics.counter(MESSAGES_SENT_TOTAL, &[("destination", "a")]), 3);
        assert_eq!(metrics.counter(MESSAGES_FAILED_TOTAL, &[]), 1);
        assert_eq!(metrics.counter("unknown", &[]), 0);
    }
}
