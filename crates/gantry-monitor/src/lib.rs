//! Per-run metrics collection for pipeline executions.
//!
//! The collector is owned by one run and never shared across runs; the
//! engine records one [`NodeMetrics`] per node execution and the caller
//! flushes the aggregate when the run finishes.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Measurements from a single node execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub node_id: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub duration: Duration,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated measurements for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub pipeline_id: String,
    pub total_tokens: u32,
    pub total_duration: Duration,
    pub node_metrics: HashMap<String, NodeMetrics>,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            pipeline_id: String::new(),
            total_tokens: 0,
            total_duration: Duration::ZERO,
            node_metrics: HashMap::new(),
            start_time: SystemTime::UNIX_EPOCH,
            end_time: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Sink for node-level measurements during a run.
pub trait MetricsCollector: Send + Sync {
    /// Records metrics from a node execution, replacing any earlier entry
    /// for the same node id.
    fn record(&self, metrics: NodeMetrics);

    /// Returns the aggregated pipeline metrics.
    fn flush(&self) -> PipelineMetrics;

    /// Clears state for a new run.
    fn reset(&self);
}

/// The default collector: an in-memory map keyed by node id.
pub struct InMemoryCollector {
    pipeline_id: String,
    inner: RwLock<CollectorState>,
}

struct CollectorState {
    metrics: HashMap<String, NodeMetrics>,
    start_time: SystemTime,
}

impl InMemoryCollector {
    pub fn new(pipeline_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            inner: RwLock::new(CollectorState {
                metrics: HashMap::new(),
                start_time: SystemTime::now(),
            }),
        }
    }
}

impl MetricsCollector for InMemoryCollector {
    fn record(&self, metrics: NodeMetrics) {
        let Ok(mut state) = self.inner.write() else {
            tracing::warn!("failed to acquire metrics lock");
            return;
        };
        tracing::debug!(
            node_id = %metrics.node_id,
            tokens_in = metrics.tokens_in,
            tokens_out = metrics.tokens_out,
            duration_ms = metrics.duration.as_millis() as u64,
            "recorded node metrics"
        );
        state.metrics.insert(metrics.node_id.clone(), metrics);
    }

    fn flush(&self) -> PipelineMetrics {
        let Ok(state) = self.inner.read() else {
            return PipelineMetrics { pipeline_id: self.pipeline_id.clone(), ..Default::default() };
        };

        let mut total_tokens = 0u32;
        let mut total_duration = Duration::ZERO;
        for m in state.metrics.values() {
            total_tokens += m.tokens_in + m.tokens_out;
            total_duration += m.duration;
        }

        PipelineMetrics {
            pipeline_id: self.pipeline_id.clone(),
            total_tokens,
            total_duration,
            node_metrics: state.metrics.clone(),
            start_time: state.start_time,
            end_time: SystemTime::now(),
        }
    }

    fn reset(&self) {
        let Ok(mut state) = self.inner.write() else { return };
        state.metrics.clear();
        state.start_time = SystemTime::now();
    }
}

/// Collector that discards everything, for callers that do not want
/// measurement.
#[derive(Default)]
pub struct NoOpCollector;

impl NoOpCollector {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsCollector for NoOpCollector {
    fn record(&self, _metrics: NodeMetrics) {}

    fn flush(&self) -> PipelineMetrics {
        PipelineMetrics::default()
    }

    fn reset(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(node_id: &str, tokens_in: u32, tokens_out: u32, ms: u64) -> NodeMetrics {
        NodeMetrics {
            node_id: node_id.into(),
            tokens_in,
            tokens_out,
            duration: Duration::from_millis(ms),
            success: true,
            error: None,
        }
    }

    #[test]
    fn flush_sums_tokens_and_durations() {
        let collector = InMemoryCollector::new("test-pipeline");
        collector.record(metrics("node1", 100, 50, 200));
        collector.record(metrics("node2", 150, 75, 300));

        let pm = collector.flush();
        assert_eq!(pm.pipeline_id, "test-pipeline");
        assert_eq!(pm.total_tokens, 375);
        assert_eq!(pm.total_duration, Duration::from_millis(500));
        assert_eq!(pm.node_metrics.len(), 2);
        assert!(pm.end_time >= pm.start_time);
    }

    #[test]
    fn record_upserts_by_node_id() {
        let collector = InMemoryCollector::new("p");
        collector.record(metrics("node1", 10, 10, 10));
        collector.record(metrics("node1", 20, 20, 20));

        let pm = collector.flush();
        assert_eq!(pm.node_metrics.len(), 1);
        assert_eq!(pm.total_tokens, 40);
    }

    #[test]
    fn reset_clears_state() {
        let collector = InMemoryCollector::new("p");
        collector.record(metrics("node1", 10, 10, 10));
        collector.reset();
        assert!(collector.flush().node_metrics.is_empty());
    }

    #[test]
    fn noop_collector_discards() {
        let collector = NoOpCollector::new();
        collector.record(metrics("node1", 10, 10, 10));
        assert!(collector.flush().node_metrics.is_empty());
    }
}
