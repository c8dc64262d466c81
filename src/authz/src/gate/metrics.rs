//! Gate outcome metrics in Prometheus text format

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Kind of outcome the gate produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Proceed,
    Deny,
    RequireLogin,
}

/// Gate counters and latency summary
#[derive(Debug, Clone, Default)]
pub struct GateMetrics {
    /// Total number of gated requests
    pub total_requests: u64,

    pub proceeded: u64,

    pub denied: u64,

    pub login_required: u64,

    /// Sessions cleared on an identity-integrity failure
    pub sessions_invalidated: u64,

    /// Latency percentiles
    pub latency_p50_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p99_ms: f64,

    pub avg_latency_ms: f64,
}

impl GateMetrics {
    /// Share of gated requests that proceeded
    pub fn proceed_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.proceeded as f64 / self.total_requests as f64
        }
    }
}

/// Metrics collector shared by gate clones
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<GateMetrics>>,

    /// Latency samples for percentile calculation
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(GateMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(10_000))),
            max_samples: 10_000,
        }
    }

    pub async fn record_outcome(&self, kind: OutcomeKind) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;

        match kind {
            OutcomeKind::Proceed => metrics.proceeded += 1,
            OutcomeKind::Deny => metrics.denied += 1,
            OutcomeKind::RequireLogin => metrics.login_required += 1,
        }
    }

    pub async fn record_session_invalidated(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.sessions_invalidated += 1;
    }

    /// Store one latency sample; percentiles are derived on read
    pub async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            samples.drain(0..1_000);
        }
    }

    /// Current metrics snapshot
    pub async fn snapshot(&self) -> GateMetrics {
        let mut metrics = self.metrics.read().await.clone();

        let mut sorted = self.latency_samples.read().await.clone();
        if sorted.is_empty() {
            return metrics;
        }
        sorted.sort_by(f64::total_cmp);

        metrics.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        metrics.latency_p50_ms = Self::percentile(&sorted, 0.50);
        metrics.latency_p90_ms = Self::percentile(&sorted, 0.90);
        metrics.latency_p99_ms = Self::percentile(&sorted, 0.99);
        metrics
    }

    pub async fn reset(&self) {
        *self.metrics.write().await = GateMetrics::default();
        self.latency_samples.write().await.clear();
    }

    /// Export metrics in Prometheus format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.snapshot().await;

        format!(
            r#"# HELP gate_requests_total Total number of gated requests
# TYPE gate_requests_total counter
gate_requests_total {}

# HELP gate_outcomes_total Gate outcomes by kind
# TYPE gate_outcomes_total counter
gate_outcomes_total{{outcome="proceed"}} {}
gate_outcomes_total{{outcome="deny"}} {}
gate_outcomes_total{{outcome="require_login"}} {}

# HELP gate_sessions_invalidated_total Sessions cleared on identity failures
# TYPE gate_sessions_invalidated_total counter
gate_sessions_invalidated_total {}

# HELP gate_latency_seconds Gate latency percentiles
# TYPE gate_latency_seconds summary
gate_latency_seconds{{quantile="0.5"}} {}
gate_latency_seconds{{quantile="0.9"}} {}
gate_latency_seconds{{quantile="0.99"}} {}
"#,
            metrics.total_requests,
            metrics.proceeded,
            metrics.denied,
            metrics.login_required,
            metrics.sessions_invalidated,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p90_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
        )
    }

    /// Percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_outcomes() {
        let collector = MetricsCollector::new();

        collector.record_outcome(OutcomeKind::Proceed).await;
        collector.record_outcome(OutcomeKind::Deny).await;
        collector.record_outcome(OutcomeKind::RequireLogin).await;
        collector.record_outcome(OutcomeKind::Proceed).await;
        collector.record_session_invalidated().await;

        let metrics = collector.snapshot().await;
        assert_eq!(metrics.total_requests, 4);
        assert_eq!(metrics.proceeded, 2);
        assert_eq!(metrics.denied, 1);
        assert_eq!(metrics.login_required, 1);
        assert_eq!(metrics.sessions_invalidated, 1);
        assert!((metrics.proceed_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_record_latency() {
        let collector = MetricsCollector::new();

        collector.record_latency(Duration::from_millis(5)).await;
        collector.record_latency(Duration::from_millis(10)).await;
        collector.record_latency(Duration::from_millis(15)).await;

        let metrics = collector.snapshot().await;
        assert!((metrics.avg_latency_ms - 10.0).abs() < 1.0);
        assert!(metrics.latency_p50_ms > 0.0);
        assert!(metrics.latency_p99_ms >= metrics.latency_p50_ms);
    }

    #[tokio::test]
    async fn test_prometheus_export() {
        let collector = MetricsCollector::new();
        collector.record_outcome(OutcomeKind::Deny).await;

        let prometheus = collector.export_prometheus().await;
        assert!(prometheus.contains("gate_requests_total 1"));
        assert!(prometheus.contains("gate_outcomes_total{outcome=\"deny\"} 1"));
    }

    #[tokio::test]
    async fn test_reset() {
        let collector = MetricsCollector::new();
        collector.record_outcome(OutcomeKind::Proceed).await;

        collector.reset().await;

        let metrics = collector.snapshot().await;
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.proceed_rate(), 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reset_and_record() {
        let collector = MetricsCollector::new();
        let mut handles = Vec::new();

        for i in 0..4 {
            let recorder = collector.clone();
            handles.push(tokio::spawn(async move {
                for n in 0..500u64 {
                    recorder.record_latency(Duration::from_micros(n + i)).await;
                    recorder.record_outcome(OutcomeKind::Proceed).await;
                }
            }));

            let resetter = collector.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..500 {
                    resetter.reset().await;
                    resetter.snapshot().await;
                }
            }));
        }

        let all = async {
            for handle in handles {
                handle.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(20), all)
            .await
            .expect("recording and resetting must not block each other");

        collector.reset().await;
        collector.record_latency(Duration::from_millis(4)).await;
        let metrics = collector.snapshot().await;
        assert_eq!(metrics.total_requests, 0);
        assert!((metrics.latency_p50_ms - 4.0).abs() < 0.001);
    }
}
