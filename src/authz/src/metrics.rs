//! Decision metrics for the authorization path

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// How a single check ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Denied,
    NotFound,
    Error,
}

/// Snapshot of decision counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionSnapshot {
    /// Total number of checks
    pub total_checks: u64,

    pub allowed: u64,

    pub denied: u64,

    /// Checks against a resource with no record
    pub not_found: u64,

    /// Checks that failed on the permission store
    pub errors: u64,

    /// Average check latency
    pub avg_latency_ms: f64,

    /// Largest observed check latency
    pub max_latency_ms: f64,
}

impl DecisionSnapshot {
    /// Share of allow outcomes among allow/deny decisions
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed + self.denied;
        if total == 0 {
            0.0
        } else {
            self.allowed as f64 / total as f64
        }
    }
}

/// Collects decision outcomes and latency
pub struct DecisionMetrics {
    snapshot: Arc<RwLock<DecisionSnapshot>>,
    latency_total_ms: Arc<RwLock<f64>>,
}

impl DecisionMetrics {
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(DecisionSnapshot::default())),
            latency_total_ms: Arc::new(RwLock::new(0.0)),
        }
    }

    /// Record one check outcome with its latency
    pub async fn record(&self, outcome: Outcome, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut total = self.latency_total_ms.write().await;
        *total += latency_ms;

        let mut snapshot = self.snapshot.write().await;
        snapshot.total_checks += 1;
        match outcome {
            Outcome::Allowed => snapshot.allowed += 1,
            Outcome::Denied => snapshot.denied += 1,
            Outcome::NotFound => snapshot.not_found += 1,
            Outcome::Error => snapshot.errors += 1,
        }
        snapshot.avg_latency_ms = *total / snapshot.total_checks as f64;
        if latency_ms > snapshot.max_latency_ms {
            snapshot.max_latency_ms = latency_ms;
        }
    }

    pub async fn snapshot(&self) -> DecisionSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn reset(&self) {
        *self.latency_total_ms.write().await = 0.0;
        *self.snapshot.write().await = DecisionSnapshot::default();
    }

    /// Export metrics in Prometheus format
    pub async fn export_prometheus(&self) -> String {
        let snapshot = self.snapshot.read().await;

        format!(
            r#"# HELP broker_authz_checks_total Total number of authorization checks
# TYPE broker_authz_checks_total counter
broker_authz_checks_total {}

# HELP broker_authz_decisions_total Checks by outcome
# TYPE broker_authz_decisions_total counter
broker_authz_decisions_total{{outcome="allowed"}} {}
broker_authz_decisions_total{{outcome="denied"}} {}
broker_authz_decisions_total{{outcome="not_found"}} {}
broker_authz_decisions_total{{outcome="error"}} {}

# HELP broker_authz_latency_seconds_avg Average check latency
# TYPE broker_authz_latency_seconds_avg gauge
broker_authz_latency_seconds_avg {}
"#,
            snapshot.total_checks,
            snapshot.allowed,
            snapshot.denied,
            snapshot.not_found,
            snapshot.errors,
            snapshot.avg_latency_ms / 1000.0,
        )
    }
}

impl Default for DecisionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
