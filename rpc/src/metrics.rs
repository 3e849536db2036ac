//! Prometheus metrics for the voting API.
//!
//! [`VotingMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct VotingMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Votes accepted and written to the ledger.
    pub votes_submitted: IntCounter,
    /// Submissions rejected because the resident had already voted.
    pub duplicate_votes: IntCounter,
    /// Votes removed by an administrator.
    pub votes_deleted: IntCounter,
    /// Ledger changes that could not be published to live subscribers.
    pub broadcast_failures: IntCounter,
    /// Public and auth tokens issued.
    pub tokens_issued: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Open server-sent event streams.
    pub sse_connections: IntGauge,
}

impl VotingMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let votes_submitted = register_int_counter_with_registry!(
            Opts::new("agora_votes_submitted_total", "Total votes recorded"),
            registry
        )?;
        let duplicate_votes = register_int_counter_with_registry!(
            Opts::new(
                "agora_duplicate_votes_total",
                "Total vote submissions rejected as duplicates"
            ),
            registry
        )?;
        let votes_deleted = register_int_counter_with_registry!(
            Opts::new("agora_votes_deleted_total", "Total votes deleted by admins"),
            registry
        )?;
        let broadcast_failures = register_int_counter_with_registry!(
            Opts::new(
                "agora_broadcast_failures_total",
                "Total ledger changes not published to live streams"
            ),
            registry
        )?;
        let tokens_issued = register_int_counter_with_registry!(
            Opts::new("agora_tokens_issued_total", "Total voting tokens issued"),
            registry
        )?;
        let sse_connections = register_int_gauge_with_registry!(
            Opts::new("agora_sse_connections", "Current open vote streams"),
            registry
        )?;

        Ok(Self {
            registry,
            votes_submitted,
            duplicate_votes,
            votes_deleted,
            broadcast_failures,
            tokens_issued,
            sse_connections,
        })
    }

    /// Encode every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Counts one open stream for as long as it lives.
pub struct ConnectionGuard {
    gauge: IntGauge,
}

impl ConnectionGuard {
    pub fn new(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self {
            gauge: gauge.clone(),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
