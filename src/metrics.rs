use crate::constants::ENV_METRICS_PORT;
use ::metrics::{counter, histogram};
use std::net::SocketAddr;

pub const DISCIPLINES_SCRAPED: &str = "uerj_disciplines_scraped_total";
pub const ENRICHMENT_FAILURES: &str = "uerj_enrichment_failures_total";
pub const UPSERTS: &str = "uerj_upserts_total";
pub const CRAWL_DURATION: &str = "uerj_crawl_duration_seconds";
pub const CRAWLS: &str = "uerj_crawls_total";

#[derive(Debug, Clone, Copy)]
pub enum UpsertKind {
    Inserted,
    Updated,
    Unchanged,
    Failed,
}

impl UpsertKind {
    fn label(self) -> &'static str {
        match self {
            UpsertKind::Inserted => "inserted",
            UpsertKind::Updated => "updated",
            UpsertKind::Unchanged => "unchanged",
            UpsertKind::Failed => "failed",
        }
    }
}

pub fn record_upsert(kind: UpsertKind) {
    counter!(UPSERTS, "outcome" => kind.label()).increment(1);
}

pub fn record_discipline_scraped() {
    counter!(DISCIPLINES_SCRAPED).increment(1);
}

pub fn record_enrichment_failure() {
    counter!(ENRICHMENT_FAILURES).increment(1);
}

pub fn record_crawl(outcome: &'static str, duration_secs: f64) {
    counter!(CRAWLS, "outcome" => outcome).increment(1);
    histogram!(CRAWL_DURATION).record(duration_secs);
}

/// Installs the Prometheus exporter on `UERJ_METRICS_PORT` (default 9898).
pub fn init_metrics() {
    let port: u16 = std::env::var(ENV_METRICS_PORT)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9898);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            tracing::info!("Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            tracing::warn!("Prometheus exporter install failed (possibly already installed): {}", e);
        }
    }
}
