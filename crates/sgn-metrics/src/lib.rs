//! Metrics registry for the daemon: fixed-bucket latency histograms,
//! counters, and gauges, exposed as JSON or Prometheus text (spec §3,
//! §4.9). Metric names follow the spec's dotted names with `.` replaced
//! by `_` and a `sgn_` prefix, e.g. `http.publish` -> `sgn_http_publish`.

pub mod error;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder};
use serde::Serialize;

pub use error::{Error, Result};

/// Request-latency histogram buckets, in milliseconds.
pub const LATENCY_BUCKETS_MS: [f64; 7] = [10.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0];

/// Named metrics exported by the daemon.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    http_publish: Histogram,
    http_verify: Histogram,
    db_read: Histogram,
    db_write: Histogram,

    net_delivered_total: IntCounter,
    net_acked_total: IntCounter,
    net_dedup_total: IntCounter,
    events_drop_total: IntCounterVec,
    outbox_deliveries_total: IntCounter,
    outbox_retries_total: IntCounter,
    edges_insert_total: IntCounterVec,
    graph_req_total: IntCounter,
    ku_stored_total: IntCounter,
    ku_deduplicated_total: IntCounter,
    ku_verify_failures_total: IntCounterVec,

    outbox_ready: IntGauge,
    outbox_stalled: IntGauge,
    ws_clients: IntGauge,
    fs_kus_count: IntGauge,
    consistency_mismatches: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_publish = Histogram::with_opts(
            HistogramOpts::new("sgn_http_publish", "POST /publish latency in milliseconds")
                .buckets(LATENCY_BUCKETS_MS.to_vec()),
        )?;
        let http_verify = Histogram::with_opts(
            HistogramOpts::new("sgn_http_verify", "POST /verify latency in milliseconds")
                .buckets(LATENCY_BUCKETS_MS.to_vec()),
        )?;
        let db_read = Histogram::with_opts(
            HistogramOpts::new("sgn_db_read", "Object store read latency in milliseconds")
                .buckets(LATENCY_BUCKETS_MS.to_vec()),
        )?;
        let db_write = Histogram::with_opts(
            HistogramOpts::new("sgn_db_write", "Object store write latency in milliseconds")
                .buckets(LATENCY_BUCKETS_MS.to_vec()),
        )?;

        let net_delivered_total =
            IntCounter::new("sgn_net_delivered_total", "Event frames delivered to subscribers")?;
        let net_acked_total =
            IntCounter::new("sgn_net_acked_total", "Client acknowledgements received over /events")?;
        let net_dedup_total = IntCounter::new(
            "sgn_net_dedup_total",
            "Redundant deliveries suppressed by subscriber-side CID dedup",
        )?;
        let events_drop_total = IntCounterVec::new(
            prometheus::Opts::new("sgn_events_drop_total", "Event frames dropped by reason"),
            &["reason"],
        )?;
        let outbox_deliveries_total =
            IntCounter::new("sgn_outbox_deliveries_total", "Outbox entries delivered")?;
        let outbox_retries_total =
            IntCounter::new("sgn_outbox_retries_total", "Outbox entries that failed and were retried")?;
        let edges_insert_total = IntCounterVec::new(
            prometheus::Opts::new("sgn_edges_insert_total", "Edges inserted by type"),
            &["edge_type"],
        )?;
        let graph_req_total = IntCounter::new("sgn_graph_req_total", "GET /graph/:cid requests")?;
        let ku_stored_total = IntCounter::new("sgn_ku_stored_total", "KUs newly stored by publish")?;
        let ku_deduplicated_total =
            IntCounter::new("sgn_ku_deduplicated_total", "Publishes deduplicated by CID")?;
        let ku_verify_failures_total = IntCounterVec::new(
            prometheus::Opts::new(
                "sgn_ku_verify_failures_total",
                "KU signature verification failures by reason",
            ),
            &["reason"],
        )?;

        let outbox_ready = IntGauge::new("sgn_outbox_ready", "Outbox entries with next_try_at <= now")?;
        let outbox_stalled = IntGauge::new(
            "sgn_outbox_stalled",
            "Outbox entries dropped after exhausting retries",
        )?;
        let ws_clients = IntGauge::new("sgn_ws_clients", "Connected event subscribers")?;
        let fs_kus_count = IntGauge::new("sgn_fs_kus_count", "KU blob files on disk")?;
        let consistency_mismatches =
            IntGauge::new("sgn_consistency_mismatches", "Mismatches found by the last consistency probe")?;

        registry.register(Box::new(http_publish.clone()))?;
        registry.register(Box::new(http_verify.clone()))?;
        registry.register(Box::new(db_read.clone()))?;
        registry.register(Box::new(db_write.clone()))?;
        registry.register(Box::new(net_delivered_total.clone()))?;
        registry.register(Box::new(net_acked_total.clone()))?;
        registry.register(Box::new(net_dedup_total.clone()))?;
        registry.register(Box::new(events_drop_total.clone()))?;
        registry.register(Box::new(outbox_deliveries_total.clone()))?;
        registry.register(Box::new(outbox_retries_total.clone()))?;
        registry.register(Box::new(edges_insert_total.clone()))?;
        registry.register(Box::new(graph_req_total.clone()))?;
        registry.register(Box::new(ku_stored_total.clone()))?;
        registry.register(Box::new(ku_deduplicated_total.clone()))?;
        registry.register(Box::new(ku_verify_failures_total.clone()))?;
        registry.register(Box::new(outbox_ready.clone()))?;
        registry.register(Box::new(outbox_stalled.clone()))?;
        registry.register(Box::new(ws_clients.clone()))?;
        registry.register(Box::new(fs_kus_count.clone()))?;
        registry.register(Box::new(consistency_mismatches.clone()))?;

        Ok(Metrics {
            registry,
            http_publish,
            http_verify,
            db_read,
            db_write,
            net_delivered_total,
            net_acked_total,
            net_dedup_total,
            events_drop_total,
            outbox_deliveries_total,
            outbox_retries_total,
            edges_insert_total,
            graph_req_total,
            ku_stored_total,
            ku_deduplicated_total,
            ku_verify_failures_total,
            outbox_ready,
            outbox_stalled,
            ws_clients,
            fs_kus_count,
            consistency_mismatches,
        })
    }

    pub fn observe_http_publish(&self, duration_ms: f64) {
        self.http_publish.observe(duration_ms);
    }

    pub fn observe_http_verify(&self, duration_ms: f64) {
        self.http_verify.observe(duration_ms);
    }

    pub fn observe_db_read(&self, duration_ms: f64) {
        self.db_read.observe(duration_ms);
    }

    pub fn observe_db_write(&self, duration_ms: f64) {
        self.db_write.observe(duration_ms);
    }

    pub fn record_net_delivered(&self) {
        self.net_delivered_total.inc();
    }

    pub fn record_net_acked(&self) {
        self.net_acked_total.inc();
    }

    pub fn record_net_dedup(&self) {
        self.net_dedup_total.inc();
    }

    pub fn record_events_drop(&self, reason: &str) {
        self.events_drop_total.with_label_values(&[reason]).inc();
    }

    pub fn record_outbox_delivery(&self) {
        self.outbox_deliveries_total.inc();
    }

    pub fn record_outbox_retry(&self) {
        self.outbox_retries_total.inc();
    }

    pub fn record_edge_inserted(&self, edge_type: &str) {
        self.edges_insert_total.with_label_values(&[edge_type]).inc();
    }

    pub fn record_graph_request(&self) {
        self.graph_req_total.inc();
    }

    pub fn record_ku_stored(&self) {
        self.ku_stored_total.inc();
    }

    pub fn record_ku_deduplicated(&self) {
        self.ku_deduplicated_total.inc();
    }

    pub fn record_verify_failure(&self, reason: &str) {
        self.ku_verify_failures_total.with_label_values(&[reason]).inc();
    }

    pub fn set_outbox_ready(&self, count: i64) {
        self.outbox_ready.set(count);
    }

    pub fn record_outbox_stalled(&self) {
        self.outbox_stalled.inc();
    }

    pub fn set_ws_clients(&self, count: i64) {
        self.ws_clients.set(count);
    }

    pub fn set_fs_kus_count(&self, count: i64) {
        self.fs_kus_count.set(count);
    }

    pub fn set_consistency_mismatches(&self, count: i64) {
        self.consistency_mismatches.set(count);
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).map_err(Error::Prometheus)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Renders a compact JSON snapshot of counter and gauge values (spec §4.8).
    pub fn snapshot_json(&self) -> serde_json::Value {
        let mut families = Vec::new();
        for family in self.registry.gather() {
            families.push(MetricFamilySnapshot::from(&family));
        }
        serde_json::json!({ "metrics": families })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[derive(Serialize)]
struct MetricFamilySnapshot {
    name: String,
    help: String,
    samples: Vec<MetricSample>,
}

#[derive(Serialize)]
struct MetricSample {
    labels: std::collections::BTreeMap<String, String>,
    value: f64,
}

impl From<&prometheus::proto::MetricFamily> for MetricFamilySnapshot {
    fn from(family: &prometheus::proto::MetricFamily) -> Self {
        let samples = family
            .get_metric()
            .iter()
            .map(|m| {
                let labels = m
                    .get_label()
                    .iter()
                    .map(|l| (l.get_name().to_string(), l.get_value().to_string()))
                    .collect();
                let value = if m.has_counter() {
                    m.get_counter().get_value()
                } else if m.has_gauge() {
                    m.get_gauge().get_value()
                } else if m.has_histogram() {
                    m.get_histogram().get_sample_sum()
                } else {
                    0.0
                };
                MetricSample { labels, value }
            })
            .collect();

        MetricFamilySnapshot {
            name: family.get_name().to_string(),
            help: family.get_help().to_string(),
            samples,
        }
    }
}
