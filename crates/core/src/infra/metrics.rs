use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::domain::error::ErrorCode;

/// 保持するレイテンシ記録の上限
const LATENCY_CAP: usize = 1000;

/// ローカルメトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    templates_rendered: u64,
    corrections_requested: u64,
    corrections_cancelled: u64,
    bulk_items_copied: u64,
    quick_copies: u64,
    errors: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（UIに返す用）
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub templates_rendered: u64,
    pub corrections_requested: u64,
    pub corrections_cancelled: u64,
    pub bulk_items_copied: u64,
    pub quick_copies: u64,
    /// エラーコード（`E_*`）→ 件数
    pub error_counts: BTreeMap<String, u64>,
    pub avg_latency_ms: AvgLatency,
    pub recent_latencies: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub extract: Option<f64>,
    pub render: Option<f64>,
    pub fetch: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_templates_rendered(&self) {
        self.counters.lock().unwrap().templates_rendered += 1;
    }

    pub fn inc_corrections_requested(&self) {
        self.counters.lock().unwrap().corrections_requested += 1;
    }

    pub fn inc_corrections_cancelled(&self) {
        self.counters.lock().unwrap().corrections_cancelled += 1;
    }

    pub fn inc_bulk_items_copied(&self) {
        self.counters.lock().unwrap().bulk_items_copied += 1;
    }

    pub fn inc_quick_copies(&self) {
        self.counters.lock().unwrap().quick_copies += 1;
    }

    pub fn inc_error(&self, code: ErrorCode) {
        *self
            .counters
            .lock()
            .unwrap()
            .errors
            .entry(code.as_str())
            .or_insert(0) += 1;
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let record = LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock().unwrap();
        latencies.push(record);
        if latencies.len() > LATENCY_CAP {
            let excess = latencies.len() - LATENCY_CAP;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock().unwrap();
        let latencies = self.latencies.lock().unwrap();

        let avg = |phase: &str| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.phase == phase)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        MetricsSummary {
            templates_rendered: c.templates_rendered,
            corrections_requested: c.corrections_requested,
            corrections_cancelled: c.corrections_cancelled,
            bulk_items_copied: c.bulk_items_copied,
            quick_copies: c.quick_copies,
            error_counts: c
                .errors
                .iter()
                .map(|(code, n)| (code.to_string(), *n))
                .collect(),
            avg_latency_ms: AvgLatency {
                extract: avg("extract"),
                render: avg("render"),
                fetch: avg("fetch"),
            },
            recent_latencies: recent,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
