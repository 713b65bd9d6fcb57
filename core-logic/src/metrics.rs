use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_secs: f64,
    pub transfers: TransferMetrics,
    pub confirmation: LatencyMetrics,
    pub cancellations: CancellationMetrics,
    pub funding: FundingMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferMetrics {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub nonce_resyncs: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyMetrics {
    pub samples: u64,
    pub avg_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationMetrics {
    pub submitted: u64,
    pub confirmed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundingMetrics {
    pub sent: u64,
    pub failed: u64,
}

#[derive(Debug)]
pub struct MetricsCollector {
    transfers_total: AtomicU64,
    transfers_success: AtomicU64,
    transfers_failed: AtomicU64,
    nonce_resyncs: AtomicU64,
    confirm_samples: AtomicU64,
    confirm_sum_ms: AtomicU64,
    confirm_min_ms: AtomicU64,
    confirm_max_ms: AtomicU64,
    cancellations_submitted: AtomicU64,
    cancellations_confirmed: AtomicU64,
    funding_sent: AtomicU64,
    funding_failed: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            transfers_total: AtomicU64::new(0),
            transfers_success: AtomicU64::new(0),
            transfers_failed: AtomicU64::new(0),
            nonce_resyncs: AtomicU64::new(0),
            confirm_samples: AtomicU64::new(0),
            confirm_sum_ms: AtomicU64::new(0),
            confirm_min_ms: AtomicU64::new(u64::MAX),
            confirm_max_ms: AtomicU64::new(0),
            cancellations_submitted: AtomicU64::new(0),
            cancellations_confirmed: AtomicU64::new(0),
            funding_sent: AtomicU64::new(0),
            funding_failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl MetricsCollector {
    pub fn global() -> &'static Self {
        static INSTANCE: std::sync::OnceLock<MetricsCollector> = std::sync::OnceLock::new();
        INSTANCE.get_or_init(MetricsCollector::default)
    }

    /// `latency` is submit-to-receipt time; pass `None` for transfers that never confirmed.
    pub fn record_transfer(&self, success: bool, latency: Option<Duration>) {
        self.transfers_total.fetch_add(1, Ordering::SeqCst);
        if success {
            self.transfers_success.fetch_add(1, Ordering::SeqCst);
        } else {
            self.transfers_failed.fetch_add(1, Ordering::SeqCst);
        }

        if let Some(latency) = latency {
            let ms = latency.as_millis() as u64;
            self.confirm_samples.fetch_add(1, Ordering::SeqCst);
            self.confirm_sum_ms.fetch_add(ms, Ordering::SeqCst);
            self.confirm_min_ms.fetch_min(ms, Ordering::SeqCst);
            self.confirm_max_ms.fetch_max(ms, Ordering::SeqCst);
        }
    }

    pub fn record_nonce_resync(&self) {
        self.nonce_resyncs.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_cancellations(&self, submitted: u64, confirmed: u64) {
        self.cancellations_submitted
            .fetch_add(submitted, Ordering::SeqCst);
        self.cancellations_confirmed
            .fetch_add(confirmed, Ordering::SeqCst);
    }

    pub fn record_funding(&self, success: bool) {
        if success {
            self.funding_sent.fetch_add(1, Ordering::SeqCst);
        } else {
            self.funding_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.transfers_total.load(Ordering::SeqCst);
        let success = self.transfers_success.load(Ordering::SeqCst);
        let samples = self.confirm_samples.load(Ordering::SeqCst);
        let sum_ms = self.confirm_sum_ms.load(Ordering::SeqCst);
        let min_ms = self.confirm_min_ms.load(Ordering::SeqCst);

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_secs: self.uptime().as_secs_f64(),
            transfers: TransferMetrics {
                total,
                success,
                failed: self.transfers_failed.load(Ordering::SeqCst),
                nonce_resyncs: self.nonce_resyncs.load(Ordering::SeqCst),
                success_rate: if total > 0 {
                    success as f64 / total as f64
                } else {
                    0.0
                },
            },
            confirmation: LatencyMetrics {
                samples,
                avg_ms: if samples > 0 {
                    sum_ms as f64 / samples as f64
                } else {
                    0.0
                },
                min_ms: if min_ms == u64::MAX { 0 } else { min_ms },
                max_ms: self.confirm_max_ms.load(Ordering::SeqCst),
            },
            cancellations: CancellationMetrics {
                submitted: self.cancellations_submitted.load(Ordering::SeqCst),
                confirmed: self.cancellations_confirmed.load(Ordering::SeqCst),
            },
            funding: FundingMetrics {
                sent: self.funding_sent.load(Ordering::SeqCst),
                failed: self.funding_failed.load(Ordering::SeqCst),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    pub async fn export_to_file(&self, path: &str) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_json()).await
    }

    pub fn transfers_total(&self) -> u64 {
        self.transfers_total.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
