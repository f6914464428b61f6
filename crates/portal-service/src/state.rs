use crate::latch::GateLatch;
use crate::matcher::{match_candidates, AllowList};
use crate::pipeline::PlateReader;
use crate::storage::UploadStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one decision cycle, echoed back to the edge device for audit.
/// The physical decision is the latch, not this body.
#[derive(Debug, Clone)]
pub struct Decision {
    pub authorized: bool,
    pub number: String,
    pub candidates: Vec<String>,
}

#[derive(Clone)]
pub struct PortalState {
    inner: Arc<PortalStateInner>,
}

struct PortalStateInner {
    reader: Arc<dyn PlateReader>,
    allow_list: AllowList,
    latch: GateLatch,
    store: UploadStore,
    fuzzy_min_similarity: f64,
    hall_sensor_phrase: String,
}

impl PortalState {
    pub fn new(
        reader: Arc<dyn PlateReader>,
        allow_list: AllowList,
        store: UploadStore,
        fuzzy_min_similarity: f64,
        hall_sensor_phrase: String,
    ) -> Self {
        Self {
            inner: Arc::new(PortalStateInner {
                reader,
                allow_list,
                latch: GateLatch::new(),
                store,
                fuzzy_min_similarity,
                hall_sensor_phrase,
            }),
        }
    }

    pub fn store(&self) -> &UploadStore {
        &self.inner.store
    }

    pub fn hall_sensor_phrase(&self) -> &str {
        &self.inner.hall_sensor_phrase
    }

    /// Run the recognition pipeline on one photograph and record the
    /// decision. Pipeline work is CPU-bound and runs on the blocking pool
    /// so poll and notification traffic is not starved.
    pub async fn decide(&self, image_bytes: Vec<u8>) -> Decision {
        let reader = Arc::clone(&self.inner.reader);
        let candidates =
            match tokio::task::spawn_blocking(move || reader.read_plates(&image_bytes)).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("recognition task failed: {}", e);
                    Vec::new()
                }
            };

        telemetry::metrics::PORTAL_CANDIDATES.observe(candidates.len() as f64);
        info!("recognized candidates: {:?}", candidates);

        let outcome = match_candidates(
            &candidates,
            &self.inner.allow_list,
            self.inner.fuzzy_min_similarity,
        );
        let number = outcome.number.unwrap_or_default();
        info!("match outcome: number={:?}, allowed={}", number, outcome.authorized);

        if outcome.authorized {
            // Write only on success: a failed recognition must never cancel
            // a still-pending authorization.
            self.inner.latch.set_pending(number.clone());
            telemetry::metrics::PORTAL_DECISIONS
                .with_label_values(&["authorized"])
                .inc();
        } else {
            telemetry::metrics::PORTAL_DECISIONS
                .with_label_values(&["denied"])
                .inc();
        }

        Decision {
            authorized: outcome.authorized,
            number,
            candidates,
        }
    }

    /// Atomic read-and-clear of the gate latch for the polling actuator.
    pub fn poll_gate(&self) -> bool {
        match self.inner.latch.take_if_pending() {
            Some(number) => {
                info!("gate open consumed for {}", number);
                telemetry::metrics::PORTAL_LATCH_POLLS
                    .with_label_values(&["true"])
                    .inc();
                true
            }
            None => {
                telemetry::metrics::PORTAL_LATCH_POLLS
                    .with_label_values(&["false"])
                    .inc();
                false
            }
        }
    }
}
