use std::sync::OnceLock;

use axum::{routing::get, Router};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder. Install is process-global, so
    /// repeated calls (e.g. one router per test) reuse the first handle.
    pub fn init() -> Self {
        let handle = RECORDER
            .get_or_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .expect("prometheus: install recorder")
            })
            .clone();
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One completed diagnosis, labeled by the stage it landed in.
pub fn record_diagnosis(stage: u8) {
    counter!("pd_diagnoses_total", "stage" => stage.to_string()).increment(1);
}

/// One request rejected because no modality was available.
pub fn record_insufficient_data() {
    counter!("pd_insufficient_data_total").increment(1);
}
