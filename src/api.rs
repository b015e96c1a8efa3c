//! Thin HTTP surface over `engine::compute_diagnosis`. The surrounding
//! product CRUD (auth, uploads, patients) lives elsewhere; request bodies
//! here already carry the upstream inference outputs.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::{self, ConfigHandle, FusionConfig};
use crate::engine;
use crate::error::AnalysisError;
use crate::history::{History, ReportSummary};
use crate::metrics::{self, Metrics};
use crate::modality::ModalityOutputs;
use crate::report;

#[derive(Clone)]
pub struct AppState {
    config: ConfigHandle,
    history: Arc<History>,
}

impl AppState {
    pub fn new(config: ConfigHandle) -> Self {
        Self {
            config,
            history: Arc::new(History::with_capacity(2000)),
        }
    }
}

/// Build the full application router with a freshly loaded config.
/// Used by the binary entrypoint and by integration tests.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = FusionConfig::load_default()?;
    Ok(create_router(AppState::new(ConfigHandle::new(cfg))))
}

pub fn create_router(state: AppState) -> Router {
    let metrics = Metrics::init();

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/diagnose", post(diagnose))
        .route("/debug/history", get(debug_history))
        .route("/debug/last-report", get(debug_last_report))
        .route("/debug/stage", get(debug_stage))
        .route("/admin/reload-config", get(admin_reload_config))
        .with_state(state)
        .merge(metrics.router())
        .layer(CorsLayer::very_permissive())
}

#[derive(Deserialize)]
struct DiagnoseReq {
    patient_id: String,
    #[serde(flatten)]
    modalities: ModalityOutputs,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

async fn diagnose(State(state): State<AppState>, Json(body): Json<DiagnoseReq>) -> Response {
    let cfg = state.config.snapshot();
    let patient = anon_hash(&body.patient_id);

    match engine::compute_diagnosis(&body.patient_id, &body.modalities, &cfg) {
        Ok(report) => {
            // Never log raw patient ids. Only the hashed id + summary fields.
            info!(
                target: "analysis",
                %patient,
                stage = report.stage,
                label = %report.diagnosis_label,
                confidence = ?report.confidence_level,
                "diagnosis computed"
            );
            metrics::record_diagnosis(report.stage);
            state.history.push(&report, patient);
            Json(report).into_response()
        }
        Err(e @ AnalysisError::InsufficientData) => {
            info!(target: "analysis", %patient, "rejected: no modality data");
            metrics::record_insufficient_data();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn debug_history(State(state): State<AppState>) -> Json<Vec<ReportSummary>> {
    Json(state.history.snapshot_last_n(10))
}

async fn debug_last_report(State(state): State<AppState>) -> Json<Option<ReportSummary>> {
    Json(state.history.snapshot_last_n(1).pop())
}

#[derive(Deserialize)]
struct StageQuery {
    probability: f64,
}

#[derive(Serialize)]
struct StageOut {
    probability: f64,
    stage: u8,
    label: String,
}

/// Probe which stage band a fused probability would land in.
async fn debug_stage(State(state): State<AppState>, Query(q): Query<StageQuery>) -> Response {
    if !q.probability.is_finite() || !(0.0..=1.0).contains(&q.probability) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                error: format!("probability {} outside [0,1]", q.probability),
            }),
        )
            .into_response();
    }
    let cfg = state.config.snapshot();
    let (stage, label) = report::stage_for(q.probability, &cfg);
    Json(StageOut {
        probability: q.probability,
        stage,
        label: label.to_string(),
    })
    .into_response()
}

/// Re-read the config file; an invalid candidate is rejected and the
/// last-known-good config keeps serving.
async fn admin_reload_config(State(state): State<AppState>) -> String {
    let path = config::config_path();
    if !path.exists() {
        return "no config file present; keeping current config".to_string();
    }
    match state.config.reload_from(&path) {
        Ok(()) => "reloaded".to_string(),
        Err(e) => format!("reload rejected, keeping last-known-good: {e:#}"),
    }
}

/// Short anonymized id for log lines and history entries.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
