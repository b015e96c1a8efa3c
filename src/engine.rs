//! # Analysis Engine
//! The one operation the crate exposes to its caller:
//! normalize → fuse → classify. Pure apart from warning logs and the fresh
//! id/timestamp stamped on the report; identical inputs and config always
//! produce a bit-identical `FusionOutcome`.

use tracing::warn;

use crate::config::FusionConfig;
use crate::error::AnalysisError;
use crate::fusion;
use crate::modality::{self, ModalityOutputs};
use crate::report::{self, DiagnosisReport};

/// Compute one diagnosis from raw upstream modality outputs.
///
/// Malformed modality values are demoted and logged, never fatal; the only
/// error is `InsufficientData` when no modality survives normalization.
/// The classifier is not reached in that case.
pub fn compute_diagnosis(
    patient_id: &str,
    outputs: &ModalityOutputs,
    config: &FusionConfig,
) -> Result<DiagnosisReport, AnalysisError> {
    let normalized = modality::normalize(outputs);
    for demotion in &normalized.demoted {
        warn!(target: "analysis", %demotion, "modality demoted to unavailable");
    }

    let outcome = fusion::fuse(&normalized.results, config)?;
    Ok(report::build_report(patient_id, outcome, config))
}
