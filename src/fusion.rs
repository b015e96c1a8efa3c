//! # Weighted Fusion Engine
//! Pure, testable logic that maps three `ModalityResult` records plus a
//! `FusionConfig` to a `FusionOutcome`. No I/O, suitable for unit tests and
//! offline evaluation.
//!
//! Weight policy: each available modality's effective weight is
//! proportional to `base_weight * confidence`, renormalized over the
//! available subset so effective weights always sum to 1.0. Weight of a
//! missing modality is redistributed, never silently treated as a
//! "healthy" vote.

use serde::{Deserialize, Serialize};

use crate::config::FusionConfig;
use crate::error::AnalysisError;
use crate::modality::{Modality, ModalityResult};

/// Maximum possible population std dev for values in [0,1].
const MAX_STD_DEV: f64 = 0.5;

/// One line of the audit breakdown: what each contributing modality said
/// and how much it counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityContribution {
    pub modality: Modality,
    pub probability: f64,
    pub effective_weight: f64,
}

/// The computed result of one fusion operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionOutcome {
    pub fused_probability: f64,
    /// How closely the available modalities' probabilities cluster, in [0,1].
    pub agreement_score: f64,
    pub contributing_modalities: Vec<Modality>,
    pub breakdown: Vec<ModalityContribution>,
}

/// Fuse the available modalities under `config`.
///
/// The only failure mode is `InsufficientData` (zero modalities available);
/// every other input, however degenerate, produces a result.
pub fn fuse(
    results: &[ModalityResult; 3],
    config: &FusionConfig,
) -> Result<FusionOutcome, AnalysisError> {
    let available: Vec<&ModalityResult> = results.iter().filter(|r| r.available).collect();
    if available.is_empty() {
        return Err(AnalysisError::InsufficientData);
    }

    let effective_weights = effective_weights(&available, config);

    let fused_probability = clamp01(
        available
            .iter()
            .zip(&effective_weights)
            .map(|(r, w)| r.probability * w)
            .sum(),
    );

    let agreement_score = agreement(&available);

    let contributing_modalities: Vec<Modality> = available.iter().map(|r| r.modality).collect();
    let breakdown = available
        .iter()
        .zip(&effective_weights)
        .map(|(r, &w)| ModalityContribution {
            modality: r.modality,
            probability: r.probability,
            effective_weight: w,
        })
        .collect();

    Ok(FusionOutcome {
        fused_probability,
        agreement_score,
        contributing_modalities,
        breakdown,
    })
}

/// Confidence-scaled base weights, renormalized over the available subset.
///
/// Fallback ladder when a denominator collapses to zero:
/// 1. all available confidences are 0 → unscaled base weights;
/// 2. the available base weights themselves sum to 0 → equal split.
fn effective_weights(available: &[&ModalityResult], config: &FusionConfig) -> Vec<f64> {
    let scaled: Vec<f64> = available
        .iter()
        .map(|r| config.base_weights.get(r.modality) * r.confidence)
        .collect();
    let scaled_sum: f64 = scaled.iter().sum();
    if scaled_sum > 0.0 {
        return scaled.iter().map(|w| w / scaled_sum).collect();
    }

    let base: Vec<f64> = available
        .iter()
        .map(|r| config.base_weights.get(r.modality))
        .collect();
    let base_sum: f64 = base.iter().sum();
    if base_sum > 0.0 {
        return base.iter().map(|w| w / base_sum).collect();
    }

    vec![1.0 / available.len() as f64; available.len()]
}

/// `1 - popStdDev / 0.5`, clamped to [0,1]. A single modality agrees with
/// itself perfectly by convention.
fn agreement(available: &[&ModalityResult]) -> f64 {
    if available.len() < 2 {
        return 1.0;
    }
    let n = available.len() as f64;
    let mean = available.iter().map(|r| r.probability).sum::<f64>() / n;
    let variance = available
        .iter()
        .map(|r| (r.probability - mean).powi(2))
        .sum::<f64>()
        / n;
    clamp01(1.0 - variance.sqrt() / MAX_STD_DEV)
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
