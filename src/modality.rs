//! # Modality Normalizer
//!
//! Converts heterogeneous upstream inference outputs (DaT CNN+LSTM,
//! handwriting ResNet, voice CNN+LSTM — all external to this crate) into a
//! fixed record per modality: `{probability, confidence, available}`.
//!
//! - Pure: no I/O, no side effects.
//! - Resilient: a malformed value (NaN, out of [0,1]) demotes that one
//!   modality to unavailable instead of aborting the whole analysis. The
//!   demotions are returned so the caller can log them.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// One independent source of diagnostic signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    DatScan,
    Handwriting,
    Voice,
}

impl Modality {
    /// Fixed presentation order, also the breakdown order in reports.
    pub const ALL: [Modality; 3] = [Modality::DatScan, Modality::Handwriting, Modality::Voice];

    /// Human-readable name for interpretation text and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Modality::DatScan => "DaT scan",
            Modality::Handwriting => "handwriting",
            Modality::Voice => "voice",
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A `(probability, confidence)` pair as reported by one upstream model.
///
/// `confidence` is the model's self-reported certainty, distinct from the
/// probability: 0.5 probability at 0.9 confidence is a confident
/// "uncertain" call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub probability: f64,
    pub confidence: f64,
}

/// What an upstream inference service handed us for one modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum RawModalityOutput {
    Prediction(RawPrediction),
    Failed {
        error: String,
    },
    #[default]
    NotProvided,
}

/// The full per-request input: one slot per known modality, each optionally
/// filled by its inference service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModalityOutputs {
    #[serde(default)]
    pub dat_scan: RawModalityOutput,
    #[serde(default)]
    pub handwriting: RawModalityOutput,
    #[serde(default)]
    pub voice: RawModalityOutput,
}

impl ModalityOutputs {
    pub fn get(&self, modality: Modality) -> &RawModalityOutput {
        match modality {
            Modality::DatScan => &self.dat_scan,
            Modality::Handwriting => &self.handwriting,
            Modality::Voice => &self.voice,
        }
    }
}

/// One modality's normalized contribution. Immutable once created; consumed
/// only by the fusion engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityResult {
    pub modality: Modality,
    pub probability: f64,
    pub confidence: f64,
    pub available: bool,
}

impl ModalityResult {
    fn unavailable(modality: Modality) -> Self {
        Self {
            modality,
            probability: 0.0,
            confidence: 0.0,
            available: false,
        }
    }
}

/// Output of one normalization pass: exactly three records (fixed order),
/// plus the demotions the caller should log as warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub results: [ModalityResult; 3],
    pub demoted: Vec<AnalysisError>,
}

/// Normalize all three modality slots. Never fails: malformed values become
/// `available=false` records and a matching `InvalidModalityValue` entry.
pub fn normalize(outputs: &ModalityOutputs) -> NormalizedInput {
    let mut demoted = Vec::new();
    let results = Modality::ALL.map(|m| match outputs.get(m) {
        RawModalityOutput::NotProvided => ModalityResult::unavailable(m),
        RawModalityOutput::Failed { error } => {
            demoted.push(AnalysisError::invalid_modality(
                m,
                format!("inference failed: {error}"),
            ));
            ModalityResult::unavailable(m)
        }
        RawModalityOutput::Prediction(p) => match check_prediction(p) {
            Ok(()) => ModalityResult {
                modality: m,
                probability: p.probability,
                confidence: p.confidence,
                available: true,
            },
            Err(detail) => {
                demoted.push(AnalysisError::invalid_modality(m, detail));
                ModalityResult::unavailable(m)
            }
        },
    });

    NormalizedInput { results, demoted }
}

fn check_prediction(p: &RawPrediction) -> Result<(), String> {
    if !in_unit_interval(p.probability) {
        return Err(format!("probability {} outside [0,1]", p.probability));
    }
    if !in_unit_interval(p.confidence) {
        return Err(format!("confidence {} outside [0,1]", p.confidence));
    }
    Ok(())
}

fn in_unit_interval(x: f64) -> bool {
    x.is_finite() && (0.0..=1.0).contains(&x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(probability: f64, confidence: f64) -> RawModalityOutput {
        RawModalityOutput::Prediction(RawPrediction {
            probability,
            confidence,
        })
    }

    #[test]
    fn three_records_in_fixed_order() {
        let out = normalize(&ModalityOutputs::default());
        let order: Vec<Modality> = out.results.iter().map(|r| r.modality).collect();
        assert_eq!(order, Modality::ALL.to_vec());
        assert!(out.results.iter().all(|r| !r.available));
        assert!(out.demoted.is_empty());
    }

    #[test]
    fn valid_prediction_passes_through() {
        let outputs = ModalityOutputs {
            dat_scan: pred(0.9, 0.8),
            ..Default::default()
        };
        let out = normalize(&outputs);
        let dat = out.results[0];
        assert!(dat.available);
        assert_eq!(dat.probability, 0.9);
        assert_eq!(dat.confidence, 0.8);
    }

    #[test]
    fn nan_probability_is_demoted_not_fatal() {
        let outputs = ModalityOutputs {
            voice: pred(f64::NAN, 0.9),
            handwriting: pred(0.7, 0.7),
            ..Default::default()
        };
        let out = normalize(&outputs);
        assert!(!out.results[2].available);
        assert_eq!(out.results[2].probability, 0.0);
        assert_eq!(out.results[2].confidence, 0.0);
        // The other modality is untouched.
        assert!(out.results[1].available);
        assert_eq!(out.demoted.len(), 1);
        assert!(matches!(
            out.demoted[0],
            AnalysisError::InvalidModalityValue {
                modality: Modality::Voice,
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_confidence_is_demoted() {
        let outputs = ModalityOutputs {
            dat_scan: pred(0.5, 1.5),
            ..Default::default()
        };
        let out = normalize(&outputs);
        assert!(!out.results[0].available);
        assert_eq!(out.demoted.len(), 1);
    }

    #[test]
    fn inference_error_is_demoted_with_detail() {
        let outputs = ModalityOutputs {
            handwriting: RawModalityOutput::Failed {
                error: "model file missing".into(),
            },
            ..Default::default()
        };
        let out = normalize(&outputs);
        assert!(!out.results[1].available);
        let msg = out.demoted[0].to_string();
        assert!(msg.contains("model file missing"), "got: {msg}");
    }

    #[test]
    fn boundary_values_are_valid() {
        let outputs = ModalityOutputs {
            dat_scan: pred(0.0, 0.0),
            voice: pred(1.0, 1.0),
            ..Default::default()
        };
        let out = normalize(&outputs);
        assert!(out.results[0].available);
        assert!(out.results[2].available);
        assert!(out.demoted.is_empty());
    }

    #[test]
    fn request_json_shapes_deserialize() {
        // Prediction object, error object, and absent field all parse.
        let json = r#"{
            "dat_scan": { "probability": 0.8, "confidence": 0.9 },
            "voice": { "error": "timeout" }
        }"#;
        let outputs: ModalityOutputs = serde_json::from_str(json).unwrap();
        assert!(matches!(
            outputs.dat_scan,
            RawModalityOutput::Prediction(_)
        ));
        assert!(matches!(outputs.voice, RawModalityOutput::Failed { .. }));
        assert_eq!(outputs.handwriting, RawModalityOutput::NotProvided);
    }
}
