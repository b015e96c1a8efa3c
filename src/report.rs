//! # Stage & Report Classifier
//!
//! Maps a `FusionOutcome` to a discrete disease stage, a diagnosis label,
//! and a LOW/MODERATE/HIGH confidence level, then assembles the persisted
//! `DiagnosisReport` with clinical interpretation and recommendations.
//! Persisting the report belongs to the caller; this module's contract
//! ends at a fully-populated, ready-to-persist record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FusionConfig;
use crate::fusion::FusionOutcome;
use crate::modality::Modality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Moderate,
    High,
}

/// The persisted end artifact of one analysis run. Only `doctor_verified`
/// and `notes` may be mutated afterwards, by an external doctor-review
/// action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub id: Uuid,
    pub patient_id: String,
    pub fusion: FusionOutcome,
    pub stage: u8,
    pub diagnosis_label: String,
    pub confidence_level: ConfidenceLevel,
    pub interpretation: String,
    pub recommendations: Vec<String>,
    pub doctor_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Resolve `probability` against the config's stage bands: first band whose
/// exclusive upper bound exceeds it wins; the final band also includes its
/// upper bound (so 1.0 maps to the top stage).
pub fn stage_for(probability: f64, config: &FusionConfig) -> (u8, &str) {
    for b in &config.stage_bands {
        if probability < b.upper {
            return (b.stage, &b.label);
        }
    }
    // probability == last upper (or float dust above it).
    let last = config
        .stage_bands
        .last()
        .expect("validated config has at least one stage band");
    (last.stage, &last.label)
}

/// Joint mapping from agreement and availability:
/// HIGH needs all three modalities in strong agreement; a lone modality or
/// real disagreement is LOW; everything else is MODERATE.
pub fn confidence_level(outcome: &FusionOutcome) -> ConfidenceLevel {
    let n = outcome.contributing_modalities.len();
    if outcome.agreement_score >= 0.8 && n == 3 {
        ConfidenceLevel::High
    } else if outcome.agreement_score < 0.5 || n == 1 {
        ConfidenceLevel::Low
    } else {
        ConfidenceLevel::Moderate
    }
}

/// Assemble the terminal report for one fusion run: stamps a fresh id and
/// timestamp, `doctor_verified = false`, no notes yet.
pub fn build_report(
    patient_id: &str,
    outcome: FusionOutcome,
    config: &FusionConfig,
) -> DiagnosisReport {
    let (stage, label) = stage_for(outcome.fused_probability, config);
    let confidence = confidence_level(&outcome);
    let interpretation = interpretation(&outcome, stage, confidence);
    let recommendations = recommendations(&outcome, stage, confidence);

    DiagnosisReport {
        id: Uuid::new_v4(),
        patient_id: patient_id.to_string(),
        stage,
        diagnosis_label: label.to_string(),
        confidence_level: confidence,
        interpretation,
        recommendations,
        fusion: outcome,
        doctor_verified: false,
        notes: None,
        created_at: Utc::now(),
    }
}

/// Clinical interpretation text: diagnosis direction, modality agreement,
/// confidence commentary, and per-modality insight lines.
fn interpretation(outcome: &FusionOutcome, stage: u8, confidence: ConfidenceLevel) -> String {
    let names: Vec<&str> = outcome
        .contributing_modalities
        .iter()
        .map(|m| m.label())
        .collect();
    let mut text = format!(
        "Multimodal analysis using {} modality(ies) ({}) ",
        names.len(),
        names.join(", ")
    );

    let p = outcome.fused_probability;
    if stage > 0 {
        text += &format!(
            "indicates Parkinson's disease with {:.1}% probability. ",
            p * 100.0
        );
    } else {
        text += &format!(
            "suggests healthy status with {:.1}% confidence. ",
            (1.0 - p) * 100.0
        );
    }

    if names.len() > 1 {
        if outcome.agreement_score > 0.85 {
            text += "All modalities show strong agreement. ";
        } else if outcome.agreement_score > 0.70 {
            text += "Modalities show moderate agreement. ";
        } else {
            text += "Modalities show some disagreement, suggesting need for additional evaluation. ";
        }
    }

    match confidence {
        ConfidenceLevel::High => {
            text += "The analysis shows high confidence in the diagnosis. ";
        }
        ConfidenceLevel::Moderate => {
            text += "The analysis shows moderate confidence. Additional clinical evaluation is recommended. ";
        }
        ConfidenceLevel::Low => {
            text += "The analysis shows low confidence. Clinical confirmation is strongly recommended. ";
        }
    }

    for c in &outcome.breakdown {
        let insight = match c.modality {
            Modality::DatScan if c.probability > 0.7 => {
                "DaT scan shows reduced dopamine transporter binding consistent with PD. "
            }
            Modality::DatScan if c.probability < 0.3 => {
                "DaT scan shows normal dopamine transporter binding. "
            }
            Modality::Handwriting if c.probability > 0.7 => {
                "Handwriting analysis reveals motor control difficulties typical of PD. "
            }
            Modality::Handwriting if c.probability < 0.3 => {
                "Handwriting analysis shows normal motor control. "
            }
            Modality::Voice if c.probability > 0.7 => {
                "Voice analysis detects speech characteristics associated with PD. "
            }
            Modality::Voice if c.probability < 0.3 => {
                "Voice analysis shows normal speech characteristics. "
            }
            _ => continue,
        };
        text += insight;
    }

    text.trim_end().to_string()
}

/// Clinical recommendations list; always starts with neurologist
/// confirmation, then branches on diagnosis direction, confidence, and
/// which modalities are missing.
fn recommendations(
    outcome: &FusionOutcome,
    stage: u8,
    confidence: ConfidenceLevel,
) -> Vec<String> {
    let mut recs = vec![
        "Consult with a qualified neurologist for clinical confirmation and diagnosis".to_string(),
    ];

    if stage > 0 {
        recs.push(
            "Consider comprehensive neurological examination including motor function assessment"
                .into(),
        );
        if !outcome.contributing_modalities.contains(&Modality::DatScan) {
            recs.push("Consider dopamine transporter (DaT) scan imaging for confirmation".into());
        }
        recs.push("Monitor for progression of motor and non-motor symptoms".into());
        recs.push("Discuss treatment options including medication and lifestyle modifications".into());
        if confidence != ConfidenceLevel::High {
            recs.push("Consider repeat assessment in 6-12 months to monitor progression".into());
        }
    } else {
        recs.push("Continue regular health monitoring and maintain healthy lifestyle".into());
        if confidence == ConfidenceLevel::Low {
            recs.push("Consider repeat screening if symptoms develop or worsen".into());
        }
        recs.push(
            "Be aware of early Parkinson's symptoms: tremor, rigidity, bradykinesia, postural instability"
                .into(),
        );
    }

    let missing: Vec<&str> = Modality::ALL
        .into_iter()
        .filter(|m| !outcome.contributing_modalities.contains(m))
        .map(|m| m.label())
        .collect();
    if !missing.is_empty() {
        recs.push(format!(
            "For comprehensive assessment, consider adding: {}",
            missing.join(", ")
        ));
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::ModalityContribution;

    fn cfg() -> FusionConfig {
        FusionConfig::default()
    }

    fn outcome(probability: f64, agreement: f64, modalities: &[Modality]) -> FusionOutcome {
        let w = 1.0 / modalities.len() as f64;
        FusionOutcome {
            fused_probability: probability,
            agreement_score: agreement,
            contributing_modalities: modalities.to_vec(),
            breakdown: modalities
                .iter()
                .map(|&m| ModalityContribution {
                    modality: m,
                    probability,
                    effective_weight: w,
                })
                .collect(),
        }
    }

    #[test]
    fn stage_boundaries_are_lower_inclusive() {
        let cfg = cfg();
        assert_eq!(stage_for(0.0, &cfg).0, 0);
        assert_eq!(stage_for(0.349, &cfg).0, 0);
        assert_eq!(stage_for(0.35, &cfg).0, 1);
        assert_eq!(stage_for(0.599, &cfg).0, 1);
        assert_eq!(stage_for(0.60, &cfg).0, 2);
        assert_eq!(stage_for(0.80, &cfg).0, 3);
        // Final band includes its upper bound.
        assert_eq!(stage_for(1.0, &cfg).0, 3);
    }

    #[test]
    fn stage_labels_match_bands() {
        let cfg = cfg();
        assert_eq!(stage_for(0.1, &cfg).1, "Healthy");
        assert_eq!(stage_for(0.5, &cfg).1, "Early-stage PD");
        assert_eq!(stage_for(0.7, &cfg).1, "Moderate-stage PD");
        assert_eq!(stage_for(0.9, &cfg).1, "Advanced-stage PD");
    }

    #[test]
    fn staging_is_monotonic_in_probability() {
        let cfg = cfg();
        let mut prev = 0;
        let mut p = 0.0;
        while p <= 1.0 {
            let (stage, _) = stage_for(p, &cfg);
            assert!(stage >= prev, "stage regressed at probability {p}");
            prev = stage;
            p += 0.001;
        }
    }

    #[test]
    fn high_needs_all_three_and_strong_agreement() {
        let all = Modality::ALL;
        assert_eq!(
            confidence_level(&outcome(0.9, 0.9, &all)),
            ConfidenceLevel::High
        );
        // Same agreement with only two modalities is not HIGH.
        assert_eq!(
            confidence_level(&outcome(0.9, 0.9, &all[1..])),
            ConfidenceLevel::Moderate
        );
        // Agreement just below the bar is not HIGH either.
        assert_eq!(
            confidence_level(&outcome(0.9, 0.79, &all)),
            ConfidenceLevel::Moderate
        );
    }

    #[test]
    fn low_on_disagreement_or_single_modality() {
        let all = Modality::ALL;
        assert_eq!(
            confidence_level(&outcome(0.5, 0.49, &all)),
            ConfidenceLevel::Low
        );
        assert_eq!(
            confidence_level(&outcome(0.5, 1.0, &all[..1])),
            ConfidenceLevel::Low
        );
    }

    #[test]
    fn report_is_fresh_and_unverified() {
        let cfg = cfg();
        let r = build_report("patient-1", outcome(0.85, 1.0, &Modality::ALL), &cfg);
        assert_eq!(r.stage, 3);
        assert_eq!(r.diagnosis_label, "Advanced-stage PD");
        assert!(!r.doctor_verified);
        assert!(r.notes.is_none());
        assert_eq!(r.patient_id, "patient-1");

        // Each run stamps its own id.
        let r2 = build_report("patient-1", outcome(0.85, 1.0, &Modality::ALL), &cfg);
        assert_ne!(r.id, r2.id);
    }

    #[test]
    fn pd_report_recommends_dat_scan_when_missing() {
        let cfg = cfg();
        let r = build_report(
            "p",
            outcome(0.7, 1.0, &[Modality::Handwriting, Modality::Voice]),
            &cfg,
        );
        assert!(r
            .recommendations
            .iter()
            .any(|s| s.contains("dopamine transporter (DaT) scan imaging")));
        assert!(r
            .recommendations
            .iter()
            .any(|s| s.contains("consider adding: DaT scan")));
    }

    #[test]
    fn healthy_report_keeps_monitoring_advice() {
        let cfg = cfg();
        let r = build_report("p", outcome(0.1, 1.0, &Modality::ALL), &cfg);
        assert_eq!(r.stage, 0);
        assert!(r.recommendations.iter().any(|s| s.contains("healthy lifestyle")));
        assert!(!r
            .recommendations
            .iter()
            .any(|s| s.contains("treatment options")));
    }

    #[test]
    fn interpretation_mentions_direction_and_modalities() {
        let cfg = cfg();
        let r = build_report("p", outcome(0.85, 1.0, &Modality::ALL), &cfg);
        assert!(r.interpretation.contains("3 modality(ies)"));
        assert!(r.interpretation.contains("indicates Parkinson's disease"));
        assert!(r.interpretation.contains("85.0% probability"));
        assert!(r.interpretation.contains("strong agreement"));
        // All three per-modality insights fire at probability 0.85.
        assert!(r.interpretation.contains("dopamine transporter binding"));
        assert!(r.interpretation.contains("motor control difficulties"));
        assert!(r.interpretation.contains("speech characteristics"));
    }
}
