//! history.rs — bounded in-memory log of recent diagnoses for the debug
//! endpoints. Real persistence of reports belongs to the external storage
//! layer; this keeps only short anonymized summaries.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::modality::Modality;
use crate::report::{ConfidenceLevel, DiagnosisReport};

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub ts_unix: u64,
    /// Short hash, never the raw patient id.
    pub patient: String,
    pub stage: u8,
    pub diagnosis_label: String,
    pub confidence_level: ConfidenceLevel,
    pub fused_probability: f64,
    pub modalities: Vec<Modality>,
}

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<ReportSummary>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap: cap.min(10_000),
        }
    }

    pub fn push(&self, report: &DiagnosisReport, patient_hash: String) {
        let entry = ReportSummary {
            ts_unix: now_unix(),
            patient: patient_hash,
            stage: report.stage,
            diagnosis_label: report.diagnosis_label.clone(),
            confidence_level: report.confidence_level,
            fused_probability: report.fusion.fused_probability,
            modalities: report.fusion.contributing_modalities.clone(),
        };

        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<ReportSummary> {
        let v = self.inner.lock().expect("history mutex poisoned");
        let len = v.len();
        let start = len.saturating_sub(n);
        v[start..].to_vec()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
