//! # Error Taxonomy
//! Only structurally impossible situations are errors: no data at all, or a
//! broken config. Messy-but-present data (disagreement, low confidence,
//! partial availability) is represented in the outcome, never raised.

use thiserror::Error;

use crate::modality::Modality;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Zero modalities available; fatal for that request, not retried.
    #[error("not enough data to produce a diagnosis; please provide at least one modality")]
    InsufficientData,

    /// A single modality's raw output is out of range or NaN. Recovered
    /// locally by demoting the modality to unavailable; the engine logs it
    /// as a warning and the request proceeds.
    #[error("invalid {modality} output: {detail}")]
    InvalidModalityValue { modality: Modality, detail: String },

    /// Config failed validation at load time. Fail closed: the faulty
    /// config must never be swapped in.
    #[error("invalid fusion config: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn invalid_modality(modality: Modality, detail: impl Into<String>) -> Self {
        Self::InvalidModalityValue {
            modality,
            detail: detail.into(),
        }
    }
}
