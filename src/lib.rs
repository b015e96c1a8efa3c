// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod history;
pub mod metrics;
pub mod modality;
pub mod report;

// ---- Re-exports for stable public API ----
pub use crate::api::{app, create_router, AppState};
pub use crate::config::{ConfigHandle, FusionConfig};
pub use crate::engine::compute_diagnosis;
pub use crate::error::AnalysisError;
pub use crate::fusion::FusionOutcome;
pub use crate::modality::{Modality, ModalityOutputs, RawModalityOutput, RawPrediction};
pub use crate::report::{ConfidenceLevel, DiagnosisReport};
