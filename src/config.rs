//! # Fusion Config
//!
//! Process-wide configuration for the fusion engine: per-modality base
//! weights and the stage bands partitioning [0,1]. Loaded once at startup
//! (TOML or JSON, path overridable via env), validated before use, and
//! swapped wholesale on reload — a computation in flight always sees a
//! single consistent snapshot, and a reload that fails validation keeps
//! the last-known-good config in place.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::modality::Modality;

pub const DEFAULT_FUSION_CONFIG_PATH: &str = "config/fusion.toml";
pub const ENV_FUSION_CONFIG_PATH: &str = "FUSION_CONFIG_PATH";

/// Tolerance for the weights-sum-to-one invariant.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Effective config file location: env override or the default path.
pub fn config_path() -> PathBuf {
    std::env::var(ENV_FUSION_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_FUSION_CONFIG_PATH))
}

/// Base trust weight per modality. Invariant: sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityWeights {
    pub dat_scan: f64,
    pub handwriting: f64,
    pub voice: f64,
}

impl ModalityWeights {
    pub fn get(&self, modality: Modality) -> f64 {
        match modality {
            Modality::DatScan => self.dat_scan,
            Modality::Handwriting => self.handwriting,
            Modality::Voice => self.voice,
        }
    }

    fn sum(&self) -> f64 {
        self.dat_scan + self.handwriting + self.voice
    }
}

impl Default for ModalityWeights {
    /// DaT scan is the most reliable indicator and carries half the weight;
    /// handwriting and voice split the rest.
    fn default() -> Self {
        Self {
            dat_scan: 0.50,
            handwriting: 0.25,
            voice: 0.25,
        }
    }
}

/// One stage band: fused probabilities below `upper` (exclusive) fall into
/// this band, evaluated in ascending order. The final band also includes
/// its upper bound so 1.0 maps to the top stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageBand {
    pub upper: f64,
    pub stage: u8,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default)]
    pub base_weights: ModalityWeights,
    #[serde(default = "default_stage_bands")]
    pub stage_bands: Vec<StageBand>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            base_weights: ModalityWeights::default(),
            stage_bands: default_stage_bands(),
        }
    }
}

fn band(upper: f64, stage: u8, label: &str) -> StageBand {
    StageBand {
        upper,
        stage,
        label: label.to_string(),
    }
}

fn default_stage_bands() -> Vec<StageBand> {
    vec![
        band(0.35, 0, "Healthy"),
        band(0.60, 1, "Early-stage PD"),
        band(0.80, 2, "Moderate-stage PD"),
        band(1.0, 3, "Advanced-stage PD"),
    ]
}

impl FusionConfig {
    /// Load using env var + fallbacks:
    /// 1) $FUSION_CONFIG_PATH (must exist and validate)
    /// 2) config/fusion.toml if present
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let path = config_path();
        if std::env::var(ENV_FUSION_CONFIG_PATH).is_ok() || path.exists() {
            return Self::load_from_file(path);
        }
        Ok(Self::default())
    }

    /// Load and validate from an explicit path. TOML or JSON by extension.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading fusion config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: FusionConfig = if ext == "json" {
            serde_json::from_str(&content)
                .with_context(|| format!("parsing JSON fusion config {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("parsing TOML fusion config {}", path.display()))?
        };
        cfg.validate()
            .with_context(|| format!("validating fusion config {}", path.display()))?;
        Ok(cfg)
    }

    /// Enforce the load-time invariants: finite non-negative weights summing
    /// to 1.0, and stage bands that are strictly increasing, strictly
    /// staged, and span exactly [0,1].
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let w = &self.base_weights;
        for (name, v) in [
            ("dat_scan", w.dat_scan),
            ("handwriting", w.handwriting),
            ("voice", w.voice),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "base weight {name} must be a finite non-negative number, got {v}"
                )));
            }
        }
        if (w.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AnalysisError::InvalidConfig(format!(
                "base weights must sum to 1.0, got {}",
                w.sum()
            )));
        }

        if self.stage_bands.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "stage_bands must not be empty".into(),
            ));
        }
        let mut prev_upper = 0.0;
        let mut prev_stage: Option<u8> = None;
        for b in &self.stage_bands {
            if !b.upper.is_finite() || b.upper <= prev_upper || b.upper > 1.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "stage band '{}' upper bound {} must be in ({prev_upper}, 1.0]",
                    b.label, b.upper
                )));
            }
            if let Some(ps) = prev_stage {
                if b.stage <= ps {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "stage numbers must be strictly increasing, got {} after {ps}",
                        b.stage
                    )));
                }
            }
            prev_upper = b.upper;
            prev_stage = Some(b.stage);
        }
        // Bands must cover the whole interval up to and including 1.0.
        if prev_upper != 1.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "stage bands must span [0,1]; last upper bound is {prev_upper}"
            )));
        }
        Ok(())
    }
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// A threadsafe handle holding the current config snapshot. Readers take an
/// `Arc` clone so a reload mid-computation never changes what they see.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<FusionConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// The current consistent snapshot.
    pub fn snapshot(&self) -> Arc<FusionConfig> {
        Arc::clone(&self.inner.read().expect("config rwlock poisoned"))
    }

    /// Atomically replace the whole config.
    pub fn swap(&self, config: FusionConfig) {
        *self.inner.write().expect("config rwlock poisoned") = Arc::new(config);
    }

    /// Re-read `path`; on any load or validation failure the current config
    /// stays in place (fail closed).
    pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<()> {
        let fresh = FusionConfig::load_from_file(path.as_ref())?;
        self.swap(fresh);
        info!(path = %path.as_ref().display(), "fusion config reloaded");
        Ok(())
    }
}

/// Returns true if we should enable hot reload (dev/local only).
fn hot_reload_enabled() -> bool {
    let want = std::env::var("FUSION_HOT_RELOAD")
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Start a simple polling watcher on `path` that reloads into `handle`.
/// Polls mtime every 2s. Uses only std, no external deps.
pub fn start_hot_reload_thread(handle: ConfigHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    let changed = match last_mtime {
                        None => {
                            last_mtime = Some(mtime);
                            false
                        }
                        Some(prev) => mtime > prev,
                    };
                    if changed {
                        if let Err(e) = handle.reload_from(&path) {
                            warn!(error = %e, "fusion config reload failed; keeping last-known-good");
                        }
                        last_mtime = Some(mtime);
                    }
                }
                Err(_) => {
                    // File missing or unreadable; keep trying.
                }
            }
            thread::sleep(poll);
        }
    });
}
