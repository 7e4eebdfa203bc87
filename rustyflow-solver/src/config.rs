//! Run configuration.
//!
//! One explicit, versioned-by-schema configuration object per run — no
//! hidden process-wide state. Unknown keys fail deserialization; no
//! option is ever silently ignored or defaulted away from what the
//! caller wrote. Optional stages are `Option` fields: absent means the
//! stage does not exist, never that it is partially applied.

use crate::initial::{random_solenoidal, taylor_green};
use crate::integrator::{Integrator, Thresholds};
use crate::operators::forcing::force_shell;
use crate::operators::projection::{project_checked, DIVERGENCE_TOL};
use crate::operators::{MaskFilter, MaskScheme, Pipeline};
use rustyflow_core::{FlowError, WavenumberGrid};
use rustyflow_fft::forward_vector;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub grid: [usize; 3],
    pub viscosity: f64,
    pub dt: f64,
    pub steps: usize,
    pub seed: u64,
    #[serde(default)]
    pub forcing: Option<ForcingConfig>,
    #[serde(default)]
    pub mask: Option<MaskConfig>,
    #[serde(default)]
    pub descent: Option<DescentConfig>,
    #[serde(default)]
    pub initial: InitialKind,
    #[serde(default)]
    pub adaptive_dt: bool,
    /// 0 disables snapshots.
    #[serde(default)]
    pub snapshot_every: usize,
    #[serde(default)]
    pub snapshot_mode: SnapshotMode,
    /// Mode B power binning: per-mode (default) or radial shells.
    #[serde(default)]
    pub snapshot_binning: SnapshotBinning,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    "snapshots".to_string()
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForcingConfig {
    pub k_f: f64,
    pub amplitude: f64,
}

/// Named mask schemes as spelled in configuration files.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "scheme", rename_all = "snake_case", deny_unknown_fields)]
pub enum MaskConfig {
    CoprimeToPrimorial { primorial: u64, beta: f64 },
    VonMangoldt { alpha: f64 },
    PrimeShell { beta: f64 },
}

impl MaskConfig {
    pub fn to_scheme(&self) -> MaskScheme {
        match *self {
            MaskConfig::CoprimeToPrimorial { primorial, beta } => {
                MaskScheme::CoprimeToPrimorial { primorial, beta }
            }
            MaskConfig::VonMangoldt { alpha } => MaskScheme::VonMangoldt { alpha },
            MaskConfig::PrimeShell { beta } => MaskScheme::PrimeShell { beta },
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescentConfig {
    pub eta: f64,
    pub alpha: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InitialKind {
    #[default]
    TaylorGreen,
    Random,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    #[default]
    A,
    B,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotBinning {
    #[default]
    PerMode,
    Radial,
}

impl RunConfig {
    /// Parse from JSON. Unknown options are a `Configuration` error,
    /// never silently ignored.
    pub fn from_json(text: &str) -> Result<Self, FlowError> {
        let cfg: RunConfig = serde_json::from_str(text)
            .map_err(|e| FlowError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, FlowError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject contradictory parameters before any stepping happens.
    pub fn validate(&self) -> Result<(), FlowError> {
        for &n in &self.grid {
            if n < 4 || !n.is_power_of_two() {
                return Err(FlowError::Configuration(format!(
                    "grid dimension {} must be a power of two ≥ 4",
                    n
                )));
            }
        }
        if !self.viscosity.is_finite() || self.viscosity < 0.0 {
            return Err(FlowError::Configuration(format!(
                "viscosity must be finite and non-negative, got {}",
                self.viscosity
            )));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(FlowError::Configuration(format!(
                "dt must be finite and positive, got {}",
                self.dt
            )));
        }
        if self.steps == 0 {
            return Err(FlowError::Configuration("steps must be ≥ 1".into()));
        }
        if let Some(f) = &self.forcing {
            if !(f.k_f > 0.0) || !f.k_f.is_finite() {
                return Err(FlowError::Configuration(format!(
                    "forcing.k_f must be positive, got {}",
                    f.k_f
                )));
            }
            if !f.amplitude.is_finite() || f.amplitude < 0.0 {
                return Err(FlowError::Configuration(format!(
                    "forcing.amplitude must be non-negative, got {}",
                    f.amplitude
                )));
            }
        }
        if let Some(m) = &self.mask {
            match *m {
                MaskConfig::CoprimeToPrimorial { primorial, beta } => {
                    if primorial < 2 {
                        return Err(FlowError::Configuration(format!(
                            "mask.primorial must be ≥ 2, got {}",
                            primorial
                        )));
                    }
                    check_beta(beta)?;
                }
                MaskConfig::VonMangoldt { alpha } => {
                    if !alpha.is_finite() {
                        return Err(FlowError::Configuration("mask.alpha must be finite".into()));
                    }
                }
                MaskConfig::PrimeShell { beta } => check_beta(beta)?,
            }
        }
        if let Some(d) = &self.descent {
            if !d.eta.is_finite() || d.eta < 0.0 || !d.alpha.is_finite() || d.alpha < 0.0 {
                return Err(FlowError::Configuration(format!(
                    "descent parameters must be finite and non-negative, got eta={}, alpha={}",
                    d.eta, d.alpha
                )));
            }
        }
        Ok(())
    }

    /// Resolve the configuration into a ready integrator: wavenumber
    /// grid, operator pipeline, and transformed initial condition.
    pub fn build(&self) -> Result<Integrator, FlowError> {
        self.validate()?;
        let grid = WavenumberGrid::new(self.grid);

        let forcing = self
            .forcing
            .as_ref()
            .map(|f| force_shell(&grid, f.k_f, f.amplitude, self.seed));
        let mask = self
            .mask
            .as_ref()
            .map(|m| MaskFilter::build(m.to_scheme(), &grid));
        let descent = self.descent.as_ref().map(|d| (d.eta, d.alpha));
        let pipeline = Pipeline::resolve(self.viscosity, forcing, descent, mask);

        let mut u0 = match self.initial {
            InitialKind::TaylorGreen => forward_vector(&taylor_green(self.grid)),
            InitialKind::Random => random_solenoidal(self.grid, self.seed, &grid),
        };
        // Fatal if the initial state cannot be made solenoidal.
        project_checked(&mut u0, &grid, DIVERGENCE_TOL)?;

        Ok(Integrator::new(
            grid,
            pipeline,
            u0,
            self.dt,
            Thresholds::default(),
            self.adaptive_dt,
        ))
    }
}

fn check_beta(beta: f64) -> Result<(), FlowError> {
    if !(0.0..=1.0).contains(&beta) {
        return Err(FlowError::Configuration(format!(
            "mask.beta must lie in [0, 1], got {}",
            beta
        )));
    }
    Ok(())
}
