//! Right-hand-side operator pipeline.
//!
//! The stage list is resolved ONCE at configuration load into
//! strongly-typed operators — no name lookup happens per call. Order is
//! fixed: advective, viscous, forcing, descent contributions are
//! summed, the sum is projected, and the mask (when configured) filters
//! the projected result so it can never reintroduce a divergence
//! component.

pub mod descent;
pub mod forcing;
pub mod mask;
pub mod nonlinear;
pub mod projection;
pub mod viscous;

pub use mask::{MaskFilter, MaskScheme};
pub use nonlinear::AdvectionStats;

use rustyflow_core::{FlowError, SpectralVector, WavenumberGrid};

/// One resolved stage of the right-hand side.
pub enum Stage {
    Nonlinear,
    Viscous { nu: f64 },
    Forcing { spectrum: SpectralVector },
    Descent { eta: f64, alpha: f64 },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Nonlinear => "nonlinear",
            Stage::Viscous { .. } => "viscous",
            Stage::Forcing { .. } => "forcing",
            Stage::Descent { .. } => "descent",
        }
    }
}

/// Result of one right-hand-side evaluation.
pub struct RhsEval {
    pub rhs: SpectralVector,
    pub stats: AdvectionStats,
}

/// The resolved operator pipeline for a run.
pub struct Pipeline {
    stages: Vec<Stage>,
    mask: Option<MaskFilter>,
}

impl Pipeline {
    /// Resolve the stage list from run parameters. The advective and
    /// viscous stages are always present; forcing, descent, and mask
    /// only when configured. A descent stage with `eta == 0` is not
    /// added at all — disabled means absent, not partially applied.
    pub fn resolve(
        nu: f64,
        forcing: Option<SpectralVector>,
        descent: Option<(f64, f64)>,
        mask: Option<MaskFilter>,
    ) -> Self {
        let mut stages = vec![Stage::Nonlinear, Stage::Viscous { nu }];
        if let Some(spectrum) = forcing {
            if spectrum.weighted_sum_squares() > 0.0 {
                stages.push(Stage::Forcing { spectrum });
            }
        }
        if let Some((eta, alpha)) = descent {
            if eta != 0.0 {
                stages.push(Stage::Descent { eta, alpha });
            }
        }
        Self { stages, mask }
    }

    /// Stage names in application order, for the run log.
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.stages.iter().map(Stage::name).collect();
        names.push("projection");
        if self.mask.is_some() {
            names.push("mask");
        }
        names
    }

    pub fn mask(&self) -> Option<&MaskFilter> {
        self.mask.as_ref()
    }

    /// The resolved forcing spectrum, if a forcing stage is present.
    pub fn forcing(&self) -> Option<&SpectralVector> {
        self.stages.iter().find_map(|s| match s {
            Stage::Forcing { spectrum } => Some(spectrum),
            _ => None,
        })
    }

    /// Evaluate `dU/dt` at `u`.
    pub fn rhs(&self, u: &SpectralVector, grid: &WavenumberGrid) -> Result<RhsEval, FlowError> {
        let mut rhs = SpectralVector::zeros(u.shape());
        let mut stats = None;
        for stage in &self.stages {
            match stage {
                Stage::Nonlinear => {
                    stats = Some(nonlinear::add_nonlinear(&mut rhs, u, grid)?);
                }
                Stage::Viscous { nu } => viscous::add_viscous(&mut rhs, u, *nu, grid),
                Stage::Forcing { spectrum } => forcing::add_forcing(&mut rhs, spectrum),
                Stage::Descent { eta, alpha } => {
                    descent::add_descent(&mut rhs, u, *eta, *alpha, grid)
                }
            }
        }
        let stats = stats.ok_or_else(|| {
            FlowError::Configuration("pipeline resolved without an advective stage".into())
        })?;
        projection::project(&mut rhs, grid);
        if let Some(mask) = &self.mask {
            mask.apply(&mut rhs, grid);
        }
        Ok(RhsEval { rhs, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names_reflect_configuration() {
        let grid = WavenumberGrid::new([4, 4, 4]);
        let bare = Pipeline::resolve(0.01, None, None, None);
        assert_eq!(bare.stage_names(), vec!["nonlinear", "viscous", "projection"]);

        let masked = Pipeline::resolve(
            0.01,
            None,
            Some((0.1, 0.2)),
            Some(MaskFilter::build(MaskScheme::PrimeShell { beta: 0.5 }, &grid)),
        );
        assert_eq!(
            masked.stage_names(),
            vec!["nonlinear", "viscous", "descent", "projection", "mask"]
        );
    }

    #[test]
    fn test_zero_eta_descent_is_absent() {
        let p = Pipeline::resolve(0.01, None, Some((0.0, 0.2)), None);
        assert_eq!(p.stage_names(), vec!["nonlinear", "viscous", "projection"]);
    }

    #[test]
    fn test_zero_forcing_is_absent() {
        let grid = WavenumberGrid::new([8, 8, 8]);
        let f = forcing::force_shell(&grid, 2.0, 0.0, 1);
        let p = Pipeline::resolve(0.01, Some(f), None, None);
        assert_eq!(p.stage_names(), vec!["nonlinear", "viscous", "projection"]);
    }
}
