//! Divergence-free shell forcing.
//!
//! Energy is injected into the thin shell `||k| − k_f| ≤ 1/2`. Phases
//! are drawn counter-based from `SplitMix64(seed, mode index)`, so the
//! same seed produces bit-identical forcing regardless of evaluation
//! order. The raw draw is symmetrized (real field), projected
//! (divergence-free), and scaled so the spectral norm equals
//! `amplitude`. The result is constant over the run.

use crate::operators::projection::project;
use rustyflow_core::{SpectralVector, SplitMix64, WavenumberGrid};

/// Half-width of the forced shell.
pub const SHELL_WIDTH: f64 = 0.5;

/// Build the forcing spectrum for a run.
///
/// Deterministic: same `(k_f, amplitude, seed)` ⇒ bit-identical output.
/// Returns an all-zero spectrum when the shell contains no modes or
/// `amplitude == 0`.
pub fn force_shell(
    grid: &WavenumberGrid,
    k_f: f64,
    amplitude: f64,
    seed: u64,
) -> SpectralVector {
    let mut f = SpectralVector::zeros(grid.shape());
    if amplitude == 0.0 {
        return f;
    }

    for (c, comp) in f.components.iter_mut().enumerate() {
        for m in 0..grid.modes() {
            let k2 = grid.k2(m);
            if k2 == 0.0 || !grid.dealias_keep(m) {
                continue; // force only within the resolved band
            }
            if (k2.sqrt() - k_f).abs() > SHELL_WIDTH {
                continue;
            }
            let mut rng = SplitMix64::at(seed, (c * grid.modes() + m) as u64);
            let phi = 2.0 * std::f64::consts::PI * rng.next_f64();
            comp.set(m, phi.cos(), phi.sin());
        }
    }

    // Real field, then solenoidal.
    f.symmetrize();
    project(&mut f, grid);

    let norm = f.weighted_sum_squares().sqrt();
    if norm > 0.0 {
        f.scale(amplitude / norm);
    }
    f
}

/// Accumulate the forcing into `rhs`.
pub fn add_forcing(rhs: &mut SpectralVector, f: &SpectralVector) {
    rhs.add_scaled(f, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::projection::divergence_norm;

    #[test]
    fn test_forcing_is_deterministic() {
        let grid = WavenumberGrid::new([8, 8, 8]);
        let a = force_shell(&grid, 2.0, 0.3, 99);
        let b = force_shell(&grid, 2.0, 0.3, 99);
        for (x, y) in a.components.iter().zip(b.components.iter()) {
            assert_eq!(x.data(), y.data(), "same seed must be bit-identical");
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let grid = WavenumberGrid::new([8, 8, 8]);
        let a = force_shell(&grid, 2.0, 0.3, 1);
        let b = force_shell(&grid, 2.0, 0.3, 2);
        assert_ne!(a.components[0].data(), b.components[0].data());
    }

    #[test]
    fn test_forcing_is_divergence_free() {
        let grid = WavenumberGrid::new([8, 8, 8]);
        let f = force_shell(&grid, 2.0, 1.0, 7);
        assert!(divergence_norm(&f, &grid) < 1e-12);
    }

    #[test]
    fn test_forcing_norm_matches_amplitude() {
        let grid = WavenumberGrid::new([8, 8, 8]);
        let f = force_shell(&grid, 2.0, 0.25, 7);
        assert!((f.weighted_sum_squares().sqrt() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_forcing_confined_to_shell() {
        let grid = WavenumberGrid::new([8, 8, 8]);
        let f = force_shell(&grid, 2.0, 1.0, 7);
        for comp in &f.components {
            for m in 0..comp.modes() {
                let mag = comp.re(m).abs() + comp.im(m).abs();
                if mag > 1e-12 {
                    let k = grid.k2(m).sqrt();
                    assert!(
                        (k - 2.0).abs() <= SHELL_WIDTH,
                        "energy at |k| = {} outside shell",
                        k
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_amplitude_is_zero() {
        let grid = WavenumberGrid::new([4, 4, 4]);
        let f = force_shell(&grid, 2.0, 0.0, 7);
        assert_eq!(f.weighted_sum_squares(), 0.0);
    }
}
