//! Initial conditions.

use crate::operators::projection::project;
use rustyflow_core::{Field, SpectralVector, SplitMix64, VectorField, WavenumberGrid};

/// Taylor-Green vortex on `[0, 2π)³`:
/// `u = sin x cos y cos z`, `v = −cos x sin y cos z`, `w = 0`.
/// Solenoidal by construction, peak speed 1.
pub fn taylor_green(shape: [usize; 3]) -> VectorField {
    let tau = 2.0 * std::f64::consts::PI;
    let [n1, n2, n3] = shape;
    let u = Field::from_fn(shape, |i, j, k| {
        (tau * i as f64 / n1 as f64).sin()
            * (tau * j as f64 / n2 as f64).cos()
            * (tau * k as f64 / n3 as f64).cos()
    });
    let v = Field::from_fn(shape, |i, j, k| {
        -(tau * i as f64 / n1 as f64).cos()
            * (tau * j as f64 / n2 as f64).sin()
            * (tau * k as f64 / n3 as f64).cos()
    });
    let w = Field::zeros(shape);
    VectorField::new([u, v, w])
}

/// Seeded random solenoidal spectrum: low-wavenumber modes get
/// counter-based random phases with a `k⁻²` amplitude falloff, then the
/// whole thing is symmetrized, projected, and normalized to unit
/// kinetic energy. Deterministic per seed.
pub fn random_solenoidal(shape: [usize; 3], seed: u64, grid: &WavenumberGrid) -> SpectralVector {
    let mut u = SpectralVector::zeros(shape);
    let k_cap = (shape[0].min(shape[1]).min(shape[2]) as f64) / 3.0;
    for (c, comp) in u.components.iter_mut().enumerate() {
        for m in 0..grid.modes() {
            let k2 = grid.k2(m);
            if k2 == 0.0 || k2.sqrt() > k_cap {
                continue;
            }
            let mut rng = SplitMix64::at(seed, (c * grid.modes() + m) as u64);
            let phi = 2.0 * std::f64::consts::PI * rng.next_f64();
            let amp = 1.0 / k2;
            comp.set(m, amp * phi.cos(), amp * phi.sin());
        }
    }
    u.symmetrize();
    project(&mut u, grid);
    let norm = (0.5 * u.weighted_sum_squares()).sqrt();
    if norm > 0.0 {
        u.scale(1.0 / norm);
    }
    u
}
