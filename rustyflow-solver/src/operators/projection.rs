//! Leray projection onto the divergence-free subspace.
//!
//! In wavenumber space the projector is algebraic: for every nonzero
//! mode subtract the component of `U` parallel to `k`,
//! `U' = U − k (k·U) / |k|²`. The DC mode (mean flow) passes unchanged.

use rustyflow_core::{FlowError, SpectralVector, WavenumberGrid};

/// Default absolute/relative threshold on the post-projection residual.
pub const DIVERGENCE_TOL: f64 = 1e-12;

/// Project `u` onto the divergence-free subspace, in place.
pub fn project(u: &mut SpectralVector, grid: &WavenumberGrid) {
    let modes = grid.modes();
    let [ux, uy, uz] = &mut u.components;
    for m in 0..modes {
        let k2 = grid.k2(m);
        if k2 == 0.0 {
            continue; // DC passthrough
        }
        let [kx, ky, kz] = grid.k(m);
        let dot_re = kx * ux.re(m) + ky * uy.re(m) + kz * uz.re(m);
        let dot_im = kx * ux.im(m) + ky * uy.im(m) + kz * uz.im(m);
        let cr = dot_re / k2;
        let ci = dot_im / k2;
        ux.set(m, ux.re(m) - kx * cr, ux.im(m) - kx * ci);
        uy.set(m, uy.re(m) - ky * cr, uy.im(m) - ky * ci);
        uz.set(m, uz.re(m) - kz * cr, uz.im(m) - kz * ci);
    }
}

/// Divergence norm `√(Σ_k w |k·U(k)|²)` over the compacted spectrum.
pub fn divergence_norm(u: &SpectralVector, grid: &WavenumberGrid) -> f64 {
    let [ux, uy, uz] = &u.components;
    let mut total = 0.0;
    for m in 0..grid.modes() {
        let [kx, ky, kz] = grid.k(m);
        let dot_re = kx * ux.re(m) + ky * uy.re(m) + kz * uz.re(m);
        let dot_im = kx * ux.im(m) + ky * uy.im(m) + kz * uz.im(m);
        total += grid.weight(m) * (dot_re * dot_re + dot_im * dot_im);
    }
    total.sqrt()
}

/// Project and verify: the residual must fall below `tol` in absolute
/// terms or relative to the velocity norm, else `DivergenceExceeded`.
pub fn project_checked(
    u: &mut SpectralVector,
    grid: &WavenumberGrid,
    tol: f64,
) -> Result<f64, FlowError> {
    project(u, grid);
    let norm = divergence_norm(u, grid);
    let scale = u.weighted_sum_squares().sqrt().max(1.0);
    if norm > tol * scale {
        return Err(FlowError::DivergenceExceeded {
            norm,
            threshold: tol * scale,
        });
    }
    Ok(norm)
}
