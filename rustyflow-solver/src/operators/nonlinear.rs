//! Pseudospectral advective term `−u·∇u`.
//!
//! The product is formed pointwise in physical space, which folds
//! truncated high modes back onto retained ones; the 2/3-rule mask is
//! applied to every spectrum headed into an inverse transform and again
//! to the product after the forward transform. The physical-space
//! velocity and its maximum magnitude fall out as by-products, so the
//! integrator reuses them for the CFL ratio and the Parseval check
//! instead of paying extra transforms.

use crate::operators::projection::project;
use rustyflow_core::{Field, FlowError, SpectralVector, Spectrum, WavenumberGrid};
use rustyflow_fft::{forward, inverse};

/// By-products of one advective evaluation.
#[derive(Clone, Copy, Debug)]
pub struct AdvectionStats {
    /// Pointwise maximum of `|u|` over the grid.
    pub u_max: f64,
    /// Relative Parseval error between the dealiased spectrum and its
    /// physical-space reconstruction.
    pub parseval_error: f64,
    /// `Σ_x |u(x)|²` of the dealiased velocity.
    pub physical_sum_squares: f64,
}

/// Zero every mode outside the 2/3-rule truncation, in place.
pub fn dealias(spec: &mut Spectrum, grid: &WavenumberGrid) {
    for m in 0..grid.modes() {
        if !grid.dealias_keep(m) {
            spec.set(m, 0.0, 0.0);
        }
    }
}

/// Dealias all three components.
pub fn dealias_vector(u: &mut SpectralVector, grid: &WavenumberGrid) {
    for comp in &mut u.components {
        dealias(comp, grid);
    }
}

/// Spectral derivative along axis `axis`: `i k_axis U(k)`.
fn derivative(spec: &Spectrum, axis: usize, grid: &WavenumberGrid) -> Spectrum {
    let mut out = Spectrum::zeros(spec.shape());
    for m in 0..grid.modes() {
        let k = grid.k(m)[axis];
        out.set(m, -k * spec.im(m), k * spec.re(m));
    }
    out
}

/// Accumulate the projected, dealiased advective term into `rhs`.
pub fn add_nonlinear(
    rhs: &mut SpectralVector,
    u_hat: &SpectralVector,
    grid: &WavenumberGrid,
) -> Result<AdvectionStats, FlowError> {
    let shape = u_hat.shape();

    let mut ud = u_hat.clone();
    dealias_vector(&mut ud, grid);

    // Velocity to physical space (3 inverse transforms).
    let u_phys = [
        inverse(&ud.components[0])?,
        inverse(&ud.components[1])?,
        inverse(&ud.components[2])?,
    ];

    let physical_sum_squares: f64 = u_phys.iter().map(Field::sum_squares).sum();
    let spectral = ud.weighted_sum_squares();
    let denom = physical_sum_squares.max(spectral);
    let parseval_error = if denom == 0.0 {
        0.0
    } else {
        (physical_sum_squares - spectral).abs() / denom
    };

    let mut max_sq = 0.0f64;
    for idx in 0..u_phys[0].len() {
        let sq = u_phys[0].data()[idx] * u_phys[0].data()[idx]
            + u_phys[1].data()[idx] * u_phys[1].data()[idx]
            + u_phys[2].data()[idx] * u_phys[2].data()[idx];
        max_sq = max_sq.max(sq);
    }

    // Advective term, one component at a time (9 more inverses).
    let mut nl = SpectralVector::zeros(shape);
    for j in 0..3 {
        let mut adv = vec![0.0f64; u_phys[0].len()];
        for i in 0..3 {
            let d_hat = derivative(&ud.components[j], i, grid);
            let d_phys = inverse(&d_hat)?;
            for (a, (&u, &d)) in adv
                .iter_mut()
                .zip(u_phys[i].data().iter().zip(d_phys.data().iter()))
            {
                *a -= u * d;
            }
        }
        let mut n_hat = forward(&Field::from_data(shape, adv));
        dealias(&mut n_hat, grid);
        nl.components[j] = n_hat;
    }
    project(&mut nl, grid);
    rhs.add_scaled(&nl, 1.0);

    Ok(AdvectionStats {
        u_max: max_sq.sqrt(),
        parseval_error,
        physical_sum_squares,
    })
}
