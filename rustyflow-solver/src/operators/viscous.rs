//! Viscous dissipation: elementwise `−ν |k|² U(k)`.

use rustyflow_core::{SpectralVector, WavenumberGrid};

/// Accumulate the viscous term into `rhs`.
pub fn add_viscous(rhs: &mut SpectralVector, u: &SpectralVector, nu: f64, grid: &WavenumberGrid) {
    for c in 0..3 {
        let dst = &mut rhs.components[c];
        let src = &u.components[c];
        for m in 0..grid.modes() {
            let damp = -nu * grid.k2(m);
            let re = dst.re(m) + damp * src.re(m);
            let im = dst.im(m) + damp * src.im(m);
            dst.set(m, re, im);
        }
    }
}
