//! Regularizing descent term.
//!
//! `D = −η · Π(u − α·Δu)`, the projected gradient of
//! `T = ½‖u‖² + α‖∇u‖²`. In wavenumber space `u − α·Δu` is the scalar
//! factor `(1 + α|k|²)` per mode, which commutes with projection; the
//! state this acts on is kept solenoidal by the pipeline, so the
//! projection in the definition is the identity here.

use rustyflow_core::{SpectralVector, WavenumberGrid};

/// Accumulate the descent term into `rhs`. `eta = 0` contributes
/// nothing, exactly as if the stage were absent.
pub fn add_descent(
    rhs: &mut SpectralVector,
    u: &SpectralVector,
    eta: f64,
    alpha: f64,
    grid: &WavenumberGrid,
) {
    if eta == 0.0 {
        return;
    }
    for c in 0..3 {
        let dst = &mut rhs.components[c];
        let src = &u.components[c];
        for m in 0..grid.modes() {
            let gain = -eta * (1.0 + alpha * grid.k2(m));
            let re = dst.re(m) + gain * src.re(m);
            let im = dst.im(m) + gain * src.im(m);
            dst.set(m, re, im);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_eta_is_inert() {
        let grid = WavenumberGrid::new([4, 4, 4]);
        let mut u = SpectralVector::zeros([4, 4, 4]);
        u.components[0].set(5, 1.0, -1.0);
        let mut rhs = SpectralVector::zeros([4, 4, 4]);
        add_descent(&mut rhs, &u, 0.0, 0.3, &grid);
        assert!(rhs.components.iter().all(|c| c.data().iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_descent_scales_with_k2() {
        let grid = WavenumberGrid::new([4, 4, 4]);
        let mut u = SpectralVector::zeros([4, 4, 4]);
        let m = u.components[1].idx(0, 1, 0); // |k|² = 1
        u.components[1].set(m, 1.0, 0.0);
        let mut rhs = SpectralVector::zeros([4, 4, 4]);
        add_descent(&mut rhs, &u, 0.1, 0.5, &grid);
        // −0.1 · (1 + 0.5·1) = −0.15
        assert!((rhs.components[1].re(m) + 0.15).abs() < 1e-15);
    }
}
