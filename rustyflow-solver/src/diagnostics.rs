//! Per-substage diagnostics and snapshot-level summaries.
//!
//! `DiagnosticRecord`s form an append-only sequence written by the
//! integrator thread only; nothing is mutated retroactively. Snapshot
//! summaries (shell spectrum, energy budget, digest line) are derived
//! on demand from the current spectral state.

use rustyflow_core::{SpectralVector, WavenumberGrid};
use std::time::{SystemTime, UNIX_EPOCH};

/// Scalar bundle recorded after every RK substage.
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticRecord {
    pub step: usize,
    pub substage: usize,
    pub divergence_norm: f64,
    pub parseval_error: f64,
    pub kinetic_energy: f64,
    pub cfl_ratio: f64,
    /// Seconds since the Unix epoch at record time.
    pub timestamp: f64,
}

pub fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Total kinetic energy `½ Σ_k w |U(k)|²` (= `½ Σ_x |u(x)|²` by
/// Parseval under the unitary transform).
pub fn kinetic_energy(u: &SpectralVector) -> f64 {
    0.5 * u.weighted_sum_squares()
}

/// Shell-averaged energy spectrum: `E(r) = ½ Σ_{round(|k|) = r} w |U|²`.
pub fn shell_spectrum(u: &SpectralVector, grid: &WavenumberGrid) -> Vec<f64> {
    let mut e = vec![0.0; grid.max_shell() as usize + 1];
    for comp in &u.components {
        for m in 0..grid.modes() {
            let mag2 = comp.re(m) * comp.re(m) + comp.im(m) * comp.im(m);
            e[grid.shell(m) as usize] += 0.5 * grid.weight(m) * mag2;
        }
    }
    e
}

/// Energy budget terms of the current state.
#[derive(Clone, Copy, Debug)]
pub struct EnergyBudget {
    pub energy: f64,
    /// `Σ_k w F·u` — injection by the forcing term.
    pub injection: f64,
    /// `2ν Σ_k w |k|² · ½|U|²` — viscous dissipation rate.
    pub dissipation: f64,
}

pub fn energy_budget(
    u: &SpectralVector,
    forcing: Option<&SpectralVector>,
    nu: f64,
    grid: &WavenumberGrid,
) -> EnergyBudget {
    let mut dissipation = 0.0;
    for comp in &u.components {
        for m in 0..grid.modes() {
            let mag2 = comp.re(m) * comp.re(m) + comp.im(m) * comp.im(m);
            dissipation += nu * grid.k2(m) * grid.weight(m) * mag2;
        }
    }
    let mut injection = 0.0;
    if let Some(f) = forcing {
        for (uc, fc) in u.components.iter().zip(f.components.iter()) {
            for m in 0..grid.modes() {
                injection += grid.weight(m) * (uc.re(m) * fc.re(m) + uc.im(m) * fc.im(m));
            }
        }
    }
    EnergyBudget {
        energy: kinetic_energy(u),
        injection,
        dissipation,
    }
}

/// Snapshot digest line, Mode A flavor.
pub fn digest_line_exact(energy: f64, parseval: f64, linf: f64) -> String {
    format!(
        "digest: E={:.6}, Parseval={:.2e}, Linf={:.2e}",
        energy, parseval, linf
    )
}

/// Snapshot digest line, Mode B flavor.
pub fn digest_line_statistical(energy: f64, parseval: f64, phase_ks: f64) -> String {
    format!(
        "digest: E={:.6}, Parseval={:.2e}, phase_KS={:.4}",
        energy, parseval, phase_ks
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_spectrum_totals_energy() {
        let grid = WavenumberGrid::new([8, 8, 8]);
        let mut u = SpectralVector::zeros([8, 8, 8]);
        for (i, comp) in u.components.iter_mut().enumerate() {
            for m in 0..comp.modes() {
                comp.set(m, (i + 1) as f64 * 0.1, 0.05);
            }
        }
        let e = shell_spectrum(&u, &grid);
        let total: f64 = e.iter().sum();
        assert!((total - kinetic_energy(&u)).abs() < 1e-10 * total);
    }

    #[test]
    fn test_dissipation_ignores_dc() {
        let grid = WavenumberGrid::new([4, 4, 4]);
        let mut u = SpectralVector::zeros([4, 4, 4]);
        let dc = u.components[0].idx(0, 0, 0);
        u.components[0].set(dc, 5.0, 0.0);
        let b = energy_budget(&u, None, 0.1, &grid);
        assert_eq!(b.dissipation, 0.0);
        assert_eq!(b.injection, 0.0);
        assert!((b.energy - 12.5).abs() < 1e-12);
    }

    #[test]
    fn test_digest_formats() {
        let a = digest_line_exact(1.234567, 1.2e-13, 3.4e-15);
        assert!(a.starts_with("digest: E=1.234567, Parseval=1.20e-13"));
        let b = digest_line_statistical(0.5, 2.0e-13, 0.0123);
        assert!(b.ends_with("phase_KS=0.0123"));
    }
}
