//! Arithmetic shell masks.
//!
//! A mask is a deterministic multiplicative filter on wavenumber
//! shells, selected by a named scheme and built ONCE at configuration
//! load into a per-shell coefficient table. Application multiplies each
//! mode by the coefficient of its integer shell `r = round(|k|)`; the
//! table itself is never mutated, so the filter cannot accumulate
//! across applications. A scalar factor per mode preserves `k·U = 0`,
//! which is why the mask slots strictly after projection.
//!
//! Shells 0 and 1 follow the arithmetic conventions: `gcd(0, n) = n`,
//! `Λ(0) = Λ(1) = 0`, and neither 0 nor 1 is prime.

use rustyflow_core::{SpectralVector, WavenumberGrid};

/// Named mask schemes.
#[derive(Clone, Debug, PartialEq)]
pub enum MaskScheme {
    /// Keep shells coprime to the primorial, attenuate the rest by β.
    CoprimeToPrimorial { primorial: u64, beta: f64 },
    /// Multiply every shell by `1 + α·Λ(r)`.
    VonMangoldt { alpha: f64 },
    /// Keep prime shells, attenuate the rest by β.
    PrimeShell { beta: f64 },
}

impl MaskScheme {
    /// Scheme name as logged and as spelled in run configurations.
    pub fn name(&self) -> &'static str {
        match self {
            MaskScheme::CoprimeToPrimorial { .. } => "coprime_to_primorial",
            MaskScheme::VonMangoldt { .. } => "von_mangoldt",
            MaskScheme::PrimeShell { .. } => "prime_shell",
        }
    }

    /// Filter coefficient for shell `r`.
    fn coefficient(&self, r: u64) -> f64 {
        match *self {
            MaskScheme::CoprimeToPrimorial { primorial, beta } => {
                if gcd(r, primorial) == 1 {
                    1.0
                } else {
                    beta
                }
            }
            MaskScheme::VonMangoldt { alpha } => 1.0 + alpha * von_mangoldt(r),
            MaskScheme::PrimeShell { beta } => {
                if is_prime(r) {
                    1.0
                } else {
                    beta
                }
            }
        }
    }
}

/// A built mask: one coefficient per integer shell of the run's grid.
#[derive(Clone, Debug)]
pub struct MaskFilter {
    scheme: MaskScheme,
    coeff: Vec<f64>,
}

impl MaskFilter {
    /// Build the per-shell coefficient table. Pure in the scheme
    /// parameters: building twice yields identical coefficients.
    pub fn build(scheme: MaskScheme, grid: &WavenumberGrid) -> Self {
        let coeff = (0..=grid.max_shell() as u64)
            .map(|r| scheme.coefficient(r))
            .collect();
        Self { scheme, coeff }
    }

    pub fn scheme(&self) -> &MaskScheme {
        &self.scheme
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coeff
    }

    /// Multiply each mode by its shell coefficient.
    pub fn apply(&self, u: &mut SpectralVector, grid: &WavenumberGrid) {
        for comp in &mut u.components {
            for m in 0..grid.modes() {
                let c = self.coeff[grid.shell(m) as usize];
                if c != 1.0 {
                    comp.set(m, c * comp.re(m), c * comp.im(m));
                }
            }
        }
    }
}

// ============================================================================
// Arithmetic functions
// ============================================================================

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Von Mangoldt function: `ln p` when `n = p^m` for prime p, else 0.
pub fn von_mangoldt(n: u64) -> f64 {
    if n < 2 {
        return 0.0;
    }
    // Find the smallest prime factor, then require n to be a pure power
    // of it.
    let mut p = n;
    for d in 2..=n {
        if d * d > n {
            break;
        }
        if n % d == 0 {
            p = d;
            break;
        }
    }
    let mut rest = n;
    while rest % p == 0 {
        rest /= p;
    }
    if rest == 1 {
        (p as f64).ln()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd_table() {
        assert_eq!(gcd(12, 30), 6);
        assert_eq!(gcd(7, 13), 1);
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(gcd(5, 0), 5);
    }

    #[test]
    fn test_prime_table() {
        let primes: Vec<u64> = (0..20).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19]);
    }

    #[test]
    fn test_von_mangoldt_table() {
        assert_eq!(von_mangoldt(0), 0.0);
        assert_eq!(von_mangoldt(1), 0.0);
        assert!((von_mangoldt(2) - 2.0f64.ln()).abs() < 1e-15);
        assert!((von_mangoldt(8) - 2.0f64.ln()).abs() < 1e-15); // 2³
        assert!((von_mangoldt(9) - 3.0f64.ln()).abs() < 1e-15); // 3²
        assert_eq!(von_mangoldt(6), 0.0); // 2·3
        assert_eq!(von_mangoldt(12), 0.0);
        assert!((von_mangoldt(13) - 13.0f64.ln()).abs() < 1e-15);
    }

    #[test]
    fn test_build_is_pure() {
        let grid = WavenumberGrid::new([8, 8, 8]);
        let a = MaskFilter::build(
            MaskScheme::CoprimeToPrimorial {
                primorial: 30,
                beta: 0.5,
            },
            &grid,
        );
        let b = MaskFilter::build(
            MaskScheme::CoprimeToPrimorial {
                primorial: 30,
                beta: 0.5,
            },
            &grid,
        );
        assert_eq!(a.coefficients(), b.coefficients());
    }

    #[test]
    fn test_coprime_coefficients() {
        // p# = 30 = 2·3·5: shells 7, 11, 13 are kept; 2..6, 8, 9, 10 are not.
        let grid = WavenumberGrid::new([32, 32, 32]);
        let f = MaskFilter::build(
            MaskScheme::CoprimeToPrimorial {
                primorial: 30,
                beta: 0.25,
            },
            &grid,
        );
        let c = f.coefficients();
        assert_eq!(c[7], 1.0);
        assert_eq!(c[11], 1.0);
        assert_eq!(c[6], 0.25);
        assert_eq!(c[10], 0.25);
        assert_eq!(c[0], 0.25); // gcd(0, 30) = 30
    }

    #[test]
    fn test_truncation_mask_is_idempotent() {
        // β = 0 coefficients are {0, 1}: applying twice equals once.
        let grid = WavenumberGrid::new([8, 8, 8]);
        let f = MaskFilter::build(MaskScheme::PrimeShell { beta: 0.0 }, &grid);
        let mut u = SpectralVector::zeros([8, 8, 8]);
        for (c, comp) in u.components.iter_mut().enumerate() {
            for m in 0..comp.modes() {
                comp.set(m, (m + c) as f64, 1.0);
            }
        }
        f.apply(&mut u, &grid);
        let once = u.clone();
        f.apply(&mut u, &grid);
        for (a, b) in once.components.iter().zip(u.components.iter()) {
            assert_eq!(a.data(), b.data());
        }
    }

    #[test]
    fn test_von_mangoldt_mask_boosts_prime_powers() {
        let grid = WavenumberGrid::new([16, 16, 16]);
        let f = MaskFilter::build(MaskScheme::VonMangoldt { alpha: 1.0 }, &grid);
        let c = f.coefficients();
        assert_eq!(c[6], 1.0); // composite: Λ = 0
        assert!((c[4] - (1.0 + 2.0f64.ln())).abs() < 1e-15); // 2²
        assert!((c[5] - (1.0 + 5.0f64.ln())).abs() < 1e-15);
    }
}
