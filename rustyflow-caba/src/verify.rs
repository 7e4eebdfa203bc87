//! Container verification.
//!
//! Mode A has an exact reconstruction guarantee: the archived
//! coefficients must survive an inverse/forward transform cycle to
//! `L∞ ≈ 1e-12` and match the recorded Parseval energy. Mode B has a
//! statistical guarantee instead: redrawn phases must be uniform
//! (Kolmogorov-Smirnov), the reconstructed power spectrum must match
//! the stored one, and two independently-seeded realizations must be
//! decorrelated.
//!
//! Verification never touches a corrupt container: both digests are
//! checked first, and a mismatch refuses to decode anything.

use crate::codec::{decode_exact, decode_statistical, split_verified};
use crate::header::{Binning, CabaHeader, Mode};
use rustyflow_core::{FlowError, Spectrum, WavenumberGrid};
use rustyflow_fft::{forward, inverse};

/// Salt for the second, independent realization used by the
/// cross-correlation check.
const SECOND_REALIZATION_SALT: u64 = 0xD1B5_4A32_D192_ED03;

/// Amplitudes below this are treated as empty modes with no phase.
const PHASE_FLOOR: f64 = 1e-150;

/// Metrics returned by `verify`. Mode A fills the reconstruction pair;
/// Mode B fills the statistical triple. `parseval_error` is always
/// present.
#[derive(Clone, Copy, Debug)]
pub struct VerifyReport {
    pub mode: Mode,
    pub parseval_error: f64,
    pub linf_error: Option<f64>,
    pub phase_ks: Option<f64>,
    pub spectrum_max_dev: Option<f64>,
    pub spectrum_rms_dev: Option<f64>,
    pub cross_correlation: Option<f64>,
}

/// Verify a container and report its reconstruction metrics.
pub fn verify(bytes: &[u8]) -> Result<VerifyReport, FlowError> {
    let (header, payload) = split_verified(bytes)?;
    match header.mode {
        Mode::Exact => verify_exact(&header, &payload),
        Mode::Statistical => verify_statistical(&header, &payload),
    }
}

fn verify_exact(header: &CabaHeader, payload: &[u8]) -> Result<VerifyReport, FlowError> {
    let spec = decode_exact(header, payload)?;
    let field = inverse(&spec)?;
    let respec = forward(&field);

    let mut linf = 0.0f64;
    for (a, b) in spec.data().iter().zip(respec.data().iter()) {
        linf = linf.max((a - b).abs());
    }

    Ok(VerifyReport {
        mode: Mode::Exact,
        parseval_error: relative_error(field.sum_squares(), header.parseval_energy),
        linf_error: Some(linf),
        phase_ks: None,
        spectrum_max_dev: None,
        spectrum_rms_dev: None,
        cross_correlation: None,
    })
}

fn verify_statistical(header: &CabaHeader, payload: &[u8]) -> Result<VerifyReport, FlowError> {
    let decoded = decode_statistical(header, payload, header.seed)?;
    let grid = WavenumberGrid::new(decoded.shape());

    // Spectral matching: rebuild the stored power representation from
    // the realization and compare.
    let (max_dev, rms_dev) = match header.binning {
        Binning::PerMode => {
            let stored: Vec<f64> = payload
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                .collect();
            let rebuilt: Vec<f64> = (0..decoded.modes())
                .map(|m| decoded.re(m) * decoded.re(m) + decoded.im(m) * decoded.im(m))
                .collect();
            power_deviation(&stored, &rebuilt)
        }
        Binning::RadialShells => {
            let stored: Vec<f64> = payload[8..]
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                .collect();
            let mut rebuilt = vec![0.0f64; grid.max_shell() as usize + 1];
            for m in 0..decoded.modes() {
                let mag2 = decoded.re(m) * decoded.re(m) + decoded.im(m) * decoded.im(m);
                rebuilt[grid.shell(m) as usize] += grid.weight(m) * mag2;
            }
            power_deviation(&stored, &rebuilt)
        }
    };

    // Phase uniformity over populated, non-self-conjugate modes.
    let phase_ks = phase_ks_statistic(&decoded);

    // Two independent realizations must be decorrelated in physical
    // space (DC excluded — a shared mean is not correlation).
    let second = decode_statistical(header, payload, header.seed ^ SECOND_REALIZATION_SALT)?;
    let cross = field_correlation(&decoded, &second)?;

    Ok(VerifyReport {
        mode: Mode::Statistical,
        parseval_error: relative_error(decoded.weighted_sum_squares(), header.parseval_energy),
        linf_error: None,
        phase_ks: Some(phase_ks),
        spectrum_max_dev: Some(max_dev),
        spectrum_rms_dev: Some(rms_dev),
        cross_correlation: Some(cross),
    })
}

fn relative_error(a: f64, b: f64) -> f64 {
    let denom = a.abs().max(b.abs());
    if denom == 0.0 {
        0.0
    } else {
        (a - b).abs() / denom
    }
}

/// Max and RMS deviation, normalized by the largest stored power.
fn power_deviation(stored: &[f64], rebuilt: &[f64]) -> (f64, f64) {
    let reference = stored.iter().fold(0.0f64, |acc, &p| acc.max(p.abs()));
    if reference == 0.0 {
        return (0.0, 0.0);
    }
    let mut max_dev = 0.0f64;
    let mut sum_sq = 0.0f64;
    for (&s, &r) in stored.iter().zip(rebuilt.iter()) {
        let d = (s - r).abs() / reference;
        max_dev = max_dev.max(d);
        sum_sq += d * d;
    }
    (max_dev, (sum_sq / stored.len() as f64).sqrt())
}

/// Kolmogorov-Smirnov statistic of the decoded phases against
/// `Uniform[0, 2π)`. Self-conjugate modes carry no phase and are
/// skipped, as are empty modes.
fn phase_ks_statistic(spec: &Spectrum) -> f64 {
    let [_, _, n3] = spec.shape();
    let nk3 = spec.nk3();
    let nyquist = n3 / 2;
    let tau = 2.0 * std::f64::consts::PI;

    let mut phases = Vec::new();
    for m in 0..spec.modes() {
        let (re, im) = (spec.re(m), spec.im(m));
        if re * re + im * im < PHASE_FLOOR {
            continue;
        }
        let k3 = m % nk3;
        if k3 == 0 || k3 == nyquist {
            let k1 = m / (spec.shape()[1] * nk3);
            let k2 = (m / nk3) % spec.shape()[1];
            if spec.mirror(k1, k2) == (k1, k2) {
                continue; // self-conjugate: sign only, no phase
            }
        }
        let mut phi = im.atan2(re);
        if phi < 0.0 {
            phi += tau;
        }
        phases.push(phi / tau);
    }
    if phases.is_empty() {
        return 0.0;
    }
    phases.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = phases.len() as f64;
    let mut d = 0.0f64;
    for (i, &x) in phases.iter().enumerate() {
        let lo = i as f64 / n;
        let hi = (i as f64 + 1.0) / n;
        d = d.max(x - lo).max(hi - x);
    }
    d
}

/// Normalized physical-space correlation of two realizations, with the
/// DC mode removed from both.
fn field_correlation(a: &Spectrum, b: &Spectrum) -> Result<f64, FlowError> {
    let mut a = a.clone();
    let mut b = b.clone();
    a.set(0, 0.0, 0.0);
    b.set(0, 0.0, 0.0);
    let fa = inverse(&a)?;
    let fb = inverse(&b)?;
    let dot: f64 = fa
        .data()
        .iter()
        .zip(fb.data().iter())
        .map(|(&x, &y)| x * y)
        .sum();
    let norm = (fa.sum_squares() * fb.sum_squares()).sqrt();
    if norm == 0.0 {
        Ok(0.0)
    } else {
        Ok(dot / norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{pack, PackParams};
    use rustyflow_core::SplitMix64;

    fn sample_spectrum(shape: [usize; 3], seed: u64) -> Spectrum {
        let mut s = Spectrum::zeros(shape);
        for m in 0..s.modes() {
            let mut rng = SplitMix64::at(seed, m as u64);
            s.set(m, rng.next_f64() - 0.5, rng.next_f64() - 0.5);
        }
        s.symmetrize();
        s
    }

    #[test]
    fn test_exact_verify_meets_targets() {
        let spec = sample_spectrum([8, 8, 8], 21);
        let container = pack(&spec, &PackParams::default()).unwrap();
        let report = verify(&container).unwrap();
        assert_eq!(report.mode, Mode::Exact);
        assert!(report.linf_error.unwrap() < 1e-12);
        assert!(report.parseval_error < 1e-12);
    }

    #[test]
    fn test_statistical_verify_metrics() {
        let spec = sample_spectrum([8, 8, 8], 22);
        let params = PackParams {
            mode: Mode::Statistical,
            seed: 1234,
            ..PackParams::default()
        };
        let container = pack(&spec, &params).unwrap();
        let report = verify(&container).unwrap();
        assert_eq!(report.mode, Mode::Statistical);
        // Per-mode powers are reproduced exactly up to rounding.
        assert!(report.spectrum_max_dev.unwrap() < 1e-12);
        assert!(report.spectrum_rms_dev.unwrap() < 1e-12);
        // ~600 phases: KS well under the 1% critical value 1.63/√n.
        let ks = report.phase_ks.unwrap();
        assert!(ks < 0.12, "phases not uniform: KS = {}", ks);
        // Independent realizations decorrelate.
        assert!(report.cross_correlation.unwrap().abs() < 0.2);
        assert!(report.parseval_error < 1e-12);
    }

    #[test]
    fn test_corrupt_checksum_field_refuses_decode() {
        let spec = sample_spectrum([4, 4, 4], 23);
        let mut container = pack(&spec, &PackParams::default()).unwrap();
        container[68] ^= 0xFF; // one byte inside the header checksum field
        match verify(&container) {
            Err(FlowError::ChecksumMismatch { .. }) => {}
            other => panic!("expected ChecksumMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_ks_statistic_on_known_samples() {
        // A spectrum with all phases at 0 is maximally non-uniform.
        let mut s = Spectrum::zeros([4, 4, 8]);
        for m in 0..s.modes() {
            s.set(m, 1.0, 0.0);
        }
        let d = phase_ks_statistic(&s);
        assert!(d > 0.9, "degenerate phases should give KS ≈ 1, got {}", d);
    }
}
