//! Unitary 3D real↔complex transform with Hermitian compaction.
//!
//! `forward` runs the complex FFT over axes in a fixed order (axis 2,
//! then 1, then 0), scales by `1/√N`, and keeps only the independent
//! half of the last axis (`n3/2 + 1` planes). `inverse` reconstructs
//! the discarded half from conjugate symmetry and transforms back; the
//! pair are exact mutual inverses up to floating-point rounding.
//!
//! Two corruption guards, both `SymmetryViolation`:
//! - off-diagonal Hermitian pairs on the self-paired planes that
//!   disagree beyond tolerance, checked before the inverse runs;
//! - an imaginary residue in the reconstructed field, checked after.

use crate::fft1d::{fft, ifft};
use rustyflow_core::{Field, FlowError, SpectralVector, Spectrum, VectorField};

/// Relative tolerance for both Hermitian guards.
pub const SYMMETRY_TOL: f64 = 1e-8;

/// Run the 1D transform along `axis` of a full interleaved-complex 3D
/// buffer. Axis 2 lines are contiguous; axes 0 and 1 gather through a
/// scratch line.
fn transform_axis(buf: &mut [f64], shape: [usize; 3], axis: usize, backward: bool) {
    let [n1, n2, n3] = shape;
    let n = shape[axis];
    let run = |line: &mut [f64]| {
        if backward {
            ifft(line, n);
        } else {
            fft(line, n);
        }
    };

    match axis {
        2 => {
            for line in 0..n1 * n2 {
                let base = 2 * line * n3;
                run(&mut buf[base..base + 2 * n3]);
            }
        }
        1 => {
            let mut scratch = vec![0.0f64; 2 * n2];
            for i1 in 0..n1 {
                for i3 in 0..n3 {
                    let base = i1 * n2 * n3 + i3;
                    for j in 0..n2 {
                        let src = 2 * (base + j * n3);
                        scratch[2 * j] = buf[src];
                        scratch[2 * j + 1] = buf[src + 1];
                    }
                    run(&mut scratch);
                    for j in 0..n2 {
                        let dst = 2 * (base + j * n3);
                        buf[dst] = scratch[2 * j];
                        buf[dst + 1] = scratch[2 * j + 1];
                    }
                }
            }
        }
        0 => {
            let stride = n2 * n3;
            let mut scratch = vec![0.0f64; 2 * n1];
            for i2 in 0..n2 {
                for i3 in 0..n3 {
                    let base = i2 * n3 + i3;
                    for j in 0..n1 {
                        let src = 2 * (base + j * stride);
                        scratch[2 * j] = buf[src];
                        scratch[2 * j + 1] = buf[src + 1];
                    }
                    run(&mut scratch);
                    for j in 0..n1 {
                        let dst = 2 * (base + j * stride);
                        buf[dst] = scratch[2 * j];
                        buf[dst + 1] = scratch[2 * j + 1];
                    }
                }
            }
        }
        _ => unreachable!("axis must be 0, 1, or 2"),
    }
}

/// Unitary forward transform of a real field, Hermitian-compacted.
pub fn forward(field: &Field) -> Spectrum {
    let shape = field.shape();
    let [n1, n2, n3] = shape;
    let n_total = n1 * n2 * n3;

    // Pack real data into complex (zero imaginary parts)
    let mut buf = vec![0.0f64; 2 * n_total];
    for (i, &x) in field.data().iter().enumerate() {
        buf[2 * i] = x;
    }

    transform_axis(&mut buf, shape, 2, false);
    transform_axis(&mut buf, shape, 1, false);
    transform_axis(&mut buf, shape, 0, false);

    // Unitary normalization
    let scale = 1.0 / (n_total as f64).sqrt();
    for x in &mut buf {
        *x *= scale;
    }

    // Keep only the independent half of the last axis.
    let nk3 = n3 / 2 + 1;
    let mut out = Spectrum::zeros(shape);
    for i1 in 0..n1 {
        for i2 in 0..n2 {
            for k3 in 0..nk3 {
                let src = 2 * ((i1 * n2 + i2) * n3 + k3);
                let dst = out.idx(i1, i2, k3);
                out.set(dst, buf[src], buf[src + 1]);
            }
        }
    }
    out
}

/// Unitary inverse transform back to a real field.
///
/// Fails with `SymmetryViolation` if the compacted spectrum is not
/// Hermitian-consistent, or if the reconstruction carries a nonzero
/// imaginary residue — either one indicates corrupted input or an
/// upstream transform bug.
pub fn inverse(spec: &Spectrum) -> Result<Field, FlowError> {
    let shape = spec.shape();
    let [n1, n2, n3] = shape;
    let n_total = n1 * n2 * n3;
    let nk3 = spec.nk3();

    let mut max_mag = 0.0f64;
    for m in 0..spec.modes() {
        max_mag = max_mag.max(spec.re(m).abs()).max(spec.im(m).abs());
    }
    let mismatch = spec.symmetry_mismatch();
    if mismatch > SYMMETRY_TOL * (1.0 + max_mag) {
        return Err(FlowError::SymmetryViolation {
            detail: "conjugate pairs disagree on self-paired planes",
            mismatch,
        });
    }

    // Expand the compacted half via U(-k) = conj(U(k)).
    let mut buf = vec![0.0f64; 2 * n_total];
    for i1 in 0..n1 {
        for i2 in 0..n2 {
            for k3 in 0..n3 {
                let dst = 2 * ((i1 * n2 + i2) * n3 + k3);
                if k3 < nk3 {
                    let m = spec.idx(i1, i2, k3);
                    buf[dst] = spec.re(m);
                    buf[dst + 1] = spec.im(m);
                } else {
                    let (m1, m2) = spec.mirror(i1, i2);
                    let m = spec.idx(m1, m2, n3 - k3);
                    buf[dst] = spec.re(m);
                    buf[dst + 1] = -spec.im(m);
                }
            }
        }
    }

    transform_axis(&mut buf, shape, 0, true);
    transform_axis(&mut buf, shape, 1, true);
    transform_axis(&mut buf, shape, 2, true);

    // ifft carries 1/n per axis; correct to the unitary 1/√N.
    let scale = (n_total as f64).sqrt();
    let mut max_re = 0.0f64;
    let mut max_im = 0.0f64;
    for i in 0..n_total {
        buf[2 * i] *= scale;
        buf[2 * i + 1] *= scale;
        max_re = max_re.max(buf[2 * i].abs());
        max_im = max_im.max(buf[2 * i + 1].abs());
    }
    if max_im > SYMMETRY_TOL * (1.0 + max_re) {
        return Err(FlowError::SymmetryViolation {
            detail: "inverse transform produced a nonzero imaginary residue",
            mismatch: max_im,
        });
    }

    let mut out = Field::zeros(shape);
    for (i, x) in out.data_mut().iter_mut().enumerate() {
        *x = buf[2 * i];
    }
    Ok(out)
}

/// Forward transform of all three components.
pub fn forward_vector(field: &VectorField) -> SpectralVector {
    SpectralVector::new([
        forward(&field.components[0]),
        forward(&field.components[1]),
        forward(&field.components[2]),
    ])
}

/// Inverse transform of all three components.
pub fn inverse_vector(spec: &SpectralVector) -> Result<VectorField, FlowError> {
    Ok(VectorField::new([
        inverse(&spec.components[0])?,
        inverse(&spec.components[1])?,
        inverse(&spec.components[2])?,
    ]))
}

/// Relative Parseval error between a field and its spectrum.
pub fn parseval_error(field: &Field, spec: &Spectrum) -> f64 {
    let physical = field.sum_squares();
    let spectral = spec.weighted_sum_squares();
    let denom = physical.max(spectral);
    if denom == 0.0 {
        0.0
    } else {
        (physical - spectral).abs() / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_field(shape: [usize; 3], seed: u64) -> Field {
        let mut rng = StdRng::seed_from_u64(seed);
        Field::from_fn(shape, |_, _, _| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn test_roundtrip_noncubic() {
        let field = random_field([8, 4, 16], 1);
        let spec = forward(&field);
        let back = inverse(&spec).unwrap();
        let norm = field.max_abs();
        for (a, b) in field.data().iter().zip(back.data().iter()) {
            assert!(
                (a - b).abs() < 1e-10 * norm.max(1.0),
                "roundtrip mismatch: {} vs {}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_parseval() {
        let field = random_field([8, 8, 8], 2);
        let spec = forward(&field);
        assert!(
            parseval_error(&field, &spec) < 1e-12,
            "Parseval error {}",
            parseval_error(&field, &spec)
        );
    }

    #[test]
    fn test_single_cosine_mode() {
        // u(x) = cos(3 x₃) lands entirely in compacted bin (0, 0, 3)
        // with unitary amplitude √N / 2.
        let shape = [4, 4, 32];
        let n_total = (shape[0] * shape[1] * shape[2]) as f64;
        let field = Field::from_fn(shape, |_, _, k| {
            (2.0 * std::f64::consts::PI * 3.0 * k as f64 / shape[2] as f64).cos()
        });
        let spec = forward(&field);
        let m = spec.idx(0, 0, 3);
        assert!((spec.re(m) - n_total.sqrt() / 2.0).abs() < 1e-9);
        assert!(spec.im(m).abs() < 1e-9);
        // Everything else is rounding noise.
        for other in 0..spec.modes() {
            if other != m {
                assert!(spec.re(other).abs() < 1e-9 && spec.im(other).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_forward_output_is_hermitian() {
        let field = random_field([8, 8, 8], 3);
        let spec = forward(&field);
        assert!(spec.symmetry_mismatch() < 1e-12);
    }

    #[test]
    fn test_inverse_rejects_broken_symmetry() {
        let field = random_field([8, 8, 8], 4);
        let mut spec = forward(&field);
        // Corrupt one member of a conjugate pair on the k3 = 0 plane.
        let m = spec.idx(1, 2, 0);
        spec.set(m, 100.0, 50.0);
        match inverse(&spec) {
            Err(FlowError::SymmetryViolation { .. }) => {}
            other => panic!("expected SymmetryViolation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_dc_only_spectrum() {
        let shape = [4, 4, 4];
        let mut spec = Spectrum::zeros(shape);
        let dc = spec.idx(0, 0, 0);
        spec.set(dc, 8.0, 0.0); // √64 = 8 → constant field of 1.0
        let field = inverse(&spec).unwrap();
        for &x in field.data() {
            assert!((x - 1.0).abs() < 1e-12);
        }
    }
}
