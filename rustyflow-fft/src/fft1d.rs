//! Radix-2 Cooley-Tukey FFT on interleaved complex f64 data.
//!
//! Scalar butterfly stages, decimation-in-time, in-place. Complex
//! numbers are stored as interleaved (re, im, re, im, ...). The 3D
//! driver in `transform` feeds contiguous lines through these routines
//! and handles normalization; `fft` here is the plain unnormalized sum
//! and `ifft` carries the conventional 1/n.

/// In-place radix-2 FFT on interleaved complex f64 data.
///
/// `data` has length `2 * n` where `n` is the FFT size (must be a power
/// of 2). Elements are stored as [re0, im0, re1, im1, ...].
///
/// # Panics
/// Panics if n is not a power of 2.
pub fn fft(data: &mut [f64], n: usize) {
    assert!(n.is_power_of_two(), "FFT size must be a power of 2");
    assert_eq!(data.len(), 2 * n);

    // Bit-reversal permutation
    bit_reverse_permute(data, n);

    // Butterfly stages
    let mut stage_len = 2;
    while stage_len <= n {
        let half = stage_len / 2;
        let angle = -2.0 * std::f64::consts::PI / stage_len as f64;

        for k in (0..n).step_by(stage_len) {
            for j in 0..half {
                let theta = angle * j as f64;
                let wr = theta.cos();
                let wi = theta.sin();

                let even_re = data[2 * (k + j)];
                let even_im = data[2 * (k + j) + 1];
                let odd_re = data[2 * (k + j + half)];
                let odd_im = data[2 * (k + j + half) + 1];

                // Butterfly: twiddle multiply
                let tr = wr * odd_re - wi * odd_im;
                let ti = wr * odd_im + wi * odd_re;

                data[2 * (k + j)] = even_re + tr;
                data[2 * (k + j) + 1] = even_im + ti;
                data[2 * (k + j + half)] = even_re - tr;
                data[2 * (k + j + half) + 1] = even_im - ti;
            }
        }
        stage_len *= 2;
    }
}

/// In-place inverse FFT on interleaved complex f64 data.
///
/// Conjugates, applies forward FFT, conjugates again, and scales by 1/n.
pub fn ifft(data: &mut [f64], n: usize) {
    // Conjugate
    for i in 0..n {
        data[2 * i + 1] = -data[2 * i + 1];
    }

    fft(data, n);

    // Conjugate and scale by 1/n
    let scale = 1.0 / n as f64;
    for i in 0..n {
        data[2 * i] *= scale;
        data[2 * i + 1] *= -scale;
    }
}

// ============================================================================
// Bit-reversal permutation
// ============================================================================

fn bit_reverse_permute(data: &mut [f64], n: usize) {
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = bit_reverse(i as u32, bits) as usize;
        if i < j {
            data.swap(2 * i, 2 * j);
            data.swap(2 * i + 1, 2 * j + 1);
        }
    }
}

#[inline(always)]
fn bit_reverse(mut x: u32, bits: u32) -> u32 {
    let mut result = 0u32;
    for _ in 0..bits {
        result = (result << 1) | (x & 1);
        x >>= 1;
    }
    result
}
