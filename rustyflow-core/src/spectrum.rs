//! Hermitian-compacted spectral coefficients.
//!
//! Complex numbers are stored as interleaved `(re, im)` pairs, the same
//! layout the transform engine's butterfly loops operate on. A real
//! field of shape `(n1, n2, n3)` compacts to `n1 × n2 × (n3/2 + 1)`
//! complex coefficients along the last axis; the discarded half is the
//! conjugate mirror. The `k3 = 0` and `k3 = n3/2` planes pair with
//! themselves under `(k1, k2) → (−k1, −k2)` and carry Hermitian
//! multiplicity weight 1 in spectral sums; interior planes represent a
//! discarded conjugate as well and carry weight 2.

/// Hermitian-compacted spectrum of one real scalar field.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    /// Shape of the physical field this spectrum compacts.
    shape: [usize; 3],
    /// Interleaved `(re, im)`, length `n1 * n2 * (n3/2 + 1) * 2`.
    data: Vec<f64>,
}

impl Spectrum {
    pub fn zeros(shape: [usize; 3]) -> Self {
        for &n in &shape {
            assert!(
                n.is_power_of_two(),
                "grid dimension must be a power of two, got {}",
                n
            );
        }
        let nk3 = shape[2] / 2 + 1;
        Self {
            shape,
            data: vec![0.0; shape[0] * shape[1] * nk3 * 2],
        }
    }

    pub fn from_data(shape: [usize; 3], data: Vec<f64>) -> Self {
        let nk3 = shape[2] / 2 + 1;
        assert_eq!(data.len(), shape[0] * shape[1] * nk3 * 2);
        Self { shape, data }
    }

    /// Shape of the physical field, not of the compacted array.
    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Compacted length of the last axis: `n3/2 + 1`.
    #[inline]
    pub fn nk3(&self) -> usize {
        self.shape[2] / 2 + 1
    }

    /// Number of stored complex coefficients.
    #[inline]
    pub fn modes(&self) -> usize {
        self.shape[0] * self.shape[1] * self.nk3()
    }

    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Linear mode index of `(k1, k2, k3)` in the compacted array.
    #[inline]
    pub fn idx(&self, k1: usize, k2: usize, k3: usize) -> usize {
        (k1 * self.shape[1] + k2) * self.nk3() + k3
    }

    #[inline]
    pub fn re(&self, m: usize) -> f64 {
        self.data[2 * m]
    }

    #[inline]
    pub fn im(&self, m: usize) -> f64 {
        self.data[2 * m + 1]
    }

    #[inline]
    pub fn set(&mut self, m: usize, re: f64, im: f64) {
        self.data[2 * m] = re;
        self.data[2 * m + 1] = im;
    }

    /// Hermitian multiplicity of the stored plane `k3`.
    #[inline]
    pub fn plane_weight(&self, k3: usize) -> f64 {
        if k3 == 0 || k3 == self.shape[2] / 2 {
            1.0
        } else {
            2.0
        }
    }

    /// `Σ_k w(k) |U(k)|²` — the spectral side of the Parseval check,
    /// with the discarded conjugate half counted via plane weights.
    pub fn weighted_sum_squares(&self) -> f64 {
        let nk3 = self.nk3();
        let mut total = 0.0;
        for m in 0..self.modes() {
            let w = self.plane_weight(m % nk3);
            total += w * (self.re(m) * self.re(m) + self.im(m) * self.im(m));
        }
        total
    }

    pub fn scale(&mut self, c: f64) {
        for x in &mut self.data {
            *x *= c;
        }
    }

    /// `self += c * other`.
    pub fn add_scaled(&mut self, other: &Spectrum, c: f64) {
        assert_eq!(self.shape, other.shape);
        for (x, &y) in self.data.iter_mut().zip(other.data.iter()) {
            *x += c * y;
        }
    }

    /// Mirror of `(k1, k2)` under `k → −k` on a self-paired plane.
    #[inline]
    pub fn mirror(&self, k1: usize, k2: usize) -> (usize, usize) {
        (
            (self.shape[0] - k1) % self.shape[0],
            (self.shape[1] - k2) % self.shape[1],
        )
    }

    /// Enforce Hermitian symmetry on the self-paired planes.
    ///
    /// On `k3 ∈ {0, n3/2}` each coefficient must equal the conjugate of
    /// its `(−k1, −k2)` mirror; self-conjugate modes must be real. Pairs
    /// are replaced by their Hermitian average. Interior planes carry no
    /// constraint (their mirror lives in the discarded half).
    pub fn symmetrize(&mut self) {
        let [n1, n2, n3] = self.shape;
        let nyquist = n3 / 2;
        let planes: &[usize] = if nyquist == 0 { &[0] } else { &[0, nyquist] };
        for &k3 in planes {
            for k1 in 0..n1 {
                for k2 in 0..n2 {
                    let (m1, m2) = self.mirror(k1, k2);
                    if (k1, k2) == (m1, m2) {
                        let m = self.idx(k1, k2, k3);
                        self.data[2 * m + 1] = 0.0;
                    } else if (k1, k2) < (m1, m2) {
                        let a = self.idx(k1, k2, k3);
                        let b = self.idx(m1, m2, k3);
                        let re = 0.5 * (self.data[2 * a] + self.data[2 * b]);
                        let im = 0.5 * (self.data[2 * a + 1] - self.data[2 * b + 1]);
                        self.set(a, re, im);
                        self.set(b, re, -im);
                    }
                }
            }
        }
    }

    /// Largest deviation from Hermitian symmetry on the self-paired
    /// planes. Zero for any spectrum produced by a forward transform of
    /// real data.
    pub fn symmetry_mismatch(&self) -> f64 {
        let [n1, n2, n3] = self.shape;
        let nyquist = n3 / 2;
        let planes: &[usize] = if nyquist == 0 { &[0] } else { &[0, nyquist] };
        let mut worst = 0.0f64;
        for &k3 in planes {
            for k1 in 0..n1 {
                for k2 in 0..n2 {
                    let (m1, m2) = self.mirror(k1, k2);
                    let a = self.idx(k1, k2, k3);
                    let b = self.idx(m1, m2, k3);
                    let d_re = (self.re(a) - self.re(b)).abs();
                    let d_im = (self.im(a) + self.im(b)).abs();
                    worst = worst.max(d_re).max(d_im);
                }
            }
        }
        worst
    }
}

/// Three spectral components sharing one grid shape.
#[derive(Clone, Debug)]
pub struct SpectralVector {
    pub components: [Spectrum; 3],
}

impl SpectralVector {
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            components: [
                Spectrum::zeros(shape),
                Spectrum::zeros(shape),
                Spectrum::zeros(shape),
            ],
        }
    }

    pub fn new(components: [Spectrum; 3]) -> Self {
        let shape = components[0].shape();
        assert_eq!(components[1].shape(), shape);
        assert_eq!(components[2].shape(), shape);
        Self { components }
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.components[0].shape()
    }

    pub fn weighted_sum_squares(&self) -> f64 {
        self.components
            .iter()
            .map(Spectrum::weighted_sum_squares)
            .sum()
    }

    pub fn scale(&mut self, c: f64) {
        for comp in &mut self.components {
            comp.scale(c);
        }
    }

    pub fn add_scaled(&mut self, other: &SpectralVector, c: f64) {
        for (a, b) in self.components.iter_mut().zip(other.components.iter()) {
            a.add_scaled(b, c);
        }
    }

    pub fn symmetrize(&mut self) {
        for comp in &mut self.components {
            comp.symmetrize();
        }
    }
}
