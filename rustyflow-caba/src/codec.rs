//! Pack / unpack for CABA containers.
//!
//! Mode A (exact) stores the Hermitian-compacted coefficients directly:
//! unpacking reconstructs the archived microstate bit-for-bit. Mode B
//! (statistical) stores only the power spectrum plus a phase seed:
//! unpacking redraws phases `φ ~ Uniform[0, 2π)` counter-based from
//! `SplitMix64(seed, mode index)` under Hermitian symmetry, producing a
//! statistically-equivalent field that is bit-identical across decodes
//! with the same seed but never equal to the original microstate.
//!
//! Both digests (payload checksum in the header, trailer over
//! header ‖ payload) are verified before ANY decoding: a corrupt
//! container yields `ChecksumMismatch` and no partial decode.

use crate::compress::{compress, decompress};
use crate::header::{Binning, CabaHeader, Compressor, Mode, HEADER_BYTES, TRAILER_BYTES};
use rustyflow_core::{FlowError, SplitMix64, Spectrum, WavenumberGrid};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Archival parameters for `pack`.
#[derive(Clone, Copy, Debug)]
pub struct PackParams {
    pub mode: Mode,
    pub compressor: Compressor,
    pub binning: Binning,
    /// Phase seed recorded in the header; ignored in Mode A.
    pub seed: u64,
}

impl Default for PackParams {
    fn default() -> Self {
        Self {
            mode: Mode::Exact,
            compressor: Compressor::None,
            binning: Binning::PerMode,
            seed: 0,
        }
    }
}

fn sha256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hasher.finalize().into()
}

fn f64s_to_le_bytes(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn le_bytes_to_f64s(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

/// Serialize a spectrum snapshot into a complete container
/// (header ‖ stored payload ‖ trailer digest).
pub fn pack(spec: &Spectrum, params: &PackParams) -> Result<Vec<u8>, FlowError> {
    let shape = spec.shape();
    let payload = match params.mode {
        Mode::Exact => f64s_to_le_bytes(spec.data()),
        Mode::Statistical => {
            let grid = WavenumberGrid::new(shape);
            match params.binning {
                Binning::PerMode => {
                    let power: Vec<f64> = (0..spec.modes())
                        .map(|m| spec.re(m) * spec.re(m) + spec.im(m) * spec.im(m))
                        .collect();
                    f64s_to_le_bytes(&power)
                }
                Binning::RadialShells => {
                    let mut bins = vec![0.0f64; grid.max_shell() as usize + 1];
                    for m in 0..spec.modes() {
                        let mag2 = spec.re(m) * spec.re(m) + spec.im(m) * spec.im(m);
                        bins[grid.shell(m) as usize] += grid.weight(m) * mag2;
                    }
                    let mut out = (bins.len() as u64).to_le_bytes().to_vec();
                    out.extend_from_slice(&f64s_to_le_bytes(&bins));
                    out
                }
            }
        }
    };

    let stored = compress(&payload, params.compressor)?;
    let header = CabaHeader {
        mode: params.mode,
        compressor: params.compressor,
        binning: params.binning,
        dims: [shape[0] as u32, shape[1] as u32, shape[2] as u32],
        dc_index: 0,
        nyquist_index: (shape[2] / 2) as u32,
        seed: match params.mode {
            Mode::Exact => 0,
            Mode::Statistical => params.seed,
        },
        payload_len: payload.len() as u64,
        stored_len: stored.len() as u64,
        parseval_energy: spec.weighted_sum_squares(),
        checksum: sha256_parts(&[&stored]),
    };

    let header_bytes = header.to_bytes();
    let trailer = sha256_parts(&[&header_bytes, &stored]);

    let mut container = Vec::with_capacity(HEADER_BYTES + stored.len() + TRAILER_BYTES);
    container.extend_from_slice(&header_bytes);
    container.extend_from_slice(&stored);
    container.extend_from_slice(&trailer);
    Ok(container)
}

/// Verify both digests and hand back the parsed header plus the
/// expanded payload. Nothing is decoded past a failed check.
pub fn split_verified(bytes: &[u8]) -> Result<(CabaHeader, Vec<u8>), FlowError> {
    if bytes.len() < HEADER_BYTES + TRAILER_BYTES {
        return Err(FlowError::Configuration(format!(
            "container truncated: {} bytes",
            bytes.len()
        )));
    }
    let body = &bytes[..bytes.len() - TRAILER_BYTES];
    let trailer = &bytes[bytes.len() - TRAILER_BYTES..];
    if sha256_parts(&[body])[..] != *trailer {
        return Err(FlowError::ChecksumMismatch {
            section: "trailer digest",
        });
    }

    let header = CabaHeader::from_bytes(&body[..HEADER_BYTES])?;
    let stored = &body[HEADER_BYTES..];
    if stored.len() as u64 != header.stored_len {
        return Err(FlowError::Configuration(format!(
            "stored payload is {} bytes, header says {}",
            stored.len(),
            header.stored_len
        )));
    }
    if sha256_parts(&[stored]) != header.checksum {
        return Err(FlowError::ChecksumMismatch {
            section: "payload checksum",
        });
    }
    let payload = decompress(stored, header.compressor, header.payload_len)?;
    Ok((header, payload))
}

fn shape_of(header: &CabaHeader) -> Result<[usize; 3], FlowError> {
    let shape = [
        header.dims[0] as usize,
        header.dims[1] as usize,
        header.dims[2] as usize,
    ];
    for &n in &shape {
        if n < 2 || !n.is_power_of_two() {
            return Err(FlowError::Configuration(format!(
                "container dims {:?} are not a power-of-two grid",
                header.dims
            )));
        }
    }
    Ok(shape)
}

pub(crate) fn decode_exact(header: &CabaHeader, payload: &[u8]) -> Result<Spectrum, FlowError> {
    let shape = shape_of(header)?;
    let expected = shape[0] * shape[1] * (shape[2] / 2 + 1) * 16;
    if payload.len() != expected {
        return Err(FlowError::Configuration(format!(
            "Mode A payload is {} bytes, expected {}",
            payload.len(),
            expected
        )));
    }
    Ok(Spectrum::from_data(shape, le_bytes_to_f64s(payload)))
}

/// Redraw a realization from a Mode B payload with an explicit seed.
///
/// Public so verification can decode an independent second realization
/// from the same container.
pub fn decode_statistical(
    header: &CabaHeader,
    payload: &[u8],
    seed: u64,
) -> Result<Spectrum, FlowError> {
    let shape = shape_of(header)?;
    let grid = WavenumberGrid::new(shape);
    let modes = grid.modes();

    // Per-mode squared amplitudes from the stored power.
    let amp2: Vec<f64> = match header.binning {
        Binning::PerMode => {
            if payload.len() != modes * 8 {
                return Err(FlowError::Configuration(format!(
                    "per-mode payload is {} bytes, expected {}",
                    payload.len(),
                    modes * 8
                )));
            }
            le_bytes_to_f64s(payload)
        }
        Binning::RadialShells => {
            if payload.len() < 8 {
                return Err(FlowError::Configuration("binned payload truncated".into()));
            }
            let nbins = u64::from_le_bytes(payload[..8].try_into().unwrap()) as usize;
            if nbins != grid.max_shell() as usize + 1 || payload.len() != 8 + nbins * 8 {
                return Err(FlowError::Configuration(format!(
                    "binned payload has {} bins for a grid with {} shells",
                    nbins,
                    grid.max_shell() + 1
                )));
            }
            let bins = le_bytes_to_f64s(&payload[8..]);
            (0..modes)
                .map(|m| {
                    let r = grid.shell(m) as usize;
                    bins[r] / grid.shell_weight_sum(grid.shell(m))
                })
                .collect()
        }
    };
    if let Some(bad) = amp2.iter().find(|&&p| !p.is_finite() || p < 0.0) {
        return Err(FlowError::Configuration(format!(
            "negative or non-finite power {} in Mode B payload",
            bad
        )));
    }

    let [_, n2, n3] = shape;
    let nk3 = n3 / 2 + 1;
    let nyquist = n3 / 2;
    let tau = 2.0 * std::f64::consts::PI;

    let mut spec = Spectrum::zeros(shape);
    for m in 0..modes {
        let amp = amp2[m].sqrt();
        let k1 = m / (n2 * nk3);
        let k2 = (m / nk3) % n2;
        let k3 = m % nk3;

        if k3 == 0 || k3 == nyquist {
            // Self-paired plane: the phase of a conjugate pair is drawn
            // once, from the canonical (lower-index) member.
            let (m1, m2) = spec.mirror(k1, k2);
            if (m1, m2) == (k1, k2) {
                // Self-conjugate mode: real, random sign.
                let sign = if SplitMix64::at(seed, m as u64).next_u64() & 1 == 0 {
                    1.0
                } else {
                    -1.0
                };
                spec.set(m, sign * amp, 0.0);
            } else if (k1, k2) < (m1, m2) {
                let phi = tau * SplitMix64::at(seed, m as u64).next_f64();
                spec.set(m, amp * phi.cos(), amp * phi.sin());
            } else {
                let canonical = spec.idx(m1, m2, k3);
                let phi = tau * SplitMix64::at(seed, canonical as u64).next_f64();
                spec.set(m, amp * phi.cos(), -amp * phi.sin());
            }
        } else {
            let phi = tau * SplitMix64::at(seed, m as u64).next_f64();
            spec.set(m, amp * phi.cos(), amp * phi.sin());
        }
    }
    Ok(spec)
}

/// Decode a container back into a spectrum snapshot.
pub fn unpack(bytes: &[u8]) -> Result<(CabaHeader, Spectrum), FlowError> {
    let (header, payload) = split_verified(bytes)?;
    let spec = match header.mode {
        Mode::Exact => decode_exact(&header, &payload)?,
        Mode::Statistical => decode_statistical(&header, &payload, header.seed)?,
    };
    Ok((header, spec))
}

/// Write a container, replace-on-write. The bytes land in a sibling
/// temp file first and are renamed into place, so a failed write never
/// leaves a silently truncated container at `path`.
pub fn write_file(path: &Path, container: &[u8]) -> Result<(), FlowError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    std::fs::write(&tmp, container)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, FlowError> {
    Ok(std::fs::read(path)?)
}
