//! Workspace-wide error type.
//!
//! Numerical invariant breaches are correctness failures, not transient
//! conditions: nothing here is retried, and every variant carries enough
//! context (substage index, offending metric, threshold) to reproduce
//! the failure from the run configuration.

use thiserror::Error;

/// Every fallible rustyflow API returns this.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Projection residual too large — fatal for the current run.
    #[error("divergence residual {norm:.3e} exceeds threshold {threshold:.3e}")]
    DivergenceExceeded { norm: f64, threshold: f64 },

    /// Invariant breach during stepping (CFL, Parseval, or divergence).
    #[error(
        "solver diverged at step {step}, substage {substage}: \
         {metric} = {value:.3e} (threshold {threshold:.3e})"
    )]
    SolverDivergence {
        step: usize,
        substage: usize,
        metric: &'static str,
        value: f64,
        threshold: f64,
    },

    /// Hermitian mismatch in spectral data — corrupted input or a
    /// transform bug upstream.
    #[error("Hermitian symmetry violated: {detail} (max mismatch {mismatch:.3e})")]
    SymmetryViolation { detail: &'static str, mismatch: f64 },

    /// CABA container corrupted on read. No partial decode is attempted.
    #[error("checksum mismatch in {section}: container is corrupt")]
    ChecksumMismatch { section: &'static str },

    /// Unrecognized or contradictory run parameters. Never silently
    /// defaulted.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Container written by a newer (or unknown) format revision.
    #[error("unsupported CABA version {major}.{minor} (reader supports 0.1)")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Compressor id reserved in the header but not implemented here.
    #[error("unsupported compressor id {0}")]
    UnsupportedCompressor(u8),

    #[error("container I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
