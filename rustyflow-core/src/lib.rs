//! # RustyFlow Core
//!
//! Shared numerical storage for the rustyflow ecosystem.
//!
//! This crate provides:
//! - **Field**: real-valued periodic grid data, row-major, one instance
//!   per vector component.
//! - **Spectrum**: Hermitian-compacted complex coefficients stored as
//!   interleaved `(re, im)` pairs — the same layout `rustyflow-fft`
//!   operates on directly, zero conversion.
//! - **WavenumberGrid**: computed once per run, shared read-only by every
//!   spectral operator.
//! - **SplitMix64**: counter-based deterministic generator; equal seeds
//!   produce bit-identical streams regardless of evaluation order.
//! - **FlowError**: the one error type every fallible API in the
//!   workspace returns.

pub mod error;
pub mod field;
pub mod grid;
pub mod rng;
pub mod spectrum;

pub use error::FlowError;
pub use field::{Field, VectorField};
pub use grid::WavenumberGrid;
pub use rng::SplitMix64;
pub use spectrum::{SpectralVector, Spectrum};
