//! # RustyFlow Solver
//!
//! Pseudospectral solver for the 3D incompressible Navier-Stokes
//! equations on the periodic box `[0, 2π)³`.
//!
//! The run pipeline: `RunConfig` resolves once into a `Pipeline` of
//! strongly-typed operator stages (advective, viscous, optional
//! forcing/descent/mask) plus a `WavenumberGrid`; the RK4 `Integrator`
//! drives the pipeline, re-projecting and checking invariants after
//! every substage; `diagnostics` observes each substage and summarizes
//! snapshots. Archival of snapshots is `rustyflow-caba`'s job.

pub mod config;
pub mod diagnostics;
pub mod initial;
pub mod integrator;
pub mod operators;

pub use config::{
    DescentConfig, ForcingConfig, InitialKind, MaskConfig, RunConfig, SnapshotBinning,
    SnapshotMode,
};
pub use diagnostics::{
    digest_line_exact, digest_line_statistical, energy_budget, kinetic_energy, shell_spectrum,
    DiagnosticRecord, EnergyBudget,
};
pub use integrator::{Integrator, RunState, Thresholds};
pub use operators::{AdvectionStats, MaskFilter, MaskScheme, Pipeline, Stage};
