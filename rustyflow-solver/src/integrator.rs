//! RK4 time integrator with per-substage invariant checks.
//!
//! State machine: `Idle → Stepping → {Stable, Diverged}`. Each step
//! runs 4 classic Runge-Kutta substages; after each substage the
//! integrator re-applies projection, appends a `DiagnosticRecord`, and
//! checks the invariants in a fixed cascade — divergence norm, Parseval
//! error, energy finiteness, CFL ratio — aborting on the FIRST breach
//! with the failing substage index. Invariant breaches are correctness
//! failures: there is no retry path, and cancellation only happens at
//! substage boundaries.
//!
//! The integrator never raises `dt`. It lowers it only when
//! `adaptive_dt` was explicitly configured, and even then only between
//! steps.

use crate::diagnostics::{kinetic_energy, unix_time_secs, DiagnosticRecord};
use crate::operators::projection::{divergence_norm, project};
use crate::operators::Pipeline;
use log::{debug, info, warn};
use rustyflow_core::{FlowError, SpectralVector, WavenumberGrid};

/// Lifecycle of one simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Stepping,
    Stable,
    Diverged,
}

/// Fixed invariant thresholds checked after every substage.
#[derive(Clone, Copy, Debug)]
pub struct Thresholds {
    /// Divergence norm, relative to the velocity norm (floor 1).
    pub divergence: f64,
    /// Relative Parseval error.
    pub parseval: f64,
    /// `dt / dt_cfl` ceiling; 2.8 is the RK4 advective stability bound.
    pub cfl_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            divergence: 1e-12,
            parseval: 1e-12,
            cfl_max: 2.8,
        }
    }
}

/// RK4 substage offsets for the classic tableau.
const RK4_OFFSETS: [f64; 4] = [0.0, 0.5, 0.5, 1.0];

pub struct Integrator {
    grid: WavenumberGrid,
    pipeline: Pipeline,
    u: SpectralVector,
    dt: f64,
    state: RunState,
    step_index: usize,
    records: Vec<DiagnosticRecord>,
    thresholds: Thresholds,
    adaptive_dt: bool,
}

impl Integrator {
    /// Bind a run. The initial state is projected once so the first
    /// substage starts solenoidal.
    pub fn new(
        grid: WavenumberGrid,
        pipeline: Pipeline,
        mut initial: SpectralVector,
        dt: f64,
        thresholds: Thresholds,
        adaptive_dt: bool,
    ) -> Self {
        project(&mut initial, &grid);
        Self {
            grid,
            pipeline,
            u: initial,
            dt,
            state: RunState::Idle,
            step_index: 0,
            records: Vec::new(),
            thresholds,
            adaptive_dt,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn spectrum(&self) -> &SpectralVector {
        &self.u
    }

    pub fn grid(&self) -> &WavenumberGrid {
        &self.grid
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// The append-only diagnostic stream, 4 records per completed
    /// substage set.
    pub fn records(&self) -> &[DiagnosticRecord] {
        &self.records
    }

    /// Advance `steps` steps and finish the run.
    ///
    /// On success the run terminates in `Stable`; the first invariant
    /// breach terminates it in `Diverged` and surfaces the error.
    pub fn run(&mut self, steps: usize) -> Result<RunState, FlowError> {
        for _ in 0..steps {
            self.step()?;
        }
        self.state = RunState::Stable;
        info!(
            "run complete: {} steps, E = {:.6e}",
            self.step_index,
            kinetic_energy(&self.u)
        );
        Ok(self.state)
    }

    /// Mark a manually-stepped run complete. No-op error on a run that
    /// already diverged.
    pub fn finish(&mut self) -> Result<RunState, FlowError> {
        match self.state {
            RunState::Diverged => Err(FlowError::Configuration(
                "cannot finish a diverged run".into(),
            )),
            _ => {
                self.state = RunState::Stable;
                Ok(self.state)
            }
        }
    }

    /// One RK4 step: 4 substages, each projected, recorded, checked.
    pub fn step(&mut self) -> Result<(), FlowError> {
        match self.state {
            RunState::Idle | RunState::Stepping => {}
            terminal => {
                return Err(FlowError::Configuration(format!(
                    "cannot step a run in terminal state {:?}",
                    terminal
                )))
            }
        }
        self.state = RunState::Stepping;

        let u0 = self.u.clone();
        let mut slopes: Vec<SpectralVector> = Vec::with_capacity(4);
        let mut last_cfl = 0.0;

        for substage in 0..4 {
            let mut stage_state = u0.clone();
            if substage > 0 {
                stage_state.add_scaled(&slopes[substage - 1], RK4_OFFSETS[substage] * self.dt);
            }
            // 1. Re-apply projection.
            project(&mut stage_state, &self.grid);

            // Evaluate the right-hand side; stats feed the record.
            let eval = self.pipeline.rhs(&stage_state, &self.grid)?;

            // 2. Diagnostic record for this substage.
            let div = divergence_norm(&stage_state, &self.grid);
            let energy = kinetic_energy(&stage_state);
            let cfl_ratio = self.dt * eval.stats.u_max / self.grid.dx_min();
            let record = DiagnosticRecord {
                step: self.step_index,
                substage,
                divergence_norm: div,
                parseval_error: eval.stats.parseval_error,
                kinetic_energy: energy,
                cfl_ratio,
                timestamp: unix_time_secs(),
            };
            self.records.push(record);
            last_cfl = cfl_ratio;

            // 3./4. Threshold cascade: abort on the first breach.
            self.check_substage(&record)?;

            slopes.push(eval.rhs);
        }

        // Combine: u += dt/6 (k1 + 2k2 + 2k3 + k4), then keep the new
        // state solenoidal.
        let sixth = self.dt / 6.0;
        self.u.add_scaled(&slopes[0], sixth);
        self.u.add_scaled(&slopes[1], 2.0 * sixth);
        self.u.add_scaled(&slopes[2], 2.0 * sixth);
        self.u.add_scaled(&slopes[3], sixth);
        project(&mut self.u, &self.grid);

        self.step_index += 1;
        debug!(
            "step {} done: E = {:.6e}, cfl = {:.3e}",
            self.step_index,
            kinetic_energy(&self.u),
            last_cfl
        );

        if self.adaptive_dt && last_cfl > 0.5 * self.thresholds.cfl_max {
            self.dt *= 0.5;
            warn!(
                "CFL ratio {:.3} approaching limit; halving dt to {:.3e}",
                last_cfl, self.dt
            );
        }
        Ok(())
    }

    fn check_substage(&mut self, r: &DiagnosticRecord) -> Result<(), FlowError> {
        let div_threshold = self.thresholds.divergence * r.kinetic_energy.sqrt().max(1.0);
        if r.divergence_norm > div_threshold {
            return self.diverge(r, "divergence_norm", r.divergence_norm, div_threshold);
        }
        if r.parseval_error > self.thresholds.parseval {
            return self.diverge(r, "parseval_error", r.parseval_error, self.thresholds.parseval);
        }
        if !r.kinetic_energy.is_finite() {
            return self.diverge(r, "kinetic_energy", r.kinetic_energy, f64::MAX);
        }
        if r.cfl_ratio > self.thresholds.cfl_max {
            return self.diverge(r, "cfl_ratio", r.cfl_ratio, self.thresholds.cfl_max);
        }
        Ok(())
    }

    fn diverge(
        &mut self,
        r: &DiagnosticRecord,
        metric: &'static str,
        value: f64,
        threshold: f64,
    ) -> Result<(), FlowError> {
        self.state = RunState::Diverged;
        Err(FlowError::SolverDivergence {
            step: r.step,
            substage: r.substage,
            metric,
            value,
            threshold,
        })
    }
}
