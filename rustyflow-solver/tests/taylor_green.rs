//! End-to-end solver scenarios on the Taylor-Green vortex.

use rustyflow_core::FlowError;
use rustyflow_solver::{kinetic_energy, RunConfig, RunState};

fn tg_config(dt: f64, steps: usize) -> RunConfig {
    RunConfig::from_json(&format!(
        r#"{{
            "grid": [16, 16, 16],
            "viscosity": 0.01,
            "dt": {},
            "steps": {},
            "seed": 42
        }}"#,
        dt, steps
    ))
    .unwrap()
}

#[test]
fn taylor_green_decays_and_terminates_stable() {
    let cfg = tg_config(1e-3, 100);
    let mut integ = cfg.build().unwrap();
    let e0 = kinetic_energy(integ.spectrum());

    let mut energies = vec![e0];
    for _ in 0..cfg.steps {
        integ.step().unwrap();
        energies.push(kinetic_energy(integ.spectrum()));
    }
    assert_eq!(integ.finish().unwrap(), RunState::Stable);

    // Monotone decay, step over step.
    for pair in energies.windows(2) {
        assert!(
            pair[1] < pair[0],
            "energy must decay monotonically: {} → {}",
            pair[0],
            pair[1]
        );
    }

    // The initial condition lives on |k|² = 3, so early decay follows
    // E(t) ≈ E(0)·exp(−2ν·3·t) with only a small nonlinear correction.
    let t = cfg.dt * cfg.steps as f64;
    let expected = e0 * (-6.0 * cfg.viscosity * t).exp();
    let rel = ((energies[cfg.steps] - expected) / e0).abs();
    assert!(
        rel < 1e-3,
        "energy {} deviates from Stokes decay {} by {:.2e}",
        energies[cfg.steps],
        expected,
        rel
    );

    // Every substage stayed solenoidal and Parseval-tight.
    assert_eq!(integ.records().len(), 4 * cfg.steps);
    for r in integ.records() {
        assert!(r.divergence_norm < 1e-10, "divergence {}", r.divergence_norm);
        assert!(r.parseval_error < 1e-12, "parseval {}", r.parseval_error);
        assert!(r.cfl_ratio < 0.1);
    }
}

#[test]
fn oversized_dt_terminates_diverged() {
    // 10× the CFL-stable step: the run must abort with the triggering
    // substage rather than march on with garbage.
    let dx = 2.0 * std::f64::consts::PI / 16.0;
    let cfg = tg_config(10.0 * 2.8 * dx, 100);
    let mut integ = cfg.build().unwrap();
    let err = integ.run(cfg.steps).unwrap_err();
    match err {
        FlowError::SolverDivergence {
            step,
            substage,
            metric,
            ..
        } => {
            assert_eq!(step, 0);
            assert_eq!(substage, 0);
            assert_eq!(metric, "cfl_ratio");
        }
        other => panic!("expected SolverDivergence, got {}", other),
    }
    assert_eq!(integ.state(), RunState::Diverged);
}

#[test]
fn masked_and_descent_run_stays_stable() {
    let cfg = RunConfig::from_json(
        r#"{
            "grid": [16, 16, 16],
            "viscosity": 0.01,
            "dt": 0.001,
            "steps": 10,
            "seed": 7,
            "mask": { "scheme": "von_mangoldt", "alpha": 0.1 },
            "descent": { "eta": 0.05, "alpha": 0.1 }
        }"#,
    )
    .unwrap();
    let mut integ = cfg.build().unwrap();
    assert_eq!(integ.run(cfg.steps).unwrap(), RunState::Stable);
    for r in integ.records() {
        assert!(r.divergence_norm < 1e-10);
    }
}

#[test]
fn forced_run_injects_energy() {
    // Strong forcing at |k| ≈ 2 against a unit-energy random start:
    // the flow the forcing itself builds up dominates within t = 0.1
    // and total energy must rise.
    let cfg = RunConfig::from_json(
        r#"{
            "grid": [16, 16, 16],
            "viscosity": 0.001,
            "dt": 0.001,
            "steps": 100,
            "seed": 11,
            "initial": "random",
            "forcing": { "k_f": 2.0, "amplitude": 20.0 }
        }"#,
    )
    .unwrap();
    let mut integ = cfg.build().unwrap();
    let e0 = kinetic_energy(integ.spectrum());
    integ.run(cfg.steps).unwrap();
    let e1 = kinetic_energy(integ.spectrum());
    assert!(
        e1 > e0,
        "forced run should gain energy: {} → {}",
        e0,
        e1
    );
}

#[test]
fn identical_seeds_reproduce_bit_identical_runs() {
    let cfg = RunConfig::from_json(
        r#"{
            "grid": [8, 8, 8],
            "viscosity": 0.01,
            "dt": 0.001,
            "steps": 5,
            "seed": 31,
            "initial": "random",
            "forcing": { "k_f": 2.0, "amplitude": 0.5 }
        }"#,
    )
    .unwrap();
    let mut a = cfg.build().unwrap();
    let mut b = cfg.build().unwrap();
    a.run(cfg.steps).unwrap();
    b.run(cfg.steps).unwrap();
    for (ca, cb) in a
        .spectrum()
        .components
        .iter()
        .zip(b.spectrum().components.iter())
    {
        assert_eq!(ca.data(), cb.data(), "equal seeds must be bit-reproducible");
    }
}
