//! Sweep engine and probe integration against the physical solver.

use surfpot_compute::{CpuBackend, SerialBackend};
use surfpot_core::afm::{ProbeGeometry, ProbeSettings};
use surfpot_core::bulk::BulkState;
use surfpot_core::solver::roots::RootSettings;
use surfpot_core::solver::{ElectrostaticSolver, SolverError, SurfacePotentialSolver};
use surfpot_core::sweep::{default_bias_axis, default_thickness_axis, SweepEngine, SweepKind};
use surfpot_core::types::{DeviceGeometry, MaterialParameters, OperatingPoint};

fn solver() -> SurfacePotentialSolver {
    let material = MaterialParameters::new(0.8, 7.5, 1.0, 1.0, 4.9e23, 0.0, 300.0).unwrap();
    let geometry = DeviceGeometry::new(9.0e-9, 4.10, 3.72).unwrap();
    let bulk = BulkState::compute(&material, &geometry, &RootSettings::default()).unwrap();
    SurfacePotentialSolver::new(bulk)
}

fn probe() -> ProbeSettings {
    ProbeSettings {
        timesteps: 30,
        amplitude: 6e-9,
        resonance_frequency: 330e3,
        spring_constant: 42.0,
        quality_factor: 18_000.0,
        time_lag: 0.0,
        tip_radius: 5e-9,
        cantilever_height: 6e-6,
        cantilever_area: 2.9e-9,
        geometry: ProbeGeometry::TipAndCantilever,
    }
}

/// Wraps the physical solver and fails inside a bias window.
struct Blackout {
    inner: SurfacePotentialSolver,
    window: (f64, f64),
}

impl ElectrostaticSolver for Blackout {
    fn solve(&self, bias: f64, thickness: f64) -> Result<OperatingPoint, SolverError> {
        if bias > self.window.0 && bias < self.window.1 {
            return Err(SolverError::NonConvergence {
                max_iter: 0,
                residual: f64::NAN,
            });
        }
        self.inner.solve(bias, thickness)
    }

    fn method_name(&self) -> &str {
        "blackout"
    }
}

#[test]
fn test_bias_sweep_matches_scalar_solves() {
    let engine = SweepEngine::new(solver(), CpuBackend::new());
    let axis = default_bias_axis();
    let result = engine.bias_sweep(axis.as_slice().unwrap(), 9e-9);
    assert_eq!(result.kind, SweepKind::Bias);
    assert_eq!(result.failures(), 0);
    for (i, &bias) in axis.iter().enumerate() {
        let scalar = engine.solver().solve(bias, 9e-9).unwrap();
        assert_eq!(result.points[i].as_ref().unwrap(), &scalar);
    }
}

#[test]
fn test_parallel_and_serial_backends_agree() {
    let axis = default_thickness_axis();
    let parallel = SweepEngine::new(solver(), CpuBackend::with_threads(4).unwrap())
        .thickness_sweep(-1.33, axis.as_slice().unwrap());
    let serial =
        SweepEngine::new(solver(), SerialBackend).thickness_sweep(-1.33, axis.as_slice().unwrap());
    assert_eq!(parallel, serial);
}

#[test]
fn test_partial_failure_keeps_alignment() {
    let engine = SweepEngine::new(
        Blackout {
            inner: solver(),
            window: (-0.55, -0.25),
        },
        SerialBackend,
    );
    let axis: Vec<f64> = (0..20).map(|i| -1.0 + 0.1 * i as f64).collect();
    let result = engine.bias_sweep(&axis, 9e-9);
    assert_eq!(result.len(), axis.len());
    assert_eq!(result.failures(), 3);

    let vs = result.surface_potential();
    let capacitance = result.differential_capacitance();
    for (i, point) in result.points.iter().enumerate() {
        match point {
            Ok(p) => {
                assert_eq!(p.bias, axis[i]);
                assert!(capacitance[i] < 0.0);
            }
            Err(_) => {
                assert!(vs[i].is_nan());
                assert!(capacitance[i].is_nan());
            }
        }
    }
}

#[test]
fn test_capacitance_is_central_charge_slope() {
    let engine = SweepEngine::new(solver(), SerialBackend);
    let result = engine.bias_sweep(&[-1.0, -0.5, 0.0, 0.5, 1.0], 9e-9);
    let q = result.charge();
    let vs = result.surface_potential();
    let c = result.differential_capacitance();
    let central = (q[3] - q[1]) / (vs[3] - vs[1]);
    assert!(central < 0.0);
    assert!(c[2] < 0.0);
    // Non-uniform stencil, so only the sign and magnitude class match.
    assert!((c[2] / central - 1.0).abs() < 0.5, "c={} central={}", c[2], central);
}

#[test]
fn test_trajectory_sweep_is_symmetric() {
    let engine = SweepEngine::new(solver(), SerialBackend);
    let trajectory = [3e-9, 2e-9, 1e-9, 2e-9, 3e-9];
    let result = engine.trajectory_sweep(-1.0, &trajectory);
    let force = result.force();
    assert_eq!(force[0], force[4]);
    assert_eq!(force[1], force[3]);
    assert!(force[2] < force[1]);
}

#[test]
fn test_probe_without_lag_is_conservative() {
    let engine = SweepEngine::new(solver(), CpuBackend::new());
    let sweep = engine.afm_bias_sweep(&[-2.0, -1.0, 1.0, 2.0], 2e-9, &probe());
    for result in &sweep.results {
        let r = result.as_ref().unwrap();
        assert!(r.frequency_shift < 0.0, "bias {}: df={}", r.bias, r.frequency_shift);
        let scale = r.force.abs() * probe().amplitude;
        assert!(r.dissipated_energy.abs() < 1e-9 * scale);
        assert!(r.damping_shift.abs() < 1e-9 * r.force.abs());
        assert!(r.cantilever_force.unwrap() <= 0.0);
    }
}

#[test]
fn test_probe_set_point_sweep() {
    let engine = SweepEngine::new(solver(), SerialBackend);
    let lagged = ProbeSettings {
        time_lag: 100e-9,
        geometry: ProbeGeometry::Tip,
        ..probe()
    };
    let sweep = engine.afm_thickness_sweep(-2.0, &[1e-9, 2e-9, 4e-9], &lagged);
    let shift = sweep.column(|r| r.frequency_shift);
    // A closer tip feels a stronger attraction.
    assert!(shift[0] < shift[1] && shift[1] < shift[2]);
    assert!(sweep.column(|r| r.dissipated_energy).iter().all(|e| e.is_finite()));
}
