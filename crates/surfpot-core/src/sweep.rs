//! Array sweeps over bias, insulator thickness or a tip trajectory.
//!
//! Every element of a sweep is an independent solve against the same cached
//! bulk state, so the work is handed to a [`ComputeBackend`] as an
//! order-preserving parallel map. A failed element stays in place as an
//! `Err` and shows up as `NaN` in exported columns; it never aborts the
//! rest of the sweep.

use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};
use surfpot_compute::ComputeBackend;

use crate::constants::nm_to_m;
use crate::derived::differential_capacitance;
use crate::solver::{ElectrostaticSolver, SolverError};
use crate::types::OperatingPoint;

/// Which parameter varies along a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepKind {
    /// Gate bias varies (V); thickness is held fixed.
    Bias,
    /// Insulator thickness varies (m); bias is held fixed.
    Thickness,
    /// Thickness follows a tip trajectory in time (m); bias is held fixed.
    Trajectory,
}

/// Index-aligned results of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub kind: SweepKind,
    /// The parameter held constant (thickness in m, or bias in V).
    pub fixed: f64,
    /// Axis values, one per point.
    pub values: Array1<f64>,
    pub points: Vec<Result<OperatingPoint, SolverError>>,
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.points.iter().filter(|p| p.is_err()).count()
    }

    /// Extract one quantity as a column; failed points become `NaN`.
    pub fn column(&self, quantity: impl Fn(&OperatingPoint) -> f64) -> Array1<f64> {
        self.points
            .iter()
            .map(|p| p.as_ref().map_or(f64::NAN, &quantity))
            .collect()
    }

    pub fn surface_potential(&self) -> Array1<f64> {
        self.column(|p| p.surface_potential)
    }

    pub fn force(&self) -> Array1<f64> {
        self.column(|p| p.force)
    }

    pub fn charge(&self) -> Array1<f64> {
        self.column(|p| p.charge)
    }

    /// Differential capacitance $dQ_s/dV_s$ (F/m²) evaluated separately on
    /// each contiguous run of successful points. Failed points, and runs of
    /// a single point, are `NaN`.
    pub fn differential_capacitance(&self) -> Array1<f64> {
        let charge = self.charge();
        let potential = self.surface_potential();
        let mut out = Array1::from_elem(self.len(), f64::NAN);

        let mut start = 0;
        while start < self.len() {
            if self.points[start].is_err() {
                start += 1;
                continue;
            }
            let end = (start..self.len())
                .find(|&i| self.points[i].is_err())
                .unwrap_or(self.len());
            if let Ok(c) = differential_capacitance(
                charge.slice(s![start..end]),
                potential.slice(s![start..end]),
            ) {
                out.slice_mut(s![start..end]).assign(&c);
            }
            start = end;
        }
        out
    }
}

/// Runs sweeps of an [`ElectrostaticSolver`] on a [`ComputeBackend`].
#[derive(Debug)]
pub struct SweepEngine<S, B> {
    solver: S,
    backend: B,
}

impl<S, B> SweepEngine<S, B>
where
    S: ElectrostaticSolver + Sync,
    B: ComputeBackend,
{
    pub fn new(solver: S, backend: B) -> Self {
        Self { solver, backend }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Solve at each bias in `biases` for a fixed insulator thickness.
    pub fn bias_sweep(&self, biases: &[f64], thickness: f64) -> SweepResult {
        self.run(SweepKind::Bias, thickness, biases, |bias| {
            self.solver.solve(bias, thickness)
        })
    }

    /// Solve at each thickness in `thicknesses` for a fixed bias.
    pub fn thickness_sweep(&self, bias: f64, thicknesses: &[f64]) -> SweepResult {
        self.run(SweepKind::Thickness, bias, thicknesses, |z| {
            self.solver.solve(bias, z)
        })
    }

    /// Solve along a time-ordered tip trajectory `z(t)` for a fixed bias.
    pub fn trajectory_sweep(&self, bias: f64, trajectory: &[f64]) -> SweepResult {
        self.run(SweepKind::Trajectory, bias, trajectory, |z| {
            self.solver.solve(bias, z)
        })
    }

    fn run<F>(&self, kind: SweepKind, fixed: f64, axis: &[f64], solve: F) -> SweepResult
    where
        F: Fn(f64) -> Result<OperatingPoint, SolverError> + Send + Sync,
    {
        let device = self.backend.device_info();
        log::info!(
            "{kind:?} sweep: {} points with {} on {}",
            axis.len(),
            self.solver.method_name(),
            device.name
        );

        let points = self.backend.map_indexed(axis.len(), |i| {
            let result = solve(axis[i]);
            if let Err(e) = &result {
                log::warn!("{kind:?} sweep point {i} (value {}) failed: {e}", axis[i]);
            }
            result
        });

        SweepResult {
            kind,
            fixed,
            values: Array1::from(axis.to_vec()),
            points,
        }
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Array1<f64> {
    Array1::linspace(start, end, n)
}

/// Bias axis −10 V … 9.9 V in 0.1 V steps.
pub fn default_bias_axis() -> Array1<f64> {
    Array1::from_iter((0..200).map(|i| i as f64 / 10.0 - 10.0))
}

/// Thickness axis 0.05 nm … 19.95 nm in 0.1 nm steps, in metres.
pub fn default_thickness_axis() -> Array1<f64> {
    Array1::from_iter((0..200).map(|i| nm_to_m(i as f64 / 10.0 + 0.05)))
}
