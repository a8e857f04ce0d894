//! Surface-potential solver abstraction and implementation.
//!
//! The [`ElectrostaticSolver`] trait is the interface the sweep engine and
//! the dynamic-probe integrator are written against. The charge-balance
//! solver ([`SurfacePotentialSolver`]) is the only physical implementation;
//! the trait also lets tests substitute solvers with scripted failures.

pub mod roots;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bulk::BulkState;
use crate::derived::{
    classify_regime, field_slope, force_per_area, insulator_capacitance, polarization,
    surface_charge, surface_field, RegimeTolerance,
};
use crate::types::OperatingPoint;
use roots::{safeguarded_newton, Root, RootSettings};

/// Errors from a single root find or solve.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum SolverError {
    #[error("root finder failed to converge after {max_iter} iterations (residual: {residual:.2e})")]
    NonConvergence { max_iter: usize, residual: f64 },

    #[error("residual has the same sign at both ends of [{lower}, {upper}]")]
    NoBracket { lower: f64, upper: f64 },

    #[error("residual is not a number at x = {x}")]
    NonFinite { x: f64 },

    #[error("invalid solver input: {0}")]
    InvalidInput(String),
}

/// A method that maps (bias, insulator thickness) to an operating point.
pub trait ElectrostaticSolver {
    /// Solve for the operating point at gate bias `bias` (V) and insulator
    /// thickness `thickness` (m).
    fn solve(&self, bias: f64, thickness: f64) -> Result<OperatingPoint, SolverError>;

    /// Human-readable name of the solver method.
    fn method_name(&self) -> &str;
}

/// Charge-balance residual in volts,
/// $R(V_s) = (V_g - \mathrm{CPD}) - V_s - \varepsilon_s z E(V_s)$.
///
/// Strictly decreasing in `vs`.
pub fn charge_balance_residual(bulk: &BulkState, bias: f64, thickness: f64, vs: f64) -> f64 {
    let eps = bulk.material.permittivity;
    (bias - bulk.contact_potential) - vs - eps * thickness * surface_field(bulk, vs)
}

/// Solves the MIS charge balance for the surface potential against a cached
/// [`BulkState`].
#[derive(Debug, Clone)]
pub struct SurfacePotentialSolver {
    bulk: BulkState,
    settings: RootSettings,
    regime_tolerance: RegimeTolerance,
}

impl SurfacePotentialSolver {
    pub fn new(bulk: BulkState) -> Self {
        let regime_tolerance = RegimeTolerance::for_thermal_voltage(bulk.thermal_voltage);
        Self {
            bulk,
            settings: RootSettings::default(),
            regime_tolerance,
        }
    }

    pub fn with_settings(bulk: BulkState, settings: RootSettings) -> Self {
        Self {
            settings,
            ..Self::new(bulk)
        }
    }

    pub fn with_regime_tolerance(mut self, tolerance: RegimeTolerance) -> Self {
        self.regime_tolerance = tolerance;
        self
    }

    pub fn bulk(&self) -> &BulkState {
        &self.bulk
    }

    pub fn settings(&self) -> &RootSettings {
        &self.settings
    }

    /// Root-find the surface potential only.
    ///
    /// The root lies in `[min(0, Vg - CPD), max(0, Vg - CPD)]`; the doping
    /// seed (±1 V) is clamped into that interval.
    pub fn solve_surface_potential(&self, bias: f64, thickness: f64) -> Result<Root, SolverError> {
        if !bias.is_finite() {
            return Err(SolverError::InvalidInput(format!("bias must be finite, got {bias}")));
        }
        if !(thickness.is_finite() && thickness > 0.0) {
            return Err(SolverError::InvalidInput(format!(
                "insulator thickness must be positive, got {thickness}"
            )));
        }

        let drive = bias - self.bulk.contact_potential;
        if drive == 0.0 {
            return Ok(Root { x: 0.0, residual: 0.0, iterations: 0 });
        }

        let bulk = &self.bulk;
        let eps_z = bulk.material.permittivity * thickness;
        let residual = |vs: f64| {
            (
                charge_balance_residual(bulk, bias, thickness, vs),
                -1.0 - eps_z * field_slope(bulk, vs),
            )
        };

        safeguarded_newton(
            residual,
            (drive.min(0.0), drive.max(0.0)),
            bulk.doping().solver_seed(),
            &self.settings,
        )
    }
}

impl ElectrostaticSolver for SurfacePotentialSolver {
    fn solve(&self, bias: f64, thickness: f64) -> Result<OperatingPoint, SolverError> {
        let root = self.solve_surface_potential(bias, thickness)?;
        let vs = root.x;
        let bulk = &self.bulk;

        let field = surface_field(bulk, vs);
        let charge = surface_charge(bulk, field);
        let point = OperatingPoint {
            bias,
            insulator_thickness: thickness,
            surface_potential: vs,
            field,
            charge,
            force: force_per_area(charge),
            polarization: polarization(bulk, field),
            insulator_capacitance: insulator_capacitance(thickness),
            regime: classify_regime(bulk, vs, &self.regime_tolerance),
            residual: root.residual,
            iterations: root.iterations,
        };

        log::debug!(
            "Vg={bias:.4} V z={thickness:.3e} m -> Vs={vs:.6} V ({}, {} iterations)",
            point.regime,
            root.iterations
        );
        Ok(point)
    }

    fn method_name(&self) -> &str {
        "charge-balance (safeguarded Newton)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceGeometry, MaterialParameters, Regime};

    fn solver() -> SurfacePotentialSolver {
        let material = MaterialParameters::new(0.8, 7.5, 1.0, 1.0, 4.9e23, 0.0, 300.0).unwrap();
        let geometry = DeviceGeometry::new(9.0e-9, 4.10, 3.72).unwrap();
        let bulk = BulkState::compute(&material, &geometry, &RootSettings::default()).unwrap();
        SurfacePotentialSolver::new(bulk)
    }

    #[test]
    fn test_zero_drive_is_exact_flatband() {
        let s = solver();
        let cpd = s.bulk().contact_potential;
        let point = s.solve(cpd, 5e-9).unwrap();
        assert_eq!(point.surface_potential, 0.0);
        assert_eq!(point.charge, 0.0);
        assert_eq!(point.force, 0.0);
        assert_eq!(point.regime, Regime::Flatband);
    }

    #[test]
    fn test_root_lies_in_bracket() {
        let s = solver();
        for bias in [-5.0, -1.33, 0.0, 0.5, 3.0] {
            let drive = bias - s.bulk().contact_potential;
            let root = s.solve_surface_potential(bias, 9e-9).unwrap();
            assert!(root.x >= drive.min(0.0) && root.x <= drive.max(0.0));
            assert!(charge_balance_residual(s.bulk(), bias, 9e-9, root.x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_input() {
        let s = solver();
        assert!(matches!(s.solve(f64::NAN, 1e-9), Err(SolverError::InvalidInput(_))));
        assert!(matches!(s.solve(1.0, 0.0), Err(SolverError::InvalidInput(_))));
        assert!(matches!(s.solve(1.0, -1e-9), Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_iteration_budget_surfaces_as_error() {
        let bulk = solver().bulk().clone();
        let s = SurfacePotentialSolver::with_settings(
            bulk,
            RootSettings {
                max_iterations: 1,
                x_tolerance: 0.0,
                residual_tolerance: 0.0,
            },
        );
        assert!(matches!(
            s.solve(-3.0, 9e-9),
            Err(SolverError::NonConvergence { max_iter: 1, .. })
        ));
    }
}
