//! Closed-form quantities derived from a surface potential.
//!
//! Everything here is a pure function of the [`BulkState`] and either the
//! surface potential $V_s$ or the surface field. With $u = V/V_T$ and
//! $r = n_b/p_b$ the integration factor is
//!
//! $$f(V) = \sqrt{e^{-u} + u - 1 + r\,(e^{u} - u - 1)}$$
//!
//! and the surface field is $E = \operatorname{sign}(V)\,\sqrt2\,V_T f / L_D$.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bulk::BulkState;
use crate::constants::{ELEMENTARY_CHARGE, VACUUM_PERMITTIVITY};
use crate::types::{DopingType, Regime};

/// Below this |u| the analytic derivative is replaced by its small-signal limit.
const SMALL_SIGNAL_U: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradientError {
    #[error("length mismatch: {values} values against {axis} axis points")]
    LengthMismatch { values: usize, axis: usize },

    #[error("a derivative needs at least 2 samples, got {0}")]
    TooFewSamples(usize),
}

/// The dimensionless integration factor $f(V)$. The radicand is clamped at
/// zero against rounding.
pub fn integration_factor(bulk: &BulkState, v: f64) -> f64 {
    let u = v / bulk.thermal_voltage;
    let r = bulk.carrier_ratio();
    let radicand = ((-u).exp_m1() + u) + r * (u.exp_m1() - u);
    radicand.max(0.0).sqrt()
}

/// Semiconductor surface field $E(V_s)$ (V/m). Exactly zero at $V_s = 0$.
pub fn surface_field(bulk: &BulkState, vs: f64) -> f64 {
    if vs == 0.0 {
        return 0.0;
    }
    vs.signum() * std::f64::consts::SQRT_2 * bulk.thermal_voltage / bulk.debye_length
        * integration_factor(bulk, vs)
}

/// $dE/dV_s$ (1/m). Always positive.
pub fn field_slope(bulk: &BulkState, vs: f64) -> f64 {
    let u = vs / bulk.thermal_voltage;
    let r = bulk.carrier_ratio();
    let f = integration_factor(bulk, vs);
    if f == 0.0 || u.abs() < SMALL_SIGNAL_U {
        return (1.0 + r).sqrt() / bulk.debye_length;
    }
    let numerator = -(-u).exp_m1() + r * u.exp_m1();
    vs.signum() * std::f64::consts::SQRT_2 / bulk.debye_length * numerator / (2.0 * f)
}

/// Surface charge per area $Q_s = -\varepsilon_s \varepsilon_0 E$ (C/m²).
pub fn surface_charge(bulk: &BulkState, field: f64) -> f64 {
    -bulk.material.permittivity * VACUUM_PERMITTIVITY * field
}

/// Electrostatic pressure between gate and sample, $-Q_s^2 / 2\varepsilon_0$
/// (N/m²).
///
/// Depends on $Q_s^2$ only, so the force is attractive in every regime and
/// carries no information about the sign of the contact potential.
pub fn force_per_area(charge: f64) -> f64 {
    -charge * charge / (2.0 * VACUUM_PERMITTIVITY)
}

/// Surface polarization $\varepsilon_0 (\varepsilon_s - 1) E$ (C/m²).
pub fn polarization(bulk: &BulkState, field: f64) -> f64 {
    VACUUM_PERMITTIVITY * (bulk.material.permittivity - 1.0) * field
}

/// Parallel-plate insulator capacitance per area $\varepsilon_0 / z$ (F/m²).
pub fn insulator_capacitance(thickness: f64) -> f64 {
    VACUUM_PERMITTIVITY / thickness
}

/// Space-charge density at local potential `v` (C/m³),
/// $\rho = e\,(p_b e^{-u} - n_b e^{u} + n_b - p_b)$.
pub fn space_charge_density(bulk: &BulkState, v: f64) -> f64 {
    let u = v / bulk.thermal_voltage;
    ELEMENTARY_CHARGE * (bulk.hole_density * (-u).exp_m1() - bulk.electron_density * u.exp_m1())
}

/// Derivative of `y` with respect to `x` on a non-uniform grid.
///
/// Second-order central differences in the interior and first-order
/// one-sided differences at the ends.
pub fn gradient(y: ArrayView1<f64>, x: ArrayView1<f64>) -> Result<Array1<f64>, GradientError> {
    let n = y.len();
    if x.len() != n {
        return Err(GradientError::LengthMismatch { values: n, axis: x.len() });
    }
    if n < 2 {
        return Err(GradientError::TooFewSamples(n));
    }

    let mut out = Array1::zeros(n);
    out[0] = (y[1] - y[0]) / (x[1] - x[0]);
    out[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        let hs = x[i] - x[i - 1];
        let hd = x[i + 1] - x[i];
        out[i] = (hs * hs * y[i + 1] + (hd * hd - hs * hs) * y[i] - hd * hd * y[i - 1])
            / (hs * hd * (hd + hs));
    }
    Ok(out)
}

/// Differential semiconductor capacitance $dQ_s/dV_s$ (F/m²) along a
/// sweep. Negative for any physical charge curve, since $Q_s$ falls as
/// $V_s$ rises.
pub fn differential_capacitance(
    charge: ArrayView1<f64>,
    surface_potential: ArrayView1<f64>,
) -> Result<Array1<f64>, GradientError> {
    gradient(charge, surface_potential)
}

/// Absolute tolerance band (V) for the two equality tests of the regime
/// classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeTolerance {
    /// $|V_s| \le$ this is flatband.
    pub flatband_v: f64,
    /// $|E_f - (E_i - V_s)| \le$ this is threshold.
    pub threshold_v: f64,
}

impl RegimeTolerance {
    pub fn for_thermal_voltage(thermal_voltage: f64) -> Self {
        Self {
            flatband_v: 1e-6 * thermal_voltage,
            threshold_v: 1e-6 * thermal_voltage,
        }
    }
}

/// Classify the operating regime from band-diagram-frame energies.
///
/// Surface band energies are the bulk ones shifted by $-V_s$. The comparison
/// sense is mirrored between n- and p-type.
pub fn classify_regime(bulk: &BulkState, vs: f64, tolerance: &RegimeTolerance) -> Regime {
    let ef = bulk.fermi_level;
    let midgap_offset = ef - (bulk.intrinsic_level - vs);

    if vs.abs() <= tolerance.flatband_v {
        return Regime::Flatband;
    }
    match bulk.doping() {
        DopingType::N => {
            if vs > 0.0 {
                Regime::Accumulation
            } else if midgap_offset > tolerance.threshold_v {
                Regime::Depletion
            } else if midgap_offset.abs() <= tolerance.threshold_v {
                Regime::Threshold
            } else if ef < bulk.valence_edge - vs {
                Regime::StrongInversion
            } else {
                Regime::WeakInversion
            }
        }
        DopingType::P => {
            if vs < 0.0 {
                Regime::Accumulation
            } else if midgap_offset < -tolerance.threshold_v {
                Regime::Depletion
            } else if midgap_offset.abs() <= tolerance.threshold_v {
                Regime::Threshold
            } else if ef > bulk.conduction_edge - vs {
                Regime::StrongInversion
            } else {
                Regime::WeakInversion
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::roots::RootSettings;
    use crate::types::{DeviceGeometry, MaterialParameters};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn bulk(doping: DopingType) -> BulkState {
        let material =
            MaterialParameters::with_doping(doping, 1e24, 1.0, 4.0, 1.0, 1.0, 300.0).unwrap();
        let geometry = DeviceGeometry::new(5e-9, 4.5, 4.0).unwrap();
        BulkState::compute(&material, &geometry, &RootSettings::default()).unwrap()
    }

    #[test]
    fn test_field_is_odd_in_sign() {
        let b = bulk(DopingType::N);
        assert_eq!(surface_field(&b, 0.0), 0.0);
        assert!(surface_field(&b, 0.1) > 0.0);
        assert!(surface_field(&b, -0.1) < 0.0);
    }

    #[test]
    fn test_field_slope_matches_finite_difference() {
        let b = bulk(DopingType::N);
        for vs in [-0.5, -0.05, 0.02, 0.3] {
            let h = 1e-7;
            let numeric = (surface_field(&b, vs + h) - surface_field(&b, vs - h)) / (2.0 * h);
            let analytic = field_slope(&b, vs);
            assert!(
                (numeric / analytic - 1.0).abs() < 1e-5,
                "vs={vs}: {numeric} vs {analytic}"
            );
        }
    }

    #[test]
    fn test_field_slope_small_signal_limit() {
        let b = bulk(DopingType::P);
        let limit = (1.0 + b.carrier_ratio()).sqrt() / b.debye_length;
        assert_eq!(field_slope(&b, 0.0), limit);
        let near = field_slope(&b, 1e-5 * b.thermal_voltage);
        assert!((near / limit - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_force_is_never_repulsive() {
        for q in [-1e-2, -1e-6, 0.0, 3e-5, 0.4] {
            assert!(force_per_area(q) <= 0.0);
        }
    }

    #[test]
    fn test_space_charge_vanishes_in_bulk() {
        let b = bulk(DopingType::N);
        assert_eq!(space_charge_density(&b, 0.0), 0.0);
        // Depletion of an n-type layer leaves positive donor charge.
        assert!(space_charge_density(&b, -0.2) > 0.0);
        assert!(space_charge_density(&b, 0.2) < 0.0);
    }

    #[test]
    fn test_gradient_exact_for_quadratic() {
        let x = array![0.0, 0.1, 0.35, 0.4, 1.0];
        let y = x.mapv(|v| v * v);
        let g = gradient(y.view(), x.view()).unwrap();
        for i in 1..4 {
            assert!((g[i] - 2.0 * x[i]).abs() < 1e-12);
        }
        assert!((g[0] - 0.1).abs() < 1e-12);
        assert!((g[4] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_errors() {
        let one = array![1.0];
        assert_eq!(
            gradient(one.view(), one.view()),
            Err(GradientError::TooFewSamples(1))
        );
        let two = array![1.0, 2.0];
        assert!(matches!(
            gradient(two.view(), one.view()),
            Err(GradientError::LengthMismatch { values: 2, axis: 1 })
        ));
    }

    #[test]
    fn test_differential_capacitance_is_charge_slope() {
        let b = bulk(DopingType::N);
        let vs = Array1::linspace(-0.3, 0.3, 31);
        let q = vs.mapv(|v| surface_charge(&b, surface_field(&b, v)));
        let c = differential_capacitance(q.view(), vs.view()).unwrap();
        assert!(c.iter().all(|&c| c < 0.0));

        // Interior points on a uniform axis are the plain central difference.
        for i in 1..30 {
            let central = (q[i + 1] - q[i - 1]) / (vs[i + 1] - vs[i - 1]);
            assert_relative_eq!(c[i], central, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_regime_sequence_n_type() {
        let b = bulk(DopingType::N);
        let tol = RegimeTolerance::for_thermal_voltage(b.thermal_voltage);
        assert_eq!(classify_regime(&b, 0.2, &tol), Regime::Accumulation);
        assert_eq!(classify_regime(&b, 0.0, &tol), Regime::Flatband);
        assert_eq!(classify_regime(&b, -0.05, &tol), Regime::Depletion);

        let threshold = b.intrinsic_level - b.fermi_level;
        assert_eq!(classify_regime(&b, threshold, &tol), Regime::Threshold);
        assert_eq!(classify_regime(&b, threshold - 0.01, &tol), Regime::WeakInversion);
        let strong = b.valence_edge - b.fermi_level - 0.01;
        assert_eq!(classify_regime(&b, strong, &tol), Regime::StrongInversion);
    }

    #[test]
    fn test_regime_sequence_p_type_is_mirrored() {
        let b = bulk(DopingType::P);
        let tol = RegimeTolerance::for_thermal_voltage(b.thermal_voltage);
        assert_eq!(classify_regime(&b, -0.2, &tol), Regime::Accumulation);
        assert_eq!(classify_regime(&b, 0.0, &tol), Regime::Flatband);
        assert_eq!(classify_regime(&b, 0.05, &tol), Regime::Depletion);

        let threshold = b.intrinsic_level - b.fermi_level;
        assert_eq!(classify_regime(&b, threshold, &tol), Regime::Threshold);
        assert_eq!(classify_regime(&b, threshold + 0.01, &tol), Regime::WeakInversion);
        let strong = b.conduction_edge - b.fermi_level + 0.01;
        assert_eq!(classify_regime(&b, strong, &tol), Regime::StrongInversion);
    }

    #[test]
    fn test_flatband_band_absorbs_rounding() {
        let b = bulk(DopingType::N);
        let tol = RegimeTolerance::for_thermal_voltage(b.thermal_voltage);
        assert_eq!(classify_regime(&b, 1e-12, &tol), Regime::Flatband);
        assert_eq!(classify_regime(&b, -1e-12, &tol), Regime::Flatband);
    }
}
