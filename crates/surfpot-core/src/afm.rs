//! Dynamic-mode (non-contact AFM) probe response.
//!
//! The tip oscillates above the sample as $z(\theta) = z_0 + A(1 + \cos\theta)$,
//! so the set-point gap $z_0$ is reached at the lower turning point
//! $\theta = \pi$. The electrostatic force is sampled over one period at the
//! (optionally lagged) gap and projected onto the in-phase and quadrature
//! components of the motion:
//!
//! - frequency shift $\Delta f = -\frac{f_0}{2\pi k A}\sum_j F_j \cos\theta_j\,\Delta\theta$
//! - dissipated energy $E_d = A \sum_j F_j \sin\theta_j\,\Delta\theta$
//! - damping shift $\Delta g = -\frac{f_0}{\pi}\sum_j F_j \sin\theta_j\,\Delta t$
//!   with $\Delta t = \Delta\theta / f_0$
//!
//! A lag of zero makes the force even in $\theta$ and the dissipation vanish.

use std::f64::consts::PI;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use surfpot_compute::ComputeBackend;
use thiserror::Error;

use crate::solver::{ElectrostaticSolver, SolverError};
use crate::sweep::SweepEngine;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ProbeError {
    #[error("invalid probe setting: {0}")]
    InvalidSettings(String),

    #[error("trajectory point {index} (gap {thickness:.3e} m) failed: {source}")]
    Trajectory {
        index: usize,
        thickness: f64,
        #[source]
        source: SolverError,
    },
}

/// Which surfaces contribute to the force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeGeometry {
    /// Tip apex only, as a parallel plate of area $\pi r^2$.
    Tip,
    /// Tip apex plus the cantilever plate at height `cantilever_height` above it.
    TipAndCantilever,
}

/// Oscillation and probe parameters, SI units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Samples per oscillation period; even, at least 4.
    pub timesteps: usize,
    /// Oscillation amplitude (m).
    pub amplitude: f64,
    /// Free resonance frequency (Hz).
    pub resonance_frequency: f64,
    /// Cantilever spring constant (N/m).
    pub spring_constant: f64,
    pub quality_factor: f64,
    /// Response lag of the sample behind the tip (s).
    pub time_lag: f64,
    /// Tip apex radius (m).
    pub tip_radius: f64,
    /// Cantilever height above the tip apex (m).
    pub cantilever_height: f64,
    /// Cantilever plate area (m²).
    pub cantilever_area: f64,
    pub geometry: ProbeGeometry,
}

impl ProbeSettings {
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.timesteps < 4 || self.timesteps % 2 != 0 {
            return Err(ProbeError::InvalidSettings(format!(
                "timesteps must be even and at least 4, got {}",
                self.timesteps
            )));
        }
        let positive = [
            ("amplitude", self.amplitude),
            ("resonance frequency", self.resonance_frequency),
            ("spring constant", self.spring_constant),
            ("quality factor", self.quality_factor),
            ("tip radius", self.tip_radius),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ProbeError::InvalidSettings(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.time_lag.is_finite() && self.time_lag >= 0.0) {
            return Err(ProbeError::InvalidSettings(format!(
                "time lag must be non-negative, got {}",
                self.time_lag
            )));
        }
        if self.geometry == ProbeGeometry::TipAndCantilever
            && !(self.cantilever_height > 0.0 && self.cantilever_area > 0.0)
        {
            return Err(ProbeError::InvalidSettings(
                "cantilever height and area must be positive when the cantilever contributes"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Phase lag $2\pi f_0 \tau$ (rad).
    pub fn phase_lag(&self) -> f64 {
        2.0 * PI * self.resonance_frequency * self.time_lag
    }

    /// Index of the lower turning point in a trajectory.
    pub fn turning_index(&self) -> usize {
        self.timesteps / 2
    }
}

/// Sampled tip motion over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Phases $\theta_j = 2\pi j / N$.
    pub phases: Array1<f64>,
    /// Tip-sample gap at each phase (m).
    pub gap: Array1<f64>,
    /// Gap seen by the lagging sample response (m).
    pub lagged_gap: Array1<f64>,
}

impl Trajectory {
    pub fn new(setpoint: f64, settings: &ProbeSettings) -> Self {
        let n = settings.timesteps;
        let a = settings.amplitude;
        let lag = settings.phase_lag();
        let phases = Array1::from_iter((0..n).map(|j| 2.0 * PI * j as f64 / n as f64));
        let gap = phases.mapv(|t| setpoint + a * (1.0 + t.cos()));
        let lagged_gap = phases.mapv(|t| setpoint + a * (1.0 + (t - lag).cos()));
        Self { phases, gap, lagged_gap }
    }

    pub fn step(&self) -> f64 {
        2.0 * PI / self.phases.len() as f64
    }
}

/// Response of the probe at one bias / set-point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub bias: f64,
    pub setpoint: f64,
    /// Surface potential at the lower turning point (V).
    pub surface_potential: f64,
    /// Total force at the lower turning point (N).
    pub force: f64,
    /// Cantilever share of the turning-point force (N), when modelled.
    pub cantilever_force: Option<f64>,
    /// Peak-to-peak surface polarization over the period (C/m²).
    pub polarization_swing: f64,
    /// Resonance frequency shift (Hz).
    pub frequency_shift: f64,
    /// Energy dissipated per cycle (J).
    pub dissipated_energy: f64,
    /// Damping shift from the quadrature force component (N).
    pub damping_shift: f64,
    /// Dissipated energy relative to the intrinsic loss $\pi k A^2 / Q$.
    pub excitation_change: f64,
}

/// $\Delta f$ from a force sampled at the trajectory phases.
pub fn frequency_shift(force: &Array1<f64>, trajectory: &Trajectory, settings: &ProbeSettings) -> f64 {
    let projection: f64 = force
        .iter()
        .zip(trajectory.phases.iter())
        .map(|(f, t)| f * t.cos())
        .sum::<f64>()
        * trajectory.step();
    -settings.resonance_frequency / (2.0 * PI * settings.spring_constant * settings.amplitude)
        * projection
}

/// Energy dissipated per cycle from a force sampled at the trajectory phases.
pub fn dissipated_energy(force: &Array1<f64>, trajectory: &Trajectory, settings: &ProbeSettings) -> f64 {
    let projection: f64 = force
        .iter()
        .zip(trajectory.phases.iter())
        .map(|(f, t)| f * t.sin())
        .sum::<f64>()
        * trajectory.step();
    settings.amplitude * projection
}

/// Damping shift from a force sampled at the trajectory phases, integrated
/// over time with the same $\Delta t = \Delta\theta / f_0$ as the
/// frequency shift.
pub fn damping_shift(force: &Array1<f64>, trajectory: &Trajectory, settings: &ProbeSettings) -> f64 {
    let dt = trajectory.step() / settings.resonance_frequency;
    let projection: f64 = force
        .iter()
        .zip(trajectory.phases.iter())
        .map(|(f, t)| f * t.sin())
        .sum::<f64>()
        * dt;
    -settings.resonance_frequency / PI * projection
}

/// Evaluate the probe response at `bias` with the oscillation's lower
/// turning point at `setpoint` (m).
///
/// Any failed solve along the trajectory fails the whole evaluation.
pub fn evaluate_probe<S>(
    solver: &S,
    bias: f64,
    setpoint: f64,
    settings: &ProbeSettings,
) -> Result<ProbeResult, ProbeError>
where
    S: ElectrostaticSolver + ?Sized,
{
    settings.validate()?;
    let trajectory = Trajectory::new(setpoint, settings);
    let tip_area = PI * settings.tip_radius * settings.tip_radius;
    let with_cantilever = settings.geometry == ProbeGeometry::TipAndCantilever;

    let solve = |index: usize, thickness: f64| {
        solver.solve(bias, thickness).map_err(|source| ProbeError::Trajectory {
            index,
            thickness,
            source,
        })
    };

    let n = settings.timesteps;
    let mut force = Array1::zeros(n);
    let mut cantilever = Array1::zeros(n);
    let mut potential = Array1::zeros(n);
    let mut polarization = Array1::zeros(n);
    for (j, &z) in trajectory.lagged_gap.iter().enumerate() {
        let tip = solve(j, z)?;
        potential[j] = tip.surface_potential;
        polarization[j] = tip.polarization;
        if with_cantilever {
            let plate = solve(j, z + settings.cantilever_height)?;
            cantilever[j] = plate.force * settings.cantilever_area;
        }
        force[j] = tip.force * tip_area + cantilever[j];
    }

    let turning = settings.turning_index();
    let dissipated = dissipated_energy(&force, &trajectory, settings);
    let intrinsic_loss = PI * settings.spring_constant * settings.amplitude.powi(2)
        / settings.quality_factor;
    let swing = polarization.fold(f64::NEG_INFINITY, |m: f64, &p| m.max(p))
        - polarization.fold(f64::INFINITY, |m: f64, &p| m.min(p));

    Ok(ProbeResult {
        bias,
        setpoint,
        surface_potential: potential[turning],
        force: force[turning],
        cantilever_force: with_cantilever.then(|| cantilever[turning]),
        polarization_swing: swing,
        frequency_shift: frequency_shift(&force, &trajectory, settings),
        dissipated_energy: dissipated,
        damping_shift: damping_shift(&force, &trajectory, settings),
        excitation_change: dissipated / intrinsic_loss,
    })
}

/// Index-aligned probe responses along a bias or set-point axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSweep {
    pub values: Array1<f64>,
    pub results: Vec<Result<ProbeResult, ProbeError>>,
}

impl ProbeSweep {
    pub fn column(&self, quantity: impl Fn(&ProbeResult) -> f64) -> Array1<f64> {
        self.results
            .iter()
            .map(|r| r.as_ref().map_or(f64::NAN, &quantity))
            .collect()
    }
}

impl<S, B> SweepEngine<S, B>
where
    S: ElectrostaticSolver + Sync,
    B: ComputeBackend,
{
    /// Probe response at each bias with a fixed set-point gap.
    pub fn afm_bias_sweep(&self, biases: &[f64], setpoint: f64, settings: &ProbeSettings) -> ProbeSweep {
        log::info!("probe bias sweep: {} points x {} phases", biases.len(), settings.timesteps);
        let results = self.backend().map_indexed(biases.len(), |i| {
            let result = evaluate_probe(self.solver(), biases[i], setpoint, settings);
            if let Err(e) = &result {
                log::warn!("probe at bias {} V failed: {e}", biases[i]);
            }
            result
        });
        ProbeSweep {
            values: Array1::from(biases.to_vec()),
            results,
        }
    }

    /// Probe response at each set-point gap with a fixed bias.
    pub fn afm_thickness_sweep(&self, bias: f64, setpoints: &[f64], settings: &ProbeSettings) -> ProbeSweep {
        log::info!("probe set-point sweep: {} points x {} phases", setpoints.len(), settings.timesteps);
        let results = self.backend().map_indexed(setpoints.len(), |i| {
            let result = evaluate_probe(self.solver(), bias, setpoints[i], settings);
            if let Err(e) = &result {
                log::warn!("probe at gap {:.3e} m failed: {e}", setpoints[i]);
            }
            result
        });
        ProbeSweep {
            values: Array1::from(setpoints.to_vec()),
            results,
        }
    }
}
