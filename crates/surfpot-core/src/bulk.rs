//! Equilibrium bulk state of the semiconductor.
//!
//! Computed once per material/device combination and then shared read-only
//! by every surface-potential solve at different bias or thickness.
//!
//! # Energy frames
//!
//! Absolute band energies do not affect the surface potential or force, only
//! energy differences do. The Fermi level is first found in an arbitrary
//! frame with the valence-band edge at +1 eV; the band-diagram frame then
//! places the bulk Fermi level at $-\mathrm{CPD}$ and carries the
//! differences $E_c - E_f$, $E_v - E_f$, $E_i - E_f$ across.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    thermal_voltage, BOLTZMANN, ELECTRON_MASS, ELEMENTARY_CHARGE, HBAR, VACUUM_PERMITTIVITY,
};
use crate::solver::roots::{safeguarded_newton, RootSettings};
use crate::solver::SolverError;
use crate::types::{ConfigError, DeviceGeometry, DopingType, MaterialParameters};

/// Valence-band edge in the arbitrary frame used for the Fermi-level solve (eV).
const VALENCE_REFERENCE_EV: f64 = 1.0;

/// Initial Fermi-level iterate in the arbitrary frame (eV).
const FERMI_SEED_EV: f64 = -1.0;

/// Maximum number of one-bandgap widenings when bracketing the Fermi level.
const MAX_BRACKET_WIDENINGS: usize = 64;

/// Failures that leave every downstream quantity undefined.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BulkError {
    #[error("invalid parameters: {0}")]
    Config(#[from] ConfigError),

    #[error("bulk Fermi level undefined for these inputs: {0}")]
    FermiLevel(#[source] SolverError),
}

/// Equilibrium quantities derived from a [`MaterialParameters`] /
/// [`DeviceGeometry`] pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkState {
    pub material: MaterialParameters,
    /// Metal work function (eV).
    pub work_function_ev: f64,
    /// Semiconductor electron affinity (eV).
    pub electron_affinity_ev: f64,
    /// $k_B T / e$ (V).
    pub thermal_voltage: f64,
    /// Effective conduction-band density of states $N_C$ (m⁻³).
    pub conduction_density: f64,
    /// Effective valence-band density of states $N_V$ (m⁻³).
    pub valence_density: f64,
    /// Intrinsic carrier density $n_i$ (m⁻³).
    pub intrinsic_density: f64,
    /// Bulk electron density $n_b$ (m⁻³).
    pub electron_density: f64,
    /// Bulk hole density $p_b$ (m⁻³).
    pub hole_density: f64,
    /// Fermi level in the arbitrary frame (valence edge at +1 eV).
    pub fermi_level_absolute: f64,
    /// Contact potential difference metal − semiconductor (V).
    pub contact_potential: f64,
    /// Band-diagram frame energies (eV). `fermi_level == -contact_potential`.
    pub fermi_level: f64,
    pub conduction_edge: f64,
    pub valence_edge: f64,
    pub intrinsic_level: f64,
    /// Debye length normalised to the bulk hole density (m).
    pub debye_length: f64,
    /// Small-signal screening length $L_D / \sqrt{1 + n_b/p_b}$ (m).
    pub screening_length: f64,
    /// Iterations used by the Fermi-level root find.
    pub fermi_iterations: usize,
}

impl BulkState {
    /// Derive the bulk state. A Fermi-level failure is fatal for this
    /// parameter set.
    pub fn compute(
        material: &MaterialParameters,
        geometry: &DeviceGeometry,
        settings: &RootSettings,
    ) -> Result<Self, BulkError> {
        material.validate()?;
        DeviceGeometry::new(
            geometry.insulator_thickness,
            geometry.work_function_ev,
            geometry.electron_affinity_ev,
        )?;

        let t = material.temperature_k;
        let vt = thermal_voltage(t);
        let eg = material.bandgap_ev;

        let (nc, nv) = effective_densities(
            t,
            material.electron_mass_ratio,
            material.hole_mass_ratio,
        );
        let ni = intrinsic_density(nc, nv, eg, t);
        let (nb, pb) = bulk_carriers(
            material.doping,
            material.donor_density,
            material.acceptor_density,
            ni,
        );

        let ev = VALENCE_REFERENCE_EV;
        let ec = ev + eg;
        let ei = 0.5 * (ec + ev)
            + 0.5 * vt * (material.hole_mass_ratio / material.electron_mass_ratio).ln();

        let fermi = solve_fermi_level(material, nc, nv, ec, ev, vt, settings)
            .map_err(BulkError::FermiLevel)?;
        let ef = fermi.x;

        let semiconductor_wf = geometry.electron_affinity_ev + (ec - ef);
        let cpd = geometry.work_function_ev - semiconductor_wf;

        let debye_length = (BOLTZMANN * t * VACUUM_PERMITTIVITY * material.permittivity
            / (pb * ELEMENTARY_CHARGE * ELEMENTARY_CHARGE))
            .sqrt();
        let screening_length = debye_length / (1.0 + nb / pb).sqrt();

        log::debug!(
            "bulk state: ni={ni:.3e} nb={nb:.3e} pb={pb:.3e} Ef-Ev={:.4} eV CPD={cpd:.4} V ({} iterations)",
            ef - ev,
            fermi.iterations
        );

        Ok(Self {
            material: material.clone(),
            work_function_ev: geometry.work_function_ev,
            electron_affinity_ev: geometry.electron_affinity_ev,
            thermal_voltage: vt,
            conduction_density: nc,
            valence_density: nv,
            intrinsic_density: ni,
            electron_density: nb,
            hole_density: pb,
            fermi_level_absolute: ef,
            contact_potential: cpd,
            fermi_level: -cpd,
            conduction_edge: -cpd + (ec - ef),
            valence_edge: -cpd + (ev - ef),
            intrinsic_level: -cpd + (ei - ef),
            debye_length,
            screening_length,
            fermi_iterations: fermi.iterations,
        })
    }

    pub fn doping(&self) -> DopingType {
        self.material.doping
    }

    /// $n_b / p_b$.
    pub fn carrier_ratio(&self) -> f64 {
        self.electron_density / self.hole_density
    }

    /// Flatband voltage (no trapped charge): equal to the CPD.
    pub fn flatband_voltage(&self) -> f64 {
        self.contact_potential
    }
}

/// Effective densities of states $(N_C, N_V)$ in m⁻³.
///
/// $N = \frac{1}{\sqrt 2}\left(\frac{m^* k_B T}{\pi \hbar^2}\right)^{3/2}$
pub fn effective_densities(temperature_k: f64, electron_mass_ratio: f64, hole_mass_ratio: f64) -> (f64, f64) {
    let density = |ratio: f64| {
        std::f64::consts::FRAC_1_SQRT_2
            * (ratio * ELECTRON_MASS * BOLTZMANN * temperature_k / (std::f64::consts::PI * HBAR * HBAR))
                .powf(1.5)
    };
    (density(electron_mass_ratio), density(hole_mass_ratio))
}

/// Intrinsic carrier density $n_i = \sqrt{N_C N_V}\, e^{-E_g / 2 k_B T}$.
pub fn intrinsic_density(nc: f64, nv: f64, bandgap_ev: f64, temperature_k: f64) -> f64 {
    (nc * nv).sqrt() * (-bandgap_ev / (2.0 * thermal_voltage(temperature_k))).exp()
}

/// Bulk carrier densities $(n_b, p_b)$ from charge neutrality.
///
/// The majority density is the positive root of the neutrality quadratic;
/// the minority density follows from $n p = n_i^2$.
pub fn bulk_carriers(doping: DopingType, donor: f64, acceptor: f64, ni: f64) -> (f64, f64) {
    match doping {
        DopingType::N => {
            let half = 0.5 * (donor - acceptor);
            let nb = half + (half * half + ni * ni).sqrt();
            (nb, ni * ni / nb)
        }
        DopingType::P => {
            let half = 0.5 * (acceptor - donor);
            let pb = half + (half * half + ni * ni).sqrt();
            (ni * ni / pb, pb)
        }
    }
}

/// Solve $p_0(E_f) - n_0(E_f) + N_d - N_a = 0$ in the arbitrary frame.
///
/// The residual is scaled by the net doping (plus $n_i$) so the residual
/// tolerance is dimensionless.
fn solve_fermi_level(
    material: &MaterialParameters,
    nc: f64,
    nv: f64,
    ec: f64,
    ev: f64,
    vt: f64,
    settings: &RootSettings,
) -> Result<crate::solver::roots::Root, SolverError> {
    let net = material.net_doping();
    let scale = net.abs() + (nc * nv).sqrt() * (-(ec - ev) / (2.0 * vt)).exp();
    let residual = |ef: f64| {
        let n0 = nc * ((ef - ec) / vt).exp();
        let p0 = nv * ((ev - ef) / vt).exp();
        ((p0 - n0 + net) / scale, -(p0 + n0) / (vt * scale))
    };

    let eg = ec - ev;
    let mut lower = ev - eg;
    let mut upper = ec + eg;
    let mut widenings = 0;
    while residual(lower).0 <= 0.0 && widenings < MAX_BRACKET_WIDENINGS {
        lower -= eg;
        widenings += 1;
    }
    while residual(upper).0 >= 0.0 && widenings < MAX_BRACKET_WIDENINGS {
        upper += eg;
        widenings += 1;
    }

    safeguarded_newton(residual, (lower, upper), FERMI_SEED_EV, settings)
}
