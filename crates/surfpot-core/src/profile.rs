//! Spatial band-bending profile into the semiconductor.
//!
//! Integrates $dV/dz = -E(V)$ from the surface ($V(0) = V_s$) into the bulk
//! with classical RK4. The step tracks the local decay length
//! $|V/E(V)|$, capped at the screening length, so steep accumulation and
//! inversion layers are resolved without a fixed grid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bulk::BulkState;
use crate::derived::{space_charge_density, surface_field};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    #[error("invalid profile setting: {0}")]
    InvalidSettings(String),

    #[error("potential became non-finite at depth {depth:.3e} m")]
    NonFinite { depth: f64 },
}

/// Step-size and termination controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    /// Step as a fraction of the local decay length.
    pub step_fraction: f64,
    /// Stop once $|V| \le$ `decay_fraction` $\cdot |V_s|$.
    pub decay_fraction: f64,
    /// Maximum depth (m); `None` means 1000 screening lengths.
    pub max_depth: Option<f64>,
    pub max_samples: usize,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            step_fraction: 0.02,
            decay_fraction: 1e-3,
            max_depth: None,
            max_samples: 20_000,
        }
    }
}

impl ProfileSettings {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !(self.step_fraction > 0.0 && self.step_fraction <= 1.0) {
            return Err(ProfileError::InvalidSettings(format!(
                "step fraction must be in (0, 1], got {}",
                self.step_fraction
            )));
        }
        if !(self.decay_fraction > 0.0 && self.decay_fraction < 1.0) {
            return Err(ProfileError::InvalidSettings(format!(
                "decay fraction must be in (0, 1), got {}",
                self.decay_fraction
            )));
        }
        if let Some(depth) = self.max_depth {
            if !(depth.is_finite() && depth > 0.0) {
                return Err(ProfileError::InvalidSettings(format!(
                    "maximum depth must be positive, got {depth}"
                )));
            }
        }
        if self.max_samples < 2 {
            return Err(ProfileError::InvalidSettings(
                "at least 2 samples are required".into(),
            ));
        }
        Ok(())
    }
}

/// One point of the profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSample {
    /// Distance below the surface (m).
    pub depth: f64,
    /// Electrostatic potential relative to the bulk (V).
    pub potential: f64,
    /// Field $-dV/dz$ (V/m).
    pub field: f64,
    /// Space-charge density (C/m³).
    pub charge_density: f64,
}

/// Band energies at one depth, band-diagram frame (eV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandEdges {
    pub depth: f64,
    pub conduction: f64,
    pub valence: f64,
    pub intrinsic: f64,
    pub fermi: f64,
}

/// Ordered depth samples from the surface into the bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandProfile {
    pub surface_potential: f64,
    pub samples: Vec<ProfileSample>,
}

impl BandProfile {
    /// Depth of the deepest sample (m).
    pub fn depth(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.depth)
    }

    /// Integrated space charge per area (C/m²). Equals the surface charge
    /// $Q_s$ up to the truncated tail.
    pub fn total_charge(&self) -> f64 {
        trapezoid(&self.samples, |s| s.charge_density)
    }

    /// First moment of the space charge, $\int z\,\rho\,dz$ (C/m).
    pub fn dipole_polarization(&self) -> f64 {
        trapezoid(&self.samples, |s| s.depth * s.charge_density)
    }

    /// Band edges bent by the local potential; the Fermi level stays flat.
    pub fn band_edges(&self, bulk: &BulkState) -> Vec<BandEdges> {
        self.samples
            .iter()
            .map(|s| BandEdges {
                depth: s.depth,
                conduction: bulk.conduction_edge - s.potential,
                valence: bulk.valence_edge - s.potential,
                intrinsic: bulk.intrinsic_level - s.potential,
                fermi: bulk.fermi_level,
            })
            .collect()
    }
}

fn trapezoid(samples: &[ProfileSample], value: impl Fn(&ProfileSample) -> f64) -> f64 {
    samples
        .windows(2)
        .map(|w| 0.5 * (value(&w[0]) + value(&w[1])) * (w[1].depth - w[0].depth))
        .sum()
}

/// Compute the band-bending profile for surface potential `vs`.
///
/// `vs == 0` gives a single flat sample at the surface.
pub fn band_bending_profile(
    bulk: &BulkState,
    vs: f64,
    settings: &ProfileSettings,
) -> Result<BandProfile, ProfileError> {
    settings.validate()?;
    if !vs.is_finite() {
        return Err(ProfileError::NonFinite { depth: 0.0 });
    }

    let sample = |depth: f64, v: f64| {
        let field = surface_field(bulk, v);
        ProfileSample {
            depth,
            potential: v,
            field,
            charge_density: space_charge_density(bulk, v),
        }
    };

    let mut samples = vec![sample(0.0, vs)];
    if vs == 0.0 {
        return Ok(BandProfile { surface_potential: vs, samples });
    }

    let screening = bulk.screening_length;
    let max_depth = settings.max_depth.unwrap_or(1000.0 * screening);
    let stop_potential = settings.decay_fraction * vs.abs();
    let slope = |v: f64| -surface_field(bulk, v);

    let (mut z, mut v) = (0.0, vs);
    while samples.len() < settings.max_samples && v.abs() > stop_potential && z < max_depth {
        let local = (v / surface_field(bulk, v)).abs();
        let h = settings.step_fraction * local.min(screening);

        let k1 = slope(v);
        let k2 = slope(v + 0.5 * h * k1);
        let k3 = slope(v + 0.5 * h * k2);
        let k4 = slope(v + h * k3);
        let mut next = v + h / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4);

        z += h;
        if !next.is_finite() {
            return Err(ProfileError::NonFinite { depth: z });
        }
        if next.signum() != v.signum() {
            next = 0.0;
        }
        v = next;
        samples.push(sample(z, v));
        if v == 0.0 {
            break;
        }
    }

    log::debug!(
        "band profile: Vs={vs:.4} V, {} samples to {:.3e} m",
        samples.len(),
        z
    );
    Ok(BandProfile { surface_potential: vs, samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derived::surface_charge;
    use crate::solver::roots::RootSettings;
    use crate::types::{DeviceGeometry, MaterialParameters};

    fn bulk() -> BulkState {
        let material = MaterialParameters::new(0.8, 7.5, 1.0, 1.0, 4.9e23, 0.0, 300.0).unwrap();
        let geometry = DeviceGeometry::new(9.0e-9, 4.10, 3.72).unwrap();
        BulkState::compute(&material, &geometry, &RootSettings::default()).unwrap()
    }

    #[test]
    fn test_flatband_is_single_sample() {
        let profile = band_bending_profile(&bulk(), 0.0, &ProfileSettings::default()).unwrap();
        assert_eq!(profile.samples.len(), 1);
        assert_eq!(profile.depth(), 0.0);
        assert_eq!(profile.total_charge(), 0.0);
    }

    #[test]
    fn test_potential_decays_monotonically() {
        let b = bulk();
        for vs in [-0.4, 0.15] {
            let profile = band_bending_profile(&b, vs, &ProfileSettings::default()).unwrap();
            assert!(profile.samples.len() > 10);
            for w in profile.samples.windows(2) {
                assert!(w[1].depth > w[0].depth);
                assert!(w[1].potential.abs() <= w[0].potential.abs());
                assert!(w[1].potential * vs >= 0.0);
            }
            let last = profile.samples.last().unwrap();
            assert!(last.potential.abs() <= 1e-3 * vs.abs());
        }
    }

    #[test]
    fn test_integrated_charge_matches_surface_charge() {
        let b = bulk();
        let vs = -0.3;
        let profile = band_bending_profile(&b, vs, &ProfileSettings::default()).unwrap();
        let qs = surface_charge(&b, surface_field(&b, vs));
        let ratio = profile.total_charge() / qs;
        assert!((ratio - 1.0).abs() < 0.05, "ratio {ratio}");
    }

    #[test]
    fn test_band_edges_follow_potential() {
        let b = bulk();
        let profile = band_bending_profile(&b, -0.2, &ProfileSettings::default()).unwrap();
        let edges = profile.band_edges(&b);
        assert_eq!(edges.len(), profile.samples.len());
        let surface = edges[0];
        assert!((surface.conduction - (b.conduction_edge + 0.2)).abs() < 1e-12);
        assert!((surface.conduction - surface.valence - 0.8).abs() < 1e-12);
        assert!(edges.iter().all(|e| e.fermi == b.fermi_level));
    }

    #[test]
    fn test_sample_budget_is_respected() {
        let settings = ProfileSettings {
            max_samples: 25,
            ..ProfileSettings::default()
        };
        let profile = band_bending_profile(&bulk(), -0.4, &settings).unwrap();
        assert_eq!(profile.samples.len(), 25);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let settings = ProfileSettings {
            step_fraction: 0.0,
            ..ProfileSettings::default()
        };
        assert!(matches!(
            band_bending_profile(&bulk(), 0.1, &settings),
            Err(ProfileError::InvalidSettings(_))
        ));
    }
}
