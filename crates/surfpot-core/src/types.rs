//! Core types shared across the Surfpot framework.
//!
//! Every entity here is an immutable value record. Constructors validate
//! their invariants, so a [`MaterialParameters`] or [`DeviceGeometry`] that
//! exists is always safe to hand to the solver.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected input parameters. Fatal to the request, never to the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("relative permittivity must be at least 1, got {0}")]
    Permittivity(f64),

    #[error("mixed doping is unsupported (donor {donor:e} m^-3, acceptor {acceptor:e} m^-3)")]
    MixedDoping { donor: f64, acceptor: f64 },

    #[error("{doping} material needs a nonzero {expected} density")]
    MissingDopant {
        doping: DopingType,
        expected: &'static str,
    },
}

/// Majority-carrier type of the semiconductor.
///
/// Threaded explicitly through the bulk calculation, the solver seed and the
/// regime classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DopingType {
    #[serde(alias = "n-type", alias = "ntype")]
    N,
    #[serde(alias = "p-type", alias = "ptype")]
    P,
}

impl DopingType {
    /// Initial iterate (V) for the surface-potential root.
    pub fn solver_seed(self) -> f64 {
        match self {
            DopingType::N => 1.0,
            DopingType::P => -1.0,
        }
    }

    /// Density of the dopant that defines this type.
    pub fn majority_dopant(self, donor: f64, acceptor: f64) -> f64 {
        match self {
            DopingType::N => donor,
            DopingType::P => acceptor,
        }
    }
}

impl fmt::Display for DopingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DopingType::N => f.write_str("n-type"),
            DopingType::P => f.write_str("p-type"),
        }
    }
}

/// Semiconductor material inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialParameters {
    /// Bandgap (eV).
    pub bandgap_ev: f64,
    /// Relative permittivity of the semiconductor.
    pub permittivity: f64,
    /// Electron effective mass in units of the free-electron mass.
    pub electron_mass_ratio: f64,
    /// Hole effective mass in units of the free-electron mass.
    pub hole_mass_ratio: f64,
    /// Donor density (m⁻³).
    pub donor_density: f64,
    /// Acceptor density (m⁻³).
    pub acceptor_density: f64,
    /// Lattice temperature (K).
    pub temperature_k: f64,
    /// Majority-carrier type; always agrees with the nonzero dopant.
    pub doping: DopingType,
}

impl MaterialParameters {
    /// Build and validate a parameter set from explicit donor and acceptor
    /// densities. Exactly one of the two must be nonzero.
    pub fn new(
        bandgap_ev: f64,
        permittivity: f64,
        electron_mass_ratio: f64,
        hole_mass_ratio: f64,
        donor_density: f64,
        acceptor_density: f64,
        temperature_k: f64,
    ) -> Result<Self, ConfigError> {
        require_positive("bandgap", bandgap_ev)?;
        require_positive("electron mass ratio", electron_mass_ratio)?;
        require_positive("hole mass ratio", hole_mass_ratio)?;
        require_positive("temperature", temperature_k)?;
        if !permittivity.is_finite() || permittivity < 1.0 {
            return Err(ConfigError::Permittivity(permittivity));
        }
        require_non_negative("donor density", donor_density)?;
        require_non_negative("acceptor density", acceptor_density)?;

        let doping = match (donor_density > 0.0, acceptor_density > 0.0) {
            (true, false) => DopingType::N,
            (false, true) => DopingType::P,
            (true, true) => {
                return Err(ConfigError::MixedDoping {
                    donor: donor_density,
                    acceptor: acceptor_density,
                })
            }
            (false, false) => {
                return Err(ConfigError::NotPositive {
                    name: "dopant density",
                    value: 0.0,
                })
            }
        };

        Ok(Self {
            bandgap_ev,
            permittivity,
            electron_mass_ratio,
            hole_mass_ratio,
            donor_density,
            acceptor_density,
            temperature_k,
            doping,
        })
    }

    /// Build a parameter set from a doping-type toggle and a single density.
    ///
    /// The density goes to the dopant matching `doping`; the other dopant is
    /// exactly zero.
    pub fn with_doping(
        doping: DopingType,
        density: f64,
        bandgap_ev: f64,
        permittivity: f64,
        electron_mass_ratio: f64,
        hole_mass_ratio: f64,
        temperature_k: f64,
    ) -> Result<Self, ConfigError> {
        if density.is_nan() || density <= 0.0 {
            return Err(ConfigError::MissingDopant {
                doping,
                expected: match doping {
                    DopingType::N => "donor",
                    DopingType::P => "acceptor",
                },
            });
        }
        let (donor, acceptor) = match doping {
            DopingType::N => (density, 0.0),
            DopingType::P => (0.0, density),
        };
        Self::new(
            bandgap_ev,
            permittivity,
            electron_mass_ratio,
            hole_mass_ratio,
            donor,
            acceptor,
            temperature_k,
        )
    }

    /// Re-check the invariants of a record that did not come through
    /// [`MaterialParameters::new`] (e.g. one deserialised directly).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checked = Self::new(
            self.bandgap_ev,
            self.permittivity,
            self.electron_mass_ratio,
            self.hole_mass_ratio,
            self.donor_density,
            self.acceptor_density,
            self.temperature_k,
        )?;
        if checked.doping != self.doping {
            return Err(ConfigError::MissingDopant {
                doping: self.doping,
                expected: match self.doping {
                    DopingType::N => "donor",
                    DopingType::P => "acceptor",
                },
            });
        }
        Ok(())
    }

    /// Net ionised doping $N_d - N_a$ (m⁻³).
    pub fn net_doping(&self) -> f64 {
        self.donor_density - self.acceptor_density
    }
}

/// Gate / insulator / semiconductor geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceGeometry {
    /// Insulator (or vacuum gap) thickness (m).
    pub insulator_thickness: f64,
    /// Metal work function (eV).
    pub work_function_ev: f64,
    /// Semiconductor electron affinity (eV).
    pub electron_affinity_ev: f64,
}

impl DeviceGeometry {
    pub fn new(
        insulator_thickness: f64,
        work_function_ev: f64,
        electron_affinity_ev: f64,
    ) -> Result<Self, ConfigError> {
        require_positive("insulator thickness", insulator_thickness)?;
        require_finite("work function", work_function_ev)?;
        require_finite("electron affinity", electron_affinity_ev)?;
        Ok(Self {
            insulator_thickness,
            work_function_ev,
            electron_affinity_ev,
        })
    }

    /// Same device with a different insulator thickness.
    pub fn with_thickness(&self, insulator_thickness: f64) -> Result<Self, ConfigError> {
        Self::new(
            insulator_thickness,
            self.work_function_ev,
            self.electron_affinity_ev,
        )
    }
}

/// Qualitative operating state of the MIS capacitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    Accumulation,
    Flatband,
    Depletion,
    Threshold,
    WeakInversion,
    StrongInversion,
}

impl Regime {
    /// Numeric code used in tabular output (1 = accumulation … 6 = strong inversion).
    pub fn code(self) -> u8 {
        match self {
            Regime::Accumulation => 1,
            Regime::Flatband => 2,
            Regime::Depletion => 3,
            Regime::Threshold => 4,
            Regime::WeakInversion => 5,
            Regime::StrongInversion => 6,
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Accumulation => "accumulation",
            Regime::Flatband => "flatband",
            Regime::Depletion => "depletion",
            Regime::Threshold => "threshold",
            Regime::WeakInversion => "weak inversion",
            Regime::StrongInversion => "strong inversion",
        };
        f.write_str(s)
    }
}

/// A solved surface potential and everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    /// Gate bias (V).
    pub bias: f64,
    /// Insulator thickness (m).
    pub insulator_thickness: f64,
    /// Surface potential $V_s$ (V).
    pub surface_potential: f64,
    /// Electric field at the semiconductor surface (V/m).
    pub field: f64,
    /// Surface charge per area (C/m²).
    pub charge: f64,
    /// Force per area between the plates (N/m²); never positive.
    pub force: f64,
    /// Polarization at the surface (C/m²).
    pub polarization: f64,
    /// Insulator capacitance per area (F/m²).
    pub insulator_capacitance: f64,
    pub regime: Regime,
    /// Charge-balance residual at the returned root (V).
    pub residual: f64,
    /// Root-finder iterations.
    pub iterations: usize,
}

fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn require_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { name, value })
    }
}

fn require_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silicon(nd: f64, na: f64) -> Result<MaterialParameters, ConfigError> {
        MaterialParameters::new(1.1, 11.7, 1.08, 0.56, nd, na, 300.0)
    }

    #[test]
    fn test_doping_type_from_densities() {
        assert_eq!(silicon(1e23, 0.0).unwrap().doping, DopingType::N);
        assert_eq!(silicon(0.0, 1e23).unwrap().doping, DopingType::P);
    }

    #[test]
    fn test_mixed_doping_rejected() {
        let err = silicon(1e23, 1e22).unwrap_err();
        assert!(matches!(err, ConfigError::MixedDoping { .. }));
    }

    #[test]
    fn test_undoped_rejected() {
        assert!(silicon(0.0, 0.0).is_err());
    }

    #[test]
    fn test_toggle_assigns_single_dopant() {
        let p = MaterialParameters::with_doping(DopingType::P, 5e22, 1.1, 11.7, 1.0, 1.0, 300.0)
            .unwrap();
        assert_eq!(p.donor_density, 0.0);
        assert_eq!(p.acceptor_density, 5e22);
        assert_eq!(p.net_doping(), -5e22);
    }

    #[test]
    fn test_toggle_requires_density() {
        let err = MaterialParameters::with_doping(DopingType::N, 0.0, 1.1, 11.7, 1.0, 1.0, 300.0)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDopant { .. }));
    }

    #[test]
    fn test_validate_catches_inconsistent_toggle() {
        let mut p = silicon(1e23, 0.0).unwrap();
        assert!(p.validate().is_ok());
        p.doping = DopingType::P;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_bad_scalars_rejected() {
        assert!(MaterialParameters::new(-1.0, 11.7, 1.0, 1.0, 1e22, 0.0, 300.0).is_err());
        assert!(MaterialParameters::new(1.1, 0.5, 1.0, 1.0, 1e22, 0.0, 300.0).is_err());
        assert!(MaterialParameters::new(1.1, 11.7, 1.0, 1.0, 1e22, 0.0, 0.0).is_err());
        assert!(MaterialParameters::new(1.1, 11.7, 1.0, 1.0, f64::NAN, 0.0, 300.0).is_err());
    }

    #[test]
    fn test_geometry_requires_positive_thickness() {
        assert!(DeviceGeometry::new(0.0, 4.1, 3.7).is_err());
        assert!(DeviceGeometry::new(-1e-9, 4.1, 3.7).is_err());
        let g = DeviceGeometry::new(5e-9, 4.1, 3.7).unwrap();
        assert!(g.with_thickness(f64::INFINITY).is_err());
        assert_eq!(g.with_thickness(1e-9).unwrap().insulator_thickness, 1e-9);
    }

    #[test]
    fn test_regime_codes_are_ordered() {
        let all = [
            Regime::Accumulation,
            Regime::Flatband,
            Regime::Depletion,
            Regime::Threshold,
            Regime::WeakInversion,
            Regime::StrongInversion,
        ];
        for (i, r) in all.iter().enumerate() {
            assert_eq!(r.code() as usize, i + 1);
        }
        assert_eq!(Regime::WeakInversion.to_string(), "weak inversion");
    }
}
