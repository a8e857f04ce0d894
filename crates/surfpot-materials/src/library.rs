//! Built-in material and device presets.
//!
//! Values are given the way an experimentalist quotes them: thickness in
//! nm, doping in cm⁻³. The applied bias is scaled by `1 - bias_scale` to
//! account for the part of the gate voltage dropped outside the stack.

use serde::Serialize;
use surfpot_core::constants::{nm_to_m, per_cm3_to_per_m3};
use surfpot_core::types::{DeviceGeometry, DopingType, MaterialParameters};

use crate::provider::{MaterialError, PresetProvider};

/// One named material / device combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialPreset {
    pub name: &'static str,
    pub bias_v: f64,
    /// Fraction of the bias lost outside the stack.
    pub bias_scale: f64,
    pub thickness_nm: f64,
    pub bandgap_ev: f64,
    pub permittivity: f64,
    pub work_function_ev: f64,
    pub electron_affinity_ev: f64,
    pub electron_mass_ratio: f64,
    pub hole_mass_ratio: f64,
    pub doping: DopingType,
    /// Majority dopant density (cm⁻³).
    pub density_cm3: f64,
    pub temperature_k: f64,
}

const SILICON: MaterialPreset = MaterialPreset {
    name: "Si",
    bias_v: 0.0,
    bias_scale: 0.0,
    thickness_nm: 12.0,
    bandgap_ev: 0.7,
    permittivity: 11.7,
    work_function_ev: 4.75,
    electron_affinity_ev: 4.05,
    electron_mass_ratio: 1.08,
    hole_mass_ratio: 0.56,
    doping: DopingType::N,
    density_cm3: 5.0e17,
    temperature_k: 300.0,
};

const FIGURE: MaterialPreset = MaterialPreset {
    name: "Figure",
    bias_v: 0.0,
    bias_scale: 0.0,
    thickness_nm: 1.0,
    bandgap_ev: 1.0,
    permittivity: 1.0,
    work_function_ev: 1.3,
    electron_affinity_ev: 0.8,
    electron_mass_ratio: 1.0,
    hole_mass_ratio: 1.0,
    doping: DopingType::N,
    density_cm3: 1.0e18,
    temperature_k: 300.0,
};

static PRESETS: [MaterialPreset; 9] = [
    MaterialPreset {
        name: "MoSe2",
        bias_v: -1.4,
        bias_scale: 0.05,
        thickness_nm: 9.0,
        bandgap_ev: 0.8,
        permittivity: 7.5,
        work_function_ev: 4.10,
        electron_affinity_ev: 3.72,
        electron_mass_ratio: 1.0,
        hole_mass_ratio: 1.0,
        doping: DopingType::N,
        density_cm3: 4.9e17,
        temperature_k: 300.0,
    },
    MaterialPreset {
        name: "Si_A",
        ..SILICON
    },
    MaterialPreset {
        name: "Si_B",
        density_cm3: 2.0e17,
        ..SILICON
    },
    MaterialPreset {
        name: "Si_C",
        density_cm3: 7.8e15,
        ..SILICON
    },
    MaterialPreset {
        name: "Si_D",
        thickness_nm: 17.5,
        bandgap_ev: 1.1,
        work_function_ev: 5.22,
        electron_affinity_ev: 4.5,
        density_cm3: 1.5e17,
        ..SILICON
    },
    MaterialPreset {
        name: "Si_E",
        thickness_nm: 17.5,
        bandgap_ev: 1.1,
        work_function_ev: 5.22,
        electron_affinity_ev: 4.5,
        density_cm3: 0.0,
        ..SILICON
    },
    MaterialPreset {
        name: "Pentacene",
        bias_v: 0.0,
        bias_scale: 0.6,
        thickness_nm: 9.1,
        bandgap_ev: 2.2,
        permittivity: 5.0,
        work_function_ev: 4.75,
        electron_affinity_ev: 2.88,
        electron_mass_ratio: 1.0,
        hole_mass_ratio: 1.0,
        doping: DopingType::P,
        density_cm3: 5.5e16,
        temperature_k: 300.0,
    },
    MaterialPreset {
        name: "Figure_ntype",
        ..FIGURE
    },
    MaterialPreset {
        name: "Figure_ptype",
        doping: DopingType::P,
        ..FIGURE
    },
];

/// Every built-in material preset, in display order.
pub fn material_presets() -> &'static [MaterialPreset] {
    &PRESETS
}

/// Case-insensitive preset lookup.
pub fn find_material(name: &str) -> Result<&'static MaterialPreset, MaterialError> {
    PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| MaterialError::NotFound {
            name: name.to_string(),
            available: PRESETS.iter().map(|p| p.name).collect::<Vec<_>>().join(", "),
        })
}

impl MaterialPreset {
    fn invalid(&self, source: surfpot_core::types::ConfigError) -> MaterialError {
        MaterialError::Invalid {
            name: self.name.to_string(),
            source,
        }
    }
}

impl PresetProvider for MaterialPreset {
    fn name(&self) -> &str {
        self.name
    }

    fn material(&self) -> Result<MaterialParameters, MaterialError> {
        MaterialParameters::with_doping(
            self.doping,
            per_cm3_to_per_m3(self.density_cm3),
            self.bandgap_ev,
            self.permittivity,
            self.electron_mass_ratio,
            self.hole_mass_ratio,
            self.temperature_k,
        )
        .map_err(|e| self.invalid(e))
    }

    fn geometry(&self) -> Result<DeviceGeometry, MaterialError> {
        DeviceGeometry::new(
            nm_to_m(self.thickness_nm),
            self.work_function_ev,
            self.electron_affinity_ev,
        )
        .map_err(|e| self.invalid(e))
    }

    fn effective_bias(&self) -> f64 {
        self.bias_v * (1.0 - self.bias_scale)
    }
}
