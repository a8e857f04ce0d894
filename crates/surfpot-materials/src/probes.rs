//! Dynamic-probe (ncAFM) presets.

use serde::Serialize;
use surfpot_core::afm::{ProbeGeometry, ProbeSettings};

use crate::provider::MaterialError;

/// Cantilever and oscillation parameters in instrument units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbePreset {
    pub name: &'static str,
    pub timesteps: usize,
    pub amplitude_nm: f64,
    pub resonance_frequency_hz: f64,
    pub lag_ns: f64,
    /// N/m
    pub spring_constant: f64,
    pub tip_radius_nm: f64,
    pub cantilever_height_um: f64,
    pub cantilever_area_um2: f64,
    pub quality_factor: f64,
    pub geometry: ProbeGeometry,
}

static PROBES: [ProbePreset; 3] = [
    ProbePreset {
        name: "Figure",
        timesteps: 30,
        amplitude_nm: 6.0,
        resonance_frequency_hz: 300e3,
        lag_ns: 0.0,
        spring_constant: 42.0,
        tip_radius_nm: 1.5,
        cantilever_height_um: 5.0,
        cantilever_area_um2: 3750.0,
        quality_factor: 18_000.0,
        geometry: ProbeGeometry::Tip,
    },
    ProbePreset {
        name: "Silicon_A",
        timesteps: 30,
        amplitude_nm: 6.0,
        resonance_frequency_hz: 310e3,
        lag_ns: 100.0,
        spring_constant: 42.0,
        tip_radius_nm: 5.0,
        cantilever_height_um: 6.0,
        cantilever_area_um2: 2900.0,
        quality_factor: 18_000.0,
        geometry: ProbeGeometry::TipAndCantilever,
    },
    ProbePreset {
        name: "MoSe2",
        timesteps: 30,
        amplitude_nm: 6.0,
        resonance_frequency_hz: 330e3,
        lag_ns: 100.0,
        spring_constant: 42.0,
        tip_radius_nm: 5.0,
        cantilever_height_um: 6.0,
        cantilever_area_um2: 2900.0,
        quality_factor: 18_000.0,
        geometry: ProbeGeometry::TipAndCantilever,
    },
];

pub fn probe_presets() -> &'static [ProbePreset] {
    &PROBES
}

/// Case-insensitive probe preset lookup.
pub fn find_probe(name: &str) -> Result<&'static ProbePreset, MaterialError> {
    PROBES
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| MaterialError::NotFound {
            name: name.to_string(),
            available: PROBES.iter().map(|p| p.name).collect::<Vec<_>>().join(", "),
        })
}

impl ProbePreset {
    /// Convert to SI probe settings.
    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            timesteps: self.timesteps,
            amplitude: self.amplitude_nm * 1e-9,
            resonance_frequency: self.resonance_frequency_hz,
            spring_constant: self.spring_constant,
            quality_factor: self.quality_factor,
            time_lag: self.lag_ns * 1e-9,
            tip_radius: self.tip_radius_nm * 1e-9,
            cantilever_height: self.cantilever_height_um * 1e-6,
            cantilever_area: self.cantilever_area_um2 * 1e-12,
            geometry: self.geometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_presets_validate() {
        for preset in probe_presets() {
            preset.settings().validate().unwrap();
        }
    }

    #[test]
    fn test_silicon_probe_units() {
        let settings = find_probe("silicon_a").unwrap().settings();
        assert!((settings.amplitude - 6e-9).abs() < 1e-21);
        assert!((settings.cantilever_area - 2.9e-9).abs() < 1e-21);
        assert!((settings.phase_lag() - 2.0 * std::f64::consts::PI * 310e3 * 100e-9).abs() < 1e-12);
        assert_eq!(settings.geometry, ProbeGeometry::TipAndCantilever);
    }

    #[test]
    fn test_unknown_probe() {
        assert!(matches!(
            find_probe("diamond"),
            Err(MaterialError::NotFound { .. })
        ));
    }
}
