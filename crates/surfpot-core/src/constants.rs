//! Physical constants (CODATA 2018, SI).

/// Boltzmann constant (J/K).
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Reduced Planck constant ħ (J·s).
pub const HBAR: f64 = 1.054_571_817e-34;

/// Electron rest mass (kg).
pub const ELECTRON_MASS: f64 = 9.109_383_701_5e-31;

/// Elementary charge (C).
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Vacuum permittivity ε₀ (F/m).
pub const VACUUM_PERMITTIVITY: f64 = 8.854_187_812_8e-12;

/// Thermal voltage $k_B T / e$ in volts.
#[inline]
pub fn thermal_voltage(temperature_k: f64) -> f64 {
    BOLTZMANN * temperature_k / ELEMENTARY_CHARGE
}

/// Convert a density from cm⁻³ to m⁻³.
#[inline]
pub fn per_cm3_to_per_m3(density_cm3: f64) -> f64 {
    density_cm3 * 1e6
}

/// Convert a length from nanometres to metres.
#[inline]
pub fn nm_to_m(length_nm: f64) -> f64 {
    length_nm * 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_temperature_thermal_voltage() {
        let vt = thermal_voltage(300.0);
        assert!((vt - 0.025_852).abs() < 1e-6, "kT/e at 300 K = {vt}");
    }
}
