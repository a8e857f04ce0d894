//! TOML configuration deserialisation for surface-potential jobs.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use surfpot_core::afm::{ProbeGeometry, ProbeSettings};
use surfpot_core::constants::{nm_to_m, per_cm3_to_per_m3};
use surfpot_core::profile::ProfileSettings;
use surfpot_core::solver::roots::RootSettings;
use surfpot_core::sweep::{default_bias_axis, default_thickness_axis, linspace};
use surfpot_core::types::{DeviceGeometry, DopingType, MaterialParameters};
use surfpot_materials::{find_material, find_probe, PresetProvider};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub material: MaterialConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    pub probe: Option<ProbeConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Semiconductor description: a named preset or explicit values.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MaterialConfig {
    Preset {
        preset: String,
    },
    Explicit {
        bandgap_ev: f64,
        permittivity: f64,
        doping: DopingType,
        /// Majority dopant density (cm⁻³).
        density_cm3: f64,
        #[serde(default = "default_mass_ratio")]
        electron_mass_ratio: f64,
        #[serde(default = "default_mass_ratio")]
        hole_mass_ratio: f64,
        #[serde(default = "default_temperature")]
        temperature_k: f64,
    },
}

fn default_mass_ratio() -> f64 {
    1.0
}
fn default_temperature() -> f64 {
    300.0
}

/// Gate/insulator settings. With a preset every field is an optional
/// override; with explicit material values the thickness, work function and
/// electron affinity are required.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceConfig {
    pub bias_v: Option<f64>,
    /// Fraction of the bias lost outside the stack.
    pub bias_scale: Option<f64>,
    pub thickness_nm: Option<f64>,
    pub work_function_ev: Option<f64>,
    pub electron_affinity_ev: Option<f64>,
}

/// Sweep axes; an absent axis uses the built-in default grid.
#[derive(Debug, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Gate bias axis (V).
    pub bias: Option<AxisSpec>,
    /// Insulator thickness axis (nm).
    pub thickness_nm: Option<AxisSpec>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bias: None,
            thickness_nm: None,
        }
    }
}

/// Axis specification: either a range or explicit list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    Range { range: [f64; 2], points: usize },
    List { values: Vec<f64> },
}

impl AxisSpec {
    pub fn values(&self) -> Vec<f64> {
        match self {
            AxisSpec::Range { range, points } => linspace(range[0], range[1], *points).to_vec(),
            AxisSpec::List { values } => values.clone(),
        }
    }
}

/// Root-finder and scheduling settings.
#[derive(Debug, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_x_tolerance")]
    pub x_tolerance: f64,
    #[serde(default = "default_residual_tolerance")]
    pub residual_tolerance: f64,
    /// Compute backend: "auto", "cpu", or "serial". Default: "auto".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Worker threads for the CPU backend; 0 uses every core.
    #[serde(default)]
    pub threads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            x_tolerance: default_x_tolerance(),
            residual_tolerance: default_residual_tolerance(),
            backend: default_backend(),
            threads: 0,
        }
    }
}

fn default_max_iterations() -> usize {
    RootSettings::default().max_iterations
}
fn default_x_tolerance() -> f64 {
    RootSettings::default().x_tolerance
}
fn default_residual_tolerance() -> f64 {
    RootSettings::default().residual_tolerance
}
fn default_backend() -> String {
    "auto".into()
}

impl SolverConfig {
    pub fn root_settings(&self) -> RootSettings {
        RootSettings {
            max_iterations: self.max_iterations,
            x_tolerance: self.x_tolerance,
            residual_tolerance: self.residual_tolerance,
        }
    }
}

/// Band-bending profile settings.
#[derive(Debug, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_step_fraction")]
    pub step_fraction: f64,
    #[serde(default = "default_decay_fraction")]
    pub decay_fraction: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step_fraction: default_step_fraction(),
            decay_fraction: default_decay_fraction(),
        }
    }
}

fn default_step_fraction() -> f64 {
    ProfileSettings::default().step_fraction
}
fn default_decay_fraction() -> f64 {
    ProfileSettings::default().decay_fraction
}

impl ProfileConfig {
    pub fn settings(&self) -> ProfileSettings {
        ProfileSettings {
            step_fraction: self.step_fraction,
            decay_fraction: self.decay_fraction,
            ..ProfileSettings::default()
        }
    }
}

/// Dynamic-probe section: a preset, explicit values, or a preset with
/// overrides. Instrument units (nm, µm, µm², ns).
#[derive(Debug, Default, Deserialize)]
pub struct ProbeConfig {
    pub preset: Option<String>,
    /// Lower turning-point gap (nm); defaults to the device thickness.
    pub setpoint_nm: Option<f64>,
    pub timesteps: Option<usize>,
    pub amplitude_nm: Option<f64>,
    pub resonance_frequency_hz: Option<f64>,
    pub lag_ns: Option<f64>,
    pub spring_constant: Option<f64>,
    pub tip_radius_nm: Option<f64>,
    pub cantilever_height_um: Option<f64>,
    pub cantilever_area_um2: Option<f64>,
    pub quality_factor: Option<f64>,
    pub geometry: Option<ProbeGeometry>,
}

impl ProbeConfig {
    /// Resolve to SI probe settings, validated.
    pub fn settings(&self) -> Result<ProbeSettings> {
        let base = match &self.preset {
            Some(name) => Some(find_probe(name)?.settings()),
            None => None,
        };
        let pick = |value: Option<f64>, scale: f64, preset: Option<f64>, name: &str| -> Result<f64> {
            match (value, preset) {
                (Some(v), _) => Ok(v * scale),
                (None, Some(p)) => Ok(p),
                (None, None) => bail!("probe: '{name}' is required without a preset"),
            }
        };
        let b = base.as_ref();
        let settings = ProbeSettings {
            timesteps: match (self.timesteps, b) {
                (Some(n), _) => n,
                (None, Some(b)) => b.timesteps,
                (None, None) => bail!("probe: 'timesteps' is required without a preset"),
            },
            amplitude: pick(self.amplitude_nm, 1e-9, b.map(|b| b.amplitude), "amplitude_nm")?,
            resonance_frequency: pick(
                self.resonance_frequency_hz,
                1.0,
                b.map(|b| b.resonance_frequency),
                "resonance_frequency_hz",
            )?,
            spring_constant: pick(
                self.spring_constant,
                1.0,
                b.map(|b| b.spring_constant),
                "spring_constant",
            )?,
            quality_factor: pick(
                self.quality_factor,
                1.0,
                b.map(|b| b.quality_factor),
                "quality_factor",
            )?,
            time_lag: pick(self.lag_ns, 1e-9, Some(b.map_or(0.0, |b| b.time_lag)), "lag_ns")?,
            tip_radius: pick(self.tip_radius_nm, 1e-9, b.map(|b| b.tip_radius), "tip_radius_nm")?,
            cantilever_height: pick(
                self.cantilever_height_um,
                1e-6,
                Some(b.map_or(0.0, |b| b.cantilever_height)),
                "cantilever_height_um",
            )?,
            cantilever_area: pick(
                self.cantilever_area_um2,
                1e-12,
                Some(b.map_or(0.0, |b| b.cantilever_area)),
                "cantilever_area_um2",
            )?,
            geometry: self
                .geometry
                .or(b.map(|b| b.geometry))
                .unwrap_or(ProbeGeometry::Tip),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save sweeps and profile as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Whether to also save everything as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_csv: true,
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// A fully resolved MIS stack ready for the solver.
#[derive(Debug, Clone, Serialize)]
pub struct Stack {
    pub name: String,
    pub material: MaterialParameters,
    pub geometry: DeviceGeometry,
    /// Effective gate bias (V), after bias scaling.
    pub bias: f64,
}

impl JobConfig {
    /// Combine the material section with the device overrides.
    pub fn stack(&self) -> Result<Stack> {
        let device = &self.device;
        let (name, material, thickness_nm, wf, ea, bias_v, scale) = match &self.material {
            MaterialConfig::Preset { preset } => {
                let p = find_material(preset)?;
                (
                    p.name.to_string(),
                    p.material()?,
                    device.thickness_nm.unwrap_or(p.thickness_nm),
                    device.work_function_ev.unwrap_or(p.work_function_ev),
                    device.electron_affinity_ev.unwrap_or(p.electron_affinity_ev),
                    device.bias_v.unwrap_or(p.bias_v),
                    device.bias_scale.unwrap_or(p.bias_scale),
                )
            }
            MaterialConfig::Explicit {
                bandgap_ev,
                permittivity,
                doping,
                density_cm3,
                electron_mass_ratio,
                hole_mass_ratio,
                temperature_k,
            } => {
                let material = MaterialParameters::with_doping(
                    *doping,
                    per_cm3_to_per_m3(*density_cm3),
                    *bandgap_ev,
                    *permittivity,
                    *electron_mass_ratio,
                    *hole_mass_ratio,
                    *temperature_k,
                )
                .context("invalid [material] section")?;
                (
                    "custom".to_string(),
                    material,
                    device
                        .thickness_nm
                        .context("[device] thickness_nm is required for an explicit material")?,
                    device
                        .work_function_ev
                        .context("[device] work_function_ev is required for an explicit material")?,
                    device.electron_affinity_ev.context(
                        "[device] electron_affinity_ev is required for an explicit material",
                    )?,
                    device.bias_v.unwrap_or(0.0),
                    device.bias_scale.unwrap_or(0.0),
                )
            }
        };

        if !(0.0..1.0).contains(&scale) {
            bail!("[device] bias_scale must be in [0, 1), got {scale}");
        }
        let geometry =
            DeviceGeometry::new(nm_to_m(thickness_nm), wf, ea).context("invalid [device] section")?;
        Ok(Stack {
            name,
            material,
            geometry,
            bias: bias_v * (1.0 - scale),
        })
    }

    /// Bias axis (V) for the bias sweep.
    pub fn bias_axis(&self) -> Vec<f64> {
        self.sweep
            .bias
            .as_ref()
            .map_or_else(|| default_bias_axis().to_vec(), AxisSpec::values)
    }

    /// Thickness axis (m) for the thickness sweep.
    pub fn thickness_axis(&self) -> Vec<f64> {
        self.sweep.thickness_nm.as_ref().map_or_else(
            || default_thickness_axis().to_vec(),
            |axis| axis.values().into_iter().map(nm_to_m).collect(),
        )
    }

    /// Check everything that can be checked without solving.
    pub fn validate(&self) -> Result<()> {
        self.stack()?;
        if !matches!(self.solver.backend.as_str(), "auto" | "cpu" | "serial") {
            bail!(
                "Unknown backend '{}'. Valid values: auto, cpu, serial",
                self.solver.backend
            );
        }
        if self.solver.max_iterations == 0 {
            bail!("[solver] max_iterations must be at least 1");
        }
        if self.sweep.enabled {
            for (name, axis) in [("bias", &self.sweep.bias), ("thickness_nm", &self.sweep.thickness_nm)] {
                if let Some(AxisSpec::Range { points, .. }) = axis {
                    if *points < 2 {
                        bail!("[sweep] {name} range needs at least 2 points");
                    }
                }
            }
            if self.thickness_axis().iter().any(|&z| z.is_nan() || z <= 0.0) {
                bail!("[sweep] thickness values must be positive");
            }
        }
        if self.profile.enabled {
            self.profile.settings().validate()?;
        }
        if let Some(probe) = &self.probe {
            probe.settings()?;
        }
        Ok(())
    }
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Parse and validate a TOML job configuration string.
pub fn parse_config(content: &str) -> Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}
