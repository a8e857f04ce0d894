//! Job runner: ties together presets, bulk state, solver and sweeps.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use surfpot_compute::{AnyBackend, ComputeBackend};
use surfpot_core::afm::{evaluate_probe, ProbeResult, ProbeSweep};
use surfpot_core::bulk::BulkState;
use surfpot_core::constants::nm_to_m;
use surfpot_core::profile::{band_bending_profile, BandProfile};
use surfpot_core::solver::{ElectrostaticSolver, SurfacePotentialSolver};
use surfpot_core::sweep::{SweepEngine, SweepKind, SweepResult};
use surfpot_core::types::OperatingPoint;

use crate::config::{JobConfig, Stack};

/// Everything computed for one job.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub stack: Stack,
    pub bulk: BulkState,
    pub point: OperatingPoint,
    pub bias_sweep: Option<SweepResult>,
    pub thickness_sweep: Option<SweepResult>,
    pub profile: Option<BandProfile>,
    pub probe: Option<ProbeResult>,
    pub probe_sweep: Option<ProbeSweep>,
}

/// Run a full job from a parsed configuration.
pub fn run_job(job: &JobConfig) -> Result<RunOutput> {
    let stack = job.stack()?;
    let settings = job.solver.root_settings();
    let thickness = stack.geometry.insulator_thickness;

    let bulk = BulkState::compute(&stack.material, &stack.geometry, &settings)
        .with_context(|| format!("bulk state for '{}'", stack.name))?;
    println!(
        "Material: {} ({}), CPD = {:.4} V, n_i = {:.3e} m^-3, L_D = {:.3} nm",
        stack.name,
        bulk.doping(),
        bulk.contact_potential,
        bulk.intrinsic_density,
        bulk.screening_length * 1e9
    );

    let backend = AnyBackend::from_preference(&job.solver.backend, job.solver.threads)?;
    println!("Backend: {}", backend.device_info().name);

    let solver = SurfacePotentialSolver::with_settings(bulk.clone(), settings);
    let point = solver
        .solve(stack.bias, thickness)
        .with_context(|| format!("solving at Vg = {} V, z = {:.3e} m", stack.bias, thickness))?;
    print_point_summary(&point);

    let engine = SweepEngine::new(solver, backend);

    let (bias_sweep, thickness_sweep) = if job.sweep.enabled {
        let by_bias = engine.bias_sweep(&job.bias_axis(), thickness);
        let by_thickness = engine.thickness_sweep(stack.bias, &job.thickness_axis());
        for sweep in [&by_bias, &by_thickness] {
            println!(
                "  {:?} sweep: {} points, {} failed",
                sweep.kind,
                sweep.len(),
                sweep.failures()
            );
        }
        (Some(by_bias), Some(by_thickness))
    } else {
        (None, None)
    };

    let profile = if job.profile.enabled {
        let profile = band_bending_profile(&bulk, point.surface_potential, &job.profile.settings())?;
        println!(
            "  Band profile: {} samples to {:.2} nm, integrated charge {:.4e} C/m^2",
            profile.samples.len(),
            profile.depth() * 1e9,
            profile.total_charge()
        );
        Some(profile)
    } else {
        None
    };

    let (probe, probe_sweep) = match &job.probe {
        Some(probe_config) => {
            let probe_settings = probe_config.settings()?;
            let setpoint = probe_config.setpoint_nm.map_or(thickness, nm_to_m);
            let probe = match evaluate_probe(engine.solver(), stack.bias, setpoint, &probe_settings) {
                Ok(result) => {
                    println!(
                        "  Probe: df = {:.4} Hz, dg = {:.4e} N, E_d = {:.4e} J, excitation change = {:.4e}",
                        result.frequency_shift,
                        result.damping_shift,
                        result.dissipated_energy,
                        result.excitation_change
                    );
                    Some(result)
                }
                Err(e) => {
                    eprintln!("Warning: probe evaluation at the operating point failed: {}", e);
                    None
                }
            };
            let sweep = job
                .sweep
                .enabled
                .then(|| engine.afm_bias_sweep(&job.bias_axis(), setpoint, &probe_settings));
            (probe, sweep)
        }
        None => (None, None),
    };

    Ok(RunOutput {
        stack,
        bulk,
        point,
        bias_sweep,
        thickness_sweep,
        profile,
        probe,
        probe_sweep,
    })
}

fn print_point_summary(point: &OperatingPoint) {
    println!("Operating point:");
    println!("  Vg       = {:.4} V", point.bias);
    println!("  z_ins    = {:.3} nm", point.insulator_thickness * 1e9);
    println!("  Vs       = {:.6} V ({} iterations)", point.surface_potential, point.iterations);
    println!("  E        = {:.4e} V/m", point.field);
    println!("  Qs       = {:.4e} C/m^2", point.charge);
    println!("  F        = {:.4e} N/m^2", point.force);
    println!("  P        = {:.4e} C/m^2", point.polarization);
    println!("  C_ins    = {:.4e} F/m^2", point.insulator_capacitance);
    println!("  Regime   = {}", point.regime);
}

fn create_file(path: &Path) -> Result<std::io::BufWriter<std::fs::File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(std::io::BufWriter::new(file))
}

/// Write a bias or thickness sweep to CSV with a metadata header.
pub fn write_sweep_csv(sweep: &SweepResult, stack: &Stack, path: &Path) -> Result<()> {
    let mut file = create_file(path)?;

    writeln!(file, "# Surfpot surface-potential sweep")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# material: {}", stack.name)?;
    let (axis_name, axis_scale) = match sweep.kind {
        SweepKind::Bias => {
            writeln!(file, "# insulator_thickness_nm: {}", sweep.fixed * 1e9)?;
            ("bias_v", 1.0)
        }
        SweepKind::Thickness | SweepKind::Trajectory => {
            writeln!(file, "# bias_v: {}", sweep.fixed)?;
            ("thickness_nm", 1e9)
        }
    };
    writeln!(file, "#")?;
    writeln!(
        file,
        "{axis_name},surface_potential_v,field_v_per_m,charge_c_per_m2,force_n_per_m2,polarization_c_per_m2,diff_capacitance_f_per_m2,regime"
    )?;

    let capacitance = sweep.differential_capacitance();
    for (i, point) in sweep.points.iter().enumerate() {
        let axis = sweep.values[i] * axis_scale;
        match point {
            Ok(p) => writeln!(
                file,
                "{:.6},{:.8e},{:.6e},{:.6e},{:.6e},{:.6e},{:.6e},{}",
                axis,
                p.surface_potential,
                p.field,
                p.charge,
                p.force,
                p.polarization,
                capacitance[i],
                p.regime.code()
            )?,
            Err(_) => writeln!(file, "{axis:.6},NaN,NaN,NaN,NaN,NaN,NaN,NaN")?,
        }
    }

    println!("Sweep written to: {}", path.display());
    Ok(())
}

/// Write the band-bending profile to CSV.
pub fn write_profile_csv(profile: &BandProfile, bulk: &BulkState, path: &Path) -> Result<()> {
    let mut file = create_file(path)?;
    writeln!(file, "# Surfpot band-bending profile")?;
    writeln!(file, "# surface_potential_v: {}", profile.surface_potential)?;
    writeln!(file, "#")?;
    writeln!(
        file,
        "depth_nm,potential_v,field_v_per_m,charge_density_c_per_m3,ec_ev,ev_ev,ei_ev,ef_ev"
    )?;

    for (sample, edges) in profile.samples.iter().zip(profile.band_edges(bulk)) {
        writeln!(
            file,
            "{:.6},{:.8e},{:.6e},{:.6e},{:.6},{:.6},{:.6},{:.6}",
            sample.depth * 1e9,
            sample.potential,
            sample.field,
            sample.charge_density,
            edges.conduction,
            edges.valence,
            edges.intrinsic,
            edges.fermi
        )?;
    }

    println!("Profile written to: {}", path.display());
    Ok(())
}

/// Write the probe bias sweep to CSV.
pub fn write_probe_csv(sweep: &ProbeSweep, path: &Path) -> Result<()> {
    let mut file = create_file(path)?;
    writeln!(file, "# Surfpot dynamic-probe bias sweep")?;
    writeln!(file, "#")?;
    writeln!(
        file,
        "bias_v,surface_potential_v,force_n,cantilever_force_n,polarization_swing_c_per_m2,frequency_shift_hz,damping_shift_n,dissipated_energy_j,excitation_change"
    )?;

    for (bias, result) in sweep.values.iter().zip(&sweep.results) {
        match result {
            Ok(r) => writeln!(
                file,
                "{:.6},{:.8e},{:.6e},{:.6e},{:.6e},{:.6e},{:.6e},{:.6e},{:.6e}",
                bias,
                r.surface_potential,
                r.force,
                r.cantilever_force.unwrap_or(0.0),
                r.polarization_swing,
                r.frequency_shift,
                r.damping_shift,
                r.dissipated_energy,
                r.excitation_change
            )?,
            Err(_) => writeln!(file, "{bias:.6},NaN,NaN,NaN,NaN,NaN,NaN,NaN,NaN")?,
        }
    }

    println!("Probe sweep written to: {}", path.display());
    Ok(())
}

/// Write the whole run to a JSON file.
pub fn write_json(output: &RunOutput, path: &Path) -> Result<()> {
    let mut file = create_file(path)?;
    serde_json::to_writer_pretty(&mut file, output)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    file.flush()?;

    println!("Results (JSON) written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const JOB: &str = r#"
[material]
preset = "MoSe2"

[sweep]
bias = { range = [-2.0, 2.0], points = 9 }
thickness_nm = { values = [1.0, 5.0, 9.0] }

[solver]
backend = "serial"

[probe]
preset = "MoSe2"
"#;

    #[test]
    fn test_run_job_end_to_end() {
        let job = parse_config(JOB).unwrap();
        let output = run_job(&job).unwrap();
        assert_eq!(output.point.regime.to_string(), "depletion");
        assert_eq!(output.bias_sweep.as_ref().unwrap().len(), 9);
        assert_eq!(output.thickness_sweep.as_ref().unwrap().failures(), 0);
        assert!(output.profile.as_ref().unwrap().samples.len() > 1);
        assert!(output.probe.as_ref().unwrap().frequency_shift < 0.0);
        assert_eq!(output.probe_sweep.as_ref().unwrap().results.len(), 9);
    }

    #[test]
    fn test_writers_produce_files() {
        let job = parse_config(JOB).unwrap();
        let output = run_job(&job).unwrap();
        let dir = std::env::temp_dir().join(format!("surfpot-cli-test-{}", std::process::id()));

        let sweep_path = dir.join("bias_sweep.csv");
        write_sweep_csv(output.bias_sweep.as_ref().unwrap(), &output.stack, &sweep_path).unwrap();
        let csv = std::fs::read_to_string(&sweep_path).unwrap();
        let rows: Vec<&str> = csv.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows.len(), 10);
        assert!(rows[0].starts_with("bias_v,surface_potential_v"));

        let profile_path = dir.join("profile.csv");
        write_profile_csv(output.profile.as_ref().unwrap(), &output.bulk, &profile_path).unwrap();
        assert!(std::fs::read_to_string(&profile_path).unwrap().contains("ec_ev"));

        let probe_path = dir.join("probe_sweep.csv");
        write_probe_csv(output.probe_sweep.as_ref().unwrap(), &probe_path).unwrap();
        let csv = std::fs::read_to_string(&probe_path).unwrap();
        let rows: Vec<&str> = csv.lines().filter(|l| !l.starts_with('#')).collect();
        assert!(rows[0].contains("frequency_shift_hz,damping_shift_n"));
        assert!(rows.iter().all(|r| r.split(',').count() == 9));

        let json_path = dir.join("result.json");
        write_json(&output, &json_path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["stack"]["name"], "MoSe2");
        assert!(value["probe"]["damping_shift"].is_number());

        std::fs::remove_dir_all(&dir).ok();
    }
}
