//! Surfpot command-line interface.
//!
//! Run surface-potential jobs from TOML configuration files:
//! ```sh
//! surfpot-cli run job.toml
//! surfpot-cli validate job.toml
//! surfpot-cli presets
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use surfpot_materials::{material_presets, probe_presets};

#[derive(Parser)]
#[command(name = "surfpot-cli")]
#[command(about = "Surfpot: MIS surface potential and tip-sample force solver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without solving.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the built-in material and probe presets.
    Presets,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Surfpot Surface-Potential Solver");
            println!("================================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_job(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_csv {
                if let Some(sweep) = &result.bias_sweep {
                    runner::write_sweep_csv(sweep, &result.stack, &out_dir.join("bias_sweep.csv"))?;
                }
                if let Some(sweep) = &result.thickness_sweep {
                    runner::write_sweep_csv(
                        sweep,
                        &result.stack,
                        &out_dir.join("thickness_sweep.csv"),
                    )?;
                }
                if let Some(profile) = &result.profile {
                    runner::write_profile_csv(profile, &result.bulk, &out_dir.join("profile.csv"))?;
                }
                if let Some(sweep) = &result.probe_sweep {
                    runner::write_probe_csv(sweep, &out_dir.join("afm_bias_sweep.csv"))?;
                }
            }

            if job.output.save_json {
                runner::write_json(&result, &out_dir.join("result.json"))?;
            }

            println!("Run complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let stack = job.stack()?;
            println!("Configuration is valid: {}", config.display());
            println!(
                "  {} at Vg = {:.4} V, z = {:.3} nm",
                stack.name,
                stack.bias,
                stack.geometry.insulator_thickness * 1e9
            );
            Ok(())
        }
        Commands::Presets => {
            println!("Material presets:");
            println!();
            for p in material_presets() {
                println!(
                    "  {:<13} {} {:.1e} cm^-3, Eg={} eV, eps={}, z={} nm, Vg={} V (scale {})",
                    p.name,
                    p.doping,
                    p.density_cm3,
                    p.bandgap_ev,
                    p.permittivity,
                    p.thickness_nm,
                    p.bias_v,
                    p.bias_scale
                );
            }
            println!();
            println!("Probe presets:");
            println!();
            for p in probe_presets() {
                println!(
                    "  {:<13} A={} nm, f0={} kHz, k={} N/m, Q={}, lag={} ns, {:?}",
                    p.name,
                    p.amplitude_nm,
                    p.resonance_frequency_hz / 1e3,
                    p.spring_constant,
                    p.quality_factor,
                    p.lag_ns,
                    p.geometry
                );
            }
            Ok(())
        }
    }
}
