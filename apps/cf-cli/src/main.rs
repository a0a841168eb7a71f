use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use cf_daq::{EmulatedAdc, SampleSource};
use cf_pipeline::{Coordinator, CycleResult, spawn};
use cf_project::{FlowConfig, Project, RigParts, build_coordinator_parts};
use cf_sense::synthesize_code;

#[derive(Parser)]
#[command(name = "cf-cli")]
#[command(about = "caloflux CLI - heat balance calorimetry pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a rig file's syntax and cross-references
    Validate {
        /// Path to the rig YAML file
        rig_path: PathBuf,
    },
    /// Write an example rig file
    Init {
        /// Destination path for the rig YAML file
        rig_path: PathBuf,
    },
    /// Run the pipeline against an emulated bench rig
    Run {
        /// Path to the rig YAML file
        rig_path: PathBuf,
        /// Number of cycles to acquire
        #[arg(long, default_value_t = 32)]
        cycles: u64,
        /// Synthetic per-stage temperature rise in millikelvin
        #[arg(long, default_value_t = 50.0)]
        stage_rise_mk: f64,
        /// Coolant temperature entering the first stage, in degrees Celsius
        #[arg(long, default_value_t = 20.0)]
        inlet_c: f64,
        /// Print each cycle as a JSON record instead of a summary line
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { rig_path } => cmd_validate(&rig_path),
        Commands::Init { rig_path } => cmd_init(&rig_path),
        Commands::Run {
            rig_path,
            cycles,
            stage_rise_mk,
            inlet_c,
            json,
        } => cmd_run(&rig_path, cycles, stage_rise_mk, inlet_c, json),
    }
}

fn cmd_validate(rig_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating rig: {}", rig_path.display());
    let project = cf_project::load_yaml(rig_path)?;
    println!(
        "✓ Rig is valid ({} channels, {} stages)",
        project.channels.len(),
        project.stages.len()
    );
    Ok(())
}

fn cmd_init(rig_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    cf_project::save_yaml(rig_path, &Project::example())?;
    println!("✓ Wrote example rig to {}", rig_path.display());
    Ok(())
}

fn cmd_run(
    rig_path: &Path,
    cycles: u64,
    stage_rise_mk: f64,
    inlet_c: f64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let project = cf_project::load_yaml(rig_path)?;
    let parts = build_coordinator_parts(&project)?;

    println!(
        "Session started {} ({} stages, {:.1} Hz)",
        chrono::Local::now().to_rfc3339(),
        parts.stages.len(),
        parts.pipeline.cycle_rate_hz
    );

    let devices = emulated_devices(&project, &parts, stage_rise_mk, inlet_c);
    let source = SampleSource::new(devices, parts.channels.clone(), parts.source)?;
    let coordinator = Coordinator::new(
        source,
        parts.calibrations.clone(),
        parts.stages.clone(),
        parts.pipeline.clone(),
    )?;
    let handle = spawn(coordinator);

    let mut received = 0_u64;
    while received < cycles {
        match handle.bus.recv_timeout(Duration::from_secs(10)) {
            Some(result) => {
                received += 1;
                if json {
                    println!("{}", serde_json::to_string(&result)?);
                } else {
                    print_cycle(&result);
                }
            }
            None => {
                eprintln!("no result within 10 s, stopping");
                break;
            }
        }
    }

    let health = handle.health.snapshot();
    let lost = handle.bus.dropped();
    handle.shutdown();

    println!("\nSession summary:");
    println!("  Cycles published:       {}", health.cycles_published);
    println!("  Cycles dropped:         {}", health.cycles_dropped);
    println!("  Invalid channel events: {}", health.invalid_channel_events);
    println!("  Consistency violations: {}", health.consistency_violations);
    println!("  Results lost to lag:    {}", lost);
    Ok(())
}

/// Build the emulated converters for a bench run: every temperature
/// channel reads a code synthesized from its position along the coolant
/// chain, and a measured flow channel (if any) reads mid-scale.
fn emulated_devices(
    project: &Project,
    parts: &RigParts,
    stage_rise_mk: f64,
    inlet_c: f64,
) -> Vec<EmulatedAdc> {
    let adc = parts.pipeline.adc;
    let device_count = parts
        .channels
        .iter()
        .map(|ch| ch.device() as usize + 1)
        .max()
        .unwrap_or(1);
    let mut devices: Vec<EmulatedAdc> = (0..device_count).map(|_| EmulatedAdc::new()).collect();

    // Walk the chain: the first stage's inlet is the loop entry, and each
    // stage's outlet sensor sits one configured rise higher.
    let mut temperature = inlet_c;
    let mut set = |channel: cf_core::ChannelId, theta_c: f64| {
        if let Some(cal) = parts.calibrations.iter().find(|c| c.channel == channel) {
            let code = synthesize_code(theta_c, cal, &adc);
            devices[channel.device() as usize].set_code(channel.input() as u8, code);
        }
    };
    if let Some(first) = parts.stages.first() {
        set(first.inlet, temperature);
    }
    for stage in &parts.stages {
        temperature += stage_rise_mk / 1000.0;
        set(stage.outlet, temperature);
    }

    if let FlowConfig::Measured { channel, .. } = &project.flow {
        let channel = cf_core::ChannelId::from_index(*channel);
        devices[channel.device() as usize].set_code(channel.input() as u8, 1 << 21);
    }

    devices
}

fn print_cycle(result: &CycleResult) {
    let stages: Vec<String> = result
        .stages
        .iter()
        .map(|s| match s.power_w {
            Some(p) if s.valid => format!("{}: {:.3} W", s.name, p),
            Some(p) => format!("{}: {:.3} W (suspect)", s.name, p),
            None => format!("{}: ---", s.name),
        })
        .collect();
    println!(
        "cycle {:>5}  {}  total {:.3} W{}",
        result.sequence,
        stages.join("  "),
        result.cumulative_power_w,
        if result.consistent { "" } else { "  [INCONSISTENT]" }
    );
}
