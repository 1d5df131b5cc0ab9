//! Tower robot simulator CLI
//!
//! Runs the robot behavior tree against an in-memory world and a scripted
//! timeline of sensor changes, one tick per simulated millisecond.
//!
//! # Example
//!
//! ```bash
//! # Run the built-in lap for 10 seconds of robot time
//! tower-sim --ticks 10000
//!
//! # Custom scheduler config and sensor timeline, dump the root trace
//! RUST_LOG=tickstate=debug tower-sim -c sched.json -s lap.json --trace-json
//! ```

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tickstate::core::StateHistory;
use tickstate::ports::sim::{Script, SimWorld};
use tickstate::robot::{build_robot, demo_script, RootState, ROBOT};
use tickstate::SchedulerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Tower robot simulator
///
/// Deterministic: the same config and timeline always produce the same run.
#[derive(Parser, Debug)]
#[command(name = "tower-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scheduler configuration (JSON)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Sensor timeline (JSON); defaults to the built-in lap
    #[arg(short = 's', long)]
    script: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(short = 't', long, default_value = "10000")]
    ticks: u64,

    /// Print the root transition trace as JSON at the end
    #[arg(long)]
    trace_json: bool,
}

fn load_script(path: &PathBuf) -> Result<Script, Box<dyn Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,tickstate=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SchedulerConfig::from_json_file(path)?,
        None => SchedulerConfig::default(),
    };
    let script = match &args.script {
        Some(path) => load_script(path)?,
        None => demo_script(),
    };

    info!(
        ticks = args.ticks,
        steps = script.len(),
        queue_capacity = config.queue_capacity,
        "Starting simulation"
    );

    let mut scheduler = build_robot(config, SimWorld::powered())?;
    scheduler.start()?;

    for tick in 0..args.ticks {
        script.apply_due(tick, scheduler.env_mut());
        scheduler.tick()?;
    }

    let stats = scheduler.stats();
    let world = scheduler.env();

    println!("\n=== Simulation Complete ===");
    println!("Ticks:       {}", stats.ticks);
    println!("Dispatched:  {}", stats.dispatched);
    println!("Unhandled:   {}", stats.unhandled);
    println!("Dropped:     {}", stats.dropped);
    println!("Overruns:    {}", stats.budget_overruns);
    println!("Slowest:     {:?}", stats.max_tick);
    println!("Shots fired: {}", world.pulses());
    println!("Motors:      {:?}", world.speeds());

    if let Some(root) = scheduler.root(ROBOT) {
        println!("Active:      {}", root.active_states().join(" / "));
        let trace = root.history_json()?;
        let history: StateHistory<RootState> = serde_json::from_value(trace.clone())?;
        let path: Vec<String> = history
            .get_path()
            .iter()
            .map(|state| format!("{state:?}"))
            .collect();
        println!("Path:        {}", path.join(" -> "));

        if args.trace_json {
            println!("{}", serde_json::to_string_pretty(&trace)?);
        }
    }

    Ok(())
}
