// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod report;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use fakehlml_config::Scenario;
use fakehlml_core::{FakeHlml, HlmlError};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "FakeHLML scenario runner",
    long_about = None
)]
struct Cli {
    /// Log every fake HLML call
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enumerate devices the way a discovery agent does.
    Discover(DiscoverArgs),

    /// Arm an event set on every device and drain pending critical events.
    Watch(WatchArgs),

    /// Load a scenario and print the resulting fake state as JSON.
    State(StateArgs),
}

#[derive(Parser, Debug)]
struct DiscoverArgs {
    /// Path to the scenario manifest (YAML or JSON)
    #[arg(short = 's', long)]
    scenario: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct WatchArgs {
    /// Path to the scenario manifest (YAML or JSON)
    #[arg(short = 's', long)]
    scenario: PathBuf,

    /// Timeout passed to each event wait
    #[arg(long, default_value = "1000")]
    timeout_ms: u32,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct StateArgs {
    /// Path to the scenario manifest (YAML or JSON)
    #[arg(short = 's', long)]
    scenario: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.trace {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Discover(args) => run_discover(args),
        Commands::Watch(args) => run_watch(args),
        Commands::State(args) => run_state(args),
    }
}

/// Scenario errors caused by an HLML call (an injected `init` failure)
/// are runtime failures; everything else is a configuration problem.
fn setup_exit_code(err: &anyhow::Error) -> ExitCode {
    if err.downcast_ref::<HlmlError>().is_some() {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else {
        ExitCode::from(EXIT_CONFIG_ERROR)
    }
}

fn load(path: &Path) -> anyhow::Result<(Scenario, FakeHlml)> {
    info!("Loading scenario: {:?}", path);
    let scenario = Scenario::from_file(path)?;
    let hlml = FakeHlml::from_scenario(&scenario)
        .with_context(|| format!("Failed to apply scenario {:?}", path))?;
    info!(
        "Scenario '{}': {} device(s), {} pending event(s)",
        scenario.name,
        hlml.registry().len(),
        hlml.pending_events().len()
    );
    Ok((scenario, hlml))
}

fn emit<R: Serialize + Display>(
    report: &R,
    json: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    if json {
        println!("{}", rendered);
    } else {
        print!("{}", report);
    }
    if let Some(path) = output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        info!("Report written to {:?}", path);
    }
    Ok(())
}

fn finish(emitted: anyhow::Result<()>, failed: bool) -> ExitCode {
    if let Err(e) = emitted {
        error!("{:#}", e);
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }
    if failed {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else {
        ExitCode::from(EXIT_PASS)
    }
}

fn run_discover(args: DiscoverArgs) -> ExitCode {
    let (scenario, mut hlml) = match load(&args.scenario) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{:#}", e);
            return setup_exit_code(&e);
        }
    };

    let report = report::discover(&mut hlml, &scenario.name);
    let emitted = emit(&report, args.json, args.output.as_deref());
    finish(emitted, report.failure.is_some())
}

fn run_watch(args: WatchArgs) -> ExitCode {
    let (scenario, mut hlml) = match load(&args.scenario) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{:#}", e);
            return setup_exit_code(&e);
        }
    };

    let report = report::watch(&mut hlml, &scenario.name, args.timeout_ms);
    let emitted = emit(&report, args.json, args.output.as_deref());
    finish(emitted, report.failure.is_some())
}

fn run_state(args: StateArgs) -> ExitCode {
    let (_, hlml) = match load(&args.scenario) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{:#}", e);
            return setup_exit_code(&e);
        }
    };

    match serde_json::to_string_pretty(&hlml.snapshot()) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("Failed to serialize state: {}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}
