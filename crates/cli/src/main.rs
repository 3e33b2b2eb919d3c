//! approx-pi CLI
//!
//! Approximates pi with the Leibniz series, splitting the work across
//! forked processes and their threads, and reports the wall-clock time.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use approx_pi::{ForkLauncher, ProcessSupervisor, RunConfig, sequential_pi};

mod error;
mod report;
mod settings;
#[cfg(unix)]
mod signals;

use error::CliError;
use report::Report;
use settings::Settings;

#[derive(Parser)]
#[command(name = "approx-pi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compare process and thread throughput by approximating pi", long_about = None)]
struct Cli {
    /// Number of series terms after the leading 1
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    iterations: u64,

    /// Number of processes, including this one
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    processes: u32,

    /// Threads per process (0 computes on the process's own thread)
    #[arg(short, long)]
    threads: Option<u32>,

    /// Skip per-worker logs and results.txt
    #[arg(short = 'o', long)]
    no_output: bool,

    /// Directory for worker logs and results.txt [default: output]
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// TOML settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also compute a single-threaded reference for comparison
    #[arg(long)]
    serial: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

/// Defaults < settings file < environment < flags
fn build_config(cli: &Cli, settings: Settings) -> RunConfig {
    let mut output = settings.output;
    output.sampling = output.sampling.overlay_env();
    if cli.no_output {
        output.enabled = false;
    }
    if let Some(dir) = &cli.output_dir {
        output.directory = dir.clone();
    }
    let threads = cli.threads.or(settings.threads).unwrap_or(0);

    RunConfig::new(cli.iterations, cli.processes)
        .with_threads(threads)
        .with_output(output)
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let config = build_config(cli, settings);

    config.output.prepare().map_err(|source| CliError::Output {
        path: config.output.directory.clone(),
        source,
    })?;

    let supervisor = ProcessSupervisor::new(config.clone())?;
    #[cfg(unix)]
    signals::install_cleanup(supervisor.semaphore_name()).map_err(CliError::Signals)?;

    let result = supervisor.run(&mut ForkLauncher)?;
    info!(pi = result.pi, elapsed_ms = result.elapsed.as_millis() as u64, "run finished");

    let serial_pi = cli.serial.then(|| sequential_pi(cli.iterations));
    let report = Report::new(&result, &config, serial_pi);

    if cli.json {
        println!("{}", report.render_json());
    } else {
        print!("{}", report.render_text());
    }

    if config.output.enabled {
        report
            .write_results(&config.output.results_path())
            .map_err(CliError::Report)?;
    }
    Ok(())
}
