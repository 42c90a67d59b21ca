mod common;
mod logic;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use hgs_game::{ConfigStore, GameOptions, Simulator, TributeSetup, debug_roster, roster_from_json};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::{parse_fatality_policy, split_csv};
use logic::{DirStore, GameRecord, GameRunner, NullStore, RunPlan, resolve_seed_inputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "hgs-tester", version = "0.1.0")]
#[command(about = "Headless runner for the Hunger Games Simulator round engine")]
struct Args {
    /// Seeds to run (comma-separated; decimal, 0x hex, or start..end ranges)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Games to play per seed
    #[arg(long, default_value_t = 1)]
    iterations: usize,

    /// Size of the generated roster when no roster file is given
    #[arg(long, default_value_t = 24)]
    tributes: usize,

    /// JSON file holding the tribute roster
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Event configuration to import before playing
    #[arg(long)]
    events: Option<PathBuf>,

    /// Replace the catalog with the imported events instead of merging
    #[arg(long)]
    overwrite: bool,

    /// Directory where the event configuration is persisted between runs
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Drop the persisted configuration before loading anything
    #[arg(long)]
    reset_state: bool,

    /// Required fatalities per round: disabled, a percentage such as 10%, or a count
    #[arg(long, default_value = "disabled")]
    fatalities: String,

    /// Probability of rerolling a picked fatal event when no quota applies
    #[arg(long, default_value_t = 0.60)]
    reroll_rate: f64,

    /// Declare every survivor a winner after this many rounds
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Keep the rendered transcript of every game in the report
    #[arg(long)]
    transcript: bool,

    /// Write the event configuration to this path and exit
    #[arg(long)]
    export: Option<PathBuf>,

    /// List the event catalog and exit
    #[arg(long)]
    list_events: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let passed = match args.state_dir.clone() {
        Some(dir) => run(&args, DirStore::new(dir))?,
        None => run(&args, NullStore)?,
    };
    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

fn announce_banner() {
    println!("{}", "🎮 Hunger Games Simulator Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

/// Returns `false` when any game failed.
fn run<S>(args: &Args, store: S) -> Result<bool>
where
    S: ConfigStore,
{
    let simulator = prepare_simulator(args, store)?;

    if args.list_events {
        list_events(args, &simulator)?;
        return Ok(true);
    }
    if let Some(path) = &args.export {
        let json = simulator.export()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("📦 Event configuration written to {}", path.display());
        return Ok(true);
    }

    announce_banner();
    let start_time = Instant::now();
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let plan = build_plan(args)?;
    println!(
        "{} {} seed(s) × {} game(s), {} tributes",
        "🏹 Running".bright_yellow().bold(),
        seeds.len(),
        args.iterations,
        plan.roster.len()
    );

    let mut runner = GameRunner::new(simulator, args.verbose);
    let records = runner.run(&plan, &seeds, args.iterations);
    write_reports(args, &records, start_time)?;
    Ok(records.iter().all(GameRecord::passed))
}

fn prepare_simulator<S>(args: &Args, store: S) -> Result<Simulator<S>>
where
    S: ConfigStore,
{
    let mut simulator = Simulator::new(store);
    if args.reset_state {
        simulator.forget()?;
    }
    if let Some(report) = simulator.restore() {
        log::info!("restored {} persisted events", report.added);
    }
    if let Some(path) = &args.events {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let report = simulator
            .import(&json, args.overwrite)
            .with_context(|| format!("failed to import {}", path.display()))?;
        log::info!(
            "imported {} events ({} duplicates skipped, {} tags added)",
            report.added,
            report.skipped_duplicates,
            report.tags_added
        );
        simulator.persist()?;
    }
    Ok(simulator)
}

fn build_plan(args: &Args) -> Result<RunPlan> {
    if !(0.0..=1.0).contains(&args.reroll_rate) {
        bail!("reroll rate must be between 0 and 1, got {}", args.reroll_rate);
    }
    let roster = match &args.roster {
        Some(path) => load_roster(path)?,
        None => debug_roster(args.tributes),
    };
    let options = GameOptions {
        fatality_policy: parse_fatality_policy(&args.fatalities)?,
        reroll_rate: args.reroll_rate,
        ..GameOptions::default()
    };
    Ok(RunPlan {
        roster,
        options,
        max_rounds: args.max_rounds,
        transcript: args.transcript,
    })
}

fn load_roster(path: &Path) -> Result<Vec<TributeSetup>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    roster_from_json(&json).with_context(|| format!("invalid roster in {}", path.display()))
}

fn list_events<S>(args: &Args, simulator: &Simulator<S>) -> Result<()>
where
    S: ConfigStore,
{
    let catalog = simulator.catalog();
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Event catalog ({} events):", catalog.pool.len())?;
    for (key, event) in catalog.pool.iter() {
        let state = if event.enabled { " " } else { "x" };
        writeln!(
            output_target.writer(),
            "  [{state}] {:9} #{:<4} {}",
            key.key(),
            event.id.0,
            event.message()
        )?;
    }
    output_target.flush_inner()?;
    Ok(())
}

fn write_reports(args: &Args, records: &[GameRecord], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => logic::reports::generate_json_report(&mut output_target, records)?,
        ReportFormat::Markdown => {
            logic::reports::generate_markdown_report(&mut output_target, records)?;
        }
        ReportFormat::Console => {
            logic::reports::generate_console_report(
                &mut output_target,
                records,
                start_time.elapsed(),
            )?;
            let duration = start_time.elapsed();
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
