mod reports;
mod scenarios;
mod seeds;
mod storage;

use anyhow::{Context, Result, bail};
use clanbot_game::{ClanEngine, World, WorldStorage};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use reports::ScenarioResult;
use scenarios::{Scenario, all_scenario_names, get_scenario, list_scenarios};
use seeds::{resolve_seed_inputs, split_csv};
use storage::JsonFileStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TickKind {
    /// Season advance, pile decay, nutrition and aging
    Monthly,
    /// Hunt attempt reset
    Weekly,
}

#[derive(Debug, Parser)]
#[command(name = "clanbot-tester", version = "0.1.0")]
#[command(about = "Seeded scenario runner and tick driver for clan roleplay worlds")]
struct Args {
    /// World snapshot to load (defaults to the bundled world)
    #[arg(long)]
    world: Option<PathBuf>,

    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated; decimal, 0x hex, a..b or a..=b)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Apply one scheduled tick to the --world file in place and exit
    #[arg(long, value_enum)]
    apply_tick: Option<TickKind>,

    /// Period number for a monthly tick; a period already applied is skipped
    #[arg(long)]
    period: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    if let Some(kind) = args.apply_tick {
        return apply_tick(&args, kind);
    }

    announce_banner();

    let start_time = Instant::now();
    let world = load_world(args.world.as_ref())?;
    let scenario_names = expand_scenarios(&args.scenarios);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;

    let mut results = Vec::new();
    for name in &scenario_names {
        let Some(scenario) = get_scenario(name) else {
            eprintln!("⚠️  Unknown scenario: {}", name.yellow());
            continue;
        };
        for &seed in &seeds {
            results.push(run_scenario(&scenario, &world, seed, args.iterations, args.verbose));
        }
    }

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🐾 Clanbot Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for name in all_scenario_names() {
            if !scenarios.contains(&name) {
                scenarios.push(name);
            }
        }
    }
    scenarios
}

fn load_world(path: Option<&PathBuf>) -> Result<World> {
    let Some(path) = path else {
        return World::load_default().context("bundled world data is invalid");
    };
    let storage = JsonFileStorage::new(path);
    match storage.load_world()? {
        Some(world) => Ok(world),
        None => bail!("world file {} does not exist", path.display()),
    }
}

fn run_scenario(
    scenario: &Scenario,
    world: &World,
    seed: u64,
    iterations: usize,
    verbose: bool,
) -> ScenarioResult {
    if verbose {
        println!(
            "🧪 Testing scenario: {} (seed: {seed})",
            scenario.name.bright_white()
        );
    }

    let mut successes = 0;
    let mut failures = Vec::new();
    let mut total = Duration::ZERO;

    for i in 0..iterations {
        let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
        let started = Instant::now();
        let outcome = scenario.run(world, iteration_seed);
        total += started.elapsed();
        match outcome {
            Ok(()) => successes += 1,
            Err(err) => {
                if verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        format!("{err:#}").red()
                    );
                }
                failures.push(format!(
                    "Iteration {} (seed {iteration_seed}): {err:#}",
                    i + 1
                ));
            }
        }
    }

    let average_duration = match u32::try_from(iterations) {
        Ok(0) | Err(_) => Duration::ZERO,
        Ok(count) => total / count,
    };

    ScenarioResult {
        scenario_name: scenario.name.to_string(),
        seed,
        passed: failures.is_empty(),
        iterations_run: iterations,
        successful_iterations: successes,
        failures,
        average_duration,
    }
}

fn apply_tick(args: &Args, kind: TickKind) -> Result<()> {
    let Some(path) = args.world.as_ref() else {
        bail!("--apply-tick needs --world pointing at the snapshot to update");
    };
    let engine = ClanEngine::new(JsonFileStorage::new(path));
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match kind {
        TickKind::Monthly => {
            let Some(period) = args.period else {
                bail!("a monthly tick needs --period");
            };
            let report = engine.run_monthly(period)?;
            writeln!(output_target.writer(), "{}", serde_json::to_string_pretty(&report)?)?;
        }
        TickKind::Weekly => {
            let report = engine.run_weekly()?;
            writeln!(output_target.writer(), "{}", serde_json::to_string_pretty(&report)?)?;
        }
    }
    log::info!("applied {kind:?} tick to {}", path.display());
    output_target.flush_inner()?;
    Ok(())
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, results)?,
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Clanbot Scenario Results\n\n_No scenarios executed._"
                )?;
            } else {
                reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
        }
    }

    if args.report != "json" {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_without_duplicates() {
        let names = expand_scenarios("smoke,all");
        assert_eq!(names.len(), all_scenario_names().len());
        assert_eq!(names[0], "smoke");
    }

    #[test]
    fn run_scenario_records_every_iteration() {
        let world = World::load_default().unwrap();
        let scenario = get_scenario("pile-decay").unwrap();
        let result = run_scenario(&scenario, &world, 3, 4, false);
        assert!(result.passed, "{:?}", result.failures);
        assert_eq!(result.iterations_run, 4);
        assert_eq!(result.successful_iterations, 4);
    }

    #[test]
    fn zero_iterations_has_zero_average() {
        let world = World::load_default().unwrap();
        let scenario = get_scenario("smoke").unwrap();
        let result = run_scenario(&scenario, &world, 3, 0, false);
        assert_eq!(result.average_duration, Duration::ZERO);
        assert!(result.passed);
    }
}
