mod reports;
mod scenario;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use match_market::{
    EvaluationConfig, LogisticStrategy, SelectivityStrategy, Strategy, select_targets_with,
};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use reports::EvaluationRecord;
use scenario::{MarketScenario, SynthesisParams, resolve_seeds};
use util::split_csv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpponentStrategy {
    /// Desirability damped by a logistic acceptance estimate
    Logistic,
    /// The same selectivity heuristic the focal applicant uses
    Selectivity,
}

impl OpponentStrategy {
    fn build(self) -> Box<dyn Strategy> {
        match self {
            Self::Logistic => Box::new(LogisticStrategy),
            Self::Selectivity => Box::new(SelectivityStrategy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "match-market-sim", version)]
#[command(about = "Monte-Carlo target selection for a single-round university assignment market")]
struct Args {
    /// Scenario JSON with a market and focal applicant; synthesized per seed when absent
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Universities in a synthesized market
    #[arg(long, default_value_t = 20)]
    universities: usize,

    /// Aptitude ceiling A of a synthesized market
    #[arg(long, default_value_t = 10.0)]
    aptitude_scale: f64,

    /// Quality weight Q of a synthesized market
    #[arg(long, default_value_t = 1.0)]
    quality_weight: f64,

    /// Synergy ceiling W of a synthesized market
    #[arg(long, default_value_t = 10.0)]
    synergy_scale: f64,

    /// Seeds to run (comma-separated); defaults to the config seed
    #[arg(long)]
    seeds: Option<String>,

    /// Evaluation settings JSON; command-line flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Monte-Carlo trials per evaluation
    #[arg(long)]
    trials: Option<u64>,

    /// Competitors per trial (defaults to one fewer than the universities)
    #[arg(long)]
    opponents: Option<usize>,

    /// Run trials on the rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// Heuristic competitors use to build their lists
    #[arg(long, value_enum, default_value_t = OpponentStrategy::Logistic)]
    opponent_strategy: OpponentStrategy,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if matches!(args.report, ReportFormat::Console) {
        announce_banner();
    }

    let start_time = Instant::now();
    let base_config = load_config(&args)?;
    let seeds = evaluation_seeds(&args, &base_config)?;
    let loaded = args
        .scenario
        .as_deref()
        .map(MarketScenario::load)
        .transpose()?;

    let mut records = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let scenario = match &loaded {
            Some(scenario) => scenario.clone(),
            None => MarketScenario::synthesize(synthesis_params(&args), seed)?,
        };
        records.push(evaluate(&args, &scenario, &base_config, seed)?);
    }

    write_reports(&args, &records, start_time)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn announce_banner() {
    println!("{}", "🎓 Match Market Simulator".bright_cyan().bold());
    println!("{}", "=========================".cyan());
}

const fn synthesis_params(args: &Args) -> SynthesisParams {
    SynthesisParams {
        universities: args.universities,
        aptitude_scale: args.aptitude_scale,
        quality_weight: args.quality_weight,
        synergy_scale: args.synergy_scale,
    }
}

fn load_config(args: &Args) -> Result<EvaluationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            EvaluationConfig::from_json(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => EvaluationConfig::default(),
    };
    if let Some(trials) = args.trials {
        config.trials = trials;
    }
    if args.opponents.is_some() {
        config.opponents = args.opponents;
    }
    config.parallel |= args.parallel;
    config.validate()?;
    Ok(config)
}

fn evaluation_seeds(args: &Args, config: &EvaluationConfig) -> Result<Vec<u64>> {
    match &args.seeds {
        Some(tokens) => resolve_seeds(&split_csv(tokens), config.seed),
        None => Ok(vec![config.seed]),
    }
}

fn evaluate(
    args: &Args,
    scenario: &MarketScenario,
    base_config: &EvaluationConfig,
    seed: u64,
) -> Result<EvaluationRecord> {
    let config = EvaluationConfig {
        seed,
        ..base_config.clone()
    };
    let opponents = config.opponent_count(scenario.market.university_count());
    let strategy = args.opponent_strategy.build();
    let strategy_name = strategy.name();
    log::info!(
        "evaluating {} with seed {seed}: {} trials against {opponents} opponents",
        scenario.name,
        config.trials
    );

    let started = Instant::now();
    let selection = select_targets_with(&scenario.market, &scenario.focal, config, strategy)
        .with_context(|| format!("evaluating {} with seed {seed}", scenario.name))?;
    Ok(EvaluationRecord::new(
        &scenario.name,
        seed,
        strategy_name,
        opponents,
        started.elapsed(),
        selection,
    ))
}

fn write_reports(args: &Args, records: &[EvaluationRecord], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut output_target, records)?,
        ReportFormat::Markdown => reports::generate_markdown_report(&mut output_target, records)?,
        ReportFormat::Console => {
            reports::generate_console_report(&mut output_target, records, start_time.elapsed())?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
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
