//! Scores a pickup and drop-off route plan.
//!
//! Reads a plan (and optionally a scoring config) as JSON, prints the
//! constraint analysis to stderr and writes the scored plan to stdout.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dial_a_ride::console;
use dial_a_ride::constraints::{define_constraints_with, ScoringConfig};
use dial_a_ride::director::ScoreDirector;
use dial_a_ride::dto::{AnalyzeResponse, RoutePlanDto};
use dial_a_ride::session::SolverStatus;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Route plan JSON file.
    plan: PathBuf,

    /// Scoring config JSON file, e.g. {"travelObjective": "penalizeDrivingTime"}.
    scoring: Option<PathBuf>,

    /// Write the score analysis instead of the scored plan.
    #[arg(short, long)]
    analyze: bool,

    /// Skip the console report.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("dial_a_ride=info".parse()?))
        .init();

    let raw = fs::read_to_string(&cli.plan)
        .with_context(|| format!("reading {}", cli.plan.display()))?;
    let dto: RoutePlanDto = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", cli.plan.display()))?;

    let config = match &cli.scoring {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<ScoringConfig>(&raw)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => ScoringConfig::default(),
    };

    let plan = dto.to_domain().context("invalid route plan")?;
    if !cli.quiet {
        console::print_banner();
        console::print_plan_summary(&plan);
    }

    let started = Instant::now();
    let director = ScoreDirector::with_constraints(plan, define_constraints_with(&config));
    let analysis = director.constraints().analyze(director.working_solution());
    let score = director.score();
    info!(%score, feasible = score.is_feasible(), objective = ?config.travel_objective, "Plan scored");
    if !cli.quiet {
        console::print_analysis(score, &analysis, started.elapsed());
    }

    let plan = director.finish();
    let output = if cli.analyze {
        serde_json::to_string_pretty(&AnalyzeResponse::from_analysis(&plan, &analysis))?
    } else {
        serde_json::to_string_pretty(&RoutePlanDto::from_plan(&plan, Some(SolverStatus::NotSolving)))?
    };
    println!("{output}");
    Ok(())
}
