//! # u-timetable CLI
//!
//! Usage:
//!   u-timetable optimize input.toml -o output.toml --aging 5 --shuffling --greedily
//!   u-timetable generate 8 -o stress.toml

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use u_timetable::codec;
use u_timetable::models::{Assignment, Placement, Problem, Resource, Schedule, Task};
use u_timetable::optimizer::{OptimizerConfig, SearchCommand, SearchMonitor, SearchProgress};
use u_timetable::{Result, Session};

#[derive(Parser)]
#[command(
    name = "u-timetable",
    version,
    about = "Slot-based timetable optimizer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a schedule file
    Optimize {
        /// Schedule to optimize
        input: PathBuf,

        /// Where to write the optimized schedule
        #[arg(short, long)]
        output: PathBuf,

        /// Willingness to accept worsening moves as the search stalls
        #[arg(long, default_value_t = 0.0)]
        aging: f64,

        /// Shuffle-kick on stagnation
        #[arg(long)]
        shuffling: bool,

        /// Greedy construction before search
        #[arg(long)]
        greedily: bool,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Iteration budget
        #[arg(long)]
        max_iterations: Option<u64>,

        /// Per-iteration cooling factor in (0, 1]
        #[arg(long)]
        lambda: Option<f64>,

        /// Wall-clock budget in seconds
        #[arg(long)]
        time_limit_secs: Option<u64>,
    },

    /// Write a stress-test schedule where every bucket clashes
    Generate {
        /// Number of resources, tasks per resource, and buckets
        n: usize,

        /// Where to write the schedule
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Logs search progress every `every` iterations.
///
/// Pick `every` with [`progress_interval`] so a run logs about a hundred
/// lines whatever its budget.
#[derive(Debug)]
struct ProgressLog {
    every: u64,
}

/// One progress line per percent of the iteration budget.
fn progress_interval(max_iterations: u64) -> u64 {
    (max_iterations / 100).max(1)
}

impl SearchMonitor for ProgressLog {
    fn on_iteration(&mut self, progress: &SearchProgress) -> SearchCommand {
        if progress.iteration % self.every == 0 {
            info!(
                iteration = progress.iteration,
                current = progress.current_cost,
                best = progress.best_cost,
                staleness = progress.staleness,
                temperature = progress.temperature,
                "search progress"
            );
        }
        SearchCommand::Continue
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "u_timetable=debug"
    } else {
        "u_timetable=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Optimize {
            input,
            output,
            aging,
            shuffling,
            greedily,
            seed,
            max_iterations,
            lambda,
            time_limit_secs,
        } => {
            let mut config = OptimizerConfig::new(aging, shuffling, greedily);
            if let Some(s) = seed {
                config = config.with_seed(s);
            }
            if let Some(n) = max_iterations {
                config = config.with_max_iterations(n);
            }
            if let Some(l) = lambda {
                config = config.with_lambda(l);
            }
            if let Some(secs) = time_limit_secs {
                config = config.with_time_limit(Duration::from_secs(secs));
            }

            let session = Session::new();
            session.select_file(&std::fs::read(&input)?)?;

            let started = Instant::now();
            let mut progress = ProgressLog {
                every: progress_interval(config.max_iterations),
            };
            let cost = session.optimize_with(&config, &mut progress)?;
            let elapsed = started.elapsed();

            std::fs::write(&output, session.download_file()?)?;

            let breakdown = session.breakdown()?;
            let kpi = session.kpi()?;
            println!("cost: {cost}");
            println!("elapsed: {:.3}s", elapsed.as_secs_f64());
            println!(
                "hard violations: {}, soft violations: {}",
                breakdown.hard_units(),
                breakdown.soft_units()
            );
            println!(
                "assigned: {}/{}, makespan: {}, avg utilization: {:.1}%",
                kpi.assigned,
                kpi.assigned + kpi.unassigned,
                kpi.makespan,
                kpi.avg_utilization * 100.0
            );
            for v in breakdown.violations.iter().filter(|v| v.kind.is_hard()) {
                println!("  {}", v.message);
            }
        }

        Commands::Generate { n, output } => {
            let schedule = stress_schedule(n)?;
            std::fs::write(&output, codec::serialize(&schedule)?)?;
            println!(
                "wrote {} tasks on {} resources to {}",
                n * n,
                n,
                output.display()
            );
        }
    }

    Ok(())
}

/// `n` resources with `n` one-bucket tasks each. Task `i` of every
/// resource is led by leader `i` and starts at bucket `i`, so all `n`
/// tasks in a bucket share a leader.
fn stress_schedule(n: usize) -> Result<Schedule> {
    if n == 0 {
        return Err(u_timetable::Error::InvalidConfig("size must be at least 1".into()));
    }
    let horizon = u32::try_from(n)
        .map_err(|_| u_timetable::Error::InvalidConfig(format!("size {n} is too large")))?;
    let resources = (0..n).map(|r| Resource::new(format!("R{r}"))).collect();
    let mut tasks = Vec::with_capacity(n * n);
    let mut placements = Vec::with_capacity(n * n);
    for r in 0..n {
        for i in 0..horizon {
            tasks.push(Task::new(format!("R{r}-T{i}")).with_leader(format!("L{i}")));
            placements.push(Some(Placement::new(r, i)));
        }
    }
    let problem = Problem::new(horizon, resources, tasks);
    Schedule::with_assignment(problem, Assignment::from_placements(placements))
        .map_err(|err| u_timetable::Error::Format(err.to_string()))
}
