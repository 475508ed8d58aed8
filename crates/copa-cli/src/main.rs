use anyhow::{anyhow, Context};
use clap::Parser;
use copa_algo::milp::highs::HighsBackend;
use copa_algo::{workload_tuples, PhaseI, PhaseII, SolverConfig};
use copa_core::Problem;
use copa_io::{load_problems, validate_path, write_solutions, SolutionDoc};
use std::path::Path;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

mod cli;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if let Err(err) = run(cli.command) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Validate { path, verbose } => validate(&path, verbose),
        Commands::Solve {
            path,
            phase_i_id,
            phase_ii_id,
            frac_gap,
            max_seconds,
            threads,
            seed,
            gcd,
            output,
        } => {
            let config = SolverConfig {
                frac_gap,
                max_seconds,
                threads,
                seed,
            };
            solve(
                &path,
                &phase_i_id,
                phase_ii_id.as_deref(),
                config,
                gcd,
                output.as_deref(),
            )
        }
    }
}

fn validate(path: &Path, verbose: bool) -> anyhow::Result<()> {
    let summary = validate_path(path)
        .with_context(|| format!("validating '{}'", path.display()))?;
    println!("{}: OK", path.display());
    if verbose {
        println!("  apps:             {}", summary.apps);
        println!("  limiting sets:    {}", summary.limiting_sets);
        println!("  instance classes: {}", summary.instance_classes);
        println!("  performance sets: {}", summary.performances);
        println!("  workloads:        {}", summary.workloads);
        println!("  problems:         {}", summary.problems);
        println!("  solutions:        {}", summary.solutions);
    }
    Ok(())
}

fn solve(
    path: &Path,
    phase_i_id: &str,
    phase_ii_id: Option<&str>,
    config: SolverConfig,
    gcd: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let problems = load_problems(path)
        .with_context(|| format!("loading problems from '{}'", path.display()))?;
    let backend = HighsBackend::new();

    let phase_i_problem = find_problem(&problems, phase_i_id)?;
    let reservation = PhaseI::new(phase_i_problem, &backend)?
        .with_config(config.clone())
        .with_gcd(gcd)
        .solve()?;
    let stats = &reservation.solving_stats;
    println!(
        "phase I '{}': status {}, cost {}",
        phase_i_problem.id,
        stats.algorithm.status,
        format_cost(stats.optimal_cost),
    );

    let mut solutions = vec![SolutionDoc::PhaseI(reservation.clone())];

    if let Some(phase_ii_id) = phase_ii_id {
        let phase_ii_problem = find_problem(&problems, phase_ii_id)?;
        let mut phase_ii = PhaseII::new(phase_ii_problem, &backend, &reservation)?
            .with_config(config);
        let period = phase_ii.solve_period(workload_tuples(phase_ii_problem))?;
        let global = &period.global_solving_stats;
        println!(
            "phase II '{}': status {}, cost {} over {} timeslots",
            phase_ii_problem.id,
            global.status,
            format_cost(global.optimal_cost),
            period.solving_stats.len(),
        );
        solutions.push(SolutionDoc::PhaseII(period));
    }

    match output {
        Some(output) => {
            write_solutions(output, &solutions)
                .with_context(|| format!("writing '{}'", output.display()))?;
            info!(path = %output.display(), "solution document written");
        }
        None => {
            print!("{}", copa_io::solutions_to_yaml(&solutions)?);
        }
    }
    Ok(())
}

fn find_problem<'a>(problems: &'a [Problem], id: &str) -> anyhow::Result<&'a Problem> {
    problems
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| anyhow!("no problem with id '{id}' in the document"))
}

fn format_cost(cost: Option<f64>) -> String {
    match cost {
        Some(cost) => format!("{cost:.2}"),
        None => "n/a".to_string(),
    }
}
