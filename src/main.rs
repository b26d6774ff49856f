//! `bezier-traj`: solves a trajectory problem file and prints the resulting curve.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bezier_end_effector::cost::path_error;
use bezier_end_effector::planner::EndEffectorPlanner;
use bezier_end_effector::problem_from_file::ProblemFile;
use bezier_end_effector::qhull::save_qhull_file;

#[derive(Parser)]
#[command(version, about = "Bezier end effector trajectory with a single free control point")]
struct Cli {
    /// YAML problem file
    problem: PathBuf,

    /// Number of curve positions to print
    #[arg(short, long, default_value_t = 11)]
    samples: usize,

    /// Export the constraint polytope as qhull halfspaces into this file
    #[arg(long, value_name = "FILE")]
    qhull: Option<PathBuf>,

    /// Bound the exported polytope vertically around the interior point
    #[arg(long, requires = "qhull")]
    clip_z: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let problem = ProblemFile::from_yaml_file(&cli.problem)
        .with_context(|| format!("Failed to load problem {}", cli.problem.display()))?;

    let planner = EndEffectorPlanner::new(problem.config);
    let assembled = planner.build_problem(
        &problem.boundary,
        &problem.path,
        problem.duration,
        problem.weight_distance,
        problem.smoothness,
    )?;
    let result = planner.solve_problem(&assembled);

    println!("success: {}", result.success);
    if let (Some(x), Some(curve)) = (&result.x, &result.curve) {
        println!("free control point: [{:.6}, {:.6}, {:.6}]", x.x, x.y, x.z);
        if let Some(cost) = result.cost {
            println!("cost: {:.6}", cost);
        }
        println!(
            "path error: {:.6}",
            path_error(curve, &problem.path, cli.samples.max(2))?
        );
        for (i, p) in curve.sample(cli.samples.max(2)).iter().enumerate() {
            println!("{:3}: [{:.6}, {:.6}, {:.6}]", i, p.x, p.y, p.z);
        }
    }

    if let Some(file) = &cli.qhull {
        let interior = result.x.unwrap_or(assembled.initial_guess);
        save_qhull_file(file, &assembled.constraints, &interior, cli.clip_z)
            .with_context(|| format!("Failed to write {}", file.display()))?;
        println!("constraints written to {}", file.display());
    }
    Ok(())
}
