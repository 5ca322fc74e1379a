use std::sync::Arc;

use sa_amg::{
    build_level,
    utils::{neumann_1d, poisson_1d, poisson_2d},
    Execution, Format, SaConfig, SparseMatrix, Vector,
};
use serde::Serialize;
use structopt::StructOpt;
use strum_macros::{Display, EnumString};

#[macro_use]
extern crate log;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "sa_level",
    about = "Build one smoothed aggregation level for a model problem"
)]
struct Opt {
    /// Model problem. Options are:
    /// poisson1d, poisson2d, neumann1d
    problem: Problem,

    /// Unknowns (1d) or points per side (2d)
    size: usize,

    /// Strength of connection threshold
    #[structopt(long, default_value = "0.0")]
    theta: f64,

    /// Jacobi damping of the prolongator smoother
    #[structopt(long, default_value = "1.3333333333333333")]
    omega: f64,

    /// Ritz steps for the spectral radius estimate
    #[structopt(long, default_value = "8")]
    ritz_iterations: usize,

    /// y direction coupling of poisson2d
    #[structopt(long, default_value = "1.0")]
    epsilon: f64,

    /// sequential or parallel
    #[structopt(long, default_value = "sequential")]
    execution: Execution,

    /// Store the operator in coordinate form
    #[structopt(long)]
    coordinate: bool,
}

#[derive(Debug, Display, EnumString)]
#[strum(ascii_case_insensitive)]
enum Problem {
    Poisson1d,
    Poisson2d,
    Neumann1d,
}

#[derive(Serialize)]
struct LevelSummary {
    problem: String,
    config: SaConfig,
    fine_size: usize,
    fine_nnz: usize,
    format: Format,
    aggregates: usize,
    prolongator_nnz: usize,
    coarse_nnz: usize,
    rho_dinv_a: f64,
}

fn main() {
    pretty_env_logger::init();
    let opt = Opt::from_args();

    let mat = match opt.problem {
        Problem::Poisson1d => poisson_1d(opt.size),
        Problem::Poisson2d => poisson_2d(opt.size, opt.epsilon),
        Problem::Neumann1d => neumann_1d(opt.size),
    };
    let format = if opt.coordinate {
        Format::Coordinate
    } else {
        Format::CompressedRow
    };
    let config = SaConfig {
        theta: opt.theta,
        omega: opt.omega,
        ritz_iterations: opt.ritz_iterations,
        execution: opt.execution,
        ..Default::default()
    };

    let result = SparseMatrix::from(mat)
        .to_format(format)
        .and_then(|a| {
            let near_null = Vector::from_elem(a.rows(), 1.0);
            build_level(Arc::new(a), &near_null, &config)
        });

    let (level, mat_coarse, _) = match result {
        Ok(built) => built,
        Err(err) => {
            error!("failed to build level: {err}");
            std::process::exit(1);
        }
    };
    info!("{:?}", level);

    let summary = LevelSummary {
        problem: opt.problem.to_string(),
        config,
        fine_size: level.a.rows(),
        fine_nnz: level.a.nnz(),
        format: level.a.format(),
        aggregates: mat_coarse.rows(),
        prolongator_nnz: level.p.nnz(),
        coarse_nnz: mat_coarse.nnz(),
        rho_dinv_a: level.rho_dinv_a,
    };
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => error!("failed to serialize summary: {err}"),
    }
}
