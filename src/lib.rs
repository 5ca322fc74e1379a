//! Construction of a single coarsening level of a smoothed aggregation
//! algebraic multigrid (SA-AMG) preconditioner.
//!
//! A level is built from the system matrix `A` and a near-nullspace candidate
//! `B` (the constant vector for Laplacians) in a handful of steps:
//!
//! - [`strength::symmetric_strength_of_connection`] keeps the entries with
//!   `|A_ij| >= theta * sqrt(|A_ii * A_jj|)`, giving the strength matrix `S`,
//! - [`partitioner::standard_aggregation`] clusters the graph of `S` into
//!   aggregates which become the coarse unknowns,
//! - [`interpolation::fit_candidates`] restricts `B` to each aggregate to form
//!   the tentative prolongator `T`,
//! - [`spectral::estimate_rho_dinv_a`] estimates the spectral radius of the
//!   Jacobi scaled operator `D^-1 A` with a few Ritz steps,
//! - [`interpolation::smooth_prolongator`] applies one damped Jacobi sweep to
//!   `T`: `P = T - omega / rho * D^-1 S T`.
//!
//! [`level::build_level`] chains these and forms the Galerkin coarse operator
//! `P^T A P`; [`level::SaLevel`] is the record handed to a hierarchy builder.
//! Driving several levels and the multigrid cycle itself is left to the caller.
//!
//! Matrices can be stored in compressed-row or coordinate form
//! ([`sparse::SparseMatrix`]). The algorithms run on compressed rows and
//! coordinate inputs are converted on the way in and out.

use ndarray::Array1;
use sprs::{CsMatBase, TriMatBase};

#[macro_use]
extern crate log;
extern crate approx;

pub mod config;
pub mod error;
pub mod interpolation;
pub mod level;
pub mod operator;
pub mod parallel_ops;
pub mod partitioner;
pub mod sparse;
pub mod spectral;
pub mod strength;
pub mod utils;

pub type CsrMatrix = CsMatBase<f64, usize, Vec<usize>, Vec<usize>, Vec<f64>, usize>;
pub type CooMatrix = TriMatBase<Vec<usize>, Vec<f64>>;
pub type Vector = Array1<f64>;

pub use config::SaConfig;
pub use error::{Result, SaError};
pub use level::{build_level, SaLevel};
pub use parallel_ops::Execution;
pub use sparse::{Format, SparseMatrix};
