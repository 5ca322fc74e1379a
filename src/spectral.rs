//! Spectral radius estimates for scaling the prolongator smoother.

use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SaConfig;
use crate::error::{Result, SaError};
use crate::operator::{DinvA, LinearOperator};
use crate::sparse::SparseMatrix;
use crate::utils::{norm, random_vec};
use crate::Vector;

/// Relative size of the new Arnoldi direction below which the Krylov space is
/// considered invariant.
const BREAKDOWN_TOL: f64 = 1e-10;
const POWER_ITERATIONS: usize = 500;

/// Estimate `rho(D^-1 A)` with `config.ritz_iterations` Ritz steps from a start
/// vector seeded by `config.seed`.
pub fn estimate_rho_dinv_a(a: &SparseMatrix, config: &SaConfig) -> Result<f64> {
    let op = DinvA::new(a.csr_view()?, config.execution)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let rho = ritz_spectral_radius(&op, config.ritz_iterations, &mut rng)?;
    debug!(
        "rho(D^-1 A) ~ {rho:.6} after {} Ritz steps (n = {})",
        config.ritz_iterations,
        op.rows()
    );
    Ok(rho)
}

/// Largest Ritz value magnitude of `op` after at most `iterations` Arnoldi
/// steps. The estimate approaches the spectral radius from below for
/// operators similar to a symmetric one; treat it as a scale factor, not an
/// exact eigenvalue.
pub fn ritz_spectral_radius<Op, R>(op: &Op, iterations: usize, rng: &mut R) -> Result<f64>
where
    Op: LinearOperator,
    R: Rng,
{
    let n = op.rows();
    if n != op.cols() || n == 0 {
        return Err(SaError::InvalidShape {
            op: "ritz_spectral_radius",
            expected: (n.max(1), n.max(1)),
            got: (n, op.cols()),
        });
    }
    if iterations == 0 {
        return Err(SaError::InvalidParameter {
            name: "ritz_iterations",
            value: 0.0,
        });
    }

    let k = iterations.min(n);
    let mut v = random_vec(n, rng);
    let v_norm = norm(&v);
    if v_norm > 0.0 {
        v /= v_norm;
    } else {
        v.fill(1.0 / (n as f64).sqrt());
    }

    let mut basis: Vec<Vector> = vec![v];
    let mut hessenberg = Array2::<f64>::zeros((k + 1, k));
    let mut steps = k;

    for j in 0..k {
        let mut w = op.apply(&basis[j]);
        let w_norm = norm(&w);

        // modified Gram-Schmidt against the current basis
        for (i, v_i) in basis.iter().enumerate() {
            let h_ij = w.dot(v_i);
            hessenberg[[i, j]] = h_ij;
            w.scaled_add(-h_ij, v_i);
        }

        let beta = norm(&w);
        if !beta.is_finite() {
            return Err(SaError::NumericOverflow {
                op: "ritz_spectral_radius",
            });
        }
        hessenberg[[j + 1, j]] = beta;

        if beta <= BREAKDOWN_TOL * w_norm {
            trace!("Arnoldi breakdown after {} steps", j + 1);
            steps = j + 1;
            break;
        }
        if j + 1 < k {
            basis.push(w / beta);
        }
    }

    let h = hessenberg.slice(s![..steps, ..steps]).to_owned();
    let rho = dense_spectral_radius(&h, rng);
    if !rho.is_finite() {
        return Err(SaError::NumericOverflow {
            op: "ritz_spectral_radius",
        });
    }
    if rho <= 0.0 {
        warn!("Ritz estimate of the spectral radius is not positive: {rho}");
    }
    Ok(rho)
}

/// Power iteration on a small dense matrix.
fn dense_spectral_radius<R: Rng>(h: &Array2<f64>, rng: &mut R) -> f64 {
    let mut x = random_vec(h.nrows(), rng);
    let x_norm = norm(&x);
    if x_norm == 0.0 {
        return 0.0;
    }
    x /= x_norm;

    let mut estimate = 0.0;
    for _ in 0..POWER_ITERATIONS {
        let y = h.dot(&x);
        let y_norm = norm(&y);
        if y_norm == 0.0 {
            return 0.0;
        }
        let converged = (y_norm - estimate).abs() <= 1e-14 * y_norm;
        estimate = y_norm;
        x = y / y_norm;
        if converged {
            break;
        }
    }
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel_ops::Execution;
    use crate::sparse::CsrView;
    use crate::utils::{poisson_1d, poisson_2d};
    use sprs::TriMat;
    use std::f64::consts::PI;

    fn tridiagonal(n: usize, diag: f64, off: f64) -> SparseMatrix {
        let mut mat = TriMat::new((n, n));
        for i in 0..n {
            mat.add_triplet(i, i, diag);
            if i + 1 < n {
                mat.add_triplet(i, i + 1, off);
                mat.add_triplet(i + 1, i, off);
            }
        }
        SparseMatrix::CompressedRow(mat.to_csr::<usize>())
    }

    #[test]
    fn small_tridiagonal_spectrum() {
        // D^-1 A = I - T/4 with T the path adjacency, eigenvalues 1 - cos(k pi / 5) / 2
        let a = tridiagonal(4, 4.0, -1.0);
        let rho = estimate_rho_dinv_a(&a, &SaConfig::default()).unwrap();
        let exact = 1.0 + 0.5 * (PI / 5.0).cos();
        assert!(rho > 0.0);
        assert!((rho - exact).abs() < 1e-6 * exact, "{rho} vs {exact}");
    }

    #[test]
    fn truncated_iteration_approaches_from_below() {
        let n = 10;
        let a: SparseMatrix = poisson_1d(n).into();
        let exact = 1.0 + (PI / (n as f64 + 1.0)).cos();

        let rho = estimate_rho_dinv_a(&a, &SaConfig::default()).unwrap();
        assert!(rho <= exact * (1.0 + 1e-9));
        assert!(rho >= 0.75 * exact, "{rho} vs {exact}");

        // a full Krylov space recovers the largest eigenvalue
        let config = SaConfig {
            ritz_iterations: n,
            ..Default::default()
        };
        let rho = estimate_rho_dinv_a(&a, &config).unwrap();
        assert!((rho - exact).abs() < 1e-6 * exact, "{rho} vs {exact}");
    }

    #[test]
    fn identity_breaks_down_immediately() {
        let a = tridiagonal(5, 3.0, 0.0);
        let rho = estimate_rho_dinv_a(&a, &SaConfig::default()).unwrap();
        assert!((rho - 1.0).abs() < 1e-12);
    }

    #[test]
    fn estimate_is_deterministic_per_seed_and_policy() {
        let a: SparseMatrix = poisson_2d(8, 1.0).into();
        let config = SaConfig::default();
        let seq = estimate_rho_dinv_a(&a, &config).unwrap();
        let par = estimate_rho_dinv_a(
            &a,
            &SaConfig {
                execution: Execution::Parallel,
                ..config
            },
        )
        .unwrap();
        assert_eq!(seq, par);
        // rho(D^-1 A) < 2 for the five point Laplacian
        assert!(seq > 1.5 && seq < 2.0);
    }

    #[test]
    fn zero_iterations() {
        let a = poisson_1d(3);
        let op = DinvA::new(CsrView::from_csr(&a).unwrap(), Execution::Sequential).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            ritz_spectral_radius(&op, 0, &mut rng),
            Err(SaError::InvalidParameter { .. })
        ));
    }
}
