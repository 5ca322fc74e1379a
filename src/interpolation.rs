//! Tentative and smoothed prolongators for smoothed aggregation.

use sprs::TriMat;

use crate::error::{Result, SaError};
use crate::partitioner::Partition;
use crate::sparse::{extract_diagonal, CsrView, Format, SparseMatrix};
use crate::{CsrMatrix, Vector};

/// Tentative prolongator from a partition and the near-nullspace candidate.
///
/// Column `j` of `T` is the candidate restricted to aggregate `j` and
/// normalized, so `T^T T = I` and `T B_c = B` where `B_c[j]` is the norm of the
/// candidate over aggregate `j`. Returns `(T, B_c)`.
pub fn fit_candidates(partition: &Partition, near_null: &Vector) -> Result<(CsrMatrix, Vector)> {
    let n_fine = partition.num_nodes();
    let n_coarse = partition.num_aggregates();
    if near_null.len() != n_fine {
        return Err(SaError::InvalidShape {
            op: "fit_candidates",
            expected: (n_fine, 1),
            got: (near_null.len(), 1),
        });
    }

    if let Some(label) = partition.node_to_agg.iter().find(|agg| **agg >= n_coarse) {
        return Err(SaError::InvalidShape {
            op: "fit_candidates",
            expected: (n_fine, n_coarse),
            got: (n_fine, label + 1),
        });
    }
    if let Some(node) = partition.agg_to_node.iter().flatten().find(|i| **i >= n_fine) {
        return Err(SaError::InvalidShape {
            op: "fit_candidates",
            expected: (n_fine, n_coarse),
            got: (node + 1, n_coarse),
        });
    }

    let mut coarse_near_null = Vector::zeros(n_coarse);
    for (coarse_i, agg) in partition.agg_to_node.iter().enumerate() {
        let r: f64 = agg.iter().map(|i| near_null[*i].powi(2)).sum();
        if r == 0.0 {
            return Err(SaError::InvalidParameter {
                name: "B",
                value: r,
            });
        }
        coarse_near_null[coarse_i] = r.sqrt();
    }

    let mut t = TriMat::new((n_fine, n_coarse));
    for (fine_idx, coarse_idx) in partition.node_to_agg.iter().cloned().enumerate() {
        t.add_triplet(
            fine_idx,
            coarse_idx,
            near_null[fine_idx] / coarse_near_null[coarse_idx],
        );
    }
    Ok((t.to_csr::<usize>(), coarse_near_null))
}

/// Damped Jacobi smoothing of a tentative prolongator:
/// `P = T - omega / rho * D^-1 S T` with `D = diag(S)`.
///
/// `rho` is an estimate of the spectral radius of `D^-1 S` (or of `D^-1 A`,
/// which shares its diagonal). The result comes back in the format of `t`;
/// coordinate operands are reshaped into compressed rows first.
pub fn smooth_prolongator(
    s: &SparseMatrix,
    t: &SparseMatrix,
    rho: f64,
    omega: f64,
) -> Result<SparseMatrix> {
    check_operands(s.shape(), t.shape(), rho, omega)?;

    let s_csr = s.to_csr()?;
    let t_csr = t.to_csr()?;
    let p = smooth_prolongator_csr(&s_csr, &t_csr, rho, omega)?;

    match t.format() {
        Format::CompressedRow => Ok(SparseMatrix::CompressedRow(p)),
        Format::Coordinate => Ok(SparseMatrix::Coordinate(
            CsrView::from_csr(&p)?.to_coo_matrix(),
        )),
    }
}

/// Compressed-row core of [`smooth_prolongator`].
pub fn smooth_prolongator_csr(
    s: &CsrMatrix,
    t: &CsrMatrix,
    rho: f64,
    omega: f64,
) -> Result<CsrMatrix> {
    check_operands(s.shape(), t.shape(), rho, omega)?;

    let s_view = CsrView::from_csr(s)?;
    let diagonal = extract_diagonal(&s_view);
    if let Some(row) = diagonal.iter().position(|d| *d == 0.0) {
        return Err(SaError::SingularDiagonal {
            op: "smooth_prolongator",
            row,
        });
    }

    // D^-1 S, one row at a time
    let offsets = s_view.offsets().to_vec();
    let mut d_inv_s = s.clone();
    let values = d_inv_s.data_mut();
    for (row, d) in diagonal.iter().enumerate() {
        for val in values[offsets[row]..offsets[row + 1]].iter_mut() {
            *val /= d;
        }
    }

    let lambda = omega / rho;
    if !lambda.is_finite() {
        return Err(SaError::NumericOverflow {
            op: "smooth_prolongator",
        });
    }
    values.iter_mut().for_each(|val| *val *= lambda);

    let temp = &d_inv_s * t;
    let p = t - &temp;

    if p.data().iter().any(|val| !val.is_finite()) {
        return Err(SaError::NumericOverflow {
            op: "smooth_prolongator",
        });
    }
    trace!(
        "smoothed prolongator {}x{}: nnz {} -> {} (lambda = {lambda:.4e})",
        p.rows(),
        p.cols(),
        t.nnz(),
        p.nnz()
    );
    Ok(p)
}

fn check_operands(
    s_shape: (usize, usize),
    t_shape: (usize, usize),
    rho: f64,
    omega: f64,
) -> Result<()> {
    if !(rho.is_finite() && rho > 0.0) {
        return Err(SaError::InvalidParameter {
            name: "rho",
            value: rho,
        });
    }
    if !omega.is_finite() {
        return Err(SaError::InvalidParameter {
            name: "omega",
            value: omega,
        });
    }
    if s_shape.0 != s_shape.1 {
        return Err(SaError::InvalidShape {
            op: "smooth_prolongator",
            expected: (s_shape.0, s_shape.0),
            got: s_shape,
        });
    }
    if t_shape.0 != s_shape.0 {
        return Err(SaError::InvalidShape {
            op: "smooth_prolongator",
            expected: (s_shape.0, t_shape.1),
            got: t_shape,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel_ops::{spmv, Execution};
    use crate::strength::symmetric_strength_of_connection;
    use crate::utils::{neumann_1d, poisson_1d, poisson_2d};
    use approx::assert_abs_diff_eq;

    fn one_aggregate(n: usize) -> Partition {
        Partition::from_node_to_agg(vec![0; n]).unwrap()
    }

    fn entry(mat: &CsrMatrix, i: usize, j: usize) -> f64 {
        mat.get(i, j).copied().unwrap_or(0.0)
    }

    fn column_sums(mat: &CsrMatrix) -> Vec<f64> {
        let mut sums = vec![0.0; mat.cols()];
        for (val, (_, j)) in mat.iter() {
            sums[j] += *val;
        }
        sums
    }

    #[test]
    fn tentative_prolongator_reproduces_candidate() {
        let partition = Partition::from_node_to_agg(vec![0, 0, 1, 1, 1, 2]).unwrap();
        let b = Vector::from(vec![1.0, 2.0, 1.0, 1.0, 1.0, -3.0]);
        let (t, b_c) = fit_candidates(&partition, &b).unwrap();

        assert_eq!(t.shape(), (6, 3));
        assert_eq!(t.nnz(), 6);
        assert_abs_diff_eq!(b_c[0], 5.0_f64.sqrt(), epsilon = 1e-15);
        assert_abs_diff_eq!(b_c[2], 3.0, epsilon = 1e-15);
        assert_abs_diff_eq!(entry(&t, 5, 2), -1.0, epsilon = 1e-15);

        let t_b_c = spmv(&CsrView::from_csr(&t).unwrap(), &b_c, Execution::Sequential);
        assert_abs_diff_eq!(t_b_c, b, epsilon = 1e-14);
    }

    #[test]
    fn vanishing_candidate_on_aggregate() {
        let partition = Partition::from_node_to_agg(vec![0, 1, 1]).unwrap();
        let b = Vector::from(vec![0.0, 1.0, 1.0]);
        assert!(matches!(
            fit_candidates(&partition, &b),
            Err(SaError::InvalidParameter { name: "B", .. })
        ));
    }

    #[test]
    fn inconsistent_partition_is_rejected() {
        let b = Vector::from_elem(2, 1.0);
        let label_out_of_range = Partition {
            node_to_agg: vec![0, 5],
            agg_to_node: vec![vec![0, 1]],
        };
        assert!(matches!(
            fit_candidates(&label_out_of_range, &b),
            Err(SaError::InvalidShape { op: "fit_candidates", .. })
        ));

        let node_out_of_range = Partition {
            node_to_agg: vec![0, 0],
            agg_to_node: vec![vec![0, 1, 7]],
        };
        assert!(matches!(
            fit_candidates(&node_out_of_range, &b),
            Err(SaError::InvalidShape { op: "fit_candidates", .. })
        ));
    }

    #[test]
    fn zero_omega_leaves_tentative_prolongator() {
        let a = poisson_2d(5, 1.0);
        let s = symmetric_strength_of_connection(&a.into(), 0.0, Execution::Sequential).unwrap();
        let partition = Partition::from_node_to_agg((0..25).map(|i| i / 5).collect()).unwrap();
        let (t, _) = fit_candidates(&partition, &Vector::from_elem(25, 1.0)).unwrap();
        let t = SparseMatrix::from(t);

        let p = smooth_prolongator(&s, &t, 1.9, 0.0).unwrap();
        let (p, t) = (p.to_csr().unwrap(), t.to_csr().unwrap());
        for i in 0..25 {
            for j in 0..5 {
                assert_eq!(entry(&p, i, j), entry(&t, i, j));
            }
        }
    }

    #[test]
    fn poisson_1d_single_aggregate() {
        let a = poisson_1d(5);
        let s = symmetric_strength_of_connection(&a.clone().into(), 0.25, Execution::Sequential)
            .unwrap()
            .to_csr()
            .unwrap();
        assert_eq!(s.data(), a.data());

        let b = Vector::from_elem(5, 1.0);
        let (t, b_c) = fit_candidates(&one_aggregate(5), &b).unwrap();
        assert_abs_diff_eq!(b_c[0], 5.0_f64.sqrt(), epsilon = 1e-15);

        let (rho, omega) = (3.414, 4.0 / 3.0);
        let p = smooth_prolongator_csr(&s, &t, rho, omega).unwrap();
        assert_eq!(p.shape(), (5, 1));

        // D^-1 A 1 = [1/2, 0, 0, 0, 1/2]
        let c = 1.0 / 5.0_f64.sqrt();
        let boundary = c * (1.0 - omega / rho * 0.5);
        let expected = [boundary, c, c, c, boundary];
        for (i, val) in expected.iter().enumerate() {
            assert_abs_diff_eq!(entry(&p, i, 0), *val, epsilon = 1e-14);
        }
    }

    #[test]
    fn zero_row_sums_preserve_column_sums() {
        let a = neumann_1d(5);
        let s = symmetric_strength_of_connection(&a.into(), 0.25, Execution::Sequential)
            .unwrap()
            .to_csr()
            .unwrap();
        let (t, _) = fit_candidates(&one_aggregate(5), &Vector::from_elem(5, 1.0)).unwrap();
        let p = smooth_prolongator_csr(&s, &t, 2.0, 4.0 / 3.0).unwrap();

        let (p_sums, t_sums) = (column_sums(&p), column_sums(&t));
        assert_abs_diff_eq!(p_sums[0], t_sums[0], epsilon = 1e-14);
    }

    #[test]
    fn smoothed_prolongator_interpolates_candidate() {
        let a = neumann_1d(9);
        let s = symmetric_strength_of_connection(&a.into(), 0.0, Execution::Sequential)
            .unwrap()
            .to_csr()
            .unwrap();
        let partition = Partition::from_node_to_agg(vec![0, 0, 0, 1, 1, 1, 2, 2, 2]).unwrap();
        let b = Vector::from_elem(9, 1.0);
        let (t, b_c) = fit_candidates(&partition, &b).unwrap();
        let p = smooth_prolongator_csr(&s, &t, 2.0, 4.0 / 3.0).unwrap();

        // the pattern grows by one hop through S
        assert!(p.nnz() > t.nnz());
        assert!(entry(&p, 3, 0) != 0.0);

        let p_b_c = spmv(&CsrView::from_csr(&p).unwrap(), &b_c, Execution::Sequential);
        assert_abs_diff_eq!(p_b_c, b, epsilon = 1e-13);
    }

    #[test]
    fn coordinate_operands_give_coordinate_result() {
        let a: SparseMatrix = poisson_1d(6).into();
        let s = symmetric_strength_of_connection(&a, 0.0, Execution::Sequential).unwrap();
        let partition = Partition::from_node_to_agg(vec![0, 0, 0, 1, 1, 1]).unwrap();
        let (t, _) = fit_candidates(&partition, &Vector::from_elem(6, 1.0)).unwrap();
        let t = SparseMatrix::from(t);

        let direct = smooth_prolongator(&s, &t, 1.8, 4.0 / 3.0).unwrap();
        let via_coo = smooth_prolongator(
            &s.to_format(Format::Coordinate).unwrap(),
            &t.to_format(Format::Coordinate).unwrap(),
            1.8,
            4.0 / 3.0,
        )
        .unwrap();
        assert_eq!(via_coo.format(), Format::Coordinate);
        for (i, j) in [(0, 0), (2, 1), (3, 0), (5, 1)] {
            assert_abs_diff_eq!(
                via_coo.get(i, j).unwrap_or(0.0),
                direct.get(i, j).unwrap_or(0.0),
                epsilon = 1e-15
            );
        }

        let (direct, via_coo) = (direct.to_csr().unwrap(), via_coo.to_csr().unwrap());
        assert_eq!(direct.indices(), via_coo.indices());
        assert_eq!(direct.data(), via_coo.data());
    }

    #[test]
    fn operand_checks() {
        let s: SparseMatrix = poisson_1d(4).into();
        let t: SparseMatrix = poisson_1d(3).into();
        assert!(matches!(
            smooth_prolongator(&s, &t, 2.0, 1.0),
            Err(SaError::InvalidShape { .. })
        ));
        assert!(matches!(
            smooth_prolongator(&s, &s, 0.0, 1.0),
            Err(SaError::InvalidParameter { name: "rho", .. })
        ));

        let hollow: SparseMatrix = sprs::TriMat::from_triplets(
            (2, 2),
            vec![0, 1],
            vec![1, 0],
            vec![-1.0, -1.0],
        )
        .into();
        assert_eq!(
            smooth_prolongator(&hollow, &hollow, 1.0, 1.0).unwrap_err(),
            SaError::SingularDiagonal {
                op: "smooth_prolongator",
                row: 0
            }
        );
    }
}
