//! Symmetric strength of connection.
//!
//! An entry `A_ij` is strong when `|A_ij| >= theta * sqrt(|A_ii * A_jj|)`,
//! tested in the squared form `A_ij^2 >= theta^2 * |A_ii * A_jj|`. The test
//! is symmetric in `i` and `j`; the output is not symmetrized afterwards and
//! keeps the original values of `A`.

use crate::config::validate_theta;
use crate::error::{Result, SaError};
use crate::parallel_ops::{count_rows, fill_rows, Execution};
use crate::sparse::{extract_diagonal, CsrView, Format, SparseMatrix};
use crate::CsrMatrix;

/// Strength matrix of `a`, returned in the storage format of `a`.
///
/// Coordinate input is viewed as compressed rows (row-major, offsets derived
/// from the row indices), filtered, and converted back to coordinates.
pub fn symmetric_strength_of_connection(
    a: &SparseMatrix,
    theta: f64,
    exec: Execution,
) -> Result<SparseMatrix> {
    let view = a.csr_view()?;
    let s = symmetric_strength_csr(&view, theta, exec)?;
    match a.format() {
        Format::CompressedRow => Ok(SparseMatrix::CompressedRow(s)),
        Format::Coordinate => Ok(SparseMatrix::Coordinate(
            CsrView::from_csr(&s)?.to_coo_matrix(),
        )),
    }
}

/// Compressed-row strength filter: one pass counts the strong entries per
/// row, a second pass writes them in the order they appear in `a`.
///
/// With `theta == 0` every entry is kept. With `theta > 0` every diagonal
/// entry must be nonzero, otherwise the test against a zero diagonal would
/// admit anything coupled to that row and [`SaError::SingularDiagonal`] is
/// returned instead.
pub fn symmetric_strength_csr(a: &CsrView, theta: f64, exec: Execution) -> Result<CsrMatrix> {
    validate_theta(theta)?;
    if a.rows() != a.cols() {
        return Err(SaError::InvalidShape {
            op: "symmetric_strength_of_connection",
            expected: (a.rows(), a.rows()),
            got: a.shape(),
        });
    }

    let diagonal = extract_diagonal(a);
    if theta > 0.0 {
        if let Some(row) = diagonal.iter().position(|d| *d == 0.0) {
            return Err(SaError::SingularDiagonal {
                op: "symmetric_strength_of_connection",
                row,
            });
        }
    }

    let theta_squared = theta * theta;
    let strong =
        |i: usize, j: usize, a_ij: f64| a_ij * a_ij >= theta_squared * (diagonal[i] * diagonal[j]).abs();

    let counts = count_rows(a, exec, strong);
    let mut offsets = Vec::with_capacity(a.rows() + 1);
    let mut num_entries = 0;
    for count in counts.iter() {
        offsets.push(num_entries);
        num_entries += count;
    }
    offsets.push(num_entries);

    let (indices, values) = fill_rows(a, &counts, exec, strong);
    trace!(
        "strength theta={theta}: kept {num_entries} of {} entries",
        a.nnz()
    );

    CsrView::new(
        a.rows(),
        a.cols(),
        offsets.into(),
        indices.into(),
        values.into(),
    )?
    .to_csr_matrix()
}
