//! Matrix-free linear operators.

use crate::error::{Result, SaError};
use crate::parallel_ops::{spmv, Execution};
use crate::sparse::{extract_diagonal, CsrView};
use crate::Vector;

pub trait LinearOperator {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    /// `y = Op x`
    fn apply(&self, x: &Vector) -> Vector;
}

/// A sparse matrix applied as an operator.
pub struct MatrixOperator<'a> {
    mat: CsrView<'a>,
    exec: Execution,
}

impl<'a> MatrixOperator<'a> {
    pub fn new(mat: CsrView<'a>, exec: Execution) -> Self {
        Self { mat, exec }
    }
}

impl LinearOperator for MatrixOperator<'_> {
    fn rows(&self) -> usize {
        self.mat.rows()
    }

    fn cols(&self) -> usize {
        self.mat.cols()
    }

    fn apply(&self, x: &Vector) -> Vector {
        spmv(&self.mat, x, self.exec)
    }
}

/// The Jacobi-scaled operator `D^-1 A` with `D = diag(A)`. Applies `A` and
/// then scales each row of the result, `D^-1 A` is never formed.
pub struct DinvA<'a> {
    a: MatrixOperator<'a>,
    diag_inv: Vector,
}

impl<'a> DinvA<'a> {
    pub fn new(a: CsrView<'a>, exec: Execution) -> Result<Self> {
        if a.rows() != a.cols() {
            return Err(SaError::InvalidShape {
                op: "DinvA",
                expected: (a.rows(), a.rows()),
                got: a.shape(),
            });
        }
        let diag = extract_diagonal(&a);
        if let Some(row) = diag.iter().position(|d| *d == 0.0) {
            return Err(SaError::SingularDiagonal { op: "DinvA", row });
        }
        let diag_inv = diag.mapv(f64::recip);
        Ok(Self {
            a: MatrixOperator::new(a, exec),
            diag_inv,
        })
    }
}

impl LinearOperator for DinvA<'_> {
    fn rows(&self) -> usize {
        self.a.rows()
    }

    fn cols(&self) -> usize {
        self.a.cols()
    }

    fn apply(&self, x: &Vector) -> Vector {
        let mut y = self.a.apply(x);
        y *= &self.diag_inv;
        y
    }
}
