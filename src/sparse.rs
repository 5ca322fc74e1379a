//! Storage-format plumbing around the `sprs` containers.
//!
//! The level algorithms are written once against a compressed-row view
//! ([`CsrView`]). Coordinate matrices are brought into that shape by sorting
//! their triplets row-major and deriving the row offsets, then the result is
//! converted back into whatever format the caller handed in.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};
use strum_macros::{Display, EnumString};

use crate::error::{Result, SaError};
use crate::{CooMatrix, CsrMatrix, Vector};

/// Storage format tag of a [`SparseMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum Format {
    Coordinate,
    CompressedRow,
}

/// A sparse matrix in one of the supported storage formats.
#[derive(Debug)]
pub enum SparseMatrix {
    Coordinate(CooMatrix),
    CompressedRow(CsrMatrix),
}

// `TriMat` does not implement `Clone`, so coordinate storage is rebuilt from
// its triplets.
impl Clone for SparseMatrix {
    fn clone(&self) -> Self {
        match self {
            SparseMatrix::Coordinate(mat) => SparseMatrix::Coordinate(copy_coo(mat)),
            SparseMatrix::CompressedRow(mat) => SparseMatrix::CompressedRow(mat.clone()),
        }
    }
}

fn copy_coo(mat: &CooMatrix) -> CooMatrix {
    TriMat::from_triplets(
        mat.shape(),
        mat.row_inds().to_vec(),
        mat.col_inds().to_vec(),
        mat.data().to_vec(),
    )
}

impl From<CsrMatrix> for SparseMatrix {
    fn from(mat: CsrMatrix) -> Self {
        SparseMatrix::CompressedRow(mat)
    }
}

impl From<CooMatrix> for SparseMatrix {
    fn from(mat: CooMatrix) -> Self {
        SparseMatrix::Coordinate(mat)
    }
}

impl SparseMatrix {
    /// An empty `rows x cols` matrix with no stored entries.
    pub fn zero(format: Format, rows: usize, cols: usize) -> Self {
        match format {
            Format::Coordinate => SparseMatrix::Coordinate(TriMat::new((rows, cols))),
            Format::CompressedRow => SparseMatrix::CompressedRow(CsMat::zero((rows, cols))),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            SparseMatrix::Coordinate(_) => Format::Coordinate,
            SparseMatrix::CompressedRow(_) => Format::CompressedRow,
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            SparseMatrix::Coordinate(mat) => mat.rows(),
            SparseMatrix::CompressedRow(mat) => mat.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            SparseMatrix::Coordinate(mat) => mat.cols(),
            SparseMatrix::CompressedRow(mat) => mat.cols(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Number of stored entries (explicit zeros and coordinate duplicates included).
    pub fn nnz(&self) -> usize {
        match self {
            SparseMatrix::Coordinate(mat) => mat.nnz(),
            SparseMatrix::CompressedRow(mat) => mat.nnz(),
        }
    }

    /// Compressed-row view of the matrix. Borrows whenever the storage is
    /// already in canonical compressed-row order.
    pub fn csr_view(&self) -> Result<CsrView<'_>> {
        match self {
            SparseMatrix::Coordinate(mat) => CsrView::from_coo(mat),
            SparseMatrix::CompressedRow(mat) => CsrView::from_csr(mat),
        }
    }

    pub fn to_csr(&self) -> Result<CsrMatrix> {
        match self {
            SparseMatrix::CompressedRow(mat) if mat.is_csr() => Ok(mat.clone()),
            SparseMatrix::CompressedRow(mat) => Ok(mat.to_csr()),
            SparseMatrix::Coordinate(_) => self.csr_view()?.to_csr_matrix(),
        }
    }

    pub fn to_format(&self, format: Format) -> Result<SparseMatrix> {
        match (self, format) {
            (SparseMatrix::Coordinate(mat), Format::Coordinate) => {
                Ok(SparseMatrix::Coordinate(copy_coo(mat)))
            }
            (_, Format::CompressedRow) => Ok(SparseMatrix::CompressedRow(self.to_csr()?)),
            (SparseMatrix::CompressedRow(_), Format::Coordinate) => {
                Ok(SparseMatrix::Coordinate(self.csr_view()?.to_coo_matrix()))
            }
        }
    }

    /// Value stored at `(row, col)`, summing coordinate duplicates.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        match self {
            SparseMatrix::CompressedRow(mat) => mat.get(row, col).copied(),
            SparseMatrix::Coordinate(mat) => {
                let mut found = None;
                for (val, (i, j)) in mat.triplet_iter() {
                    if i == row && j == col {
                        *found.get_or_insert(0.0) += *val;
                    }
                }
                found
            }
        }
    }
}

/// Compressed-row view: `offsets` has `rows + 1` monotone entries starting
/// at zero, row `i` owns `indices[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone)]
pub struct CsrView<'a> {
    rows: usize,
    cols: usize,
    offsets: Cow<'a, [usize]>,
    indices: Cow<'a, [usize]>,
    values: Cow<'a, [f64]>,
}

impl<'a> CsrView<'a> {
    /// Build a view from raw parts after checking the compressed-row invariants.
    pub fn new(
        rows: usize,
        cols: usize,
        offsets: Cow<'a, [usize]>,
        indices: Cow<'a, [usize]>,
        values: Cow<'a, [f64]>,
    ) -> Result<Self> {
        let view = Self {
            rows,
            cols,
            offsets,
            indices,
            values,
        };
        view.validate()?;
        Ok(view)
    }

    pub fn from_csr(mat: &'a CsrMatrix) -> Result<Self> {
        if !mat.is_csr() {
            return Err(SaError::MalformedStructure(
                "expected compressed-row storage, got compressed-column".into(),
            ));
        }
        Self::new(
            mat.rows(),
            mat.cols(),
            mat.proper_indptr(),
            Cow::Borrowed(mat.indices()),
            Cow::Borrowed(mat.data()),
        )
    }

    /// Coordinate view reshaped as compressed rows. Triplets already sorted by
    /// `(row, col)` without duplicates are borrowed as they are; otherwise
    /// they are sorted (stable) and duplicates are summed.
    pub fn from_coo(mat: &'a CooMatrix) -> Result<Self> {
        let (rows, cols) = (mat.rows(), mat.cols());
        let row_inds = mat.row_inds();
        let col_inds = mat.col_inds();
        let data = mat.data();

        let canonical = row_inds
            .iter()
            .zip(col_inds.iter())
            .zip(row_inds.iter().zip(col_inds.iter()).skip(1))
            .all(|(prev, next)| prev < next);

        if canonical {
            let offsets = indices_to_offsets(row_inds, rows)?;
            return Self::new(
                rows,
                cols,
                Cow::Owned(offsets),
                Cow::Borrowed(col_inds),
                Cow::Borrowed(data),
            );
        }

        trace!("canonicalizing {} coordinate entries", data.len());
        let mut order: Vec<usize> = (0..data.len()).collect();
        order.sort_by_key(|&k| (row_inds[k], col_inds[k]));

        let mut sorted_rows: Vec<usize> = Vec::with_capacity(order.len());
        let mut sorted_cols: Vec<usize> = Vec::with_capacity(order.len());
        let mut sorted_vals: Vec<f64> = Vec::with_capacity(order.len());
        for k in order {
            let (i, j) = (row_inds[k], col_inds[k]);
            if sorted_rows.last() == Some(&i) && sorted_cols.last() == Some(&j) {
                if let Some(last) = sorted_vals.last_mut() {
                    *last += data[k];
                }
                continue;
            }
            sorted_rows.push(i);
            sorted_cols.push(j);
            sorted_vals.push(data[k]);
        }

        let offsets = indices_to_offsets(&sorted_rows, rows)?;
        Self::new(
            rows,
            cols,
            Cow::Owned(offsets),
            Cow::Owned(sorted_cols),
            Cow::Owned(sorted_vals),
        )
    }

    fn validate(&self) -> Result<()> {
        let offsets = &*self.offsets;
        if offsets.len() != self.rows + 1 {
            return Err(SaError::MalformedStructure(format!(
                "{} row offsets for {} rows",
                offsets.len(),
                self.rows
            )));
        }
        if offsets[0] != 0 {
            return Err(SaError::MalformedStructure(format!(
                "row offsets start at {}",
                offsets[0]
            )));
        }
        if let Some(row) = offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(SaError::MalformedStructure(format!(
                "row offsets decrease at row {row}"
            )));
        }
        let nnz = offsets[self.rows];
        if nnz != self.indices.len() || nnz != self.values.len() {
            return Err(SaError::MalformedStructure(format!(
                "offsets end at {nnz} but {} indices and {} values are stored",
                self.indices.len(),
                self.values.len()
            )));
        }
        if let Some(&j) = self.indices.iter().find(|&&j| j >= self.cols) {
            return Err(SaError::MalformedStructure(format!(
                "column index {j} out of bounds for {} columns",
                self.cols
            )));
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.offsets[i]..self.offsets[i + 1];
        (&self.indices[range.clone()], &self.values[range])
    }

    pub fn to_csr_matrix(&self) -> Result<CsrMatrix> {
        CsMat::try_new(
            (self.rows, self.cols),
            self.offsets.to_vec(),
            self.indices.to_vec(),
            self.values.to_vec(),
        )
        .map_err(|(_, _, _, err)| err.into())
    }

    /// Row-major coordinate copy of the view.
    pub fn to_coo_matrix(&self) -> CooMatrix {
        let mut row_inds = Vec::with_capacity(self.nnz());
        for i in 0..self.rows {
            row_inds.extend(std::iter::repeat(i).take(self.offsets[i + 1] - self.offsets[i]));
        }
        TriMat::from_triplets(
            (self.rows, self.cols),
            row_inds,
            self.indices.to_vec(),
            self.values.to_vec(),
        )
    }
}

/// Turn sorted row indices of a coordinate matrix into `num_rows + 1`
/// compressed-row offsets.
pub fn indices_to_offsets(row_indices: &[usize], num_rows: usize) -> Result<Vec<usize>> {
    if let Some(k) = row_indices.windows(2).position(|w| w[0] > w[1]) {
        return Err(SaError::MalformedStructure(format!(
            "coordinate row indices not sorted at entry {}",
            k + 1
        )));
    }
    if let Some(&i) = row_indices.last().filter(|&&i| i >= num_rows) {
        return Err(SaError::MalformedStructure(format!(
            "row index {i} out of bounds for {num_rows} rows"
        )));
    }

    let mut offsets = vec![0; num_rows + 1];
    for &i in row_indices {
        offsets[i + 1] += 1;
    }
    for i in 0..num_rows {
        offsets[i + 1] += offsets[i];
    }
    Ok(offsets)
}

/// Dense copy of the main diagonal, structurally missing entries read as zero.
pub fn extract_diagonal(mat: &CsrView) -> Vector {
    let n = mat.rows().min(mat.cols());
    Vector::from_iter((0..n).map(|i| {
        let (cols, vals) = mat.row(i);
        cols.iter()
            .zip(vals.iter())
            .filter(|(j, _)| **j == i)
            .map(|(_, v)| *v)
            .sum::<f64>()
    }))
}
