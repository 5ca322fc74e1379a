use core::fmt;

use std::sync::Arc;

use crate::config::SaConfig;
use crate::error::{Result, SaError};
use crate::interpolation::{fit_candidates, smooth_prolongator};
use crate::partitioner::standard_aggregation;
use crate::spectral::estimate_rho_dinv_a;
use crate::sparse::{Format, SparseMatrix};
use crate::strength::symmetric_strength_of_connection;
use crate::{CsrMatrix, Vector};

/// Everything one coarsening level of a smoothed aggregation hierarchy
/// produces. The operator is shared with whoever built it rather than copied;
/// the hierarchy builder owns the level and decides when it is rebuilt.
#[derive(Clone)]
pub struct SaLevel {
    pub a: Arc<SparseMatrix>,
    /// tentative prolongator
    pub t: SparseMatrix,
    /// smoothed prolongator
    pub p: SparseMatrix,
    pub aggregates: Vec<usize>,
    /// near-nullspace candidate
    pub b: Vector,
    pub num_iters: usize,
    /// cached spectral radius estimate of `D^-1 A`
    pub rho_dinv_a: f64,
}

impl Default for SaLevel {
    fn default() -> Self {
        Self {
            a: Arc::new(SparseMatrix::zero(Format::CompressedRow, 0, 0)),
            t: SparseMatrix::zero(Format::CompressedRow, 0, 0),
            p: SparseMatrix::zero(Format::CompressedRow, 0, 0),
            aggregates: Vec::new(),
            b: Vector::zeros(0),
            num_iters: 1,
            rho_dinv_a: 0.0,
        }
    }
}

impl fmt::Debug for SaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num_aggs = self.aggregates.iter().max().map_or(0, |max| max + 1);
        f.debug_struct("SaLevel")
            .field("format", &self.a.format())
            .field("size", &self.a.shape())
            .field("nnz", &self.a.nnz())
            .field("aggregates", &num_aggs)
            .field("prolongator", &(self.p.shape(), self.p.nnz()))
            .field("num_iters", &self.num_iters)
            .field("rho_dinv_a", &self.rho_dinv_a)
            .finish()
    }
}

impl SaLevel {
    /// Level carrying the operator, aggregates, candidate, iteration count and
    /// spectral radius of `other`, with the operator stored in `format`. The
    /// prolongators are not carried over.
    pub fn derived(other: &SaLevel, format: Format) -> Result<Self> {
        let a = if other.a.format() == format {
            other.a.clone()
        } else {
            Arc::new(other.a.to_format(format)?)
        };
        Ok(Self {
            a,
            t: SparseMatrix::zero(format, 0, 0),
            p: SparseMatrix::zero(format, 0, 0),
            aggregates: other.aggregates.clone(),
            b: other.b.clone(),
            num_iters: other.num_iters,
            rho_dinv_a: other.rho_dinv_a,
        })
    }
}

/// Build one smoothed aggregation level from the operator `a` and the
/// near-nullspace candidate `near_null`.
///
/// Returns the populated level together with the Galerkin coarse operator
/// `P^T A P` and the coarse candidate, which seed the next level. The
/// prolongators are stored in the format of `a`.
pub fn build_level(
    a: Arc<SparseMatrix>,
    near_null: &Vector,
    config: &SaConfig,
) -> Result<(SaLevel, CsrMatrix, Vector)> {
    config.validate()?;
    if near_null.len() != a.rows() {
        return Err(SaError::InvalidShape {
            op: "build_level",
            expected: (a.rows(), 1),
            got: (near_null.len(), 1),
        });
    }

    let s = symmetric_strength_of_connection(&a, config.theta, config.execution)?;
    trace!("strength: {} of {} entries are strong", s.nnz(), a.nnz());

    let partition = standard_aggregation(&s)?;
    let (t, coarse_near_null) = fit_candidates(&partition, near_null)?;
    let t = SparseMatrix::from(t).to_format(a.format())?;

    let rho = estimate_rho_dinv_a(&a, config)?;
    let p = smooth_prolongator(&s, &t, rho, config.omega)?;

    let p_csr = p.to_csr()?;
    let r = p_csr.transpose_view().to_csr();
    let mat_coarse = &r * &(&a.to_csr()? * &p_csr);

    info!(
        "built level: {} -> {} unknowns, coarse nnz {}, rho = {rho:.4}",
        a.rows(),
        mat_coarse.rows(),
        mat_coarse.nnz()
    );

    let level = SaLevel {
        a,
        t,
        p,
        aggregates: partition.node_to_agg,
        b: near_null.clone(),
        num_iters: 1,
        rho_dinv_a: rho,
    };
    Ok((level, mat_coarse, coarse_near_null))
}
