//! Execution strategy selection and the sparse kernels that honor it.
//! Parallel variants produce exactly the sequential results: the work is split
//! by rows and every row is reduced in storage order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::sparse::CsrView;
use crate::Vector;

/// How a kernel distributes its per-row work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum Execution {
    #[default]
    Sequential,
    Parallel,
}

fn row_dot(a: &CsrView, i: usize, x: &Vector) -> f64 {
    let (cols, vals) = a.row(i);
    cols.iter().zip(vals.iter()).map(|(j, val)| x[*j] * val).sum::<f64>()
}

/// `y = A x`
pub fn spmv(a: &CsrView, x: &Vector, exec: Execution) -> Vector {
    assert_eq!(a.cols(), x.len());
    match exec {
        Execution::Sequential => Vector::from_iter((0..a.rows()).map(|i| row_dot(a, i, x))),
        Execution::Parallel => {
            let y: Vec<f64> = (0..a.rows())
                .into_par_iter()
                .map(|i| row_dot(a, i, x))
                .collect();
            Vector::from(y)
        }
    }
}

/// Per-row count of entries satisfying `keep(row, col, value)`.
pub fn count_rows<F>(a: &CsrView, exec: Execution, keep: F) -> Vec<usize>
where
    F: Fn(usize, usize, f64) -> bool + Sync,
{
    let count = |i: usize| {
        let (cols, vals) = a.row(i);
        cols.iter()
            .zip(vals.iter())
            .filter(|(j, v)| keep(i, **j, **v))
            .count()
    };
    match exec {
        Execution::Sequential => (0..a.rows()).map(count).collect(),
        Execution::Parallel => (0..a.rows()).into_par_iter().map(count).collect(),
    }
}

/// Second pass of a count/fill filter: writes the entries satisfying
/// `keep(row, col, value)` into arrays sized by `counts`, which must come from
/// [`count_rows`] with the same predicate. Storage order within each row is kept.
pub fn fill_rows<F>(
    a: &CsrView,
    counts: &[usize],
    exec: Execution,
    keep: F,
) -> (Vec<usize>, Vec<f64>)
where
    F: Fn(usize, usize, f64) -> bool + Sync,
{
    let total: usize = counts.iter().sum();
    let mut indices = vec![0; total];
    let mut values = vec![0.0; total];

    let fill = |i: usize, out_indices: &mut [usize], out_values: &mut [f64]| {
        let (cols, vals) = a.row(i);
        let kept = cols
            .iter()
            .zip(vals.iter())
            .filter(|(j, v)| keep(i, **j, **v));
        for (k, (j, v)) in kept.enumerate() {
            out_indices[k] = *j;
            out_values[k] = *v;
        }
    };

    // carve the outputs into one disjoint slice pair per row
    let mut rows = Vec::with_capacity(counts.len());
    let (mut rest_indices, mut rest_values) = (&mut indices[..], &mut values[..]);
    for &count in counts {
        let (head_indices, tail_indices) = std::mem::take(&mut rest_indices).split_at_mut(count);
        let (head_values, tail_values) = std::mem::take(&mut rest_values).split_at_mut(count);
        rows.push((head_indices, head_values));
        rest_indices = tail_indices;
        rest_values = tail_values;
    }

    match exec {
        Execution::Sequential => rows
            .into_iter()
            .enumerate()
            .for_each(|(i, (out_indices, out_values))| fill(i, out_indices, out_values)),
        Execution::Parallel => rows
            .into_par_iter()
            .enumerate()
            .for_each(|(i, (out_indices, out_values))| fill(i, out_indices, out_values)),
    }

    (indices, values)
}
