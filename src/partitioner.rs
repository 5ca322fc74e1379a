use serde::{Deserialize, Serialize};

use crate::error::{Result, SaError};
use crate::sparse::SparseMatrix;

/// Assignment of fine nodes to aggregates. `node_to_agg` is the aggregates
/// label array of the level, `agg_to_node` its inverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub node_to_agg: Vec<usize>,
    pub agg_to_node: Vec<Vec<usize>>,
}

impl Partition {
    /// Labels must cover `0..k` without gaps.
    pub fn from_node_to_agg(node_to_agg: Vec<usize>) -> Result<Self> {
        let num_aggs = node_to_agg.iter().max().map_or(0, |max| max + 1);
        let mut agg_to_node = vec![Vec::new(); num_aggs];
        for (node, agg) in node_to_agg.iter().enumerate() {
            agg_to_node[*agg].push(node);
        }
        if let Some(agg) = agg_to_node.iter().position(|nodes| nodes.is_empty()) {
            return Err(SaError::MalformedStructure(format!(
                "aggregate {agg} has no nodes"
            )));
        }
        Ok(Self {
            node_to_agg,
            agg_to_node,
        })
    }

    pub fn num_aggregates(&self) -> usize {
        self.agg_to_node.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.node_to_agg.len()
    }
}

/// Greedy three phase aggregation of the graph of a strength matrix:
///
/// 1. a node whose strong neighbors are all free seeds an aggregate with them,
/// 2. leftover nodes join the phase 1 aggregate of a strong neighbor,
/// 3. anything still free forms a new aggregate with its free neighbors.
///
/// Isolated nodes end up as singletons.
pub fn standard_aggregation(s: &SparseMatrix) -> Result<Partition> {
    let s = s.csr_view()?;
    let n = s.rows();
    if n != s.cols() {
        return Err(SaError::InvalidShape {
            op: "standard_aggregation",
            expected: (n, n),
            got: s.shape(),
        });
    }

    let neighbors = |i: usize| s.row(i).0.iter().copied().filter(move |j| *j != i);
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut num_aggs = 0;

    for i in 0..n {
        if labels[i].is_some() || neighbors(i).any(|j| labels[j].is_some()) {
            continue;
        }
        labels[i] = Some(num_aggs);
        for j in neighbors(i) {
            labels[j] = Some(num_aggs);
        }
        num_aggs += 1;
    }
    let seeded = num_aggs;

    let phase_one = labels.clone();
    for i in 0..n {
        if labels[i].is_none() {
            labels[i] = neighbors(i).find_map(|j| phase_one[j]);
        }
    }

    for i in 0..n {
        if labels[i].is_some() {
            continue;
        }
        labels[i] = Some(num_aggs);
        for j in neighbors(i) {
            if labels[j].is_none() {
                labels[j] = Some(num_aggs);
            }
        }
        num_aggs += 1;
    }

    trace!(
        "aggregated {n} nodes into {num_aggs} aggregates ({seeded} seeded in phase 1)"
    );
    let node_to_agg = labels.into_iter().flatten().collect::<Vec<_>>();
    Partition::from_node_to_agg(node_to_agg)
}
