//! Greedy variable elimination orderings over an interaction graph
//!
//! The graph is given as a symmetric 0/1 adjacency matrix. At every step the remaining vertex with
//! the lowest heuristic score is eliminated: its neighbours are recorded as the scope of that step,
//! they are connected to each other (fill-in), and the vertex is removed from the graph.
//!
//! Defined in Koller & Friedman Section 9.4.3

use crate::util::{JunctionError, Result};

use ndarray::prelude as nd;
use serde::{Deserialize, Serialize};
use tracing::trace;


/// The cost function used to pick the next vertex to eliminate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EliminationHeuristic {
    /// Fewest current neighbours
    MinNeighbours,

    /// Fewest fill-in edges added by the elimination
    MinFill,
}

impl Default for EliminationHeuristic {
    fn default() -> Self {
        EliminationHeuristic::MinNeighbours
    }
}


/// The result of an elimination run: the vertices in elimination order and, for each, its
/// neighbours at the time it was eliminated
#[derive(Clone, Debug, PartialEq)]
pub struct EliminationOrdering {
    pub ordering: Vec<usize>,
    pub scopes: Vec<Vec<usize>>,
}


impl EliminationOrdering {

    pub fn len(&self) -> usize {
        self.ordering.len()
    }


    pub fn is_empty(&self) -> bool {
        self.ordering.is_empty()
    }


    /// Iterate `(vertex, neighbours)` pairs in elimination order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.ordering.iter().cloned().zip(self.scopes.iter().map(|s| s.as_slice()))
    }

}


/// Compute an elimination ordering with the min-neighbours heuristic
///
/// # Errors
/// * `JunctionError::InvalidGraph` if the matrix is not square, not symmetric, holds values other
///   than 0 and 1, or has a non-zero diagonal
pub fn elimination_ordering(matrix: &nd::Array2<u8>) -> Result<EliminationOrdering> {
    elimination_ordering_with(matrix, EliminationHeuristic::MinNeighbours)
}


/// Compute an elimination ordering with the given heuristic.
///
/// A vertex without neighbours scores infinity, so isolated vertices go last. Ties resolve to the
/// lowest index. The final vertex is appended with an empty scope.
///
/// # Errors
/// * `JunctionError::InvalidGraph`, see `elimination_ordering`
pub fn elimination_ordering_with(matrix: &nd::Array2<u8>, heuristic: EliminationHeuristic)
    -> Result<EliminationOrdering>
{
    validate(matrix)?;

    let n = matrix.nrows();
    let mut graph = matrix.clone();
    let mut eliminated = vec![false; n];
    let mut ordering = Vec::with_capacity(n);
    let mut scopes = Vec::with_capacity(n);

    for _ in 0..n.saturating_sub(1) {
        let mut best: Option<(usize, f64)> = None;
        for v in (0..n).filter(|&v| ! eliminated[v]) {
            let s = score(&graph, v, heuristic);
            if best.map_or(true, |(_, b)| s < b) {
                best = Some((v, s));
            }
        }

        let (v, s) = match best {
            Some(best) => best,
            None => break,
        };

        let scope = neighbours(&graph, v);
        trace!(vertex = v, score = s, ?scope, "eliminating");

        for &i in scope.iter() {
            for &j in scope.iter() {
                if i != j {
                    graph[[i, j]] = 1;
                }
            }
        }
        graph.row_mut(v).fill(0);
        graph.column_mut(v).fill(0);

        eliminated[v] = true;
        ordering.push(v);
        scopes.push(scope);
    }

    if let Some(last) = (0..n).find(|&v| ! eliminated[v]) {
        ordering.push(last);
        scopes.push(Vec::new());
    }

    Ok(EliminationOrdering { ordering, scopes })
}


fn validate(matrix: &nd::Array2<u8>) -> Result<()> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(JunctionError::InvalidGraph(
            format!("adjacency matrix is {}x{}, expected a square matrix", rows, cols)
        ));
    }

    for ((i, j), &value) in matrix.indexed_iter() {
        if value > 1 {
            return Err(JunctionError::InvalidGraph(
                format!("entry ({}, {}) is {}, expected 0 or 1", i, j, value)
            ));
        }
        if i == j && value != 0 {
            return Err(JunctionError::InvalidGraph(format!("vertex {} has a self loop", i)));
        }
        if matrix[[j, i]] != value {
            return Err(JunctionError::InvalidGraph(
                format!("adjacency matrix is not symmetric at ({}, {})", i, j)
            ));
        }
    }

    Ok(())
}


fn neighbours(graph: &nd::Array2<u8>, v: usize) -> Vec<usize> {
    graph.column(v)
         .iter()
         .enumerate()
         .filter(|&(_, &e)| e > 0)
         .map(|(i, _)| i)
         .collect()
}


fn score(graph: &nd::Array2<u8>, v: usize, heuristic: EliminationHeuristic) -> f64 {
    let adjacent = neighbours(graph, v);
    if adjacent.is_empty() {
        return f64::INFINITY;
    }

    match heuristic {
        EliminationHeuristic::MinNeighbours => adjacent.len() as f64,
        EliminationHeuristic::MinFill => {
            let mut fill = 0;
            for (k, &i) in adjacent.iter().enumerate() {
                for &j in adjacent[k + 1..].iter() {
                    if graph[[i, j]] == 0 {
                        fill += 1;
                    }
                }
            }
            fill as f64
        }
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    fn graph(n: usize, edges: &[(usize, usize)]) -> nd::Array2<u8> {
        let mut m = nd::Array2::zeros((n, n));
        for &(i, j) in edges {
            m[[i, j]] = 1;
            m[[j, i]] = 1;
        }
        m
    }

    #[test]
    fn chain() {
        let order = elimination_ordering(&graph(3, &[(0, 1), (1, 2)])).unwrap();

        assert_eq!(vec![0, 1, 2], order.ordering);
        assert_eq!(vec![vec![1], vec![2], vec![]], order.scopes);
    }

    #[test]
    /// The misconception loop, Koller & Friedman Figure 4.1
    fn cycle_adds_fill() {
        let order = elimination_ordering(&graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)])).unwrap();

        assert_eq!(vec![0, 1, 2, 3], order.ordering);
        assert_eq!(vec![vec![1, 3], vec![2, 3], vec![3], vec![]], order.scopes);

        let pairs: Vec<(usize, &[usize])> = order.iter().collect();
        assert_eq!((1, &[2, 3][..]), pairs[1]);
    }

    #[test]
    fn isolated_vertices_go_last() {
        // vertex 2 has no neighbours; once 0 is gone, 1 has none either
        let order = elimination_ordering(&graph(3, &[(0, 1)])).unwrap();
        assert_eq!(vec![0, 1, 2], order.ordering);

        let order = elimination_ordering(&graph(3, &[(1, 2)])).unwrap();
        assert_eq!(vec![1, 0, 2], order.ordering);

        // every vertex is visited exactly once
        let order = elimination_ordering(&graph(4, &[])).unwrap();
        assert_eq!(vec![0, 1, 2, 3], order.ordering);
        assert!(order.scopes.iter().all(|s| s.is_empty()));
    }

    #[test]
    fn min_fill() {
        // a triangle 0-1-2 hanging off a path 2-3-4-5
        let g = graph(6, &[(0, 1), (0, 2), (1, 2), (2, 3), (3, 4), (4, 5)]);

        let neighbours = elimination_ordering_with(&g, EliminationHeuristic::MinNeighbours).unwrap();
        assert_eq!(5, neighbours.ordering[0]);

        let fill = elimination_ordering_with(&g, EliminationHeuristic::MinFill).unwrap();
        assert_eq!(0, fill.ordering[0]);
        assert_eq!(6, fill.len());

        let mut sorted = fill.ordering.clone();
        sorted.sort();
        assert_eq!(vec![0, 1, 2, 3, 4, 5], sorted);
    }

    #[test]
    fn trivial_graphs() {
        assert!(elimination_ordering(&graph(0, &[])).unwrap().is_empty());

        let order = elimination_ordering(&graph(1, &[])).unwrap();
        assert_eq!(vec![0], order.ordering);
        assert_eq!(vec![Vec::<usize>::new()], order.scopes);
    }

    #[test]
    fn invalid_graphs() {
        let not_square = nd::Array2::<u8>::zeros((2, 3));

        let mut asymmetric = graph(3, &[]);
        asymmetric[[0, 1]] = 1;

        let mut weighted = graph(2, &[(0, 1)]);
        weighted[[0, 1]] = 2;
        weighted[[1, 0]] = 2;

        let mut self_loop = graph(2, &[]);
        self_loop[[1, 1]] = 1;

        for m in vec![not_square, asymmetric, weighted, self_loop] {
            match elimination_ordering(&m) {
                Err(JunctionError::InvalidGraph(_)) => (),
                other => panic!("wrong result {:?}", other)
            };
        }
    }

}
