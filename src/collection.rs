//! A collection of `DiscreteFactor`s describing one model
//!
//! The collection is the input to every inference engine. It knows the universe of variables the
//! factors mention, the interaction graph between them, and how to synthesise a factor over an
//! arbitrary scope.

use crate::factor::DiscreteFactor;
use crate::index::{self, VarId};
use crate::util::{JunctionError, Result};

use ndarray::prelude as nd;
use tracing::trace;

use std::convert::TryFrom;


#[derive(Clone, Debug, Default, PartialEq)]
pub struct FactorCollection {
    factors: Vec<DiscreteFactor>,
}


impl FactorCollection {

    /// An empty collection
    pub fn new() -> Self {
        FactorCollection { factors: Vec::new() }
    }


    /// Build a collection from a list of factors. See `add`.
    pub fn from_factors(factors: Vec<DiscreteFactor>) -> Result<Self> {
        let mut collection = FactorCollection::new();
        collection.add(factors)?;
        Ok(collection)
    }


    /// Build a collection from `(scope, cardinality, parameters)` triples
    ///
    /// # Errors
    /// * `JunctionError::InvalidScope` if a variable identifier is negative
    /// * `JunctionError::InvalidCardinality` if a cardinality is negative or zero
    /// * any error of `DiscreteFactor::new` or `add`
    pub fn from_triples(triples: Vec<(Vec<i32>, Vec<i32>, Vec<f64>)>) -> Result<Self> {
        let mut factors = Vec::with_capacity(triples.len());

        for (scope, cardinality, parameters) in triples {
            let scope = scope.into_iter()
                             .map(|v| usize::try_from(v).map_err(|_| {
                                 JunctionError::InvalidScope(format!("negative variable {}", v))
                             }))
                             .collect::<Result<Vec<VarId>>>()?;

            let cardinality = cardinality.into_iter()
                                         .enumerate()
                                         .map(|(i, c)| usize::try_from(c).map_err(|_| {
                                             let v = scope.get(i).cloned().unwrap_or(i);
                                             JunctionError::InvalidCardinality(v)
                                         }))
                                         .collect::<Result<Vec<usize>>>()?;

            factors.push(DiscreteFactor::new(scope, cardinality, parameters)?);
        }

        FactorCollection::from_factors(factors)
    }


    /// Append factors to the collection. Every factor is kept, including one equal to a factor
    /// already present: two identical potentials on the same variables multiply.
    ///
    /// # Errors
    /// * `JunctionError::CardinalityMismatch` if a factor disagrees with the collection on the
    ///   number of states of a shared variable. Factors preceding the offending one are kept.
    pub fn add<I>(&mut self, factors: I) -> Result<()>
        where I: IntoIterator<Item = DiscreteFactor>
    {
        for factor in factors {
            for (&v, &right) in factor.scope().iter().zip(factor.cardinality().iter()) {
                if let Some(left) = self.cardinality(v) {
                    if left != right {
                        return Err(JunctionError::CardinalityMismatch { variable: v, left, right });
                    }
                }
            }

            self.factors.push(factor);
        }

        Ok(())
    }


    pub fn factors(&self) -> &[DiscreteFactor] {
        &self.factors
    }


    pub fn iter(&self) -> std::slice::Iter<'_, DiscreteFactor> {
        self.factors.iter()
    }


    pub fn len(&self) -> usize {
        self.factors.len()
    }


    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }


    /// Factors whose scope mentions at least one of `variables`
    pub fn factors_touching(&self, variables: &[VarId]) -> Vec<&DiscreteFactor> {
        self.factors.iter().filter(|f| index::contains_any(f.scope(), variables)).collect()
    }


    /// Factors whose scope mentions every one of `variables`
    pub fn factors_containing(&self, variables: &[VarId]) -> Vec<&DiscreteFactor> {
        self.factors.iter().filter(|f| index::is_subset(variables, f.scope())).collect()
    }


    /// Every variable mentioned by some factor, sorted
    pub fn variables(&self) -> Vec<VarId> {
        let scopes: Vec<&[VarId]> = self.factors.iter().map(|f| f.scope()).collect();
        index::union(&scopes)
    }


    /// The number of states of `variable`, if some factor mentions it
    pub fn cardinality(&self, variable: VarId) -> Option<usize> {
        self.factors.iter().filter_map(|f| f.card(variable)).next()
    }


    /// The interaction graph of the collection.
    ///
    /// Rows and columns are indexed by position in `variables()`. An entry is 1 if some factor
    /// mentions both variables. The diagonal is zero.
    pub fn adjacency_matrix(&self) -> nd::Array2<u8> {
        let variables = self.variables();
        let n = variables.len();
        let mut adjacency = nd::Array2::zeros((n, n));

        for factor in self.factors.iter() {
            // every variable of the factor is in the universe
            let positions: Vec<usize> = factor.scope()
                                              .iter()
                                              .filter_map(|v| variables.binary_search(v).ok())
                                              .collect();

            for &j in positions.iter() {
                for &k in positions.iter() {
                    if j != k {
                        adjacency[[j, k]] = 1;
                    }
                }
            }
        }

        adjacency
    }


    /// Synthesise an all-ones factor with exactly the requested scope.
    ///
    /// The smallest factor whose scope covers `scope` supplies the cardinalities. Failing that,
    /// the smallest factor mentioning each requested variable is marginalised down to the
    /// requested variables and the pieces are multiplied together.
    ///
    /// # Errors
    /// * `JunctionError::UnknownVariable` listing the requested variables no factor mentions
    pub fn new_factor(&self, scope: &[VarId]) -> Result<DiscreteFactor> {
        let universe = self.variables();
        let missing: Vec<VarId> = scope.iter()
                                       .filter(|v| universe.binary_search(v).is_err())
                                       .cloned()
                                       .collect();
        if ! missing.is_empty() {
            return Err(JunctionError::UnknownVariable(missing));
        }

        if let Some(cover) = smallest(self.factors_containing(scope)) {
            return cover.subset(scope);
        }

        trace!(?scope, "no single factor covers the scope");

        let mut joint = DiscreteFactor::identity();
        for &v in scope.iter() {
            let piece = smallest(self.factors_containing(&[v])).ok_or(JunctionError::NotFound(v))?;
            let extras = index::difference(piece.scope(), scope);
            joint.product_inplace(&piece.marginalise_all(&extras)?)?;
        }

        joint.subset(scope)
    }


    /// The joint product of every factor in the collection
    pub fn product(&self) -> Result<DiscreteFactor> {
        self.factors.iter().try_fold(DiscreteFactor::identity(), |acc, f| acc.product(f))
    }


    /// Max out every variable of the joint, leaving the value of its most probable assignment
    /// in an identity-scoped factor
    pub fn maximise(&self) -> Result<DiscreteFactor> {
        let joint = self.product()?;
        let scope = joint.scope().to_vec();
        joint.maximise_all(&scope)
    }


    /// A copy of the collection with every factor reduced by `variable = state`
    pub fn reduce(&self, variable: VarId, state: usize) -> Result<FactorCollection> {
        let factors = self.factors.iter()
                                  .map(|f| f.reduce(variable, state))
                                  .collect::<Result<Vec<DiscreteFactor>>>()?;
        Ok(FactorCollection { factors })
    }

}


fn smallest(candidates: Vec<&DiscreteFactor>) -> Option<&DiscreteFactor> {
    candidates.into_iter().min_by_key(|f| f.scope().len())
}


impl<'a> IntoIterator for &'a FactorCollection {
    type Item = &'a DiscreteFactor;
    type IntoIter = std::slice::Iter<'a, DiscreteFactor>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.iter()
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    use approx::assert_abs_diff_eq;

    /// A -> B <- C, B -> D
    fn collection() -> FactorCollection {
        FactorCollection::from_factors(vec![
            DiscreteFactor::new(vec![0], vec![2], vec![0.3, 0.7]).unwrap(),
            DiscreteFactor::new(vec![2], vec![3], vec![0.2, 0.5, 0.3]).unwrap(),
            DiscreteFactor::new(vec![1, 0, 2], vec![2, 2, 3], vec![0.5; 12]).unwrap(),
            DiscreteFactor::new(vec![3, 1], vec![2, 2], vec![0.9, 0.2, 0.1, 0.8]).unwrap(),
        ]).unwrap()
    }

    #[test]
    fn add() {
        let mut c = collection();
        assert_eq!(4, c.len());

        // an equal factor is a second potential, not a duplicate
        c.add(vec![DiscreteFactor::new(vec![0], vec![2], vec![0.3, 0.7]).unwrap()]).unwrap();
        assert_eq!(5, c.len());

        assert_eq!(
            Err(JunctionError::CardinalityMismatch { variable: 2, left: 3, right: 2 }),
            c.add(vec![DiscreteFactor::new(vec![2], vec![2], vec![0.5, 0.5]).unwrap()])
        );
        assert_eq!(5, c.len());
    }

    #[test]
    fn equal_potentials_multiply() {
        let c = FactorCollection::from_triples(vec![
            (vec![0, 1], vec![2, 2], vec![1., 2., 3., 4.]),
            (vec![0, 1], vec![2, 2], vec![1., 2., 3., 4.]),
        ]).unwrap();
        assert_eq!(2, c.len());

        let joint = c.product().unwrap();
        assert_eq!(vec![1., 4., 9., 16.], joint.parameters().to_vec());
    }

    #[test]
    fn from_triples() {
        let c = FactorCollection::from_triples(vec![
            (vec![0], vec![2], vec![0.3, 0.7]),
            (vec![1, 0], vec![2, 2], vec![0.9, 0.2, 0.1, 0.8]),
        ]).unwrap();
        assert_eq!(vec![0, 1], c.variables());

        match FactorCollection::from_triples(vec![(vec![-1], vec![2], vec![0.5, 0.5])]) {
            Err(JunctionError::InvalidScope(_)) => (),
            other => panic!("wrong result {:?}", other)
        };

        assert_eq!(
            Err(JunctionError::InvalidCardinality(4)),
            FactorCollection::from_triples(vec![(vec![4], vec![-2], vec![])])
        );
    }

    #[test]
    fn lookups() {
        let c = collection();

        assert_eq!(vec![0, 1, 2, 3], c.variables());
        assert_eq!(Some(3), c.cardinality(2));
        assert_eq!(None, c.cardinality(9));
        assert_eq!(3, c.factors_touching(&[0, 3]).len());
        assert_eq!(1, c.factors_containing(&[0, 2]).len());
        assert_eq!(0, c.factors_containing(&[0, 3]).len());
    }

    #[test]
    fn adjacency_matrix() {
        let adj = collection().adjacency_matrix();
        let expected = nd::arr2(&[
            [0u8, 1, 1, 0],
            [1, 0, 1, 1],
            [1, 1, 0, 0],
            [0, 1, 0, 0],
        ]);
        assert_eq!(expected, adj);
    }

    #[test]
    fn adjacency_sparse_ids() {
        let c = FactorCollection::from_factors(vec![
            DiscreteFactor::new(vec![10, 40], vec![2, 2], vec![1.; 4]).unwrap(),
        ]).unwrap();
        assert_eq!(nd::arr2(&[[0u8, 1], [1, 0]]), c.adjacency_matrix());
    }

    #[test]
    fn new_factor() {
        let c = collection();

        // covered by a single factor
        let f = c.new_factor(&[0, 2]).unwrap();
        assert_eq!(&[0, 2], f.scope());
        assert_eq!(&[2, 3], f.cardinality());
        assert!(f.parameters().iter().all(|&v| v == 1.0));

        // needs several factors
        let f = c.new_factor(&[3, 2]).unwrap();
        assert_eq!(&[3, 2], f.scope());
        assert_eq!(&[2, 3], f.cardinality());
        assert!(f.parameters().iter().all(|&v| v == 1.0));

        assert_eq!(Err(JunctionError::UnknownVariable(vec![7, 8])), c.new_factor(&[0, 7, 8]));
    }

    #[test]
    fn product_and_reduce() {
        let c = collection();
        let joint = c.product().unwrap();
        assert_eq!(vec![0, 1, 2, 3], index::union(&[joint.scope()]));

        // P(A) * P(C) * 0.5 * P(D|B) summed over everything
        assert_abs_diff_eq!(1.0, joint.parameters().sum(), epsilon = 1e-12);

        // 0.7 * 0.5 * 0.5 * 0.9
        let top = c.maximise().unwrap();
        assert!(top.is_identity());
        assert_abs_diff_eq!(0.1575, top.parameters()[0], epsilon = 1e-12);
        assert_abs_diff_eq!(joint.parameters()[joint.argmax()], top.parameters()[0], epsilon = 1e-12);

        let reduced = c.reduce(0, 1).unwrap();
        assert_eq!(c.len(), reduced.len());
        assert_eq!(vec![0., 0.7], reduced.factors()[0].parameters().to_vec());
        assert_eq!(c.factors()[1], reduced.factors()[1]);
    }

}
