//! A conditional probability table backed by a classifier
//!
//! Instead of storing a table, a `ClassifierFactor` asks a `Classifier` for the distribution of
//! its child (the first scope variable) under every configuration of its parents. Observations are
//! recorded and applied whenever the factor is materialised.

use super::{validate, DiscreteFactor, Factor, Table};

use crate::index::{self, VarId};
use crate::util::{JunctionError, Result};


/// Anything that can produce a distribution over a child variable from the states of its parents
pub trait Classifier {

    /// The probability of each child state given `parents`, one state per parent in scope order.
    /// The returned vector must have one entry per child state.
    fn predict_proba(&self, parents: &[usize]) -> Vec<f64>;

}


#[derive(Clone, Debug)]
pub struct ClassifierFactor<C> {
    scope: Vec<VarId>,
    cardinality: Vec<usize>,
    classifier: C,

    /// Observations applied on top of the classifier output
    observations: Vec<(VarId, usize)>,
}


impl<C: Classifier> ClassifierFactor<C> {

    /// Create a new `ClassifierFactor`
    ///
    /// # Args
    /// * `scope`: the child followed by its parents
    /// * `cardinality`: the number of states of each variable, in scope order
    /// * `classifier`: the model producing the child distribution
    ///
    /// # Errors
    /// * `JunctionError::InvalidScope` if the scope is empty or the lengths differ
    /// * `JunctionError::DuplicateVariable`, `JunctionError::InvalidCardinality` as for
    ///   `DiscreteFactor::new`
    pub fn new(scope: Vec<VarId>, cardinality: Vec<usize>, classifier: C) -> Result<Self> {
        if scope.is_empty() {
            return Err(JunctionError::InvalidScope(
                String::from("a classifier factor needs a child variable")
            ));
        }
        validate(&scope, &cardinality)?;

        Ok(ClassifierFactor { scope, cardinality, classifier, observations: Vec::new() })
    }


    pub fn classifier(&self) -> &C {
        &self.classifier
    }


    /// Observations recorded since the last `refresh`
    pub fn observations(&self) -> &[(VarId, usize)] {
        &self.observations
    }


    /// Forget every recorded observation
    pub fn refresh(&mut self) {
        self.observations.clear();
    }

}


impl<C: Classifier> Factor for ClassifierFactor<C> {

    fn scope(&self) -> &[VarId] {
        &self.scope
    }

    fn cardinality(&self) -> &[usize] {
        &self.cardinality
    }

    /// Query the classifier once per parent configuration and lay the answers out as a CPT
    ///
    /// # Errors
    /// * `JunctionError::InvalidParameters` if the classifier returns the wrong number of states
    ///   or a negative probability
    fn to_table(&self) -> Result<DiscreteFactor> {
        let strides = index::strides(&self.cardinality);
        let child = self.cardinality[0];
        let mut parameters = Table::zeros(index::table_size(&self.cardinality)?);

        for parents in index::cartesian_product(&self.cardinality[1..]) {
            let proba = self.classifier.predict_proba(&parents);
            if proba.len() != child {
                return Err(JunctionError::InvalidParameters(
                    format!("classifier returned {} states, expected {}", proba.len(), child)
                ));
            }

            let base = index::offset(&parents, &strides[1..]);
            for (state, p) in proba.into_iter().enumerate() {
                parameters[base + state * strides[0]] = p;
            }
        }

        let mut table = DiscreteFactor::from_table(
            self.scope.clone(),
            self.cardinality.clone(),
            parameters
        )?;

        for &(variable, state) in self.observations.iter() {
            table.reduce_inplace(variable, state)?;
        }

        Ok(table)
    }

    /// Record an observation. Variables outside the scope are ignored.
    ///
    /// # Errors
    /// * `JunctionError::InvalidState` if `state` is out of range
    fn observe(&mut self, variable: VarId, state: usize) -> Result<()> {
        if let Some(pos) = self.scope.iter().position(|&v| v == variable) {
            let cardinality = self.cardinality[pos];
            if state >= cardinality {
                return Err(JunctionError::InvalidState { variable, state, cardinality });
            }
            self.observations.push((variable, state));
        }

        Ok(())
    }

}
