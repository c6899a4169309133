//! Defines an `InferenceEngine` that uses exact inference by variable elimination to answer
//! conditional inference queries.
//!
//! Implementation of Koller & Friedman Algorithm 9.1 - Sum-Product-VE

use super::InferenceEngine;
use crate::collection::FactorCollection;
use crate::elimination::{elimination_ordering_with, EliminationHeuristic};
use crate::factor::DiscreteFactor;
use crate::index::VarId;
use crate::util::{JunctionError, Result};

use tracing::{debug, trace};


pub struct VariableEliminationEngine {

    /// the model (a 'bag of factors') without any evidence
    model: FactorCollection,

    /// the model conditioned on the evidence, available once `execute` has run
    reduced: Option<FactorCollection>,

    /// the observations injected since the last reset
    evidence: Vec<(VarId, usize)>,

    /// precomputed preferred elimination order
    order: Vec<VarId>,

}


impl VariableEliminationEngine {

    /// Create an engine eliminating in min-neighbours order
    pub fn new(model: &FactorCollection) -> Result<Self> {
        VariableEliminationEngine::with_heuristic(model, EliminationHeuristic::MinNeighbours)
    }


    /// Create an engine eliminating in the order chosen by `heuristic`
    ///
    /// # Errors
    /// * `JunctionError::InvalidGraph` if the interaction graph cannot be eliminated
    pub fn with_heuristic(model: &FactorCollection, heuristic: EliminationHeuristic)
        -> Result<Self>
    {
        let variables = model.variables();
        let ordering = elimination_ordering_with(&model.adjacency_matrix(), heuristic)?;
        let order = ordering.ordering.iter().map(|&i| variables[i]).collect();

        Ok(VariableEliminationEngine {
            model: model.clone(),
            reduced: None,
            evidence: Vec::new(),
            order,
        })
    }


    /// The order in which variables are summed out
    pub fn order(&self) -> &[VarId] {
        &self.order
    }

}


impl InferenceEngine for VariableEliminationEngine {

    fn variables(&self) -> Vec<VarId> {
        self.model.variables()
    }

    fn update_observations(&mut self, evidence: &[(VarId, usize)]) -> Result<()> {
        for &(variable, state) in evidence.iter() {
            let cardinality = self.model
                                  .cardinality(variable)
                                  .ok_or(JunctionError::VariableNotFound(variable))?;
            if state >= cardinality {
                return Err(JunctionError::InvalidState { variable, state, cardinality });
            }
        }

        self.evidence.extend_from_slice(evidence);
        self.reduced = None;
        Ok(())
    }

    fn reset_observations(&mut self) {
        self.evidence.clear();
        self.reduced = None;
    }

    fn execute(&mut self) -> Result<()> {
        let mut reduced = self.model.clone();
        for &(variable, state) in self.evidence.iter() {
            reduced = reduced.reduce(variable, state)?;
        }

        debug!(evidence = ?self.evidence, "conditioned model");
        self.reduced = Some(reduced);
        Ok(())
    }

    fn marginal(&self, variable: VarId) -> Result<DiscreteFactor> {
        if self.model.cardinality(variable).is_none() {
            return Err(JunctionError::VariableNotFound(variable));
        }

        let reduced = self.reduced.as_ref().ok_or(JunctionError::NotCalibrated)?;

        let mut phis: Vec<DiscreteFactor> = reduced.factors().to_vec();
        for &var in self.order.iter() {
            if var == variable {
                // we are computing P(var, e), so do not eliminate the variable
                continue;
            }

            // Otherwise, time to get rid of var
            let (phi_1prime, phi_2prime): (Vec<DiscreteFactor>, Vec<DiscreteFactor>) = phis
                                           .into_iter()
                                           .partition(|f| f.contains(var));

            // product step - multiply factors with var
            let psi = phi_1prime.iter()
                                .try_fold(DiscreteFactor::identity(), |acc, phi| acc.product(phi))?;

            // sum step - marginalise psi over var
            phis = phi_2prime;
            if psi.contains(var) {
                trace!(var, scope = ?psi.scope(), "eliminated");
                phis.push(psi.marginalise(var)?);
            }
        }

        // multiply together remaining phis
        phis.iter().try_fold(DiscreteFactor::identity(), |acc, phi| acc.product(phi))
    }

}


#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    /// The misconception loop of Koller & Friedman Figure 4.1
    fn misconception() -> FactorCollection {
        FactorCollection::from_factors(vec![
            DiscreteFactor::new(vec![0, 1], vec![2, 2], vec![30., 5., 1., 10.]).unwrap(),
            DiscreteFactor::new(vec![1, 2], vec![2, 2], vec![100., 1., 1., 100.]).unwrap(),
            DiscreteFactor::new(vec![2, 3], vec![2, 2], vec![1., 100., 100., 1.]).unwrap(),
            DiscreteFactor::new(vec![3, 0], vec![2, 2], vec![100., 1., 1., 100.]).unwrap(),
        ]).unwrap()
    }

    #[test]
    /// Koller & Friedman Figure 4.2: the partition function is 7,201,840
    fn partition_function() {
        let mut engine = VariableEliminationEngine::new(&misconception()).unwrap();
        engine.execute().unwrap();

        let m = engine.marginal(0).unwrap();
        assert_abs_diff_eq!(7_201_840., m.parameters().sum(), epsilon = 1e-6);

        let p = m.normalise();
        assert_abs_diff_eq!(5_901_530. / 7_201_840., p.parameters()[0], epsilon = 1e-12);
    }

    #[test]
    fn order_covers_every_variable() {
        let engine = VariableEliminationEngine::new(&misconception()).unwrap();
        let mut order = engine.order().to_vec();
        order.sort();
        assert_eq!(vec![0, 1, 2, 3], order);
    }

    #[test]
    fn lifecycle_errors() {
        let mut engine = VariableEliminationEngine::new(&misconception()).unwrap();

        assert_eq!(Err(JunctionError::NotCalibrated), engine.marginal(0));
        assert_eq!(Err(JunctionError::VariableNotFound(9)), engine.marginal(9));
        assert_eq!(Err(JunctionError::VariableNotFound(9)), engine.update_observations(&[(9, 0)]));

        engine.execute().unwrap();
        engine.update_observations(&[(1, 1)]).unwrap();
        assert_eq!(Err(JunctionError::NotCalibrated), engine.marginal(0));
    }

}
