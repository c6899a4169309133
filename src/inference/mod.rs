//! Defines the interface to inference engines

use crate::entropy;
use crate::factor::{DiscreteFactor, NormaliseMode};
use crate::index::VarId;
use crate::util::Result;

use indexmap::IndexMap;
use serde::Serialize;

mod junction_tree;
mod variable_elimination;

pub use self::junction_tree::{Clique, JunctionTree, TreeState};
pub use self::variable_elimination::VariableEliminationEngine;


/// An `InferenceEngine` answers conditional probability queries of the form:
///     ```P(Y | E = e)```
///
/// Engines are stateful: evidence is injected with `update_observations`, `execute` brings the
/// engine up to date with it, and `marginal` reads the result.
pub trait InferenceEngine {

    /// Every variable the engine can be queried about, sorted
    fn variables(&self) -> Vec<VarId>;

    /// Add observations `(variable, state)` to the evidence held by the engine
    fn update_observations(&mut self, evidence: &[(VarId, usize)]) -> Result<()>;

    /// Retract all evidence
    fn reset_observations(&mut self);

    /// Run inference with the current evidence
    fn execute(&mut self) -> Result<()>;

    /// The unnormalised marginal ```P(variable, E = e)```
    fn marginal(&self, variable: VarId) -> Result<DiscreteFactor>;

    /// How `query` normalises the marginals it returns
    fn normalisation(&self) -> (NormaliseMode, f64) {
        (NormaliseMode::Table, entropy::EPSILON)
    }

    /// Answer ```P(v | E = e)``` for every `v` in `variables` from scratch: previous evidence is
    /// retracted first. An empty `variables` means every variable of the engine.
    fn query(&mut self, evidence: &[(VarId, usize)], variables: &[VarId]) -> Result<Posterior> {
        self.reset_observations();
        self.update_observations(evidence)?;
        self.execute()?;

        let targets = if variables.is_empty() { self.variables() } else { variables.to_vec() };
        let (mode, epsilon) = self.normalisation();

        let mut posterior = Posterior::default();
        for v in targets {
            let marginal = self.marginal(v)?.normalise_with(mode, epsilon);
            posterior.insert(v, marginal.into_parameters().to_vec());
        }

        Ok(posterior)
    }

}


/// Normalised marginal distributions, in the order they were requested
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Posterior {
    marginals: IndexMap<VarId, Vec<f64>>,
}


impl Posterior {

    pub fn insert(&mut self, variable: VarId, distribution: Vec<f64>) {
        self.marginals.insert(variable, distribution);
    }


    pub fn get(&self, variable: VarId) -> Option<&[f64]> {
        self.marginals.get(&variable).map(|d| d.as_slice())
    }


    pub fn iter(&self) -> impl Iterator<Item = (VarId, &[f64])> {
        self.marginals.iter().map(|(&v, d)| (v, d.as_slice()))
    }


    pub fn len(&self) -> usize {
        self.marginals.len()
    }


    pub fn is_empty(&self) -> bool {
        self.marginals.is_empty()
    }


    /// The most probable state of `variable`. Ties resolve to the lowest state.
    pub fn most_probable(&self, variable: VarId) -> Option<usize> {
        let distribution = self.marginals.get(&variable)?;

        let mut best: Option<(usize, f64)> = None;
        for (state, &p) in distribution.iter().enumerate() {
            if best.map_or(true, |(_, b)| p > b) {
                best = Some((state, p));
            }
        }

        best.map(|(state, _)| state)
    }

}
