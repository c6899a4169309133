//! Exact inference by message passing over a junction tree
//!
//! The tree is built once from a `FactorCollection` by simulating variable elimination: every
//! eliminated variable contributes one clique over its neighbourhood at the time of elimination,
//! and each clique is linked to the clique that later consumes its separator. Evidence can then be
//! injected and retracted any number of times without rebuilding the tree.
//!
//! Implementation of Koller & Friedman Algorithm 10.2 - Sum-Product-Calibrate (Shafer-Shenoy)

use super::InferenceEngine;
use crate::collection::FactorCollection;
use crate::config::InferenceConfig;
use crate::elimination::elimination_ordering_with;
use crate::factor::{DiscreteFactor, NormaliseMode};
use crate::index::{self, Scope, VarId};
use crate::util::{JunctionError, Result};

use tracing::{debug, trace, warn};


/// A node of the tree: the clique created when `variable` was eliminated
#[derive(Clone, Debug, PartialEq)]
pub struct Clique {
    /// The variable whose elimination created this clique
    variable: VarId,

    /// The current potential
    factor: DiscreteFactor,

    /// The clique scope without `variable`
    separator: Scope,

    /// The potential as it was right after initialisation, before any evidence
    cached: DiscreteFactor,
}


impl Clique {

    pub fn variable(&self) -> VarId {
        self.variable
    }


    pub fn factor(&self) -> &DiscreteFactor {
        &self.factor
    }


    pub fn separator(&self) -> &[VarId] {
        &self.separator
    }


    pub fn scope(&self) -> &[VarId] {
        self.factor.scope()
    }


    pub fn cached(&self) -> &DiscreteFactor {
        &self.cached
    }

}


/// Where a `JunctionTree` is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeState {
    /// Potentials hold the initial factors (possibly reduced by evidence)
    Built,

    /// Potentials hold clique beliefs and marginals may be read
    Calibrated,
}


pub struct JunctionTree {
    cliques: Vec<Clique>,

    /// Pairs of clique indices, earlier clique first
    edges: Vec<(usize, usize)>,

    /// For each edge, the message sent along it in each direction: slot 0 flows from the first
    /// clique of the edge to the second, slot 1 the other way
    messages: Vec<[Option<DiscreteFactor>; 2]>,

    /// For each clique, the indices of the edges touching it
    incident: Vec<Vec<usize>>,

    variables: Vec<VarId>,
    evidence: Vec<(VarId, usize)>,
    state: TreeState,
    config: InferenceConfig,
}


impl JunctionTree {

    /// Build a `JunctionTree` with the default configuration
    ///
    /// # Errors
    /// See `with_config`
    pub fn from_factors(collection: &FactorCollection) -> Result<Self> {
        JunctionTree::with_config(collection, InferenceConfig::default())
    }


    /// Build a `JunctionTree` over the factors of `collection`.
    ///
    /// # Args
    /// * `collection`: the factors of the model. They are copied into the tree.
    /// * `config`: selects the elimination heuristic, the evidence fill value and the
    ///   normalisation of query results
    ///
    /// # Errors
    /// * `JunctionError::InvalidGraph` if the interaction graph cannot be eliminated
    /// * `JunctionError::UnknownVariable`, `JunctionError::CardinalityMismatch` if a clique
    ///   factor cannot be synthesised from the collection
    pub fn with_config(collection: &FactorCollection, config: InferenceConfig) -> Result<Self> {
        let variables = collection.variables();
        let order = elimination_ordering_with(&collection.adjacency_matrix(), config.heuristic)?;

        // the scopes still in play; each is sorted so scopes can be compared by value
        let mut working: Vec<Scope> = Vec::new();
        for factor in collection.iter() {
            let mut scope = factor.scope().to_vec();
            scope.sort();
            if ! working.contains(&scope) {
                working.push(scope);
            }
        }

        let mut cliques: Vec<Clique> = Vec::with_capacity(variables.len());
        let mut edges = Vec::new();
        let mut linked = Vec::with_capacity(variables.len());

        for &vertex in order.ordering.iter() {
            let variable = variables[vertex];

            let (touching, rest): (Vec<Scope>, Vec<Scope>) = working.into_iter()
                                                                    .partition(|s| s.contains(&variable));

            let current = if touching.is_empty() {
                vec![variable]
            } else {
                let scopes: Vec<&[VarId]> = touching.iter().map(|s| s.as_slice()).collect();
                index::union(&scopes)
            };
            let separator = index::difference(&current, &[variable]);
            let factor = collection.new_factor(&current)?;

            let id = cliques.len();
            for (earlier, clique) in cliques.iter().enumerate() {
                if linked[earlier] || clique.separator.is_empty() {
                    continue;
                }
                if touching.contains(&clique.separator) {
                    edges.push((earlier, id));
                    linked[earlier] = true;
                }
            }

            trace!(variable, ?current, ?separator, "adding clique {}", id);

            working = rest;
            if ! separator.is_empty() && ! working.contains(&separator) {
                working.push(separator.clone());
            }

            cliques.push(Clique { variable, cached: factor.clone(), factor, separator });
            linked.push(false);
        }

        let mut incident = vec![Vec::new(); cliques.len()];
        for (e, &(u, v)) in edges.iter().enumerate() {
            incident[u].push(e);
            incident[v].push(e);
        }

        let mut tree = JunctionTree {
            messages: vec![[None, None]; edges.len()],
            cliques,
            edges,
            incident,
            variables,
            evidence: Vec::new(),
            state: TreeState::Built,
            config,
        };

        tree.initialise(collection)?;

        debug!(
            cliques = tree.cliques.len(),
            edges = tree.edges.len(),
            "built junction tree"
        );

        Ok(tree)
    }


    /// Multiply every original factor into the first clique that covers it and snapshot the
    /// resulting potentials
    fn initialise(&mut self, collection: &FactorCollection) -> Result<()> {
        for factor in collection.iter() {
            match self.cliques.iter_mut().find(|c| index::is_subset(factor.scope(), c.scope())) {
                Some(clique) => clique.factor.product_inplace(factor)?,
                None => warn!(scope = ?factor.scope(), "no clique covers factor"),
            }
        }

        for clique in self.cliques.iter_mut() {
            clique.cached = clique.factor.clone();
        }

        Ok(())
    }


    pub fn cliques(&self) -> &[Clique] {
        &self.cliques
    }


    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }


    /// The cliques adjacent to `clique`
    pub fn neighbours(&self, clique: usize) -> Vec<usize> {
        match self.incident.get(clique) {
            Some(edges) => edges.iter().map(|&e| other_end(self.edges[e], clique)).collect(),
            None => Vec::new(),
        }
    }


    /// The message sent from clique `from` along `edge`, if it has been sent
    pub fn message(&self, edge: usize, from: usize) -> Option<&DiscreteFactor> {
        let &(u, v) = self.edges.get(edge)?;
        if from != u && from != v {
            return None;
        }
        self.messages[edge][outgoing_slot((u, v), from)].as_ref()
    }


    /// Every observation injected since the last reset
    pub fn evidence(&self) -> &[(VarId, usize)] {
        &self.evidence
    }


    pub fn state(&self) -> TreeState {
        self.state
    }


    pub fn is_calibrated(&self) -> bool {
        self.state == TreeState::Calibrated
    }


    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }


    /// The number of states of `variable`, if the tree knows it
    pub fn cardinality(&self, variable: VarId) -> Option<usize> {
        self.cliques.iter().filter_map(|c| c.factor.card(variable)).next()
    }


    /// Inject observations. All observations are checked before any is applied.
    ///
    /// When the tree is already calibrated the potentials are first rebuilt from the cached
    /// factors plus every accumulated observation, so beliefs are never multiplied in twice.
    /// Messages are always discarded.
    ///
    /// # Errors
    /// * `JunctionError::VariableNotFound` if a variable is not in the tree
    /// * `JunctionError::InvalidState` if a state is out of range
    pub fn update_observations(&mut self, evidence: &[(VarId, usize)]) -> Result<()> {
        for &(variable, state) in evidence.iter() {
            let cardinality = self.cardinality(variable)
                                  .ok_or(JunctionError::VariableNotFound(variable))?;
            if state >= cardinality {
                return Err(JunctionError::InvalidState { variable, state, cardinality });
            }
        }

        self.evidence.extend_from_slice(evidence);

        if self.is_calibrated() {
            self.restore_potentials()?;
        } else {
            let fill = self.config.reduce_fill;
            for &(variable, state) in evidence.iter() {
                for clique in self.cliques.iter_mut().filter(|c| c.factor.contains(variable)) {
                    clique.factor.reduce_with_fill_inplace(variable, state, fill)?;
                }
            }
        }

        self.clear_messages();
        self.state = TreeState::Built;

        debug!(?evidence, total = self.evidence.len(), "injected evidence");
        Ok(())
    }


    /// Retract every observation and return to the initialised potentials
    pub fn reset_observations(&mut self) {
        for clique in self.cliques.iter_mut() {
            clique.factor = clique.cached.clone();
        }

        self.evidence.clear();
        self.clear_messages();
        self.state = TreeState::Built;

        debug!("reset evidence");
    }


    fn restore_potentials(&mut self) -> Result<()> {
        let fill = self.config.reduce_fill;
        for clique in self.cliques.iter_mut() {
            clique.factor = clique.cached.clone();
            for &(variable, state) in self.evidence.iter() {
                clique.factor.reduce_with_fill_inplace(variable, state, fill)?;
            }
        }
        Ok(())
    }


    fn clear_messages(&mut self) {
        for slots in self.messages.iter_mut() {
            *slots = [None, None];
        }
    }


    /// Send every message of the tree.
    ///
    /// Edges are scanned repeatedly and a message is sent as soon as its sender has heard from
    /// all of its other neighbours, so leaves fire first and each slot is filled exactly once.
    ///
    /// # Errors
    /// * `JunctionError::InvalidGraph` if a scan sends nothing while messages are still missing
    pub fn propagate(&mut self) -> Result<()> {
        self.clear_messages();
        if self.is_calibrated() {
            self.restore_potentials()?;
            self.state = TreeState::Built;
        }

        let total = 2 * self.edges.len();
        let mut sent = 0;

        while sent < total {
            let mut progress = false;

            for e in 0..self.edges.len() {
                let (u, v) = self.edges[e];
                for &(from, to) in [(u, v), (v, u)].iter() {
                    let slot = outgoing_slot((u, v), from);
                    if self.messages[e][slot].is_some() || ! self.ready(from, e) {
                        continue;
                    }

                    let message = self.compute_message(from, e)?;
                    trace!(from, to, scope = ?message.scope(), "sending message");

                    self.messages[e][slot] = Some(message);
                    sent += 1;
                    progress = true;
                }
            }

            if ! progress {
                return Err(JunctionError::InvalidGraph(
                    format!("message passing stalled with {} of {} messages sent", sent, total)
                ));
            }
        }

        Ok(())
    }


    /// `true` if `from` has received a message over every incident edge except `edge`
    fn ready(&self, from: usize, edge: usize) -> bool {
        self.incident[from].iter()
                           .filter(|&&e| e != edge)
                           .all(|&e| self.incoming(e, from).is_some())
    }


    /// The message arriving at `to` along `edge`
    fn incoming(&self, edge: usize, to: usize) -> Option<&DiscreteFactor> {
        self.messages[edge][1 - outgoing_slot(self.edges[edge], to)].as_ref()
    }


    /// The potential of `from` times every message it received except over `edge`, summed down to
    /// the variables shared with the clique at the other end
    fn compute_message(&self, from: usize, edge: usize) -> Result<DiscreteFactor> {
        let to = other_end(self.edges[edge], from);

        let mut belief = self.cliques[from].factor.clone();
        for &e in self.incident[from].iter().filter(|&&e| e != edge) {
            if let Some(message) = self.incoming(e, from) {
                belief.product_inplace(message)?;
            }
        }

        let sepset = index::intersect(&[self.cliques[from].scope(), self.cliques[to].scope()]);
        let extras = index::difference(belief.scope(), &sepset);
        belief.marginalise_all(&extras)
    }


    /// Multiply every clique potential by all of its incoming messages. Calibrating a calibrated
    /// tree does nothing.
    ///
    /// # Errors
    /// * `JunctionError::NotPropagated` if any message has not been sent
    pub fn calibrate(&mut self) -> Result<()> {
        if self.is_calibrated() {
            return Ok(());
        }

        if self.messages.iter().any(|slots| slots.iter().any(|m| m.is_none())) {
            return Err(JunctionError::NotPropagated);
        }

        let mut beliefs = Vec::with_capacity(self.cliques.len());
        for (i, clique) in self.cliques.iter().enumerate() {
            let mut belief = clique.factor.clone();
            for &e in self.incident[i].iter() {
                if let Some(message) = self.incoming(e, i) {
                    belief.product_inplace(message)?;
                }
            }
            beliefs.push(belief);
        }

        for (clique, belief) in self.cliques.iter_mut().zip(beliefs.into_iter()) {
            clique.factor = belief;
        }

        self.state = TreeState::Calibrated;
        debug!(cliques = self.cliques.len(), "calibrated junction tree");
        Ok(())
    }


    /// Propagate then calibrate
    pub fn execute(&mut self) -> Result<()> {
        self.propagate()?;
        self.calibrate()
    }


    /// The unnormalised marginal of `variable`, read from the smallest clique containing it
    ///
    /// # Errors
    /// * `JunctionError::VariableNotFound` if no clique contains `variable`
    /// * `JunctionError::NotCalibrated` if the tree has not been calibrated
    pub fn marginal(&self, variable: VarId) -> Result<DiscreteFactor> {
        let clique = self.cliques
                         .iter()
                         .filter(|c| c.factor.contains(variable))
                         .min_by_key(|c| c.scope().len())
                         .ok_or(JunctionError::VariableNotFound(variable))?;

        if ! self.is_calibrated() {
            return Err(JunctionError::NotCalibrated);
        }

        let extras = index::difference(clique.scope(), &[variable]);
        clique.factor.marginalise_all(&extras)
    }


    /// Lazily compute the marginal of each of `variables`
    pub fn marginals<'a>(&'a self, variables: &'a [VarId])
        -> impl Iterator<Item = Result<(VarId, DiscreteFactor)>> + 'a
    {
        variables.iter().map(move |&v| self.marginal(v).map(|m| (v, m)))
    }

}


impl InferenceEngine for JunctionTree {

    fn variables(&self) -> Vec<VarId> {
        self.variables.clone()
    }

    fn update_observations(&mut self, evidence: &[(VarId, usize)]) -> Result<()> {
        JunctionTree::update_observations(self, evidence)
    }

    fn reset_observations(&mut self) {
        JunctionTree::reset_observations(self)
    }

    fn execute(&mut self) -> Result<()> {
        JunctionTree::execute(self)
    }

    fn marginal(&self, variable: VarId) -> Result<DiscreteFactor> {
        JunctionTree::marginal(self, variable)
    }

    fn normalisation(&self) -> (NormaliseMode, f64) {
        (self.config.normalise, self.config.epsilon)
    }

}


fn outgoing_slot(edge: (usize, usize), from: usize) -> usize {
    if edge.0 == from { 0 } else { 1 }
}


fn other_end(edge: (usize, usize), from: usize) -> usize {
    if edge.0 == from { edge.1 } else { edge.0 }
}
