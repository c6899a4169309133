//! Definition of the factor module
//!
//! A `DiscreteFactor` represents a relationship between some set of discrete variables: a
//! non-negative table over the joint states of its scope, flattened row-major (the last scope
//! variable varies fastest). When a factor is used as a CPT the first scope variable is the child
//! and the remaining variables are its parents.
//!
//! The `Factor` trait is the capability interface shared by the table backend
//! (`DiscreteFactor`) and the classifier backend (`ClassifierFactor`).

use crate::entropy;
use crate::index::{self, Assignment, Scope, VarId};
use crate::util::{JunctionError, Result};

use ndarray::prelude as nd;
use rand::Rng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};

mod classifier;
mod ops;

pub use self::classifier::{Classifier, ClassifierFactor};

/// Alias f64 ndarray::Array1 as Table
pub type Table = nd::Array1<f64>;


/// How a factor's parameters are rescaled by `normalise_with`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormaliseMode {
    /// The whole table sums to one
    Table,

    /// For every assignment to the parents (all scope positions but the first), the states of the
    /// child sum to one
    RowWise,
}

impl Default for NormaliseMode {
    fn default() -> Self {
        NormaliseMode::Table
    }
}


#[derive(Clone, Debug, PartialEq)]
pub struct DiscreteFactor {
    /// The scope of the `DiscreteFactor`
    scope: Scope,

    /// The number of states of each variable in the scope
    cardinality: Vec<usize>,

    /// The values of the `DiscreteFactor` table, flattened row-major
    parameters: Table,
}


impl DiscreteFactor {

    /// Create a new `DiscreteFactor`
    ///
    /// # Args
    /// * `scope`: the variables of the factor, unique
    /// * `cardinality`: the number of states of each variable, in scope order
    /// * `parameters`: the flattened table, of length ```product(cardinality)```
    ///
    /// # Errors
    /// * `JunctionError::InvalidScope` if scope and cardinality lengths differ
    /// * `JunctionError::DuplicateVariable` if a variable appears twice
    /// * `JunctionError::InvalidCardinality` if a variable has no states
    /// * `JunctionError::InvalidParameters` if the table has the wrong length or holds negative
    ///   or NaN values
    pub fn new(scope: Scope, cardinality: Vec<usize>, parameters: Vec<f64>) -> Result<Self> {
        DiscreteFactor::from_table(scope, cardinality, Table::from(parameters))
    }


    /// Create a new `DiscreteFactor` from an existing `Table`. See `new`.
    pub fn from_table(scope: Scope, cardinality: Vec<usize>, parameters: Table) -> Result<Self> {
        validate(&scope, &cardinality)?;

        let size = index::table_size(&cardinality)?;
        if parameters.len() != size {
            return Err(JunctionError::InvalidParameters(
                format!("expected {} parameters, found {}", size, parameters.len())
            ));
        }

        if parameters.iter().any(|&v| v < 0.0 || v.is_nan()) {
            return Err(JunctionError::InvalidParameters(
                String::from("parameters must be non-negative numbers")
            ));
        }

        Ok(DiscreteFactor { scope, cardinality, parameters })
    }


    /// A factor over `scope` with every entry set to `c`
    pub fn vacuous(scope: Scope, cardinality: Vec<usize>, c: f64) -> Result<Self> {
        validate(&scope, &cardinality)?;
        let size = index::table_size(&cardinality)?;
        DiscreteFactor::from_table(scope, cardinality, Table::from_elem(size, c))
    }


    /// The all-ones factor over `scope`
    pub fn ones(scope: Scope, cardinality: Vec<usize>) -> Result<Self> {
        DiscreteFactor::vacuous(scope, cardinality, 1.0)
    }


    /// Get the identity factor: empty scope, a single parameter equal to one
    pub fn identity() -> Self {
        DiscreteFactor {
            scope: Vec::new(),
            cardinality: Vec::new(),
            parameters: Table::from_elem(1, 1.0),
        }
    }


    /// A factor over `scope` with parameters drawn uniformly from `[0, 1)`
    pub fn random<R: Rng>(scope: Scope, cardinality: Vec<usize>, rng: &mut R) -> Result<Self> {
        validate(&scope, &cardinality)?;
        let size = index::table_size(&cardinality)?;
        let parameters = Table::random_using(size, Uniform::new(0.0, 1.0), rng);
        DiscreteFactor::from_table(scope, cardinality, parameters)
    }


    /// Check if the `DiscreteFactor` has an empty scope
    pub fn is_identity(&self) -> bool {
        self.scope.is_empty()
    }


    /// Retrieve the scope of the `DiscreteFactor`
    pub fn scope(&self) -> &[VarId] {
        &self.scope
    }


    /// Retrieve the cardinality vector of the `DiscreteFactor`
    pub fn cardinality(&self) -> &[usize] {
        &self.cardinality
    }


    /// Retrieve the flattened table
    pub fn parameters(&self) -> &Table {
        &self.parameters
    }


    /// Consume the factor, returning its table
    pub fn into_parameters(self) -> Table {
        self.parameters
    }


    /// Number of parameters in the table
    pub fn len(&self) -> usize {
        self.parameters.len()
    }


    /// `true` if `variable` is in the scope
    pub fn contains(&self, variable: VarId) -> bool {
        self.scope.contains(&variable)
    }


    /// The number of states of `variable`, if it is in scope
    pub fn card(&self, variable: VarId) -> Option<usize> {
        self.position(variable).map(|i| self.cardinality[i])
    }


    fn position(&self, variable: VarId) -> Option<usize> {
        self.scope.iter().position(|&v| v == variable)
    }


    /// The flat index of an assignment over this factor's scope
    pub fn index_of(&self, assignment: &[usize]) -> Result<usize> {
        index::ravel(assignment, &self.cardinality)
    }


    /// The assignment stored at a flat index
    pub fn assignment_at(&self, index: usize) -> Result<Assignment> {
        index::unravel(index, &self.cardinality)
    }


    /// Every assignment over the scope, in table order
    pub fn assignments(&self) -> Vec<Assignment> {
        index::cartesian_product(&self.cardinality)
    }


    /// Retrieve the value for a complete assignment over the scope of this `DiscreteFactor`
    ///
    /// # Errors
    /// * `JunctionError::InvalidAssignment` if the assignment does not fit the scope
    pub fn value(&self, assignment: &[usize]) -> Result<f64> {
        Ok(self.parameters[self.index_of(assignment)?])
    }


    /// Flat index of the largest parameter. Ties resolve to the lowest index.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &v) in self.parameters.iter().enumerate() {
            if v > self.parameters[best] {
                best = i;
            }
        }
        best
    }


    /// Flat index of the smallest parameter. Ties resolve to the lowest index.
    pub fn argmin(&self) -> usize {
        let mut best = 0;
        for (i, &v) in self.parameters.iter().enumerate() {
            if v < self.parameters[best] {
                best = i;
            }
        }
        best
    }


    /// The most probable assignment over the scope
    pub fn mpe(&self) -> Result<Assignment> {
        self.assignment_at(self.argmax())
    }


    /// The least probable assignment over the scope. In the log-cost domain this is the best one.
    pub fn least_probable(&self) -> Result<Assignment> {
        self.assignment_at(self.argmin())
    }


    /// The all-ones factor over `scope`, with cardinalities looked up from this factor
    ///
    /// # Errors
    /// * `JunctionError::VariableNotFound` if a variable of `scope` is not in this factor
    pub fn subset(&self, scope: &[VarId]) -> Result<Self> {
        let cardinality = scope.iter()
                               .map(|&v| self.card(v).ok_or(JunctionError::VariableNotFound(v)))
                               .collect::<Result<Vec<usize>>>()?;
        DiscreteFactor::ones(scope.to_vec(), cardinality)
    }


    /// Normalise the whole table so that it sums to one
    pub fn normalise(&self) -> Self {
        self.normalise_with(NormaliseMode::Table, entropy::EPSILON)
    }


    /// Normalise the table according to `mode`.
    ///
    /// `NormaliseMode::Table` clips every entry to at least `epsilon` before dividing by the sum,
    /// so an all-zero table becomes uniform. `NormaliseMode::RowWise` divides every child slice by
    /// its sum plus `epsilon`.
    pub fn normalise_with(&self, mode: NormaliseMode, epsilon: f64) -> Self {
        let parameters = match mode {
            NormaliseMode::RowWise if ! self.scope.is_empty() => self.row_wise_scaling(epsilon),
            _ => {
                let clipped = self.parameters.mapv(|v| v.max(epsilon));
                let z = clipped.sum();
                clipped / z
            }
        };

        DiscreteFactor {
            scope: self.scope.clone(),
            cardinality: self.cardinality.clone(),
            parameters,
        }
    }


    /// In place variant of `normalise_with`
    pub fn normalise_inplace(&mut self, mode: NormaliseMode, epsilon: f64) {
        *self = self.normalise_with(mode, epsilon);
    }


    fn row_wise_scaling(&self, epsilon: f64) -> Table {
        let mut values = self.parameters.clone();
        let strides = index::strides(&self.cardinality);
        let child = self.cardinality[0];

        for parents in index::cartesian_product(&self.cardinality[1..]) {
            let base = index::offset(&parents, &strides[1..]);
            let idx: Vec<usize> = (0..child).map(|state| base + state * strides[0]).collect();
            let row_sum = epsilon + idx.iter().map(|&i| values[i]).sum::<f64>();
            for i in idx {
                values[i] /= row_sum;
            }
        }

        values
    }


    /// Shannon entropy of the parameters, read as a probability distribution
    pub fn entropy(&self) -> f64 {
        entropy::entropy(&self.parameters.to_vec(), entropy::EPSILON)
    }

}


fn validate(scope: &[VarId], cardinality: &[usize]) -> Result<()> {
    if scope.len() != cardinality.len() {
        return Err(JunctionError::InvalidScope(
            format!("{} variables but {} cardinalities", scope.len(), cardinality.len())
        ));
    }

    for (i, &v) in scope.iter().enumerate() {
        if scope[..i].contains(&v) {
            return Err(JunctionError::DuplicateVariable(v));
        }
        if cardinality[i] == 0 {
            return Err(JunctionError::InvalidCardinality(v));
        }
    }

    Ok(())
}


/// The operations every factor backend supports. Backends that are not tables expose their
/// algebra through `to_table`.
pub trait Factor {

    /// The variables the factor depends on
    fn scope(&self) -> &[VarId];

    /// The number of states of each scope variable
    fn cardinality(&self) -> &[usize];

    /// Materialise the factor as a table
    fn to_table(&self) -> Result<DiscreteFactor>;

    /// Condition the factor on `variable = state`, in place
    fn observe(&mut self, variable: VarId, state: usize) -> Result<()>;

    fn product(&self, other: &DiscreteFactor) -> Result<DiscreteFactor> {
        self.to_table()?.product(other)
    }

    fn marginalise(&self, variable: VarId) -> Result<DiscreteFactor> {
        self.to_table()?.marginalise(variable)
    }

    /// The table reduced by `variable = state`, leaving `self` untouched
    fn reduce(&self, variable: VarId, state: usize) -> Result<DiscreteFactor> {
        self.to_table()?.reduce(variable, state)
    }

    fn normalise(&self, mode: NormaliseMode) -> Result<DiscreteFactor> {
        Ok(self.to_table()?.normalise_with(mode, entropy::EPSILON))
    }

    fn entropy(&self) -> Result<f64> {
        Ok(self.to_table()?.entropy())
    }

}


impl Factor for DiscreteFactor {

    fn scope(&self) -> &[VarId] {
        &self.scope
    }

    fn cardinality(&self) -> &[usize] {
        &self.cardinality
    }

    fn to_table(&self) -> Result<DiscreteFactor> {
        Ok(self.clone())
    }

    fn observe(&mut self, variable: VarId, state: usize) -> Result<()> {
        self.reduce_inplace(variable, state)
    }

    fn product(&self, other: &DiscreteFactor) -> Result<DiscreteFactor> {
        DiscreteFactor::product(self, other)
    }

    fn marginalise(&self, variable: VarId) -> Result<DiscreteFactor> {
        DiscreteFactor::marginalise(self, variable)
    }

    fn reduce(&self, variable: VarId, state: usize) -> Result<DiscreteFactor> {
        DiscreteFactor::reduce(self, variable, state)
    }

    fn normalise(&self, mode: NormaliseMode) -> Result<DiscreteFactor> {
        Ok(self.normalise_with(mode, entropy::EPSILON))
    }

    fn entropy(&self) -> Result<f64> {
        Ok(DiscreteFactor::entropy(self))
    }

}
