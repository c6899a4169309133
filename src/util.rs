//! Defines the `Error` type for the junction library

use crate::index::VarId;

use thiserror::Error;

use std::result;

pub type Result<T> = result::Result<T, JunctionError>;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum JunctionError {

    /// Two factors disagree on the number of states of a shared variable
    #[error("variable {variable} has cardinality {left} in one factor and {right} in another")]
    CardinalityMismatch { variable: VarId, left: usize, right: usize },

    /// A requested variable is absent from a factor scope or from a tree
    #[error("variable {0} was not found")]
    VariableNotFound(VarId),

    /// One or more requested variables are absent from a factor collection
    #[error("cannot build a factor: variables {0:?} are not in the collection")]
    UnknownVariable(Vec<VarId>),

    /// Malformed interaction graph handed to the elimination ordering
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// An element of a source scope is missing from the target scope of a position map.
    /// Reaching this through the public factor or tree API is a bug.
    #[error("variable {0} is not present in the target scope")]
    NotFound(VarId),

    /// Represents a variable that was present multiple times in a situation where it should only
    /// have been present once
    #[error("variable {0} appears more than once in a scope")]
    DuplicateVariable(VarId),

    /// Represents an error where a certain constraint on a scope was not satisfied
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// Every variable needs at least one state
    #[error("variable {0} must have at least one state")]
    InvalidCardinality(VarId),

    /// The parameter buffer does not describe the scope it was given
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// An observed or requested state lies outside the variable's range
    #[error("state {state} is out of range for variable {variable} with {cardinality} states")]
    InvalidState { variable: VarId, state: usize, cardinality: usize },

    /// An assignment or flat index does not fit the cardinality it is addressed against
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    /// Exactly what it sounds like
    #[error("encountered division of a non-zero value by zero")]
    DivideByZero,

    /// Calibration requested before every message was sent
    #[error("messages have not been propagated over the whole tree")]
    NotPropagated,

    /// A marginal was requested from a tree that has not been calibrated
    #[error("the tree has not been calibrated")]
    NotCalibrated,

}
