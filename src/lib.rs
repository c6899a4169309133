//! Exact inference over discrete graphical models with junction trees.
//!
//! A model is a `FactorCollection` of `DiscreteFactor`s. A `JunctionTree` built from it answers
//! marginal queries under evidence, which can be injected and retracted without rebuilding the
//! tree. `VariableEliminationEngine` answers the same queries one at a time.

pub mod util;
pub mod index;
pub mod entropy;
pub mod factor;
pub mod collection;
pub mod elimination;
pub mod inference;
pub mod cache;
pub mod config;

pub use util::{Result, JunctionError};
pub use collection::FactorCollection;
pub use factor::{DiscreteFactor, Factor, NormaliseMode};
pub use inference::{InferenceEngine, JunctionTree, Posterior, VariableEliminationEngine};
pub use config::InferenceConfig;
