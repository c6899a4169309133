//! Tunables for the inference engines
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! heuristic = "min-fill"
//! epsilon = 1e-12
//! reduce-fill = 0.0
//! normalise = "row-wise"
//! cache-capacity = 64
//! ```

use crate::elimination::EliminationHeuristic;
use crate::entropy;
use crate::factor::NormaliseMode;

use serde::{Deserialize, Serialize};

use std::path::Path;


/// Largest accepted `epsilon`. Table normalisation clips every entry up to epsilon, so a larger
/// bound would give visible mass to states the evidence rules out.
pub const MAX_EPSILON: f64 = 1e-6;


/// Errors raised while loading an `InferenceConfig`
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The document parsed but a value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InferenceConfig {
    /// Cost function used to order variable elimination when building a tree
    #[serde(default)]
    pub heuristic: EliminationHeuristic,

    /// Clip bound used when normalising posteriors
    #[serde(default = "InferenceConfig::default_epsilon")]
    pub epsilon: f64,

    /// Value written into table entries that contradict an observation
    #[serde(default)]
    pub reduce_fill: f64,

    /// How query posteriors are normalised
    #[serde(default)]
    pub normalise: NormaliseMode,

    /// Number of query results kept by a `CachedEngine`. Zero disables caching.
    #[serde(default = "InferenceConfig::default_cache_capacity")]
    pub cache_capacity: usize,
}


impl InferenceConfig {

    fn default_epsilon() -> f64 {
        entropy::EPSILON
    }


    fn default_cache_capacity() -> usize {
        128
    }


    /// Parse a configuration from a TOML document and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: InferenceConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }


    /// Read a configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        std::fs::read_to_string(path)
            .map_err(Into::into)
            .and_then(|contents| Self::from_toml_str(contents.as_str()))
    }


    /// Check the ranges of the numeric fields
    ///
    /// # Errors
    /// * `ConfigError::Invalid` if `epsilon` is not in `[0, MAX_EPSILON]` or `reduce-fill` is
    ///   negative or not finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if ! (self.epsilon >= 0.0 && self.epsilon <= MAX_EPSILON) {
            return Err(ConfigError::Invalid(
                format!("epsilon {} is outside [0, {}]", self.epsilon, MAX_EPSILON)
            ));
        }

        if ! (self.reduce_fill >= 0.0 && self.reduce_fill.is_finite()) {
            return Err(ConfigError::Invalid(
                format!("reduce-fill {} must be a finite non-negative number", self.reduce_fill)
            ));
        }

        Ok(())
    }

}


impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            heuristic: EliminationHeuristic::default(),
            epsilon: InferenceConfig::default_epsilon(),
            reduce_fill: 0.0,
            normalise: NormaliseMode::default(),
            cache_capacity: InferenceConfig::default_cache_capacity(),
        }
    }
}


/// Read a configuration from `path`, or fall back to the defaults when no path is given
pub fn read_config<P: AsRef<Path>>(path: Option<P>) -> Result<InferenceConfig, ConfigError> {
    match path {
        Some(path) => InferenceConfig::from_file(path),
        None => Ok(InferenceConfig::default()),
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(InferenceConfig::default(), InferenceConfig::from_toml_str("").unwrap());
    }

    #[test]
    fn kebab_case_keys() {
        let config = InferenceConfig::from_toml_str(r#"
            heuristic = "min-fill"
            epsilon = 1e-12
            reduce-fill = 0.5
            normalise = "row-wise"
            cache-capacity = 0
        "#).unwrap();

        assert_eq!(EliminationHeuristic::MinFill, config.heuristic);
        assert_eq!(1e-12, config.epsilon);
        assert_eq!(0.5, config.reduce_fill);
        assert_eq!(NormaliseMode::RowWise, config.normalise);
        assert_eq!(0, config.cache_capacity);
    }

    #[test]
    fn rejects_bad_values() {
        match InferenceConfig::from_toml_str("epsilon = 1.5") {
            Err(ConfigError::Invalid(_)) => (),
            other => panic!("wrong result {:?}", other)
        };

        // large enough to show through on ruled-out states
        match InferenceConfig::from_toml_str("epsilon = 0.1") {
            Err(ConfigError::Invalid(_)) => (),
            other => panic!("wrong result {:?}", other)
        };

        assert!(InferenceConfig::from_toml_str("epsilon = 1e-6").is_ok());
        assert!(InferenceConfig::from_toml_str("epsilon = 0.0").is_ok());

        match InferenceConfig::from_toml_str("reduce-fill = -1.0") {
            Err(ConfigError::Invalid(_)) => (),
            other => panic!("wrong result {:?}", other)
        };

        match InferenceConfig::from_toml_str("heuristic = \"max-cardinality\"") {
            Err(ConfigError::Toml(_)) => (),
            other => panic!("wrong result {:?}", other)
        };
    }

    #[test]
    fn missing_file() {
        match read_config(Some("/nonexistent/junction.toml")) {
            Err(ConfigError::Io(_)) => (),
            other => panic!("wrong result {:?}", other)
        };

        assert_eq!(InferenceConfig::default(), read_config::<&str>(None).unwrap());
    }

}
