//! Translation and execution settings.

use serde::{Deserialize, Serialize};

/// Controls how a native expression is prepared for the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOptions {
    /// Run the partial evaluator before translating
    pub evaluate_locally: bool,
    /// Box captured variables as variable query arguments instead of
    /// inlining them as plain constants
    pub wrap_captured_variables: bool,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            evaluate_locally: true,
            wrap_captured_variables: true,
        }
    }
}

/// Knobs of the default execution pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Partially evaluate the native tree after resources are bound
    pub evaluate_locally: bool,
    /// Force deferred sequences in the result
    pub materialize_sequences: bool,
    /// Report empty / ambiguous terminal operators as result values rather
    /// than errors: an empty list for no element, the first two elements
    /// for more than one
    pub terminal_sentinels: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            evaluate_locally: true,
            materialize_sequences: true,
            terminal_sentinels: true,
        }
    }
}

impl ExecutorConfig {
    /// Settings that surface terminal outcomes as errors
    pub fn strict() -> Self {
        Self {
            terminal_sentinels: false,
            ..Self::default()
        }
    }
}
