use thiserror::Error;

/// A native node, or a constant inside one, has no wire representation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unsupported expression '{expression}': {reason}")]
pub struct UnsupportedExpression {
    pub expression: String,
    pub reason: String,
}

impl UnsupportedExpression {
    pub fn new(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}
