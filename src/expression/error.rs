//! Error types for native expression evaluation.

use crate::value::Value;
use std::fmt;

/// Structured outcome of "first / last / single" style operators that found
/// no element, or more than one where exactly one was required
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    NoElements,
    /// The first two matching elements
    MoreThanOneElement(Box<Value>, Box<Value>),
}

/// Errors that can occur while evaluating a native expression
#[derive(Debug, Clone)]
pub enum ExecutionError {
    /// Invalid operand types for operator
    InvalidOperandTypes {
        operator: String,
        left: String,
        right: String,
    },

    /// Integer division by zero
    DivisionByZero,

    /// Parameter referenced outside of any binding lambda or block
    UnboundParameter(String),

    /// Invoke target is not a function
    NotCallable(String),

    MissingMember { type_name: String, member: String },

    /// Member access or instance call on null
    NullReference(String),

    ArgumentCount {
        callee: String,
        expected: usize,
        actual: usize,
    },

    InvalidCast { value: String, target: String },

    IndexOutOfRange { index: i64, length: usize },

    Terminal(TerminalOutcome),

    /// Value raised by a `throw` expression
    Thrown(Value),

    /// A jump left every enclosing block without meeting its label
    UnresolvedJump(String),

    TypeCheck { expression: String, reason: String },

    NotSupported(String),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::InvalidOperandTypes {
                operator,
                left,
                right,
            } => write!(
                f,
                "Invalid operand types for operator {}: left={}, right={}",
                operator, left, right
            ),

            ExecutionError::DivisionByZero => write!(f, "Division by zero"),

            ExecutionError::UnboundParameter(name) => {
                write!(f, "Parameter '{}' is not bound in this scope", name)
            }

            ExecutionError::NotCallable(what) => write!(f, "Value {} is not callable", what),

            ExecutionError::MissingMember { type_name, member } => {
                write!(f, "Type {} has no member {}", type_name, member)
            }

            ExecutionError::NullReference(context) => {
                write!(f, "Null reference while accessing {}", context)
            }

            ExecutionError::ArgumentCount {
                callee,
                expected,
                actual,
            } => write!(
                f,
                "{} expects {} arguments, got {}",
                callee, expected, actual
            ),

            ExecutionError::InvalidCast { value, target } => {
                write!(f, "Cannot convert {} to {}", value, target)
            }

            ExecutionError::IndexOutOfRange { index, length } => write!(
                f,
                "Index {} out of range for sequence of length {}",
                index, length
            ),

            ExecutionError::Terminal(TerminalOutcome::NoElements) => {
                write!(f, "Sequence contains no matching element")
            }

            ExecutionError::Terminal(TerminalOutcome::MoreThanOneElement(..)) => {
                write!(f, "Sequence contains more than one matching element")
            }

            ExecutionError::Thrown(value) => write!(f, "Unhandled exception: {}", value),

            ExecutionError::UnresolvedJump(label) => {
                write!(f, "Jump to label {} left its enclosing block", label)
            }

            ExecutionError::TypeCheck { expression, reason } => write!(
                f,
                "Type check failed for expression '{}': {}",
                expression, reason
            ),

            ExecutionError::NotSupported(what) => write!(f, "Not supported: {}", what),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Result type for expression evaluation
pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExecutionError::InvalidOperandTypes {
            operator: "+".to_string(),
            left: "Int32".to_string(),
            right: "String".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid operand types for operator +: left=Int32, right=String"
        );

        let err = ExecutionError::ArgumentCount {
            callee: "Substring".to_string(),
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.to_string(), "Substring expects 2 arguments, got 1");

        let err = ExecutionError::Terminal(TerminalOutcome::NoElements);
        assert_eq!(err.to_string(), "Sequence contains no matching element");

        let err = ExecutionError::Thrown(Value::from("boom"));
        assert_eq!(err.to_string(), "Unhandled exception: \"boom\"");
    }
}
