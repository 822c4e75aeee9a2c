use crate::expression::ExecutionError;
use crate::graph::MappingError;
use crate::translation::UnsupportedExpression;
use crate::types::ResolutionError;
use crate::value::NotSupportedError;
use crate::wire::WireError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedExpression),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    NotSupported(#[from] NotSupportedError),

    #[error("Local evaluation of '{expression}' failed")]
    EvaluationFault {
        expression: String,
        #[source]
        source: ExecutionError,
    },

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// Failure reported by the executing side
    #[error("Remote execution failed: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, Error>;
