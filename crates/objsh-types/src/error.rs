//! Error taxonomy shared by the object model and the kernel.

use thiserror::Error;

/// Result type for object-model and execution operations.
pub type ShellResult<T> = Result<T, ShellError>;

/// Errors raised while adapting values, resolving and binding commands,
/// or running pipelines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShellError {
    /// A wrapper was requested around a null value.
    #[error("argument \"{0}\" is null")]
    NullArgument(String),

    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// The supplied argument names fit more than one parameter set.
    #[error("{command}: parameter set cannot be resolved, candidates: {}", .candidates.join(", "))]
    AmbiguousParameterSet {
        command: String,
        candidates: Vec<String>,
    },

    #[error("{command}: {reason}")]
    ParameterBinding {
        command: String,
        parameter: Option<String>,
        reason: String,
    },

    #[error("cannot convert {value:?} to {target} for parameter {parameter}")]
    TypeConversion {
        parameter: String,
        value: String,
        target: String,
    },

    #[error("the variable {0} could not be found")]
    VariableNotFound(String),

    /// A member could not be read, written or invoked.
    #[error("{member}: {reason}")]
    Member { member: String, reason: String },

    /// A running stage failed; carries enough context to report without
    /// inspecting kernel state.
    #[error("{command}{}: {source}", .argument.as_ref().map(|a| format!(" {a}")).unwrap_or_default())]
    StageExecution {
        command: String,
        argument: Option<String>,
        source: Box<ShellError>,
    },

    /// Downstream stopped reading or the pipeline was cancelled.
    #[error("the pipeline has been stopped")]
    PipelineStopped,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Free-form failure raised by a command's own logic.
    #[error("{0}")]
    Failed(String),
}

impl ShellError {
    /// Build a member access error.
    pub fn member(member: impl Into<String>, reason: impl Into<String>) -> Self {
        ShellError::Member {
            member: member.into(),
            reason: reason.into(),
        }
    }

    /// Build a binding error, optionally naming the offending parameter.
    pub fn binding(command: impl Into<String>, parameter: Option<&str>, reason: impl Into<String>) -> Self {
        ShellError::ParameterBinding {
            command: command.into(),
            parameter: parameter.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Follow `StageExecution` wrappers down to the error a stage raised.
    pub fn root_cause(&self) -> &ShellError {
        match self {
            ShellError::StageExecution { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
