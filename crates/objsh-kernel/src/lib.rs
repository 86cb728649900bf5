//! objsh-kernel: the execution core of objsh.
//!
//! This crate provides:
//!
//! - **Runspace**: configuration, command table and session variables
//! - **Commands**: the `Command` trait, parameter schemas and the table
//! - **Binder**: argument-to-parameter binding with parameter sets
//! - **Context**: execution context and the pipeline stack
//! - **Scheduler**: streaming pipelines over bounded channels
//! - **Builtins**: write-output, write-error, get-variable, get-member,
//!   invoke-command

pub mod binder;
pub mod builtins;
pub mod commands;
pub mod config;
pub mod context;
pub mod runspace;
pub mod scheduler;
pub mod scope;
pub mod selection;
pub mod wildcard;

pub use binder::{bind, bind_parameters, BoundCommand, BoundParameters};
pub use commands::{Command, CommandArgs, CommandInfo, CommandSchema, CommandTable, ParamSpec, ParamType};
pub use config::RunspaceConfig;
pub use context::{ExecContext, PipelineFrame, StackGuard};
pub use runspace::Runspace;
pub use scheduler::{object_stream, InputStream, OutputStream, Pipeline, PipelineInput, PipelineState, StageIo};
pub use scope::{Scope, Variable};
pub use selection::VariableSelection;
pub use wildcard::WildcardPattern;

// The data model, for embedders that only depend on the kernel.
pub use objsh_types;
