//! The runspace: configuration, command table and session variables.
//!
//! ```text
//! Runspace
//! ├── RunspaceConfig     (name, separator, stage buffer)
//! ├── CommandTable       (built-ins + host commands)
//! └── RwLock<Scope>      (session variables)
//! ```
//!
//! A runspace is shared (`Arc`) by every [`ExecContext`] created from it.

use std::fmt;
use std::sync::Arc;

use objsh_types::{ShellObject, ShellResult, Value};
use tokio::sync::RwLock;

use crate::builtins::register_builtins;
use crate::commands::{Command, CommandArgs, CommandInfo, CommandTable};
use crate::config::RunspaceConfig;
use crate::context::ExecContext;
use crate::scheduler::PipelineInput;
use crate::scope::Scope;

pub struct Runspace {
    config: RunspaceConfig,
    commands: CommandTable,
    scope: RwLock<Scope>,
}

impl Runspace {
    /// Create a runspace, registering the built-ins unless the config
    /// says otherwise.
    pub fn new(config: RunspaceConfig) -> Self {
        let mut commands = CommandTable::new();
        if config.register_builtins {
            register_builtins(&mut commands);
        }
        Self::with_commands(config, commands)
    }

    /// Create a runspace over an explicit command table.
    pub fn with_commands(config: RunspaceConfig, commands: CommandTable) -> Self {
        tracing::debug!(name = %config.name, commands = commands.len(), "runspace created");
        Self {
            config,
            commands,
            scope: RwLock::new(Scope::new()),
        }
    }

    /// A throwaway runspace with default settings.
    pub fn transient() -> Self {
        Self::new(RunspaceConfig::transient())
    }

    /// Add a command before the runspace is shared.
    pub fn register(&mut self, command: impl Command + 'static) {
        self.commands.register(command);
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &RunspaceConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn scope(&self) -> &RwLock<Scope> {
        &self.scope
    }

    /// Case-insensitive exact lookup.
    #[tracing::instrument(level = "debug", skip(self), err)]
    pub fn resolve(&self, name: &str) -> ShellResult<CommandInfo> {
        self.commands.resolve(name)
    }

    /// A fresh top-level context over this runspace.
    pub fn context(self: &Arc<Self>) -> ExecContext {
        ExecContext::new(self.clone())
    }

    /// Run one command in a fresh context.
    pub async fn invoke(
        self: &Arc<Self>,
        name: &str,
        args: &CommandArgs,
        input: impl Into<PipelineInput>,
    ) -> ShellResult<Vec<ShellObject>> {
        self.context().invoke_command(name, args, input.into()).await
    }

    pub async fn set_variable(&self, name: &str, value: Value) {
        self.scope.write().await.set(name, value);
    }

    pub async fn get_variable(&self, name: &str) -> Option<Value> {
        self.scope.read().await.get(name)
    }
}

impl fmt::Debug for Runspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runspace")
            .field("name", &self.config.name)
            .field("commands", &self.commands)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objsh_types::ShellError;

    #[test]
    fn builtins_registered_by_default() {
        let rs = Runspace::transient();
        for name in ["write-output", "write-error", "get-variable", "get-member", "invoke-command"] {
            assert!(rs.commands().contains(name), "{name} missing");
        }
        let bare = Runspace::new(RunspaceConfig::transient().without_builtins());
        assert!(bare.commands().is_empty());
    }

    #[test]
    fn resolve_reports_missing_command() {
        let rs = Runspace::transient();
        assert_eq!(
            rs.resolve("Frobnicate").unwrap_err(),
            ShellError::CommandNotFound("Frobnicate".into())
        );
        assert_eq!(rs.resolve("WRITE-OUTPUT").unwrap().name, "write-output");
    }

    #[tokio::test]
    async fn variables_round_trip_through_scope() {
        let rs = Runspace::transient();
        rs.set_variable("Answer", Value::Int(42)).await;
        assert_eq!(rs.get_variable("answer").await, Some(Value::Int(42)));
    }
}
