//! invoke-command — Run another command as a nested pipeline.
//!
//! The nested command reads whatever input is left on this stage and
//! writes straight into this stage's output.

use async_trait::async_trait;
use objsh_types::{ShellResult, Value};

use crate::binder::BoundParameters;
use crate::commands::{Command, CommandArgs, CommandSchema, ParamSpec, ParamType};
use crate::context::ExecContext;
use crate::scheduler::{PipelineInput, StageIo};

/// Invoke-command: `invoke-command <name> [arguments]`.
pub struct InvokeCommand;

#[async_trait]
impl Command for InvokeCommand {
    fn name(&self) -> &str {
        "invoke-command"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("invoke-command", "Run a command inside the current pipeline")
            .param(
                ParamSpec::new("Name", ParamType::String)
                    .at(0)
                    .required()
                    .alias("Command")
                    .describe("Command to run"),
            )
            .param(
                ParamSpec::new("ArgumentList", ParamType::Any)
                    .at(1)
                    .alias("Args")
                    .describe("Positional arguments for the command"),
            )
    }

    async fn execute(&self, params: BoundParameters, io: &mut StageIo, ctx: &mut ExecContext) -> ShellResult<()> {
        let name = params.string("Name").unwrap_or_default();
        let args = match params.get("ArgumentList").map(Value::unwrapped) {
            None | Some(Value::Null) => CommandArgs::new(),
            Some(Value::Array(items)) => items.iter().fold(CommandArgs::new(), |args, item| args.arg(item.clone())),
            Some(other) => CommandArgs::new().arg(other.clone()),
        };
        let input = PipelineInput::Stream(io.input.take());
        ctx.invoke_command_into(&name, &args, input, &mut io.output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use objsh_types::ShellError;

    use crate::runspace::Runspace;

    #[tokio::test]
    async fn test_nested_command_reads_stage_input() {
        let rs = Arc::new(Runspace::transient());
        let input = vec![Value::Int(1), Value::Int(2)];
        let out = rs
            .invoke("invoke-command", &CommandArgs::new().arg("write-output"), input)
            .await
            .unwrap();
        let values: Vec<_> = out.iter().map(|o| o.base_object().clone()).collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(2)]);
    }

    #[tokio::test]
    async fn test_argument_list_is_positional() {
        let rs = Arc::new(Runspace::transient());
        let args = CommandArgs::new()
            .arg("write-output")
            .arg(Value::Array(vec![Value::from("x")]));
        let out = rs.invoke("invoke-command", &args, PipelineInput::None).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].base_object(), &Value::from("x"));
    }

    #[tokio::test]
    async fn test_unknown_nested_command() {
        let rs = Arc::new(Runspace::transient());
        let err = rs
            .invoke("invoke-command", &CommandArgs::new().arg("nope"), PipelineInput::None)
            .await
            .unwrap_err();
        assert_eq!(err.root_cause(), &ShellError::CommandNotFound("nope".into()));
    }
}
