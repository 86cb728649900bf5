//! write-error — Send values to the error stream.
//!
//! Errors travel through the ordinary output stream. Each item is marked
//! with the error-stream note so hosts can route it.

use async_trait::async_trait;
use objsh_types::{ShellObject, ShellResult, Value};

use crate::binder::BoundParameters;
use crate::commands::{Command, CommandSchema, ParamSpec, ParamType};
use crate::context::ExecContext;
use crate::scheduler::StageIo;

/// Write-error: marks its argument and its input as errors.
pub struct WriteError;

#[async_trait]
impl Command for WriteError {
    fn name(&self) -> &str {
        "write-error"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("write-error", "Write objects to the error stream")
            .param(
                ParamSpec::new("Message", ParamType::Any)
                    .at(0)
                    .alias("Msg")
                    .describe("Error to write"),
            )
    }

    async fn execute(&self, params: BoundParameters, io: &mut StageIo, _ctx: &mut ExecContext) -> ShellResult<()> {
        if let Some(message) = params.get("Message").cloned() {
            if let Some(obj) = ShellObject::wrap_or_none(message) {
                tracing::debug!(error = %obj, "write-error");
                obj.set_write_to_error_stream(true);
                io.output.write_object(obj).await?;
            }
        }
        while let Some(item) = io.input.next().await {
            item.set_write_to_error_stream(true);
            io.output.write_object(item).await?;
        }
        Ok(())
    }
}

/// Whether `value` was written by write-error.
pub fn is_error(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if obj.write_to_error_stream())
}
