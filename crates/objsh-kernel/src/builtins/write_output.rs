//! write-output — Emit values to the pipeline.

use async_trait::async_trait;
use objsh_types::ShellResult;

use crate::binder::BoundParameters;
use crate::commands::{Command, CommandSchema, ParamSpec, ParamType};
use crate::context::ExecContext;
use crate::scheduler::StageIo;

/// Write-output: emits its argument, then passes its input through.
pub struct WriteOutput;

#[async_trait]
impl Command for WriteOutput {
    fn name(&self) -> &str {
        "write-output"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("write-output", "Send objects to the next command in the pipeline")
            .param(
                ParamSpec::new("InputObject", ParamType::Any)
                    .at(0)
                    .describe("Objects to send; arrays are sent one element at a time"),
            )
            .param(ParamSpec::switch("NoEnumerate").describe("Send arrays as a single object"))
    }

    async fn execute(&self, params: BoundParameters, io: &mut StageIo, _ctx: &mut ExecContext) -> ShellResult<()> {
        if let Some(value) = params.get("InputObject").cloned() {
            if params.switch("NoEnumerate") {
                io.output.write(value).await?;
            } else {
                io.output.write_enumerated(value).await?;
            }
        }
        io.pass_through().await
    }
}
