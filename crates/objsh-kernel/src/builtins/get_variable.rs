//! get-variable — List session variables.
//!
//! # Examples
//!
//! ```text
//! get-variable                       # every variable
//! get-variable PS*                   # names matching a wildcard
//! get-variable -Include P* -Exclude *Home
//! get-variable Path -ValueOnly       # just the value
//! ```

use async_trait::async_trait;
use objsh_types::{ShellResult, Value};

use crate::binder::BoundParameters;
use crate::commands::{Command, CommandSchema, ParamSpec, ParamType};
use crate::context::ExecContext;
use crate::scheduler::StageIo;
use crate::scope::Variable;
use crate::selection::VariableSelection;

/// Get-variable: emits variable records (or values) in creation order.
pub struct GetVariable;

#[async_trait]
impl Command for GetVariable {
    fn name(&self) -> &str {
        "get-variable"
    }

    fn schema(&self) -> CommandSchema {
        CommandSchema::new("get-variable", "Get the variables in the session")
            .param(
                ParamSpec::new("Name", ParamType::StringArray)
                    .at(0)
                    .describe("Names or wildcard patterns to select"),
            )
            .param(ParamSpec::new("Include", ParamType::StringArray).describe("Keep only matching names"))
            .param(ParamSpec::new("Exclude", ParamType::StringArray).describe("Drop matching names"))
            .param(ParamSpec::switch("ValueOnly").describe("Emit values instead of variable records"))
    }

    async fn execute(&self, params: BoundParameters, io: &mut StageIo, ctx: &mut ExecContext) -> ShellResult<()> {
        let selection = VariableSelection::new(
            params.strings("Name"),
            params.strings("Include"),
            params.strings("Exclude"),
        );
        let value_only = params.switch("ValueOnly");

        // Collect under the lock, write after releasing it.
        let mut found = Vec::new();
        let outcome = {
            let scope = ctx.runspace().scope().read().await;
            selection.process_strict(&scope, |record| {
                found.push(record.clone());
                Ok(())
            })
        };

        for record in found {
            let value = if value_only {
                record.with(|v: &Variable| v.value.clone()).unwrap_or(Value::Null)
            } else {
                Value::Record(record)
            };
            io.output.write(value).await?;
        }
        outcome
    }
}
