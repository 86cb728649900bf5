//! Built-in commands for objsh.
//!
//! These commands are registered in every runspace unless the
//! configuration turns them off.

mod get_member;
mod get_variable;
mod invoke_command;
mod write_error;
mod write_output;

pub use get_member::MemberDefinition;
pub use write_error::is_error;

use crate::commands::CommandTable;

/// Register all built-in commands with the table.
pub fn register_builtins(table: &mut CommandTable) {
    table.register(get_member::GetMember);
    table.register(get_variable::GetVariable);
    table.register(invoke_command::InvokeCommand);
    table.register(write_error::WriteError);
    table.register(write_output::WriteOutput);
}
