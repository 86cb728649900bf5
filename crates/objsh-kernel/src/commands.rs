//! Commands, their parameter schemas, and the command table.
//!
//! Every command implements [`Command`]: built-ins and host-provided
//! commands alike. The [`CommandTable`] is the resolver's only source.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use objsh_types::{ShellError, ShellResult, Value};

use crate::binder::BoundParameters;
use crate::context::ExecContext;
use crate::scheduler::StageIo;

/// Name of the implicit parameter set every command has when no parameter
/// names a set.
pub const ALL_PARAMETER_SETS: &str = "__AllParameterSets";

/// Declared type of a parameter; arguments are converted to it on binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Any,
    String,
    Int,
    Float,
    Bool,
    /// Present-or-absent flag. Never bound positionally.
    Switch,
    StringArray,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Any => "object",
            ParamType::String => "string",
            ParamType::Int => "long",
            ParamType::Float => "double",
            ParamType::Bool => "bool",
            ParamType::Switch => "switch",
            ParamType::StringArray => "string[]",
        };
        f.write_str(s)
    }
}

/// Schema for a command parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Alternative names accepted for named binding.
    pub aliases: Vec<String>,
    pub param_type: ParamType,
    /// Whether binding fails when this parameter is left unbound.
    pub required: bool,
    /// Position for positional binding; `None` means named-only.
    pub position: Option<usize>,
    /// Parameter sets this parameter belongs to; empty means all of them.
    pub sets: Vec<String>,
    /// Value used when the parameter is optional and unbound.
    pub default: Option<Value>,
    /// Description for help text.
    pub description: String,
}

impl ParamSpec {
    /// An optional, named-only parameter in every set.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            param_type,
            required: false,
            position: None,
            sets: Vec::new(),
            default: None,
            description: String::new(),
        }
    }

    /// A switch parameter.
    pub fn switch(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Switch)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn in_set(mut self, set: impl Into<String>) -> Self {
        self.sets.push(set.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Matches the parameter name or an alias, ignoring case.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Belongs to the named set (or to every set).
    pub fn in_parameter_set(&self, set: &str) -> bool {
        self.sets.is_empty() || self.sets.iter().any(|s| s.eq_ignore_ascii_case(set))
    }

    pub fn is_switch(&self) -> bool {
        self.param_type == ParamType::Switch
    }
}

/// Schema describing a command's interface.
#[derive(Debug, Clone)]
pub struct CommandSchema {
    /// Command name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Parameter definitions, in declaration order.
    pub params: Vec<ParamSpec>,
    /// Set chosen when several sets fit the supplied arguments.
    pub default_set: Option<String>,
}

impl CommandSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            default_set: None,
        }
    }

    /// Add a parameter to the schema.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn default_set(mut self, set: impl Into<String>) -> Self {
        self.default_set = Some(set.into());
        self
    }

    /// Named parameter sets in first-mention order, or the implicit set.
    pub fn parameter_sets(&self) -> Vec<String> {
        let mut sets: Vec<String> = Vec::new();
        for set in self.params.iter().flat_map(|p| p.sets.iter()) {
            if !sets.iter().any(|s| s.eq_ignore_ascii_case(set)) {
                sets.push(set.clone());
            }
        }
        if sets.is_empty() {
            sets.push(ALL_PARAMETER_SETS.to_string());
        }
        sets
    }

    /// Look up a parameter by name or alias.
    pub fn find(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.answers_to(name))
    }

    /// Parameters belonging to `set`, in declaration order.
    pub fn params_in_set<'a>(&'a self, set: &'a str) -> impl Iterator<Item = &'a ParamSpec> + 'a {
        self.params.iter().filter(move |p| p.in_parameter_set(set))
    }
}

/// Evaluated arguments supplied by the host for one command invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    /// Positional arguments in order.
    pub positional: Vec<Value>,
    /// Named arguments in the order given.
    pub named: Vec<(String, Value)>,
    /// Switches present on the command line.
    pub switches: Vec<String>,
    /// Explicitly requested parameter set.
    pub parameter_set: Option<String>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }

    pub fn switch(mut self, name: impl Into<String>) -> Self {
        self.switches.push(name.into());
        self
    }

    pub fn in_set(mut self, set: impl Into<String>) -> Self {
        self.parameter_set = Some(set.into());
        self
    }

    /// Names of every named argument and switch, in order.
    pub fn supplied_names(&self) -> impl Iterator<Item = &str> {
        self.named
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(self.switches.iter().map(String::as_str))
    }

    /// First positional argument, for error context.
    pub fn first_argument(&self) -> Option<String> {
        self.positional
            .first()
            .or_else(|| self.named.first().map(|(_, v)| v))
            .map(Value::to_string)
    }
}

/// A command that can run as a pipeline stage.
#[async_trait]
pub trait Command: Send + Sync {
    /// The command's name (used for lookup).
    fn name(&self) -> &str;

    /// Get the command's schema.
    fn schema(&self) -> CommandSchema;

    /// Run the command: read from `io.input`, write to `io.output`.
    ///
    /// Returning early is fine; the scheduler closes the output and the
    /// upstream stages see a stopped pipeline.
    async fn execute(
        &self,
        params: BoundParameters,
        io: &mut StageIo,
        ctx: &mut ExecContext,
    ) -> ShellResult<()>;
}

/// A resolved command: its name, schema and entry point.
#[derive(Clone)]
pub struct CommandInfo {
    pub name: String,
    pub schema: CommandSchema,
    pub command: Arc<dyn Command>,
}

impl CommandInfo {
    pub fn new(command: Arc<dyn Command>) -> Self {
        Self {
            name: command.name().to_string(),
            schema: command.schema(),
            command,
        }
    }
}

impl fmt::Debug for CommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInfo")
            .field("name", &self.name)
            .field("params", &self.schema.params.len())
            .finish()
    }
}

/// Commands known to a runspace, looked up by case-insensitive name.
#[derive(Default, Clone)]
pub struct CommandTable {
    commands: HashMap<String, CommandInfo>,
    /// Lowercased names in registration order.
    order: Vec<String>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. A later registration under the same name replaces
    /// the earlier one.
    pub fn register(&mut self, command: impl Command + 'static) {
        self.register_arc(Arc::new(command));
    }

    pub fn register_arc(&mut self, command: Arc<dyn Command>) {
        let info = CommandInfo::new(command);
        let key = info.name.to_lowercase();
        if self.commands.insert(key.clone(), info).is_none() {
            self.order.push(key);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandInfo> {
        self.commands.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    /// Exact, case-insensitive lookup.
    pub fn resolve(&self, name: &str) -> ShellResult<CommandInfo> {
        self.get(name)
            .cloned()
            .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|k| self.commands.get(k))
            .map(|info| info.name.as_str())
            .collect()
    }

    pub fn schemas(&self) -> Vec<CommandSchema> {
        self.order
            .iter()
            .filter_map(|k| self.commands.get(k))
            .map(|info| info.schema.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
