//! Parameter binding.
//!
//! Matches a command's supplied arguments against its schema:
//!
//! 1. Pick the candidate parameter sets: the explicitly requested one, or
//!    every set that declares all of the supplied names.
//! 2. Bind named arguments and switches by name or alias.
//! 3. Bind the positional arguments, in order, to the set's positional
//!    parameters that are still unbound (ascending position, ties in
//!    declaration order).
//! 4. Check mandatory parameters and fill in defaults.
//!
//! With several candidates the schema's default set wins if it is among
//! them; otherwise the sets that bind cleanly are tried, and more than one
//! is an ambiguity.

use objsh_types::{ShellError, ShellResult, Value};

use crate::commands::{CommandArgs, CommandInfo, CommandSchema, ParamSpec, ParamType};

/// Parameter values bound for one invocation, keyed case-insensitively by
/// declared parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParameters {
    set: String,
    values: Vec<(String, Value)>,
}

impl BoundParameters {
    pub fn new(set: impl Into<String>) -> Self {
        Self {
            set: set.into(),
            values: Vec::new(),
        }
    }

    /// The parameter set binding settled on.
    pub fn parameter_set(&self) -> &str {
        &self.set
    }

    /// Bind or rebind a value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True if a switch (or bool) parameter is set.
    pub fn switch(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn string(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.is_null()).map(Value::to_string)
    }

    /// A string-array parameter; scalars count as one element.
    pub fn strings(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).and_then(|v| match v.unwrapped() {
            Value::Null => None,
            Value::Array(items) => Some(items.iter().map(Value::to_string).collect()),
            other => Some(vec![other.to_string()]),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A command paired with the parameters bound for it.
#[derive(Debug, Clone)]
pub struct BoundCommand {
    pub info: CommandInfo,
    pub params: BoundParameters,
    /// First supplied argument, kept for error reports.
    pub argument: Option<String>,
}

impl BoundCommand {
    pub fn name(&self) -> &str {
        &self.info.name
    }
}

/// Bind `args` against the command's schema.
pub fn bind(info: &CommandInfo, args: &CommandArgs) -> ShellResult<BoundCommand> {
    let params = bind_parameters(&info.schema, args)?;
    tracing::debug!(
        command = %info.name,
        set = %params.parameter_set(),
        bound = params.len(),
        "bound parameters"
    );
    Ok(BoundCommand {
        info: info.clone(),
        params,
        argument: args.first_argument(),
    })
}

/// Bind `args` against a schema, choosing the parameter set.
pub fn bind_parameters(schema: &CommandSchema, args: &CommandArgs) -> ShellResult<BoundParameters> {
    let command = schema.name.as_str();
    let candidates = candidate_sets(schema, args)?;

    if let [only] = candidates.as_slice() {
        return bind_set(schema, only, args);
    }

    if let Some(default) = &schema.default_set {
        if let Some(set) = candidates.iter().find(|s| s.eq_ignore_ascii_case(default)) {
            tracing::trace!(command, set = %set, "using default parameter set");
            return bind_set(schema, set, args);
        }
    }

    let mut first_error = None;
    let mut bound = Vec::new();
    for set in &candidates {
        match bind_set(schema, set, args) {
            Ok(params) => bound.push(params),
            Err(e) => {
                tracing::trace!(command, set = %set, error = %e, "parameter set rejected");
                first_error.get_or_insert(e);
            }
        }
    }

    match bound.len() {
        1 => Ok(bound.remove(0)),
        0 => Err(first_error.unwrap_or_else(|| ShellError::binding(command, None, "no parameter set matches"))),
        _ => Err(ShellError::AmbiguousParameterSet {
            command: command.to_string(),
            candidates: bound.iter().map(|p| p.parameter_set().to_string()).collect(),
        }),
    }
}

fn candidate_sets(schema: &CommandSchema, args: &CommandArgs) -> ShellResult<Vec<String>> {
    let command = schema.name.as_str();
    let sets = schema.parameter_sets();

    if let Some(requested) = &args.parameter_set {
        return sets
            .into_iter()
            .find(|s| s.eq_ignore_ascii_case(requested))
            .map(|s| vec![s])
            .ok_or_else(|| {
                ShellError::binding(command, None, format!("parameter set '{requested}' does not exist"))
            });
    }

    if let Some(unknown) = args.supplied_names().find(|n| schema.find(n).is_none()) {
        return Err(unknown_parameter(command, unknown));
    }

    let candidates: Vec<String> = sets
        .into_iter()
        .filter(|set| {
            args.supplied_names()
                .all(|n| schema.params_in_set(set).any(|p| p.answers_to(n)))
        })
        .collect();

    if candidates.is_empty() {
        return Err(ShellError::binding(
            command,
            None,
            "parameter set cannot be resolved using the specified named parameters",
        ));
    }
    Ok(candidates)
}

fn unknown_parameter(command: &str, name: &str) -> ShellError {
    ShellError::binding(
        command,
        Some(name),
        format!("a parameter cannot be found that matches parameter name '{name}'"),
    )
}

fn bind_set(schema: &CommandSchema, set: &str, args: &CommandArgs) -> ShellResult<BoundParameters> {
    let command = schema.name.as_str();
    let params: Vec<&ParamSpec> = schema.params_in_set(set).collect();
    let lookup = |name: &str| {
        params
            .iter()
            .copied()
            .find(|p| p.answers_to(name))
            .ok_or_else(|| unknown_parameter(command, name))
    };
    let mut bound = BoundParameters::new(set);

    for (name, value) in &args.named {
        let spec = lookup(name)?;
        if bound.contains(&spec.name) {
            return Err(duplicate(command, &spec.name));
        }
        bound.insert(spec.name.clone(), convert(spec, value)?);
    }

    for name in &args.switches {
        let spec = lookup(name)?;
        if bound.contains(&spec.name) {
            return Err(duplicate(command, &spec.name));
        }
        let value = match spec.param_type {
            ParamType::Switch | ParamType::Bool => Value::Bool(true),
            _ => {
                return Err(ShellError::binding(
                    command,
                    Some(&spec.name),
                    format!("missing an argument for parameter '{}'", spec.name),
                ))
            }
        };
        bound.insert(spec.name.clone(), value);
    }

    let mut slots: Vec<&ParamSpec> = params
        .iter()
        .copied()
        .filter(|p| p.position.is_some() && !p.is_switch() && !bound.contains(&p.name))
        .collect();
    // Stable: equal positions keep declaration order.
    slots.sort_by_key(|p| p.position);
    let mut slots = slots.into_iter();
    for value in &args.positional {
        let spec = slots.next().ok_or_else(|| {
            ShellError::binding(
                command,
                None,
                format!("a positional parameter cannot be found that accepts argument '{value}'"),
            )
        })?;
        bound.insert(spec.name.clone(), convert(spec, value)?);
    }

    for spec in &params {
        if bound.contains(&spec.name) {
            continue;
        }
        if spec.required {
            return Err(ShellError::binding(
                command,
                Some(&spec.name),
                format!("missing mandatory parameter '{}'", spec.name),
            ));
        }
        if let Some(default) = &spec.default {
            bound.insert(spec.name.clone(), default.clone());
        }
    }

    Ok(bound)
}

fn duplicate(command: &str, name: &str) -> ShellError {
    ShellError::binding(
        command,
        Some(name),
        format!("parameter '{name}' is specified more than once"),
    )
}

fn conversion_error(spec: &ParamSpec, value: &Value) -> ShellError {
    ShellError::TypeConversion {
        parameter: spec.name.clone(),
        value: value.to_string(),
        target: spec.param_type.to_string(),
    }
}

/// Convert an argument to the parameter's declared type.
pub fn convert(spec: &ParamSpec, value: &Value) -> ShellResult<Value> {
    let fail = || conversion_error(spec, value);
    let raw = value.unwrapped();
    match spec.param_type {
        ParamType::Any => Ok(value.clone()),
        ParamType::String => match raw {
            Value::Null => Ok(Value::String(String::new())),
            Value::Array(_) | Value::Record(_) => Err(fail()),
            other => Ok(Value::String(other.to_string())),
        },
        ParamType::Int => match raw {
            Value::String(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| fail()),
            other => other.as_int().map(Value::Int).ok_or_else(fail),
        },
        ParamType::Float => match raw {
            Value::String(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| fail()),
            other => other.as_float().map(Value::Float).ok_or_else(fail),
        },
        ParamType::Bool | ParamType::Switch => match raw {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(i) => Ok(Value::Bool(*i != 0)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(fail()),
        },
        ParamType::StringArray => match raw {
            Value::Null | Value::Record(_) => Err(fail()),
            Value::Array(items) => Ok(Value::Array(
                items.iter().map(|v| Value::String(v.to_string())).collect(),
            )),
            other => Ok(Value::Array(vec![Value::String(other.to_string())])),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ALL_PARAMETER_SETS;

    fn schema() -> CommandSchema {
        CommandSchema::new("copy-item", "")
            .param(ParamSpec::new("Path", ParamType::String).at(0).required())
            .param(ParamSpec::new("Destination", ParamType::String).at(1))
            .param(ParamSpec::new("Count", ParamType::Int).default_value(Value::Int(1)))
            .param(ParamSpec::switch("Force"))
    }

    #[test]
    fn positional_fill_in_position_order() {
        let args = CommandArgs::new().arg("a").arg("b");
        let bound = bind_parameters(&schema(), &args).unwrap();
        assert_eq!(bound.parameter_set(), ALL_PARAMETER_SETS);
        assert_eq!(bound.string("path").as_deref(), Some("a"));
        assert_eq!(bound.string("Destination").as_deref(), Some("b"));
        assert_eq!(bound.get("Count"), Some(&Value::Int(1)));
        assert!(!bound.switch("Force"));
    }

    #[test]
    fn named_binding_skips_its_positional_slot() {
        let args = CommandArgs::new().named("path", "p").arg("d").switch("FORCE");
        let bound = bind_parameters(&schema(), &args).unwrap();
        assert_eq!(bound.string("Path").as_deref(), Some("p"));
        assert_eq!(bound.string("Destination").as_deref(), Some("d"));
        assert!(bound.switch("force"));
    }

    #[test]
    fn conversion_failure() {
        let args = CommandArgs::new().arg("a").named("Count", "many");
        let err = bind_parameters(&schema(), &args).unwrap_err();
        assert_eq!(
            err,
            ShellError::TypeConversion {
                parameter: "Count".into(),
                value: "many".into(),
                target: "long".into(),
            }
        );
    }

    #[test]
    fn string_numbers_convert() {
        let args = CommandArgs::new().arg("a").named("count", " 7 ");
        let bound = bind_parameters(&schema(), &args).unwrap();
        assert_eq!(bound.get("Count"), Some(&Value::Int(7)));
    }

    #[test]
    fn switch_on_valued_parameter_is_rejected() {
        let args = CommandArgs::new().arg("a").switch("Destination");
        let err = bind_parameters(&schema(), &args).unwrap_err();
        assert!(matches!(err, ShellError::ParameterBinding { parameter: Some(p), .. } if p == "Destination"));
    }

    #[test]
    fn explicit_unknown_set() {
        let args = CommandArgs::new().arg("a").in_set("Nope");
        assert!(matches!(
            bind_parameters(&schema(), &args),
            Err(ShellError::ParameterBinding { .. })
        ));
    }

    #[test]
    fn string_array_wraps_scalar() {
        let spec = ParamSpec::new("Name", ParamType::StringArray);
        assert_eq!(
            convert(&spec, &Value::Int(3)).unwrap(),
            Value::Array(vec![Value::from("3")])
        );
        assert!(convert(&spec, &Value::Null).is_err());
    }
}
