//! Session variables.
//!
//! Names are case-insensitive; a variable keeps the spelling it was first
//! set with. Each variable is a shared [`Record`] so commands can hand it
//! out through the pipeline and later writes stay visible.

use std::collections::HashMap;

use objsh_types::{Adaptable, MemberTemplate, Record, ShellError, TypeDescriptor, Value};

/// Name of the variable that overrides the output field separator.
pub const OFS: &str = "OFS";

/// A named session variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: Value,
    pub description: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            description: String::new(),
        }
    }
}

impl Adaptable for Variable {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder("objsh.Variable")
            .property(
                MemberTemplate::property("Name")
                    .record_getter(|v: &Variable| Value::from(v.name.as_str()))
                    .definition("string Name {get;}"),
            )
            .property(
                MemberTemplate::property("Value")
                    .record_getter(|v: &Variable| v.value.clone())
                    .record_setter(|v: &mut Variable, value| {
                        v.value = value;
                        Ok(())
                    })
                    .definition("object Value {get;set;}"),
            )
            .property(
                MemberTemplate::property("Description")
                    .record_getter(|v: &Variable| Value::from(v.description.as_str()))
                    .record_setter(|v: &mut Variable, value| {
                        v.description = value.to_string();
                        Ok(())
                    })
                    .definition("string Description {get;set;}"),
            )
            .build()
    }

    fn render(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

/// Case-insensitive variable store.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Lowercased name -> variable record.
    vars: HashMap<String, Record>,
    /// Insertion order of the lowercased names.
    order: Vec<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, creating it if needed.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let key = name.to_lowercase();
        match self.vars.get(&key) {
            Some(record) => {
                record.with_mut(|v: &mut Variable| v.value = value);
            }
            None => {
                self.order.push(key.clone());
                self.vars.insert(key, Record::new(Variable::new(name, value)));
            }
        }
    }

    /// Set a variable's description. Fails if the variable does not exist.
    pub fn describe(&mut self, name: &str, description: impl Into<String>) -> Result<(), ShellError> {
        let record = self
            .vars
            .get(&name.to_lowercase())
            .ok_or_else(|| ShellError::VariableNotFound(name.to_string()))?;
        let description = description.into();
        record.with_mut(|v: &mut Variable| v.description = description);
        Ok(())
    }

    /// Get a variable's value.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.record(name)
            .and_then(|r| r.with(|v: &Variable| v.value.clone()))
    }

    /// The shared record backing a variable.
    pub fn record(&self, name: &str) -> Option<&Record> {
        self.vars.get(&name.to_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let key = name.to_lowercase();
        let record = self.vars.remove(&key)?;
        self.order.retain(|k| k != &key);
        record.with(|v: &Variable| v.value.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(&name.to_lowercase())
    }

    /// Variable names in creation order, original spelling.
    pub fn names(&self) -> Vec<String> {
        self.records()
            .filter_map(|r| r.with(|v: &Variable| v.name.clone()))
            .collect()
    }

    /// Variable records in creation order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|k| self.vars.get(k))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objsh_types::ShellObject;

    #[test]
    fn set_and_get_variable() {
        let mut scope = Scope::new();
        scope.set("Greeting", Value::from("hi"));
        assert_eq!(scope.get("greeting"), Some(Value::from("hi")));
        assert_eq!(scope.get("GREETING"), Some(Value::from("hi")));
        assert_eq!(scope.get("missing"), None);
    }

    #[test]
    fn overwrite_keeps_original_spelling() {
        let mut scope = Scope::new();
        scope.set("Home", Value::from("/a"));
        scope.set("HOME", Value::from("/b"));
        assert_eq!(scope.len(), 1);
        assert_eq!(scope.names(), vec!["Home"]);
        assert_eq!(scope.get("home"), Some(Value::from("/b")));
    }

    #[test]
    fn remove_variable() {
        let mut scope = Scope::new();
        scope.set("a", Value::Int(1));
        scope.set("b", Value::Int(2));
        assert_eq!(scope.remove("A"), Some(Value::Int(1)));
        assert_eq!(scope.names(), vec!["b"]);
        assert_eq!(scope.remove("a"), None);
    }

    #[test]
    fn variable_record_exposes_settable_value() {
        let mut scope = Scope::new();
        scope.set("x", Value::Int(1));
        scope.describe("X", "a counter").unwrap();
        let record = scope.record("x").cloned().unwrap();
        let obj = ShellObject::new(Value::Record(record)).unwrap();
        assert_eq!(obj.properties().names(), vec!["Name", "Value", "Description"]);
        assert_eq!(obj.property_value("Description").unwrap(), Value::from("a counter"));

        let value = obj.properties().get("value").unwrap();
        value.set_value(Value::Int(9)).unwrap();
        assert_eq!(scope.get("x"), Some(Value::Int(9)));
        assert!(obj.properties().get("Name").unwrap().set_value(Value::Null).is_err());
    }

    #[test]
    fn describe_missing_variable_fails() {
        let mut scope = Scope::new();
        assert_eq!(
            scope.describe("nope", "x"),
            Err(ShellError::VariableNotFound("nope".into()))
        );
    }
}
