//! Native values carried by the object model.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::builtin;
use crate::descriptor::{MemberCategory, TypeDescriptor};
use crate::object::ShellObject;
use crate::record::{Adaptable, Record};

/// A native value.
///
/// `Object` is a wrapper standing in where a native value is expected;
/// comparing it against anything else compares its base object.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    /// A type inspected as a value (static members live here).
    Type(Arc<TypeDescriptor>),
    /// A user-defined record adapted through its type descriptor.
    Record(Record),
    Object(ShellObject),
}

impl Value {
    /// Wrap a user-defined record.
    pub fn record<T: Adaptable>(value: T) -> Self {
        Value::Record(Record::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Strip one wrapper layer, if any.
    pub fn unwrapped(&self) -> &Value {
        match self {
            Value::Object(obj) => obj.base_object(),
            other => other,
        }
    }

    /// The runtime type of this value. `Null` has none.
    pub fn type_descriptor(&self) -> Option<Arc<TypeDescriptor>> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(builtin::boolean_type()),
            Value::Int(_) => Some(builtin::int64_type()),
            Value::Float(_) => Some(builtin::double_type()),
            Value::String(_) => Some(builtin::string_type()),
            Value::Array(_) => Some(builtin::array_type()),
            Value::Type(_) => Some(builtin::type_type()),
            Value::Record(record) => Some(record.descriptor()),
            Value::Object(obj) => obj.base_object().type_descriptor(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.unwrapped() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.unwrapped() {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.unwrapped() {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unwrapped() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self.unwrapped() {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self.unwrapped() {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Order two values: numbers across int/float, strings ignoring case,
    /// bools, and null below everything. Other pairs are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self.unwrapped(), other.unwrapped()) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// JSON form used for serialization. Records become an object of their
    /// gettable instance properties; types become their full name.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Type(t) => serde_json::Value::String(t.full_name().to_string()),
            Value::Record(record) => {
                let flat = record.descriptor().members(MemberCategory::Instance);
                let mut map = serde_json::Map::new();
                for template in flat.properties() {
                    if let Some(Ok(value)) = template.read(Some(self)) {
                        map.insert(template.name().to_string(), value.to_json());
                    }
                }
                serde_json::Value::Object(map)
            }
            Value::Object(obj) => obj.base_object().to_json(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Object(a), b) => a.base_object() == b,
            (a, Value::Object(b)) => a == b.base_object(),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a.full_name() == b.full_name(),
            (Value::Record(a), Value::Record(b)) => a.equals(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Int(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                3u8.hash(state);
                let bits = if f.is_nan() {
                    f64::NAN.to_bits()
                } else if *f == 0.0 {
                    0
                } else {
                    f.to_bits()
                };
                bits.hash(state);
            }
            Value::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Array(items) => {
                5u8.hash(state);
                items.hash(state);
            }
            Value::Type(t) => {
                6u8.hash(state);
                t.full_name().hash(state);
            }
            Value::Record(record) => {
                7u8.hash(state);
                record.hash_code().hash(state);
            }
            Value::Object(obj) => obj.base_object().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(crate::object::DEFAULT_SEPARATOR)?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Type(t) => f.write_str(t.full_name()),
            Value::Record(record) => f.write_str(&record.render()),
            Value::Object(obj) => write!(f, "{obj}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Arc<TypeDescriptor>> for Value {
    fn from(t: Arc<TypeDescriptor>) -> Self {
        Value::Type(t)
    }
}

impl From<ShellObject> for Value {
    fn from(obj: ShellObject) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn float_nan_equals_itself() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(hash_of(&Value::Float(f64::NAN)), hash_of(&Value::Float(f64::NAN)));
    }

    #[test]
    fn signed_zero_hashes_alike() {
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(hash_of(&Value::Float(0.0)), hash_of(&Value::Float(-0.0)));
    }

    #[test]
    fn int_and_float_are_distinct_values() {
        assert_ne!(Value::Int(5), Value::Float(5.0));
        assert_eq!(Value::Int(5).compare(&Value::Float(5.0)), Some(Ordering::Equal));
    }

    #[test]
    fn compare_strings_ignores_case() {
        let a = Value::from("apple");
        let b = Value::from("BANANA");
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(Value::from("x").compare(&Value::Int(1)), None);
    }

    #[test]
    fn display_renders_nested_arrays_with_spaces() {
        let v = Value::Array(vec![
            Value::Int(1),
            Value::Array(vec![Value::from("a"), Value::from("b")]),
            Value::Null,
        ]);
        assert_eq!(v.to_string(), "1 a b ");
    }

    #[test]
    fn nan_serializes_as_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(
            serde_json::to_string(&Value::Array(vec![Value::Int(1), Value::from("x")])).unwrap(),
            r#"[1,"x"]"#
        );
    }

    #[test]
    fn type_values_compare_by_name() {
        let a = Value::Type(builtin::int64_type());
        let b = Value::Type(builtin::int64_type());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "objsh.Int64");
    }
}
