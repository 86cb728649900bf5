//! The adaptive object wrapper.
//!
//! [`ShellObject`] gives every non-null [`Value`] the same member surface:
//! properties, methods and static members discovered from the value's
//! [`TypeDescriptor`](crate::TypeDescriptor). Collections are materialized
//! on first access, once per wrapper, and read concurrently afterwards.
//!
//! Wrapping a wrapper delegates: the new wrapper's immediate base object is
//! the inner wrapper, but its base object is the inner wrapper's base, so
//! the delegation chain is never walked at runtime.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use serde::{Serialize, Serializer};

use crate::descriptor::{MemberCategory, TypeDescriptor};
use crate::error::{ShellError, ShellResult};
use crate::member::{MemberCollection, MemberInfo};
use crate::value::Value;

/// Separator placed between array elements when rendering text.
pub const DEFAULT_SEPARATOR: &str = " ";

/// Extension note set on items destined for the error stream.
pub const ERROR_STREAM_NOTE: &str = "writeToErrorStream";

struct ObjectInner {
    immediate: Value,
    base: Arc<Value>,
    type_names: OnceLock<Vec<String>>,
    properties: OnceLock<MemberCollection>,
    methods: OnceLock<MemberCollection>,
    static_members: OnceLock<MemberCollection>,
    members: OnceLock<MemberCollection>,
    extensions: MemberCollection,
}

/// Uniform wrapper around a native value. Cheap to clone; clones share
/// their member collections and extension notes.
#[derive(Clone)]
pub struct ShellObject {
    inner: Arc<ObjectInner>,
}

impl ShellObject {
    /// Always build a new wrapper. Wrapping a wrapper delegates to it.
    pub fn new(value: Value) -> ShellResult<Self> {
        let base = match &value {
            Value::Null => return Err(ShellError::NullArgument("obj".into())),
            Value::Object(inner) => inner.inner.base.clone(),
            other => Arc::new(other.clone()),
        };
        Ok(Self {
            inner: Arc::new(ObjectInner {
                immediate: value,
                base,
                type_names: OnceLock::new(),
                properties: OnceLock::new(),
                methods: OnceLock::new(),
                static_members: OnceLock::new(),
                members: OnceLock::new(),
                extensions: MemberCollection::new(),
            }),
        })
    }

    /// Return an existing wrapper as-is, otherwise wrap.
    pub fn wrap(value: Value) -> ShellResult<Self> {
        match value {
            Value::Object(obj) => Ok(obj),
            other => Self::new(other),
        }
    }

    /// Like [`wrap`](Self::wrap), but null maps to `None`.
    pub fn wrap_or_none(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            other => Self::wrap(other).ok(),
        }
    }

    /// The leaf base value of a wrapper, or the value itself.
    pub fn unwrap(value: Value) -> Value {
        match value {
            Value::Object(obj) => obj.base_object().clone(),
            other => other,
        }
    }

    /// What this wrapper was constructed over; may be another wrapper.
    pub fn immediate_base_object(&self) -> &Value {
        &self.inner.immediate
    }

    /// The native value at the end of the delegation chain.
    pub fn base_object(&self) -> &Value {
        &self.inner.base
    }

    /// Lineage of the base object's type, most-derived first. Never empty.
    pub fn type_names(&self) -> &[String] {
        self.inner.type_names.get_or_init(|| {
            self.inner
                .base
                .type_descriptor()
                .map(|t| t.type_names())
                .unwrap_or_else(|| vec![crate::builtin::OBJECT.to_string()])
        })
    }

    fn target(&self, category: MemberCategory) -> Option<Arc<TypeDescriptor>> {
        match (category, &*self.inner.base) {
            (MemberCategory::Static, Value::Type(t)) => Some(t.clone()),
            (_, base) => base.type_descriptor(),
        }
    }

    fn bind_into(&self, coll: &MemberCollection, category: MemberCategory, methods: bool) {
        let Some(target) = self.target(category) else {
            return;
        };
        let flat = target.members(category);
        let templates = if methods { flat.methods() } else { flat.properties() };
        let instance = match category {
            MemberCategory::Instance => Some(self.inner.base.clone()),
            MemberCategory::Static => None,
        };
        for template in templates {
            coll.add(MemberInfo::bind(template.clone(), instance.clone()));
        }
    }

    /// Instance properties, interface properties and fields.
    pub fn properties(&self) -> &MemberCollection {
        self.inner.properties.get_or_init(|| {
            let coll = MemberCollection::new();
            self.bind_into(&coll, MemberCategory::Instance, false);
            coll
        })
    }

    pub fn methods(&self) -> &MemberCollection {
        self.inner.methods.get_or_init(|| {
            let coll = MemberCollection::new();
            self.bind_into(&coll, MemberCategory::Instance, true);
            coll
        })
    }

    /// Static methods then static properties. For a type value these are
    /// the type's own statics.
    pub fn static_members(&self) -> &MemberCollection {
        self.inner.static_members.get_or_init(|| {
            let coll = MemberCollection::new();
            self.bind_into(&coll, MemberCategory::Static, true);
            self.bind_into(&coll, MemberCategory::Static, false);
            coll
        })
    }

    /// Instance methods then instance properties.
    pub fn members(&self) -> &MemberCollection {
        self.inner.members.get_or_init(|| {
            let coll = MemberCollection::new();
            for member in self.methods().to_vec() {
                coll.add(member);
            }
            for member in self.properties().to_vec() {
                coll.add(member);
            }
            coll
        })
    }

    /// Note properties attached to this wrapper.
    pub fn extensions(&self) -> &MemberCollection {
        &self.inner.extensions
    }

    /// Set a note property, adding it if absent.
    pub fn set_note(&self, name: &str, value: Value) {
        match self.inner.extensions.get(name) {
            Some(note) => {
                // Note bindings always accept writes.
                let _ = note.set_value(value);
            }
            None => {
                self.inner.extensions.add(MemberInfo::note(name, value));
            }
        }
    }

    pub fn note(&self, name: &str) -> Option<Value> {
        self.inner.extensions.get(name).and_then(|n| n.value().ok())
    }

    /// True if this item is destined for the error stream.
    pub fn write_to_error_stream(&self) -> bool {
        self.note(ERROR_STREAM_NOTE)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn set_write_to_error_stream(&self, flag: bool) {
        self.set_note(ERROR_STREAM_NOTE, Value::Bool(flag));
    }

    /// Gettable properties in discovery order.
    pub fn default_display_properties(&self) -> Vec<MemberInfo> {
        self.properties()
            .to_vec()
            .into_iter()
            .filter(MemberInfo::is_gettable)
            .collect()
    }

    /// Read a property or note by name.
    pub fn property_value(&self, name: &str) -> ShellResult<Value> {
        self.properties()
            .get(name)
            .or_else(|| self.inner.extensions.get(name))
            .ok_or_else(|| ShellError::member(name, "no such property"))?
            .value()
    }

    /// Invoke an instance method, or a static one when wrapping a type.
    pub fn invoke_method(&self, name: &str, args: &[Value]) -> ShellResult<Value> {
        let method = self.methods().get(name).or_else(|| match &*self.inner.base {
            Value::Type(_) => self
                .static_members()
                .get(name)
                .filter(|m| m.kind().is_method()),
            _ => None,
        });
        method
            .ok_or_else(|| ShellError::member(name, "no such method"))?
            .invoke(args)
    }

    /// Text form with a caller-chosen array separator.
    pub fn to_string_with(&self, separator: &str) -> String {
        render(&self.inner.base, separator)
    }

    /// Order against another value; see [`Value::compare`].
    pub fn compare_to(&self, other: &Value) -> Option<Ordering> {
        self.inner.base.compare(other)
    }

    /// True if both handles are the same wrapper.
    pub fn ptr_eq(&self, other: &ShellObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn render(value: &Value, separator: &str) -> String {
    match value.unwrapped() {
        Value::Array(items) => items
            .iter()
            .map(|item| render(item, separator))
            .collect::<Vec<_>>()
            .join(separator),
        other => other.to_string(),
    }
}

impl PartialEq for ShellObject {
    fn eq(&self, other: &Self) -> bool {
        self.inner.base == other.inner.base
    }
}

impl PartialEq<Value> for ShellObject {
    fn eq(&self, other: &Value) -> bool {
        *self.inner.base == *other
    }
}

impl Eq for ShellObject {}

impl Hash for ShellObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.base.hash(state);
    }
}

impl fmt::Display for ShellObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(DEFAULT_SEPARATOR))
    }
}

impl fmt::Debug for ShellObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShellObject({:?})", self.inner.base)
    }
}

impl Serialize for ShellObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.base.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_over_wrapper_delegates_to_leaf() {
        let inner = ShellObject::new(Value::Int(5)).unwrap();
        let outer = ShellObject::new(Value::Object(inner.clone())).unwrap();
        assert!(!outer.ptr_eq(&inner));
        assert_eq!(outer.base_object(), &Value::Int(5));
        assert!(matches!(outer.immediate_base_object(), Value::Object(_)));
        assert_eq!(outer, inner);
    }

    #[test]
    fn notes_are_shared_between_clones() {
        let obj = ShellObject::new(Value::from("x")).unwrap();
        let alias = obj.clone();
        assert!(!alias.write_to_error_stream());
        obj.set_write_to_error_stream(true);
        assert!(alias.write_to_error_stream());
        obj.set_note("Tag", Value::Int(1));
        obj.set_note("tag", Value::Int(2));
        assert_eq!(alias.property_value("TAG").unwrap(), Value::Int(2));
    }

    #[test]
    fn nested_array_text_uses_custom_separator() {
        let v = Value::Array(vec![
            Value::Int(1),
            Value::Array(vec![Value::Int(2), Value::Int(3)]),
        ]);
        let obj = ShellObject::new(v).unwrap();
        assert_eq!(obj.to_string_with(","), "1,2,3");
        assert_eq!(obj.to_string(), "1 2 3");
    }
}
