//! Member templates, bound member descriptors and member collections.
//!
//! A [`MemberTemplate`] is declared once per type inside its
//! [`TypeDescriptor`](crate::TypeDescriptor). When a wrapper materializes
//! its members, each template is bound to the wrapper's base value,
//! producing a [`MemberInfo`] held in a [`MemberCollection`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{ShellError, ShellResult};
use crate::record::Adaptable;
use crate::value::Value;

/// Reads a member. Receives the instance for instance members, `None` for statics.
pub type Getter = Arc<dyn Fn(Option<&Value>) -> ShellResult<Value> + Send + Sync>;
/// Writes a member.
pub type Setter = Arc<dyn Fn(Option<&Value>, Value) -> ShellResult<()> + Send + Sync>;
/// Invokes a method with already-evaluated arguments.
pub type Invoker = Arc<dyn Fn(Option<&Value>, &[Value]) -> ShellResult<Value> + Send + Sync>;

/// What a member is, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Property,
    /// A field exposed through the property model.
    FieldProperty,
    Method,
    StaticProperty,
    StaticMethod,
    /// Added by hand to a wrapper rather than discovered.
    NoteProperty,
}

impl MemberKind {
    pub fn is_method(self) -> bool {
        matches!(self, MemberKind::Method | MemberKind::StaticMethod)
    }

    pub fn is_static(self) -> bool {
        matches!(self, MemberKind::StaticProperty | MemberKind::StaticMethod)
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberKind::Property => "Property",
            MemberKind::FieldProperty => "FieldProperty",
            MemberKind::Method => "Method",
            MemberKind::StaticProperty => "StaticProperty",
            MemberKind::StaticMethod => "StaticMethod",
            MemberKind::NoteProperty => "NoteProperty",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberSource {
    Property,
    Field,
    Method,
}

/// Per-type declaration of one member.
pub struct MemberTemplate {
    name: String,
    source: MemberSource,
    is_static: bool,
    getter: Option<Getter>,
    setter: Option<Setter>,
    invoker: Option<Invoker>,
    definition: Option<String>,
}

impl MemberTemplate {
    fn with_source(name: impl Into<String>, source: MemberSource) -> Self {
        Self {
            name: name.into(),
            source,
            is_static: false,
            getter: None,
            setter: None,
            invoker: None,
            definition: None,
        }
    }

    /// Declare a property. Attach accessors with [`get`](Self::get) / [`set`](Self::set).
    pub fn property(name: impl Into<String>) -> Self {
        Self::with_source(name, MemberSource::Property)
    }

    /// Declare a field; it surfaces as a property-like member.
    pub fn field(name: impl Into<String>) -> Self {
        Self::with_source(name, MemberSource::Field)
    }

    /// Declare a method.
    pub fn method<F>(name: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> ShellResult<Value> + Send + Sync + 'static,
    {
        let mut template = Self::with_source(name, MemberSource::Method);
        template.invoker = Some(Arc::new(invoker));
        template
    }

    pub fn get<F>(mut self, getter: F) -> Self
    where
        F: Fn(Option<&Value>) -> ShellResult<Value> + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(getter));
        self
    }

    pub fn set<F>(mut self, setter: F) -> Self
    where
        F: Fn(Option<&Value>, Value) -> ShellResult<()> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// Constant value for a static field or property.
    pub fn constant(self, value: Value) -> Self {
        self.get(move |_| Ok(value.clone()))
    }

    /// Getter reading a field of record type `T`.
    pub fn record_getter<T, F>(self, f: F) -> Self
    where
        T: Adaptable,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.get(move |this| {
            let record = instance(this, &name)?
                .as_record()
                .ok_or_else(|| ShellError::member(&name, "instance is not a record"))?;
            record
                .with(|t: &T| f(t))
                .ok_or_else(|| ShellError::member(&name, "record type mismatch"))
        })
    }

    /// Setter mutating a record of type `T` in place.
    pub fn record_setter<T, F>(self, f: F) -> Self
    where
        T: Adaptable,
        F: Fn(&mut T, Value) -> ShellResult<()> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.set(move |this, value| {
            let record = instance(this, &name)?
                .as_record()
                .ok_or_else(|| ShellError::member(&name, "instance is not a record"))?;
            record
                .with_mut(|t: &mut T| f(t, value))
                .ok_or_else(|| ShellError::member(&name, "record type mismatch"))?
        })
    }

    /// Method operating on a record of type `T`.
    pub fn record_method<T, F>(name: impl Into<String>, f: F) -> Self
    where
        T: Adaptable,
        F: Fn(&T, &[Value]) -> ShellResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let member = name.clone();
        Self::method(name, move |this, args| {
            let record = instance(this, &member)?
                .as_record()
                .ok_or_else(|| ShellError::member(&member, "instance is not a record"))?;
            record
                .with(|t: &T| f(t, args))
                .ok_or_else(|| ShellError::member(&member, "record type mismatch"))?
        })
    }

    /// Human-readable signature, e.g. `string ToUpper()`.
    pub fn definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub(crate) fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_method(&self) -> bool {
        self.source == MemberSource::Method
    }

    pub fn kind(&self) -> MemberKind {
        match (self.source, self.is_static) {
            (MemberSource::Method, false) => MemberKind::Method,
            (MemberSource::Method, true) => MemberKind::StaticMethod,
            (MemberSource::Property, false) => MemberKind::Property,
            (MemberSource::Field, false) => MemberKind::FieldProperty,
            (_, true) => MemberKind::StaticProperty,
        }
    }

    /// Run the getter, if there is one.
    pub fn read(&self, this: Option<&Value>) -> Option<ShellResult<Value>> {
        self.getter.as_ref().map(|g| g(this))
    }

    pub(crate) fn validate(&self) -> ShellResult<()> {
        if self.name.trim().is_empty() {
            return Err(ShellError::member("<unnamed>", "member has no name"));
        }
        match self.source {
            MemberSource::Method if self.invoker.is_none() => {
                Err(ShellError::member(&self.name, "method has no body"))
            }
            MemberSource::Property | MemberSource::Field
                if self.getter.is_none() && self.setter.is_none() =>
            {
                Err(ShellError::member(&self.name, "property has no accessor"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for MemberTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberTemplate")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// The bound instance passed to a member body, or a member error if the
/// member was reached without one.
pub fn instance<'a>(this: Option<&'a Value>, member: &str) -> ShellResult<&'a Value> {
    this.map(Value::unwrapped)
        .ok_or_else(|| ShellError::member(member, "no instance bound"))
}

/// Positional method argument, or a member error naming the missing index.
pub fn argument<'a>(args: &'a [Value], index: usize, member: &str) -> ShellResult<&'a Value> {
    args.get(index)
        .ok_or_else(|| ShellError::member(member, format!("missing argument {index}")))
}

#[derive(Clone)]
enum Binding {
    Adapted {
        template: Arc<MemberTemplate>,
        instance: Option<Arc<Value>>,
    },
    Note(Arc<RwLock<Value>>),
}

/// One member bound to a specific wrapper.
#[derive(Clone)]
pub struct MemberInfo {
    name: String,
    kind: MemberKind,
    binding: Binding,
}

impl MemberInfo {
    /// Bind a template to an instance. Static templates ignore the instance.
    pub(crate) fn bind(template: Arc<MemberTemplate>, instance: Option<Arc<Value>>) -> Self {
        let instance = if template.is_static() { None } else { instance };
        Self {
            name: template.name().to_string(),
            kind: template.kind(),
            binding: Binding::Adapted { template, instance },
        }
    }

    /// A free-standing note property holding its own value.
    pub fn note(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::NoteProperty,
            binding: Binding::Note(Arc::new(RwLock::new(value))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn is_gettable(&self) -> bool {
        match &self.binding {
            Binding::Adapted { template, .. } => template.getter.is_some(),
            Binding::Note(_) => true,
        }
    }

    pub fn is_settable(&self) -> bool {
        match &self.binding {
            Binding::Adapted { template, .. } => template.setter.is_some(),
            Binding::Note(_) => true,
        }
    }

    pub fn is_instance_bound(&self) -> bool {
        match &self.binding {
            Binding::Adapted { instance, .. } => instance.is_some(),
            Binding::Note(_) => true,
        }
    }

    /// Signature text for display.
    pub fn definition(&self) -> String {
        match &self.binding {
            Binding::Adapted { template, .. } => template
                .definition
                .clone()
                .unwrap_or_else(|| match self.kind.is_method() {
                    true => format!("{}()", self.name),
                    false => self.name.clone(),
                }),
            Binding::Note(value) => {
                let value = value.read().unwrap_or_else(|e| e.into_inner());
                format!("{}={}", self.name, value)
            }
        }
    }

    pub fn value(&self) -> ShellResult<Value> {
        match &self.binding {
            Binding::Adapted { template, instance } => match &template.getter {
                Some(getter) => getter(instance.as_deref()),
                None if template.is_method() => {
                    Err(ShellError::member(&self.name, "a method has no value"))
                }
                None => Err(ShellError::member(&self.name, "property is not gettable")),
            },
            Binding::Note(value) => Ok(value.read().unwrap_or_else(|e| e.into_inner()).clone()),
        }
    }

    pub fn set_value(&self, value: Value) -> ShellResult<()> {
        match &self.binding {
            Binding::Adapted { template, instance } => match &template.setter {
                Some(setter) => setter(instance.as_deref(), value),
                None => Err(ShellError::member(&self.name, "property is read-only")),
            },
            Binding::Note(slot) => {
                *slot.write().unwrap_or_else(|e| e.into_inner()) = value;
                Ok(())
            }
        }
    }

    pub fn invoke(&self, args: &[Value]) -> ShellResult<Value> {
        match &self.binding {
            Binding::Adapted {
                template,
                instance,
            } => match &template.invoker {
                Some(invoker) => invoker(instance.as_deref(), args),
                None => Err(ShellError::member(&self.name, "member is not a method")),
            },
            Binding::Note(_) => Err(ShellError::member(&self.name, "member is not a method")),
        }
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Default)]
struct CollectionInner {
    entries: Vec<MemberInfo>,
    /// Lowercased name -> position in `entries`.
    index: HashMap<String, usize>,
}

/// Discovery-ordered, case-insensitive set of members.
///
/// The first member added under a name wins; later duplicates are dropped.
#[derive(Default)]
pub struct MemberCollection {
    inner: RwLock<CollectionInner>,
}

impl MemberCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Returns false if the name was already taken.
    pub fn add(&self, member: MemberInfo) -> bool {
        let key = member.name().to_lowercase();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.index.contains_key(&key) {
            tracing::trace!(member = %member.name(), "duplicate member discarded");
            return false;
        }
        let position = inner.entries.len();
        inner.entries.push(member);
        inner.index.insert(key, position);
        true
    }

    pub fn get(&self, name: &str) -> Option<MemberInfo> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .index
            .get(&name.to_lowercase())
            .map(|&i| inner.entries[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.index.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the members in discovery order.
    pub fn to_vec(&self) -> Vec<MemberInfo> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).entries.clone()
    }

    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.entries.iter().map(|m| m.name().to_string()).collect()
    }
}

impl fmt::Debug for MemberCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
