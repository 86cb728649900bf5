//! Type descriptors and the per-type registry.
//!
//! A [`TypeDescriptor`] lists what a type declares itself: base type,
//! interfaces, and member templates. Flattening across the lineage happens
//! once per type per [`MemberCategory`] and is cached on the descriptor.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use crate::builtin;
use crate::member::MemberTemplate;
use crate::record::Adaptable;

/// Instance or static members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberCategory {
    Instance,
    Static,
}

impl MemberCategory {
    fn slot(self) -> usize {
        match self {
            MemberCategory::Instance => 0,
            MemberCategory::Static => 1,
        }
    }

    fn wants(self, template: &MemberTemplate) -> bool {
        template.is_static() == (self == MemberCategory::Static)
    }
}

/// An interface: a named set of properties a type promises to expose.
pub struct InterfaceDescriptor {
    name: String,
    extends: Vec<Arc<InterfaceDescriptor>>,
    properties: Vec<Arc<MemberTemplate>>,
}

impl InterfaceDescriptor {
    pub fn builder(name: impl Into<String>) -> InterfaceBuilder {
        InterfaceBuilder {
            inner: InterfaceDescriptor {
                name: name.into(),
                extends: Vec::new(),
                properties: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extends(&self) -> &[Arc<InterfaceDescriptor>] {
        &self.extends
    }

    pub fn properties(&self) -> &[Arc<MemberTemplate>] {
        &self.properties
    }
}

impl fmt::Debug for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceDescriptor")
            .field("name", &self.name)
            .finish()
    }
}

pub struct InterfaceBuilder {
    inner: InterfaceDescriptor,
}

impl InterfaceBuilder {
    pub fn extends(mut self, parent: Arc<InterfaceDescriptor>) -> Self {
        self.inner.extends.push(parent);
        self
    }

    pub fn property(mut self, template: MemberTemplate) -> Self {
        self.inner.properties.push(Arc::new(template));
        self
    }

    pub fn build(self) -> InterfaceDescriptor {
        self.inner
    }
}

/// Templates of one category, flattened across the lineage.
#[derive(Debug, Default)]
pub struct FlatMembers {
    methods: Vec<Arc<MemberTemplate>>,
    properties: Vec<Arc<MemberTemplate>>,
}

impl FlatMembers {
    pub fn methods(&self) -> &[Arc<MemberTemplate>] {
        &self.methods
    }

    /// Properties, interface properties and fields, in that order.
    pub fn properties(&self) -> &[Arc<MemberTemplate>] {
        &self.properties
    }
}

/// The member description of one concrete type.
pub struct TypeDescriptor {
    full_name: String,
    base: Option<Arc<TypeDescriptor>>,
    interfaces: Vec<Arc<InterfaceDescriptor>>,
    methods: Vec<Arc<MemberTemplate>>,
    properties: Vec<Arc<MemberTemplate>>,
    fields: Vec<Arc<MemberTemplate>>,
    flat: [OnceLock<Arc<FlatMembers>>; 2],
}

impl TypeDescriptor {
    /// Start describing a type named `full_name` (dotted namespace).
    pub fn builder(full_name: impl Into<String>) -> TypeBuilder {
        TypeBuilder {
            full_name: full_name.into(),
            base: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Last dotted segment of the full name.
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit_once('.')
            .map_or(self.full_name.as_str(), |(_, name)| name)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.full_name.rsplit_once('.').map(|(ns, _)| ns)
    }

    pub fn base(&self) -> Option<&Arc<TypeDescriptor>> {
        self.base.as_ref()
    }

    /// Interfaces declared directly on this type.
    pub fn interfaces(&self) -> &[Arc<InterfaceDescriptor>] {
        &self.interfaces
    }

    /// This type followed by each base type.
    pub fn lineage(&self) -> impl Iterator<Item = &TypeDescriptor> {
        std::iter::successors(Some(self), |t| t.base.as_deref())
    }

    /// Full names of the lineage, most-derived first.
    pub fn type_names(&self) -> Vec<String> {
        self.lineage().map(|t| t.full_name.clone()).collect()
    }

    /// Every interface implemented anywhere in the lineage, including the
    /// ones those interfaces extend. Deduplicated by name.
    pub fn all_interfaces(&self) -> Vec<Arc<InterfaceDescriptor>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut pending: Vec<Arc<InterfaceDescriptor>> = self
            .lineage()
            .flat_map(|t| t.interfaces.iter().cloned())
            .collect();
        pending.reverse();
        while let Some(iface) = pending.pop() {
            if !seen.insert(iface.name.to_lowercase()) {
                continue;
            }
            for parent in iface.extends.iter().rev() {
                pending.push(parent.clone());
            }
            out.push(iface);
        }
        out
    }

    /// Flattened templates of a category; computed on first use.
    pub fn members(&self, category: MemberCategory) -> Arc<FlatMembers> {
        self.flat[category.slot()]
            .get_or_init(|| Arc::new(self.flatten(category)))
            .clone()
    }

    fn flatten(&self, category: MemberCategory) -> FlatMembers {
        let mut flat = FlatMembers::default();

        let mut seen = HashSet::new();
        for ty in self.lineage() {
            collect(&mut flat.methods, &mut seen, &ty.methods, category, &self.full_name);
        }

        let mut seen = HashSet::new();
        for ty in self.lineage() {
            collect(&mut flat.properties, &mut seen, &ty.properties, category, &self.full_name);
        }
        if category == MemberCategory::Instance {
            for iface in self.all_interfaces() {
                collect(&mut flat.properties, &mut seen, &iface.properties, category, &self.full_name);
            }
        }
        for ty in self.lineage() {
            collect(&mut flat.properties, &mut seen, &ty.fields, category, &self.full_name);
        }

        tracing::trace!(
            type_name = %self.full_name,
            ?category,
            methods = flat.methods.len(),
            properties = flat.properties.len(),
            "flattened members"
        );
        flat
    }
}

fn collect(
    out: &mut Vec<Arc<MemberTemplate>>,
    seen: &mut HashSet<String>,
    templates: &[Arc<MemberTemplate>],
    category: MemberCategory,
    type_name: &str,
) {
    for template in templates.iter().filter(|t| category.wants(t)) {
        if let Err(e) = template.validate() {
            tracing::debug!(type_name, error = %e, "skipping malformed member");
            continue;
        }
        if seen.insert(template.name().to_lowercase()) {
            out.push(template.clone());
        }
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("full_name", &self.full_name)
            .field("base", &self.base.as_ref().map(|b| b.full_name()))
            .finish()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

pub struct TypeBuilder {
    full_name: String,
    base: Option<Arc<TypeDescriptor>>,
    interfaces: Vec<Arc<InterfaceDescriptor>>,
    methods: Vec<Arc<MemberTemplate>>,
    properties: Vec<Arc<MemberTemplate>>,
    fields: Vec<Arc<MemberTemplate>>,
}

impl TypeBuilder {
    /// Base type. Defaults to `objsh.Object`.
    pub fn base(mut self, base: Arc<TypeDescriptor>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implements(mut self, iface: Arc<InterfaceDescriptor>) -> Self {
        self.interfaces.push(iface);
        self
    }

    pub fn method(mut self, template: MemberTemplate) -> Self {
        self.methods.push(Arc::new(template));
        self
    }

    pub fn static_method(self, template: MemberTemplate) -> Self {
        self.method(template.into_static())
    }

    pub fn property(mut self, template: MemberTemplate) -> Self {
        self.properties.push(Arc::new(template));
        self
    }

    pub fn static_property(self, template: MemberTemplate) -> Self {
        self.property(template.into_static())
    }

    pub fn field(mut self, template: MemberTemplate) -> Self {
        self.fields.push(Arc::new(template));
        self
    }

    pub fn static_field(self, template: MemberTemplate) -> Self {
        self.field(template.into_static())
    }

    pub fn build(self) -> TypeDescriptor {
        let base = match self.base {
            Some(base) => Some(base),
            None if self.full_name == builtin::OBJECT => None,
            None => Some(builtin::object_type()),
        };
        TypeDescriptor {
            full_name: self.full_name,
            base,
            interfaces: self.interfaces,
            methods: self.methods,
            properties: self.properties,
            fields: self.fields,
            flat: [OnceLock::new(), OnceLock::new()],
        }
    }
}

/// Descriptors of user-defined record types, keyed by Rust type.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    /// The process-wide registry.
    pub fn global() -> &'static TypeRegistry {
        static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TypeRegistry::default)
    }

    /// Descriptor for `T`, describing it on first request.
    pub fn describe<T: Adaptable>(&self) -> Arc<TypeDescriptor> {
        let id = TypeId::of::<T>();
        if let Some(found) = self
            .types
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
        {
            return found.clone();
        }
        // Describe outside the lock; describe() may register other types.
        let described = Arc::new(T::describe());
        self.types
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(id)
            .or_insert(described)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.types.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
