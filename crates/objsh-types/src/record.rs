//! User-defined records and the `Adaptable` capability.
//!
//! A Rust type becomes a first-class shell value by implementing
//! [`Adaptable`]: it describes its members once through a
//! [`TypeDescriptor`], and the [`TypeRegistry`] caches that description
//! per concrete type. Records are shared (`Arc`) and guarded by a lock so
//! settable members can mutate them in place.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use crate::descriptor::{TypeDescriptor, TypeRegistry};

/// A native type that can be adapted into the shell's member model.
///
/// Implementors that override [`Adaptable::equals`] must override
/// [`Adaptable::hash_code`] consistently; the defaults fall back to
/// reference identity.
pub trait Adaptable: Any + Send + Sync + fmt::Debug {
    /// Describe this type's members. Called at most once per type.
    fn describe() -> TypeDescriptor
    where
        Self: Sized;

    /// Value equality against another record's payload, if this type has one.
    fn equals(&self, _other: &dyn Any) -> Option<bool> {
        None
    }

    fn hash_code(&self) -> Option<u64> {
        None
    }

    /// Text form. Defaults to the type's full name.
    fn render(&self) -> Option<String> {
        None
    }
}

trait DynRecord: Send + Sync + fmt::Debug {
    fn descriptor(&self) -> Arc<TypeDescriptor>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn dyn_equals(&self, other: &dyn Any) -> Option<bool>;
    fn dyn_hash(&self) -> Option<u64>;
    fn dyn_render(&self) -> Option<String>;
}

impl<T: Adaptable> DynRecord for T {
    fn descriptor(&self) -> Arc<TypeDescriptor> {
        TypeRegistry::global().describe::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn dyn_equals(&self, other: &dyn Any) -> Option<bool> {
        Adaptable::equals(self, other)
    }

    fn dyn_hash(&self) -> Option<u64> {
        Adaptable::hash_code(self)
    }

    fn dyn_render(&self) -> Option<String> {
        Adaptable::render(self)
    }
}

/// Shared handle to a user-defined record.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RwLock<Box<dyn DynRecord>>>,
}

impl Record {
    pub fn new<T: Adaptable>(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Box::new(value))),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Box<dyn DynRecord>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn descriptor(&self) -> Arc<TypeDescriptor> {
        self.read().descriptor()
    }

    /// True if the payload is a `T`.
    pub fn is<T: Adaptable>(&self) -> bool {
        (**self.read()).as_any().is::<T>()
    }

    /// Borrow the payload as a `T`. Returns `None` on a type mismatch.
    pub fn with<T: Adaptable, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.read();
        (**guard).as_any().downcast_ref::<T>().map(f)
    }

    /// Mutably borrow the payload as a `T`.
    pub fn with_mut<T: Adaptable, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        (**guard).as_any_mut().downcast_mut::<T>().map(f)
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn equals(&self, other: &Record) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let a = self.read();
        let b = other.read();
        a.dyn_equals((**b).as_any()).unwrap_or(false)
    }

    pub fn hash_code(&self) -> u64 {
        self.read()
            .dyn_hash()
            .unwrap_or(Arc::as_ptr(&self.inner) as usize as u64)
    }

    pub fn render(&self) -> String {
        let guard = self.read();
        guard
            .dyn_render()
            .unwrap_or_else(|| guard.descriptor().full_name().to_string())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.read())
    }
}
