//! Data type descriptors.
//!
//! A data type is identified by its name and knows how to allocate and
//! destroy one payload slot. Descriptors are shared as `Arc`s: the registry
//! holds one, and every live `Data`/`DataHandle` of that type holds another.

use crate::error::Result;
use crate::plugin::PluginLibrary;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// One opaque payload slot.
pub type Payload = Box<dyn Any + Send + Sync>;

/// Allocation and destruction behavior for one named data type.
pub trait DataKind: Send + Sync {
    /// Allocate a fresh, default-initialized slot.
    fn make(&self) -> Result<Payload>;

    /// Destroy a slot. Called exactly once per slot made by `make`.
    fn delete(&self, payload: Payload) {
        drop(payload);
    }
}

/// Stock `DataKind` for any `Default` Rust type.
pub struct TypedKind<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedKind<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedKind<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + Send + Sync + 'static> DataKind for TypedKind<T> {
    fn make(&self) -> Result<Payload> {
        Ok(Box::new(T::default()))
    }
}

/// A registered data type.
pub struct TypeDescriptor {
    name: String,
    kind: Box<dyn DataKind>,
    // Declared last so the kind (whose code may live in the plugin) is
    // dropped before the library handle.
    origin: Option<Arc<PluginLibrary>>,
}

impl TypeDescriptor {
    pub(crate) fn new(
        name: impl Into<String>,
        kind: Box<dyn DataKind>,
        origin: Option<Arc<PluginLibrary>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> &dyn DataKind {
        self.kind.as_ref()
    }

    pub(crate) fn origin(&self) -> Option<&Arc<PluginLibrary>> {
        self.origin.as_ref()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("plugin", &self.origin.as_ref().map(|p| p.name()))
            .finish()
    }
}
