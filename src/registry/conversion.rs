//! Directed one-step conversions between two named data types.

use crate::error::{Result, ViennaMeshError};
use crate::plugin::PluginLibrary;
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Converts one source slot into an already allocated destination slot.
pub trait Conversion: Send + Sync {
    fn convert(&self, from: &dyn Any, to: &mut dyn Any) -> Result<()>;
}

/// Adapts a typed closure `Fn(&A, &mut B) -> Result<()>` into a `Conversion`.
pub struct FnConversion<A, B, F> {
    f: F,
    _marker: PhantomData<fn(&A, &mut B)>,
}

impl<A, B, F> FnConversion<A, B, F>
where
    F: Fn(&A, &mut B) -> Result<()>,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<A, B, F> Conversion for FnConversion<A, B, F>
where
    A: 'static,
    B: 'static,
    F: Fn(&A, &mut B) -> Result<()> + Send + Sync,
{
    fn convert(&self, from: &dyn Any, to: &mut dyn Any) -> Result<()> {
        let from = from
            .downcast_ref::<A>()
            .ok_or_else(|| ViennaMeshError::PayloadTypeMismatch {
                type_name: "source".to_string(),
                expected: type_name::<A>(),
            })?;
        let to = to
            .downcast_mut::<B>()
            .ok_or_else(|| ViennaMeshError::PayloadTypeMismatch {
                type_name: "destination".to_string(),
                expected: type_name::<B>(),
            })?;
        (self.f)(from, to)
    }
}

/// A registered (from, to) conversion.
pub struct ConversionEdge {
    from: String,
    to: String,
    conversion: Box<dyn Conversion>,
    origin: Option<Arc<PluginLibrary>>,
}

impl ConversionEdge {
    pub(crate) fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        conversion: Box<dyn Conversion>,
        origin: Option<Arc<PluginLibrary>>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            conversion,
            origin,
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub(crate) fn apply(&self, from: &dyn Any, to: &mut dyn Any) -> Result<()> {
        self.conversion.convert(from, to)
    }

    pub(crate) fn origin(&self) -> Option<&Arc<PluginLibrary>> {
        self.origin.as_ref()
    }
}

impl fmt::Debug for ConversionEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionEdge")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}
