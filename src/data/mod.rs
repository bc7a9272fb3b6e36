//! Reference-counted containers of typed payload slots.
//!
//! `Data` is the exclusive, mutable form used while a value is being filled.
//! `DataHandle` is the shared, immutable form that ports and links pass
//! around. Cloning a handle retains it, dropping releases it, and the last
//! release destroys every slot through the type's `delete`.

pub mod builtin;

pub use builtin::{Point, XmlFragment};

use crate::error::{Result, ViennaMeshError};
use crate::registry::{ConversionEdge, Payload, TypeDescriptor};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Slot storage shared by both ownership forms.
struct Slots {
    slots: Vec<Payload>,
    // Dropped after the slots have been handed back to the kind.
    descriptor: Arc<TypeDescriptor>,
}

impl Slots {
    fn new(descriptor: Arc<TypeDescriptor>) -> Result<Self> {
        let first = descriptor.kind().make()?;
        Ok(Self {
            slots: vec![first],
            descriptor,
        })
    }

    fn check(&self, position: usize) -> Result<()> {
        if position >= self.slots.len() {
            return Err(ViennaMeshError::OutOfBounds {
                position,
                len: self.slots.len(),
            });
        }
        Ok(())
    }

    fn mismatch<T>(&self) -> ViennaMeshError {
        ViennaMeshError::PayloadTypeMismatch {
            type_name: self.descriptor.name().to_string(),
            expected: type_name::<T>(),
        }
    }

    fn get<T: 'static>(&self, position: usize) -> Result<&T> {
        self.check(position)?;
        let slot: &dyn Any = &*self.slots[position];
        slot.downcast_ref::<T>().ok_or_else(|| self.mismatch::<T>())
    }

    fn get_mut<T: 'static>(&mut self, position: usize) -> Result<&mut T> {
        self.check(position)?;
        let Slots { slots, descriptor } = self;
        let slot: &mut dyn Any = &mut *slots[position];
        slot.downcast_mut::<T>()
            .ok_or_else(|| ViennaMeshError::PayloadTypeMismatch {
                type_name: descriptor.name().to_string(),
                expected: type_name::<T>(),
            })
    }

    fn resize(&mut self, len: usize) -> Result<()> {
        let current = self.slots.len();
        if len < current {
            for payload in self.slots.drain(len..) {
                self.descriptor.kind().delete(payload);
            }
        } else {
            self.slots.reserve(len - current);
            for _ in current..len {
                let payload = self.descriptor.kind().make()?;
                self.slots.push(payload);
            }
        }
        tracing::trace!(
            "Resized '{}' data from {} to {} slot(s)",
            self.descriptor.name(),
            current,
            len
        );
        Ok(())
    }
}

impl Drop for Slots {
    fn drop(&mut self) {
        for payload in self.slots.drain(..) {
            self.descriptor.kind().delete(payload);
        }
    }
}

/// Exclusively owned data. The only form whose payload can be written.
pub struct Data {
    inner: Slots,
}

impl Data {
    /// One slot made by the type's `make`.
    pub(crate) fn new(descriptor: Arc<TypeDescriptor>) -> Result<Self> {
        Ok(Self {
            inner: Slots::new(descriptor)?,
        })
    }

    pub fn type_name(&self) -> &str {
        self.inner.descriptor.name()
    }

    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Grow with freshly made slots or shrink by deleting trailing ones.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        self.inner.resize(len)
    }

    pub fn get<T: 'static>(&self, position: usize) -> Result<&T> {
        self.inner.get(position)
    }

    pub fn get_mut<T: 'static>(&mut self, position: usize) -> Result<&mut T> {
        self.inner.get_mut(position)
    }

    pub fn value<T: Clone + 'static>(&self, position: usize) -> Result<T> {
        self.inner.get::<T>(position).cloned()
    }

    /// Overwrite one slot. The slot must already hold a `T`.
    pub fn set<T: Send + Sync + 'static>(&mut self, position: usize, value: T) -> Result<()> {
        *self.inner.get_mut::<T>(position)? = value;
        Ok(())
    }

    /// Freeze into a shared, immutable handle.
    pub fn share(self) -> DataHandle {
        DataHandle {
            inner: Arc::new(self.inner),
        }
    }

    pub(crate) fn slot_mut(&mut self, position: usize) -> &mut dyn Any {
        &mut *self.inner.slots[position]
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("type", &self.type_name())
            .field("len", &self.len())
            .finish()
    }
}

/// Shared, immutable data.
#[derive(Clone)]
pub struct DataHandle {
    inner: Arc<Slots>,
}

impl DataHandle {
    pub fn type_name(&self) -> &str {
        self.inner.descriptor.name()
    }

    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    pub fn get<T: 'static>(&self, position: usize) -> Result<&T> {
        self.inner.get(position)
    }

    pub fn value<T: Clone + 'static>(&self, position: usize) -> Result<T> {
        self.inner.get::<T>(position).cloned()
    }

    /// Take another reference. Same as `clone`.
    pub fn retain(&self) -> DataHandle {
        self.clone()
    }

    /// Give up this reference. Same as dropping it.
    pub fn release(self) {}

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn ptr_eq(&self, other: &DataHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Regain exclusive access when this is the only reference.
    pub fn try_into_data(self) -> std::result::Result<Data, DataHandle> {
        Arc::try_unwrap(self.inner)
            .map(|inner| Data { inner })
            .map_err(|inner| DataHandle { inner })
    }

    /// Convert into a fresh handle of `target` using the given context's
    /// conversion table. `self` is left untouched.
    pub fn convert(&self, context: &crate::Context, target: &str) -> Result<DataHandle> {
        context.convert(self, target)
    }

    pub(crate) fn slot(&self, position: usize) -> &dyn Any {
        &*self.inner.slots[position]
    }
}

impl fmt::Debug for DataHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataHandle")
            .field("type", &self.type_name())
            .field("len", &self.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Apply `edge` slot by slot into a new `Data` of `target`.
pub(crate) fn convert_slots(
    source: &DataHandle,
    edge: &ConversionEdge,
    target: Arc<TypeDescriptor>,
) -> Result<DataHandle> {
    let mut out = Data::new(target)?;
    out.resize(source.len())?;
    for position in 0..source.len() {
        edge.apply(source.slot(position), out.slot_mut(position))
            .map_err(|e| ViennaMeshError::ConversionFailed {
                from: edge.from().to_string(),
                to: edge.to().to_string(),
                message: format!("slot {}: {}", position, e),
            })?;
    }
    tracing::trace!(
        "Converted {} slot(s) '{}' -> '{}'",
        source.len(),
        edge.from(),
        edge.to()
    );
    Ok(out.share())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DataKind, FnConversion, TypedKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        live: Arc<AtomicUsize>,
    }

    impl DataKind for Counting {
        fn make(&self) -> Result<Payload> {
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(0i64))
        }

        fn delete(&self, payload: Payload) {
            self.live.fetch_sub(1, Ordering::SeqCst);
            drop(payload);
        }
    }

    fn counting() -> (Arc<TypeDescriptor>, Arc<AtomicUsize>) {
        let live = Arc::new(AtomicUsize::new(0));
        let desc = TypeDescriptor::new(
            "int_box",
            Box::new(Counting { live: live.clone() }),
            None,
        );
        (Arc::new(desc), live)
    }

    #[test]
    fn test_new_data_has_one_default_slot() {
        let desc = Arc::new(TypeDescriptor::new(
            "int",
            Box::new(TypedKind::<i64>::new()),
            None,
        ));
        let data = Data::new(desc).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.value::<i64>(0).unwrap(), 0);
    }

    #[test]
    fn test_set_get_and_bounds() {
        let (desc, _) = counting();
        let mut data = Data::new(desc).unwrap();
        data.set(0, 42i64).unwrap();
        assert_eq!(*data.get::<i64>(0).unwrap(), 42);

        let err = data.get::<i64>(1).unwrap_err();
        assert!(matches!(err, ViennaMeshError::OutOfBounds { position: 1, len: 1 }));
    }

    #[test]
    fn test_wrong_payload_type() {
        let (desc, _) = counting();
        let mut data = Data::new(desc).unwrap();
        assert!(matches!(
            data.set(0, String::from("x")),
            Err(ViennaMeshError::PayloadTypeMismatch { .. })
        ));
        assert!(matches!(
            data.get::<f64>(0),
            Err(ViennaMeshError::PayloadTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_resize_makes_and_deletes_slots() {
        let (desc, live) = counting();
        let mut data = Data::new(desc).unwrap();
        assert_eq!(live.load(Ordering::SeqCst), 1);

        data.resize(5).unwrap();
        assert_eq!(live.load(Ordering::SeqCst), 5);

        data.resize(2).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(live.load(Ordering::SeqCst), 2);

        drop(data);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_last_release_deletes_slots() {
        let (desc, live) = counting();
        let handle = Data::new(desc).unwrap().share();
        let other = handle.retain();
        assert_eq!(handle.ref_count(), 2);

        handle.release();
        assert_eq!(live.load(Ordering::SeqCst), 1);
        assert_eq!(other.ref_count(), 1);

        other.release();
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_try_into_data_needs_unique_handle() {
        let (desc, _) = counting();
        let handle = Data::new(desc).unwrap().share();
        let other = handle.clone();

        let handle = handle.try_into_data().unwrap_err();
        drop(other);
        let mut data = handle.try_into_data().unwrap();
        data.set(0, 9i64).unwrap();
        assert_eq!(data.value::<i64>(0).unwrap(), 9);
    }

    #[test]
    fn test_convert_slots_leaves_source() {
        let (desc, _) = counting();
        let mut data = Data::new(desc).unwrap();
        data.resize(2).unwrap();
        data.set(0, 4i64).unwrap();
        data.set(1, 5i64).unwrap();
        let source = data.share();

        let edge = ConversionEdge::new(
            "int_box",
            "string_box",
            Box::new(FnConversion::new(|a: &i64, b: &mut String| {
                *b = a.to_string();
                Ok(())
            })),
            None,
        );
        let target = Arc::new(TypeDescriptor::new(
            "string_box",
            Box::new(TypedKind::<String>::new()),
            None,
        ));

        let converted = convert_slots(&source, &edge, target).unwrap();
        assert_eq!(converted.type_name(), "string_box");
        assert_eq!(converted.len(), 2);
        assert_eq!(converted.get::<String>(1).unwrap(), "5");
        assert_eq!(source.value::<i64>(0).unwrap(), 4);
        assert_eq!(source.type_name(), "int_box");
    }
}
