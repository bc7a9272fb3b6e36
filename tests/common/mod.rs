//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use viennamesh::registry::Payload;
use viennamesh::{Context, DataKind};

pub const INT_BOX: &str = "int_box";
pub const STRING_BOX: &str = "string_box";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntBox(pub i64);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringBox(pub String);

/// `DataKind` that counts live slots.
pub struct Counted<T> {
    live: Arc<AtomicUsize>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Counted<T> {
    pub fn new(live: &Arc<AtomicUsize>) -> Self {
        Self {
            live: live.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Default + Send + Sync + 'static> DataKind for Counted<T> {
    fn make(&self) -> viennamesh::Result<Payload> {
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(T::default()))
    }

    fn delete(&self, payload: Payload) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        drop(payload);
    }
}

/// Live slot counter shared by every counted type of one Context.
#[derive(Clone, Default)]
pub struct LiveSlots(Arc<AtomicUsize>);

impl LiveSlots {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Context with counted `int_box`/`string_box` types, both conversions
/// between them and the `echo`/`double` algorithms.
pub fn box_context() -> (Context, LiveSlots) {
    let ctx = Context::new();
    let live = LiveSlots::default();
    ctx.register_data_type(INT_BOX, Counted::<IntBox>::new(&live.0))
        .unwrap();
    ctx.register_data_type(STRING_BOX, Counted::<StringBox>::new(&live.0))
        .unwrap();
    ctx.register_conversion_fn(INT_BOX, STRING_BOX, |a: &IntBox, b: &mut StringBox| {
        b.0 = a.0.to_string();
        Ok(())
    })
    .unwrap();
    ctx.register_conversion_fn(STRING_BOX, INT_BOX, |a: &StringBox, b: &mut IntBox| {
        b.0 = a
            .0
            .trim()
            .parse()
            .map_err(|_| viennamesh::ViennaMeshError::algorithm(format!("'{}' is not an int", a.0)))?;
        Ok(())
    })
    .unwrap();
    builders::register_algorithms(&ctx);
    (ctx, live)
}
