//! Algorithm kinds and their construction contract.
//!
//! Two ways to provide an algorithm:
//! - **`Algorithm` trait** plus an `AlgorithmFactory` (any closure returning
//!   a boxed algorithm). Dropping the box is the delete step.
//! - **`AlgorithmFns`**, the raw make/delete/init/run table for code that
//!   keeps its state behind an opaque `Any`. Registration validates that all
//!   four functions are present.

use crate::algorithm::io::AlgorithmIo;
use crate::algorithm::port::PortDescriptor;
use crate::context::Context;
use crate::error::{Result, ViennaMeshError};
use crate::plugin::PluginLibrary;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Trait for algorithm implementations.
pub trait Algorithm: Send {
    /// Called once, right after construction.
    fn init(&mut self, _context: &Context) -> Result<()> {
        Ok(())
    }

    /// Called for every execution. May run any number of times.
    fn run(&mut self, io: &mut AlgorithmIo<'_>) -> Result<()>;

    /// Port declarations. Empty means "accept anything".
    fn ports(&self) -> &'static [PortDescriptor] {
        &[]
    }
}

/// The make step of an algorithm kind.
pub trait AlgorithmFactory: Send + Sync {
    fn make(&self) -> Result<Box<dyn Algorithm>>;
}

impl<F> AlgorithmFactory for F
where
    F: Fn() -> Box<dyn Algorithm> + Send + Sync,
{
    fn make(&self) -> Result<Box<dyn Algorithm>> {
        Ok(self())
    }
}

/// Opaque per-instance state of a function-table algorithm.
pub type AlgorithmState = Box<dyn Any + Send>;

pub type MakeFn = fn() -> Result<AlgorithmState>;
pub type DeleteFn = fn(AlgorithmState);
pub type InitFn = fn(&mut (dyn Any + Send), &Context) -> Result<()>;
pub type RunFn = fn(&mut (dyn Any + Send), &mut AlgorithmIo<'_>) -> Result<()>;

/// Raw function table. Every entry is required.
#[derive(Clone, Copy, Default)]
pub struct AlgorithmFns {
    pub make: Option<MakeFn>,
    pub delete: Option<DeleteFn>,
    pub init: Option<InitFn>,
    pub run: Option<RunFn>,
}

impl AlgorithmFns {
    /// Check completeness, naming the first missing function.
    pub fn validate(self, algorithm: &str) -> Result<FnTable> {
        let missing = |function: &'static str| ViennaMeshError::MissingFunction {
            algorithm: algorithm.to_string(),
            function,
        };
        Ok(FnTable {
            make: self.make.ok_or_else(|| missing("make"))?,
            delete: self.delete.ok_or_else(|| missing("delete"))?,
            init: self.init.ok_or_else(|| missing("init"))?,
            run: self.run.ok_or_else(|| missing("run"))?,
        })
    }
}

/// A validated `AlgorithmFns`.
#[derive(Clone, Copy)]
pub struct FnTable {
    make: MakeFn,
    delete: DeleteFn,
    init: InitFn,
    run: RunFn,
}

impl AlgorithmFactory for FnTable {
    fn make(&self) -> Result<Box<dyn Algorithm>> {
        let state = (self.make)()?;
        Ok(Box::new(FnTableAlgorithm {
            state: Some(state),
            table: *self,
        }))
    }
}

struct FnTableAlgorithm {
    state: Option<AlgorithmState>,
    table: FnTable,
}

impl FnTableAlgorithm {
    fn state(&mut self) -> Result<&mut (dyn Any + Send)> {
        self.state
            .as_deref_mut()
            .ok_or_else(|| ViennaMeshError::algorithm("algorithm state already deleted"))
    }
}

impl Algorithm for FnTableAlgorithm {
    fn init(&mut self, context: &Context) -> Result<()> {
        let init = self.table.init;
        init(self.state()?, context)
    }

    fn run(&mut self, io: &mut AlgorithmIo<'_>) -> Result<()> {
        let run = self.table.run;
        run(self.state()?, io)
    }
}

impl Drop for FnTableAlgorithm {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            (self.table.delete)(state);
        }
    }
}

/// A registered algorithm kind.
pub struct AlgorithmDescriptor {
    name: String,
    factory: Box<dyn AlgorithmFactory>,
    // Dropped after the factory; see `TypeDescriptor`.
    origin: Option<Arc<PluginLibrary>>,
}

impl AlgorithmDescriptor {
    pub(crate) fn new(
        name: impl Into<String>,
        factory: Box<dyn AlgorithmFactory>,
        origin: Option<Arc<PluginLibrary>>,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn factory(&self) -> &dyn AlgorithmFactory {
        self.factory.as_ref()
    }

    pub(crate) fn origin(&self) -> Option<&Arc<PluginLibrary>> {
        self.origin.as_ref()
    }
}

impl fmt::Debug for AlgorithmDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmDescriptor")
            .field("name", &self.name)
            .field("plugin", &self.origin.as_ref().map(|p| p.name()))
            .finish()
    }
}
