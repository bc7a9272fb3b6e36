//! Algorithm kinds, live instances and their ports.
//!
//! An algorithm kind is registered once per Context. `Context::make_algorithm`
//! builds an instance from it (make, then init). Instances are shared through
//! `AlgorithmHandle`s; ports sit behind locks so a running instance can read
//! another instance's outputs through a link.

pub mod descriptor;
pub mod instance;
pub mod io;
pub mod port;

pub use descriptor::{
    Algorithm, AlgorithmDescriptor, AlgorithmFactory, AlgorithmFns, AlgorithmState, DeleteFn,
    FnTable, InitFn, MakeFn, RunFn,
};
pub use instance::{
    AlgorithmHandle, AlgorithmInstance, InputBinding, InstanceState, WeakAlgorithmHandle,
    DEFAULT_PORT,
};
pub use io::{AlgorithmIo, OutputSlot};
pub use port::{PortDescriptor, PortDirection};
