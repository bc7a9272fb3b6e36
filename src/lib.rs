//! # ViennaMesh: plugin, data and algorithm runtime
//!
//! A runtime that lets independently built mesh generators and mesh
//! processing tools interoperate. Plugins register named data types,
//! conversions between them and algorithms; algorithm instances are wired
//! into pipelines that are described in XML (or JSON/TOML) and run in
//! declaration order.
//!
//! ## Architecture
//!
//! - **Context**: shared registry of types, conversions and algorithms, plus
//!   the loaded plugins and the last error
//! - **Data**: typed, reference-counted arrays of opaque payloads, converted
//!   on demand when an algorithm asks for a different type
//! - **Algorithms**: named instances with input/output ports, linked to
//!   each other without owning each other
//! - **Pipeline**: declarative descriptions built and run against a Context
//!
//! ## Configuration
//!
//! Plugin directories and logging are read from `config.toml` in the
//! platform config directory under `viennamesh/`, with extra plugin
//! directories taken from `VIENNAMESH_PLUGIN_PATH`.
//!
//! ## Example
//!
//! ```ignore
//! use viennamesh::{Context, PipelineBuilder, PipelineDescription};
//!
//! fn main() -> viennamesh::Result<()> {
//!     let ctx = Context::new();
//!     ctx.load_plugins_in_directory("/opt/viennamesh/plugins", "*.so")?;
//!
//!     let description = PipelineDescription::load("mesh.xml")?;
//!     let pipeline = PipelineBuilder::new(&ctx)
//!         .base_path("/data/meshes")
//!         .build(&description)?;
//!     pipeline.run()
//! }
//! ```

pub mod algorithm;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod plugin;
pub mod registry;

// Re-export commonly used types
pub use algorithm::{
    Algorithm, AlgorithmFns, AlgorithmHandle, AlgorithmIo, InstanceState, PortDescriptor,
    DEFAULT_PORT,
};
pub use config::RuntimeConfig;
pub use context::{Context, ErrorRecord};
pub use data::{Data, DataHandle, Point, XmlFragment};
pub use error::{ErrorCode, Result, ResultExt, ViennaMeshError};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineDescription};
pub use plugin::{PluginRegistrar, PLUGIN_ABI_VERSION};
pub use registry::{DataKind, TypedKind};
