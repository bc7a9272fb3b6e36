//! Declarative algorithm pipelines.
//!
//! A description lists algorithm instances in order. Building it creates
//! every instance, binds literal parameters, and resolves dynamic links
//! and default sources against earlier instances. Running it executes the
//! instances once each, in declaration order.
//!
//! # Architecture
//!
//! ```text
//! XML / JSON / TOML ──► PipelineDescription ──► PipelineBuilder ──► Pipeline::run
//!                                                     │
//!                                                     └──► Context (instances, literals)
//! ```
//!
//! # Design
//!
//! - **Resolve at build time**: unknown kinds, bad literals and unresolved
//!   links fail the whole build, nothing is half-wired.
//! - **Backward references only**: links name earlier instances, so
//!   declaration order is a valid execution order.
//! - **Flat storage**: `InstanceId` is the declaration index.

pub mod builder;
pub mod description;
pub mod error;
pub mod executor;
pub mod id;
pub mod xml;

pub use builder::PipelineBuilder;
pub use description::{AlgorithmDecl, ParameterDecl, ParameterType, PipelineDescription};
pub use error::{PipelineError, PipelineResult};
pub use executor::{LinkEdge, Pipeline, PipelineNode, PipelineStats};
pub use id::InstanceId;
