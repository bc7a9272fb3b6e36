//! Type, conversion and algorithm tables of one Context.
//!
//! The registry only maps names to shared descriptors. Allocation, conversion
//! and instantiation happen in the `data` and `algorithm` modules, outside the
//! registry lock.

pub mod conversion;
pub mod types;

pub use conversion::{Conversion, ConversionEdge, FnConversion};
pub use types::{DataKind, Payload, TypeDescriptor, TypedKind};

use crate::algorithm::{AlgorithmDescriptor, AlgorithmFactory};
use crate::error::{Result, ViennaMeshError};
use crate::plugin::PluginLibrary;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Registrations collected but not yet committed.
///
/// Plugins stage everything here so a failing plugin never leaves half of
/// its types or algorithms behind.
#[derive(Default)]
pub struct Registrations {
    types: Vec<(String, Box<dyn DataKind>)>,
    conversions: Vec<(String, String, Box<dyn Conversion>)>,
    algorithms: Vec<(String, Box<dyn AlgorithmFactory>)>,
}

impl Registrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, name: impl Into<String>, kind: Box<dyn DataKind>) {
        self.types.push((name.into(), kind));
    }

    pub fn add_conversion(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        conversion: Box<dyn Conversion>,
    ) {
        self.conversions.push((from.into(), to.into(), conversion));
    }

    pub fn add_algorithm(&mut self, name: impl Into<String>, factory: Box<dyn AlgorithmFactory>) {
        self.algorithms.push((name.into(), factory));
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.conversions.is_empty() && self.algorithms.is_empty()
    }

    /// (types, conversions, algorithms)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.types.len(), self.conversions.len(), self.algorithms.len())
    }
}

/// Name-keyed descriptor tables.
#[derive(Default)]
pub struct Registry {
    types: HashMap<String, Arc<TypeDescriptor>>,
    conversions: HashMap<String, HashMap<String, Arc<ConversionEdge>>>,
    algorithms: HashMap<String, Arc<AlgorithmDescriptor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──

    pub fn register_type(
        &mut self,
        name: &str,
        kind: Box<dyn DataKind>,
        origin: Option<Arc<PluginLibrary>>,
    ) -> Result<()> {
        if self.types.contains_key(name) {
            return Err(ViennaMeshError::DuplicateType(name.to_string()));
        }
        tracing::debug!("Registered data type '{}'", name);
        self.types.insert(
            name.to_string(),
            Arc::new(TypeDescriptor::new(name, kind, origin)),
        );
        Ok(())
    }

    /// Endpoints are not checked against the type table; an edge between
    /// unknown types simply never matches a live handle.
    pub fn register_conversion(
        &mut self,
        from: &str,
        to: &str,
        conversion: Box<dyn Conversion>,
        origin: Option<Arc<PluginLibrary>>,
    ) -> Result<()> {
        if self.lookup_conversion(from, to).is_some() {
            return Err(ViennaMeshError::DuplicateConversion {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        tracing::debug!("Registered conversion '{}' -> '{}'", from, to);
        self.conversions.entry(from.to_string()).or_default().insert(
            to.to_string(),
            Arc::new(ConversionEdge::new(from, to, conversion, origin)),
        );
        Ok(())
    }

    pub fn register_algorithm(
        &mut self,
        name: &str,
        factory: Box<dyn AlgorithmFactory>,
        origin: Option<Arc<PluginLibrary>>,
    ) -> Result<()> {
        if self.algorithms.contains_key(name) {
            return Err(ViennaMeshError::DuplicateAlgorithm(name.to_string()));
        }
        tracing::debug!("Registered algorithm '{}'", name);
        self.algorithms.insert(
            name.to_string(),
            Arc::new(AlgorithmDescriptor::new(name, factory, origin)),
        );
        Ok(())
    }

    /// Commit a staged batch. Either every entry is registered or none is.
    pub fn apply(
        &mut self,
        batch: Registrations,
        origin: Option<&Arc<PluginLibrary>>,
    ) -> Result<()> {
        self.check(&batch)?;

        let Registrations {
            types,
            conversions,
            algorithms,
        } = batch;
        for (name, kind) in types {
            self.register_type(&name, kind, origin.cloned())?;
        }
        for (from, to, conversion) in conversions {
            self.register_conversion(&from, &to, conversion, origin.cloned())?;
        }
        for (name, factory) in algorithms {
            self.register_algorithm(&name, factory, origin.cloned())?;
        }
        Ok(())
    }

    /// Find the first name in `batch` that would collide with the tables or
    /// with an earlier entry of the same batch.
    fn check(&self, batch: &Registrations) -> Result<()> {
        let mut types = HashSet::new();
        for (name, _) in &batch.types {
            if self.types.contains_key(name) || !types.insert(name.as_str()) {
                return Err(ViennaMeshError::DuplicateType(name.clone()));
            }
        }

        let mut conversions = HashSet::new();
        for (from, to, _) in &batch.conversions {
            if self.lookup_conversion(from, to).is_some()
                || !conversions.insert((from.as_str(), to.as_str()))
            {
                return Err(ViennaMeshError::DuplicateConversion {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        let mut algorithms = HashSet::new();
        for (name, _) in &batch.algorithms {
            if self.algorithms.contains_key(name) || !algorithms.insert(name.as_str()) {
                return Err(ViennaMeshError::DuplicateAlgorithm(name.clone()));
            }
        }
        Ok(())
    }

    // ── Lookup ──

    pub fn type_descriptor(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).cloned()
    }

    /// Direct lookup only; no path search through intermediate types.
    pub fn lookup_conversion(&self, from: &str, to: &str) -> Option<Arc<ConversionEdge>> {
        self.conversions.get(from)?.get(to).cloned()
    }

    pub fn algorithm(&self, name: &str) -> Option<Arc<AlgorithmDescriptor>> {
        self.algorithms.get(name).cloned()
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn has_algorithm(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn algorithm_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.algorithms.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered (from, to) pairs, sorted.
    pub fn conversion_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .conversions
            .values()
            .flat_map(|targets| targets.values())
            .map(|edge| (edge.from().to_string(), edge.to().to_string()))
            .collect();
        pairs.sort();
        pairs
    }

    // ── Plugin bookkeeping ──

    /// Number of descriptors from `plugin` that are referenced outside this
    /// registry (by live data, instances or in-flight conversions).
    pub(crate) fn external_holders(&self, plugin: &Arc<PluginLibrary>) -> usize {
        let from_plugin = |origin: Option<&Arc<PluginLibrary>>| {
            origin.map_or(false, |o| Arc::ptr_eq(o, plugin))
        };
        let types = self
            .types
            .values()
            .filter(|d| from_plugin(d.origin()))
            .map(|d| Arc::strong_count(d) - 1);
        let conversions = self
            .conversions
            .values()
            .flat_map(|targets| targets.values())
            .filter(|e| from_plugin(e.origin()))
            .map(|e| Arc::strong_count(e) - 1);
        let algorithms = self
            .algorithms
            .values()
            .filter(|d| from_plugin(d.origin()))
            .map(|d| Arc::strong_count(d) - 1);
        types.chain(conversions).chain(algorithms).sum()
    }

    /// Drop every registration that came from `plugin`.
    pub(crate) fn remove_origin(&mut self, plugin: &Arc<PluginLibrary>) {
        let keep = |origin: Option<&Arc<PluginLibrary>>| {
            !origin.map_or(false, |o| Arc::ptr_eq(o, plugin))
        };
        self.types.retain(|_, d| keep(d.origin()));
        for targets in self.conversions.values_mut() {
            targets.retain(|_, e| keep(e.origin()));
        }
        self.conversions.retain(|_, targets| !targets.is_empty());
        self.algorithms.retain(|_, d| keep(d.origin()));
    }
}
