//! Staging area a plugin registers into.

use crate::algorithm::{Algorithm, AlgorithmFactory, AlgorithmFns};
use crate::error::{Result, ViennaMeshError};
use crate::registry::{Conversion, DataKind, FnConversion, Registrations, TypedKind};

/// Collects a plugin's types, conversions and algorithms.
///
/// Nothing reaches the Context until the plugin's register function returns
/// and the whole batch passes validation. The first error recorded here
/// aborts the load.
pub struct PluginRegistrar {
    plugin: String,
    registrations: Registrations,
    error: Option<ViennaMeshError>,
}

impl PluginRegistrar {
    pub(crate) fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            registrations: Registrations::new(),
            error: None,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    pub fn register_data_type(&mut self, name: &str, kind: impl DataKind + 'static) -> &mut Self {
        self.registrations.add_type(name, Box::new(kind));
        self
    }

    pub fn register_type<T>(&mut self, name: &str) -> &mut Self
    where
        T: Default + Send + Sync + 'static,
    {
        self.register_data_type(name, TypedKind::<T>::new())
    }

    pub fn register_conversion(
        &mut self,
        from: &str,
        to: &str,
        conversion: impl Conversion + 'static,
    ) -> &mut Self {
        self.registrations
            .add_conversion(from, to, Box::new(conversion));
        self
    }

    pub fn register_conversion_fn<A, B, F>(&mut self, from: &str, to: &str, f: F) -> &mut Self
    where
        A: 'static,
        B: 'static,
        F: Fn(&A, &mut B) -> Result<()> + Send + Sync + 'static,
    {
        self.register_conversion(from, to, FnConversion::new(f))
    }

    pub fn register_algorithm(
        &mut self,
        name: &str,
        factory: impl AlgorithmFactory + 'static,
    ) -> &mut Self {
        self.registrations.add_algorithm(name, Box::new(factory));
        self
    }

    pub fn register_algorithm_type<A>(&mut self, name: &str) -> &mut Self
    where
        A: Algorithm + Default + 'static,
    {
        self.register_algorithm(name, || Box::new(A::default()) as Box<dyn Algorithm>)
    }

    /// Register a raw function table. An incomplete table fails the load.
    pub fn register_algorithm_fns(&mut self, name: &str, fns: AlgorithmFns) -> &mut Self {
        match fns.validate(name) {
            Ok(table) => self.register_algorithm(name, table),
            Err(e) => self.fail(e),
        }
    }

    /// Record an error. Only the first one is kept.
    pub fn fail(&mut self, error: ViennaMeshError) -> &mut Self {
        if self.error.is_none() {
            tracing::debug!("Plugin '{}' registration failed: {}", self.plugin, error);
            self.error = Some(error);
        }
        self
    }

    pub(crate) fn finish(self) -> Result<Registrations> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.registrations),
        }
    }
}
