//! The runtime Context: registry, loaded plugins and last-error slot.
//!
//! `Context` is a cheap handle; clones share the same state. Every data
//! handle keeps its type descriptor alive and every instance keeps a clone of
//! the Context, so plugins are released only after everything built from
//! them is gone.

use crate::algorithm::{
    Algorithm, AlgorithmFactory, AlgorithmFns, AlgorithmHandle, AlgorithmInstance,
};
use crate::config::RuntimeConfig;
use crate::data::{self, Data, DataHandle};
use crate::error::{ErrorCode, Result, ViennaMeshError};
use crate::plugin::loader::{self, Opened};
use crate::plugin::{PluginLibrary, PluginRegistrar};
use crate::registry::{Conversion, DataKind, FnConversion, Registrations, Registry, TypedKind};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Code and message of the most recent failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub code: ErrorCode,
    pub message: String,
}

struct ContextShared {
    // Declared before `plugins` so registrations go first on teardown.
    registry: RwLock<Registry>,
    plugins: Mutex<Vec<Arc<PluginLibrary>>>,
    last_error: Mutex<Option<ErrorRecord>>,
}

impl Drop for ContextShared {
    fn drop(&mut self) {
        tracing::debug!(
            "Context released with {} plugin(s)",
            self.plugins.get_mut().len()
        );
    }
}

#[derive(Clone)]
pub struct Context {
    shared: Arc<ContextShared>,
}

impl Context {
    /// A Context with the built-in literal types registered.
    pub fn new() -> Self {
        let context = Self::bare();
        let builtins = data::builtin::registrations();
        // Fresh tables cannot collide with the built-ins.
        if let Err(e) = context.shared.registry.write().apply(builtins, None) {
            tracing::error!("Failed to register built-in types: {}", e);
        }
        context
    }

    /// A Context with empty tables.
    pub fn bare() -> Self {
        Self {
            shared: Arc::new(ContextShared {
                registry: RwLock::new(Registry::new()),
                plugins: Mutex::new(Vec::new()),
                last_error: Mutex::new(None),
            }),
        }
    }

    /// `new()` plus every plugin directory the config lists.
    pub fn with_config(config: &RuntimeConfig) -> Result<Self> {
        let context = Self::new();
        if !config.plugins.load_on_startup {
            return Ok(context);
        }
        for dir in &config.plugins.directories {
            if !dir.is_dir() {
                tracing::warn!("Plugin directory {:?} does not exist, skipping", dir);
                continue;
            }
            context.load_plugins_in_directory(dir, &config.plugins.pattern)?;
        }
        Ok(context)
    }

    /// Number of live clones of this Context, instances included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ── Error sink ──

    pub fn last_error(&self) -> Option<ErrorRecord> {
        self.shared.last_error.lock().clone()
    }

    pub fn clear_error(&self) {
        *self.shared.last_error.lock() = None;
    }

    /// Store the error of a failed result in the last-error slot.
    pub(crate) fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            *self.shared.last_error.lock() = Some(ErrorRecord {
                code: e.code(),
                message: e.to_string(),
            });
        }
        result
    }

    // ── Registration ──

    pub fn register_data_type(&self, name: &str, kind: impl DataKind + 'static) -> Result<()> {
        let result = self
            .shared
            .registry
            .write()
            .register_type(name, Box::new(kind), None);
        self.record(result)
    }

    pub fn register_type<T>(&self, name: &str) -> Result<()>
    where
        T: Default + Send + Sync + 'static,
    {
        self.register_data_type(name, TypedKind::<T>::new())
    }

    pub fn register_conversion(
        &self,
        from: &str,
        to: &str,
        conversion: impl Conversion + 'static,
    ) -> Result<()> {
        let result = self.shared.registry.write().register_conversion(
            from,
            to,
            Box::new(conversion),
            None,
        );
        self.record(result)
    }

    pub fn register_conversion_fn<A, B, F>(&self, from: &str, to: &str, f: F) -> Result<()>
    where
        A: 'static,
        B: 'static,
        F: Fn(&A, &mut B) -> Result<()> + Send + Sync + 'static,
    {
        self.register_conversion(from, to, FnConversion::new(f))
    }

    pub fn register_algorithm(
        &self,
        name: &str,
        factory: impl AlgorithmFactory + 'static,
    ) -> Result<()> {
        let result = self
            .shared
            .registry
            .write()
            .register_algorithm(name, Box::new(factory), None);
        self.record(result)
    }

    pub fn register_algorithm_type<A>(&self, name: &str) -> Result<()>
    where
        A: Algorithm + Default + 'static,
    {
        self.register_algorithm(name, || Box::new(A::default()) as Box<dyn Algorithm>)
    }

    /// Register a raw make/delete/init/run table. Fails with
    /// `MissingFunction` if any entry is absent.
    pub fn register_algorithm_fns(&self, name: &str, fns: AlgorithmFns) -> Result<()> {
        let result = fns
            .validate(name)
            .and_then(|table| self.register_algorithm(name, table));
        self.record(result)
    }

    // ── Lookup ──

    pub fn has_type(&self, name: &str) -> bool {
        self.shared.registry.read().has_type(name)
    }

    pub fn has_algorithm(&self, name: &str) -> bool {
        self.shared.registry.read().has_algorithm(name)
    }

    pub fn has_conversion(&self, from: &str, to: &str) -> bool {
        self.shared
            .registry
            .read()
            .lookup_conversion(from, to)
            .is_some()
    }

    pub fn type_names(&self) -> Vec<String> {
        self.shared.registry.read().type_names()
    }

    pub fn algorithm_names(&self) -> Vec<String> {
        self.shared.registry.read().algorithm_names()
    }

    pub fn conversion_pairs(&self) -> Vec<(String, String)> {
        self.shared.registry.read().conversion_pairs()
    }

    // ── Data ──

    /// New exclusive data of `type_name` with one slot.
    pub fn make_data(&self, type_name: &str) -> Result<Data> {
        let descriptor = self.shared.registry.read().type_descriptor(type_name);
        let result = match descriptor {
            Some(descriptor) => Data::new(descriptor),
            None => Err(ViennaMeshError::UnknownType(type_name.to_string())),
        };
        self.record(result)
    }

    /// Shared single-slot data holding `value`.
    pub fn make_value<T: Send + Sync + 'static>(
        &self,
        type_name: &str,
        value: T,
    ) -> Result<DataHandle> {
        let mut data = self.make_data(type_name)?;
        let result = data.set(0, value).map(|()| data.share());
        self.record(result)
    }

    /// Fresh handle of `target` converted slot-wise from `source`.
    pub fn convert(&self, source: &DataHandle, target: &str) -> Result<DataHandle> {
        let (edge, descriptor) = {
            let registry = self.shared.registry.read();
            (
                registry.lookup_conversion(source.type_name(), target),
                registry.type_descriptor(target),
            )
        };
        let result = match (edge, descriptor) {
            (Some(edge), Some(descriptor)) => {
                tracing::debug!("Converting '{}' -> '{}'", source.type_name(), target);
                data::convert_slots(source, &edge, descriptor)
            }
            (None, _) => Err(ViennaMeshError::NoConversionPath {
                from: source.type_name().to_string(),
                to: target.to_string(),
            }),
            (Some(_), None) => Err(ViennaMeshError::UnknownType(target.to_string())),
        };
        self.record(result)
    }

    // ── Algorithms ──

    /// Construct and initialize an instance named after its kind.
    pub fn make_algorithm(&self, algorithm: &str) -> Result<AlgorithmHandle> {
        self.make_named_algorithm(algorithm, algorithm)
    }

    pub fn make_named_algorithm(&self, algorithm: &str, name: &str) -> Result<AlgorithmHandle> {
        let descriptor = self.shared.registry.read().algorithm(algorithm);
        let result = match descriptor {
            Some(descriptor) => AlgorithmInstance::create(self, descriptor, name),
            None => Err(ViennaMeshError::UnknownAlgorithm(algorithm.to_string())),
        };
        self.record(result)
    }

    // ── Plugins ──

    /// Load one plugin library.
    ///
    /// The library stays attached to this Context even if its registration
    /// fails, so nothing it handed out can outlive its code.
    pub fn load_plugin(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let result = self.load_plugin_inner(path);
        self.record(result)
    }

    fn load_plugin_inner(&self, path: &Path) -> Result<()> {
        let load_error = |reason: String| ViennaMeshError::PluginLoad {
            path: path.to_path_buf(),
            reason,
        };
        let Opened {
            library,
            registrations,
        } = loader::open(path).map_err(load_error)?;
        self.shared.plugins.lock().push(library.clone());

        let registrations = registrations.map_err(load_error)?;
        self.commit(&library, registrations)
            .map_err(|e| load_error(e.to_string()))?;
        tracing::info!("Loaded plugin '{}' from {:?}", library.name(), path);
        Ok(())
    }

    /// Install a plugin linked into the host binary.
    pub fn install_plugin(
        &self,
        name: &str,
        register: impl FnOnce(&mut PluginRegistrar),
    ) -> Result<()> {
        let load_error = |reason: String| ViennaMeshError::PluginLoad {
            path: PathBuf::from(format!("<builtin:{}>", name)),
            reason,
        };
        let library = Arc::new(PluginLibrary::builtin(name));
        self.shared.plugins.lock().push(library.clone());

        let result = loader::run_registration(name, register)
            .map_err(load_error)
            .and_then(|registrations| {
                self.commit(&library, registrations)
                    .map_err(|e| load_error(e.to_string()))
            });
        if result.is_ok() {
            tracing::info!("Installed plugin '{}'", name);
        }
        self.record(result)
    }

    fn commit(&self, library: &Arc<PluginLibrary>, registrations: Registrations) -> Result<()> {
        let (types, conversions, algorithms) = registrations.counts();
        self.shared
            .registry
            .write()
            .apply(registrations, Some(library))?;
        tracing::debug!(
            "Plugin '{}' registered {} type(s), {} conversion(s), {} algorithm(s)",
            library.name(),
            types,
            conversions,
            algorithms
        );
        Ok(())
    }

    /// Load every file in `dir` matching `pattern` (`*`/`?` wildcards) in
    /// sorted order. A plugin that fails is logged and skipped. Returns the
    /// number loaded.
    pub fn load_plugins_in_directory(&self, dir: impl AsRef<Path>, pattern: &str) -> Result<usize> {
        let dir = dir.as_ref();
        let candidates = loader::candidates(dir, pattern).map_err(|e| {
            ViennaMeshError::Io(e).with_context(format!("Scanning plugin directory {:?}", dir))
        });
        let candidates = self.record(candidates)?;

        let mut loaded = 0;
        for path in &candidates {
            match self.load_plugin(path) {
                Ok(()) => loaded += 1,
                Err(e) => tracing::warn!("Skipping plugin {:?}: {}", path, e),
            }
        }
        tracing::info!(
            "Loaded {}/{} plugin(s) from {:?}",
            loaded,
            candidates.len(),
            dir
        );
        Ok(loaded)
    }

    /// Unload a plugin before Context teardown. Fails while anything built
    /// from its descriptors is still alive.
    pub fn unload_plugin(&self, name: &str) -> Result<()> {
        let result = self.unload_plugin_inner(name);
        self.record(result)
    }

    fn unload_plugin_inner(&self, name: &str) -> Result<()> {
        let mut plugins = self.shared.plugins.lock();
        let index = plugins
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| ViennaMeshError::UnknownPlugin(name.to_string()))?;
        let library = plugins[index].clone();

        let mut registry = self.shared.registry.write();
        let holders = registry.external_holders(&library);
        if holders > 0 {
            return Err(ViennaMeshError::PluginInUse {
                name: name.to_string(),
                holders,
            });
        }
        registry.remove_origin(&library);
        plugins.remove(index);
        tracing::info!("Unloaded plugin '{}'", name);
        Ok(())
    }

    /// Names of attached plugins in load order, failed loads included.
    pub fn plugins(&self) -> Vec<String> {
        self.shared
            .plugins
            .lock()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (types, algorithms) = {
            let registry = self.shared.registry.read();
            (registry.type_names().len(), registry.algorithm_names().len())
        };
        f.debug_struct("Context")
            .field("types", &types)
            .field("algorithms", &algorithms)
            .field("plugins", &self.shared.plugins.lock().len())
            .finish()
    }
}
