//! Live algorithm instances and their port bindings.

use crate::algorithm::descriptor::{Algorithm, AlgorithmDescriptor};
use crate::algorithm::io::AlgorithmIo;
use crate::algorithm::port::PortDescriptor;
use crate::context::Context;
use crate::data::{Data, DataHandle};
use crate::error::{Result, ViennaMeshError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Output read by default-source fallback.
pub const DEFAULT_PORT: &str = "default";

/// What an input port is bound to.
#[derive(Clone)]
pub enum InputBinding {
    /// A literal value.
    Value(DataHandle),
    /// Another instance's named output, read when resolved.
    Link {
        source: WeakAlgorithmHandle,
        output: String,
    },
}

impl fmt::Debug for InputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputBinding::Value(handle) => f.debug_tuple("Value").field(handle).finish(),
            InputBinding::Link { source, output } => f
                .debug_struct("Link")
                .field("source", &source.name())
                .field("output", output)
                .finish(),
        }
    }
}

/// Lifecycle of an instance. Construction and init are one step, so a
/// reachable instance is always at least `Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Initialized,
    Ran,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Status {
    state: InstanceState,
    run_count: u32,
}

/// A constructed and initialized algorithm with its ports.
pub struct AlgorithmInstance {
    name: String,
    context: Context,
    ports: &'static [PortDescriptor],
    implementation: Mutex<Box<dyn Algorithm>>,
    inputs: RwLock<HashMap<String, InputBinding>>,
    outputs: RwLock<HashMap<String, DataHandle>>,
    default_source: RwLock<Option<WeakAlgorithmHandle>>,
    base_path: RwLock<Option<PathBuf>>,
    status: Mutex<Status>,
    // Dropped after the implementation, whose code may live in a plugin.
    descriptor: Arc<AlgorithmDescriptor>,
}

impl AlgorithmInstance {
    /// Run the descriptor's make step, then init. Either failing is a
    /// construction error.
    pub(crate) fn create(
        context: &Context,
        descriptor: Arc<AlgorithmDescriptor>,
        name: impl Into<String>,
    ) -> Result<AlgorithmHandle> {
        let construction = |e: ViennaMeshError| ViennaMeshError::AlgorithmConstruction {
            algorithm: descriptor.name().to_string(),
            message: e.to_string(),
        };
        let mut implementation = descriptor.factory().make().map_err(construction)?;
        implementation.init(context).map_err(construction)?;

        let name = name.into();
        tracing::debug!("Created instance '{}' of '{}'", name, descriptor.name());
        Ok(AlgorithmHandle(Arc::new(Self {
            name,
            context: context.clone(),
            ports: implementation.ports(),
            implementation: Mutex::new(implementation),
            inputs: RwLock::new(HashMap::new()),
            outputs: RwLock::new(HashMap::new()),
            default_source: RwLock::new(None),
            base_path: RwLock::new(None),
            status: Mutex::new(Status {
                state: InstanceState::Initialized,
                run_count: 0,
            }),
            descriptor,
        })))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the registered algorithm kind.
    pub fn algorithm_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        self.ports
    }

    pub fn state(&self) -> InstanceState {
        self.status.lock().state
    }

    pub fn run_count(&self) -> u32 {
        self.status.lock().run_count
    }

    // ── Inputs ──

    /// Bind a literal, replacing any previous binding of `name`.
    pub fn set_input(&self, name: impl Into<String>, value: DataHandle) {
        self.inputs
            .write()
            .insert(name.into(), InputBinding::Value(value));
    }

    /// Bind `name` to `source`'s `output`. The output only has to exist
    /// by the time this instance resolves the input.
    pub fn link_input(
        &self,
        name: impl Into<String>,
        source: &AlgorithmHandle,
        output: impl Into<String>,
    ) {
        let name = name.into();
        let output = output.into();
        tracing::debug!(
            "Linked '{}.{}' to '{}.{}'",
            self.name,
            name,
            source.name(),
            output
        );
        self.inputs.write().insert(
            name,
            InputBinding::Link {
                source: source.downgrade(),
                output,
            },
        );
    }

    pub fn unset_input(&self, name: &str) -> Option<InputBinding> {
        self.inputs.write().remove(name)
    }

    pub fn input_binding(&self, name: &str) -> Option<InputBinding> {
        self.inputs.read().get(name).cloned()
    }

    pub fn input_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inputs.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn set_default_source(&self, source: &AlgorithmHandle) {
        *self.default_source.write() = Some(source.downgrade());
    }

    pub fn clear_default_source(&self) {
        *self.default_source.write() = None;
    }

    pub fn default_source(&self) -> Option<AlgorithmHandle> {
        self.default_source.read().as_ref().and_then(|s| s.upgrade())
    }

    /// Resolve in order: literal, populated link, default source's
    /// `"default"` output.
    pub fn get_input(&self, name: &str) -> Option<DataHandle> {
        let binding = self.inputs.read().get(name).cloned();
        match binding {
            Some(InputBinding::Value(handle)) => return Some(handle),
            Some(InputBinding::Link { source, output }) => {
                if let Some(handle) = source.upgrade().and_then(|s| s.get_output(&output)) {
                    return Some(handle);
                }
                tracing::trace!(
                    "Link '{}.{}' -> '{}' not populated",
                    self.name,
                    name,
                    output
                );
            }
            None => {}
        }
        self.default_source()
            .and_then(|source| source.get_output(DEFAULT_PORT))
    }

    pub fn get_required_input(&self, name: &str) -> Result<DataHandle> {
        self.get_input(name)
            .ok_or_else(|| ViennaMeshError::RequiredInputMissing {
                instance: self.name.clone(),
                port: name.to_string(),
            })
    }

    // ── Outputs ──

    pub fn set_output(&self, name: impl Into<String>, value: DataHandle) {
        self.outputs.write().insert(name.into(), value);
    }

    pub fn get_output(&self, name: &str) -> Option<DataHandle> {
        self.outputs.read().get(name).cloned()
    }

    pub fn output_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.outputs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Take the output back as exclusive `Data` when it has the wanted type
    /// and nobody else holds it. The port stays empty until set again.
    pub(crate) fn take_unique_output(&self, name: &str, type_name: &str) -> Option<Data> {
        let mut outputs = self.outputs.write();
        let reusable = outputs
            .get(name)
            .map_or(false, |h| h.type_name() == type_name && h.ref_count() == 1);
        if !reusable {
            return None;
        }
        outputs.remove(name).and_then(|h| h.try_into_data().ok())
    }

    // ── Execution ──

    pub fn set_base_path(&self, path: impl Into<PathBuf>) {
        *self.base_path.write() = Some(path.into());
    }

    pub fn base_path(&self) -> Option<PathBuf> {
        self.base_path.read().clone()
    }

    /// Run the algorithm once. Outputs written before a failure stay.
    pub fn run(&self) -> Result<()> {
        let started = Instant::now();
        let result = self.check_required_inputs().and_then(|()| {
            let mut implementation = self.implementation.lock();
            let mut io = AlgorithmIo::new(self);
            implementation.run(&mut io)
        });

        let mut status = self.status.lock();
        match result {
            Ok(()) => {
                status.state = InstanceState::Ran;
                status.run_count += 1;
                tracing::debug!(
                    "Instance '{}' ran in {:?} (run #{})",
                    self.name,
                    started.elapsed(),
                    status.run_count
                );
                Ok(())
            }
            Err(source) => {
                status.state = InstanceState::Failed;
                Err(ViennaMeshError::AlgorithmRun {
                    instance: self.name.clone(),
                    algorithm: self.algorithm_name().to_string(),
                    source: Box::new(source),
                })
            }
        }
    }

    fn check_required_inputs(&self) -> Result<()> {
        self.ports
            .iter()
            .filter(|p| p.is_input() && p.required)
            .try_for_each(|p| self.get_required_input(p.name).map(|_| ()))
    }
}

impl fmt::Debug for AlgorithmInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmInstance")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm_name())
            .field("state", &self.state())
            .finish()
    }
}

/// Shared handle to an instance. Clone retains, drop releases.
#[derive(Clone)]
pub struct AlgorithmHandle(Arc<AlgorithmInstance>);

impl AlgorithmHandle {
    pub fn downgrade(&self) -> WeakAlgorithmHandle {
        WeakAlgorithmHandle(Arc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &AlgorithmHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Give up this reference. The instance is destroyed with the last one.
    pub fn release(self) {}
}

impl Deref for AlgorithmHandle {
    type Target = AlgorithmInstance;

    fn deref(&self) -> &AlgorithmInstance {
        &self.0
    }
}

impl fmt::Debug for AlgorithmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Non-owning reference used by links and default sources, so bindings
/// never keep their source alive or form cycles.
#[derive(Clone)]
pub struct WeakAlgorithmHandle(Weak<AlgorithmInstance>);

impl WeakAlgorithmHandle {
    pub fn upgrade(&self) -> Option<AlgorithmHandle> {
        self.0.upgrade().map(AlgorithmHandle)
    }

    fn name(&self) -> Option<String> {
        self.upgrade().map(|h| h.name().to_string())
    }
}

/// Resolve `relative` against an instance base path, if one is set.
pub fn resolve_path(base: Option<&Path>, relative: &Path) -> PathBuf {
    match base {
        Some(base) if relative.is_relative() => base.join(relative),
        _ => relative.to_path_buf(),
    }
}
