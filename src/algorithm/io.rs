//! The view an algorithm gets of its own ports while running.

use crate::algorithm::instance::{resolve_path, AlgorithmInstance};
use crate::context::Context;
use crate::data::{Data, DataHandle};
use crate::error::{Result, ResultExt};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// Port access passed to `Algorithm::run`.
pub struct AlgorithmIo<'a> {
    instance: &'a AlgorithmInstance,
}

impl<'a> AlgorithmIo<'a> {
    pub(crate) fn new(instance: &'a AlgorithmInstance) -> Self {
        Self { instance }
    }

    pub fn instance_name(&self) -> &str {
        self.instance.name()
    }

    pub fn context(&self) -> &Context {
        self.instance.context()
    }

    pub fn base_path(&self) -> Option<PathBuf> {
        self.instance.base_path()
    }

    /// Resolve a file name relative to the instance base path.
    pub fn resolve_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        resolve_path(self.base_path().as_deref(), relative.as_ref())
    }

    // ── Inputs ──

    pub fn get_input(&self, name: &str) -> Option<DataHandle> {
        self.instance.get_input(name)
    }

    /// Resolve `name` and convert it to `type_name` if it is bound under a
    /// different type. Conversions are not cached.
    pub fn get_input_as(&self, name: &str, type_name: &str) -> Result<Option<DataHandle>> {
        match self.get_input(name) {
            Some(handle) => self.ensure_type(name, handle, type_name).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_required_input(&self, name: &str) -> Result<DataHandle> {
        self.instance.get_required_input(name)
    }

    pub fn get_required_input_as(&self, name: &str, type_name: &str) -> Result<DataHandle> {
        let handle = self.get_required_input(name)?;
        self.ensure_type(name, handle, type_name)
    }

    fn ensure_type(&self, name: &str, handle: DataHandle, type_name: &str) -> Result<DataHandle> {
        if handle.type_name() == type_name {
            return Ok(handle);
        }
        tracing::debug!(
            "Converting input '{}' of '{}' from '{}' to '{}'",
            name,
            self.instance_name(),
            handle.type_name(),
            type_name
        );
        self.context()
            .convert(&handle, type_name)
            .with_context(|| format!("Resolving input '{}'", name))
    }

    // ── Outputs ──

    pub fn set_output(&mut self, name: &str, value: DataHandle) {
        self.instance.set_output(name, value);
    }

    pub fn get_output(&self, name: &str) -> Option<DataHandle> {
        self.instance.get_output(name)
    }

    /// Exclusive data to fill for output `name`.
    ///
    /// A caller-provided output of the right type that nobody else holds is
    /// handed back for in-place filling; otherwise a fresh value is made.
    /// Store the result with `OutputSlot::commit`. A reused output that is
    /// never committed goes back to its port as-is when the slot drops.
    pub fn output_for_write(&mut self, name: &str, type_name: &str) -> Result<OutputSlot<'a>> {
        if let Some(data) = self.instance.take_unique_output(name, type_name) {
            tracing::trace!("Reusing output '{}' of '{}'", name, self.instance_name());
            return Ok(OutputSlot::new(self.instance, name, data, true));
        }
        let data = self.make_data(type_name)?;
        Ok(OutputSlot::new(self.instance, name, data, false))
    }

    pub fn make_data(&self, type_name: &str) -> Result<Data> {
        self.context().make_data(type_name)
    }

    /// Single-slot handle holding `value`.
    pub fn make_value<T: Send + Sync + 'static>(
        &self,
        type_name: &str,
        value: T,
    ) -> Result<DataHandle> {
        self.context().make_value(type_name, value)
    }
}

/// Output data being filled by a running algorithm.
pub struct OutputSlot<'a> {
    instance: &'a AlgorithmInstance,
    name: String,
    data: Option<Data>,
    // Taken out of the port, so it must go back if not committed.
    reused: bool,
}

impl<'a> OutputSlot<'a> {
    fn new(instance: &'a AlgorithmInstance, name: &str, data: Data, reused: bool) -> Self {
        Self {
            instance,
            name: name.to_string(),
            data: Some(data),
            reused,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_reused(&self) -> bool {
        self.reused
    }

    /// Freeze the data and store it in the port.
    pub fn commit(mut self) -> DataHandle {
        let handle = match self.data.take() {
            Some(data) => data.share(),
            None => unreachable!("data is only taken on commit or drop"),
        };
        self.instance.set_output(self.name.as_str(), handle.clone());
        handle
    }
}

impl Deref for OutputSlot<'_> {
    type Target = Data;

    fn deref(&self) -> &Data {
        match &self.data {
            Some(data) => data,
            None => unreachable!("data is only taken on commit or drop"),
        }
    }
}

impl DerefMut for OutputSlot<'_> {
    fn deref_mut(&mut self) -> &mut Data {
        match &mut self.data {
            Some(data) => data,
            None => unreachable!("data is only taken on commit or drop"),
        }
    }
}

impl Drop for OutputSlot<'_> {
    fn drop(&mut self) {
        let Some(data) = self.data.take() else {
            return;
        };
        if self.reused {
            tracing::trace!(
                "Returning uncommitted output '{}' of '{}'",
                self.name,
                self.instance.name()
            );
            self.instance.set_output(self.name.as_str(), data.share());
        }
    }
}

impl fmt::Debug for OutputSlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSlot")
            .field("name", &self.name)
            .field("data", &self.data)
            .field("reused", &self.reused)
            .finish()
    }
}
