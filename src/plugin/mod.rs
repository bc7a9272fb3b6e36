//! Plugin libraries.
//!
//! A plugin is a shared library exporting two symbols, both emitted by
//! [`declare_plugin!`](crate::declare_plugin):
//!
//! - `viennamesh_plugin_abi_version`: `extern "C" fn() -> u32`, must return
//!   [`PLUGIN_ABI_VERSION`]
//! - `viennamesh_plugin_register`: `fn(&mut PluginRegistrar)`
//!
//! Plugins built into the host binary can skip the library step and be
//! installed directly with `Context::install_plugin`.
//!
//! Every descriptor a plugin registers holds an `Arc` to its
//! `PluginLibrary`, so the library is only closed after the last data
//! handle or instance built from it is gone.

pub mod loader;
pub mod registrar;

pub use loader::{matches_pattern, plugin_name};
pub use registrar::PluginRegistrar;

use libloading::Library;
use std::fmt;
use std::path::{Path, PathBuf};

/// Bumped whenever `PluginRegistrar` or the registration traits change shape.
pub const PLUGIN_ABI_VERSION: u32 = 1;

pub(crate) const ABI_VERSION_SYMBOL: &[u8] = b"viennamesh_plugin_abi_version\0";
pub(crate) const REGISTER_SYMBOL: &[u8] = b"viennamesh_plugin_register\0";

/// Default directory scan pattern: every shared library of this platform.
pub fn default_pattern() -> String {
    format!("*.{}", std::env::consts::DLL_EXTENSION)
}

/// A loaded (or statically installed) plugin.
pub struct PluginLibrary {
    name: String,
    path: Option<PathBuf>,
    library: Option<Library>,
}

impl PluginLibrary {
    pub(crate) fn dynamic(name: impl Into<String>, path: &Path, library: Library) -> Self {
        Self {
            name: name.into(),
            path: Some(path.to_path_buf()),
            library: Some(library),
        }
    }

    pub(crate) fn builtin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            library: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the plugin was loaded from. `None` for installed plugins.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dynamic(&self) -> bool {
        self.library.is_some()
    }

    pub(crate) fn library(&self) -> Option<&Library> {
        self.library.as_ref()
    }
}

impl Drop for PluginLibrary {
    fn drop(&mut self) {
        tracing::debug!("Releasing plugin '{}'", self.name);
    }
}

impl fmt::Debug for PluginLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLibrary")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

/// Export the plugin entry points from a `cdylib`.
///
/// ```ignore
/// fn register(registrar: &mut viennamesh::plugin::PluginRegistrar) {
///     registrar.register_type::<MyMesh>("my_mesh");
/// }
///
/// viennamesh::declare_plugin!(register);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($register:path) => {
        #[no_mangle]
        pub extern "C" fn viennamesh_plugin_abi_version() -> u32 {
            $crate::plugin::PLUGIN_ABI_VERSION
        }

        #[no_mangle]
        pub fn viennamesh_plugin_register(registrar: &mut $crate::plugin::PluginRegistrar) {
            $register(registrar)
        }
    };
}
