//! Opening plugin libraries and running their register entry point.

use crate::plugin::registrar::PluginRegistrar;
use crate::plugin::{PluginLibrary, ABI_VERSION_SYMBOL, PLUGIN_ABI_VERSION, REGISTER_SYMBOL};
use crate::registry::Registrations;
use libloading::Library;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

type AbiVersionFn = unsafe extern "C" fn() -> u32;
type RegisterFn = fn(&mut PluginRegistrar);

/// A library that opened successfully, plus the outcome of its
/// registration. The library must be retained either way.
pub(crate) struct Opened {
    pub library: Arc<PluginLibrary>,
    pub registrations: std::result::Result<Registrations, String>,
}

/// Open `path`. Fails only if the library itself cannot be loaded.
pub(crate) fn open(path: &Path) -> std::result::Result<Opened, String> {
    // SAFETY: loading runs the library's initialisers. Plugins are trusted
    // code by contract.
    let library = unsafe { Library::new(path) }.map_err(|e| e.to_string())?;
    let library = Arc::new(PluginLibrary::dynamic(plugin_name(path), path, library));
    let registrations = register_dynamic(&library);
    Ok(Opened {
        library,
        registrations,
    })
}

fn register_dynamic(plugin: &PluginLibrary) -> std::result::Result<Registrations, String> {
    let library = plugin
        .library()
        .ok_or_else(|| "library handle missing".to_string())?;

    // SAFETY: the symbol types are fixed by `declare_plugin!`.
    let abi_version = unsafe { library.get::<AbiVersionFn>(ABI_VERSION_SYMBOL) }
        .map(|symbol| *symbol)
        .map_err(|_| missing_symbol(ABI_VERSION_SYMBOL))?;
    let version = unsafe { abi_version() };
    if version != PLUGIN_ABI_VERSION {
        return Err(format!(
            "plugin ABI version {} does not match runtime version {}",
            version, PLUGIN_ABI_VERSION
        ));
    }

    // SAFETY: as above; the ABI version check guards the signature.
    let register = unsafe { library.get::<RegisterFn>(REGISTER_SYMBOL) }
        .map(|symbol| *symbol)
        .map_err(|_| missing_symbol(REGISTER_SYMBOL))?;

    run_registration(plugin.name(), register)
}

fn missing_symbol(symbol: &[u8]) -> String {
    let name = symbol.strip_suffix(b"\0").unwrap_or(symbol);
    format!("missing symbol `{}`", String::from_utf8_lossy(name))
}

/// Call a register function against a fresh registrar and collect the
/// staged batch. A panic inside the plugin fails the load instead of
/// unwinding through the runtime.
pub(crate) fn run_registration(
    plugin: &str,
    register: impl FnOnce(&mut PluginRegistrar),
) -> std::result::Result<Registrations, String> {
    let mut registrar = PluginRegistrar::new(plugin);
    panic::catch_unwind(AssertUnwindSafe(|| register(&mut registrar)))
        .map_err(|_| "plugin panicked during registration".to_string())?;
    registrar.finish().map_err(|e| e.to_string())
}

/// Library file name without platform prefix and extension:
/// `libviennamesh_tetgen.so` becomes `viennamesh_tetgen`. Versioned names
/// are cut at the platform extension, so `libm.so.6` becomes `m`.
pub fn plugin_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = format!(".{}", std::env::consts::DLL_EXTENSION);
    let cut = file_name.match_indices(&extension).find_map(|(at, _)| {
        let rest = &file_name[at + extension.len()..];
        (rest.is_empty() || rest.starts_with('.')).then_some(at)
    });
    let stem = match cut {
        Some(at) => file_name[..at].to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let prefix = std::env::consts::DLL_PREFIX;
    match stem.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() && !rest.is_empty() => rest.to_string(),
        _ => stem,
    }
}

/// Files in `dir` whose name matches `pattern`, sorted by path.
pub(crate) fn candidates(dir: &Path, pattern: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if matches_pattern(pattern, &name.to_string_lossy()) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Shell-style wildcard match: `*` any run of characters, `?` exactly one.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    // Last `*` seen and the name position it currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
