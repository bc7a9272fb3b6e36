//! Plugin loading, registration and unloading

mod common;

use common::builders::Echo;
use common::IntBox;
use std::fs;
use viennamesh::algorithm::AlgorithmState;
use viennamesh::plugin::default_pattern;
use viennamesh::{AlgorithmFns, Context, ErrorCode, Result};

fn mesher_plugin(registrar: &mut viennamesh::PluginRegistrar) {
    registrar
        .register_type::<IntBox>("mesh")
        .register_algorithm_type::<Echo>("mesh_echo");
}

#[test]
fn test_missing_file() {
    let ctx = Context::new();
    let err = ctx
        .load_plugin("/nonexistent/libviennamesh_tetgen.so")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PluginLoadFailure);
    assert!(ctx.plugins().is_empty());
}

#[test]
fn test_not_a_library() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join(format!("libbogus.{}", std::env::consts::DLL_EXTENSION));
    fs::write(&path, b"definitely not a shared object").unwrap();

    let ctx = Context::new();
    let err = ctx.load_plugin(&path).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PluginLoadFailure);
    assert_eq!(ctx.last_error().unwrap().code, ErrorCode::PluginLoadFailure);
}

#[test]
fn test_directory_scan_skips_failures() {
    let dir = tempfile::tempdir().unwrap();
    let extension = std::env::consts::DLL_EXTENSION;
    fs::write(dir.path().join(format!("liba.{}", extension)), b"junk").unwrap();
    fs::write(dir.path().join("notes.txt"), b"not a plugin").unwrap();
    fs::create_dir(dir.path().join(format!("nested.{}", extension))).unwrap();

    let ctx = Context::new();
    let loaded = ctx
        .load_plugins_in_directory(dir.path(), &default_pattern())
        .unwrap();
    assert_eq!(loaded, 0);
}

#[test]
fn test_empty_and_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context::new();
    assert_eq!(
        ctx.load_plugins_in_directory(dir.path(), "*").unwrap(),
        0
    );

    let err = ctx
        .load_plugins_in_directory(dir.path().join("missing"), "*")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Io);
}

#[test]
fn test_static_plugin_install() {
    let ctx = Context::new();
    ctx.install_plugin("mesher", mesher_plugin).unwrap();

    assert!(ctx.has_type("mesh"));
    assert!(ctx.has_algorithm("mesh_echo"));
    assert_eq!(ctx.plugins(), vec!["mesher"]);
}

#[test]
fn test_conflicting_plugin_registers_nothing() {
    let ctx = Context::new();
    ctx.install_plugin("mesher", mesher_plugin).unwrap();

    let err = ctx
        .install_plugin("other_mesher", |r| {
            r.register_type::<IntBox>("other_mesh")
                .register_type::<IntBox>("mesh");
        })
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PluginLoadFailure);
    assert!(!ctx.has_type("other_mesh"));
    // Retained even though registration failed
    assert_eq!(ctx.plugins(), vec!["mesher", "other_mesher"]);
}

#[test]
fn test_incomplete_function_table_fails_load() {
    fn make() -> Result<AlgorithmState> {
        Ok(Box::new(()))
    }

    let ctx = Context::new();
    let err = ctx
        .install_plugin("half_done", |r| {
            r.register_type::<IntBox>("half_mesh")
                .register_algorithm_fns(
                    "half",
                    AlgorithmFns {
                        make: Some(make),
                        ..AlgorithmFns::default()
                    },
                );
        })
        .unwrap_err();
    assert!(err.to_string().contains("delete"), "{}", err);
    assert!(!ctx.has_algorithm("half"));
    assert!(!ctx.has_type("half_mesh"));
}

#[test]
fn test_panicking_plugin_is_contained() {
    let ctx = Context::new();
    let err = ctx
        .install_plugin("explosive", |_| panic!("boom"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PluginLoadFailure);
    assert!(ctx.type_names().len() >= 6);
}

#[test]
fn test_unload_blocked_while_in_use() {
    let ctx = Context::new();
    ctx.install_plugin("mesher", mesher_plugin).unwrap();

    let instance = ctx.make_algorithm("mesh_echo").unwrap();
    let mesh = ctx.make_value("mesh", IntBox(3)).unwrap();

    let err = ctx.unload_plugin("mesher").unwrap_err();
    assert_eq!(err.code(), ErrorCode::PluginInUse);

    drop(instance);
    assert_eq!(
        ctx.unload_plugin("mesher").unwrap_err().code(),
        ErrorCode::PluginInUse
    );

    drop(mesh);
    ctx.unload_plugin("mesher").unwrap();
    assert!(!ctx.has_type("mesh"));
    assert!(!ctx.has_algorithm("mesh_echo"));
    assert!(ctx.plugins().is_empty());

    assert_eq!(
        ctx.unload_plugin("mesher").unwrap_err().code(),
        ErrorCode::PluginLoadFailure
    );
}

// ── Shared libraries ──

/// Build `tests/fixtures/demo_plugin` once per test binary and return the
/// library path.
fn demo_plugin() -> &'static std::path::Path {
    use std::path::PathBuf;
    use std::process::Command;
    use std::sync::OnceLock;

    static LIBRARY: OnceLock<PathBuf> = OnceLock::new();
    LIBRARY.get_or_init(|| {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("demo_plugin")
            .join("Cargo.toml");
        let target_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("demo_plugin");
        let output = Command::new(env!("CARGO"))
            .arg("build")
            .arg("--manifest-path")
            .arg(&manifest)
            .arg("--target-dir")
            .arg(&target_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "building demo plugin failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
        target_dir.join("debug").join(format!(
            "{}viennamesh_demo_plugin.{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_EXTENSION
        ))
    })
}

#[test]
fn test_shared_library_load_run_unload() {
    let ctx = Context::new();
    ctx.load_plugin(demo_plugin()).unwrap();

    assert_eq!(ctx.plugins(), vec!["viennamesh_demo_plugin"]);
    assert!(ctx.has_type("demo_tally"));
    assert!(ctx.has_algorithm("demo_seven"));

    let seven = ctx.make_algorithm("demo_seven").unwrap();
    seven.run().unwrap();
    let out = seven.get_output(viennamesh::DEFAULT_PORT).unwrap();
    assert_eq!(out.value::<i64>(0).unwrap(), 7);

    let tally = ctx.make_data("demo_tally").unwrap();
    assert_eq!(
        ctx.unload_plugin("viennamesh_demo_plugin").unwrap_err().code(),
        ErrorCode::PluginInUse
    );

    drop(tally);
    drop(seven);
    ctx.unload_plugin("viennamesh_demo_plugin").unwrap();
    assert!(!ctx.has_algorithm("demo_seven"));
    assert!(!ctx.has_type("demo_tally"));
    // Output was made from a builtin type, so it outlives the library
    assert_eq!(out.value::<i64>(0).unwrap(), 7);
}

#[test]
fn test_shared_library_directory_scan() {
    let dir = tempfile::tempdir().unwrap();
    let file_name = demo_plugin().file_name().unwrap();
    fs::copy(demo_plugin(), dir.path().join(file_name)).unwrap();
    fs::write(dir.path().join("README.txt"), b"not a plugin").unwrap();

    let ctx = Context::new();
    let loaded = ctx
        .load_plugins_in_directory(dir.path(), &default_pattern())
        .unwrap();
    assert_eq!(loaded, 1);
    assert!(ctx.has_algorithm("demo_seven"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_library_without_entry_points() {
    let ctx = Context::new();
    let err = ctx.load_plugin("libm.so.6").unwrap_err();
    let message = err.to_string();

    assert_eq!(err.code(), ErrorCode::PluginLoadFailure);
    assert!(message.contains("viennamesh_plugin_abi_version"), "{}", message);
    assert!(message.contains("libm.so.6"), "{}", message);
    // Kept attached under its short name, and removable by it
    assert_eq!(ctx.plugins(), vec!["m"]);
    ctx.unload_plugin("m").unwrap();
}
