//! ViennaMesh pipeline runner
//!
//! Usage: `viennamesh <pipeline.{xml,json,toml}> [config.toml]`
//!
//! Loads the runtime config (and the plugins it lists), builds the pipeline
//! description and runs it once. Relative file parameters resolve against
//! the directory of the description file.

use anyhow::{bail, Context as _};
use std::path::PathBuf;
use viennamesh::{logging, Context, PipelineBuilder, PipelineDescription, RuntimeConfig};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args_os().skip(1);
    let Some(pipeline_path) = args.next().map(PathBuf::from) else {
        bail!("usage: viennamesh <pipeline.xml|json|toml> [config.toml]");
    };

    // Explicit config path must exist; the default one may not.
    let config = match args.next().map(PathBuf::from) {
        Some(path) => RuntimeConfig::load(&path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => match RuntimeConfig::default_path() {
            Some(path) => RuntimeConfig::load_or_default(&path)?,
            None => RuntimeConfig::default(),
        },
    }
    .with_env_overrides();

    // Initialize logging, the guard flushes the log file on exit
    let _log_guard = logging::init(&config.logging)?;

    tracing::info!("Starting ViennaMesh {}", env!("CARGO_PKG_VERSION"));

    let context = Context::with_config(&config)?;
    let plugins = context.plugins();
    tracing::info!("{} plugin(s) loaded: {:?}", plugins.len(), plugins);

    let description = PipelineDescription::load(&pipeline_path)?;
    let mut builder = PipelineBuilder::new(&context);
    if let Some(dir) = pipeline_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        builder = builder.base_path(dir);
    }
    let pipeline = builder
        .build(&description)
        .with_context(|| format!("Failed to build pipeline {:?}", pipeline_path))?;

    pipeline.run()?;

    tracing::info!("Done");
    Ok(())
}
