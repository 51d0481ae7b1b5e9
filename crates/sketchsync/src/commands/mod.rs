//! Command implementations for the sketchsync CLI
//!
//! Each command loads the tabs named on the command line, runs the
//! preprocessing pipeline once and reports on the resulting snapshot.

pub mod check;
pub mod derive;
pub mod rename;
pub mod usages;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sketchsync_core::{
    ClassPathCache, ClassPathProvider, DefaultClassPathProvider, FileKind, Pipeline, PreprocessedSketch,
    SessionConfig, SourceFile, TracingObserver,
};
use tracing::debug;

use crate::SketchArgs;

/// A sketch read from disk and preprocessed once.
pub struct LoadedSketch {
    pub config: SessionConfig,
    pub files: Vec<SourceFile>,
    pub snapshot: PreprocessedSketch,
}

pub fn load(args: &SketchArgs) -> Result<LoadedSketch> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(name) = &args.name {
        config.service.sketch_name = name.clone();
    } else if args.config.is_none()
        && let Some(stem) = args.files.first().and_then(|p| p.file_stem())
    {
        config.service.sketch_name = stem.to_string_lossy().into_owned();
    }

    let files = args
        .files
        .iter()
        .map(|path| read_tab(path))
        .collect::<Result<Vec<_>>>()?;
    if let Some(java) = files.iter().find(|f| f.kind == FileKind::Java) {
        anyhow::bail!(
            "{} is a plain Java tab; sketches with Java tabs are not preprocessed",
            java.name
        );
    }

    let mut provider = DefaultClassPathProvider::new();
    if let Some(dir) = &args.libraries {
        provider = provider.with_library_dir(dir);
    }
    if let Some(dir) = &args.code_folder {
        provider = provider.with_code_folder(dir);
    }
    let provider: Arc<dyn ClassPathProvider> = Arc::new(provider);

    let mut pipeline = Pipeline::new(
        config.service.class_name(),
        ClassPathCache::new(provider),
        Arc::new(TracingObserver),
    );
    let snapshot = pipeline.run(1, &files);
    debug!(
        tabs = files.len(),
        syntax_errors = snapshot.has_syntax_errors(),
        "Sketch loaded"
    );
    Ok(LoadedSketch {
        config,
        files,
        snapshot,
    })
}

fn read_tab(path: &Path) -> Result<SourceFile> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, text))
}
