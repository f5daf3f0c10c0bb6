//! Record Loading
//!
//! Reads a [`RecordBatch`] from JSON. Either a single document mapping kind
//! names to record arrays, or a directory of `<Kind>.json` files each holding
//! one array. Kind names are not checked here; the resolver rejects unknown
//! kinds.

use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::InputConfig;
use crate::error::{CatalogError, Result};
use crate::record::{RawRecord, RecordBatch};

/// Configuration for record loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Skip files whose path (relative to the root) starts with these prefixes
    pub skip_prefixes: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: vec![".git/".to_string(), "target/".to_string()],
        }
    }
}

impl From<&InputConfig> for LoadConfig {
    fn from(input: &InputConfig) -> Self {
        Self {
            skip_prefixes: input.skip_prefixes.clone(),
        }
    }
}

/// Load a file or directory, whichever `path` is
pub fn load_path(path: &Path, config: &LoadConfig) -> Result<RecordBatch> {
    if path.is_dir() {
        load_from_directory(path, config)
    } else {
        load_from_file(path)
    }
}

/// Load a single JSON document: `{"Kind": [records...], ...}`
pub fn load_from_file(path: &Path) -> Result<RecordBatch> {
    let content = fs::read_to_string(path)?;
    let batch: RecordBatch = serde_json::from_str(&content)?;
    tracing::debug!(records = batch.len(), file = %path.display(), "Loaded batch file");
    Ok(batch)
}

/// Load every `<Kind>.json` file below `dir`.
///
/// Files are visited in file-name order so a batch assembled from several
/// files of the same kind is deterministic.
pub fn load_from_directory(dir: &Path, config: &LoadConfig) -> Result<RecordBatch> {
    let mut batch = RecordBatch::new();

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p.as_str())) {
            continue;
        }

        // "Album.json" and "Album.part2.json" both feed kind "Album"
        let Some(kind) = path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.split('.').next())
            .filter(|s| !s.is_empty())
        else {
            continue;
        };

        let content = fs::read_to_string(path)?;
        let records: Vec<RawRecord> = serde_json::from_str(&content).map_err(|e| {
            CatalogError::InvalidInput(format!("failed to parse {}: {}", path.display(), e))
        })?;

        tracing::debug!(kind, count = records.len(), file = %path.display(), "Loaded records");
        batch.extend(kind, records);
    }

    Ok(batch)
}
