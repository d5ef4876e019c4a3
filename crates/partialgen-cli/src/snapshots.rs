//! Discovery and loading of JSON compilation snapshots

use anyhow::{bail, Context, Result};
use partialgen_core::semantic::Compilation;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A compilation snapshot read from disk
pub struct LoadedSnapshot {
    pub path: PathBuf,
    pub compilation: Compilation,
}

impl LoadedSnapshot {
    /// File stem used to name per-snapshot output directories
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "compilation".to_string())
    }
}

/// Snapshot files under `input`: the file itself, or every `*.json` below a directory
///
/// Results are sorted so runs over the same tree visit snapshots in the same order.
pub fn discover(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        bail!("Input '{}' does not exist", input.display());
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(input).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to scan '{}'", input.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().map_or(false, |ext| ext == "json") {
            found.push(path.to_path_buf());
        }
    }
    found.sort();

    if found.is_empty() {
        bail!("No compilation snapshots (*.json) found under '{}'", input.display());
    }
    log::debug!("Found {} snapshots under {}", found.len(), input.display());
    Ok(found)
}

/// Read and parse one snapshot
pub async fn load(path: &Path) -> Result<LoadedSnapshot> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let compilation =
        Compilation::from_json(&content).with_context(|| format!("Invalid compilation snapshot '{}'", path.display()))?;
    Ok(LoadedSnapshot {
        path: path.to_path_buf(),
        compilation,
    })
}

/// Discover and load every snapshot under `input`
pub async fn load_all(input: &Path) -> Result<Vec<LoadedSnapshot>> {
    let mut snapshots = Vec::new();
    for path in discover(input)? {
        snapshots.push(load(&path).await?);
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_sorts_json_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("nested").join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = discover(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("b.json"), dir.path().join("nested").join("a.json")]);
    }

    #[test]
    fn test_discover_rejects_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(discover(dir.path()).is_err());
        assert!(discover(&dir.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn test_load_reports_the_offending_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let error = load(&path).await.err().unwrap();
        assert!(format!("{:#}", error).contains("broken.json"));
    }
}
