//! Building route collections from code or route manifests.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::cache::RouteRecord;
use crate::collector::RouteCollector;
use crate::error::{Result, RouterError};

/// Builds a populated [`RouteCollector`].
pub trait RouteCollectorFactory {
    /// Creates the collector.
    fn create(&self) -> Result<RouteCollector>;
}

impl<F> RouteCollectorFactory for F
where
    F: Fn(&mut RouteCollector) -> Result<()>,
{
    fn create(&self) -> Result<RouteCollector> {
        let mut routes = RouteCollector::new();
        self(&mut routes)?;
        Ok(routes)
    }
}

/// Loads routes from JSON manifests.
///
/// A manifest is a `.json` file holding an array of route records in the
/// route cache format:
///
/// ```json
/// [
///   { "method": "GET", "path": "/users", "handler": ["UserController", "index"] },
///   { "method": "POST", "path": "/ping", "handler": "PingController", "middlewares": ["logging"] }
/// ]
/// ```
///
/// Directories are searched recursively. Files are registered in path
/// order; paths that do not exist are skipped.
#[derive(Debug, Clone, Default)]
pub struct ManifestFactory {
    paths: Vec<PathBuf>,
}

impl ManifestFactory {
    /// Creates a factory over manifest files and directories. Blank entries
    /// are ignored.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .filter_map(|path| {
                let path = path.as_ref().trim();
                if path.is_empty() {
                    return None;
                }
                let trimmed = path.trim_end_matches('/');
                Some(PathBuf::from(if trimmed.is_empty() { "/" } else { trimmed }))
            })
            .collect();
        Self { paths }
    }

    /// Returns the configured paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Lists manifest files, sorted.
    pub fn manifest_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                files.push(path.clone());
                continue;
            }
            if !path.is_dir() {
                debug!(path = %path.display(), "skipping missing manifest path");
                continue;
            }

            for entry in WalkDir::new(path) {
                let entry = entry.map_err(|e| RouterError::Manifest {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "json")
                {
                    files.push(entry.into_path());
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

fn read_manifest(path: &Path) -> Result<Vec<RouteRecord>> {
    let manifest_error = |message: String| RouterError::Manifest {
        path: path.to_path_buf(),
        message,
    };

    let contents = fs::read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| manifest_error(e.to_string()))
}

impl RouteCollectorFactory for ManifestFactory {
    fn create(&self) -> Result<RouteCollector> {
        let mut routes = RouteCollector::new();

        for file in self.manifest_files()? {
            let records = read_manifest(&file)?;
            debug!(manifest = %file.display(), routes = records.len(), "loading route manifest");
            for record in records {
                record.register(&mut routes)?;
            }
        }

        Ok(routes)
    }
}
