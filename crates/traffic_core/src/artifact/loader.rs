//! Artifact loading and process-wide caching
//!
//! Loading reads, parses, validates and fingerprints the artifact file. Every
//! failure on that path is an `ArtifactLoadFailure`; there is no fallback
//! model. The cache keeps one `Arc<Artifact>` per canonical path so repeated
//! interactions never re-read the file.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use super::Artifact;
use crate::binder::BindingStrategy;
use crate::errors::{Result, TrafficError};

/// Reads artifacts from disk, optionally pinning the expected fingerprint
#[derive(Debug, Clone, Default)]
pub struct ArtifactLoader {
    expected_hash: Option<String>,
}

impl ArtifactLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any artifact whose fingerprint differs from `hash`
    pub fn with_expected_hash(mut self, hash: impl Into<String>) -> Self {
        self.expected_hash = Some(hash.into().trim().to_ascii_lowercase());
        self
    }

    /// Load and verify an artifact without caching it
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn load(&self, path: &Path) -> Result<Artifact> {
        let start = Instant::now();

        let json = fs::read_to_string(path).map_err(|e| TrafficError::load_failure(path, e))?;
        let artifact =
            Artifact::from_json_str(&json).map_err(|reason| TrafficError::load_failure(path, reason))?;
        self.verify(path, &artifact)?;

        info!(
            name = %artifact.name,
            fingerprint = %artifact.fingerprint(),
            columns = artifact.schema().len(),
            classes = artifact.classes().len(),
            predict_proba = artifact.supports_proba(),
            strategy = %BindingStrategy::for_artifact(&artifact),
            "artifact loaded in {}ms",
            start.elapsed().as_millis()
        );
        Ok(artifact)
    }

    fn verify(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        match &self.expected_hash {
            Some(expected) if expected != artifact.fingerprint() => Err(TrafficError::load_failure(
                path,
                format!(
                    "fingerprint mismatch: expected {expected}, found {}",
                    artifact.fingerprint()
                ),
            )),
            _ => Ok(()),
        }
    }
}

static GLOBAL_CACHE: Lazy<ArtifactCache> = Lazy::new(ArtifactCache::new);

/// Read-only artifact cache keyed by canonical file path
#[derive(Debug, Default)]
pub struct ArtifactCache {
    artifacts: RwLock<HashMap<PathBuf, Arc<Artifact>>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every session of this process
    pub fn global() -> &'static ArtifactCache {
        &GLOBAL_CACHE
    }

    /// Return the cached artifact for `path`, loading it on first use
    pub fn get_or_load(&self, path: &Path, loader: &ArtifactLoader) -> Result<Arc<Artifact>> {
        let key = fs::canonicalize(path).map_err(|e| TrafficError::load_failure(path, e))?;

        if let Some(artifact) = self.artifacts.read().get(&key) {
            debug!(path = %key.display(), "artifact cache hit");
            loader.verify(&key, artifact)?;
            return Ok(Arc::clone(artifact));
        }

        let mut artifacts = self.artifacts.write();
        // another session may have loaded it between the read and write lock
        if let Some(artifact) = artifacts.get(&key) {
            loader.verify(&key, artifact)?;
            return Ok(Arc::clone(artifact));
        }

        let artifact = Arc::new(loader.load(&key)?);
        artifacts.insert(key, Arc::clone(&artifact));
        Ok(artifact)
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }
}
