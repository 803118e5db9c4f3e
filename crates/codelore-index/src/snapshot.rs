//! Embedded-fragment snapshot: in-memory vector index with durable persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunker::Fragment;
use crate::error::{IndexError, Result};

/// Default number of nearest entries returned by [`Snapshot::query`].
pub const DEFAULT_TOP_K: usize = 10;

/// One embedded fragment. Created at build time, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub fragment: Fragment,
}

/// The full set of index entries for one repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    dim: usize,
    entries: Vec<IndexEntry>,
}

impl Snapshot {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Vector dimensionality fixed for this snapshot instance.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry. Vectors with the wrong dimensionality are rejected.
    pub(crate) fn push(&mut self, vector: Vec<f32>, fragment: Fragment) -> bool {
        if vector.len() != self.dim {
            return false;
        }
        self.entries.push(IndexEntry { vector, fragment });
        true
    }

    /// Return the `k` nearest entries by cosine similarity, most similar
    /// first, ties broken by insertion order. Pure read.
    #[must_use]
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<(&Fragment, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(vector, &e.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| (&self.entries[i].fragment, score))
            .collect()
    }

    /// Serialize the snapshot to `path`.
    ///
    /// Writes to a temporary file in the target directory and renames it into
    /// place, so a crash mid-write never leaves a partial snapshot behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or renamed.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, self)
            .map_err(|e| IndexError::Io(std::io::Error::other(e)))?;
        tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;

        tracing::debug!(path = %path.display(), entries = self.len(), "snapshot persisted");
        Ok(())
    }

    /// Deserialize a snapshot from `path`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Corrupt` if the stored format is unreadable,
    /// `IndexError::Io` if the file cannot be opened.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| IndexError::Corrupt(e.to_string()))
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
