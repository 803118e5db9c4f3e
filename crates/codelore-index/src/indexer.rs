//! Repository indexing: walk → decode → chunk → embed → snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use codelore_llm::LlmProvider;

use crate::chunker::{ChunkerConfig, chunk, decode};
use crate::error::Result;
use crate::snapshot::Snapshot;

/// Directory and file names excluded from indexing and symbol search alike.
pub const IGNORED_NAMES: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".idea",
    ".vscode",
    "target",
];

/// Indexer configuration.
#[derive(Debug, Clone, Default)]
pub struct IndexerConfig {
    pub chunker: ChunkerConfig,
}

/// Summary of one indexing run, reported through the log.
#[derive(Debug, Default)]
struct BuildReport {
    files_scanned: usize,
    files_skipped: usize,
    fragments_indexed: usize,
    fragments_skipped: usize,
    errors: Vec<String>,
}

/// Builds and caches embedding snapshots over a repository tree.
pub struct Indexer<P: LlmProvider> {
    provider: Arc<P>,
    config: IndexerConfig,
}

impl<P: LlmProvider> Indexer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: IndexerConfig) -> Self {
        Self { provider, config }
    }

    /// Build a fresh snapshot for the tree under `root`.
    ///
    /// Per-file decode failures and per-fragment embedding failures are
    /// logged and skipped; they never abort the build.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding probe fails or `root` is unreadable.
    pub async fn build(&self, root: &Path) -> Result<Snapshot> {
        let probe = self.provider.embed("probe").await?;
        let mut snapshot = Snapshot::new(probe.len());
        let mut report = BuildReport::default();

        for path in walk_files(root) {
            report.files_scanned += 1;
            let rel_path = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();

            let bytes = match tokio::fs::read(&path).await {
                Ok(b) => b,
                Err(e) => {
                    report.files_skipped += 1;
                    report.errors.push(format!("{rel_path}: {e}"));
                    continue;
                }
            };

            let source = match decode(&bytes, &rel_path) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!(file = %rel_path, "skipped: {e}");
                    report.files_skipped += 1;
                    continue;
                }
            };

            for fragment in chunk(&source, &rel_path, &self.config.chunker) {
                if fragment.text.trim().is_empty() {
                    continue;
                }
                match self.provider.embed(&fragment.text).await {
                    Ok(vector) => {
                        if snapshot.push(vector, fragment) {
                            report.fragments_indexed += 1;
                        } else {
                            report.fragments_skipped += 1;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(file = %rel_path, "embedding failed, fragment skipped: {e}");
                        report.fragments_skipped += 1;
                    }
                }
            }
        }

        tracing::info!(
            files = report.files_scanned,
            skipped = report.files_skipped,
            fragments = report.fragments_indexed,
            dropped = report.fragments_skipped,
            read_errors = report.errors.len(),
            "index built"
        );
        Ok(snapshot)
    }

    /// Load the persisted snapshot for `root` if one exists, else build and
    /// persist a fresh one. An unreadable cache file triggers a rebuild.
    ///
    /// # Errors
    ///
    /// Returns an error if the build fails or the final persist write fails.
    pub async fn load_or_build(&self, root: &Path, cache_dir: &Path) -> Result<Snapshot> {
        let path = snapshot_path(cache_dir, root);

        if path.exists() {
            match Snapshot::load(&path) {
                Ok(snapshot) => {
                    tracing::debug!(path = %path.display(), "snapshot loaded from cache");
                    return Ok(snapshot);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "cached snapshot unreadable, rebuilding: {e}");
                }
            }
        }

        let snapshot = self.build(root).await?;
        snapshot.persist(&path)?;
        Ok(snapshot)
    }
}

/// Identity of a repository, derived from its sorted top-level folder names.
/// A flat repository without subdirectories falls back to its top-level file
/// names, so distinct repositories map to distinct persisted snapshots.
#[must_use]
pub fn repository_key(root: &Path) -> String {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if IGNORED_NAMES.contains(&name.as_str()) {
                continue;
            }
            if entry.file_type().is_ok_and(|ft| ft.is_dir()) {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }
    }

    let mut names = if dirs.is_empty() { files } else { dirs };
    names.sort();

    if names.is_empty() {
        "repo".to_string()
    } else {
        names.join("-")
    }
}

/// Cache file location for the snapshot of the repository at `root`.
#[must_use]
pub fn snapshot_path(cache_dir: &Path, root: &Path) -> PathBuf {
    cache_dir.join(format!("index-{}.json", repository_key(root)))
}

/// All indexable files under `root` in deterministic (path-sorted) order.
fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .is_none_or(|name| !IGNORED_NAMES.contains(&name))
        })
        .build()
        .flatten()
        .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelore_llm::mock::MockProvider;

    fn write(dir: &Path, rel: &str, content: &[u8]) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn sample_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/main.rs", b"fn main() {\n    run();\n}\n");
        write(dir.path(), "src/lib.rs", b"pub fn run() {}\n");
        write(dir.path(), "docs/guide.md", b"# Guide\n\nUsage notes.\n");
        write(dir.path(), ".git/config", b"[core]\n");
        write(dir.path(), "assets/logo.bin", b"\x00\x01\x02\x03");
        dir
    }

    fn indexer() -> Indexer<MockProvider> {
        Indexer::new(Arc::new(MockProvider::default()), IndexerConfig::default())
    }

    #[tokio::test]
    async fn build_indexes_text_files() {
        let repo = sample_repo();
        let snapshot = indexer().build(repo.path()).await.unwrap();
        assert!(!snapshot.is_empty());

        let query = MockProvider::hash_embedding("fn main");
        let results = snapshot.query(&query, 10);
        assert!(
            results
                .iter()
                .any(|(f, _)| f.source_path.ends_with("main.rs"))
        );
    }

    #[tokio::test]
    async fn build_skips_binary_and_git_metadata() {
        let repo = sample_repo();
        let snapshot = indexer().build(repo.path()).await.unwrap();

        let query = MockProvider::hash_embedding("anything");
        for (fragment, _) in snapshot.query(&query, 100) {
            assert!(!fragment.source_path.contains(".git"));
            assert!(!fragment.source_path.ends_with(".bin"));
        }
    }

    #[tokio::test]
    async fn build_is_deterministic() {
        let repo = sample_repo();
        let idx = indexer();
        let a = idx.build(repo.path()).await.unwrap();
        let b = idx.build(repo.path()).await.unwrap();

        assert_eq!(a.len(), b.len());
        let query = MockProvider::hash_embedding("run");
        let texts = |s: &Snapshot| -> Vec<String> {
            s.query(&query, 100)
                .into_iter()
                .map(|(f, _)| f.text.clone())
                .collect()
        };
        assert_eq!(texts(&a), texts(&b));
    }

    #[tokio::test]
    async fn embedding_failure_skips_fragment_not_build() {
        let repo = sample_repo();
        let provider = MockProvider::default().with_embed_failure("Usage notes");
        let idx = Indexer::new(Arc::new(provider), IndexerConfig::default());

        let snapshot = idx.build(repo.path()).await.unwrap();
        assert!(!snapshot.is_empty());

        let query = MockProvider::hash_embedding("guide");
        assert!(
            snapshot
                .query(&query, 100)
                .iter()
                .all(|(f, _)| !f.text.contains("Usage notes"))
        );
    }

    #[tokio::test]
    async fn load_or_build_persists_then_reloads() {
        let repo = sample_repo();
        let cache = tempfile::tempdir().unwrap();
        let idx = indexer();

        let built = idx.load_or_build(repo.path(), cache.path()).await.unwrap();
        assert!(snapshot_path(cache.path(), repo.path()).exists());

        let reloaded = idx.load_or_build(repo.path(), cache.path()).await.unwrap();
        assert_eq!(built.len(), reloaded.len());
    }

    #[tokio::test]
    async fn load_or_build_recovers_from_corrupt_cache() {
        let repo = sample_repo();
        let cache = tempfile::tempdir().unwrap();
        let path = snapshot_path(cache.path(), repo.path());
        std::fs::create_dir_all(cache.path()).unwrap();
        std::fs::write(&path, "garbage").unwrap();

        let snapshot = indexer()
            .load_or_build(repo.path(), cache.path())
            .await
            .unwrap();
        assert!(!snapshot.is_empty());

        // The rebuilt snapshot replaced the corrupt file.
        assert!(Snapshot::load(&path).is_ok());
    }

    #[test]
    fn repository_key_joins_sorted_folder_names() {
        let repo = sample_repo();
        assert_eq!(repository_key(repo.path()), "assets-docs-src");
    }

    #[test]
    fn repository_key_empty_root_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(repository_key(dir.path()), "repo");
    }

    #[test]
    fn flat_repositories_key_on_file_names() {
        let a = tempfile::tempdir().unwrap();
        write(a.path(), "setup.py", b"from setuptools import setup\n");
        write(a.path(), "app.py", b"print('a')\n");

        let b = tempfile::tempdir().unwrap();
        write(b.path(), "main.go", b"package main\n");

        assert_eq!(repository_key(a.path()), "app.py-setup.py");
        assert_ne!(repository_key(a.path()), repository_key(b.path()));
    }

    #[test]
    fn distinct_repositories_get_distinct_cache_files() {
        let a = sample_repo();
        let b = tempfile::tempdir().unwrap();
        write(b.path(), "pkg/mod.go", b"package pkg\n");

        let cache = Path::new("/tmp/cache");
        assert_ne!(
            snapshot_path(cache, a.path()),
            snapshot_path(cache, b.path())
        );
    }
}
