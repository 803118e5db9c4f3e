//! Retrieval orchestration: route a question, run the matching retrieval,
//! and return the question augmented with bounded context.

use std::path::Path;
use std::sync::Arc;

use codelore_index::chunker::ChunkerConfig;
use codelore_index::indexer::{Indexer, IndexerConfig};
use codelore_llm::LlmProvider;

use crate::config::RetrievalConfig;
use crate::locator::{ContextWindow, Occurrence, locate};
use crate::router::{Route, route};

/// Runs the full route → retrieve → format pipeline for one question at a
/// time. Retrieval never fails the question: every error path degrades to
/// returning the question unchanged.
pub struct Orchestrator<P: LlmProvider> {
    provider: Arc<P>,
    indexer: Indexer<P>,
    retrieval: RetrievalConfig,
}

impl<P: LlmProvider> Orchestrator<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, retrieval: RetrievalConfig) -> Self {
        let indexer = Indexer::new(
            Arc::clone(&provider),
            IndexerConfig {
                chunker: ChunkerConfig {
                    max_chars: retrieval.fragment_chars,
                },
            },
        );
        Self {
            provider,
            indexer,
            retrieval,
        }
    }

    /// Augment `question` with repository context according to its route.
    /// The appended context never exceeds `retrieval.context_chars`
    /// characters; less relevant results are dropped first.
    pub async fn augment(&self, question: &str, root: &Path, cache_dir: &Path) -> String {
        match route(self.provider.as_ref(), question).await {
            Route::SymbolLookup { identifier } => {
                self.augment_with_symbol(question, &identifier, root).await
            }
            Route::SemanticSearch => self.augment_with_search(question, root, cache_dir).await,
            Route::NoTool => {
                tracing::debug!("no tool selected, question passed through");
                question.to_string()
            }
        }
    }

    async fn augment_with_symbol(&self, question: &str, identifier: &str, root: &Path) -> String {
        let window = ContextWindow {
            before: self.retrieval.before_lines,
            after: self.retrieval.after_lines,
        };
        let occurrences = match locate(identifier, root, window).await {
            Ok(occurrences) => occurrences,
            Err(e) => {
                tracing::warn!("symbol lookup failed: {e}");
                return question.to_string();
            }
        };
        if occurrences.is_empty() {
            tracing::debug!(identifier, "no occurrences found");
            return question.to_string();
        }

        let header =
            format!("Here are some contexts of the function or variable {identifier}:\n\n");
        let blocks = occurrences.iter().map(format_occurrence).collect();
        match pack(&header, blocks, self.retrieval.context_chars) {
            Some(context) => format!("{question}\n\n{context}"),
            None => question.to_string(),
        }
    }

    async fn augment_with_search(&self, question: &str, root: &Path, cache_dir: &Path) -> String {
        let snapshot = match self.indexer.load_or_build(root, cache_dir).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("index unavailable: {e}");
                return question.to_string();
            }
        };
        let query = match self.provider.embed(question).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("question embedding failed: {e}");
                return question.to_string();
            }
        };

        let results = snapshot.query(&query, self.retrieval.top_k);
        if results.is_empty() {
            return question.to_string();
        }

        let header = "Here are some contexts about the question, \
                      ranked by relevance to the question:\n\n"
            .to_string();
        let blocks = results
            .iter()
            .map(|(fragment, score)| {
                format!(
                    "Source: {} (score {score:.3})\n{}\n\n",
                    fragment.source_path, fragment.text
                )
            })
            .collect();
        match pack(&header, blocks, self.retrieval.context_chars) {
            Some(context) => format!("{question}\n\n{context}"),
            None => question.to_string(),
        }
    }
}

fn format_occurrence(occurrence: &Occurrence) -> String {
    format!(
        "File: {}\nStart line: {}\nContext:\n{}\n\n",
        occurrence.file_path, occurrence.line_number, occurrence.context_text
    )
}

/// Assemble header + blocks within `budget` characters. Blocks arrive most
/// relevant first; whatever does not fit is dropped from the tail. Returns
/// `None` when not even the first block fits.
fn pack(header: &str, blocks: Vec<String>, budget: usize) -> Option<String> {
    let mut out = header.to_string();
    let mut used = header.chars().count();
    let mut kept = 0usize;

    for block in blocks {
        let len = block.chars().count();
        if used + len > budget {
            break;
        }
        out.push_str(&block);
        used += len;
        kept += 1;
    }

    (kept > 0).then_some(out)
}
