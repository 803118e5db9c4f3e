//! Repository context for the system prompt: a breadth-first structure
//! outline and an LLM-generated README summary.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use codelore_index::indexer::IGNORED_NAMES;
use codelore_llm::{LlmProvider, Message, Role};

/// Produce a directory listing of the tree under `root`, breadth first, one
/// `dir: file, file, ...` line per directory, truncated once `char_budget`
/// is reached. Entries within a directory are sorted for stable output.
#[must_use]
pub fn repo_outline(root: &Path, char_budget: usize) -> String {
    if !root.is_dir() {
        return String::new();
    }

    let mut outline = String::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = queue.pop_front() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if IGNORED_NAMES.contains(&name.as_str()) {
                continue;
            }
            if entry.file_type().is_ok_and(|ft| ft.is_dir()) {
                subdirs.push(entry.path());
            } else {
                files.push(name);
            }
        }
        files.sort();
        subdirs.sort();

        let label = dir
            .strip_prefix(root)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| ".".to_string(), |p| p.display().to_string());
        let line = format!("{label}/: {}\n", files.join(", "));

        if outline.len() + line.len() > char_budget {
            break;
        }
        outline.push_str(&line);
        queue.extend(subdirs);
    }

    outline
}

/// README content sent for summarization is capped at this many characters.
const README_CHAR_LIMIT: usize = 8000;

const SUMMARY_SYSTEM: &str = "You are an expert developer and programmer.";

const SUMMARY_PROMPT: &str = "Summarize the README file of this code repository. \
Infer the programming languages from the README and mention the framework \
the repository uses.";

/// Summarize the repository's top-level `README.md` through one chat call.
///
/// Advisory like the rest of retrieval: a missing README, an empty answer,
/// or a provider error all yield `None` and the prompt goes out without it.
pub async fn summarize_readme<P: LlmProvider>(provider: &P, root: &Path) -> Option<String> {
    let content = std::fs::read_to_string(root.join("README.md")).ok()?;
    let content: String = content.chars().take(README_CHAR_LIMIT).collect();

    let messages = [
        Message::new(Role::System, SUMMARY_SYSTEM),
        Message::new(
            Role::User,
            format!("{SUMMARY_PROMPT}\n\nHere is the README content: {content}"),
        ),
    ];
    match provider.chat(&messages).await {
        Ok(summary) if !summary.trim().is_empty() => Some(summary),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("README summary unavailable: {e}");
            None
        }
    }
}
