//! Line-boundary chunking of decoded file content into bounded fragments.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// One bounded piece of file content with source attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub source_path: String,
}

/// Chunker configuration.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum fragment size in characters (default: 1500).
    pub max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_chars: 1500 }
    }
}

/// Decode raw file bytes as text.
///
/// Strips a UTF-8 BOM when present and falls back to Latin-1 for non-UTF-8
/// content. Bytes containing NUL are treated as binary.
///
/// # Errors
///
/// Returns `IndexError::Decode` if the content looks binary.
pub fn decode(bytes: &[u8], path: &str) -> Result<String> {
    if bytes.contains(&0) {
        return Err(IndexError::Decode { path: path.into() });
    }

    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Split decoded content into fragments of at most `max_chars` characters.
///
/// Splitting only happens on line boundaries; a single line longer than the
/// budget becomes its own fragment rather than being cut mid-line. Rejoining
/// the fragments with `\n` recovers the content modulo a trailing newline.
#[must_use]
pub fn chunk(source: &str, source_path: &str, config: &ChunkerConfig) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut started = false;

    for line in source.lines() {
        let line_len = line.chars().count();

        if started && current_len + 1 + line_len > config.max_chars {
            fragments.push(make_fragment(&mut current, source_path));
            current_len = 0;
            started = false;
        }
        if started {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
        started = true;

        // Oversized single line: emit as-is, never split inside it.
        if current_len > config.max_chars {
            fragments.push(make_fragment(&mut current, source_path));
            current_len = 0;
            started = false;
        }
    }

    if started {
        fragments.push(make_fragment(&mut current, source_path));
    }

    fragments
}

fn make_fragment(current: &mut String, source_path: &str) -> Fragment {
    Fragment {
        text: std::mem::take(current),
        source_path: source_path.to_string(),
    }
}
