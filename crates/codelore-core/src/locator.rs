//! Exact symbol lookup by shelling out to `grep`.
//!
//! The textual output of `grep -rn -B -A` is parsed behind a single adapter:
//! `file:line:content` records for match lines, `file-line-content` for
//! context lines, and `--` separators between occurrence windows.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use codelore_index::indexer::IGNORED_NAMES;

/// One place in the repository where the identifier appears, together with
/// its surrounding lines. Recomputed per query, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub file_path: String,
    pub line_number: u32,
    pub context_text: String,
}

/// Context window around each match, in lines.
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    pub before: usize,
    pub after: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            before: 5,
            after: 10,
        }
    }
}

/// Search the tree under `root` for exact appearances of `identifier`.
///
/// An identifier that appears nowhere yields an empty vec, not an error.
/// Adjacent matches whose context windows overlap arrive from grep as one
/// window and stay merged as a single occurrence.
///
/// # Errors
///
/// Returns an error if grep cannot be spawned or exits reporting a failure.
pub async fn locate(
    identifier: &str,
    root: &Path,
    window: ContextWindow,
) -> std::io::Result<Vec<Occurrence>> {
    let mut command = tokio::process::Command::new("grep");
    command
        .arg("-r")
        .arg("-n")
        .arg(format!("-B{}", window.before))
        .arg(format!("-A{}", window.after));
    for name in IGNORED_NAMES {
        command.arg(format!("--exclude-dir={name}"));
    }
    command.arg("-F").arg("--").arg(identifier).arg(root);

    let output = command.output().await?;

    // Exit code 1 means no match. Anything above that is a real failure.
    if !output.status.success() && output.status.code() != Some(1) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(std::io::Error::other(format!(
            "grep failed: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_grep_output(&stdout, identifier, root))
}

static MATCH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?):(\d+):(.*)$").unwrap());
static CONTEXT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)-(\d+)-(.*)$").unwrap());

struct GrepRecord<'a> {
    file: &'a str,
    line_number: u32,
    content: &'a str,
    is_match: bool,
}

fn parse_grep_line<'a>(
    line: &'a str,
    identifier: &str,
    window_file: Option<&str>,
) -> Option<GrepRecord<'a>> {
    let as_match = MATCH_LINE.captures(line).and_then(|caps| {
        let content = caps.get(3)?.as_str();
        Some(GrepRecord {
            file: caps.get(1)?.as_str(),
            line_number: caps.get(2)?.as_str().parse().ok()?,
            content,
            is_match: content.contains(identifier),
        })
    });
    let as_context = CONTEXT_LINE.captures(line).and_then(|caps| {
        Some(GrepRecord {
            file: caps.get(1)?.as_str(),
            line_number: caps.get(2)?.as_str().parse().ok()?,
            content: caps.get(3)?.as_str(),
            is_match: false,
        })
    });

    match (as_match, as_context) {
        // A context line whose content carries `:<digits>:` parses both
        // ways. The file already established for this window decides which
        // reading is right.
        (Some(m), Some(c)) => match window_file {
            Some(file) if m.file != file && c.file == file => Some(c),
            _ => Some(m),
        },
        (m, c) => m.or(c),
    }
}

/// Group grep output into occurrences: `--` lines separate windows, every
/// other line is one record. The occurrence is anchored at its first match
/// line.
fn parse_grep_output(stdout: &str, identifier: &str, root: &Path) -> Vec<Occurrence> {
    let root_prefix = format!("{}/", root.display());
    let mut occurrences = Vec::new();
    let mut window: Vec<GrepRecord<'_>> = Vec::new();

    for line in stdout.lines() {
        if line == "--" {
            occurrences.extend(occurrence_from(&window, &root_prefix));
            window.clear();
            continue;
        }
        let window_file = window.first().map(|r| r.file);
        if let Some(record) = parse_grep_line(line, identifier, window_file) {
            window.push(record);
        }
    }
    occurrences.extend(occurrence_from(&window, &root_prefix));

    occurrences
}

fn occurrence_from(window: &[GrepRecord<'_>], root_prefix: &str) -> Option<Occurrence> {
    let first = window.first()?;
    let anchor = window
        .iter()
        .find(|r| r.is_match)
        .map_or(first.line_number, |r| r.line_number);
    Some(Occurrence {
        file_path: first
            .file
            .strip_prefix(root_prefix)
            .unwrap_or(first.file)
            .to_string(),
        line_number: anchor,
        context_text: window
            .iter()
            .map(|r| r.content)
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_match_and_context_records() {
        let m = parse_grep_line("src/lib.rs:42:fn target() {", "target", None).unwrap();
        assert_eq!(m.file, "src/lib.rs");
        assert_eq!(m.line_number, 42);
        assert!(m.is_match);

        let c = parse_grep_line("src/lib.rs-41-// docs", "target", None).unwrap();
        assert_eq!(c.line_number, 41);
        assert!(!c.is_match);

        assert!(parse_grep_line("not a grep record", "target", None).is_none());
    }

    #[test]
    fn colon_record_without_identifier_is_not_a_match_anchor() {
        let r = parse_grep_line("src/lib.rs:10:let other = 1;", "target", None).unwrap();
        assert!(!r.is_match);
    }

    #[test]
    fn ambiguous_context_line_keeps_the_window_file() {
        // A context line whose content holds `:<digits>:` (here a timestamp)
        // also matches the colon form. The established window file picks the
        // dash reading instead of splitting the path at the timestamp.
        let stdout = "log.rs:2:target();\nlog.rs-3-at 12:34:56\n";
        let occ = parse_grep_output(stdout, "target", Path::new("."));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].file_path, "log.rs");
        assert_eq!(occ[0].line_number, 2);
        assert_eq!(occ[0].context_text, "target();\nat 12:34:56");
    }

    #[test]
    fn groups_split_on_separator() {
        let stdout = "\
a.rs-1-before
a.rs:2:fn target() {}
a.rs-3-after
--
b.rs-7-setup
b.rs:8:target();
";
        let occ = parse_grep_output(stdout, "target", Path::new("."));
        assert_eq!(occ.len(), 2);
        assert_eq!(occ[0].file_path, "a.rs");
        assert_eq!(occ[0].line_number, 2);
        assert_eq!(occ[0].context_text, "before\nfn target() {}\nafter");
        assert_eq!(occ[1].file_path, "b.rs");
        assert_eq!(occ[1].line_number, 8);
    }

    #[test]
    fn overlapping_windows_stay_one_occurrence() {
        // grep emits adjacent matches in a single window without a separator.
        let stdout = "\
a.rs:5:target();
a.rs-6-between
a.rs:7:target();
";
        let occ = parse_grep_output(stdout, "target", Path::new("."));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].line_number, 5);
        assert!(occ[0].context_text.contains("between"));
    }

    #[test]
    fn root_prefix_stripped_from_paths() {
        let stdout = "/repo/src/a.rs:3:target()\n";
        let occ = parse_grep_output(stdout, "target", Path::new("/repo"));
        assert_eq!(occ[0].file_path, "src/a.rs");
    }

    #[test]
    fn empty_output_yields_no_occurrences() {
        assert!(parse_grep_output("", "target", Path::new(".")).is_empty());
    }

    #[tokio::test]
    async fn locate_finds_identifier_in_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/lib.rs"),
            "// header\nfn special_marker() {}\n// footer\n",
        )
        .unwrap();

        let occ = locate("special_marker", dir.path(), ContextWindow::default())
            .await
            .unwrap();
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].file_path, "src/lib.rs");
        assert_eq!(occ[0].line_number, 2);
        assert!(occ[0].context_text.contains("header"));
        assert!(occ[0].context_text.contains("footer"));
    }

    #[tokio::test]
    async fn locate_absent_identifier_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "nothing here\n").unwrap();

        let occ = locate("does_not_appear_anywhere", dir.path(), ContextWindow::default())
            .await
            .unwrap();
        assert!(occ.is_empty());
    }

    #[tokio::test]
    async fn locate_skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(
            dir.path().join("node_modules/dep.js"),
            "function special_marker() {}\n",
        )
        .unwrap();

        let occ = locate("special_marker", dir.path(), ContextWindow::default())
            .await
            .unwrap();
        assert!(occ.is_empty());
    }
}
