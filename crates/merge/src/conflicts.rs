//! Conflict marker handling
//!
//! Git-compatible inline markers, readable by every standard merge tool.
//! Hosts use the detection helpers to verify resolution before re-running a
//! sync; the span parser feeds [`MergeConflict`] records.

use gs_core::types::ConflictSpan;
use std::path::Path;

pub const CONFLICT_MARKER_START: &str = "<<<<<<<";
pub const CONFLICT_MARKER_BASE: &str = "|||||||";
pub const CONFLICT_MARKER_SEPARATOR: &str = "=======";
pub const CONFLICT_MARKER_END: &str = ">>>>>>>";

/// Whether text still contains conflict markers
pub fn has_conflict_markers(content: &str) -> bool {
    let mut has_start = false;
    for line in content.lines() {
        if line.starts_with(CONFLICT_MARKER_START) {
            has_start = true;
        } else if has_start && line.starts_with(CONFLICT_MARKER_END) {
            return true;
        }
    }
    false
}

/// Whether a file on disk still contains conflict markers
///
/// A missing file has nothing left to resolve.
pub fn file_has_conflict_markers(path: &Path) -> std::io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(has_conflict_markers(&content))
}

/// Extract every conflict region from marker-laden text
pub fn parse_conflict_spans(content: &str) -> Vec<ConflictSpan> {
    let lines: Vec<&str> = content.lines().collect();
    let mut spans = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        if !lines[i].starts_with(CONFLICT_MARKER_START) {
            i += 1;
            continue;
        }

        let start_line = i + 1; // 1-indexed
        let mut local = Vec::new();
        let mut base: Option<Vec<&str>> = None;
        let mut remote = Vec::new();
        let mut section = Section::Local;
        let mut closed = false;

        i += 1;
        while i < lines.len() {
            let line = lines[i];
            if line.starts_with(CONFLICT_MARKER_BASE) {
                section = Section::Base;
                base = Some(Vec::new());
            } else if line.starts_with(CONFLICT_MARKER_SEPARATOR) {
                section = Section::Remote;
            } else if line.starts_with(CONFLICT_MARKER_END) {
                spans.push(ConflictSpan {
                    start_line,
                    end_line: i + 1,
                    local: local.join("\n"),
                    base: base.map(|b| b.join("\n")),
                    remote: remote.join("\n"),
                });
                closed = true;
                break;
            } else {
                match section {
                    Section::Local => local.push(line),
                    Section::Base => {
                        if let Some(ref mut b) = base {
                            b.push(line);
                        }
                    }
                    Section::Remote => remote.push(line),
                }
            }
            i += 1;
        }

        if !closed {
            break; // Truncated region; nothing more to parse
        }
        i += 1;
    }

    spans
}

enum Section {
    Local,
    Base,
    Remote,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFLICTED: &str = "intro\n<<<<<<< local\nmine\n||||||| base\noriginal\n=======\ntheirs\n>>>>>>> remote\noutro\n";

    #[test]
    fn test_detection() {
        assert!(has_conflict_markers(CONFLICTED));
        assert!(!has_conflict_markers("plain content\n"));
        // A lone separator line is not a conflict
        assert!(!has_conflict_markers("=======\n"));
    }

    #[test]
    fn test_parse_spans() {
        let spans = parse_conflict_spans(CONFLICTED);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_line, 2);
        assert_eq!(spans[0].end_line, 8);
        assert_eq!(spans[0].local, "mine");
        assert_eq!(spans[0].base.as_deref(), Some("original"));
        assert_eq!(spans[0].remote, "theirs");
    }

    #[test]
    fn test_parse_without_base_section() {
        let text = "<<<<<<< local\na\n=======\nb\n>>>>>>> remote\n";
        let spans = parse_conflict_spans(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].base, None);
        assert_eq!(spans[0].local, "a");
        assert_eq!(spans[0].remote, "b");
    }

    #[test]
    fn test_multiple_regions() {
        let text = "<<<<<<< local\na\n=======\nb\n>>>>>>> remote\nmiddle\n<<<<<<< local\nc\n=======\nd\n>>>>>>> remote\n";
        assert_eq!(parse_conflict_spans(text).len(), 2);
    }

    #[test]
    fn test_file_helper() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f.js");
        assert!(!file_has_conflict_markers(&path).unwrap());
        std::fs::write(&path, CONFLICTED).unwrap();
        assert!(file_has_conflict_markers(&path).unwrap());
    }
}
