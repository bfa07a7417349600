use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{FileDiff, Hunk, Line, LineKind};

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@@ -(\d+),?\d* \+(\d+),?\d* @@").expect("hunk header regex"));

/// Parses a unified-diff patch into per-file hunks.
///
/// File boundaries are `diff --git` lines, filenames come from `+++ b/` and
/// hunks from `@@` headers. A malformed hunk header drops that hunk's body;
/// parsing itself never fails, callers just get whatever was recognisable.
pub fn parse(patch: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut old_cursor = 0u32;
    let mut new_cursor = 0u32;
    let mut in_hunk = false;

    for raw in patch.lines() {
        if raw.starts_with("diff --git") {
            files.push(FileDiff {
                filename: String::new(),
                hunks: Vec::new(),
            });
            in_hunk = false;
            continue;
        }

        if let Some(name) = raw.strip_prefix("+++ b/") {
            if let Some(current) = files.last_mut() {
                current.filename = name.to_string();
            }
            continue;
        }

        if raw.starts_with("--- ") {
            continue;
        }

        if raw.starts_with("@@") {
            let Some(current) = files.last_mut() else {
                continue;
            };
            match parse_hunk_header(raw) {
                Some(hunk) => {
                    old_cursor = hunk.old_start;
                    new_cursor = hunk.new_start;
                    current.hunks.push(hunk);
                    in_hunk = true;
                }
                None => in_hunk = false,
            }
            continue;
        }

        if in_hunk {
            if let Some(hunk) = files.last_mut().and_then(|f| f.hunks.last_mut()) {
                let line = parse_line(raw, &mut old_cursor, &mut new_cursor);
                hunk.lines.push(line);
            }
        }
    }

    files
}

fn parse_hunk_header(raw: &str) -> Option<Hunk> {
    let captures = HUNK_HEADER.captures(raw)?;
    let old_start = captures.get(1)?.as_str().parse().ok()?;
    let new_start = captures.get(2)?.as_str().parse().ok()?;

    Some(Hunk {
        old_start,
        new_start,
        lines: Vec::new(),
    })
}

fn parse_line(raw: &str, old_cursor: &mut u32, new_cursor: &mut u32) -> Line {
    let Some(marker) = raw.chars().next() else {
        return Line {
            kind: LineKind::Context,
            content: String::new(),
            old_number: None,
            new_number: None,
        };
    };

    match marker {
        '+' => {
            let line = Line {
                kind: LineKind::Added,
                content: raw[1..].to_string(),
                old_number: None,
                new_number: Some(*new_cursor),
            };
            *new_cursor += 1;
            line
        }
        '-' => {
            let line = Line {
                kind: LineKind::Removed,
                content: raw[1..].to_string(),
                old_number: Some(*old_cursor),
                new_number: None,
            };
            *old_cursor += 1;
            line
        }
        _ => {
            let line = Line {
                kind: LineKind::Context,
                content: raw[1..].to_string(),
                old_number: Some(*old_cursor),
                new_number: Some(*new_cursor),
            };
            *old_cursor += 1;
            *new_cursor += 1;
            line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "diff --git a/main.go b/main.go\n\
--- a/main.go\n\
+++ b/main.go\n\
@@ -1,2 +1,3 @@\n \
package main\n\
-func old() {}\n\
+func renamed() {}\n\
+func extra() {}\n";

    #[test]
    fn parses_filename_and_hunk() {
        let files = parse(PATCH);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "main.go");
        assert_eq!(files[0].hunks.len(), 1);
        assert_eq!(files[0].hunks[0].old_start, 1);
        assert_eq!(files[0].hunks[0].new_start, 1);
        assert_eq!(files[0].hunks[0].lines.len(), 4);
    }

    #[test]
    fn numbers_lines_per_unified_diff_semantics() {
        let files = parse(PATCH);
        let lines = &files[0].hunks[0].lines;

        assert_eq!(lines[0].kind, LineKind::Context);
        assert_eq!(lines[0].old_number, Some(1));
        assert_eq!(lines[0].new_number, Some(1));

        assert_eq!(lines[1].kind, LineKind::Removed);
        assert_eq!(lines[1].old_number, Some(2));
        assert_eq!(lines[1].new_number, None);

        assert_eq!(lines[2].kind, LineKind::Added);
        assert_eq!(lines[2].old_number, None);
        assert_eq!(lines[2].new_number, Some(2));

        assert_eq!(lines[3].kind, LineKind::Added);
        assert_eq!(lines[3].new_number, Some(3));
    }

    #[test]
    fn splits_multiple_files() {
        let patch = format!(
            "{PATCH}diff --git a/util.py b/util.py\n--- a/util.py\n+++ b/util.py\n@@ -3 +3 @@\n-x = 1\n+x = 2\n"
        );
        let files = parse(&patch);
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].filename, "util.py");
        assert_eq!(files[1].hunks[0].old_start, 3);
        assert_eq!(files[1].hunks[0].lines.len(), 2);
    }

    #[test]
    fn malformed_hunk_header_drops_the_hunk() {
        let patch = "diff --git a/a.go b/a.go\n\
+++ b/a.go\n\
@@ garbage @@\n\
+ignored\n\
@@ -1 +1 @@\n\
+kept\n";
        let files = parse(patch);
        assert_eq!(files[0].hunks.len(), 1);
        assert_eq!(files[0].hunks[0].lines.len(), 1);
        assert_eq!(files[0].hunks[0].lines[0].content, "kept");
    }

    #[test]
    fn patch_without_file_marker_yields_nothing() {
        let files = parse("@@ -1 +1 @@\n+orphan\n");
        assert!(files.is_empty());
    }
}
