use std::path::Path;

use crate::index::ModifiedLinesIndex;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffParseError {
    #[error("malformed hunk header at diff line {line_no}: {line}")]
    MalformedHunkHeader { line_no: usize, line: String },

    #[error(
        "hunk line count exceeded at diff line {line_no} in '{path}': more {side} lines than the hunk header declares"
    )]
    LineCountOverflow {
        line_no: usize,
        path: String,
        side: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    old_len: u32,
    new_start: u32,
    new_len: u32,
}

/// Running state of the hunk being read.
#[derive(Debug, Clone, Copy)]
struct OpenHunk {
    new_line_no: u32,
    old_remaining: u32,
    new_remaining: u32,
}

impl OpenHunk {
    fn is_exhausted(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

/// Parse a unified diff (git-style) into the set of added lines per file.
///
/// Line numbers refer to the new side of the diff. Context lines advance the
/// new-file counter, removed lines do not.
pub fn parse_unified_diff(diff_text: &str) -> Result<ModifiedLinesIndex, DiffParseError> {
    let mut index = ModifiedLinesIndex::new();
    let mut current_path: Option<String> = None;
    let mut hunk: Option<OpenHunk> = None;
    // Set once a hunk has consumed every line its header declared.
    let mut closed_hunk_path: Option<String> = None;

    for (i, raw) in diff_text.lines().enumerate() {
        let line_no = i + 1;

        if raw.starts_with("diff --git ") {
            hunk = None;
            closed_hunk_path = None;
            // Example: diff --git a/foo b/foo
            current_path = parse_diff_git_line(raw);
            continue;
        }

        if raw.starts_with("@@") {
            let hdr = parse_hunk_header(raw).ok_or_else(|| DiffParseError::MalformedHunkHeader {
                line_no,
                line: raw.to_string(),
            })?;
            hunk = Some(OpenHunk {
                new_line_no: hdr.new_start,
                old_remaining: hdr.old_len,
                new_remaining: hdr.new_len,
            });
            closed_hunk_path = None;
            continue;
        }

        let Some(open) = hunk.as_mut() else {
            if let (Some(path), Some(side)) = (closed_hunk_path.as_deref(), surplus_side(raw)) {
                return Err(DiffParseError::LineCountOverflow {
                    line_no,
                    path: path.to_string(),
                    side,
                });
            }
            read_file_header(raw, &mut current_path, &mut index);
            continue;
        };

        let Some(path) = current_path.as_deref() else {
            continue;
        };

        if raw.starts_with('\\') {
            // "\ No newline at end of file"
            continue;
        }

        match raw.as_bytes().first().copied() {
            Some(b'+') => {
                take_new(open, path, line_no)?;
                index.record(path, open.new_line_no);
                open.new_line_no = open.new_line_no.saturating_add(1);
            }
            Some(b'-') => {
                take_old(open, path, line_no)?;
            }
            Some(b' ') => {
                take_old(open, path, line_no)?;
                take_new(open, path, line_no)?;
                open.new_line_no = open.new_line_no.saturating_add(1);
            }
            // Some tools strip the single space of an empty context line.
            None if open.old_remaining > 0 && open.new_remaining > 0 => {
                open.old_remaining -= 1;
                open.new_remaining -= 1;
                open.new_line_no = open.new_line_no.saturating_add(1);
            }
            _ => {}
        }

        if open.is_exhausted() {
            hunk = None;
            closed_hunk_path = Some(path.to_string());
        }
    }

    Ok(index)
}

fn take_old(open: &mut OpenHunk, path: &str, line_no: usize) -> Result<(), DiffParseError> {
    open.old_remaining = open
        .old_remaining
        .checked_sub(1)
        .ok_or_else(|| DiffParseError::LineCountOverflow {
            line_no,
            path: path.to_string(),
            side: "old",
        })?;
    Ok(())
}

fn take_new(open: &mut OpenHunk, path: &str, line_no: usize) -> Result<(), DiffParseError> {
    open.new_remaining = open
        .new_remaining
        .checked_sub(1)
        .ok_or_else(|| DiffParseError::LineCountOverflow {
            line_no,
            path: path.to_string(),
            side: "new",
        })?;
    Ok(())
}

/// Which side a hunk body line would consume, for lines seen after the hunk closed.
fn surplus_side(raw: &str) -> Option<&'static str> {
    // "-- " separates a format-patch signature from the diff.
    if raw == "-- " || raw == "--" {
        return None;
    }
    match raw.as_bytes().first().copied() {
        Some(b'+') if !raw.starts_with("+++ ") => Some("new"),
        Some(b'-') if !raw.starts_with("--- ") => Some("old"),
        Some(b' ') => Some("new"),
        _ => None,
    }
}

/// Handles the per-file header lines that appear between hunks.
fn read_file_header(raw: &str, current_path: &mut Option<String>, index: &mut ModifiedLinesIndex) {
    if let Some(rest) = raw.strip_prefix("+++ ") {
        // Prefer the +++ path if present; /dev/null means the file was deleted.
        *current_path = parse_header_path(rest);
        return;
    }

    if let Some(rest) = raw.strip_prefix("rename to ") {
        *current_path = strip_prefix_path(rest);
        return;
    }

    if raw.starts_with("Binary files ") {
        if let Some(p) = parse_binary_files_line(raw) {
            index.touch_file(&p);
        }
        return;
    }

    if raw.starts_with("GIT binary patch") {
        if let Some(p) = current_path.as_deref() {
            index.touch_file(p);
        }
    }
}

fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    // Formats:
    // @@ -1,2 +3,4 @@
    // @@ -1 +3 @@ fn section()
    let mut parts = line.split_whitespace();
    if parts.next()? != "@@" {
        return None;
    }
    let (_, old_len) = parse_range(parts.next()?.strip_prefix('-')?)?;
    let (new_start, new_len) = parse_range(parts.next()?.strip_prefix('+')?)?;
    if parts.next()? != "@@" {
        return None;
    }

    // Line numbers are 1-based; start 0 is only valid for an empty side.
    if new_start == 0 && new_len > 0 {
        return None;
    }

    Some(HunkHeader {
        old_len,
        new_start,
        new_len,
    })
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    // "3,4" or "3" (length defaults to 1)
    let mut it = range.splitn(2, ',');
    let start: u32 = it.next()?.parse().ok()?;
    let len: u32 = match it.next() {
        Some(l) => l.parse().ok()?,
        None => 1,
    };
    Some((start, len))
}

fn parse_diff_git_line(line: &str) -> Option<String> {
    // diff --git a/foo b/foo
    let mut it = line.split_whitespace();
    if it.next()? != "diff" {
        return None;
    }
    if it.next()? != "--git" {
        return None;
    }
    let _a = it.next()?;
    let b = it.next()?;
    strip_prefix_path(b)
}

fn parse_header_path(rest: &str) -> Option<String> {
    let first = rest.split('\t').next().unwrap_or(rest);
    if first.trim() == "/dev/null" {
        return None;
    }
    strip_prefix_path(first)
}

fn parse_binary_files_line(line: &str) -> Option<String> {
    // Binary files a/foo.png and b/foo.png differ
    let rest = line.strip_prefix("Binary files ")?;
    let rest = rest.strip_suffix(" differ")?;
    let (_, new_side) = rest.rsplit_once(" and ")?;
    if new_side.trim() == "/dev/null" {
        return None;
    }
    strip_prefix_path(new_side)
}

fn strip_prefix_path(p: &str) -> Option<String> {
    // strips a/ or b/
    let p = p.trim();
    let p = p.strip_prefix("a/").or_else(|| p.strip_prefix("b/")).unwrap_or(p);

    // Normalize to forward slashes so paths compare across platforms.
    let normalized = Path::new(p)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
        .replace('\\', "/");

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(index: &ModifiedLinesIndex, path: &str) -> Vec<u32> {
        index
            .lines_for(path)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    #[test]
    fn records_added_lines_after_context() {
        let diff = "\
diff --git a/Foo.java b/Foo.java
--- a/Foo.java
+++ b/Foo.java
@@ -10,2 +10,3 @@
 context
+added1
+added2
";

        let index = parse_unified_diff(diff).unwrap();
        assert_eq!(index.paths().collect::<Vec<_>>(), vec!["Foo.java"]);
        assert_eq!(lines_of(&index, "Foo.java"), vec![11, 12]);
    }

    #[test]
    fn removed_lines_do_not_advance_new_counter() {
        let diff = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@
 fn a() {}
-fn b() { 1 }
+fn b() { 2 }
 fn c() {}
";

        let index = parse_unified_diff(diff).unwrap();
        assert_eq!(lines_of(&index, "src/lib.rs"), vec![2]);
    }

    #[test]
    fn multiple_hunks_accumulate() {
        let diff = "\
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1,1 +1,2 @@
 one
+two
@@ -10 +11,2 @@
+eleven
 twelve
";

        let index = parse_unified_diff(diff).unwrap();
        assert_eq!(lines_of(&index, "a.txt"), vec![2, 11]);
    }

    #[test]
    fn binary_files_are_present_without_lines() {
        let diff = "\
diff --git a/img/logo.png b/img/logo.png
index 0000000..1111111 100644
Binary files a/img/logo.png and b/img/logo.png differ
";

        let index = parse_unified_diff(diff).unwrap();
        assert!(index.contains_file("img/logo.png"));
        assert!(lines_of(&index, "img/logo.png").is_empty());
    }

    #[test]
    fn renamed_files_use_new_path() {
        let diff = "\
diff --git a/old/Name.java b/new/Name.java
similarity index 90%
rename from old/Name.java
rename to new/Name.java
--- a/old/Name.java
+++ b/new/Name.java
@@ -1 +1,2 @@
 class Name {}
+// note
";

        let index = parse_unified_diff(diff).unwrap();
        assert_eq!(lines_of(&index, "new/Name.java"), vec![2]);
        assert!(!index.contains_file("old/Name.java"));
    }

    #[test]
    fn deleted_files_contribute_nothing() {
        let diff = "\
diff --git a/gone.txt b/gone.txt
deleted file mode 100644
--- a/gone.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
";

        let index = parse_unified_diff(diff).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn added_line_that_looks_like_a_header_is_content() {
        let diff = "\
diff --git a/notes.md b/notes.md
--- a/notes.md
+++ b/notes.md
@@ -0,0 +1,2 @@
+++ not a header
+--- nor this
";

        let index = parse_unified_diff(diff).unwrap();
        assert_eq!(lines_of(&index, "notes.md"), vec![1, 2]);
    }

    #[test]
    fn malformed_hunk_header_is_fatal() {
        let diff = "\
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -x,1 +1,1 @@
+a
";

        let err = parse_unified_diff(diff).unwrap_err();
        assert_eq!(
            err,
            DiffParseError::MalformedHunkHeader {
                line_no: 4,
                line: "@@ -x,1 +1,1 @@".to_string(),
            }
        );
    }

    #[test]
    fn negative_start_is_malformed() {
        let diff = "\
diff --git a/a.txt b/a.txt
@@ -1,1 +-3,1 @@
+a
";
        assert!(matches!(
            parse_unified_diff(diff),
            Err(DiffParseError::MalformedHunkHeader { line_no: 2, .. })
        ));
    }

    #[test]
    fn more_added_lines_than_declared_is_fatal() {
        let diff = "\
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1,1 +1,1 @@
-old
+new
+surplus
";

        let err = parse_unified_diff(diff).unwrap_err();
        assert!(matches!(err, DiffParseError::LineCountOverflow { .. }));
    }

    #[test]
    fn overflow_is_reported_while_hunk_is_open() {
        let diff = "\
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1,2 +1,1 @@
+new
-old
 ctx
";

        let err = parse_unified_diff(diff).unwrap_err();
        assert_eq!(
            err,
            DiffParseError::LineCountOverflow {
                line_no: 7,
                path: "a.txt".to_string(),
                side: "new",
            }
        );
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let diff = "\
diff --git a/a.txt b/a.txt
--- a/a.txt
+++ b/a.txt
@@ -1 +1 @@
-a
\\ No newline at end of file
+b
\\ No newline at end of file
";

        let index = parse_unified_diff(diff).unwrap();
        assert_eq!(lines_of(&index, "a.txt"), vec![1]);
    }
}
