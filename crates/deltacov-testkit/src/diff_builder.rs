//! Fluent builders for git-style unified diffs.
//!
//! Hunk headers are derived from the body lines, so every diff a builder
//! produces is consistent with its own line counts. The builder also knows
//! which new-side lines it added, which makes it usable as a test oracle.
//!
//! ```rust
//! use deltacov_testkit::diff_builder::DiffBuilder;
//!
//! let diff = DiffBuilder::new()
//!     .file("src/main/java/com/acme/Foo.java")
//!         .hunk_at(10, 10)
//!             .context("int a = 1;")
//!             .add_line("int b = 2;")
//!             .done()
//!         .done();
//!
//! assert!(diff.build().contains("@@ -10,1 +10,2 @@"));
//! assert_eq!(diff.expected_lines()["src/main/java/com/acme/Foo.java"].len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::arb::{MAX_FILES, MAX_HUNKS_PER_FILE, MAX_LINE_LENGTH, MAX_LINES_PER_HUNK};

#[derive(Debug, Clone, Default)]
pub struct DiffBuilder {
    files: Vec<FileBuilder>,
}

impl DiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a file section.
    ///
    /// # Panics
    ///
    /// Panics if `MAX_FILES` would be exceeded.
    pub fn file(self, path: &str) -> FileInProgress {
        assert!(
            self.files.len() < MAX_FILES,
            "Cannot add more than {MAX_FILES} files to a diff"
        );
        FileInProgress {
            diff: self,
            file: FileBuilder::new(path),
        }
    }

    pub fn add_file(mut self, file: FileBuilder) -> Self {
        assert!(
            self.files.len() < MAX_FILES,
            "Cannot add more than {MAX_FILES} files to a diff"
        );
        self.files.push(file);
        self
    }

    pub fn build(&self) -> String {
        let mut out = self
            .files
            .iter()
            .map(FileBuilder::build)
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        out
    }

    /// New-side line numbers the parser should report per file.
    ///
    /// Deleted files are absent; binary files map to an empty set.
    pub fn expected_lines(&self) -> BTreeMap<String, BTreeSet<u32>> {
        let mut out: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        for file in &self.files {
            if file.kind == FileKind::Deleted {
                continue;
            }
            out.entry(file.path.clone())
                .or_default()
                .extend(file.added_lines());
        }
        out
    }
}

#[derive(Debug)]
pub struct FileInProgress {
    diff: DiffBuilder,
    file: FileBuilder,
}

impl FileInProgress {
    /// Open a hunk whose old side starts at `old_start` and new side at `new_start`.
    pub fn hunk_at(self, old_start: u32, new_start: u32) -> HunkInProgress {
        HunkInProgress {
            file: self,
            hunk: HunkBuilder::new(old_start, new_start),
        }
    }

    pub fn binary(mut self) -> Self {
        self.file = self.file.binary();
        self
    }

    pub fn deleted(mut self) -> Self {
        self.file = self.file.deleted();
        self
    }

    pub fn new_file(mut self) -> Self {
        self.file = self.file.new_file();
        self
    }

    pub fn rename_from(mut self, old_path: &str) -> Self {
        self.file = self.file.rename_from(old_path);
        self
    }

    pub fn done(mut self) -> DiffBuilder {
        self.diff.files.push(self.file);
        self.diff
    }
}

#[derive(Debug)]
pub struct HunkInProgress {
    file: FileInProgress,
    hunk: HunkBuilder,
}

impl HunkInProgress {
    pub fn context(mut self, content: &str) -> Self {
        self.hunk = self.hunk.context(content);
        self
    }

    pub fn add_line(mut self, content: &str) -> Self {
        self.hunk = self.hunk.add_line(content);
        self
    }

    pub fn add_lines(mut self, lines: &[&str]) -> Self {
        self.hunk = self.hunk.add_lines(lines);
        self
    }

    pub fn remove(mut self, content: &str) -> Self {
        self.hunk = self.hunk.remove(content);
        self
    }

    pub fn done(mut self) -> FileInProgress {
        self.file.file = self.file.file.add_hunk(self.hunk);
        self.file
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Modified,
    New,
    Deleted,
    Binary,
}

/// One file section of a diff.
#[derive(Debug, Clone)]
pub struct FileBuilder {
    path: String,
    old_path: Option<String>,
    kind: FileKind,
    hunks: Vec<HunkBuilder>,
}

impl FileBuilder {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            old_path: None,
            kind: FileKind::Modified,
            hunks: Vec::new(),
        }
    }

    pub fn binary(mut self) -> Self {
        self.kind = FileKind::Binary;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.kind = FileKind::Deleted;
        self
    }

    pub fn new_file(mut self) -> Self {
        self.kind = FileKind::New;
        self
    }

    pub fn rename_from(mut self, old_path: &str) -> Self {
        self.old_path = Some(old_path.to_string());
        self
    }

    /// # Panics
    ///
    /// Panics if `MAX_HUNKS_PER_FILE` would be exceeded.
    pub fn add_hunk(mut self, hunk: HunkBuilder) -> Self {
        assert!(
            self.hunks.len() < MAX_HUNKS_PER_FILE,
            "Cannot add more than {MAX_HUNKS_PER_FILE} hunks to a file"
        );
        self.hunks.push(hunk);
        self
    }

    fn added_lines(&self) -> BTreeSet<u32> {
        if self.kind == FileKind::Binary {
            return BTreeSet::new();
        }
        self.hunks.iter().flat_map(HunkBuilder::added_lines).collect()
    }

    pub fn build(&self) -> String {
        let old = self.old_path.as_deref().unwrap_or(&self.path);
        let new = &self.path;
        let mut lines = vec![format!("diff --git a/{old} b/{new}")];

        match self.kind {
            FileKind::Binary => {
                lines.push("index 1111111..2222222 100644".to_string());
                lines.push(format!("Binary files a/{old} and b/{new} differ"));
                return lines.join("\n");
            }
            FileKind::Deleted => {
                lines.push("deleted file mode 100644".to_string());
                lines.push("index 1111111..0000000".to_string());
                lines.push(format!("--- a/{old}"));
                lines.push("+++ /dev/null".to_string());
            }
            FileKind::New => {
                lines.push("new file mode 100644".to_string());
                lines.push("index 0000000..1111111".to_string());
                lines.push("--- /dev/null".to_string());
                lines.push(format!("+++ b/{new}"));
            }
            FileKind::Modified => {
                if self.old_path.is_some() {
                    lines.push("similarity index 90%".to_string());
                    lines.push(format!("rename from {old}"));
                    lines.push(format!("rename to {new}"));
                }
                lines.push("index 1111111..2222222 100644".to_string());
                lines.push(format!("--- a/{old}"));
                lines.push(format!("+++ b/{new}"));
            }
        }

        lines.extend(self.hunks.iter().map(HunkBuilder::build));
        lines.join("\n")
    }
}

#[derive(Debug, Clone)]
enum HunkLine {
    Context(String),
    Add(String),
    Remove(String),
}

/// A hunk whose header counts are derived from its body.
#[derive(Debug, Clone)]
pub struct HunkBuilder {
    old_start: u32,
    new_start: u32,
    lines: Vec<HunkLine>,
}

impl HunkBuilder {
    pub fn new(old_start: u32, new_start: u32) -> Self {
        Self {
            old_start,
            new_start,
            lines: Vec::new(),
        }
    }

    pub fn context(self, content: &str) -> Self {
        self.push(HunkLine::Context(content.to_string()))
    }

    pub fn add_line(self, content: &str) -> Self {
        self.push(HunkLine::Add(content.to_string()))
    }

    pub fn add_lines(mut self, lines: &[&str]) -> Self {
        for line in lines {
            self = self.add_line(line);
        }
        self
    }

    pub fn remove(self, content: &str) -> Self {
        self.push(HunkLine::Remove(content.to_string()))
    }

    fn push(mut self, line: HunkLine) -> Self {
        let content = match &line {
            HunkLine::Context(c) | HunkLine::Add(c) | HunkLine::Remove(c) => c,
        };
        assert!(
            self.lines.len() < MAX_LINES_PER_HUNK,
            "Cannot add more than {MAX_LINES_PER_HUNK} lines to a hunk"
        );
        assert!(
            content.len() <= MAX_LINE_LENGTH,
            "Line content cannot exceed {MAX_LINE_LENGTH} bytes"
        );
        self.lines.push(line);
        self
    }

    fn old_len(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| matches!(l, HunkLine::Context(_) | HunkLine::Remove(_)))
            .count() as u32
    }

    fn new_len(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| matches!(l, HunkLine::Context(_) | HunkLine::Add(_)))
            .count() as u32
    }

    fn added_lines(&self) -> Vec<u32> {
        let mut cursor = self.new_start;
        let mut out = Vec::new();
        for line in &self.lines {
            match line {
                HunkLine::Context(_) => cursor += 1,
                HunkLine::Add(_) => {
                    out.push(cursor);
                    cursor += 1;
                }
                HunkLine::Remove(_) => {}
            }
        }
        out
    }

    pub fn build(&self) -> String {
        let mut out = vec![format!(
            "@@ -{},{} +{},{} @@",
            self.old_start,
            self.old_len(),
            self.new_start,
            self.new_len()
        )];
        out.extend(self.lines.iter().map(|line| match line {
            HunkLine::Context(c) => format!(" {c}"),
            HunkLine::Add(c) => format!("+{c}"),
            HunkLine::Remove(c) => format!("-{c}"),
        }));
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_counts_follow_body() {
        let diff = DiffBuilder::new()
            .file("src/Foo.java")
            .hunk_at(10, 10)
            .context("a")
            .remove("b")
            .add_line("c")
            .add_line("d")
            .done()
            .done();

        let text = diff.build();
        assert!(text.contains("@@ -10,2 +10,3 @@"));
        assert!(text.contains("diff --git a/src/Foo.java b/src/Foo.java"));
        assert_eq!(
            diff.expected_lines()["src/Foo.java"].iter().copied().collect::<Vec<_>>(),
            vec![11, 12]
        );
    }

    #[test]
    fn deleted_files_expect_nothing() {
        let diff = DiffBuilder::new()
            .file("gone/Old.java")
            .deleted()
            .hunk_at(1, 0)
            .remove("class Old {}")
            .done()
            .done();

        assert!(diff.build().contains("+++ /dev/null"));
        assert!(diff.expected_lines().is_empty());
    }

    #[test]
    fn binary_files_expect_empty_set() {
        let diff = DiffBuilder::new().file("logo.png").binary().done();

        assert!(diff.build().contains("Binary files a/logo.png and b/logo.png differ"));
        assert_eq!(diff.expected_lines().get("logo.png"), Some(&BTreeSet::new()));
    }

    #[test]
    fn renamed_files_report_new_path() {
        let diff = DiffBuilder::new()
            .file("src/New.java")
            .rename_from("src/Old.java")
            .hunk_at(1, 1)
            .context("class X {")
            .add_line("  int y;")
            .done()
            .done();

        let text = diff.build();
        assert!(text.contains("rename from src/Old.java"));
        assert!(text.contains("rename to src/New.java"));
        assert!(diff.expected_lines().contains_key("src/New.java"));
    }
}
