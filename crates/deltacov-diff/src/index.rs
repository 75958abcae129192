use std::collections::{BTreeMap, BTreeSet};

/// Changed lines per file, keyed by repo-relative path with `/` separators.
///
/// Files that appear in the diff without line changes (binary files) map to
/// an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModifiedLinesIndex {
    files: BTreeMap<String, BTreeSet<u32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    pub files: u32,
    pub lines: u32,
}

impl ModifiedLinesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn touch_file(&mut self, path: &str) {
        self.files.entry(path.to_string()).or_default();
    }

    pub(crate) fn record(&mut self, path: &str, line: u32) {
        self.files.entry(path.to_string()).or_default().insert(line);
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Changed lines for an exact path, if the file is part of the diff.
    pub fn lines_for(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.files.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<u32>)> {
        self.files.iter().map(|(p, l)| (p.as_str(), l))
    }

    pub fn changed_line_count(&self) -> usize {
        self.files.values().map(BTreeSet::len).sum()
    }

    pub fn stats(&self) -> DiffStats {
        DiffStats {
            files: self.files.len() as u32,
            lines: self.changed_line_count() as u32,
        }
    }

    /// Per-file union with another index.
    pub fn union(mut self, other: ModifiedLinesIndex) -> ModifiedLinesIndex {
        for (path, lines) in other.files {
            self.files.entry(path).or_default().extend(lines);
        }
        self
    }
}

impl FromIterator<(String, BTreeSet<u32>)> for ModifiedLinesIndex {
    fn from_iter<I: IntoIterator<Item = (String, BTreeSet<u32>)>>(iter: I) -> Self {
        let mut index = ModifiedLinesIndex::new();
        for (path, lines) in iter {
            index.files.entry(path).or_default().extend(lines);
        }
        index
    }
}

/// Combine indexes from several diff sources; changed lines are unioned per file.
pub fn union_indexes(indexes: impl IntoIterator<Item = ModifiedLinesIndex>) -> ModifiedLinesIndex {
    indexes
        .into_iter()
        .fold(ModifiedLinesIndex::new(), ModifiedLinesIndex::union)
}
