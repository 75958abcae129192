//! Mapping coverage classes to the diff's file paths.

use std::collections::HashMap;

use dashmap::DashMap;
use deltacov_coverage::RawCoverageData;
use deltacov_diff::ModifiedLinesIndex;

/// Derive the repository-relative path suffix for a class.
///
/// The package becomes the directory and the trailing class segment is
/// replaced by `source_file_name`. Classes in the default package resolve to
/// `/<source_file_name>`, which only matches at a path segment boundary.
pub fn resolve_class_path(source_file_name: &str, class_name: &str) -> String {
    let slashed = class_name.replace(['.', '\\'], "/");
    match slashed.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => format!("{parent}/{source_file_name}"),
        _ => format!("/{source_file_name}"),
    }
}

/// How a diff path relates to a resolved class path. Lower ranks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    SegmentSuffix,
    Suffix,
    Contains,
}

/// What to look up in a [`PathIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathQuery {
    /// Resolved path with any leading `/` removed.
    needle: String,
    /// Needle must start at a path segment boundary.
    anchored: bool,
    /// Compare against diff paths with their file extension stripped.
    stem: bool,
}

impl PathQuery {
    /// Query for a resolved path such as `com/acme/Foo.java` or `/Foo.java`.
    pub fn path(resolved: &str) -> Self {
        Self::new(resolved, false)
    }

    /// Query matching any extension, e.g. `com/acme/Foo` against `Foo.kt`.
    ///
    /// Stems only match whole path segments: exact or segment-suffix.
    pub fn stem(resolved: &str) -> Self {
        Self::new(resolved, true)
    }

    /// Query for a coverage record: by declared source file when present,
    /// otherwise by the outer class name as a stem.
    pub fn for_record(raw: &RawCoverageData) -> Self {
        match raw.source_file.as_deref() {
            Some(file) => Self::path(&resolve_class_path(file, &raw.class_name)),
            None => Self::stem(&resolve_class_path(raw.outer_simple_name(), &raw.class_name)),
        }
    }

    fn new(resolved: &str, stem: bool) -> Self {
        let normalized = resolved.replace('\\', "/");
        let anchored = normalized.starts_with('/');
        Self {
            needle: normalized.trim_start_matches('/').to_string(),
            anchored,
            stem,
        }
    }

    fn last_segment(&self) -> &str {
        last_segment(&self.needle)
    }

    /// Rank `candidate` (already reduced to a stem in stem mode).
    fn classify(&self, candidate: &str) -> Option<MatchKind> {
        let needle = self.needle.as_str();
        if needle.is_empty() {
            return None;
        }
        if candidate == needle {
            return Some(MatchKind::Exact);
        }
        if candidate
            .strip_suffix(needle)
            .is_some_and(|head| head.ends_with('/'))
        {
            return Some(MatchKind::SegmentSuffix);
        }
        if self.stem {
            // `com/acme/Foo` must not pick up `FooTest.java` or `FooBar.kt`.
            return None;
        }
        if self.anchored {
            // Interior matches still need a preceding separator.
            return candidate
                .match_indices(needle)
                .any(|(i, _)| candidate[..i].ends_with('/'))
                .then_some(MatchKind::Contains);
        }
        if candidate.ends_with(needle) {
            return Some(MatchKind::Suffix);
        }
        candidate.contains(needle).then_some(MatchKind::Contains)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Strip the extension of the final segment: `src/Foo.kt` -> `src/Foo`.
fn strip_extension(path: &str) -> &str {
    let name = last_segment(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &path[..path.len() - (name.len() - dot)],
        _ => path,
    }
}

/// Index over the diff's file paths.
///
/// A lookup returns the best candidate by match kind, then by the fewest
/// characters beyond the needle, then lexically. Two source roots sharing a
/// suffix can still produce a false positive; the ranking only makes the
/// choice deterministic.
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    paths: Vec<String>,
    by_file_name: HashMap<String, Vec<usize>>,
    by_file_stem: HashMap<String, Vec<usize>>,
}

impl PathIndex {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut paths: Vec<String> = paths.into_iter().map(str::to_string).collect();
        paths.sort();
        paths.dedup();

        let mut by_file_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_file_stem: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, path) in paths.iter().enumerate() {
            by_file_name
                .entry(last_segment(path).to_string())
                .or_default()
                .push(i);
            by_file_stem
                .entry(last_segment(strip_extension(path)).to_string())
                .or_default()
                .push(i);
        }

        Self {
            paths,
            by_file_name,
            by_file_stem,
        }
    }

    pub fn from_modified_lines(index: &ModifiedLinesIndex) -> Self {
        Self::new(index.paths())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn lookup(&self, query: &PathQuery) -> Option<&str> {
        self.best_match(query).map(|(_, path)| path)
    }

    /// Best candidate together with how it matched.
    pub fn best_match(&self, query: &PathQuery) -> Option<(MatchKind, &str)> {
        let buckets = if query.stem {
            &self.by_file_stem
        } else {
            &self.by_file_name
        };

        // Exact and segment-suffix matches share the needle's file name, so
        // the bucket holds every candidate that can outrank a scan result.
        let bucket = buckets
            .get(query.last_segment())
            .map(Vec::as_slice)
            .unwrap_or_default();
        if let Some(found) = self.rank(query, bucket.iter().copied()) {
            if found.0 <= MatchKind::SegmentSuffix {
                return Some(found);
            }
        }
        self.rank(query, 0..self.paths.len())
    }

    fn rank(
        &self,
        query: &PathQuery,
        candidates: impl Iterator<Item = usize>,
    ) -> Option<(MatchKind, &str)> {
        candidates
            .filter_map(|i| {
                let path = self.paths[i].as_str();
                let haystack = if query.stem {
                    strip_extension(path)
                } else {
                    path
                };
                let kind = query.classify(haystack)?;
                let extra = haystack.len().saturating_sub(query.needle.len());
                Some((kind, extra, path))
            })
            .min()
            .map(|(kind, _, path)| (kind, path))
    }
}

/// Memoizing resolver from coverage records to diff paths.
///
/// Safe to share across rayon workers; each distinct
/// `(source file, class name)` pair is looked up once.
#[derive(Debug, Default)]
pub struct ClassPathResolver {
    index: PathIndex,
    memo: DashMap<(Option<String>, String), Option<String>>,
}

impl ClassPathResolver {
    pub fn new(index: PathIndex) -> Self {
        Self {
            index,
            memo: DashMap::new(),
        }
    }

    pub fn for_modified_lines(modified: &ModifiedLinesIndex) -> Self {
        Self::new(PathIndex::from_modified_lines(modified))
    }

    /// Diff path a record's class was compiled from, if it is part of the diff.
    pub fn resolve(&self, raw: &RawCoverageData) -> Option<String> {
        let key = (raw.source_file.clone(), raw.class_name.clone());
        if let Some(hit) = self.memo.get(&key) {
            return hit.value().clone();
        }
        let found = self
            .index
            .lookup(&PathQuery::for_record(raw))
            .map(str::to_string);
        self.memo.insert(key, found.clone());
        found
    }

    pub fn cached_entries(&self) -> usize {
        self.memo.len()
    }
}
