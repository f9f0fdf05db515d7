//! Include/exclude glob filtering of raw paths.
//!
//! `*` and `?` stay inside one path segment, `**` crosses segments, and
//! matching is case-sensitive. Backslashes are turned into forward slashes
//! before matching so Windows-style paths behave like POSIX ones.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::warn;

/// Patterns excluded when no exclude list is configured.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*.tmp",
    "**/*.temp",
    "**/tmp/**",
    "**/cache/**",
    "**/.git/**",
    "**/*.log",
];

#[derive(Debug, Clone)]
pub struct PathFilter {
    // `None` means every path is included.
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    /// Builds a filter from raw glob patterns.
    ///
    /// A pattern that fails to compile is logged and dropped, so it never
    /// matches anything. An empty include list accepts every path.
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let include: Vec<String> = include
            .into_iter()
            .map(|p| p.as_ref().to_owned())
            .collect();

        let include = if include.is_empty() {
            None
        } else {
            Some(build_set(&include))
        };

        let exclude: Vec<String> = exclude
            .into_iter()
            .map(|p| p.as_ref().to_owned())
            .collect();

        PathFilter {
            include,
            exclude: build_set(&exclude),
        }
    }

    /// Returns `true` when the path matches an include pattern (or there are
    /// none) and no exclude pattern.
    pub fn should_process(&self, path: &Path) -> bool {
        let candidate = normalize(path);

        let included = match &self.include {
            Some(set) => set.is_match(&candidate),
            None => true,
        };

        included && !self.exclude.is_match(&candidate)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        PathFilter::new(Vec::<String>::new(), DEFAULT_EXCLUDES.iter().copied())
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn compile(pattern: &str) -> Option<Glob> {
    let pattern = pattern.replace('\\', "/");
    match GlobBuilder::new(&pattern).literal_separator(true).build() {
        Ok(glob) => Some(glob),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "ignoring malformed glob pattern");
            None
        }
    }
}

fn build_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for glob in patterns.iter().filter_map(|p| compile(p)) {
        builder.add(glob);
    }

    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "failed to build glob set, treating it as empty");
        GlobSet::empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_star_stays_in_segment() {
        let filter = PathFilter::new(["/data/*.csv"], Vec::<&str>::new());
        assert!(filter.should_process(Path::new("/data/a.csv")));
        assert!(!filter.should_process(Path::new("/data/nested/a.csv")));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let filter = PathFilter::new(["/logs/day?.txt"], Vec::<&str>::new());
        assert!(filter.should_process(Path::new("/logs/day1.txt")));
        assert!(!filter.should_process(Path::new("/logs/day12.txt")));
        assert!(!filter.should_process(Path::new("/logs/day/.txt")));
    }
}
