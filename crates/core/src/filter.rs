use crate::entry::Entry;
use crate::error::{Result, RsrError};
use crate::walker::{enumerate, Entries};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum KindFilter {
    #[default]
    All,
    DirsOnly,
    FilesOnly,
}

impl KindFilter {
    pub fn accepts(self, entry: &Entry) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::DirsOnly => entry.is_dir(),
            KindFilter::FilesOnly => entry.is_file(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub case_sensitive: bool,
    pub full_path: bool,
    pub recursive: bool,
    pub invert: bool,
    pub kind: KindFilter,
    pub limit: Option<usize>,
}

/// Owned result of testing the pattern against one comparison string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchInfo {
    pub success: bool,
    pub value: String,
    pub start: usize,
    pub length: usize,
    /// Index 0 is the whole match; `None` for groups that did not participate.
    pub groups: Vec<Option<String>>,
    pub named: BTreeMap<String, Option<String>>,
}

impl MatchInfo {
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    pub fn named_group(&self, name: &str) -> Option<&str> {
        self.named.get(name).and_then(|g| g.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedEntry {
    pub entry: Entry,
    pub comparison: String,
    pub captures: MatchInfo,
}

#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    full_path: bool,
}

impl Matcher {
    pub fn new(pattern: &str, options: &FilterOptions) -> Result<Self> {
        Ok(Self {
            regex: compile_pattern(pattern, options.case_sensitive)?,
            full_path: options.full_path,
        })
    }

    pub fn comparison_string(&self, entry: &Entry) -> String {
        if self.full_path {
            entry.path.to_string_lossy().to_string()
        } else {
            entry.name.clone()
        }
    }

    pub fn test(&self, entry: Entry) -> MatchedEntry {
        let comparison = self.comparison_string(&entry);
        let captures = capture(&self.regex, &comparison);
        MatchedEntry {
            entry,
            comparison,
            captures,
        }
    }
}

pub fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|source| RsrError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Entries whose match success differs from `invert` and whose kind passes
/// the kind filter, in enumeration order, stopping after `limit` results.
///
/// Pulls from the underlying entries only on demand, so a limit also cuts
/// the directory walk short.
#[derive(Debug)]
pub struct ResultSet<I> {
    entries: I,
    matcher: Matcher,
    invert: bool,
    kind: KindFilter,
    remaining: usize,
}

impl<I> Iterator for ResultSet<I>
where
    I: Iterator<Item = Entry>,
{
    type Item = MatchedEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let entry = self.entries.next()?;
            if !self.kind.accepts(&entry) {
                continue;
            }
            let matched = self.matcher.test(entry);
            let keep = matched.captures.success ^ self.invert;
            trace!(comparison = %matched.comparison, keep, "tested");
            if keep {
                self.remaining -= 1;
                return Some(matched);
            }
        }
        None
    }
}

pub fn select<I>(entries: I, matcher: Matcher, options: &FilterOptions) -> ResultSet<I::IntoIter>
where
    I: IntoIterator<Item = Entry>,
{
    ResultSet {
        entries: entries.into_iter(),
        matcher,
        invert: options.invert,
        kind: options.kind,
        remaining: options.limit.unwrap_or(usize::MAX),
    }
}

/// Checks the root, compiles the pattern and returns the lazy result set.
pub fn find(root: &Path, pattern: &str, options: &FilterOptions) -> Result<ResultSet<Entries>> {
    if !root.is_dir() {
        return Err(RsrError::DirectoryNotFound(root.to_path_buf()));
    }
    let matcher = Matcher::new(pattern, options)?;
    let entries = enumerate(root, options.recursive)?;
    Ok(select(entries, matcher, options))
}

fn capture(regex: &Regex, haystack: &str) -> MatchInfo {
    let Some(caps) = regex.captures(haystack) else {
        return MatchInfo::default();
    };
    let whole = caps.get(0);

    let groups = caps
        .iter()
        .map(|g| g.map(|m| m.as_str().to_string()))
        .collect();
    let named = regex
        .capture_names()
        .flatten()
        .map(|name| {
            (
                name.to_string(),
                caps.name(name).map(|m| m.as_str().to_string()),
            )
        })
        .collect();

    MatchInfo {
        success: true,
        value: whole.map(|m| m.as_str().to_string()).unwrap_or_default(),
        start: whole.map(|m| m.start()).unwrap_or(0),
        length: whole.map(|m| m.len()).unwrap_or(0),
        groups,
        named,
    }
}
