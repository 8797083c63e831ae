//! Match instructions shared by element search and sub-item search.

use regex::Regex;
use serde::Serialize;

use crate::errors::LocatorError;
use crate::recognition::tokenize;

/// No usable index was supplied
pub const INVALID_INDEX: i32 = -1;
/// Accept every matched item, the first one wins
pub const INDEX_TRY_ALL_MATCHED_ITEMS: i32 = -1000;
/// Default separator between path levels
pub const DEFAULT_PATH_SEPARATOR: &str = "->";

/// Compare `actual` against `expected`.
///
/// Exact (or substring when `partial`) comparison first, then `expected`
/// is tried as a regular expression. A pattern that does not compile never
/// matches.
pub fn match_text(actual: &str, expected: &str, partial: bool, ignore_case: bool) -> bool {
    let literal = if ignore_case {
        let (a, e) = (actual.to_lowercase(), expected.to_lowercase());
        if partial { a.contains(&e) } else { a == e }
    } else if partial {
        actual.contains(expected)
    } else {
        actual == expected
    };
    if literal {
        return true;
    }

    let pattern = match (partial, ignore_case) {
        (true, true) => format!("(?i){expected}"),
        (true, false) => expected.to_string(),
        (false, true) => format!("(?i)^(?:{expected})$"),
        (false, false) => format!("^(?:{expected})$"),
    };
    Regex::new(&pattern)
        .map(|re| re.is_match(actual))
        .unwrap_or(false)
}

/// What to look for inside a component or among candidates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Criterion {
    text: Option<String>,
    path: Vec<String>,
    partial: bool,
    separator: String,
    expected_index: i32,
    expected_indices: Option<Vec<i32>>,
}

impl Criterion {
    /// Select by 0-based position only
    pub fn by_index(index: i32) -> Self {
        Criterion {
            text: None,
            path: Vec::new(),
            partial: false,
            separator: DEFAULT_PATH_SEPARATOR.to_string(),
            expected_index: index,
            expected_indices: None,
        }
    }

    /// Select the `index`-th (0-based) item whose text matches
    pub fn by_text(text: &str, partial: bool, index: i32) -> Self {
        Self::build(text, partial, index, None, DEFAULT_PATH_SEPARATOR, '\\')
    }

    /// Select by a `->` separated path. `indices` gives the 0-based match to
    /// follow at each level; without them the first complete path match wins.
    pub fn path(path: &str, partial: bool, indices: Option<Vec<i32>>) -> Self {
        Self::build(path, partial, 0, indices, DEFAULT_PATH_SEPARATOR, '\\')
    }

    /// Like [`Criterion::path`], with 1-based level indices given as a
    /// separated string such as `"1->2"`.
    pub fn path_with_index_str(
        path: &str,
        partial: bool,
        index_str: &str,
        separator: &str,
        escape: char,
    ) -> Result<Self, LocatorError> {
        let indices = if index_str.trim().is_empty() {
            None
        } else {
            let parsed = tokenize(index_str, separator, escape)
                .iter()
                .map(|s| {
                    s.trim()
                        .parse::<i32>()
                        .map(|n| n - 1)
                        .map_err(|_| LocatorError::Parse(format!("invalid index '{}'", s)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(parsed)
        };
        let first = indices
            .as_ref()
            .and_then(|v| v.first().copied())
            .unwrap_or(0);
        Ok(Self::build(path, partial, first, indices, separator, escape))
    }

    fn build(
        text: &str,
        partial: bool,
        index: i32,
        indices: Option<Vec<i32>>,
        separator: &str,
        escape: char,
    ) -> Self {
        let path = if text.contains(separator) {
            tokenize(text, separator, escape)
        } else {
            vec![text.to_string()]
        };
        let mut criterion = Criterion {
            text: Some(text.to_string()),
            path,
            partial,
            separator: separator.to_string(),
            expected_index: index,
            expected_indices: None,
        };
        match indices {
            Some(indices) if criterion.path.len() > 1 || indices.len() > 1 => {
                let mut levels = indices;
                levels.resize(criterion.path.len().max(levels.len()), 0);
                criterion.expected_indices = Some(levels);
            }
            Some(indices) => {
                // Single level: the one index is the expected index
                criterion.expected_index = indices.first().copied().unwrap_or(index);
            }
            None => {}
        }
        criterion
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn path_levels(&self) -> &[String] {
        &self.path
    }

    pub fn partial(&self) -> bool {
        self.partial
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn expected_index(&self) -> i32 {
        self.expected_index
    }

    /// 0-based ordinal to select, treating the sentinel values as the first
    pub fn ordinal(&self) -> usize {
        usize::try_from(self.expected_index).unwrap_or(0)
    }

    pub fn expected_indices(&self) -> Option<&[i32]> {
        self.expected_indices.as_deref()
    }

    /// 0-based match to follow at `level`
    pub fn level_ordinal(&self, level: usize) -> usize {
        self.expected_indices
            .as_ref()
            .and_then(|v| v.get(level).copied())
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }

    pub fn is_hierarchical(&self) -> bool {
        self.path.len() > 1
            || self
                .expected_indices
                .as_ref()
                .is_some_and(|indices| indices.len() > 1)
    }

    /// Match against the whole text
    pub fn match_text(&self, actual: &str) -> bool {
        match &self.text {
            Some(expected) => match_text(actual, expected, self.partial, false),
            None => false,
        }
    }

    /// Match against one level of the path
    pub fn match_level(&self, actual: &str, level: usize) -> bool {
        match self.path.get(level) {
            Some(expected) => match_text(actual, expected.trim(), self.partial, false),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "criterion_test.rs"]
mod criterion_test;
