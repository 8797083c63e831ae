//! Candidate selection: ordinal filtering and the text-matching ladder.

use serde::Serialize;
use tracing::debug;

use crate::domain::TypeResolver;
use crate::driver::{Driver, candidate_text};
use crate::errors::LocatorError;
use crate::xpath::TextSource;

/// An element paired with the text it is matched on
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate<E> {
    pub element: E,
    pub text: String,
}

impl<E> MatchCandidate<E> {
    pub fn new(element: E, text: impl Into<String>) -> Self {
        MatchCandidate {
            element,
            text: text.into(),
        }
    }
}

/// Text-matching tiers, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Exact,
    ExactIgnoreCase,
    Substring,
    SubstringIgnoreCase,
}

impl Tier {
    /// Tiers tried for a partial or exact request. Partial starts at substring.
    pub fn ladder(partial: bool) -> &'static [Tier] {
        const FULL: [Tier; 4] = [
            Tier::Exact,
            Tier::ExactIgnoreCase,
            Tier::Substring,
            Tier::SubstringIgnoreCase,
        ];
        if partial { &FULL[2..] } else { &FULL }
    }

    pub fn matches(&self, actual: &str, expected: &str) -> bool {
        match self {
            Tier::Exact => actual == expected,
            Tier::ExactIgnoreCase => actual.to_lowercase() == expected.to_lowercase(),
            Tier::Substring => actual.contains(expected),
            Tier::SubstringIgnoreCase => actual.to_lowercase().contains(&expected.to_lowercase()),
        }
    }
}

/// What a single-result selection returns when no tier matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    FirstCandidate,
    Nothing,
}

/// All matches of the first tier that matches anything
pub fn select_all<'a, E>(
    candidates: &'a [MatchCandidate<E>],
    expected: &str,
    partial: bool,
) -> Option<(Tier, Vec<&'a MatchCandidate<E>>)> {
    Tier::ladder(partial).iter().find_map(|tier| {
        let hits: Vec<_> = candidates
            .iter()
            .filter(|c| tier.matches(&c.text, expected))
            .collect();
        (!hits.is_empty()).then_some((*tier, hits))
    })
}

/// First match of the first tier that matches anything
pub fn select_one<'a, E>(
    candidates: &'a [MatchCandidate<E>],
    expected: &str,
    partial: bool,
    fallback: Fallback,
) -> Option<&'a MatchCandidate<E>> {
    if let Some((tier, hits)) = select_all(candidates, expected, partial) {
        debug!("Text '{}' matched {} candidate(s) at {:?}", expected, hits.len(), tier);
        return hits.into_iter().next();
    }
    match fallback {
        Fallback::FirstCandidate => {
            debug!("No candidate text matched '{}', using the first candidate", expected);
            candidates.first()
        }
        Fallback::Nothing => None,
    }
}

/// Pair each element with its matching text
pub async fn collect_candidates<D: Driver>(
    driver: &D,
    elements: Vec<D::Element>,
    source: &TextSource,
) -> Result<Vec<MatchCandidate<D::Element>>, LocatorError> {
    let mut candidates = Vec::with_capacity(elements.len());
    for element in elements {
        let text = match source {
            TextSource::Visible => candidate_text(driver, &element).await?,
            TextSource::Attribute(name) => driver.attribute(&element, name).await?.unwrap_or_default(),
        };
        candidates.push(MatchCandidate::new(element, text));
    }
    Ok(candidates)
}

/// The `ordinal`-th (1-based) displayed candidate of the requested type.
///
/// Hidden candidates and type mismatches are not counted.
pub async fn nth_displayed<D: Driver>(
    resolver: &TypeResolver<'_, D>,
    candidates: Vec<D::Element>,
    ordinal: usize,
    type_filter: Option<&str>,
) -> Result<Option<D::Element>, LocatorError> {
    if ordinal == 0 {
        return Ok(None);
    }
    let driver = resolver.executor.driver().as_ref();
    let mut seen = 0;
    for element in candidates {
        if !driver.is_displayed(&element).await? {
            continue;
        }
        if let Some(type_name) = type_filter
            && !resolver.is_type_matched(&element, type_name).await?
        {
            continue;
        }
        seen += 1;
        if seen == ordinal {
            return Ok(Some(element));
        }
    }
    debug!("Only {} candidate(s) qualified for index {}", seen, ordinal);
    Ok(None)
}

#[cfg(test)]
#[path = "matcher_test.rs"]
mod matcher_test;
