// Unit tests for candidate selection

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::domain::TypeMapper;
use crate::mock::{MockDriver, MockNode};
use crate::script::ScriptExecutor;
use pretty_assertions::assert_eq;

fn candidates(texts: &[&str]) -> Vec<MatchCandidate<usize>> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| MatchCandidate::new(i, *t))
        .collect()
}

fn texts<'a>(hits: &[&'a MatchCandidate<usize>]) -> Vec<&'a str> {
    hits.iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn test_exact_request_stops_at_case_insensitive_tier() {
    let cands = candidates(&["Abc", "ABC", "xAbcx"]);
    let (tier, hits) = select_all(&cands, "abc", false).unwrap();
    assert_eq!(tier, Tier::ExactIgnoreCase);
    assert_eq!(texts(&hits), vec!["Abc", "ABC"]);
}

#[test]
fn test_partial_request_reaches_last_tier() {
    let cands = candidates(&["Abc", "ABC", "xAbcx"]);
    assert!(
        cands
            .iter()
            .all(|c| !Tier::Substring.matches(&c.text, "abc"))
    );
    let (tier, hits) = select_all(&cands, "abc", true).unwrap();
    assert_eq!(tier, Tier::SubstringIgnoreCase);
    assert_eq!(texts(&hits), vec!["Abc", "ABC", "xAbcx"]);
}

#[test]
fn test_exact_tier_wins_over_later_tiers() {
    let cands = candidates(&["Save as", "save", "Save"]);
    let (tier, hits) = select_all(&cands, "Save", false).unwrap();
    assert_eq!(tier, Tier::Exact);
    assert_eq!(texts(&hits), vec!["Save"]);
}

#[test]
fn test_exact_request_falls_through_to_substring() {
    let cands = candidates(&["Open file", "Close"]);
    let (tier, hits) = select_all(&cands, "file", false).unwrap();
    assert_eq!(tier, Tier::Substring);
    assert_eq!(texts(&hits), vec!["Open file"]);
}

#[test]
fn test_single_selection_fallback_differs_by_call_site() {
    let cands = candidates(&["One", "Two"]);
    assert_eq!(
        select_one(&cands, "Three", false, Fallback::FirstCandidate).map(|c| c.element),
        Some(0)
    );
    assert!(select_one(&cands, "Three", false, Fallback::Nothing).is_none());
    assert!(select_all(&cands, "Three", false).is_none());
    assert_eq!(
        select_one(&cands, "two", false, Fallback::Nothing).map(|c| c.element),
        Some(1)
    );
}

#[test]
fn test_empty_candidates_never_fall_back() {
    let cands: Vec<MatchCandidate<usize>> = Vec::new();
    assert!(select_one(&cands, "x", false, Fallback::FirstCandidate).is_none());
}

#[tokio::test]
async fn test_nth_displayed_counts_only_requested_type() {
    let driver = MockDriver::new("about:blank");
    let raw: Vec<_> = ["span", "button", "span", "button", "span"]
        .iter()
        .map(|tag| driver.add(MockNode::new(tag)))
        .collect();

    let exec = ScriptExecutor::new(Arc::new(driver.clone()), Duration::from_millis(200));
    let mapper = TypeMapper::default();
    let resolver = TypeResolver { executor: &exec, mapper: &mapper };

    let found = nth_displayed(&resolver, raw.clone(), 2, Some("Button")).await.unwrap();
    assert_eq!(found, Some(raw[3]));

    let none = nth_displayed(&resolver, raw.clone(), 3, Some("Button")).await.unwrap();
    assert_eq!(none, None);
}

#[tokio::test]
async fn test_nth_displayed_skips_hidden() {
    let driver = MockDriver::new("about:blank");
    let a = driver.add(MockNode::new("li").hidden());
    let b = driver.add(MockNode::new("li"));
    let c = driver.add(MockNode::new("li"));

    let exec = ScriptExecutor::new(Arc::new(driver.clone()), Duration::from_millis(200));
    let mapper = TypeMapper::default();
    let resolver = TypeResolver { executor: &exec, mapper: &mapper };

    assert_eq!(nth_displayed(&resolver, vec![a, b, c], 1, None).await.unwrap(), Some(b));
    assert_eq!(nth_displayed(&resolver, vec![a, b, c], 2, None).await.unwrap(), Some(c));
    assert_eq!(nth_displayed(&resolver, vec![a, b, c], 0, None).await.unwrap(), None);
}

#[tokio::test]
async fn test_candidate_text_falls_back_to_value() {
    let driver = MockDriver::new("about:blank");
    let input = driver.add(MockNode::new("input").attr("value", "hello"));
    let hint = driver.add(MockNode::new("input").attr("placeholder", "Search"));
    let cands = collect_candidates(&driver, vec![input, hint], &TextSource::Visible)
        .await
        .unwrap();
    assert_eq!(cands[0].text, "hello");
    assert_eq!(cands[1].text, "Search");

    let titled = driver.add(MockNode::new("a").attr("title", "Help").text("?"));
    let cands = collect_candidates(&driver, vec![titled], &TextSource::Attribute("title".into()))
        .await
        .unwrap();
    assert_eq!(cands[0].text, "Help");
}
