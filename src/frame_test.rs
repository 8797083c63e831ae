// Unit tests for frame tracking

use super::*;
use crate::mock::{MockDriver, MockElement, MockNode};
use crate::recognition::{Grammar, RecognitionString};
use pretty_assertions::assert_eq;

fn segments(rs: &str) -> Vec<Segment> {
    RecognitionString::parse(rs, &Grammar::default()).into_segments()
}

fn context() -> FrameContext<MockElement> {
    FrameContext::new(Duration::ZERO)
}

/// Top document with iframe `f1` at (10, 20) holding `btnOK` and a nested
/// iframe `f2` at (5, 5)
fn page(driver: &MockDriver) -> (MockElement, MockElement, MockElement) {
    let f1 = driver.add(
        MockNode::new("iframe")
            .attr("id", "f1")
            .attr("name", "main")
            .rect(10.0, 20.0, 300.0, 200.0),
    );
    let button = driver.add_in_frame(&f1, MockNode::new("button").attr("id", "btnOK"));
    let f2 = driver.add_in_frame(&f1, MockNode::new("iframe").attr("id", "f2").rect(5.0, 5.0, 50.0, 50.0));
    (f1, button, f2)
}

#[tokio::test]
async fn test_apply_enters_frame_and_returns_rest() {
    let driver = MockDriver::new("http://app/page");
    let (f1, _, _) = page(&driver);
    let mut ctx = context();

    let rest = ctx.apply(&driver, segments("FRAMEID=f1;\\;id=btnOK")).await.unwrap();

    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].raw, "id=btnOK");
    assert_eq!(driver.current_document(), Some(f1));
    assert_eq!(ctx.state(), FrameState::InFrame);
    let current = ctx.current().unwrap();
    assert_eq!(current.id(), Some("f1"));
    assert_eq!(current.name(), Some("main"));
    assert_eq!(current.depth(), 1);
}

#[tokio::test]
async fn test_nested_frame_location_accumulates() {
    let driver = MockDriver::new("http://app/page");
    let (_, _, f2) = page(&driver);
    let mut ctx = context();

    ctx.apply(&driver, segments("FRAMEID=f1;\\;FRAMEID=f2;\\;id=x"))
        .await
        .unwrap();

    let current = ctx.current().unwrap();
    assert_eq!(driver.current_document(), Some(f2));
    assert_eq!(current.depth(), 2);
    assert_eq!(current.location(), &Position::px(15.0, 25.0));
    assert_eq!(current.size(), &Size::px(50.0, 50.0));
    let labels: Vec<_> = current.chain().iter().map(|f| f.label().to_string()).collect();
    assert_eq!(labels, vec!["f1", "f2"]);
}

#[tokio::test]
async fn test_missing_frame_keeps_previous_chain() {
    let driver = MockDriver::new("http://app/page");
    let (f1, _, _) = page(&driver);
    let mut ctx = context();
    ctx.apply(&driver, segments("FRAMEID=f1;\\;id=btnOK")).await.unwrap();

    let err = ctx
        .apply(&driver, segments("FRAMEID=nope;\\;id=btnOK"))
        .await
        .unwrap_err();

    assert!(matches!(err, LocatorError::FrameNotFound(_)));
    assert!(err.is_not_found());
    assert_eq!(ctx.current().unwrap().id(), Some("f1"));
    assert_eq!(ctx.state(), FrameState::InFrame);
    assert_eq!(driver.current_document(), Some(f1));
}

#[tokio::test]
async fn test_null_frame_returns_to_top() {
    let driver = MockDriver::new("http://app/page");
    page(&driver);
    let mut ctx = context();

    ctx.apply(&driver, segments("FRAMEID=f1;\\;FRAMEID=null;\\;id=x"))
        .await
        .unwrap();

    assert!(ctx.current().is_none());
    assert_eq!(ctx.state(), FrameState::Top);
    assert_eq!(driver.current_document(), None);
}

#[tokio::test]
async fn test_plain_string_reenters_cached_chain() {
    let driver = MockDriver::new("http://app/page");
    let (f1, _, _) = page(&driver);
    let mut ctx = context();
    ctx.apply(&driver, segments("FRAMEID=f1;\\;id=btnOK")).await.unwrap();
    driver.switch_to_top().await.unwrap();

    let rest = ctx.apply(&driver, segments("id=btnOK")).await.unwrap();

    assert_eq!(rest.len(), 1);
    assert_eq!(driver.current_document(), Some(f1));
}

#[tokio::test]
async fn test_stale_chain_after_navigation_continues_from_top() {
    let driver = MockDriver::new("http://app/page");
    let (f1, _, _) = page(&driver);
    let mut ctx = context();
    ctx.apply(&driver, segments("FRAMEID=f1;\\;id=btnOK")).await.unwrap();

    driver.set_stale(&f1, true);
    driver.navigate("http://app/other");
    let rest = ctx.apply(&driver, segments("id=btnOK")).await.unwrap();

    assert_eq!(rest.len(), 1);
    assert!(ctx.current().is_none());
    assert_eq!(driver.current_document(), None);
}

#[tokio::test]
async fn test_stale_chain_on_same_page_is_dropped_after_retry() {
    let driver = MockDriver::new("http://app/page");
    let (f1, _, _) = page(&driver);
    let mut ctx = context();
    ctx.apply(&driver, segments("FRAMEID=f1;\\;id=btnOK")).await.unwrap();

    driver.set_stale(&f1, true);
    ctx.apply(&driver, segments("id=btnOK")).await.unwrap();

    assert!(ctx.current().is_none());
    // prior apply, then two re-entry attempts and the final drop
    let tops = driver.frame_switches().iter().filter(|s| s.is_none()).count();
    assert_eq!(tops, 4);
}

#[tokio::test]
async fn test_bypass_ignores_frame_segments() {
    let driver = MockDriver::new("http://app/page");
    page(&driver);
    let mut ctx = context();
    ctx.set_bypass_reset(true);

    let rest = ctx.apply(&driver, segments("FRAMEID=f1;\\;id=btnOK")).await.unwrap();

    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].raw, "id=btnOK");
    assert!(driver.frame_switches().is_empty());
    assert!(ctx.current().is_none());

    ctx.reset(&driver).await.unwrap();
    assert!(driver.frame_switches().is_empty());
}

#[tokio::test]
async fn test_reset_returns_to_top() {
    let driver = MockDriver::new("http://app/page");
    page(&driver);
    let mut ctx = context();
    ctx.apply(&driver, segments("FRAMEID=f1;\\;id=btnOK")).await.unwrap();

    ctx.reset(&driver).await.unwrap();

    assert!(ctx.current().is_none());
    assert_eq!(driver.current_document(), None);
}

#[tokio::test]
async fn test_frame_index_falls_back_to_nth_iframe() {
    let driver = MockDriver::new("http://app/page");
    let a = driver.add(MockNode::new("iframe").attr("id", "a"));
    let b = driver.add(MockNode::new("iframe").attr("id", "b"));
    driver.on_find(NativeLocator::XPath("//iframe".into()), &[a, b]);
    let mut ctx = context();

    ctx.apply(&driver, segments("FRAMEINDEX=2;\\;id=x")).await.unwrap();

    assert_eq!(driver.current_document(), Some(b));
    assert_eq!(ctx.current().unwrap().id(), Some("b"));
}

#[test]
fn test_frame_index_must_be_one_based() {
    let q = Qualifier::parse("FRAMEINDEX=0", "=").unwrap();
    let err = FrameLocator::from_qualifier(FrameKey::Index, &q).unwrap_err();
    assert!(matches!(err, LocatorError::Parse(_)));
}

#[tokio::test]
async fn test_malformed_frame_segment_is_skipped() {
    let driver = MockDriver::new("http://app/page");
    let (f1, _, _) = page(&driver);
    let mut ctx = context();

    let rest = ctx
        .apply(&driver, segments("FRAMEINDEX=abc;\\;FRAMEID=f1;\\;id=btnOK"))
        .await
        .unwrap();

    assert_eq!(rest.len(), 1);
    assert_eq!(driver.current_document(), Some(f1));
    assert_eq!(ctx.current().unwrap().id(), Some("f1"));
}

#[tokio::test]
async fn test_partial_frame_id_uses_contains() {
    let driver = MockDriver::new("http://app/page");
    let frame = driver.add(MockNode::new("iframe").attr("id", "content-frame-7"));
    driver.on_find(
        NativeLocator::XPath(
            "//iframe[contains(@id, 'frame')] | //frame[contains(@id, 'frame')]".into(),
        ),
        &[frame],
    );
    let mut ctx = context();

    ctx.apply(&driver, segments("FRAMEIDCONTAINS=frame;\\;id=x")).await.unwrap();

    assert_eq!(driver.current_document(), Some(frame));
}

#[tokio::test]
async fn test_frame_only_string_addresses_document_root() {
    let driver = MockDriver::new("http://app/page");
    page(&driver);
    let mut ctx = context();

    let rest = ctx.apply(&driver, segments("FRAMENAME=main")).await.unwrap();

    assert_eq!(rest, vec![Segment::single("xpath", "/html")]);
    assert_eq!(ctx.current().unwrap().name(), Some("main"));
}

#[tokio::test]
async fn test_same_content_compares_chain_ids() {
    let driver = MockDriver::new("http://app/page");
    page(&driver);
    let mut first = context();
    let mut second = context();

    first
        .apply(&driver, segments("FRAMEID=f1;\\;FRAMEID=f2;\\;id=x"))
        .await
        .unwrap();
    second
        .apply(&driver, segments("FRAMENAME=main;\\;FRAMEID=f2;\\;id=x"))
        .await
        .unwrap();
    assert!(first.current().unwrap().same_content(&second.current().unwrap()));

    second.apply(&driver, segments("FRAMEID=f1;\\;id=x")).await.unwrap();
    assert!(!first.current().unwrap().same_content(&second.current().unwrap()));
}
