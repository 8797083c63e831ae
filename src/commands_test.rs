// Unit tests for the CLI command helpers

use super::*;
use chrono::Utc;
use pretty_assertions::assert_eq;
use rsprobe::mock::{MockDriver, MockNode};
use rsprobe::recognition::Grammar;
use rsprobe::{ElementReport, EngineConfig, LocatorError, Position, SearchContext, Size};
use std::sync::Arc;

fn sample_report() -> ElementReport {
    ElementReport {
        recognition_string: "id=btnOK".to_string(),
        tag_name: "button".to_string(),
        id: Some("btnOK".to_string()),
        text: Some("OK".to_string()),
        domain: "Html".to_string(),
        component_type: "Button".to_string(),
        position: Position::px(5.0, 6.0),
        size: Size::px(40.0, 20.0),
        screen_position: Position::px(123.0, 146.0),
        frame_path: vec!["f1".to_string(), "inner".to_string()],
        resolved_at: Utc::now(),
    }
}

#[test]
fn test_render_simple() {
    let line = find::render_simple(&sample_report());
    assert_eq!(
        line,
        "id=btnOK: Button button at (5, 6) 40x20px, screen (123, 146)\n  Text: OK\n  Frames: f1 > inner"
    );
}

#[test]
fn test_parse_report() {
    let report = parse::parse_report("FRAMEID=f1;\\;:PASM:id=a;class=b", &Grammar::default());
    assert!(report.has_frames);
    assert_eq!(report.segments.len(), 2);
    assert_eq!(report.segments[1].qualifiers.len(), 2);
    assert!(!report.segments[1].prefixes.is_empty());
}

#[test]
fn test_compile_report() {
    let report = compile::compile_report("FRAMEID=f1;\\;foo=bar;\\;id=ok", &Grammar::default());
    assert_eq!(report.len(), 3);
    assert_eq!(report[0].frame.as_deref(), Some("Id=f1"));
    assert!(report[1].skipped.is_some());
    assert_eq!(
        report[2].query.as_ref().map(|q| q.locator.to_string()),
        Some("id=ok".to_string())
    );
}

#[tokio::test]
async fn test_collect_reports_with_mock() {
    let driver = MockDriver::new("http://app/");
    driver.add(
        MockNode::new("button")
            .attr("id", "btnOK")
            .text("OK")
            .rect(1.0, 2.0, 3.0, 4.0),
    );
    let config = EngineConfig {
        page_settle_ms: 0,
        ..EngineConfig::default()
    };
    let mut ctx = SearchContext::new(Arc::new(driver), config);

    let reports = find::collect_reports(&mut ctx, "id=btnOK", false).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tag_name, "button");

    let err = find::collect_reports(&mut ctx, "id=missing", true).await.unwrap_err();
    assert!(matches!(err, LocatorError::NotFound(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_session_closes_while_script_worker_is_detached() {
    let driver = MockDriver::new("http://app/");
    driver.on_script_delayed("wedged()", std::time::Duration::from_millis(300), serde_json::json!(true));
    let shared = Arc::new(driver.clone());
    let config = EngineConfig {
        page_settle_ms: 0,
        script_timeout_ms: 10,
        ..EngineConfig::default()
    };
    let ctx = SearchContext::new(Arc::clone(&shared), config);

    let err = ctx.executor().execute("return wedged();", Vec::new()).await.unwrap_err();
    assert!(matches!(err, LocatorError::Timeout(_)));
    drop(ctx);
    assert!(Arc::strong_count(&shared) > 1);

    find::close_session(shared.as_ref()).await;
    assert!(driver.is_session_closed());
}
