// Unit tests for the in-memory driver

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_attribute_lookups_are_per_document() {
    let driver = MockDriver::new("https://app.test/");
    let top = driver.add(MockNode::new("button").attr("id", "ok"));
    let frame = driver.add(MockNode::new("iframe").attr("id", "f1"));
    let inner = driver.add_in_frame(&frame, MockNode::new("button").attr("id", "ok"));

    let id = NativeLocator::Id("ok".into());
    assert_eq!(driver.find_all(None, &id).await.unwrap(), vec![top]);

    driver.switch_to_frame(&frame).await.unwrap();
    assert_eq!(driver.find_all(None, &id).await.unwrap(), vec![inner]);
    assert_eq!(driver.current_document(), Some(frame));

    driver.switch_to_top().await.unwrap();
    assert_eq!(driver.frame_switches(), vec![Some(frame), None]);
}

#[tokio::test]
async fn test_scoped_lookup_and_rules() {
    let driver = MockDriver::new("about:blank");
    let list = driver.add(MockNode::new("ul").attr("class", "menu main"));
    let item = driver.add_child(&list, MockNode::new("li").text("One"));
    let _other = driver.add(MockNode::new("li").text("Other"));

    let tag = NativeLocator::TagName("li".into());
    assert_eq!(driver.find_all(Some(&list), &tag).await.unwrap(), vec![item]);
    assert_eq!(
        driver
            .find_all(None, &NativeLocator::ClassName("menu".into()))
            .await
            .unwrap(),
        vec![list]
    );

    let xpath = NativeLocator::XPath("./li".into());
    assert!(driver.find_all(Some(&list), &xpath).await.unwrap().is_empty());
    driver.on_find_within(&list, xpath.clone(), &[item]);
    assert_eq!(driver.find_all(Some(&list), &xpath).await.unwrap(), vec![item]);
}

#[tokio::test]
async fn test_find_one_reports_not_found() {
    let driver = MockDriver::new("about:blank");
    let err = driver
        .find_one(None, &NativeLocator::Id("missing".into()))
        .await
        .unwrap_err();
    assert_eq!(err, LocatorError::NotFound("id=missing".into()));
}

#[tokio::test]
async fn test_stale_and_closed_session() {
    let driver = MockDriver::new("about:blank");
    let el = driver.add(MockNode::new("div"));
    driver.set_stale(&el, true);
    assert!(matches!(
        driver.text(&el).await,
        Err(LocatorError::StaleReference(_))
    ));

    driver.close_session();
    assert!(matches!(
        driver.current_url().await,
        Err(LocatorError::NoSession(_))
    ));
}

#[tokio::test]
async fn test_scripts_match_by_fragment() {
    let driver = MockDriver::new("about:blank");
    driver.on_script("document.title", json!("Home"));
    assert_eq!(
        driver.execute("return document.title;", vec![]).await.unwrap(),
        json!("Home")
    );
    assert_eq!(driver.execute("return 1;", vec![]).await.unwrap(), Value::Null);
    assert_eq!(driver.executed_scripts().len(), 2);
}

#[tokio::test]
async fn test_close_ends_session_once() {
    let driver = MockDriver::new("about:blank");
    driver.close().await.unwrap();
    assert!(driver.is_session_closed());
    assert!(matches!(driver.close().await, Err(LocatorError::NoSession(_))));
}
