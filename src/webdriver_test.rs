// Unit tests for the WebDriver adapter that need no browser

use super::*;
use pretty_assertions::assert_eq;
use std::str::FromStr;

#[test]
fn test_browser_type_parsing() {
    assert_eq!(BrowserType::from_str("Firefox").unwrap(), BrowserType::Firefox);
    assert_eq!(BrowserType::from_str("chromium").unwrap(), BrowserType::Chrome);
    assert!(BrowserType::from_str("lynx").is_err());
}

#[test]
fn test_default_urls() {
    assert_eq!(BrowserType::Firefox.get_webdriver_url(), "http://localhost:4444");
    assert_eq!(BrowserType::Chrome.get_webdriver_url(), "http://localhost:9515");
}

#[test]
fn test_headless_capabilities() {
    let caps = BrowserType::Firefox.capabilities(true);
    assert_eq!(caps["moz:firefoxOptions"], json!({ "args": ["--headless"] }));

    let caps = BrowserType::Chrome.capabilities(false);
    assert_eq!(caps["goog:chromeOptions"], json!({ "args": ["--no-sandbox"] }));
}

#[test]
fn test_locator_mapping() {
    let (kind, value) = WebDriverSession::locator_parts(&NativeLocator::Name("q".into()));
    assert!(matches!(kind, LocatorKind::Css));
    assert_eq!(value, "[name=\"q\"]");

    let (kind, value) = WebDriverSession::locator_parts(&NativeLocator::ClassName("btn".into()));
    assert!(matches!(kind, LocatorKind::Css));
    assert_eq!(value, ".btn");

    let (kind, value) =
        WebDriverSession::locator_parts(&NativeLocator::PartialLinkText("Sign".into()));
    assert!(matches!(kind, LocatorKind::XPath));
    assert_eq!(value, ".//a[contains(., 'Sign')]");

    let (kind, value) = WebDriverSession::locator_parts(&NativeLocator::Id("a b".into()));
    assert!(matches!(kind, LocatorKind::Id));
    assert_eq!(value, "a b");
}

#[test]
fn test_css_escape() {
    assert_eq!(css_escape(r#"say "hi""#), r#"say \"hi\""#);
}

#[tokio::test]
async fn test_connect_fails_without_server() {
    let err = WebDriverSession::connect(BrowserType::Firefox, Some("http://127.0.0.1:9"), true)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("Failed to connect to WebDriver"));
}

#[tokio::test]
async fn test_connect_rejects_bad_url() {
    let err = WebDriverSession::connect(BrowserType::Chrome, Some("not a url"), true)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("Invalid WebDriver URL"));
}

#[test]
fn test_element_reference_uses_serialized_form() {
    #[derive(serde::Serialize)]
    struct Reference {
        #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
        id: String,
    }

    let value = element_reference(&Reference { id: "abc".to_string() }).unwrap();
    assert_eq!(value, json!({"element-6066-11e4-a52e-4f735466cecf": "abc"}));
}

#[test]
fn test_element_reference_reports_unserializable_argument() {
    let mut bad = std::collections::HashMap::new();
    bad.insert((1, 2), "tuple keys are not JSON");

    let err = element_reference(&bad).unwrap_err();
    assert!(matches!(err, LocatorError::Driver(_)));
}
