use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::driver::{Driver, ScriptArg};
use crate::errors::LocatorError;
use crate::types::Rect;
use crate::xpath::{NativeLocator, quote};

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    /// Default WebDriver URL for this browser type
    pub fn get_webdriver_url(&self) -> String {
        match self {
            BrowserType::Firefox => "http://localhost:4444".to_string(),
            BrowserType::Chrome => "http://localhost:9515".to_string(),
        }
    }

    fn driver_name(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }

    /// W3C capabilities for a new session
    pub fn capabilities(&self, headless: bool) -> serde_json::Map<String, Value> {
        let mut caps = serde_json::Map::new();
        match self {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }
        caps
    }
}

/// A WebDriver session driven through fantoccini
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Connect to a running WebDriver server. `url` defaults to the
    /// browser's standard port.
    pub async fn connect(browser_type: BrowserType, url: Option<&str>, headless: bool) -> Result<Self> {
        let webdriver_url = url
            .map(str::to_string)
            .unwrap_or_else(|| browser_type.get_webdriver_url());
        url::Url::parse(&webdriver_url)
            .with_context(|| format!("Invalid WebDriver URL: {}", webdriver_url))?;
        info!("Connecting to {:?} WebDriver at {}", browser_type, webdriver_url);

        if !Self::is_webdriver_running(&webdriver_url).await {
            let driver_name = browser_type.driver_name();
            anyhow::bail!(
                "Failed to connect to WebDriver: {} is not answering at {}.\n\
                Start it first:\n\
                  For Firefox: geckodriver --port 4444\n\
                  For Chrome: chromedriver --port 9515",
                driver_name,
                webdriver_url
            );
        }

        let client = ClientBuilder::rustls()
            .capabilities(browser_type.capabilities(headless))
            .connect(&webdriver_url)
            .await
            .context("Failed to connect to WebDriver")?;

        Ok(WebDriverSession { client })
    }

    async fn is_webdriver_running(url: &str) -> bool {
        let status_url = format!("{}/status", url.trim_end_matches('/'));
        match reqwest::get(&status_url).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Navigate and wait up to two seconds for the document to finish loading
    pub async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        self.client
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;

        let wait_script = "return document.readyState === 'complete';";
        for _ in 0..20 {
            match self.client.execute(wait_script, vec![]).await {
                Ok(val) if val.as_bool().unwrap_or(false) => break,
                _ => tokio::time::sleep(tokio::time::Duration::from_millis(100)).await,
            }
        }
        Ok(())
    }

    fn locator_parts(locator: &NativeLocator) -> (LocatorKind, String) {
        match locator {
            NativeLocator::Id(v) => (LocatorKind::Id, v.clone()),
            NativeLocator::Css(v) => (LocatorKind::Css, v.clone()),
            NativeLocator::XPath(v) => (LocatorKind::XPath, v.clone()),
            NativeLocator::LinkText(v) => (LocatorKind::LinkText, v.clone()),
            NativeLocator::Name(v) => (LocatorKind::Css, format!("[name=\"{}\"]", css_escape(v))),
            NativeLocator::ClassName(v) => (LocatorKind::Css, format!(".{}", css_escape(v))),
            NativeLocator::TagName(v) => (LocatorKind::Css, v.clone()),
            NativeLocator::PartialLinkText(v) => {
                (LocatorKind::XPath, format!(".//a[contains(., {})]", quote(v)))
            }
        }
    }

    fn script_args(args: Vec<ScriptArg<Element>>) -> Result<Vec<Value>, LocatorError> {
        args.into_iter()
            .map(|arg| match arg {
                ScriptArg::Element(element) => element_reference(&element),
                ScriptArg::Value(value) => Ok(value),
            })
            .collect()
    }
}

/// fantoccini locators borrow their value, so the mapped value is owned here
#[derive(Debug, Clone, Copy)]
enum LocatorKind {
    Id,
    Css,
    XPath,
    LinkText,
}

impl LocatorKind {
    fn with<'a>(&self, value: &'a str) -> Locator<'a> {
        match self {
            LocatorKind::Id => Locator::Id(value),
            LocatorKind::Css => Locator::Css(value),
            LocatorKind::XPath => Locator::XPath(value),
            LocatorKind::LinkText => Locator::LinkText(value),
        }
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Wire form of an element passed to a script
fn element_reference<T: serde::Serialize>(element: &T) -> Result<Value, LocatorError> {
    serde_json::to_value(element).map_err(|e| driver_error("script argument", CmdError::Json(e)))
}

fn driver_error(context: &str, err: CmdError) -> LocatorError {
    LocatorError::from_driver_message(context, &err.to_string())
}

#[async_trait]
impl Driver for WebDriverSession {
    type Element = Element;

    async fn find_all(
        &self,
        scope: Option<&Element>,
        locator: &NativeLocator,
    ) -> Result<Vec<Element>, LocatorError> {
        let (kind, value) = Self::locator_parts(locator);
        debug!("Finding {} ({:?})", locator, kind);
        let found = match scope {
            Some(parent) => parent.find_all(kind.with(&value)).await,
            None => self.client.find_all(kind.with(&value)).await,
        };
        match found {
            Ok(elements) => Ok(elements),
            Err(e) => match driver_error(&locator.to_string(), e) {
                LocatorError::NotFound(_) => Ok(Vec::new()),
                other => Err(other),
            },
        }
    }

    async fn execute(&self, script: &str, args: Vec<ScriptArg<Element>>) -> Result<Value, LocatorError> {
        let args = Self::script_args(args)?;
        self.client
            .execute(script, args)
            .await
            .map_err(|e| driver_error("script", e))
    }

    async fn execute_async(
        &self,
        script: &str,
        args: Vec<ScriptArg<Element>>,
    ) -> Result<Value, LocatorError> {
        let args = Self::script_args(args)?;
        self.client
            .execute_async(script, args)
            .await
            .map_err(|e| driver_error("async script", e))
    }

    async fn switch_to_frame(&self, frame: &Element) -> Result<(), LocatorError> {
        frame
            .clone()
            .enter_frame()
            .await
            .map_err(|e| driver_error("frame", e))
    }

    async fn switch_to_top(&self) -> Result<(), LocatorError> {
        self.client
            .enter_frame(None)
            .await
            .map_err(|e| driver_error("top document", e))
    }

    async fn current_url(&self) -> Result<String, LocatorError> {
        self.client
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(|e| driver_error("current url", e))
    }

    async fn is_displayed(&self, element: &Element) -> Result<bool, LocatorError> {
        element.is_displayed().await.map_err(|e| driver_error("displayed", e))
    }

    async fn text(&self, element: &Element) -> Result<String, LocatorError> {
        element.text().await.map_err(|e| driver_error("text", e))
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, LocatorError> {
        element.attr(name).await.map_err(|e| driver_error(name, e))
    }

    async fn tag_name(&self, element: &Element) -> Result<String, LocatorError> {
        element.tag_name().await.map_err(|e| driver_error("tag name", e))
    }

    async fn rect(&self, element: &Element) -> Result<Rect, LocatorError> {
        let (x, y, width, height) = element
            .rectangle()
            .await
            .map_err(|e| driver_error("rectangle", e))?;
        Ok(Rect::new(x, y, width, height))
    }

    async fn click(&self, element: &Element) -> Result<(), LocatorError> {
        element.click().await.map_err(|e| driver_error("click", e))
    }

    async fn close(&self) -> Result<(), LocatorError> {
        // Client handles share one session, so closing a clone ends it
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| driver_error("close session", e))
    }
}

#[cfg(test)]
#[path = "webdriver_test.rs"]
mod webdriver_test;
