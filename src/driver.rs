//! The WebDriver operations the engine consumes.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::LocatorError;
use crate::types::Rect;
use crate::xpath::NativeLocator;

/// Argument passed to a browser script
#[derive(Debug, Clone)]
pub enum ScriptArg<E> {
    Element(E),
    Value(Value),
}

impl<E> From<Value> for ScriptArg<E> {
    fn from(value: Value) -> Self {
        ScriptArg::Value(value)
    }
}

/// A live browser session that can locate elements and run scripts.
///
/// `scope` restricts a search to the subtree of an element; `None` searches
/// the document of the current frame.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Handle to a DOM element in the session
    type Element: Clone + Send + Sync + std::fmt::Debug + 'static;

    async fn find_all(
        &self,
        scope: Option<&Self::Element>,
        locator: &NativeLocator,
    ) -> Result<Vec<Self::Element>, LocatorError>;

    async fn find_one(
        &self,
        scope: Option<&Self::Element>,
        locator: &NativeLocator,
    ) -> Result<Self::Element, LocatorError> {
        self.find_all(scope, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LocatorError::NotFound(locator.to_string()))
    }

    async fn execute(
        &self,
        script: &str,
        args: Vec<ScriptArg<Self::Element>>,
    ) -> Result<Value, LocatorError>;

    async fn execute_async(
        &self,
        script: &str,
        args: Vec<ScriptArg<Self::Element>>,
    ) -> Result<Value, LocatorError>;

    /// Make the frame element's document the current context
    async fn switch_to_frame(&self, frame: &Self::Element) -> Result<(), LocatorError>;

    /// Make the top-level document the current context
    async fn switch_to_top(&self) -> Result<(), LocatorError>;

    async fn current_url(&self) -> Result<String, LocatorError>;

    async fn is_displayed(&self, element: &Self::Element) -> Result<bool, LocatorError>;

    async fn text(&self, element: &Self::Element) -> Result<String, LocatorError>;

    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, LocatorError>;

    async fn tag_name(&self, element: &Self::Element) -> Result<String, LocatorError>;

    /// Position and size relative to the element's own document
    async fn rect(&self, element: &Self::Element) -> Result<Rect, LocatorError>;

    async fn click(&self, element: &Self::Element) -> Result<(), LocatorError>;

    /// End the browser session. Other clones of the handle stop working too.
    async fn close(&self) -> Result<(), LocatorError>;
}

/// Text used when matching a candidate: visible text, else the first
/// non-empty of the `value`, `text` and `placeholder` attributes.
pub async fn candidate_text<D: Driver + ?Sized>(
    driver: &D,
    element: &D::Element,
) -> Result<String, LocatorError> {
    let visible = driver.text(element).await?;
    if !visible.trim().is_empty() {
        return Ok(visible);
    }
    for attr in ["value", "text", "placeholder"] {
        if let Some(v) = driver.attribute(element, attr).await?
            && !v.is_empty()
        {
            return Ok(v);
        }
    }
    Ok(String::new())
}
