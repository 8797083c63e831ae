//! In-memory [`Driver`] for exercising the engine without a browser.
//!
//! Elements live in documents: the top document, or the document of a frame
//! element. Lookups by id, name, class name and tag name are answered from
//! element attributes. Any other locator (XPath, CSS, link text) answers
//! from rules registered with [`MockDriver::on_find`] and friends.
//!
//! ```
//! use rsprobe::mock::{MockDriver, MockNode};
//!
//! let driver = MockDriver::new("https://app.test/");
//! let ok = driver.add(MockNode::new("button").attr("id", "btnOK").text("OK"));
//! let frame = driver.add(MockNode::new("iframe").attr("id", "f1"));
//! let inner = driver.add_in_frame(&frame, MockNode::new("button").attr("id", "btnOK"));
//! assert_ne!(ok, inner);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::driver::{Driver, ScriptArg};
use crate::errors::LocatorError;
use crate::types::Rect;
use crate::xpath::NativeLocator;

/// Handle to an element held by a [`MockDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockElement(usize);

impl MockElement {
    pub fn id(&self) -> usize {
        self.0
    }
}

/// Description of an element to add to the mock page
#[derive(Debug, Clone)]
pub struct MockNode {
    tag: String,
    text: String,
    attrs: HashMap<String, String>,
    displayed: bool,
    rect: Rect,
}

impl MockNode {
    pub fn new(tag: &str) -> Self {
        MockNode {
            tag: tag.to_lowercase(),
            text: String::new(),
            attrs: HashMap::new(),
            displayed: true,
            rect: Rect::default(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect::new(x, y, width, height);
        self
    }
}

#[derive(Debug)]
struct Node {
    spec: MockNode,
    document: Option<usize>,
    parent: Option<usize>,
    stale: bool,
}

struct FindRule {
    document: Option<usize>,
    scope: Option<usize>,
    locator: NativeLocator,
    results: Vec<usize>,
}

type ScriptHandler =
    Arc<dyn Fn(&[ScriptArg<MockElement>]) -> Result<Value, LocatorError> + Send + Sync>;

struct ScriptRule {
    fragment: String,
    delay: Duration,
    handler: ScriptHandler,
}

#[derive(Default)]
struct MockState {
    url: String,
    nodes: Vec<Node>,
    rules: Vec<FindRule>,
    scripts: Vec<ScriptRule>,
    current: Option<usize>,
    frame_switches: Vec<Option<usize>>,
    clicks: Vec<usize>,
    executed: Vec<String>,
    session_closed: bool,
}

/// Scriptable in-memory browser session
#[derive(Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new(url: &str) -> Self {
        MockDriver {
            state: Arc::new(Mutex::new(MockState {
                url: url.to_string(),
                ..MockState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic in another test thread must not hide this test's result
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(&self, spec: MockNode, document: Option<usize>, parent: Option<usize>) -> MockElement {
        let mut state = self.lock();
        state.nodes.push(Node {
            spec,
            document,
            parent,
            stale: false,
        });
        MockElement(state.nodes.len() - 1)
    }

    /// Add an element to the top document
    pub fn add(&self, node: MockNode) -> MockElement {
        self.insert(node, None, None)
    }

    /// Add an element to the document of `frame`
    pub fn add_in_frame(&self, frame: &MockElement, node: MockNode) -> MockElement {
        self.insert(node, Some(frame.0), None)
    }

    /// Add an element as a descendant of `parent`, in the parent's document
    pub fn add_child(&self, parent: &MockElement, node: MockNode) -> MockElement {
        let document = self.lock().nodes.get(parent.0).and_then(|n| n.document);
        self.insert(node, document, Some(parent.0))
    }

    /// Answer `locator` in the top document with `results`
    pub fn on_find(&self, locator: NativeLocator, results: &[MockElement]) {
        self.push_rule(None, None, locator, results);
    }

    /// Answer `locator` inside the document of `frame`
    pub fn on_find_in_frame(&self, frame: &MockElement, locator: NativeLocator, results: &[MockElement]) {
        self.push_rule(Some(frame.0), None, locator, results);
    }

    /// Answer `locator` scoped to the subtree of `scope`
    pub fn on_find_within(&self, scope: &MockElement, locator: NativeLocator, results: &[MockElement]) {
        let document = self.lock().nodes.get(scope.0).and_then(|n| n.document);
        self.push_rule(document, Some(scope.0), locator, results);
    }

    fn push_rule(
        &self,
        document: Option<usize>,
        scope: Option<usize>,
        locator: NativeLocator,
        results: &[MockElement],
    ) {
        self.lock().rules.push(FindRule {
            document,
            scope,
            locator,
            results: results.iter().map(|e| e.0).collect(),
        });
    }

    /// Answer scripts containing `fragment` with a fixed value
    pub fn on_script(&self, fragment: &str, value: Value) {
        self.on_script_with(fragment, move |_| Ok(value.clone()));
    }

    /// Answer scripts containing `fragment` by calling `handler`
    pub fn on_script_with<F>(&self, fragment: &str, handler: F)
    where
        F: Fn(&[ScriptArg<MockElement>]) -> Result<Value, LocatorError> + Send + Sync + 'static,
    {
        self.push_script(fragment, Duration::ZERO, Arc::new(handler));
    }

    /// Answer scripts containing `fragment` after `delay`
    pub fn on_script_delayed(&self, fragment: &str, delay: Duration, value: Value) {
        self.push_script(fragment, delay, Arc::new(move |_| Ok(value.clone())));
    }

    fn push_script(&self, fragment: &str, delay: Duration, handler: ScriptHandler) {
        // Later registrations take precedence
        self.lock().scripts.insert(
            0,
            ScriptRule {
                fragment: fragment.to_string(),
                delay,
                handler,
            },
        );
    }

    pub fn navigate(&self, url: &str) {
        self.lock().url = url.to_string();
    }

    pub fn set_stale(&self, element: &MockElement, stale: bool) {
        if let Some(node) = self.lock().nodes.get_mut(element.0) {
            node.stale = stale;
        }
    }

    pub fn set_displayed(&self, element: &MockElement, displayed: bool) {
        if let Some(node) = self.lock().nodes.get_mut(element.0) {
            node.spec.displayed = displayed;
        }
    }

    pub fn set_attr(&self, element: &MockElement, name: &str, value: &str) {
        if let Some(node) = self.lock().nodes.get_mut(element.0) {
            node.spec.attrs.insert(name.to_string(), value.to_string());
        }
    }

    /// End the session; every later call fails with `NoSession`
    pub fn close_session(&self) {
        self.lock().session_closed = true;
    }

    pub fn is_session_closed(&self) -> bool {
        self.lock().session_closed
    }

    /// Frame element whose document is current, `None` for the top document
    pub fn current_document(&self) -> Option<MockElement> {
        self.lock().current.map(MockElement)
    }

    /// Every frame switch in order, `None` for a switch to the top document
    pub fn frame_switches(&self) -> Vec<Option<MockElement>> {
        self.lock()
            .frame_switches
            .iter()
            .map(|s| s.map(MockElement))
            .collect()
    }

    pub fn clicks(&self) -> Vec<MockElement> {
        self.lock().clicks.iter().copied().map(MockElement).collect()
    }

    pub fn executed_scripts(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    fn is_descendant(state: &MockState, node: usize, ancestor: usize) -> bool {
        let mut cursor = state.nodes.get(node).and_then(|n| n.parent);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = state.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn with_node<T>(
        &self,
        element: &MockElement,
        f: impl FnOnce(&Node) -> T,
    ) -> Result<T, LocatorError> {
        let state = self.lock();
        if state.session_closed {
            return Err(LocatorError::NoSession("session closed".to_string()));
        }
        let node = state
            .nodes
            .get(element.0)
            .ok_or_else(|| LocatorError::StaleReference(format!("unknown element {}", element.0)))?;
        if node.stale {
            return Err(LocatorError::StaleReference(format!(
                "element {} is not attached to the page document",
                element.0
            )));
        }
        Ok(f(node))
    }

    fn attribute_match(node: &Node, locator: &NativeLocator) -> bool {
        match locator {
            NativeLocator::Id(v) => node.spec.attrs.get("id") == Some(v),
            NativeLocator::Name(v) => node.spec.attrs.get("name") == Some(v),
            NativeLocator::ClassName(v) => node
                .spec
                .attrs
                .get("class")
                .is_some_and(|c| c.split_whitespace().any(|t| t == v)),
            NativeLocator::TagName(v) => node.spec.tag.eq_ignore_ascii_case(v),
            _ => false,
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Element = MockElement;

    async fn find_all(
        &self,
        scope: Option<&MockElement>,
        locator: &NativeLocator,
    ) -> Result<Vec<MockElement>, LocatorError> {
        if let Some(scope) = scope {
            self.with_node(scope, |_| ())?;
        }
        let state = self.lock();
        if state.session_closed {
            return Err(LocatorError::NoSession("session closed".to_string()));
        }
        let document = state.current;
        let scope = scope.map(|s| s.0);

        let rule = state.rules.iter().rev().find(|r| {
            r.document == document && &r.locator == locator && (r.scope.is_none() || r.scope == scope)
        });
        if let Some(rule) = rule {
            return Ok(rule.results.iter().copied().map(MockElement).collect());
        }

        let found = state
            .nodes
            .iter()
            .enumerate()
            .filter(|(id, node)| {
                node.document == document
                    && !node.stale
                    && scope.is_none_or(|s| Self::is_descendant(&state, *id, s))
                    && Self::attribute_match(node, locator)
            })
            .map(|(id, _)| MockElement(id))
            .collect();
        Ok(found)
    }

    async fn execute(
        &self,
        script: &str,
        args: Vec<ScriptArg<MockElement>>,
    ) -> Result<Value, LocatorError> {
        let (delay, handler) = {
            let mut state = self.lock();
            if state.session_closed {
                return Err(LocatorError::NoSession("session closed".to_string()));
            }
            state.executed.push(script.to_string());
            match state.scripts.iter().find(|r| script.contains(&r.fragment)) {
                Some(rule) => (rule.delay, Some(Arc::clone(&rule.handler))),
                None => (Duration::ZERO, None),
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match handler {
            Some(handler) => handler(&args),
            None => Ok(Value::Null),
        }
    }

    async fn execute_async(
        &self,
        script: &str,
        args: Vec<ScriptArg<MockElement>>,
    ) -> Result<Value, LocatorError> {
        self.execute(script, args).await
    }

    async fn switch_to_frame(&self, frame: &MockElement) -> Result<(), LocatorError> {
        self.with_node(frame, |_| ())?;
        let mut state = self.lock();
        state.current = Some(frame.0);
        state.frame_switches.push(Some(frame.0));
        Ok(())
    }

    async fn switch_to_top(&self) -> Result<(), LocatorError> {
        let mut state = self.lock();
        if state.session_closed {
            return Err(LocatorError::NoSession("session closed".to_string()));
        }
        state.current = None;
        state.frame_switches.push(None);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, LocatorError> {
        let state = self.lock();
        if state.session_closed {
            return Err(LocatorError::NoSession("session closed".to_string()));
        }
        Ok(state.url.clone())
    }

    async fn is_displayed(&self, element: &MockElement) -> Result<bool, LocatorError> {
        self.with_node(element, |n| n.spec.displayed)
    }

    async fn text(&self, element: &MockElement) -> Result<String, LocatorError> {
        self.with_node(element, |n| n.spec.text.clone())
    }

    async fn attribute(
        &self,
        element: &MockElement,
        name: &str,
    ) -> Result<Option<String>, LocatorError> {
        self.with_node(element, |n| n.spec.attrs.get(name).cloned())
    }

    async fn tag_name(&self, element: &MockElement) -> Result<String, LocatorError> {
        self.with_node(element, |n| n.spec.tag.clone())
    }

    async fn rect(&self, element: &MockElement) -> Result<Rect, LocatorError> {
        self.with_node(element, |n| n.spec.rect)
    }

    async fn click(&self, element: &MockElement) -> Result<(), LocatorError> {
        self.with_node(element, |_| ())?;
        self.lock().clicks.push(element.0);
        Ok(())
    }

    async fn close(&self) -> Result<(), LocatorError> {
        let mut state = self.lock();
        if state.session_closed {
            return Err(LocatorError::NoSession("session closed".to_string()));
        }
        state.session_closed = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_test.rs"]
mod mock_test;
