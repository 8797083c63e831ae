//! Frame nesting and the current-frame pointer.
//!
//! Frame qualifiers in a recognition string are absolute: resolution starts
//! from the top document and enters each frame in order. A string without
//! frame qualifiers resolves inside the frame chain established earlier,
//! which is re-entered from the top.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::driver::Driver;
use crate::errors::LocatorError;
use crate::recognition::{FrameKey, Qualifier, Segment};
use crate::types::{Position, Rect, Size};
use crate::xpath::{NativeLocator, quote};

/// Where the session context currently points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameState {
    Top,
    InFrame,
    /// A frame string is being applied
    Resolving,
}

/// One entered frame, linked to the frame that contains it
#[derive(Debug)]
pub struct FrameElement<E> {
    parent: Option<Arc<FrameElement<E>>>,
    handle: E,
    location: Position,
    size: Size,
    id: Option<String>,
    name: Option<String>,
}

impl<E> FrameElement<E> {
    /// `rect` is the frame element's rectangle in its parent's document
    pub fn new(
        parent: Option<Arc<FrameElement<E>>>,
        handle: E,
        rect: Rect,
        id: Option<String>,
        name: Option<String>,
    ) -> Self {
        let (px, py) = parent
            .as_ref()
            .map(|p| (p.location.x, p.location.y))
            .unwrap_or((0.0, 0.0));
        FrameElement {
            parent,
            handle,
            location: Position::px(rect.x + px, rect.y + py),
            size: Size::px(rect.width, rect.height),
            id,
            name,
        }
    }

    pub fn parent(&self) -> Option<&Arc<FrameElement<E>>> {
        self.parent.as_ref()
    }

    pub fn handle(&self) -> &E {
        &self.handle
    }

    /// Offset of this frame's document from the top document
    pub fn location(&self) -> &Position {
        &self.location
    }

    pub fn size(&self) -> &Size {
        &self.size
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Id, else name, else `frame`
    pub fn label(&self) -> &str {
        self.id().or(self.name()).unwrap_or("frame")
    }

    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }

    /// The chain from the outermost frame down to this one
    pub fn chain(&self) -> Vec<&FrameElement<E>> {
        let mut chain = vec![self];
        let mut cursor = self.parent.as_deref();
        while let Some(frame) = cursor {
            chain.push(frame);
            cursor = frame.parent.as_deref();
        }
        chain.reverse();
        chain
    }

    /// Same id and name at every level
    pub fn same_content(&self, other: &FrameElement<E>) -> bool {
        let mine = self.chain();
        let theirs = other.chain();
        mine.len() == theirs.len()
            && mine
                .iter()
                .zip(theirs.iter())
                .all(|(a, b)| a.id == b.id && a.name == b.name)
    }
}

/// How a frame qualifier's value locates frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLocator {
    Id { value: String, partial: bool },
    Name(String),
    XPath(String),
    /// 1-based position among frames
    Index(usize),
    /// `null` returns to the top document
    Top,
}

impl FrameLocator {
    pub fn from_qualifier(key: FrameKey, qualifier: &Qualifier) -> Result<Self, LocatorError> {
        let value = qualifier.value.trim();
        if value.eq_ignore_ascii_case("null") {
            return Ok(FrameLocator::Top);
        }
        match key {
            FrameKey::Id | FrameKey::IFrameId => Ok(FrameLocator::Id {
                value: value.to_string(),
                partial: qualifier.is_partial(),
            }),
            FrameKey::Name => Ok(FrameLocator::Name(value.to_string())),
            FrameKey::XPath => Ok(FrameLocator::XPath(value.to_string())),
            FrameKey::Index => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .map(FrameLocator::Index)
                .ok_or_else(|| {
                    LocatorError::Parse(format!("FRAMEINDEX '{}' is not a 1-based number", value))
                }),
        }
    }

    /// Locators to try in order
    fn attempts(&self) -> Vec<(NativeLocator, Option<usize>)> {
        match self {
            FrameLocator::Id { value, partial: false } => vec![(NativeLocator::Id(value.clone()), None)],
            FrameLocator::Id { value, partial: true } => vec![(
                NativeLocator::XPath(format!(
                    "//iframe[contains(@id, {q})] | //frame[contains(@id, {q})]",
                    q = quote(value)
                )),
                None,
            )],
            FrameLocator::Name(name) => vec![(NativeLocator::Name(name.clone()), None)],
            FrameLocator::XPath(xpath) => vec![(NativeLocator::XPath(xpath.clone()), None)],
            FrameLocator::Index(n) => vec![
                (NativeLocator::XPath(format!("//frame[{n}]")), None),
                (NativeLocator::XPath(format!("//iframe[{n}]")), None),
                (NativeLocator::XPath("//frame".to_string()), Some(n - 1)),
                (NativeLocator::XPath("//iframe".to_string()), Some(n - 1)),
            ],
            FrameLocator::Top => Vec::new(),
        }
    }
}

/// Per-session frame tracking
#[derive(Debug)]
pub struct FrameContext<E> {
    current: Option<Arc<FrameElement<E>>>,
    state: FrameState,
    bypass_reset: bool,
    last_visited_url: Option<String>,
    settle: Duration,
}

impl<E: Clone + Send + Sync + std::fmt::Debug + 'static> FrameContext<E> {
    /// `settle` is how long to let a navigation finish before comparing URLs
    pub fn new(settle: Duration) -> Self {
        FrameContext {
            current: None,
            state: FrameState::Top,
            bypass_reset: false,
            last_visited_url: None,
            settle,
        }
    }

    pub fn current(&self) -> Option<Arc<FrameElement<E>>> {
        self.current.clone()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn bypass_reset(&self) -> bool {
        self.bypass_reset
    }

    pub fn set_bypass_reset(&mut self, bypass: bool) {
        info!("Frame reset bypass {}", if bypass { "enabled" } else { "disabled" });
        self.bypass_reset = bypass;
    }

    /// Replace the pointer without touching the session
    pub fn set_current(&mut self, frame: Option<Arc<FrameElement<E>>>) {
        self.state = if frame.is_some() { FrameState::InFrame } else { FrameState::Top };
        self.current = frame;
    }

    /// Return to the top document and forget the frame chain
    pub async fn reset<D: Driver<Element = E>>(&mut self, driver: &D) -> Result<(), LocatorError> {
        if self.bypass_reset {
            debug!("Frame reset bypassed");
            return Ok(());
        }
        driver.switch_to_top().await?;
        self.current = None;
        self.state = FrameState::Top;
        Ok(())
    }

    /// Find the frame element for `locator` in the current document
    async fn locate<D: Driver<Element = E>>(
        driver: &D,
        locator: &FrameLocator,
    ) -> Result<Option<E>, LocatorError> {
        for (native, nth) in locator.attempts() {
            let found = match driver.find_all(None, &native).await {
                Ok(found) => found,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            let pick = match nth {
                Some(n) => found.into_iter().nth(n),
                None => found.into_iter().next(),
            };
            if pick.is_some() {
                return Ok(pick);
            }
        }
        Ok(None)
    }

    /// Enter the frame named by `locator` below `parent`, which must be the
    /// current session context.
    pub async fn switch_to<D: Driver<Element = E>>(
        driver: &D,
        parent: Option<Arc<FrameElement<E>>>,
        locator: &FrameLocator,
    ) -> Result<Option<Arc<FrameElement<E>>>, LocatorError> {
        if *locator == FrameLocator::Top {
            driver.switch_to_top().await?;
            return Ok(None);
        }
        if let FrameLocator::Index(n) = locator {
            warn!("FRAMEINDEX={} is slow and fragile; prefer FRAMEID or FRAMENAME", n);
        }

        let handle = Self::locate(driver, locator)
            .await?
            .ok_or_else(|| LocatorError::FrameNotFound(format!("{:?}", locator)))?;
        let rect = driver.rect(&handle).await?;
        let id = driver.attribute(&handle, "id").await?;
        let name = driver.attribute(&handle, "name").await?;
        driver.switch_to_frame(&handle).await?;

        let frame = FrameElement::new(parent, handle, rect, id, name);
        debug!("Entered frame '{}' at depth {}", frame.label(), frame.depth());
        Ok(Some(Arc::new(frame)))
    }

    /// Switch from the top document down through the cached chain
    pub async fn reenter<D: Driver<Element = E>>(&self, driver: &D) -> Result<(), LocatorError> {
        driver.switch_to_top().await?;
        if let Some(current) = &self.current {
            for frame in current.chain() {
                driver.switch_to_frame(frame.handle()).await?;
            }
        }
        Ok(())
    }

    /// Re-enter the cached chain, dropping it when it cannot be recovered.
    ///
    /// A stale handle after the page URL changed means the chain belongs to
    /// a previous document. The pointer is cleared and the search continues
    /// from the top.
    pub async fn recover<D: Driver<Element = E>>(&mut self, driver: &D) -> Result<(), LocatorError> {
        match self.reenter(driver).await {
            Ok(()) => return Ok(()),
            Err(LocatorError::StaleReference(msg)) => {
                if !self.settle.is_zero() {
                    tokio::time::sleep(self.settle).await;
                }
                let now = driver.current_url().await.ok();
                if now != self.last_visited_url {
                    warn!(
                        "Frame chain went stale after navigation to {:?}; continuing from the top document",
                        now
                    );
                    return self.drop_chain(driver, now).await;
                }
                debug!("Frame chain stale on the same page, retrying once: {}", msg);
                match self.reenter(driver).await {
                    Ok(()) => return Ok(()),
                    Err(e) => warn!("Frame chain could not be re-entered: {}", e),
                }
            }
            Err(e @ LocatorError::NoSession(_)) => return Err(e),
            Err(e) => warn!("Frame chain could not be re-entered: {}", e),
        }
        let now = driver.current_url().await.ok();
        self.drop_chain(driver, now).await
    }

    async fn drop_chain<D: Driver<Element = E>>(
        &mut self,
        driver: &D,
        url: Option<String>,
    ) -> Result<(), LocatorError> {
        self.current = None;
        self.state = FrameState::Top;
        self.last_visited_url = url;
        driver.switch_to_top().await
    }

    /// Apply the frame segments of a top-level search and return the rest.
    ///
    /// Malformed frame segments are skipped. On a frame miss the previous
    /// chain is restored and `FrameNotFound` is returned.
    pub async fn apply<D: Driver<Element = E>>(
        &mut self,
        driver: &D,
        segments: Vec<Segment>,
    ) -> Result<Vec<Segment>, LocatorError> {
        if self.bypass_reset {
            let (frames, rest): (Vec<_>, Vec<_>) =
                segments.into_iter().partition(Segment::is_frame_segment);
            if !frames.is_empty() {
                debug!("Ignoring {} frame segment(s) while frame reset is bypassed", frames.len());
            }
            return Ok(or_document_root(rest));
        }

        if !segments.iter().any(Segment::is_frame_segment) {
            self.recover(driver).await?;
            return Ok(segments);
        }

        let url = driver.current_url().await.ok();

        let previous_state = self.state;
        self.state = FrameState::Resolving;
        driver.switch_to_top().await?;

        let mut chain: Option<Arc<FrameElement<E>>> = None;
        let mut rest = Vec::with_capacity(segments.len());
        for segment in segments {
            if !segment.is_frame_segment() {
                rest.push(segment);
                continue;
            }
            let Some((key, qualifier)) = segment.frame_qualifier() else {
                continue;
            };
            let locator = match FrameLocator::from_qualifier(key, qualifier) {
                Ok(locator) => locator,
                Err(e) => {
                    warn!("Skipping frame segment '{}': {}", segment.raw, e);
                    continue;
                }
            };
            match Self::switch_to(driver, chain.clone(), &locator).await {
                Ok(next) => chain = next,
                Err(e) => {
                    warn!("Frame segment '{}' failed: {}", segment.raw, e);
                    self.state = previous_state;
                    if let Err(restore) = self.recover(driver).await {
                        debug!("Could not restore the previous frame chain: {}", restore);
                    }
                    return Err(e);
                }
            }
        }

        self.set_current(chain);
        self.last_visited_url = url;
        Ok(or_document_root(rest))
    }
}

/// A string made only of frame segments addresses the frame document itself
fn or_document_root(segments: Vec<Segment>) -> Vec<Segment> {
    if segments.is_empty() {
        vec![Segment::single("xpath", "/html")]
    } else {
        segments
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;
