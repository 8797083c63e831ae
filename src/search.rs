//! Recognition-string resolution against a live session.
//!
//! A [`SearchContext`] owns everything one browser session needs: the frame
//! pointer, the type table, the sub-item registry and the script executor.
//! Every lookup goes through it, so concurrent sessions never share state.
//!
//! ```no_run
//! # async fn demo(driver: std::sync::Arc<rsprobe::mock::MockDriver>) -> Result<(), rsprobe::LocatorError> {
//! use rsprobe::{EngineConfig, SearchContext};
//!
//! let mut ctx = SearchContext::new(driver, EngineConfig::default());
//! let ok = ctx.find_one("FRAMEID=f1;\\;id=btnOK").await?;
//! let rows = ctx.find_all("TYPE=DOJO.ListView;id=fruits;ITEMINDEX=2").await;
//! # let _ = (ok, rows);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::criterion::Criterion;
use crate::domain::{self, ComponentType, Domain, TypeMapper, TypeResolver};
use crate::driver::{Driver, candidate_text};
use crate::errors::LocatorError;
use crate::frame::{FrameContext, FrameElement};
use crate::matcher::{self, Fallback, collect_candidates, nth_displayed};
use crate::recognition::{Grammar, RecognitionString, Segment};
use crate::script::{EventHub, ScriptExecutor};
use crate::subitem::SubItemRegistry;
use crate::types::{ElementReport, Position, Size};
use crate::window::BrowserWindow;
use crate::xpath::{CompiledQuery, PostFilters, compile_segment};

/// Per-session resolution context
pub struct SearchContext<D: Driver> {
    driver: Arc<D>,
    config: EngineConfig,
    frames: FrameContext<D::Element>,
    executor: ScriptExecutor<D>,
    mapper: TypeMapper,
    registry: SubItemRegistry<D>,
    window: BrowserWindow,
}

impl<D: Driver> SearchContext<D> {
    pub fn new(driver: Arc<D>, config: EngineConfig) -> Self {
        let mut frames = FrameContext::new(config.page_settle());
        frames.set_bypass_reset(config.bypass_frame_reset);
        SearchContext {
            executor: ScriptExecutor::new(Arc::clone(&driver), config.script_timeout()),
            mapper: TypeMapper::new(&config.class_types),
            registry: SubItemRegistry::default(),
            window: BrowserWindow::default(),
            frames,
            driver,
            config,
        }
    }

    /// Replace the sub-item registry
    pub fn with_registry(mut self, registry: SubItemRegistry<D>) -> Self {
        self.registry = registry;
        self
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grammar(&self) -> &Grammar {
        &self.config.grammar
    }

    pub fn executor(&self) -> &ScriptExecutor<D> {
        &self.executor
    }

    pub fn registry_mut(&mut self) -> &mut SubItemRegistry<D> {
        &mut self.registry
    }

    /// Event hub polling at the configured interval
    pub fn event_hub(&self) -> EventHub<D> {
        EventHub::new(self.executor.clone(), self.config.event_poll_interval())
    }

    fn resolver(&self) -> TypeResolver<'_, D> {
        TypeResolver {
            executor: &self.executor,
            mapper: &self.mapper,
        }
    }

    /// Resolve `rs` to one element
    pub async fn find_one(&mut self, rs: &str) -> Result<D::Element, LocatorError> {
        self.first_with_retry(None, rs).await
    }

    /// Resolve `rs` below `parent`. Frame segments are ignored.
    pub async fn find_one_within(
        &mut self,
        parent: &D::Element,
        rs: &str,
    ) -> Result<D::Element, LocatorError> {
        self.first_with_retry(Some(parent), rs).await
    }

    /// Resolve `rs` to every matching element. Failures yield an empty list.
    pub async fn find_all(&mut self, rs: &str) -> Vec<D::Element> {
        self.all_or_empty(None, rs).await
    }

    pub async fn find_all_within(&mut self, parent: &D::Element, rs: &str) -> Vec<D::Element> {
        self.all_or_empty(Some(parent), rs).await
    }

    async fn first_with_retry(
        &mut self,
        parent: Option<&D::Element>,
        rs: &str,
    ) -> Result<D::Element, LocatorError> {
        let found = match self.resolve(parent, rs, false).await {
            Err(LocatorError::StaleReference(msg)) => {
                debug!("Stale reference resolving '{}', retrying once: {}", rs, msg);
                self.frames.recover(self.driver.as_ref()).await?;
                self.resolve(parent, rs, false).await?
            }
            other => other?,
        };
        found
            .into_iter()
            .next()
            .ok_or_else(|| LocatorError::NotFound(rs.to_string()))
    }

    async fn all_or_empty(&mut self, parent: Option<&D::Element>, rs: &str) -> Vec<D::Element> {
        let found = match self.resolve(parent, rs, true).await {
            Err(LocatorError::StaleReference(msg)) => {
                debug!("Stale reference resolving '{}', retrying once: {}", rs, msg);
                match self.frames.recover(self.driver.as_ref()).await {
                    Ok(()) => self.resolve(parent, rs, true).await,
                    Err(e) => Err(e),
                }
            }
            other => other,
        };
        match found {
            Ok(elements) => elements,
            Err(e) => {
                debug!("No elements for '{}': {}", rs, e);
                Vec::new()
            }
        }
    }

    /// Walk the segments of `rs`. Every segment but the last narrows the
    /// scope to one element; the last yields a list when `all` is set.
    async fn resolve(
        &mut self,
        parent: Option<&D::Element>,
        rs: &str,
        all: bool,
    ) -> Result<Vec<D::Element>, LocatorError> {
        let parsed = RecognitionString::parse(rs, &self.config.grammar);
        let segments = match parent {
            Some(parent) => {
                let (frames, rest): (Vec<Segment>, Vec<Segment>) =
                    parsed.into_segments().into_iter().partition(Segment::is_frame_segment);
                if !frames.is_empty() {
                    debug!("Ignoring frame segments of '{}' inside a parent scope", rs);
                }
                if rest.is_empty() {
                    return Ok(vec![parent.clone()]);
                }
                rest
            }
            None => {
                let segments = self.frames.apply(self.driver.as_ref(), parsed.into_segments()).await?;
                if segments.is_empty() {
                    vec![Segment::single("xpath", "/html")]
                } else {
                    segments
                }
            }
        };

        let queries = self.compile(&segments)?;
        let mut scope = parent.cloned();
        let last = queries.len() - 1;
        for (i, query) in queries.iter().enumerate() {
            if all && i == last {
                return self.select_many(scope.as_ref(), query).await;
            }
            scope = Some(self.select_single(scope.as_ref(), query).await?);
        }
        Ok(scope.into_iter().collect())
    }

    fn compile(&self, segments: &[Segment]) -> Result<Vec<CompiledQuery>, LocatorError> {
        let mut queries = Vec::with_capacity(segments.len());
        for segment in segments {
            match compile_segment(segment, &self.config.grammar) {
                Ok(query) => queries.push(query),
                Err(e) if e.is_recoverable() => warn!("Skipping segment '{}': {}", segment.raw, e),
                Err(e) => return Err(e),
            }
        }
        if queries.is_empty() {
            let raw: Vec<&str> = segments.iter().map(|s| s.raw.as_str()).collect();
            return Err(LocatorError::NotFound(format!(
                "no usable segment in '{}'",
                raw.join(&self.config.grammar.child_separator)
            )));
        }
        Ok(queries)
    }

    async fn select_single(
        &self,
        scope: Option<&D::Element>,
        query: &CompiledQuery,
    ) -> Result<D::Element, LocatorError> {
        let driver = self.driver.as_ref();
        let missing = || LocatorError::NotFound(query.locator.to_string());

        let element = if let Some(filter) = &query.text_filter {
            let elements = driver.find_all(scope, &query.locator).await?;
            let candidates = collect_candidates(driver, elements, &filter.source).await?;
            matcher::select_one(&candidates, &filter.text, filter.partial, Fallback::FirstCandidate)
                .map(|c| c.element.clone())
                .ok_or_else(missing)?
        } else if let Some(index) = query.post.index {
            let elements = driver.find_all(scope, &query.locator).await?;
            nth_displayed(&self.resolver(), elements, index, query.post.type_filter.as_deref())
                .await?
                .ok_or_else(missing)?
        } else {
            driver.find_one(scope, &query.locator).await?
        };
        self.apply_sub_item(element, &query.post).await
    }

    async fn select_many(
        &self,
        scope: Option<&D::Element>,
        query: &CompiledQuery,
    ) -> Result<Vec<D::Element>, LocatorError> {
        let driver = self.driver.as_ref();
        let elements = driver.find_all(scope, &query.locator).await?;

        let elements = if let Some(filter) = &query.text_filter {
            let candidates = collect_candidates(driver, elements, &filter.source).await?;
            match matcher::select_all(&candidates, &filter.text, filter.partial) {
                Some((tier, hits)) => {
                    debug!("{} element(s) matched '{}' at {:?}", hits.len(), filter.text, tier);
                    hits.into_iter().map(|c| c.element.clone()).collect()
                }
                None => Vec::new(),
            }
        } else if let Some(index) = query.post.index {
            nth_displayed(&self.resolver(), elements, index, query.post.type_filter.as_deref())
                .await?
                .into_iter()
                .collect()
        } else {
            elements
        };

        if !query.post.has_sub_item() {
            return Ok(elements);
        }
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            match self.apply_sub_item(element, &query.post).await {
                Ok(item) => items.push(item),
                Err(e) => debug!("Sub-item not resolved: {}", e),
            }
        }
        Ok(items)
    }

    /// ITEMINDEX wins over PATH; neither leaves the element as is
    async fn apply_sub_item(
        &self,
        element: D::Element,
        post: &PostFilters,
    ) -> Result<D::Element, LocatorError> {
        let criterion = if let Some(index) = post.item_index {
            Criterion::by_index(index)
        } else if let Some(path) = &post.path {
            let grammar = &self.config.grammar;
            Criterion::path_with_index_str(path, false, "", &grammar.path_separator, grammar.escape)?
        } else {
            return Ok(element);
        };
        self.resolve_sub_item(&element, &criterion).await
    }

    /// Find a sub-item of `container` with the matcher registered for its
    /// component type
    pub async fn resolve_sub_item(
        &self,
        container: &D::Element,
        criterion: &Criterion,
    ) -> Result<D::Element, LocatorError> {
        let component = self.resolver().component_type(container).await?;
        debug!("Resolving {:?} inside a {}", criterion.text(), component);
        let matcher = self.registry.matcher(&component)?;
        matcher
            .find_sub_item(self.driver.as_ref(), container, criterion)
            .await
    }

    /// Resolve then click a sub-item of `container`
    pub async fn click_sub_item(
        &self,
        container: &D::Element,
        criterion: &Criterion,
    ) -> Result<D::Element, LocatorError> {
        let component = self.resolver().component_type(container).await?;
        let matcher = self.registry.matcher(&component)?;
        matcher
            .click_sub_item(self.driver.as_ref(), container, criterion)
            .await
    }

    /// Toolkit of `element`, asking the page when attributes are silent
    pub async fn classify(&self, element: &D::Element) -> Result<Domain, LocatorError> {
        domain::classify_thorough(&self.executor, element).await
    }

    pub async fn component_type(&self, element: &D::Element) -> Result<ComponentType, LocatorError> {
        self.resolver().component_type(element).await
    }

    pub fn current_frame(&self) -> Option<Arc<FrameElement<D::Element>>> {
        self.frames.current()
    }

    /// Point at `frame` and enter it
    pub async fn set_current_frame(
        &mut self,
        frame: Option<Arc<FrameElement<D::Element>>>,
    ) -> Result<(), LocatorError> {
        self.frames.set_current(frame);
        self.frames.reenter(self.driver.as_ref()).await
    }

    pub async fn reset_frame(&mut self) -> Result<(), LocatorError> {
        self.frames.reset(self.driver.as_ref()).await
    }

    pub fn set_bypass_frame_reset(&mut self, bypass: bool) {
        self.frames.set_bypass_reset(bypass);
    }

    /// Screen coordinates of an element in the current frame
    pub async fn screen_location(&mut self, element: &D::Element) -> Result<Position, LocatorError> {
        let rect = self.driver.rect(element).await?;
        self.window.refresh(&self.executor).await;
        let frame = self.frames.current();
        Ok(self.window.screen_location(&rect, frame.as_deref()))
    }

    /// Summarize a resolved element for output
    pub async fn report(&mut self, rs: &str, element: &D::Element) -> Result<ElementReport, LocatorError> {
        let driver = Arc::clone(&self.driver);
        let rect = driver.rect(element).await?;
        let text = candidate_text(driver.as_ref(), element).await?;
        let frame_path = self
            .frames
            .current()
            .map(|f| f.chain().iter().map(|c| c.label().to_string()).collect())
            .unwrap_or_default();

        Ok(ElementReport {
            recognition_string: rs.to_string(),
            tag_name: driver.tag_name(element).await?.to_lowercase(),
            id: driver.attribute(element, "id").await?,
            text: (!text.trim().is_empty()).then(|| text.trim().to_string()),
            domain: self.classify(element).await?.to_string(),
            component_type: self.component_type(element).await?.to_string(),
            position: Position::px(rect.x, rect.y),
            size: Size::px(rect.width, rect.height),
            screen_position: self.screen_location(element).await?,
            frame_path,
            resolved_at: Utc::now(),
        })
    }
}

#[cfg(test)]
#[path = "search_test.rs"]
mod search_test;
