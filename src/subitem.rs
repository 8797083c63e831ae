//! Sub-item resolution inside composite widgets.
//!
//! A [`SubItemRegistry`] maps component types to matchers. Flat widgets
//! (lists, combo boxes, tab bars) pick the Nth item whose label matches;
//! hierarchical widgets (menus, trees) walk a `->` separated path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::criterion::Criterion;
use crate::domain::ComponentType;
use crate::driver::{Driver, candidate_text};
use crate::errors::LocatorError;
use crate::xpath::NativeLocator;

pub const LIST_ITEM_XPATH: &str = ".//li | .//option | .//*[@role='option']";
pub const COMBO_ITEM_XPATH: &str = ".//option | .//*[@role='option']";
pub const TAB_ITEM_XPATH: &str = ".//*[@role='tab'] | .//li";
pub const MENU_ITEM_XPATH: &str = "./ul/li | ./li | ./*[@role='menuitem']";
pub const TREE_ITEM_XPATH: &str = "./ul/li | ./li | ./*[@role='treeitem']";
/// Own label of a hierarchical node, excluding nested levels
pub const NODE_LABEL_XPATH: &str = "./*[self::span or self::a or self::div or self::label][1]";

/// Finds a sub-item inside a container element
#[async_trait]
pub trait Matchable<D: Driver>: Send + Sync {
    async fn find_sub_item(
        &self,
        driver: &D,
        container: &D::Element,
        criterion: &Criterion,
    ) -> Result<D::Element, LocatorError>;
}

/// Clicks a sub-item after resolving it
#[async_trait]
pub trait Clickable<D: Driver>: Matchable<D> {
    async fn click_sub_item(
        &self,
        driver: &D,
        container: &D::Element,
        criterion: &Criterion,
    ) -> Result<D::Element, LocatorError> {
        let item = self.find_sub_item(driver, container, criterion).await?;
        driver.click(&item).await?;
        Ok(item)
    }
}

fn describe(criterion: &Criterion) -> String {
    match criterion.text() {
        Some(text) => format!("sub-item '{}' #{}", text, criterion.ordinal()),
        None => format!("sub-item #{}", criterion.ordinal()),
    }
}

/// Items are siblings found by one XPath below the container
#[derive(Debug, Clone)]
pub struct ListMatcher {
    item_xpath: &'static str,
}

impl ListMatcher {
    pub fn new(item_xpath: &'static str) -> Self {
        ListMatcher { item_xpath }
    }
}

#[async_trait]
impl<D: Driver> Matchable<D> for ListMatcher {
    async fn find_sub_item(
        &self,
        driver: &D,
        container: &D::Element,
        criterion: &Criterion,
    ) -> Result<D::Element, LocatorError> {
        let items = driver
            .find_all(Some(container), &NativeLocator::XPath(self.item_xpath.to_string()))
            .await?;
        let wanted = criterion.ordinal();

        if criterion.text().is_none() {
            return items
                .into_iter()
                .nth(wanted)
                .ok_or_else(|| LocatorError::NotFound(describe(criterion)));
        }

        let mut matches = 0;
        for item in items {
            let label = candidate_text(driver, &item).await?;
            if criterion.match_text(label.trim()) {
                if matches == wanted {
                    return Ok(item);
                }
                matches += 1;
            }
        }
        debug!("{} of {} labels matched", matches, describe(criterion));
        Err(LocatorError::NotFound(describe(criterion)))
    }
}

impl<D: Driver> Clickable<D> for ListMatcher {}

/// Items nest: each node's children are found with the same XPath
#[derive(Debug, Clone)]
pub struct HierarchyMatcher {
    item_xpath: &'static str,
}

impl HierarchyMatcher {
    pub fn new(item_xpath: &'static str) -> Self {
        HierarchyMatcher { item_xpath }
    }

    async fn children<D: Driver>(&self, driver: &D, node: &D::Element) -> Result<Vec<D::Element>, LocatorError> {
        driver
            .find_all(Some(node), &NativeLocator::XPath(self.item_xpath.to_string()))
            .await
    }

    async fn label<D: Driver>(&self, driver: &D, node: &D::Element) -> Result<String, LocatorError> {
        let own = driver
            .find_all(Some(node), &NativeLocator::XPath(NODE_LABEL_XPATH.to_string()))
            .await?;
        let text = match own.first() {
            Some(label) => candidate_text(driver, label).await?,
            None => candidate_text(driver, node).await?,
        };
        Ok(text.trim().to_string())
    }

    /// Follow the per-level ordinal at each level of the path
    async fn walk_indexed<D: Driver>(
        &self,
        driver: &D,
        container: &D::Element,
        criterion: &Criterion,
    ) -> Result<D::Element, LocatorError> {
        let mut level_nodes = self.children(driver, container).await?;
        let depth = criterion.path_levels().len();
        for level in 0..depth {
            let wanted = criterion.level_ordinal(level);
            let mut matches = 0;
            let mut chosen = None;
            for node in level_nodes {
                if criterion.match_level(&self.label(driver, &node).await?, level) {
                    if matches == wanted {
                        chosen = Some(node);
                        break;
                    }
                    matches += 1;
                }
            }
            let node = chosen.ok_or_else(|| {
                LocatorError::NotFound(format!("{} at level {}", describe(criterion), level))
            })?;
            if level + 1 == depth {
                return Ok(node);
            }
            level_nodes = self.children(driver, &node).await?;
        }
        Err(LocatorError::NotFound(describe(criterion)))
    }

    /// Depth-first over complete path matches; the Nth one wins
    async fn walk_counting<D: Driver>(
        &self,
        driver: &D,
        container: &D::Element,
        criterion: &Criterion,
    ) -> Result<D::Element, LocatorError> {
        let depth = criterion.path_levels().len();
        let wanted = criterion.ordinal();
        let mut matches = 0;
        // (node, level) pairs still to visit; reversed so the first child pops first
        let mut stack: Vec<(D::Element, usize)> = self
            .children(driver, container)
            .await?
            .into_iter()
            .rev()
            .map(|n| (n, 0))
            .collect();

        while let Some((node, level)) = stack.pop() {
            if !criterion.match_level(&self.label(driver, &node).await?, level) {
                continue;
            }
            if level + 1 == depth {
                if matches == wanted {
                    return Ok(node);
                }
                matches += 1;
                continue;
            }
            for child in self.children(driver, &node).await?.into_iter().rev() {
                stack.push((child, level + 1));
            }
        }
        Err(LocatorError::NotFound(describe(criterion)))
    }
}

#[async_trait]
impl<D: Driver> Matchable<D> for HierarchyMatcher {
    async fn find_sub_item(
        &self,
        driver: &D,
        container: &D::Element,
        criterion: &Criterion,
    ) -> Result<D::Element, LocatorError> {
        if criterion.text().is_none() {
            return self
                .children(driver, container)
                .await?
                .into_iter()
                .nth(criterion.ordinal())
                .ok_or_else(|| LocatorError::NotFound(describe(criterion)));
        }
        if criterion.expected_indices().is_some() {
            self.walk_indexed(driver, container, criterion).await
        } else {
            self.walk_counting(driver, container, criterion).await
        }
    }
}

impl<D: Driver> Clickable<D> for HierarchyMatcher {}

/// Component type to sub-item matcher
pub struct SubItemRegistry<D: Driver> {
    matchers: HashMap<ComponentType, Arc<dyn Clickable<D>>>,
}

impl<D: Driver> Default for SubItemRegistry<D> {
    fn default() -> Self {
        let mut registry = SubItemRegistry {
            matchers: HashMap::new(),
        };
        registry.register(ComponentType::ListView, Arc::new(ListMatcher::new(LIST_ITEM_XPATH)));
        registry.register(ComponentType::ComboBox, Arc::new(ListMatcher::new(COMBO_ITEM_XPATH)));
        registry.register(ComponentType::TabControl, Arc::new(ListMatcher::new(TAB_ITEM_XPATH)));
        registry.register(ComponentType::Menu, Arc::new(HierarchyMatcher::new(MENU_ITEM_XPATH)));
        registry.register(ComponentType::Tree, Arc::new(HierarchyMatcher::new(TREE_ITEM_XPATH)));
        registry
    }
}

impl<D: Driver> SubItemRegistry<D> {
    /// A registry with no matchers
    pub fn empty() -> Self {
        SubItemRegistry {
            matchers: HashMap::new(),
        }
    }

    pub fn register(&mut self, component: ComponentType, matcher: Arc<dyn Clickable<D>>) {
        self.matchers.insert(component, matcher);
    }

    pub fn is_registered(&self, component: &ComponentType) -> bool {
        self.matchers.contains_key(&component.library_type())
    }

    pub fn matcher(&self, component: &ComponentType) -> Result<Arc<dyn Clickable<D>>, LocatorError> {
        self.matchers
            .get(&component.library_type())
            .cloned()
            .ok_or_else(|| LocatorError::UnregisteredType(component.to_string()))
    }
}

#[cfg(test)]
#[path = "subitem_test.rs"]
mod subitem_test;
