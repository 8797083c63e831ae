//! Compile recognition-string segments into native locators.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::Domain;
use crate::errors::LocatorError;
use crate::recognition::{Grammar, ModePrefix, QualifierName, Segment, tokenize};

pub const RELATIVE_MATCHING_ALL_START: &str = ".//*[";
pub const RELATIVE_MATCHING_DIV_START: &str = ".//DIV[";
pub const TRUE_CONDITION: &str = "(1=1)";
pub const END: &str = "]";
pub const AND: &str = " and ";

/// Locator strategies a WebDriver understands
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "using", content = "value", rename_all = "snake_case")]
pub enum NativeLocator {
    Id(String),
    Name(String),
    ClassName(String),
    LinkText(String),
    PartialLinkText(String),
    TagName(String),
    XPath(String),
    Css(String),
}

impl fmt::Display for NativeLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (using, value) = match self {
            NativeLocator::Id(v) => ("id", v),
            NativeLocator::Name(v) => ("name", v),
            NativeLocator::ClassName(v) => ("class name", v),
            NativeLocator::LinkText(v) => ("link text", v),
            NativeLocator::PartialLinkText(v) => ("partial link text", v),
            NativeLocator::TagName(v) => ("tag name", v),
            NativeLocator::XPath(v) => ("xpath", v),
            NativeLocator::Css(v) => ("css selector", v),
        };
        write!(f, "{}={}", using, value)
    }
}

/// Where a candidate's matching text comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TextSource {
    /// Visible text, falling back to value-like attributes
    Visible,
    Attribute(String),
}

/// Ladder selection applied to the located candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextFilter {
    pub text: String,
    pub partial: bool,
    pub source: TextSource,
}

/// Ordinal and sub-item qualifiers applied after the locator runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostFilters {
    /// 1-based ordinal among displayed candidates
    pub index: Option<usize>,
    /// 0-based sub-item position
    pub item_index: Option<i32>,
    /// Sub-item path such as `File->Open`
    pub path: Option<String>,
    /// Component type the INDEX ordinal counts
    pub type_filter: Option<String>,
}

impl PostFilters {
    pub fn is_empty(&self) -> bool {
        self.index.is_none() && self.item_index.is_none() && self.path.is_none()
    }

    pub fn has_sub_item(&self) -> bool {
        self.item_index.is_some() || self.path.is_some()
    }

    fn absorb(&mut self, kind: &QualifierName, value: &str) {
        let trimmed = value.trim();
        match kind {
            QualifierName::Index => match trimmed.parse::<usize>() {
                Ok(n) if n >= 1 => self.index = Some(n),
                _ => warn!("Ignoring INDEX '{}': expected a 1-based number", value),
            },
            QualifierName::ItemIndex => match trimmed.parse::<i32>() {
                Ok(n) => self.item_index = Some(n),
                Err(_) => warn!("Ignoring ITEMINDEX '{}': expected a number", value),
            },
            QualifierName::Path => self.path = Some(value.to_string()),
            _ => {}
        }
    }
}

/// A segment compiled into something the driver can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    pub locator: NativeLocator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_filter: Option<TextFilter>,
    pub post: PostFilters,
    pub domain: Domain,
}

impl CompiledQuery {
    fn native(locator: NativeLocator) -> Self {
        CompiledQuery {
            locator,
            text_filter: None,
            post: PostFilters::default(),
            domain: Domain::Html,
        }
    }
}

/// Quote a value for use inside an XPath expression.
///
/// A value already wrapped in single quotes is used as is. Values containing
/// an apostrophe are built with `concat()`.
pub fn quote(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return trimmed.to_string();
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|piece| format!("'{}'", piece))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// `@attr='v'`, or `contains(@attr, 'v')` when partial
pub fn condition(attr: &str, value: &str, partial: bool) -> String {
    if partial {
        format!("contains(@{}, {})", attr, quote(value))
    } else {
        format!("@{}={}", attr, quote(value))
    }
}

/// Substring test on the attribute named by `name` minus its `Contains` suffix
pub fn condition_contains(name: &str, value: &str) -> String {
    let base = match name.to_ascii_uppercase().rfind("CONTAINS") {
        Some(idx) if idx >= 1 => &name[..idx],
        _ => name,
    };
    format!("contains(@{}, {})", base, quote(value))
}

pub fn condition_for_text(value: &str, partial: bool) -> String {
    if partial {
        format!("contains(text(), {})", quote(value))
    } else {
        format!("text()={}", quote(value))
    }
}

/// Prefix-or-suffix test used by the widget toolkits, whose generated ids
/// wrap the author's id.
pub fn condition_prefix_or_suffix(attr: &str, value: &str) -> String {
    let q = quote(value);
    format!(
        "(starts-with(@{attr},{q}) or (substring(@{attr}, string-length(@{attr}) - string-length({q})+1)={q}))"
    )
}

fn predicate(start: &str, terms: &[String]) -> String {
    if terms.is_empty() {
        format!("{}{}{}", start, TRUE_CONDITION, END)
    } else {
        format!("{}{}{}", start, terms.join(AND), END)
    }
}

fn relative_tag_start(tag: &str) -> String {
    format!(".//{}[", tag.trim().to_uppercase())
}

/// Split `attr:value` at the first unescaped property separator
fn property_pair(value: &str, grammar: &Grammar) -> Option<(String, String)> {
    let sep = &grammar.property_separator;
    let tokens = tokenize(value, sep, grammar.escape);
    let (attr, rest) = tokens.split_first()?;
    if attr.trim().is_empty() || rest.is_empty() {
        return None;
    }
    Some((attr.trim().to_string(), rest.join(sep)))
}

/// Compile a segment holding exactly one qualifier
pub fn compile_single(segment: &Segment) -> Result<CompiledQuery, LocatorError> {
    let q = segment
        .qualifiers
        .first()
        .ok_or_else(|| LocatorError::Parse(format!("empty segment '{}'", segment.raw)))?;
    let value = q.value.clone();
    let partial = q.is_partial();

    let query = match q.kind() {
        QualifierName::XPath => CompiledQuery::native(NativeLocator::XPath(value)),
        QualifierName::Css => CompiledQuery::native(NativeLocator::Css(value)),
        QualifierName::Tag => CompiledQuery::native(NativeLocator::TagName(value)),
        QualifierName::Id => CompiledQuery::native(NativeLocator::Id(value)),
        QualifierName::Class => CompiledQuery::native(NativeLocator::ClassName(value)),
        QualifierName::Name => CompiledQuery::native(NativeLocator::Name(value)),
        QualifierName::Link => CompiledQuery::native(NativeLocator::LinkText(value)),
        QualifierName::PartialLink => {
            CompiledQuery::native(NativeLocator::PartialLinkText(value))
        }
        QualifierName::Text => {
            let xpath = predicate(
                RELATIVE_MATCHING_ALL_START,
                &[condition_for_text(&value, partial)],
            );
            let mut query = CompiledQuery::native(NativeLocator::XPath(xpath));
            query.text_filter = Some(TextFilter {
                text: value,
                partial,
                source: TextSource::Visible,
            });
            query
        }
        QualifierName::Title => {
            let xpath = predicate(
                RELATIVE_MATCHING_ALL_START,
                &[condition("title", &value, partial)],
            );
            let mut query = CompiledQuery::native(NativeLocator::XPath(xpath));
            query.text_filter = Some(TextFilter {
                text: value,
                partial,
                source: TextSource::Attribute("title".to_string()),
            });
            query
        }
        QualifierName::Frame(crate::recognition::FrameKey::IFrameId) => {
            let xpath = predicate("//iframe[", &[condition("id", &value, partial)]);
            CompiledQuery::native(NativeLocator::XPath(xpath))
        }
        QualifierName::Other(name) if partial => {
            let xpath = predicate(
                RELATIVE_MATCHING_ALL_START,
                &[condition_contains(&name, &value)],
            );
            CompiledQuery::native(NativeLocator::XPath(xpath))
        }
        _ => return Err(LocatorError::UnsupportedQualifier(q.name.clone())),
    };
    debug!("Compiled '{}' to {}", segment.raw, query.locator);
    Ok(query)
}

/// AND-combine every qualifier of a segment into one XPath predicate
pub fn compile_multi(segment: &Segment, grammar: &Grammar) -> CompiledQuery {
    let property_all = segment.has_mode(ModePrefix::PropertyAll);
    let start = match segment.tag() {
        Some(tag) if !property_all => relative_tag_start(tag),
        _ => RELATIVE_MATCHING_ALL_START.to_string(),
    };

    let mut post = PostFilters::default();
    let mut terms = Vec::new();
    for q in &segment.qualifiers {
        let kind = q.kind();
        if property_all {
            terms.push(condition(&q.name, &q.value, false));
            continue;
        }
        if kind.is_post_filter() {
            post.absorb(&kind, &q.value);
            continue;
        }
        match kind {
            QualifierName::Tag => {}
            QualifierName::Property | QualifierName::PropertyContains => {
                match property_pair(&q.value, grammar) {
                    Some((attr, value)) => terms.push(condition(
                        &attr,
                        &value,
                        kind == QualifierName::PropertyContains,
                    )),
                    None => warn!("Ignoring invalid property '{}' in '{}'", q.value, segment.raw),
                }
            }
            QualifierName::Text => terms.push(condition_for_text(&q.value, q.is_partial())),
            _ if q.is_partial() => terms.push(condition_contains(&q.name, &q.value)),
            _ => terms.push(condition(&q.name, &q.value, false)),
        }
    }

    let xpath = predicate(&start, &terms);
    debug!("Compiled '{}' to xpath={}", segment.raw, xpath);
    CompiledQuery {
        locator: NativeLocator::XPath(xpath),
        text_filter: None,
        post,
        domain: Domain::Html,
    }
}

/// Compile a segment led by `TYPE=`
pub fn compile_domain(segment: &Segment, grammar: &Grammar) -> CompiledQuery {
    let property_all = segment.has_mode(ModePrefix::PropertyAll);
    let mut post = PostFilters::default();
    let mut domain = Domain::Html;
    let mut start = RELATIVE_MATCHING_ALL_START;

    if let Some(type_value) = segment.value_of(&QualifierName::Type) {
        let upper = type_value.trim().to_uppercase();
        if upper.starts_with("DOJO") {
            domain = Domain::Dojo;
            start = RELATIVE_MATCHING_DIV_START;
        } else if upper.starts_with("SAP") {
            domain = Domain::Sap;
        }
        post.type_filter = Some(type_value.trim().to_string());
    }

    let mut terms = vec![TRUE_CONDITION.to_string()];
    for q in &segment.qualifiers {
        let kind = q.kind();
        if kind == QualifierName::Type {
            continue;
        }
        if property_all {
            terms.push(condition(&q.name, &q.value, false));
            continue;
        }
        match kind {
            QualifierName::Id | QualifierName::Name => {
                let attr = if kind == QualifierName::Id { "id" } else { "name" };
                if domain.is_toolkit() {
                    terms.push(condition_prefix_or_suffix(attr, &q.value));
                } else {
                    terms.push(condition(attr, &q.value, false));
                }
            }
            QualifierName::Title => terms.push(condition("title", &q.value, q.is_partial())),
            QualifierName::Text if !q.is_partial() => terms.push(format!(".={}", quote(&q.value))),
            QualifierName::Index | QualifierName::ItemIndex | QualifierName::Path => {
                post.absorb(&kind, &q.value)
            }
            QualifierName::Property | QualifierName::PropertyContains => {
                match property_pair(&q.value, grammar) {
                    Some((attr, value)) => terms.push(condition(
                        &attr,
                        &value,
                        kind == QualifierName::PropertyContains,
                    )),
                    None => warn!("Ignoring invalid property '{}' in '{}'", q.value, segment.raw),
                }
            }
            QualifierName::Text => terms.push(condition_for_text(&q.value, true)),
            _ if q.is_partial() => terms.push(condition_contains(&q.name, &q.value)),
            _ => terms.push(condition(&q.name, &q.value, false)),
        }
    }

    let xpath = predicate(start, &terms);
    debug!("Compiled {:?} segment '{}' to xpath={}", domain, segment.raw, xpath);
    CompiledQuery {
        locator: NativeLocator::XPath(xpath),
        text_filter: None,
        post,
        domain,
    }
}

/// Pick the compilation strategy for a segment
pub fn compile_segment(segment: &Segment, grammar: &Grammar) -> Result<CompiledQuery, LocatorError> {
    let first = segment
        .qualifiers
        .first()
        .ok_or_else(|| LocatorError::Parse(format!("empty segment '{}'", segment.raw)))?;

    match first.kind() {
        QualifierName::Type => Ok(compile_domain(segment, grammar)),
        QualifierName::XPath | QualifierName::Css if segment.qualifiers.len() == 1 => {
            compile_single(segment)
        }
        QualifierName::Property | QualifierName::PropertyContains => {
            Ok(compile_multi(segment, grammar))
        }
        _ if segment.qualifiers.len() > 1 || segment.has_mode(ModePrefix::PropertyAll) => {
            Ok(compile_multi(segment, grammar))
        }
        _ => compile_single(segment),
    }
}

#[cfg(test)]
#[path = "xpath_test.rs"]
mod xpath_test;
