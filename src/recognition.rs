//! Recognition-string tokenizing and qualifier parsing.
//!
//! A recognition string is a list of segments separated by the child
//! separator (`;\;` by default). Each segment is a list of `name=value`
//! qualifiers separated by the qualifier separator (`;`). An escape
//! character immediately before a separator keeps it literal.
//!
//! ```
//! use rsprobe::recognition::{Grammar, RecognitionString};
//!
//! let rs = RecognitionString::parse("FRAMEID=f1;\\;id=btnOK", &Grammar::default());
//! assert_eq!(rs.segments().len(), 2);
//! assert!(rs.segments()[0].is_frame_segment());
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Separator tokens used by the recognition-string grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grammar {
    /// Separates parent and child segments
    pub child_separator: String,
    /// Separates qualifiers inside a segment
    pub qualifier_separator: String,
    /// Separates a qualifier name from its value
    pub assign: String,
    /// Separates attribute and value inside `PROPERTY=attr:value`
    pub property_separator: String,
    /// Separates levels inside `PATH=File->Open`
    pub path_separator: String,
    /// Escapes the separator that follows it
    pub escape: char,
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar {
            child_separator: ";\\;".to_string(),
            qualifier_separator: ";".to_string(),
            assign: "=".to_string(),
            property_separator: ":".to_string(),
            path_separator: "->".to_string(),
            escape: '\\',
        }
    }
}

/// Split `text` on `delimiter` unless the delimiter is preceded by `escape`.
///
/// The escape character in front of a delimiter is removed. A trailing
/// delimiter does not produce an empty token and empty input yields nothing.
pub fn tokenize(text: &str, delimiter: &str, escape: char) -> Vec<String> {
    let mut tokens = Vec::new();
    if text.is_empty() {
        return tokens;
    }
    if delimiter.is_empty() {
        tokens.push(text.to_string());
        return tokens;
    }

    let mut current = String::new();
    let mut rest = text;
    while !rest.is_empty() {
        if rest.starts_with(delimiter) {
            if current.ends_with(escape) {
                current.pop();
                current.push_str(delimiter);
            } else {
                tokens.push(std::mem::take(&mut current));
            }
            rest = &rest[delimiter.len()..];
            continue;
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        current.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Search-mode prefixes that may lead a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModePrefix {
    /// `:PASM:` every qualifier is compiled as a literal attribute test
    PropertyAll,
    /// `:FPSM:`
    FullPath,
    /// `:MCSM:`
    MatchCase,
    /// `:RFSM:`
    RecognitionFast,
}

impl ModePrefix {
    const ALL: [(ModePrefix, &'static str); 4] = [
        (ModePrefix::PropertyAll, ":PASM:"),
        (ModePrefix::FullPath, ":FPSM:"),
        (ModePrefix::MatchCase, ":MCSM:"),
        (ModePrefix::RecognitionFast, ":RFSM:"),
    ];

    /// The literal token, e.g. `:PASM:`
    pub fn token(&self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(mode, _)| mode == self)
            .map(|(_, token)| *token)
            .unwrap_or("")
    }

    /// Strip any number of leading mode prefixes, case-insensitively
    pub fn strip_all(segment: &str) -> (Vec<ModePrefix>, &str) {
        let mut modes = Vec::new();
        let mut rest = segment.trim_start();
        'outer: loop {
            for (mode, token) in Self::ALL {
                if rest.len() >= token.len()
                    && rest.is_char_boundary(token.len())
                    && rest[..token.len()].eq_ignore_ascii_case(token)
                {
                    modes.push(mode);
                    rest = rest[token.len()..].trim_start();
                    continue 'outer;
                }
            }
            break;
        }
        (modes, rest)
    }
}

/// How a frame qualifier locates its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameKey {
    /// `FRAMEID=`
    Id,
    /// `IFRAMEID=`
    IFrameId,
    /// `FRAMENAME=`
    Name,
    /// `FRAMEINDEX=` (1-based)
    Index,
    /// `FRAMEXPATH=`
    XPath,
}

/// Qualifier names the engine gives meaning to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QualifierName {
    Type,
    Id,
    Name,
    Text,
    Title,
    Class,
    XPath,
    Css,
    Link,
    PartialLink,
    Tag,
    Index,
    ItemIndex,
    Path,
    Property,
    PropertyContains,
    Frame(FrameKey),
    /// Any other name, compiled as an attribute test
    Other(String),
}

impl QualifierName {
    /// Classify a raw qualifier name, case-insensitively
    pub fn classify(name: &str) -> Self {
        let upper = name.trim().to_uppercase();
        match upper.as_str() {
            "TYPE" => return QualifierName::Type,
            "ID" => return QualifierName::Id,
            "NAME" => return QualifierName::Name,
            "CLASS" => return QualifierName::Class,
            "XPATH" => return QualifierName::XPath,
            "CSS" => return QualifierName::Css,
            "LINK" => return QualifierName::Link,
            "PARTIALLINK" | "LINKCONTAINS" => return QualifierName::PartialLink,
            "TAG" => return QualifierName::Tag,
            "INDEX" => return QualifierName::Index,
            "ITEMINDEX" => return QualifierName::ItemIndex,
            "PATH" => return QualifierName::Path,
            "PROPERTY" => return QualifierName::Property,
            "PROPERTYCONTAINS" => return QualifierName::PropertyContains,
            _ => {}
        }

        if upper.starts_with("IFRAMEID") {
            QualifierName::Frame(FrameKey::IFrameId)
        } else if upper.starts_with("FRAMEID") {
            QualifierName::Frame(FrameKey::Id)
        } else if upper.starts_with("FRAMENAME") {
            QualifierName::Frame(FrameKey::Name)
        } else if upper.starts_with("FRAMEINDEX") {
            QualifierName::Frame(FrameKey::Index)
        } else if upper.starts_with("FRAMEXPATH") {
            QualifierName::Frame(FrameKey::XPath)
        } else if upper.starts_with("TEXT") {
            QualifierName::Text
        } else if upper.starts_with("TITLE") {
            QualifierName::Title
        } else {
            QualifierName::Other(name.trim().to_string())
        }
    }

    /// True for INDEX, ITEMINDEX and PATH
    pub fn is_post_filter(&self) -> bool {
        matches!(
            self,
            QualifierName::Index | QualifierName::ItemIndex | QualifierName::Path
        )
    }
}

/// One `name=value` criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Qualifier {
    /// Name as written, trimmed
    pub name: String,
    /// Everything after the first assign token
    pub value: String,
}

impl Qualifier {
    /// Split a token at the first assign token. Returns `None` for a token
    /// without an assign token or with an empty name.
    pub fn parse(token: &str, assign: &str) -> Option<Self> {
        let pos = token.find(assign)?;
        let name = token[..pos].trim();
        if name.is_empty() {
            return None;
        }
        Some(Qualifier {
            name: name.to_string(),
            value: token[pos + assign.len()..].to_string(),
        })
    }

    pub fn kind(&self) -> QualifierName {
        QualifierName::classify(&self.name)
    }

    /// True when the name ends with `Contains`, case-insensitively
    pub fn is_partial(&self) -> bool {
        self.name.to_ascii_uppercase().ends_with("CONTAINS")
    }

    /// Name with a trailing `Contains` removed. The whole name is kept when
    /// `Contains` is the entire name.
    pub fn base_name(&self) -> &str {
        match self.name.to_ascii_uppercase().rfind("CONTAINS") {
            Some(idx) if idx >= 1 => &self.name[..idx],
            _ => &self.name,
        }
    }
}

/// One parent/child level of a recognition string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Segment text with mode prefixes removed
    pub raw: String,
    pub prefixes: Vec<ModePrefix>,
    pub qualifiers: Vec<Qualifier>,
}

impl Segment {
    /// Parse one segment. Returns `None` when no qualifier is valid.
    pub fn parse(text: &str, grammar: &Grammar) -> Option<Self> {
        let (prefixes, body) = ModePrefix::strip_all(text);
        if !prefixes.is_empty() {
            debug!("Segment '{}' uses search modes {:?}", text, prefixes);
        }

        let qualifiers = if Self::is_raw_locator(body, &grammar.assign) {
            // XPath and CSS values may contain the qualifier separator
            Qualifier::parse(body, &grammar.assign).into_iter().collect()
        } else {
            let mut qualifiers = Vec::new();
            for token in tokenize(body, &grammar.qualifier_separator, grammar.escape) {
                if token.trim().is_empty() {
                    continue;
                }
                match Qualifier::parse(&token, &grammar.assign) {
                    Some(q) => qualifiers.push(q),
                    None => warn!("Ignoring invalid qualifier '{}' in segment '{}'", token, text),
                }
            }
            qualifiers
        };

        if qualifiers.is_empty() {
            warn!("Dropping segment '{}': no valid qualifier", text);
            return None;
        }

        Some(Segment {
            raw: body.to_string(),
            prefixes,
            qualifiers,
        })
    }

    fn is_raw_locator(body: &str, assign: &str) -> bool {
        let Some(pos) = body.find(assign) else {
            return false;
        };
        matches!(
            QualifierName::classify(&body[..pos]),
            QualifierName::XPath | QualifierName::Css
        )
    }

    /// Build a segment from a single qualifier
    pub fn single(name: &str, value: &str) -> Self {
        Segment {
            raw: format!("{name}={value}"),
            prefixes: Vec::new(),
            qualifiers: vec![Qualifier {
                name: name.to_string(),
                value: value.to_string(),
            }],
        }
    }

    pub fn has_mode(&self, mode: ModePrefix) -> bool {
        self.prefixes.contains(&mode)
    }

    /// First frame qualifier at any position in the segment
    pub fn frame_qualifier(&self) -> Option<(FrameKey, &Qualifier)> {
        self.qualifiers.iter().find_map(|q| match q.kind() {
            QualifierName::Frame(key) => Some((key, q)),
            _ => None,
        })
    }

    pub fn is_frame_segment(&self) -> bool {
        self.frame_qualifier().is_some()
    }

    /// Value of the first qualifier with the given name
    pub fn value_of(&self, name: &QualifierName) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|q| &q.kind() == name)
            .map(|q| q.value.as_str())
    }

    pub fn tag(&self) -> Option<&str> {
        self.value_of(&QualifierName::Tag)
    }
}

/// A parsed recognition string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecognitionString {
    segments: Vec<Segment>,
}

impl RecognitionString {
    /// Parse `text` with the given grammar. Blank input yields no segments,
    /// which resolves to the document root.
    pub fn parse(text: &str, grammar: &Grammar) -> Self {
        let segments = tokenize(text.trim(), &grammar.child_separator, grammar.escape)
            .iter()
            .filter(|s| !s.trim().is_empty())
            .filter_map(|s| Segment::parse(s, grammar))
            .collect();
        RecognitionString { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn has_frames(&self) -> bool {
        self.segments.iter().any(Segment::is_frame_segment)
    }
}

#[cfg(test)]
#[path = "recognition_test.rs"]
mod recognition_test;
