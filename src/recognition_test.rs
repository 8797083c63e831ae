// Unit tests for the recognition-string parser

use super::*;
use pretty_assertions::assert_eq;

fn grammar() -> Grammar {
    Grammar::default()
}

#[test]
fn test_tokenize_basic() {
    assert_eq!(tokenize("a;b;c", ";", '\\'), vec!["a", "b", "c"]);
    assert_eq!(tokenize("a;b;", ";", '\\'), vec!["a", "b"]);
    assert!(tokenize("", ";", '\\').is_empty());
}

#[test]
fn test_tokenize_escaped_delimiter() {
    assert_eq!(tokenize("text=a\\;b;id=x", ";", '\\'), vec!["text=a;b", "id=x"]);
}

#[test]
fn test_tokenize_multi_char_delimiter() {
    assert_eq!(
        tokenize("FRAMEID=f1;\\;id=btnOK", ";\\;", '\\'),
        vec!["FRAMEID=f1", "id=btnOK"]
    );
}

#[test]
fn test_qualifier_splits_at_first_assign() {
    let q = Qualifier::parse(" title =a=b", "=").unwrap();
    assert_eq!(q.name, "title");
    assert_eq!(q.value, "a=b");
    assert!(Qualifier::parse("novalue", "=").is_none());
    assert!(Qualifier::parse("=x", "=").is_none());
}

#[test]
fn test_qualifier_classification() {
    assert_eq!(QualifierName::classify("id"), QualifierName::Id);
    assert_eq!(QualifierName::classify("TextContains"), QualifierName::Text);
    assert_eq!(QualifierName::classify("LinkContains"), QualifierName::PartialLink);
    assert_eq!(
        QualifierName::classify("iframeidcontains"),
        QualifierName::Frame(FrameKey::IFrameId)
    );
    assert_eq!(
        QualifierName::classify("FrameIndex"),
        QualifierName::Frame(FrameKey::Index)
    );
    assert_eq!(
        QualifierName::classify("aria-label"),
        QualifierName::Other("aria-label".to_string())
    );
}

#[test]
fn test_contains_suffix() {
    let q = Qualifier::parse("classContains=btn", "=").unwrap();
    assert!(q.is_partial());
    assert_eq!(q.base_name(), "class");

    let bare = Qualifier::parse("Contains=x", "=").unwrap();
    assert_eq!(bare.base_name(), "Contains");
}

#[test]
fn test_mode_prefixes_are_stripped() {
    let seg = Segment::parse(":PASM::fpsm:id=a;class=b", &grammar()).unwrap();
    assert_eq!(seg.prefixes, vec![ModePrefix::PropertyAll, ModePrefix::FullPath]);
    assert_eq!(seg.raw, "id=a;class=b");
    assert_eq!(seg.qualifiers.len(), 2);
    assert!(seg.has_mode(ModePrefix::PropertyAll));
}

#[test]
fn test_xpath_value_keeps_separator() {
    let seg = Segment::parse("xpath=//a[@x='1;2']", &grammar()).unwrap();
    assert_eq!(seg.qualifiers.len(), 1);
    assert_eq!(seg.qualifiers[0].value, "//a[@x='1;2']");
}

#[test]
fn test_invalid_segment_is_dropped() {
    let rs = RecognitionString::parse("garbage;\\;id=ok", &grammar());
    assert_eq!(rs.segments().len(), 1);
    assert_eq!(rs.segments()[0].qualifiers[0].value, "ok");
}

#[test]
fn test_invalid_qualifier_inside_segment_is_skipped() {
    let seg = Segment::parse("id=a;junk", &grammar()).unwrap();
    assert_eq!(seg.qualifiers.len(), 1);
}

#[test]
fn test_blank_string_is_root() {
    assert!(RecognitionString::parse("   ", &grammar()).is_empty());
}

#[test]
fn test_frame_segment_anywhere() {
    let rs = RecognitionString::parse("tag=div;FRAMENAME=main;\\;id=btnOK", &grammar());
    let frame = &rs.segments()[0];
    assert!(frame.is_frame_segment());
    let (key, q) = frame.frame_qualifier().unwrap();
    assert_eq!(key, FrameKey::Name);
    assert_eq!(q.value, "main");
    assert!(!rs.segments()[1].is_frame_segment());
    assert!(rs.has_frames());
}

#[test]
fn test_segment_tag_lookup() {
    let seg = Segment::parse("tag=span;class=c1", &grammar()).unwrap();
    assert_eq!(seg.tag(), Some("span"));
}

#[test]
fn test_custom_grammar() {
    let g = Grammar {
        child_separator: ">>".to_string(),
        qualifier_separator: "|".to_string(),
        ..Grammar::default()
    };
    let rs = RecognitionString::parse("id=a|class=b>>name=c", &g);
    assert_eq!(rs.segments().len(), 2);
    assert_eq!(rs.segments()[0].qualifiers.len(), 2);
}
