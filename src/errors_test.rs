// Unit tests for error classification and exit codes

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_driver_message_classification() {
    assert_eq!(
        LocatorError::from_driver_message("id=a", "no such element: Unable to locate element"),
        LocatorError::NotFound("id=a".to_string())
    );
    assert!(matches!(
        LocatorError::from_driver_message("frame", "stale element reference: element is not attached"),
        LocatorError::StaleReference(_)
    ));
    assert!(matches!(
        LocatorError::from_driver_message("find", "invalid session id"),
        LocatorError::NoSession(_)
    ));
    assert!(matches!(
        LocatorError::from_driver_message("script", "script timeout"),
        LocatorError::Timeout(_)
    ));
    assert!(matches!(
        LocatorError::from_driver_message("click", "element click intercepted"),
        LocatorError::Driver(_)
    ));
}

#[test]
fn test_not_found_covers_frames() {
    assert!(LocatorError::NotFound("x".into()).is_not_found());
    assert!(LocatorError::FrameNotFound("f1".into()).is_not_found());
    assert!(!LocatorError::Timeout("x".into()).is_not_found());
}

#[test]
fn test_recoverable_errors() {
    assert!(LocatorError::StaleReference("x".into()).is_recoverable());
    assert!(LocatorError::UnsupportedQualifier("foo".into()).is_recoverable());
    assert!(!LocatorError::NoSession("gone".into()).is_recoverable());
    assert!(!LocatorError::UnregisteredType("Grid".into()).is_recoverable());
}

#[test]
fn test_exit_codes() {
    assert_eq!(ProbeError::from(LocatorError::NotFound("x".into())).exit_code(), 2);
    assert_eq!(ProbeError::from(LocatorError::FrameNotFound("f".into())).exit_code(), 2);
    assert_eq!(ProbeError::from(LocatorError::NoSession("s".into())).exit_code(), 4);
    assert_eq!(ProbeError::from(LocatorError::Timeout("t".into())).exit_code(), 5);
    assert_eq!(ProbeError::from(LocatorError::Parse("p".into())).exit_code(), 1);
}

#[test]
fn test_anyhow_conversion_keeps_locator_error() {
    let err = anyhow::Error::new(LocatorError::NotFound("id=btnOK".into()))
        .context("Failed to resolve recognition string");
    let probe = ProbeError::from(err);
    assert_eq!(probe.exit_code(), 2);
    assert_eq!(
        probe.to_string(),
        "No element found for recognition string: id=btnOK"
    );
}

#[test]
fn test_anyhow_conversion_by_message() {
    let err = anyhow::anyhow!("Failed to connect to WebDriver at http://localhost:4444");
    assert_eq!(ProbeError::from(err).exit_code(), 4);

    let err = anyhow::anyhow!("navigation timed out");
    assert_eq!(ProbeError::from(err).exit_code(), 5);

    let err = anyhow::anyhow!("something else");
    assert_eq!(ProbeError::from(err).exit_code(), 1);
}

#[test]
fn test_locator_exit_codes() {
    assert_eq!(LocatorError::FrameNotFound("f1".into()).exit_code(), 2);
    assert_eq!(LocatorError::Timeout("x".into()).exit_code(), 5);
    assert_eq!(LocatorError::NoSession("x".into()).exit_code(), 4);
    assert_eq!(LocatorError::Parse("x".into()).exit_code(), 1);
}
