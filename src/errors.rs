use std::fmt;

use thiserror::Error;

/// Errors raised while resolving a recognition string
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocatorError {
    /// Malformed recognition string, criterion or index list
    #[error("Parse error: {0}")]
    Parse(String),
    /// No element matched
    #[error("Element not found: {0}")]
    NotFound(String),
    /// A frame qualifier did not resolve to a frame
    #[error("Frame not found: {0}")]
    FrameNotFound(String),
    /// A cached element handle is no longer attached to the document
    #[error("Stale element reference: {0}")]
    StaleReference(String),
    /// A browser script or lookup exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),
    /// The qualifier name has no compiled form
    #[error("Unsupported qualifier: {0}")]
    UnsupportedQualifier(String),
    /// The WebDriver session is gone
    #[error("No WebDriver session: {0}")]
    NoSession(String),
    /// No sub-item matcher is registered for the component type
    #[error("No sub-item matcher registered for type: {0}")]
    UnregisteredType(String),
    /// Any other WebDriver failure
    #[error("WebDriver error: {0}")]
    Driver(String),
}

impl LocatorError {
    /// True for both element and frame misses
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LocatorError::NotFound(_) | LocatorError::FrameNotFound(_)
        )
    }

    /// Errors the resolver handles locally instead of surfacing
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LocatorError::Parse(_)
                | LocatorError::StaleReference(_)
                | LocatorError::UnsupportedQualifier(_)
        )
    }

    /// Process exit code the CLI uses for this error
    pub fn exit_code(&self) -> i32 {
        ProbeError::from(self.clone()).exit_code()
    }

    /// Classify a raw WebDriver error message
    pub fn from_driver_message(context: &str, message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("no such element") || lower.contains("unable to locate") {
            LocatorError::NotFound(context.to_string())
        } else if lower.contains("no such frame") {
            LocatorError::FrameNotFound(context.to_string())
        } else if lower.contains("stale element") {
            LocatorError::StaleReference(format!("{}: {}", context, message))
        } else if lower.contains("invalid session")
            || lower.contains("no such window")
            || lower.contains("session deleted")
        {
            LocatorError::NoSession(message.to_string())
        } else if lower.contains("timeout") || lower.contains("timed out") {
            LocatorError::Timeout(format!("{}: {}", context, message))
        } else {
            LocatorError::Driver(format!("{}: {}", context, message))
        }
    }
}

/// Application error type that carries a process exit code
#[derive(Debug)]
pub enum ProbeError {
    /// Element not found (exit code 2)
    ElementNotFound(String),
    /// WebDriver connection or session failure (exit code 4)
    WebDriverFailed(String),
    /// Operation timeout (exit code 5)
    Timeout(String),
    /// Generic error (exit code 1)
    Other(anyhow::Error),
}

impl ProbeError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ProbeError::ElementNotFound(_) => 2,
            ProbeError::WebDriverFailed(_) => 4,
            ProbeError::Timeout(_) => 5,
            ProbeError::Other(_) => 1,
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::ElementNotFound(what) => {
                write!(f, "No element found for recognition string: {}", what)
            }
            ProbeError::WebDriverFailed(msg) => {
                write!(f, "WebDriver connection failed: {}", msg)
            }
            ProbeError::Timeout(msg) => write!(f, "Operation timed out: {}", msg),
            ProbeError::Other(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<LocatorError> for ProbeError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::NotFound(what) | LocatorError::FrameNotFound(what) => {
                ProbeError::ElementNotFound(what)
            }
            LocatorError::Timeout(msg) => ProbeError::Timeout(msg),
            LocatorError::NoSession(msg) | LocatorError::Driver(msg) => {
                ProbeError::WebDriverFailed(msg)
            }
            other => ProbeError::Other(anyhow::Error::new(other)),
        }
    }
}

impl From<anyhow::Error> for ProbeError {
    fn from(err: anyhow::Error) -> Self {
        // A typed locator error anywhere in the chain wins over message sniffing
        if let Some(locator) = err.downcast_ref::<LocatorError>() {
            return ProbeError::from(locator.clone());
        }

        let msg = err.to_string();
        if msg.contains("Failed to connect to WebDriver")
            || msg.contains("geckodriver")
            || msg.contains("chromedriver")
        {
            ProbeError::WebDriverFailed(msg)
        } else if msg.contains("timeout") || msg.contains("timed out") {
            ProbeError::Timeout(msg)
        } else {
            ProbeError::Other(err)
        }
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;
