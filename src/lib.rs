//! # rsprobe
#![allow(clippy::uninlined_format_args)]
//!
//! Resolves recognition strings to live elements through WebDriver.
//!
//! A recognition string is a compact locator such as
//! `FRAMEID=f1;\;TYPE=DOJO.ListView;id=fruits;ITEMINDEX=2`. Each `;\;`
//! separated segment narrows the search: frame segments enter nested
//! documents, the others compile to native locators (id, CSS, XPath) and
//! are filtered by the text ladder, display ordinals and component types.
//! Widget toolkits (Dojo, SAP UI5) are recognized so that generated ids and
//! composite widgets (lists, menus, trees, tabs) resolve like plain HTML.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Resolve one element inside a frame
//! rsprobe find "https://app.example.com" "FRAMEID=f1;\;id=btnOK"
//!
//! # Every element whose text matches, human-readable
//! rsprobe find "https://app.example.com" "TEXTCONTAINS=Order" --all --format simple
//!
//! # Offline: tokenizer dump and compiled locators
//! rsprobe parse "TYPE=DOJO.Button;id=save"
//! rsprobe compile "class=c1;title=t1"
//!
//! # Chrome through a custom WebDriver URL
//! rsprobe find "https://app.example.com" "id=q" --browser chrome --webdriver http://localhost:9515
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use rsprobe::{BrowserType, EngineConfig, SearchContext, WebDriverSession};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let session = WebDriverSession::connect(BrowserType::Firefox, None, true).await?;
//! session.goto("https://app.example.com").await?;
//!
//! let mut ctx = SearchContext::new(Arc::new(session), EngineConfig::load(None)?);
//! let button = ctx.find_one("FRAMEID=f1;\\;id=btnOK").await?;
//! let location = ctx.screen_location(&button).await?;
//! println!("OK button at ({}, {})", location.x, location.y);
//! # Ok(())
//! # }
//! ```

/// Engine configuration file and environment overrides
pub mod config;

/// Match criteria shared by element and sub-item search
pub mod criterion;

/// Toolkit classification and component types
pub mod domain;

/// The browser session seam
pub mod driver;

/// Error types and CLI exit codes
pub mod errors;

/// Frame chain tracking
pub mod frame;

/// Ordinal filtering and the text-matching ladder
pub mod matcher;

/// In-memory driver for tests
pub mod mock;

/// Recognition-string grammar and tokenizer
pub mod recognition;

/// Bounded script execution and event listeners
pub mod script;

/// Per-session resolution context
pub mod search;

/// Sub-item matchers for composite widgets
pub mod subitem;

/// Type definitions for CLI output
pub mod types;

/// fantoccini-backed WebDriver session
pub mod webdriver;

/// Browser window geometry
pub mod window;

/// Segment to native locator compilation
pub mod xpath;

pub use config::EngineConfig;
pub use criterion::Criterion;
pub use domain::{ComponentType, Domain};
pub use driver::Driver;
pub use errors::{LocatorError, ProbeError};
pub use frame::{FrameElement, FrameState};
pub use recognition::{Grammar, RecognitionString, Segment};
pub use search::SearchContext;
pub use types::{ElementReport, OutputFormat, Position, Size};
pub use webdriver::{BrowserType, WebDriverSession};
