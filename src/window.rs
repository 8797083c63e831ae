//! Browser window geometry for screen coordinates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::Driver;
use crate::frame::FrameElement;
use crate::script::ScriptExecutor;
use crate::types::{Position, Rect};

/// Reads the outer window, the client area and the scroll offset of the top
/// document. Border and header sizes are derived from outer and inner sizes.
pub const WINDOW_GEOMETRY_SCRIPT: &str = r#"
var w = window.top;
var border = Math.max(0, Math.round((w.outerWidth - w.innerWidth) / 2));
var header = Math.max(0, w.outerHeight - w.innerHeight - border);
return {
  x: w.screenX, y: w.screenY,
  width: w.outerWidth, height: w.outerHeight,
  clientX: border, clientY: header,
  clientWidth: w.document.documentElement.clientWidth,
  clientHeight: w.document.documentElement.clientHeight,
  pageXOffset: w.pageXOffset, pageYOffset: w.pageYOffset,
  borderWidth: border, headerHeight: header,
  maximized: w.outerWidth >= w.screen.availWidth && w.outerHeight >= w.screen.availHeight
};
"#;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserWindow {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Offset of the page area inside the window
    pub client_x: f64,
    pub client_y: f64,
    pub client_width: f64,
    pub client_height: f64,
    pub page_x_offset: f64,
    pub page_y_offset: f64,
    pub border_width: f64,
    pub header_height: f64,
    pub maximized: bool,
}

impl BrowserWindow {
    /// Fetch fresh geometry, keeping `self` when the script fails or
    /// returns something unreadable.
    pub async fn refresh<D: Driver>(&mut self, executor: &ScriptExecutor<D>) {
        match executor.execute(WINDOW_GEOMETRY_SCRIPT, Vec::new()).await {
            Ok(value) => match serde_json::from_value::<BrowserWindow>(value) {
                Ok(window) => *self = window,
                Err(e) => debug!("Unreadable window geometry, keeping previous: {}", e),
            },
            Err(e) => debug!("Window geometry unavailable, keeping previous: {}", e),
        }
    }

    /// Screen position of an element rectangle reported relative to the
    /// document of `frame`.
    ///
    /// Only the top document's scroll offset is subtracted. Frame locations
    /// are read when a frame is entered, so scrolling inside a frame after
    /// that is not reflected.
    pub fn screen_location<E>(&self, rect: &Rect, frame: Option<&FrameElement<E>>) -> Position {
        let (fx, fy) = frame
            .map(|f| (f.location().x, f.location().y))
            .unwrap_or((0.0, 0.0));
        Position::px(
            self.x + self.client_x + fx + rect.x - self.page_x_offset,
            self.y + self.client_y + fy + rect.y - self.page_y_offset,
        )
    }
}

#[cfg(test)]
#[path = "window_test.rs"]
mod window_test;
