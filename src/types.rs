use serde::{Deserialize, Serialize};

/// Output format for CLI results
#[derive(Clone, Copy, Debug, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format for programmatic consumption
    Json,
    /// Human-readable simple format
    Simple,
}

/// Position of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Unit of measurement (typically "px")
    pub unit: String,
}

impl Position {
    pub fn px(x: f64, y: f64) -> Self {
        Position {
            x,
            y,
            unit: "px".to_string(),
        }
    }
}

/// Size dimensions of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width of the element
    pub width: f64,
    /// Height of the element
    pub height: f64,
    /// Unit of measurement (typically "px")
    pub unit: String,
}

impl Size {
    pub fn px(width: f64, height: f64) -> Self {
        Size {
            width,
            height,
            unit: "px".to_string(),
        }
    }
}

/// Element rectangle as reported by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Summary of a resolved element, printed by the CLI
#[derive(Debug, Serialize, Deserialize)]
pub struct ElementReport {
    /// Recognition string that resolved this element
    pub recognition_string: String,
    /// Lowercase tag name
    pub tag_name: String,
    /// `id` attribute if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Matching text (visible text or value-like attribute)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Widget toolkit the element belongs to
    pub domain: String,
    /// Resolved component type
    pub component_type: String,
    /// Position in its own document
    pub position: Position,
    /// Element dimensions
    pub size: Size,
    /// Position on screen, including frame and window offsets
    pub screen_position: Position,
    /// Frame ids or names from the top document down
    pub frame_path: Vec<String>,
    /// When the element was resolved
    pub resolved_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
