//! Ephemeral slices of text or image context produced during examination.

use serde::{Deserialize, Serialize};

use super::Screenshot;

/// Contiguous substring of the serialized history.
///
/// Offsets are character offsets into the examined text, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub content: String,
    pub start: usize,
    pub end: usize,
    pub chunk_id: usize,
}

impl ContextSnippet {
    /// The whole text as a single snippet.
    pub fn whole(content: &str) -> Self {
        Self {
            content: content.to_string(),
            start: 0,
            end: content.chars().count(),
            chunk_id: 0,
        }
    }
}

/// Rectangular region of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Crop of a screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualSnippet {
    pub image: Screenshot,

    /// Region of the source image; `None` when the snippet is the whole image.
    pub bbox: Option<BoundingBox>,

    /// `(row, col)` position in the examination grid.
    pub grid_position: Option<(u32, u32)>,
}

impl VisualSnippet {
    pub fn whole(image: Screenshot) -> Self {
        Self {
            image,
            bbox: None,
            grid_position: None,
        }
    }
}
