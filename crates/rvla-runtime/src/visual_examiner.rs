//! Region-based examination of large screenshots.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use rvla_config::VisualConfig;
use rvla_protocols::error::ExaminerError;
use rvla_protocols::examiner::{SnippetExaminer, VisualExamination};
use rvla_protocols::types::{BoundingBox, Screenshot, VisualSnippet};

/// Grid dimensions used to partition a screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub rows: u32,
    pub cols: u32,
}

impl GridSize {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn cells(&self) -> u32 {
        self.rows * self.cols
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(3, 3)
    }
}

/// Tile a `width` x `height` image into `grid.rows * grid.cols` boxes, row by row.
///
/// Cells are `width / cols` by `height / rows`; the last column and row absorb
/// the integer-division remainder so the boxes cover the image exactly.
/// Returns `None` when the image is smaller than the grid in either dimension.
pub fn partition_grid(width: u32, height: u32, grid: GridSize) -> Option<Vec<(u32, u32, BoundingBox)>> {
    if grid.rows == 0 || grid.cols == 0 || width < grid.cols || height < grid.rows {
        return None;
    }

    let cell_w = width / grid.cols;
    let cell_h = height / grid.rows;
    let mut cells = Vec::with_capacity(grid.cells() as usize);

    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let x = col * cell_w;
            let y = row * cell_h;
            let w = if col + 1 == grid.cols { width - x } else { cell_w };
            let h = if row + 1 == grid.rows { height - y } else { cell_h };
            cells.push((row, col, BoundingBox::new(x, y, w, h)));
        }
    }
    Some(cells)
}

fn decode(screenshot: &Screenshot) -> Result<DynamicImage, ExaminerError> {
    let bytes = screenshot
        .decode()
        .map_err(|e| ExaminerError::Image(e.to_string()))?;
    image::load_from_memory(&bytes).map_err(|e| ExaminerError::Image(e.to_string()))
}

fn encode_crop(image: &DynamicImage, bbox: &BoundingBox) -> Result<Screenshot, ExaminerError> {
    let crop = image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
    let mut bytes = Cursor::new(Vec::new());
    crop.write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| ExaminerError::Image(e.to_string()))?;
    Ok(Screenshot::from_png_bytes(&bytes.into_inner()))
}

/// Split a screenshot into grid snippets.
///
/// Any decode, crop or size problem degrades to one whole-image snippet.
pub fn divide_screenshot(screenshot: &Screenshot, grid: GridSize) -> Vec<VisualSnippet> {
    let image = match decode(screenshot) {
        Ok(image) => image,
        Err(e) => {
            warn!("Screenshot could not be decoded, examining it whole: {}", e);
            return vec![VisualSnippet::whole(screenshot.clone())];
        }
    };

    let Some(cells) = partition_grid(image.width(), image.height(), grid) else {
        debug!(
            "Screenshot {}x{} smaller than {}x{} grid, examining it whole",
            image.width(),
            image.height(),
            grid.rows,
            grid.cols
        );
        return vec![VisualSnippet::whole(screenshot.clone())];
    };

    let mut snippets = Vec::with_capacity(cells.len());
    for (row, col, bbox) in cells {
        match encode_crop(&image, &bbox) {
            Ok(crop) => snippets.push(VisualSnippet {
                image: crop,
                bbox: Some(bbox),
                grid_position: Some((row, col)),
            }),
            Err(e) => {
                warn!("Failed to crop region ({}, {}), examining it whole: {}", row, col, e);
                return vec![VisualSnippet::whole(screenshot.clone())];
            }
        }
    }
    snippets
}

/// One selected region.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualFinding {
    pub bbox: Option<BoundingBox>,
    pub grid_position: Option<(u32, u32)>,
    pub description: String,
    pub elements: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub score: f32,
}

/// Outcome of examining a screenshot.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualReport {
    pub total_snippets: usize,
    pub relevant_snippets: usize,
    pub findings: Vec<VisualFinding>,
    /// Descriptions of the selected regions joined with ` | `.
    pub combined_description: String,
}

/// Visual Examiner.
pub struct VisualExaminer {
    examiner: Arc<dyn SnippetExaminer>,
    grid: GridSize,
    top_k: usize,
}

impl VisualExaminer {
    pub fn new(examiner: Arc<dyn SnippetExaminer>, config: &VisualConfig) -> Self {
        Self {
            examiner,
            grid: GridSize::new(config.grid_rows, config.grid_cols),
            top_k: config.top_k,
        }
    }

    pub fn with_grid(mut self, grid: GridSize) -> Self {
        self.grid = grid;
        self
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// Examine every region once and keep the `top_k` best by score.
    ///
    /// Regions whose examination fails score zero. Equal scores keep grid order.
    pub async fn examine_screenshot(
        &self,
        screenshot: &Screenshot,
        query: &str,
        goal: &str,
    ) -> VisualReport {
        let snippets = divide_screenshot(screenshot, self.grid);
        let total_snippets = snippets.len();

        let mut scored: Vec<(f32, VisualSnippet, VisualExamination)> = Vec::with_capacity(total_snippets);
        for snippet in snippets {
            let exam = match self.examiner.examine_image(&snippet, query, goal).await {
                Ok(exam) => exam,
                Err(e) => {
                    warn!("Region {:?} examination failed: {}", snippet.grid_position, e);
                    VisualExamination::new(false, "", 0.0)
                }
            };
            scored.push((exam.score(), snippet, exam));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.top_k);

        let findings: Vec<VisualFinding> = scored
            .into_iter()
            .map(|(score, snippet, exam)| VisualFinding {
                bbox: snippet.bbox,
                grid_position: snippet.grid_position,
                description: exam.description,
                elements: exam.elements,
                suggested_actions: exam.suggested_actions,
                score,
            })
            .collect();

        let combined_description = findings
            .iter()
            .map(|f| f.description.as_str())
            .collect::<Vec<_>>()
            .join(" | ");

        VisualReport {
            total_snippets,
            relevant_snippets: findings.len(),
            findings,
            combined_description,
        }
    }
}

#[cfg(test)]
#[path = "visual_examiner_tests.rs"]
mod tests;
