//! Drawing surfaces
//!
//! A [`Surface`] is the virtual canvas the renderer draws the console onto.
//! Coordinates are canvas pixels with the origin at the top-left corner.
//! [`TextSurface`] is a character-grid implementation used by the headless
//! runner and the tests: one cell per `cell_width` x `line_height` pixels.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::geometry::Rect;

/// Default cap on the number of cells a [`TextSurface`] may allocate
pub const DEFAULT_MAX_CELLS: usize = 4 * 1024 * 1024;

/// Surface errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("surface of {width}x{height} exceeds the size limit")]
    TooLarge { width: u32, height: u32 },
    #[error("surface has been released")]
    Released,
    #[error("surface backend error: {0}")]
    Backend(String),
}

/// Drawing target for the renderer
pub trait Surface: Send {
    /// Reallocate the canvas; previous contents are discarded
    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Reset a rectangle to the background
    fn clear_rect(&mut self, rect: Rect);

    /// Draw a single line of text with its top-left corner at `(x, y)`
    fn draw_text(&mut self, x: i32, y: i32, text: &str);

    /// Invert the colors of a rectangle
    fn invert_rect(&mut self, rect: Rect);

    /// Free the backing storage; later drawing is ignored
    fn release(&mut self) {}
}

/// One cell of a [`TextSurface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCell {
    /// Grapheme drawn in this cell, empty for the tail of a wide grapheme
    pub grapheme: String,
    pub inverted: bool,
}

impl Default for TextCell {
    fn default() -> Self {
        Self {
            grapheme: " ".to_string(),
            inverted: false,
        }
    }
}

/// Character-grid surface
#[derive(Debug, Clone)]
pub struct TextSurface {
    cell_width: u32,
    line_height: u32,
    width: u32,
    height: u32,
    columns: usize,
    rows: usize,
    cells: Vec<TextCell>,
    max_cells: usize,
    released: bool,
}

impl TextSurface {
    /// Create an empty surface with the given cell size
    pub fn new(cell_width: u32, line_height: u32) -> Self {
        Self {
            cell_width: cell_width.max(1),
            line_height: line_height.max(1),
            width: 0,
            height: 0,
            columns: 0,
            rows: 0,
            cells: Vec::new(),
            max_cells: DEFAULT_MAX_CELLS,
            released: false,
        }
    }

    /// Limit how many cells `resize` may allocate
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<&TextCell> {
        if col >= self.columns || row >= self.rows {
            return None;
        }
        self.cells.get(row * self.columns + col)
    }

    pub fn is_inverted(&self, col: usize, row: usize) -> bool {
        self.cell(col, row).map(|c| c.inverted).unwrap_or(false)
    }

    /// Text of a row without trailing blanks
    pub fn row_text(&self, row: usize) -> String {
        if row >= self.rows {
            return String::new();
        }
        let start = row * self.columns;
        let text: String = self.cells[start..start + self.columns]
            .iter()
            .map(|c| c.grapheme.as_str())
            .collect();
        text.trim_end().to_string()
    }

    /// Row index containing canvas pixel `y`
    pub fn row_at(&self, y: i64) -> Option<usize> {
        if y < 0 {
            return None;
        }
        let row = (y / self.line_height as i64) as usize;
        (row < self.rows).then_some(row)
    }

    /// All rows joined with newlines
    pub fn text(&self) -> String {
        (0..self.rows)
            .map(|row| self.row_text(row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Cell range covered by a pixel rectangle, clipped to the grid
    fn cell_span(&self, rect: Rect) -> Option<(usize, usize, usize, usize)> {
        let bounds = Rect::new(0, 0, self.width, self.height);
        let rect = bounds.intersect(&rect)?;
        let cw = self.cell_width as i64;
        let lh = self.line_height as i64;
        let col0 = (rect.x as i64 / cw) as usize;
        let row0 = (rect.y as i64 / lh) as usize;
        let col1 = ((rect.right() + cw - 1) / cw) as usize;
        let row1 = ((rect.bottom() + lh - 1) / lh) as usize;
        Some((
            col0,
            row0,
            col1.min(self.columns),
            row1.min(self.rows),
        ))
    }
}

impl Surface for TextSurface {
    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        if self.released {
            return Err(SurfaceError::Released);
        }
        let columns = width.div_ceil(self.cell_width) as usize;
        let rows = height.div_ceil(self.line_height) as usize;
        if columns.saturating_mul(rows) > self.max_cells {
            return Err(SurfaceError::TooLarge { width, height });
        }
        self.width = width;
        self.height = height;
        self.columns = columns;
        self.rows = rows;
        self.cells = vec![TextCell::default(); columns * rows];
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear_rect(&mut self, rect: Rect) {
        let Some((col0, row0, col1, row1)) = self.cell_span(rect) else {
            return;
        };
        for row in row0..row1 {
            for col in col0..col1 {
                self.cells[row * self.columns + col] = TextCell::default();
            }
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        if self.released || x < 0 {
            return;
        }
        let Some(row) = self.row_at(y as i64) else {
            return;
        };
        let mut col = x as usize / self.cell_width as usize;
        for grapheme in text.graphemes(true) {
            let width = grapheme.width().max(1);
            if col + width > self.columns {
                break;
            }
            let index = row * self.columns + col;
            self.cells[index].grapheme = grapheme.to_string();
            for tail in &mut self.cells[index + 1..index + width] {
                tail.grapheme.clear();
            }
            col += width;
        }
    }

    fn invert_rect(&mut self, rect: Rect) {
        let Some((col0, row0, col1, row1)) = self.cell_span(rect) else {
            return;
        };
        for row in row0..row1 {
            for col in col0..col1 {
                let cell = &mut self.cells[row * self.columns + col];
                cell.inverted = !cell.inverted;
            }
        }
    }

    fn release(&mut self) {
        self.cells = Vec::new();
        self.columns = 0;
        self.rows = 0;
        self.released = true;
    }
}
