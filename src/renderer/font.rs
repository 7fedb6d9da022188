//! Glyph metrics
//!
//! The renderer only needs to know how tall a line is and how far each
//! grapheme advances the pen, to place the cursor and size the canvas.
//! [`MonospaceMetrics`] derives advances from Unicode character widths.
//! With the `font` feature, [`FontMetrics`] reads them from a real font via
//! fontdue.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Text measurement used by the renderer
pub trait GlyphMetrics: Send {
    /// Height of one console line in pixels
    fn line_height(&self) -> u32;

    /// Width of the cursor at end of line
    fn cell_width(&self) -> u32;

    /// Horizontal advance of a single grapheme
    fn advance(&self, grapheme: &str) -> u32;

    /// Advance of a whole string
    fn text_width(&self, text: &str) -> u32 {
        text.graphemes(true).map(|g| self.advance(g)).sum()
    }
}

impl<M: GlyphMetrics + ?Sized> GlyphMetrics for Box<M> {
    fn line_height(&self) -> u32 {
        (**self).line_height()
    }

    fn cell_width(&self) -> u32 {
        (**self).cell_width()
    }

    fn advance(&self, grapheme: &str) -> u32 {
        (**self).advance(grapheme)
    }

    fn text_width(&self, text: &str) -> u32 {
        (**self).text_width(text)
    }
}

/// Fixed-cell metrics, wide graphemes take two cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonospaceMetrics {
    cell_width: u32,
    line_height: u32,
}

impl MonospaceMetrics {
    pub fn new(cell_width: u32, line_height: u32) -> Self {
        Self {
            cell_width: cell_width.max(1),
            line_height: line_height.max(1),
        }
    }
}

impl GlyphMetrics for MonospaceMetrics {
    fn line_height(&self) -> u32 {
        self.line_height
    }

    fn cell_width(&self) -> u32 {
        self.cell_width
    }

    fn advance(&self, grapheme: &str) -> u32 {
        grapheme.width().max(1) as u32 * self.cell_width
    }
}

#[cfg(feature = "font")]
pub use self::fontdue_metrics::{FontError, FontMetrics};

#[cfg(feature = "font")]
mod fontdue_metrics {
    use std::path::Path;

    use fontdue::{Font, FontSettings};

    use super::GlyphMetrics;

    /// Metrics read from a TrueType/OpenType font
    pub struct FontMetrics {
        font: Font,
        font_size: f32,
        cell_width: u32,
        line_height: u32,
    }

    impl std::fmt::Debug for FontMetrics {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FontMetrics")
                .field("font_size", &self.font_size)
                .field("cell_width", &self.cell_width)
                .field("line_height", &self.line_height)
                .finish()
        }
    }

    impl FontMetrics {
        /// Load a font file
        pub fn new(font_path: &Path, font_size: f32) -> Result<Self, FontError> {
            let font_data = std::fs::read(font_path)?;
            Self::from_bytes(&font_data, font_size)
        }

        /// Create metrics from font data bytes
        pub fn from_bytes(font_data: &[u8], font_size: f32) -> Result<Self, FontError> {
            let font = Font::from_bytes(font_data, FontSettings::default())
                .map_err(|e| FontError::Parse(e.to_string()))?;

            // 'M' as the reference cell width
            let cell_width = font.metrics('M', font_size).advance_width.ceil() as u32;
            let line_metrics = font
                .horizontal_line_metrics(font_size)
                .ok_or_else(|| FontError::Parse("no line metrics".to_string()))?;

            Ok(Self {
                font,
                font_size,
                cell_width: cell_width.max(1),
                line_height: (line_metrics.new_line_size.ceil() as u32).max(1),
            })
        }

        /// Try a few common system monospace fonts
        pub fn with_default_font(font_size: f32) -> Result<Self, FontError> {
            let font_paths = [
                "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
                "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
                "/usr/share/fonts/truetype/ubuntu/UbuntuMono-R.ttf",
            ];

            for path in &font_paths {
                if let Ok(metrics) = Self::new(Path::new(path), font_size) {
                    tracing::info!("loaded font: {}", path);
                    return Ok(metrics);
                }
            }

            Err(FontError::NoFontFound)
        }

        pub fn font_size(&self) -> f32 {
            self.font_size
        }
    }

    impl GlyphMetrics for FontMetrics {
        fn line_height(&self) -> u32 {
            self.line_height
        }

        fn cell_width(&self) -> u32 {
            self.cell_width
        }

        fn advance(&self, grapheme: &str) -> u32 {
            let width: f32 = grapheme
                .chars()
                .map(|c| self.font.metrics(c, self.font_size).advance_width)
                .sum();
            width.round() as u32
        }
    }

    /// Font loading errors
    #[derive(Debug, thiserror::Error)]
    pub enum FontError {
        #[error("font IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("font parse error: {0}")]
        Parse(String),
        #[error("no suitable font found")]
        NoFontFound,
    }

}
