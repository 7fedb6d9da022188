//! Console Renderer Module
//!
//! Turns console notifications into drawing on a virtual scrollback canvas
//! with a scrolling viewport. Redraws are tracked as dirty rectangles and
//! handed to the host in batches.
//!
//! The drawing backend is abstracted behind [`Surface`] and text measurement
//! behind [`GlyphMetrics`], so the same state machine drives a pixel canvas
//! or the character grid of [`TextSurface`].

mod font;
mod geometry;
mod state;
mod surface;
mod surface_renderer;

#[cfg(feature = "font")]
pub use font::{FontError, FontMetrics};
pub use font::{GlyphMetrics, MonospaceMetrics};
pub use geometry::{DirtyRegion, Rect};
pub use state::RenderState;
pub use surface::{Surface, SurfaceError, TextCell, TextSurface, DEFAULT_MAX_CELLS};
pub use surface_renderer::{ScrollDirection, SurfaceRenderer};
