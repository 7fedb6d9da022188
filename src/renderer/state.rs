//! Canvas and viewport state
//!
//! [`RenderState`] turns console notifications into drawing on a virtual
//! canvas that holds the tail of the scrollback with the command line in the
//! bottom row. A viewport of fixed size looks at part of the canvas; its
//! offset is "pinned" when it shows the bottom of the canvas.
//!
//! Redraw cost follows the size of the change:
//! - *ConsoleChanged* redraws the whole canvas, which is capped in height
//! - *CommandLineChanged* redraws the bottom row
//! - *CursorBlink* redraws the cursor cell
//!
//! Changed areas accumulate in a [`DirtyRegion`] until [`RenderState::take_dirty`]
//! converts them to viewport coordinates.

use super::font::GlyphMetrics;
use super::geometry::{DirtyRegion, Rect};
use super::surface::{Surface, SurfaceError, TextSurface};
use crate::app::RendererConfig;
use crate::core::{CommandLineView, ConsoleEvent, ConsoleView};

pub struct RenderState<S, M> {
    surface: S,
    metrics: M,
    viewport_width: u32,
    viewport_height: u32,
    line_height: u32,
    max_canvas_height: u32,
    retained_lines: usize,
    canvas_height: u32,
    viewport_y: i64,
    cursor_visible: bool,
    command_line: CommandLineView,
    lines: Vec<String>,
    total_lines: usize,
    dirty: DirtyRegion,
    released: bool,
}

impl<S, M> std::fmt::Debug for RenderState<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderState")
            .field("viewport", &(self.viewport_width, self.viewport_height))
            .field("canvas_height", &self.canvas_height)
            .field("viewport_y", &self.viewport_y)
            .field("total_lines", &self.total_lines)
            .field("released", &self.released)
            .finish()
    }
}

impl<S: Surface, M: GlyphMetrics> RenderState<S, M> {
    /// Allocate a one-line canvas with the viewport pinned to it
    pub fn new(mut surface: S, metrics: M, config: &RendererConfig) -> Result<Self, SurfaceError> {
        let line_height = metrics.line_height().max(1);
        let rows = (config.viewport_height.saturating_mul(config.max_canvas_factor) / line_height).max(1);
        let max_canvas_height = rows * line_height;

        surface.resize(config.viewport_width, line_height)?;

        let mut state = Self {
            surface,
            metrics,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            line_height,
            max_canvas_height,
            retained_lines: rows as usize - 1,
            canvas_height: line_height,
            viewport_y: 0,
            cursor_visible: true,
            command_line: CommandLineView::default(),
            lines: Vec::new(),
            total_lines: 0,
            dirty: DirtyRegion::new(),
            released: false,
        };
        state.viewport_y = state.pinned_offset();
        Ok(state)
    }

    /// Apply a console notification
    pub fn handle(&mut self, event: ConsoleEvent) -> Result<(), SurfaceError> {
        if self.released {
            return Err(SurfaceError::Released);
        }
        match event {
            ConsoleEvent::ConsoleChanged(view) => self.console_changed(view),
            ConsoleEvent::CommandLineChanged(view) => self.command_line_changed(view),
            ConsoleEvent::CursorBlink(on) => {
                self.cursor_visible = on;
                self.draw_cursor();
                Ok(())
            }
        }
    }

    fn console_changed(&mut self, view: ConsoleView) -> Result<(), SurfaceError> {
        self.lines = view.lines;
        self.total_lines = view.total_lines;
        self.command_line = view.command_line;
        self.render_console(false)
    }

    fn command_line_changed(&mut self, view: CommandLineView) -> Result<(), SurfaceError> {
        self.command_line = view;
        self.cursor_visible = true;

        // Fresh input always shows up at the bottom
        if !self.is_pinned() {
            return self.render_console(true);
        }

        let row = self.command_line_rect();
        self.surface.clear_rect(row);
        self.surface.draw_text(0, row.y, &self.command_line.text());
        self.draw_cursor();
        self.dirty.add(row);
        Ok(())
    }

    fn render_console(&mut self, force_pin: bool) -> Result<(), SurfaceError> {
        let rows = self.total_lines as u64 + 1;
        let wanted = (rows * self.line_height as u64).min(self.max_canvas_height as u64) as u32;
        let resized = wanted != self.canvas_height;
        if resized {
            self.surface.resize(self.viewport_width, wanted)?;
            self.canvas_height = wanted;
            tracing::trace!(height = wanted, "canvas resized");
        }
        if resized || force_pin {
            self.viewport_y = self.pinned_offset();
        }

        let canvas = self.canvas_rect();
        self.surface.clear_rect(canvas);

        let command_y = self.command_line_y();
        let lh = self.line_height as i64;
        for (i, line) in self.lines.iter().rev().take(self.retained_lines).enumerate() {
            let y = command_y as i64 - lh * (i as i64 + 1);
            if y < 0 {
                break;
            }
            self.surface.draw_text(0, y as i32, line);
        }
        self.surface.draw_text(0, command_y, &self.command_line.text());
        self.draw_cursor();
        self.dirty.add(canvas);
        Ok(())
    }

    fn draw_cursor(&mut self) {
        let rect = self.cursor_rect();
        self.surface.clear_rect(rect);
        if let Some(grapheme) = self.command_line.grapheme_at_cursor() {
            self.surface.draw_text(rect.x, rect.y, grapheme);
        }
        if self.cursor_visible {
            self.surface.invert_rect(rect);
        }
        self.dirty.add(rect);
    }

    /// Cursor cell in canvas coordinates
    pub fn cursor_rect(&self) -> Rect {
        let x: u32 = self
            .command_line
            .graphemes_before_cursor()
            .map(|g| self.metrics.advance(g))
            .sum();
        let width = match self.command_line.grapheme_at_cursor() {
            Some(g) => self.metrics.advance(g),
            None => self.metrics.cell_width(),
        };
        Rect::new(x as i32, self.command_line_y(), width, self.line_height)
    }

    /// Bottom row of the canvas
    pub fn command_line_rect(&self) -> Rect {
        Rect::new(0, self.command_line_y(), self.viewport_width, self.line_height)
    }

    fn command_line_y(&self) -> i32 {
        self.canvas_height.saturating_sub(self.line_height) as i32
    }

    fn canvas_rect(&self) -> Rect {
        Rect::new(0, 0, self.viewport_width, self.canvas_height)
    }

    /// Visible area in canvas coordinates
    pub fn viewport_rect(&self) -> Rect {
        Rect::new(0, self.viewport_y as i32, self.viewport_width, self.viewport_height)
    }

    /// Viewport offset showing the bottom of the canvas
    ///
    /// Negative when the canvas is shorter than the viewport.
    pub fn pinned_offset(&self) -> i64 {
        self.canvas_height as i64 - self.viewport_height as i64
    }

    pub fn is_pinned(&self) -> bool {
        self.viewport_y == self.pinned_offset()
    }

    /// Move the viewport, clamped to the canvas; returns the applied offset
    pub fn scroll_to(&mut self, offset: i64) -> i64 {
        let max = self.pinned_offset();
        let clamped = offset.clamp(max.min(0), max);
        if clamped != self.viewport_y {
            self.viewport_y = clamped;
            self.dirty.add(self.viewport_rect());
        }
        clamped
    }

    pub fn viewport_y(&self) -> i64 {
        self.viewport_y
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    pub fn max_canvas_height(&self) -> u32 {
        self.max_canvas_height
    }

    /// Number of scrollback lines the canvas can hold
    pub fn retained_lines(&self) -> usize {
        self.retained_lines
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Flush changed areas, translated and clipped to the viewport
    pub fn take_dirty(&mut self) -> Vec<Rect> {
        let viewport = Rect::new(0, 0, self.viewport_width, self.viewport_height);
        let mut batch = DirtyRegion::new();
        for rect in self.dirty.take() {
            if let Some(visible) = rect.translate(0, -self.viewport_y).intersect(&viewport) {
                batch.add(visible);
            }
        }
        batch.take()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Free the canvas; later events are refused
    pub fn release(&mut self) {
        if !self.released {
            self.surface.release();
            self.dirty.take();
            self.released = true;
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<M: GlyphMetrics> RenderState<TextSurface, M> {
    /// Canvas rows currently inside the viewport
    pub fn visible_text(&self) -> String {
        let lh = self.line_height as i64;
        let first = self.viewport_y.div_euclid(lh);
        let count = (self.viewport_height as i64 + lh - 1) / lh;
        (first..first + count)
            .filter(|&row| row >= 0 && (row as usize) < self.surface.rows())
            .map(|row| self.surface.row_text(row as usize))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::MonospaceMetrics;

    // 10 columns, 3 visible rows, canvas of at most 6 rows
    fn config() -> RendererConfig {
        RendererConfig {
            viewport_width: 80,
            viewport_height: 48,
            cell_width: 8,
            line_height: 16,
            max_canvas_factor: 2,
            ..RendererConfig::default()
        }
    }

    fn state() -> RenderState<TextSurface, MonospaceMetrics> {
        RenderState::new(TextSurface::new(8, 16), MonospaceMetrics::new(8, 16), &config()).unwrap()
    }

    fn command_line(prompt: &str, content: &str, cursor: usize) -> CommandLineView {
        CommandLineView {
            prompt: prompt.to_string(),
            content: content.chars().map(String::from).collect(),
            cursor,
        }
    }

    fn console(lines: &[&str], cmd: CommandLineView) -> ConsoleEvent {
        ConsoleEvent::ConsoleChanged(ConsoleView {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            total_lines: lines.len(),
            command_line: cmd,
        })
    }

    #[test]
    fn test_new_state_is_pinned_single_row() {
        let state = state();
        assert_eq!(state.canvas_height(), 16);
        assert_eq!(state.max_canvas_height(), 96);
        assert_eq!(state.retained_lines(), 5);
        assert_eq!(state.viewport_y(), -32);
        assert!(state.is_pinned());
    }

    #[test]
    fn test_console_changed_draws_lines_above_command_line() {
        let mut state = state();
        state.handle(console(&["one", "two"], command_line("> ", "ab", 2))).unwrap();

        assert_eq!(state.canvas_height(), 48);
        assert_eq!(state.viewport_y(), 0);
        let surface = state.surface();
        assert_eq!(surface.row_text(0), "one");
        assert_eq!(surface.row_text(1), "two");
        assert_eq!(surface.row_text(2), "> ab");
        assert!(surface.is_inverted(4, 2));
        assert_eq!(state.take_dirty(), vec![Rect::new(0, 0, 80, 48)]);
    }

    #[test]
    fn test_canvas_is_capped() {
        let mut state = state();
        let lines: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        state.handle(console(&refs, command_line("> ", "", 0))).unwrap();

        assert_eq!(state.canvas_height(), 96);
        assert_eq!(state.viewport_y(), 48);
        let surface = state.surface();
        assert_eq!(surface.row_text(0), "line 15");
        assert_eq!(surface.row_text(4), "line 19");
        assert_eq!(surface.row_text(5), ">");
        assert_eq!(state.visible_text(), "line 18\nline 19\n>");
    }

    #[test]
    fn test_short_canvas_is_bottom_anchored() {
        let mut state = state();
        state.handle(console(&["only"], command_line("$ ", "", 0))).unwrap();
        assert_eq!(state.canvas_height(), 32);
        assert_eq!(state.viewport_y(), -16);
        assert_eq!(state.scroll_to(0), -16);
        assert_eq!(state.scroll_to(-100), -16);
        assert_eq!(state.visible_text(), "only\n$");
        // The dirty canvas lands at the bottom of the viewport
        assert_eq!(state.take_dirty(), vec![Rect::new(0, 16, 80, 32)]);
    }

    #[test]
    fn test_command_line_changed_redraws_only_bottom_row() {
        let mut state = state();
        state.handle(console(&["a", "b", "c"], command_line("> ", "", 0))).unwrap();
        state.take_dirty();

        state
            .handle(ConsoleEvent::CommandLineChanged(command_line("> ", "xy", 2)))
            .unwrap();
        assert_eq!(state.surface().row_text(3), "> xy");
        assert_eq!(state.surface().row_text(2), "c");
        assert_eq!(state.take_dirty(), vec![Rect::new(0, 32, 80, 16)]);
    }

    #[test]
    fn test_command_line_changed_while_scrolled_repins() {
        let mut state = state();
        let lines = ["1", "2", "3", "4", "5"];
        state.handle(console(&lines, command_line("> ", "", 0))).unwrap();
        assert_eq!(state.viewport_y(), 48);

        state.scroll_to(0);
        assert!(!state.is_pinned());
        state.take_dirty();

        state
            .handle(ConsoleEvent::CommandLineChanged(command_line("> ", "z", 1)))
            .unwrap();
        assert!(state.is_pinned());
        assert_eq!(state.viewport_y(), 48);
        assert_eq!(state.visible_text(), "4\n5\n> z");
        assert_eq!(state.take_dirty(), vec![Rect::new(0, 0, 80, 48)]);
    }

    #[test]
    fn test_console_changed_keeps_scroll_when_size_is_unchanged() {
        let mut state = state();
        let lines: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        state.handle(console(&refs, command_line("> ", "", 0))).unwrap();
        state.scroll_to(16);

        state.handle(console(&refs, command_line("> ", "", 0))).unwrap();
        assert_eq!(state.viewport_y(), 16);
    }

    #[test]
    fn test_cursor_blink_touches_only_cursor_cell() {
        let mut state = state();
        state.handle(console(&[], command_line("> ", "abc", 1))).unwrap();
        state.take_dirty();

        assert!(state.surface().is_inverted(3, 0));
        state.handle(ConsoleEvent::CursorBlink(false)).unwrap();
        assert!(!state.cursor_visible());
        assert!(!state.surface().is_inverted(3, 0));
        assert_eq!(state.surface().row_text(0), "> abc");

        // Viewport is 3 rows over a 1-row canvas: bottom row of the viewport
        assert_eq!(state.take_dirty(), vec![Rect::new(24, 32, 8, 16)]);

        state.handle(ConsoleEvent::CursorBlink(true)).unwrap();
        assert!(state.surface().is_inverted(3, 0));
    }

    #[test]
    fn test_cursor_position_uses_glyph_advances() {
        let mut state = state();
        let view = CommandLineView {
            prompt: "> ".to_string(),
            content: vec!["世".to_string(), "a".to_string()],
            cursor: 1,
        };
        state.handle(ConsoleEvent::CommandLineChanged(view)).unwrap();
        assert_eq!(state.cursor_rect(), Rect::new(32, 0, 8, 16));

        let view = CommandLineView {
            prompt: "> ".to_string(),
            content: vec!["世".to_string()],
            cursor: 0,
        };
        state.handle(ConsoleEvent::CommandLineChanged(view)).unwrap();
        assert_eq!(state.cursor_rect(), Rect::new(16, 0, 16, 16));
    }

    #[test]
    fn test_typing_makes_cursor_visible() {
        let mut state = state();
        state.handle(ConsoleEvent::CursorBlink(false)).unwrap();
        state
            .handle(ConsoleEvent::CommandLineChanged(command_line("> ", "a", 1)))
            .unwrap();
        assert!(state.cursor_visible());
    }

    #[test]
    fn test_scroll_to_clamps_and_marks_viewport() {
        let mut state = state();
        let lines: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        state.handle(console(&refs, command_line("> ", "", 0))).unwrap();
        state.take_dirty();

        assert_eq!(state.scroll_to(-10), 0);
        assert_eq!(state.take_dirty(), vec![Rect::new(0, 0, 80, 48)]);
        assert_eq!(state.scroll_to(1000), 48);
        assert_eq!(state.scroll_to(48), 48);
        state.take_dirty();
        assert_eq!(state.scroll_to(48), 48);
        assert!(state.take_dirty().is_empty());
    }

    #[test]
    fn test_release_refuses_events() {
        let mut state = state();
        state.release();
        state.release();
        assert!(state.is_released());
        assert_eq!(
            state.handle(ConsoleEvent::CursorBlink(true)),
            Err(SurfaceError::Released)
        );
        assert!(state.take_dirty().is_empty());
    }

    #[test]
    fn test_resize_failure_is_reported() {
        let surface = TextSurface::new(8, 16).with_max_cells(30);
        let mut state = RenderState::new(surface, MonospaceMetrics::new(8, 16), &config()).unwrap();
        let result = state.handle(console(&["a", "b", "c", "d"], command_line("> ", "", 0)));
        assert!(matches!(result, Err(SurfaceError::TooLarge { .. })));
    }
}
