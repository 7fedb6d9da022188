//! Threaded renderer
//!
//! [`SurfaceRenderer`] owns a [`RenderState`] and a processing thread. Console
//! notifications and scroll commands are queued on a channel and applied in
//! order; scroll animation samples are interleaved with them through a
//! `select!`. Every processing cycle drains the queue first and then flushes
//! the accumulated dirty rectangles as one batch on [`SurfaceRenderer::updates`].

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, never, select, unbounded, Receiver, Sender};

use super::font::GlyphMetrics;
use super::geometry::Rect;
use super::state::RenderState;
use super::surface::{Surface, SurfaceError};
use crate::animation::{Animation, RunningAnimation};
use crate::app::RendererConfig;
use crate::core::{ConsoleEvent, Renderer};
use crate::sync::mutex_lock_or_recover;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Towards older lines
    Up,
    /// Towards the command line
    Down,
}

enum RendererCommand {
    Event(ConsoleEvent),
    Scroll(ScrollDirection),
    StopScroll,
    Sync(Sender<()>),
    Terminate(Sender<()>),
}

struct Scroll {
    animation: RunningAnimation,
    baseline: i64,
}

struct RenderLoop<S, M> {
    state: Arc<Mutex<RenderState<S, M>>>,
    commands: Receiver<RendererCommand>,
    updates: Sender<Vec<Rect>>,
    scroll: Option<Scroll>,
    scroll_duration: Duration,
    scroll_fraction: f64,
    frame_rate: u32,
}

impl<S: Surface, M: GlyphMetrics> RenderLoop<S, M> {
    fn run(mut self) {
        let commands = self.commands.clone();
        loop {
            let (values, finished) = match &self.scroll {
                Some(scroll) => (
                    scroll.animation.values().clone(),
                    scroll.animation.finished().clone(),
                ),
                None => (never(), never()),
            };

            select! {
                recv(commands) -> command => {
                    let Ok(command) = command else {
                        self.shutdown();
                        return;
                    };
                    if !self.process(command) {
                        return;
                    }
                    while let Ok(command) = commands.try_recv() {
                        if !self.process(command) {
                            return;
                        }
                    }
                }
                recv(values) -> value => match value {
                    Ok(value) => self.apply_scroll(value),
                    Err(_) => self.finish_scroll(),
                },
                recv(finished) -> _ => self.finish_scroll(),
            }

            self.flush();
        }
    }

    /// Returns `false` once the loop must exit
    fn process(&mut self, command: RendererCommand) -> bool {
        match command {
            RendererCommand::Event(event) => {
                if matches!(event, ConsoleEvent::CommandLineChanged(_)) {
                    self.stop_scroll();
                }
                let mut state = mutex_lock_or_recover(&self.state);
                if let Err(e) = state.handle(event) {
                    tracing::error!("failed to render console event: {}", e);
                }
            }
            RendererCommand::Scroll(direction) => self.start_scroll(direction),
            RendererCommand::StopScroll => self.stop_scroll(),
            RendererCommand::Sync(done) => {
                self.flush();
                let _ = done.send(());
            }
            RendererCommand::Terminate(done) => {
                self.shutdown();
                let _ = done.send(());
                return false;
            }
        }
        true
    }

    fn start_scroll(&mut self, direction: ScrollDirection) {
        self.stop_scroll();

        let (baseline, viewport_height) = {
            let state = mutex_lock_or_recover(&self.state);
            (state.viewport_y(), state.viewport_height())
        };
        let distance = self.scroll_fraction * viewport_height as f64;
        let distance = match direction {
            ScrollDirection::Up => -distance,
            ScrollDirection::Down => distance,
        };

        let animation = Animation::slide_in(self.scroll_duration, distance)
            .and_then(|a| a.with_frame_rate(self.frame_rate));
        match animation {
            Ok(animation) => {
                tracing::debug!(?direction, baseline, "scroll started");
                self.scroll = Some(Scroll {
                    animation: animation.start(),
                    baseline,
                });
            }
            Err(e) => tracing::warn!("cannot scroll: {}", e),
        }
    }

    fn stop_scroll(&mut self) {
        if let Some(scroll) = self.scroll.take() {
            scroll.animation.terminate();
            let _ = scroll.animation.wait();
            tracing::debug!("scroll stopped");
        }
    }

    fn apply_scroll(&mut self, value: f64) {
        if let Some(scroll) = &self.scroll {
            let offset = scroll.baseline + value.round() as i64;
            mutex_lock_or_recover(&self.state).scroll_to(offset);
        }
    }

    fn finish_scroll(&mut self) {
        if let Some(scroll) = self.scroll.take() {
            if let Some(value) = scroll.animation.values().try_iter().last() {
                let offset = scroll.baseline + value.round() as i64;
                mutex_lock_or_recover(&self.state).scroll_to(offset);
            }
        }
    }

    fn flush(&mut self) {
        let rects = {
            let mut state = mutex_lock_or_recover(&self.state);
            if !state.has_dirty() {
                return;
            }
            state.take_dirty()
        };
        if !rects.is_empty() {
            let _ = self.updates.send(rects);
        }
    }

    fn shutdown(&mut self) {
        self.stop_scroll();
        let _ = self.updates.send(Vec::new());
        mutex_lock_or_recover(&self.state).release();
        tracing::debug!("renderer terminated");
    }
}

/// Renderer drawing onto a [`Surface`] from its own thread
pub struct SurfaceRenderer<S, M> {
    state: Arc<Mutex<RenderState<S, M>>>,
    commands: Sender<RendererCommand>,
    updates: Receiver<Vec<Rect>>,
    retained_lines: usize,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S, M> std::fmt::Debug for SurfaceRenderer<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRenderer")
            .field("retained_lines", &self.retained_lines)
            .finish()
    }
}

impl<S, M> SurfaceRenderer<S, M>
where
    S: Surface + 'static,
    M: GlyphMetrics + 'static,
{
    /// Allocate the canvas and start the processing thread
    pub fn spawn(surface: S, metrics: M, config: &RendererConfig) -> Result<Self, SurfaceError> {
        let state = RenderState::new(surface, metrics, config)?;
        let retained_lines = state.retained_lines();
        let state = Arc::new(Mutex::new(state));

        let (commands, commands_rx) = unbounded();
        let (updates_tx, updates) = unbounded();

        let render_loop = RenderLoop {
            state: Arc::clone(&state),
            commands: commands_rx,
            updates: updates_tx,
            scroll: None,
            scroll_duration: config.scroll_duration(),
            scroll_fraction: config.scroll_fraction,
            frame_rate: config.frame_rate,
        };

        let worker = std::thread::Builder::new()
            .name("console-renderer".to_string())
            .spawn(move || render_loop.run())
            .map_err(|e| SurfaceError::Backend(e.to_string()))?;

        Ok(Self {
            state,
            commands,
            updates,
            retained_lines,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Batches of changed viewport rectangles, one per processing cycle
    ///
    /// An empty batch marks termination.
    pub fn updates(&self) -> &Receiver<Vec<Rect>> {
        &self.updates
    }

    /// Start an animated scroll, cancelling the one in flight
    pub fn scroll(&self, direction: ScrollDirection) {
        self.send(RendererCommand::Scroll(direction));
    }

    /// Cancel the scroll in flight, if any
    pub fn stop_scroll(&self) {
        self.send(RendererCommand::StopScroll);
    }

    /// Block until every command sent before this call has been processed
    pub fn sync(&self) {
        let (done, wait) = bounded(1);
        if self.commands.send(RendererCommand::Sync(done)).is_ok() {
            let _ = wait.recv();
        }
    }

    /// Stop the processing thread and release the canvas
    ///
    /// Blocks until the thread has exited. Calling it again does nothing.
    pub fn terminate(&self) {
        let Some(worker) = mutex_lock_or_recover(&self.worker).take() else {
            return;
        };
        let (done, wait) = bounded(1);
        if self.commands.send(RendererCommand::Terminate(done)).is_ok() {
            let _ = wait.recv();
        }
        let _ = worker.join();
    }

    pub fn is_terminated(&self) -> bool {
        mutex_lock_or_recover(&self.worker).is_none()
    }

    /// Read the render state
    pub fn with_state<R>(&self, f: impl FnOnce(&RenderState<S, M>) -> R) -> R {
        f(&mutex_lock_or_recover(&self.state))
    }

    fn send(&self, command: RendererCommand) {
        if self.commands.send(command).is_err() {
            tracing::trace!("renderer is terminated, command dropped");
        }
    }
}

impl<S, M> Renderer for SurfaceRenderer<S, M>
where
    S: Surface + 'static,
    M: GlyphMetrics + 'static,
{
    fn notify(&self, event: ConsoleEvent) {
        self.send(RendererCommand::Event(event));
    }

    fn retained_lines(&self) -> Option<usize> {
        Some(self.retained_lines)
    }
}

impl<S, M> Drop for SurfaceRenderer<S, M> {
    fn drop(&mut self) {
        let worker = match self.worker.get_mut() {
            Ok(worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            let (done, wait) = bounded(1);
            if self.commands.send(RendererCommand::Terminate(done)).is_ok() {
                let _ = wait.recv();
            }
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommandLineView, ConsoleView};
    use crate::renderer::{MonospaceMetrics, TextSurface};

    type TextRenderer = SurfaceRenderer<TextSurface, MonospaceMetrics>;

    fn renderer() -> TextRenderer {
        let config = RendererConfig {
            viewport_width: 80,
            viewport_height: 48,
            max_canvas_factor: 2,
            scroll_duration_ms: 60,
            scroll_fraction: 1.0,
            frame_rate: 100,
            ..RendererConfig::default()
        };
        SurfaceRenderer::spawn(TextSurface::new(8, 16), MonospaceMetrics::new(8, 16), &config).unwrap()
    }

    fn console_event(count: usize) -> ConsoleEvent {
        ConsoleEvent::ConsoleChanged(ConsoleView {
            lines: (0..count).map(|i| format!("line {i}")).collect(),
            total_lines: count,
            command_line: CommandLineView {
                prompt: "> ".to_string(),
                content: Vec::new(),
                cursor: 0,
            },
        })
    }

    #[test]
    fn test_reports_retained_lines() {
        let renderer = renderer();
        assert_eq!(renderer.retained_lines(), Some(5));
    }

    #[test]
    fn test_burst_of_events_is_one_batch_per_cycle() {
        let renderer = renderer();
        renderer.sync();
        let _ = renderer.updates().try_iter().count();

        // The loop blocks on the state lock after taking the first event,
        // so the rest of the burst is queued by the time it gets the lock.
        renderer.with_state(|_| {
            renderer.notify(console_event(1));
            renderer.notify(ConsoleEvent::CursorBlink(false));
            renderer.notify(ConsoleEvent::CursorBlink(true));
        });
        renderer.sync();

        let batches: Vec<Vec<Rect>> = renderer.updates().try_iter().collect();
        assert_eq!(batches.len(), 1);
        assert!(!batches[0].is_empty());
        renderer.with_state(|state| {
            assert_eq!(state.visible_text(), "line 0\n>");
        });
    }

    #[test]
    fn test_scroll_animates_to_clamped_offset() {
        let renderer = renderer();
        renderer.notify(console_event(10));
        renderer.sync();
        assert_eq!(renderer.with_state(|s| s.viewport_y()), 48);

        renderer.scroll(ScrollDirection::Up);
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while renderer.with_state(|s| s.viewport_y()) != 0 {
            assert!(std::time::Instant::now() < deadline, "scroll did not finish");
            std::thread::sleep(Duration::from_millis(10));
        }

        renderer.scroll(ScrollDirection::Up);
        std::thread::sleep(Duration::from_millis(150));
        renderer.sync();
        assert_eq!(renderer.with_state(|s| s.viewport_y()), 0);
    }

    #[test]
    fn test_command_line_change_cancels_scroll_and_repins() {
        let renderer = renderer();
        renderer.notify(console_event(10));
        renderer.scroll(ScrollDirection::Up);
        std::thread::sleep(Duration::from_millis(20));
        renderer.notify(ConsoleEvent::CommandLineChanged(CommandLineView {
            prompt: "> ".to_string(),
            content: vec!["x".to_string()],
            cursor: 1,
        }));
        renderer.sync();
        std::thread::sleep(Duration::from_millis(100));
        renderer.sync();

        renderer.with_state(|state| {
            assert!(state.is_pinned());
            assert_eq!(state.viewport_y(), 48);
        });
    }

    #[test]
    fn test_stop_scroll_freezes_viewport() {
        let config = RendererConfig {
            viewport_width: 80,
            viewport_height: 48,
            max_canvas_factor: 2,
            scroll_duration_ms: 5_000,
            scroll_fraction: 1.0,
            ..RendererConfig::default()
        };
        let renderer =
            SurfaceRenderer::spawn(TextSurface::new(8, 16), MonospaceMetrics::new(8, 16), &config)
                .unwrap();
        renderer.notify(console_event(10));
        renderer.scroll(ScrollDirection::Up);
        std::thread::sleep(Duration::from_millis(100));
        renderer.stop_scroll();
        renderer.sync();

        let stopped = renderer.with_state(|s| s.viewport_y());
        std::thread::sleep(Duration::from_millis(150));
        renderer.sync();
        assert_eq!(renderer.with_state(|s| s.viewport_y()), stopped);
        assert!(stopped > 0);
    }

    #[test]
    fn test_terminate_flushes_empty_batch_and_releases() {
        let renderer = renderer();
        renderer.notify(console_event(2));
        renderer.sync();
        let _ = renderer.updates().try_iter().count();

        renderer.terminate();
        renderer.terminate();
        assert!(renderer.is_terminated());
        assert_eq!(renderer.updates().try_recv(), Ok(Vec::new()));
        assert!(renderer.with_state(|s| s.is_released()));

        // Late notifications are dropped without panicking
        renderer.notify(ConsoleEvent::CursorBlink(true));
        renderer.scroll(ScrollDirection::Down);
        renderer.sync();
    }
}
