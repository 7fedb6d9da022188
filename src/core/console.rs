//! Console state machine
//!
//! The console owns the scrollback and the command line and exposes the input
//! surface used by the host (characters, control codes, readline commands and
//! printing). Every mutation is reported to the attached [`Renderer`] as a
//! [`ConsoleEvent`], unless the console is paused or no renderer is attached.
//! In both cases the state still changes; only the notification is dropped.
//!
//! The renderer reference is the one piece of state shared across threads:
//! the cursor-blink notifier reads it on its own timer. It sits behind a
//! read-mostly lock, senders snapshot it under a short read lock and a swap
//! holds the write lock only for the exchange itself.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};

use super::command_line::{CommandLine, CursorDirection, HistoryDirection};
use super::error::EvalError;
use super::event::{CommandLineView, ConsoleEvent, ConsoleView, Renderer};
use crate::app::ConsoleConfig;
use crate::sync::{rwlock_read_or_recover, rwlock_write_or_recover};

/// Carriage return: commits the command line
pub const CARRIAGE_RETURN: char = '\u{000d}';
/// Backspace: deletes left of the cursor
pub const BACKSPACE: char = '\u{0008}';
/// Delete: deletes under the cursor
pub const DELETE: char = '\u{007f}';

/// Default interval between cursor blink notifications
pub const CURSOR_BLINK_INTERVAL: Duration = Duration::from_millis(500);

/// Readline-style commands understood by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadlineCommand {
    HistoryPrev,
    HistoryNext,
    CursorLeft,
    CursorRight,
}

/// Command evaluation capability consumed by the console
///
/// Invoked synchronously when a line is committed. Output goes back into the
/// console through [`Console::print`] or [`Console::print_lines`]; a returned
/// error is printed as scrollback text.
pub trait Evaluator: Send {
    fn run(&mut self, console: &mut Console, command: &str) -> Result<(), EvalError>;
}

impl<F> Evaluator for F
where
    F: FnMut(&mut Console, &str) -> Result<(), EvalError> + Send,
{
    fn run(&mut self, console: &mut Console, command: &str) -> Result<(), EvalError> {
        self(console, command)
    }
}

/// State shared with the blink notifier
struct Shared {
    renderer: RwLock<Option<Arc<dyn Renderer>>>,
    paused: AtomicBool,
}

impl Shared {
    fn renderer(&self) -> Option<Arc<dyn Renderer>> {
        rwlock_read_or_recover(&self.renderer).clone()
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Background task emitting alternating cursor blinks
struct BlinkNotifier {
    stop: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl BlinkNotifier {
    fn spawn(shared: Arc<Shared>, interval: Duration) -> Self {
        let (stop, stop_rx) = bounded::<()>(1);
        let worker = std::thread::Builder::new()
            .name("console-blink".to_string())
            .spawn(move || {
                let ticker = tick(interval);
                let mut cursor_on = false;
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            // Pause flips under the write lock, hold the read lock
                            // across the check and the notify.
                            let slot = rwlock_read_or_recover(&shared.renderer);
                            if !shared.is_paused() {
                                if let Some(renderer) = slot.as_ref() {
                                    renderer.notify(ConsoleEvent::CursorBlink(cursor_on));
                                }
                                cursor_on = !cursor_on;
                            }
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("failed to start cursor blink notifier: {}", e);
                None
            }
        };

        Self { stop, worker }
    }
}

impl Drop for BlinkNotifier {
    fn drop(&mut self) {
        let _ = self.stop.try_send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// The console: scrollback plus an editable command line
pub struct Console {
    /// Committed and printed lines, oldest first
    lines: Vec<String>,
    /// The edit line
    command_line: CommandLine,
    /// Taken out while it runs so it can borrow the console mutably
    evaluator: Option<Box<dyn Evaluator>>,
    shared: Arc<Shared>,
    _blink: Option<BlinkNotifier>,
}

impl Console {
    /// Create a console with the default configuration
    pub fn new(evaluator: Option<Box<dyn Evaluator>>) -> Self {
        Self::with_config(&ConsoleConfig::default(), evaluator)
    }

    /// Create a console from configuration
    ///
    /// The blink notifier is started unless the configured interval is zero.
    pub fn with_config(config: &ConsoleConfig, evaluator: Option<Box<dyn Evaluator>>) -> Self {
        let shared = Arc::new(Shared {
            renderer: RwLock::new(None),
            paused: AtomicBool::new(false),
        });
        let blink = config
            .cursor_blink()
            .map(|interval| BlinkNotifier::spawn(Arc::clone(&shared), interval));

        Self {
            lines: Vec::new(),
            command_line: CommandLine::new(config.prompt.clone()),
            evaluator,
            shared,
            _blink: blink,
        }
    }

    /// Scrollback lines, oldest first
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The command line state
    pub fn command_line_state(&self) -> &CommandLine {
        &self.command_line
    }

    /// The rendered command line, prompt included
    pub fn command_line(&self) -> String {
        self.command_line.render()
    }

    pub fn prompt(&self) -> &str {
        self.command_line.prompt()
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.command_line.set_prompt(prompt);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.is_paused()
    }

    /// Pause or resume notifications
    ///
    /// Leaving the paused state pushes one full update so the renderer can
    /// resynchronize with everything that changed meanwhile.
    pub fn pause(&mut self, paused: bool) {
        let resync = match self.shared.renderer() {
            Some(r) if self.is_paused() && !paused => Some(self.view(r.retained_lines())),
            _ => None,
        };

        // Same ordering as `set_renderer`: no blink lands between the flag
        // flip and the full update.
        let slot = rwlock_write_or_recover(&self.shared.renderer);
        let was_paused = self.shared.paused.swap(paused, Ordering::SeqCst);
        tracing::debug!(paused, was_paused, "console pause");
        if let (Some(renderer), Some(view)) = (slot.as_ref(), resync) {
            renderer.notify(ConsoleEvent::ConsoleChanged(view));
        }
    }

    /// Current renderer, if any
    pub fn renderer(&self) -> Option<Arc<dyn Renderer>> {
        self.shared.renderer()
    }

    /// Replace the renderer and return the previous one
    ///
    /// A newly attached renderer receives a full update before this returns.
    pub fn set_renderer(&mut self, renderer: Option<Arc<dyn Renderer>>) -> Option<Arc<dyn Renderer>> {
        let resync = match &renderer {
            Some(r) if !self.is_paused() => Some(self.view(r.retained_lines())),
            _ => None,
        };

        // The full update goes out under the write lock, so the blink
        // notifier cannot reach the new renderer ahead of it.
        let mut slot = rwlock_write_or_recover(&self.shared.renderer);
        let previous = std::mem::replace(&mut *slot, renderer);
        if let (Some(renderer), Some(view)) = (slot.as_ref(), resync) {
            renderer.notify(ConsoleEvent::ConsoleChanged(view));
        }
        tracing::debug!(attached = slot.is_some(), "renderer swapped");
        previous
    }

    /// Handle a character code from the host
    pub fn put_character(&mut self, code: char) {
        match code {
            BACKSPACE => {
                self.command_line.backspace_left();
                self.emit_command_line();
            }
            DELETE => {
                self.command_line.delete_at_cursor();
                self.emit_command_line();
            }
            CARRIAGE_RETURN => {
                self.carriage_return();
                self.emit(|console, retained| ConsoleEvent::ConsoleChanged(console.view(retained)));
            }
            c => {
                let mut buf = [0u8; 4];
                self.command_line.insert(c.encode_utf8(&mut buf));
                self.emit_command_line();
            }
        }
    }

    /// Insert a string at the cursor with a single notification
    pub fn put_string(&mut self, text: &str) {
        self.command_line.insert(text);
        self.emit_command_line();
    }

    /// Insert a string and commit it
    pub fn put_command(&mut self, command: &str) {
        self.put_string(command);
        self.put_character(CARRIAGE_RETURN);
    }

    /// Apply a readline-style command
    pub fn readline_command(&mut self, command: ReadlineCommand) {
        match command {
            ReadlineCommand::HistoryPrev => self.command_line.browse_history(HistoryDirection::Prev),
            ReadlineCommand::HistoryNext => self.command_line.browse_history(HistoryDirection::Next),
            ReadlineCommand::CursorLeft => self.command_line.move_cursor(CursorDirection::Left),
            ReadlineCommand::CursorRight => self.command_line.move_cursor(CursorDirection::Right),
        }
        self.emit_command_line();
    }

    /// Clear the command line
    pub fn clear_command_line(&mut self) {
        self.command_line.clear();
        self.emit_command_line();
    }

    /// Append lines verbatim to the scrollback
    ///
    /// Lines should not contain line breaks.
    pub fn print_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self.emit(|console, retained| ConsoleEvent::ConsoleChanged(console.view(retained)));
    }

    /// Print text, one scrollback line per line break
    ///
    /// A single trailing line break does not produce an empty line.
    pub fn print(&mut self, text: &str) {
        self.print_lines(split_lines(text));
    }

    /// Build a full view, keeping at most `retained` trailing lines
    pub fn view(&self, retained: Option<usize>) -> ConsoleView {
        let start = retained
            .map(|n| self.lines.len().saturating_sub(n))
            .unwrap_or(0);
        ConsoleView {
            lines: self.lines[start..].to_vec(),
            total_lines: self.lines.len(),
            command_line: CommandLineView::from_command_line(&self.command_line),
        }
    }

    fn carriage_return(&mut self) {
        let command = self.command_line.commit();
        let line = format!("{}{}", self.command_line.prompt(), command);
        tracing::debug!(command = %command, "command committed");
        self.lines.push(line);

        if let Some(mut evaluator) = self.evaluator.take() {
            if let Err(err) = evaluator.run(self, &command) {
                tracing::warn!(command = %command, "evaluator failed: {}", err);
                self.lines.extend(split_lines(&err.to_string()));
            }
            if self.evaluator.is_none() {
                self.evaluator = Some(evaluator);
            }
        }
    }

    fn emit_command_line(&self) {
        self.emit(|console, _| {
            ConsoleEvent::CommandLineChanged(CommandLineView::from_command_line(&console.command_line))
        });
    }

    fn emit<F>(&self, event: F)
    where
        F: FnOnce(&Self, Option<usize>) -> ConsoleEvent,
    {
        if self.is_paused() {
            tracing::trace!("console paused, notification dropped");
            return;
        }
        match self.shared.renderer() {
            Some(renderer) => renderer.notify(event(self, renderer.retained_lines())),
            None => tracing::trace!("no renderer, notification dropped"),
        }
    }
}

impl fmt::Display for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        write!(f, "{}", self.command_line.render())
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("lines", &self.lines.len())
            .field("command_line", &self.command_line)
            .field("paused", &self.is_paused())
            .field("renderer", &self.renderer().is_some())
            .field("evaluator", &self.evaluator.is_some())
            .finish()
    }
}

fn split_lines(text: &str) -> Vec<String> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.split('\n').map(str::to_string).collect()
}
