//! Console notifications
//!
//! Every state change on the console is reported to the attached renderer as
//! a [`ConsoleEvent`]. Events carry owned views of the state they describe,
//! so a renderer running on another thread never reads console state directly.

use super::command_line::CommandLine;

/// Renderer capability consumed by the console
///
/// Notifications are fire-and-forget. Implementations must preserve the
/// order in which `notify` is called.
pub trait Renderer: Send + Sync {
    /// Receive a notification from the console
    fn notify(&self, event: ConsoleEvent);

    /// How many trailing scrollback lines this renderer can show
    ///
    /// `None` asks for the whole scrollback on every full update.
    fn retained_lines(&self) -> Option<usize> {
        None
    }
}

/// A notification sent from the console to its renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// Only the command line changed
    CommandLineChanged(CommandLineView),
    /// Scrollback changed, redraw everything
    ConsoleChanged(ConsoleView),
    /// Periodic cursor blink
    CursorBlink(bool),
}

impl ConsoleEvent {
    /// Check if this event asks for a full redraw
    pub fn is_full_update(&self) -> bool {
        matches!(self, ConsoleEvent::ConsoleChanged(_))
    }
}

/// Owned view of the command line at the time of a notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineView {
    /// Prompt text
    pub prompt: String,
    /// Edit buffer, one grapheme per element
    pub content: Vec<String>,
    /// Cursor position in graphemes
    pub cursor: usize,
}

impl CommandLineView {
    pub fn from_command_line(line: &CommandLine) -> Self {
        Self {
            prompt: line.prompt().to_string(),
            content: line.content().to_vec(),
            cursor: line.cursor_position(),
        }
    }

    /// Prompt followed by the edit buffer
    pub fn text(&self) -> String {
        let mut text = self.prompt.clone();
        for grapheme in &self.content {
            text.push_str(grapheme);
        }
        text
    }

    /// Graphemes drawn before the cursor, prompt included
    pub fn graphemes_before_cursor(&self) -> impl Iterator<Item = &str> + '_ {
        use unicode_segmentation::UnicodeSegmentation;

        let cursor = self.cursor.min(self.content.len());
        self.prompt
            .graphemes(true)
            .chain(self.content[..cursor].iter().map(String::as_str))
    }

    /// Grapheme under the cursor, `None` at end of line
    pub fn grapheme_at_cursor(&self) -> Option<&str> {
        self.content.get(self.cursor).map(String::as_str)
    }
}

/// Owned view of the console for a full redraw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleView {
    /// Trailing scrollback lines, oldest first
    pub lines: Vec<String>,
    /// Number of lines in the whole scrollback
    pub total_lines: usize,
    /// Command line state
    pub command_line: CommandLineView,
}
