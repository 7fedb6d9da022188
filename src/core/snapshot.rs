//! Console snapshots
//!
//! Snapshots capture the console state in a serializable format for testing,
//! debugging and the headless runner. Given the same input sequence, the
//! console produces identical snapshots.

use serde::{Deserialize, Serialize};

use super::console::Console;

/// A complete snapshot of the console state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSnapshot {
    /// Current prompt
    pub prompt: String,
    /// Scrollback lines, oldest first
    pub lines: Vec<String>,
    /// Edit buffer without the prompt
    pub command_line: String,
    /// Cursor position in graphemes
    pub cursor: usize,
    /// History entries, oldest first
    pub history: Vec<String>,
    /// Whether notifications are paused
    pub paused: bool,
}

impl ConsoleSnapshot {
    /// Capture the current console state
    pub fn from_console(console: &Console) -> Self {
        let line = console.command_line_state();
        Self {
            prompt: line.prompt().to_string(),
            lines: console.lines().to_vec(),
            command_line: line.content_string(),
            cursor: line.cursor_position(),
            history: line.history().collect(),
            paused: console.is_paused(),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Scrollback followed by the command line
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text.push_str(&self.prompt);
        text.push_str(&self.command_line);
        text
    }
}
