//! Command line editor
//!
//! The single editable line at the bottom of the console. Content is stored
//! as a sequence of grapheme clusters so that multi-byte glyphs are inserted,
//! deleted and stepped over as atomic units. The cursor is an index into that
//! sequence and is clamped to `0..=len` by every operation.
//!
//! History is a linear list of committed lines. Browsing it replaces the edit
//! buffer with a copy of the selected entry, so editing a recalled line never
//! touches the stored entry.

use unicode_segmentation::UnicodeSegmentation;

/// Direction for cursor movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDirection {
    Left,
    Right,
}

/// Direction for history browsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    /// Towards older entries
    Prev,
    /// Towards newer entries, ending on the live (empty) line
    Next,
}

/// The editable command line with prompt, cursor and history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Prompt rendered in front of the content
    prompt: String,
    /// Edit buffer, one grapheme per element
    content: Vec<String>,
    /// Cursor position, `0..=content.len()`
    cursor: usize,
    /// Committed lines, oldest first
    history: Vec<Vec<String>>,
    /// Browsing position, `history.len()` means the live line
    history_index: usize,
}

impl CommandLine {
    /// Create an empty command line with the given prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            content: Vec::new(),
            cursor: 0,
            history: Vec::new(),
            history_index: 0,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Edit buffer as graphemes
    pub fn content(&self) -> &[String] {
        &self.content
    }

    /// Cursor position in graphemes
    pub fn cursor_position(&self) -> usize {
        self.cursor
    }

    /// Number of graphemes in the edit buffer
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Check if the edit buffer is empty
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Committed history entries, oldest first
    pub fn history(&self) -> impl Iterator<Item = String> + '_ {
        self.history.iter().map(|entry| entry.concat())
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_index(&self) -> usize {
        self.history_index
    }

    /// Insert text at the cursor and advance the cursor past it
    ///
    /// The grapheme left of the cursor is segmented together with the new
    /// text, so a combining mark typed on its own joins its base character.
    pub fn insert(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let start = self.cursor.saturating_sub(1);
        let mut joined = self.content[start..self.cursor].concat();
        joined.push_str(text);

        let graphemes: Vec<String> = joined.graphemes(true).map(str::to_string).collect();
        let count = graphemes.len();
        self.content.splice(start..self.cursor, graphemes);
        self.cursor = start;
        self.advance_cursor(count);
    }

    /// Delete the grapheme on the left of the cursor
    pub fn backspace_left(&mut self) {
        if self.cursor >= 1 {
            self.retreat_cursor(1);
            self.content.remove(self.cursor);
        }
    }

    /// Delete the grapheme under the cursor
    pub fn delete_at_cursor(&mut self) {
        if self.cursor < self.content.len() {
            self.content.remove(self.cursor);
        }
    }

    /// Empty the edit buffer and return to the live line
    pub fn clear(&mut self) {
        self.content = Vec::new();
        self.cursor = 0;
        self.history_index = self.history.len();
    }

    /// Move the cursor one grapheme left or right
    pub fn move_cursor(&mut self, direction: CursorDirection) {
        match direction {
            CursorDirection::Left => self.retreat_cursor(1),
            CursorDirection::Right => self.advance_cursor(1),
        }
    }

    /// Step through history, replacing the edit buffer
    ///
    /// Moving past the oldest entry stays on it; moving past the newest lands
    /// on the cleared live line.
    pub fn browse_history(&mut self, direction: HistoryDirection) {
        let target = match direction {
            HistoryDirection::Next => self.history_index + 1,
            HistoryDirection::Prev => match self.history_index.checked_sub(1) {
                Some(index) => index,
                None => {
                    self.history_index = 0;
                    return;
                }
            },
        };

        if target >= self.history.len() {
            self.clear();
            return;
        }

        self.history_index = target;
        self.content = self.history[target].clone();
        self.cursor = self.content.len();
    }

    /// Commit the edit buffer and return its text without the prompt
    ///
    /// Non-empty text is appended to history unless an entry with the same
    /// text exists anywhere in history.
    pub fn commit(&mut self) -> String {
        let line = self.content_string();
        if !line.is_empty() && !self.in_history(&line) {
            tracing::debug!(entry = %line, "pushing history entry");
            let content = std::mem::take(&mut self.content);
            self.history.push(content);
        }
        self.clear();
        line
    }

    /// Prompt followed by the edit buffer
    pub fn render(&self) -> String {
        let mut line = self.prompt.clone();
        line.push_str(&self.content_string());
        line
    }

    /// Edit buffer text without the prompt
    pub fn content_string(&self) -> String {
        self.content.concat()
    }

    fn in_history(&self, line: &str) -> bool {
        self.history.iter().any(|entry| entry.concat() == line)
    }

    fn advance_cursor(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.content.len());
    }

    fn retreat_cursor(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_sub(n);
    }
}

impl Default for CommandLine {
    fn default() -> Self {
        Self::new("console> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn typed(prompt: &str, text: &str) -> CommandLine {
        let mut line = CommandLine::new(prompt);
        line.insert(text);
        line
    }

    fn commit_text(line: &mut CommandLine, text: &str) {
        line.insert(text);
        line.commit();
    }

    #[test]
    fn test_fresh_line_renders_prompt() {
        let line = CommandLine::new("console> ");
        assert_eq!(line.render(), "console> ");
        assert_eq!(line.cursor_position(), 0);
        assert_eq!(line.history_index(), 0);
    }

    #[test]
    fn test_insert_advances_cursor() {
        let mut line = CommandLine::new("> ");
        line.insert("a");
        line.insert("b");
        line.insert("c");
        assert_eq!(line.content(), &["a", "b", "c"]);
        assert_eq!(line.cursor_position(), 3);
        assert_eq!(line.render(), "> abc");
    }

    #[test]
    fn test_insert_in_the_middle() {
        let mut line = typed("", "ac");
        line.move_cursor(CursorDirection::Left);
        line.insert("b");
        assert_eq!(line.content_string(), "abc");
        assert_eq!(line.cursor_position(), 2);
    }

    #[test]
    fn test_insert_multibyte_glyphs_are_atomic() {
        let mut line = typed("", "héllo 世界");
        assert_eq!(line.len(), 8);
        line.backspace_left();
        assert_eq!(line.content_string(), "héllo 世");
        line.move_cursor(CursorDirection::Left);
        line.move_cursor(CursorDirection::Left);
        line.backspace_left();
        assert_eq!(line.content_string(), "héll 世");
    }

    #[test]
    fn test_combining_mark_typed_alone_joins_base() {
        let mut per_char = CommandLine::new("> ");
        for c in "cafe\u{301}!".chars() {
            per_char.insert(c.encode_utf8(&mut [0u8; 4]));
        }
        let whole = typed("> ", "cafe\u{301}!");
        assert_eq!(per_char.content(), whole.content());
        assert_eq!(per_char.len(), 5);
        assert_eq!(per_char.cursor_position(), 5);

        per_char.backspace_left();
        per_char.backspace_left();
        assert_eq!(per_char.content_string(), "caf");
    }

    #[test]
    fn test_combining_mark_joins_base_mid_line() {
        let mut line = typed("", "eb");
        line.move_cursor(CursorDirection::Left);
        line.insert("\u{301}");
        assert_eq!(line.content(), &["e\u{301}", "b"]);
        assert_eq!(line.cursor_position(), 1);
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut line = typed("", "ab");
        line.move_cursor(CursorDirection::Left);
        line.move_cursor(CursorDirection::Left);
        line.backspace_left();
        assert_eq!(line.content_string(), "ab");
        assert_eq!(line.cursor_position(), 0);
    }

    #[test]
    fn test_delete_at_cursor() {
        let mut line = typed("", "abc");
        line.delete_at_cursor();
        assert_eq!(line.content_string(), "abc");

        line.move_cursor(CursorDirection::Left);
        line.move_cursor(CursorDirection::Left);
        line.delete_at_cursor();
        assert_eq!(line.content_string(), "ac");
        assert_eq!(line.cursor_position(), 1);
    }

    #[test]
    fn test_move_cursor() {
        let mut line = typed("console> ", "bar");
        line.move_cursor(CursorDirection::Left);
        assert_eq!(line.cursor_position(), 2);
        line.move_cursor(CursorDirection::Right);
        assert_eq!(line.cursor_position(), 3);
        line.move_cursor(CursorDirection::Right);
        assert_eq!(line.cursor_position(), 3);
    }

    #[test]
    fn test_empty_commit_does_not_grow_history() {
        let mut line = CommandLine::new("> ");
        assert_eq!(line.commit(), "");
        assert_eq!(line.history_len(), 0);
        assert_eq!(line.render(), "> ");
    }

    #[test]
    fn test_commit_returns_text_and_clears() {
        let mut line = typed("> ", "foo");
        assert_eq!(line.commit(), "foo");
        assert!(line.is_empty());
        assert_eq!(line.cursor_position(), 0);
        assert_eq!(line.history_index(), 1);
    }

    #[test]
    fn test_duplicate_commit_is_suppressed() {
        let mut line = CommandLine::new("> ");
        commit_text(&mut line, "foo");
        commit_text(&mut line, "foo");
        assert_eq!(line.history().collect::<Vec<_>>(), vec!["foo"]);
    }

    #[test]
    fn test_duplicate_anywhere_in_history_is_suppressed() {
        let mut line = CommandLine::new("> ");
        commit_text(&mut line, "foo");
        commit_text(&mut line, "bar");
        commit_text(&mut line, "foo");
        assert_eq!(line.history().collect::<Vec<_>>(), vec!["foo", "bar"]);
    }

    #[test]
    fn test_history_traversal_order() {
        let mut line = CommandLine::new("console> ");
        commit_text(&mut line, "foo");
        commit_text(&mut line, "bar");
        commit_text(&mut line, "biz");

        let mut visited = Vec::new();
        for _ in 0..3 {
            line.browse_history(HistoryDirection::Prev);
            visited.push(line.content_string());
        }
        for _ in 0..3 {
            line.browse_history(HistoryDirection::Next);
            visited.push(line.content_string());
        }
        assert_eq!(visited, vec!["biz", "bar", "foo", "bar", "biz", ""]);
    }

    #[test]
    fn test_history_prev_pins_at_oldest() {
        let mut line = CommandLine::new("console> ");
        commit_text(&mut line, "foo");
        commit_text(&mut line, "bar");
        commit_text(&mut line, "biz");
        commit_text(&mut line, "biz");

        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.render(), "console> biz");
        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.render(), "console> bar");
        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.render(), "console> foo");
        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.render(), "console> foo");
        assert_eq!(line.history_index(), 0);
        line.browse_history(HistoryDirection::Next);
        assert_eq!(line.render(), "console> bar");
        line.browse_history(HistoryDirection::Next);
        assert_eq!(line.render(), "console> biz");
        line.browse_history(HistoryDirection::Next);
        assert_eq!(line.render(), "console> ");
    }

    #[test]
    fn test_history_next_stays_on_live_line() {
        let mut line = CommandLine::new("> ");
        commit_text(&mut line, "foo");
        line.browse_history(HistoryDirection::Next);
        line.browse_history(HistoryDirection::Next);
        assert_eq!(line.render(), "> ");
        assert_eq!(line.history_index(), 1);
        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.render(), "> foo");
    }

    #[test]
    fn test_recalled_line_moves_cursor_to_end() {
        let mut line = CommandLine::new("> ");
        commit_text(&mut line, "hello");
        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.cursor_position(), 5);
    }

    #[test]
    fn test_editing_recall_does_not_touch_history() {
        let mut line = CommandLine::new("console> ");
        commit_text(&mut line, "foo");
        commit_text(&mut line, "bar");
        commit_text(&mut line, "biz");

        line.browse_history(HistoryDirection::Prev);
        line.insert("bar");
        assert_eq!(line.commit(), "bizbar");

        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.render(), "console> bizbar");
        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.render(), "console> biz");
        assert_eq!(
            line.history().collect::<Vec<_>>(),
            vec!["foo", "bar", "biz", "bizbar"]
        );
    }

    #[test]
    fn test_unedited_recall_is_not_duplicated() {
        let mut line = CommandLine::new("> ");
        commit_text(&mut line, "foo");
        commit_text(&mut line, "bar");
        line.browse_history(HistoryDirection::Prev);
        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.commit(), "foo");
        assert_eq!(line.history_len(), 2);
    }

    #[test]
    fn test_clear_resets_browsing() {
        let mut line = CommandLine::new("> ");
        commit_text(&mut line, "foo");
        commit_text(&mut line, "bar");
        line.browse_history(HistoryDirection::Prev);
        line.browse_history(HistoryDirection::Prev);
        line.clear();
        assert_eq!(line.history_index(), 2);
        line.browse_history(HistoryDirection::Prev);
        assert_eq!(line.content_string(), "bar");
    }

    #[test]
    fn test_set_prompt() {
        let mut line = typed("console> ", "abc");
        line.set_prompt("foo> ");
        assert_eq!(line.render(), "foo> abc");
    }

    #[derive(Debug, Clone)]
    enum Edit {
        Insert(String),
        Backspace,
        Delete,
        Left,
        Right,
        Commit,
        Prev,
        Next,
    }

    fn edit_strategy() -> impl Strategy<Value = Edit> {
        prop_oneof![
            "[a-z世é]{0,4}".prop_map(Edit::Insert),
            Just(Edit::Backspace),
            Just(Edit::Delete),
            Just(Edit::Left),
            Just(Edit::Right),
            Just(Edit::Commit),
            Just(Edit::Prev),
            Just(Edit::Next),
        ]
    }

    proptest! {
        #[test]
        fn prop_cursor_and_history_index_stay_in_bounds(
            edits in proptest::collection::vec(edit_strategy(), 0..64)
        ) {
            let mut line = CommandLine::new("> ");
            for edit in edits {
                match edit {
                    Edit::Insert(text) => line.insert(&text),
                    Edit::Backspace => line.backspace_left(),
                    Edit::Delete => line.delete_at_cursor(),
                    Edit::Left => line.move_cursor(CursorDirection::Left),
                    Edit::Right => line.move_cursor(CursorDirection::Right),
                    Edit::Commit => {
                        line.commit();
                    }
                    Edit::Prev => line.browse_history(HistoryDirection::Prev),
                    Edit::Next => line.browse_history(HistoryDirection::Next),
                }
                prop_assert!(line.cursor_position() <= line.len());
                prop_assert!(line.history_index() <= line.history_len());
            }
        }

        #[test]
        fn prop_history_has_no_duplicates(
            commits in proptest::collection::vec("[ab]{0,2}", 0..32)
        ) {
            let mut line = CommandLine::new("> ");
            for text in &commits {
                line.insert(text);
                line.commit();
            }
            let entries: Vec<String> = line.history().collect();
            let mut deduped = entries.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(entries.len(), deduped.len());
            prop_assert!(entries.iter().all(|e| !e.is_empty()));
        }
    }
}
