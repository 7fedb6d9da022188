//! Console Core Module
//!
//! Platform-independent console state management. This module contains:
//! - Command line editor with history
//! - Console scrollback, input surface and renderer notifications
//! - Evaluator and renderer capabilities
//! - Deterministic snapshot generation
//!
//! All mutation happens synchronously on the caller's thread. The only
//! background task is the cursor-blink notifier, which never touches console
//! state beyond the renderer reference and the pause flag.

mod command_line;
mod console;
mod error;
mod event;
mod snapshot;

pub use command_line::{CommandLine, CursorDirection, HistoryDirection};
pub use console::{
    Console, Evaluator, ReadlineCommand, BACKSPACE, CARRIAGE_RETURN, CURSOR_BLINK_INTERVAL,
    DELETE,
};
pub use error::EvalError;
pub use event::{CommandLineView, ConsoleEvent, ConsoleView, Renderer};
pub use snapshot::ConsoleSnapshot;
