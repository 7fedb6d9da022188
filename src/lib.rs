//! Mochi Console Library
//!
//! An embeddable drop-down console overlay: a scrollback buffer plus an
//! editable command line, driven by host input events and displayed through
//! a pluggable renderer. This crate provides:
//!
//! - `core`: command line editor, console state machine, notifications
//! - `animation`: time-based sampler for slide and scroll transitions
//! - `renderer`: virtual canvas, viewport and dirty-rect tracking
//! - `input`: host key map
//! - `app`: configuration and logging setup

pub mod animation;
pub mod app;
pub mod core;
pub mod input;
pub mod renderer;
pub mod sync;

pub use crate::core::{Console, ConsoleEvent, Evaluator, EvalError, Renderer};
