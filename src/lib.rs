//! Input-event dispatcher for interactive terminal applications.
//!
//! Terminals encode Alt+key as an Escape byte immediately followed by
//! the plain key byte, so a bare Escape keypress is indistinguishable
//! from the start of an Alt combination at the moment it arrives. This
//! crate owns that ambiguity: incoming key events either dispatch
//! straight to an [`ActionExecutor`], or sit in a single pending slot
//! until a short timer declares them a real Escape, unless a follow-up
//! key arrives first and is merged into an Alt-modified event.
//!
//! [`Input::run`] is the cooperative dispatch loop: it blocks on the
//! event channel and a [`CancelToken`] at the same time, and returns a
//! typed [`Termination`] saying why it stopped.

pub mod cancel;
pub mod event;
pub mod input;
pub mod source;

pub use cancel::CancelToken;
pub use event::InputEvent;
pub use input::{ActionExecutor, DispatchError, Input, Termination, DEFAULT_ESCAPE_DELAY};
pub use source::spawn_reader;
