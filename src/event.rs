use crossterm::event::KeyEvent;

/// All events funnelled through the dispatch loop's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A keypress from the terminal reader thread, not yet classified.
    Key(KeyEvent),
    /// The terminal was resized.
    Resize,
    /// The event source failed to read from the terminal.
    ReadError,
}
