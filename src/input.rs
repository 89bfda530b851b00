use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, unbounded, Receiver, RecvTimeoutError, Sender};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, warn};
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::event::InputEvent;

/// How long a bare Escape is held before it is declared a real Escape.
///
/// Long enough to catch the trailing byte of an Alt combination, short
/// enough that a lone Escape press does not feel laggy.
pub const DEFAULT_ESCAPE_DELAY: Duration = Duration::from_millis(50);

/// The application side of the dispatcher: performs whatever action the
/// resolved key event is bound to.
///
/// Implementations run on the dispatch loop's thread only. Errors are
/// logged and discarded; a failing action never stops the loop.
pub trait ActionExecutor {
    fn execute(&mut self, cancel: &CancelToken, key: KeyEvent) -> anyhow::Result<()>;
}

/// Hard failures from per-event handling. Any of these ends the loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("terminal resize handling is not implemented")]
    ResizeUnimplemented,
}

/// Why the dispatch loop returned.
#[derive(Debug, PartialEq, Eq)]
pub enum Termination {
    /// The governing token was cancelled.
    Cancelled,
    /// Every sender for the event source hung up.
    SourceClosed,
    /// Handling an event hit a hard failure.
    Failed(DispatchError),
}

/// An Escape keypress whose classification is still open: either the
/// user pressed Escape, or it is the lead byte of an Alt combination.
/// At most one exists at a time; it is resolved exactly once, by the
/// timer expiring or by the next key arriving first.
struct PendingEscape {
    event: KeyEvent,
    stop_tx: Sender<()>,
}

impl PendingEscape {
    /// Wake the armed timer thread without letting it fire.
    fn stop(self) {
        let _ = self.stop_tx.try_send(());
    }
}

/// Input-event dispatcher.
///
/// Pulls events off the source channel and routes resolved key events to
/// the [`ActionExecutor`]. A bare Escape is ambiguous at the byte level:
/// terminals encode Alt+key as an Escape byte immediately followed by
/// the key byte, so a lone Escape event cannot be classified until a
/// short delay has passed with no follow-up key. The dispatcher holds
/// such an event in a single pending slot, guarded by a mutex because
/// the slot is raced by the loop thread (next key arrives) and the
/// timer thread (delay expires).
pub struct Input<A> {
    actions: A,
    events: Receiver<InputEvent>,
    // Escapes resolved by timer expiry come back through this private
    // channel; the loop selects over it alongside `events`.
    resolved_tx: Sender<KeyEvent>,
    resolved_rx: Receiver<KeyEvent>,
    pending: Arc<Mutex<Option<PendingEscape>>>,
    escape_delay: Duration,
}

impl<A: ActionExecutor> Input<A> {
    pub fn new(actions: A, events: Receiver<InputEvent>) -> Self {
        Self::with_escape_delay(actions, events, DEFAULT_ESCAPE_DELAY)
    }

    /// Like [`new`](Self::new) with a custom disambiguation window.
    pub fn with_escape_delay(actions: A, events: Receiver<InputEvent>, delay: Duration) -> Self {
        let (resolved_tx, resolved_rx) = unbounded();
        Self {
            actions,
            events,
            resolved_tx,
            resolved_rx,
            pending: Arc::new(Mutex::new(None)),
            escape_delay: delay,
        }
    }

    /// Run the dispatch loop until cancellation or a hard failure.
    ///
    /// `on_exit` is invoked exactly once, on every exit path, so other
    /// components can observe that input handling is over; typically it
    /// is the cancel function of the governing token. Any escape timer
    /// still armed at exit is disarmed first, so nothing fires after the
    /// loop is gone.
    pub fn run(&mut self, cancel: &CancelToken, on_exit: impl FnOnce()) -> Termination {
        let end = self.pump(cancel);
        self.disarm();
        on_exit();
        end
    }

    fn pump(&mut self, cancel: &CancelToken) -> Termination {
        loop {
            let event = select! {
                recv(cancel.done()) -> _ => return Termination::Cancelled,
                recv(self.resolved_rx) -> key => {
                    // Never disconnects: we hold the sender.
                    if let Ok(key) = key {
                        self.dispatch(cancel, key);
                    }
                    continue;
                }
                recv(self.events) -> msg => match msg {
                    Ok(event) => event,
                    Err(_) => return Termination::SourceClosed,
                },
            };
            if let Err(err) = self.handle_event(cancel, event) {
                return Termination::Failed(err);
            }
        }
    }

    fn handle_event(
        &mut self,
        cancel: &CancelToken,
        event: InputEvent,
    ) -> Result<(), DispatchError> {
        match event {
            InputEvent::Key(key) => {
                self.classify(cancel, key);
                Ok(())
            }
            InputEvent::Resize => Err(DispatchError::ResizeUnimplemented),
            InputEvent::ReadError => {
                debug!("ignoring source read error");
                Ok(())
            }
        }
    }

    /// Decide what a key event is: held bare Escape, Alt-merged key, or
    /// an ordinary key dispatched as-is.
    fn classify(&mut self, cancel: &CancelToken, mut key: KeyEvent) {
        {
            let mut slot = self.pending.lock().unwrap();
            if is_bare_escape(&key) && slot.is_none() {
                debug!("holding bare escape for {:?}", self.escape_delay);
                *slot = Some(self.arm_timer(key));
                return;
            }
            if let Some(prior) = slot.take() {
                // The new key resolves the ambiguity: the held Escape
                // was the lead byte of an Alt combination. This also
                // covers a second bare Escape, which becomes Alt+Esc.
                prior.stop();
                key.modifiers |= KeyModifiers::ALT;
                debug!("merged pending escape into {:?} as alt", key.code);
            }
            // Lock released here, never held across the executor call.
        }
        self.dispatch(cancel, key);
    }

    /// Create the pending entry and start its timer thread.
    ///
    /// On expiry the thread takes the slot under the lock; `take` is
    /// what makes resolution exactly-once when expiry races a
    /// superseding key. A still-occupied slot means the Escape stood
    /// alone, and it is re-submitted for dispatch on the resolved
    /// channel rather than dispatched from this thread, keeping the
    /// loop the only caller of the executor.
    fn arm_timer(&self, event: KeyEvent) -> PendingEscape {
        let (stop_tx, stop_rx) = bounded(1);
        let pending = Arc::clone(&self.pending);
        let resolved_tx = self.resolved_tx.clone();
        let delay = self.escape_delay;
        thread::spawn(move || {
            match stop_rx.recv_timeout(delay) {
                Err(RecvTimeoutError::Timeout) => {}
                // Stopped, or the pending entry was dropped.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
            let expired = pending.lock().unwrap().take();
            if let Some(p) = expired {
                debug!("escape window elapsed; resolving as lone escape");
                let _ = resolved_tx.send(p.event);
            }
        });
        PendingEscape { event, stop_tx }
    }

    fn dispatch(&mut self, cancel: &CancelToken, key: KeyEvent) {
        if let Err(err) = self.actions.execute(cancel, key) {
            warn!("action for {:?} failed: {err:#}", key.code);
        }
    }

    /// Drop any outstanding pending escape so its timer cannot fire
    /// after the loop has exited.
    fn disarm(&self) {
        if let Some(pending) = self.pending.lock().unwrap().take() {
            pending.stop();
        }
    }
}

/// A bare Escape: the Escape key code with no modifiers, byte-wise the
/// shared prefix of every Alt combination.
fn is_bare_escape(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc && key.modifiers.is_empty()
}
