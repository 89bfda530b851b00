//! End-to-end dispatch loop scenarios driven through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use key_dispatch::{
    ActionExecutor, CancelToken, DispatchError, Input, InputEvent, Termination,
};

#[derive(Clone)]
struct Recorder {
    calls: Arc<Mutex<Vec<KeyEvent>>>,
}

impl ActionExecutor for Recorder {
    fn execute(&mut self, _cancel: &CancelToken, key: KeyEvent) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(key);
        Ok(())
    }
}

struct Harness {
    tx: Sender<InputEvent>,
    cancel: CancelToken,
    calls: Arc<Mutex<Vec<KeyEvent>>>,
    exits: Arc<AtomicUsize>,
    loop_thread: thread::JoinHandle<Termination>,
}

impl Harness {
    /// Run the dispatch loop on its own thread, wired the way an
    /// application would: the exit trigger counts its invocations and
    /// cancels the shared token.
    fn start(delay: Duration) -> Self {
        let (tx, rx) = unbounded();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = Recorder {
            calls: Arc::clone(&calls),
        };
        let cancel = CancelToken::new();
        let exits = Arc::new(AtomicUsize::new(0));

        let mut input = Input::with_escape_delay(recorder, rx, delay);
        let loop_thread = {
            let cancel = cancel.clone();
            let exits = Arc::clone(&exits);
            thread::spawn(move || {
                let trigger = {
                    let cancel = cancel.clone();
                    let exits = Arc::clone(&exits);
                    move || {
                        exits.fetch_add(1, Ordering::SeqCst);
                        cancel.cancel();
                    }
                };
                input.run(&cancel, trigger)
            })
        };

        Self {
            tx,
            cancel,
            calls,
            exits,
            loop_thread,
        }
    }

    fn finish(self) -> Termination {
        self.cancel.cancel();
        self.loop_thread.join().expect("dispatch loop panicked")
    }

    fn dispatched(&self) -> Vec<KeyEvent> {
        self.calls.lock().unwrap().clone()
    }
}

fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
}

fn esc() -> KeyEvent {
    KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)
}

fn alt(mut event: KeyEvent) -> KeyEvent {
    event.modifiers |= KeyModifiers::ALT;
    event
}

// A lone Escape with nothing after it: dispatched once, no Alt.
#[test]
fn lone_escape_dispatches_after_delay() {
    let h = Harness::start(Duration::from_millis(25));

    h.tx.send(InputEvent::Key(esc())).unwrap();
    thread::sleep(Duration::from_millis(200));

    assert_eq!(h.dispatched(), vec![esc()]);
    assert_eq!(h.finish(), Termination::Cancelled);
}

// Escape then a key within the window: one Alt+key dispatch,
// nothing for the Escape alone.
#[test]
fn escape_followed_by_key_becomes_alt() {
    let h = Harness::start(Duration::from_millis(200));

    h.tx.send(InputEvent::Key(esc())).unwrap();
    h.tx.send(InputEvent::Key(key('a'))).unwrap();
    thread::sleep(Duration::from_millis(50));

    assert_eq!(h.dispatched(), vec![alt(key('a'))]);

    // Past the original window: the stopped timer stayed quiet.
    thread::sleep(Duration::from_millis(250));
    assert_eq!(h.dispatched(), vec![alt(key('a'))]);
    assert_eq!(h.finish(), Termination::Cancelled);
}

// An ordinary key is dispatched at once, unmodified.
#[test]
fn plain_key_passes_through() {
    let h = Harness::start(Duration::from_millis(25));

    h.tx.send(InputEvent::Key(key('a'))).unwrap();
    thread::sleep(Duration::from_millis(50));

    assert_eq!(h.dispatched(), vec![key('a')]);
    assert_eq!(h.finish(), Termination::Cancelled);
}

// Resize handling is a hard failure: the loop ends, the exit
// trigger fires once, and nothing is dispatched for the event.
#[test]
fn resize_terminates_the_loop() {
    let h = Harness::start(Duration::from_millis(25));

    h.tx.send(InputEvent::Resize).unwrap();
    let end = h.loop_thread.join().expect("dispatch loop panicked");

    assert_eq!(end, Termination::Failed(DispatchError::ResizeUnimplemented));
    assert_eq!(h.exits.load(Ordering::SeqCst), 1);
    assert!(h.calls.lock().unwrap().is_empty());
    assert!(h.cancel.is_cancelled());
}

// Cancellation while no event is pending: prompt return, exit
// trigger fired exactly once.
#[test]
fn cancellation_stops_an_idle_loop() {
    let h = Harness::start(Duration::from_millis(25));

    h.cancel.cancel();
    let end = h.loop_thread.join().expect("dispatch loop panicked");

    assert_eq!(end, Termination::Cancelled);
    assert_eq!(h.exits.load(Ordering::SeqCst), 1);
    assert!(h.calls.lock().unwrap().is_empty());
}

#[test]
fn dropping_the_source_ends_the_loop() {
    let h = Harness::start(Duration::from_millis(25));

    drop(h.tx);
    let end = h.loop_thread.join().expect("dispatch loop panicked");

    assert_eq!(end, Termination::SourceClosed);
    assert_eq!(h.exits.load(Ordering::SeqCst), 1);
}

// Shutdown disarms a still-pending escape: its timer never produces a
// late dispatch.
#[test]
fn shutdown_disarms_pending_escape() {
    let h = Harness::start(Duration::from_millis(100));

    h.tx.send(InputEvent::Key(esc())).unwrap();
    thread::sleep(Duration::from_millis(20)); // let the loop hold it
    let calls = Arc::clone(&h.calls);
    assert_eq!(h.finish(), Termination::Cancelled);

    thread::sleep(Duration::from_millis(200));
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn read_errors_do_not_stop_the_loop() {
    let h = Harness::start(Duration::from_millis(25));

    h.tx.send(InputEvent::ReadError).unwrap();
    h.tx.send(InputEvent::Key(key('z'))).unwrap();
    thread::sleep(Duration::from_millis(50));

    assert_eq!(h.dispatched(), vec![key('z')]);
    assert_eq!(h.finish(), Termination::Cancelled);
}
