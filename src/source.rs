use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event};
use log::debug;

use crate::cancel::CancelToken;
use crate::event::InputEvent;

/// Start the terminal reader in its own thread.
///
/// Maps crossterm events into [`InputEvent`]s and sends them down `tx`.
/// Polls with a timeout so the thread can observe cancellation between
/// reads; it exits when the token is cancelled or the receiving side of
/// the channel is gone. Read failures are forwarded as
/// [`InputEvent::ReadError`] rather than killing the thread.
pub fn spawn_reader(tx: Sender<InputEvent>, cancel: CancelToken) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        if cancel.is_cancelled() {
            return;
        }
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {
                let input = match event::read() {
                    Ok(Event::Key(key)) => InputEvent::Key(key),
                    Ok(Event::Resize(_, _)) => InputEvent::Resize,
                    Ok(_) => continue, // mouse, focus, paste: not our concern
                    Err(err) => {
                        debug!("terminal read failed: {err}");
                        InputEvent::ReadError
                    }
                };
                if tx.send(input).is_err() {
                    return;
                }
            }
            Ok(false) => {} // timeout; loop back and check the token
            Err(err) => {
                debug!("terminal poll failed: {err}");
                if tx.send(InputEvent::ReadError).is_err() {
                    return;
                }
            }
        }
    })
}
