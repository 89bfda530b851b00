use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::unbounded;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use key_dispatch::{spawn_reader, ActionExecutor, CancelToken, Input, Termination};

#[derive(Parser)]
#[command(
    name = "key-dispatch",
    about = "Echo resolved key events, with the Escape/Alt ambiguity disambiguated"
)]
struct Cli {
    /// Escape disambiguation window in milliseconds
    #[arg(long, default_value_t = 50)]
    escape_delay_ms: u64,
}

/// Prints every resolved key event; quits on `q` or Ctrl-C.
struct EchoActions;

impl ActionExecutor for EchoActions {
    fn execute(&mut self, cancel: &CancelToken, key: KeyEvent) -> Result<()> {
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        print!("{:?} alt={alt}\r\n", key.code);
        io::stdout().flush()?;

        let ctrl_c =
            key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Char('q') || ctrl_c {
            cancel.cancel();
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Terminal setup ──────────────────────────────────────────
    enable_raw_mode()?;

    // Panic hook: restore the terminal before printing the panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        original_hook(info);
    }));

    let result = run(&cli);

    disable_raw_mode()?;
    result
}

fn run(cli: &Cli) -> Result<()> {
    let cancel = CancelToken::new();
    let (tx, rx) = unbounded();

    // ── Terminal reader thread ──────────────────────────────────
    let reader = spawn_reader(tx, cancel.clone());

    print!("press keys to see resolved events; q or Ctrl-C quits\r\n");
    io::stdout().flush()?;

    // ── Dispatch loop ───────────────────────────────────────────
    let mut input = Input::with_escape_delay(
        EchoActions,
        rx,
        Duration::from_millis(cli.escape_delay_ms),
    );
    let trigger = {
        let cancel = cancel.clone();
        move || cancel.cancel()
    };
    let end = input.run(&cancel, trigger);

    if let Termination::Failed(err) = end {
        print!("input loop stopped: {err}\r\n");
        io::stdout().flush()?;
    }

    reader.join().ok();
    Ok(())
}
