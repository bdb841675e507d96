//! Line-oriented command console for a live session
//!
//! Each line is parsed into a [`ConsoleCommand`]. Commands that change the
//! session are forwarded as [`RouterEvent`]s; `help` and `scales` are
//! answered on the console itself.

use crate::error::{HarmoniaError, HarmoniaResult};
use crate::scale::ScaleTable;
use crate::session::{PortSelector, RouterEvent};
use std::io::{BufRead, Write};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

pub const HELP: &str = "\
Commands:
  scale <name>    select the active scale (cMajor, dMajor, F#, ...)
  scales          list the available scales
  input <sel>     bind the MIDI input by index or name
  output <sel>    bind the MIDI output by index or name
  panic           release every sounding chord
  status          show scale, ports and sounding notes
  help            show this text
  quit | exit     stop the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Event(RouterEvent),
    Help,
    ListScales,
}

fn argument<'a>(command: &str, rest: Option<&'a str>) -> HarmoniaResult<&'a str> {
    rest.map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HarmoniaError::InvalidCommand(format!("'{}' needs an argument", command)))
}

/// Parse one console line; blank lines and `#` comments yield `None`
pub fn parse_command(line: &str) -> HarmoniaResult<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, Some(rest)),
        None => (line, None),
    };

    let command = match word.to_lowercase().as_str() {
        "scale" => ConsoleCommand::Event(RouterEvent::SelectScale(
            argument(word, rest)?.to_string(),
        )),
        "scales" => ConsoleCommand::ListScales,
        "input" | "in" => ConsoleCommand::Event(RouterEvent::SelectInput(
            argument(word, rest)?.parse::<PortSelector>()?,
        )),
        "output" | "out" => ConsoleCommand::Event(RouterEvent::SelectOutput(
            argument(word, rest)?.parse::<PortSelector>()?,
        )),
        "panic" => ConsoleCommand::Event(RouterEvent::Panic),
        "status" => ConsoleCommand::Event(RouterEvent::Status),
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Event(RouterEvent::Shutdown),
        other => {
            return Err(HarmoniaError::InvalidCommand(format!(
                "unknown command '{}' (try 'help')",
                other
            )))
        }
    };
    Ok(Some(command))
}

/// Read commands until EOF or `quit`, forwarding events to the session
///
/// Always ends by sending [`RouterEvent::Shutdown`], so closing stdin stops
/// the session.
pub fn run_console<R: BufRead, W: Write>(
    reader: R,
    mut out: W,
    sender: Sender<RouterEvent>,
) -> HarmoniaResult<()> {
    for line in reader.lines() {
        let line = line?;
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Help)) => writeln!(out, "{}", HELP)?,
            Ok(Some(ConsoleCommand::ListScales)) => {
                for scale in ScaleTable::all() {
                    writeln!(out, "  {}", scale)?;
                }
            }
            Ok(Some(ConsoleCommand::Event(event))) => {
                let shutdown = event == RouterEvent::Shutdown;
                debug!("Console -> {:?}", event);
                if sender.send(event).is_err() || shutdown {
                    return Ok(());
                }
            }
            Err(e) => writeln!(out, "{}", e)?,
        }
    }

    let _ = sender.send(RouterEvent::Shutdown);
    Ok(())
}

/// Run the console on stdin/stdout in a background thread
pub fn spawn_console(sender: Sender<RouterEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        if let Err(e) = run_console(stdin.lock(), stdout.lock(), sender.clone()) {
            warn!("Console stopped: {}", e);
            let _ = sender.send(RouterEvent::Shutdown);
        }
    })
}
