//! MIDI input module for receiving notes from external devices
//!
//! Parses raw MIDI bytes into [`NoteEvent`]s and wraps a `midir` input
//! connection as a [`MidiSource`]. The connection callback runs on the
//! backend's thread and only forwards events to the installed handler.

use crate::error::{HarmoniaError, HarmoniaResult};
use crate::midi_io::{MidiSource, NoteEvent, NoteHandler};
use crate::session::PortSelector;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use tracing::{info, trace};

/// Parse raw MIDI bytes into a note event
///
/// Note-on with velocity 0 is a note-off. Everything other than note
/// messages yields `None`.
pub fn parse_note_event(bytes: &[u8]) -> Option<NoteEvent> {
    if bytes.len() < 3 {
        return None;
    }

    let status = bytes[0];
    let channel = status & 0x0F;
    let note = bytes[1] & 0x7F;
    let velocity = bytes[2] & 0x7F;

    match status & 0xF0 {
        0x90 if velocity > 0 => Some(NoteEvent::On {
            note,
            velocity,
            channel,
        }),
        0x90 | 0x80 => Some(NoteEvent::Off { note, channel }),
        _ => None,
    }
}

/// MIDI input device info
#[derive(Debug, Clone)]
pub struct MidiInputDevice {
    pub name: String,
    pub index: usize,
}

/// List available MIDI input devices
pub fn list_devices() -> HarmoniaResult<Vec<MidiInputDevice>> {
    let midi_in =
        MidiInput::new("Harmonia MIDI Scanner").map_err(|e| HarmoniaError::Midi(e.to_string()))?;

    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_in
                .port_name(port)
                .ok()
                .map(|name| MidiInputDevice { name, index })
        })
        .collect())
}

fn find_port(midi_in: &MidiInput, selector: &PortSelector) -> Option<(MidiInputPort, String)> {
    midi_in
        .ports()
        .into_iter()
        .enumerate()
        .filter_map(|(i, port)| midi_in.port_name(&port).ok().map(|name| (i, port, name)))
        .find(|(i, _, name)| selector.matches(*i, name))
        .map(|(_, port, name)| (port, name))
}

/// Input port backed by `midir`
///
/// The port is resolved on [`MidirSource::open`]; the connection is made on
/// attach and closed on detach.
pub struct MidirSource {
    name: String,
    connection: Option<MidiInputConnection<()>>,
}

impl MidirSource {
    /// Resolve the first input port matching `selector`
    pub fn open(selector: &PortSelector) -> HarmoniaResult<Self> {
        let midi_in =
            MidiInput::new("Harmonia MIDI Input").map_err(|e| HarmoniaError::Midi(e.to_string()))?;
        let (_, name) = find_port(&midi_in, selector)
            .ok_or_else(|| HarmoniaError::DeviceNotFound(selector.to_string()))?;

        Ok(Self {
            name,
            connection: None,
        })
    }
}

impl MidiSource for MidirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, mut handler: NoteHandler) -> HarmoniaResult<()> {
        self.detach();

        let mut midi_in =
            MidiInput::new("Harmonia MIDI Input").map_err(|e| HarmoniaError::Midi(e.to_string()))?;
        // Ignore sysex and timing messages
        midi_in.ignore(Ignore::Sysex | Ignore::Time);

        // Ports can be renumbered between open and attach, so match by name
        let selector = PortSelector::Name(self.name.clone());
        let (port, _) = find_port(&midi_in, &selector)
            .ok_or_else(|| HarmoniaError::DeviceNotFound(self.name.clone()))?;

        let connection = midi_in
            .connect(
                &port,
                "harmonia-input",
                move |_timestamp_us, message, _| {
                    if let Some(event) = parse_note_event(message) {
                        trace!("<- {:?}", event);
                        handler(event);
                    }
                },
                (),
            )
            .map_err(|e| HarmoniaError::Midi(e.to_string()))?;

        info!("Listening on MIDI input: {}", self.name);
        self.connection = Some(connection);
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            info!("Detached MIDI input: {}", self.name);
        }
    }
}

impl Drop for MidirSource {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on() {
        let event = parse_note_event(&[0x90, 60, 100]).unwrap();
        assert_eq!(
            event,
            NoteEvent::On {
                note: 60,
                velocity: 100,
                channel: 0
            }
        );
    }

    #[test]
    fn test_parse_note_off() {
        let event = parse_note_event(&[0x85, 64, 40]).unwrap();
        assert_eq!(event, NoteEvent::Off { note: 64, channel: 5 });
    }

    #[test]
    fn test_parse_note_on_zero_velocity() {
        // Note on with velocity 0 = note off
        let event = parse_note_event(&[0x92, 67, 0]).unwrap();
        assert_eq!(event, NoteEvent::Off { note: 67, channel: 2 });
    }

    #[test]
    fn test_parse_ignores_other_messages() {
        assert_eq!(parse_note_event(&[0xB0, 1, 64]), None);
        assert_eq!(parse_note_event(&[0xC0, 5]), None);
        assert_eq!(parse_note_event(&[0x90, 60]), None);
        assert_eq!(parse_note_event(&[]), None);
    }
}
