//! Capability traits connecting the router to MIDI devices
//!
//! The router never talks to a backend directly. A [`MidiSource`] delivers
//! note events to one installed handler; a [`MidiSink`] accepts note-on and
//! note-off commands on a channel.

use crate::error::HarmoniaResult;
use crate::scale::MidiNote;

/// Note event delivered by a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On {
        note: MidiNote,
        velocity: u8,
        channel: u8,
    },
    Off {
        note: MidiNote,
        channel: u8,
    },
}

impl NoteEvent {
    pub fn note(&self) -> MidiNote {
        match *self {
            NoteEvent::On { note, .. } | NoteEvent::Off { note, .. } => note,
        }
    }
}

/// Callback installed on a source; receives both note-ons and note-offs
pub type NoteHandler = Box<dyn FnMut(NoteEvent) + Send + 'static>;

/// Source of note events
pub trait MidiSource {
    /// Human-readable port name
    fn name(&self) -> &str;

    /// Install the handler, replacing any previous one
    fn attach(&mut self, handler: NoteHandler) -> HarmoniaResult<()>;

    /// Remove the handler; no events are delivered afterwards
    fn detach(&mut self);
}

/// Destination for note commands
pub trait MidiSink {
    /// Human-readable port name
    fn name(&self) -> &str;

    fn send_note_on(&mut self, note: MidiNote, velocity: u8, channel: u8) -> HarmoniaResult<()>;

    fn send_note_off(&mut self, note: MidiNote, channel: u8) -> HarmoniaResult<()>;
}
