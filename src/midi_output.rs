//! MIDI output module for sending chord voicings to MIDI devices
//!
//! Wraps a `midir` output connection as a [`MidiSink`].

use crate::error::{HarmoniaError, HarmoniaResult};
use crate::midi_io::MidiSink;
use crate::scale::MidiNote;
use crate::session::PortSelector;
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use tracing::{debug, info};

/// MIDI message types sent by the harmonizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: u8,
        velocity: u8,
    },
}

impl MidiMessage {
    /// Convert to raw MIDI bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
        }
    }
}

/// MIDI output device info
#[derive(Debug, Clone)]
pub struct MidiOutputDevice {
    pub name: String,
    pub index: usize,
}

/// List available MIDI output devices
pub fn list_devices() -> HarmoniaResult<Vec<MidiOutputDevice>> {
    let midi_out =
        MidiOutput::new("Harmonia MIDI Scanner").map_err(|e| HarmoniaError::Midi(e.to_string()))?;

    Ok(midi_out
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_out
                .port_name(port)
                .ok()
                .map(|name| MidiOutputDevice { name, index })
        })
        .collect())
}

fn find_port(midi_out: &MidiOutput, selector: &PortSelector) -> Option<(MidiOutputPort, String)> {
    midi_out
        .ports()
        .into_iter()
        .enumerate()
        .filter_map(|(i, port)| midi_out.port_name(&port).ok().map(|name| (i, port, name)))
        .find(|(i, _, name)| selector.matches(*i, name))
        .map(|(_, port, name)| (port, name))
}

/// Output port backed by a live `midir` connection
pub struct MidirSink {
    name: String,
    connection: MidiOutputConnection,
}

impl MidirSink {
    /// Connect to the first output port matching `selector`
    pub fn open(selector: &PortSelector) -> HarmoniaResult<Self> {
        let midi_out =
            MidiOutput::new("Harmonia MIDI Output").map_err(|e| HarmoniaError::Midi(e.to_string()))?;

        let (port, name) = find_port(&midi_out, selector)
            .ok_or_else(|| HarmoniaError::DeviceNotFound(selector.to_string()))?;

        let connection = midi_out
            .connect(&port, "harmonia-output")
            .map_err(|e| HarmoniaError::Midi(e.to_string()))?;

        info!("Connected MIDI output: {}", name);
        Ok(Self { name, connection })
    }

    /// Send a MIDI message
    pub fn send(&mut self, msg: MidiMessage) -> HarmoniaResult<()> {
        debug!("-> {:?}", msg);
        self.connection
            .send(&msg.to_bytes())
            .map_err(|e| HarmoniaError::Midi(format!("{}: {}", self.name, e)))
    }
}

impl MidiSink for MidirSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_note_on(&mut self, note: MidiNote, velocity: u8, channel: u8) -> HarmoniaResult<()> {
        self.send(MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        })
    }

    fn send_note_off(&mut self, note: MidiNote, channel: u8) -> HarmoniaResult<()> {
        self.send(MidiMessage::NoteOff {
            channel,
            note,
            velocity: 0,
        })
    }
}
