//! In-memory MIDI source and sink for testing
//!
//! Both types are cheap handles over shared state: keep a clone, hand the
//! other to the router as a boxed trait object, and drive or inspect it from
//! the test.

use crate::error::{HarmoniaError, HarmoniaResult};
use crate::midi_io::{MidiSink, MidiSource, NoteEvent, NoteHandler};
use crate::midi_output::MidiMessage;
use crate::scale::MidiNote;
use crate::session::{DeviceProvider, PortSelector};
use std::sync::{Arc, Mutex};

/// Source whose events are injected by the test
#[derive(Clone)]
pub struct MockSource {
    name: String,
    handler: Arc<Mutex<Option<NoteHandler>>>,
}

impl MockSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            handler: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.handler.lock().map(|h| h.is_some()).unwrap_or(false)
    }

    /// Deliver an event to the attached handler; false if nothing is attached
    pub fn emit(&self, event: NoteEvent) -> bool {
        let Ok(mut guard) = self.handler.lock() else {
            return false;
        };
        match guard.as_mut() {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    pub fn press(&self, note: MidiNote, velocity: u8) -> bool {
        self.emit(NoteEvent::On {
            note,
            velocity,
            channel: 0,
        })
    }

    pub fn release(&self, note: MidiNote) -> bool {
        self.emit(NoteEvent::Off { note, channel: 0 })
    }
}

impl MidiSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, handler: NoteHandler) -> HarmoniaResult<()> {
        let mut guard = self
            .handler
            .lock()
            .map_err(|_| HarmoniaError::Midi("mock source poisoned".to_string()))?;
        *guard = Some(handler);
        Ok(())
    }

    fn detach(&mut self) {
        if let Ok(mut guard) = self.handler.lock() {
            *guard = None;
        }
    }
}

/// Sink that records every command it receives
#[derive(Clone)]
pub struct RecordingSink {
    name: String,
    log: Arc<Mutex<Vec<MidiMessage>>>,
    failing: bool,
}

impl RecordingSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::new(Mutex::new(Vec::new())),
            failing: false,
        }
    }

    /// Sink whose sends always fail
    pub fn failing(name: &str) -> Self {
        Self {
            failing: true,
            ..Self::new(name)
        }
    }

    /// All recorded messages in send order
    pub fn messages(&self) -> Vec<MidiMessage> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Drain the recorded messages
    pub fn take(&self) -> Vec<MidiMessage> {
        self.log
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .unwrap_or_default()
    }

    /// (note, channel) pairs of recorded note-ons
    pub fn note_ons(&self) -> Vec<(MidiNote, u8)> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                MidiMessage::NoteOn { channel, note, .. } => Some((note, channel)),
                _ => None,
            })
            .collect()
    }

    /// (note, channel) pairs of recorded note-offs
    pub fn note_offs(&self) -> Vec<(MidiNote, u8)> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                MidiMessage::NoteOff { channel, note, .. } => Some((note, channel)),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, msg: MidiMessage) -> HarmoniaResult<()> {
        if self.failing {
            return Err(HarmoniaError::Midi(format!("{}: send failed", self.name)));
        }
        self.log
            .lock()
            .map_err(|_| HarmoniaError::Midi("recording sink poisoned".to_string()))?
            .push(msg);
        Ok(())
    }
}

impl MidiSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_note_on(&mut self, note: MidiNote, velocity: u8, channel: u8) -> HarmoniaResult<()> {
        self.record(MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        })
    }

    fn send_note_off(&mut self, note: MidiNote, channel: u8) -> HarmoniaResult<()> {
        self.record(MidiMessage::NoteOff {
            channel,
            note,
            velocity: 0,
        })
    }
}

/// Fixed set of mock ports handed out by selector
#[derive(Clone, Default)]
pub struct MockDevices {
    pub inputs: Vec<MockSource>,
    pub outputs: Vec<RecordingSink>,
}

impl MockDevices {
    pub fn new(inputs: Vec<MockSource>, outputs: Vec<RecordingSink>) -> Self {
        Self { inputs, outputs }
    }
}

impl DeviceProvider for MockDevices {
    fn open_input(&mut self, selector: &PortSelector) -> HarmoniaResult<Box<dyn MidiSource>> {
        self.inputs
            .iter()
            .enumerate()
            .find(|(i, source)| selector.matches(*i, &source.name))
            .map(|(_, source)| Box::new(source.clone()) as Box<dyn MidiSource>)
            .ok_or_else(|| HarmoniaError::DeviceNotFound(selector.to_string()))
    }

    fn open_output(&mut self, selector: &PortSelector) -> HarmoniaResult<Box<dyn MidiSink>> {
        self.outputs
            .iter()
            .enumerate()
            .find(|(i, sink)| selector.matches(*i, &sink.name))
            .map(|(_, sink)| Box::new(sink.clone()) as Box<dyn MidiSink>)
            .ok_or_else(|| HarmoniaError::DeviceNotFound(selector.to_string()))
    }
}
