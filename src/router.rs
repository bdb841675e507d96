//! Note router: turns incoming notes into harmonized chords
//!
//! The router owns the bound source and sink and the map from each sounding
//! input note to the output tones it triggered. Every note-on reads the
//! active scale from the [`ScaleSelection`], builds the chord and sends one
//! note-on per tone on channel `voice mod channel_count`. The matching
//! note-off releases exactly those (note, channel) pairs.
//!
//! All methods run on one thread. Events from device callbacks reach the
//! router through the session's channel, so the mapping needs no locking.
//!
//! Lifecycle: construct, bind source/sink, handle events, dispose. Dropping
//! the router disposes it.

use crate::chord::{build_chord, ChordTemplate};
use crate::error::{HarmoniaError, HarmoniaResult};
use crate::midi_io::{MidiSink, MidiSource, NoteEvent, NoteHandler};
use crate::scale::{note_name, MidiNote, Scale, ScaleSelection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// MIDI channel space
pub const MIDI_CHANNELS: u8 = 16;

/// What a note-on does when its note is already sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerPolicy {
    /// Release the old voicing, then voice the new chord
    #[default]
    Replace,
    /// Drop the new note-on
    Ignore,
}

/// Router tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Number of output channels chord voices are spread over (1-16)
    pub channel_count: u8,
    pub retrigger: RetriggerPolicy,
    /// Release sounding chords when the input or output is rebound
    pub flush_on_rebind: bool,
    /// Send every chord tone at this velocity instead of the played one
    pub fixed_velocity: Option<u8>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            channel_count: MIDI_CHANNELS,
            retrigger: RetriggerPolicy::Replace,
            flush_on_rebind: true,
            fixed_velocity: None,
        }
    }
}

impl RouterConfig {
    pub fn validate(&self) -> HarmoniaResult<()> {
        if self.channel_count == 0 || self.channel_count > MIDI_CHANNELS {
            return Err(HarmoniaError::Config(format!(
                "channel_count must be 1-{}, got {}",
                MIDI_CHANNELS, self.channel_count
            )));
        }
        if let Some(v) = self.fixed_velocity {
            if v == 0 || v > 127 {
                return Err(HarmoniaError::Config(format!(
                    "fixed_velocity must be 1-127, got {}",
                    v
                )));
            }
        }
        Ok(())
    }
}

/// One output tone the router has switched on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundingTone {
    pub note: MidiNote,
    pub channel: u8,
}

/// Map from sounding input note to the output tones it triggered
#[derive(Debug, Default)]
pub struct ActiveNotes {
    voicings: HashMap<MidiNote, Vec<SoundingTone>>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, input: MidiNote, tones: Vec<SoundingTone>) {
        self.voicings.insert(input, tones);
    }

    pub fn remove(&mut self, input: MidiNote) -> Option<Vec<SoundingTone>> {
        self.voicings.remove(&input)
    }

    pub fn get(&self, input: MidiNote) -> Option<&[SoundingTone]> {
        self.voicings.get(&input).map(Vec::as_slice)
    }

    pub fn contains(&self, input: MidiNote) -> bool {
        self.voicings.contains_key(&input)
    }

    pub fn len(&self) -> usize {
        self.voicings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voicings.is_empty()
    }

    /// Remove every entry, lowest input note first
    pub fn drain_sorted(&mut self) -> Vec<(MidiNote, Vec<SoundingTone>)> {
        let mut all: Vec<_> = self.voicings.drain().collect();
        all.sort_by_key(|(input, _)| *input);
        all
    }
}

/// Snapshot of the router for status display
#[derive(Debug, Clone)]
pub struct RouterStatus {
    pub scale: Arc<Scale>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub sounding: usize,
}

/// Event-driven harmonizer core
pub struct NoteRouter {
    config: RouterConfig,
    template: ChordTemplate,
    scale: ScaleSelection,
    input: Option<Box<dyn MidiSource>>,
    output: Option<Box<dyn MidiSink>>,
    active: ActiveNotes,
}

impl NoteRouter {
    /// Create an unbound router
    pub fn new(
        config: RouterConfig,
        template: ChordTemplate,
        scale: ScaleSelection,
    ) -> HarmoniaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            template,
            scale,
            input: None,
            output: None,
            active: ActiveNotes::new(),
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Handle to the shared scale cell
    pub fn scale_selection(&self) -> &ScaleSelection {
        &self.scale
    }

    pub fn active_notes(&self) -> &ActiveNotes {
        &self.active
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn status(&self) -> RouterStatus {
        RouterStatus {
            scale: self.scale.get(),
            input: self.input.as_ref().map(|s| s.name().to_string()),
            output: self.output.as_ref().map(|s| s.name().to_string()),
            sounding: self.active.len(),
        }
    }

    /// Switch the active scale; sounding chords are left alone
    ///
    /// On an unknown name the previous scale stays active.
    pub fn select_scale(&mut self, name: &str) -> HarmoniaResult<Arc<Scale>> {
        match self.scale.select(name) {
            Ok(scale) => {
                info!("Scale: {}", scale);
                Ok(scale)
            }
            Err(e) => {
                warn!("{}; keeping {}", e, self.scale.get().name());
                Err(e)
            }
        }
    }

    /// Bind a new input, detaching the previous one first
    ///
    /// The previous source is detached before the new one is attached, so no
    /// event is delivered twice. With `flush_on_rebind` every sounding chord
    /// is released; otherwise chords held on the old input stay on until
    /// their note numbers are released on the new one.
    pub fn bind_input(
        &mut self,
        mut source: Box<dyn MidiSource>,
        handler: NoteHandler,
    ) -> HarmoniaResult<()> {
        self.unbind_input();
        if self.config.flush_on_rebind {
            self.release_all();
        }

        source.attach(handler)?;
        info!("Bound input: {}", source.name());
        self.input = Some(source);
        Ok(())
    }

    /// Detach and drop the current input
    pub fn unbind_input(&mut self) {
        if let Some(mut old) = self.input.take() {
            old.detach();
            info!("Unbound input: {}", old.name());
        }
    }

    /// Bind a new output
    ///
    /// With `flush_on_rebind` sounding chords are released on the old sink
    /// before the swap. Otherwise their note-offs will go to the new sink.
    pub fn bind_output(&mut self, sink: Box<dyn MidiSink>) {
        if self.config.flush_on_rebind {
            self.release_all();
        }
        info!("Bound output: {}", sink.name());
        self.output = Some(sink);
    }

    /// Dispatch a note event
    pub fn handle(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::On { note, velocity, .. } => self.note_on(note, velocity),
            NoteEvent::Off { note, .. } => self.note_off(note),
        }
    }

    /// Voice the chord for `note`
    ///
    /// Velocity 0 is a note-off, whatever path the event arrived by.
    pub fn note_on(&mut self, note: MidiNote, velocity: u8) {
        if velocity == 0 {
            self.note_off(note);
            return;
        }
        if self.output.is_none() {
            debug!("Note on {}: {}", note_name(note), HarmoniaError::NoActiveOutput);
            return;
        }

        if self.active.contains(note) {
            match self.config.retrigger {
                RetriggerPolicy::Ignore => {
                    debug!("Note {} already sounding, ignoring retrigger", note_name(note));
                    return;
                }
                RetriggerPolicy::Replace => {
                    debug!("Note {} already sounding, replacing voicing", note_name(note));
                    self.note_off(note);
                }
            }
        }

        let scale = self.scale.get();
        let chord = build_chord(note, &scale, &self.template);
        if chord.is_empty() {
            return;
        }

        let velocity = self.config.fixed_velocity.unwrap_or(velocity);
        let channel_count = self.config.channel_count as usize;
        let Some(sink) = self.output.as_mut() else {
            return;
        };

        let mut sounding = Vec::with_capacity(chord.len());
        for tone in chord {
            let channel = (tone.voice % channel_count) as u8;
            match sink.send_note_on(tone.note, velocity, channel) {
                Ok(()) => sounding.push(SoundingTone {
                    note: tone.note,
                    channel,
                }),
                Err(e) => warn!("Note on {} ch{}: {}", note_name(tone.note), channel, e),
            }
        }

        debug!(
            "{} in {} -> {:?}",
            note_name(note),
            scale.name(),
            sounding.iter().map(|t| t.note).collect::<Vec<_>>()
        );

        if !sounding.is_empty() {
            self.active.insert(note, sounding);
        }
    }

    /// Release the chord voiced for `note`; a no-op if none is sounding
    pub fn note_off(&mut self, note: MidiNote) {
        let Some(tones) = self.active.remove(note) else {
            debug!("Note off {} with nothing sounding", note_name(note));
            return;
        };
        self.send_offs(&tones);
    }

    /// Release every sounding chord
    pub fn release_all(&mut self) {
        for (_, tones) in self.active.drain_sorted() {
            self.send_offs(&tones);
        }
    }

    /// All-notes-off for the chords this router started
    pub fn panic(&mut self) {
        info!("Panic: releasing {} sounding chords", self.active.len());
        self.release_all();
    }

    /// Detach the input and release everything; safe to call more than once
    pub fn dispose(&mut self) {
        self.unbind_input();
        self.release_all();
    }

    fn send_offs(&mut self, tones: &[SoundingTone]) {
        let Some(sink) = self.output.as_mut() else {
            warn!("{}: {} tones left sounding", HarmoniaError::NoActiveOutput, tones.len());
            return;
        };
        for tone in tones {
            if let Err(e) = sink.send_note_off(tone.note, tone.channel) {
                warn!("Note off {} ch{}: {}", note_name(tone.note), tone.channel, e);
            }
        }
    }
}

impl Drop for NoteRouter {
    fn drop(&mut self) {
        self.dispose();
    }
}
