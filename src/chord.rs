//! Diatonic seventh chords built on the scale degree of a played note
//!
//! A [`ChordTemplate`] maps each scale degree to four semitone intervals
//! above that degree's root. The same template is used for every scale.
//! [`build_chord`] quantizes the trigger, finds its degree, re-quantizes each
//! chord tone and keeps the voicing within one octave of the trigger:
//! every tone lands in octave `floor(trigger / 12)` or the one above.

use crate::error::{HarmoniaError, HarmoniaResult};
use crate::quantize::{quantize, quantize_value, MIDI_NOTE_MAX};
use crate::scale::{MidiNote, Scale, SCALE_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Number of tones in a seventh chord
pub const CHORD_SIZE: usize = 4;

/// Largest interval accepted in a template override
pub const MAX_TEMPLATE_INTERVAL: u8 = 23;

/// Interval table for the seven scale degrees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<u8>>",
    into = "BTreeMap<String, Vec<u8>>"
)]
pub struct ChordTemplate {
    degrees: [Option<[u8; CHORD_SIZE]>; SCALE_SIZE],
}

impl ChordTemplate {
    /// The stock template: one interval set per degree, shared by all scales
    pub fn standard() -> Self {
        Self {
            degrees: [
                Some([0, 4, 7, 11]),
                Some([2, 5, 9, 0]),
                Some([4, 7, 11, 2]),
                Some([5, 9, 0, 4]),
                Some([7, 11, 2, 5]),
                Some([9, 0, 4, 7]),
                Some([11, 2, 5, 9]),
            ],
        }
    }

    /// Template with no degrees filled in
    pub fn empty() -> Self {
        Self {
            degrees: [None; SCALE_SIZE],
        }
    }

    /// Set the intervals for one degree
    pub fn with_degree(mut self, degree: usize, intervals: [u8; CHORD_SIZE]) -> HarmoniaResult<Self> {
        if degree >= SCALE_SIZE {
            return Err(HarmoniaError::InvalidTemplate(format!(
                "degree {} out of range 0-{}",
                degree,
                SCALE_SIZE - 1
            )));
        }
        if let Some(&bad) = intervals.iter().find(|&&i| i > MAX_TEMPLATE_INTERVAL) {
            return Err(HarmoniaError::InvalidTemplate(format!(
                "interval {} on degree {} exceeds {}",
                bad, degree, MAX_TEMPLATE_INTERVAL
            )));
        }
        self.degrees[degree] = Some(intervals);
        Ok(self)
    }

    /// Intervals for a degree, if the template covers it
    pub fn intervals(&self, degree: usize) -> Option<&[u8; CHORD_SIZE]> {
        self.degrees.get(degree)?.as_ref()
    }
}

impl Default for ChordTemplate {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<BTreeMap<String, Vec<u8>>> for ChordTemplate {
    type Error = HarmoniaError;

    fn try_from(table: BTreeMap<String, Vec<u8>>) -> Result<Self, Self::Error> {
        let mut template = ChordTemplate::empty();
        for (key, intervals) in table {
            let degree: usize = key.trim().parse().map_err(|_| {
                HarmoniaError::InvalidTemplate(format!("degree key '{}' is not a number", key))
            })?;
            let intervals: [u8; CHORD_SIZE] = intervals.as_slice().try_into().map_err(|_| {
                HarmoniaError::InvalidTemplate(format!(
                    "degree {} needs exactly {} intervals, got {}",
                    degree,
                    CHORD_SIZE,
                    intervals.len()
                ))
            })?;
            template = template.with_degree(degree, intervals)?;
        }
        Ok(template)
    }
}

impl From<ChordTemplate> for BTreeMap<String, Vec<u8>> {
    fn from(template: ChordTemplate) -> Self {
        template
            .degrees
            .iter()
            .enumerate()
            .filter_map(|(degree, intervals)| {
                intervals.map(|iv| (degree.to_string(), iv.to_vec()))
            })
            .collect()
    }
}

/// One output tone of a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordTone {
    pub note: MidiNote,
    /// Position in the template (0-3), used for channel assignment
    pub voice: usize,
}

/// Scale degree of a note after quantization
pub fn scale_degree(note: MidiNote, scale: &Scale) -> HarmoniaResult<usize> {
    let pitch_class = quantize(note, scale) % 12;
    scale
        .degree_of(pitch_class)
        .ok_or(HarmoniaError::DegreeNotFound { pitch_class })
}

/// Move a note by octaves until its octave is `base` or `base + 1`
///
/// Returns `None` when that placement falls outside 0-127.
pub fn fit_to_window(mut note: i32, base_octave: i32) -> Option<MidiNote> {
    while note.div_euclid(12) < base_octave {
        note += 12;
    }
    while note.div_euclid(12) > base_octave + 1 {
        note -= 12;
    }
    (0..=MIDI_NOTE_MAX).contains(&note).then_some(note as MidiNote)
}

/// Build the chord for `trigger` in `scale`
///
/// Returns tones in template order. Empty when the trigger's degree is not
/// found or the template has no entry for it. A tone that cannot be placed
/// in the window without leaving the MIDI range is dropped; the remaining
/// tones keep their template voice.
pub fn build_chord(trigger: MidiNote, scale: &Scale, template: &ChordTemplate) -> Vec<ChordTone> {
    let degree = match scale_degree(trigger, scale) {
        Ok(degree) => degree,
        Err(e) => {
            debug!("No chord for {}: {}", trigger, e);
            return Vec::new();
        }
    };

    let Some(intervals) = template.intervals(degree) else {
        debug!("Template has no entry for degree {}", degree);
        return Vec::new();
    };

    let Some(root) = scale.degree_pitch_class(degree) else {
        return Vec::new();
    };

    let base_octave = (trigger / 12) as i32;

    intervals
        .iter()
        .enumerate()
        .filter_map(|(voice, &interval)| {
            let candidate = quantize_value(root as i32 + interval as i32, scale);
            match fit_to_window(candidate as i32, base_octave) {
                Some(note) => Some(ChordTone { note, voice }),
                None => {
                    debug!("Dropping voice {} of {}: outside MIDI range", voice, trigger);
                    None
                }
            }
        })
        .collect()
}

/// Note numbers of [`build_chord`], in template order
pub fn chord_notes(trigger: MidiNote, scale: &Scale, template: &ChordTemplate) -> Vec<MidiNote> {
    build_chord(trigger, scale, template)
        .into_iter()
        .map(|tone| tone.note)
        .collect()
}
