//! Scale quantization: snap any note to the nearest in-scale note
//!
//! # Algorithm
//! 1. Split the note into an octave offset (`floor(note / 12) * 12`) and a
//!    pitch class (`note mod 12`)
//! 2. Pick the scale member with the smallest absolute distance to the pitch
//!    class. Distance does not wrap around the octave, so the result stays in
//!    the note's own octave
//! 3. On an exact tie the lower pitch class wins (C# in C major snaps to C)
//! 4. Add the octave offset back and fold into 0-127 by whole octaves
//!
//! Every function here is pure and safe to call from any thread.

use crate::scale::{MidiNote, Scale};

/// Highest valid MIDI note number
pub const MIDI_NOTE_MAX: i32 = 127;

/// Nearest scale member to a pitch class; lower pitch class wins ties
pub fn nearest_pitch_class(pitch_class: u8, scale: &Scale) -> u8 {
    let mut best = scale.tonic();
    let mut best_distance = u8::MAX;

    for &candidate in scale.pitch_classes() {
        let distance = candidate.abs_diff(pitch_class);
        if distance < best_distance || (distance == best_distance && candidate < best) {
            best = candidate;
            best_distance = distance;
        }
    }

    best
}

/// Fold a value into 0-127 by whole octaves, preserving its pitch class
pub fn fold_into_midi_range(mut value: i32) -> MidiNote {
    while value < 0 {
        value += 12;
    }
    while value > MIDI_NOTE_MAX {
        value -= 12;
    }
    value as MidiNote
}

/// Quantize an arbitrary integer pitch to the nearest in-scale MIDI note
///
/// Defined for the whole integer domain; out-of-range results saturate into
/// 0-127 by octave folding rather than failing.
pub fn quantize_value(value: i32, scale: &Scale) -> MidiNote {
    let octave_offset = value.div_euclid(12) * 12;
    let pitch_class = value.rem_euclid(12) as u8;

    let nearest = nearest_pitch_class(pitch_class, scale);
    fold_into_midi_range(octave_offset + nearest as i32)
}

/// Quantize a MIDI note to the nearest note of `scale`
pub fn quantize(note: MidiNote, scale: &Scale) -> MidiNote {
    quantize_value(note as i32, scale)
}
