//! Scales, the scale table, and the shared active-scale cell
//!
//! A [`Scale`] is seven distinct pitch classes stored in degree order, tonic
//! first. The [`ScaleTable`] holds the twelve major scales and is read-only
//! for the lifetime of the process. The [`ScaleSelection`] is the cell the
//! router reads on every note-on.

use crate::error::{HarmoniaError, HarmoniaResult};
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;

/// MIDI note number type (0-127)
pub type MidiNote = u8;

/// Number of pitch classes in a scale
pub const SCALE_SIZE: usize = 7;

/// Major scale steps from the tonic: W-W-H-W-W-W-H
pub const MAJOR_STEPS: [u8; SCALE_SIZE] = [0, 2, 4, 5, 7, 9, 11];

/// Table names and tonic pitch classes, in presentation order
const MAJOR_TONICS: [(&str, u8); 12] = [
    ("cMajor", 0),
    ("dbMajor", 1),
    ("dMajor", 2),
    ("ebMajor", 3),
    ("eMajor", 4),
    ("fMajor", 5),
    ("gbMajor", 6),
    ("gMajor", 7),
    ("abMajor", 8),
    ("aMajor", 9),
    ("bbMajor", 10),
    ("bMajor", 11),
];

lazy_static::lazy_static! {
    static ref SCALE_TABLE: Vec<Scale> = MAJOR_TONICS
        .iter()
        .map(|&(name, tonic)| Scale::major(name, tonic))
        .collect();
}

/// Pitch class (0-11) of a note
pub fn pitch_class(note: MidiNote) -> u8 {
    note % 12
}

/// Octave index of a note (note div 12, so 60 is octave 5)
pub fn octave(note: MidiNote) -> u8 {
    note / 12
}

/// Convert MIDI note number to note name ("c4" for 60)
pub fn note_name(note: MidiNote) -> String {
    let note_names = [
        "c", "cs", "d", "ds", "e", "f", "fs", "g", "gs", "a", "as", "b",
    ];
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", note_names[(note % 12) as usize], octave)
}

/// Parse a tonic name ("c", "c#", "db", "f#", "Bb") into a pitch class
pub fn parse_tonic(s: &str) -> Option<u8> {
    let s = s.trim().to_lowercase();
    let chars: Vec<char> = s.chars().collect();

    let base: i8 = match chars.first()? {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };

    let modifier = match chars.len() {
        1 => 0,
        2 => match chars[1] {
            '#' | 's' => 1,
            'b' | 'f' => -1,
            _ => return None,
        },
        _ => return None,
    };

    Some((base + modifier).rem_euclid(12) as u8)
}

/// Seven distinct pitch classes in scale-degree order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    name: String,
    pitch_classes: [u8; SCALE_SIZE],
}

impl Scale {
    /// Build a scale, validating that it holds 7 distinct pitch classes in 0-11
    pub fn new(name: impl Into<String>, pitch_classes: [u8; SCALE_SIZE]) -> HarmoniaResult<Self> {
        let name = name.into();
        let mut seen = [false; 12];
        for &pc in &pitch_classes {
            if pc > 11 {
                return Err(HarmoniaError::InvalidScale(format!(
                    "{}: pitch class {} out of range 0-11",
                    name, pc
                )));
            }
            if seen[pc as usize] {
                return Err(HarmoniaError::InvalidScale(format!(
                    "{}: duplicate pitch class {}",
                    name, pc
                )));
            }
            seen[pc as usize] = true;
        }
        Ok(Self { name, pitch_classes })
    }

    /// Major scale on the given tonic pitch class
    pub fn major(name: impl Into<String>, tonic: u8) -> Self {
        let mut pitch_classes = [0u8; SCALE_SIZE];
        for (slot, step) in pitch_classes.iter_mut().zip(MAJOR_STEPS) {
            *slot = (tonic % 12 + step) % 12;
        }
        Self {
            name: name.into(),
            pitch_classes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pitch classes in degree order, tonic first
    pub fn pitch_classes(&self) -> &[u8; SCALE_SIZE] {
        &self.pitch_classes
    }

    pub fn tonic(&self) -> u8 {
        self.pitch_classes[0]
    }

    /// Pitch class at a scale degree
    pub fn degree_pitch_class(&self, degree: usize) -> Option<u8> {
        self.pitch_classes.get(degree).copied()
    }

    /// Scale degree of a pitch class, if it is a member
    pub fn degree_of(&self, pitch_class: u8) -> Option<usize> {
        self.pitch_classes.iter().position(|&pc| pc == pitch_class)
    }

    pub fn contains(&self, pitch_class: u8) -> bool {
        self.degree_of(pitch_class).is_some()
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.name, self.pitch_classes)
    }
}

/// Registry of the twelve major scales
pub struct ScaleTable;

impl ScaleTable {
    /// Scale names in presentation order
    pub fn names() -> impl Iterator<Item = &'static str> {
        MAJOR_TONICS.iter().map(|&(name, _)| name)
    }

    pub fn all() -> &'static [Scale] {
        &SCALE_TABLE
    }

    /// Look up a scale by table name (case-insensitive) or by tonic ("d", "f#")
    pub fn lookup(name: &str) -> HarmoniaResult<Scale> {
        let wanted = name.trim();
        if let Some(scale) = SCALE_TABLE
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(wanted))
        {
            return Ok(scale.clone());
        }

        parse_tonic(wanted)
            .and_then(|tonic| SCALE_TABLE.iter().find(|s| s.tonic() == tonic))
            .cloned()
            .ok_or_else(|| HarmoniaError::UnknownScale(name.to_string()))
    }

    /// C major
    pub fn default_scale() -> Scale {
        SCALE_TABLE[0].clone()
    }
}

/// Shared cell holding the active scale
///
/// Cloning shares the cell. Readers always see a complete scale; a new
/// selection replaces the old one wholesale.
#[derive(Clone)]
pub struct ScaleSelection {
    active: Arc<ArcSwap<Scale>>,
}

impl ScaleSelection {
    pub fn new(scale: Scale) -> Self {
        Self {
            active: Arc::new(ArcSwap::from_pointee(scale)),
        }
    }

    /// Current scale
    pub fn get(&self) -> Arc<Scale> {
        self.active.load_full()
    }

    pub fn set(&self, scale: Scale) {
        self.active.store(Arc::new(scale));
    }

    /// Select a table scale by name; the previous scale is kept on failure
    pub fn select(&self, name: &str) -> HarmoniaResult<Arc<Scale>> {
        let scale = ScaleTable::lookup(name)?;
        self.set(scale);
        Ok(self.get())
    }
}

impl Default for ScaleSelection {
    fn default() -> Self {
        Self::new(ScaleTable::default_scale())
    }
}

impl fmt::Debug for ScaleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScaleSelection").field(&*self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(scale: &Scale) -> Vec<u8> {
        let mut pcs = scale.pitch_classes().to_vec();
        pcs.sort_unstable();
        pcs
    }

    #[test]
    fn test_table_has_twelve_major_scales() {
        let names: Vec<&str> = ScaleTable::names().collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "cMajor");
        assert_eq!(names[11], "bMajor");
        assert_eq!(ScaleTable::all().len(), 12);
    }

    #[test]
    fn test_table_pitch_class_sets() {
        let expected: [(&str, [u8; 7]); 12] = [
            ("cMajor", [0, 2, 4, 5, 7, 9, 11]),
            ("dbMajor", [0, 1, 3, 5, 6, 8, 10]),
            ("dMajor", [1, 2, 4, 6, 7, 9, 11]),
            ("ebMajor", [0, 2, 3, 5, 7, 8, 10]),
            ("eMajor", [1, 3, 4, 6, 8, 9, 11]),
            ("fMajor", [0, 2, 4, 5, 7, 9, 10]),
            ("gbMajor", [1, 3, 5, 6, 8, 10, 11]),
            ("gMajor", [0, 2, 4, 6, 7, 9, 11]),
            ("abMajor", [0, 1, 3, 5, 7, 8, 10]),
            ("aMajor", [1, 2, 4, 6, 8, 9, 11]),
            ("bbMajor", [0, 2, 3, 5, 7, 9, 10]),
            ("bMajor", [1, 3, 4, 6, 8, 10, 11]),
        ];
        for (name, pcs) in expected {
            let scale = ScaleTable::lookup(name).unwrap();
            assert_eq!(sorted(&scale), pcs.to_vec(), "{}", name);
        }
    }

    #[test]
    fn test_degree_zero_is_tonic() {
        let d = ScaleTable::lookup("dMajor").unwrap();
        assert_eq!(d.tonic(), 2);
        assert_eq!(d.pitch_classes(), &[2, 4, 6, 7, 9, 11, 1]);
        assert_eq!(d.degree_of(1), Some(6));
        assert_eq!(d.degree_of(0), None);
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_accepts_tonics() {
        assert_eq!(ScaleTable::lookup("CMAJOR").unwrap().name(), "cMajor");
        assert_eq!(ScaleTable::lookup("d").unwrap().name(), "dMajor");
        assert_eq!(ScaleTable::lookup("F#").unwrap().name(), "gbMajor");
        assert_eq!(ScaleTable::lookup("c#").unwrap().name(), "dbMajor");
        assert_eq!(ScaleTable::lookup("Bb").unwrap().name(), "bbMajor");
    }

    #[test]
    fn test_lookup_unknown_scale() {
        match ScaleTable::lookup("hMajor") {
            Err(HarmoniaError::UnknownScale(name)) => assert_eq!(name, "hMajor"),
            other => panic!("expected UnknownScale, got {:?}", other),
        }
        assert!(ScaleTable::lookup("").is_err());
        assert!(ScaleTable::lookup("c##").is_err());
    }

    #[test]
    fn test_scale_new_validation() {
        assert!(Scale::new("ok", [0, 2, 4, 5, 7, 9, 11]).is_ok());
        assert!(matches!(
            Scale::new("dup", [0, 0, 4, 5, 7, 9, 11]),
            Err(HarmoniaError::InvalidScale(_))
        ));
        assert!(matches!(
            Scale::new("range", [0, 2, 4, 5, 7, 9, 12]),
            Err(HarmoniaError::InvalidScale(_))
        ));
    }

    #[test]
    fn test_parse_tonic() {
        assert_eq!(parse_tonic("c"), Some(0));
        assert_eq!(parse_tonic("C"), Some(0));
        assert_eq!(parse_tonic("db"), Some(1));
        assert_eq!(parse_tonic("cb"), Some(11));
        assert_eq!(parse_tonic("fs"), Some(6));
        assert_eq!(parse_tonic("h"), None);
        assert_eq!(parse_tonic("cx"), None);
    }

    #[test]
    fn test_note_name() {
        assert_eq!(note_name(60), "c4");
        assert_eq!(note_name(69), "a4");
        assert_eq!(note_name(61), "cs4");
        assert_eq!(note_name(0), "c-1");
    }

    #[test]
    fn test_selection_keeps_previous_on_unknown_name() {
        let selection = ScaleSelection::default();
        assert_eq!(selection.get().name(), "cMajor");

        selection.select("ebMajor").unwrap();
        assert_eq!(selection.get().name(), "ebMajor");

        assert!(selection.select("nope").is_err());
        assert_eq!(selection.get().name(), "ebMajor");
    }

    #[test]
    fn test_selection_clones_share_the_cell() {
        let a = ScaleSelection::default();
        let b = a.clone();
        b.select("gMajor").unwrap();
        assert_eq!(a.get().name(), "gMajor");
    }
}
