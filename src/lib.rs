//! # Harmonia - MIDI Chord Harmonizer
//!
//! Harmonia listens to a MIDI input, snaps every incoming note to the
//! active major scale and answers it with a four-note chord built on that
//! note's scale degree. Each chord voice goes out on its own MIDI channel,
//! and releasing the key releases exactly the notes it started.
//!
//! ## Core Pieces
//!
//! - **Scales**: the twelve major scales, plus a shared cell holding the
//!   active one ([`scale`])
//! - **Quantizer**: nearest in-scale note, octave preserving ([`quantize`])
//! - **Chord builder**: per-degree interval template, re-quantized and
//!   fitted into a two-octave window ([`chord`])
//! - **Router**: owns the bound devices and the map from sounding input
//!   notes to output tones ([`router`])
//! - **Session**: single-threaded event loop fed by device callbacks and
//!   the console ([`session`], [`console`])
//!
//! ## Quick Start
//!
//! ```rust
//! use harmonia::chord::{chord_notes, ChordTemplate};
//! use harmonia::scale::ScaleTable;
//!
//! let scale = ScaleTable::lookup("cMajor").unwrap();
//! let chord = chord_notes(60, &scale, &ChordTemplate::standard());
//! assert_eq!(chord, vec![60, 64, 67, 71]);
//! ```
//!
//! ### Routing Through a Sink
//!
//! ```rust
//! use harmonia::chord::ChordTemplate;
//! use harmonia::mock_midi::RecordingSink;
//! use harmonia::router::{NoteRouter, RouterConfig};
//! use harmonia::scale::ScaleSelection;
//!
//! let sink = RecordingSink::new("synth");
//! let mut router = NoteRouter::new(
//!     RouterConfig::default(),
//!     ChordTemplate::standard(),
//!     ScaleSelection::default(),
//! )
//! .unwrap();
//! router.bind_output(Box::new(sink.clone()));
//!
//! router.note_on(60, 100);
//! assert_eq!(sink.note_ons(), vec![(60, 0), (64, 1), (67, 2), (71, 3)]);
//!
//! router.note_off(60);
//! assert_eq!(sink.note_offs().len(), 4);
//! assert!(router.active_notes().is_empty());
//! ```

pub mod chord;
pub mod config;
pub mod console;
pub mod error;
pub mod midi_input;
pub mod midi_io;
pub mod midi_output;
pub mod mock_midi;
pub mod quantize;
pub mod router;
pub mod scale;
pub mod session;

pub use chord::{build_chord, chord_notes, ChordTemplate, ChordTone};
pub use config::HarmoniaConfig;
pub use error::{HarmoniaError, HarmoniaResult};
pub use midi_io::{MidiSink, MidiSource, NoteEvent, NoteHandler};
pub use quantize::quantize;
pub use router::{NoteRouter, RetriggerPolicy, RouterConfig};
pub use scale::{MidiNote, Scale, ScaleSelection, ScaleTable};
pub use session::{DeviceProvider, LiveSession, MidirDevices, PortSelector, RouterEvent};
