//! Live session integration tests
//!
//! Drives the full path with mock devices:
//! 1. MockSource callback → session channel
//! 2. Session loop → NoteRouter → chord voicing
//! 3. RecordingSink captures what would go out on the wire

use harmonia::chord::ChordTemplate;
use harmonia::console::run_console;
use harmonia::midi_io::NoteEvent;
use harmonia::mock_midi::{MockDevices, MockSource, RecordingSink};
use harmonia::router::{NoteRouter, RouterConfig};
use harmonia::scale::ScaleSelection;
use harmonia::session::{LiveSession, PortSelector, RouterEvent};
use std::io::Cursor;

struct Rig {
    keys: MockSource,
    pads: MockSource,
    synth: RecordingSink,
    session: LiveSession<MockDevices>,
}

fn rig_with(config: RouterConfig) -> Rig {
    let keys = MockSource::new("KeyStep 37");
    let pads = MockSource::new("Launchpad");
    let synth = RecordingSink::new("IAC Driver Bus 1");

    let devices = MockDevices::new(vec![keys.clone(), pads.clone()], vec![synth.clone()]);
    let router = NoteRouter::new(config, ChordTemplate::standard(), ScaleSelection::default()).unwrap();

    Rig {
        keys,
        pads,
        synth,
        session: LiveSession::new(router, devices),
    }
}

fn rig() -> Rig {
    let mut rig = rig_with(RouterConfig::default());
    rig.session.select_output(&PortSelector::Index(0)).unwrap();
    rig.session
        .select_input(&PortSelector::Name("keystep".to_string()))
        .unwrap();
    rig
}

#[test]
fn test_played_note_is_voiced_through_the_channel() {
    let mut rig = rig();

    assert!(rig.keys.press(60, 100));
    // Nothing is routed until the session loop runs
    assert!(rig.synth.messages().is_empty());

    assert!(rig.session.process_pending());
    assert_eq!(rig.synth.note_ons(), vec![(60, 0), (64, 1), (67, 2), (71, 3)]);

    rig.keys.release(60);
    assert!(rig.session.process_pending());
    assert_eq!(rig.synth.note_offs(), vec![(60, 0), (64, 1), (67, 2), (71, 3)]);
    assert!(rig.session.router().active_notes().is_empty());
}

#[test]
fn test_scale_switch_applies_to_next_note_only() {
    let mut rig = rig();
    let sender = rig.session.sender();

    rig.keys.press(60, 100);
    sender.send(RouterEvent::SelectScale("dMajor".to_string())).unwrap();
    rig.keys.press(62, 100);
    rig.session.process_pending();

    assert_eq!(rig.session.status().scale.name(), "dMajor");
    assert_eq!(
        rig.synth.note_ons(),
        vec![
            (60, 0),
            (64, 1),
            (67, 2),
            (71, 3),
            (62, 0),
            (66, 1),
            (69, 2),
            (61, 3)
        ]
    );

    // The C major chord still releases the notes it started
    rig.synth.take();
    rig.keys.release(60);
    rig.session.process_pending();
    assert_eq!(rig.synth.note_offs(), vec![(60, 0), (64, 1), (67, 2), (71, 3)]);
}

#[test]
fn test_unknown_scale_keeps_session_running() {
    let mut rig = rig();
    let sender = rig.session.sender();

    sender.send(RouterEvent::SelectScale("hMajor".to_string())).unwrap();
    assert!(rig.session.process_pending());
    assert_eq!(rig.session.status().scale.name(), "cMajor");
}

#[test]
fn test_switching_input_detaches_old_source_and_flushes() {
    let mut rig = rig();

    rig.keys.press(60, 100);
    rig.session.process_pending();
    assert_eq!(rig.session.status().sounding, 1);

    rig.session.select_input(&PortSelector::Index(1)).unwrap();
    assert!(!rig.keys.is_attached());
    assert!(rig.pads.is_attached());
    assert_eq!(rig.synth.note_offs().len(), 4);
    assert_eq!(rig.session.status().sounding, 0);

    // Old source no longer reaches the session
    assert!(!rig.keys.press(64, 100));
    rig.pads.press(64, 100);
    rig.session.process_pending();
    assert_eq!(rig.session.status().input.as_deref(), Some("Launchpad"));
    assert_eq!(rig.session.status().sounding, 1);
}

#[test]
fn test_switching_input_without_flush_keeps_chords() {
    let mut rig = rig_with(RouterConfig {
        flush_on_rebind: false,
        ..RouterConfig::default()
    });
    rig.session.select_output(&PortSelector::Index(0)).unwrap();
    rig.session.select_input(&PortSelector::Index(0)).unwrap();

    rig.keys.press(60, 100);
    rig.session.process_pending();
    rig.session.select_input(&PortSelector::Index(1)).unwrap();
    assert!(rig.synth.note_offs().is_empty());

    // Same note number released on the new input ends the old chord
    rig.pads.release(60);
    rig.session.process_pending();
    assert_eq!(rig.synth.note_offs().len(), 4);
}

#[test]
fn test_unknown_device_keeps_previous_binding() {
    let mut rig = rig();
    let sender = rig.session.sender();

    sender
        .send(RouterEvent::SelectInput(PortSelector::Name("Nonexistent".to_string())))
        .unwrap();
    sender.send(RouterEvent::SelectOutput(PortSelector::Index(7))).unwrap();
    assert!(rig.session.process_pending());

    let status = rig.session.status();
    assert_eq!(status.input.as_deref(), Some("KeyStep 37"));
    assert_eq!(status.output.as_deref(), Some("IAC Driver Bus 1"));
    assert!(rig.keys.is_attached());
}

#[test]
fn test_notes_without_input_are_dropped() {
    let mut rig = rig_with(RouterConfig::default());
    rig.session.select_output(&PortSelector::Index(0)).unwrap();

    rig.session.dispatch(RouterEvent::Note {
        generation: rig.session.input_generation(),
        event: NoteEvent::On {
            note: 60,
            velocity: 100,
            channel: 0,
        },
    });
    assert!(rig.synth.messages().is_empty());
    assert!(rig.session.router().active_notes().is_empty());
}

#[test]
fn test_queued_notes_from_replaced_input_are_dropped() {
    let mut rig = rig();
    let sender = rig.session.sender();

    // The old input plays after the switch is queued but before it runs
    sender.send(RouterEvent::SelectInput(PortSelector::Index(1))).unwrap();
    assert!(rig.keys.press(60, 100));
    rig.session.process_pending();

    assert!(!rig.keys.is_attached());
    assert!(rig.pads.is_attached());
    assert_eq!(rig.session.status().sounding, 0);
    assert!(rig.synth.note_ons().is_empty());
    assert!(rig.session.router().active_notes().is_empty());

    // The new input is voiced normally
    rig.pads.press(64, 100);
    rig.session.process_pending();
    assert_eq!(rig.session.status().sounding, 1);
}

#[test]
fn test_queued_release_from_replaced_input_still_applies() {
    let mut rig = rig_with(RouterConfig {
        flush_on_rebind: false,
        ..RouterConfig::default()
    });
    rig.session.select_output(&PortSelector::Index(0)).unwrap();
    rig.session.select_input(&PortSelector::Index(0)).unwrap();
    rig.keys.press(60, 100);
    rig.session.process_pending();

    rig.session
        .sender()
        .send(RouterEvent::SelectInput(PortSelector::Index(1)))
        .unwrap();
    rig.keys.release(60);
    rig.session.process_pending();

    assert!(rig.pads.is_attached());
    assert_eq!(rig.synth.note_offs().len(), 4);
    assert_eq!(rig.session.status().sounding, 0);
}

#[test]
fn test_failed_switch_keeps_queued_notes() {
    let mut rig = rig();
    let generation = rig.session.input_generation();

    rig.keys.press(60, 100);
    assert!(rig
        .session
        .select_input(&PortSelector::Name("Nonexistent".to_string()))
        .is_err());
    assert_eq!(rig.session.input_generation(), generation);

    rig.session.process_pending();
    assert_eq!(rig.session.status().sounding, 1);
}

#[test]
fn test_panic_releases_all_chords() {
    let mut rig = rig();

    for note in [48, 60, 72] {
        rig.keys.press(note, 100);
    }
    rig.session.process_pending();
    assert_eq!(rig.session.status().sounding, 3);

    rig.session.sender().send(RouterEvent::Panic).unwrap();
    rig.session.process_pending();
    assert_eq!(rig.synth.note_offs().len(), 12);
    assert_eq!(rig.session.status().sounding, 0);
}

#[test]
fn test_shutdown_stops_processing() {
    let mut rig = rig();
    let sender = rig.session.sender();

    sender.send(RouterEvent::Shutdown).unwrap();
    rig.keys.press(60, 100);
    assert!(!rig.session.process_pending());
    assert!(rig.synth.note_ons().is_empty());
}

#[test]
fn test_run_disposes_on_shutdown() {
    let mut rig = rig();

    rig.keys.press(60, 100);
    rig.keys.press(67, 100);
    rig.session.sender().send(RouterEvent::Shutdown).unwrap();
    rig.session.run();

    assert_eq!(rig.synth.note_ons().len(), 8);
    assert_eq!(rig.synth.note_offs().len(), 8);
    assert!(!rig.keys.is_attached());
}

#[test]
fn test_console_script_drives_session() {
    let mut rig = rig();

    run_console(
        Cursor::new("scale eb\noutput iac\npanic\nstatus\n"),
        Vec::new(),
        rig.session.sender(),
    )
    .unwrap();

    // EOF queues a shutdown after the script
    assert!(!rig.session.process_pending());
    assert_eq!(rig.session.status().scale.name(), "ebMajor");
}
