//! Live session: the single-threaded event loop around a [`NoteRouter`]
//!
//! Device callbacks and the console only send [`RouterEvent`]s into the
//! session's channel. [`LiveSession::run`] handles them one at a time, so
//! each event runs to completion before the next one starts.

use crate::error::{HarmoniaError, HarmoniaResult};
use crate::midi_input::MidirSource;
use crate::midi_io::{MidiSink, MidiSource, NoteEvent, NoteHandler};
use crate::midi_output::MidirSink;
use crate::router::{NoteRouter, RouterStatus};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use tracing::{debug, info, warn};

/// Picks a MIDI port by index or by case-insensitive name substring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    Index(usize),
    Name(String),
}

impl PortSelector {
    pub fn matches(&self, index: usize, name: &str) -> bool {
        match self {
            PortSelector::Index(i) => *i == index,
            PortSelector::Name(wanted) => name.to_lowercase().contains(&wanted.to_lowercase()),
        }
    }
}

impl FromStr for PortSelector {
    type Err = HarmoniaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(HarmoniaError::InvalidCommand(
                "empty port selector".to_string(),
            ));
        }
        Ok(match s.parse::<usize>() {
            Ok(index) => PortSelector::Index(index),
            Err(_) => PortSelector::Name(s.to_string()),
        })
    }
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSelector::Index(i) => write!(f, "#{}", i),
            PortSelector::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Everything the session loop reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    /// Note from the input bound as `generation`
    Note { generation: u64, event: NoteEvent },
    SelectScale(String),
    SelectInput(PortSelector),
    SelectOutput(PortSelector),
    Panic,
    Status,
    Shutdown,
}

/// Opens MIDI ports on request of the session
pub trait DeviceProvider {
    fn open_input(&mut self, selector: &PortSelector) -> HarmoniaResult<Box<dyn MidiSource>>;
    fn open_output(&mut self, selector: &PortSelector) -> HarmoniaResult<Box<dyn MidiSink>>;
}

/// System MIDI ports through `midir`
#[derive(Debug, Default)]
pub struct MidirDevices;

impl DeviceProvider for MidirDevices {
    fn open_input(&mut self, selector: &PortSelector) -> HarmoniaResult<Box<dyn MidiSource>> {
        Ok(Box::new(MidirSource::open(selector)?))
    }

    fn open_output(&mut self, selector: &PortSelector) -> HarmoniaResult<Box<dyn MidiSink>> {
        Ok(Box::new(MidirSink::open(selector)?))
    }
}

/// Router plus the channel feeding it
pub struct LiveSession<D: DeviceProvider> {
    router: NoteRouter,
    devices: D,
    sender: Sender<RouterEvent>,
    receiver: Receiver<RouterEvent>,
    /// Bumped on every input binding; notes stamped with an older value are stale
    input_generation: u64,
}

impl<D: DeviceProvider> LiveSession<D> {
    pub fn new(router: NoteRouter, devices: D) -> Self {
        let (sender, receiver) = channel();
        Self {
            router,
            devices,
            sender,
            receiver,
            input_generation: 0,
        }
    }

    /// Sender for other threads (console, signal handlers)
    pub fn sender(&self) -> Sender<RouterEvent> {
        self.sender.clone()
    }

    pub fn router(&self) -> &NoteRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut NoteRouter {
        &mut self.router
    }

    pub fn status(&self) -> RouterStatus {
        self.router.status()
    }

    /// Generation of the current input binding
    pub fn input_generation(&self) -> u64 {
        self.input_generation
    }

    /// Handler installed on sources: forwards into the session channel
    fn note_handler(&self, generation: u64) -> NoteHandler {
        let sender = self.sender.clone();
        Box::new(move |event: NoteEvent| {
            let _ = sender.send(RouterEvent::Note { generation, event });
        })
    }

    /// Open and bind an input port
    ///
    /// Note-ons the previous input queued before the switch are dropped when
    /// they reach the loop, so nothing it plays can start after the flush.
    /// Its queued note-offs still release.
    pub fn select_input(&mut self, selector: &PortSelector) -> HarmoniaResult<()> {
        let source = self.devices.open_input(selector)?;
        self.input_generation += 1;
        let handler = self.note_handler(self.input_generation);
        self.router.bind_input(source, handler)
    }

    /// Open and bind an output port
    pub fn select_output(&mut self, selector: &PortSelector) -> HarmoniaResult<()> {
        let sink = self.devices.open_output(selector)?;
        self.router.bind_output(sink);
        Ok(())
    }

    /// Handle one event; returns false when the loop should stop
    ///
    /// Selection failures are logged and leave the previous binding in place.
    pub fn dispatch(&mut self, event: RouterEvent) -> bool {
        match event {
            RouterEvent::Note { generation, event } => {
                let stale = generation != self.input_generation;
                if stale && matches!(event, NoteEvent::On { .. }) {
                    debug!("Dropping {:?} from a previous input", event);
                } else if !self.router.has_input() {
                    debug!("Dropping {:?}: {}", event, HarmoniaError::NoActiveInput);
                } else {
                    self.router.handle(event);
                }
            }
            RouterEvent::SelectScale(name) => {
                let _ = self.router.select_scale(&name);
            }
            RouterEvent::SelectInput(selector) => {
                if let Err(e) = self.select_input(&selector) {
                    warn!("Input {}: {}", selector, e);
                }
            }
            RouterEvent::SelectOutput(selector) => {
                if let Err(e) = self.select_output(&selector) {
                    warn!("Output {}: {}", selector, e);
                }
            }
            RouterEvent::Panic => self.router.panic(),
            RouterEvent::Status => {
                let status = self.router.status();
                info!(
                    "Scale {} | input {} | output {} | {} sounding",
                    status.scale,
                    status.input.as_deref().unwrap_or("-"),
                    status.output.as_deref().unwrap_or("-"),
                    status.sounding
                );
            }
            RouterEvent::Shutdown => return false,
        }
        true
    }

    /// Handle queued events without blocking; returns false after Shutdown
    pub fn process_pending(&mut self) -> bool {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if !self.dispatch(event) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return true,
            }
        }
    }

    /// Block on the channel until Shutdown, then dispose the router
    pub fn run(&mut self) {
        info!("Session running");
        while let Ok(event) = self.receiver.recv() {
            if !self.dispatch(event) {
                break;
            }
        }
        self.router.dispose();
        info!("Session stopped");
    }
}
