//! Error types shared across the crate

use std::fmt;

/// Errors produced by scale lookup, configuration and the MIDI backends
#[derive(Debug)]
pub enum HarmoniaError {
    /// Scale name not present in the scale table
    UnknownScale(String),
    /// Scale definition violates the 7-distinct-pitch-class invariant
    InvalidScale(String),
    /// Chord template override is malformed
    InvalidTemplate(String),
    /// Quantized pitch class has no degree in the active scale
    DegreeNotFound { pitch_class: u8 },
    /// Note event arrived with no input bound
    NoActiveInput,
    /// Note event arrived with no output bound
    NoActiveOutput,
    /// No MIDI port matched the selector
    DeviceNotFound(String),
    /// MIDI backend failure (init, connect, send)
    Midi(String),
    /// Configuration could not be parsed or failed validation
    Config(String),
    /// Console command could not be parsed
    InvalidCommand(String),
    /// IO error
    Io(std::io::Error),
}

impl fmt::Display for HarmoniaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarmoniaError::UnknownScale(name) => write!(f, "Unknown scale: {}", name),
            HarmoniaError::InvalidScale(msg) => write!(f, "Invalid scale: {}", msg),
            HarmoniaError::InvalidTemplate(msg) => write!(f, "Invalid chord template: {}", msg),
            HarmoniaError::DegreeNotFound { pitch_class } => {
                write!(f, "Pitch class {} is not a degree of the active scale", pitch_class)
            }
            HarmoniaError::NoActiveInput => write!(f, "No MIDI input bound"),
            HarmoniaError::NoActiveOutput => write!(f, "No MIDI output bound"),
            HarmoniaError::DeviceNotFound(sel) => write!(f, "MIDI device '{}' not found", sel),
            HarmoniaError::Midi(msg) => write!(f, "MIDI error: {}", msg),
            HarmoniaError::Config(msg) => write!(f, "Config error: {}", msg),
            HarmoniaError::InvalidCommand(msg) => write!(f, "Invalid command: {}", msg),
            HarmoniaError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for HarmoniaError {}

impl From<std::io::Error> for HarmoniaError {
    fn from(e: std::io::Error) -> Self {
        HarmoniaError::Io(e)
    }
}

/// Result type for harmonizer operations
pub type HarmoniaResult<T> = Result<T, HarmoniaError>;
