//! Harmonia CLI - Command-line interface for the MIDI chord harmonizer

use clap::{Parser, Subcommand, ValueEnum};
use harmonia::chord::build_chord;
use harmonia::config::HarmoniaConfig;
use harmonia::console::{spawn_console, HELP};
use harmonia::router::{NoteRouter, RetriggerPolicy};
use harmonia::scale::{note_name, ScaleSelection, ScaleTable};
use harmonia::session::{LiveSession, MidirDevices, PortSelector};
use harmonia::{midi_input, midi_output};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "harmonia")]
#[command(about = "MIDI chord harmonizer", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/harmonia/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Retrigger {
    Replace,
    Ignore,
}

impl From<Retrigger> for RetriggerPolicy {
    fn from(r: Retrigger) -> Self {
        match r {
            Retrigger::Replace => RetriggerPolicy::Replace,
            Retrigger::Ignore => RetriggerPolicy::Ignore,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start a live harmonizer session
    Run {
        /// Input port index or name (default: first port)
        #[arg(short, long)]
        input: Option<String>,

        /// Output port index or name (default: first port)
        #[arg(short, long)]
        output: Option<String>,

        /// Scale to start in (cMajor, dMajor, F#, ...)
        #[arg(short, long)]
        scale: Option<String>,

        /// Number of output channels chord voices are spread over (1-16)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
        channels: Option<u8>,

        /// Fixed output velocity (1-127) instead of the played one
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=127))]
        velocity: Option<u8>,

        /// What a repeated note-on does while the note is sounding
        #[arg(long, value_enum)]
        retrigger: Option<Retrigger>,

        /// Keep chords sounding when the input or output is switched
        #[arg(long)]
        no_flush: bool,
    },

    /// List MIDI input and output ports
    List,

    /// List the available scales
    Scales,

    /// Print the chord a note produces
    Chord {
        /// MIDI note number (0-127)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=127))]
        note: u8,

        /// Scale to harmonize in (default: the configured scale)
        #[arg(short, long)]
        scale: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = HarmoniaConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            output,
            scale,
            channels,
            velocity,
            retrigger,
            no_flush,
        } => {
            // Flags override the config file
            if let Some(scale) = scale {
                config.scale = scale;
            }
            if input.is_some() {
                config.input = input;
            }
            if output.is_some() {
                config.output = output;
            }
            if let Some(channels) = channels {
                config.router.channel_count = channels;
            }
            if velocity.is_some() {
                config.router.fixed_velocity = velocity;
            }
            if let Some(retrigger) = retrigger {
                config.router.retrigger = retrigger.into();
            }
            if no_flush {
                config.router.flush_on_rebind = false;
            }
            config.validate()?;

            let selection = ScaleSelection::new(config.initial_scale()?);
            let router = NoteRouter::new(config.router.clone(), config.template(), selection)?;
            let mut session = LiveSession::new(router, MidirDevices);

            let input = config.input_selector()?.unwrap_or(PortSelector::Index(0));
            let output = config.output_selector()?.unwrap_or(PortSelector::Index(0));
            session.select_output(&output)?;
            session.select_input(&input)?;

            let status = session.status();
            println!("Harmonia");
            println!("========");
            println!("Scale:   {}", status.scale);
            println!("Input:   {}", status.input.as_deref().unwrap_or("-"));
            println!("Output:  {}", status.output.as_deref().unwrap_or("-"));
            println!("Channels: {}", config.router.channel_count);
            println!();
            println!("{}", HELP);

            let _console = spawn_console(session.sender());
            session.run();
            info!("Goodbye");
        }

        Commands::List => {
            let inputs = midi_input::list_devices()?;
            let outputs = midi_output::list_devices()?;

            if inputs.is_empty() {
                println!("No MIDI inputs found");
            } else {
                println!("MIDI inputs:");
                for dev in &inputs {
                    println!("  [{}] {}", dev.index, dev.name);
                }
            }

            if outputs.is_empty() {
                println!("No MIDI outputs found");
            } else {
                println!("MIDI outputs:");
                for dev in &outputs {
                    println!("  [{}] {}", dev.index, dev.name);
                }
            }
        }

        Commands::Scales => {
            for scale in ScaleTable::all() {
                let members: Vec<String> = scale
                    .pitch_classes()
                    .iter()
                    .map(|&pc| note_name(pc + 60).trim_end_matches('4').to_string())
                    .collect();
                println!("{:<8} {}", scale.name(), members.join(" "));
            }
        }

        Commands::Chord { note, scale } => {
            let scale = match scale {
                Some(name) => ScaleTable::lookup(&name)?,
                None => config.initial_scale()?,
            };
            let chord = build_chord(note, &scale, &config.template());
            if chord.is_empty() {
                println!("{} in {}: no chord", note_name(note), scale.name());
            } else {
                let channels = config.router.channel_count as usize;
                println!("{} ({}) in {}:", note_name(note), note, scale.name());
                for tone in chord {
                    println!(
                        "  voice {} ch{:<2} {:>3} {}",
                        tone.voice,
                        tone.voice % channels + 1,
                        tone.note,
                        note_name(tone.note)
                    );
                }
            }
        }
    }

    Ok(())
}
