use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use ringbuf::traits::Consumer;

use metal_metronome::audio::{AudioEngine, EnginePlayer, SampleBank, StreamClock};
use metal_metronome::messaging::{
    Notification, NotificationConsumer, NotificationLevel, Notify, SilenceSignal,
    create_notification_channel, create_trigger_channel,
};
use metal_metronome::playback::{LiveEngine, TrainingDriver, VisualizationSink};
use metal_metronome::project::{ProjectManager, load_session};
use metal_metronome::sequencer::instruments::is_known_instrument;
use metal_metronome::sequencer::timeline::Denominator;
use metal_metronome::sequencer::{
    LiveVoice, NoteValue, RhythmConfig, RhythmUnit, TimeSignature, VoiceId,
};
use metal_metronome::training::{CompiledProgram, StepKind};

// Ringbuffer capacity constants
// A dense program (4 voices of 32 subdivisions at 300 bpm) stays well under
// 512 triggers per lookahead window.
const TRIGGER_RINGBUFFER_CAPACITY: usize = 512;
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 64;

/// Control loop period
const PUMP_INTERVAL: Duration = Duration::from_millis(5);

/// Metronome and rhythm trainer
#[derive(Parser, Debug)]
#[command(name = "metal_metronome")]
#[command(about = "Metronome with polyrhythm voices and tempo-ramp training programs")]
struct Args {
    /// Directory holding `<instrument>.wav` samples
    #[arg(long, global = true)]
    samples: Option<PathBuf>,

    /// Stop after this many seconds in live mode (runs until Ctrl+C otherwise)
    #[arg(long, global = true)]
    duration: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Loop a click with up to four rhythm voices
    Rhythm {
        #[arg(long, default_value = "120")]
        bpm: f64,

        #[arg(long, default_value = "4")]
        numerator: u8,

        #[arg(long, default_value = "4", value_parser = parse_denominator)]
        denominator: Denominator,

        #[arg(long, default_value = "quarter", value_parser = parse_note_value)]
        note_value: NoteValue,

        /// Rhythm voice as `N/M` or `N/M:sound`, repeatable
        #[arg(long = "voice", value_parser = parse_voice)]
        voices: Vec<LiveVoice>,
    },

    /// Play a saved training snapshot
    Train { snapshot: PathBuf },

    /// Print the compiled program of a snapshot
    Render {
        snapshot: PathBuf,

        /// Print the full program as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write one section of a snapshot to its own file
    ExportSection {
        snapshot: PathBuf,

        /// Section number, starting at 1
        #[arg(long)]
        section: usize,

        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn parse_denominator(s: &str) -> Result<Denominator, String> {
    let value: u8 = s.parse().map_err(|e| format!("Invalid denominator: {}", e))?;
    Denominator::new(value).map_err(|e| e.to_string())
}

fn parse_note_value(s: &str) -> Result<NoteValue, String> {
    match s {
        "quarter" => Ok(NoteValue::Quarter),
        "eighth" => Ok(NoteValue::Eighth),
        "dotted-eighth" => Ok(NoteValue::DottedEighth),
        other => Err(format!(
            "Unknown note value '{}' (quarter, eighth, dotted-eighth)",
            other
        )),
    }
}

fn parse_voice(s: &str) -> Result<LiveVoice, String> {
    let (unit, sound) = match s.split_once(':') {
        Some((unit, sound)) => (unit, Some(sound)),
        None => (s, None),
    };
    let (n, m) = unit
        .split_once('/')
        .ok_or_else(|| format!("Expected N/M, got '{}'", unit))?;
    let n: u8 = n.trim().parse().map_err(|e| format!("Invalid N: {}", e))?;
    let m: u8 = m.trim().parse().map_err(|e| format!("Invalid M: {}", e))?;
    let unit = RhythmUnit::new(n, m).map_err(|e| e.to_string())?;

    let mut voice = LiveVoice::new(unit);
    if let Some(sound) = sound {
        if !is_known_instrument(sound) {
            warn!("'{}' is not part of the bundled sound set", sound);
        }
        voice.sound = sound.to_string();
    }
    Ok(voice)
}

/// Logs loop and step changes
struct ConsoleSink;

impl VisualizationSink for ConsoleSink {
    fn report_step(&mut self, voice: VoiceId, step: usize) {
        debug!("{} -> step {}", voice, step + 1);
    }

    fn report_loop(&mut self, step: usize, count_in: bool) {
        if count_in {
            info!("Loop {}: count-in", step + 1);
        } else {
            info!("Loop {}", step + 1);
        }
    }
}

fn notify<E: Notify>(error: &E) {
    show(&Notification::from_error(error));
}

fn show(notification: &Notification) {
    match notification.level {
        NotificationLevel::Info => info!("{}", notification.message),
        NotificationLevel::Warning => warn!("{}", notification.message),
        NotificationLevel::Error => error!("{}", notification.message),
    }
}

fn drain_notifications(rx: &mut NotificationConsumer) {
    while let Some(notification) = rx.try_pop() {
        show(&notification);
    }
}

/// Audio output plus the player that feeds it
struct Output {
    engine: AudioEngine,
    player: EnginePlayer,
    notifications: NotificationConsumer,
}

fn open_output(samples: Option<&Path>) -> Option<Output> {
    let dir = samples.map(Path::to_path_buf).or_else(|| {
        dirs::data_dir().map(|dir| dir.join("metal_metronome").join("samples"))
    })?;
    let bank = match SampleBank::load_dir(&dir) {
        Ok(bank) => bank,
        Err(e) => {
            notify(&e);
            return None;
        }
    };
    if bank.is_empty() {
        warn!("No samples found in {}", dir.display());
    }
    let bank = Arc::new(bank);

    let (trigger_tx, trigger_rx) = create_trigger_channel(TRIGGER_RINGBUFFER_CAPACITY);
    let (notification_tx, notifications) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let notification_tx = Arc::new(Mutex::new(notification_tx));

    let silence = SilenceSignal::new();
    let engine = match AudioEngine::start(
        Arc::clone(&bank),
        trigger_rx,
        silence.clone(),
        notification_tx,
    ) {
        Ok(engine) => engine,
        Err(e) => {
            notify(&e);
            return None;
        }
    };
    let player = EnginePlayer::new(trigger_tx, silence, bank, engine.timing().clone());
    Some(Output {
        engine,
        player,
        notifications,
    })
}

fn run_rhythm(config: RhythmConfig, output: Output, duration: Option<f64>) {
    let Output {
        engine,
        player,
        mut notifications,
    } = output;
    let clock = StreamClock::new(engine.timing().clone());
    let mut live = LiveEngine::new(clock, player, ConsoleSink, config);
    live.start();

    let started = Instant::now();
    loop {
        let horizon = live.clock().horizon();
        live.pump(horizon);
        drain_notifications(&mut notifications);
        if duration.is_some_and(|secs| started.elapsed().as_secs_f64() >= secs) {
            break;
        }
        std::thread::sleep(PUMP_INTERVAL);
    }
    live.stop();
}

fn run_program(program: CompiledProgram, output: Output) {
    let Output {
        engine,
        player,
        mut notifications,
    } = output;
    let clock = StreamClock::new(engine.timing().clone());
    let mut driver = TrainingDriver::new(clock, player, ConsoleSink);
    if !driver.start(program) {
        warn!("Nothing to play");
        return;
    }
    while driver.is_playing() {
        let horizon = driver.clock().horizon();
        driver.pump(horizon);
        drain_notifications(&mut notifications);
        std::thread::sleep(PUMP_INTERVAL);
    }
    // let the last samples ring out
    std::thread::sleep(Duration::from_millis(500));
}

fn print_program(program: &CompiledProgram) {
    println!(
        "{} loop(s), {} count-in(s), {:.2}s total",
        program.len(),
        program.count_ins(),
        program.total_seconds()
    );
    for (i, step) in program.steps.iter().enumerate() {
        let label = match step.kind {
            StepKind::Regular { loop_index } => format!("loop {}", loop_index + 1),
            StepKind::CountIn => "count-in".to_string(),
        };
        println!(
            "{:>4}  {:<10} bpm {:?}  {:.2}s",
            i + 1,
            label,
            step.bpms,
            step.duration()
        );
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Rhythm {
            bpm,
            numerator,
            denominator,
            note_value,
            voices,
        } => {
            let mut config = RhythmConfig::new(bpm, TimeSignature::four_four(), note_value);
            if let Err(e) = config.set_numerator(numerator) {
                notify(&e);
                return;
            }
            config.set_denominator(denominator);
            for voice in voices {
                if let Err(e) = config.add_voice(voice) {
                    notify(&e);
                    return;
                }
            }
            if let Some(output) = open_output(args.samples.as_deref()) {
                run_rhythm(config, output, args.duration);
            }
        }
        Command::Train { snapshot } => {
            let mut session = match load_session(&snapshot) {
                Ok(session) => session,
                Err(e) => return notify(&e),
            };
            let program = match session.compile() {
                Ok(program) => program,
                Err(e) => return notify(&e),
            };
            if let Some(output) = open_output(args.samples.as_deref()) {
                session.set_playing(true);
                run_program(program, output);
                session.set_playing(false);
            }
        }
        Command::Render { snapshot, json } => {
            let program = match load_session(&snapshot) {
                Ok(session) => session.compile(),
                Err(e) => return notify(&e),
            };
            match program {
                Ok(program) if json => match serde_json::to_string_pretty(&program) {
                    Ok(text) => println!("{}", text),
                    Err(e) => error!("{}", e),
                },
                Ok(program) => print_program(&program),
                Err(e) => notify(&e),
            }
        }
        Command::ExportSection {
            snapshot,
            section,
            out,
        } => {
            let session = match load_session(&snapshot) {
                Ok(session) => session,
                Err(e) => return notify(&e),
            };
            let manager = ProjectManager::new(out);
            match manager.export_section(&session, section.saturating_sub(1)) {
                Ok(path) => println!("{}", path.display()),
                Err(e) => notify(&e),
            }
        }
    }
}
