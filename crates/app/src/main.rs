use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fireworks_show_core::{Program, Recorder, RecordingSettings, SampleBank, ShowConfig, ShowEngine};
use tracing_subscriber::EnvFilter;

fn main() -> fireworks_show_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            program,
            output,
            config,
            fps,
            duration_ms,
            seed,
            sounds,
        } => run_record(RecordArgs {
            program,
            output,
            config,
            fps,
            duration_ms,
            seed,
            sounds,
        }),
        Commands::Inspect { program } => run_inspect(&program),
    }
}

struct RecordArgs {
    program: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    fps: u32,
    duration_ms: Option<u64>,
    seed: Option<u64>,
    sounds: Option<PathBuf>,
}

fn load_program(path: &Path) -> fireworks_show_core::Result<Program> {
    let raw = std::fs::read_to_string(path)?;
    Program::load(&raw)
}

fn run_record(args: RecordArgs) -> fireworks_show_core::Result<()> {
    tracing::info!(program = ?args.program, output = ?args.output, "recording show");

    let config = match &args.config {
        Some(path) => ShowConfig::from_path(path)?,
        None => ShowConfig::default(),
    };
    let program = load_program(&args.program)?;
    let bank = match &args.sounds {
        Some(dir) => SampleBank::with_root(dir),
        None => SampleBank::new(),
    };

    let mut engine = match args.seed {
        Some(seed) => ShowEngine::with_seed(config, program, bank, seed)?,
        None => ShowEngine::new(config, program, bank)?,
    };
    if args.sounds.is_some() {
        engine.preload_sounds();
    }

    let recorder = Recorder::new(RecordingSettings {
        output_dir: args.output,
        fps: args.fps,
        duration_ms: args.duration_ms,
        ..RecordingSettings::default()
    });
    let summary = recorder.record(&mut engine)?;
    tracing::info!(
        frames = summary.frames,
        duration_ms = summary.duration_ms,
        cues = summary.cues.len(),
        "recording finished"
    );
    Ok(())
}

fn run_inspect(path: &Path) -> fireworks_show_core::Result<()> {
    let program = load_program(path)?;
    tracing::info!(events = program.len(), last_ms = program.last_timing_ms(), "program loaded");

    for event in program.iter() {
        println!(
            "{:>6} ms  {:<9} ({:.2}, {:.2})  {:<8} {:<12} {}",
            event.timing_ms,
            event.kind.token(),
            event.position.x,
            event.position.y,
            event.color,
            event.sound.name().unwrap_or("-"),
            event.glyph_or_default(),
        );
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Fireworks show player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a program offline to PNG frames and a sound cue sheet.
    Record {
        /// Program JSON: a bare event array or a saved document.
        program: PathBuf,
        /// Directory that receives the frames and `cues.json`.
        output: PathBuf,
        /// Optional JSON file overriding the default show configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Length to render. Defaults to the last event plus a tail.
        #[arg(long)]
        duration_ms: Option<u64>,
        /// Seed for reproducible particle layouts.
        #[arg(long)]
        seed: Option<u64>,
        /// Directory holding `<sound>.wav` files.
        #[arg(long)]
        sounds: Option<PathBuf>,
    },
    /// Print the events of a program after normalization.
    Inspect {
        program: PathBuf,
    },
}
