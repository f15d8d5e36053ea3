//! dr - deskrec CLI
//!
//! Record desktop actions, replay saved recordings, inspect them as script
//! text. Input hooks and injection backends are host-supplied; without them
//! recording degrades to window + clipboard observation and replay dry-runs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use deskrec::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dr")]
#[command(about = "deskrec - record and replay desktop actions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start recording (Ctrl+C to stop and save)
    Record {
        /// Script name for the saved recording
        #[arg(short, long, default_value = "recording")]
        name: String,

        /// Drop clicks made on this application (the recorder's own UI)
        #[arg(long)]
        host_app: Option<String>,

        /// Typed-text debounce window in milliseconds
        #[arg(long, default_value_t = 1000)]
        debounce_ms: u64,

        /// Launch-correlation window in milliseconds
        #[arg(long, default_value_t = 3000)]
        launch_window_ms: u64,
    },

    /// Replay a saved recording
    Replay {
        /// Recording file (bare name or path)
        file: String,

        /// Playback speed (1.0 = realtime, 2.0 = 2x)
        #[arg(short, long, default_value_t = 1.0)]
        speed: f64,

        /// Run on an isolated virtual desktop when the platform supports it
        #[arg(long)]
        isolated: bool,
    },

    /// List saved recordings
    List,

    /// Show a recording as script text
    Show {
        file: String,

        /// Print the raw JSON document instead
        #[arg(long)]
        json: bool,
    },

    /// Delete a recording
    Delete { file: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Record {
            name,
            host_app,
            debounce_ms,
            launch_window_ms,
        } => record(&name, host_app, debounce_ms, launch_window_ms),
        Commands::Replay {
            file,
            speed,
            isolated,
        } => replay(&file, speed, isolated),
        Commands::List => list(),
        Commands::Show { file, json } => show(&file, json),
        Commands::Delete { file } => delete(&file),
    }
}

fn record(
    name: &str,
    host_app: Option<String>,
    debounce_ms: u64,
    launch_window_ms: u64,
) -> Result<()> {
    let config = RecorderConfig {
        text_debounce_ms: debounce_ms,
        launch_window_ms,
        host_app,
        ..RecorderConfig::default()
    };
    let mut recorder = ActionRecorder::with_config(config);
    recorder.start(name, SignalSources::system())?;

    println!("Recording '{}'. Press Ctrl+C to stop.", name);
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    let finished = recorder.stop()?;
    println!(
        "Captured {} actions over {:.1}s.",
        finished.actions.len(),
        finished.duration_ms as f64 / 1000.0
    );

    let mut injector = NullInjector;
    let screen = injector
        .get_screen_size()
        .unwrap_or(ScreenSize {
            width: 0,
            height: 0,
        });
    let doc = codegen::document(&finished, &codegen::SessionInfo::capture(screen));

    let store = RecordingStore::new()?;
    match store.save(&doc) {
        Ok(path) => println!("Saved to {}", path.display()),
        Err(e) => {
            // The save step alone failed; the recording is still printable.
            eprintln!("Save failed ({}); dumping script text instead.", e);
            print!("{}", codegen::script(&doc));
        }
    }
    Ok(())
}

fn replay(file: &str, speed: f64, isolated: bool) -> Result<()> {
    let store = RecordingStore::new()?;
    let recording = store.load(file)?;
    println!(
        "Replaying '{}' ({} actions) at {}x...",
        recording.metadata.script_name, recording.metadata.action_count, speed
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let mut isolation = NullIsolation;
    let isolated = isolated && isolation.create_and_switch_to_new_desktop();

    let engine = ReplayEngine::new().speed(speed);
    let result = engine.play(
        &recording,
        &mut NullInjector,
        &mut NullAppLifecycle,
        &mut NullOverlay,
        &stop,
    );

    if isolated {
        isolation.switch_back_and_cleanup();
    }

    let stats = result?;
    println!(
        "Done: {} executed, {} skipped, {} failed in {:.1}s{}",
        stats.executed,
        stats.skipped,
        stats.failed,
        stats.elapsed_ms as f64 / 1000.0,
        if stats.stopped { " (stopped early)" } else { "" }
    );
    Ok(())
}

fn list() -> Result<()> {
    let store = RecordingStore::new()?;
    let files = store.list()?;
    if files.is_empty() {
        println!("No recordings in {}", store.path().display());
        return Ok(());
    }
    for f in files {
        println!("{}", f);
    }
    Ok(())
}

fn show(file: &str, json: bool) -> Result<()> {
    let store = RecordingStore::new()?;
    let recording = store.load(file)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recording)?);
    } else {
        print!("{}", codegen::script(&recording));
    }
    Ok(())
}

fn delete(file: &str) -> Result<()> {
    let store = RecordingStore::new()?;
    store.delete(file)?;
    println!("Deleted {}", file);
    Ok(())
}
