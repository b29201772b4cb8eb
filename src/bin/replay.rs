/// replay: stream recorded XDF sessions at their original pace as JSON lines
/// on stdout, one object per marker or EEG sample:
///
///   {"stream":"Game State","values":["Monster left"]}
///   {"stream":"NeuroneStream","values":[1.2e-6, ...]}
use anyhow::Result;
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;

use xdfepoch::replay::{replay_files, JsonLinesOutlet, WallClock};
use xdfepoch::ReplayConfig;

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay XDF sessions as paced JSON-lines streams")]
struct Args {
    /// JSON config; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the recordings.
    #[arg(long)]
    path: Option<PathBuf>,

    /// Recordings to replay, in order (relative to --path).
    files: Vec<String>,

    /// Poll interval in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Wait for Enter on stdin before each file.
    #[arg(long)]
    manual: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(p) => ReplayConfig::from_json_file(p)?,
        None => ReplayConfig::default(),
    };
    if let Some(p) = args.path {
        cfg.path = p;
    }
    if !args.files.is_empty() {
        cfg.files = args.files;
    }
    if let Some(t) = args.tick_ms {
        cfg.tick_ms = t;
    }
    if args.manual {
        cfg.auto = false;
    }
    anyhow::ensure!(!cfg.files.is_empty(), "no input files given");

    let mut markers = JsonLinesOutlet::new(cfg.streams.markers.clone(), std::io::stdout());
    let mut eeg = JsonLinesOutlet::new(cfg.streams.eeg.clone(), std::io::stdout());
    let mut clock = WallClock::default();
    let mut wait = |path: &std::path::Path| -> xdfepoch::Result<()> {
        eprintln!("Press Enter to start streaming {}", path.display());
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(())
    };

    let stats = replay_files(&cfg, &mut markers, &mut eeg, &mut clock, &mut wait)?;
    let (m, s) = stats.iter().fold((0, 0), |(m, s), st| (m + st.markers, s + st.samples));
    eprintln!("Streaming complete: {m} markers, {s} samples");
    Ok(())
}
