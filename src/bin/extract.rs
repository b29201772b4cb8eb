use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use xdfepoch::{extract, io::write_dataset, ExtractConfig};

#[derive(Parser, Debug)]
#[command(name = "extract", about = "Extract labelled motor-task trials from XDF recordings")]
struct Args {
    /// JSON config; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the recordings.
    #[arg(long)]
    path: Option<PathBuf>,

    /// Recordings to process, in order (relative to --path).
    files: Vec<String>,

    /// Output safetensors path.
    #[arg(long, short)]
    output: PathBuf,

    /// Seconds kept before each start marker.
    #[arg(long)]
    pre_roll: Option<f64>,

    /// Output sampling rate (Hz).
    #[arg(long)]
    target_sfreq: Option<f64>,

    /// Substitute leg EMG into C3/C4/CP3/CP4 and raise the low-pass cutoff.
    #[arg(long)]
    emg: bool,

    /// Log and skip unreadable files instead of aborting.
    #[arg(long)]
    skip_unreadable: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(p) => ExtractConfig::from_json_file(p)?,
        None => ExtractConfig::default(),
    };
    if let Some(p) = args.path {
        cfg.path = p;
    }
    if !args.files.is_empty() {
        cfg.files = args.files;
    }
    if let Some(v) = args.pre_roll {
        cfg.pre_roll_secs = v;
    }
    if let Some(v) = args.target_sfreq {
        cfg.target_sfreq = v;
    }
    cfg.include_emg |= args.emg;
    cfg.skip_unreadable |= args.skip_unreadable;
    anyhow::ensure!(!cfg.files.is_empty(), "no input files given");

    let ds = extract(&cfg).context("trial extraction failed")?;
    println!("Extracted {} trials from {} file(s)", ds.len(), ds.reports.len());
    for r in &ds.reports {
        if r.skipped {
            println!("  {}: skipped ({})", r.file.display(), r.error.as_deref().unwrap_or("unreadable"));
        } else {
            println!(
                "  {}: {} trials, {} malformed, {} incomplete",
                r.file.display(),
                r.n_trials,
                r.n_malformed,
                r.n_incomplete
            );
        }
    }

    write_dataset(&ds, &args.output)?;
    println!("Written → {}", args.output.display());
    Ok(())
}
