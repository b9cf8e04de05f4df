use anyhow::{anyhow, Result};
use clap::Parser;
use colored::Colorize;
use greedy_compress::logging;
use greedy_compress::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Zero out every channel value below a threshold", long_about = None)]
struct Cli {
    #[arg(help = "Input image (.jpg, .jpeg or .png)")]
    input: PathBuf,

    #[arg(long, short, help = "Output image, format chosen by extension (.png or .jpg)")]
    output: Option<PathBuf>,

    #[arg(long, short, default_value_t = 128, help = "Threshold (0-255)")]
    threshold: u8,

    #[arg(long, short, help = "Verbose output")]
    verbose: bool,
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());
    input.with_file_name(format!("{}_compressed.png", stem))
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos:>3}%").map(|s| s.progress_chars("=> "))
    {
        pb.set_style(style);
    }
    pb
}

fn run(args: Cli) -> Result<()> {
    let mut session = Session::default();

    info!("Loading {:?}", args.input);
    session.select(&args.input)?;
    let threshold = session.set_threshold(args.threshold as i64);

    let (status_tx, status_rx) = mpsc::channel::<TaskStatusContainer>();
    let (done_tx, done_rx) = mpsc::channel::<CompressionResult>();

    let completed_tx = status_tx.clone();
    session.compress(StatusSink::new(status_tx, "Compressing"), move |result| {
        let _ = done_tx.send(result);
        set_task_completed(&completed_tx);
    })?;

    let pb = progress_bar();
    for update in status_rx.iter() {
        match update.status {
            Some(TaskStatus::TaskPercentage(name, percent)) => {
                pb.set_message(name);
                pb.set_position(percent.round() as u64);
            }
            None => break,
        }
    }
    pb.finish_and_clear();
    session.wait();

    let outcome = done_rx
        .recv()
        .map_err(|_| anyhow!("Compression worker exited without a result"))??;
    debug!("Compression took {:?}", outcome.elapsed);

    let output = args.output.unwrap_or_else(|| default_output(&args.input));
    let written = session.save_compressed(&output)?;

    println!(
        "{} {} (threshold {}, {:.1}% of channel values zeroed)",
        "Image saved:".green().bold(),
        written.display(),
        threshold,
        outcome.stats.zeroed_percent()
    );
    Ok(())
}

fn main() {
    let args = Cli::parse_from(wild::args());

    let filter = if args.verbose { "debug" } else { "warn" };
    if let Err(why) = logging::init(filter) {
        eprintln!("Unable to initialize logging: {}", why);
    }

    if let Err(why) = run(args) {
        error!("{:?}", why);
        eprintln!("{} {}", "Error:".red().bold(), why);
        process::exit(1);
    }
}
