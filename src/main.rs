//! Headless trajectory driver: loads documents and/or follows a live
//! stream, runs the render tick at a fixed rate and logs what would be drawn.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use trajview::live::ConnectionState;
use trajview::options::Options;
use trajview::session::Session;
use trajview::util::frame_timing::FrameTiming;
use web_time::{Duration, Instant};

/// How often tick statistics are logged.
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "trajview", about = "Molecular trajectory playback driver")]
struct Args {
    /// TOML options file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective options to this TOML file and continue.
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Live stream endpoint (ws:// or wss://).
    #[arg(long)]
    stream: Option<String>,

    /// Trajectory documents (local paths or http(s) URLs).
    paths: Vec<String>,

    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,

    /// Tick rate (0 = unlimited).
    #[arg(long, default_value_t = 60.0)]
    rate: f32,
}

fn load_options(args: &Args) -> Result<Options, trajview::TrajviewError> {
    let options = match &args.config {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    if let Some(path) = &args.write_config {
        options.save(path)?;
        log::info!("options written to {}", path.display());
    }
    Ok(options)
}

fn run(args: &Args) -> Result<(), trajview::TrajviewError> {
    let options = load_options(args)?;
    let mut session = Session::new(options)?;

    for path in &args.paths {
        let _ = session.load(path.as_str());
    }
    if let Some(url) = &args.stream {
        session.connect_live(url)?;
    }

    let mut timing = FrameTiming::new(args.rate, Instant::now());
    let mut last_report = Instant::now();
    let mut ticks = 0u64;

    loop {
        let now = Instant::now();
        if !timing.should_tick(now) {
            std::thread::sleep(timing.until_next(now));
            continue;
        }

        let report = session.tick(now);
        timing.end_tick(now);
        ticks += 1;

        if now.saturating_duration_since(last_report) >= REPORT_INTERVAL {
            last_report = now;
            log::info!(
                "{} displays, {} atoms, {} bonds, {:.1} fps, offset {:?}",
                report.displays,
                report.atoms,
                report.bonds,
                timing.fps(),
                report.offset
            );
            if let Some(framing) = session.framing() {
                log::info!(
                    "cell framing: center {} radius {:.2} distance {:.2}",
                    framing.center,
                    framing.radius,
                    framing.distance
                );
            }
        }

        if args.ticks.is_some_and(|limit| ticks >= limit) {
            break;
        }
        let stream_done = session.live_state().is_some_and(ConnectionState::is_terminal);
        if stream_done && args.paths.is_empty() {
            log::info!("live stream finished after {ticks} ticks");
            break;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.paths.is_empty() && args.stream.is_none() {
        log::error!("nothing to show: pass trajectory paths and/or --stream URL");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
