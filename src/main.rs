//! # simulator-view
//!
//! Replays a simulation log and writes one frame per simulated second.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use sv_rust::{JsonLinesSource, Playback, PlaybackConfig, Projection, SvgRenderer, ViewError};

// ============================================================================
// CLI Configuration
// ============================================================================

/// Simulation log viewer
#[derive(Parser, Debug)]
#[command(name = "simulator-view")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Keep replaying as the log grows
    #[arg(short, long, global = true)]
    follow: bool,

    /// Start shortly before the last record
    #[arg(short, long, global = true)]
    tail: bool,

    /// Edge detail on the sphere (0: routed links only)
    #[arg(short = 'l', long, global = true)]
    detail_level: Option<u32>,

    /// Export frames to this path, `@` is replaced by the frame index
    #[arg(short = 'i', long = "image-name", global = true)]
    image_name: Option<String>,

    /// JSON-lines simulation log
    #[arg(short, long, global = true, default_value = "logs.jsonl")]
    source: PathBuf,

    /// YAML playback configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(short = 'n', long, global = true)]
    max_frames: Option<u64>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    view: View,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum View {
    /// Flat map
    Plane,
    /// Globe
    Sphere,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Config file values, overridden by whatever was given on the command line
    fn playback_config(&self) -> Result<PlaybackConfig, ViewError> {
        let mut config = match &self.config {
            Some(path) => PlaybackConfig::load(path)?,
            None => PlaybackConfig::default(),
        };

        config.projection = match self.view {
            View::Plane => Projection::Plane,
            View::Sphere => Projection::Sphere,
        };
        config.follow |= self.follow;
        config.tail |= self.tail;
        if let Some(level) = self.detail_level {
            config.detail_level = level;
        }
        if self.image_name.is_some() {
            config.image_pattern = self.image_name.clone();
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<(), ViewError> {
    let config = cli.playback_config()?;

    let source = JsonLinesSource::open(&cli.source)?;
    let renderer = SvgRenderer::new(config.image_pattern.clone(), config.max_frames);

    let mut playback = Playback::new(config, source, renderer);
    let report = playback.run()?;

    info!(
        "replayed {} -> {} ({} frames, {} written)",
        report.first_tick,
        report.last_tick,
        report.frames,
        playback.renderer().written().len()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new().with_level(cli.log_level()).init() {
        eprintln!("cannot initialise logger: {}", e);
    }

    if let Err(e) = run(&cli) {
        error!("{}", e);
        eprintln!("simulator-view: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "simulator-view",
            "-f",
            "-l",
            "2",
            "-i",
            "out/@.svg",
            "sphere",
        ]);
        let config = cli.playback_config().unwrap();
        assert!(config.follow);
        assert!(!config.tail);
        assert_eq!(config.projection, Projection::Sphere);
        assert_eq!(config.detail_level, 2);
        assert_eq!(config.image_pattern.as_deref(), Some("out/@.svg"));
        assert_eq!(cli.source, PathBuf::from("logs.jsonl"));
    }

    #[test]
    fn test_flags_after_subcommand() {
        let cli = Cli::parse_from(["simulator-view", "plane", "--tail", "-vv", "-n", "3"]);
        assert!(cli.tail);
        assert_eq!(cli.log_level(), LevelFilter::Trace);
        assert_eq!(cli.playback_config().unwrap().max_frames, Some(3));
    }

    #[test]
    fn test_view_is_required() {
        assert!(Cli::try_parse_from(["simulator-view", "-f"]).is_err());
    }
}
