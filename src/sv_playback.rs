//! Playback driver
//!
//! Replays a log one simulated second per frame:
//!
//! ```text
//! Initializing -> Playing   -> Finished
//!              \-> Following -> Finished
//! ```
//!
//! Each tick runs ingest -> liveness -> grouping -> draw on a single thread.
//! The renderer is asked for the next frame at the top of every tick; when it
//! reports a quit request the loop ends cleanly.

use std::path::Path;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use log::{info, warn};
use serde::Deserialize;

use crate::sv_drawer::{FrameSummary, TopologyDrawer};
use crate::sv_error::ViewError;
use crate::sv_interface::{
    truncate_to_second, LogSource, Renderer, SvTime, FOLLOW_FRAME_DIGITS, FOLLOW_MARGIN_SECS,
    FOLLOW_PAUSE_MS, TAIL_OFFSET_SECS,
};
use crate::sv_projection::Projection;
use crate::sv_topology::{Topology, TopologyConfig};

// ============================================================================
// Configuration
// ============================================================================

/// Everything the driver needs, chosen once at startup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub projection: Projection,

    /// Keep replaying as new records arrive instead of stopping at the end
    pub follow: bool,

    /// Start `tail_offset_secs` before the last record instead of the first
    pub tail: bool,

    /// (default: 10)
    pub tail_offset_secs: i64,

    /// Follow mode pauses once replay is this close to wall-clock now (default: 5)
    pub follow_margin_secs: i64,

    /// Length of a follow-mode pause (default: 1000)
    pub follow_pause_ms: u64,

    /// 0 draws routed links only; 1 and above adds the remaining links on the sphere
    pub detail_level: u32,

    /// Frame export path, `@` replaced by the frame index
    pub image_pattern: Option<String>,

    /// Stop after this many frames
    pub max_frames: Option<u64>,

    pub topology: TopologyConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            projection: Projection::default(),
            follow: false,
            tail: false,
            tail_offset_secs: TAIL_OFFSET_SECS,
            follow_margin_secs: FOLLOW_MARGIN_SECS,
            follow_pause_ms: FOLLOW_PAUSE_MS,
            detail_level: 0,
            image_pattern: None,
            max_frames: None,
            topology: TopologyConfig::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ViewError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ViewError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ViewError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&text)
    }
}

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Initializing,
    Playing,
    /// Playing a live log, no fixed end
    Following,
    Finished,
}

/// Outcome of a finished playback
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub frames: u64,
    pub first_tick: SvTime,
    pub last_tick: SvTime,
}

/// Width of the frame index for a replay of `span_secs` seconds
pub fn frame_digits(span_secs: i64) -> usize {
    if span_secs <= 0 {
        return 1;
    }
    ((span_secs as f64).log10() + 1.0).floor() as usize
}

fn wall_clock_now() -> SvTime {
    Utc::now().naive_utc()
}

pub struct Playback<S: LogSource, R: Renderer> {
    config: PlaybackConfig,
    source: S,
    renderer: R,
    topology: Topology,
    drawer: TopologyDrawer,
    state: PlaybackState,
    clock: fn() -> SvTime,
}

impl<S: LogSource, R: Renderer> Playback<S, R> {
    pub fn new(config: PlaybackConfig, source: S, renderer: R) -> Self {
        let topology = Topology::with_config(config.topology.clone());
        let drawer = TopologyDrawer::new(config.projection, config.detail_level);
        Self {
            config,
            source,
            renderer,
            topology,
            drawer,
            state: PlaybackState::Initializing,
            clock: wall_clock_now,
        }
    }

    /// Replace the wall clock consulted by follow mode
    pub fn with_clock(mut self, clock: fn() -> SvTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_parts(self) -> (S, R, Topology) {
        (self.source, self.renderer, self.topology)
    }

    /// Run until the log ends, the renderer asks to quit, or an error occurs.
    pub fn run(&mut self) -> Result<PlaybackReport, ViewError> {
        self.state = PlaybackState::Initializing;

        let earliest = self.source.earliest_timestamp()?.ok_or(ViewError::NoData)?;
        let last = self.source.last_timestamp()?.ok_or(ViewError::NoData)?;
        let last = truncate_to_second(last);

        let mut current = if self.config.tail {
            last - Duration::seconds(self.config.tail_offset_secs)
        } else {
            truncate_to_second(earliest)
        };
        let first_tick = current;

        info!(
            "playback {} -> {} (follow: {}, tail: {}, projection: {:?})",
            current, last, self.config.follow, self.config.tail, self.config.projection
        );

        // the starting second only seeds state; it is not drawn
        let records = self.source.records_at(current)?;
        self.topology.ingest(&records)?;

        let digits = if self.config.follow {
            FOLLOW_FRAME_DIGITS
        } else {
            frame_digits((last - current).num_seconds())
        };
        self.renderer.set_frame_counter_digits(digits);

        self.state = if self.config.follow {
            PlaybackState::Following
        } else {
            PlaybackState::Playing
        };

        let mut frames = 0;
        while self.renderer.next_frame()? {
            current += Duration::seconds(1);

            if self.config.follow {
                let horizon = (self.clock)() - Duration::seconds(self.config.follow_margin_secs);
                if current > horizon {
                    warn!("caught up with live log at {}, waiting", current);
                    thread::sleep(StdDuration::from_millis(self.config.follow_pause_ms));
                }
            } else if current > last {
                break;
            }

            let summary = self.step(current).map_err(|e| {
                warn!("playback stopped at {}: {}", current, e);
                e
            })?;
            frames += 1;

            info!(
                "{} node: {}/{}  seed: {}/{}  groups: {}",
                summary.tick,
                summary.enabled,
                summary.total,
                summary.only_ones,
                summary.seeds,
                summary.groups
            );
        }

        self.state = PlaybackState::Finished;
        info!("playback finished after {} frames", frames);

        Ok(PlaybackReport {
            frames,
            first_tick,
            last_tick: current,
        })
    }

    /// Advance the topology to `tick` and draw it
    pub fn step(&mut self, tick: SvTime) -> Result<FrameSummary, ViewError> {
        let records = self.source.records_at(tick)?;
        self.topology.ingest(&records)?;
        self.topology.refresh_liveness(tick);
        let ranking = self.topology.assign_groups();
        Ok(self
            .drawer
            .draw(&self.topology, &ranking, &mut self.renderer, tick))
    }
}
