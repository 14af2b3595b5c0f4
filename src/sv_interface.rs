use chrono::{NaiveDateTime, Timelike};

use crate::sv_error::ViewError;
use crate::sv_records::Record;

// node ids are opaque strings assigned by the simulator
pub type NodeId = String;

// simulated wall time, whole-second resolution after truncation
pub type SvTime = NaiveDateTime;

/// Seconds a node stays alive after its last record
pub const TIMEOUT_SECS: i64 = 4;

/// Components smaller than this collapse into the noise group
pub const MIN_GROUP_SIZE: usize = 3;

/// Group id shared by disabled nodes and undersized components
pub const NOISE_GROUP: usize = 0;

/// How far before the last record tail mode starts
pub const TAIL_OFFSET_SECS: i64 = 10;

/// Follow mode pauses when replay gets this close to wall-clock now
pub const FOLLOW_MARGIN_SECS: i64 = 5;

pub const FOLLOW_PAUSE_MS: u64 = 1000;

/// Frame index width when the length of the replay is unknown
pub const FOLLOW_FRAME_DIGITS: usize = 6;

/// Only this prefix of a log timestamp is significant
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Drop sub-second precision so records can be bucketed per tick
pub fn truncate_to_second(time: SvTime) -> SvTime {
    time.with_nanosecond(0).unwrap_or(time)
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// A position in render space. Plane and sphere projections both land in [-1, 1].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// ============================================================================
// Log store
// ============================================================================

/// Time-indexed access to a simulation log
///
/// Implementations return records for a whole second sorted by time ascending.
/// Sub-second precision is discarded for matching: every record whose timestamp
/// shares the integer second is returned together.
pub trait LogSource {
    /// Timestamp of the first record, `None` if the log is empty
    fn earliest_timestamp(&mut self) -> Result<Option<SvTime>, ViewError>;

    /// Timestamp of the latest record currently available
    fn last_timestamp(&mut self) -> Result<Option<SvTime>, ViewError>;

    /// All records whose timestamp falls in `second`
    fn records_at(&mut self, second: SvTime) -> Result<Vec<Record>, ViewError>;
}

// ============================================================================
// Drawing surface
// ============================================================================

/// Minimal drawing capability the viewer needs from a rendering backend
pub trait Renderer {
    fn set_color(&mut self, color: Rgb);

    fn draw_point(&mut self, at: Point3);

    /// Square marker around `at`, `size` in pixels from centre to edge
    fn draw_marker(&mut self, at: Point3, size: f64);

    fn draw_segment(&mut self, from: Point3, to: Point3);

    /// Present the previous frame and poll for input.
    ///
    /// Returns `Ok(false)` once the surface asks playback to stop. Errors are
    /// render faults and end the session.
    fn next_frame(&mut self) -> Result<bool, ViewError>;

    /// Width of the zero-padded frame index used when exporting frames.
    /// Resets the frame counter.
    fn set_frame_counter_digits(&mut self, digits: usize);
}
