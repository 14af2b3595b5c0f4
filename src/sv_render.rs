//! Renderer implementations
//!
//! - `RecordingRenderer`: keeps draw commands in memory, for tests and
//!   headless runs
//! - `SvgRenderer`: writes each presented frame to an SVG file named from a
//!   pattern

use std::fs;
use std::mem;
use std::path::PathBuf;

use log::debug;

use crate::sv_error::ViewError;
use crate::sv_interface::{Point3, Renderer, Rgb};

/// Placeholder replaced by the frame index in output paths
pub const FRAME_INDEX_PLACEHOLDER: &str = "@";

pub const CANVAS_SIZE: u32 = 1024;

// half-width of a node point, in pixels
const POINT_HALF_SIZE: f64 = 2.0;

/// A single drawing call as received by a renderer
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Color(Rgb),
    Point(Point3),
    Marker(Point3, f64),
    Segment(Point3, Point3),
}

/// Substitute the zero-padded frame index into `pattern`
///
/// ```
/// use sv_rust::sv_render::frame_path;
/// assert_eq!(frame_path("out/frame@.svg", 3, 7), "out/frame007.svg");
/// ```
pub fn frame_path(pattern: &str, digits: usize, index: u64) -> String {
    let index = format!("{:0width$}", index, width = digits);
    pattern.replace(FRAME_INDEX_PLACEHOLDER, &index)
}

// ============================================================================
// Recording Renderer
// ============================================================================

/// Collects draw commands per frame
pub struct RecordingRenderer {
    current: Vec<DrawCommand>,
    frames: Vec<Vec<DrawCommand>>,
    frame_limit: Option<u64>,
    calls: u64,
    digits: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            current: Vec::new(),
            frames: Vec::new(),
            frame_limit: None,
            calls: 0,
            digits: 0,
        }
    }

    /// Ask playback to stop after `limit` frames have been drawn
    pub fn with_frame_limit(limit: u64) -> Self {
        Self {
            frame_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Commands of the frame being drawn
    pub fn commands(&self) -> &[DrawCommand] {
        &self.current
    }

    /// Frames already presented, oldest first
    pub fn frames(&self) -> &[Vec<DrawCommand>] {
        &self.frames
    }

    pub fn segment_count(&self) -> usize {
        self.current
            .iter()
            .filter(|c| matches!(c, DrawCommand::Segment(..)))
            .count()
    }

    pub fn frame_digits(&self) -> usize {
        self.digits
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for RecordingRenderer {
    fn set_color(&mut self, color: Rgb) {
        self.current.push(DrawCommand::Color(color));
    }

    fn draw_point(&mut self, at: Point3) {
        self.current.push(DrawCommand::Point(at));
    }

    fn draw_marker(&mut self, at: Point3, size: f64) {
        self.current.push(DrawCommand::Marker(at, size));
    }

    fn draw_segment(&mut self, from: Point3, to: Point3) {
        self.current.push(DrawCommand::Segment(from, to));
    }

    fn next_frame(&mut self) -> Result<bool, ViewError> {
        if self.calls != 0 {
            self.frames.push(mem::take(&mut self.current));
        }
        self.calls += 1;
        Ok(self.frame_limit.map_or(true, |limit| self.calls <= limit))
    }

    fn set_frame_counter_digits(&mut self, digits: usize) {
        self.digits = digits;
        self.calls = 0;
    }
}

// ============================================================================
// SVG Renderer
// ============================================================================

/// Writes frames as SVG documents
///
/// Render space `[-1, 1]²` maps onto a square canvas with y pointing up; depth
/// is dropped. Frames are only written when an output pattern is set, the
/// file name being the pattern with `@` replaced by the frame index.
pub struct SvgRenderer {
    pattern: Option<String>,
    frame_limit: Option<u64>,
    color: Rgb,
    body: String,
    index: u64,
    digits: usize,
    written: Vec<PathBuf>,
}

impl SvgRenderer {
    pub fn new(pattern: Option<String>, frame_limit: Option<u64>) -> Self {
        Self {
            pattern,
            frame_limit,
            color: Rgb::new(0.0, 0.0, 0.0),
            body: String::new(),
            index: 0,
            digits: 1,
            written: Vec::new(),
        }
    }

    /// Paths of the frames written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn to_canvas(at: Point3) -> (f64, f64) {
        let size = CANVAS_SIZE as f64;
        ((at.x + 1.0) / 2.0 * size, (1.0 - at.y) / 2.0 * size)
    }

    fn fill(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "rgb({},{},{})",
            channel(self.color.r),
            channel(self.color.g),
            channel(self.color.b)
        )
    }

    fn square(&mut self, at: Point3, half: f64) {
        let (x, y) = Self::to_canvas(at);
        let fill = self.fill();
        self.body.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>\n",
            x - half,
            y - half,
            half * 2.0,
            half * 2.0,
            fill
        ));
    }

    fn document(&self) -> String {
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{0}" height="{0}" viewBox="0 0 {0} {0}">"#,
                "\n",
                r#"<rect width="100%" height="100%" fill="white"/>"#,
                "\n{1}</svg>\n"
            ),
            CANVAS_SIZE, self.body
        )
    }

    fn save(&mut self) -> Result<(), ViewError> {
        let Some(pattern) = &self.pattern else {
            return Ok(());
        };
        let path = PathBuf::from(frame_path(pattern, self.digits, self.index));
        fs::write(&path, self.document()).map_err(|e| {
            ViewError::RenderFault(format!("cannot write {}: {}", path.display(), e))
        })?;
        debug!("wrote frame {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

impl Renderer for SvgRenderer {
    fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    fn draw_point(&mut self, at: Point3) {
        self.square(at, POINT_HALF_SIZE);
    }

    fn draw_marker(&mut self, at: Point3, size: f64) {
        self.square(at, size / 2.0);
    }

    fn draw_segment(&mut self, from: Point3, to: Point3) {
        let (x1, y1) = Self::to_canvas(from);
        let (x2, y2) = Self::to_canvas(to);
        let stroke = self.fill();
        self.body.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\"/>\n",
            x1, y1, x2, y2, stroke
        ));
    }

    fn next_frame(&mut self) -> Result<bool, ViewError> {
        if self.index != 0 {
            self.save()?;
        }
        self.index += 1;
        self.body.clear();
        Ok(self.frame_limit.map_or(true, |limit| self.index <= limit))
    }

    fn set_frame_counter_digits(&mut self, digits: usize) {
        self.digits = digits;
        self.index = 0;
    }
}
