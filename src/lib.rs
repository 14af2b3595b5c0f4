//! # sv_rust - Simulation Log Viewer
//!
//! Replays the log of a distributed network simulation one second at a time and
//! reconstructs, per tick, which nodes are alive, how they link to each other and
//! which connected groups they form. Each tick is drawn on a flat map or a globe.
//!
//! ## Core Components
//!
//! - **Topology**: per-node state built from log records, with the liveness rule
//!   (timeout plus rescue by a fresh, reciprocating neighbour)
//! - **Grouping**: connected components over enabled nodes, ranked by size
//! - **Projection**: plane or sphere placement of node coordinates, depth shading
//! - **TopologyDrawer**: turns a snapshot into draw calls on a `Renderer`
//! - **Playback**: the tick loop, with tail and follow modes
//!
//! ## Usage
//!
//! Provide a `LogSource` and a `Renderer`, then run the playback:
//!
//! ```no_run
//! use sv_rust::{JsonLinesSource, Playback, PlaybackConfig, RecordingRenderer};
//!
//! let source = JsonLinesSource::open("logs.jsonl")?;
//! let mut playback = Playback::new(PlaybackConfig::default(), source, RecordingRenderer::new());
//! let report = playback.run()?;
//! println!("{} frames", report.frames);
//! # Ok::<(), sv_rust::ViewError>(())
//! ```

// Core model
pub mod sv_interface;
pub mod sv_error;
pub mod sv_records;
pub mod sv_topology;
pub mod sv_grouping;

// Drawing
pub mod sv_projection;
pub mod sv_drawer;
pub mod sv_render;

// Log sources
pub mod sv_memory_source;
pub mod sv_jsonl_source;

pub mod sv_playback;

// Re-export commonly used types
pub use sv_error::{DecodeError, ViewError};
pub use sv_interface::{LogSource, NodeId, Point3, Renderer, Rgb, SvTime};
pub use sv_records::{AuthStatus, LinkStatus, MessageKind, Payload, Record};
pub use sv_topology::{Node, Topology, TopologyConfig};
pub use sv_grouping::GroupRank;
pub use sv_projection::Projection;
pub use sv_drawer::{FrameSummary, TopologyDrawer};
pub use sv_render::{DrawCommand, RecordingRenderer, SvgRenderer};
pub use sv_memory_source::MemoryLogSource;
pub use sv_jsonl_source::JsonLinesSource;
pub use sv_playback::{Playback, PlaybackConfig, PlaybackReport, PlaybackState};
