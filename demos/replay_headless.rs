// Headless replay of a hand-built log
//
// Two clusters form, one node of the small cluster goes silent and is kept
// alive by a neighbour for a few ticks before timing out.
//
//   cargo run --example replay_headless

use chrono::{Duration, NaiveDate};
use log::info;
use serde_json::json;
use simple_logger::SimpleLogger;

use sv_rust::{
    MemoryLogSource, MessageKind, Playback, PlaybackConfig, Projection, Record, RecordingRenderer,
};

fn links(nid: &str, t: chrono::NaiveDateTime, to: &[&str]) -> Result<Record, serde_json::Error> {
    Record::with_param(nid, MessageKind::Links, t, &json!({ "nids": to }))
}

fn position(nid: &str, t: chrono::NaiveDateTime, x: f64, y: f64) -> Result<Record, serde_json::Error> {
    Record::with_param(
        nid,
        MessageKind::CurrentPosition,
        t,
        &json!({ "coordinate": { "x": x, "y": y } }),
    )
}

fn build_log() -> Result<MemoryLogSource, serde_json::Error> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut source = MemoryLogSource::new();
    for s in 0..20 {
        let t = start + Duration::seconds(s);

        // ring of five
        let ring = ["r0", "r1", "r2", "r3", "r4"];
        for (i, nid) in ring.iter().enumerate() {
            let next = ring[(i + 1) % ring.len()];
            let prev = ring[(i + ring.len() - 1) % ring.len()];
            source.push(position(nid, t, i as f64 * 0.3, 0.2)?);
            source.push(links(nid, t, &[next, prev])?);
        }

        // triangle, `t2` stops reporting after second 5
        source.push(links("t0", t, &["t1", "t2"])?);
        source.push(links("t1", t, &["t0", "t2"])?);
        if s <= 5 {
            source.push(links("t2", t, &["t0", "t1"])?);
        }
        // t1 forgets t2 at second 10, ending the rescue
        if s >= 10 {
            source.push(links("t1", t + Duration::milliseconds(500), &["t0"])?);
        }
    }
    Ok(source)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::new().init()?;

    let config = PlaybackConfig {
        projection: Projection::Sphere,
        detail_level: 1,
        ..Default::default()
    };
    let mut playback = Playback::new(config, build_log()?, RecordingRenderer::new());
    let report = playback.run()?;

    info!("{} frames from {}", report.frames, report.first_tick);
    for node in playback.topology().nodes() {
        info!(
            "{:>3} enabled: {:<5} group: {} links: {}",
            node.id(),
            node.is_enabled(),
            node.group(),
            node.links().len()
        );
    }
    Ok(())
}
