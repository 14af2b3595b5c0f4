// Synthetic Log Generator - writes a JSON-lines simulation log
//
// Usage:
//   cargo run --bin log_generator -- --nodes 200 --seconds 120 -o logs.jsonl
//   cargo run --bin log_generator -- --space plane --silent 0.3 --seed 42
//
// Nodes drift slowly, link to their nearest live neighbours and report
// `current position`, `links`, `routing 1d/2d required` and `link status`
// every second. A fraction of them goes silent halfway through so replay
// shows nodes timing out, and being rescued while neighbours still list them.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use chrono::Duration;
use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde_json::json;
use simple_logger::SimpleLogger;

use sv_rust::sv_interface::{SvTime, TIME_FORMAT};
use sv_rust::sv_jsonl_source::parse_log_time;
use sv_rust::sv_records::{AuthStatus, LinkStatus};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Space {
    /// Coordinates in [-1, 1]
    Plane,
    /// Longitude and latitude in radians
    Sphere,
}

/// Generate a synthetic simulation log
#[derive(Parser, Debug)]
#[command(name = "log_generator")]
struct Args {
    /// Number of nodes
    #[arg(long, default_value_t = 120)]
    nodes: usize,

    /// Simulated seconds
    #[arg(long, default_value_t = 60)]
    seconds: u32,

    /// RNG seed, random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of nodes that stop reporting mid-run
    #[arg(long, default_value_t = 0.2)]
    silent: f64,

    /// Links per node
    #[arg(long, default_value_t = 4)]
    neighbours: usize,

    /// First timestamp of the log
    #[arg(long, default_value = "2020-01-01T00:00:00", value_parser = parse_start)]
    start: SvTime,

    #[arg(long, value_enum, default_value_t = Space::Sphere)]
    space: Space,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_start(raw: &str) -> Result<SvTime, String> {
    parse_log_time(raw).ok_or_else(|| format!("expected {}, got `{}`", TIME_FORMAT, raw))
}

struct SimNode {
    id: String,
    x: f64,
    y: f64,
    // last second this node reports, None for nodes that never go silent
    silent_after: Option<u32>,
    seed: bool,
}

impl SimNode {
    fn reports_at(&self, second: u32) -> bool {
        self.silent_after.map_or(true, |last| second <= last)
    }
}

fn distance(a: &SimNode, b: &SimNode) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

struct Generator {
    rng: StdRng,
    nodes: Vec<SimNode>,
    space: Space,
    neighbours: usize,
}

impl Generator {
    fn new(args: &Args, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut nodes = Vec::with_capacity(args.nodes);
        for _ in 0..args.nodes {
            let (x, y) = match args.space {
                Space::Plane => (rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)),
                Space::Sphere => (rng.gen_range(-PI..PI), rng.gen_range(-FRAC_PI_2..FRAC_PI_2)),
            };
            let silent_after = if rng.gen_bool(args.silent.clamp(0.0, 1.0)) {
                Some(rng.gen_range(args.seconds / 2..=args.seconds.max(1)))
            } else {
                None
            };
            nodes.push(SimNode {
                id: format!("{:016x}", rng.next_u64()),
                x,
                y,
                silent_after,
                seed: rng.gen_bool(0.1),
            });
        }
        // ring order for 1d routing
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            rng,
            nodes,
            space: args.space,
            neighbours: args.neighbours,
        }
    }

    fn drift(&mut self) {
        let space = self.space;
        for node in &mut self.nodes {
            node.x += self.rng.gen_range(-0.01..0.01);
            node.y += self.rng.gen_range(-0.01..0.01);
            match space {
                Space::Plane => {
                    node.x = node.x.clamp(-1.0, 1.0);
                    node.y = node.y.clamp(-1.0, 1.0);
                }
                Space::Sphere => {
                    node.y = node.y.clamp(-FRAC_PI_2, FRAC_PI_2);
                }
            }
        }
    }

    /// Indices of the closest reporting nodes to `index`
    fn nearest(&self, index: usize, second: u32) -> Vec<usize> {
        let node = &self.nodes[index];
        let mut others: Vec<(f64, usize)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, other)| *i != index && other.reports_at(second))
            .map(|(i, other)| (distance(node, other), i))
            .collect();
        others.sort_by(|a, b| a.0.total_cmp(&b.0));
        others.into_iter().take(self.neighbours).map(|(_, i)| i).collect()
    }

    fn write_second(&mut self, out: &mut impl Write, start: SvTime, second: u32) -> io::Result<usize> {
        self.drift();

        let mut written = 0;
        for index in 0..self.nodes.len() {
            if !self.nodes[index].reports_at(second) {
                continue;
            }

            let near = self.nearest(index, second);
            let node = &self.nodes[index];
            let millis = self.rng.gen_range(0..1000);
            let time = (start + Duration::seconds(second as i64) + Duration::milliseconds(millis))
                .format("%Y-%m-%dT%H:%M:%S%.3f")
                .to_string();

            let links: Vec<&str> = near.iter().map(|&i| self.nodes[i].id.as_str()).collect();
            let ring = self.nodes.len();
            let ring_1d: Vec<&str> = [(index + 1) % ring, (index + ring - 1) % ring]
                .iter()
                .filter(|&&i| i != index)
                .map(|&i| self.nodes[i].id.as_str())
                .collect();
            let required_2d: serde_json::Map<String, serde_json::Value> = near
                .iter()
                .take(2)
                .map(|&i| {
                    let pair = &self.nodes[i];
                    (pair.id.clone(), json!({ "x": pair.x, "y": pair.y }))
                })
                .collect();

            let seed_status = if node.seed {
                LinkStatus::Online
            } else {
                LinkStatus::Offline
            };
            let node_status = if links.is_empty() {
                LinkStatus::Connecting
            } else {
                LinkStatus::Online
            };

            let lines = [
                json!({"nid": node.id, "message": "current position", "time": time,
                       "param": {"coordinate": {"x": node.x, "y": node.y}}}),
                json!({"nid": node.id, "message": "links", "time": time,
                       "param": {"nids": links}}),
                json!({"nid": node.id, "message": "routing 1d required", "time": time,
                       "param": {"nids": ring_1d}}),
                json!({"nid": node.id, "message": "routing 2d required", "time": time,
                       "param": {"nids": required_2d}}),
                json!({"nid": node.id, "message": "link status", "time": time,
                       "param": {"seed": seed_status as i64, "node": node_status as i64,
                                 "auth": AuthStatus::Success as i64, "onlyone": links.len() == 1}}),
            ];
            for line in &lines {
                writeln!(out, "{}", line)?;
            }
            written += lines.len();
        }
        Ok(written)
    }
}

fn run(args: &Args) -> io::Result<()> {
    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
    info!("generating {} nodes over {}s, seed {}", args.nodes, args.seconds, seed);

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut generator = Generator::new(args, seed);
    let mut total = 0;
    for second in 0..=args.seconds {
        total += generator.write_second(&mut out, args.start, second)?;
    }
    out.flush()?;

    info!("wrote {} records", total);
    Ok(())
}

fn main() {
    let args = Args::parse();
    // stdout may be carrying the log itself
    let level = if args.output.is_some() {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("cannot initialise logger: {}", e);
    }

    if let Err(e) = run(&args) {
        eprintln!("log_generator: {}", e);
        process::exit(1);
    }
}
