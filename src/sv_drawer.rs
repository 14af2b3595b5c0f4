use crate::sv_grouping::GroupRank;
use crate::sv_interface::{Renderer, Rgb, SvTime, NOISE_GROUP};
use crate::sv_projection::Projection;
use crate::sv_records::LinkStatus;
use crate::sv_topology::{Node, Topology};

/// Node colors indexed by group id; index 0 is the noise bucket
pub const GROUP_COLORS: [Rgb; 4] = [
    Rgb::new(0.8, 0.0, 0.8),
    Rgb::new(0.0, 0.2, 1.0),
    Rgb::new(0.0, 0.8, 0.2),
    Rgb::new(1.0, 0.6, 0.0),
];

pub const MARKER_COLOR: Rgb = Rgb::new(1.0, 0.0, 0.0);
pub const SEED_MARKER_SIZE: f64 = 6.0;
pub const ONLY_ONE_MARKER_SIZE: f64 = 10.0;

pub const REQUIRED_EDGE_COLOR: Rgb = Rgb::new(0.0, 1.0, 0.2);
pub const MUTUAL_EDGE_COLOR: Rgb = Rgb::new(0.6, 0.6, 0.6);
pub const ONE_SIDED_EDGE_COLOR: Rgb = Rgb::new(0.8, 0.0, 0.0);
pub const DETAIL_EDGE_COLOR: Rgb = Rgb::new(0.8, 0.8, 0.8);

/// Counters reported after each frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    pub tick: SvTime,
    pub enabled: usize,
    pub total: usize,
    pub seeds: usize,
    pub only_ones: usize,
    /// Components that received a color of their own
    pub groups: usize,
}

/// Draws a topology snapshot through a `Renderer`
pub struct TopologyDrawer {
    projection: Projection,
    detail_level: u32,
}

impl TopologyDrawer {
    pub fn new(projection: Projection, detail_level: u32) -> Self {
        Self {
            projection,
            detail_level,
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn group_color(group: usize) -> Rgb {
        GROUP_COLORS
            .get(group)
            .copied()
            .unwrap_or(GROUP_COLORS[NOISE_GROUP])
    }

    /// Draw every enabled node, its status markers and its outgoing links
    pub fn draw<R: Renderer + ?Sized>(
        &self,
        topology: &Topology,
        ranking: &[GroupRank],
        renderer: &mut R,
        tick: SvTime,
    ) -> FrameSummary {
        let mut summary = FrameSummary {
            tick,
            enabled: 0,
            total: topology.len(),
            seeds: 0,
            only_ones: 0,
            groups: ranking.iter().filter(|g| g.id != NOISE_GROUP).count(),
        };

        for node in topology.nodes().filter(|n| n.is_enabled()) {
            summary.enabled += 1;

            let (x, y) = node.position();
            let at = self.projection.project(x, y);
            let color = Self::group_color(node.group());

            renderer.set_color(self.projection.shade(color, at.z));
            renderer.draw_point(at);

            if node.seed_link_status() == LinkStatus::Online {
                renderer.set_color(self.projection.shade(MARKER_COLOR, at.z));
                renderer.draw_marker(at, SEED_MARKER_SIZE);
                summary.seeds += 1;
            }
            if node.is_only_one() {
                renderer.set_color(self.projection.shade(MARKER_COLOR, at.z));
                renderer.draw_marker(at, ONLY_ONE_MARKER_SIZE);
                summary.only_ones += 1;
            }

            for nid in node.links() {
                let Some(pair) = topology.node(nid) else {
                    continue;
                };
                let Some(edge_color) = self.edge_color(node, pair, color) else {
                    continue;
                };

                let (px, py) = pair.position();
                let to = self.projection.project(px, py);
                renderer.set_color(self.projection.shade(edge_color, (at.z + to.z) / 2.0));
                renderer.draw_segment(at, to);
            }
        }

        summary
    }

    /// Color of the edge `node -> pair`, `None` when it is not drawn.
    ///
    /// A link is mutual when both ends list each other. The plane shows every
    /// link; the sphere shows links outside the routing requirement only at
    /// detail level 1 and above.
    fn edge_color(&self, node: &Node, pair: &Node, node_color: Rgb) -> Option<Rgb> {
        let mutual = pair.has_link(node.id());
        let required = node.has_required_2d(pair.id());

        match self.projection {
            Projection::Plane => Some(match (mutual, required) {
                (true, true) => REQUIRED_EDGE_COLOR,
                (true, false) => MUTUAL_EDGE_COLOR,
                (false, _) => ONE_SIDED_EDGE_COLOR,
            }),
            Projection::Sphere => match (required, mutual) {
                (true, true) => Some(node_color),
                (true, false) => Some(ONE_SIDED_EDGE_COLOR),
                (false, _) if self.detail_level >= 1 => Some(DETAIL_EDGE_COLOR),
                (false, _) => None,
            },
        }
    }
}
