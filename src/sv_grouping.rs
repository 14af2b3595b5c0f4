//! Connected-component grouping
//!
//! Enabled nodes are partitioned into components by following `links` in the
//! direction they are declared; one direction is enough to join two nodes.
//! Components are ranked by size and numbered `1, 2, 3, ...` so the largest
//! cluster always gets the first color. Components smaller than
//! `min_group_size` share group 0 with disabled nodes.
//!
//! Equal-sized components keep discovery order, and discovery walks nodes in
//! first-seen order, so numbering is deterministic for a given log.

use log::trace;

use crate::sv_interface::NOISE_GROUP;
use crate::sv_topology::Topology;

// temp id meaning "not reached yet"
const UNVISITED: usize = 0;

/// Size and final id of one component found during a grouping pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRank {
    pub members: usize,
    pub id: usize,
}

impl Topology {
    /// Reassign every node's `group` from the current enabled set and links.
    ///
    /// Returns the ranked components, largest first, including the ones that
    /// collapsed into the noise group.
    pub fn assign_groups(&mut self) -> Vec<GroupRank> {
        let count = self.nodes.len();

        // temp group per node index; ids start at 1
        let mut temp = vec![UNVISITED; count];
        let mut members: Vec<usize> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        for start in 0..count {
            if temp[start] != UNVISITED || !self.nodes[start].enabled {
                continue;
            }

            let group = members.len() + 1;
            let mut size = 0;
            // mark before pushing so self-loops and cycles are visited once
            temp[start] = group;
            stack.push(start);

            while let Some(index) = stack.pop() {
                size += 1;
                for nid in &self.nodes[index].links {
                    if let Some(next) = self.nodes.get_index_of(nid) {
                        if temp[next] == UNVISITED && self.nodes[next].enabled {
                            temp[next] = group;
                            stack.push(next);
                        }
                    }
                }
            }

            members.push(size);
        }

        // stable sort: equal sizes keep discovery order
        let mut order: Vec<usize> = (0..members.len()).collect();
        order.sort_by(|a, b| members[*b].cmp(&members[*a]));

        let mut assigned = vec![NOISE_GROUP; members.len()];
        let mut ranking = Vec::with_capacity(members.len());
        for (rank, &group) in order.iter().enumerate() {
            let id = if members[group] < self.config.min_group_size {
                NOISE_GROUP
            } else {
                rank + 1
            };
            assigned[group] = id;
            ranking.push(GroupRank {
                members: members[group],
                id,
            });
        }

        for (node, group) in self.nodes.values_mut().zip(temp) {
            node.group = if group == UNVISITED {
                NOISE_GROUP
            } else {
                assigned[group - 1]
            };
        }

        trace!(
            "grouping: {} components, {} ranked",
            ranking.len(),
            ranking.iter().filter(|g| g.id != NOISE_GROUP).count()
        );
        ranking
    }
}
