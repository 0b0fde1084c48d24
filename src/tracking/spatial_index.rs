// src/tracking/spatial_index.rs
//
// 2-d tree over entity positions, stored in a node arena.
//
//   - Keys are (position, entity id); two entities may share a position.
//   - Split axis alternates x, y by depth. Smaller coordinates go left,
//     equal or greater go right; rebuilds keep that rule.
//   - Removal tombstones the node. Once tombstones outnumber live nodes the
//     tree is rebuilt balanced around medians.
//   - A position change is remove + insert; keys are never edited in place.

use super::entity::EntityId;
use crate::types::Point;

#[derive(Debug, Clone)]
struct Node {
    point: Point,
    id: EntityId,
    left: Option<usize>,
    right: Option<usize>,
    deleted: bool,
}

/// Nearest live key to a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: EntityId,
    pub point: Point,
    pub distance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct KdTree {
    nodes: Vec<Node>,
    root: Option<usize>,
    live: usize,
}

fn axis_value(p: &Point, depth: usize) -> i32 {
    if depth % 2 == 0 {
        p.x
    } else {
        p.y
    }
}

impl KdTree {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn insert(&mut self, point: Point, id: EntityId) {
        let new_idx = self.nodes.len();
        self.nodes.push(Node {
            point,
            id,
            left: None,
            right: None,
            deleted: false,
        });
        self.live += 1;

        let Some(mut cur) = self.root else {
            self.root = Some(new_idx);
            return;
        };

        let mut depth = 0;
        loop {
            let go_left = axis_value(&point, depth) < axis_value(&self.nodes[cur].point, depth);
            let slot = if go_left {
                &mut self.nodes[cur].left
            } else {
                &mut self.nodes[cur].right
            };
            let child = *slot;
            match child {
                Some(next) => {
                    cur = next;
                    depth += 1;
                }
                None => {
                    *slot = Some(new_idx);
                    return;
                }
            }
        }
    }

    /// Removes the live entry `(point, id)`. Returns false if it is absent.
    pub fn remove(&mut self, point: Point, id: EntityId) -> bool {
        let mut cur = self.root;
        let mut depth = 0;
        while let Some(idx) = cur {
            let node = &self.nodes[idx];
            if !node.deleted && node.point == point && node.id == id {
                self.nodes[idx].deleted = true;
                self.live -= 1;
                if self.tombstones() > self.live {
                    self.rebuild();
                }
                return true;
            }
            cur = if axis_value(&point, depth) < axis_value(&node.point, depth) {
                node.left
            } else {
                node.right
            };
            depth += 1;
        }
        false
    }

    /// Closest live entry by Euclidean distance. Exact ties go to the lower id.
    pub fn nearest(&self, query: Point) -> Option<Neighbor> {
        let mut best: Option<(i64, EntityId, Point)> = None;
        self.search(self.root, 0, &query, &mut best);
        best.map(|(dist_sq, id, point)| Neighbor {
            id,
            point,
            distance: (dist_sq as f64).sqrt(),
        })
    }

    /// Live entries in arena order
    pub fn entries(&self) -> impl Iterator<Item = (Point, EntityId)> + '_ {
        self.nodes
            .iter()
            .filter(|n| !n.deleted)
            .map(|n| (n.point, n.id))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.live = 0;
    }

    fn tombstones(&self) -> usize {
        self.nodes.len() - self.live
    }

    fn search(
        &self,
        cur: Option<usize>,
        depth: usize,
        query: &Point,
        best: &mut Option<(i64, EntityId, Point)>,
    ) {
        let Some(idx) = cur else {
            return;
        };
        let node = &self.nodes[idx];

        if !node.deleted {
            let d = node.point.distance_sq(query);
            let better = match best {
                None => true,
                Some((bd, bid, _)) => d < *bd || (d == *bd && node.id < *bid),
            };
            if better {
                *best = Some((d, node.id, node.point));
            }
        }

        let diff = (axis_value(query, depth) - axis_value(&node.point, depth)) as i64;
        let (near, far) = if diff < 0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        self.search(near, depth + 1, query, best);

        // <= keeps equidistant candidates reachable for the id tie-break
        let cross = match best {
            None => true,
            Some((bd, _, _)) => diff * diff <= *bd,
        };
        if cross {
            self.search(far, depth + 1, query, best);
        }
    }

    fn rebuild(&mut self) {
        let mut entries: Vec<(Point, EntityId)> = self.entries().collect();
        self.clear();
        self.nodes.reserve(entries.len());
        self.live = entries.len();
        self.root = self.build(&mut entries, 0);
    }

    fn build(&mut self, entries: &mut [(Point, EntityId)], depth: usize) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }

        entries.sort_by(|a, b| {
            axis_value(&a.0, depth)
                .cmp(&axis_value(&b.0, depth))
                .then_with(|| a.1.cmp(&b.1))
        });

        // Pull the median back to the first occurrence of its value so the
        // left subtree holds strictly smaller coordinates.
        let mut mid = entries.len() / 2;
        let pivot = axis_value(&entries[mid].0, depth);
        while mid > 0 && axis_value(&entries[mid - 1].0, depth) == pivot {
            mid -= 1;
        }

        let (point, id) = entries[mid];
        let idx = self.nodes.len();
        self.nodes.push(Node {
            point,
            id,
            left: None,
            right: None,
            deleted: false,
        });

        let (lower, rest) = entries.split_at_mut(mid);
        let left = self.build(lower, depth + 1);
        let right = self.build(&mut rest[1..], depth + 1);
        self.nodes[idx].left = left;
        self.nodes[idx].right = right;
        Some(idx)
    }

    #[cfg(test)]
    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
