// src/tracking/identity_tracker.rs
//
// Nearest-neighbour identity tracker for marker centroids.
//
// Per window, in this order:
//   1. Combined pass: each body centroid either moves the nearest live
//      entity (within bot_width, not yet claimed this window) or spawns a
//      new entity with the next id.
//   2. Eviction: entities unmatched for more than max_missed_windows
//      windows are dropped.
//   3. Polarity passes: each wing centroid attaches to the nearest entity,
//      whatever the distance. Wings never spawn entities.
//
// Entities live in an id-keyed arena; the KdTree indexes them by position.
// A move is remove(old) + insert(new) on the index.

use super::entity::{Entity, EntityId};
use super::orientation;
use super::spatial_index::KdTree;
use crate::types::{Point, Polarity, TrackerConfig};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// What one window did to the entity set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowUpdate {
    pub created: Vec<EntityId>,
    pub moved: Vec<EntityId>,
    pub evicted: Vec<EntityId>,
    pub positive_attached: usize,
    pub negative_attached: usize,
    pub headings_updated: usize,
}

pub struct IdentityTracker {
    config: TrackerConfig,
    entities: BTreeMap<EntityId, Entity>,
    index: KdTree,
    next_id: EntityId,
}

impl IdentityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            entities: BTreeMap::new(),
            index: KdTree::new(),
            next_id: 0,
        }
    }

    /// Runs every pass for one closed window, then refreshes headings.
    pub fn update(
        &mut self,
        combined: &[Point],
        positive: &[Point],
        negative: &[Point],
    ) -> WindowUpdate {
        let mut report = WindowUpdate::default();

        let claimed = self.match_combined(combined, &mut report);
        report.evicted = self.evict_stale(&claimed);
        report.positive_attached = self.attach_polarity(Polarity::Positive, positive);
        report.negative_attached = self.attach_polarity(Polarity::Negative, negative);
        report.headings_updated = orientation::update_headings(self.entities.values_mut());

        debug!(
            "Tracker: {} live | +{} new, {} moved, -{} evicted | wings +{}/-{} | {} heading(s)",
            self.entities.len(),
            report.created.len(),
            report.moved.len(),
            report.evicted.len(),
            report.positive_attached,
            report.negative_attached,
            report.headings_updated
        );

        report
    }

    /// Combined-mask pass. Returns the ids claimed this window.
    ///
    /// Only the single nearest entity is considered. If it is out of range
    /// or already claimed this window, the centroid spawns a new entity,
    /// even when some other unclaimed entity lies within `bot_width`.
    pub fn match_combined(
        &mut self,
        centroids: &[Point],
        report: &mut WindowUpdate,
    ) -> HashSet<EntityId> {
        let mut claimed: HashSet<EntityId> = HashSet::with_capacity(centroids.len());

        for &centroid in centroids {
            if self.index.is_empty() {
                let id = self.spawn(centroid);
                claimed.insert(id);
                report.created.push(id);
                continue;
            }

            let candidate = self
                .index
                .nearest(centroid)
                .filter(|n| n.distance <= self.config.bot_width)
                .filter(|n| !claimed.contains(&n.id));

            match candidate {
                Some(neighbor) => {
                    self.relocate(neighbor.id, centroid);
                    claimed.insert(neighbor.id);
                    report.moved.push(neighbor.id);
                }
                None => {
                    let id = self.spawn(centroid);
                    claimed.insert(id);
                    report.created.push(id);
                }
            }
        }

        claimed
    }

    /// Attaches each wing centroid to its nearest entity. Returns how many
    /// attachments were made.
    pub fn attach_polarity(&mut self, polarity: Polarity, centroids: &[Point]) -> usize {
        let mut attached = 0;
        for &centroid in centroids {
            if self.index.is_empty() {
                debug!(
                    "No entity to attach {} centroid ({}, {})",
                    polarity.as_str(),
                    centroid.x,
                    centroid.y
                );
                continue;
            }
            let Some(neighbor) = self.index.nearest(centroid) else {
                continue;
            };
            if let Some(entity) = self.entities.get_mut(&neighbor.id) {
                entity.set_sub_centroid(polarity, centroid);
                attached += 1;
            }
        }
        attached
    }

    /// Ages every unclaimed entity and drops the ones past the limit.
    pub fn evict_stale(&mut self, claimed: &HashSet<EntityId>) -> Vec<EntityId> {
        for (id, entity) in self.entities.iter_mut() {
            if claimed.contains(id) {
                entity.missed_windows = 0;
            } else {
                entity.missed_windows += 1;
            }
        }

        let Some(limit) = self.config.max_missed_windows else {
            return Vec::new();
        };

        let stale: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.missed_windows > limit)
            .map(|e| e.id)
            .collect();

        for id in &stale {
            if let Some(entity) = self.entities.remove(id) {
                self.index.remove(entity.position, entity.id);
                info!(
                    "🗑️  Entity #{} evicted (unseen for {} windows, last at ({}, {}))",
                    entity.id, entity.missed_windows, entity.position.x, entity.position.y
                );
            }
        }
        stale
    }

    #[cfg(test)]
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Live entities in id order
    pub fn snapshot(&self) -> Vec<Entity> {
        self.entities.values().cloned().collect()
    }

    #[cfg(test)]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Total entities ever created
    pub fn ids_issued(&self) -> EntityId {
        self.next_id
    }

    fn spawn(&mut self, position: Point) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.entities.insert(id, Entity::new(id, position));
        self.index.insert(position, id);
        info!(
            "🆕 Entity #{} created at ({}, {})",
            id, position.x, position.y
        );
        id
    }

    fn relocate(&mut self, id: EntityId, position: Point) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let removed = self.index.remove(entity.position, id);
        debug_assert!(removed, "index out of sync for entity {}", id);
        debug!(
            "Entity #{} moved ({}, {}) -> ({}, {})",
            id, entity.position.x, entity.position.y, position.x, position.y
        );
        entity.position = position;
        self.index.insert(position, id);
    }
}
