// src/tracking/mod.rs
//
// Identity-persistent tracking core.
//
// Signal flow per closed window:
//   combined centroids ─→ identity_tracker (match / spawn / evict) ─┐
//   POS / NEG centroids ─→ identity_tracker (attach wings) ─────────┼→ orientation → Entity list
//                          spatial_index backs every nearest query ─┘

pub mod entity;
pub mod identity_tracker;
pub mod orientation;
pub mod spatial_index;

pub use entity::Entity;
pub use identity_tracker::{IdentityTracker, WindowUpdate};
