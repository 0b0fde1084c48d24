// src/clustering.rs
//
// Density-based clustering of foreground mask pixels.
//
// DBSCAN over the active pixels of a BinaryMask:
//   - neighbours are pixels within Euclidean distance `eps`
//   - a core pixel has at least `min_pts` neighbours, itself included
//   - clusters grow breadth-first from core pixels; border pixels join the
//     first cluster that reaches them; everything else is noise
//
// Pixels are scanned row-major, so clusters come out in discovery order.
// Neighbourhood lookups go through a uniform grid with cell size `eps`.

use crate::accumulator::BinaryMask;
use crate::types::{Centroid, DbscanParams};
use anyhow::{bail, Result};
use std::collections::{HashMap, VecDeque};

/// Pixels of one cluster as (row, col)
pub type Cluster = Vec<(usize, usize)>;

pub trait Clusterer {
    /// Returns the clusters found in `mask`, noise excluded
    fn cluster(&self, mask: &BinaryMask) -> Result<Vec<Cluster>>;
}

#[derive(Debug, Clone, Copy)]
pub struct Dbscan {
    params: DbscanParams,
}

const UNVISITED: i64 = -2;
const NOISE: i64 = -1;

impl Dbscan {
    pub fn new(params: DbscanParams) -> Self {
        Self { params }
    }

    /// Breadth-first expansion from a core seed. Pixels are labelled when
    /// queued, so each one enters the queue at most once. Returns how many
    /// were queued.
    fn grow(
        &self,
        grid: &PixelGrid,
        points: &[(usize, usize)],
        labels: &mut [i64],
        seed_neighbours: Vec<usize>,
        label: i64,
    ) -> usize {
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut queued = 0;
        let mut claim = |labels: &mut [i64], queue: &mut VecDeque<usize>, n: usize| {
            match labels[n] {
                UNVISITED => {
                    labels[n] = label;
                    queue.push_back(n);
                    queued += 1;
                }
                // border pixel previously written off as noise
                NOISE => labels[n] = label,
                _ => {}
            }
        };

        for n in seed_neighbours {
            claim(labels, &mut queue, n);
        }
        while let Some(idx) = queue.pop_front() {
            let reach = grid.region(points, idx);
            if reach.len() >= self.params.min_pts {
                for n in reach {
                    claim(labels, &mut queue, n);
                }
            }
        }
        queued
    }
}

impl Clusterer for Dbscan {
    fn cluster(&self, mask: &BinaryMask) -> Result<Vec<Cluster>> {
        let points = mask.active_pixels();
        if points.is_empty() {
            bail!("no foreground points");
        }

        let grid = PixelGrid::new(&points, self.params.eps);
        let mut labels = vec![UNVISITED; points.len()];
        let mut next_label: i64 = 0;

        for seed in 0..points.len() {
            if labels[seed] != UNVISITED {
                continue;
            }

            let neighbours = grid.region(&points, seed);
            if neighbours.len() < self.params.min_pts {
                labels[seed] = NOISE;
                continue;
            }

            let label = next_label;
            next_label += 1;
            labels[seed] = label;
            self.grow(&grid, &points, &mut labels, neighbours, label);
        }

        let mut clusters: Vec<Cluster> = vec![Vec::new(); next_label as usize];
        for (idx, &label) in labels.iter().enumerate() {
            if label >= 0 {
                clusters[label as usize].push(points[idx]);
            }
        }
        Ok(clusters)
    }
}

// ============================================================================
// GRID INDEX
// ============================================================================

struct PixelGrid {
    cell: f64,
    eps_sq: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl PixelGrid {
    fn new(points: &[(usize, usize)], eps: f64) -> Self {
        let cell = eps.max(1.0);
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (idx, &(r, c)) in points.iter().enumerate() {
            cells
                .entry(Self::key(cell, r, c))
                .or_default()
                .push(idx);
        }
        Self {
            cell,
            eps_sq: eps * eps,
            cells,
        }
    }

    fn key(cell: f64, r: usize, c: usize) -> (i64, i64) {
        ((r as f64 / cell).floor() as i64, (c as f64 / cell).floor() as i64)
    }

    /// Indices of all points within eps of `points[idx]`, including itself
    fn region(&self, points: &[(usize, usize)], idx: usize) -> Vec<usize> {
        let (r, c) = points[idx];
        let (kr, kc) = Self::key(self.cell, r, c);
        let mut out = Vec::new();
        for dr in -1..=1 {
            for dc in -1..=1 {
                let Some(bucket) = self.cells.get(&(kr + dr, kc + dc)) else {
                    continue;
                };
                for &n in bucket {
                    let (nr, nc) = points[n];
                    let dy = nr as f64 - r as f64;
                    let dx = nc as f64 - c as f64;
                    if dy * dy + dx * dx <= self.eps_sq {
                        out.push(n);
                    }
                }
            }
        }
        out
    }
}

// ============================================================================
// CENTROIDS
// ============================================================================

/// Mean (row, col) of a cluster, truncated like an integer cast
pub fn centroid(cluster: &[(usize, usize)]) -> Option<Centroid> {
    if cluster.is_empty() {
        return None;
    }
    let n = cluster.len() as f64;
    let (sum_r, sum_c) = cluster
        .iter()
        .fold((0.0f64, 0.0f64), |(sr, sc), &(r, c)| (sr + r as f64, sc + c as f64));
    Some(Centroid::new((sum_r / n) as i32, (sum_c / n) as i32))
}

/// One centroid per cluster, sorted by (row, col) so downstream matching
/// does not depend on the clustering engine's output order.
pub fn centroids(clusters: &[Cluster]) -> Vec<Centroid> {
    let mut out: Vec<Centroid> = clusters.iter().filter_map(|c| centroid(c)).collect();
    out.sort();
    out
}
