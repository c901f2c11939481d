//! Geometry utilities over normalized bounding boxes
//!
//! ## Responsibilities
//!
//! - Touch/overlap test between axis-aligned boxes
//! - IoU-based significant-overlap test
//! - Proximity clustering of box centers (union-find)
//!
//! All boxes use normalized [0,1] coordinates with x1 <= x2, y1 <= y2.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in normalized coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    /// Center point (x, y)
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// True unless the boxes are strictly separated on the x- or y-axis.
/// Symmetric; a box always touches itself.
pub fn touches_or_overlaps(a: &BBox, b: &BBox) -> bool {
    !(a.x2 < b.x1 || b.x2 < a.x1 || a.y2 < b.y1 || b.y2 < a.y1)
}

/// Intersection-over-union test.
///
/// Returns true iff IoU > threshold. A union area of zero or less
/// (degenerate boxes) yields false, not an error.
pub fn overlaps_significantly(a: &BBox, b: &BBox, threshold: f32) -> bool {
    let x_overlap = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let y_overlap = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = x_overlap * y_overlap;
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return false;
    }
    intersection / union > threshold
}

/// Size of the largest proximity cluster of box centers.
///
/// Any pair of centers closer than `max_distance` is unioned; grouping is
/// transitive, so a chain of near boxes collapses into one cluster even when
/// its endpoints are far apart. Returns 0 for an empty input.
pub fn largest_cluster(boxes: &[BBox], max_distance: f32) -> usize {
    if boxes.is_empty() {
        return 0;
    }

    let centers: Vec<(f32, f32)> = boxes.iter().map(|b| b.center()).collect();
    let mut sets = DisjointSet::new(centers.len());

    for i in 0..centers.len() {
        for j in (i + 1)..centers.len() {
            let dx = centers[i].0 - centers[j].0;
            let dy = centers[i].1 - centers[j].1;
            if (dx * dx + dy * dy).sqrt() < max_distance {
                sets.union(i, j);
            }
        }
    }

    sets.largest_set_size()
}

/// Disjoint-set forest with path compression
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }

    fn largest_set_size(&mut self) -> usize {
        let n = self.parent.len();
        let mut counts = vec![0usize; n];
        for i in 0..n {
            let root = self.find(i);
            counts[root] += 1;
        }
        counts.into_iter().max().unwrap_or(0)
    }
}
