//! Compacted per-frame adjacency built from the [`SpatialHash`].
//!
//! One flat index buffer plus a `first_neighbor` range table (CSR layout):
//! the neighbors of particle `i` are `neighbors[first_neighbor[i]..first_neighbor[i + 1]]`.
//! The list is rebuilt once per frame and then reused through every sub-step,
//! so later sub-steps and viscosity see adjacency from the frame's start.

use crate::hash::SpatialHash;

/// Neighbor slices for every particle, self included.
#[derive(Debug, Clone, Default)]
pub struct NeighborList {
    first_neighbor: Vec<u32>,
    neighbors: Vec<u32>,
}

impl NeighborList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of particles covered by the list.
    pub fn len(&self) -> usize {
        self.first_neighbor.len().saturating_sub(1)
    }

    /// Return `true` if no particle is covered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of stored (particle, neighbor) entries.
    pub fn total_entries(&self) -> usize {
        self.neighbors.len()
    }

    /// Neighbor indices of particle `i`, in bucket scan order.
    #[inline]
    pub fn neighbors_of(&self, i: usize) -> &[u32] {
        let start = self.first_neighbor[i] as usize;
        let end = self.first_neighbor[i + 1] as usize;
        &self.neighbors[start..end]
    }

    /// Drop all adjacency.
    pub fn clear(&mut self) {
        self.first_neighbor.clear();
        self.neighbors.clear();
    }

    /// Rebuild from scratch using a hash freshly rebuilt from the same positions.
    ///
    /// Scans the 3x3 block of cells around each particle and keeps candidates
    /// strictly closer than one cell width.
    pub fn build(&mut self, hash: &SpatialHash, x: &[f32], y: &[f32]) {
        let n = x.len();
        debug_assert_eq!(n, y.len());

        self.neighbors.clear();
        self.first_neighbor.clear();
        self.first_neighbor.reserve(n + 1);

        let spacing = hash.cell_size();
        let radius_sq = spacing * spacing;

        for i in 0..n {
            self.first_neighbor.push(self.neighbors.len() as u32);
            let px = x[i];
            let py = y[i];
            let (gx, gy) = hash.cell_of(px, py);

            // Cell coordinates saturate far from the origin.
            for ox in -1i32..=1 {
                let cx = gx.wrapping_add(ox);
                for oy in -1i32..=1 {
                    let cy = gy.wrapping_add(oy);
                    hash.for_each_in_cell(cx, cy, |id| {
                        let dx = x[id] - px;
                        let dy = y[id] - py;
                        if dx * dx + dy * dy < radius_sq {
                            self.neighbors.push(id as u32);
                        }
                    });
                }
            }
        }
        self.first_neighbor.push(self.neighbors.len() as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(cell_size: f32, x: &[f32], y: &[f32]) -> NeighborList {
        let mut hash = SpatialHash::new(10_007, cell_size, [-10.0, -10.0]);
        hash.rebuild(x, y);
        let mut list = NeighborList::new();
        list.build(&hash, x, y);
        list
    }

    #[test]
    fn empty_list() {
        let list = build(0.2, &[], &[]);
        assert!(list.is_empty());
        assert_eq!(list.total_entries(), 0);
    }

    #[test]
    fn single_particle_sees_only_itself() {
        let list = build(0.2, &[0.5], &[0.5]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.neighbors_of(0), &[0]);
    }

    #[test]
    fn two_close_particles() {
        let list = build(0.2, &[0.5, 0.51], &[0.5, 0.5]);
        let mut n0 = list.neighbors_of(0).to_vec();
        let mut n1 = list.neighbors_of(1).to_vec();
        n0.sort_unstable();
        n1.sort_unstable();
        assert_eq!(n0, vec![0, 1]);
        assert_eq!(n1, vec![0, 1]);
    }

    #[test]
    fn two_far_particles() {
        let list = build(0.2, &[0.1, 0.9], &[0.1, 0.9]);
        assert_eq!(list.neighbors_of(0), &[0]);
        assert_eq!(list.neighbors_of(1), &[1]);
    }

    #[test]
    fn particles_across_cell_boundary() {
        // Adjacent cells, closer than one cell width.
        let list = build(0.2, &[0.19, 0.21], &[0.5, 0.5]);
        assert!(list.neighbors_of(0).contains(&1));
        assert!(list.neighbors_of(1).contains(&0));
    }

    #[test]
    fn exactly_one_cell_apart_is_excluded() {
        let list = build(0.25, &[0.0, 0.25], &[0.0, 0.0]);
        assert_eq!(list.neighbors_of(0), &[0]);
    }

    #[test]
    fn saturated_cells_scan_without_overflow() {
        let list = build(0.25, &[0.0, 0.0, 0.0], &[1.0e9, -1.0e9, 0.0]);
        // Wrapped cells may share a bucket, so self can repeat.
        for i in 0..3 {
            let own = list.neighbors_of(i);
            assert!(!own.is_empty());
            assert!(own.iter().all(|&j| j as usize == i), "{i}: {own:?}");
        }
    }

    #[test]
    fn many_particles_in_cluster() {
        let n = 10;
        let x: Vec<f32> = (0..n).map(|i| 0.5 + (i as f32) * 0.01).collect();
        let y = vec![0.5; n];
        let list = build(0.2, &x, &y);
        for i in 0..n {
            assert_eq!(list.neighbors_of(i).len(), n);
        }
        assert_eq!(list.total_entries(), n * n);
    }
}
