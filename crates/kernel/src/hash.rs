//! Generation-marked spatial hash over a uniform 2D grid.
//!
//! Buckets are intrusive singly linked lists threaded through a per-particle
//! `next` array. A bucket counts as populated only when its mark equals the
//! current epoch, so a rebuild never has to clear the whole table.

/// Sentinel for "no particle" in `first` / `next`.
pub const NONE: u32 = u32::MAX;

const HASH_P1: i32 = 92_837_111;
const HASH_P2: i32 = 689_287_499;

/// Spatial hash keyed on integer cell coordinates.
#[derive(Debug)]
pub struct SpatialHash {
    table_size: usize,
    origin: [f32; 2],
    cell_size: f32,
    inv_cell_size: f32,
    /// Head particle of each bucket. Meaningful only where `marks` is current.
    first: Vec<u32>,
    /// Epoch at which each bucket was last opened.
    marks: Vec<u32>,
    current_mark: u32,
    /// Next particle in the same bucket, indexed by particle.
    next: Vec<u32>,
}

impl SpatialHash {
    /// Create a hash with `table_size` buckets and cells of `cell_size`,
    /// with cell `(0, 0)` starting at `origin`.
    pub fn new(table_size: usize, cell_size: f32, origin: [f32; 2]) -> Self {
        assert!(table_size > 0, "table_size must be positive");
        assert!(cell_size > 0.0, "cell_size must be positive");
        Self {
            table_size,
            origin,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            first: vec![NONE; table_size],
            marks: vec![0; table_size],
            current_mark: 0,
            next: Vec::new(),
        }
    }

    /// Cell edge length.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of buckets.
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Current epoch.
    pub fn epoch(&self) -> u32 {
        self.current_mark
    }

    /// Change the cell size. Contents are stale until the next rebuild.
    pub fn set_cell_size(&mut self, cell_size: f32) {
        assert!(cell_size > 0.0, "cell_size must be positive");
        self.cell_size = cell_size;
        self.inv_cell_size = 1.0 / cell_size;
    }

    /// Forget all buckets and restart the epoch counter.
    pub fn reset(&mut self) {
        self.first.fill(NONE);
        self.marks.fill(0);
        self.current_mark = 0;
    }

    /// Integer cell containing `(px, py)`.
    #[inline]
    pub fn cell_of(&self, px: f32, py: f32) -> (i32, i32) {
        let gx = ((px - self.origin[0]) * self.inv_cell_size).floor() as i32;
        let gy = ((py - self.origin[1]) * self.inv_cell_size).floor() as i32;
        (gx, gy)
    }

    /// Bucket index for cell `(gx, gy)`.
    #[inline]
    pub fn bucket_of(&self, gx: i32, gy: i32) -> usize {
        let h = (gx.wrapping_mul(HASH_P1) ^ gy.wrapping_mul(HASH_P2)).unsigned_abs();
        h as usize % self.table_size
    }

    /// Whether `bucket` was opened during the current epoch.
    #[inline]
    pub fn is_live(&self, bucket: usize) -> bool {
        self.marks[bucket] == self.current_mark
    }

    /// Rebuild buckets from the given positions. O(n) in the particle count.
    pub fn rebuild(&mut self, x: &[f32], y: &[f32]) {
        let n = x.len();
        debug_assert_eq!(n, y.len());

        self.advance_epoch();
        self.next.clear();
        self.next.resize(n, NONE);

        for i in 0..n {
            let (gx, gy) = self.cell_of(x[i], y[i]);
            let h = self.bucket_of(gx, gy);
            if self.marks[h] != self.current_mark {
                self.marks[h] = self.current_mark;
                self.first[h] = NONE;
            }
            self.next[i] = self.first[h];
            self.first[h] = i as u32;
        }
    }

    /// Visit every particle in the bucket of cell `(gx, gy)`, most recently
    /// inserted first. Does nothing for a stale bucket.
    ///
    /// Different cells may share a bucket, so callers filter by distance.
    #[inline]
    pub fn for_each_in_cell<F>(&self, gx: i32, gy: i32, mut f: F)
    where
        F: FnMut(usize),
    {
        let h = self.bucket_of(gx, gy);
        if !self.is_live(h) {
            return;
        }
        let mut id = self.first[h];
        while id != NONE {
            f(id as usize);
            id = self.next[id as usize];
        }
    }

    fn advance_epoch(&mut self) {
        self.current_mark = self.current_mark.wrapping_add(1);
        if self.current_mark == 0 {
            // Marks left over from the previous cycle could equal the new epoch.
            self.marks.fill(0);
            self.current_mark = 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn set_epoch(&mut self, epoch: u32) {
        self.current_mark = epoch;
    }
}
