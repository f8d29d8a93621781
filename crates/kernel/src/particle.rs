//! Particle storage using struct-of-arrays layout.

/// Struct-of-arrays particle storage with a fixed capacity.
///
/// All arrays are parallel: index `i` across every array refers to the same
/// particle. Growth is append-only and nothing is ever removed or reordered,
/// so an index stays valid until the next [`ParticleStore::clear`].
#[derive(Debug, Clone)]
pub struct ParticleStore {
    // ---- Positions ----
    /// X positions
    pub x: Vec<f32>,
    /// Y positions
    pub y: Vec<f32>,

    // ---- Positions at the start of the current sub-step ----
    /// Previous X positions
    pub prev_x: Vec<f32>,
    /// Previous Y positions
    pub prev_y: Vec<f32>,

    // ---- Velocities ----
    /// X velocities
    pub vx: Vec<f32>,
    /// Y velocities
    pub vy: Vec<f32>,

    capacity: usize,
}

impl ParticleStore {
    /// Create an empty store that accepts at most `capacity` particles.
    ///
    /// Buffers grow on demand.
    pub fn new(capacity: usize) -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            prev_x: Vec::new(),
            prev_y: Vec::new(),
            vx: Vec::new(),
            vy: Vec::new(),
            capacity,
        }
    }

    /// Number of live particles.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if there are no particles.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Maximum number of particles.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many more particles fit.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    /// Append a particle at rest at `(px, py)`.
    ///
    /// Returns `false` without touching the store when it is full.
    pub fn push_particle(&mut self, px: f32, py: f32) -> bool {
        if self.len() >= self.capacity {
            return false;
        }
        self.x.push(px);
        self.y.push(py);
        self.prev_x.push(px);
        self.prev_y.push(py);
        self.vx.push(0.0);
        self.vy.push(0.0);
        true
    }

    /// Drop all particles, keeping the allocations for reuse.
    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.prev_x.clear();
        self.prev_y.clear();
        self.vx.clear();
        self.vy.clear();
    }

    /// Position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> [f32; 2] {
        [self.x[i], self.y[i]]
    }

    /// Velocity of particle `i`.
    #[inline]
    pub fn velocity(&self, i: usize) -> [f32; 2] {
        [self.vx[i], self.vy[i]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store() {
        let store = ParticleStore::new(4);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.remaining(), 4);
    }

    #[test]
    fn push_initializes_at_rest() {
        let mut store = ParticleStore::new(4);
        assert!(store.push_particle(1.0, 2.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.position(0), [1.0, 2.0]);
        assert_eq!(store.prev_x[0], 1.0);
        assert_eq!(store.prev_y[0], 2.0);
        assert_eq!(store.velocity(0), [0.0, 0.0]);
    }

    #[test]
    fn push_beyond_capacity_is_rejected() {
        let mut store = ParticleStore::new(2);
        assert!(store.push_particle(0.0, 0.0));
        assert!(store.push_particle(1.0, 0.0));
        assert!(!store.push_particle(2.0, 0.0));
        assert_eq!(store.len(), 2);
        assert_eq!(store.remaining(), 0);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut store = ParticleStore::new(3);
        store.push_particle(0.0, 0.0);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 3);
        assert!(store.push_particle(5.0, 5.0));
        assert_eq!(store.position(0), [5.0, 5.0]);
    }
}
