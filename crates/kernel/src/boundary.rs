//! Domain walls, rectangular obstacles and terminal "final wall" zones.
//!
//! Resolution is a single minimum-translation push per obstacle per
//! sub-step. Fast particles can tunnel through thin obstacles, and a particle
//! wedged in a corner may need several sub-steps to come free.

use serde::{Deserialize, Serialize};

use crate::particle::ParticleStore;

/// Rectangles with a width or height at or below this are rejected.
pub const MIN_RECT_EXTENT: f32 = 0.01;

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum x
    pub left: f32,
    /// Maximum x
    pub right: f32,
    /// Minimum y
    pub bottom: f32,
    /// Maximum y
    pub top: f32,
}

impl Rect {
    /// Build a rectangle from two opposite corners in any order.
    ///
    /// Returns `None` when either side is no longer than [`MIN_RECT_EXTENT`].
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Self> {
        let rect = Self {
            left: x1.min(x2),
            right: x1.max(x2),
            bottom: y1.min(y2),
            top: y1.max(y2),
        };
        if rect.is_degenerate() {
            None
        } else {
            Some(rect)
        }
    }

    /// Horizontal extent.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Vertical extent.
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Too thin to act as a wall. Inverted rectangles count as degenerate.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > MIN_RECT_EXTENT && self.height() > MIN_RECT_EXTENT)
    }

    /// Closed containment, edges included.
    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.left && px <= self.right && py >= self.bottom && py <= self.top
    }

    /// Open containment, edges excluded.
    #[inline]
    pub fn contains_strictly(&self, px: f32, py: f32) -> bool {
        px > self.left && px < self.right && py > self.bottom && py < self.top
    }

    /// Displacement that moves `(px, py)` onto the nearest edge.
    ///
    /// Only one axis is non-zero: whichever needs the shorter move.
    #[inline]
    pub fn push_out(&self, px: f32, py: f32) -> (f32, f32) {
        let dx = if px < (self.left + self.right) * 0.5 {
            self.left - px
        } else {
            self.right - px
        };
        let dy = if py < (self.bottom + self.top) * 0.5 {
            self.bottom - py
        } else {
            self.top - py
        };
        if dx.abs() < dy.abs() {
            (dx, 0.0)
        } else {
            (0.0, dy)
        }
    }
}

/// Which collection a rectangle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryKind {
    /// Solid obstacle that particles are pushed out of.
    Obstacle,
    /// Terminal zone that halts the simulation when entered.
    FinalWall,
}

/// A solid rectangular obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Extent
    pub rect: Rect,
    /// Authoring selection flag; no physical meaning.
    pub selected: bool,
}

/// A terminal zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalWall {
    /// Extent
    pub rect: Rect,
    /// Authoring selection flag; no physical meaning.
    pub selected: bool,
    /// Sequence number assigned at creation (`count + 1`).
    pub number: u32,
}

/// Obstacles and final walls. The two collections are disjoint.
#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    obstacles: Vec<Obstacle>,
    final_walls: Vec<FinalWall>,
}

impl BoundarySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// All obstacles, in insertion order.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// All final walls, in insertion order.
    pub fn final_walls(&self) -> &[FinalWall] {
        &self.final_walls
    }

    /// Add an obstacle. Degenerate rectangles are rejected.
    pub fn add_obstacle(&mut self, rect: Rect) -> bool {
        if rect.is_degenerate() {
            return false;
        }
        self.obstacles.push(Obstacle {
            rect,
            selected: false,
        });
        true
    }

    /// Add a final wall and return its sequence number.
    /// Degenerate rectangles are rejected.
    pub fn add_final_wall(&mut self, rect: Rect) -> Option<u32> {
        if rect.is_degenerate() {
            return None;
        }
        let number = self.final_walls.len() as u32 + 1;
        self.final_walls.push(FinalWall {
            rect,
            selected: false,
            number,
        });
        Some(number)
    }

    /// Remove every obstacle and final wall for which `predicate(rect, kind, selected)`
    /// holds. Returns how many were removed.
    pub fn remove_boundaries<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Rect, BoundaryKind, bool) -> bool,
    {
        let before = self.obstacles.len() + self.final_walls.len();
        self.obstacles
            .retain(|o| !predicate(&o.rect, BoundaryKind::Obstacle, o.selected));
        self.final_walls
            .retain(|w| !predicate(&w.rect, BoundaryKind::FinalWall, w.selected));
        before - (self.obstacles.len() + self.final_walls.len())
    }

    /// Select exactly the rectangles containing `(px, py)` (edges included).
    /// Returns how many are selected.
    pub fn select_at(&mut self, px: f32, py: f32) -> usize {
        let mut count = 0;
        for o in &mut self.obstacles {
            o.selected = o.rect.contains(px, py);
            count += o.selected as usize;
        }
        for w in &mut self.final_walls {
            w.selected = w.rect.contains(px, py);
            count += w.selected as usize;
        }
        count
    }

    /// Remove everything currently selected.
    pub fn remove_selected(&mut self) -> usize {
        self.remove_boundaries(|_, _, selected| selected)
    }

    /// Remove all obstacles and final walls.
    pub fn clear(&mut self) {
        self.obstacles.clear();
        self.final_walls.clear();
    }

    /// Clamp every particle to the ground and the side walls, then push it
    /// out of every obstacle that contains it.
    ///
    /// Each obstacle is tested against the position as it was before any
    /// obstacle pushes in this pass.
    pub fn solve_boundaries(&self, particles: &mut ParticleStore, half_width: f32) {
        for i in 0..particles.len() {
            let px = particles.x[i];
            let py = particles.y[i];

            if py < 0.0 {
                particles.y[i] = 0.0;
            }
            if px < -half_width {
                particles.x[i] = -half_width;
            }
            if px > half_width {
                particles.x[i] = half_width;
            }

            for o in &self.obstacles {
                if !o.rect.contains(px, py) {
                    continue;
                }
                let (dx, dy) = o.rect.push_out(px, py);
                particles.x[i] += dx;
                particles.y[i] += dy;
            }
        }
    }

    /// 1-based position of the first final wall found strictly containing a
    /// particle, scanning particles in index order.
    pub fn check_final_walls(&self, particles: &ParticleStore) -> Option<usize> {
        if self.final_walls.is_empty() {
            return None;
        }
        for i in 0..particles.len() {
            let px = particles.x[i];
            let py = particles.y[i];
            for (j, w) in self.final_walls.iter().enumerate() {
                if w.rect.contains_strictly(px, py) {
                    return Some(j + 1);
                }
            }
        }
        None
    }
}
