//! Scene configuration parsing and validation

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use pbf_kernel::{FluidParams, Rect};
use serde::{Deserialize, Serialize};

/// Main scene configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Human-readable scene name
    pub name: String,
    /// Solver tunables
    #[serde(default)]
    pub params: FluidParams,
    /// Initial particle block placed on reset
    #[serde(default)]
    pub lattice: LatticeConfig,
    /// Solid obstacles
    #[serde(default)]
    pub obstacles: Vec<Rect>,
    /// Terminal zones, in reporting order
    #[serde(default)]
    pub final_walls: Vec<Rect>,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

/// Reset lattice dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeConfig {
    /// Columns
    #[serde(default = "default_num_x")]
    pub num_x: usize,
    /// Rows
    #[serde(default = "default_num_y")]
    pub num_y: usize,
}

// Default values
fn default_num_x() -> usize {
    10
}

fn default_num_y() -> usize {
    200
}

fn is_positive(x: f32) -> bool {
    x.is_finite() && x > 0.0
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            num_x: default_num_x(),
            num_y: default_num_y(),
        }
    }
}

impl LatticeConfig {
    /// Particle count, `None` on overflow.
    pub fn count(&self) -> Option<usize> {
        self.num_x.checked_mul(self.num_y)
    }
}

impl SimulationConfig {
    /// Config with default tunables and no boundaries.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: FluidParams::default(),
            lattice: LatticeConfig::default(),
            obstacles: Vec::new(),
            final_walls: Vec::new(),
            max_frames: None,
        }
    }

    /// Load and validate configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: SimulationConfig =
            serde_json::from_str(json).context("failed to parse config JSON")?;
        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let p = &self.params;

        if !is_positive(p.particle_radius) {
            return Err("particle_radius must be positive".to_string());
        }
        if !is_positive(p.time_step) {
            return Err("time_step must be positive".to_string());
        }
        if p.num_sub_steps == 0 {
            return Err("num_sub_steps must be at least 1".to_string());
        }
        if p.viscosity < 0.0 {
            return Err("viscosity must be non-negative".to_string());
        }
        if !is_positive(p.domain_half_width) {
            return Err("domain_half_width must be positive".to_string());
        }
        if p.max_particles == 0 {
            return Err("max_particles must be at least 1".to_string());
        }
        if p.hash_table_size == 0 {
            return Err("hash_table_size must be at least 1".to_string());
        }

        match self.lattice.count() {
            Some(n) if n <= p.max_particles => {}
            _ => {
                return Err(format!(
                    "lattice {}x{} exceeds max_particles {}",
                    self.lattice.num_x, self.lattice.num_y, p.max_particles
                ))
            }
        }

        if let Some(i) = self.obstacles.iter().position(Rect::is_degenerate) {
            return Err(format!("obstacle {} is degenerate", i));
        }
        if let Some(i) = self.final_walls.iter().position(Rect::is_degenerate) {
            return Err(format!("final wall {} is degenerate", i + 1));
        }

        if self.max_frames == Some(0) {
            return Err("max_frames must be at least 1".to_string());
        }

        Ok(())
    }

    /// Simulated time covered by `max_frames`, if set
    pub fn max_time(&self) -> Option<f64> {
        self.max_frames
            .map(|f| f as f64 * self.params.time_step as f64)
    }
}
