//! Orbit scheduling: per-stage paths, initial phase spreading and phase advance.
//!
//! Phases advance by exactly one step per call. There is no delta-time
//! compensation, so perceived speed follows the caller's tick rate.

use deadline_orbit_core::{OrbitPath, StageKey};
use glam::Vec2;

use crate::path;

const DEFAULT_BASE_RADIUS: f32 = 2.0;
const DEFAULT_DENSITY: usize = 500;
const OVERVIEW_COLUMNS: usize = 10;
const OVERVIEW_SPACING: f32 = 1.2;

/// Tunables that shape every stage path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    base_radius: f32,
    density: usize,
}

impl Config {
    /// Creates a configuration with explicit radius offset and point density.
    #[must_use]
    pub const fn new(base_radius: f32, density: usize) -> Self {
        Self {
            base_radius,
            density,
        }
    }

    /// Radius of the stage zero loop.
    #[must_use]
    pub const fn base_radius(&self) -> f32 {
        self.base_radius
    }

    /// Points per unit of `diff + 1`.
    #[must_use]
    pub const fn density(&self) -> usize {
        self.density
    }

    /// Number of points sampled for a stage of the provided population.
    ///
    /// Always exceeds `total` so every member gets a distinct starting phase.
    #[must_use]
    pub fn point_count(&self, key: StageKey, total: u32) -> usize {
        let scale = usize::try_from(key.diff().saturating_add(1)).unwrap_or(1).max(1);
        let requested = self.density.max(1).saturating_mul(scale);
        requested.max(total as usize + 2)
    }

    /// Radius of the loop for the provided stage.
    #[must_use]
    pub fn radius(&self, key: StageKey) -> f32 {
        self.base_radius + key.diff() as f32
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_RADIUS, DEFAULT_DENSITY)
    }
}

/// Generates the shared path of a stage.
pub(crate) fn stage_path(config: &Config, key: StageKey, total: u32) -> OrbitPath {
    path::generate(config.radius(key), config.point_count(key, total))
}

/// Spreads members evenly around the loop by their arrival order.
pub(crate) fn initial_phase(path_len: usize, total: u32, cursor: u32) -> usize {
    if total == 0 {
        return 0;
    }
    let last_phase = path_len.saturating_sub(2);
    let spread = (path_len as f64 / f64::from(total)) * f64::from(cursor);
    last_phase.min(spread.floor() as usize)
}

/// Moves a phase one step forward, wrapping after the last valid phase.
pub(crate) fn advance_phase(phase: usize, path: &OrbitPath) -> usize {
    if phase >= path.last_phase() {
        0
    } else {
        phase + 1
    }
}

/// Static overview position of the `index`-th expired entity.
pub(crate) fn overview_position(index: usize, count: usize) -> Vec2 {
    let columns = OVERVIEW_COLUMNS.min(count.max(1));
    let rows = count.max(1).div_ceil(columns);
    let column = index % columns;
    let row = index / columns;
    let width = (columns - 1) as f32 * OVERVIEW_SPACING;
    let height = (rows - 1) as f32 * OVERVIEW_SPACING;
    Vec2::new(
        column as f32 * OVERVIEW_SPACING - width / 2.0,
        height / 2.0 - row as f32 * OVERVIEW_SPACING,
    )
}
