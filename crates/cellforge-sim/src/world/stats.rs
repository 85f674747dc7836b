//! Per-tick simulation statistics, recomputed by the world façade after each
//! `update`.

use std::collections::HashMap;
use std::time::Duration;

use cellforge_materials::MaterialId;

/// A snapshot of the world's state as of the most recently completed tick.
#[derive(Clone, Debug, Default)]
pub struct SimulationStats {
    pub active_chunks: usize,
    pub active_cells: usize,
    pub avg_temperature: f32,
    pub avg_pressure: f32,
    pub material_counts: HashMap<MaterialId, usize>,
    pub last_tick_duration: Duration,
}

impl SimulationStats {
    pub fn material_count(&self, material: MaterialId) -> usize {
        self.material_counts.get(&material).copied().unwrap_or(0)
    }
}
