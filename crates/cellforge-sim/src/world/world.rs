//! The world façade: the single entry point a caller drives. Owns the
//! material registry and chunk manager, and composes the simulation
//! dispatcher, painting primitives, and effect helpers over them.

use bresenham::Bresenham;
use glam::Vec2;
use rand::{rngs::StdRng, SeedableRng};

use cellforge_materials::{Cell, MaterialDef, MaterialId, MaterialRegistry, WorldError};

use crate::simulation;
use crate::world::chunk_manager::{ChunkManager, Rect};
use crate::world::stats::SimulationStats;

/// The simulated world: a fixed `width x height` in cells, backed by a
/// sparse chunk store that only ever materializes the `⌈width/N⌉ x
/// ⌈height/N⌉` chunks the rectangle spans. `width`/`height` bound every
/// cell access and every movement the physics dispatcher performs — the
/// world edge behaves like a solid wall, never a place cells can wander off
/// to.
pub struct World {
    width: u32,
    height: u32,
    registry: MaterialRegistry,
    chunk_manager: ChunkManager,
    rng: StdRng,
    paused: bool,
    time_scale: f32,
    active_area: Rect,
    stats: SimulationStats,
}

impl World {
    /// Creates a world with the ten standard materials pre-registered and
    /// a thread-seeded RNG. `width`/`height` must both be non-zero.
    pub fn new(width: u32, height: u32) -> Result<Self, WorldError> {
        Self::with_seed(width, height, rand::random())
    }

    /// As [`World::new`], but with an explicit RNG seed — the only way this
    /// engine's randomness (the source uses a time-seeded generator) can be
    /// made reproducible, e.g. for tests.
    pub fn with_seed(width: u32, height: u32, seed: u64) -> Result<Self, WorldError> {
        if width == 0 || height == 0 {
            log::warn!("[WORLD] rejecting {width}x{height} world: zero dimension");
            return Err(WorldError::ZeroDimensions { width, height });
        }
        let mut registry = MaterialRegistry::new();
        registry.register_basic_materials();
        let active_area = Rect::new(0, 0, width, height);
        log::info!("[WORLD] created {width}x{height} world with seed {seed}");
        Ok(Self {
            width,
            height,
            registry,
            chunk_manager: ChunkManager::with_bounds(width, height),
            rng: StdRng::seed_from_u64(seed),
            paused: false,
            time_scale: 1.0,
            active_area,
            stats: SimulationStats::default(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    // -- Material registry -------------------------------------------------

    pub fn register_material(&mut self, props: MaterialDef) -> MaterialId {
        let name = props.name.clone();
        let id = self.registry.register(props);
        log::debug!("[MATERIALS] registered '{name}' as id {id}");
        id
    }

    pub fn material_by_name(&self, name: &str) -> MaterialId {
        self.registry.id_of(name)
    }

    pub fn material_props(&self, id: MaterialId) -> &MaterialDef {
        self.registry.get(id)
    }

    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    // -- Cell access ---------------------------------------------------------

    /// Out-of-bounds reads return AIR by convention; never an error.
    pub fn get_cell(&self, x: i32, y: i32) -> Cell {
        if !self.in_bounds(x, y) {
            return Cell::AIR;
        }
        self.chunk_manager.get_cell(x, y)
    }

    /// Materializes `material`'s defaults into the cell at `(x, y)`.
    /// Out-of-bounds writes are silently ignored (brushes routinely clip the
    /// world edge).
    pub fn set_cell(&mut self, x: i32, y: i32, material: MaterialId) {
        if !self.in_bounds(x, y) {
            return;
        }
        self.chunk_manager.set_cell(x, y, self.default_cell_for(material));
    }

    /// As `set_cell`, but takes a fully-formed cell (used by effects and
    /// tests that need control over temperature/velocity/etc. at spawn).
    pub fn set_cell_raw(&mut self, x: i32, y: i32, cell: Cell) {
        if !self.in_bounds(x, y) {
            return;
        }
        self.chunk_manager.set_cell(x, y, cell);
    }

    fn default_cell_for(&self, material: MaterialId) -> Cell {
        cell_defaults(material, self.registry.get(material))
    }

    // -- Painting ------------------------------------------------------------

    pub fn paint_cell(&mut self, x: i32, y: i32, material: MaterialId) {
        self.set_cell(x, y, material);
    }

    /// Bresenham line from `(x1, y1)` to `(x2, y2)`, thickened by painting a
    /// `thickness`-wide square around each point on the line.
    pub fn paint_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, material: MaterialId, thickness: u32) {
        let half = (thickness.max(1) as i32 - 1) / 2;
        let mut points: Vec<(i32, i32)> =
            Bresenham::new((x1 as isize, y1 as isize), (x2 as isize, y2 as isize))
                .map(|(x, y)| (x as i32, y as i32))
                .collect();
        points.push((x2, y2));

        for (x, y) in points {
            for dy in -half..=half {
                for dx in -half..=half {
                    self.set_cell(x + dx, y + dy, material);
                }
            }
        }
    }

    /// Filled disk via the midpoint circle algorithm: integer-only, no
    /// per-pixel square root.
    pub fn paint_circle(&mut self, cx: i32, cy: i32, radius: i32, material: MaterialId) {
        if radius < 0 {
            return;
        }
        let mut x = radius;
        let mut y = 0;
        let mut err = 0;
        while x >= y {
            self.fill_row(cx - x, cx + x, cy + y, material);
            self.fill_row(cx - x, cx + x, cy - y, material);
            self.fill_row(cx - y, cx + y, cy + x, material);
            self.fill_row(cx - y, cx + y, cy - x, material);
            y += 1;
            err += 1 + 2 * y;
            if 2 * (err - x) + 1 > 0 {
                x -= 1;
                err += 1 - 2 * x;
            }
        }
    }

    fn fill_row(&mut self, x0: i32, x1: i32, y: i32, material: MaterialId) {
        for x in x0..=x1 {
            self.set_cell(x, y, material);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, material: MaterialId) {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                self.set_cell(x + dx, y + dy, material);
            }
        }
    }

    // -- Simulation ------------------------------------------------------------

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale;
    }

    /// Clamps `(x, y, w, h)` to the world rectangle before storing it — a
    /// rect that extends past the world edge, or lies entirely outside it,
    /// degrades to the in-bounds portion (possibly empty) rather than an
    /// error.
    pub fn set_active_area(&mut self, x: i32, y: i32, w: u32, h: u32) {
        self.active_area = self.clamp_to_world(Rect::new(x, y, w, h));
    }

    fn clamp_to_world(&self, rect: Rect) -> Rect {
        let world_right = self.width as i32;
        let world_bottom = self.height as i32;
        let clamped_x = rect.x.clamp(0, world_right);
        let clamped_y = rect.y.clamp(0, world_bottom);
        let right = (rect.x + rect.width as i32).clamp(0, world_right);
        let bottom = (rect.y + rect.height as i32).clamp(0, world_bottom);
        Rect::new(
            clamped_x,
            clamped_y,
            (right - clamped_x).max(0) as u32,
            (bottom - clamped_y).max(0) as u32,
        )
    }

    /// Advances the simulation by `dt` seconds (scaled by `time_scale`). A
    /// no-op while paused.
    pub fn update(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        let scaled_dt = dt * self.time_scale;

        self.chunk_manager.update_active_chunks(self.active_area);
        let active_chunks = self.chunk_manager.active_chunk_coords().count();

        let start = std::time::Instant::now();
        let report = simulation::tick(&mut self.chunk_manager, &self.registry, scaled_dt, &mut self.rng);
        let elapsed = start.elapsed();
        log::trace!(
            "[TICK] {} active chunks, {} cells, {} moves, {} reactions in {elapsed:?}",
            active_chunks,
            report.cells_processed,
            report.moves,
            report.reactions
        );

        self.chunk_manager.recompute_chunk_activity(&self.registry);

        self.stats = self.compute_stats(active_chunks, report.cells_processed, elapsed);
    }

    fn compute_stats(
        &self,
        active_chunks: usize,
        active_cells: usize,
        elapsed: std::time::Duration,
    ) -> SimulationStats {
        let mut material_counts = std::collections::HashMap::new();
        let mut temp_sum = 0.0_f64;
        let mut pressure_sum = 0.0_f64;
        let mut non_air = 0u64;

        for chunk in self.chunk_manager.chunks.values() {
            for cell in chunk.cells().iter() {
                if cell.is_air() {
                    continue;
                }
                *material_counts.entry(cell.material).or_insert(0usize) += 1;
                temp_sum += cell.temperature as f64;
                pressure_sum += cell.pressure as f64;
                non_air += 1;
            }
        }

        let avg_temperature = if non_air > 0 {
            (temp_sum / non_air as f64) as f32
        } else {
            0.0
        };
        let avg_pressure = if non_air > 0 {
            (pressure_sum / non_air as f64) as f32
        } else {
            0.0
        };

        SimulationStats {
            active_chunks,
            active_cells,
            avg_temperature,
            avg_pressure,
            material_counts,
            last_tick_duration: elapsed,
        }
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    // -- Effects ---------------------------------------------------------------

    pub fn create_explosion(&mut self, x: i32, y: i32, radius: i32, power: f32) {
        log::debug!("[EFFECT] explosion at ({x}, {y}) radius {radius} power {power}");
        simulation::create_explosion(&mut self.chunk_manager, &self.registry, x, y, radius, power);
    }

    pub fn create_heat_source(&mut self, x: i32, y: i32, temperature: f32, radius: i32) {
        simulation::create_heat_source(&mut self.chunk_manager, x, y, temperature, radius);
    }

    pub fn apply_force(&mut self, x: i32, y: i32, dir: Vec2, strength: f32, radius: i32) {
        simulation::apply_force_field(&mut self.chunk_manager, x, y, dir, strength, radius);
    }
}

fn cell_defaults(material: MaterialId, mat: &MaterialDef) -> Cell {
    Cell {
        material,
        lifetime: mat.lifetime.unwrap_or(0),
        ..Cell::AIR
    }
}
