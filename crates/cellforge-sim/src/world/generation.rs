//! World generation presets, built from the same painting primitives a
//! caller would use (`set_cell`/`fill_rect`), so generated worlds activate
//! and tick exactly like hand-painted ones.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use cellforge_materials::material_ids;

use super::world::World;

/// Enumerated world-generation presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldTemplate {
    /// All AIR.
    Empty,
    /// A flat Stone floor under an otherwise empty sky.
    FlatTerrain,
    /// Flat terrain with a noise-carved cave network underground.
    TerrainWithCaves,
    /// Flat terrain with caves, plus a standing body of Water filling the
    /// low-lying parts of the carved caverns.
    TerrainWithWater,
    /// Every cell assigned a uniformly random standard material; a stress
    /// scenario for the movement/reaction rules rather than a playable
    /// scene.
    RandomMaterials,
    /// A Stone floor plus side walls, leaving an open pit for manual
    /// painting — the default scratch scene.
    Sandbox,
}

/// Builds [`WorldTemplate`]s from two noise layers: one multi-octave field
/// for cave carving, one single-octave field for the random-materials
/// stress scene.
pub struct WorldGenerator {
    seed: u64,
    cave_noise: Fbm<Perlin>,
    material_noise: Perlin,
}

impl WorldGenerator {
    pub fn new(seed: u64) -> Self {
        let cave_noise = Fbm::<Perlin>::new(seed as u32)
            .set_octaves(4)
            .set_frequency(0.08)
            .set_lacunarity(2.0)
            .set_persistence(0.5);
        let material_noise = Perlin::new((seed as u32).wrapping_add(1));

        Self {
            seed,
            cave_noise,
            material_noise,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fills `world` (its full `width()`/`height()` rectangle) according to
    /// `template`.
    pub fn generate(&self, world: &mut World, template: WorldTemplate) {
        let width = world.width() as i32;
        let height = world.height() as i32;
        log::info!("[WORLDGEN] generating {template:?} over {width}x{height} (seed {})", self.seed);

        match template {
            WorldTemplate::Empty => {}
            WorldTemplate::FlatTerrain => self.flat_terrain(world, width, height),
            WorldTemplate::TerrainWithCaves => {
                self.flat_terrain(world, width, height);
                self.carve_caves(world, width, height);
            }
            WorldTemplate::TerrainWithWater => {
                self.flat_terrain(world, width, height);
                self.carve_caves(world, width, height);
                self.flood_low_caves(world, width, height);
            }
            WorldTemplate::RandomMaterials => self.random_materials(world, width, height),
            WorldTemplate::Sandbox => self.sandbox(world, width, height),
        }
    }

    fn surface_y(&self, height: i32) -> i32 {
        height / 4
    }

    fn flat_terrain(&self, world: &mut World, width: i32, height: i32) {
        let floor_y = self.surface_y(height);
        world.fill_rect(0, floor_y, width as u32, (height - floor_y).max(0) as u32, material_ids::STONE);
    }

    fn carve_caves(&self, world: &mut World, width: i32, height: i32) {
        let floor_y = self.surface_y(height);
        for y in floor_y..height {
            for x in 0..width {
                let n = self.cave_noise.get([x as f64, y as f64]);
                if n > 0.35 {
                    world.set_cell(x, y, material_ids::AIR);
                }
            }
        }
    }

    /// Floods the lowest contiguous AIR run in every column below the
    /// surface with Water, approximating a water table.
    fn flood_low_caves(&self, world: &mut World, width: i32, height: i32) {
        let floor_y = self.surface_y(height);
        let water_line = floor_y + (height - floor_y) * 3 / 4;
        for x in 0..width {
            for y in water_line..height {
                if world.get_cell(x, y).material == material_ids::AIR {
                    world.set_cell(x, y, material_ids::WATER);
                }
            }
        }
    }

    fn random_materials(&self, world: &mut World, width: i32, height: i32) {
        const POOL: [cellforge_materials::MaterialId; 9] = [
            material_ids::STONE,
            material_ids::SAND,
            material_ids::WATER,
            material_ids::OIL,
            material_ids::LAVA,
            material_ids::STEAM,
            material_ids::SMOKE,
            material_ids::WOOD,
            material_ids::AIR,
        ];
        for y in 0..height {
            for x in 0..width {
                let n = self.material_noise.get([x as f64 * 13.7, y as f64 * 13.7]);
                let idx = (((n + 1.0) * 0.5 * POOL.len() as f64) as usize).min(POOL.len() - 1);
                world.set_cell(x, y, POOL[idx]);
            }
        }
    }

    fn sandbox(&self, world: &mut World, width: i32, height: i32) {
        world.fill_rect(0, height - 1, width as u32, 1, material_ids::STONE);
        world.fill_rect(0, 0, 1, height as u32, material_ids::STONE);
        world.fill_rect(width - 1, 0, 1, height as u32, material_ids::STONE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_template_leaves_world_blank() {
        let mut world = World::new(16, 16).unwrap();
        WorldGenerator::new(1).generate(&mut world, WorldTemplate::Empty);
        assert!(world.get_cell(8, 8).is_air());
    }

    #[test]
    fn flat_terrain_has_stone_floor() {
        let mut world = World::new(32, 32).unwrap();
        WorldGenerator::new(1).generate(&mut world, WorldTemplate::FlatTerrain);
        assert_eq!(world.get_cell(10, 31).material, material_ids::STONE);
        assert!(world.get_cell(10, 0).is_air());
    }

    #[test]
    fn deterministic_for_a_given_seed() {
        let mut a = World::new(32, 32).unwrap();
        let mut b = World::new(32, 32).unwrap();
        WorldGenerator::new(42).generate(&mut a, WorldTemplate::TerrainWithCaves);
        WorldGenerator::new(42).generate(&mut b, WorldTemplate::TerrainWithCaves);
        for y in 0..32 {
            for x in 0..32 {
                assert_eq!(a.get_cell(x, y).material, b.get_cell(x, y).material);
            }
        }
    }

    #[test]
    fn sandbox_has_a_floor_and_walls() {
        let mut world = World::new(16, 16).unwrap();
        WorldGenerator::new(1).generate(&mut world, WorldTemplate::Sandbox);
        assert_eq!(world.get_cell(8, 15).material, material_ids::STONE);
        assert_eq!(world.get_cell(0, 8).material, material_ids::STONE);
        assert_eq!(world.get_cell(15, 8).material, material_ids::STONE);
    }
}
