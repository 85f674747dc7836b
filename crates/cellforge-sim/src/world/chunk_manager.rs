//! Sparse chunk storage, coordinate math, and the active-chunk scheduling set.

use std::collections::{HashMap, HashSet};

use cellforge_materials::{Cell, MaterialRegistry, CHUNK_SIZE};
use glam::IVec2;

use super::chunk::Chunk;

/// World-axis-aligned rectangle, in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn chunk_bounds(&self) -> Option<(IVec2, IVec2)> {
        if self.is_empty() {
            return None;
        }
        let (min_chunk, _, _) = ChunkManager::world_to_chunk_coords(self.x, self.y);
        let (max_chunk, _, _) = ChunkManager::world_to_chunk_coords(
            self.x + self.width as i32 - 1,
            self.y + self.height as i32 - 1,
        );
        Some((min_chunk, max_chunk))
    }

    fn intersects_chunk(&self, chunk_coord: IVec2) -> bool {
        let cx0 = chunk_coord.x * CHUNK_SIZE as i32;
        let cy0 = chunk_coord.y * CHUNK_SIZE as i32;
        let cx1 = cx0 + CHUNK_SIZE as i32;
        let cy1 = cy0 + CHUNK_SIZE as i32;
        let rx1 = self.x + self.width as i32;
        let ry1 = self.y + self.height as i32;
        self.x < cx1 && rx1 > cx0 && self.y < cy1 && ry1 > cy0
    }
}

/// Sparse map of chunk-coord to chunk, plus the set of chunks currently
/// scheduled for the physics sweep.
pub struct ChunkManager {
    pub chunks: HashMap<IVec2, Chunk>,
    active_chunks: HashSet<IVec2>,
    /// The world rectangle movement and writes are confined to. `None` means
    /// unbounded (used by unit tests that exercise the chunk manager in
    /// isolation, without a `World`). A real `World` always sets this at
    /// construction, per §6's "internal chunk grid is ⌈w/N⌉ × ⌈h/N⌉" —
    /// the chunk store stays sparse, but cells can never move or be written
    /// past this rectangle; the world edge behaves like a solid wall.
    bounds: Option<Rect>,
}

impl ChunkManager {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::new(),
            active_chunks: HashSet::new(),
            bounds: None,
        }
    }

    /// As `new`, but confines cell reads/writes/movement to `(0, 0,
    /// width, height)`.
    pub fn with_bounds(width: u32, height: u32) -> Self {
        Self {
            chunks: HashMap::new(),
            active_chunks: HashSet::new(),
            bounds: Some(Rect::new(0, 0, width, height)),
        }
    }

    /// True when `bounds` is unset (unbounded) or `(x, y)` falls inside it.
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        match self.bounds {
            None => true,
            Some(b) => x >= b.x && y >= b.y && x < b.x + b.width as i32 && y < b.y + b.height as i32,
        }
    }

    /// World coordinate to (chunk coord, local x, local y). Correct for
    /// negative coordinates: chunk is a floor-division, local is the
    /// Euclidean remainder, so the sign of the division never leaks into the
    /// local offset.
    pub fn world_to_chunk_coords(world_x: i32, world_y: i32) -> (IVec2, usize, usize) {
        let chunk_x = world_x.div_euclid(CHUNK_SIZE as i32);
        let chunk_y = world_y.div_euclid(CHUNK_SIZE as i32);
        let local_x = world_x.rem_euclid(CHUNK_SIZE as i32) as usize;
        let local_y = world_y.rem_euclid(CHUNK_SIZE as i32) as usize;
        (IVec2::new(chunk_x, chunk_y), local_x, local_y)
    }

    /// Inverse of `world_to_chunk_coords` for the chunk's origin cell.
    pub fn chunk_to_world_coords(chunk_coord: IVec2, local_x: usize, local_y: usize) -> (i32, i32) {
        (
            chunk_coord.x * CHUNK_SIZE as i32 + local_x as i32,
            chunk_coord.y * CHUNK_SIZE as i32 + local_y as i32,
        )
    }

    pub fn get(&self, coord: IVec2) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn get_mut(&mut self, coord: IVec2) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn get_or_create(&mut self, coord: IVec2) -> &mut Chunk {
        self.chunks.entry(coord).or_insert_with(|| {
            log::trace!("[CHUNK] materializing chunk ({}, {})", coord.x, coord.y);
            Chunk::new(coord.x, coord.y)
        })
    }

    /// Out-of-bounds reads return AIR by convention; an absent chunk is
    /// simply never written, not an error.
    pub fn get_cell(&self, x: i32, y: i32) -> Cell {
        if !self.in_bounds(x, y) {
            return Cell::AIR;
        }
        let (coord, lx, ly) = Self::world_to_chunk_coords(x, y);
        self.chunks
            .get(&coord)
            .map(|c| c.get_cell(lx, ly))
            .unwrap_or(Cell::AIR)
    }

    /// Materializes the owning chunk, marks it dirty, and inserts its coord
    /// into the active set. Silently ignored outside `bounds`.
    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell) {
        if !self.in_bounds(x, y) {
            return;
        }
        let (coord, lx, ly) = Self::world_to_chunk_coords(x, y);
        let chunk = self.get_or_create(coord);
        chunk.set_cell(lx, ly, cell);
        self.active_chunks.insert(coord);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn active_chunk_coords(&self) -> impl Iterator<Item = &IVec2> {
        self.active_chunks.iter()
    }

    pub fn is_active(&self, coord: IVec2) -> bool {
        self.active_chunks.contains(&coord)
    }

    /// Rebuilds the active set as the union of chunk coords overlapping
    /// `rect` whose chunks report `active() == true`. Chunks outside `rect`
    /// are dropped from scheduling even if still internally active — they
    /// simply aren't simulated until the active area includes them again.
    pub fn update_active_chunks(&mut self, rect: Rect) {
        self.active_chunks.clear();
        if rect.is_empty() {
            return;
        }
        let Some((min_chunk, max_chunk)) = rect.chunk_bounds() else {
            return;
        };
        for cy in min_chunk.y..=max_chunk.y {
            for cx in min_chunk.x..=max_chunk.x {
                let coord = IVec2::new(cx, cy);
                if !rect.intersects_chunk(coord) {
                    continue;
                }
                if let Some(chunk) = self.chunks.get(&coord) {
                    if chunk.is_active() {
                        self.active_chunks.insert(coord);
                    }
                }
            }
        }
    }

    /// Recomputes every loaded chunk's precise `active` flag against the
    /// registry. Called once per tick after the physics sweep so chunks that
    /// settled this tick drop out of the active set on the next rebuild.
    pub fn recompute_chunk_activity(&mut self, registry: &MaterialRegistry) {
        for chunk in self.chunks.values_mut() {
            chunk.recompute_active(registry);
        }
    }
}

impl Default for ChunkManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellforge_materials::material_ids;

    #[test]
    fn coordinate_round_trip_including_negatives() {
        for (x, y) in [(-65, -65), (-1, -1), (0, 0), (63, 63), (64, 64), (129, -3)] {
            let (coord, lx, ly) = ChunkManager::world_to_chunk_coords(x, y);
            let (rx, ry) = ChunkManager::chunk_to_world_coords(coord, lx, ly);
            assert_eq!((rx, ry), (x, y));
        }
    }

    #[test]
    fn negative_local_coords_are_never_negative() {
        let (_, lx, ly) = ChunkManager::world_to_chunk_coords(-1, -1);
        assert_eq!((lx, ly), (CHUNK_SIZE - 1, CHUNK_SIZE - 1));
    }

    #[test]
    fn get_cell_out_of_bounds_is_air() {
        let manager = ChunkManager::new();
        assert!(manager.get_cell(-1, 0).is_air());
        assert!(manager.get_cell(1_000_000, 0).is_air());
    }

    #[test]
    fn set_cell_materializes_chunk_and_activates_it() {
        let mut manager = ChunkManager::new();
        manager.set_cell(
            10,
            10,
            Cell {
                material: material_ids::SAND,
                ..Cell::AIR
            },
        );
        assert_eq!(manager.chunk_count(), 1);
        assert_eq!(manager.get_cell(10, 10).material, material_ids::SAND);
    }

    #[test]
    fn update_active_chunks_matches_rect_and_activity() {
        let mut manager = ChunkManager::new();
        manager.set_cell(
            0,
            0,
            Cell {
                material: material_ids::SAND,
                ..Cell::AIR
            },
        );
        manager.update_active_chunks(Rect::new(0, 0, CHUNK_SIZE as u32, CHUNK_SIZE as u32));
        assert!(manager.is_active(IVec2::new(0, 0)));

        manager.update_active_chunks(Rect::new(1000, 1000, 10, 10));
        assert!(!manager.is_active(IVec2::new(0, 0)));
    }

    #[test]
    fn bounded_manager_rejects_writes_past_its_rectangle() {
        let mut manager = ChunkManager::with_bounds(16, 16);
        manager.set_cell(
            20,
            4,
            Cell {
                material: material_ids::SAND,
                ..Cell::AIR
            },
        );
        assert!(manager.get_cell(20, 4).is_air());
        assert_eq!(manager.chunk_count(), 0);
    }

    #[test]
    fn unbounded_manager_has_no_edge() {
        let manager = ChunkManager::new();
        assert!(manager.in_bounds(-1_000_000, 1_000_000));
    }

    #[test]
    fn zero_dimension_rect_activates_nothing() {
        let mut manager = ChunkManager::new();
        manager.set_cell(
            0,
            0,
            Cell {
                material: material_ids::SAND,
                ..Cell::AIR
            },
        );
        manager.update_active_chunks(Rect::new(0, 0, 0, 0));
        assert!(manager.active_chunk_coords().next().is_none());
    }
}
