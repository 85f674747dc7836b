//! Chunk - a fixed CHUNK_SIZE x CHUNK_SIZE block of cells, the unit of scheduling.

use cellforge_materials::{Cell, CellFlags, MaterialRegistry, CHUNK_AREA, CHUNK_SIZE};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug)]
pub struct DirtyRect {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl DirtyRect {
    pub fn new(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// A CHUNK_SIZE x CHUNK_SIZE region of the world.
#[derive(Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk coordinates, in chunk space (not cell space).
    pub x: i32,
    pub y: i32,

    /// Cell data, row-major: index = y * CHUNK_SIZE + x.
    #[serde(with = "serde_big_array::BigArray")]
    cells: [Cell; CHUNK_AREA],

    /// Any write sets this; cleared by the caller once observed (e.g. a renderer).
    #[serde(skip)]
    pub dirty: bool,
    #[serde(skip)]
    pub dirty_rect: Option<DirtyRect>,

    /// Derived from contents: true if any cell is movable-and-non-AIR or has
    /// non-zero velocity. Recomputed whenever a cell in the chunk is written.
    #[serde(skip)]
    active: bool,
}

impl Chunk {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            cells: [Cell::AIR; CHUNK_AREA],
            dirty: false,
            dirty_rect: None,
            active: false,
        }
    }

    #[inline]
    fn index(x: usize, y: usize) -> usize {
        debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE);
        y * CHUNK_SIZE + x
    }

    #[inline]
    pub fn get_cell(&self, x: usize, y: usize) -> Cell {
        self.cells[Self::index(x, y)]
    }

    #[inline]
    pub fn get_cell_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        &mut self.cells[Self::index(x, y)]
    }

    /// Writes a cell, marks the chunk dirty, expands the dirty rect and
    /// recomputes the chunk's `active` flag from the cell just written.
    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        let idx = Self::index(x, y);
        self.cells[idx] = cell;
        self.dirty = true;
        match &mut self.dirty_rect {
            Some(rect) => rect.expand(x, y),
            None => self.dirty_rect = Some(DirtyRect::new(x, y)),
        }
        // Optimistic: any non-AIR or moving cell marks the chunk active
        // immediately. This can only ever be too eager, never too stale —
        // `recompute_active` is the precise check used to retire a chunk
        // from the active set once it has genuinely settled.
        if !cell.is_air() || cell.velocity.x != 0.0 || cell.velocity.y != 0.0 {
            self.active = true;
        }
    }

    /// Recomputes `active` from scratch against the material registry: true
    /// iff some cell is movable and non-AIR, or has non-zero velocity.
    pub fn recompute_active(&mut self, registry: &MaterialRegistry) {
        self.active = self.cells.iter().any(|c| {
            (!c.is_air() && registry.get(c.material).movable)
                || c.velocity.x != 0.0
                || c.velocity.y != 0.0
        });
    }

    /// A chunk that settled into an all-solid-or-AIR, zero-velocity state can
    /// be marked inactive directly (used by the physics sweep once a chunk
    /// produces no movement for a tick).
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
        self.dirty_rect = None;
    }

    /// Clears the UPDATED flag on every cell. Called on every resident chunk
    /// at the start of a tick, out-of-line from the per-cell dispatch so the
    /// whole-grid reset stays a single cheap pass.
    pub fn clear_updated_flags(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.clear_updated();
        }
    }

    pub fn cells(&self) -> &[Cell; CHUNK_AREA] {
        &self.cells
    }

    /// True if any cell in the chunk still carries the UPDATED flag (used as
    /// a debug/test assertion, not by the physics loop itself — the physics
    /// loop tracks UPDATED out-of-line in a world-sized scratch grid).
    #[cfg(test)]
    pub fn any_cell_flagged(&self, flag: CellFlags) -> bool {
        self.cells.iter().any(|c| c.flags.contains(flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellforge_materials::material_ids;

    #[test]
    fn new_chunk_is_all_air_and_inactive() {
        let chunk = Chunk::new(2, -3);
        assert_eq!(chunk.x, 2);
        assert_eq!(chunk.y, -3);
        assert!(chunk.get_cell(0, 0).is_air());
        assert!(!chunk.is_active());
        assert!(!chunk.dirty);
    }

    #[test]
    fn set_cell_marks_dirty_and_active() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_cell(
            10,
            20,
            Cell {
                material: material_ids::SAND,
                ..Cell::AIR
            },
        );
        assert!(chunk.dirty);
        assert!(chunk.is_active());
        assert_eq!(chunk.get_cell(10, 20).material, material_ids::SAND);
        let rect = chunk.dirty_rect.unwrap();
        assert_eq!((rect.min_x, rect.min_y), (10, 20));
    }

    #[test]
    fn clear_dirty_resets_rect() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_cell(1, 1, Cell::AIR);
        chunk.clear_dirty();
        assert!(!chunk.dirty);
        assert!(chunk.dirty_rect.is_none());
    }
}
