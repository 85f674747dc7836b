//! The per-site cell payload and chunk sizing constants.

use crate::material::{ids, MaterialId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Cells are grouped into fixed `CHUNK_SIZE` x `CHUNK_SIZE` chunks; this is
/// the unit of scheduling for the active-chunk set.
pub const CHUNK_SIZE: usize = 64;
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CellFlags: u16 {
        /// Already visited this tick; excludes the cell from re-dispatch.
        const UPDATED = 1 << 0;
        const BURNING = 1 << 1;
        const FROZEN = 1 << 2;
        const PRESSURIZED = 1 << 3;
        const DISSOLVING = 1 << 4;
    }
}

/// A 2-component advisory velocity. Primarily driven by force/explosion
/// effects rather than the movement rules themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// Fixed-layout, trivially-copyable value describing one grid site.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Cell {
    pub material: MaterialId,
    pub temperature: f32,
    pub velocity: Velocity,
    pub pressure: f32,
    pub health: f32,
    pub lifetime: u16,
    pub energy: f32,
    pub charge: f32,
    pub metadata: u8,
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self::AIR
    }
}

impl Cell {
    pub const AIR: Cell = Cell {
        material: ids::AIR,
        temperature: 20.0,
        velocity: Velocity { x: 0.0, y: 0.0 },
        pressure: 1.0,
        health: 1.0,
        lifetime: 0,
        energy: 0.0,
        charge: 0.0,
        metadata: 0,
        flags: CellFlags::empty(),
    };

    pub fn is_air(&self) -> bool {
        self.material == ids::AIR
    }

    pub fn is_updated(&self) -> bool {
        self.flags.contains(CellFlags::UPDATED)
    }

    pub fn mark_updated(&mut self) {
        self.flags.insert(CellFlags::UPDATED);
    }

    pub fn clear_updated(&mut self) {
        self.flags.remove(CellFlags::UPDATED);
    }
}
