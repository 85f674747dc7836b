//! Material registry and cell data model for the cellforge simulation engine.
//!
//! This crate provides the foundational, simulation-agnostic data types:
//! - The cell payload (`Cell`, `CellFlags`, chunk sizing constants)
//! - Material definitions and the append-only registry (`MaterialDef`, `MaterialRegistry`)
//! - Reaction and state-change rule tables, bundled onto `MaterialDef`

mod cell;
mod error;
mod material;

pub use cell::{CellFlags, Velocity, Cell, CHUNK_AREA, CHUNK_SIZE};
pub use error::WorldError;
pub use material::{
    ids as material_ids, MaterialCategory, MaterialDef, MaterialFlags, MaterialId,
    MaterialRegistry, MaterialType, Reaction, StateChange,
};
