//! Chunked cellular-automaton physics engine.
//!
//! [`world::World`] is the entry point: it owns the material registry, the
//! sparse chunk store, and drives the per-tick dispatch in [`simulation`].

pub mod simulation;
pub mod world;

pub use cellforge_materials::{
    material_ids, Cell, CellFlags, MaterialCategory, MaterialDef, MaterialFlags, MaterialId,
    MaterialRegistry, MaterialType, Reaction, StateChange, Velocity, CHUNK_AREA, CHUNK_SIZE,
};
pub use world::{Chunk, ChunkManager, Rect, SimulationStats, World, WorldGenerator, WorldTemplate};
