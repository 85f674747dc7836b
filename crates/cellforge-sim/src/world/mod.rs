//! World management — chunks, the sparse chunk manager, generation
//! templates, and the façade tying them to the simulation dispatcher.

mod chunk;
mod chunk_manager;
pub mod generation;
pub mod rng_trait;
pub mod stats;
#[allow(clippy::module_inception)]
mod world;

pub use chunk::{Chunk, DirtyRect};
pub use chunk_manager::{ChunkManager, Rect};
pub use generation::{WorldGenerator, WorldTemplate};
pub use rng_trait::WorldRng;
pub use stats::SimulationStats;
pub use world::World;
