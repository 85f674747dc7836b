//! Construction-time errors. Per-tick/per-access failures never surface as
//! `Result`s — they degrade to AIR or become no-ops (see the crate docs on
//! `World::get_cell`/`World::set_cell`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("world dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },
}
