//! Stateless simulation rules: per-cell decision functions and the per-tick
//! dispatcher that applies them across the active chunk set.

pub mod cell_processor;
pub mod cellular_physics;

pub use cellular_physics::{
    apply_force_field, create_explosion, create_heat_source, tick, TickReport,
};
