//! The per-tick dispatcher: walks the active chunk set and applies
//! type-specific movement, heat-transfer and reaction rules to every cell
//! exactly once.

use glam::{IVec2, Vec2};

use cellforge_materials::{material_ids, Cell, MaterialRegistry, MaterialType, CHUNK_SIZE};

use super::cell_processor;
use crate::world::chunk_manager::ChunkManager;
use crate::world::rng_trait::WorldRng;

/// Counts accumulated over one `tick` call, folded into `SimulationStats` by
/// the world façade.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickReport {
    pub cells_processed: usize,
    pub moves: usize,
    pub reactions: usize,
    pub state_changes: usize,
}

/// Runs one simulation step over every chunk in `chunk_manager`'s active set.
///
/// The active set is read once at the top (frozen for the duration of the
/// tick, per spec): chunks first activated by a write during this tick are
/// not walked until the caller rebuilds the active set for the next one.
pub fn tick(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    dt: f32,
    rng: &mut dyn WorldRng,
) -> TickReport {
    let mut report = TickReport::default();

    for chunk in chunk_manager.chunks.values_mut() {
        chunk.clear_updated_flags();
    }

    let active: Vec<IVec2> = chunk_manager.active_chunk_coords().copied().collect();

    for chunk_coord in active {
        for local_y in (0..CHUNK_SIZE).rev() {
            for local_x in 0..CHUNK_SIZE {
                let (wx, wy) =
                    ChunkManager::chunk_to_world_coords(chunk_coord, local_x, local_y);
                let pos = IVec2::new(wx, wy);

                let cell = chunk_manager.get_cell(pos.x, pos.y);
                if cell.is_updated() || cell.is_air() {
                    continue;
                }
                report.cells_processed += 1;

                let final_pos = dispatch_movement(chunk_manager, registry, rng, pos, &mut report);
                apply_heat_and_reactions(chunk_manager, registry, dt, rng, final_pos, &mut report);
            }
        }
    }

    report
}

fn dispatch_movement(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    rng: &mut dyn WorldRng,
    pos: IVec2,
    report: &mut TickReport,
) -> IVec2 {
    let cell = chunk_manager.get_cell(pos.x, pos.y);
    let mat = registry.get(cell.material);

    let final_pos = match mat.material_type {
        MaterialType::Solid | MaterialType::Special | MaterialType::Empty => pos,
        MaterialType::Powder => update_powder(chunk_manager, registry, rng, pos),
        MaterialType::Liquid => update_liquid(chunk_manager, registry, rng, pos),
        MaterialType::Gas => update_gas(chunk_manager, registry, rng, pos),
        MaterialType::Fire => update_fire(chunk_manager, registry, rng, pos),
    };
    if final_pos != pos {
        report.moves += 1;
    }
    final_pos
}

/// Attempts to move (or displacement-swap) the cell at `from` into `to`.
/// Returns true and mutates the grid on success; leaves the grid untouched
/// on failure. Both participant cells are marked UPDATED on success.
fn attempt_move(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    from: IVec2,
    to: IVec2,
) -> bool {
    // The world edge behaves like a solid wall: a target outside the
    // chunk manager's bounds reads as AIR (so `can_move` would otherwise
    // happily approve the move), but writing there is silently dropped —
    // without this check the source cell would still be cleared, destroying
    // the cell instead of stopping it at the boundary.
    if !chunk_manager.in_bounds(to.x, to.y) {
        return false;
    }
    let src = chunk_manager.get_cell(from.x, from.y);
    let tgt = chunk_manager.get_cell(to.x, to.y);
    if !cell_processor::can_move(registry, &src, &tgt) {
        return false;
    }
    let mut new_tgt = src;
    let mut new_src = tgt;
    new_tgt.mark_updated();
    new_src.mark_updated();
    chunk_manager.set_cell(to.x, to.y, new_tgt);
    chunk_manager.set_cell(from.x, from.y, new_src);
    true
}

fn update_powder(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    rng: &mut dyn WorldRng,
    pos: IVec2,
) -> IVec2 {
    let down = pos + IVec2::new(0, 1);
    if attempt_move(chunk_manager, registry, pos, down) {
        return down;
    }
    let first_dx = if rng.gen_bool() { -1 } else { 1 };
    for dx in [first_dx, -first_dx] {
        let diag = pos + IVec2::new(dx, 1);
        if attempt_move(chunk_manager, registry, pos, diag) {
            return diag;
        }
    }
    pos
}

fn update_gas(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    rng: &mut dyn WorldRng,
    pos: IVec2,
) -> IVec2 {
    update_buoyant(chunk_manager, registry, rng, pos, -1, true)
}

fn update_fire(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    rng: &mut dyn WorldRng,
    pos: IVec2,
) -> IVec2 {
    // Fire rises like a gas but does not disperse horizontally; the flame
    // front spreads by igniting neighbors (see `apply_heat_and_reactions`),
    // not by occupying space sideways.
    update_buoyant(chunk_manager, registry, rng, pos, -1, false)
}

/// Shared kinematics for the two classes that move against a fixed vertical
/// `dir` (-1 = up, +1 = down): straight, then diagonals (random side first),
/// then an optional horizontal dispersion search.
fn update_buoyant(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    rng: &mut dyn WorldRng,
    pos: IVec2,
    dir: i32,
    horizontal_dispersion: bool,
) -> IVec2 {
    let straight = pos + IVec2::new(0, dir);
    if attempt_move(chunk_manager, registry, pos, straight) {
        return straight;
    }
    let first_dx = if rng.gen_bool() { -1 } else { 1 };
    for dx in [first_dx, -first_dx] {
        let diag = pos + IVec2::new(dx, dir);
        if attempt_move(chunk_manager, registry, pos, diag) {
            return diag;
        }
    }
    if !horizontal_dispersion {
        return pos;
    }
    disperse_horizontally(chunk_manager, registry, rng, pos, first_dx)
}

fn update_liquid(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    rng: &mut dyn WorldRng,
    pos: IVec2,
) -> IVec2 {
    update_buoyant(chunk_manager, registry, rng, pos, 1, true)
}

/// Horizontal flow phase, shared by liquids and gases: searches outward up
/// to the material's viscosity-scaled dispersion range in each direction,
/// moving into the first cell found that the mover can enter. The random
/// first-side choice removes the directional bias a fixed left-or-right scan
/// would otherwise produce.
fn disperse_horizontally(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    _rng: &mut dyn WorldRng,
    pos: IVec2,
    first_dx: i32,
) -> IVec2 {
    let cell = chunk_manager.get_cell(pos.x, pos.y);
    let mat = registry.get(cell.material);
    let dispersion = effective_dispersion(mat.dispersion, mat.viscosity);

    for dx in [first_dx, -first_dx] {
        for step in 1..=dispersion {
            let target = pos + IVec2::new(dx * step as i32, 0);
            let tgt_cell = chunk_manager.get_cell(target.x, target.y);
            if !tgt_cell.is_air() && registry.get(tgt_cell.material).material_type == MaterialType::Solid {
                break;
            }
            if attempt_move(chunk_manager, registry, pos, target) {
                return target;
            }
            if tgt_cell.is_air() {
                break;
            }
        }
    }
    pos
}

fn effective_dispersion(dispersion: u32, viscosity: f32) -> u32 {
    let scaled = dispersion as f32 * (1.0 - viscosity.clamp(0.0, 1.0) * 0.8);
    scaled.round().max(1.0) as u32
}

const NEIGHBOR_OFFSETS: [IVec2; 4] = [
    IVec2::new(0, -1),
    IVec2::new(0, 1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
];

/// Heat transfer, temperature-triggered state change, and pairwise reaction
/// attempts against the 4-neighborhood of `pos`. Movement has already been
/// resolved by the time this runs, so `pos` is wherever the mover ended up
/// this tick.
fn apply_heat_and_reactions(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    dt: f32,
    rng: &mut dyn WorldRng,
    pos: IVec2,
    report: &mut TickReport,
) {
    let mut self_cell = chunk_manager.get_cell(pos.x, pos.y);
    if self_cell.is_air() {
        return;
    }
    self_cell.mark_updated();

    for offset in NEIGHBOR_OFFSETS {
        let npos = pos + offset;
        let mut neighbor = chunk_manager.get_cell(npos.x, npos.y);

        cell_processor::transfer_heat(registry, &mut self_cell, &mut neighbor, dt);

        // Same-material LIQUID/GAS neighbors with a meaningful pressure
        // delta equalize by swapping pressure (position is irrelevant since
        // the material is identical either way). `should_swap`'s other
        // clause (density-driven displacement) is already handled by the
        // movement pass above, so only the matching-material branch can fire
        // here.
        if self_cell.material == neighbor.material
            && cell_processor::should_swap(registry, &self_cell, &neighbor)
        {
            std::mem::swap(&mut self_cell.pressure, &mut neighbor.pressure);
        }

        if cell_processor::can_react(registry, &self_cell, &neighbor)
            && cell_processor::process_potential_reaction(registry, &mut self_cell, &mut neighbor, dt, rng)
        {
            self_cell.mark_updated();
            neighbor.mark_updated();
            report.reactions += 1;
        }

        chunk_manager.set_cell(npos.x, npos.y, neighbor);
    }

    let prior_material = self_cell.material;
    if cell_processor::check_state_change_by_temperature(registry, &mut self_cell) {
        report.state_changes += 1;
    } else {
        cell_processor::process_state_change(registry, &mut self_cell, dt, rng);
        if self_cell.material != prior_material {
            report.state_changes += 1;
        }
    }

    chunk_manager.set_cell(pos.x, pos.y, self_cell);
}

/// Damages cells within `radius` of `(x, y)` in proportion to `power`,
/// applies outward radial velocity, ignites flammables, and converts the
/// cells nearest the center to Fire once `power` clears the ignition
/// threshold.
pub fn create_explosion(
    chunk_manager: &mut ChunkManager,
    registry: &MaterialRegistry,
    x: i32,
    y: i32,
    radius: i32,
    power: f32,
) {
    const IGNITION_POWER_THRESHOLD: f32 = 5.0;
    if radius <= 0 {
        return;
    }
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist = ((dx * dx + dy * dy) as f32).sqrt();
            if dist > radius as f32 {
                continue;
            }
            let px = x + dx;
            let py = y + dy;
            let mut cell = chunk_manager.get_cell(px, py);
            if cell.is_air() {
                continue;
            }
            let falloff = 1.0 - dist / radius as f32;
            cell_processor::damage(&mut cell, power * falloff);
            if !cell.is_air() {
                let (nx, ny) = if dist > 0.0 {
                    (dx as f32 / dist, dy as f32 / dist)
                } else {
                    (0.0, -1.0)
                };
                cell_processor::apply_velocity(&mut cell, nx * power, ny * power);
                cell_processor::apply_pressure(&mut cell, power * falloff * 0.1);

                let mat = registry.get(cell.material);
                if mat.flammable {
                    cell_processor::ignite(&mut cell, mat);
                } else if power >= IGNITION_POWER_THRESHOLD && dist < radius as f32 * 0.3 {
                    cell.material = material_ids::FIRE;
                    let fire_mat = registry.get(material_ids::FIRE);
                    cell.lifetime = fire_mat.lifetime.unwrap_or(40);
                    cell.temperature = cell.temperature.max(600.0);
                    cell.flags.insert(cellforge_materials::CellFlags::BURNING);
                }
            }
            chunk_manager.set_cell(px, py, cell);
        }
    }
}

/// Pushes every cell within `radius` of `(x, y)` toward temperature `target`
/// by linear falloff, for this call only (not a persistent heat emitter).
pub fn create_heat_source(
    chunk_manager: &mut ChunkManager,
    x: i32,
    y: i32,
    target: f32,
    radius: i32,
) {
    if radius <= 0 {
        return;
    }
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist = ((dx * dx + dy * dy) as f32).sqrt();
            if dist > radius as f32 {
                continue;
            }
            let px = x + dx;
            let py = y + dy;
            let mut cell = chunk_manager.get_cell(px, py);
            let falloff = 1.0 - dist / radius as f32;
            cell.temperature += (target - cell.temperature) * falloff;
            chunk_manager.set_cell(px, py, cell);
        }
    }
}

/// Additive velocity modification within `radius` of `(x, y)`, along `dir`
/// scaled by `strength` and the same linear falloff used by the other
/// effects.
pub fn apply_force_field(
    chunk_manager: &mut ChunkManager,
    x: i32,
    y: i32,
    dir: Vec2,
    strength: f32,
    radius: i32,
) {
    if radius <= 0 {
        return;
    }
    let dir = dir.normalize_or_zero();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist = ((dx * dx + dy * dy) as f32).sqrt();
            if dist > radius as f32 {
                continue;
            }
            let px = x + dx;
            let py = y + dy;
            let mut cell = chunk_manager.get_cell(px, py);
            if cell.is_air() {
                continue;
            }
            let falloff = 1.0 - dist / radius as f32;
            cell_processor::apply_velocity(&mut cell, dir.x * strength * falloff, dir.y * strength * falloff);
            chunk_manager.set_cell(px, py, cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellforge_materials::{material_ids, Cell, MaterialRegistry};
    use rand::{rngs::StdRng, SeedableRng};

    fn registry() -> MaterialRegistry {
        let mut r = MaterialRegistry::new();
        r.register_basic_materials();
        r
    }

    #[test]
    fn sand_stops_at_the_world_edge_instead_of_vanishing() {
        let registry = registry();
        let mut chunk_manager = ChunkManager::with_bounds(16, 16);
        chunk_manager.set_cell(
            8,
            0,
            Cell {
                material: registry.sand(),
                ..Cell::AIR
            },
        );
        chunk_manager.update_active_chunks(crate::world::chunk_manager::Rect::new(0, 0, 16, 16));

        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..30 {
            tick(&mut chunk_manager, &registry, 0.05, &mut rng);
            chunk_manager.recompute_chunk_activity(&registry);
            chunk_manager.update_active_chunks(crate::world::chunk_manager::Rect::new(0, 0, 16, 16));
        }

        assert_eq!(chunk_manager.get_cell(8, 15).material, registry.sand());
    }

    #[test]
    fn sand_falls_to_the_floor() {
        let registry = registry();
        let mut chunk_manager = ChunkManager::new();
        chunk_manager.set_cell(
            8,
            0,
            Cell {
                material: registry.sand(),
                ..Cell::AIR
            },
        );
        for x in 0..16 {
            chunk_manager.set_cell(
                x,
                15,
                Cell {
                    material: registry.stone(),
                    ..Cell::AIR
                },
            );
        }
        chunk_manager.update_active_chunks(crate::world::chunk_manager::Rect::new(0, 0, 16, 16));

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            tick(&mut chunk_manager, &registry, 0.05, &mut rng);
            chunk_manager.recompute_chunk_activity(&registry);
            chunk_manager.update_active_chunks(crate::world::chunk_manager::Rect::new(0, 0, 16, 16));
        }

        assert_eq!(chunk_manager.get_cell(8, 14).material, registry.sand());
        assert!(chunk_manager.get_cell(8, 0).is_air());
    }

    #[test]
    fn no_cell_is_visited_twice_in_one_tick() {
        let registry = registry();
        let mut chunk_manager = ChunkManager::new();
        for x in 0..16 {
            for y in 0..8 {
                chunk_manager.set_cell(
                    x,
                    y,
                    Cell {
                        material: registry.water(),
                        ..Cell::AIR
                    },
                );
            }
        }
        chunk_manager.update_active_chunks(crate::world::chunk_manager::Rect::new(0, 0, 16, 16));
        let mut rng = StdRng::seed_from_u64(3);
        let report = tick(&mut chunk_manager, &registry, 0.05, &mut rng);
        assert_eq!(report.cells_processed, 16 * 8);
    }

    #[test]
    fn explosion_damages_and_converts_center() {
        let registry = registry();
        let mut chunk_manager = ChunkManager::new();
        for dx in -3..=3 {
            for dy in -3..=3 {
                chunk_manager.set_cell(
                    dx,
                    dy,
                    Cell {
                        material: registry.wood(),
                        health: 1.0,
                        ..Cell::AIR
                    },
                );
            }
        }
        create_explosion(&mut chunk_manager, &registry, 0, 0, 3, 10.0);
        assert!(chunk_manager.get_cell(0, 0).health < 1.0 || chunk_manager.get_cell(0, 0).material != registry.wood());
    }

    #[test]
    fn heat_source_warms_cells_toward_target() {
        let registry = registry();
        let mut chunk_manager = ChunkManager::new();
        chunk_manager.set_cell(
            0,
            0,
            Cell {
                material: registry.stone(),
                temperature: 20.0,
                ..Cell::AIR
            },
        );
        create_heat_source(&mut chunk_manager, 0, 0, 500.0, 3);
        assert!(chunk_manager.get_cell(0, 0).temperature > 20.0);
    }
}
