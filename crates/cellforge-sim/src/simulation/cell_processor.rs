//! Stateless decision functions over pairs of cells: movement eligibility,
//! reactions, state changes and heat transfer. Mutators live here too so the
//! dispatcher in `cellular_physics` stays declarative.

use cellforge_materials::{
    material_ids, Cell, CellFlags, MaterialDef, MaterialId, MaterialRegistry, MaterialType,
};

use crate::world::rng_trait::WorldRng;

/// True when `source` is allowed to move into `target`'s site.
///
/// The source material must be movable, and one of:
/// - the target is AIR, or
/// - both are LIQUID/POWDER and source is strictly denser, or
/// - both are GAS and source is strictly denser.
///
/// Fire is never movable by this function — it "displaces" via
/// `can_displace` instead, since burning through a flammable isn't a density
/// comparison.
pub fn can_move(registry: &MaterialRegistry, source: &Cell, target: &Cell) -> bool {
    let src_mat = registry.get(source.material);
    if !src_mat.movable {
        return false;
    }
    if target.is_air() {
        return true;
    }
    let tgt_mat = registry.get(target.material);
    match (src_mat.material_type, tgt_mat.material_type) {
        (MaterialType::Liquid, MaterialType::Liquid)
        | (MaterialType::Liquid, MaterialType::Powder)
        | (MaterialType::Powder, MaterialType::Liquid)
        | (MaterialType::Powder, MaterialType::Powder) => src_mat.density > tgt_mat.density,
        (MaterialType::Gas, MaterialType::Gas) => src_mat.density > tgt_mat.density,
        _ => false,
    }
}

/// Wraps `can_move`, additionally allowing Fire to "displace" (ignite) any
/// flammable target.
pub fn can_displace(registry: &MaterialRegistry, mover: &Cell, target: &Cell) -> bool {
    if can_move(registry, mover, target) {
        return true;
    }
    let mover_mat = registry.get(mover.material);
    if mover_mat.material_type == MaterialType::Fire && !target.is_air() {
        return registry.get(target.material).flammable;
    }
    false
}

/// If both cells share a material and are LIQUID/GAS with a meaningful
/// pressure difference, they should swap to equalize pressure. Otherwise
/// swap iff either side can displace the other.
pub fn should_swap(registry: &MaterialRegistry, a: &Cell, b: &Cell) -> bool {
    if a.material == b.material {
        let mat = registry.get(a.material);
        if matches!(mat.material_type, MaterialType::Liquid | MaterialType::Gas)
            && (a.pressure - b.pressure).abs() > 0.1
        {
            return true;
        }
    }
    can_displace(registry, a, b) || can_displace(registry, b, a)
}

/// True if `a` and `b` have an applicable reaction: an explicit rule on
/// either side, Fire-touches-flammable, Water-touches-Fire, or
/// Acid-touches-Solid. Symmetric.
pub fn can_react(registry: &MaterialRegistry, a: &Cell, b: &Cell) -> bool {
    if a.is_air() && b.is_air() {
        return false;
    }
    let a_mat = registry.get(a.material);
    let b_mat = registry.get(b.material);
    has_reaction_rule(a_mat, b.material)
        || has_reaction_rule(b_mat, a.material)
        || is_fire_flammable_pair(a_mat, b_mat)
        || is_water_fire_pair(a_mat, b_mat)
        || is_acid_solid_pair(a_mat, b_mat)
}

fn has_reaction_rule(mat: &MaterialDef, other: MaterialId) -> bool {
    mat.reactions.iter().any(|r| r.reactant_material == other)
}

fn is_fire_flammable_pair(a: &MaterialDef, b: &MaterialDef) -> bool {
    (a.material_type == MaterialType::Fire && b.flammable)
        || (b.material_type == MaterialType::Fire && a.flammable)
}

fn is_water_fire_pair(a: &MaterialDef, b: &MaterialDef) -> bool {
    (a.name == "water" && b.material_type == MaterialType::Fire)
        || (b.name == "water" && a.material_type == MaterialType::Fire)
}

fn is_acid_solid_pair(a: &MaterialDef, b: &MaterialDef) -> bool {
    (a.is_acid() && b.material_type == MaterialType::Solid)
        || (b.is_acid() && a.material_type == MaterialType::Solid)
}

/// Rolls and applies every applicable reaction between `a` and `b`. Returns
/// true if either cell mutated. Explicit rules from the material definitions
/// are tried first; the built-in Fire/Water/Acid defaults only apply when no
/// explicit rule fired between this pair.
pub fn process_potential_reaction(
    registry: &MaterialRegistry,
    a: &mut Cell,
    b: &mut Cell,
    dt: f32,
    rng: &mut dyn WorldRng,
) -> bool {
    if try_explicit_reactions(registry, a, b, dt, rng) {
        return true;
    }
    if try_explicit_reactions(registry, b, a, dt, rng) {
        return true;
    }

    let a_mat = registry.get(a.material);
    let b_mat = registry.get(b.material);

    if is_fire_flammable_pair(a_mat, b_mat) {
        let fuel = if a_mat.material_type == MaterialType::Fire {
            &mut *b
        } else {
            &mut *a
        };
        let fuel_mat = registry.get(fuel.material);
        if rng.check_probability(fuel_mat.flammability * dt * 5.0) {
            ignite(fuel, fuel_mat);
            return true;
        }
        return false;
    }

    if is_water_fire_pair(a_mat, b_mat) {
        let (water, fire) = if a_mat.name == "water" {
            (&mut *a, &mut *b)
        } else {
            (&mut *b, &mut *a)
        };
        if rng.check_probability(0.8 * dt * 10.0) {
            extinguish(fire);
            water.temperature += 20.0;
            return true;
        }
        return false;
    }

    if is_acid_solid_pair(a_mat, b_mat) {
        let solid = if a_mat.material_type == MaterialType::Solid {
            &mut *a
        } else {
            &mut *b
        };
        if rng.check_probability(0.2 * dt * 5.0) {
            dissolve(solid, 0.2 * dt * 5.0);
            return true;
        }
        return false;
    }

    false
}

fn try_explicit_reactions(
    registry: &MaterialRegistry,
    actor: &mut Cell,
    reactant: &mut Cell,
    dt: f32,
    rng: &mut dyn WorldRng,
) -> bool {
    let rules = &registry.get(actor.material).reactions;
    for rule in rules {
        if rule.reactant_material != reactant.material {
            continue;
        }
        if rng.check_probability(rule.probability * dt * 10.0) {
            actor.material = rule.result_material;
            actor.clear_updated();
            actor.mark_updated();
            if let Some(byproduct) = rule.byproduct {
                reactant.material = byproduct;
            }
            if let Some(energy) = rule.energy_release {
                actor.temperature += energy;
                reactant.temperature += energy;
            }
            return true;
        }
    }
    false
}

/// Decrements `lifetime` for ephemeral materials; at zero, Fire becomes
/// Smoke (temperature capped to at least 100C, BURNING cleared) and GAS
/// becomes AIR. Then rolls each state-change rule in turn.
pub fn process_state_change(
    registry: &MaterialRegistry,
    cell: &mut Cell,
    dt: f32,
    rng: &mut dyn WorldRng,
) {
    let mat = registry.get(cell.material).clone();
    if mat.lifetime.is_some() && cell.lifetime > 0 {
        cell.lifetime -= 1;
        if cell.lifetime == 0 {
            match mat.material_type {
                MaterialType::Fire => {
                    cell.material = registry.id_of("smoke");
                    cell.temperature = cell.temperature.max(100.0);
                    cell.flags.remove(CellFlags::BURNING);
                    return;
                }
                MaterialType::Gas => {
                    *cell = Cell::AIR;
                    return;
                }
                _ => {}
            }
        }
    }

    for rule in &mat.state_changes {
        let crossed = if rule.temperature_threshold >= 0.0 {
            cell.temperature >= rule.temperature_threshold
        } else {
            cell.temperature <= -rule.temperature_threshold
        };
        if crossed && rng.check_probability(rule.probability * dt * 5.0) {
            let temp = cell.temperature;
            if rule.temperature_threshold < 0.0 {
                freeze(cell, rule.target_material);
            } else {
                melt(cell, rule.target_material);
            }
            cell.temperature = temp;
            return;
        }
    }
}

/// Symmetric heat exchange: `transfer = (T_src - T_dst) * min(k_src, k_dst) *
/// dt * 0.1`, scaled down by each side's own specific heat. Skipped if
/// either cell is AIR or the temperature difference is negligible.
pub fn transfer_heat(registry: &MaterialRegistry, src: &mut Cell, dst: &mut Cell, dt: f32) {
    if src.is_air() || dst.is_air() {
        return;
    }
    let diff = src.temperature - dst.temperature;
    if diff.abs() < 0.1 {
        return;
    }
    let src_mat = registry.get(src.material);
    let dst_mat = registry.get(dst.material);
    let k = src_mat.thermal_conductivity.min(dst_mat.thermal_conductivity);
    let transfer = diff * k * dt * 0.1;
    src.temperature -= transfer / src_mat.specific_heat.max(0.1);
    dst.temperature += transfer / dst_mat.specific_heat.max(0.1);
}

/// Direct (non-probabilistic) temperature-triggered transition: fires
/// immediately once a cell is past a state-change threshold, and separately
/// ignites any flammable material once it clears its ignition point.
/// Returns true if the cell's material changed.
pub fn check_state_change_by_temperature(registry: &MaterialRegistry, cell: &mut Cell) -> bool {
    let mat = registry.get(cell.material).clone();
    if mat.flammable {
        if let Some(ignition) = mat.ignition_point {
            if cell.temperature >= ignition {
                ignite(cell, &mat);
                return true;
            }
        }
    }
    for rule in &mat.state_changes {
        // "Deep past" scales the magnitude, not the signed threshold value
        // directly: for a negative (low-temp) rule the threshold's magnitude
        // is the point the cell must fall *below*, so deep-past means a
        // smaller magnitude (closer to it from the cold side), not a larger
        // negative number.
        let crossed = if rule.temperature_threshold >= 0.0 {
            cell.temperature >= rule.temperature_threshold * 1.5
        } else {
            cell.temperature <= -rule.temperature_threshold * 0.5
        };
        if crossed {
            let temp = cell.temperature;
            if rule.temperature_threshold < 0.0 {
                freeze(cell, rule.target_material);
            } else {
                melt(cell, rule.target_material);
            }
            cell.temperature = temp;
            return true;
        }
    }
    false
}

pub fn ignite(cell: &mut Cell, fuel_mat: &MaterialDef) {
    cell.material = material_ids::FIRE;
    cell.lifetime = (fuel_mat.flammability * 200.0) as u16;
    cell.temperature = cell.temperature.max(500.0);
    cell.flags.insert(CellFlags::BURNING);
}

pub fn extinguish(fire_cell: &mut Cell) {
    fire_cell.material = material_ids::SMOKE;
    fire_cell.flags.remove(CellFlags::BURNING);
}

pub fn freeze(cell: &mut Cell, target: MaterialId) {
    cell.material = target;
    cell.flags.insert(CellFlags::FROZEN);
}

pub fn melt(cell: &mut Cell, target: MaterialId) {
    cell.material = target;
    cell.flags.remove(CellFlags::FROZEN);
}

pub fn dissolve(cell: &mut Cell, rate: f32) {
    cell.flags.insert(CellFlags::DISSOLVING);
    damage(cell, rate);
}

pub fn damage(cell: &mut Cell, amount: f32) {
    cell.health -= amount;
    if cell.health <= 0.0 {
        *cell = Cell::AIR;
    }
}

pub fn apply_velocity(cell: &mut Cell, dx: f32, dy: f32) {
    cell.velocity.x += dx;
    cell.velocity.y += dy;
}

pub fn apply_pressure(cell: &mut Cell, amount: f32) {
    cell.pressure += amount;
    if cell.pressure > 1.1 {
        cell.flags.insert(CellFlags::PRESSURIZED);
    } else {
        cell.flags.remove(CellFlags::PRESSURIZED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::rng_trait::WorldRng;
    use cellforge_materials::{material_ids, MaterialRegistry, Velocity};

    struct AlwaysRng(f32);
    impl WorldRng for AlwaysRng {
        fn gen_bool(&mut self) -> bool {
            true
        }
        fn gen_f32(&mut self) -> f32 {
            self.0
        }
    }

    fn registry() -> MaterialRegistry {
        let mut r = MaterialRegistry::new();
        r.register_basic_materials();
        r
    }

    fn cell_of(material: MaterialId) -> Cell {
        Cell {
            material,
            ..Cell::AIR
        }
    }

    #[test]
    fn sand_can_move_into_air() {
        let registry = registry();
        let sand = cell_of(registry.sand());
        assert!(can_move(&registry, &sand, &Cell::AIR));
    }

    #[test]
    fn stone_cannot_move_anywhere() {
        let registry = registry();
        let stone = cell_of(registry.stone());
        assert!(!can_move(&registry, &stone, &Cell::AIR));
    }

    #[test]
    fn denser_liquid_displaces_lighter_liquid() {
        let registry = registry();
        let lava = cell_of(registry.lava());
        let water = cell_of(registry.water());
        assert!(can_move(&registry, &lava, &water));
        assert!(!can_move(&registry, &water, &lava));
    }

    #[test]
    fn fire_displaces_flammable_but_not_via_can_move() {
        let registry = registry();
        let fire = cell_of(registry.fire());
        let wood = cell_of(registry.wood());
        assert!(!can_move(&registry, &fire, &wood));
        assert!(can_displace(&registry, &fire, &wood));
    }

    #[test]
    fn fire_ignites_flammable_neighbor_with_high_roll() {
        let registry = registry();
        let mut fire = cell_of(registry.fire());
        let mut wood = cell_of(registry.wood());
        let mut rng = AlwaysRng(0.0);
        assert!(process_potential_reaction(
            &registry, &mut fire, &mut wood, 1.0, &mut rng
        ));
        assert_eq!(wood.material, registry.fire());
        assert!(wood.flags.contains(CellFlags::BURNING));
    }

    #[test]
    fn water_extinguishes_fire_and_warms() {
        let registry = registry();
        let mut water = cell_of(registry.water());
        let mut fire = cell_of(registry.fire());
        let starting_temp = water.temperature;
        let mut rng = AlwaysRng(0.0);
        assert!(process_potential_reaction(
            &registry, &mut water, &mut fire, 1.0, &mut rng
        ));
        assert_eq!(fire.material, registry.smoke());
        assert!(water.temperature > starting_temp);
    }

    #[test]
    fn heat_transfer_moves_toward_equilibrium_without_overshoot() {
        let registry = registry();
        let mut hot = Cell {
            material: registry.stone(),
            temperature: 100.0,
            ..Cell::AIR
        };
        let mut cold = Cell {
            material: registry.stone(),
            temperature: 0.0,
            ..Cell::AIR
        };
        transfer_heat(&registry, &mut hot, &mut cold, 0.1);
        assert!(hot.temperature < 100.0);
        assert!(cold.temperature > 0.0);
        assert!(hot.temperature > cold.temperature);
    }

    #[test]
    fn heat_transfer_skips_air() {
        let registry = registry();
        let mut air = Cell::AIR;
        let mut stone = cell_of(registry.stone());
        stone.temperature = 500.0;
        transfer_heat(&registry, &mut air, &mut stone, 1.0);
        assert_eq!(stone.temperature, 500.0);
    }

    #[test]
    fn velocity_field_is_advisory_and_additive() {
        let mut cell = Cell {
            velocity: Velocity { x: 1.0, y: 0.0 },
            ..Cell::AIR
        };
        apply_velocity(&mut cell, 2.0, 3.0);
        assert_eq!(cell.velocity.x, 3.0);
        assert_eq!(cell.velocity.y, 3.0);
    }

    #[test]
    fn same_material_liquids_should_swap_on_pressure_delta() {
        let registry = registry();
        let a = Cell {
            material: registry.water(),
            pressure: 2.0,
            ..Cell::AIR
        };
        let b = Cell {
            material: registry.water(),
            pressure: 1.0,
            ..Cell::AIR
        };
        assert!(should_swap(&registry, &a, &b));
    }

    #[test]
    fn same_material_liquids_with_close_pressure_do_not_swap() {
        let registry = registry();
        let a = Cell {
            material: registry.water(),
            pressure: 1.0,
            ..Cell::AIR
        };
        let b = Cell {
            material: registry.water(),
            pressure: 1.05,
            ..Cell::AIR
        };
        assert!(!should_swap(&registry, &a, &b));
    }

    #[test]
    fn acid_touching_solid_dissolves_it() {
        let registry = registry();
        let mut acid = Cell {
            material: registry.register(MaterialDef {
                name: "acid".to_string(),
                material_type: MaterialType::Liquid,
                ..Default::default()
            }),
            ..Cell::AIR
        };
        let mut stone = Cell {
            material: registry.stone(),
            health: 1.0,
            ..Cell::AIR
        };
        let mut rng = AlwaysRng(0.0);
        assert!(process_potential_reaction(
            &registry, &mut acid, &mut stone, 1.0, &mut rng
        ));
        assert!(stone.flags.contains(CellFlags::DISSOLVING));
        assert!(stone.health < 1.0);
    }

    #[test]
    fn freezing_state_change_sets_frozen_flag() {
        let registry = registry();
        let mut lava = Cell {
            material: registry.lava(),
            temperature: 650.0,
            ..Cell::AIR
        };
        let mut rng = AlwaysRng(0.0);
        process_state_change(&registry, &mut lava, 1.0, &mut rng);
        assert_eq!(lava.material, registry.stone());
        assert!(lava.flags.contains(CellFlags::FROZEN));
    }

    #[test]
    fn deep_past_freezing_threshold_bypasses_the_roll() {
        let registry = registry();
        let mut lava = Cell {
            material: registry.lava(),
            temperature: 100.0,
            ..Cell::AIR
        };
        assert!(check_state_change_by_temperature(&registry, &mut lava));
        assert_eq!(lava.material, registry.stone());
        assert!(lava.flags.contains(CellFlags::FROZEN));
    }
}
