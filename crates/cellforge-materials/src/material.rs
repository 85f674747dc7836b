//! Material definitions and the material registry.
//!
//! Materials are interned by [`MaterialRegistry`] into an append-only table; a
//! [`Cell`](crate::Cell) only ever stores the 16-bit id, never the properties
//! themselves.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Opaque handle into a [`MaterialRegistry`]. Id 0 is always AIR.
pub type MaterialId = u16;

/// Well-known ids for the materials registered by [`MaterialRegistry::register_basic_materials`].
pub mod ids {
    use super::MaterialId;

    pub const AIR: MaterialId = 0;
    pub const STONE: MaterialId = 1;
    pub const SAND: MaterialId = 2;
    pub const WATER: MaterialId = 3;
    pub const OIL: MaterialId = 4;
    pub const LAVA: MaterialId = 5;
    pub const FIRE: MaterialId = 6;
    pub const STEAM: MaterialId = 7;
    pub const SMOKE: MaterialId = 8;
    pub const WOOD: MaterialId = 9;
}

/// Broad physical behavior class. Drives dispatch in the physics update loop;
/// materials differ only in the data attached to a class, never in dispatch
/// identity (no per-material vtables).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialType {
    Empty,
    Solid,
    Powder,
    Liquid,
    Gas,
    Fire,
    Special,
}

/// Coarse categorization, orthogonal to [`MaterialType`]. Not consulted by the
/// physics dispatcher; exists for registry bookkeeping and tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialCategory {
    Gas,
    Mineral,
    Liquid,
    Organic,
    Metallic,
    Combustion,
}

bitflags! {
    /// Behavioral tags a material definition can carry, independent of its
    /// [`MaterialType`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MaterialFlags: u16 {
        const CORROSIVE = 1 << 0;
        const EXPLOSIVE = 1 << 1;
        const CONDUCTIVE = 1 << 2;
        const HOT = 1 << 3;
        const STICKY = 1 << 4;
        const DISAPPEARS = 1 << 5;
        const GROWS = 1 << 6;
        const BREAKABLE = 1 << 7;
    }
}

/// A rule: when this material touches `reactant`, roll `probability * dt *
/// 10` per tick; on success this cell becomes `result` (and, if set,
/// `byproduct` is applied to the neighbor instead of its own reaction roll).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reaction {
    pub reactant_material: MaterialId,
    pub result_material: MaterialId,
    pub byproduct: Option<MaterialId>,
    pub probability: f32,
    pub energy_release: Option<f32>,
}

/// A temperature-triggered transition. `temperature_threshold > 0` fires when
/// a cell's temperature rises past it; `< 0` fires when it falls past
/// `-threshold`. Probabilistic transitions roll `probability * dt * 5`;
/// [`crate::CellProcessor::check_state_change_by_temperature`]-style direct
/// checks (owned by the sim crate) bypass the roll once deep past threshold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateChange {
    pub target_material: MaterialId,
    pub temperature_threshold: f32,
    pub probability: f32,
}

/// Immutable-once-registered material definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDef {
    pub id: MaterialId,
    pub name: String,
    pub category: MaterialCategory,
    pub material_type: MaterialType,

    // Visuals
    pub color: [u8; 4],
    pub color_variation: u8,
    pub emissive: bool,
    pub emissive_strength: f32,

    // Mechanics
    pub density: f32,
    pub viscosity: f32,
    pub dispersion: u32,
    pub friction: f32,
    pub movable: bool,

    // Thermal
    pub melting_point: Option<f32>,
    pub freezing_point: Option<f32>,
    pub boiling_point: Option<f32>,
    pub ignition_point: Option<f32>,
    pub thermal_conductivity: f32,
    pub specific_heat: f32,

    // Combustion
    pub flammable: bool,
    pub flammability: f32,
    pub burn_rate: f32,
    pub lifetime: Option<u16>,

    pub flags: MaterialFlags,

    pub reactions: Vec<Reaction>,
    pub state_changes: Vec<StateChange>,
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self {
            id: ids::AIR,
            name: "unknown".to_string(),
            category: MaterialCategory::Mineral,
            material_type: MaterialType::Solid,
            color: [255, 0, 255, 255],
            color_variation: 0,
            emissive: false,
            emissive_strength: 0.0,
            density: 1.0,
            viscosity: 0.5,
            dispersion: 4,
            friction: 0.5,
            movable: true,
            melting_point: None,
            freezing_point: None,
            boiling_point: None,
            ignition_point: None,
            thermal_conductivity: 0.5,
            specific_heat: 1.0,
            flammable: false,
            flammability: 0.0,
            burn_rate: 0.0,
            lifetime: None,
            flags: MaterialFlags::empty(),
            reactions: Vec::new(),
            state_changes: Vec::new(),
        }
    }
}

impl MaterialDef {
    pub fn is_acid(&self) -> bool {
        self.name.to_ascii_lowercase().contains("acid")
    }
}

/// Interns [`MaterialDef`]s and hands out stable ids. Append-only: ids are
/// never reused, and registration is idempotent by name.
pub struct MaterialRegistry {
    materials: Vec<MaterialDef>,
    by_name: std::collections::HashMap<String, MaterialId>,
}

impl MaterialRegistry {
    /// A registry with only AIR registered.
    pub fn new() -> Self {
        let mut registry = Self {
            materials: Vec::new(),
            by_name: std::collections::HashMap::new(),
        };
        registry.register(MaterialDef {
            id: ids::AIR,
            name: "air".to_string(),
            category: MaterialCategory::Gas,
            material_type: MaterialType::Empty,
            color: [0, 0, 0, 0],
            density: 0.0,
            movable: false,
            thermal_conductivity: 0.1,
            ..Default::default()
        });
        registry
    }

    /// Registers `props`, returning its id. Registering an already-known name
    /// returns the existing id and leaves the registry unchanged; the id
    /// requested in `props.id` is only honored on first registration.
    pub fn register(&mut self, mut props: MaterialDef) -> MaterialId {
        if let Some(&existing) = self.by_name.get(&props.name) {
            return existing;
        }
        let id = if props.name == "air" {
            ids::AIR
        } else {
            self.materials.len() as MaterialId
        };
        props.id = id;
        self.by_name.insert(props.name.clone(), id);
        if self.materials.len() <= id as usize {
            self.materials.resize(id as usize + 1, MaterialDef::default());
        }
        self.materials[id as usize] = props;
        id
    }

    /// Unknown ids degrade to AIR rather than panicking.
    pub fn get(&self, id: MaterialId) -> &MaterialDef {
        self.materials.get(id as usize).unwrap_or(&self.materials[0])
    }

    /// Unknown names degrade to the AIR id, never fail.
    pub fn id_of(&self, name: &str) -> MaterialId {
        self.by_name.get(name).copied().unwrap_or(ids::AIR)
    }

    pub fn air(&self) -> MaterialId {
        ids::AIR
    }
    pub fn stone(&self) -> MaterialId {
        self.id_of("stone")
    }
    pub fn sand(&self) -> MaterialId {
        self.id_of("sand")
    }
    pub fn water(&self) -> MaterialId {
        self.id_of("water")
    }
    pub fn oil(&self) -> MaterialId {
        self.id_of("oil")
    }
    pub fn lava(&self) -> MaterialId {
        self.id_of("lava")
    }
    pub fn fire(&self) -> MaterialId {
        self.id_of("fire")
    }
    pub fn steam(&self) -> MaterialId {
        self.id_of("steam")
    }
    pub fn smoke(&self) -> MaterialId {
        self.id_of("smoke")
    }
    pub fn wood(&self) -> MaterialId {
        self.id_of("wood")
    }

    /// Registers the ten standard materials from the glossary defaults. Safe
    /// to call more than once; later calls are no-ops thanks to idempotent
    /// registration by name.
    pub fn register_basic_materials(&mut self) {
        self.register(MaterialDef {
            name: "stone".to_string(),
            category: MaterialCategory::Mineral,
            material_type: MaterialType::Solid,
            color: [120, 120, 120, 255],
            density: 2600.0,
            movable: false,
            thermal_conductivity: 0.2,
            specific_heat: 0.8,
            melting_point: Some(1200.0),
            ..Default::default()
        });
        self.register(MaterialDef {
            name: "sand".to_string(),
            category: MaterialCategory::Mineral,
            material_type: MaterialType::Powder,
            color: [194, 178, 128, 255],
            density: 1600.0,
            friction: 0.3,
            thermal_conductivity: 0.3,
            specific_heat: 0.8,
            melting_point: Some(1700.0),
            ..Default::default()
        });
        self.register(MaterialDef {
            name: "water".to_string(),
            category: MaterialCategory::Liquid,
            material_type: MaterialType::Liquid,
            color: [64, 164, 223, 200],
            density: 1000.0,
            viscosity: 0.1,
            dispersion: 5,
            thermal_conductivity: 0.6,
            specific_heat: 4.18,
            boiling_point: Some(100.0),
            freezing_point: Some(0.0),
            state_changes: vec![StateChange {
                target_material: ids::STEAM,
                temperature_threshold: 100.0,
                probability: 0.3,
            }],
            ..Default::default()
        });
        self.register(MaterialDef {
            name: "oil".to_string(),
            category: MaterialCategory::Liquid,
            material_type: MaterialType::Liquid,
            color: [70, 55, 35, 255],
            density: 850.0,
            viscosity: 0.3,
            dispersion: 4,
            thermal_conductivity: 0.2,
            flammable: true,
            flammability: 0.6,
            burn_rate: 0.4,
            ignition_point: Some(250.0),
            ..Default::default()
        });
        self.register(MaterialDef {
            name: "lava".to_string(),
            category: MaterialCategory::Liquid,
            material_type: MaterialType::Liquid,
            color: [255, 80, 0, 255],
            density: 2000.0,
            viscosity: 0.8,
            dispersion: 2,
            emissive: true,
            emissive_strength: 0.8,
            thermal_conductivity: 0.8,
            specific_heat: 1.6,
            freezing_point: Some(700.0),
            flags: MaterialFlags::HOT,
            state_changes: vec![StateChange {
                target_material: ids::STONE,
                temperature_threshold: -700.0,
                probability: 0.2,
            }],
            ..Default::default()
        });
        self.register(MaterialDef {
            name: "fire".to_string(),
            category: MaterialCategory::Combustion,
            material_type: MaterialType::Fire,
            color: [255, 100, 0, 255],
            density: 0.2,
            emissive: true,
            emissive_strength: 1.0,
            thermal_conductivity: 0.9,
            lifetime: Some(40),
            flags: MaterialFlags::HOT,
            ..Default::default()
        });
        self.register(MaterialDef {
            name: "steam".to_string(),
            category: MaterialCategory::Gas,
            material_type: MaterialType::Gas,
            color: [200, 200, 200, 100],
            density: 0.4,
            dispersion: 6,
            thermal_conductivity: 0.3,
            lifetime: Some(200),
            state_changes: vec![StateChange {
                target_material: ids::WATER,
                temperature_threshold: -100.0,
                probability: 0.3,
            }],
            ..Default::default()
        });
        self.register(MaterialDef {
            name: "smoke".to_string(),
            category: MaterialCategory::Gas,
            material_type: MaterialType::Gas,
            color: [60, 60, 60, 150],
            density: 0.3,
            dispersion: 6,
            lifetime: Some(150),
            flags: MaterialFlags::DISAPPEARS,
            ..Default::default()
        });
        self.register(MaterialDef {
            name: "wood".to_string(),
            category: MaterialCategory::Organic,
            material_type: MaterialType::Solid,
            color: [139, 90, 43, 255],
            density: 600.0,
            movable: false,
            thermal_conductivity: 0.15,
            flammable: true,
            flammability: 0.5,
            burn_rate: 0.1,
            ignition_point: Some(300.0),
            ..Default::default()
        });
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_is_always_id_zero() {
        let registry = MaterialRegistry::new();
        assert_eq!(registry.air(), ids::AIR);
        assert_eq!(registry.get(ids::AIR).name, "air");
    }

    #[test]
    fn registration_is_idempotent_by_name() {
        let mut registry = MaterialRegistry::new();
        let first = registry.register(MaterialDef {
            name: "sand".to_string(),
            ..Default::default()
        });
        let second = registry.register(MaterialDef {
            name: "sand".to_string(),
            density: 999.0,
            ..Default::default()
        });
        assert_eq!(first, second);
        assert_eq!(registry.get(first).density, 1.0, "second register must not overwrite the first");
    }

    #[test]
    fn unknown_name_falls_back_to_air() {
        let registry = MaterialRegistry::new();
        assert_eq!(registry.id_of("phlogiston"), ids::AIR);
    }

    #[test]
    fn unknown_id_falls_back_to_air() {
        let registry = MaterialRegistry::new();
        assert_eq!(registry.get(9999).name, "air");
    }

    #[test]
    fn basic_materials_registers_ten_standards() {
        let mut registry = MaterialRegistry::new();
        registry.register_basic_materials();
        for name in [
            "stone", "sand", "water", "oil", "lava", "fire", "steam", "smoke", "wood",
        ] {
            assert_ne!(registry.id_of(name), ids::AIR, "{name} should be registered");
        }
    }

    #[test]
    fn registering_basic_materials_twice_is_a_noop() {
        let mut registry = MaterialRegistry::new();
        registry.register_basic_materials();
        let water_id = registry.id_of("water");
        registry.register_basic_materials();
        assert_eq!(registry.id_of("water"), water_id);
    }
}
