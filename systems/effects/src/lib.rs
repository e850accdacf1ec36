#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cosmetic layer: sector materials, ambient decorations and steam emitters.
//!
//! Nothing here changes grid semantics. The layer only reads terrain and
//! placement products and returns additive placements.

use glam::Vec3;
use rand::{seq::SliceRandom, Rng};
use rollway_core::{
    CellMarker, GenerationMode, LevelConfig, MaterialId, Position, Quadrant, ResolvedFeatures,
    Surface,
};
use rollway_level::{world_position, DecorationPlacement, SteamEmitterPlacement, TerrainLayout};

/// Share of walkable tiles that receive a decoration.
pub const DECORATION_SHARE: f32 = 0.05;

/// Height of a steam emitter above its platform, in tiles.
pub const STEAM_EMITTER_LIFT: f32 = 1.0;

/// Material assignment for a run.
///
/// Sectored plans fix one material per quadrant and surface up front;
/// per-tile plans sample a fresh material for every request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialPlan {
    size: u32,
    ground: Vec<MaterialId>,
    wall: Vec<MaterialId>,
    sectors: Option<SectorMaterials>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SectorMaterials {
    ground: [Option<MaterialId>; 4],
    wall: [Option<MaterialId>; 4],
}

impl MaterialPlan {
    /// Reports whether materials are fixed per quadrant.
    #[must_use]
    pub fn is_sectored(&self) -> bool {
        self.sectors.is_some()
    }

    /// Material fixed for a quadrant, when the plan is sectored.
    #[must_use]
    pub fn sector_material(&self, quadrant: Quadrant, surface: Surface) -> Option<MaterialId> {
        let sectors = self.sectors.as_ref()?;
        match surface {
            Surface::Ground => sectors.ground[quadrant.index()],
            Surface::Wall => sectors.wall[quadrant.index()],
        }
    }

    /// Material for the surface at `cell`.
    ///
    /// Per-tile plans draw from the random source; sectored plans never do.
    pub fn material_for<R: Rng + ?Sized>(
        &self,
        cell: Position,
        surface: Surface,
        rng: &mut R,
    ) -> Option<MaterialId> {
        if self.sectors.is_some() {
            return self.sector_material(Quadrant::of(cell, self.size), surface);
        }
        let candidates = match surface {
            Surface::Ground => &self.ground,
            Surface::Wall => &self.wall,
        };
        candidates.choose(rng).copied()
    }
}

/// Builds the material plan for a run.
pub fn assign_materials<R: Rng + ?Sized>(
    config: &LevelConfig,
    features: &ResolvedFeatures,
    rng: &mut R,
) -> MaterialPlan {
    let ground = config.prototypes.ground_materials.clone();
    let wall = config.prototypes.wall_materials.clone();

    let sectors = features.sector_materials.then(|| {
        let mut sectors = SectorMaterials {
            ground: [None; 4],
            wall: [None; 4],
        };
        for quadrant in Quadrant::ALL {
            sectors.ground[quadrant.index()] = ground.choose(rng).copied();
            sectors.wall[quadrant.index()] = wall.choose(rng).copied();
        }
        log::debug!("fixed sector materials {sectors:?}");
        sectors
    });

    MaterialPlan {
        size: config.level_size,
        ground,
        wall,
        sectors,
    }
}

/// Number of decorations for a level with `walkable_tiles` walkable cells.
#[must_use]
pub fn decoration_count(walkable_tiles: usize, prototypes: usize) -> usize {
    let share = (walkable_tiles as f32 * DECORATION_SHARE).floor() as usize;
    share.min(prototypes)
}

/// Samples decorations onto distinct plain walkable tiles.
///
/// Collectible, goal and spawn cells are left bare.
pub fn place_decorations<R: Rng + ?Sized>(
    config: &LevelConfig,
    features: &ResolvedFeatures,
    terrain: &TerrainLayout,
    rng: &mut R,
) -> Vec<DecorationPlacement> {
    let prototypes = &config.prototypes.decorations;
    if !features.decorations || prototypes.is_empty() {
        return Vec::new();
    }

    let count = decoration_count(terrain.walkable_tiles.len(), prototypes.len());
    let candidates: Vec<Position> = terrain
        .walkable_tiles
        .iter()
        .copied()
        .filter(|cell| *cell != terrain.spawn)
        .filter(|cell| terrain.grid.get(*cell) == Some(CellMarker::Walkable))
        .collect();

    let mut placements = Vec::with_capacity(count);
    for cell in candidates.choose_multiple(rng, count) {
        if let Some(prototype) = prototypes.choose(rng) {
            placements.push(DecorationPlacement {
                cell: *cell,
                prototype: *prototype,
            });
        }
    }
    log::debug!("sampled {} decorations", placements.len());
    placements
}

/// Rolls a steam emitter above every platform centre.
pub fn place_steam_emitters<R: Rng + ?Sized>(
    config: &LevelConfig,
    features: &ResolvedFeatures,
    terrain: &TerrainLayout,
    rng: &mut R,
) -> Vec<SteamEmitterPlacement> {
    let prototypes = &config.prototypes.steam_emitters;
    if terrain.mode != GenerationMode::Platforms
        || !features.steam_emitters
        || prototypes.is_empty()
    {
        return Vec::new();
    }

    let probability = f64::from(config.densities.steam_emitter.clamp(0.0, 1.0));
    let lift = Vec3::Y * STEAM_EMITTER_LIFT * config.tile_size;
    let mut seen: Vec<Position> = Vec::new();
    let mut placements = Vec::new();
    for center in terrain.platform_graph.centers() {
        if seen.contains(center) {
            continue;
        }
        seen.push(*center);
        if !rng.gen_bool(probability) {
            continue;
        }
        if let Some(prototype) = prototypes.choose(rng) {
            placements.push(SteamEmitterPlacement {
                center: *center,
                prototype: *prototype,
                position: world_position(*center, config.tile_size) + lift,
            });
        }
    }
    log::debug!("placed {} steam emitters", placements.len());
    placements
}
