#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Conversion of the finished grid into pooled object records.
//!
//! The instantiator walks the grid in row-major batches so hosts can spread
//! the work over several ticks. Dynamic elements, cosmetic placements and
//! gate/switch pairs are spawned through the same [`Pool`], which is the
//! single owner of every instance identity.

mod pool;

pub use pool::{Pool, Release, POOL_CAPACITY};

use glam::Vec3;
use rand::{seq::SliceRandom, Rng};
use rollway_core::{
    CellMarker, GenerationError, GenerationWarning, LevelConfig, MaterialId,
    PlacementSubject, Position, PrototypeId, PrototypeSet, ResolvedFeatures, Surface,
};
use rollway_level::{
    world_position, DecorationPlacement, Grid, InteractivePair, ObjectRole, SpawnedObject,
    SteamEmitterPlacement, TerrainLayout,
};
use rollway_system_effects::MaterialPlan;

/// Grid cells processed per instantiation batch.
pub const CELLS_PER_BATCH: usize = 64;

/// Gate resamples allowed per gate/switch pair.
pub const GATE_RETRIES: u32 = 20;

/// Height of collectible and goal overlays above their floor tile, in tiles.
pub const OVERLAY_LIFT: f32 = 0.5;

/// Progress reported after each instantiation batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchProgress {
    /// More cells remain.
    Pending,
    /// Every cell has been instantiated.
    Complete,
}

#[derive(Clone, Copy, Debug)]
struct CorePrototypes {
    ground: PrototypeId,
    wall: PrototypeId,
    collectible: PrototypeId,
    goal: PrototypeId,
}

impl CorePrototypes {
    fn resolve(prototypes: &PrototypeSet) -> Result<Self, GenerationError> {
        let require = |handle: Option<PrototypeId>, name: &str| {
            handle.ok_or_else(|| {
                GenerationError::InvariantViolation(format!("{name} prototype disappeared"))
            })
        };
        Ok(Self {
            ground: require(prototypes.ground, "ground")?,
            wall: require(prototypes.wall, "wall")?,
            collectible: require(prototypes.collectible, "collectible")?,
            goal: require(prototypes.goal, "goal")?,
        })
    }
}

/// Resumable grid walker that spawns one record per tile and overlay.
#[derive(Debug, Default)]
pub struct ObjectInstantiator {
    cursor: usize,
    prototypes: Option<CorePrototypes>,
}

impl ObjectInstantiator {
    /// Creates an instantiator positioned before the first cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewinds to the first cell and resolves the core prototypes.
    pub fn begin(&mut self, prototypes: &PrototypeSet) -> Result<(), GenerationError> {
        self.cursor = 0;
        self.prototypes = Some(CorePrototypes::resolve(prototypes)?);
        Ok(())
    }

    /// Cells already instantiated.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Instantiates up to `budget` cells.
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate_batch<R: Rng + ?Sized>(
        &mut self,
        grid: &Grid,
        tile_size: f32,
        materials: &MaterialPlan,
        pool: &mut Pool,
        rng: &mut R,
        budget: usize,
        out: &mut Vec<SpawnedObject>,
    ) -> Result<BatchProgress, GenerationError> {
        let prototypes = self.prototypes.ok_or_else(|| {
            GenerationError::InvariantViolation("instantiation was not started".to_owned())
        })?;
        let overlay = Vec3::Y * OVERLAY_LIFT * tile_size;

        for (cell, marker) in grid.cells().skip(self.cursor).take(budget) {
            self.cursor += 1;
            let position = world_position(cell, tile_size);
            if marker == CellMarker::Wall {
                let material = materials.material_for(cell, Surface::Wall, rng);
                out.push(spawn(pool, prototypes.wall, ObjectRole::Wall, cell, position, material));
                continue;
            }

            let material = materials.material_for(cell, Surface::Ground, rng);
            out.push(spawn(pool, prototypes.ground, ObjectRole::Ground, cell, position, material));
            match marker {
                CellMarker::Collectible => out.push(spawn(
                    pool,
                    prototypes.collectible,
                    ObjectRole::Collectible,
                    cell,
                    position + overlay,
                    None,
                )),
                CellMarker::Goal => out.push(spawn(
                    pool,
                    prototypes.goal,
                    ObjectRole::Goal,
                    cell,
                    position + overlay,
                    None,
                )),
                CellMarker::Walkable | CellMarker::Wall => {}
            }
        }

        if self.cursor >= grid.cell_count() {
            Ok(BatchProgress::Complete)
        } else {
            Ok(BatchProgress::Pending)
        }
    }

    /// Forgets the cursor and resolved prototypes.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.prototypes = None;
    }
}

/// Spawns moving platforms and rotating obstacles at their tagged cells.
pub fn spawn_dynamic_elements(
    config: &LevelConfig,
    features: &ResolvedFeatures,
    terrain: &TerrainLayout,
    pool: &mut Pool,
    out: &mut Vec<SpawnedObject>,
) -> usize {
    let before = out.len();
    let tile_size = config.tile_size;
    if let (true, Some(prototype)) = (features.moving_platforms, config.prototypes.moving_platform)
    {
        for cell in &terrain.moving_platform_tiles {
            let position = world_position(*cell, tile_size);
            out.push(spawn(pool, prototype, ObjectRole::MovingPlatform, *cell, position, None));
        }
    }
    if let (true, Some(prototype)) =
        (features.rotating_obstacles, config.prototypes.rotating_obstacle)
    {
        for cell in &terrain.rotating_obstacle_sites {
            let position = world_position(*cell, tile_size);
            out.push(spawn(pool, prototype, ObjectRole::RotatingObstacle, *cell, position, None));
        }
    }
    out.len() - before
}

/// Spawns the sampled decorations.
pub fn spawn_decorations(
    decorations: &[DecorationPlacement],
    tile_size: f32,
    pool: &mut Pool,
    out: &mut Vec<SpawnedObject>,
) {
    for decoration in decorations {
        let position = world_position(decoration.cell, tile_size);
        out.push(spawn(
            pool,
            decoration.prototype,
            ObjectRole::Decoration,
            decoration.cell,
            position,
            None,
        ));
    }
}

/// Spawns the sampled steam emitters.
pub fn spawn_steam_emitters(
    emitters: &[SteamEmitterPlacement],
    pool: &mut Pool,
    out: &mut Vec<SpawnedObject>,
) {
    for emitter in emitters {
        out.push(spawn(
            pool,
            emitter.prototype,
            ObjectRole::SteamEmitter,
            emitter.center,
            emitter.position,
            None,
        ));
    }
}

/// Number of gate/switch pairs for a level.
#[must_use]
pub fn pair_count(walkable_tiles: usize, gate_density: f32) -> usize {
    let scaled = (walkable_tiles as f32 * gate_density).round() as usize;
    scaled.max(1)
}

/// Minimum distance between a switch and its gate.
#[must_use]
pub fn min_pair_distance(level_size: u32) -> f32 {
    (level_size as f32 / 3.0).max(2.0)
}

/// Result of gate/switch pairing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PairingReport {
    /// Pairs that were placed.
    pub pairs: Vec<InteractivePair>,
    /// Set when fewer pairs than requested were placed.
    pub warning: Option<GenerationWarning>,
}

/// Places bound gate/switch pairs on plain walkable tiles.
///
/// Each pair draws a switch tile, then resamples its gate tile up to
/// [`GATE_RETRIES`] times until the two are far enough apart. Pairs that
/// never satisfy the distance are skipped and reported.
pub fn place_interactive_pairs<R: Rng + ?Sized>(
    config: &LevelConfig,
    features: &ResolvedFeatures,
    terrain: &TerrainLayout,
    pool: &mut Pool,
    rng: &mut R,
    out: &mut Vec<SpawnedObject>,
) -> PairingReport {
    let (Some(gate_prototype), Some(switch_prototype)) = (
        config.prototypes.interactive_gate,
        config.prototypes.interactive_switch,
    ) else {
        return PairingReport::default();
    };
    if !features.interactive_gates {
        return PairingReport::default();
    }

    let mut candidates: Vec<Position> = terrain
        .walkable_tiles
        .iter()
        .copied()
        .filter(|cell| *cell != terrain.spawn)
        .filter(|cell| terrain.grid.get(*cell) == Some(CellMarker::Walkable))
        .collect();
    let requested = pair_count(terrain.walkable_tiles.len(), config.densities.interactive_gate);
    let min_distance = min_pair_distance(config.level_size);
    let tile_size = config.tile_size;

    let mut pairs = Vec::with_capacity(requested);
    for _ in 0..requested {
        if candidates.len() < 2 {
            break;
        }
        let switch_index = rng.gen_range(0..candidates.len());
        let switch = candidates[switch_index];

        let mut gate = None;
        for _ in 0..=GATE_RETRIES {
            let Some(candidate) = candidates.choose(rng).copied() else {
                break;
            };
            if candidate.distance(switch) >= min_distance {
                gate = Some(candidate);
                break;
            }
        }
        let Some(gate) = gate else {
            continue;
        };
        candidates.retain(|cell| *cell != switch && *cell != gate);

        let switch_instance = pool.acquire(switch_prototype);
        let gate_instance = pool.acquire(gate_prototype);
        out.push(SpawnedObject {
            instance: switch_instance,
            prototype: switch_prototype,
            role: ObjectRole::Switch,
            cell: switch,
            position: world_position(switch, tile_size),
            material: None,
            linked: Some(gate_instance),
        });
        out.push(SpawnedObject {
            instance: gate_instance,
            prototype: gate_prototype,
            role: ObjectRole::Gate,
            cell: gate,
            position: world_position(gate, tile_size),
            material: None,
            linked: Some(switch_instance),
        });
        pairs.push(InteractivePair {
            switch,
            gate,
            switch_instance,
            gate_instance,
        });
    }

    let warning = (pairs.len() < requested).then(|| {
        log::warn!("placed {} of {requested} gate/switch pairs", pairs.len());
        GenerationWarning::PlacementExhaustion {
            subject: PlacementSubject::InteractivePairs,
            requested: u32::try_from(requested).unwrap_or(u32::MAX),
            placed: u32::try_from(pairs.len()).unwrap_or(u32::MAX),
        }
    });
    PairingReport { pairs, warning }
}

/// Releases every object back to the pool, returning how many were released.
pub fn release_objects(pool: &mut Pool, objects: &mut Vec<SpawnedObject>) -> usize {
    let mut released = 0;
    for object in objects.drain(..) {
        if pool.release(object.instance) != Release::Unknown {
            released += 1;
        }
    }
    log::debug!("released {released} objects");
    released
}

fn spawn(
    pool: &mut Pool,
    prototype: PrototypeId,
    role: ObjectRole,
    cell: Position,
    position: Vec3,
    material: Option<MaterialId>,
) -> SpawnedObject {
    SpawnedObject {
        instance: pool.acquire(prototype),
        prototype,
        role,
        cell,
        position,
        material,
        linked: None,
    }
}
