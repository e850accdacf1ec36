//! Immutable generation parameters supplied by the host.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GenerationMode, MaterialId, PrototypeId};

/// Smallest supported level edge length.
pub const MIN_LEVEL_SIZE: u32 = 5;
/// Lowest accepted minimum-walkable percentage.
pub const MIN_WALKABLE_PERCENT: f32 = 30.0;
/// Highest accepted minimum-walkable percentage.
pub const MAX_WALKABLE_PERCENT: f32 = 95.0;
/// Level size from which tiles share one material per sector.
pub const SECTOR_SIZE_THRESHOLD: u32 = 16;
/// Level size from which object pooling is used.
pub const POOLING_SIZE_THRESHOLD: u32 = 16;

/// Complete parameter set for one generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Edge length of the square grid, in cells.
    pub level_size: u32,
    /// Edge length of one cell in world units.
    pub tile_size: f32,
    /// Minimum walkable share of the interior, in percent.
    pub min_walkable_percent: f32,
    /// Per-feature densities.
    pub densities: Densities,
    /// Number of collectibles to place.
    pub collectible_count: u32,
    /// Minimum Euclidean distance between any two collectibles, in cells.
    pub collectible_min_distance: f32,
    /// Mode used when adaptive selection is disabled.
    pub generation_mode: GenerationMode,
    /// Share of extra openings and path winding in `[0, 1]`.
    pub path_complexity: f32,
    /// Difficulty in `[0, 1]`, consulted by adaptive mode selection.
    pub difficulty: f32,
    /// Seed resolution strategy.
    pub seed: SeedMode,
    /// Picks the generation mode from the seed and the adaptive table.
    pub adaptive_mode: bool,
    /// Brackets and probabilities used by adaptive mode selection.
    pub adaptive_table: AdaptiveModeTable,
    /// Spawn selection parameters.
    pub spawn: SpawnSettings,
    /// Optional feature switches.
    pub features: FeatureToggles,
    /// Host prototype and material handles.
    pub prototypes: PrototypeSet,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            level_size: 10,
            tile_size: 2.0,
            min_walkable_percent: 60.0,
            densities: Densities::default(),
            collectible_count: 5,
            collectible_min_distance: 2.0,
            generation_mode: GenerationMode::Simple,
            path_complexity: 0.3,
            difficulty: 0.5,
            seed: SeedMode::default(),
            adaptive_mode: false,
            adaptive_table: AdaptiveModeTable::default(),
            spawn: SpawnSettings::default(),
            features: FeatureToggles::default(),
            prototypes: PrototypeSet::default(),
        }
    }
}

impl LevelConfig {
    /// Checks the configuration and resolves which optional features can run.
    ///
    /// Fatal problems are returned as [`ConfigError`]. Optional features that
    /// are switched on but lack prototypes are reported in
    /// [`ResolvedFeatures::skipped`] instead, so the pipeline can continue
    /// without them.
    pub fn validate(&self) -> Result<ResolvedFeatures, ConfigError> {
        if self.level_size < MIN_LEVEL_SIZE {
            return Err(ConfigError::LevelTooSmall {
                size: self.level_size,
            });
        }
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(ConfigError::InvalidTileSize {
                tile_size: self.tile_size,
            });
        }
        if !(MIN_WALKABLE_PERCENT..=MAX_WALKABLE_PERCENT).contains(&self.min_walkable_percent) {
            return Err(ConfigError::WalkablePercentOutOfRange {
                percent: self.min_walkable_percent,
            });
        }
        self.densities.validate()?;
        check_unit("path_complexity", self.path_complexity)?;
        check_unit("difficulty", self.difficulty)?;
        if !(self.collectible_min_distance.is_finite() && self.collectible_min_distance >= 0.0) {
            return Err(ConfigError::InvalidMinDistance {
                distance: self.collectible_min_distance,
            });
        }
        if self.seed == SeedMode::Explicit(0) {
            return Err(ConfigError::ZeroSeed);
        }
        self.adaptive_table.validate()?;
        let radius = self.spawn.safe_radius;
        if self.spawn.randomize && !(radius.is_finite() && radius >= 0.0) {
            return Err(ConfigError::InvalidSafeRadius {
                radius: self.spawn.safe_radius,
            });
        }

        let prototypes = &self.prototypes;
        let required = [
            ("ground", prototypes.ground),
            ("wall", prototypes.wall),
            ("collectible", prototypes.collectible),
            ("goal", prototypes.goal),
        ];
        for (name, handle) in required {
            if handle.is_none() {
                return Err(ConfigError::MissingPrototype { name });
            }
        }

        Ok(self.resolve_features())
    }

    fn resolve_features(&self) -> ResolvedFeatures {
        let toggles = &self.features;
        let prototypes = &self.prototypes;
        let mut resolved = ResolvedFeatures {
            pooling: toggles.pooling && self.level_size >= POOLING_SIZE_THRESHOLD,
            sector_materials: toggles.sector_materials
                && self.level_size >= SECTOR_SIZE_THRESHOLD,
            ..ResolvedFeatures::default()
        };

        let candidates = [
            (
                OptionalFeature::MovingPlatforms,
                toggles.moving_platforms,
                prototypes.moving_platform.is_some(),
            ),
            (
                OptionalFeature::RotatingObstacles,
                toggles.rotating_obstacles,
                prototypes.rotating_obstacle.is_some(),
            ),
            (
                OptionalFeature::InteractiveGates,
                toggles.interactive_gates,
                prototypes.interactive_gate.is_some() && prototypes.interactive_switch.is_some(),
            ),
            (
                OptionalFeature::Decorations,
                toggles.decorations,
                !prototypes.decorations.is_empty(),
            ),
            (
                OptionalFeature::SteamEmitters,
                toggles.steam_emitters,
                !prototypes.steam_emitters.is_empty(),
            ),
        ];

        for (feature, requested, available) in candidates {
            if !requested {
                continue;
            }
            if available {
                resolved.enable(feature);
            } else {
                resolved.skipped.push(feature);
            }
        }

        resolved
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}

/// Per-feature densities, each in `[0, 1]`. Their sum should stay below 0.8.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Densities {
    /// Probability that a non-path interior cell becomes an obstacle.
    pub obstacle: f32,
    /// Share of platform centres that host a rotating obstacle.
    pub rotating_obstacle: f32,
    /// Density of moving platforms along platform-graph edges.
    pub moving_platform: f32,
    /// Probability that a platform centre hosts a steam emitter.
    pub steam_emitter: f32,
    /// Gate/switch pairs per walkable tile.
    pub interactive_gate: f32,
}

impl Default for Densities {
    fn default() -> Self {
        Self {
            obstacle: 0.15,
            rotating_obstacle: 0.1,
            moving_platform: 0.1,
            steam_emitter: 0.2,
            interactive_gate: 0.02,
        }
    }
}

impl Densities {
    fn validate(&self) -> Result<(), ConfigError> {
        check_unit("densities.obstacle", self.obstacle)?;
        check_unit("densities.rotating_obstacle", self.rotating_obstacle)?;
        check_unit("densities.moving_platform", self.moving_platform)?;
        check_unit("densities.steam_emitter", self.steam_emitter)?;
        check_unit("densities.interactive_gate", self.interactive_gate)
    }

    /// Sum of every density; values of 0.8 and above crowd the level.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.obstacle
            + self.rotating_obstacle
            + self.moving_platform
            + self.steam_emitter
            + self.interactive_gate
    }
}

/// How the run seed is obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedMode {
    /// Fixed non-zero seed; runs are reproducible.
    Explicit(u64),
    /// Derived from the wall clock at initialisation.
    TimeBased,
    /// Drawn from operating-system entropy.
    Random,
}

impl Default for SeedMode {
    fn default() -> Self {
        Self::Explicit(1)
    }
}

/// Spawn selection parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    /// Keeps the spawn away from the border by `safe_radius`.
    pub randomize: bool,
    /// Minimum distance to the border in world units when randomised.
    pub safe_radius: f32,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            randomize: false,
            safe_radius: 4.0,
        }
    }
}

/// Typed switches for optional features.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Moving platforms along platform-graph edges.
    pub moving_platforms: bool,
    /// Rotating obstacles on platform centres.
    pub rotating_obstacles: bool,
    /// Paired gates and switches.
    pub interactive_gates: bool,
    /// Ambient decorations.
    pub decorations: bool,
    /// Steam emitters above platforms.
    pub steam_emitters: bool,
    /// One material per sector on large levels.
    pub sector_materials: bool,
    /// Object pooling on large levels.
    pub pooling: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            moving_platforms: true,
            rotating_obstacles: true,
            interactive_gates: true,
            decorations: true,
            steam_emitters: true,
            sector_materials: true,
            pooling: true,
        }
    }
}

/// Optional features whose availability is resolved at validation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionalFeature {
    /// Moving platforms.
    MovingPlatforms,
    /// Rotating obstacles.
    RotatingObstacles,
    /// Gate/switch pairs.
    InteractiveGates,
    /// Ambient decorations.
    Decorations,
    /// Steam emitters.
    SteamEmitters,
}

/// Optional features that will actually run, resolved once per run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFeatures {
    /// Moving platforms are instantiated.
    pub moving_platforms: bool,
    /// Rotating obstacles are instantiated.
    pub rotating_obstacles: bool,
    /// Gate/switch pairs are placed.
    pub interactive_gates: bool,
    /// Decorations are sampled.
    pub decorations: bool,
    /// Steam emitters are sampled.
    pub steam_emitters: bool,
    /// Materials are shared per sector.
    pub sector_materials: bool,
    /// Objects are recycled through the pool.
    pub pooling: bool,
    /// Features that were requested but lack prototypes.
    pub skipped: Vec<OptionalFeature>,
}

impl ResolvedFeatures {
    fn enable(&mut self, feature: OptionalFeature) {
        match feature {
            OptionalFeature::MovingPlatforms => self.moving_platforms = true,
            OptionalFeature::RotatingObstacles => self.rotating_obstacles = true,
            OptionalFeature::InteractiveGates => self.interactive_gates = true,
            OptionalFeature::Decorations => self.decorations = true,
            OptionalFeature::SteamEmitters => self.steam_emitters = true,
        }
    }
}

/// Host handles for every instantiable kind. Never interpreted beyond identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrototypeSet {
    /// Floor tile.
    pub ground: Option<PrototypeId>,
    /// Wall block.
    pub wall: Option<PrototypeId>,
    /// Collectible overlay.
    pub collectible: Option<PrototypeId>,
    /// Goal overlay.
    pub goal: Option<PrototypeId>,
    /// Moving platform.
    pub moving_platform: Option<PrototypeId>,
    /// Rotating obstacle.
    pub rotating_obstacle: Option<PrototypeId>,
    /// Gate controller.
    pub interactive_gate: Option<PrototypeId>,
    /// Switch trigger bound to a gate.
    pub interactive_switch: Option<PrototypeId>,
    /// Decoration candidates.
    pub decorations: Vec<PrototypeId>,
    /// Steam emitter candidates.
    pub steam_emitters: Vec<PrototypeId>,
    /// Ground material candidates.
    pub ground_materials: Vec<MaterialId>,
    /// Wall material candidates.
    pub wall_materials: Vec<MaterialId>,
}

impl PrototypeSet {
    /// Builds a set where every handle is present, numbered from 1.
    ///
    /// Hosts without real assets and tests use this to exercise every feature.
    #[must_use]
    pub fn numbered() -> Self {
        Self {
            ground: Some(PrototypeId::new(1)),
            wall: Some(PrototypeId::new(2)),
            collectible: Some(PrototypeId::new(3)),
            goal: Some(PrototypeId::new(4)),
            moving_platform: Some(PrototypeId::new(5)),
            rotating_obstacle: Some(PrototypeId::new(6)),
            interactive_gate: Some(PrototypeId::new(7)),
            interactive_switch: Some(PrototypeId::new(8)),
            decorations: vec![PrototypeId::new(20), PrototypeId::new(21), PrototypeId::new(22)],
            steam_emitters: vec![PrototypeId::new(30), PrototypeId::new(31)],
            ground_materials: (100..104).map(MaterialId::new).collect(),
            wall_materials: (200..203).map(MaterialId::new).collect(),
        }
    }
}

/// Two-way mode choice used by one adaptive bracket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeChoice {
    /// Mode picked when the draw falls below `first_probability`.
    pub first: GenerationMode,
    /// Mode picked otherwise.
    pub second: GenerationMode,
    /// Probability of picking `first`.
    pub first_probability: f32,
}

impl ModeChoice {
    /// Creates an even choice between two modes.
    #[must_use]
    pub const fn even(first: GenerationMode, second: GenerationMode) -> Self {
        Self {
            first,
            second,
            first_probability: 0.5,
        }
    }

    /// Resolves the choice for a uniform draw in `[0, 1)`.
    #[must_use]
    pub fn pick(&self, draw: f32) -> GenerationMode {
        if draw < self.first_probability {
            self.first
        } else {
            self.second
        }
    }
}

/// Size and difficulty brackets consulted by adaptive mode selection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveModeTable {
    /// Levels up to this size use `small`.
    pub small_size_max: u32,
    /// Levels from this size may use `large_hard`.
    pub large_size_min: u32,
    /// Difficulty from which large levels use `large_hard`.
    pub high_difficulty: f32,
    /// Difficulty from which remaining levels use `medium`.
    pub medium_difficulty: f32,
    /// Choice for small levels.
    pub small: ModeChoice,
    /// Choice for large, difficult levels.
    pub large_hard: ModeChoice,
    /// Choice for medium difficulty.
    pub medium: ModeChoice,
}

impl Default for AdaptiveModeTable {
    fn default() -> Self {
        Self {
            small_size_max: 10,
            large_size_min: 20,
            high_difficulty: 0.7,
            medium_difficulty: 0.4,
            small: ModeChoice::even(GenerationMode::Simple, GenerationMode::Maze),
            large_hard: ModeChoice::even(
                GenerationMode::HybridOrganicPath,
                GenerationMode::HybridMazeOpen,
            ),
            medium: ModeChoice::even(GenerationMode::Maze, GenerationMode::Organic),
        }
    }
}

impl AdaptiveModeTable {
    fn validate(&self) -> Result<(), ConfigError> {
        check_unit("adaptive_table.high_difficulty", self.high_difficulty)?;
        check_unit("adaptive_table.medium_difficulty", self.medium_difficulty)?;
        check_unit("adaptive_table.small", self.small.first_probability)?;
        check_unit("adaptive_table.large_hard", self.large_hard.first_probability)?;
        check_unit("adaptive_table.medium", self.medium.first_probability)
    }
}

/// Reasons a configuration is rejected before any mutation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The level is smaller than [`MIN_LEVEL_SIZE`].
    #[error("level size {size} is below the minimum of 5")]
    LevelTooSmall {
        /// Requested size.
        size: u32,
    },
    /// The tile size is not a positive finite number.
    #[error("tile size {tile_size} must be positive")]
    InvalidTileSize {
        /// Requested tile size.
        tile_size: f32,
    },
    /// The minimum walkable percentage is outside 30..=95.
    #[error("minimum walkable percentage {percent} is outside 30..=95")]
    WalkablePercentOutOfRange {
        /// Requested percentage.
        percent: f32,
    },
    /// A unit-range parameter is outside `[0, 1]`.
    #[error("{name} = {value} is outside [0, 1]")]
    OutOfUnitRange {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
    /// The collectible minimum distance is negative or not finite.
    #[error("collectible minimum distance {distance} must be non-negative")]
    InvalidMinDistance {
        /// Requested distance.
        distance: f32,
    },
    /// The spawn safe radius is negative or not finite.
    #[error("spawn safe radius {radius} must be non-negative")]
    InvalidSafeRadius {
        /// Requested radius.
        radius: f32,
    },
    /// An explicit seed of zero was supplied.
    #[error("explicit seeds must be non-zero")]
    ZeroSeed,
    /// A required prototype handle is absent.
    #[error("required prototype `{name}` is missing")]
    MissingPrototype {
        /// Name of the missing prototype slot.
        name: &'static str,
    },
}
