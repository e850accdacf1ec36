#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Rollway level generator.
//!
//! This crate defines the vocabulary that connects the generation systems,
//! the authoritative level state and the host adapters. The host submits a
//! [`LevelConfig`], the orchestrator sequences the pure systems, and every
//! stage boundary is reported through [`Event`] values that hosts drain after
//! each cooperative tick. Recoverable problems travel as [`GenerationWarning`]
//! values while fatal ones are [`GenerationError`]s.

mod config;

pub use config::{
    AdaptiveModeTable, ConfigError, Densities, FeatureToggles, LevelConfig, ModeChoice,
    OptionalFeature, PrototypeSet, ResolvedFeatures, SeedMode, SpawnSettings,
    MAX_WALKABLE_PERCENT, MIN_LEVEL_SIZE, MIN_WALKABLE_PERCENT, POOLING_SIZE_THRESHOLD,
    SECTOR_SIZE_THRESHOLD,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer grid coordinate used both as a cell index and as a world placement key.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    x: u32,
    y: u32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the position.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the position.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Squared Euclidean distance, exact for every pair of grid positions.
    #[must_use]
    pub const fn distance_squared(self, other: Position) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dy = self.y.abs_diff(other.y) as u64;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two positions.
    #[must_use]
    pub fn distance(self, other: Position) -> f32 {
        (self.distance_squared(other) as f32).sqrt()
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns the position shifted by the provided signed offset, if it stays non-negative.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Position> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Position::new(x, y))
    }
}

/// Semantic marker stored in every grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellMarker {
    /// Traversable floor.
    Walkable,
    /// Blocked cell; the outer ring is always made of walls.
    Wall,
    /// Walkable cell carrying a collectible.
    Collectible,
    /// Walkable cell carrying the level goal.
    Goal,
}

impl CellMarker {
    /// Reports whether the player can roll across the cell.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// Terrain synthesis algorithm used for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationMode {
    /// Rasterised corner-to-corner path with scattered, non-clustered obstacles.
    #[default]
    Simple,
    /// Recursive-backtracker maze with extra openings driven by path complexity.
    Maze,
    /// Chain of circular islands linked by rasterised bridges.
    Platforms,
    /// Cellular-automaton caves with a carved guaranteed path.
    Organic,
    /// Maze with carved open rooms.
    HybridMazeOpen,
    /// Organic caves crossed by a winding multi-waypoint path.
    HybridOrganicPath,
}

impl GenerationMode {
    /// Every generation mode in declaration order.
    pub const ALL: [GenerationMode; 6] = [
        Self::Simple,
        Self::Maze,
        Self::Platforms,
        Self::Organic,
        Self::HybridMazeOpen,
        Self::HybridOrganicPath,
    ];

    /// Reports whether the mode carves its layout with the maze lattice.
    #[must_use]
    pub const fn is_maze_family(self) -> bool {
        matches!(self, Self::Maze | Self::HybridMazeOpen)
    }
}

/// Opaque identity of a host-provided prototype. Only ever used as a pool key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrototypeId(u32);

impl PrototypeId {
    /// Creates a new prototype identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque identity of a host-provided cosmetic material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(u32);

impl MaterialId {
    /// Creates a new material identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identity of a concrete object instance handed out by the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Creates a new instance identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Monotonic identifier assigned to each generation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(u64);

impl RunId {
    /// Creates a new run identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// One of the four spatial zones used for balancing and cosmetics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quadrant {
    /// Low x, low y.
    NorthWest,
    /// High x, low y.
    NorthEast,
    /// Low x, high y.
    SouthWest,
    /// High x, high y.
    SouthEast,
}

impl Quadrant {
    /// Quadrants in the round-robin order used by placement.
    pub const ALL: [Quadrant; 4] = [
        Self::NorthWest,
        Self::NorthEast,
        Self::SouthWest,
        Self::SouthEast,
    ];

    /// Classifies a position by comparing each axis against `size / 2`.
    #[must_use]
    pub const fn of(position: Position, size: u32) -> Self {
        let half = size / 2;
        match (position.x() < half, position.y() < half) {
            (true, true) => Self::NorthWest,
            (false, true) => Self::NorthEast,
            (true, false) => Self::SouthWest,
            (false, false) => Self::SouthEast,
        }
    }

    /// Dense index of the quadrant in `0..4`.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::NorthWest => 0,
            Self::NorthEast => 1,
            Self::SouthWest => 2,
            Self::SouthEast => 3,
        }
    }
}

/// Surface family that receives a cosmetic material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    /// Floor tiles.
    Ground,
    /// Wall blocks.
    Wall,
}

/// Pipeline stages reported by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Configuration sanity checks and feature resolution.
    Validating,
    /// Seed resolution, random source creation and mode selection.
    Initializing,
    /// Grid synthesis.
    GeneratingTerrain,
    /// Collectible and goal placement.
    PlacingCollectibles,
    /// Conversion of grid cells and dynamic elements into pooled objects.
    InstantiatingObjects,
    /// Decorations and steam emitters.
    ApplyingEffects,
    /// Gate and switch pairing.
    PlacingInteractive,
    /// Invariant checks and publication of the finished level.
    Finalizing,
}

/// Counts of concrete objects produced by a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectCounts {
    /// Floor objects, including those beneath overlays.
    pub ground: u32,
    /// Wall objects.
    pub walls: u32,
    /// Collectible overlays.
    pub collectibles: u32,
    /// Goal overlays.
    pub goals: u32,
    /// Moving platforms.
    pub moving_platforms: u32,
    /// Rotating obstacles.
    pub rotating_obstacles: u32,
    /// Gate controllers.
    pub gates: u32,
    /// Switch triggers.
    pub switches: u32,
    /// Ambient decorations.
    pub decorations: u32,
    /// Steam emitters.
    pub steam_emitters: u32,
}

impl ObjectCounts {
    /// Sum of every object category.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.ground
            + self.walls
            + self.collectibles
            + self.goals
            + self.moving_platforms
            + self.rotating_obstacles
            + self.gates
            + self.switches
            + self.decorations
            + self.steam_emitters
    }
}

/// Payload attached to a stage-completed event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StageSummary {
    /// Validation passed and optional features were resolved.
    Validated {
        /// Optional features that will run.
        features: ResolvedFeatures,
    },
    /// The random source was created.
    Initialized {
        /// Seed the run resolved to; reusing it reproduces the run.
        seed: u64,
        /// Mode selected for terrain synthesis.
        mode: GenerationMode,
    },
    /// Terrain synthesis finished.
    TerrainGenerated {
        /// Mode that produced the grid.
        mode: GenerationMode,
        /// Number of walkable tiles.
        walkable_tiles: u32,
        /// Walkable share of the interior, in percent.
        walkable_percent: f32,
        /// Length of the main path.
        main_path_length: u32,
        /// Number of platform centres (zero outside Platforms mode).
        platform_count: u32,
    },
    /// Collectibles and the goal were placed.
    CollectiblesPlaced {
        /// Number of collectibles placed.
        collectibles: u32,
        /// Goal position, if one could be chosen.
        goal: Option<Position>,
    },
    /// Grid cells and dynamic elements became objects.
    ObjectsInstantiated {
        /// Objects acquired during the stage.
        objects: u32,
    },
    /// Cosmetic effects were sampled.
    EffectsApplied {
        /// Decorations placed.
        decorations: u32,
        /// Steam emitters placed.
        steam_emitters: u32,
    },
    /// Gate and switch pairs were placed.
    InteractivePlaced {
        /// Pairs successfully bound.
        pairs: u32,
    },
    /// The level was published.
    Finalized {
        /// Final object counts.
        counts: ObjectCounts,
    },
}

/// Recoverable problems signalled without halting the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GenerationWarning {
    /// A placement constraint could not be satisfied within its attempt budget.
    PlacementExhaustion {
        /// What was being placed.
        subject: PlacementSubject,
        /// How many were requested.
        requested: u32,
        /// How many were placed.
        placed: u32,
    },
    /// An optional integration was unavailable and a fallback was used.
    SubsystemFallback {
        /// Human-readable description of the fallback.
        detail: String,
    },
    /// An enabled optional feature lacks the prototypes it needs and was skipped.
    FeatureSkipped {
        /// Feature that will not run.
        feature: OptionalFeature,
    },
    /// The generated grid has less walkable area than requested.
    BelowMinimumWalkable {
        /// Walkable share of the interior, in percent.
        percent: f32,
        /// Configured minimum, in percent.
        minimum: f32,
    },
    /// Maze carving hit its iteration cap before every lattice cell was visited.
    MazeTruncated {
        /// Iterations spent before carving stopped.
        iterations: u32,
    },
    /// The goal write replaced a collectible marker at the same cell.
    GoalOverwroteCollectible {
        /// Cell where both placements landed.
        cell: Position,
    },
}

/// Kinds of placements subject to attempt budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementSubject {
    /// Collectibles under the min-distance invariant.
    Collectibles,
    /// The level goal.
    Goal,
    /// Gate and switch pairs.
    InteractivePairs,
}

/// Fatal failures that abort a run.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GenerationError {
    /// The configuration is unusable; nothing was mutated.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    /// A run was requested while another one was active.
    #[error("a generation run is already active")]
    Reentrancy,
    /// The active run was stopped by the host.
    #[error("generation run was cancelled")]
    Cancelled,
    /// A finished level failed its final consistency checks.
    #[error("level invariant violated: {0}")]
    InvariantViolation(String),
}

/// Lifecycle notifications emitted by the orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A run was accepted.
    Started {
        /// Identifier of the run.
        run: RunId,
    },
    /// A stage finished.
    StageCompleted {
        /// Identifier of the run.
        run: RunId,
        /// Stage that finished.
        stage: Stage,
        /// Stage-specific payload.
        summary: StageSummary,
    },
    /// A recoverable problem occurred.
    Warning {
        /// Identifier of the run.
        run: RunId,
        /// Description of the problem.
        warning: GenerationWarning,
    },
    /// The run published a finished level.
    Completed {
        /// Identifier of the run.
        run: RunId,
        /// Final object counts.
        counts: ObjectCounts,
    },
    /// The run failed or was rejected.
    Error {
        /// Identifier of the run, absent when the request was rejected outright.
        run: Option<RunId>,
        /// Failure reason.
        error: GenerationError,
    },
}
