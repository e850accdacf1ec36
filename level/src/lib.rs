#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state for Rollway.
//!
//! The [`Grid`] is created fresh for every run, mutated in place by terrain
//! synthesis and collectible placement, and read-only afterwards. The other
//! types here are the products handed forward between systems and finally
//! assembled into a [`Level`], which hosts inspect through [`query`].

pub mod navigation;

use glam::Vec3;
use rollway_core::{
    CellMarker, GenerationMode, GenerationWarning, InstanceId, MaterialId, ObjectCounts,
    Position, PrototypeId, RunId,
};
use serde::{Deserialize, Serialize};

/// Square grid of cell markers whose outer ring is always [`CellMarker::Wall`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grid {
    size: u32,
    cells: Vec<CellMarker>,
}

impl Grid {
    /// Creates a grid where every cell, border and interior, is a wall.
    #[must_use]
    pub fn walled(size: u32) -> Self {
        let side = usize::try_from(size).unwrap_or(0);
        Self {
            size,
            cells: vec![CellMarker::Wall; side * side],
        }
    }

    /// Creates a grid with a walled border and a walkable interior.
    #[must_use]
    pub fn open(size: u32) -> Self {
        let mut grid = Self::walled(size);
        grid.fill_interior(CellMarker::Walkable);
        grid
    }

    /// Edge length of the grid in cells.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells inside the border ring.
    #[must_use]
    pub fn interior_count(&self) -> usize {
        let inner = usize::try_from(self.size.saturating_sub(2)).unwrap_or(0);
        inner * inner
    }

    /// Row-major index of a cell, or `None` when out of bounds.
    #[must_use]
    pub fn index(&self, position: Position) -> Option<usize> {
        if position.x() < self.size && position.y() < self.size {
            let row = usize::try_from(position.y()).ok()?;
            let column = usize::try_from(position.x()).ok()?;
            let width = usize::try_from(self.size).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    /// Marker stored at the position.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<CellMarker> {
        self.index(position)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Writes a marker into an interior cell.
    ///
    /// Border cells stay walls; the call returns `false` when the write was
    /// refused or the position is out of bounds.
    pub fn set(&mut self, position: Position, marker: CellMarker) -> bool {
        if !self.is_interior(position) {
            return false;
        }
        match self.index(position) {
            Some(index) => {
                self.cells[index] = marker;
                true
            }
            None => false,
        }
    }

    /// Overwrites every interior cell with the marker.
    pub fn fill_interior(&mut self, marker: CellMarker) {
        let positions: Vec<Position> = self.interior_positions().collect();
        for position in positions {
            let _ = self.set(position, marker);
        }
    }

    /// Reports whether the position lies on the outer ring.
    #[must_use]
    pub fn is_border(&self, position: Position) -> bool {
        position.x() < self.size
            && position.y() < self.size
            && (position.x() == 0
                || position.y() == 0
                || position.x() == self.size - 1
                || position.y() == self.size - 1)
    }

    /// Reports whether the position lies strictly inside the outer ring.
    #[must_use]
    pub fn is_interior(&self, position: Position) -> bool {
        position.x() > 0
            && position.y() > 0
            && position.x() + 1 < self.size
            && position.y() + 1 < self.size
    }

    /// Reports whether the cell exists and can be rolled across.
    #[must_use]
    pub fn is_walkable(&self, position: Position) -> bool {
        self.get(position).is_some_and(CellMarker::is_walkable)
    }

    /// Reports whether the cell exists and is a wall.
    #[must_use]
    pub fn is_wall(&self, position: Position) -> bool {
        self.get(position) == Some(CellMarker::Wall)
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.size).flat_map(move |y| (0..self.size).map(move |x| Position::new(x, y)))
    }

    /// Interior positions in row-major order.
    pub fn interior_positions(&self) -> impl Iterator<Item = Position> + '_ {
        let inner_end = self.size.saturating_sub(1);
        (1..inner_end).flat_map(move |y| (1..inner_end).map(move |x| Position::new(x, y)))
    }

    /// Positions paired with their markers in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, CellMarker)> + '_ {
        self.positions().zip(self.cells.iter().copied())
    }

    /// In-bounds orthogonal neighbours.
    pub fn neighbors4(&self, position: Position) -> impl Iterator<Item = Position> + '_ {
        const OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
        OFFSETS
            .into_iter()
            .filter_map(move |(dx, dy)| position.offset(dx, dy))
            .filter(move |neighbor| self.index(*neighbor).is_some())
    }

    /// In-bounds neighbours including diagonals.
    pub fn neighbors8(&self, position: Position) -> impl Iterator<Item = Position> + '_ {
        const OFFSETS: [(i32, i32); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        OFFSETS
            .into_iter()
            .filter_map(move |(dx, dy)| position.offset(dx, dy))
            .filter(move |neighbor| self.index(*neighbor).is_some())
    }

    /// Walkable cells in row-major order.
    #[must_use]
    pub fn walkable_positions(&self) -> Vec<Position> {
        self.cells()
            .filter(|(_, marker)| marker.is_walkable())
            .map(|(position, _)| position)
            .collect()
    }

    /// Walkable share of the interior, in percent.
    #[must_use]
    pub fn walkable_percent(&self) -> f32 {
        let interior = self.interior_count();
        if interior == 0 {
            return 0.0;
        }
        let walkable = self
            .interior_positions()
            .filter(|position| self.is_walkable(*position))
            .count();
        walkable as f32 * 100.0 / interior as f32
    }

    /// Reports whether every outer-ring cell is a wall.
    #[must_use]
    pub fn border_intact(&self) -> bool {
        self.positions()
            .filter(|position| self.is_border(*position))
            .all(|position| self.is_wall(position))
    }

    /// Number of cells carrying the marker.
    #[must_use]
    pub fn count(&self, marker: CellMarker) -> usize {
        self.cells.iter().filter(|cell| **cell == marker).count()
    }
}

/// Ordered walkable route between two anchor cells.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSet {
    cells: Vec<Position>,
}

impl PathSet {
    /// Wraps an ordered cell sequence.
    #[must_use]
    pub fn new(cells: Vec<Position>) -> Self {
        Self { cells }
    }

    /// Appends cells, skipping any that repeat the current tail.
    pub fn extend(&mut self, cells: impl IntoIterator<Item = Position>) {
        for cell in cells {
            if self.cells.last() != Some(&cell) {
                self.cells.push(cell);
            }
        }
    }

    /// Cells in traversal order.
    #[must_use]
    pub fn cells(&self) -> &[Position] {
        &self.cells
    }

    /// Starting anchor.
    #[must_use]
    pub fn start(&self) -> Option<Position> {
        self.cells.first().copied()
    }

    /// Ending anchor.
    #[must_use]
    pub fn end(&self) -> Option<Position> {
        self.cells.last().copied()
    }

    /// Number of cells on the path, repeats included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the path has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether the cell lies on the path.
    #[must_use]
    pub fn contains(&self, cell: Position) -> bool {
        self.cells.contains(&cell)
    }
}

/// Connection between two platform centres.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformEdge {
    /// First endpoint.
    pub from: Position,
    /// Second endpoint.
    pub to: Position,
    /// Whether moving platforms were tagged along this edge.
    pub supports_moving_platform: bool,
}

/// Platforms-mode connectivity graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformGraph {
    centers: Vec<Position>,
    edges: Vec<PlatformEdge>,
}

impl PlatformGraph {
    /// Creates a graph from its nodes and edges.
    #[must_use]
    pub fn new(centers: Vec<Position>, edges: Vec<PlatformEdge>) -> Self {
        Self { centers, edges }
    }

    /// Platform centres in creation order.
    #[must_use]
    pub fn centers(&self) -> &[Position] {
        &self.centers
    }

    /// Edges between centres whose distance lies in `(2, 6)`.
    #[must_use]
    pub fn edges(&self) -> &[PlatformEdge] {
        &self.edges
    }

    /// Reports whether the graph has no centres.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// Everything terrain synthesis hands to later stages.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainLayout {
    /// Mode that produced the grid.
    pub mode: GenerationMode,
    /// Synthesised grid.
    pub grid: Grid,
    /// Guaranteed route between the anchors.
    pub main_path: PathSet,
    /// Platform graph; empty outside Platforms mode.
    pub platform_graph: PlatformGraph,
    /// Walkable cells in row-major order.
    pub walkable_tiles: Vec<Position>,
    /// Walkable share of the interior, in percent.
    pub walkable_percent: f32,
    /// Set when the walkable share is below the configured minimum.
    pub below_minimum_walkable: bool,
    /// Player spawn cell.
    pub spawn: Position,
    /// Cells tagged for moving platforms.
    pub moving_platform_tiles: Vec<Position>,
    /// Platform centres tagged for rotating obstacles.
    pub rotating_obstacle_sites: Vec<Position>,
}

/// Collectible, goal and spawn placements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementResult {
    /// Collectible cells, pairwise at least the configured distance apart.
    pub collectibles: Vec<Position>,
    /// Goal cell, absent only when no walkable candidate existed.
    pub goal: Option<Position>,
    /// Player spawn cell.
    pub spawn: Position,
    /// Dead ends found off the main path.
    pub dead_ends: Vec<Position>,
}

impl PlacementResult {
    /// Reports whether the goal landed on a collectible cell.
    #[must_use]
    pub fn goal_collides_with_collectible(&self) -> bool {
        self.goal
            .is_some_and(|goal| self.collectibles.contains(&goal))
    }
}

/// Role a spawned object plays in the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectRole {
    /// Floor tile.
    Ground,
    /// Wall block.
    Wall,
    /// Collectible overlay.
    Collectible,
    /// Goal overlay.
    Goal,
    /// Moving platform.
    MovingPlatform,
    /// Rotating obstacle.
    RotatingObstacle,
    /// Gate controller.
    Gate,
    /// Switch trigger.
    Switch,
    /// Ambient decoration.
    Decoration,
    /// Steam emitter.
    SteamEmitter,
}

/// Concrete object the host should realise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnedObject {
    /// Pool-issued instance identity.
    pub instance: InstanceId,
    /// Prototype the instance was created from.
    pub prototype: PrototypeId,
    /// Role of the object.
    pub role: ObjectRole,
    /// Grid cell the object belongs to.
    pub cell: Position,
    /// World-space position.
    pub position: Vec3,
    /// Cosmetic material, if any.
    pub material: Option<MaterialId>,
    /// Bound counterpart, used by gate/switch pairs.
    pub linked: Option<InstanceId>,
}

/// Decoration sampled onto a walkable tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecorationPlacement {
    /// Tile hosting the decoration.
    pub cell: Position,
    /// Decoration prototype.
    pub prototype: PrototypeId,
}

/// Steam emitter placed above a platform centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteamEmitterPlacement {
    /// Platform centre below the emitter.
    pub center: Position,
    /// Emitter prototype.
    pub prototype: PrototypeId,
    /// World-space position, offset above the platform.
    pub position: Vec3,
}

/// Bound gate and switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractivePair {
    /// Tile hosting the switch trigger.
    pub switch: Position,
    /// Tile hosting the gate controller.
    pub gate: Position,
    /// Switch instance.
    pub switch_instance: InstanceId,
    /// Gate instance.
    pub gate_instance: InstanceId,
}

/// Finished level published by a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    /// Run that produced the level.
    pub run: RunId,
    /// Seed the run resolved to.
    pub seed: u64,
    /// Terrain products.
    pub terrain: TerrainLayout,
    /// Collectible, goal and spawn placements.
    pub placements: PlacementResult,
    /// Every object acquired for the level.
    pub objects: Vec<SpawnedObject>,
    /// Decorations.
    pub decorations: Vec<DecorationPlacement>,
    /// Steam emitters.
    pub steam_emitters: Vec<SteamEmitterPlacement>,
    /// Gate/switch pairs.
    pub interactive_pairs: Vec<InteractivePair>,
    /// Recoverable problems signalled during the run.
    pub warnings: Vec<GenerationWarning>,
}

impl Level {
    /// Tallies the spawned objects by role.
    #[must_use]
    pub fn object_counts(&self) -> ObjectCounts {
        count_objects(&self.objects)
    }
}

/// World-space centre of a cell on the ground plane.
///
/// Grid `x` maps to world `x` and grid `y` to world `z`; `y` is up.
#[must_use]
pub fn world_position(cell: Position, tile_size: f32) -> Vec3 {
    Vec3::new(cell.x() as f32 * tile_size, 0.0, cell.y() as f32 * tile_size)
}

/// Tallies objects by role.
#[must_use]
pub fn count_objects(objects: &[SpawnedObject]) -> ObjectCounts {
    let mut counts = ObjectCounts::default();
    for object in objects {
        let slot = match object.role {
            ObjectRole::Ground => &mut counts.ground,
            ObjectRole::Wall => &mut counts.walls,
            ObjectRole::Collectible => &mut counts.collectibles,
            ObjectRole::Goal => &mut counts.goals,
            ObjectRole::MovingPlatform => &mut counts.moving_platforms,
            ObjectRole::RotatingObstacle => &mut counts.rotating_obstacles,
            ObjectRole::Gate => &mut counts.gates,
            ObjectRole::Switch => &mut counts.switches,
            ObjectRole::Decoration => &mut counts.decorations,
            ObjectRole::SteamEmitter => &mut counts.steam_emitters,
        };
        *slot += 1;
    }
    counts
}

/// Query functions that provide read-only access to a finished level.
pub mod query {
    use rollway_core::{ObjectCounts, Position};

    use super::{
        Grid, InteractivePair, Level, PlatformGraph, SpawnedObject, SteamEmitterPlacement,
    };

    /// Final grid.
    #[must_use]
    pub fn grid(level: &Level) -> &Grid {
        &level.terrain.grid
    }

    /// Walkable tiles in row-major order.
    #[must_use]
    pub fn walkable_tiles(level: &Level) -> &[Position] {
        &level.terrain.walkable_tiles
    }

    /// Main path between the anchors.
    #[must_use]
    pub fn main_path(level: &Level) -> &[Position] {
        level.terrain.main_path.cells()
    }

    /// Platform graph; empty outside Platforms mode.
    #[must_use]
    pub fn platform_graph(level: &Level) -> &PlatformGraph {
        &level.terrain.platform_graph
    }

    /// Final collectible cells.
    #[must_use]
    pub fn collectibles(level: &Level) -> &[Position] {
        &level.placements.collectibles
    }

    /// Goal cell.
    #[must_use]
    pub fn goal(level: &Level) -> Option<Position> {
        level.placements.goal
    }

    /// Player spawn cell.
    #[must_use]
    pub fn spawn(level: &Level) -> Position {
        level.placements.spawn
    }

    /// Steam emitter placements.
    #[must_use]
    pub fn steam_emitters(level: &Level) -> &[SteamEmitterPlacement] {
        &level.steam_emitters
    }

    /// Gate/switch pairs.
    #[must_use]
    pub fn interactive_pairs(level: &Level) -> &[InteractivePair] {
        &level.interactive_pairs
    }

    /// Every spawned object.
    #[must_use]
    pub fn objects(level: &Level) -> &[SpawnedObject] {
        &level.objects
    }

    /// Final object counts.
    #[must_use]
    pub fn object_counts(level: &Level) -> ObjectCounts {
        level.object_counts()
    }
}
