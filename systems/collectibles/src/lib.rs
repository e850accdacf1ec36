#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Zone-balanced collectible and goal placement.
//!
//! Candidates are walkable cells off the main path. They are split into the
//! four quadrants, with dead ends ahead of ordinary tiles, and drawn in two
//! passes under the min-distance invariant: a round-robin pass that takes at
//! most one collectible per quadrant per round, then a pooled pass over
//! whatever is left. Both passes share one attempt budget. The goal is the
//! walkable cell furthest from the grid centre, and both placements are
//! finally written back into the grid.

use std::collections::HashSet;

use rand::Rng;
use rollway_core::{
    CellMarker, GenerationWarning, LevelConfig, PlacementSubject, Position, Quadrant,
};
use rollway_level::{Grid, PathSet, PlacementResult, TerrainLayout};

/// Candidate evaluations allowed across both placement passes.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 1_000;

/// Output of a placement run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementReport {
    /// Collectible, goal and spawn placements.
    pub result: PlacementResult,
    /// Recoverable problems met while placing.
    pub warnings: Vec<GenerationWarning>,
    /// Candidate evaluations spent.
    pub attempts: u32,
}

/// Pure system that places collectibles and the goal.
#[derive(Debug, Default)]
pub struct CollectiblePlacer {
    zones: [ZonePool; 4],
    path_lookup: HashSet<Position>,
    dead_end_lookup: HashSet<Position>,
    leftovers: Vec<Position>,
    placed: Vec<Position>,
    attempts: u32,
}

impl CollectiblePlacer {
    /// Creates a placer with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places collectibles and the goal, then writes their markers into the grid.
    pub fn place<R: Rng + ?Sized>(
        &mut self,
        config: &LevelConfig,
        terrain: &mut TerrainLayout,
        rng: &mut R,
    ) -> PlacementReport {
        self.reset();
        let mut warnings = Vec::new();

        let dead_ends = find_dead_ends(&terrain.grid, &terrain.main_path);
        self.fill_zones(&terrain.grid, &terrain.main_path, &dead_ends, terrain.spawn);

        let target = usize::try_from(config.collectible_count).unwrap_or(usize::MAX);
        let min_distance = config.collectible_min_distance;
        self.round_robin_pass(target, min_distance, rng);
        self.pooled_pass(target, min_distance, rng);

        if self.placed.len() < target {
            log::warn!(
                "placed {} of {} collectibles within {} attempts",
                self.placed.len(),
                target,
                self.attempts
            );
            warnings.push(GenerationWarning::PlacementExhaustion {
                subject: PlacementSubject::Collectibles,
                requested: config.collectible_count,
                placed: u32::try_from(self.placed.len()).unwrap_or(u32::MAX),
            });
        }

        let goal = select_goal(&terrain.grid, &self.placed, terrain.spawn);
        if goal.is_none() {
            log::warn!("no walkable cell is available for the goal");
            warnings.push(GenerationWarning::PlacementExhaustion {
                subject: PlacementSubject::Goal,
                requested: 1,
                placed: 0,
            });
        }

        let result = PlacementResult {
            collectibles: self.placed.clone(),
            goal,
            spawn: terrain.spawn,
            dead_ends,
        };
        if let Some(cell) = write_back(&mut terrain.grid, &result) {
            log::warn!("goal overwrote the collectible at {cell:?}");
            warnings.push(GenerationWarning::GoalOverwroteCollectible { cell });
        }

        log::debug!(
            "placed {} collectibles and goal {:?} using {} attempts",
            result.collectibles.len(),
            result.goal,
            self.attempts
        );

        PlacementReport {
            result,
            warnings,
            attempts: self.attempts,
        }
    }

    /// Clears scratch state retained between runs.
    pub fn reset(&mut self) {
        for zone in &mut self.zones {
            zone.clear();
        }
        self.path_lookup.clear();
        self.dead_end_lookup.clear();
        self.leftovers.clear();
        self.placed.clear();
        self.attempts = 0;
    }

    fn fill_zones(
        &mut self,
        grid: &Grid,
        main_path: &PathSet,
        dead_ends: &[Position],
        spawn: Position,
    ) {
        let size = grid.size();
        self.path_lookup.extend(main_path.cells().iter().copied());
        self.dead_end_lookup.extend(dead_ends.iter().copied());
        for cell in dead_ends {
            if *cell != spawn {
                self.zones[Quadrant::of(*cell, size).index()].dead_ends.push(*cell);
            }
        }
        for cell in grid.walkable_positions() {
            if cell == spawn
                || self.path_lookup.contains(&cell)
                || self.dead_end_lookup.contains(&cell)
            {
                continue;
            }
            self.zones[Quadrant::of(cell, size).index()].tiles.push(cell);
        }
    }

    fn round_robin_pass<R: Rng + ?Sized>(
        &mut self,
        target: usize,
        min_distance: f32,
        rng: &mut R,
    ) {
        loop {
            let mut accepted_this_round = false;
            for quadrant in Quadrant::ALL {
                if self.placed.len() >= target || self.attempts >= MAX_PLACEMENT_ATTEMPTS {
                    return;
                }
                while self.attempts < MAX_PLACEMENT_ATTEMPTS {
                    let Some(candidate) = self.zones[quadrant.index()].pop(rng) else {
                        break;
                    };
                    self.attempts += 1;
                    if respects_min_distance(&self.placed, candidate, min_distance) {
                        self.placed.push(candidate);
                        accepted_this_round = true;
                        break;
                    }
                }
            }
            if !accepted_this_round {
                return;
            }
        }
    }

    fn pooled_pass<R: Rng + ?Sized>(&mut self, target: usize, min_distance: f32, rng: &mut R) {
        for zone in &mut self.zones {
            self.leftovers.append(&mut zone.dead_ends);
            self.leftovers.append(&mut zone.tiles);
        }
        while self.placed.len() < target
            && self.attempts < MAX_PLACEMENT_ATTEMPTS
            && !self.leftovers.is_empty()
        {
            let index = rng.gen_range(0..self.leftovers.len());
            let candidate = self.leftovers.swap_remove(index);
            self.attempts += 1;
            if respects_min_distance(&self.placed, candidate, min_distance) {
                self.placed.push(candidate);
            }
        }
    }
}

/// Candidate pool for one quadrant, drawn dead ends first.
#[derive(Debug, Default)]
struct ZonePool {
    dead_ends: Vec<Position>,
    tiles: Vec<Position>,
}

impl ZonePool {
    fn pop<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Position> {
        let tier = if self.dead_ends.is_empty() {
            &mut self.tiles
        } else {
            &mut self.dead_ends
        };
        if tier.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..tier.len());
        Some(tier.swap_remove(index))
    }

    fn clear(&mut self) {
        self.dead_ends.clear();
        self.tiles.clear();
    }
}

/// Walkable cells off the main path with exactly one walkable orthogonal neighbour.
#[must_use]
pub fn find_dead_ends(grid: &Grid, main_path: &PathSet) -> Vec<Position> {
    let path: HashSet<Position> = main_path.cells().iter().copied().collect();
    grid.interior_positions()
        .filter(|cell| grid.is_walkable(*cell) && !path.contains(cell))
        .filter(|cell| {
            grid.neighbors4(*cell)
                .filter(|neighbor| grid.is_walkable(*neighbor))
                .count()
                == 1
        })
        .collect()
}

/// Walkable cell furthest from the grid centre that is not a collectible.
///
/// The spawn cell is only chosen when nothing else qualifies. Ties keep the
/// earliest cell in row-major order.
#[must_use]
pub fn select_goal(grid: &Grid, collectibles: &[Position], spawn: Position) -> Option<Position> {
    let center = (grid.size() as f32 - 1.0) / 2.0;
    let distance = |cell: Position| {
        let dx = cell.x() as f32 - center;
        let dy = cell.y() as f32 - center;
        dx * dx + dy * dy
    };

    let mut best: Option<(Position, f32)> = None;
    for cell in grid.interior_positions() {
        if !grid.is_walkable(cell) || collectibles.contains(&cell) || cell == spawn {
            continue;
        }
        let candidate = distance(cell);
        if best.map_or(true, |(_, furthest)| candidate > furthest) {
            best = Some((cell, candidate));
        }
    }

    match best {
        Some((cell, _)) => Some(cell),
        None if grid.is_walkable(spawn) && !collectibles.contains(&spawn) => Some(spawn),
        None => None,
    }
}

/// Writes collectible markers, then the goal marker.
///
/// Returns the cell where the goal replaced a collectible, if any.
pub fn write_back(grid: &mut Grid, placements: &PlacementResult) -> Option<Position> {
    for cell in &placements.collectibles {
        let _ = grid.set(*cell, CellMarker::Collectible);
    }
    let goal = placements.goal?;
    let overwrote = grid.get(goal) == Some(CellMarker::Collectible);
    let _ = grid.set(goal, CellMarker::Goal);
    overwrote.then_some(goal)
}

fn respects_min_distance(placed: &[Position], candidate: Position, min_distance: f32) -> bool {
    placed
        .iter()
        .all(|other| other.distance(candidate) >= min_distance)
}
