#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Terrain synthesis for Rollway levels.
//!
//! The generator builds a fresh [`Grid`] for every run, executes one of the
//! six [`GenerationMode`]s against it and derives the products later stages
//! consume: the main path, the platform graph, the walkable-tile set and the
//! spawn cell. All randomness is drawn from the run's random source, so a
//! given configuration and seed always produce the same layout.

pub mod maze;
pub mod raster;

mod organic;
mod platforms;

use std::collections::HashSet;

use rand::Rng;
use rollway_core::{CellMarker, GenerationMode, LevelConfig, Position, ResolvedFeatures};
use rollway_level::{navigation, Grid, PathSet, PlatformGraph, TerrainLayout};

use crate::maze::{CarveProgress, MazeCarver};
use crate::platforms::PlatformOptions;

/// Derives the generation mode for a run.
///
/// With adaptive selection enabled a single uniform draw is taken from the
/// random source and resolved against the configured [`AdaptiveModeTable`]
/// brackets; otherwise the explicit mode is returned without consuming
/// randomness.
///
/// [`AdaptiveModeTable`]: rollway_core::AdaptiveModeTable
pub fn select_mode<R: Rng + ?Sized>(config: &LevelConfig, rng: &mut R) -> GenerationMode {
    if !config.adaptive_mode {
        return config.generation_mode;
    }

    let table = &config.adaptive_table;
    let draw: f32 = rng.gen();
    if config.level_size <= table.small_size_max {
        table.small.pick(draw)
    } else if config.level_size >= table.large_size_min
        && config.difficulty >= table.high_difficulty
    {
        table.large_hard.pick(draw)
    } else if config.difficulty >= table.medium_difficulty {
        table.medium.pick(draw)
    } else {
        config.generation_mode
    }
}

/// Progress reported by [`TerrainGenerator::advance`].
#[derive(Clone, Debug, PartialEq)]
pub enum TerrainProgress {
    /// No layout is in progress; [`TerrainGenerator::begin`] was not called.
    Idle,
    /// More calls are needed.
    Pending,
    /// The layout is finished.
    Complete(Box<TerrainLayout>),
}

/// Layout under construction between [`TerrainGenerator::advance`] calls.
#[derive(Debug)]
struct Draft {
    mode: GenerationMode,
    grid: Grid,
}

/// Resumable system that synthesises terrain layouts.
///
/// Maze-family modes carve in bounded batches so the host keeps control
/// between calls; every other mode finishes within the first call.
#[derive(Debug, Default)]
pub struct TerrainGenerator {
    carver: MazeCarver,
    path_lookup: HashSet<Position>,
    draft: Option<Draft>,
    truncated: Option<u32>,
}

impl TerrainGenerator {
    /// Creates a generator with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the grid for `mode` and derives every terrain product in one go.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        config: &LevelConfig,
        features: &ResolvedFeatures,
        mode: GenerationMode,
        rng: &mut R,
    ) -> TerrainLayout {
        let mut draft = self.start(config, mode);
        loop {
            match self.step(config, features, rng, draft, u32::MAX) {
                Ok(layout) => return layout,
                Err(rest) => draft = rest,
            }
        }
    }

    /// Starts a resumable layout for `mode`, discarding any unfinished one.
    pub fn begin(&mut self, config: &LevelConfig, mode: GenerationMode) {
        self.draft = Some(self.start(config, mode));
    }

    /// Spends up to `budget` carving iterations on the layout in progress.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        config: &LevelConfig,
        features: &ResolvedFeatures,
        rng: &mut R,
        budget: u32,
    ) -> TerrainProgress {
        let Some(draft) = self.draft.take() else {
            return TerrainProgress::Idle;
        };
        match self.step(config, features, rng, draft, budget) {
            Ok(layout) => TerrainProgress::Complete(Box::new(layout)),
            Err(rest) => {
                self.draft = Some(rest);
                TerrainProgress::Pending
            }
        }
    }

    /// Iterations spent by the last maze that stopped at its iteration cap.
    #[must_use]
    pub fn carving_truncated(&self) -> Option<u32> {
        self.truncated
    }

    /// Clears scratch state retained between runs.
    pub fn reset(&mut self) {
        self.carver.reset();
        self.path_lookup.clear();
        self.draft = None;
        self.truncated = None;
    }

    fn start(&mut self, config: &LevelConfig, mode: GenerationMode) -> Draft {
        self.truncated = None;
        let mut grid = Grid::walled(config.level_size);
        if mode.is_maze_family() {
            self.carver.begin(&mut grid, Position::new(1, 1));
        }
        Draft { mode, grid }
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        config: &LevelConfig,
        features: &ResolvedFeatures,
        rng: &mut R,
        mut draft: Draft,
        budget: u32,
    ) -> Result<TerrainLayout, Draft> {
        let size = config.level_size;
        let start = Position::new(1, 1);
        let far = size.saturating_sub(2).max(1);
        let end = Position::new(far, far);
        let mode = draft.mode;

        let mut platform_graph = PlatformGraph::default();
        let mut moving_platform_tiles = Vec::new();
        let mut rotating_obstacle_sites = Vec::new();

        let grid = &mut draft.grid;
        let main_path = match mode {
            GenerationMode::Simple => {
                self.generate_simple(grid, rng, config.densities.obstacle, start, end)
            }
            GenerationMode::Maze | GenerationMode::HybridMazeOpen => {
                match self.carver.advance(grid, rng, budget) {
                    CarveProgress::Pending => return Err(draft),
                    CarveProgress::Complete => {}
                    CarveProgress::Capped => {
                        let iterations = self.carver.iterations();
                        log::warn!("maze carving stopped at its cap after {iterations} iterations");
                        self.truncated = Some(iterations);
                    }
                }
                finish_maze(grid, rng, config, mode == GenerationMode::HybridMazeOpen)
            }
            GenerationMode::Platforms => {
                let layout = platforms::build(
                    grid,
                    rng,
                    start,
                    end,
                    PlatformOptions {
                        moving_platforms: features.moving_platforms,
                        rotating_obstacles: features.rotating_obstacles,
                        rotating_share: config.densities.rotating_obstacle,
                    },
                );
                platform_graph = layout.graph;
                moving_platform_tiles = layout.moving_platform_tiles;
                rotating_obstacle_sites = layout.rotating_obstacle_sites;
                layout.main_path
            }
            GenerationMode::Organic => {
                organic::carve_caves(grid, rng, config.densities.obstacle);
                carve_path(grid, &raster::line(start, end))
            }
            GenerationMode::HybridOrganicPath => {
                organic::carve_caves(grid, rng, config.densities.obstacle);
                let extra = (config.path_complexity * 3.0).round() as usize;
                let mut waypoints = vec![start];
                waypoints.extend(organic::random_waypoints(grid, rng, 1 + extra));
                waypoints.push(end);
                carve_path(grid, &raster::polyline(&waypoints))
            }
        };

        let grid = draft.grid;
        let walkable_tiles = grid.walkable_positions();
        let walkable_percent = grid.walkable_percent();
        let below_minimum_walkable = walkable_percent < config.min_walkable_percent;
        if below_minimum_walkable {
            log::warn!(
                "{mode:?} terrain is {walkable_percent:.1}% walkable, below the configured {:.1}%",
                config.min_walkable_percent
            );
        }
        let spawn = select_spawn(config, &walkable_tiles, start);

        log::debug!(
            "generated {size}x{size} {mode:?} terrain: {} walkable tiles, main path {} cells",
            walkable_tiles.len(),
            main_path.len()
        );

        Ok(TerrainLayout {
            mode,
            grid,
            main_path,
            platform_graph,
            walkable_tiles,
            walkable_percent,
            below_minimum_walkable,
            spawn,
            moving_platform_tiles,
            rotating_obstacle_sites,
        })
    }

    fn generate_simple<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        rng: &mut R,
        obstacle_density: f32,
        start: Position,
        end: Position,
    ) -> PathSet {
        grid.fill_interior(CellMarker::Walkable);
        let path = PathSet::new(raster::line(start, end));

        self.path_lookup.clear();
        self.path_lookup.extend(path.cells().iter().copied());

        let interior: Vec<Position> = grid.interior_positions().collect();
        for position in interior {
            if self.path_lookup.contains(&position) {
                continue;
            }
            if rng.gen::<f32>() >= obstacle_density {
                continue;
            }
            let clustered = grid
                .neighbors8(position)
                .any(|neighbor| grid.is_interior(neighbor) && grid.is_wall(neighbor));
            if !clustered {
                let _ = grid.set(position, CellMarker::Wall);
            }
        }

        path
    }
}

/// Opens extra walls and rooms in a carved maze and traces its main path.
fn finish_maze<R: Rng + ?Sized>(
    grid: &mut Grid,
    rng: &mut R,
    config: &LevelConfig,
    open_rooms: bool,
) -> PathSet {
    let start = Position::new(1, 1);
    let far = maze::far_lattice_coordinate(config.level_size);
    let end = Position::new(far, far);

    let openings = maze::extra_opening_count(config.level_size, config.path_complexity);
    let opened = maze::open_random_walls(grid, rng, openings);
    log::debug!("opened {opened} extra maze walls");

    if open_rooms {
        let rooms = organic::carve_open_rooms(grid, rng);
        log::debug!("carved {rooms} open rooms into the maze");
    }

    match navigation::shortest_path(grid, start, end) {
        Some(cells) => PathSet::new(cells),
        None => carve_path(grid, &raster::line(start, end)),
    }
}

fn carve_path(grid: &mut Grid, cells: &[Position]) -> PathSet {
    for cell in cells {
        let _ = grid.set(*cell, CellMarker::Walkable);
    }
    PathSet::new(cells.to_vec())
}

fn select_spawn(
    config: &LevelConfig,
    walkable_tiles: &[Position],
    fallback: Position,
) -> Position {
    let first = walkable_tiles.first().copied().unwrap_or(fallback);
    if !config.spawn.randomize {
        return first;
    }

    let size = config.level_size;
    let required = config.spawn.safe_radius / config.tile_size;
    walkable_tiles
        .iter()
        .copied()
        .find(|tile| border_distance(*tile, size) as f32 >= required)
        .unwrap_or(first)
}

fn border_distance(position: Position, size: u32) -> u32 {
    let last = size.saturating_sub(1);
    position
        .x()
        .min(position.y())
        .min(last.saturating_sub(position.x()))
        .min(last.saturating_sub(position.y()))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rollway_core::{GenerationMode, LevelConfig, Position, SpawnSettings};

    use super::{border_distance, select_mode, select_spawn};

    #[test]
    fn explicit_mode_consumes_no_randomness() {
        let config = LevelConfig {
            generation_mode: GenerationMode::Organic,
            ..LevelConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let before = rng.get_word_pos();
        assert_eq!(select_mode(&config, &mut rng), GenerationMode::Organic);
        assert_eq!(rng.get_word_pos(), before);
    }

    #[test]
    fn adaptive_mode_respects_brackets() {
        let mut config = LevelConfig {
            adaptive_mode: true,
            level_size: 8,
            ..LevelConfig::default()
        };
        config.adaptive_table.small.first_probability = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert_eq!(select_mode(&config, &mut rng), GenerationMode::Simple);

        config.level_size = 30;
        config.difficulty = 0.9;
        config.adaptive_table.large_hard.first_probability = 0.0;
        assert_eq!(select_mode(&config, &mut rng), GenerationMode::HybridMazeOpen);

        config.level_size = 15;
        config.difficulty = 0.5;
        config.adaptive_table.medium.first_probability = 1.0;
        assert_eq!(select_mode(&config, &mut rng), GenerationMode::Maze);

        config.difficulty = 0.1;
        config.generation_mode = GenerationMode::Platforms;
        assert_eq!(select_mode(&config, &mut rng), GenerationMode::Platforms);
    }

    #[test]
    fn adaptive_small_levels_pick_simple_or_maze() {
        let config = LevelConfig {
            adaptive_mode: true,
            level_size: 6,
            ..LevelConfig::default()
        };
        for seed in 0..32 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mode = select_mode(&config, &mut rng);
            assert!(matches!(mode, GenerationMode::Simple | GenerationMode::Maze));
        }
    }

    #[test]
    fn border_distance_measures_nearest_edge() {
        assert_eq!(border_distance(Position::new(1, 1), 10), 1);
        assert_eq!(border_distance(Position::new(4, 5), 10), 4);
        assert_eq!(border_distance(Position::new(8, 5), 10), 1);
    }

    #[test]
    fn randomised_spawn_keeps_its_safe_radius() {
        let config = LevelConfig {
            tile_size: 2.0,
            spawn: SpawnSettings {
                randomize: true,
                safe_radius: 6.0,
            },
            ..LevelConfig::default()
        };
        let tiles = [Position::new(1, 1), Position::new(2, 3), Position::new(3, 3)];
        assert_eq!(select_spawn(&config, &tiles, Position::new(1, 1)), Position::new(3, 3));

        let fixed = LevelConfig::default();
        assert_eq!(select_spawn(&fixed, &tiles, Position::new(1, 1)), Position::new(1, 1));
    }
}
