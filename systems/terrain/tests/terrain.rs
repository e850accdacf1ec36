use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rollway_core::{CellMarker, Densities, GenerationMode, LevelConfig, Position, PrototypeSet};
use rollway_level::{navigation, TerrainLayout};
use rollway_system_terrain::{maze, TerrainGenerator, TerrainProgress};

fn config(size: u32, mode: GenerationMode) -> LevelConfig {
    LevelConfig {
        level_size: size,
        generation_mode: mode,
        prototypes: PrototypeSet::numbered(),
        ..LevelConfig::default()
    }
}

fn generate(config: &LevelConfig, seed: u64) -> TerrainLayout {
    let features = config.validate().expect("config should validate");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    TerrainGenerator::new().generate(config, &features, config.generation_mode, &mut rng)
}

fn fingerprint(layout: &TerrainLayout) -> u64 {
    let mut hasher = DefaultHasher::new();
    layout.grid.hash(&mut hasher);
    layout.main_path.hash(&mut hasher);
    layout.platform_graph.hash(&mut hasher);
    layout.spawn.hash(&mut hasher);
    layout.moving_platform_tiles.hash(&mut hasher);
    layout.rotating_obstacle_sites.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn simple_scenario_keeps_a_continuous_open_path() {
    let config = LevelConfig {
        densities: Densities {
            obstacle: 0.1,
            ..Densities::default()
        },
        ..config(8, GenerationMode::Simple)
    };
    let layout = generate(&config, 42);

    assert!(layout.grid.border_intact());
    assert!(
        layout.walkable_percent >= 80.0,
        "walkable share {}",
        layout.walkable_percent
    );
    assert_eq!(layout.main_path.start(), Some(Position::new(1, 1)));
    assert_eq!(layout.main_path.end(), Some(Position::new(6, 6)));
    for pair in layout.main_path.cells().windows(2) {
        assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
    }
    for cell in layout.main_path.cells() {
        assert!(layout.grid.is_walkable(*cell));
    }
}

#[test]
fn maze_scenario_only_adds_the_requested_openings() {
    let config = LevelConfig {
        path_complexity: 0.5,
        ..config(12, GenerationMode::Maze)
    };
    let layout = generate(&config, 7);

    assert!(layout.grid.is_walkable(Position::new(1, 1)));
    // 25 lattice cells and 24 connectors, plus floor(144 * 0.5 * 0.1) openings.
    let openings = maze::extra_opening_count(12, 0.5);
    assert_eq!(openings, 7);
    assert_eq!(layout.grid.count(CellMarker::Walkable), 49 + openings);
    assert_eq!(layout.main_path.start(), Some(Position::new(1, 1)));
    assert_eq!(layout.main_path.end(), Some(Position::new(9, 9)));
}

#[test]
fn every_mode_keeps_the_border_walled() {
    for mode in GenerationMode::ALL {
        for size in [5, 6, 9, 16, 23] {
            for seed in [1, 2, 3] {
                let layout = generate(&config(size, mode), seed);
                assert!(
                    layout.grid.border_intact(),
                    "{mode:?} size {size} seed {seed} broke the border"
                );
                assert_eq!(layout.mode, mode);
            }
        }
    }
}

#[test]
fn anchors_are_connected_in_guaranteed_modes() {
    for seed in 1..8 {
        for size in [5, 8, 13, 20] {
            let far = size - 2;
            for mode in [GenerationMode::Simple, GenerationMode::Platforms] {
                let layout = generate(&config(size, mode), seed);
                assert!(
                    navigation::is_reachable(
                        &layout.grid,
                        Position::new(1, 1),
                        Position::new(far, far)
                    ),
                    "{mode:?} size {size} seed {seed}"
                );
            }

            let far = maze::far_lattice_coordinate(size);
            for mode in [GenerationMode::Maze, GenerationMode::HybridMazeOpen] {
                let layout = generate(&config(size, mode), seed);
                assert!(
                    navigation::is_reachable(
                        &layout.grid,
                        Position::new(1, 1),
                        Position::new(far, far)
                    ),
                    "{mode:?} size {size} seed {seed}"
                );
            }
        }
    }
}

#[test]
fn organic_modes_carve_their_main_path() {
    for mode in [GenerationMode::Organic, GenerationMode::HybridOrganicPath] {
        for seed in 1..6 {
            let layout = generate(&config(18, mode), seed);
            assert!(!layout.main_path.is_empty());
            for cell in layout.main_path.cells() {
                assert!(layout.grid.is_walkable(*cell), "{mode:?} seed {seed}");
            }
            assert!(navigation::is_reachable(
                &layout.grid,
                Position::new(1, 1),
                Position::new(16, 16)
            ));
        }
    }
}

#[test]
fn walkable_products_agree_with_the_grid() {
    let layout = generate(&config(14, GenerationMode::Organic), 5);
    assert_eq!(layout.walkable_tiles, layout.grid.walkable_positions());
    assert!(layout.grid.is_walkable(layout.spawn));
    assert_eq!(layout.spawn, layout.walkable_tiles[0]);
    assert_eq!(
        layout.below_minimum_walkable,
        layout.walkable_percent < 60.0
    );
}

#[test]
fn only_platforms_mode_builds_a_graph() {
    let platforms = generate(&config(16, GenerationMode::Platforms), 3);
    assert!(!platforms.platform_graph.is_empty());
    assert!(!platforms.rotating_obstacle_sites.is_empty());

    let simple = generate(&config(16, GenerationMode::Simple), 3);
    assert!(simple.platform_graph.is_empty());
    assert!(simple.moving_platform_tiles.is_empty());
    assert!(simple.rotating_obstacle_sites.is_empty());
}

#[test]
fn identical_seeds_replay_identical_terrain() {
    for mode in GenerationMode::ALL {
        let config = config(15, mode);
        let first = generate(&config, 99);
        let second = generate(&config, 99);
        assert_eq!(first, second, "{mode:?} diverged between runs");
        assert_eq!(fingerprint(&first), fingerprint(&second));
    }
}

#[test]
fn generator_reuse_matches_a_fresh_generator() {
    let config = config(13, GenerationMode::Maze);
    let features = config.validate().expect("config should validate");
    let mut generator = TerrainGenerator::new();

    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let _ = generator.generate(&config, &features, GenerationMode::Simple, &mut rng);
    generator.reset();

    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let reused = generator.generate(&config, &features, GenerationMode::Maze, &mut rng);
    assert_eq!(reused, generate(&config, 8));
}

#[test]
fn batched_carving_matches_one_shot_generation() {
    for mode in [GenerationMode::Maze, GenerationMode::HybridMazeOpen] {
        let config = config(31, mode);
        let features = config.validate().expect("config should validate");
        let mut generator = TerrainGenerator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        generator.begin(&config, mode);

        let mut calls = 0;
        let layout = loop {
            calls += 1;
            match generator.advance(&config, &features, &mut rng, 32) {
                TerrainProgress::Pending => continue,
                TerrainProgress::Complete(layout) => break *layout,
                TerrainProgress::Idle => panic!("generation was started"),
            }
        };
        assert!(calls > 1, "{mode:?} finished in a single call");
        assert_eq!(generator.carving_truncated(), None);
        assert_eq!(layout, generate(&config, 21), "{mode:?} diverged");
        assert_eq!(
            generator.advance(&config, &features, &mut rng, 32),
            TerrainProgress::Idle
        );
    }
}

#[test]
fn open_modes_finish_in_one_call() {
    let config = config(30, GenerationMode::Organic);
    let features = config.validate().expect("config should validate");
    let mut generator = TerrainGenerator::new();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    generator.begin(&config, GenerationMode::Organic);
    assert!(matches!(
        generator.advance(&config, &features, &mut rng, 1),
        TerrainProgress::Complete(_)
    ));
}

#[test]
fn large_mazes_are_not_truncated() {
    let config = config(201, GenerationMode::Maze);
    let features = config.validate().expect("config should validate");
    let mut generator = TerrainGenerator::new();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let layout = generator.generate(&config, &features, GenerationMode::Maze, &mut rng);

    assert_eq!(generator.carving_truncated(), None);
    let far = maze::far_lattice_coordinate(201);
    assert_eq!(layout.main_path.end(), Some(Position::new(far, far)));
    let uncarved = (1..=far)
        .step_by(2)
        .flat_map(|y| (1..=far).step_by(2).map(move |x| Position::new(x, y)))
        .filter(|cell| layout.grid.is_wall(*cell))
        .count();
    assert_eq!(uncarved, 0);
}
