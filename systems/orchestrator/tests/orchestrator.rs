use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use rollway_core::{
    ConfigError, Event, GenerationError, GenerationMode, GenerationWarning, LevelConfig,
    OptionalFeature, Position, PrototypeSet, SeedMode, Stage, StageSummary,
};
use rollway_level::{query, Level};
use rollway_system_instantiation::Pool;
use rollway_system_orchestrator::{Orchestrator, OrchestratorState, RunOutcome};

fn config(size: u32, mode: GenerationMode, seed: u64) -> LevelConfig {
    LevelConfig {
        level_size: size,
        generation_mode: mode,
        seed: SeedMode::Explicit(seed),
        prototypes: PrototypeSet::numbered(),
        ..LevelConfig::default()
    }
}

fn run(orchestrator: &mut Orchestrator, config: LevelConfig) -> Vec<Event> {
    let mut events = Vec::new();
    let _ = orchestrator
        .generate(config, &mut events)
        .expect("run should be accepted");
    orchestrator.run_to_completion(&mut events);
    events
}

fn fingerprint(level: &Level) -> u64 {
    let mut hasher = DefaultHasher::new();
    query::grid(level).hash(&mut hasher);
    query::main_path(level).hash(&mut hasher);
    query::collectibles(level).hash(&mut hasher);
    query::goal(level).hash(&mut hasher);
    query::spawn(level).hash(&mut hasher);
    query::object_counts(level).hash(&mut hasher);
    for object in query::objects(level) {
        object.cell.hash(&mut hasher);
        object.role.hash(&mut hasher);
        object.material.hash(&mut hasher);
    }
    hasher.finish()
}

fn completed_stages(events: &[Event]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::StageCompleted { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

#[test]
fn run_reports_every_stage_in_order() {
    let mut orchestrator = Orchestrator::new();
    let events = run(&mut orchestrator, config(12, GenerationMode::Simple, 42));

    assert!(matches!(events.first(), Some(Event::Started { .. })));
    assert!(matches!(events.last(), Some(Event::Completed { .. })));
    assert_eq!(
        completed_stages(&events),
        vec![
            Stage::Validating,
            Stage::Initializing,
            Stage::GeneratingTerrain,
            Stage::PlacingCollectibles,
            Stage::InstantiatingObjects,
            Stage::ApplyingEffects,
            Stage::PlacingInteractive,
            Stage::Finalizing,
        ]
    );
    assert!(events.iter().any(|event| matches!(
        event,
        Event::StageCompleted {
            summary: StageSummary::Initialized { seed: 42, mode: GenerationMode::Simple },
            ..
        }
    )));

    let level = orchestrator.level().expect("level is published");
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);
    assert!(matches!(orchestrator.last_outcome(), Some(RunOutcome::Succeeded(_))));
    assert_eq!(orchestrator.pool().in_use(), query::objects(level).len());
    assert!(query::goal(level).is_some());
    assert!(query::grid(level).border_intact());
}

#[test]
fn completion_counts_match_the_level() {
    let mut orchestrator = Orchestrator::new();
    let events = run(&mut orchestrator, config(20, GenerationMode::Platforms, 5));
    let level = orchestrator.level().expect("level is published");
    let counts = query::object_counts(level);

    assert!(events.contains(&Event::Completed {
        run: level.run,
        counts,
    }));
    let cells = query::grid(level).cell_count();
    assert_eq!((counts.ground + counts.walls) as usize, cells);
    assert_eq!(counts.collectibles as usize, query::collectibles(level).len());
    assert_eq!(counts.goals, 1);
    assert_eq!(counts.gates as usize, query::interactive_pairs(level).len());
    assert_eq!(counts.switches, counts.gates);
    assert_eq!(counts.steam_emitters as usize, query::steam_emitters(level).len());
    assert!(counts.rotating_obstacles >= 1);
}

#[test]
fn identical_configurations_replay_identically() {
    for mode in GenerationMode::ALL {
        let mut first = Orchestrator::new();
        let mut second = Orchestrator::new();
        let _ = run(&mut first, config(17, mode, 1234));
        let _ = run(&mut second, config(17, mode, 1234));

        let first = first.level().expect("level is published");
        let second = second.level().expect("level is published");
        assert_eq!(query::grid(first), query::grid(second), "{mode:?}");
        assert_eq!(query::collectibles(first), query::collectibles(second));
        assert_eq!(query::goal(first), query::goal(second));
        assert_eq!(fingerprint(first), fingerprint(second), "{mode:?}");
    }
}

#[test]
fn reentrant_requests_are_rejected_without_side_effects() {
    let mut orchestrator = Orchestrator::new();
    let mut events = Vec::new();
    let _ = orchestrator
        .generate(config(10, GenerationMode::Maze, 3), &mut events)
        .expect("first run accepted");
    orchestrator.tick(&mut events);
    let state = orchestrator.state();

    let mut rejected = Vec::new();
    let result = orchestrator.generate(config(10, GenerationMode::Simple, 4), &mut rejected);
    assert_eq!(result, Err(GenerationError::Reentrancy));
    assert_eq!(
        rejected,
        vec![Event::Error {
            run: None,
            error: GenerationError::Reentrancy,
        }]
    );
    assert_eq!(orchestrator.state(), state);

    orchestrator.run_to_completion(&mut events);
    let level = orchestrator.level().expect("first run still completes");
    assert_eq!(level.terrain.mode, GenerationMode::Maze);
}

#[test]
fn invalid_configuration_keeps_the_previous_level() {
    let mut orchestrator = Orchestrator::new();
    let _ = run(&mut orchestrator, config(12, GenerationMode::Simple, 8));
    let before = fingerprint(orchestrator.level().expect("level is published"));
    let in_use = orchestrator.pool().in_use();

    let mut events = Vec::new();
    let result = orchestrator.generate(config(3, GenerationMode::Simple, 8), &mut events);
    let expected = GenerationError::Configuration(ConfigError::LevelTooSmall { size: 3 });
    assert_eq!(result, Err(expected.clone()));
    assert!(matches!(
        events.last(),
        Some(Event::Error { run: Some(_), error }) if *error == expected
    ));
    assert!(!orchestrator.is_running());
    assert_eq!(
        fingerprint(orchestrator.level().expect("level kept")),
        before
    );
    assert_eq!(orchestrator.pool().in_use(), in_use);
}

#[test]
fn missing_required_prototypes_fail_validation() {
    let mut config = config(10, GenerationMode::Simple, 2);
    config.prototypes.wall = None;
    let mut orchestrator = Orchestrator::new();
    let mut events = Vec::new();
    let result = orchestrator.generate(config, &mut events);
    assert!(matches!(
        result,
        Err(GenerationError::Configuration(ConfigError::MissingPrototype { .. }))
    ));
    assert!(orchestrator.level().is_none());
}

#[test]
fn regeneration_tears_down_before_the_next_run_starts() {
    let mut orchestrator = Orchestrator::new();
    let _ = run(&mut orchestrator, config(18, GenerationMode::Maze, 10));
    assert!(orchestrator.pool().in_use() > 0);

    let mut events = Vec::new();
    let _ = orchestrator
        .generate(config(18, GenerationMode::Organic, 11), &mut events)
        .expect("run accepted");
    assert!(orchestrator.level().is_none());
    assert_eq!(orchestrator.pool().in_use(), 0);
    assert_eq!(
        orchestrator.state(),
        OrchestratorState::Running(Stage::Initializing)
    );
    assert!(!completed_stages(&events).contains(&Stage::Initializing));

    orchestrator.tick(&mut events);
    assert!(completed_stages(&events).contains(&Stage::Initializing));

    orchestrator.run_to_completion(&mut events);
    let level = orchestrator.level().expect("level is published");
    assert_eq!(level.terrain.mode, GenerationMode::Organic);
    assert_eq!(orchestrator.pool().in_use(), query::objects(level).len());
    assert!(orchestrator.pool().idle_count(PrototypeSet::numbered().wall.expect("wall id")) <= 20);
}

#[test]
fn clear_level_releases_every_instance() {
    let mut orchestrator = Orchestrator::new();
    let _ = run(&mut orchestrator, config(16, GenerationMode::HybridMazeOpen, 6));
    assert!(orchestrator.pool().in_use() > 0);

    orchestrator.clear_level().expect("idle orchestrator can clear");
    assert_eq!(orchestrator.pool().in_use(), 0);
    assert!(orchestrator.level().is_none());
}

#[test]
fn clear_level_is_rejected_mid_run() {
    let mut orchestrator = Orchestrator::new();
    let mut events = Vec::new();
    let _ = orchestrator
        .generate(config(10, GenerationMode::Simple, 1), &mut events)
        .expect("run accepted");
    assert_eq!(orchestrator.clear_level(), Err(GenerationError::Reentrancy));
}

#[test]
fn cancellation_releases_partial_work() {
    let mut orchestrator = Orchestrator::new();
    let mut events = Vec::new();
    let run_id = orchestrator
        .generate(config(24, GenerationMode::Simple, 9), &mut events)
        .expect("run accepted");
    while orchestrator.state() != OrchestratorState::Running(Stage::InstantiatingObjects) {
        orchestrator.tick(&mut events);
    }
    orchestrator.tick(&mut events);
    assert!(orchestrator.pool().in_use() > 0);

    assert!(orchestrator.cancel(&mut events));
    assert_eq!(orchestrator.pool().in_use(), 0);
    assert!(orchestrator.level().is_none());
    assert!(!orchestrator.is_running());
    assert_eq!(
        events.last(),
        Some(&Event::Error {
            run: Some(run_id),
            error: GenerationError::Cancelled,
        })
    );
    assert!(!orchestrator.cancel(&mut events));
}

#[test]
fn instantiation_spans_several_ticks() {
    let mut orchestrator = Orchestrator::new();
    let mut events = Vec::new();
    let _ = orchestrator
        .generate(config(20, GenerationMode::Simple, 2), &mut events)
        .expect("run accepted");
    let mut instantiation_ticks = 0;
    while orchestrator.is_running() {
        if orchestrator.state() == OrchestratorState::Running(Stage::InstantiatingObjects) {
            instantiation_ticks += 1;
        }
        orchestrator.tick(&mut events);
    }
    // 400 cells in batches of 64.
    assert_eq!(instantiation_ticks, 7);
}

#[test]
fn large_mazes_carve_across_several_ticks() {
    let mut orchestrator = Orchestrator::new();
    let mut events = Vec::new();
    let _ = orchestrator
        .generate(config(41, GenerationMode::Maze, 8), &mut events)
        .expect("run accepted");
    let mut terrain_ticks = 0;
    while orchestrator.is_running() {
        if orchestrator.state() == OrchestratorState::Running(Stage::GeneratingTerrain) {
            terrain_ticks += 1;
        }
        orchestrator.tick(&mut events);
    }
    // 400 lattice cells need 799 carving iterations, 256 per tick.
    assert_eq!(terrain_ticks, 4);
    assert_eq!(
        completed_stages(&events)
            .iter()
            .filter(|stage| **stage == Stage::GeneratingTerrain)
            .count(),
        1
    );
    assert!(!events.iter().any(|event| matches!(
        event,
        Event::Warning {
            warning: GenerationWarning::MazeTruncated { .. },
            ..
        }
    )));

    let level = orchestrator.level().expect("level is published");
    let grid = query::grid(level);
    let uncarved = (1..40)
        .step_by(2)
        .flat_map(|y| (1..40).step_by(2).map(move |x| (x, y)))
        .filter(|&(x, y)| grid.is_wall(Position::new(x, y)))
        .count();
    assert_eq!(uncarved, 0);
}

#[test]
fn direct_pool_falls_back_with_a_warning() {
    let mut orchestrator = Orchestrator::with_pool(Pool::direct());
    let events = run(&mut orchestrator, config(16, GenerationMode::Simple, 4));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Warning {
            warning: GenerationWarning::SubsystemFallback { .. },
            ..
        }
    )));
    assert!(orchestrator.level().is_some());
}

#[test]
fn missing_optional_prototypes_skip_their_feature() {
    let mut config = config(16, GenerationMode::Platforms, 4);
    config.prototypes.moving_platform = None;
    let mut orchestrator = Orchestrator::new();
    let events = run(&mut orchestrator, config);

    assert!(events.iter().any(|event| matches!(
        event,
        Event::Warning {
            warning: GenerationWarning::FeatureSkipped {
                feature: OptionalFeature::MovingPlatforms
            },
            ..
        }
    )));
    let level = orchestrator.level().expect("run still completes");
    assert_eq!(query::object_counts(level).moving_platforms, 0);
    assert!(level
        .warnings
        .contains(&GenerationWarning::FeatureSkipped {
            feature: OptionalFeature::MovingPlatforms
        }));
}

#[test]
fn adaptive_runs_report_their_mode() {
    let config = LevelConfig {
        adaptive_mode: true,
        ..config(8, GenerationMode::Platforms, 77)
    };
    let mut orchestrator = Orchestrator::new();
    let events = run(&mut orchestrator, config);
    let mode = events
        .iter()
        .find_map(|event| match event {
            Event::StageCompleted {
                summary: StageSummary::Initialized { mode, .. },
                ..
            } => Some(*mode),
            _ => None,
        })
        .expect("initialisation reported");
    assert!(matches!(mode, GenerationMode::Simple | GenerationMode::Maze));
    let level = orchestrator.level().expect("level is published");
    assert_eq!(level.terrain.mode, mode);
}
