#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates and prints Rollway levels.

mod config;

use std::{io, path::PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use rollway_core::{GenerationMode, GenerationWarning, LevelConfig, ObjectCounts, SeedMode};
use rollway_level::Level;
use rollway_rendering::{Presentation, RenderingBackend, TextBackend};
use rollway_system_orchestrator::{resolve_seed, Orchestrator, RunOutcome};
use serde::Serialize;

use crate::config::{ModeArg, Overrides};

#[derive(Parser, Debug)]
#[command(name = "rollway")]
#[command(about = "Generate procedural levels for a ball-rolling game")]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Edge length of the level in cells
    #[arg(short, long)]
    size: Option<u32>,

    /// Generation mode, disables adaptive selection
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Explicit seed (the configured seed mode is used if not specified)
    #[arg(long)]
    seed: Option<u64>,

    /// Pick the generation mode from the seed and difficulty
    #[arg(long)]
    adaptive: bool,

    /// Extra attempts with `seed + attempt` when the level is not walkable enough
    #[arg(short, long, default_value = "3")]
    retries: u32,

    /// Leave the glyph legend out of the printed map
    #[arg(long)]
    no_legend: bool,

    /// Print the JSON summary on a single line
    #[arg(long)]
    compact: bool,
}

/// Machine-readable description of the published level.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    run: u64,
    seed: u64,
    attempts: u32,
    mode: GenerationMode,
    size: u32,
    walkable_percent: f32,
    below_minimum_walkable: bool,
    collectibles: usize,
    goal: Option<[u32; 2]>,
    spawn: [u32; 2],
    counts: ObjectCounts,
    warnings: &'a [GenerationWarning],
}

impl<'a> Summary<'a> {
    fn new(level: &'a Level, attempts: u32) -> Self {
        let placements = &level.placements;
        Self {
            run: level.run.get(),
            seed: level.seed,
            attempts,
            mode: level.terrain.mode,
            size: level.terrain.grid.size(),
            walkable_percent: level.terrain.walkable_percent,
            below_minimum_walkable: level.terrain.below_minimum_walkable,
            collectibles: placements.collectibles.len(),
            goal: placements.goal.map(|goal| [goal.x(), goal.y()]),
            spawn: [placements.spawn.x(), placements.spawn.y()],
            counts: level.object_counts(),
            warnings: &level.warnings,
        }
    }
}

/// Entry point for the Rollway command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = config::load(args.config.as_deref())?;
    Overrides {
        size: args.size,
        mode: args.mode,
        seed: args.seed,
        adaptive: args.adaptive,
    }
    .apply(&mut config);

    let mut orchestrator = Orchestrator::new();
    let attempts = generate_with_retries(&mut orchestrator, &config, args.retries)?;
    let level = orchestrator
        .level()
        .ok_or_else(|| anyhow!("orchestrator finished without a level"))?;

    let mut presentation = Presentation::of_level(level);
    if args.no_legend {
        presentation = presentation.without_legend();
    }
    let mut backend = TextBackend::new(io::stdout().lock());
    backend
        .present(&presentation)
        .context("failed to print the level")?;

    let summary = Summary::new(level, attempts);
    let json = if args.compact {
        serde_json::to_string(&summary)
    } else {
        serde_json::to_string_pretty(&summary)
    }
    .context("failed to serialise the level summary")?;
    println!("{json}");
    Ok(())
}

/// Runs the pipeline, retrying with `seed + attempt` while the level falls short
/// of the walkable minimum. Returns the number of attempts made.
fn generate_with_retries(
    orchestrator: &mut Orchestrator,
    config: &LevelConfig,
    retries: u32,
) -> Result<u32> {
    let base_seed = resolve_seed(config.seed);
    let mut attempt = 0;
    loop {
        let seed = base_seed.wrapping_add(u64::from(attempt)).max(1);
        let run_config = LevelConfig {
            seed: SeedMode::Explicit(seed),
            ..config.clone()
        };

        let mut events = Vec::new();
        let run = orchestrator
            .generate(run_config, &mut events)
            .context("generation request was rejected")?;
        orchestrator.run_to_completion(&mut events);
        for event in &events {
            log::debug!("{event:?}");
        }

        if let Some(RunOutcome::Failed(failed, error)) = orchestrator.last_outcome() {
            if *failed == run {
                bail!("run {} failed: {error}", run.get());
            }
        }
        let level = orchestrator
            .level()
            .ok_or_else(|| anyhow!("run {} published no level", run.get()))?;

        attempt += 1;
        if !level.terrain.below_minimum_walkable {
            return Ok(attempt);
        }
        if attempt > retries {
            log::warn!("giving up after {attempt} attempts, keeping the last level");
            return Ok(attempt);
        }
        log::info!(
            "seed {seed} produced {:.1}% walkable, retrying",
            level.terrain.walkable_percent
        );
    }
}

#[cfg(test)]
mod tests {
    use rollway_core::{GenerationMode, LevelConfig, PrototypeSet, SeedMode};
    use rollway_system_orchestrator::Orchestrator;

    use super::{generate_with_retries, Summary};

    fn config() -> LevelConfig {
        LevelConfig {
            level_size: 12,
            seed: SeedMode::Explicit(5),
            prototypes: PrototypeSet::numbered(),
            ..LevelConfig::default()
        }
    }

    #[test]
    fn walkable_levels_need_a_single_attempt() {
        let mut orchestrator = Orchestrator::new();
        let config = LevelConfig {
            min_walkable_percent: 30.0,
            generation_mode: GenerationMode::Simple,
            ..config()
        };
        let attempts = generate_with_retries(&mut orchestrator, &config, 3).expect("level");
        assert_eq!(attempts, 1);
        assert_eq!(orchestrator.level().map(|level| level.seed), Some(5));
    }

    #[test]
    fn unreachable_minimum_exhausts_retries() {
        let mut orchestrator = Orchestrator::new();
        let config = LevelConfig {
            min_walkable_percent: 95.0,
            generation_mode: GenerationMode::Maze,
            ..config()
        };
        let attempts = generate_with_retries(&mut orchestrator, &config, 2).expect("level");
        assert_eq!(attempts, 3);
        assert_eq!(orchestrator.level().map(|level| level.seed), Some(7));
    }

    #[test]
    fn invalid_configs_are_reported() {
        let mut orchestrator = Orchestrator::new();
        let config = LevelConfig {
            level_size: 3,
            ..config()
        };
        assert!(generate_with_retries(&mut orchestrator, &config, 0).is_err());
    }

    #[test]
    fn summary_serialises_counts_and_warnings() {
        let mut orchestrator = Orchestrator::new();
        let _ = generate_with_retries(&mut orchestrator, &config(), 0).expect("level");
        let level = orchestrator.level().expect("level");
        let json = serde_json::to_value(Summary::new(level, 1)).expect("summary serialises");
        assert_eq!(json["seed"], 5);
        assert_eq!(json["size"], 12);
        assert_eq!(json["counts"]["goals"], 1);
        assert!(json["warnings"].is_array());
    }
}
