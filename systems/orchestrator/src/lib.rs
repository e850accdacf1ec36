#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooperative state machine that sequences a generation run.
//!
//! Hosts call [`Orchestrator::generate`] to request a run and then drive it
//! with [`Orchestrator::tick`], draining the [`Event`]s each call appends.
//! Every tick performs one bounded unit of work. Only one run may be active
//! at a time; regeneration tears the previous level down before the next
//! run's first stage executes on a later tick.

mod seed;

use rand_chacha::ChaCha8Rng;
use rollway_core::{
    Event, GenerationError, GenerationMode, GenerationWarning, LevelConfig, ObjectCounts,
    ResolvedFeatures, RunId, Stage, StageSummary,
};
use rollway_level::{
    count_objects, DecorationPlacement, InteractivePair, Level, PlacementResult, SpawnedObject,
    SteamEmitterPlacement, TerrainLayout,
};
use rollway_system_collectibles::CollectiblePlacer;
use rollway_system_effects::{
    assign_materials, place_decorations, place_steam_emitters, MaterialPlan,
};
use rollway_system_instantiation::{
    place_interactive_pairs, release_objects, spawn_decorations, spawn_dynamic_elements,
    spawn_steam_emitters, BatchProgress, ObjectInstantiator, Pool, CELLS_PER_BATCH,
};
use rollway_system_terrain::{
    maze::CARVE_STEPS_PER_BATCH, select_mode, TerrainGenerator, TerrainProgress,
};

pub use seed::resolve_seed;

/// Density sum above which a configuration is likely to crowd the level.
pub const RECOMMENDED_DENSITY_LIMIT: f32 = 0.8;

/// Pipeline position of the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrchestratorState {
    /// No run is active.
    Idle,
    /// A stage of the active run will execute on the next tick.
    Running(Stage),
}

/// How the most recent run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// The run published a level.
    Succeeded(RunId),
    /// The run failed or was cancelled.
    Failed(RunId, GenerationError),
}

/// Per-run scratch owned exclusively by the active run.
#[derive(Debug)]
struct ActiveRun {
    id: RunId,
    config: LevelConfig,
    features: ResolvedFeatures,
    seed: u64,
    rng: Option<ChaCha8Rng>,
    mode: GenerationMode,
    terrain: Option<TerrainLayout>,
    placements: Option<PlacementResult>,
    materials: Option<MaterialPlan>,
    objects: Vec<SpawnedObject>,
    decorations: Vec<DecorationPlacement>,
    steam_emitters: Vec<SteamEmitterPlacement>,
    pairs: Vec<InteractivePair>,
    warnings: Vec<GenerationWarning>,
}

impl ActiveRun {
    fn new(id: RunId, config: LevelConfig, features: ResolvedFeatures) -> Self {
        Self {
            id,
            mode: config.generation_mode,
            config,
            features,
            seed: 0,
            rng: None,
            terrain: None,
            placements: None,
            materials: None,
            objects: Vec::new(),
            decorations: Vec::new(),
            steam_emitters: Vec::new(),
            pairs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, warning: GenerationWarning, out: &mut Vec<Event>) {
        out.push(Event::Warning {
            run: self.id,
            warning: warning.clone(),
        });
        self.warnings.push(warning);
    }
}

/// Owner of the pool, the subsystems and the published level.
#[derive(Debug)]
pub struct Orchestrator {
    state: OrchestratorState,
    pool: Pool,
    terrain: TerrainGenerator,
    placer: CollectiblePlacer,
    instantiator: ObjectInstantiator,
    run: Option<ActiveRun>,
    level: Option<Level>,
    next_run: u64,
    last_outcome: Option<RunOutcome>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Creates an idle orchestrator with a recycling pool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(Pool::default())
    }

    /// Creates an idle orchestrator that instantiates through `pool`.
    #[must_use]
    pub fn with_pool(pool: Pool) -> Self {
        Self {
            state: OrchestratorState::Idle,
            pool,
            terrain: TerrainGenerator::new(),
            placer: CollectiblePlacer::new(),
            instantiator: ObjectInstantiator::new(),
            run: None,
            level: None,
            next_run: 1,
            last_outcome: None,
        }
    }

    /// Current pipeline position.
    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Reports whether a run is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state != OrchestratorState::Idle
    }

    /// Most recently published level.
    #[must_use]
    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    /// How the most recent run ended.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&RunOutcome> {
        self.last_outcome.as_ref()
    }

    /// Pool that owns every instance handed to the host.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Requests a new run.
    ///
    /// The request is rejected while another run is active. The configuration
    /// is validated immediately; a rejected configuration leaves the current
    /// level untouched. An accepted run tears the current level down and
    /// starts executing on the next [`Orchestrator::tick`].
    pub fn generate(
        &mut self,
        config: LevelConfig,
        out: &mut Vec<Event>,
    ) -> Result<RunId, GenerationError> {
        if self.is_running() {
            log::warn!("rejected generation request: a run is already active");
            out.push(Event::Error {
                run: None,
                error: GenerationError::Reentrancy,
            });
            return Err(GenerationError::Reentrancy);
        }

        let id = RunId::new(self.next_run);
        self.next_run += 1;
        out.push(Event::Started { run: id });
        self.state = OrchestratorState::Running(Stage::Validating);

        let features = match config.validate() {
            Ok(features) => features,
            Err(error) => {
                let error = GenerationError::from(error);
                log::warn!("run {} failed validation: {error}", id.get());
                self.state = OrchestratorState::Idle;
                self.last_outcome = Some(RunOutcome::Failed(id, error.clone()));
                out.push(Event::Error {
                    run: Some(id),
                    error: error.clone(),
                });
                return Err(error);
            }
        };

        let density = config.densities.total();
        if density >= RECOMMENDED_DENSITY_LIMIT {
            log::warn!("feature densities sum to {density:.2}, the level may be crowded");
        }

        let mut run = ActiveRun::new(id, config, features.clone());
        for feature in &features.skipped {
            log::warn!("{feature:?} is enabled but its prototypes are missing");
            run.warn(GenerationWarning::FeatureSkipped { feature: *feature }, out);
        }
        out.push(Event::StageCompleted {
            run: id,
            stage: Stage::Validating,
            summary: StageSummary::Validated { features },
        });
        log::debug!("run {} validated", id.get());

        self.teardown();
        self.run = Some(run);
        self.state = OrchestratorState::Running(Stage::Initializing);
        Ok(id)
    }

    /// Executes one bounded unit of the active run.
    pub fn tick(&mut self, out: &mut Vec<Event>) {
        let OrchestratorState::Running(stage) = self.state else {
            return;
        };
        let Some(mut run) = self.run.take() else {
            self.state = OrchestratorState::Idle;
            return;
        };

        let step = match stage {
            Stage::Validating | Stage::Initializing => Ok(Some(self.initialize(&mut run))),
            Stage::GeneratingTerrain => self.generate_terrain(&mut run, out),
            Stage::PlacingCollectibles => self.place_collectibles(&mut run, out).map(Some),
            Stage::InstantiatingObjects => self.instantiate(&mut run, out),
            Stage::ApplyingEffects => self.apply_effects(&mut run).map(Some),
            Stage::PlacingInteractive => self.place_interactive(&mut run, out).map(Some),
            Stage::Finalizing => {
                self.finalize(run, out);
                return;
            }
        };

        match step {
            Ok(Some(summary)) => {
                log::debug!("run {} completed {stage:?}", run.id.get());
                out.push(Event::StageCompleted {
                    run: run.id,
                    stage,
                    summary,
                });
                self.state = OrchestratorState::Running(next_stage(stage));
                self.run = Some(run);
            }
            Ok(None) => {
                self.run = Some(run);
            }
            Err(error) => self.fail(run, error, out),
        }
    }

    /// Ticks until the active run finishes.
    pub fn run_to_completion(&mut self, out: &mut Vec<Event>) {
        while self.is_running() {
            self.tick(out);
        }
    }

    /// Stops the active run, releasing everything it acquired.
    ///
    /// Returns `false` when no run was active.
    pub fn cancel(&mut self, out: &mut Vec<Event>) -> bool {
        if !self.is_running() {
            return false;
        }
        match self.run.take() {
            Some(run) => self.fail(run, GenerationError::Cancelled, out),
            None => self.state = OrchestratorState::Idle,
        }
        true
    }

    /// Tears down the published level and resets every subsystem.
    ///
    /// Rejected while a run is active.
    pub fn clear_level(&mut self) -> Result<(), GenerationError> {
        if self.is_running() {
            return Err(GenerationError::Reentrancy);
        }
        self.teardown();
        Ok(())
    }

    fn initialize(&mut self, run: &mut ActiveRun) -> StageSummary {
        run.seed = resolve_seed(run.config.seed);
        let mut rng = seed::random_source(run.seed);
        run.mode = select_mode(&run.config, &mut rng);
        run.rng = Some(rng);
        self.terrain.begin(&run.config, run.mode);
        log::info!(
            "run {} using seed {} and {:?} mode",
            run.id.get(),
            run.seed,
            run.mode
        );
        StageSummary::Initialized {
            seed: run.seed,
            mode: run.mode,
        }
    }

    fn generate_terrain(
        &mut self,
        run: &mut ActiveRun,
        out: &mut Vec<Event>,
    ) -> Result<Option<StageSummary>, GenerationError> {
        let Some(rng) = run.rng.as_mut() else {
            return Err(missing("random source"));
        };
        let progress = self
            .terrain
            .advance(&run.config, &run.features, rng, CARVE_STEPS_PER_BATCH);
        let terrain = match progress {
            TerrainProgress::Pending => return Ok(None),
            TerrainProgress::Idle => return Err(missing("terrain draft")),
            TerrainProgress::Complete(terrain) => *terrain,
        };
        if let Some(iterations) = self.terrain.carving_truncated() {
            run.warn(GenerationWarning::MazeTruncated { iterations }, out);
        }
        let summary = StageSummary::TerrainGenerated {
            mode: terrain.mode,
            walkable_tiles: to_u32(terrain.walkable_tiles.len()),
            walkable_percent: terrain.walkable_percent,
            main_path_length: to_u32(terrain.main_path.len()),
            platform_count: to_u32(terrain.platform_graph.centers().len()),
        };
        if terrain.below_minimum_walkable {
            let warning = GenerationWarning::BelowMinimumWalkable {
                percent: terrain.walkable_percent,
                minimum: run.config.min_walkable_percent,
            };
            run.warn(warning, out);
        }
        run.terrain = Some(terrain);
        Ok(Some(summary))
    }

    fn place_collectibles(
        &mut self,
        run: &mut ActiveRun,
        out: &mut Vec<Event>,
    ) -> Result<StageSummary, GenerationError> {
        let (Some(terrain), Some(rng)) = (run.terrain.as_mut(), run.rng.as_mut()) else {
            return Err(missing("terrain"));
        };
        let report = self.placer.place(&run.config, terrain, rng);
        for warning in report.warnings {
            run.warn(warning, out);
        }
        let summary = StageSummary::CollectiblesPlaced {
            collectibles: to_u32(report.result.collectibles.len()),
            goal: report.result.goal,
        };
        run.placements = Some(report.result);
        Ok(summary)
    }

    fn instantiate(
        &mut self,
        run: &mut ActiveRun,
        out: &mut Vec<Event>,
    ) -> Result<Option<StageSummary>, GenerationError> {
        if run.materials.is_none() {
            if let Some(warning) = self.configure_pool(run.features.pooling) {
                run.warn(warning, out);
            }
            self.instantiator.begin(&run.config.prototypes)?;
            let Some(rng) = run.rng.as_mut() else {
                return Err(missing("random source"));
            };
            run.materials = Some(assign_materials(&run.config, &run.features, rng));
        }

        let (Some(terrain), Some(rng), Some(materials)) = (
            run.terrain.as_ref(),
            run.rng.as_mut(),
            run.materials.as_ref(),
        ) else {
            return Err(missing("terrain"));
        };

        let progress = self.instantiator.instantiate_batch(
            &terrain.grid,
            run.config.tile_size,
            materials,
            &mut self.pool,
            rng,
            CELLS_PER_BATCH,
            &mut run.objects,
        )?;
        if progress == BatchProgress::Pending {
            return Ok(None);
        }

        let dynamic = spawn_dynamic_elements(
            &run.config,
            &run.features,
            terrain,
            &mut self.pool,
            &mut run.objects,
        );
        log::debug!("spawned {dynamic} dynamic elements");
        Ok(Some(StageSummary::ObjectsInstantiated {
            objects: to_u32(run.objects.len()),
        }))
    }

    fn configure_pool(&mut self, pooling: bool) -> Option<GenerationWarning> {
        let recycling = self.pool.set_recycling(pooling);
        log::debug!("pool recycling {}", if recycling { "on" } else { "off" });
        if pooling && !recycling {
            let detail = "object pool cannot recycle; allocating directly".to_owned();
            log::warn!("{detail}");
            return Some(GenerationWarning::SubsystemFallback { detail });
        }
        None
    }

    fn apply_effects(&mut self, run: &mut ActiveRun) -> Result<StageSummary, GenerationError> {
        let (Some(terrain), Some(rng)) = (run.terrain.as_ref(), run.rng.as_mut()) else {
            return Err(missing("terrain"));
        };
        run.decorations = place_decorations(&run.config, &run.features, terrain, rng);
        run.steam_emitters = place_steam_emitters(&run.config, &run.features, terrain, rng);
        spawn_decorations(
            &run.decorations,
            run.config.tile_size,
            &mut self.pool,
            &mut run.objects,
        );
        spawn_steam_emitters(&run.steam_emitters, &mut self.pool, &mut run.objects);
        Ok(StageSummary::EffectsApplied {
            decorations: to_u32(run.decorations.len()),
            steam_emitters: to_u32(run.steam_emitters.len()),
        })
    }

    fn place_interactive(
        &mut self,
        run: &mut ActiveRun,
        out: &mut Vec<Event>,
    ) -> Result<StageSummary, GenerationError> {
        let (Some(terrain), Some(rng)) = (run.terrain.as_ref(), run.rng.as_mut()) else {
            return Err(missing("terrain"));
        };
        let report = place_interactive_pairs(
            &run.config,
            &run.features,
            terrain,
            &mut self.pool,
            rng,
            &mut run.objects,
        );
        run.pairs = report.pairs;
        if let Some(warning) = report.warning {
            run.warn(warning, out);
        }
        Ok(StageSummary::InteractivePlaced {
            pairs: to_u32(run.pairs.len()),
        })
    }

    fn finalize(&mut self, mut run: ActiveRun, out: &mut Vec<Event>) {
        let (Some(terrain), Some(placements)) = (run.terrain.take(), run.placements.take()) else {
            self.fail(run, missing("terrain"), out);
            return;
        };
        if let Err(error) = self.check_invariants(&terrain, &placements, &run.objects) {
            self.fail(run, error, out);
            return;
        }

        let counts: ObjectCounts = count_objects(&run.objects);
        out.push(Event::StageCompleted {
            run: run.id,
            stage: Stage::Finalizing,
            summary: StageSummary::Finalized { counts },
        });
        out.push(Event::Completed {
            run: run.id,
            counts,
        });
        log::info!(
            "run {} finished: {} objects, {} warnings",
            run.id.get(),
            counts.total(),
            run.warnings.len()
        );

        self.level = Some(Level {
            run: run.id,
            seed: run.seed,
            terrain,
            placements,
            objects: run.objects,
            decorations: run.decorations,
            steam_emitters: run.steam_emitters,
            interactive_pairs: run.pairs,
            warnings: run.warnings,
        });
        self.state = OrchestratorState::Idle;
        self.last_outcome = Some(RunOutcome::Succeeded(run.id));
    }

    fn check_invariants(
        &self,
        terrain: &TerrainLayout,
        placements: &PlacementResult,
        objects: &[SpawnedObject],
    ) -> Result<(), GenerationError> {
        if !terrain.grid.border_intact() {
            return Err(GenerationError::InvariantViolation(
                "outer ring contains a walkable cell".to_owned(),
            ));
        }
        let Some(goal) = placements.goal else {
            return Err(GenerationError::InvariantViolation(
                "level has no goal".to_owned(),
            ));
        };
        if !terrain.grid.is_walkable(goal) {
            return Err(GenerationError::InvariantViolation(format!(
                "goal {goal:?} is not walkable"
            )));
        }
        if !terrain.grid.is_walkable(placements.spawn) {
            return Err(GenerationError::InvariantViolation(format!(
                "spawn {:?} is not walkable",
                placements.spawn
            )));
        }
        if self.pool.in_use() != objects.len() {
            return Err(GenerationError::InvariantViolation(format!(
                "pool reports {} live instances for {} objects",
                self.pool.in_use(),
                objects.len()
            )));
        }
        Ok(())
    }

    fn fail(&mut self, mut run: ActiveRun, error: GenerationError, out: &mut Vec<Event>) {
        log::warn!("run {} failed: {error}", run.id.get());
        let _ = release_objects(&mut self.pool, &mut run.objects);
        self.reset_subsystems();
        self.state = OrchestratorState::Idle;
        self.last_outcome = Some(RunOutcome::Failed(run.id, error.clone()));
        out.push(Event::Error {
            run: Some(run.id),
            error,
        });
    }

    fn teardown(&mut self) {
        if let Some(mut level) = self.level.take() {
            let released = release_objects(&mut self.pool, &mut level.objects);
            log::debug!("tore down run {}: released {released} objects", level.run.get());
        }
        let stray = self.pool.release_all();
        if stray > 0 {
            log::warn!("released {stray} instances that no level owned");
        }
        self.reset_subsystems();
    }

    fn reset_subsystems(&mut self) {
        self.terrain.reset();
        self.placer.reset();
        self.instantiator.reset();
    }
}

fn next_stage(stage: Stage) -> Stage {
    match stage {
        Stage::Validating => Stage::Initializing,
        Stage::Initializing => Stage::GeneratingTerrain,
        Stage::GeneratingTerrain => Stage::PlacingCollectibles,
        Stage::PlacingCollectibles => Stage::InstantiatingObjects,
        Stage::InstantiatingObjects => Stage::ApplyingEffects,
        Stage::ApplyingEffects => Stage::PlacingInteractive,
        Stage::PlacingInteractive | Stage::Finalizing => Stage::Finalizing,
    }
}

fn missing(what: &str) -> GenerationError {
    GenerationError::InvariantViolation(format!("{what} missing when its stage ran"))
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
