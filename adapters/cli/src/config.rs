//! Configuration loading and command-line overrides.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use rollway_core::{GenerationMode, LevelConfig, PrototypeSet, SeedMode};

/// Generation modes selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ModeArg {
    /// Corner-to-corner path with scattered obstacles.
    Simple,
    /// Recursive-backtracker maze.
    Maze,
    /// Islands linked by bridges.
    Platforms,
    /// Cellular-automaton caves.
    Organic,
    /// Maze with open rooms.
    MazeOpen,
    /// Caves with a winding path.
    OrganicPath,
}

impl From<ModeArg> for GenerationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Simple => Self::Simple,
            ModeArg::Maze => Self::Maze,
            ModeArg::Platforms => Self::Platforms,
            ModeArg::Organic => Self::Organic,
            ModeArg::MazeOpen => Self::HybridMazeOpen,
            ModeArg::OrganicPath => Self::HybridOrganicPath,
        }
    }
}

/// Flag values layered over the loaded configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Overrides {
    pub(crate) size: Option<u32>,
    pub(crate) mode: Option<ModeArg>,
    pub(crate) seed: Option<u64>,
    pub(crate) adaptive: bool,
}

impl Overrides {
    pub(crate) fn apply(&self, config: &mut LevelConfig) {
        if let Some(size) = self.size {
            config.level_size = size;
        }
        if let Some(mode) = self.mode {
            config.generation_mode = mode.into();
            config.adaptive_mode = false;
        }
        if let Some(seed) = self.seed {
            config.seed = SeedMode::Explicit(seed);
        }
        if self.adaptive {
            config.adaptive_mode = true;
        }
    }
}

/// Reads the configuration file, or the defaults when no path is given.
pub(crate) fn load(path: Option<&Path>) -> Result<LevelConfig> {
    let Some(path) = path else {
        return Ok(with_placeholder_prototypes(LevelConfig::default()));
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&text).with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Parses a TOML configuration. Missing fields keep their defaults.
pub(crate) fn parse(text: &str) -> Result<LevelConfig> {
    let config: LevelConfig = toml::from_str(text)?;
    Ok(with_placeholder_prototypes(config))
}

/// A configuration without any prototypes gets numbered placeholders so every
/// feature can run without host assets.
fn with_placeholder_prototypes(mut config: LevelConfig) -> LevelConfig {
    if config.prototypes == PrototypeSet::default() {
        log::info!("no prototypes configured, using numbered placeholders");
        config.prototypes = PrototypeSet::numbered();
    }
    config
}
