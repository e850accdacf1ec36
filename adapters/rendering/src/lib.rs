#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Text presentation of generated Rollway levels.
//!
//! A [`GlyphMap`] flattens the grid and every overlay of a [`Level`] into one
//! character per cell. Backends implementing [`RenderingBackend`] decide where
//! the resulting [`Presentation`] ends up.

use std::{error::Error, fmt, io::Write};

use anyhow::Result as AnyResult;
use rollway_core::{CellMarker, ObjectCounts, Position};
use rollway_level::{query, Grid, Level};

/// Symbol drawn for a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Glyph {
    /// Blocked cell.
    Wall,
    /// Plain walkable floor.
    Walkable,
    /// Collectible overlay.
    Collectible,
    /// Goal overlay.
    Goal,
    /// Player spawn.
    Spawn,
    /// Moving platform tile.
    MovingPlatform,
    /// Rotating obstacle site.
    RotatingObstacle,
    /// Gate half of an interactive pair.
    Gate,
    /// Switch half of an interactive pair.
    Switch,
    /// Steam emitter hovering above a platform centre.
    SteamEmitter,
    /// Ambient decoration.
    Decoration,
}

impl Glyph {
    /// Every glyph in legend order.
    pub const ALL: [Glyph; 11] = [
        Glyph::Wall,
        Glyph::Walkable,
        Glyph::Collectible,
        Glyph::Goal,
        Glyph::Spawn,
        Glyph::MovingPlatform,
        Glyph::RotatingObstacle,
        Glyph::Gate,
        Glyph::Switch,
        Glyph::SteamEmitter,
        Glyph::Decoration,
    ];

    /// Character used for the glyph.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Walkable => '.',
            Self::Collectible => '*',
            Self::Goal => 'G',
            Self::Spawn => 'S',
            Self::MovingPlatform => '=',
            Self::RotatingObstacle => 'R',
            Self::Gate => 'g',
            Self::Switch => 's',
            Self::SteamEmitter => '~',
            Self::Decoration => 'd',
        }
    }

    /// Human readable legend label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Walkable => "walkable",
            Self::Collectible => "collectible",
            Self::Goal => "goal",
            Self::Spawn => "spawn",
            Self::MovingPlatform => "moving platform",
            Self::RotatingObstacle => "rotating obstacle",
            Self::Gate => "gate",
            Self::Switch => "switch",
            Self::SteamEmitter => "steam emitter",
            Self::Decoration => "decoration",
        }
    }

    /// Looks a glyph up by its character.
    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|glyph| glyph.symbol() == symbol)
    }

    fn from_marker(marker: CellMarker) -> Self {
        match marker {
            CellMarker::Wall => Self::Wall,
            CellMarker::Walkable => Self::Walkable,
            CellMarker::Collectible => Self::Collectible,
            CellMarker::Goal => Self::Goal,
        }
    }
}

/// Square map holding one glyph per grid cell, rows ordered by ascending `y`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphMap {
    size: u32,
    glyphs: Vec<Glyph>,
}

impl GlyphMap {
    /// Creates a map that mirrors the markers of the provided grid.
    #[must_use]
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            size: grid.size(),
            glyphs: grid
                .cells()
                .map(|(_, marker)| Glyph::from_marker(marker))
                .collect(),
        }
    }

    /// Composes the full map of a finished level.
    ///
    /// Later layers win: decorations, moving platforms, steam emitters,
    /// rotating obstacles, gate/switch pairs, collectibles, spawn and finally
    /// the goal.
    #[must_use]
    pub fn compose(level: &Level) -> Self {
        let mut map = Self::from_grid(query::grid(level));
        for decoration in &level.decorations {
            map.stamp(decoration.cell, Glyph::Decoration);
        }
        for &cell in &level.terrain.moving_platform_tiles {
            map.stamp(cell, Glyph::MovingPlatform);
        }
        for emitter in query::steam_emitters(level) {
            map.stamp(emitter.center, Glyph::SteamEmitter);
        }
        for &site in &level.terrain.rotating_obstacle_sites {
            map.stamp(site, Glyph::RotatingObstacle);
        }
        for pair in query::interactive_pairs(level) {
            map.stamp(pair.gate, Glyph::Gate);
            map.stamp(pair.switch, Glyph::Switch);
        }
        for &cell in query::collectibles(level) {
            map.stamp(cell, Glyph::Collectible);
        }
        map.stamp(query::spawn(level), Glyph::Spawn);
        if let Some(goal) = query::goal(level) {
            map.stamp(goal, Glyph::Goal);
        }
        map
    }

    /// Parses a map from its textual rendering, one line per row.
    pub fn parse(text: &str) -> Result<Self, RenderingError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let side = rows.len();
        let size = u32::try_from(side).map_err(|_| RenderingError::TooLarge { rows: side })?;
        let mut glyphs = Vec::with_capacity(side * side);
        for (row, line) in rows.iter().enumerate() {
            let width = line.chars().count();
            if width != side {
                return Err(RenderingError::RaggedRow {
                    row,
                    expected: side,
                    found: width,
                });
            }
            for (column, symbol) in line.chars().enumerate() {
                let glyph = Glyph::from_symbol(symbol).ok_or(RenderingError::UnknownGlyph {
                    symbol,
                    row,
                    column,
                })?;
                glyphs.push(glyph);
            }
        }
        Ok(Self { size, glyphs })
    }

    /// Edge length in cells.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Glyph at the provided cell, if it lies inside the map.
    #[must_use]
    pub fn get(&self, cell: Position) -> Option<Glyph> {
        self.index(cell).map(|index| self.glyphs[index])
    }

    /// Number of cells drawn with the provided glyph.
    #[must_use]
    pub fn count(&self, glyph: Glyph) -> usize {
        self.glyphs.iter().filter(|&&candidate| candidate == glyph).count()
    }

    /// Glyphs that appear at least once, in legend order.
    #[must_use]
    pub fn used_glyphs(&self) -> Vec<Glyph> {
        Glyph::ALL
            .into_iter()
            .filter(|glyph| self.glyphs.contains(glyph))
            .collect()
    }

    /// Text rows of the map.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        let side = usize::try_from(self.size).unwrap_or(0);
        if side == 0 {
            return Vec::new();
        }
        self.glyphs
            .chunks(side)
            .map(|row| row.iter().map(|glyph| glyph.symbol()).collect())
            .collect()
    }

    fn index(&self, cell: Position) -> Option<usize> {
        if cell.x() >= self.size || cell.y() >= self.size {
            return None;
        }
        usize::try_from(cell.y() * self.size + cell.x()).ok()
    }

    fn stamp(&mut self, cell: Position, glyph: Glyph) {
        if let Some(index) = self.index(cell) {
            self.glyphs[index] = glyph;
        }
    }
}

impl fmt::Display for GlyphMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Heading printed above the map.
    pub title: String,
    /// Composed glyph map.
    pub map: GlyphMap,
    /// Object counts reported next to the map.
    pub counts: ObjectCounts,
    /// Whether a legend of the glyphs in use follows the map.
    pub show_legend: bool,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(title: T, map: GlyphMap, counts: ObjectCounts) -> Self
    where
        T: Into<String>,
    {
        Self {
            title: title.into(),
            map,
            counts,
            show_legend: true,
        }
    }

    /// Builds the presentation of a finished level.
    #[must_use]
    pub fn of_level(level: &Level) -> Self {
        let title = format!(
            "run {} | seed {} | {:?} | {}x{} | {:.1}% walkable",
            level.run.get(),
            level.seed,
            level.terrain.mode,
            level.terrain.grid.size(),
            level.terrain.grid.size(),
            level.terrain.walkable_percent,
        );
        Self::new(title, GlyphMap::compose(level), query::object_counts(level))
    }

    /// Disables the legend.
    #[must_use]
    pub fn without_legend(mut self) -> Self {
        self.show_legend = false;
        self
    }

    /// Legend lines for the glyphs in use.
    #[must_use]
    pub fn legend(&self) -> Vec<String> {
        self.map
            .used_glyphs()
            .into_iter()
            .map(|glyph| format!("{} {}", glyph.symbol(), glyph.label()))
            .collect()
    }
}

/// Rendering backend capable of presenting Rollway levels.
pub trait RenderingBackend {
    /// Presents a single level description.
    fn present(&mut self, presentation: &Presentation) -> AnyResult<()>;
}

/// Backend that writes the presentation as plain text.
#[derive(Debug)]
pub struct TextBackend<W> {
    writer: W,
}

impl<W: Write> TextBackend<W> {
    /// Wraps the provided writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RenderingBackend for TextBackend<W> {
    fn present(&mut self, presentation: &Presentation) -> AnyResult<()> {
        writeln!(self.writer, "{}", presentation.title)?;
        write!(self.writer, "{}", presentation.map)?;
        if presentation.show_legend {
            writeln!(self.writer)?;
            for line in presentation.legend() {
                writeln!(self.writer, "{line}")?;
            }
        }
        let counts = &presentation.counts;
        writeln!(
            self.writer,
            "objects: {} total, {} collectibles, {} goals, {} platforms, {} obstacles, {} gates",
            counts.total(),
            counts.collectibles,
            counts.goals,
            counts.moving_platforms,
            counts.rotating_obstacles,
            counts.gates,
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Errors raised while parsing glyph maps.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// A character does not correspond to any glyph.
    UnknownGlyph {
        /// Offending character.
        symbol: char,
        /// Row of the character.
        row: usize,
        /// Column of the character.
        column: usize,
    },
    /// A row length differs from the number of rows.
    RaggedRow {
        /// Row that failed validation.
        row: usize,
        /// Required row length.
        expected: usize,
        /// Actual row length.
        found: usize,
    },
    /// The map has more rows than a grid can address.
    TooLarge {
        /// Number of rows received.
        rows: usize,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownGlyph {
                symbol,
                row,
                column,
            } => write!(f, "unknown glyph {symbol:?} at row {row}, column {column}"),
            Self::RaggedRow {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} cells, expected {expected}"),
            Self::TooLarge { rows } => write!(f, "map with {rows} rows is too large"),
        }
    }
}

impl Error for RenderingError {}
