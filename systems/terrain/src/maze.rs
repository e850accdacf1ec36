//! Recursive-backtracker maze carving on a two-cell lattice.

use rand::{seq::SliceRandom, Rng};
use rollway_core::{CellMarker, Position};
use rollway_level::Grid;

/// Smallest iteration cap any maze gets.
pub const MIN_CARVE_ITERATIONS: u32 = 10_000;

/// Iterations granted to one [`MazeCarver::advance`] call by the pipeline.
pub const CARVE_STEPS_PER_BATCH: u32 = 256;

const LATTICE_STEPS: [(i32, i32); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];

/// Progress reported by [`MazeCarver::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CarveProgress {
    /// Carving can continue.
    Pending,
    /// The backtracking stack emptied; every reachable lattice cell is carved.
    Complete,
    /// The iteration cap was reached before the stack emptied.
    Capped,
}

/// Resumable recursive backtracker.
///
/// The carver keeps its stack between calls so hosts can spread the work
/// over several steps; each call performs at most `budget` iterations.
#[derive(Debug, Default)]
pub struct MazeCarver {
    stack: Vec<Position>,
    iterations: u32,
    cap: u32,
    candidates: Vec<(Position, Position)>,
}

impl MazeCarver {
    /// Opens the origin cell and seeds the stack with it.
    pub fn begin(&mut self, grid: &mut Grid, origin: Position) {
        self.stack.clear();
        self.candidates.clear();
        self.iterations = 0;
        self.cap = iteration_cap(grid.size());
        if grid.set(origin, CellMarker::Walkable) {
            self.stack.push(origin);
        }
    }

    /// Runs up to `budget` iterations.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        rng: &mut R,
        budget: u32,
    ) -> CarveProgress {
        let mut spent = 0;
        while spent < budget {
            let Some(current) = self.stack.last().copied() else {
                return CarveProgress::Complete;
            };
            if self.iterations >= self.cap {
                return CarveProgress::Capped;
            }
            self.iterations += 1;
            spent += 1;

            self.candidates.clear();
            for (dx, dy) in LATTICE_STEPS {
                let Some(destination) = current.offset(dx, dy) else {
                    continue;
                };
                if !grid.is_interior(destination) || !grid.is_wall(destination) {
                    continue;
                }
                let Some(between) = current.offset(dx / 2, dy / 2) else {
                    continue;
                };
                self.candidates.push((between, destination));
            }

            match self.candidates.choose(rng).copied() {
                Some((between, destination)) => {
                    let _ = grid.set(between, CellMarker::Walkable);
                    let _ = grid.set(destination, CellMarker::Walkable);
                    self.stack.push(destination);
                }
                None => {
                    let _ = self.stack.pop();
                }
            }
        }

        if self.stack.is_empty() {
            CarveProgress::Complete
        } else {
            CarveProgress::Pending
        }
    }

    /// Carves until completion or the iteration cap.
    pub fn run_to_end<R: Rng + ?Sized>(&mut self, grid: &mut Grid, rng: &mut R) -> CarveProgress {
        loop {
            match self.advance(grid, rng, CARVE_STEPS_PER_BATCH) {
                CarveProgress::Pending => continue,
                finished => return finished,
            }
        }
    }

    /// Iterations spent since [`MazeCarver::begin`].
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Drops buffered state.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.candidates.clear();
        self.iterations = 0;
        self.cap = 0;
    }
}

/// Number of odd lattice cells inside a grid of the given size.
#[must_use]
pub fn lattice_cell_count(size: u32) -> u32 {
    if size < 3 {
        return 0;
    }
    let per_axis = (far_lattice_coordinate(size) + 1) / 2;
    per_axis.saturating_mul(per_axis)
}

/// Iteration cap for a grid of the given size.
///
/// A full backtrack pushes every lattice cell once and pops it once, so twice
/// the lattice plus one always suffices.
#[must_use]
pub fn iteration_cap(size: u32) -> u32 {
    lattice_cell_count(size)
        .saturating_mul(2)
        .saturating_add(1)
        .max(MIN_CARVE_ITERATIONS)
}

/// Number of extra wall removals for a maze of the given size.
#[must_use]
pub fn extra_opening_count(size: u32, path_complexity: f32) -> usize {
    let area = f64::from(size) * f64::from(size);
    let openings = (area * f64::from(path_complexity) * 0.1).floor();
    if openings <= 0.0 {
        0
    } else {
        openings as usize
    }
}

/// Opens `count` distinct random interior walls, returning how many were opened.
pub fn open_random_walls<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let walls: Vec<Position> = grid
        .interior_positions()
        .filter(|position| grid.is_wall(*position))
        .collect();
    let chosen: Vec<Position> = walls.choose_multiple(rng, count).copied().collect();
    for position in &chosen {
        let _ = grid.set(*position, CellMarker::Walkable);
    }
    chosen.len()
}

/// Largest odd coordinate that still lies inside the border.
#[must_use]
pub fn far_lattice_coordinate(size: u32) -> u32 {
    let last_interior = size.saturating_sub(2).max(1);
    if last_interior % 2 == 1 {
        last_interior
    } else {
        last_interior - 1
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rollway_core::{CellMarker, Position};
    use rollway_level::Grid;

    use super::{
        extra_opening_count, far_lattice_coordinate, iteration_cap, lattice_cell_count,
        CarveProgress, MazeCarver, MIN_CARVE_ITERATIONS,
    };

    #[test]
    fn carving_reaches_every_lattice_cell() {
        let mut grid = Grid::walled(11);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut carver = MazeCarver::default();
        carver.begin(&mut grid, Position::new(1, 1));
        assert_eq!(carver.run_to_end(&mut grid, &mut rng), CarveProgress::Complete);

        for y in (1..10).step_by(2) {
            for x in (1..10).step_by(2) {
                assert!(grid.is_walkable(Position::new(x, y)), "({x}, {y}) not carved");
            }
        }
        // A spanning tree over 25 lattice cells opens 24 connectors.
        assert_eq!(grid.count(CellMarker::Walkable), 49);
        assert!(grid.border_intact());
    }

    #[test]
    fn small_budgets_resume_where_they_stopped() {
        let mut stepped = Grid::walled(9);
        let mut whole = Grid::walled(9);
        let mut carver = MazeCarver::default();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        carver.begin(&mut stepped, Position::new(1, 1));
        let mut calls = 0;
        while carver.advance(&mut stepped, &mut rng, 3) == CarveProgress::Pending {
            calls += 1;
        }
        assert!(calls > 1);

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        carver.begin(&mut whole, Position::new(1, 1));
        let _ = carver.run_to_end(&mut whole, &mut rng);

        assert_eq!(stepped, whole);
    }

    #[test]
    fn iteration_cap_grows_with_the_lattice() {
        assert_eq!(lattice_cell_count(11), 25);
        assert_eq!(lattice_cell_count(12), 25);
        assert_eq!(lattice_cell_count(201), 10_000);
        assert_eq!(iteration_cap(11), MIN_CARVE_ITERATIONS);
        assert_eq!(iteration_cap(201), 20_001);
    }

    #[test]
    fn large_mazes_carve_every_lattice_cell() {
        let mut grid = Grid::walled(201);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut carver = MazeCarver::default();
        carver.begin(&mut grid, Position::new(1, 1));
        assert_eq!(carver.run_to_end(&mut grid, &mut rng), CarveProgress::Complete);

        let uncarved = (1..200)
            .step_by(2)
            .flat_map(|y| (1..200).step_by(2).map(move |x| Position::new(x, y)))
            .filter(|cell| grid.is_wall(*cell))
            .count();
        assert_eq!(uncarved, 0);
        assert!(carver.iterations() > MIN_CARVE_ITERATIONS);
    }

    #[test]
    fn opening_count_follows_path_complexity() {
        assert_eq!(extra_opening_count(12, 0.5), 7);
        assert_eq!(extra_opening_count(12, 0.0), 0);
        assert_eq!(extra_opening_count(20, 1.0), 40);
    }

    #[test]
    fn far_lattice_coordinate_is_odd_and_interior() {
        assert_eq!(far_lattice_coordinate(12), 9);
        assert_eq!(far_lattice_coordinate(11), 9);
        assert_eq!(far_lattice_coordinate(5), 3);
    }
}
