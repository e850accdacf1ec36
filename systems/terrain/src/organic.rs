//! Cellular-automaton caves and the hybrid layouts built on them.

use rand::Rng;
use rollway_core::{CellMarker, Position};
use rollway_level::Grid;

const SMOOTHING_PASSES: usize = 4;
const BASE_FILL: f32 = 0.40;
const OBSTACLE_FILL_WEIGHT: f32 = 0.3;

/// Seeds the interior with random walls and smooths it into caves.
pub(crate) fn carve_caves<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R, obstacle_density: f32) {
    let fill = BASE_FILL + OBSTACLE_FILL_WEIGHT * obstacle_density;
    let interior: Vec<Position> = grid.interior_positions().collect();
    for position in &interior {
        let marker = if rng.gen::<f32>() < fill {
            CellMarker::Wall
        } else {
            CellMarker::Walkable
        };
        let _ = grid.set(*position, marker);
    }

    for _ in 0..SMOOTHING_PASSES {
        let snapshot = grid.clone();
        for position in &interior {
            let walls = snapshot
                .neighbors8(*position)
                .filter(|neighbor| snapshot.is_wall(*neighbor))
                .count();
            if walls >= 5 {
                let _ = grid.set(*position, CellMarker::Wall);
            } else if walls <= 3 {
                let _ = grid.set(*position, CellMarker::Walkable);
            }
        }
    }
}

/// Picks `count` random interior waypoints.
pub(crate) fn random_waypoints<R: Rng + ?Sized>(
    grid: &Grid,
    rng: &mut R,
    count: usize,
) -> Vec<Position> {
    let last = grid.size().saturating_sub(2).max(1);
    (0..count)
        .map(|_| Position::new(rng.gen_range(1..=last), rng.gen_range(1..=last)))
        .collect()
}

/// Carves `max(1, size / 6)` rectangular rooms of 3 to 5 cells per side.
pub(crate) fn carve_open_rooms<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R) -> usize {
    let size = grid.size();
    let rooms = (size / 6).max(1);
    let last = size.saturating_sub(2).max(1);
    for _ in 0..rooms {
        let width = rng.gen_range(3..=5);
        let height = rng.gen_range(3..=5);
        let origin_x = rng.gen_range(1..=last);
        let origin_y = rng.gen_range(1..=last);
        for y in origin_y..origin_y.saturating_add(height) {
            for x in origin_x..origin_x.saturating_add(width) {
                let _ = grid.set(Position::new(x, y), CellMarker::Walkable);
            }
        }
    }
    usize::try_from(rooms).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rollway_core::CellMarker;
    use rollway_level::Grid;

    use super::{carve_caves, carve_open_rooms, random_waypoints};

    #[test]
    fn caves_leave_the_border_alone() {
        let mut grid = Grid::walled(18);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        carve_caves(&mut grid, &mut rng, 0.2);
        assert!(grid.border_intact());
        assert!(grid.count(CellMarker::Walkable) > 0);
        assert!(grid.count(CellMarker::Walkable) < grid.interior_count());
    }

    #[test]
    fn rooms_only_open_cells() {
        let mut grid = Grid::walled(14);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let rooms = carve_open_rooms(&mut grid, &mut rng);
        assert_eq!(rooms, 2);
        assert!(grid.count(CellMarker::Walkable) > 0);
        assert!(grid.border_intact());
    }

    #[test]
    fn waypoints_stay_inside_the_border() {
        let grid = Grid::walled(9);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for waypoint in random_waypoints(&grid, &mut rng, 20) {
            assert!(grid.is_interior(waypoint));
        }
    }
}
