//! Breadth-first reachability over walkable cells.

use std::collections::VecDeque;

use rollway_core::Position;

use crate::Grid;

/// Dense step-distance grid seeded from a single origin cell.
///
/// Distances follow 4-neighbour moves across walkable cells and default to
/// `u32::MAX` for cells that cannot be reached, so callers can distinguish
/// walls and sealed pockets from traversable tiles.
#[derive(Clone, Debug, Default)]
pub struct DistanceField {
    size: u32,
    distances: Vec<u32>,
}

impl DistanceField {
    /// Floods the grid from `origin`. A blocked origin yields an all-unreachable field.
    #[must_use]
    pub fn flood(grid: &Grid, origin: Position) -> Self {
        let size = grid.size();
        let mut field = Self {
            size,
            distances: vec![u32::MAX; grid.cell_count()],
        };

        if !grid.is_walkable(origin) {
            return field;
        }

        let Some(origin_index) = grid.index(origin) else {
            return field;
        };
        field.distances[origin_index] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(origin);

        while let Some(cell) = queue.pop_front() {
            let Some(current_index) = grid.index(cell) else {
                continue;
            };
            let next_distance = field.distances[current_index].saturating_add(1);

            for neighbor in grid.neighbors4(cell) {
                if !grid.is_walkable(neighbor) {
                    continue;
                }
                let Some(neighbor_index) = grid.index(neighbor) else {
                    continue;
                };
                if field.distances[neighbor_index] <= next_distance {
                    continue;
                }
                field.distances[neighbor_index] = next_distance;
                queue.push_back(neighbor);
            }
        }

        field
    }

    /// Step distance from the origin, or `None` when unreachable.
    #[must_use]
    pub fn distance(&self, cell: Position) -> Option<u32> {
        if cell.x() >= self.size || cell.y() >= self.size {
            return None;
        }
        let index = usize::try_from(cell.y() * self.size + cell.x()).ok()?;
        match self.distances.get(index).copied() {
            Some(u32::MAX) | None => None,
            Some(distance) => Some(distance),
        }
    }

    /// Number of cells reached by the flood, including the origin.
    #[must_use]
    pub fn reached_count(&self) -> usize {
        self.distances
            .iter()
            .filter(|distance| **distance != u32::MAX)
            .count()
    }
}

/// Reports whether a walkable route joins `from` and `to`.
#[must_use]
pub fn is_reachable(grid: &Grid, from: Position, to: Position) -> bool {
    DistanceField::flood(grid, from).distance(to).is_some()
}

/// Shortest 4-neighbour route from `from` to `to`, both ends included.
#[must_use]
pub fn shortest_path(grid: &Grid, from: Position, to: Position) -> Option<Vec<Position>> {
    let field = DistanceField::flood(grid, to);
    let mut remaining = field.distance(from)?;
    let mut path = Vec::with_capacity(usize::try_from(remaining).unwrap_or(0) + 1);
    let mut cursor = from;
    path.push(cursor);

    while remaining > 0 {
        let next = grid
            .neighbors4(cursor)
            .find(|neighbor| field.distance(*neighbor) == Some(remaining - 1))?;
        path.push(next);
        cursor = next;
        remaining -= 1;
    }

    Some(path)
}
