//! Island chains joined by rasterised bridges.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use rollway_core::{CellMarker, Position};
use rollway_level::{Grid, PathSet, PlatformEdge, PlatformGraph};

use crate::raster;

const MAX_STEP_MAGNITUDE: i32 = 3;
const EDGE_MIN_DISTANCE: f32 = 2.0;
const EDGE_MAX_DISTANCE: f32 = 6.0;

/// Output of the platforms builder.
#[derive(Debug, Default)]
pub(crate) struct PlatformLayout {
    pub(crate) main_path: PathSet,
    pub(crate) graph: PlatformGraph,
    pub(crate) moving_platform_tiles: Vec<Position>,
    pub(crate) rotating_obstacle_sites: Vec<Position>,
}

/// Options controlling optional platform features.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PlatformOptions {
    pub(crate) moving_platforms: bool,
    pub(crate) rotating_obstacles: bool,
    pub(crate) rotating_share: f32,
}

/// Builds a platform chain between `start` and `end` on a fully walled grid.
pub(crate) fn build<R: Rng + ?Sized>(
    grid: &mut Grid,
    rng: &mut R,
    start: Position,
    end: Position,
    options: PlatformOptions,
) -> PlatformLayout {
    let size = grid.size();
    let mut main_path = PathSet::new(vec![start]);
    let mut centers = vec![start];
    let mut visited: HashSet<Position> = HashSet::from([start]);
    let mut current = start;
    let step_cap = size.saturating_mul(4);

    for _ in 0..step_cap {
        if current == end {
            break;
        }
        let next = next_center(current, end, size, rng);
        carve_segment(grid, &mut main_path, current, next);
        if visited.insert(next) {
            centers.push(next);
        }
        current = next;
    }

    if current != end {
        carve_segment(grid, &mut main_path, current, end);
        if visited.insert(end) {
            centers.push(end);
        }
    }

    for center in &centers {
        let radius: i32 = rng.gen_range(2..=3);
        carve_island(grid, *center, radius);
    }

    let mut moving_platform_tiles = Vec::new();
    let mut tagged: HashSet<Position> = HashSet::new();
    let mut edges = Vec::new();
    for (index, from) in centers.iter().enumerate() {
        for to in &centers[index + 1..] {
            let distance = from.distance(*to);
            if distance <= EDGE_MIN_DISTANCE || distance >= EDGE_MAX_DISTANCE {
                continue;
            }

            let mut supports_moving_platform = false;
            if options.moving_platforms {
                let cells = raster::line(*from, *to);
                for cell in &cells {
                    let _ = grid.set(*cell, CellMarker::Walkable);
                }
                let inner = cells.len().saturating_sub(1);
                for cell in cells.iter().take(inner).skip(1).step_by(2) {
                    supports_moving_platform = true;
                    if tagged.insert(*cell) {
                        moving_platform_tiles.push(*cell);
                    }
                }
            }

            edges.push(PlatformEdge {
                from: *from,
                to: *to,
                supports_moving_platform,
            });
        }
    }

    let rotating_obstacle_sites = if options.rotating_obstacles {
        pick_rotating_sites(&centers, options.rotating_share, rng)
    } else {
        Vec::new()
    };

    PlatformLayout {
        main_path,
        graph: PlatformGraph::new(centers, edges),
        moving_platform_tiles,
        rotating_obstacle_sites,
    }
}

fn next_center<R: Rng + ?Sized>(
    current: Position,
    end: Position,
    size: u32,
    rng: &mut R,
) -> Position {
    let dx = signed_delta(current.x(), end.x());
    let dy = signed_delta(current.y(), end.y());

    let mut step_x = dx.clamp(-2, 2) + rng.gen_range(-1..=1);
    let mut step_y = dy.clamp(-2, 2) + rng.gen_range(-1..=1);
    while step_x.abs() + step_y.abs() > MAX_STEP_MAGNITUDE {
        if step_x.abs() >= step_y.abs() {
            step_x -= step_x.signum();
        } else {
            step_y -= step_y.signum();
        }
    }

    let candidate = clamp_interior(current, step_x, step_y, size);
    if candidate != current {
        return candidate;
    }

    if dx.abs() >= dy.abs() {
        clamp_interior(current, dx.signum(), 0, size)
    } else {
        clamp_interior(current, 0, dy.signum(), size)
    }
}

fn signed_delta(from: u32, to: u32) -> i32 {
    let delta = i64::from(to) - i64::from(from);
    i32::try_from(delta).unwrap_or(0)
}

fn clamp_interior(origin: Position, dx: i32, dy: i32, size: u32) -> Position {
    let last = i64::from(size.saturating_sub(2).max(1));
    let x = (i64::from(origin.x()) + i64::from(dx)).clamp(1, last);
    let y = (i64::from(origin.y()) + i64::from(dy)).clamp(1, last);
    Position::new(
        u32::try_from(x).unwrap_or(1),
        u32::try_from(y).unwrap_or(1),
    )
}

fn carve_segment(grid: &mut Grid, path: &mut PathSet, from: Position, to: Position) {
    let cells = raster::line(from, to);
    for cell in &cells {
        let _ = grid.set(*cell, CellMarker::Walkable);
    }
    path.extend(cells);
}

fn carve_island(grid: &mut Grid, center: Position, radius: i32) {
    let radius_squared = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius_squared {
                continue;
            }
            if let Some(cell) = center.offset(dx, dy) {
                let _ = grid.set(cell, CellMarker::Walkable);
            }
        }
    }
}

fn pick_rotating_sites<R: Rng + ?Sized>(
    centers: &[Position],
    share: f32,
    rng: &mut R,
) -> Vec<Position> {
    if centers.is_empty() {
        return Vec::new();
    }
    let wanted = (centers.len() as f32 * share).round() as usize;
    let count = wanted.clamp(1, centers.len());
    centers.choose_multiple(rng, count).copied().collect()
}
