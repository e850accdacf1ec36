//! Integer line rasterisation.

use rollway_core::Position;

/// Rasterises the segment between two cells with Bresenham's algorithm.
///
/// Whenever the classic algorithm would advance both axes at once, the
/// intermediate cell reached by the horizontal step is emitted as well, so
/// consecutive cells always share an edge. Both endpoints are included.
#[must_use]
pub fn line(from: Position, to: Position) -> Vec<Position> {
    let (x0, y0) = (i64::from(from.x()), i64::from(from.y()));
    let (x1, y1) = (i64::from(to.x()), i64::from(to.y()));

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;
    let capacity = usize::try_from(dx - dy + 1).unwrap_or(0);
    let mut cells = Vec::with_capacity(capacity);

    loop {
        cells.push(to_position(x, y));
        if x == x1 && y == y1 {
            break;
        }

        let doubled = 2 * err;
        let mut stepped_horizontally = false;
        if doubled >= dy {
            err += dy;
            x += sx;
            stepped_horizontally = true;
        }
        if doubled <= dx {
            if stepped_horizontally {
                cells.push(to_position(x, y));
            }
            err += dx;
            y += sy;
        }
    }

    cells
}

/// Rasterises a polyline through every waypoint in order.
#[must_use]
pub fn polyline(waypoints: &[Position]) -> Vec<Position> {
    let mut cells: Vec<Position> = Vec::new();
    for pair in waypoints.windows(2) {
        for cell in line(pair[0], pair[1]) {
            if cells.last() != Some(&cell) {
                cells.push(cell);
            }
        }
    }
    if cells.is_empty() {
        cells.extend(waypoints.first().copied());
    }
    cells
}

fn to_position(x: i64, y: i64) -> Position {
    Position::new(
        u32::try_from(x).unwrap_or(0),
        u32::try_from(y).unwrap_or(0),
    )
}
