#![allow(dead_code)]

use bracket_geometry::prelude::Point;
use bracket_pathfinding::prelude::DistanceAlg;
use smallvec::SmallVec;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

pub const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Right,
    Direction::Down,
    Direction::Left,
];

impl Direction {
    pub fn delta(self) -> Point {
        match self {
            Direction::Up => Point::new(0, -1),
            Direction::Right => Point::new(1, 0),
            Direction::Down => Point::new(0, 1),
            Direction::Left => Point::new(-1, 0),
        }
    }
}

/// Raw world position. Movement may be sub-cell (e.g. projectile speed),
/// so positions are fractional; occupancy, visibility and rendering always
/// operate on the `rounded` cell.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Coord {
    pub x: f32,
    pub y: f32,
}

impl Coord {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_cell(cell: Point) -> Self {
        Self {
            x: cell.x as f32,
            y: cell.y as f32,
        }
    }

    /// Nearest grid cell.
    pub fn rounded(self) -> Point {
        Point::new((self.x + 0.5).floor() as i32, (self.y + 0.5).floor() as i32)
    }

    pub fn stepped(self, dir: Direction, distance: f32) -> Self {
        let d = dir.delta();
        Self {
            x: self.x + d.x as f32 * distance,
            y: self.y + d.y as f32 * distance,
        }
    }

    pub fn distance(self, other: Coord) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

pub fn cell_distance(a: Point, b: Point) -> f32 {
    DistanceAlg::Pythagoras.distance2d(a, b)
}

/// Dominant-axis direction from `from` toward `to`; horizontal wins ties.
pub fn direction_to(from: Point, to: Point) -> Direction {
    let diff = to - from;
    if diff.y.abs() > diff.x.abs() {
        if diff.y < 0 {
            Direction::Up
        } else {
            Direction::Down
        }
    } else if diff.x < 0 {
        Direction::Left
    } else {
        Direction::Right
    }
}

pub fn neighbors4(cell: Point) -> SmallVec<[Point; 4]> {
    DIRECTIONS.iter().map(|d| cell + d.delta()).collect()
}

pub fn neighbors8(cell: Point) -> SmallVec<[Point; 8]> {
    [
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
    ]
    .iter()
    .map(|(dx, dy)| Point::new(cell.x + dx, cell.y + dy))
    .collect()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, cell: Point) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    /// Edge cells of the grid, the targets of the visibility ray fan.
    pub fn perimeter(&self) -> Vec<Point> {
        let mut edge = Vec::new();
        for x in 0..self.width {
            edge.push(Point::new(x, 0));
            edge.push(Point::new(x, self.height - 1));
        }
        for y in 0..self.height {
            edge.push(Point::new(0, y));
            edge.push(Point::new(self.width - 1, y));
        }
        edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rounding_snaps_to_nearest_cell() {
        assert_eq!(Coord::new(4.4, 6.6).rounded(), Point::new(4, 7));
        assert_eq!(Coord::new(5.5, 2.0).rounded(), Point::new(6, 2));
    }

    #[test]
    fn direction_to_prefers_dominant_axis() {
        let origin = Point::new(10, 10);
        assert_eq!(direction_to(origin, Point::new(10, 4)), Direction::Up);
        assert_eq!(direction_to(origin, Point::new(14, 11)), Direction::Right);
        assert_eq!(direction_to(origin, Point::new(9, 12)), Direction::Down);
        // Tie goes horizontal.
        assert_eq!(direction_to(origin, Point::new(7, 7)), Direction::Left);
    }

    #[test]
    fn neighborhood_sizes() {
        assert_eq!(neighbors4(Point::new(3, 3)).len(), 4);
        assert_eq!(neighbors8(Point::new(3, 3)).len(), 8);
    }

    #[test]
    fn bounds_perimeter_covers_all_edges() {
        let bounds = Bounds::new(4, 3);
        let edge = bounds.perimeter();
        assert!(edge.contains(&Point::new(0, 0)));
        assert!(edge.contains(&Point::new(3, 2)));
        assert!(edge.iter().all(|p| bounds.contains(*p)));
    }

    proptest! {
        #[test]
        fn rounding_is_idempotent(x in -0.4f32..200.0, y in -0.4f32..200.0) {
            let once = Coord::new(x, y).rounded();
            let twice = Coord::from_cell(once).rounded();
            prop_assert_eq!(once, twice);
        }
    }
}
