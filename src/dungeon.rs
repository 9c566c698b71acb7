use std::collections::HashSet;

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;

use crate::grid::Bounds;

/// Inclusive wall-corner coordinates of one generated room.
#[derive(Copy, Clone, Debug)]
pub struct Room {
    pub low: Point,
    pub high: Point,
}

/// Static spawn data the simulation is seeded from: a wall list, the room
/// boxes, and density-driven enemy / power-up placements.
pub struct DungeonPlan {
    pub bounds: Bounds,
    pub walls: Vec<Point>,
    pub rooms: Vec<Room>,
    pub enemy_spawns: Vec<Point>,
    pub powerup_spawns: Vec<Point>,
}

impl DungeonPlan {
    pub fn wall_set(&self) -> HashSet<Point> {
        self.walls.iter().copied().collect()
    }

    /// A uniformly chosen non-wall cell, for placing the player.
    pub fn random_floor(&self, rng: &mut RandomNumberGenerator) -> Point {
        let walls = self.wall_set();
        loop {
            let cell = Point::new(
                rng.range(1, self.bounds.width - 1),
                rng.range(1, self.bounds.height - 1),
            );
            if !walls.contains(&cell) {
                return cell;
            }
        }
    }
}

// randint-style inclusive range.
fn randint(rng: &mut RandomNumberGenerator, low: i32, high: i32) -> i32 {
    rng.range(low, high + 1)
}

/// Recursive room-splitting generator: drops a walled room with a handful of
/// doorway gaps into the region, then recurses into the bands above, beside,
/// below, and inside it. Produces the nested, irregular layout the game is
/// built around.
pub fn generate(
    bounds: Bounds,
    enemy_density: f32,
    powerup_density: f32,
    rng: &mut RandomNumberGenerator,
) -> DungeonPlan {
    let (width, height) = (bounds.width, bounds.height);
    let mut grid = vec![false; (width * height) as usize];
    let mut rooms = Vec::new();
    carve(
        &mut grid,
        &mut rooms,
        bounds,
        2,
        2,
        width - 2,
        height - 2,
        rng,
    );

    for x in 0..width {
        grid[x as usize] = true;
        grid[((height - 1) * width + x) as usize] = true;
    }
    for y in 0..height {
        grid[(y * width) as usize] = true;
        grid[(y * width + width - 1) as usize] = true;
    }

    let walls: Vec<Point> = (0..height)
        .flat_map(|y| (0..width).map(move |x| Point::new(x, y)))
        .filter(|p| grid[(p.y * width + p.x) as usize])
        .collect();

    let mut place = |count: usize, rng: &mut RandomNumberGenerator| -> Vec<Point> {
        let mut spawns = Vec::new();
        for _ in 0..count {
            if rooms.is_empty() {
                break;
            }
            let room: Room = rooms[rng.range(0, rooms.len() as i32) as usize];
            let cell = Point::new(
                randint(rng, room.low.x + 1, room.high.x - 2),
                randint(rng, room.low.y + 1, room.high.y - 2),
            );
            // An inner room's wall may sit here; skip rather than bury it.
            if !grid[(cell.y * width + cell.x) as usize] {
                spawns.push(cell);
            }
        }
        spawns
    };

    let enemy_spawns = place((rooms.len() as f32 * enemy_density) as usize + 1, rng);
    let powerup_spawns = place((rooms.len() as f32 * powerup_density) as usize + 1, rng);

    DungeonPlan {
        bounds,
        walls,
        rooms,
        enemy_spawns,
        powerup_spawns,
    }
}

#[allow(clippy::too_many_arguments)]
fn carve(
    grid: &mut [bool],
    rooms: &mut Vec<Room>,
    bounds: Bounds,
    low_x: i32,
    low_y: i32,
    high_x: i32,
    high_y: i32,
    rng: &mut RandomNumberGenerator,
) {
    if high_x - low_x <= 3 || high_y - low_y <= 3 {
        return;
    }
    let stride = bounds.width;
    let room_w = randint(rng, 3, high_x - low_x - 1);
    let room_h = randint(rng, 3, high_y - low_y - 1);
    let px = randint(rng, low_x, high_x - room_w - 1);
    let py = randint(rng, low_y, high_y - room_h - 1);
    rooms.push(Room {
        low: Point::new(px, py),
        high: Point::new(px + room_w, py + room_h),
    });

    // Knock a few doorway gaps out of the perimeter before laying it down.
    let mut segments = vec![true; (room_w * 2 + room_h * 2) as usize];
    let gaps = (segments.len() / 20).max(5);
    for _ in 0..gaps {
        let ix = rng.range(0, segments.len() as i32) as usize;
        segments[ix] = false;
    }

    for x in px..px + room_w {
        if segments.pop().unwrap_or(true) {
            grid[(py * stride + x) as usize] = true;
        }
        if segments.pop().unwrap_or(true) {
            grid[((py + room_h) * stride + x) as usize] = true;
        }
    }
    for y in py..py + room_h {
        if segments.pop().unwrap_or(true) {
            grid[(y * stride + px) as usize] = true;
        }
        if segments.pop().unwrap_or(true) {
            grid[(y * stride + px + room_w) as usize] = true;
        }
    }
    grid[((py + room_h) * stride + px + room_w) as usize] = true;

    carve(grid, rooms, bounds, low_x, low_y, high_x, py - 2, rng); // above
    carve(grid, rooms, bounds, low_x, py, px - 2, high_y, rng); // left
    carve(grid, rooms, bounds, px + room_w + 2, py, high_x, high_y, rng); // right
    carve(grid, rooms, bounds, px, py + room_h + 2, px + room_w, high_y, rng); // below
    carve(
        grid,
        rooms,
        bounds,
        px + 2,
        py + 2,
        px + room_w - 2,
        py + room_h - 2,
        rng,
    ); // inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> DungeonPlan {
        let mut rng = RandomNumberGenerator::seeded(0xfeed);
        generate(Bounds::new(60, 40), 0.5, 0.2, &mut rng)
    }

    #[test]
    fn border_ring_is_solid() {
        let plan = plan();
        let walls = plan.wall_set();
        for x in 0..60 {
            assert!(walls.contains(&Point::new(x, 0)));
            assert!(walls.contains(&Point::new(x, 39)));
        }
        for y in 0..40 {
            assert!(walls.contains(&Point::new(0, y)));
            assert!(walls.contains(&Point::new(59, y)));
        }
    }

    #[test]
    fn everything_stays_in_bounds() {
        let plan = plan();
        assert!(plan.walls.iter().all(|p| plan.bounds.contains(*p)));
        assert!(plan.enemy_spawns.iter().all(|p| plan.bounds.contains(*p)));
        assert!(plan.powerup_spawns.iter().all(|p| plan.bounds.contains(*p)));
    }

    #[test]
    fn spawns_never_sit_on_walls() {
        let plan = plan();
        let walls = plan.wall_set();
        assert!(!plan.enemy_spawns.is_empty());
        assert!(plan.enemy_spawns.iter().all(|p| !walls.contains(p)));
        assert!(plan.powerup_spawns.iter().all(|p| !walls.contains(p)));
    }

    #[test]
    fn same_seed_same_dungeon() {
        let mut rng_a = RandomNumberGenerator::seeded(7);
        let mut rng_b = RandomNumberGenerator::seeded(7);
        let a = generate(Bounds::new(40, 30), 0.5, 0.2, &mut rng_a);
        let b = generate(Bounds::new(40, 30), 0.5, 0.2, &mut rng_b);
        assert_eq!(a.walls, b.walls);
        assert_eq!(a.enemy_spawns, b.enemy_spawns);
    }

    #[test]
    fn random_floor_avoids_walls() {
        let plan = plan();
        let walls = plan.wall_set();
        let mut rng = RandomNumberGenerator::seeded(3);
        for _ in 0..10 {
            assert!(!walls.contains(&plan.random_floor(&mut rng)));
        }
    }
}
