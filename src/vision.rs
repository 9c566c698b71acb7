use std::collections::HashSet;

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;

use crate::grid::{Bounds, neighbors8};

/// Sight tunables. `extend_prob` is the per-step chance that a ray keeps
/// going once it has passed the nominal radius; it produces the soft,
/// flickering edge of the lit area rather than a hard circle.
#[derive(Copy, Clone, Debug)]
pub struct VisionConfig {
    pub radius: i32,
    pub extend_prob: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            radius: 8,
            extend_prob: 0.009,
        }
    }
}

/// Bresenham traversal from `from` toward `to`, accumulating cells until the
/// ray hits an opaque cell, leaves the radius (and the extension roll fails),
/// or reaches the target. The cell the ray stopped on is always included, so
/// a blocking wall face is itself lit.
pub fn cast_ray(
    from: Point,
    to: Point,
    opaque: &HashSet<Point>,
    cfg: &VisionConfig,
    rng: &mut RandomNumberGenerator,
) -> Vec<Point> {
    let mut ray = Vec::new();
    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let sx = if from.x > to.x { -1 } else { 1 };
    let sy = if from.y > to.y { -1 } else { 1 };
    let (mut x, mut y) = (from.x, from.y);
    let radius_sq = cfg.radius * cfg.radius;

    let stop = |x: i32, y: i32, rng: &mut RandomNumberGenerator| {
        let here = Point::new(x, y);
        if opaque.contains(&here) {
            return true;
        }
        let dist_sq = (x - from.x).pow(2) + (y - from.y).pow(2);
        dist_sq > radius_sq && rng.rand::<f32>() > cfg.extend_prob
    };

    if dx > dy {
        let mut err = dx as f32 / 2.0;
        while x != to.x {
            if stop(x, y, rng) {
                break;
            }
            ray.push(Point::new(x, y));
            err -= dy as f32;
            if err < 0.0 {
                y += sy;
                err += dx as f32;
            }
            x += sx;
        }
    } else {
        let mut err = dy as f32 / 2.0;
        while y != to.y {
            if stop(x, y, rng) {
                break;
            }
            ray.push(Point::new(x, y));
            err -= dx as f32;
            if err < 0.0 {
                x += sx;
                err += dy as f32;
            }
            y += sy;
        }
    }
    ray.push(Point::new(x, y));
    ray
}

/// Every cell visible from `observer`: one ray per grid-edge cell, unioned.
/// Recomputed from scratch each tick since opaque entities die and spawn.
pub fn visible_from(
    observer: Point,
    opaque: &HashSet<Point>,
    bounds: Bounds,
    cfg: &VisionConfig,
    rng: &mut RandomNumberGenerator,
) -> HashSet<Point> {
    let mut visible = HashSet::new();
    for edge in bounds.perimeter() {
        visible.extend(cast_ray(observer, edge, opaque, cfg, rng));
    }
    visible
}

/// Second pass for the "lit wall" effect: every visible open cell lights its
/// first opaque neighbor, so wall faces toward the observer are drawn even
/// though rays terminate on them from one angle only.
pub fn light_wall_faces(visible: &mut HashSet<Point>, opaque: &HashSet<Point>) {
    let open: Vec<Point> = visible
        .iter()
        .copied()
        .filter(|cell| !opaque.contains(cell))
        .collect();
    for cell in open {
        if let Some(face) = neighbors8(cell).into_iter().find(|n| opaque.contains(n)) {
            visible.insert(face);
        }
    }
}
