#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use bracket_geometry::prelude::Point;
use tracing::debug;

use crate::entity::{Body, EntityKind};
use crate::grid::{Bounds, cell_distance, neighbors4};
use crate::world::TickCtx;

/// Within this distance a visible enemy turns aggressive; beyond it, it
/// keeps its distance instead.
pub const ENGAGE_RADIUS: f32 = 8.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mood {
    Bored,
    Angry,
    Spooked,
}

/// Waypoint list walked forward then backward indefinitely.
pub struct PatrolRoute {
    waypoints: Vec<Point>,
    ix: usize,
    forward: bool,
}

impl PatrolRoute {
    pub fn new(waypoints: Vec<Point>) -> Option<Self> {
        if waypoints.is_empty() {
            return None;
        }
        Some(Self {
            waypoints,
            ix: 0,
            forward: true,
        })
    }

    pub fn current(&self) -> Point {
        self.waypoints[self.ix]
    }

    /// Steps to the next waypoint, reversing at either end.
    pub fn advance(&mut self) {
        if self.waypoints.len() == 1 {
            return;
        }
        if self.forward {
            if self.ix + 1 == self.waypoints.len() {
                self.forward = false;
                self.ix -= 1;
            } else {
                self.ix += 1;
            }
        } else if self.ix == 0 {
            self.forward = true;
            self.ix += 1;
        } else {
            self.ix -= 1;
        }
    }
}

/// Per-enemy layered state machine: one transition evaluated per tick, then
/// the resulting state's action runs the same tick.
pub struct MoodController {
    pub mood: Mood,
    route: Option<PatrolRoute>,
}

impl MoodController {
    pub fn new(route: Option<PatrolRoute>) -> Self {
        Self {
            mood: Mood::Bored,
            route,
        }
    }

    /// Deterministic given (visible, distance). No condition matched means
    /// no transition.
    pub fn transition(mood: Mood, visible: bool, distance: f32) -> Mood {
        match mood {
            Mood::Bored => {
                if visible {
                    if distance <= ENGAGE_RADIUS {
                        Mood::Angry
                    } else {
                        Mood::Spooked
                    }
                } else {
                    mood
                }
            }
            Mood::Angry => {
                if !visible {
                    Mood::Bored
                } else if distance > ENGAGE_RADIUS {
                    Mood::Spooked
                } else {
                    mood
                }
            }
            Mood::Spooked => {
                if !visible {
                    Mood::Bored
                } else if distance <= ENGAGE_RADIUS {
                    Mood::Angry
                } else {
                    mood
                }
            }
        }
    }

    pub fn tick(&mut self, body: &mut Body, ctx: &TickCtx) {
        let here = body.cell();
        let seen = ctx.visible.contains(&here);
        let nearest = ctx.snapshot.nearest(EntityKind::Player, here);
        let distance = nearest
            .map(|p| cell_distance(here, p))
            .unwrap_or(f32::INFINITY);

        let next = Self::transition(self.mood, seen, distance);
        if next != self.mood {
            debug!(from = ?self.mood, to = ?next, at = ?(here.x, here.y), "mood shift");
            self.mood = next;
        }

        match self.mood {
            Mood::Bored => {
                if let Some(route) = &mut self.route {
                    if here == route.current() {
                        route.advance();
                    }
                    let waypoint = route.current();
                    if waypoint != here {
                        body.move_toward(waypoint, ctx);
                    }
                }
            }
            Mood::Angry => {
                if let Some(player) = nearest {
                    body.move_toward(player, ctx);
                }
            }
            Mood::Spooked => {
                if let Some(player) = nearest {
                    body.move_away(player, ctx);
                }
            }
        }
    }
}

/// Neighbor expansion order for the patrol search; purely a tie-break
/// between equally-scored frontier cells.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    #[default]
    RowMajor,
    ColumnMajor,
}

#[derive(Copy, Clone, PartialEq)]
struct Frontier {
    score: f32,
    cell: Point,
    tiebreak: TieBreak,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert for lowest-score-first.
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| match self.tiebreak {
                TieBreak::RowMajor => (other.cell.y, other.cell.x).cmp(&(self.cell.y, self.cell.x)),
                TieBreak::ColumnMajor => {
                    (other.cell.x, other.cell.y).cmp(&(self.cell.x, self.cell.y))
                }
            })
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first search over four-connected free cells, priority = steps taken
/// plus straight-line distance to the goal. Stops at the first path found;
/// an exhausted frontier yields no route and the enemy simply idles.
pub fn patrol_route(
    start: Point,
    goal: Point,
    obstacles: &HashSet<Point>,
    bounds: Bounds,
    tiebreak: TieBreak,
) -> Option<Vec<Point>> {
    if start == goal {
        return Some(vec![start]);
    }
    let mut prev: HashMap<Point, Point> = HashMap::new();
    let mut steps: HashMap<Point, u32> = HashMap::new();
    let mut frontier = BinaryHeap::new();
    prev.insert(start, start);
    steps.insert(start, 0);
    frontier.push(Frontier {
        score: cell_distance(start, goal),
        cell: start,
        tiebreak,
    });

    while let Some(Frontier { cell, .. }) = frontier.pop() {
        let here_steps = steps[&cell];
        for n in neighbors4(cell) {
            if !bounds.contains(n) || obstacles.contains(&n) || prev.contains_key(&n) {
                continue;
            }
            prev.insert(n, cell);
            steps.insert(n, here_steps + 1);
            if n == goal {
                let mut route = vec![goal];
                let mut cursor = cell;
                while cursor != start {
                    route.push(cursor);
                    cursor = prev[&cursor];
                }
                route.push(start);
                route.reverse();
                return Some(route);
            }
            frontier.push(Frontier {
                score: (here_steps + 1) as f32 + cell_distance(n, goal),
                cell: n,
                tiebreak,
            });
        }
    }
    None
}
