#![allow(dead_code)]

pub mod actors;

use bracket_geometry::prelude::Point;
use smallvec::{SmallVec, smallvec};

use crate::buff::BuffGrant;
use crate::grid::{Coord, Direction, cell_distance, direction_to, neighbors4};
use crate::render::{CellDraw, ColorIx};
use crate::world::TickCtx;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

/// Explicit kind tag; queries for a category match a small set of tags
/// rather than any type hierarchy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Hostile,
    Projectile,
    Wall,
    BreakableWall,
    Potion,
}

/// Input commands routed to an entity through the key-binding registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Fire,
}

/// Read-only handle into a live entity, as stored in the occupancy snapshot.
/// Never a channel for mutation.
#[derive(Copy, Clone, Debug)]
pub struct Occupant {
    pub id: EntityId,
    pub kind: EntityKind,
    pub collidable: bool,
    pub transparent: bool,
}

/// Capability surface shared by everything the world owns. Defaults mirror
/// the inert case: transparent, collidable, no action handling, never dies.
pub trait Entity {
    fn id(&self) -> EntityId;
    fn kind(&self) -> EntityKind;
    fn raw_pos(&self) -> Coord;
    fn glyph(&self) -> char;

    fn cell(&self) -> Point {
        self.raw_pos().rounded()
    }

    fn color(&self) -> ColorIx {
        0
    }

    fn transparent(&self) -> bool {
        true
    }

    fn collidable(&self) -> bool {
        true
    }

    /// Observers contribute to the world's visible set.
    fn sight_radius(&self) -> Option<i32> {
        None
    }

    fn update(&mut self, _ctx: &mut TickCtx) {}

    fn handle(&mut self, _action: Action, _ctx: &mut TickCtx) {}

    /// Buff delivery, routed by the world after the update phase.
    fn receive(&mut self, _grant: BuffGrant) {}

    fn dead(&self) -> bool {
        false
    }

    fn occupant(&self) -> Occupant {
        Occupant {
            id: self.id(),
            kind: self.kind(),
            collidable: self.collidable(),
            transparent: self.transparent(),
        }
    }

    fn draws(&self) -> SmallVec<[CellDraw; 1]> {
        smallvec![CellDraw {
            pos: self.cell(),
            glyph: self.glyph(),
            color: self.color(),
        }]
    }
}

/// Active behavioral overrides, consulted in order by the movement
/// primitives. Installed and removed by buffs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CapabilityOverride {
    /// Movement skips the occupancy check entirely.
    PhaseMove,
}

/// Tunable per-entity fields that buffs may rewrite for their duration.
#[derive(Clone, Debug)]
pub struct Attributes {
    pub move_period: u32,
    pub fire_period: u32,
    pub sight_radius: i32,
    pub overrides: Vec<CapabilityOverride>,
}

impl Attributes {
    pub fn new(move_period: u32, fire_period: u32, sight_radius: i32) -> Self {
        Self {
            move_period,
            fire_period,
            sight_radius,
            overrides: Vec::new(),
        }
    }

    pub fn phasing(&self) -> bool {
        self.overrides
            .iter()
            .any(|o| *o == CapabilityOverride::PhaseMove)
    }
}

/// Mobile refinement: raw sub-cell position plus cooldown-gated,
/// occupancy-aware movement. Embedded by every entity that moves.
pub struct Body {
    pub pos: Coord,
    pub speed: f32,
    pub cooldown: u32,
    pub attrs: Attributes,
}

impl Body {
    pub fn new(pos: Coord, speed: f32, attrs: Attributes) -> Self {
        Self {
            pos,
            speed,
            cooldown: 0,
            attrs,
        }
    }

    pub fn cell(&self) -> Point {
        self.pos.rounded()
    }

    pub fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    pub fn ready(&self) -> bool {
        self.cooldown == 0
    }

    /// Occupancy-checked step. Fails (position unchanged) while cooling
    /// down, when the destination cell leaves the world, or when the
    /// previous tick's snapshot shows a collidable occupant there (unless
    /// a phase override is active).
    pub fn try_move(&mut self, dir: Direction, ctx: &TickCtx) -> bool {
        if !self.ready() {
            return false;
        }
        let next = self.pos.stepped(dir, self.speed);
        let dest = next.rounded();
        if dest != self.cell() {
            if !ctx.in_world(dest) {
                return false;
            }
            if !self.attrs.phasing() && ctx.snapshot.blocked(dest) {
                return false;
            }
        }
        self.pos = next;
        self.cooldown = self.attrs.move_period;
        true
    }

    /// Unchecked step; projectiles and phase-granted movement use this.
    pub fn absolute_move(&mut self, dir: Direction) -> bool {
        if !self.ready() {
            return false;
        }
        self.pos = self.pos.stepped(dir, self.speed);
        self.cooldown = self.attrs.move_period;
        true
    }

    pub fn move_toward(&mut self, target: Point, ctx: &TickCtx) -> bool {
        self.seek(target, ctx, true)
    }

    pub fn move_away(&mut self, target: Point, ctx: &TickCtx) -> bool {
        self.seek(target, ctx, false)
    }

    /// Picks the unblocked neighbor that best improves Euclidean distance to
    /// `target`; with no improving neighbor, no move is attempted.
    fn seek(&mut self, target: Point, ctx: &TickCtx, closer: bool) -> bool {
        let here = self.cell();
        let current = cell_distance(here, target);
        let mut best: Option<(Point, f32)> = None;
        for n in neighbors4(here) {
            if !ctx.in_world(n) || ctx.snapshot.blocked(n) {
                continue;
            }
            let d = cell_distance(n, target);
            let improves = if closer { d < current } else { d > current };
            if !improves {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, bd)) => {
                    if closer {
                        d < bd
                    } else {
                        d > bd
                    }
                }
            };
            if better {
                best = Some((n, d));
            }
        }
        match best {
            Some((cell, _)) => self.try_move(direction_to(here, cell), ctx),
            None => false,
        }
    }
}
