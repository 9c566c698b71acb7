#![allow(dead_code)]

use bracket_geometry::prelude::Point;
use tracing::debug;

use crate::ai::MoodController;
use crate::buff::{BUFF_KINDS, BuffGrant, BuffSet, BuffTarget};
use crate::entity::{Action, Attributes, Body, Entity, EntityId, EntityKind};
use crate::grid::{Coord, Direction};
use crate::render::ColorIx;
use crate::world::TickCtx;

pub const PLAYER_HP: i32 = 10;
pub const PLAYER_MOVE_PERIOD: u32 = 4;
pub const PLAYER_FIRE_PERIOD: u32 = 30;
pub const HOSTILE_HP: i32 = 3;
pub const HOSTILE_MOVE_PERIOD: u32 = 8;
pub const PROJECTILE_SPEED: f32 = 0.3;
pub const BREAKABLE_WALL_HP: i32 = 3;
pub const POTION_DURATION: u32 = 600;

/// Input-driven. Fires in the last successfully-moved direction, loses one
/// hit point per hostile sharing its cell each tick, and is the world's
/// observer.
pub struct Player {
    id: EntityId,
    body: Body,
    hp: i32,
    max_hp: i32,
    last_dir: Direction,
    fire_cooldown: u32,
    buffs: BuffSet,
}

impl Player {
    pub fn new(id: EntityId, cell: Point, sight_radius: i32) -> Self {
        Self {
            id,
            body: Body::new(
                Coord::from_cell(cell),
                1.0,
                Attributes::new(PLAYER_MOVE_PERIOD, PLAYER_FIRE_PERIOD, sight_radius),
            ),
            hp: PLAYER_HP,
            max_hp: PLAYER_HP,
            last_dir: Direction::Up,
            fire_cooldown: 0,
            buffs: BuffSet::default(),
        }
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn buffs(&self) -> &BuffSet {
        &self.buffs
    }
}

impl Entity for Player {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Player
    }

    fn raw_pos(&self) -> Coord {
        self.body.pos
    }

    fn glyph(&self) -> char {
        '&'
    }

    fn color(&self) -> ColorIx {
        2
    }

    fn sight_radius(&self) -> Option<i32> {
        Some(self.body.attrs.sight_radius)
    }

    fn handle(&mut self, action: Action, ctx: &mut TickCtx) {
        match action {
            Action::Move(dir) => {
                if self.body.try_move(dir, ctx) {
                    self.last_dir = dir;
                }
            }
            Action::Fire => {
                if self.fire_cooldown == 0 {
                    let id = ctx.alloc_id();
                    let muzzle = Coord::from_cell(self.cell() + self.last_dir.delta());
                    ctx.spawn(Box::new(Projectile::new(id, muzzle, self.last_dir)));
                    self.fire_cooldown = self.body.attrs.fire_period;
                }
            }
        }
    }

    fn receive(&mut self, grant: BuffGrant) {
        let mut target = BuffTarget {
            attrs: &mut self.body.attrs,
            hp: &mut self.hp,
            max_hp: self.max_hp,
        };
        self.buffs.grant(grant, &mut target);
    }

    fn update(&mut self, ctx: &mut TickCtx) {
        self.body.tick_cooldown();
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);

        let contact = ctx
            .snapshot
            .count_at(self.cell(), &[EntityKind::Hostile]) as i32;
        if contact > 0 {
            self.hp -= contact;
            debug!(hp = self.hp, "player hurt by contact");
        }

        let mut target = BuffTarget {
            attrs: &mut self.body.attrs,
            hp: &mut self.hp,
            max_hp: self.max_hp,
        };
        self.buffs.tick(&mut target);
    }

    fn dead(&self) -> bool {
        self.hp <= 0
    }
}

/// Mood-driven enemy. Opaque (it casts shadow), hurt by projectiles on its
/// cell; some spawn intangible while idle, letting the player walk through.
pub struct Hostile {
    id: EntityId,
    body: Body,
    hp: i32,
    mood: MoodController,
    intangible_when_bored: bool,
}

impl Hostile {
    pub fn new(
        id: EntityId,
        cell: Point,
        mood: MoodController,
        intangible_when_bored: bool,
    ) -> Self {
        Self {
            id,
            body: Body::new(
                Coord::from_cell(cell),
                1.0,
                Attributes::new(HOSTILE_MOVE_PERIOD, 0, 0),
            ),
            hp: HOSTILE_HP,
            mood,
            intangible_when_bored,
        }
    }

    pub fn mood(&self) -> &MoodController {
        &self.mood
    }
}

impl Entity for Hostile {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Hostile
    }

    fn raw_pos(&self) -> Coord {
        self.body.pos
    }

    fn glyph(&self) -> char {
        match self.mood.mood {
            crate::ai::Mood::Bored => '.',
            crate::ai::Mood::Angry => '>',
            crate::ai::Mood::Spooked => '<',
        }
    }

    fn transparent(&self) -> bool {
        false
    }

    fn collidable(&self) -> bool {
        !(self.intangible_when_bored && self.mood.mood == crate::ai::Mood::Bored)
    }

    fn update(&mut self, ctx: &mut TickCtx) {
        self.body.tick_cooldown();
        let hits = ctx
            .snapshot
            .count_at(self.cell(), &[EntityKind::Projectile]) as i32;
        if hits > 0 {
            self.hp -= hits;
            debug!(hp = self.hp, "hostile hit");
        }
        self.mood.tick(&mut self.body, ctx);
    }

    fn dead(&self) -> bool {
        self.hp <= 0
    }
}

/// Flies one unchecked sub-cell step per tick in a fixed direction. Dies a
/// tick after sharing a cell with anything collidable, or after staying
/// outside the visible set too long.
pub struct Projectile {
    id: EntityId,
    body: Body,
    dir: Direction,
    outside_vision: u32,
    hit: bool,
}

impl Projectile {
    pub fn new(id: EntityId, pos: Coord, dir: Direction) -> Self {
        Self {
            id,
            body: Body::new(pos, PROJECTILE_SPEED, Attributes::new(0, 0, 0)),
            dir,
            outside_vision: 0,
            hit: false,
        }
    }
}

impl Entity for Projectile {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Projectile
    }

    fn raw_pos(&self) -> Coord {
        self.body.pos
    }

    fn glyph(&self) -> char {
        'X'
    }

    fn color(&self) -> ColorIx {
        5
    }

    fn update(&mut self, ctx: &mut TickCtx) {
        // Collision is read pre-move so the victim sees this projectile in
        // the same snapshot the projectile saw the victim in.
        let here = self.cell();
        if ctx
            .snapshot
            .occupants(here)
            .iter()
            .any(|o| o.id != self.id && o.collidable)
        {
            self.hit = true;
        }

        self.body.absolute_move(self.dir);

        let landed = self.cell();
        if !ctx.visible.contains(&landed) || !ctx.in_world(landed) {
            self.outside_vision += 1;
        } else {
            self.outside_vision = 0;
        }
    }

    fn dead(&self) -> bool {
        self.hit || self.outside_vision > 4
    }
}

/// Opaque, collidable, inert.
pub struct Wall {
    id: EntityId,
    pos: Coord,
}

impl Wall {
    pub fn new(id: EntityId, cell: Point) -> Self {
        Self {
            id,
            pos: Coord::from_cell(cell),
        }
    }
}

impl Entity for Wall {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Wall
    }

    fn raw_pos(&self) -> Coord {
        self.pos
    }

    fn glyph(&self) -> char {
        '#'
    }

    fn color(&self) -> ColorIx {
        3
    }

    fn transparent(&self) -> bool {
        false
    }
}

/// Wall that crumbles under projectile fire, dropping a random power-up.
pub struct BreakableWall {
    id: EntityId,
    pos: Coord,
    hp: i32,
    dropped: bool,
}

impl BreakableWall {
    pub fn new(id: EntityId, cell: Point) -> Self {
        Self {
            id,
            pos: Coord::from_cell(cell),
            hp: BREAKABLE_WALL_HP,
            dropped: false,
        }
    }
}

impl Entity for BreakableWall {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::BreakableWall
    }

    fn raw_pos(&self) -> Coord {
        self.pos
    }

    fn glyph(&self) -> char {
        '%'
    }

    fn color(&self) -> ColorIx {
        3
    }

    fn transparent(&self) -> bool {
        false
    }

    fn update(&mut self, ctx: &mut TickCtx) {
        let hits = ctx
            .snapshot
            .count_at(self.cell(), &[EntityKind::Projectile]) as i32;
        if hits == 0 {
            return;
        }
        self.hp -= hits;
        if self.hp <= 0 && !self.dropped {
            self.dropped = true;
            let kind = BUFF_KINDS[ctx.rng.range(0, BUFF_KINDS.len() as i32) as usize];
            let id = ctx.alloc_id();
            let cell = self.cell();
            debug!(?kind, at = ?(cell.x, cell.y), "wall crumbles into a power-up");
            ctx.spawn(Box::new(Potion::new(
                id,
                cell,
                BuffGrant {
                    kind,
                    duration: POTION_DURATION,
                },
            )));
        }
    }

    fn dead(&self) -> bool {
        self.hp <= 0
    }
}

/// Walk-through pickup. When a player stands on it, queues its buff for that
/// player and marks itself consumed; it is excised at the end of the tick.
pub struct Potion {
    id: EntityId,
    pos: Coord,
    grant: BuffGrant,
    consumed: bool,
}

impl Potion {
    pub fn new(id: EntityId, cell: Point, grant: BuffGrant) -> Self {
        Self {
            id,
            pos: Coord::from_cell(cell),
            grant,
            consumed: false,
        }
    }
}

impl Entity for Potion {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Potion
    }

    fn raw_pos(&self) -> Coord {
        self.pos
    }

    fn glyph(&self) -> char {
        '!'
    }

    fn color(&self) -> ColorIx {
        2
    }

    fn collidable(&self) -> bool {
        false
    }

    fn update(&mut self, ctx: &mut TickCtx) {
        if self.consumed {
            return;
        }
        let taker = ctx
            .snapshot
            .occupants(self.cell())
            .iter()
            .find(|o| o.kind == EntityKind::Player)
            .map(|o| o.id);
        if let Some(player) = taker {
            ctx.grant(player, self.grant);
            self.consumed = true;
        }
    }

    fn dead(&self) -> bool {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buff::BuffKind;
    use crate::grid::Bounds;
    use crate::vision::VisionConfig;
    use crate::world::World;

    fn headless_world() -> World {
        World::new(
            Bounds::new(30, 30),
            VisionConfig {
                radius: 50,
                extend_prob: 0.0,
            },
            99,
        )
    }

    fn tick(world: &mut World) {
        world.update();
        world.calc_visibility();
    }

    #[test]
    fn projectile_travels_at_fixed_speed_and_expires_off_screen() {
        let mut world = headless_world();
        // Observer far off the flight path so the whole grid stays lit.
        let player = world.alloc_id();
        world.add(Box::new(Player::new(player, Point::new(2, 2), 50)));
        let shot = world.alloc_id();
        world.add(Box::new(Projectile::new(
            shot,
            Coord::from_cell(Point::new(5, 5)),
            Direction::Right,
        )));
        world.rebuild_snapshot();
        world.calc_visibility();

        for _ in 0..5 {
            tick(&mut world);
        }
        let pos = world.entity(shot).unwrap().raw_pos();
        assert!((pos.x - (5.0 + 5.0 * PROJECTILE_SPEED)).abs() < 1e-5);
        assert_eq!(pos.y, 5.0);
    }

    #[test]
    fn projectile_dies_after_five_ticks_out_of_sight() {
        let mut world = headless_world();
        // No observers: the visible set stays empty.
        let shot = world.alloc_id();
        world.add(Box::new(Projectile::new(
            shot,
            Coord::from_cell(Point::new(5, 5)),
            Direction::Right,
        )));
        world.rebuild_snapshot();

        for _ in 0..4 {
            world.update();
            assert!(world.entity(shot).is_some());
        }
        world.update();
        assert!(world.entity(shot).is_none());
    }

    #[test]
    fn projectile_wears_down_a_breakable_wall_which_drops_a_potion() {
        let mut world = headless_world();
        let player = world.alloc_id();
        world.add(Box::new(Player::new(player, Point::new(2, 10), 50)));
        let wall = world.alloc_id();
        world.add(Box::new(BreakableWall::new(wall, Point::new(6, 10))));
        world.rebuild_snapshot();
        world.calc_visibility();

        // Keep feeding projectiles into the wall cell until it crumbles.
        for _ in 0..40 {
            if world.kind_count(EntityKind::Projectile) == 0 {
                let shot = world.alloc_id();
                world.add(Box::new(Projectile::new(
                    shot,
                    Coord::from_cell(Point::new(5, 10)),
                    Direction::Right,
                )));
            }
            tick(&mut world);
            if world.entity(wall).is_none() {
                break;
            }
        }
        assert!(world.entity(wall).is_none(), "wall should have crumbled");
        assert_eq!(world.kind_count(EntityKind::Potion), 1);
    }

    #[test]
    fn player_picks_up_a_potion_exactly_once() {
        let mut world = headless_world();
        let player = world.alloc_id();
        world.add(Box::new(Player::new(player, Point::new(5, 5), 50)));
        let potion = world.alloc_id();
        world.add(Box::new(Potion::new(
            potion,
            Point::new(5, 5),
            BuffGrant {
                kind: BuffKind::FarSight,
                duration: 40,
            },
        )));
        world.rebuild_snapshot();

        // The potion sees the player in the shared snapshot, queues the
        // grant, and is consumed in the same tick.
        world.update();
        assert!(world.entity(potion).is_none());
        let boosted = world
            .entity(player)
            .and_then(|e| e.sight_radius())
            .unwrap();
        assert_eq!(boosted, 54);

        // Still standing there next tick: no second grant, no extension.
        world.update();
        let still = world
            .entity(player)
            .and_then(|e| e.sight_radius())
            .unwrap();
        assert_eq!(still, 54);
    }

    #[test]
    fn fire_spawns_a_projectile_in_the_last_moved_direction() {
        let mut world = headless_world();
        let player = world.alloc_id();
        world.add(Box::new(Player::new(player, Point::new(5, 5), 50)));
        world.rebuild_snapshot();

        world.dispatch(player, Action::Move(Direction::Right));
        world.dispatch(player, Action::Fire);
        assert_eq!(world.kind_count(EntityKind::Projectile), 1);

        // Fire again immediately: rate-limited, nothing spawns.
        world.dispatch(player, Action::Fire);
        assert_eq!(world.kind_count(EntityKind::Projectile), 1);
    }

    #[test]
    fn intangible_bored_hostile_does_not_block() {
        let mut world = headless_world();
        let player = world.alloc_id();
        world.add(Box::new(Player::new(player, Point::new(5, 5), 50)));
        let ghost = world.alloc_id();
        world.add(Box::new(Hostile::new(
            ghost,
            Point::new(6, 5),
            MoodController::new(None),
            true,
        )));
        world.rebuild_snapshot();

        world.dispatch(player, Action::Move(Direction::Right));
        assert_eq!(world.entity(player).unwrap().cell(), Point::new(6, 5));
    }
}
