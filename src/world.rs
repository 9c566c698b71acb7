#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;
use tracing::debug;

use crate::buff::BuffGrant;
use crate::entity::{Action, Entity, EntityId, EntityKind, Occupant};
use crate::grid::{Bounds, cell_distance};
use crate::render::CellDraw;
use crate::vision::{VisionConfig, light_wall_faces, visible_from};

/// Per-tick cached occupancy: rounded cell → occupants, plus a kind index.
/// Rebuilt once per tick after all entities have updated; reads during a
/// tick therefore see the previous tick's positions (simultaneous-move
/// semantics).
#[derive(Default)]
pub struct Snapshot {
    by_cell: HashMap<Point, Vec<Occupant>>,
    by_kind: HashMap<EntityKind, Vec<(EntityId, Point)>>,
}

impl Snapshot {
    fn build(entities: &[Box<dyn Entity>]) -> Self {
        let mut snapshot = Self::default();
        for e in entities {
            let occ = e.occupant();
            let cell = e.cell();
            snapshot.by_cell.entry(cell).or_default().push(occ);
            snapshot
                .by_kind
                .entry(occ.kind)
                .or_default()
                .push((occ.id, cell));
        }
        snapshot
    }

    pub fn occupants(&self, cell: Point) -> &[Occupant] {
        self.by_cell.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Any collidable occupant makes the cell a blocked move target.
    pub fn blocked(&self, cell: Point) -> bool {
        self.occupants(cell).iter().any(|o| o.collidable)
    }

    pub fn of_kind(&self, kind: EntityKind) -> &[(EntityId, Point)] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count_at(&self, cell: Point, kinds: &[EntityKind]) -> usize {
        self.occupants(cell)
            .iter()
            .filter(|o| kinds.contains(&o.kind))
            .count()
    }

    pub fn nearest(&self, kind: EntityKind, from: Point) -> Option<Point> {
        self.of_kind(kind)
            .iter()
            .map(|(_, cell)| *cell)
            .min_by(|a, b| cell_distance(from, *a).total_cmp(&cell_distance(from, *b)))
    }
}

/// Everything an entity may consult or request while updating: the previous
/// tick's snapshot and visible set, world bounds, the shared RNG, and queues
/// for spawns and buff grants the world drains afterwards. Entities mutate
/// only themselves.
pub struct TickCtx<'a> {
    pub snapshot: &'a Snapshot,
    pub visible: &'a HashSet<Point>,
    pub bounds: Bounds,
    pub rng: &'a mut RandomNumberGenerator,
    next_id: &'a mut u64,
    spawns: Vec<Box<dyn Entity>>,
    grants: Vec<(EntityId, BuffGrant)>,
}

impl<'a> TickCtx<'a> {
    pub fn in_world(&self, cell: Point) -> bool {
        self.bounds.contains(cell)
    }

    pub fn alloc_id(&mut self) -> EntityId {
        let id = EntityId(*self.next_id);
        *self.next_id += 1;
        id
    }

    pub fn spawn(&mut self, e: Box<dyn Entity>) {
        self.spawns.push(e);
    }

    pub fn grant(&mut self, target: EntityId, grant: BuffGrant) {
        self.grants.push((target, grant));
    }
}

/// Owns the live entities and the per-tick derived state: visible cells,
/// visible entities, and the occupancy snapshot.
pub struct World {
    pub bounds: Bounds,
    vision: VisionConfig,
    entities: Vec<Box<dyn Entity>>,
    snapshot: Snapshot,
    visible: HashSet<Point>,
    visible_ids: HashSet<EntityId>,
    next_id: u64,
    rng: RandomNumberGenerator,
    removed: Vec<EntityId>,
}

impl World {
    pub fn new(bounds: Bounds, vision: VisionConfig, seed: u64) -> Self {
        Self {
            bounds,
            vision,
            entities: Vec::new(),
            snapshot: Snapshot::default(),
            visible: HashSet::new(),
            visible_ids: HashSet::new(),
            next_id: 0,
            rng: RandomNumberGenerator::seeded(seed),
            removed: Vec::new(),
        }
    }

    pub fn alloc_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends to the live set; no duplicate check. The entity shows up in
    /// the occupancy snapshot at the next rebuild.
    pub fn add(&mut self, e: Box<dyn Entity>) {
        self.entities.push(e);
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn visible(&self) -> &HashSet<Point> {
        &self.visible
    }

    pub fn rng(&mut self) -> &mut RandomNumberGenerator {
        &mut self.rng
    }

    pub fn entity(&self, id: EntityId) -> Option<&dyn Entity> {
        self.entities
            .iter()
            .find(|e| e.id() == id)
            .map(Box::as_ref)
    }

    pub fn kind_count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind() == kind).count()
    }

    /// Routes an input action to its entity against the current (previous
    /// tick's) snapshot, then absorbs anything it spawned.
    pub fn dispatch(&mut self, id: EntityId, action: Action) {
        let Self {
            entities,
            snapshot,
            visible,
            bounds,
            rng,
            next_id,
            ..
        } = self;
        let mut ctx = TickCtx {
            snapshot,
            visible,
            bounds: *bounds,
            rng,
            next_id,
            spawns: Vec::new(),
            grants: Vec::new(),
        };
        if let Some(e) = entities.iter_mut().find(|e| e.id() == id) {
            e.handle(action, &mut ctx);
        }
        let spawned = ctx.spawns;
        self.entities.extend(spawned);
    }

    /// One simulation step: update every entity against the previous tick's
    /// snapshot, deliver queued buff grants, absorb spawns, excise the dead,
    /// and rebuild the occupancy snapshot from the survivors.
    pub fn update(&mut self) {
        let Self {
            entities,
            snapshot,
            visible,
            bounds,
            rng,
            next_id,
            ..
        } = self;
        let mut ctx = TickCtx {
            snapshot,
            visible,
            bounds: *bounds,
            rng,
            next_id,
            spawns: Vec::new(),
            grants: Vec::new(),
        };
        for e in entities.iter_mut() {
            e.update(&mut ctx);
        }
        let TickCtx { spawns, grants, .. } = ctx;
        for (target, grant) in grants {
            if let Some(e) = entities.iter_mut().find(|e| e.id() == target) {
                e.receive(grant);
            }
        }
        self.entities.extend(spawns);

        let mut survivors = Vec::with_capacity(self.entities.len());
        for e in self.entities.drain(..) {
            if e.dead() {
                debug!(id = e.id().0, kind = ?e.kind(), "entity expired");
                self.removed.push(e.id());
            } else {
                survivors.push(e);
            }
        }
        self.entities = survivors;
        self.rebuild_snapshot();
    }

    pub fn rebuild_snapshot(&mut self) {
        self.snapshot = Snapshot::build(&self.entities);
    }

    /// Recomputes the visible set from every observer, in full, from the
    /// post-update positions; opaque entities may have died or spawned this
    /// tick so nothing is carried over. Also refreshes the visible-entity
    /// set against the new visible cells.
    pub fn calc_visibility(&mut self) {
        let opaque: HashSet<Point> = self
            .entities
            .iter()
            .filter(|e| !e.transparent())
            .map(|e| e.cell())
            .collect();

        let mut visible = HashSet::new();
        let observers: Vec<(Point, i32)> = self
            .entities
            .iter()
            .filter_map(|e| e.sight_radius().map(|r| (e.cell(), r)))
            .collect();
        for (cell, radius) in observers {
            let cfg = VisionConfig {
                radius,
                extend_prob: self.vision.extend_prob,
            };
            visible.extend(visible_from(cell, &opaque, self.bounds, &cfg, &mut self.rng));
        }
        light_wall_faces(&mut visible, &opaque);
        self.visible = visible;
        self.visible_ids = self
            .entities
            .iter()
            .filter(|e| self.visible.contains(&e.cell()))
            .map(|e| e.id())
            .collect();
    }

    /// Draw commands for currently-visible entities only.
    pub fn draws(&self) -> Vec<CellDraw> {
        self.entities
            .iter()
            .filter(|e| self.visible_ids.contains(&e.id()))
            .flat_map(|e| e.draws())
            .collect()
    }

    /// Ids excised since the last call; the key registry prunes these.
    pub fn drain_removed(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::actors::{Player, Wall};
    use crate::grid::Direction;

    fn test_world() -> World {
        World::new(
            Bounds::new(20, 20),
            VisionConfig {
                radius: 30,
                extend_prob: 0.0,
            },
            42,
        )
    }

    fn spawn_player(world: &mut World, x: i32, y: i32) -> EntityId {
        let id = world.alloc_id();
        world.add(Box::new(Player::new(id, Point::new(x, y), 30)));
        id
    }

    #[test]
    fn move_into_a_wall_is_refused() {
        let mut world = test_world();
        let player = spawn_player(&mut world, 5, 5);
        let wall_id = world.alloc_id();
        world.add(Box::new(Wall::new(wall_id, Point::new(6, 5))));
        world.rebuild_snapshot();

        world.dispatch(player, Action::Move(Direction::Right));
        assert_eq!(world.entity(player).unwrap().cell(), Point::new(5, 5));

        world.dispatch(player, Action::Move(Direction::Down));
        assert_eq!(world.entity(player).unwrap().cell(), Point::new(5, 6));
    }

    #[test]
    fn snapshot_indexes_post_update_positions() {
        let mut world = test_world();
        let player = spawn_player(&mut world, 5, 5);
        world.rebuild_snapshot();
        world.dispatch(player, Action::Move(Direction::Right));
        world.update();

        let snap = world.snapshot();
        assert_eq!(snap.occupants(Point::new(6, 5)).len(), 1);
        assert!(snap.occupants(Point::new(5, 5)).is_empty());
        assert_eq!(snap.of_kind(EntityKind::Player).len(), 1);
    }

    #[test]
    fn dispatch_observes_the_stale_snapshot() {
        // A wall added after the last rebuild is invisible to movement until
        // the next tick; this staleness is the simultaneous-move guarantee.
        let mut world = test_world();
        let player = spawn_player(&mut world, 5, 5);
        world.rebuild_snapshot();
        let wall_id = world.alloc_id();
        world.add(Box::new(Wall::new(wall_id, Point::new(6, 5))));

        world.dispatch(player, Action::Move(Direction::Right));
        assert_eq!(world.entity(player).unwrap().cell(), Point::new(6, 5));
    }

    #[test]
    fn dead_entities_are_excised_and_reported() {
        let mut world = test_world();
        let player = spawn_player(&mut world, 5, 5);
        let wall_id = world.alloc_id();
        world.add(Box::new(Wall::new(wall_id, Point::new(9, 9))));
        world.rebuild_snapshot();

        // Stand a hostile on the player until it dies.
        use crate::ai::MoodController;
        use crate::entity::actors::Hostile;
        let hostile_id = world.alloc_id();
        world.add(Box::new(Hostile::new(
            hostile_id,
            Point::new(5, 5),
            MoodController::new(None),
            false,
        )));
        world.rebuild_snapshot();
        for _ in 0..20 {
            world.update();
        }
        assert_eq!(world.kind_count(EntityKind::Player), 0);
        assert!(world.drain_removed().contains(&player));
    }

    #[test]
    fn visibility_tracks_observers_and_walls() {
        let mut world = test_world();
        spawn_player(&mut world, 5, 5);
        for y in 0..20 {
            let id = world.alloc_id();
            world.add(Box::new(Wall::new(id, Point::new(10, y))));
        }
        world.rebuild_snapshot();
        world.calc_visibility();

        assert!(world.visible().contains(&Point::new(6, 5)));
        // Wall face toward the observer is lit, cells beyond it are not.
        assert!(world.visible().contains(&Point::new(10, 5)));
        assert!(!world.visible().contains(&Point::new(12, 5)));
    }

    #[test]
    fn only_visible_entities_are_drawn() {
        let mut world = test_world();
        spawn_player(&mut world, 5, 5);
        for y in 0..20 {
            let id = world.alloc_id();
            world.add(Box::new(Wall::new(id, Point::new(10, y))));
        }
        // A wall fully behind the barrier never produces draw commands.
        let hidden = world.alloc_id();
        world.add(Box::new(Wall::new(hidden, Point::new(15, 5))));
        world.rebuild_snapshot();
        world.calc_visibility();

        let draws = world.draws();
        assert!(draws.iter().any(|d| d.pos == Point::new(5, 5)));
        assert!(!draws.iter().any(|d| d.pos == Point::new(15, 5)));
    }
}
