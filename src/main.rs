mod ai;
mod buff;
mod dungeon;
mod entity;
mod grid;
mod input;
mod render;
mod vision;
mod world;

use std::collections::HashSet;

use bracket_geometry::prelude::Point;
use bracket_random::prelude::RandomNumberGenerator;
use bracket_terminal::prelude::*;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai::{MoodController, PatrolRoute, TieBreak, patrol_route};
use buff::{BUFF_KINDS, BuffGrant};
use dungeon::DungeonPlan;
use entity::actors::{BreakableWall, Hostile, POTION_DURATION, Player, Potion, Wall};
use entity::{EntityId, EntityKind};
use grid::{Bounds, cell_distance};
use input::KeyMap;
use render::{Canvas, CanvasError, CellDraw, ColorIx, DrawController, FrameCtx, Palette};
use vision::VisionConfig;
use world::World;

const PATROL_MIN_RANGE: f32 = 10.0;
const BREAKABLE_WALL_CHANCE: i32 = 10; // percent

#[derive(Parser, Debug)]
#[command(name = "emberrogue", about = "Tick-driven terminal dungeon crawl")]
struct Args {
    #[arg(long, default_value_t = 60)]
    width: i32,
    #[arg(long, default_value_t = 40)]
    height: i32,
    /// Enemies spawned per generated room, on average.
    #[arg(long, default_value_t = 0.5)]
    enemy_density: f32,
    /// Power-ups spawned per generated room, on average.
    #[arg(long, default_value_t = 0.2)]
    powerup_density: f32,
    /// Sight radius for the player before buffs.
    #[arg(long, default_value_t = 8)]
    sight_radius: i32,
    /// Chance per step that a sight ray runs past its radius.
    #[arg(long, default_value_t = 0.009)]
    extend_prob: f32,
    /// Expand patrol-search ties column-first instead of row-first.
    #[arg(long, default_value_t = false)]
    column_major_patrol: bool,
    #[arg(long)]
    seed: Option<u64>,
}

/// Terminal backend behind the renderer seam: resolves palette indexes and
/// refuses writes outside the grid.
struct BracketCanvas<'a> {
    term: &'a mut BTerm,
    palette: &'a Palette,
    bounds: Bounds,
}

impl Canvas for BracketCanvas<'_> {
    fn put(&mut self, pos: Point, glyph: char, color: ColorIx) -> Result<(), CanvasError> {
        if !self.bounds.contains(pos) {
            return Err(CanvasError::OutOfGrid(pos.x, pos.y));
        }
        let (fg, bg) = self.palette.get(color);
        self.term.set(pos.x, pos.y, fg, bg, to_cp437(glyph));
        Ok(())
    }

    fn flush(&mut self) {
        // BTerm presents the frame itself once tick returns.
    }
}

struct Game {
    world: World,
    dc: DrawController,
    keys: KeyMap,
    palette: Palette,
}

impl Game {
    fn new(args: &Args) -> Self {
        let seed = args
            .seed
            .unwrap_or_else(|| RandomNumberGenerator::new().rand::<u64>());
        info!(seed, "seeding dungeon");
        let bounds = Bounds::new(args.width, args.height);
        let mut rng = RandomNumberGenerator::seeded(seed);
        let plan = dungeon::generate(bounds, args.enemy_density, args.powerup_density, &mut rng);

        let vision = VisionConfig {
            radius: args.sight_radius,
            extend_prob: args.extend_prob,
        };
        let mut world = World::new(bounds, vision, seed.wrapping_add(1));
        let tiebreak = if args.column_major_patrol {
            TieBreak::ColumnMajor
        } else {
            TieBreak::RowMajor
        };

        let player = spawn_all(&mut world, &plan, args.sight_radius, tiebreak, &mut rng);
        let mut keys = KeyMap::default();
        keys.bind_player(player);

        world.rebuild_snapshot();
        world.calc_visibility();

        let mut dc = DrawController::new(bounds);
        let frame = FrameCtx {
            visible: world.visible(),
        };
        dc.add_rule(
            "vis",
            Box::new(|p, f: &FrameCtx| f.visible.contains(&p)),
            ' ',
            1,
            None,
            &frame,
        );
        dc.full_draw();

        Self {
            world,
            dc,
            keys,
            palette: Palette::classic(),
        }
    }
}

impl GameState for Game {
    fn tick(&mut self, ctx: &mut BTerm) {
        if let Some(key) = ctx.key {
            for (id, action) in self.keys.actions(key) {
                self.world.dispatch(id, action);
            }
        }

        let old_visible: HashSet<Point> = self.world.visible().clone();
        self.world.update();
        self.world.calc_visibility();
        self.dc.mark_dirty(
            old_visible
                .symmetric_difference(self.world.visible())
                .copied(),
        );

        for id in self.world.drain_removed() {
            self.keys.deregister(id);
        }

        let draws: Vec<CellDraw> = self.world.draws();
        let mut canvas = BracketCanvas {
            term: ctx,
            palette: &self.palette,
            bounds: self.world.bounds,
        };
        self.dc.draw(&draws, &mut canvas);
        let frame = FrameCtx {
            visible: self.world.visible(),
        };
        self.dc.render(&frame, &mut canvas);

        if self.world.kind_count(EntityKind::Player) == 0 {
            info!("player fell; ending run");
            ctx.quitting = true;
        }
    }
}

/// Populates the world from the dungeon plan: the player, walls (an inner
/// fraction of them breakable), patrol-seeded enemies, and power-ups.
fn spawn_all(
    world: &mut World,
    plan: &DungeonPlan,
    sight_radius: i32,
    tiebreak: TieBreak,
    rng: &mut RandomNumberGenerator,
) -> EntityId {
    let walls = plan.wall_set();
    let player_at = plan.random_floor(rng);
    let player = world.alloc_id();
    world.add(Box::new(Player::new(player, player_at, sight_radius)));
    info!(x = player_at.x, y = player_at.y, "player placed");

    for &cell in &plan.walls {
        let on_border = cell.x == 0
            || cell.y == 0
            || cell.x == plan.bounds.width - 1
            || cell.y == plan.bounds.height - 1;
        let id = world.alloc_id();
        if !on_border && rng.range(0, 100) < BREAKABLE_WALL_CHANCE {
            world.add(Box::new(BreakableWall::new(id, cell)));
        } else {
            world.add(Box::new(Wall::new(id, cell)));
        }
    }

    for &cell in &plan.enemy_spawns {
        if cell == player_at {
            continue;
        }
        let route = patrol_target(plan, cell, rng)
            .and_then(|goal| patrol_route(cell, goal, &walls, plan.bounds, tiebreak))
            .and_then(PatrolRoute::new);
        let intangible = rng.range(0, 3) == 0;
        let id = world.alloc_id();
        world.add(Box::new(Hostile::new(
            id,
            cell,
            MoodController::new(route),
            intangible,
        )));
    }
    info!(count = plan.enemy_spawns.len(), "enemies seeded");

    for &cell in &plan.powerup_spawns {
        if cell == player_at {
            continue;
        }
        let kind = BUFF_KINDS[rng.range(0, BUFF_KINDS.len() as i32) as usize];
        let id = world.alloc_id();
        world.add(Box::new(Potion::new(
            id,
            cell,
            BuffGrant {
                kind,
                duration: POTION_DURATION,
            },
        )));
    }

    player
}

/// A far-off floor cell for the patrol search to aim at; gives up after a
/// bounded number of draws and leaves the enemy without a route.
fn patrol_target(
    plan: &DungeonPlan,
    from: Point,
    rng: &mut RandomNumberGenerator,
) -> Option<Point> {
    for _ in 0..20 {
        let candidate = plan.random_floor(rng);
        if cell_distance(from, candidate) >= PATROL_MIN_RANGE {
            return Some(candidate);
        }
    }
    None
}

fn main() -> BError {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let context = BTermBuilder::simple(args.width, args.height)?
        .with_title("Emberrogue")
        .with_fps_cap(60.0)
        .build()?;
    let game = Game::new(&args);
    main_loop(context, game)
}
