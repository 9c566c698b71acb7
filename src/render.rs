#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use bracket_geometry::prelude::Point;
use bracket_terminal::prelude::{BLACK, GREEN, MAGENTA, RED, RGB, WHITE, YELLOW};
use thiserror::Error;
use tracing::trace;

use crate::grid::Bounds;

/// Index into the registered color-pair palette.
pub type ColorIx = u8;

/// One cell-draw command for the terminal backend.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellDraw {
    pub pos: Point,
    pub glyph: char,
    pub color: ColorIx,
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("cell ({0}, {1}) is outside the drawable area")]
    OutOfGrid(i32, i32),
}

/// Seam to the terminal backend: consumes cell writes, flushes per frame.
pub trait Canvas {
    fn put(&mut self, pos: Point, glyph: char, color: ColorIx) -> Result<(), CanvasError>;
    fn flush(&mut self);
}

/// Registered (foreground, background) pairs, looked up by `ColorIx`.
/// Index 0 is preregistered as white on black.
pub struct Palette {
    pairs: Vec<(RGB, RGB)>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            pairs: vec![(RGB::named(WHITE), RGB::named(BLACK))],
        }
    }
}

impl Palette {
    pub fn register(&mut self, fg: RGB, bg: RGB) -> ColorIx {
        self.pairs.push((fg, bg));
        (self.pairs.len() - 1) as ColorIx
    }

    pub fn get(&self, ix: ColorIx) -> (RGB, RGB) {
        self.pairs
            .get(ix as usize)
            .copied()
            .unwrap_or((RGB::named(WHITE), RGB::named(BLACK)))
    }

    /// The pair table the simulation glyphs assume.
    pub fn classic() -> Self {
        let mut palette = Self::default();
        palette.register(RGB::named(BLACK), RGB::named(WHITE)); // 1: lit floor
        palette.register(RGB::named(GREEN), RGB::named(WHITE)); // 2: player
        palette.register(RGB::named(MAGENTA), RGB::named(WHITE)); // 3: walls
        palette.register(RGB::named(BLACK), RGB::named(BLACK)); // 4: unlit
        palette.register(RGB::named(YELLOW), RGB::named(RED)); // 5: projectile
        palette
    }
}

/// Per-frame state rule predicates may consult.
pub struct FrameCtx<'a> {
    pub visible: &'a HashSet<Point>,
}

type RulePred = Box<dyn Fn(Point, &FrameCtx) -> bool>;

struct Rule {
    id: &'static str,
    pred: RulePred,
    glyph: char,
    color: ColorIx,
}

/// Diff renderer. Cells drawn explicitly this tick are owned by their
/// drawer; everything else that was drawn last tick (plus caller-marked
/// dirty cells) is restored from the first matching background rule, or the
/// default glyph. Entities therefore disappear cleanly when they move or
/// die without any explicit erase call.
pub struct DrawController {
    bounds: Bounds,
    default_glyph: char,
    default_color: ColorIx,
    rules: Vec<Rule>,
    rule_assignments: HashMap<&'static str, Vec<Point>>,
    drawn: HashSet<Point>,
    to_restore: HashSet<Point>,
}

impl DrawController {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            default_glyph: ' ',
            default_color: 4,
            rules: Vec::new(),
            rule_assignments: HashMap::new(),
            drawn: HashSet::new(),
            to_restore: HashSet::new(),
        }
    }

    pub fn set_default(&mut self, glyph: char, color: ColorIx) {
        self.default_glyph = glyph;
        self.default_color = color;
    }

    /// Registers a background rule. Rule order is registration order and the
    /// first match wins. Without an `affected` set the whole grid is scanned
    /// once to seed the restore set; that scan is for setup, not per-tick use.
    pub fn add_rule(
        &mut self,
        id: &'static str,
        pred: RulePred,
        glyph: char,
        color: ColorIx,
        affected: Option<&[Point]>,
        frame: &FrameCtx,
    ) {
        debug_assert!(self.rules.iter().all(|r| r.id != id), "duplicate rule id");
        match affected {
            Some(cells) => self.to_restore.extend(cells.iter().copied()),
            None => {
                for y in 0..self.bounds.height {
                    for x in 0..self.bounds.width {
                        let p = Point::new(x, y);
                        if pred(p, frame) {
                            self.to_restore.insert(p);
                        }
                    }
                }
            }
        }
        self.rules.push(Rule {
            id,
            pred,
            glyph,
            color,
        });
    }

    /// Dropping a rule queues every cell it painted last frame for restore.
    pub fn remove_rule(&mut self, id: &str) {
        if let Some(ix) = self.rules.iter().position(|r| r.id == id) {
            self.rules.remove(ix);
            if let Some(cells) = self.rule_assignments.remove(id) {
                self.to_restore.extend(cells);
            }
        }
    }

    /// Marks cells whose background must be repainted next render, e.g.
    /// cells whose visibility flag flipped this tick.
    pub fn mark_dirty<I: IntoIterator<Item = Point>>(&mut self, cells: I) {
        self.to_restore.extend(cells);
    }

    /// Queues every cell; the next render repaints the whole screen.
    pub fn full_draw(&mut self) {
        for y in 0..self.bounds.height {
            for x in 0..self.bounds.width {
                self.to_restore.insert(Point::new(x, y));
            }
        }
    }

    /// Paints cells immediately and claims them for this tick. A backend
    /// failure on one cell is swallowed; a bad write must not abort the tick.
    pub fn draw(&mut self, cells: &[CellDraw], canvas: &mut dyn Canvas) {
        for cell in cells {
            if let Err(err) = canvas.put(cell.pos, cell.glyph, cell.color) {
                trace!(%err, "dropped cell write");
            }
            self.to_restore.remove(&cell.pos);
            self.drawn.insert(cell.pos);
        }
    }

    /// Repaints every unclaimed restorable cell from the rules or default,
    /// then rolls this tick's drawn set into the next restore set.
    pub fn render(&mut self, frame: &FrameCtx, canvas: &mut dyn Canvas) {
        self.rule_assignments.clear();
        for pix in &self.to_restore {
            let mut matched = false;
            for rule in &self.rules {
                if (rule.pred)(*pix, frame) {
                    if let Err(err) = canvas.put(*pix, rule.glyph, rule.color) {
                        trace!(%err, "dropped rule restore");
                    }
                    self.rule_assignments.entry(rule.id).or_default().push(*pix);
                    matched = true;
                    break;
                }
            }
            if !matched {
                if let Err(err) = canvas.put(*pix, self.default_glyph, self.default_color) {
                    trace!(%err, "dropped default restore");
                }
            }
        }
        self.to_restore = std::mem::take(&mut self.drawn);
        canvas.flush();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryCanvas;
    use super::*;

    fn empty_frame() -> HashSet<Point> {
        HashSet::new()
    }

    #[test]
    fn moved_entity_cell_is_restored_next_tick() {
        let mut dc = DrawController::new(Bounds::new(10, 10));
        let mut canvas = MemoryCanvas::default();
        let visible = empty_frame();
        let frame = FrameCtx { visible: &visible };

        let at = |x, y| CellDraw {
            pos: Point::new(x, y),
            glyph: '&',
            color: 2,
        };
        dc.draw(&[at(3, 3)], &mut canvas);
        dc.render(&frame, &mut canvas);
        assert_eq!(canvas.cells[&Point::new(3, 3)], ('&', 2));

        // Next tick the entity has moved; the old cell falls back to default.
        dc.draw(&[at(4, 3)], &mut canvas);
        dc.render(&frame, &mut canvas);
        assert_eq!(canvas.cells[&Point::new(3, 3)], (' ', 4));
        assert_eq!(canvas.cells[&Point::new(4, 3)], ('&', 2));
    }

    #[test]
    fn explicit_draw_is_never_stomped_by_rules_same_tick() {
        let mut dc = DrawController::new(Bounds::new(6, 6));
        let mut canvas = MemoryCanvas::default();
        let visible: HashSet<Point> = [Point::new(2, 2)].into_iter().collect();
        let frame = FrameCtx { visible: &visible };

        dc.add_rule(
            "vis",
            Box::new(|p, f: &FrameCtx| f.visible.contains(&p)),
            ' ',
            1,
            None,
            &frame,
        );
        dc.draw(
            &[CellDraw {
                pos: Point::new(2, 2),
                glyph: '&',
                color: 2,
            }],
            &mut canvas,
        );
        dc.render(&frame, &mut canvas);
        assert_eq!(canvas.cells[&Point::new(2, 2)], ('&', 2));
    }

    #[test]
    fn first_matching_rule_wins() {
        let mut dc = DrawController::new(Bounds::new(4, 4));
        let mut canvas = MemoryCanvas::default();
        let visible = empty_frame();
        let frame = FrameCtx { visible: &visible };

        dc.add_rule("everything", Box::new(|_, _| true), '.', 1, None, &frame);
        dc.add_rule("also", Box::new(|_, _| true), '#', 3, None, &frame);
        dc.render(&frame, &mut canvas);
        assert_eq!(canvas.cells[&Point::new(1, 1)], ('.', 1));
    }

    #[test]
    fn removing_a_rule_restores_its_cells() {
        let mut dc = DrawController::new(Bounds::new(4, 4));
        let mut canvas = MemoryCanvas::default();
        let visible = empty_frame();
        let frame = FrameCtx { visible: &visible };

        dc.add_rule("fill", Box::new(|_, _| true), '.', 1, None, &frame);
        dc.render(&frame, &mut canvas);
        assert_eq!(canvas.cells[&Point::new(2, 2)], ('.', 1));

        dc.remove_rule("fill");
        dc.render(&frame, &mut canvas);
        assert_eq!(canvas.cells[&Point::new(2, 2)], (' ', 4));
    }

    #[test]
    fn render_only_touches_dirty_cells() {
        let mut dc = DrawController::new(Bounds::new(8, 8));
        let mut canvas = MemoryCanvas::default();
        let visible = empty_frame();
        let frame = FrameCtx { visible: &visible };

        dc.full_draw();
        dc.render(&frame, &mut canvas);
        let after_full = canvas.writes;
        assert_eq!(after_full, 64);

        // Nothing drawn, nothing dirty: the next render writes nothing.
        dc.render(&frame, &mut canvas);
        assert_eq!(canvas.writes, after_full);
    }

    #[test]
    fn bad_cell_write_is_swallowed() {
        let mut dc = DrawController::new(Bounds::new(4, 4));
        let mut canvas = MemoryCanvas::default();
        dc.draw(
            &[CellDraw {
                pos: Point::new(-1, 0),
                glyph: 'X',
                color: 5,
            }],
            &mut canvas,
        );
        // The failed write still leaves the controller consistent.
        let visible = empty_frame();
        let frame = FrameCtx { visible: &visible };
        dc.render(&frame, &mut canvas);
    }
}
