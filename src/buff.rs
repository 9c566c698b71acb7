#![allow(dead_code)]

use tracing::debug;

use crate::entity::{Attributes, CapabilityOverride};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuffKind {
    /// Halves the movement cooldown period.
    Haste,
    /// Halves the projectile fire period.
    RapidFire,
    /// Extends sight radius.
    FarSight,
    /// Movement ignores occupancy; the checked move primitive is overridden.
    Phase,
    /// Restores one hit point per tick.
    Regen,
}

pub const BUFF_KINDS: [BuffKind; 5] = [
    BuffKind::Haste,
    BuffKind::RapidFire,
    BuffKind::FarSight,
    BuffKind::Phase,
    BuffKind::Regen,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BuffGrant {
    pub kind: BuffKind,
    pub duration: u32,
}

/// What a buff hook is allowed to touch on its owner.
pub struct BuffTarget<'a> {
    pub attrs: &'a mut Attributes,
    pub hp: &'a mut i32,
    pub max_hp: i32,
}

/// Prior value captured on apply so cleanup restores it exactly.
#[derive(Copy, Clone, Debug)]
enum Saved {
    MovePeriod(u32),
    FirePeriod(u32),
    SightRadius(i32),
    Nothing,
}

pub struct Buff {
    pub kind: BuffKind,
    pub remaining: u32,
    saved: Saved,
}

impl Buff {
    fn apply(grant: BuffGrant, target: &mut BuffTarget) -> Self {
        let saved = match grant.kind {
            BuffKind::Haste => {
                let prior = target.attrs.move_period;
                target.attrs.move_period = (prior / 2).max(1);
                Saved::MovePeriod(prior)
            }
            BuffKind::RapidFire => {
                let prior = target.attrs.fire_period;
                target.attrs.fire_period = (prior / 2).max(1);
                Saved::FirePeriod(prior)
            }
            BuffKind::FarSight => {
                let prior = target.attrs.sight_radius;
                target.attrs.sight_radius = prior + 4;
                Saved::SightRadius(prior)
            }
            BuffKind::Phase => {
                target.attrs.overrides.push(CapabilityOverride::PhaseMove);
                Saved::Nothing
            }
            BuffKind::Regen => Saved::Nothing,
        };
        Self {
            kind: grant.kind,
            remaining: grant.duration,
            saved,
        }
    }

    fn tick(&mut self, target: &mut BuffTarget) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.kind == BuffKind::Regen {
            *target.hp = (*target.hp + 1).min(target.max_hp);
        }
    }

    fn cleanup(&self, target: &mut BuffTarget) {
        match self.saved {
            Saved::MovePeriod(v) => target.attrs.move_period = v,
            Saved::FirePeriod(v) => target.attrs.fire_period = v,
            Saved::SightRadius(v) => target.attrs.sight_radius = v,
            Saved::Nothing => {}
        }
        if self.kind == BuffKind::Phase {
            if let Some(ix) = target
                .attrs
                .overrides
                .iter()
                .position(|o| *o == CapabilityOverride::PhaseMove)
            {
                target.attrs.overrides.remove(ix);
            }
        }
    }
}

/// Active buffs on one entity. At most one instance per kind: re-granting an
/// active kind extends its remaining duration instead of stacking.
#[derive(Default)]
pub struct BuffSet {
    active: Vec<Buff>,
}

impl BuffSet {
    pub fn grant(&mut self, grant: BuffGrant, target: &mut BuffTarget) {
        if let Some(existing) = self.active.iter_mut().find(|b| b.kind == grant.kind) {
            existing.remaining += grant.duration;
            debug!(kind = ?grant.kind, remaining = existing.remaining, "buff extended");
            return;
        }
        debug!(kind = ?grant.kind, duration = grant.duration, "buff applied");
        self.active.push(Buff::apply(grant, target));
    }

    /// Per-tick decrement and effects; expired buffs clean up and drop out
    /// only once their duration has reached exactly zero.
    pub fn tick(&mut self, target: &mut BuffTarget) {
        for buff in &mut self.active {
            buff.tick(target);
        }
        let mut kept = Vec::with_capacity(self.active.len());
        for buff in self.active.drain(..) {
            if buff.remaining == 0 {
                buff.cleanup(target);
            } else {
                kept.push(buff);
            }
        }
        self.active = kept;
    }

    pub fn remaining(&self, kind: BuffKind) -> Option<u32> {
        self.active
            .iter()
            .find(|b| b.kind == kind)
            .map(|b| b.remaining)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
