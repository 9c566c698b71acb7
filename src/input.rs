use std::collections::HashMap;

use bracket_terminal::prelude::VirtualKeyCode;

use crate::entity::{Action, EntityId};
use crate::grid::Direction;

/// Key-binding registry: each key code maps to the (entity, action) pairs
/// registered for it. Bindings are pruned when their entity is removed.
#[derive(Default)]
pub struct KeyMap {
    bindings: HashMap<VirtualKeyCode, Vec<(EntityId, Action)>>,
}

impl KeyMap {
    pub fn register(&mut self, key: VirtualKeyCode, id: EntityId, action: Action) {
        self.bindings.entry(key).or_default().push((id, action));
    }

    pub fn deregister(&mut self, id: EntityId) {
        for handlers in self.bindings.values_mut() {
            handlers.retain(|(owner, _)| *owner != id);
        }
    }

    pub fn actions(&self, key: VirtualKeyCode) -> Vec<(EntityId, Action)> {
        self.bindings.get(&key).cloned().unwrap_or_default()
    }

    /// The fixed movement-and-fire layout for a player entity: arrows plus
    /// WASD, space to fire.
    pub fn bind_player(&mut self, id: EntityId) {
        let moves = [
            (VirtualKeyCode::Up, Direction::Up),
            (VirtualKeyCode::W, Direction::Up),
            (VirtualKeyCode::Right, Direction::Right),
            (VirtualKeyCode::D, Direction::Right),
            (VirtualKeyCode::Down, Direction::Down),
            (VirtualKeyCode::S, Direction::Down),
            (VirtualKeyCode::Left, Direction::Left),
            (VirtualKeyCode::A, Direction::Left),
        ];
        for (key, dir) in moves {
            self.register(key, id, Action::Move(dir));
        }
        self.register(VirtualKeyCode::Space, id, Action::Fire);
    }
}
