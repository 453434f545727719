//! World-owned registry of in-world actors embodying players
//!
//! Players refer to their actor by id only; the registry owns the actor
//! records and outlives any single player.

use std::fmt;

use dashmap::DashMap;
use glam::Vec3;
use uuid::Uuid;

use crate::player::PlayerName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An actor as the world sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ActorRecord {
    pub player: PlayerName,
    pub base_position: Vec3,
}

/// Registry of all live actors
pub struct ActorRegistry {
    actors: DashMap<ActorId, ActorRecord>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self {
            actors: DashMap::new(),
        }
    }

    pub fn spawn(&self, player: PlayerName, base_position: Vec3) -> ActorId {
        let id = ActorId::new();
        self.actors.insert(
            id,
            ActorRecord {
                player,
                base_position,
            },
        );
        id
    }

    pub fn get(&self, id: ActorId) -> Option<ActorRecord> {
        self.actors.get(&id).map(|a| a.value().clone())
    }

    pub fn base_position(&self, id: ActorId) -> Option<Vec3> {
        self.actors.get(&id).map(|a| a.base_position)
    }

    /// Returns false if the actor no longer exists
    pub fn set_base_position(&self, id: ActorId, position: Vec3) -> bool {
        match self.actors.get_mut(&id) {
            Some(mut actor) => {
                actor.base_position = position;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: ActorId) -> Option<ActorRecord> {
        self.actors.remove(&id).map(|(_, a)| a)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let registry = ActorRegistry::new();
        let name = PlayerName::new("alice").unwrap();
        let id = registry.spawn(name.clone(), Vec3::ZERO);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).unwrap().player, name);

        assert!(registry.set_base_position(id, Vec3::X));
        assert_eq!(registry.base_position(id), Some(Vec3::X));

        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        assert!(!registry.set_base_position(id, Vec3::Y));
        assert_eq!(registry.base_position(id), None);
    }
}
