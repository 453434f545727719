//! Game simulation modules

pub mod actor;
pub mod collision;
pub mod physics;
pub mod snapshot;
pub mod world;

pub use actor::{ActorId, ActorRegistry};
pub use collision::{CollisionWorld, FlatWorld};
pub use world::{World, WorldError, WorldHandle, WorldSettings};

use crate::net::protocol::ClientMsg;
use crate::player::PlayerName;

/// Client message queued for the world task
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub name: PlayerName,
    pub msg: ClientMsg,
    pub received_at: u64,
}
