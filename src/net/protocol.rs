//! Message definitions exchanged with the transport layer
//! These are the wire types handed to whatever delivers state to clients

use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerControl, PlayerName};

/// Messages from a connected client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the world (after authentication, which happens elsewhere)
    Join {
        /// Transport-level peer id
        peer_id: u16,
    },

    /// Player input for the current tick
    Control { control: PlayerControl },

    /// Leave the world
    Leave,
}

/// Messages to connected clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// A player's observable state changed
    PlayerState { tick: u64, player: PlayerSnapshot },

    /// Player joined the world
    PlayerJoined { name: PlayerName },

    /// Player left the world
    PlayerLeft { name: PlayerName, reason: String },

    /// Error message, addressed to one peer when `peer_id` is set
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        peer_id: Option<u16>,
        code: String,
        message: String,
    },
}

impl ServerMsg {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Player state as observers see it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub name: PlayerName,
    pub position: [f32; 3],
    pub pitch: f32,
    pub yaw: f32,
    pub hp: u16,
    pub breath: u16,
}

impl PlayerSnapshot {
    pub fn of(player: &Player) -> Self {
        Self {
            name: player.name().clone(),
            position: player.position().to_array(),
            pitch: player.pitch(),
            yaw: player.yaw(),
            hp: player.hp(),
            breath: player.breath(),
        }
    }
}
