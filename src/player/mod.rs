//! The player entity: identity, physical state, input, inventory

pub mod codec;
pub mod control;
pub mod kinematics;
pub mod name;

pub use codec::PlayerDataError;
pub use control::PlayerControl;
pub use kinematics::{
    EnvironmentFlags, KinematicState, MovementSettings, PhysicsOverride, BS, PLAYER_MAX_BREATH,
    PLAYER_MAX_HP,
};
pub use name::{PlayerName, PlayerNameError};

use glam::Vec3;
use tracing::warn;

use crate::game::actor::{ActorId, ActorRegistry};
use crate::game::collision::{CollisionWorld, MoveRequest};
use crate::game::physics::MovementIntegrator;
use crate::game::snapshot::{DirtyTracker, SyncTolerance};
use crate::inventory::Inventory;

/// Peer id of a player with no network connection
pub const PEER_ID_INEXISTENT: u16 = 0;

/// Which side of the connection owns this player object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerVariant {
    /// The player controlled by this process (client side)
    Local,
    /// A connected player on the server, optionally embodied by an actor
    Remote { actor: Option<ActorId> },
}

#[derive(Debug, Clone)]
pub struct Player {
    name: PlayerName,
    variant: PlayerVariant,
    pub state: KinematicState,
    pub control: PlayerControl,
    pub inventory: Inventory,
    pub peer_id: u16,
    dirty: DirtyTracker,
}

impl Player {
    pub fn new(name: PlayerName, variant: PlayerVariant, movement: MovementSettings) -> Self {
        Self {
            name,
            variant,
            state: KinematicState::new(movement),
            control: PlayerControl::default(),
            inventory: Inventory::new_player(),
            peer_id: PEER_ID_INEXISTENT,
            dirty: DirtyTracker::new(SyncTolerance::default()),
        }
    }

    /// Server-side player without an actor yet
    pub fn new_remote(name: PlayerName, movement: MovementSettings) -> Self {
        Self::new(name, PlayerVariant::Remote { actor: None }, movement)
    }

    pub fn with_sync_tolerance(mut self, tolerance: SyncTolerance) -> Self {
        self.dirty = DirtyTracker::new(tolerance);
        self
    }

    pub fn name(&self) -> &PlayerName {
        &self.name
    }

    pub fn variant(&self) -> PlayerVariant {
        self.variant
    }

    pub fn is_local(&self) -> bool {
        matches!(self.variant, PlayerVariant::Local)
    }

    pub fn actor_id(&self) -> Option<ActorId> {
        match self.variant {
            PlayerVariant::Local => None,
            PlayerVariant::Remote { actor } => actor,
        }
    }

    /// Associate (or dissociate) the in-world actor. Local players never
    /// have one.
    pub fn set_actor(&mut self, id: Option<ActorId>) {
        match &mut self.variant {
            PlayerVariant::Remote { actor } => *actor = id,
            PlayerVariant::Local => {
                warn!(player = %self.name, "Ignoring actor assignment on local player");
            }
        }
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    /// Store a new position and mirror it onto the associated actor, if any
    pub fn set_position(&mut self, position: Vec3, actors: &ActorRegistry) {
        self.place(position);
        self.sync_actor(actors);
    }

    /// Position write for players not yet attached to a world
    pub(crate) fn place(&mut self, position: Vec3) {
        self.state.position = position;
    }

    /// Push the current position to the associated actor
    pub fn sync_actor(&self, actors: &ActorRegistry) {
        if let Some(id) = self.actor_id() {
            actors.set_base_position(id, self.state.position);
        }
    }

    pub fn velocity(&self) -> Vec3 {
        self.state.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.state.velocity = velocity;
    }

    pub fn pitch(&self) -> f32 {
        self.state.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.state.pitch = pitch;
    }

    pub fn yaw(&self) -> f32 {
        self.state.yaw
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.state.yaw = yaw;
    }

    pub fn hp(&self) -> u16 {
        self.state.hp
    }

    pub fn set_hp(&mut self, hp: u16) {
        self.state.hp = hp.min(PLAYER_MAX_HP);
    }

    pub fn breath(&self) -> u16 {
        self.state.breath
    }

    pub fn set_breath(&mut self, breath: u16) {
        self.state.breath = breath.min(PLAYER_MAX_BREATH);
    }

    pub fn eye_offset(&self) -> Vec3 {
        self.state.eye_offset()
    }

    pub fn eye_position(&self) -> Vec3 {
        self.state.eye_position()
    }

    pub fn accelerate_horizontal(&mut self, target: Vec3, max_increase: f32) {
        MovementIntegrator::accelerate_horizontal(&mut self.state.velocity, target, max_increase);
    }

    pub fn accelerate_vertical(&mut self, target_y: f32, max_increase: f32) {
        MovementIntegrator::accelerate_vertical(&mut self.state.velocity, target_y, max_increase);
    }

    /// Advance position and velocity through the world by one step and take
    /// over the environment flags the world reports.
    pub fn move_step<W: CollisionWorld + ?Sized>(&mut self, dtime: f32, world: &W, pos_max_d: f32) {
        let outcome = world.advance(&MoveRequest {
            position: self.state.position,
            velocity: self.state.velocity,
            dtime,
            pos_max_d,
            collision_box: self.state.collision_box,
        });

        self.state.position = outcome.position;
        self.state.velocity = outcome.velocity;
        self.state.env = EnvironmentFlags {
            swimming_vertical: self.state.env.swimming_vertical,
            ..outcome.env
        };
    }

    /// True if hp, pitch, yaw, position or inventory changed since the last
    /// call that returned true. Each `true` consumes the change.
    pub fn check_modified(&mut self) -> bool {
        self.dirty.check_modified(&self.state, &self.inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str) -> Player {
        Player::new_remote(PlayerName::new(name).unwrap(), MovementSettings::default())
    }

    #[test]
    fn new_player_defaults() {
        let player = remote("alice");
        assert_eq!(player.name().as_str(), "alice");
        assert_eq!(player.hp(), PLAYER_MAX_HP);
        assert_eq!(player.breath(), PLAYER_MAX_BREATH);
        assert_eq!(player.position(), Vec3::ZERO);
        assert_eq!(player.peer_id, PEER_ID_INEXISTENT);
        assert!(!player.is_local());
        assert_eq!(player.actor_id(), None);
        assert!(player.inventory.list("main").is_some());
    }

    #[test]
    fn hp_and_breath_are_clamped() {
        let mut player = remote("bob");
        player.set_hp(500);
        player.set_breath(500);
        assert_eq!(player.hp(), PLAYER_MAX_HP);
        assert_eq!(player.breath(), PLAYER_MAX_BREATH);
        player.set_hp(3);
        assert_eq!(player.hp(), 3);
    }

    #[test]
    fn local_player_has_no_actor() {
        let mut player = Player::new(
            PlayerName::new("me").unwrap(),
            PlayerVariant::Local,
            MovementSettings::default(),
        );
        player.set_actor(Some(ActorId::new()));
        assert!(player.is_local());
        assert_eq!(player.actor_id(), None);
    }

    #[test]
    fn synced_position_reaches_actor() {
        let actors = ActorRegistry::new();
        let mut player = remote("carol");
        let id = actors.spawn(player.name().clone(), Vec3::ZERO);
        player.set_actor(Some(id));

        let target = Vec3::new(10.0, 20.0, 30.0);
        player.set_position(target, &actors);
        assert_eq!(player.position(), target);
        assert_eq!(actors.base_position(id), Some(target));

        player.set_position(Vec3::ONE, &actors);
        assert_eq!(actors.base_position(id), Some(Vec3::ONE));
    }

    #[test]
    fn position_without_actor_is_just_stored() {
        let actors = ActorRegistry::new();
        let mut player = remote("gina");
        player.set_position(Vec3::ONE, &actors);
        assert_eq!(player.position(), Vec3::ONE);
        assert!(actors.is_empty());
    }

    #[test]
    fn check_modified_is_edge_triggered() {
        let mut player = remote("dave");
        assert!(player.check_modified());
        assert!(!player.check_modified());

        player.set_yaw(45.0);
        assert!(player.check_modified());
        assert!(!player.check_modified());

        player.set_hp(10);
        assert!(player.check_modified());
        assert!(!player.check_modified());
    }

    #[test]
    fn velocity_and_breath_do_not_mark_dirty() {
        let mut player = remote("erin");
        player.check_modified();
        player.set_velocity(Vec3::new(1.0, 2.0, 3.0));
        player.set_breath(2);
        assert!(!player.check_modified());
    }

    #[test]
    fn accelerate_wrappers_touch_velocity() {
        let mut player = remote("frank");
        player.accelerate_horizontal(Vec3::new(4.0, 100.0, 3.0), 10.0);
        assert_eq!(player.velocity(), Vec3::new(4.0, 0.0, 3.0));
        player.accelerate_vertical(-7.0, 2.0);
        assert_eq!(player.velocity(), Vec3::new(4.0, -2.0, 3.0));
    }
}
