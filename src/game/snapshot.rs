//! Change detection and state-update building for broadcasts

use glam::Vec3;

use crate::inventory::Inventory;
use crate::net::protocol::{PlayerSnapshot, ServerMsg};
use crate::player::kinematics::KinematicState;
use crate::player::Player;

/// How far a value may drift before it counts as changed.
///
/// Zero (the default) means exact comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SyncTolerance {
    /// World units
    pub position: f32,
    /// Degrees
    pub angle: f32,
}

impl SyncTolerance {
    fn angle_changed(&self, last: f32, current: f32) -> bool {
        if self.angle == 0.0 || !last.is_finite() || !current.is_finite() {
            exactly_differs(last, current)
        } else {
            (last - current).abs() > self.angle
        }
    }

    fn position_changed(&self, last: Vec3, current: Vec3) -> bool {
        if self.position == 0.0 || !last.is_finite() || !current.is_finite() {
            exactly_differs(last.x, current.x)
                || exactly_differs(last.y, current.y)
                || exactly_differs(last.z, current.z)
        } else {
            last.distance(current) > self.position
        }
    }
}

/// Plain `!=`, except that NaN is considered equal to NaN so a non-finite
/// value is reported once rather than on every check
fn exactly_differs(last: f32, current: f32) -> bool {
    last != current && !(last.is_nan() && current.is_nan())
}

/// Values as of the last broadcast
#[derive(Debug, Clone)]
struct DirtySnapshot {
    hp: u16,
    pitch: f32,
    yaw: f32,
    position: Vec3,
    inventory: Inventory,
}

/// Decides whether a player's state needs to be sent again
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    last: Option<DirtySnapshot>,
    tolerance: SyncTolerance,
}

impl DirtyTracker {
    pub fn new(tolerance: SyncTolerance) -> Self {
        Self {
            last: None,
            tolerance,
        }
    }

    pub fn tolerance(&self) -> SyncTolerance {
        self.tolerance
    }

    /// Compare against the last recorded snapshot and record the current
    /// values if anything changed.
    ///
    /// The very first call always reports a change. Calling this consumes
    /// the change, so a broadcaster must call it once per send opportunity.
    pub fn check_modified(&mut self, state: &KinematicState, inventory: &Inventory) -> bool {
        let changed = match &self.last {
            None => true,
            Some(last) => {
                last.hp != state.hp
                    || self.tolerance.angle_changed(last.pitch, state.pitch)
                    || self.tolerance.position_changed(last.position, state.position)
                    || self.tolerance.angle_changed(last.yaw, state.yaw)
                    || last.inventory != *inventory
            }
        };

        if changed {
            self.last = Some(DirtySnapshot {
                hp: state.hp,
                pitch: state.pitch,
                yaw: state.yaw,
                position: state.position,
                inventory: inventory.clone(),
            });
        }

        changed
    }
}

/// Paces state-update broadcasts and builds their messages
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to look for changes
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force a check on the next tick (used after joins)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Consult the player's dirty tracker and build an update if needed
    pub fn build(&self, tick: u64, player: &mut Player) -> Option<ServerMsg> {
        if !player.check_modified() {
            return None;
        }

        Some(ServerMsg::PlayerState {
            tick,
            player: PlayerSnapshot::of(player),
        })
    }
}
