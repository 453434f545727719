//! Per-tick player input

use serde::{Deserialize, Serialize};

/// Input state for a single tick
///
/// Built fresh every tick by whatever feeds input into the world and read
/// only by the movement code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerControl {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    /// Auxiliary key ("turbo" / descend, depending on context)
    pub aux1: bool,
    pub sneak: bool,
    /// Primary action (dig / punch)
    pub lmb: bool,
    /// Secondary action (place / use)
    pub rmb: bool,
    /// Look pitch in degrees
    pub pitch: f32,
    /// Look yaw in degrees
    pub yaw: f32,
}

impl PlayerControl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        up: bool,
        down: bool,
        left: bool,
        right: bool,
        jump: bool,
        aux1: bool,
        sneak: bool,
        lmb: bool,
        rmb: bool,
        pitch: f32,
        yaw: f32,
    ) -> Self {
        Self {
            up,
            down,
            left,
            right,
            jump,
            aux1,
            sneak,
            lmb,
            rmb,
            pitch,
            yaw,
        }
    }

    /// Pack the buttons into the key bitmask scripts see.
    ///
    /// Bit order: up, down, left, right, jump, aux1, sneak, LMB, RMB.
    pub fn key_bits(&self) -> u32 {
        [
            self.up,
            self.down,
            self.left,
            self.right,
            self.jump,
            self.aux1,
            self.sneak,
            self.lmb,
            self.rmb,
        ]
        .iter()
        .enumerate()
        .fold(0, |bits, (i, pressed)| bits | (u32::from(*pressed) << i))
    }

    /// True if any movement key is held
    pub fn wants_horizontal_move(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        let control = PlayerControl::default();
        assert_eq!(control.key_bits(), 0);
        assert_eq!(control.pitch, 0.0);
        assert_eq!(control.yaw, 0.0);
        assert!(!control.wants_horizontal_move());
    }

    #[test]
    fn key_bits_follow_button_order() {
        let control = PlayerControl {
            up: true,
            jump: true,
            rmb: true,
            ..Default::default()
        };
        assert_eq!(control.key_bits(), 0b1_0001_0001);

        let all = PlayerControl::new(true, true, true, true, true, true, true, true, true, 0.0, 0.0);
        assert_eq!(all.key_bits(), 0x1ff);
    }
}
