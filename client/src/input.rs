//! Decoded local input
//!
//! Raw keyboard and mouse capture happens outside this crate; what arrives
//! here is already a [`Command`].

use shared::Player;

/// Speed multiplier while the boost key is held.
pub const BOOST_FACTOR: f32 = 1.5;

/// Movement keys held during the current tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementInput {
    pub forward: bool,
    pub reverse: bool,
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub boost: bool,
}

impl MovementInput {
    pub fn is_idle(&self) -> bool {
        !(self.forward || self.reverse || self.rotate_left || self.rotate_right)
    }

    /// Resets the player's velocity, then accumulates this tick's movement.
    pub fn apply(&self, player: &mut Player) {
        let mut speed = player.speed;
        player.stop();
        if self.boost {
            speed *= BOOST_FACTOR;
        }
        if self.forward {
            player.forward(speed);
        }
        if self.reverse {
            player.reverse(speed);
        }
        if self.rotate_left {
            player.rotate(1);
        }
        if self.rotate_right {
            player.rotate(-1);
        }
    }
}

/// A local command. Coordinates are in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move(MovementInput),
    Stop,
    Aim { x: f32, y: f32 },
    Shoot { x: f32, y: f32 },
}
