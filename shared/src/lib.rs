//! Types and rules shared by the arena server and its clients.
//!
//! - [`geometry`]: angles, vectors, segment and polygon tests
//! - [`objects`]: players, weapons, projectiles and obstacles
//! - [`map`]: the static world and the obstacles near the viewport
//! - [`visibility`]: line-of-sight filtering for what a client may draw
//! - [`protocol`]: wire messages and length-prefixed framing

pub mod geometry;
pub mod map;
pub mod objects;
pub mod protocol;
pub mod visibility;

pub use geometry::Point;
pub use map::Map;
pub use objects::{GameObject, Obstacle, Player, Projectile, ShapeError, Weapon};
pub use protocol::{
    ClientMessage, JoinRequest, PlayerState, ProjectileState, ProtocolError, ServerMessage,
    StateDelta,
};
pub use visibility::VisibleArea;

/// RGB triple.
pub type Color = (u8, u8, u8);

pub const RED: Color = (255, 0, 0);
pub const GREEN: Color = (0, 255, 0);
pub const BLUE: Color = (0, 0, 255);
pub const YELLOW: Color = (255, 255, 0);

/// Player colors, indexed by in-game player id.
pub const PLAYERS_COLORS: [Color; 4] = [RED, GREEN, BLUE, YELLOW];

/// Hard cap on players per session.
pub const MAX_PLAYERS: u8 = 4;

pub const PLAYER_WIDTH: f32 = 25.0;
pub const PLAYER_HEIGHT: f32 = 35.0;
pub const PLAYER_SPEED: f32 = 1.0;
pub const PLAYER_ROTATION_SPEED: f32 = 5.0;

pub const BULLET_SPEED: f32 = 10.0;
pub const WEAPON_DAMAGE: f32 = 10.0;
/// Distance after which a projectile deactivates.
pub const PROJECTILE_RANGE: f32 = 200.0;
pub const PROJECTILE_SIZE: f32 = 3.0;

/// Where every newly joined player starts.
pub const SPAWN_POSITION: Point = (250.0, 250.0);

pub const DEFAULT_PORT: u16 = 5555;
