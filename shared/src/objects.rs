//! Entity model shared by the client and the server.
//!
//! Everything here is plain state plus mutation rules; there is no I/O.
//! Network snapshots go through the records in [`crate::protocol`] instead
//! of serializing these types directly.

use crate::geometry::{
    calculate_angle, move_along_vector, point_in_polygon, polygon_edges, rotate_point, Point,
    Segment,
};
use crate::protocol::{PlayerState, ProjectileState};
use crate::{
    Color, BULLET_SPEED, PLAYERS_COLORS, PLAYER_HEIGHT, PLAYER_ROTATION_SPEED, PLAYER_SPEED,
    PLAYER_WIDTH, PROJECTILE_RANGE, PROJECTILE_SIZE, WEAPON_DAMAGE,
};
use log::debug;
use thiserror::Error;

/// Errors raised when building world shapes.
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("an obstacle needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
}

/// Position, facing and per-tick velocity of anything that moves.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObject {
    pub position: Point,
    /// Degrees, 0 is "up".
    pub angle: f32,
    pub change_x: f32,
    pub change_y: f32,
    /// Degrees turned per `rotate` call.
    pub rotation_speed: f32,
}

impl Default for GameObject {
    fn default() -> Self {
        Self {
            position: (0.0, 0.0),
            angle: 0.0,
            change_x: 0.0,
            change_y: 0.0,
            rotation_speed: 0.0,
        }
    }
}

impl GameObject {
    pub fn at(position: Point) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn radians(&self) -> f32 {
        self.angle.to_radians()
    }

    /// Adds `speed` along the current facing to the velocity. Calls within
    /// one tick accumulate.
    pub fn forward(&mut self, speed: f32) {
        let rad = self.radians();
        self.change_x += -rad.sin() * speed;
        self.change_y += rad.cos() * speed;
    }

    pub fn reverse(&mut self, speed: f32) {
        self.forward(-speed);
    }

    pub fn rotate(&mut self, direction: i8) {
        self.angle += self.rotation_speed * f32::from(direction);
    }

    pub fn stop(&mut self) {
        self.change_x = 0.0;
        self.change_y = 0.0;
    }

    pub fn is_moving(&self) -> bool {
        self.change_x != 0.0 || self.change_y != 0.0
    }

    /// Advances the position by the velocity, once.
    pub fn update(&mut self) {
        let (x, y) = self.position;
        self.position = (x + self.change_x, y + self.change_y);
    }
}

/// The gun a player carries. `start` follows the owner, `end` is the muzzle
/// and sits `10 + damage` units from `start` towards the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub name: String,
    pub bullet_speed: f32,
    pub damage: f32,
    pub start: Point,
    pub end: Point,
}

impl Weapon {
    pub fn new(owner_position: Point, name: &str, bullet_speed: f32, damage: f32) -> Self {
        Self {
            name: name.to_string(),
            bullet_speed,
            damage,
            start: owner_position,
            end: (owner_position.0, owner_position.1 + 10.0 + damage),
        }
    }

    fn barrel_length(&self) -> f32 {
        10.0 + self.damage
    }

    pub fn rotate_toward_cursor(&mut self, x: f32, y: f32) {
        self.end = move_along_vector(self.start, self.barrel_length(), (x, y));
    }

    /// Spawns a projectile at the muzzle, heading from `start` towards `(x, y)`.
    pub fn shoot(&self, shooter: &Player, x: f32, y: f32) -> Projectile {
        let angle = calculate_angle(self.start.0, self.start.1, x, y);
        Projectile::new(shooter, self.end, angle, self.bullet_speed, self.damage)
    }
}

/// A participant in a session.
///
/// `id` is the player's join index inside its game and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub object: GameObject,
    pub game_id: u32,
    pub id: u8,
    pub size: (f32, f32),
    pub color: Color,
    pub health: f32,
    pub active: bool,
    pub speed: f32,
    pub weapon: Weapon,
    /// Rotation applied since the last `stop`, used to tell whether the
    /// player is turning this tick.
    change_angle: f32,
    polygon: Vec<Point>,
}

impl Player {
    pub fn new(game_id: u32, id: u8, position: Point, active: bool) -> Self {
        let mut object = GameObject::at(position);
        object.rotation_speed = PLAYER_ROTATION_SPEED;

        let mut player = Self {
            object,
            game_id,
            id,
            size: (PLAYER_WIDTH, PLAYER_HEIGHT),
            color: PLAYERS_COLORS[usize::from(id) % PLAYERS_COLORS.len()],
            health: 100.0,
            active,
            speed: PLAYER_SPEED,
            weapon: Weapon::new(position, "gun", BULLET_SPEED, WEAPON_DAMAGE),
            change_angle: 0.0,
            polygon: Vec::new(),
        };
        player.update_polygon();
        player
    }

    /// Rebuilds a player from a network snapshot.
    pub fn from_state(state: &PlayerState) -> Self {
        let mut player = Self::new(state.game_id, state.id, state.position, state.active);
        player.object.angle = state.angle;
        player.object.change_x = state.change_x;
        player.object.change_y = state.change_y;
        player.health = state.health;
        player.color = state.color;
        player.weapon.end = state.aim;
        player.update_polygon();
        player
    }

    pub fn to_state(&self) -> PlayerState {
        PlayerState {
            game_id: self.game_id,
            id: self.id,
            position: self.object.position,
            angle: self.object.angle,
            change_x: self.object.change_x,
            change_y: self.object.change_y,
            health: self.health,
            active: self.active,
            color: self.color,
            aim: self.weapon.end,
        }
    }

    pub fn position(&self) -> Point {
        self.object.position
    }

    pub fn polygon(&self) -> &[Point] {
        &self.polygon
    }

    pub fn is_moving(&self) -> bool {
        self.object.is_moving()
    }

    pub fn is_rotating(&self) -> bool {
        self.change_angle != 0.0
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn forward(&mut self, speed: f32) {
        self.object.forward(speed);
    }

    pub fn reverse(&mut self, speed: f32) {
        self.object.reverse(speed);
    }

    pub fn rotate(&mut self, direction: i8) {
        self.object.rotate(direction);
        self.change_angle += self.object.rotation_speed * f32::from(direction);
    }

    pub fn stop(&mut self) {
        self.object.stop();
        self.change_angle = 0.0;
    }

    /// Moves the player one tick. Only the locally controlled player
    /// recomputes its hit polygon, and only while it moves or turns.
    pub fn update(&mut self, is_local_player: bool) {
        self.object.update();
        if is_local_player && (self.is_moving() || self.is_rotating()) {
            self.update_polygon();
        }
        self.weapon.start = self.object.position;
    }

    fn update_polygon(&mut self) {
        let center = self.object.position;
        let (cx, cy) = center;
        let (w, h) = (self.size.0 / 2.0, self.size.1 / 2.0);
        let angle = self.object.angle;
        self.polygon = [
            (cx - w, cy - h),
            (cx + w, cy - h),
            (cx + w, cy + h),
            (cx - w, cy + h),
        ]
        .iter()
        .map(|&corner| rotate_point(corner, center, angle))
        .collect();
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        point_in_polygon(x, y, &self.polygon)
    }

    pub fn aim_at_the_cursor_position(&mut self, x: f32, y: f32) {
        self.weapon.rotate_toward_cursor(x, y);
    }

    pub fn shoot(&self, x: f32, y: f32) -> Projectile {
        self.weapon.shoot(self, x, y)
    }

    /// Health is not clamped; anything at or below zero reads as dead.
    pub fn damage(&mut self, projectile: &Projectile) {
        self.health -= projectile.damage;
    }

    pub fn kill(&mut self) {
        self.health = 0.0;
    }
}

/// A shot in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub object: GameObject,
    /// Assigned by the server on registration; `None` for local shots that
    /// were not echoed back yet.
    pub unique_id: Option<u32>,
    pub player_id: u8,
    pub color: Color,
    pub size: f32,
    pub speed: f32,
    pub distance: f32,
    pub damage: f32,
    pub active: bool,
    /// Broadcast rounds this shot has been part of. Starts at 1 because the
    /// shooter already knows about it.
    pub known: u8,
}

impl Projectile {
    pub fn new(shooter: &Player, position: Point, angle: f32, speed: f32, damage: f32) -> Self {
        let mut object = GameObject::at(position);
        object.angle = angle;

        let mut projectile = Self {
            object,
            unique_id: None,
            player_id: shooter.id,
            color: shooter.color,
            size: PROJECTILE_SIZE,
            speed,
            distance: 0.0,
            damage,
            active: true,
            known: 1,
        };
        projectile.object.forward(speed);
        projectile
    }

    pub fn from_state(state: &ProjectileState) -> Self {
        let mut object = GameObject::at(state.position);
        object.angle = state.angle;
        object.change_x = state.change_x;
        object.change_y = state.change_y;

        Self {
            object,
            unique_id: state.unique_id,
            player_id: state.player_id,
            color: state.color,
            size: PROJECTILE_SIZE,
            speed: state.speed,
            distance: state.distance,
            damage: state.damage,
            active: state.active,
            known: state.known,
        }
    }

    pub fn to_state(&self) -> ProjectileState {
        ProjectileState {
            unique_id: self.unique_id,
            player_id: self.player_id,
            color: self.color,
            position: self.object.position,
            angle: self.object.angle,
            change_x: self.object.change_x,
            change_y: self.object.change_y,
            speed: self.speed,
            distance: self.distance,
            damage: self.damage,
            active: self.active,
            known: self.known,
        }
    }

    pub fn position(&self) -> Point {
        self.object.position
    }

    pub fn update(&mut self) {
        self.object.update();
        self.distance += self.speed;
        if self.distance >= PROJECTILE_RANGE {
            self.active = false;
        }
    }

    pub fn kill(&mut self) {
        self.active = false;
    }
}

/// A solid polygon in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    vertices: Vec<Point>,
    pub destructible: bool,
}

impl Obstacle {
    pub fn new(vertices: Vec<Point>, destructible: bool) -> Result<Self, ShapeError> {
        if vertices.len() < 3 {
            return Err(ShapeError::TooFewVertices(vertices.len()));
        }
        Ok(Self {
            vertices,
            destructible,
        })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        polygon_edges(&self.vertices)
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        point_in_polygon(x, y, &self.vertices)
    }

    pub fn damage(&self, x: f32, y: f32) {
        // TODO: carve the polygon around the impact point
        debug!("Obstacle was hit at: ({}, {})", x, y);
    }
}
