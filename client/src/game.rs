//! Client-side view of one session
//!
//! Holds the local player, the placeholders and snapshots of its peers, the
//! projectiles in flight and the map. The driver calls [`ClientGameState::tick`]
//! once per frame, shares the local player with the server when
//! [`ClientGameState::should_share`] says so, and feeds the reply back through
//! [`ClientGameState::apply_delta`].

use crate::input::{Command, MovementInput};
use log::debug;
use shared::geometry::Point;
use shared::protocol::StateDelta;
use shared::{Map, Player, Projectile, VisibleArea, MAX_PLAYERS, SPAWN_POSITION};
use std::collections::{BTreeMap, HashMap};

pub const SCREEN_WIDTH: f32 = 500.0;
pub const SCREEN_HEIGHT: f32 = 500.0;

/// The screen rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            bottom: 0.0,
            width,
            height,
        }
    }

    pub fn center_on(&mut self, x: f32, y: f32) {
        self.left = x - self.width / 2.0;
        self.bottom = y - self.height / 2.0;
    }

    /// Corners, counter-clockwise from bottom left.
    pub fn rect(&self) -> Vec<Point> {
        let (x, y, w, h) = (self.left, self.bottom, self.width, self.height);
        vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
    }

    /// Converts a screen position to world coordinates.
    pub fn to_world(&self, x: f32, y: f32) -> Point {
        (self.left + x, self.bottom + y)
    }
}

pub struct ClientGameState {
    local: Player,
    /// Every other slot of the session, keyed by player id.
    peers: BTreeMap<u8, Player>,
    /// Shots registered by the server, keyed by their unique id.
    projectiles: HashMap<u32, Projectile>,
    /// Own shots, never echoed back into `projectiles`.
    local_shots: Vec<Projectile>,
    map: Map,
    visible_area: VisibleArea,
    viewport: Viewport,
    mouse_position: Point,
    input: MovementInput,
}

impl ClientGameState {
    pub fn new(local: Player) -> Self {
        Self::with_map(local, Map::default())
    }

    /// Builds the view around the freshly joined local player. Peers start
    /// as placeholders at the spawn point; a placeholder is active when its
    /// id is not above the local id.
    pub fn with_map(local: Player, map: Map) -> Self {
        let peers = (0..MAX_PLAYERS)
            .filter(|&id| id != local.id)
            .map(|id| {
                let active = id <= local.id;
                (id, Player::new(local.game_id, id, SPAWN_POSITION, active))
            })
            .collect();

        let mut state = Self {
            local,
            peers,
            projectiles: HashMap::new(),
            local_shots: Vec::new(),
            map,
            visible_area: VisibleArea::new(),
            viewport: Viewport::default(),
            mouse_position: (0.0, 0.0),
            input: MovementInput::default(),
        };
        state.update_visible_area();
        state
    }

    pub fn local_player(&self) -> &Player {
        &self.local
    }

    pub fn local_player_mut(&mut self) -> &mut Player {
        &mut self.local
    }

    pub fn peers(&self) -> impl Iterator<Item = &Player> + '_ {
        self.peers.values()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    /// True once every player of the session has become active.
    pub fn all_players_in_game(&self) -> bool {
        self.local.active && self.peers.values().all(|p| p.active)
    }

    pub fn players_left(&self) -> usize {
        let peers = self.peers.values().filter(|p| p.is_alive()).count();
        peers + usize::from(self.local.is_alive())
    }

    pub fn status_text(&self) -> String {
        format!(
            "Health: {}, players left: {}",
            self.local.health,
            self.players_left()
        )
    }

    /// Applies a local command. A shot is returned so the caller can report
    /// it to the server.
    pub fn apply_command(&mut self, command: Command) -> Option<Projectile> {
        match command {
            Command::Move(input) => {
                self.input = input;
                None
            }
            Command::Stop => {
                self.input = MovementInput::default();
                self.local.stop();
                None
            }
            Command::Aim { x, y } => {
                self.mouse_position = self.viewport.to_world(x, y);
                None
            }
            Command::Shoot { x, y } => {
                if !self.local.is_alive() {
                    return None;
                }
                let (wx, wy) = self.viewport.to_world(x, y);
                let projectile = self.local.shoot(wx, wy);
                self.local_shots.push(projectile.clone());
                Some(projectile)
            }
        }
    }

    /// One frame of client simulation, in the order: visibility refresh when
    /// moving, entity updates and aiming once everyone is in, then input.
    pub fn tick(&mut self) {
        if self.local.is_moving() {
            self.update_visible_area();
        }
        if self.all_players_in_game() {
            self.update_players();
            self.update_projectiles();
            let (x, y) = self.mouse_position;
            self.local.aim_at_the_cursor_position(x, y);
        }
        if self.local.active {
            self.process_input();
        }
    }

    /// Whether the local player should be pushed to the server this tick.
    pub fn should_share(&self) -> bool {
        self.local.active
    }

    fn process_input(&mut self) {
        if self.local.is_alive() {
            self.input.apply(&mut self.local);
        }
    }

    fn update_players(&mut self) {
        self.local.update(true);
        self.peers.retain(|_, peer| peer.is_alive());
        for peer in self.peers.values_mut() {
            peer.update(false);
        }
    }

    fn update_projectiles(&mut self) {
        let Self {
            local,
            peers,
            projectiles,
            local_shots,
            map,
            ..
        } = self;

        projectiles.retain(|_, projectile| projectile.active);
        local_shots.retain(|projectile| projectile.active);

        for projectile in projectiles.values_mut().chain(local_shots.iter_mut()) {
            projectile.update();
            check_for_collisions(projectile, map, local, peers);
        }
    }

    /// Recentres the viewport on the local player and refreshes what it can
    /// see.
    pub fn update_visible_area(&mut self) {
        let (x, y) = self.local.position();
        self.viewport.center_on(x, y);
        let rect = self.viewport.rect();
        self.map.update_visible_map_area(&rect);
        self.visible_area
            .update((x, y), &rect, self.map.visible_obstacles());
    }

    /// Merges the server's reply.
    ///
    /// Peers are replaced by id. Registered projectiles are added by unique
    /// id and never overwrite the locally simulated copy; the local player's
    /// own shots are skipped since they are already simulated locally.
    pub fn apply_delta(&mut self, delta: Option<StateDelta>) {
        let Some(delta) = delta else {
            return;
        };

        for state in &delta.players {
            if state.id == self.local.id {
                continue;
            }
            self.peers.insert(state.id, Player::from_state(state));
        }

        for state in &delta.projectiles {
            if state.player_id == self.local.id {
                continue;
            }
            match state.unique_id {
                Some(unique_id) => {
                    self.projectiles
                        .entry(unique_id)
                        .or_insert_with(|| Projectile::from_state(state));
                }
                None => debug!("Dropping unnumbered projectile from player {}", state.player_id),
            }
        }
    }

    pub fn is_visible(&self, player: &Player) -> bool {
        player.id == self.local.id || self.visible_area.contains(player.position())
    }

    /// Alive players that should be drawn, the local one first.
    pub fn visible_players(&self) -> impl Iterator<Item = &Player> + '_ {
        std::iter::once(&self.local)
            .chain(self.peers.values())
            .filter(move |p| p.is_alive() && self.is_visible(p))
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> + '_ {
        self.projectiles.values().chain(self.local_shots.iter())
    }
}

/// Obstacles stop a shot. Players stop it too, but only the local player
/// takes damage; peers' health comes from the server.
fn check_for_collisions(
    projectile: &mut Projectile,
    map: &Map,
    local: &mut Player,
    peers: &BTreeMap<u8, Player>,
) {
    let (x, y) = projectile.position();

    for obstacle in map.visible_obstacles() {
        if obstacle.contains_point(x, y) {
            if obstacle.destructible {
                obstacle.damage(x, y);
            }
            projectile.kill();
        }
    }

    if local.is_alive() && local.contains_point(x, y) {
        projectile.kill();
        local.damage(projectile);
    }
    for peer in peers.values() {
        if peer.is_alive() && peer.contains_point(x, y) {
            projectile.kill();
        }
    }
}
