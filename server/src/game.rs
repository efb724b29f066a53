//! Authoritative state of one session.
//!
//! A `Game` is only ever touched through its `Mutex` in the session manager,
//! so every method here is a plain synchronous read-modify-write.

use log::{debug, info};
use shared::protocol::{PlayerState, ProjectileState, ServerMessage, StateDelta};
use shared::{Player, Projectile, MAX_PLAYERS, SPAWN_POSITION};
use std::net::SocketAddr;

/// One joined client and the player it controls.
///
/// Slots are never removed: the slot index is the player id, so a departed
/// member stays in place with `connected` cleared.
#[derive(Debug, Clone)]
pub struct Member {
    pub addr: SocketAddr,
    pub player: Player,
    pub connected: bool,
}

#[derive(Debug)]
pub struct Game {
    pub id: u32,
    pub name: Option<String>,
    pub max_players: u8,
    members: Vec<Member>,
    projectiles: Vec<Projectile>,
    projectiles_count: u32,
}

impl Game {
    /// `max_players` is clamped to `1..=MAX_PLAYERS`.
    pub fn new(id: u32, name: Option<String>, max_players: u8) -> Self {
        Self {
            id,
            name,
            max_players: max_players.clamp(1, MAX_PLAYERS),
            members: Vec::new(),
            projectiles: Vec::new(),
            projectiles_count: 0,
        }
    }

    /// A session is public iff it has no name.
    pub fn is_public(&self) -> bool {
        self.name.is_none()
    }

    pub fn can_player_join(&self) -> bool {
        self.members.len() < usize::from(self.max_players)
    }

    /// Appends a player at the next positional id. Returns `None` when the
    /// session is already at capacity.
    pub fn join_new_player(&mut self, addr: SocketAddr) -> Option<Player> {
        if !self.can_player_join() {
            return None;
        }

        let player_id = self.members.len() as u8;
        let player = Player::new(self.id, player_id, SPAWN_POSITION, true);
        info!(
            "Game {}: player {} joined from {}",
            self.id, player_id, addr
        );
        self.members.push(Member {
            addr,
            player: player.clone(),
            connected: true,
        });
        Some(player)
    }

    pub fn last_added_player(&self) -> Option<&Player> {
        self.members.last().map(|member| &member.player)
    }

    pub fn player(&self, player_id: u8) -> Option<&Player> {
        self.members
            .get(usize::from(player_id))
            .map(|member| &member.player)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Replaces the player stored in `player_id`'s slot, keeping the slot's
    /// address. Identity fields always come from the slot, never from the
    /// snapshot. Returns false for an unknown slot.
    pub fn update_player(&mut self, player_id: u8, state: &PlayerState) -> bool {
        let game_id = self.id;
        match self.members.get_mut(usize::from(player_id)) {
            Some(member) => {
                let mut player = Player::from_state(state);
                player.id = player_id;
                player.game_id = game_id;
                member.player = player;
                true
            }
            None => false,
        }
    }

    /// Registers a freshly fired shot under the next session-scoped id.
    ///
    /// Every call creates a new entry; callers send each shot once.
    pub fn update_projectiles(&mut self, shooter_id: u8, state: &ProjectileState) -> u32 {
        self.projectiles_count += 1;
        let unique_id = self.projectiles_count;

        let mut projectile = Projectile::from_state(state);
        projectile.unique_id = Some(unique_id);
        projectile.player_id = shooter_id;
        projectile.known = 1;
        self.projectiles.push(projectile);

        debug!(
            "Game {}: projectile {} registered for player {}",
            self.id, unique_id, shooter_id
        );
        unique_id
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Every slot except the caller's, departed players included.
    pub fn get_other_players(&self, player_id: u8) -> Vec<PlayerState> {
        self.members
            .iter()
            .filter(|member| member.player.id != player_id)
            .map(|member| member.player.to_state())
            .collect()
    }

    /// Broadcast-and-age pass over the live projectiles.
    ///
    /// A projectile is sent (and its `known` counter bumped) while the
    /// counter is below `max_players`; the first pass that finds it at the
    /// bound drops it instead.
    pub fn get_other_players_projectiles(&mut self) -> Vec<ProjectileState> {
        let bound = self.max_players;
        let mut sent = Vec::new();
        self.projectiles.retain_mut(|projectile| {
            if projectile.known < bound {
                projectile.known += 1;
                sent.push(projectile.to_state());
                true
            } else {
                false
            }
        });
        sent
    }

    pub fn get_other_players_and_projectiles(
        &mut self,
        player_id: u8,
    ) -> (Vec<PlayerState>, Vec<ProjectileState>) {
        (
            self.get_other_players(player_id),
            self.get_other_players_projectiles(),
        )
    }

    /// True when some member other than `player_id` is still connected.
    pub fn has_other_connected(&self, player_id: u8) -> bool {
        self.members
            .iter()
            .any(|member| member.connected && member.player.id != player_id)
    }

    /// The reply to a player update from `player_id`.
    ///
    /// Projectiles age on every update, even when the reply is the
    /// session-empty marker, so a lone member's shots still expire.
    pub fn delta_for(&mut self, player_id: u8) -> ServerMessage {
        let (players, projectiles) = self.get_other_players_and_projectiles(player_id);
        if !self.has_other_connected(player_id) {
            return ServerMessage::SessionEmpty;
        }
        ServerMessage::Delta(StateDelta {
            players,
            projectiles,
        })
    }

    /// Marks `player_id`'s slot as departed and kills its player, so peers
    /// drop it even when the client never sent its final dead state.
    /// Returns false if it was unknown or already gone.
    pub fn leave(&mut self, player_id: u8) -> bool {
        match self.members.get_mut(usize::from(player_id)) {
            Some(member) if member.connected => {
                member.connected = false;
                member.player.kill();
                info!("Game {}: player {} left", self.id, player_id);
                true
            }
            _ => false,
        }
    }

    pub fn connected_count(&self) -> usize {
        self.members.iter().filter(|member| member.connected).count()
    }

    /// No member is connected any more.
    pub fn is_empty(&self) -> bool {
        self.connected_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::{WireMessage, MAX_FRAME_SIZE};

    fn test_addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    fn shot_from(game: &Game, player_id: u8) -> ProjectileState {
        game.player(player_id).unwrap().shoot(400.0, 250.0).to_state()
    }

    #[test]
    fn test_game_creation() {
        let game = Game::new(3, None, 4);
        assert_eq!(game.id, 3);
        assert!(game.is_public());
        assert!(game.can_player_join());
        assert!(game.is_empty());
        assert!(game.last_added_player().is_none());

        let named = Game::new(4, Some("room".to_string()), 2);
        assert!(!named.is_public());
    }

    #[test]
    fn test_max_players_clamped() {
        assert_eq!(Game::new(0, None, 0).max_players, 1);
        assert_eq!(Game::new(0, None, 9).max_players, MAX_PLAYERS);
        assert_eq!(Game::new(0, None, 3).max_players, 3);
    }

    #[test]
    fn test_join_assigns_positional_ids() {
        let mut game = Game::new(7, None, 4);
        for expected in 0..4u8 {
            let player = game.join_new_player(test_addr(9000 + u16::from(expected))).unwrap();
            assert_eq!(player.id, expected);
            assert_eq!(player.game_id, 7);
            assert_eq!(player.health, 100.0);
            assert!(player.active);
            assert_eq!(player.position(), SPAWN_POSITION);
        }
        assert!(!game.can_player_join());
        assert!(game.join_new_player(test_addr(9100)).is_none());
        assert_eq!(game.members().len(), 4);
        assert_eq!(game.last_added_player().unwrap().id, 3);
    }

    #[test]
    fn test_colors_follow_ids() {
        let mut game = Game::new(0, None, 4);
        let first = game.join_new_player(test_addr(1)).unwrap();
        let second = game.join_new_player(test_addr(2)).unwrap();
        assert_eq!(first.color, shared::PLAYERS_COLORS[0]);
        assert_eq!(second.color, shared::PLAYERS_COLORS[1]);
    }

    #[test]
    fn test_update_player_keeps_address_and_identity() {
        let mut game = Game::new(5, None, 4);
        game.join_new_player(test_addr(1)).unwrap();
        game.join_new_player(test_addr(2)).unwrap();

        let mut state = game.player(1).unwrap().to_state();
        state.position = (10.0, 20.0);
        state.id = 0;
        state.game_id = 99;
        assert!(game.update_player(1, &state));

        let member = &game.members()[1];
        assert_eq!(member.addr, test_addr(2));
        assert_eq!(member.player.position(), (10.0, 20.0));
        assert_eq!(member.player.id, 1);
        assert_eq!(member.player.game_id, 5);
        assert_eq!(game.player(0).unwrap().position(), SPAWN_POSITION);

        assert!(!game.update_player(3, &state));
    }

    #[test]
    fn test_projectile_ids_are_monotonic() {
        let mut game = Game::new(0, None, 4);
        game.join_new_player(test_addr(1)).unwrap();
        let shot = shot_from(&game, 0);

        assert_eq!(game.update_projectiles(0, &shot), 1);
        assert_eq!(game.update_projectiles(0, &shot), 2);
        assert_eq!(game.projectile_count(), 2);
    }

    #[test]
    fn test_projectile_owner_comes_from_sender() {
        let mut game = Game::new(0, None, 4);
        game.join_new_player(test_addr(1)).unwrap();
        game.join_new_player(test_addr(2)).unwrap();

        let mut shot = shot_from(&game, 0);
        shot.player_id = 3;
        game.update_projectiles(1, &shot);

        let sent = game.get_other_players_projectiles();
        assert_eq!(sent[0].player_id, 1);
    }

    #[test]
    fn test_projectile_survives_three_rounds_with_four_players() {
        let mut game = Game::new(0, None, 4);
        game.join_new_player(test_addr(1)).unwrap();
        let shot = shot_from(&game, 0);
        game.update_projectiles(0, &shot);

        for round in 0..3u8 {
            let sent = game.get_other_players_projectiles();
            assert_eq!(sent.len(), 1, "round {}", round);
            assert_eq!(sent[0].known, round + 2);
        }
        assert!(game.get_other_players_projectiles().is_empty());
        assert_eq!(game.projectile_count(), 0);
    }

    #[test]
    fn test_projectile_ttl_follows_max_players() {
        let mut game = Game::new(0, None, 2);
        game.join_new_player(test_addr(1)).unwrap();
        let shot = shot_from(&game, 0);
        game.update_projectiles(0, &shot);

        assert_eq!(game.get_other_players_projectiles().len(), 1);
        assert!(game.get_other_players_projectiles().is_empty());
    }

    #[test]
    fn test_other_players_excludes_caller() {
        let mut game = Game::new(0, None, 4);
        for port in 1..=3 {
            game.join_new_player(test_addr(port)).unwrap();
        }
        let ids: Vec<u8> = game.get_other_players(1).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_delta_for_lone_member_is_session_empty() {
        let mut game = Game::new(0, None, 4);
        game.join_new_player(test_addr(1)).unwrap();
        assert_eq!(game.delta_for(0), ServerMessage::SessionEmpty);

        game.join_new_player(test_addr(2)).unwrap();
        match game.delta_for(0) {
            ServerMessage::Delta(delta) => {
                assert_eq!(delta.players.len(), 1);
                assert_eq!(delta.players[0].id, 1);
            }
            other => panic!("unexpected reply {:?}", other),
        }

        game.leave(1);
        assert_eq!(game.delta_for(0), ServerMessage::SessionEmpty);
    }

    #[test]
    fn test_lone_member_shots_expire() {
        let mut game = Game::new(0, None, 4);
        game.join_new_player(test_addr(1)).unwrap();
        let shot = shot_from(&game, 0);

        for _ in 0..1600 {
            game.update_projectiles(0, &shot);
            assert_eq!(game.delta_for(0), ServerMessage::SessionEmpty);
        }
        // Only the last three shots are still inside their broadcast window.
        assert_eq!(game.projectile_count(), 3);

        game.join_new_player(test_addr(2)).unwrap();
        match game.delta_for(1) {
            ServerMessage::Delta(delta) => {
                assert!(delta.projectiles.len() <= 3);
                let encoded = ServerMessage::Delta(delta).encode().unwrap();
                assert!(encoded.len() < MAX_FRAME_SIZE);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_departed_member_is_reported_dead() {
        let mut game = Game::new(0, None, 4);
        game.join_new_player(test_addr(1)).unwrap();
        game.join_new_player(test_addr(2)).unwrap();
        game.join_new_player(test_addr(3)).unwrap();

        assert!(game.leave(1));
        match game.delta_for(0) {
            ServerMessage::Delta(delta) => {
                let departed = delta.players.iter().find(|p| p.id == 1).unwrap();
                assert!(departed.health <= 0.0);
                let present = delta.players.iter().find(|p| p.id == 2).unwrap();
                assert_eq!(present.health, 100.0);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_leave_keeps_slot_and_ids() {
        let mut game = Game::new(0, None, 2);
        game.join_new_player(test_addr(1)).unwrap();
        game.join_new_player(test_addr(2)).unwrap();

        assert!(game.leave(0));
        assert!(!game.leave(0));
        assert!(!game.leave(5));
        assert_eq!(game.connected_count(), 1);
        assert!(!game.is_empty());

        // The departed slot still counts towards capacity.
        assert!(!game.can_player_join());
        assert_eq!(game.player(1).unwrap().id, 1);

        assert!(game.leave(1));
        assert!(game.is_empty());
    }
}
