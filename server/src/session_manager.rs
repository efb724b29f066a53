//! Session bookkeeping for the arena server
//!
//! This module owns the collection of running sessions and decides where a
//! joining client lands:
//! - Named requests join the private session with that name, or create it
//! - Unnamed requests join the first public session with a free slot, or
//!   create a new public one
//! - A session is dropped from the collection once none of its members is
//!   connected
//!
//! The manager itself sits behind an `RwLock` in the network layer and each
//! session behind its own `Mutex`. Joins and leaves take the manager's write
//! lock first and a session lock second; per-request traffic only ever takes
//! the session lock.

use crate::game::Game;
use log::info;
use shared::protocol::JoinRequest;
use shared::Player;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// A session shared between all connection tasks of its members.
pub type SharedGame = Arc<Mutex<Game>>;

#[derive(Debug, Error, PartialEq)]
pub enum JoinError {
    #[error("session '{name}' is full ({max_players} players)")]
    SessionFull { name: String, max_players: u8 },
}

/// Result of a successful join.
#[derive(Debug)]
pub struct Joined {
    pub game: SharedGame,
    pub game_id: u32,
    pub player: Player,
}

/// Registry entry for one session
///
/// The name is copied out of the `Game` so lookups by name never need the
/// session lock.
#[derive(Debug)]
struct Session {
    id: u32,
    name: Option<String>,
    game: SharedGame,
}

/// Owns every running session
///
/// The manager is the only writer to the session collection. Sessions are
/// scanned linearly, first fit, in creation order.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Vec<Session>,
    next_game_id: u32,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the session a request should join, creating one if needed
    ///
    /// Private lookups match on name only and may return a full session;
    /// the caller turns that into a rejection. Public lookups only return a
    /// session with a free slot.
    async fn get_game_instance(&mut self, game_name: Option<&str>, max_players: u8) -> SharedGame {
        match game_name {
            Some(name) => {
                let existing = self
                    .sessions
                    .iter()
                    .find(|session| session.name.as_deref() == Some(name))
                    .map(|session| Arc::clone(&session.game));
                match existing {
                    Some(game) => game,
                    None => self.create_new_game(Some(name.to_string()), max_players),
                }
            }
            None => {
                for session in self.sessions.iter().filter(|s| s.name.is_none()) {
                    if session.game.lock().await.can_player_join() {
                        return Arc::clone(&session.game);
                    }
                }
                self.create_new_game(None, max_players)
            }
        }
    }

    fn create_new_game(&mut self, name: Option<String>, max_players: u8) -> SharedGame {
        let id = self.next_game_id;
        self.next_game_id += 1;

        let game = Game::new(id, name.clone(), max_players);
        match &name {
            Some(name) => info!(
                "Created private game {} '{}' for {} players",
                id, name, game.max_players
            ),
            None => info!("Created public game {} for {} players", id, game.max_players),
        }

        let game = Arc::new(Mutex::new(game));
        self.sessions.push(Session {
            id,
            name,
            game: Arc::clone(&game),
        });
        game
    }

    /// Places a new client into a session and returns its player
    ///
    /// Fails only when a named session exists but has no free slot. The
    /// requested player count is only honoured when a session is created.
    pub async fn add_client_to_game(
        &mut self,
        addr: SocketAddr,
        request: &JoinRequest,
    ) -> Result<Joined, JoinError> {
        let game = self
            .get_game_instance(request.game_name.as_deref(), request.max_players)
            .await;

        let (game_id, player) = {
            let mut locked = game.lock().await;
            match locked.join_new_player(addr) {
                Some(player) => (locked.id, player),
                None => {
                    return Err(JoinError::SessionFull {
                        name: locked.name.clone().unwrap_or_default(),
                        max_players: locked.max_players,
                    })
                }
            }
        };

        Ok(Joined {
            game,
            game_id,
            player,
        })
    }

    /// Marks a member as departed and drops the session once nobody is
    /// left. Returns true when the session was removed.
    pub async fn leave(&mut self, game: &SharedGame, player_id: u8) -> bool {
        let (game_id, empty) = {
            let mut locked = game.lock().await;
            locked.leave(player_id);
            (locked.id, locked.is_empty())
        };

        if !empty {
            return false;
        }

        let before = self.sessions.len();
        self.sessions
            .retain(|session| !Arc::ptr_eq(&session.game, game));
        let removed = self.sessions.len() < before;
        if removed {
            info!("Removed game {}, no players left", game_id);
        }
        removed
    }

    /// Looks a session up by its id.
    pub fn game(&self, game_id: u32) -> Option<SharedGame> {
        self.sessions
            .iter()
            .find(|session| session.id == game_id)
            .map(|session| Arc::clone(&session.game))
    }

    /// Ids of the running sessions, in creation order.
    pub fn game_ids(&self) -> Vec<u32> {
        self.sessions.iter().map(|session| session.id).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
