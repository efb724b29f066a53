//! Server network layer: TCP acceptor and the per-connection state machine

use crate::session_manager::{SessionManager, SharedGame};
use log::{debug, error, info, warn};
use shared::protocol::{
    recv_message, send_message, ClientMessage, ServerMessage, JOIN_FRAME_LIMIT, MAX_FRAME_SIZE,
};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;

/// Lifecycle of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the opening join request.
    AwaitingJoin,
    /// Member of a session, serving requests.
    Active,
    /// Leaving the session; the stream is done.
    Draining,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingJoin => "awaiting join",
            Self::Active => "active",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Accepts clients and hands each one to its own task
pub struct Server {
    listener: TcpListener,
    sessions: Arc<RwLock<SessionManager>>,
}

impl Server {
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            sessions: Arc::new(RwLock::new(SessionManager::new())),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the session registry, shared with every connection task.
    pub fn sessions(&self) -> Arc<RwLock<SessionManager>> {
        Arc::clone(&self.sessions)
    }

    /// Accept loop. Runs until the task is dropped; accept errors are logged
    /// and retried.
    pub async fn run(self) {
        info!("Server started, waiting for connections");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Received connection from {}", addr);
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }
                    let connection = Connection::new(stream, addr, self.sessions());
                    tokio::spawn(connection.run());
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// One client's stream and, once joined, its seat in a session
struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    sessions: Arc<RwLock<SessionManager>>,
    state: ConnectionState,
    seat: Option<(SharedGame, u8)>,
}

impl Connection {
    fn new(stream: TcpStream, addr: SocketAddr, sessions: Arc<RwLock<SessionManager>>) -> Self {
        Self {
            stream,
            addr,
            sessions,
            state: ConnectionState::AwaitingJoin,
            seat: None,
        }
    }

    async fn run(mut self) {
        while self.state != ConnectionState::Closed {
            let next = match self.state {
                ConnectionState::AwaitingJoin => self.await_join().await,
                ConnectionState::Active => self.serve_request().await,
                ConnectionState::Draining => self.drain().await,
                ConnectionState::Closed => ConnectionState::Closed,
            };
            if next != self.state {
                debug!("Connection {}: {} -> {}", self.addr, self.state, next);
            }
            self.state = next;
        }
        info!("Disconnected with {}", self.addr);
    }

    async fn await_join(&mut self) -> ConnectionState {
        let request = match recv_message(&mut self.stream, JOIN_FRAME_LIMIT).await {
            Ok(Some(ClientMessage::Join(request))) => request,
            Ok(Some(other)) => {
                warn!("Expected a join request from {}, got {:?}", self.addr, other);
                return ConnectionState::Closed;
            }
            Ok(None) => return ConnectionState::Closed,
            Err(e) => {
                warn!("Failed to decode join request from {}: {}", self.addr, e);
                return ConnectionState::Closed;
            }
        };

        let joined = self
            .sessions
            .write()
            .await
            .add_client_to_game(self.addr, &request)
            .await;

        match joined {
            Ok(joined) => {
                let reply = ServerMessage::Joined(joined.player.to_state());
                info!(
                    "Client {} joined game {} as player {}",
                    self.addr, joined.game_id, joined.player.id
                );
                self.seat = Some((joined.game, joined.player.id));

                match send_message(&mut self.stream, &reply).await {
                    Ok(()) => ConnectionState::Active,
                    Err(e) => {
                        warn!("Failed to send join response to {}: {}", self.addr, e);
                        ConnectionState::Draining
                    }
                }
            }
            Err(e) => {
                warn!("Rejected {}: {}", self.addr, e);
                let reply = ServerMessage::Rejected {
                    reason: e.to_string(),
                };
                if let Err(e) = send_message(&mut self.stream, &reply).await {
                    debug!("Failed to send rejection to {}: {}", self.addr, e);
                }
                ConnectionState::Closed
            }
        }
    }

    async fn serve_request(&mut self) -> ConnectionState {
        let (game, player_id) = match &self.seat {
            Some((game, player_id)) => (Arc::clone(game), *player_id),
            None => return ConnectionState::Closed,
        };

        let message = match recv_message(&mut self.stream, MAX_FRAME_SIZE).await {
            Ok(Some(message)) => message,
            Ok(None) => return ConnectionState::Draining,
            Err(e) => {
                warn!("Failed to decode message from {}: {}", self.addr, e);
                return ConnectionState::Draining;
            }
        };

        match message {
            ClientMessage::Player(state) => {
                let reply = {
                    let mut game = game.lock().await;
                    game.update_player(player_id, &state);
                    if state.health <= 0.0 {
                        info!("Game {}: player {} is dead", game.id, player_id);
                    }
                    game.delta_for(player_id)
                };

                if let Err(e) = send_message(&mut self.stream, &reply).await {
                    warn!("Failed to send state delta to {}: {}", self.addr, e);
                    return ConnectionState::Draining;
                }
                ConnectionState::Active
            }
            ClientMessage::Projectile(state) => {
                game.lock().await.update_projectiles(player_id, &state);
                ConnectionState::Active
            }
            ClientMessage::Join(_) => {
                warn!("Unexpected join request from {} after joining", self.addr);
                ConnectionState::Draining
            }
        }
    }

    async fn drain(&mut self) -> ConnectionState {
        if let Some((game, player_id)) = self.seat.take() {
            self.sessions.write().await.leave(&game, player_id).await;
        }
        ConnectionState::Closed
    }
}
