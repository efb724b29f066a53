//! Client side of the request/response protocol

use log::{debug, info};
use shared::protocol::{
    recv_message, send_message, ClientMessage, JoinRequest, ProtocolError, ServerMessage,
    StateDelta, WireMessage, MAX_FRAME_SIZE,
};
use shared::{Player, Projectile};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// A joined connection to the server.
///
/// Requests strictly alternate with replies, so every method takes
/// `&mut self` and waits for its reply before returning.
pub struct NetworkClient<S = TcpStream> {
    stream: S,
}

impl NetworkClient<TcpStream> {
    /// Connects to `server_addr` and joins a session. A named `game_name`
    /// asks for that private room.
    pub async fn connect(
        server_addr: &str,
        game_name: Option<&str>,
        max_players: u8,
    ) -> Result<(Self, Player), ProtocolError> {
        info!("Connecting to {}", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        Self::join(stream, game_name, max_players).await
    }
}

impl<S> NetworkClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the join request over an already open stream and waits for the
    /// local player.
    pub async fn join(
        mut stream: S,
        game_name: Option<&str>,
        max_players: u8,
    ) -> Result<(Self, Player), ProtocolError> {
        let request = ClientMessage::Join(JoinRequest {
            game_name: game_name.map(str::to_string),
            max_players,
        });
        send_message(&mut stream, &request).await?;

        match recv_message(&mut stream, MAX_FRAME_SIZE).await? {
            Some(ServerMessage::Joined(state)) => {
                info!("Joined game {} as player {}", state.game_id, state.id);
                Ok((Self { stream }, Player::from_state(&state)))
            }
            Some(ServerMessage::Rejected { reason }) => Err(ProtocolError::Rejected(reason)),
            Some(other) => Err(ProtocolError::UnexpectedMessage {
                expected: "a join response",
                found: other.kind(),
            }),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }

    /// Pushes the local player and returns what the server knows about the
    /// others. `None` means nobody else is connected to the session.
    pub async fn send_player(&mut self, player: &Player) -> Result<Option<StateDelta>, ProtocolError> {
        send_message(&mut self.stream, &ClientMessage::Player(player.to_state())).await?;

        match recv_message(&mut self.stream, MAX_FRAME_SIZE).await? {
            Some(ServerMessage::Delta(delta)) => Ok(Some(delta)),
            Some(ServerMessage::SessionEmpty) => Ok(None),
            Some(other) => Err(ProtocolError::UnexpectedMessage {
                expected: "a state delta",
                found: other.kind(),
            }),
            None => Err(ProtocolError::ConnectionClosed),
        }
    }

    /// Reports a freshly fired shot. The server does not answer.
    pub async fn send_projectile(&mut self, projectile: &Projectile) -> Result<(), ProtocolError> {
        send_message(
            &mut self.stream,
            &ClientMessage::Projectile(projectile.to_state()),
        )
        .await
    }

    /// Kills the player, pushes that final state and closes the stream.
    pub async fn disconnect(mut self, player: &mut Player) -> Result<(), ProtocolError> {
        player.kill();
        let reply = self.send_player(player).await;
        debug!("Final update answered with {:?}", reply.as_ref().map(|d| d.is_some()));
        self.stream.shutdown().await?;
        reply.map(|_| ())
    }
}
