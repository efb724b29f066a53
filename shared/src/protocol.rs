//! Wire protocol between clients and the server.
//!
//! Every message travels in one frame: a little-endian `u32` payload length
//! followed by the payload. The first payload byte is the [`MessageKind`];
//! the rest is the bincode-encoded body for that kind. The "session empty"
//! reply is the single byte [`SESSION_EMPTY`] with no body.
//!
//! Exchanges are strictly request/response: the client sends one frame and,
//! for player updates and joins, waits for exactly one reply. The server
//! never sends anything unsolicited.

use crate::geometry::Point;
use crate::Color;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted for the opening join request.
pub const JOIN_FRAME_LIMIT: usize = 128;

/// Largest payload accepted for any other message.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Reply byte meaning "nobody else is in your session".
pub const SESSION_EMPTY: u8 = b'w';

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("empty frame")]
    EmptyFrame,
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },
    #[error("unknown message kind: 0x{0:02x}")]
    UnknownKind(u8),
    #[error("expected {expected}, got {found}")]
    UnexpectedMessage {
        expected: &'static str,
        found: MessageKind,
    },
    #[error("join rejected: {0}")]
    Rejected(String),
    #[error("connection closed")]
    ConnectionClosed,
}

/// Discriminant written as the first byte of every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    JoinRequest = 0x01,
    Joined = 0x02,
    Rejected = 0x03,
    PlayerState = 0x04,
    Projectile = 0x05,
    Delta = 0x06,
    SessionEmpty = SESSION_EMPTY,
}

impl TryFrom<u8> for MessageKind {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Self::JoinRequest),
            0x02 => Ok(Self::Joined),
            0x03 => Ok(Self::Rejected),
            0x04 => Ok(Self::PlayerState),
            0x05 => Ok(Self::Projectile),
            0x06 => Ok(Self::Delta),
            SESSION_EMPTY => Ok(Self::SessionEmpty),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::JoinRequest => "join request",
            Self::Joined => "join response",
            Self::Rejected => "join rejection",
            Self::PlayerState => "player state",
            Self::Projectile => "projectile",
            Self::Delta => "state delta",
            Self::SessionEmpty => "session-empty marker",
        };
        f.write_str(name)
    }
}

/// First message on every connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// `Some` asks for a private room with that name.
    pub game_name: Option<String>,
    pub max_players: u8,
}

/// Snapshot of a player as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub game_id: u32,
    pub id: u8,
    pub position: Point,
    pub angle: f32,
    pub change_x: f32,
    pub change_y: f32,
    pub health: f32,
    pub active: bool,
    pub color: Color,
    /// Muzzle position of the player's weapon.
    pub aim: Point,
}

/// Snapshot of a projectile as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub unique_id: Option<u32>,
    pub player_id: u8,
    pub color: Color,
    pub position: Point,
    pub angle: f32,
    pub change_x: f32,
    pub change_y: f32,
    pub speed: f32,
    pub distance: f32,
    pub damage: f32,
    pub active: bool,
    pub known: u8,
}

/// What a client is told in reply to its player update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    pub players: Vec<PlayerState>,
    pub projectiles: Vec<ProjectileState>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Join(JoinRequest),
    Player(PlayerState),
    Projectile(ProjectileState),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Joined(PlayerState),
    Rejected { reason: String },
    Delta(StateDelta),
    SessionEmpty,
}

/// A message that can be turned into a frame payload and back.
pub trait WireMessage: Sized {
    fn kind(&self) -> MessageKind;
    fn encode(&self) -> Result<Vec<u8>, ProtocolError>;
    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError>;
}

fn encode_payload<T: Serialize>(kind: MessageKind, body: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = bincode::serialize(body)?;
    let mut buf = Vec::with_capacity(1 + body.len());
    buf.push(kind as u8);
    buf.extend_from_slice(&body);
    Ok(buf)
}

fn split_kind(bytes: &[u8]) -> Result<(MessageKind, &[u8]), ProtocolError> {
    let (&first, body) = bytes.split_first().ok_or(ProtocolError::EmptyFrame)?;
    Ok((MessageKind::try_from(first)?, body))
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    Ok(bincode::deserialize(body)?)
}

impl WireMessage for ClientMessage {
    fn kind(&self) -> MessageKind {
        match self {
            Self::Join(_) => MessageKind::JoinRequest,
            Self::Player(_) => MessageKind::PlayerState,
            Self::Projectile(_) => MessageKind::Projectile,
        }
    }

    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Join(request) => encode_payload(self.kind(), request),
            Self::Player(state) => encode_payload(self.kind(), state),
            Self::Projectile(state) => encode_payload(self.kind(), state),
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (kind, body) = split_kind(bytes)?;
        match kind {
            MessageKind::JoinRequest => Ok(Self::Join(decode_body(body)?)),
            MessageKind::PlayerState => Ok(Self::Player(decode_body(body)?)),
            MessageKind::Projectile => Ok(Self::Projectile(decode_body(body)?)),
            found => Err(ProtocolError::UnexpectedMessage {
                expected: "a client message",
                found,
            }),
        }
    }
}

impl WireMessage for ServerMessage {
    fn kind(&self) -> MessageKind {
        match self {
            Self::Joined(_) => MessageKind::Joined,
            Self::Rejected { .. } => MessageKind::Rejected,
            Self::Delta(_) => MessageKind::Delta,
            Self::SessionEmpty => MessageKind::SessionEmpty,
        }
    }

    fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Joined(state) => encode_payload(self.kind(), state),
            Self::Rejected { reason } => encode_payload(self.kind(), reason),
            Self::Delta(delta) => encode_payload(self.kind(), delta),
            Self::SessionEmpty => Ok(vec![SESSION_EMPTY]),
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (kind, body) = split_kind(bytes)?;
        match kind {
            MessageKind::Joined => Ok(Self::Joined(decode_body(body)?)),
            MessageKind::Rejected => Ok(Self::Rejected {
                reason: decode_body(body)?,
            }),
            MessageKind::Delta => Ok(Self::Delta(decode_body(body)?)),
            MessageKind::SessionEmpty => Ok(Self::SessionEmpty),
            found => Err(ProtocolError::UnexpectedMessage {
                expected: "a server message",
                found,
            }),
        }
    }
}

/// Writes one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if payload.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len(),
            limit: MAX_FRAME_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame of at most `limit` payload bytes.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new frame
/// starts. A stream that ends inside a frame is an error.
pub async fn read_frame<R>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_bytes) as usize;
    if len == 0 {
        return Err(ProtocolError::EmptyFrame);
    }
    if len > limit {
        return Err(ProtocolError::FrameTooLarge { size: len, limit });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn send_message<W, M>(writer: &mut W, message: &M) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    M: WireMessage,
{
    let payload = message.encode()?;
    write_frame(writer, &payload).await
}

/// Reads and decodes one message; `Ok(None)` on a clean end of stream.
pub async fn recv_message<R, M>(reader: &mut R, limit: usize) -> Result<Option<M>, ProtocolError>
where
    R: AsyncRead + Unpin,
    M: WireMessage,
{
    match read_frame(reader, limit).await? {
        Some(payload) => Ok(Some(M::decode(&payload)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn player_state() -> PlayerState {
        PlayerState {
            game_id: 0,
            id: 1,
            position: (250.0, 250.0),
            angle: 15.0,
            change_x: 0.5,
            change_y: -0.5,
            health: 90.0,
            active: true,
            color: (0, 255, 0),
            aim: (250.0, 270.0),
        }
    }

    fn projectile_state() -> ProjectileState {
        ProjectileState {
            unique_id: Some(7),
            player_id: 1,
            color: (0, 255, 0),
            position: (10.0, 20.0),
            angle: 270.0,
            change_x: 10.0,
            change_y: 0.0,
            speed: 10.0,
            distance: 30.0,
            damage: 10.0,
            active: true,
            known: 2,
        }
    }

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_kind_byte_leads_payload() {
        let join = ClientMessage::Join(JoinRequest {
            game_name: None,
            max_players: 4,
        });
        assert_eq!(join.encode().unwrap()[0], MessageKind::JoinRequest as u8);

        let delta = ServerMessage::Delta(StateDelta::default());
        assert_eq!(delta.encode().unwrap()[0], MessageKind::Delta as u8);
    }

    #[test]
    fn test_session_empty_is_single_byte() {
        let encoded = ServerMessage::SessionEmpty.encode().unwrap();
        assert_eq!(encoded, vec![SESSION_EMPTY]);
        assert_eq!(
            ServerMessage::decode(&encoded).unwrap(),
            ServerMessage::SessionEmpty
        );
    }

    #[test]
    fn test_session_empty_differs_from_every_other_kind() {
        let others = [
            MessageKind::JoinRequest,
            MessageKind::Joined,
            MessageKind::Rejected,
            MessageKind::PlayerState,
            MessageKind::Projectile,
            MessageKind::Delta,
        ];
        for kind in others {
            assert_ne!(kind as u8, SESSION_EMPTY);
        }
    }

    #[test]
    fn test_dispatch_by_declared_kind() {
        let player = ClientMessage::Player(player_state()).encode().unwrap();
        let projectile = ClientMessage::Projectile(projectile_state())
            .encode()
            .unwrap();

        assert!(matches!(
            ClientMessage::decode(&player).unwrap(),
            ClientMessage::Player(state) if state.id == 1
        ));
        assert!(matches!(
            ClientMessage::decode(&projectile).unwrap(),
            ClientMessage::Projectile(state) if state.unique_id == Some(7)
        ));
    }

    #[test]
    fn test_delta_keeps_both_collections() {
        let delta = ServerMessage::Delta(StateDelta {
            players: vec![player_state()],
            projectiles: vec![projectile_state(), projectile_state()],
        });
        match ServerMessage::decode(&delta.encode().unwrap()).unwrap() {
            ServerMessage::Delta(decoded) => {
                assert_eq!(decoded.players.len(), 1);
                assert_eq!(decoded.projectiles.len(), 2);
                assert_eq!(decoded.projectiles[0].known, 2);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_rejects_wrong_direction() {
        let reply = ServerMessage::SessionEmpty.encode().unwrap();
        match ClientMessage::decode(&reply) {
            Err(ProtocolError::UnexpectedMessage { found, .. }) => {
                assert_eq!(found, MessageKind::SessionEmpty)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_and_empty() {
        assert!(matches!(
            ClientMessage::decode(&[0xEE, 1, 2]),
            Err(ProtocolError::UnknownKind(0xEE))
        ));
        assert!(matches!(
            ServerMessage::decode(&[]),
            Err(ProtocolError::EmptyFrame)
        ));
    }

    #[test]
    fn test_truncated_body_is_codec_error() {
        let encoded = ClientMessage::Player(player_state()).encode().unwrap();
        let truncated = &encoded[..encoded.len() / 2];
        assert!(matches!(
            ClientMessage::decode(truncated),
            Err(ProtocolError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn test_write_frame_prefixes_length() {
        let payload = [MessageKind::Delta as u8, 1, 2, 3];
        let mut mock = Builder::new().write(&framed(&payload)).build();
        write_frame(&mut mock, &payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_frame_handles_split_reads() {
        let bytes = framed(&[1, 2, 3, 4, 5]);
        let mut mock = Builder::new().read(&bytes[..3]).read(&bytes[3..]).build();
        let frame = read_frame(&mut mock, MAX_FRAME_SIZE).await.unwrap();
        assert_eq!(frame, Some(vec![1, 2, 3, 4, 5]));
    }

    #[tokio::test]
    async fn test_read_frame_clean_eof() {
        let mut mock = Builder::new().build();
        assert_eq!(read_frame(&mut mock, MAX_FRAME_SIZE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_frame_eof_inside_body() {
        let bytes = framed(&[1, 2, 3, 4, 5]);
        let mut mock = Builder::new().read(&bytes[..6]).build();
        assert!(matches!(
            read_frame(&mut mock, MAX_FRAME_SIZE).await,
            Err(ProtocolError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_read_frame_enforces_limit() {
        let bytes = (JOIN_FRAME_LIMIT as u32 + 1).to_le_bytes();
        let mut mock = Builder::new().read(&bytes).build();
        match read_frame(&mut mock, JOIN_FRAME_LIMIT).await {
            Err(ProtocolError::FrameTooLarge { size, limit }) => {
                assert_eq!(size, JOIN_FRAME_LIMIT + 1);
                assert_eq!(limit, JOIN_FRAME_LIMIT);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_request_fits_join_limit() {
        let request = ClientMessage::Join(JoinRequest {
            game_name: Some("a reasonably long private room name".to_string()),
            max_players: 4,
        });
        assert!(request.encode().unwrap().len() <= JOIN_FRAME_LIMIT);
    }

    #[tokio::test]
    async fn test_messages_over_a_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        send_message(&mut client, &ClientMessage::Player(player_state()))
            .await
            .unwrap();
        send_message(&mut client, &ClientMessage::Projectile(projectile_state()))
            .await
            .unwrap();
        drop(client);

        let first: Option<ClientMessage> = recv_message(&mut server, MAX_FRAME_SIZE).await.unwrap();
        let second: Option<ClientMessage> =
            recv_message(&mut server, MAX_FRAME_SIZE).await.unwrap();
        let third: Option<ClientMessage> = recv_message(&mut server, MAX_FRAME_SIZE).await.unwrap();

        assert_eq!(first, Some(ClientMessage::Player(player_state())));
        assert_eq!(second, Some(ClientMessage::Projectile(projectile_state())));
        assert_eq!(third, None);
    }
}
