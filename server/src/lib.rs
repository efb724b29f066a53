//! # Arena Server Library
//!
//! Authoritative backend for the arena shooter. The server hosts any number
//! of concurrent sessions of up to four players, accepts one TCP connection
//! per client and answers each player update with what that client should
//! know about its opponents and their shots.
//!
//! ## Connection lifecycle
//!
//! Every accepted connection gets its own tokio task running a small state
//! machine:
//!
//! - **Awaiting join**: the first frame must be a join request. The client
//!   is placed in a session and answered with its new player.
//! - **Active**: player updates are stored in the player's slot and answered
//!   with a state delta (or the session-empty marker when nobody else is
//!   connected). Projectile messages are registered and not answered.
//! - **Draining**: on end of stream, a transport error or a decode error the
//!   member leaves its session. A session with no connected member left is
//!   removed.
//! - **Closed**: the task ends and the socket is dropped.
//!
//! ## Session selection
//!
//! Named requests join the private session with that name (created on first
//! use). Unnamed requests join the first public session with a free slot,
//! or a new public session. A full private session rejects the join.
//!
//! ## Shared state
//!
//! The session registry lives behind an `RwLock`, each session behind its
//! own `Mutex`. Joins and leaves lock the registry and then the session;
//! per-request work locks only the session. No lock is held across a socket
//! read or write.
//!
//! ## Projectile lifetime
//!
//! A registered projectile rides along in the deltas of the session until
//! its `known` counter, which starts at 1, reaches the session's player
//! limit. With four players that is three deltas after registration.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("0.0.0.0:5555").await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod session_manager;
