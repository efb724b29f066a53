//! # Arena Client Library
//!
//! Headless client for the arena shooter. It joins a session, keeps a local
//! view of the match and exchanges one request/response pair with the
//! server per frame. Drawing and raw input capture are left to whatever
//! embeds this crate; the bundled binary drives it with a scripted bot.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! One TCP connection per client:
//! - Join request and the player it returns (or a rejection)
//! - Player updates answered by a state delta or the session-empty marker
//! - Projectile reports, which the server does not answer
//! - Disconnect: the player is killed, pushed once more and the stream closed
//!
//! ### Game Module (`game`)
//! The client's view of its session:
//! - Placeholder peers until the server reports the real ones
//! - Projectile simulation and collisions with obstacles and players
//! - Viewport tracking and line-of-sight filtering of peers
//! - Merging of server deltas without duplicating shots
//!
//! ### Input Module (`input`)
//! Decoded commands (move, stop, aim, shoot) and how held movement keys turn
//! into player velocity.
//!
//! ### Bot Module (`bot`)
//! Random movement and shooting plus the frame loop that ties the other
//! modules together.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientGameState;
//! use client::network::NetworkClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (mut network, player) = NetworkClient::connect("127.0.0.1:5555", None, 4).await?;
//!     let mut state = ClientGameState::new(player);
//!
//!     state.tick();
//!     if state.should_share() {
//!         let delta = network.send_player(state.local_player()).await?;
//!         state.apply_delta(delta);
//!     }
//!
//!     network.disconnect(state.local_player_mut()).await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod game;
pub mod input;
pub mod network;
