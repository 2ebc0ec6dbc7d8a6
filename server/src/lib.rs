//! # Game Server Library
//!
//! Authoritative server for the networked multiplayer world. It owns the
//! canonical player state, turns client intents into state mutations, and
//! broadcasts the full world to every connected client at a fixed tick rate.
//!
//! ## Architecture
//!
//! The server is a single-owner actor: one task runs the main `select!`
//! loop and is the only code that ever touches the player map or the
//! connection roster. Everything else reaches it through an event channel:
//!
//! - **Accept branch**: registers new connections, assigns a UUID player
//!   id, and spawns the per-connection reader and writer tasks.
//! - **Event branch**: applies decoded client messages and disconnects
//!   reported by reader tasks.
//! - **Tick branch**: measures the real elapsed time since the previous
//!   tick, integrates positions, and fans the resulting snapshot out to
//!   every live connection.
//!
//! Because insert, mutate, and remove all happen on the same task, a
//! broadcast can never observe a half-updated map.
//!
//! ## Module Organization
//!
//! - [`game`]: the player map and the per-tick integration step.
//! - [`limiter`]: per-connection token-bucket admission control.
//! - [`connection`]: per-connection framing, rate-limit policy, decoding,
//!   and the writer task that isolates slow or dead peers.
//! - [`network`]: the listener, the actor loop, and broadcast fan-out.
//!
//! ## Error Philosophy
//!
//! Nothing in this crate terminates the process once the listener is bound.
//! Transport errors tear down the affected connection, protocol errors drop
//! the offending message, and rate-limit violations get an `ERROR` reply
//! while the connection lives on.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8888",
//!         Duration::from_secs_f64(1.0 / 60.0),
//!     ).await?;
//!     server.run().await
//! }
//! ```

pub mod connection;
pub mod game;
pub mod limiter;
pub mod network;
