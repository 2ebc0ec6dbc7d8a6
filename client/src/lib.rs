//! # Game Client Library
//!
//! Resilient client for the multiplayer state-synchronization protocol. It
//! keeps a persistent connection to the server, sends movement intents at a
//! fixed rate, and mirrors the server's authoritative world locally.
//!
//! ## Architecture
//!
//! The client is a reconnect-forever loop around a session. Each session
//! pairs two concurrent activities:
//!
//! - a **receive loop** that reads length-prefixed frames, decodes them,
//!   and applies `STATE` broadcasts to the local world snapshot, and
//! - an **input-send loop** that transmits the current movement intent as
//!   a `MOVE` message at the configured rate.
//!
//! They are supervised together: the first to fail ends the session, the
//! transport is dropped, and the outer loop waits a fixed delay before
//! connecting again. The backoff is deliberately flat, trading retry speed
//! for predictable load on the server.
//!
//! Identity is bootstrapped heuristically from the first `STATE` snapshot
//! rather than negotiated; there is no handshake in this protocol.
//!
//! ## Module Organization
//!
//! - [`game`]: the local world snapshot and self-id bookkeeping.
//! - [`input`]: the [`input::InputSource`] trait plus the simulated
//!   wandering source used when no real input device exists.
//! - [`network`]: connection management, framing, and the session loops.

pub mod game;
pub mod input;
pub mod network;
