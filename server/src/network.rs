//! TCP accept loop, server actor, and the fixed-rate tick loop.

use crate::connection::{spawn_writer, Connection};
use crate::game::GameState;
use crate::limiter::RateLimiter;
use log::{debug, info, warn};
use serde_json::Value;
use shared::{
    encode_message, to_payload, Direction, Envelope, StatePayload, MAX_TOKENS, MSG_MOVE,
    MSG_STATE, TOKEN_REFILL_RATE,
};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Events sent from connection tasks to the server actor.
#[derive(Debug)]
pub enum ServerMessage {
    FromPlayer {
        player_id: String,
        envelope: Envelope,
    },
    Disconnected {
        player_id: String,
    },
}

/// The game server. One task owns the player map and the connection roster
/// exclusively; connection tasks only talk to it over the event channel, so
/// map access never races with the tick loop and a broadcast snapshot can
/// never observe a half-inserted or half-removed entry.
pub struct Server {
    listener: TcpListener,
    tick_duration: Duration,
    game: GameState,
    connections: HashMap<String, mpsc::UnboundedSender<Vec<u8>>>,
    events_tx: mpsc::UnboundedSender<ServerMessage>,
    events_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("server listening on {}", listener.local_addr()?);

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            tick_duration,
            game: GameState::new(),
            connections: HashMap::new(),
            events_tx,
            events_rx,
        })
    }

    /// The address the listener actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main server loop: accepts connections, applies client messages, and
    /// runs the tick at the configured cadence. Never returns under normal
    /// operation.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut ticker = interval(self.tick_duration);
        // Oversized ticks degrade the rate instead of queueing catch-up
        // ticks behind the schedule.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        info!(
            "starting tick loop at {:.0} Hz",
            1.0 / self.tick_duration.as_secs_f64()
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => self.accept(socket, peer),
                        Err(e) => warn!("failed to accept connection: {e}"),
                    }
                },

                Some(message) = self.events_rx.recv() => {
                    self.handle_event(message);
                },

                _ = ticker.tick() => {
                    let now = Instant::now();
                    let delta_time = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.game.update(delta_time);
                    self.broadcast();
                },
            }
        }
    }

    /// Registers a new connection: fresh id, player entry, frame channel,
    /// and the reader/writer task pair.
    fn accept(&mut self, socket: TcpStream, peer: SocketAddr) {
        let player_id = uuid::Uuid::new_v4().to_string();
        info!("new connection established: id={player_id} from {peer}");

        let (read_half, write_half) = socket.into_split();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        spawn_writer(write_half, frames_rx);

        let connection = Connection::new(
            player_id.clone(),
            peer,
            read_half,
            RateLimiter::new(MAX_TOKENS, TOKEN_REFILL_RATE),
            self.events_tx.clone(),
            frames_tx.clone(),
        );
        tokio::spawn(connection.run());

        self.game.add_player(&player_id);
        self.connections.insert(player_id, frames_tx);
    }

    fn handle_event(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::FromPlayer {
                player_id,
                envelope,
            } => self.process_message(&player_id, &envelope),
            ServerMessage::Disconnected { player_id } => self.remove_player(&player_id),
        }
    }

    /// Dispatches one decoded client message. Unknown types are ignored for
    /// forward compatibility.
    fn process_message(&mut self, player_id: &str, envelope: &Envelope) {
        match envelope.kind.as_str() {
            MSG_MOVE => {
                let direction = envelope
                    .payload
                    .get("direction")
                    .and_then(Value::as_str)
                    .map(Direction::from_name)
                    .unwrap_or(Direction::None);
                self.game.apply_move(player_id, direction);
            }
            other => {
                debug!("ignoring message type {other:?} from id={player_id}");
            }
        }
    }

    fn remove_player(&mut self, player_id: &str) {
        self.connections.remove(player_id);
        if self.game.remove_player(player_id) {
            info!(
                "player removed: id={player_id}, {} still connected",
                self.game.len()
            );
        }
    }

    /// Serializes the full player list once and fans it out. A failed send
    /// means that connection's writer is gone; it is cleaned up without
    /// touching delivery to the others.
    fn broadcast(&mut self) {
        if self.connections.is_empty() {
            return;
        }

        let frame = encode_message(
            MSG_STATE,
            Some(to_payload(&StatePayload {
                players: self.game.snapshot(),
            })),
        );

        let mut dead = Vec::new();
        for (player_id, frames_tx) in &self.connections {
            if frames_tx.send(frame.clone()).is_err() {
                dead.push(player_id.clone());
            }
        }
        for player_id in dead {
            self.remove_player(&player_id);
        }
    }
}
