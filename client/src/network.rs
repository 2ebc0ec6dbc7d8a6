//! Client networking: reconnect-forever outer loop wrapping a session with
//! a receive loop and a fixed-rate input-send loop.

use crate::game::ClientWorld;
use crate::input::InputSource;
use log::{debug, error, info, warn};
use serde_json::Value;
use shared::{
    decode_message, encode_message, read_frame, to_payload, Envelope, MovePayload, StatePayload,
    MSG_ERROR, MSG_MOVE, MSG_STATE,
};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};

pub struct Client {
    server_addr: String,
    input: Box<dyn InputSource>,
    world: ClientWorld,
    input_interval: Duration,
    reconnect_delay: Duration,
}

impl Client {
    pub fn new(
        server_addr: String,
        input: Box<dyn InputSource>,
        input_rate: u32,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            server_addr,
            input,
            world: ClientWorld::new(),
            input_interval: Duration::from_secs_f64(1.0 / input_rate as f64),
            reconnect_delay,
        }
    }

    pub fn world(&self) -> &ClientWorld {
        &self.world
    }

    /// Outer loop: connect, run a session until it fails, wait the fixed
    /// backoff, retry. Runs indefinitely.
    pub async fn run(&mut self) {
        loop {
            info!("attempting to connect to {}...", self.server_addr);
            match TcpStream::connect(&self.server_addr).await {
                Ok(stream) => {
                    info!("connected to server");
                    self.session(stream).await;
                }
                Err(e) => {
                    error!("connection failed: {e}");
                }
            }

            info!("reconnecting in {} seconds...", self.reconnect_delay.as_secs());
            sleep(self.reconnect_delay).await;
        }
    }

    /// One connected session. The read half lives in its own task feeding
    /// decoded envelopes over a channel (frame reads are not cancel-safe
    /// inside `select!`); this task handles them and drives the input-send
    /// cadence. The first failure on either side ends the session and the
    /// reader task is torn down with it.
    async fn session(&mut self, stream: TcpStream) {
        let (read_half, mut write_half) = stream.into_split();
        let (envelopes_tx, mut envelopes_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(read_half, envelopes_tx));

        let mut ticker = interval(self.input_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = envelopes_rx.recv() => {
                    match received {
                        Some(envelope) => self.handle_message(envelope),
                        // Reader ended: stream closed or read error.
                        None => break,
                    }
                },

                _ = ticker.tick() => {
                    let direction = self.input.direction();
                    let frame = encode_message(
                        MSG_MOVE,
                        Some(to_payload(&MovePayload { direction })),
                    );
                    if let Err(e) = write_half.write_all(&frame).await {
                        warn!("failed to send input: {e}");
                        break;
                    }
                },
            }
        }

        reader.abort();
    }

    fn handle_message(&mut self, envelope: Envelope) {
        match envelope.kind.as_str() {
            MSG_STATE => {
                match serde_json::from_value::<StatePayload>(Value::Object(envelope.payload)) {
                    Ok(state) => {
                        self.world.apply_state(state.players);
                        self.world.render();
                    }
                    Err(e) => warn!("malformed STATE payload: {e}"),
                }
            }
            MSG_ERROR => {
                let reason = envelope
                    .payload
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                error!("server error: {reason}");
            }
            other => {
                debug!("ignoring message type {other:?}");
            }
        }
    }
}

/// Reads frames until the stream ends, forwarding everything that decodes.
/// Decode failures are logged and dropped; they never end the session.
async fn read_loop(mut reader: OwnedReadHalf, envelopes: mpsc::UnboundedSender<Envelope>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(body)) => match decode_message(&body) {
                Ok(envelope) => {
                    if envelopes.send(envelope).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("dropping undecodable frame: {e}"),
            },
            Ok(None) => {
                warn!("server disconnected (stream ended)");
                break;
            }
            Err(e) => {
                warn!("error in receive loop: {e}");
                break;
            }
        }
    }
}
