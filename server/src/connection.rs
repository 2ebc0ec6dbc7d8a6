//! Per-connection read loop and writer task.
//!
//! Each accepted transport gets two tasks: a reader that frames, rate-limits
//! and decodes incoming messages before forwarding them to the server actor,
//! and a writer that drains a frame channel into the socket. The channel
//! indirection keeps a dead or stalled peer from ever blocking the tick loop.

use crate::limiter::RateLimiter;
use crate::network::ServerMessage;
use log::{debug, info, warn};
use shared::{
    decode_message, encode_message, read_frame, to_payload, ErrorPayload, MSG_ERROR,
};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

/// Reader side of one client connection.
pub struct Connection {
    player_id: String,
    peer: SocketAddr,
    reader: OwnedReadHalf,
    limiter: RateLimiter,
    events: mpsc::UnboundedSender<ServerMessage>,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
}

impl Connection {
    pub fn new(
        player_id: String,
        peer: SocketAddr,
        reader: OwnedReadHalf,
        limiter: RateLimiter,
        events: mpsc::UnboundedSender<ServerMessage>,
        outgoing: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            player_id,
            peer,
            reader,
            limiter,
            events,
            outgoing,
        }
    }

    /// Runs the read loop until the stream ends, then reports the
    /// disconnect. The single exit path means the removal event is sent
    /// exactly once no matter how the loop terminates.
    pub async fn run(mut self) {
        loop {
            let body = match read_frame(&mut self.reader).await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    info!("client disconnected gracefully: id={}", self.player_id);
                    break;
                }
                Err(e) => {
                    info!("client disconnected abruptly: id={} ({e})", self.player_id);
                    break;
                }
            };

            if !self.limiter.consume(1.0) {
                warn!(
                    "rate limit hit for id={} ({})",
                    self.player_id, self.peer
                );
                self.send_error("Rate limit exceeded. Too many messages.");
                continue;
            }

            match decode_message(&body) {
                Ok(envelope) => {
                    let forwarded = self.events.send(ServerMessage::FromPlayer {
                        player_id: self.player_id.clone(),
                        envelope,
                    });
                    if forwarded.is_err() {
                        // Server actor is gone; nothing left to read for.
                        break;
                    }
                }
                Err(e) => {
                    warn!("dropping undecodable message from id={}: {e}", self.player_id);
                }
            }
        }

        let _ = self.events.send(ServerMessage::Disconnected {
            player_id: self.player_id,
        });
    }

    fn send_error(&self, reason: &str) {
        let frame = encode_message(
            MSG_ERROR,
            Some(to_payload(&ErrorPayload {
                reason: reason.to_string(),
            })),
        );
        // Send failure means the writer already died; the read loop will
        // observe the broken stream on its own.
        let _ = self.outgoing.send(frame);
    }
}

/// Spawns the writer task for one connection. The task ends when the frame
/// channel closes (connection removed) or the first write fails.
pub fn spawn_writer(mut writer: OwnedWriteHalf, mut frames: mpsc::UnboundedReceiver<Vec<u8>>) {
    tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                debug!("write failed, dropping connection writer: {e}");
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{HEADER_SIZE, MAX_TOKENS, MSG_MOVE, TOKEN_REFILL_RATE};
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    fn spawn_connection(
        server_side: TcpStream,
        limiter: RateLimiter,
    ) -> (
        mpsc::UnboundedReceiver<ServerMessage>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        let peer = server_side.peer_addr().unwrap();
        let (reader, _writer) = server_side.into_split();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let connection = Connection::new(
            "p1".to_string(),
            peer,
            reader,
            limiter,
            events_tx,
            frames_tx,
        );
        tokio::spawn(connection.run());
        (events_rx, frames_rx)
    }

    #[tokio::test]
    async fn test_forwards_decoded_messages() {
        let (mut client, server_side) = socket_pair().await;
        let (mut events_rx, _frames_rx) =
            spawn_connection(server_side, RateLimiter::new(MAX_TOKENS, TOKEN_REFILL_RATE));

        client
            .write_all(&encode_message(MSG_MOVE, None))
            .await
            .unwrap();

        match events_rx.recv().await.unwrap() {
            ServerMessage::FromPlayer { player_id, envelope } => {
                assert_eq!(player_id, "p1");
                assert_eq!(envelope.kind, MSG_MOVE);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reports_disconnect_once_on_close() {
        let (client, server_side) = socket_pair().await;
        let (mut events_rx, _frames_rx) =
            spawn_connection(server_side, RateLimiter::new(MAX_TOKENS, TOKEN_REFILL_RATE));

        drop(client);

        match events_rx.recv().await.unwrap() {
            ServerMessage::Disconnected { player_id } => assert_eq!(player_id, "p1"),
            other => panic!("unexpected event: {other:?}"),
        }
        // Channel closes after the single disconnect event.
        assert!(events_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_rate_limited_message_gets_error_reply() {
        let (mut client, server_side) = socket_pair().await;
        // Zero-capacity bucket rejects everything.
        let (mut events_rx, mut frames_rx) =
            spawn_connection(server_side, RateLimiter::new(0.0, 0.0));

        client
            .write_all(&encode_message(MSG_MOVE, None))
            .await
            .unwrap();

        let frame = frames_rx.recv().await.unwrap();
        let envelope = decode_message(&frame[HEADER_SIZE..]).unwrap();
        assert_eq!(envelope.kind, MSG_ERROR);
        assert!(envelope
            .payload
            .get("reason")
            .and_then(serde_json::Value::as_str)
            .unwrap()
            .contains("Rate limit"));

        // The rejected message is not forwarded and the connection lives on.
        drop(client);
        match events_rx.recv().await.unwrap() {
            ServerMessage::Disconnected { .. } => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_message_is_dropped_not_fatal() {
        let (mut client, server_side) = socket_pair().await;
        let (mut events_rx, _frames_rx) =
            spawn_connection(server_side, RateLimiter::new(MAX_TOKENS, TOKEN_REFILL_RATE));

        // Valid frame, invalid JSON body.
        let garbage = b"not json at all";
        let mut frame = (garbage.len() as u32).to_le_bytes().to_vec();
        frame.extend_from_slice(garbage);
        client.write_all(&frame).await.unwrap();

        // A well-formed message after the garbage still arrives.
        client
            .write_all(&encode_message(MSG_MOVE, None))
            .await
            .unwrap();

        match events_rx.recv().await.unwrap() {
            ServerMessage::FromPlayer { envelope, .. } => assert_eq!(envelope.kind, MSG_MOVE),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_writer_task_drains_frames() {
        let (mut client, server_side) = socket_pair().await;
        let (_reader, writer) = server_side.into_split();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        spawn_writer(writer, frames_rx);

        let frame = encode_message(MSG_MOVE, None);
        frames_tx.send(frame.clone()).unwrap();

        let mut received = vec![0u8; frame.len()];
        client.read_exact(&mut received).await.unwrap();
        assert_eq!(received, frame);
    }
}
