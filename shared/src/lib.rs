//! Wire protocol shared by the game server and client.
//!
//! Every message travels as a length-prefixed frame: a 4-byte little-endian
//! `u32` header holding the body length, followed by a UTF-8 JSON body. The
//! body is always an envelope with exactly two top-level keys, `type` and
//! `payload`. The header lets a stream reader learn the body length before
//! allocating, since TCP delivers no message boundaries of its own.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the length prefix in front of every frame body.
pub const HEADER_SIZE: usize = 4;

/// Upper bound on a frame body. Real messages are a few hundred bytes; a
/// header declaring more than this is treated as a torn or hostile stream
/// rather than honored with a giant allocation.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

// Message types (client -> server)
pub const MSG_MOVE: &str = "MOVE";

// Message types (server -> client)
pub const MSG_STATE: &str = "STATE";
pub const MSG_ERROR: &str = "ERROR";
pub const MSG_ACK: &str = "ACK";

// Protocol defaults, shared between both binaries and the tests.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_TICK_RATE: u32 = 60;
pub const DEFAULT_INPUT_RATE: u32 = 20;
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
pub const TOKEN_REFILL_RATE: f64 = 10.0;
pub const MAX_TOKENS: f64 = 3.0 * TOKEN_REFILL_RATE;
pub const PLAYER_SPEED: f32 = 10.0;

/// Why a frame body failed to decode. Decode failures are per-message
/// conditions: the caller drops or reports the message and keeps going.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("body is not a JSON object")]
    NotAnObject,
    #[error("envelope is missing the '{0}' key")]
    MissingKey(&'static str),
    #[error("envelope 'type' must be a string")]
    TypeNotString,
    #[error("envelope 'payload' must be a JSON object")]
    PayloadNotObject,
}

/// The `{type, payload}` structure carried in every message body.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: String,
    pub payload: Map<String, Value>,
}

/// Encodes a message as a complete frame: header plus JSON body.
/// A missing payload encodes as an empty object.
pub fn encode_message(kind: &str, payload: Option<Map<String, Value>>) -> Vec<u8> {
    let body = json!({
        "type": kind,
        "payload": Value::Object(payload.unwrap_or_default()),
    })
    .to_string()
    .into_bytes();

    let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Decodes a frame body (without the header) into an envelope.
///
/// Both `type` and `payload` must be present; anything else about the
/// payload contents is left to the dispatching side, so unknown message
/// types stay ignorable instead of fatal.
pub fn decode_message(body: &[u8]) -> Result<Envelope, CodecError> {
    let value: Value = serde_json::from_slice(body)?;
    let object = value.as_object().ok_or(CodecError::NotAnObject)?;

    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(_) => return Err(CodecError::TypeNotString),
        None => return Err(CodecError::MissingKey("type")),
    };
    let payload = match object.get("payload") {
        Some(Value::Object(payload)) => payload.clone(),
        Some(_) => return Err(CodecError::PayloadNotObject),
        None => return Err(CodecError::MissingKey("payload")),
    };

    Ok(Envelope { kind, payload })
}

/// Reads one frame body from the stream.
///
/// Returns `Ok(None)` when the stream ends cleanly at a frame boundary
/// (the peer closed between messages). End-of-stream in the middle of a
/// declared body surfaces as an I/O error, since the frame was torn.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds maximum {MAX_FRAME_SIZE}"),
        ));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Serializes a typed payload into the envelope's payload map.
pub fn to_payload<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Movement intent carried by `MOVE` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Parses a direction name, falling back to `None` for anything
    /// unrecognized so a bad intent never rejects the whole message.
    pub fn from_name(name: &str) -> Self {
        match name {
            "up" => Direction::Up,
            "down" => Direction::Down,
            "left" => Direction::Left,
            "right" => Direction::Right,
            _ => Direction::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::None => "none",
        }
    }

    /// The velocity this intent resolves to. Screen coordinates: up is
    /// negative y.
    pub fn velocity(&self, speed: f32) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -speed),
            Direction::Down => (0.0, speed),
            Direction::Left => (-speed, 0.0),
            Direction::Right => (speed, 0.0),
            Direction::None => (0.0, 0.0),
        }
    }
}

/// Per-player record as it appears on the wire inside `STATE` broadcasts.
/// Coordinates and velocities are rounded to 2 decimals at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// `MOVE` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePayload {
    pub direction: Direction,
}

/// `STATE` payload: the full player list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    pub players: Vec<PlayerView>,
}

/// `ERROR` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub reason: String,
}

/// Rounds to 2 decimal digits for wire transmission. Lossy, applied only
/// in the state -> wire direction.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
