//! Socket framing for live match traffic: a 4-byte big-endian length
//! followed by one JSON message. The peer must speak this framing; it is not
//! the backend's native realtime transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::events::{GameAction, ServerEvent};

/// Op code carrying game actions and game events.
pub const OP_GAME: u8 = 1;

/// Frames above this size are treated as a broken stream.
pub const MAX_FRAME_LEN: u32 = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
	Authenticate {
		token: String,
	},
	MatchJoin {
		match_id: String,
	},
	MatchLeave {
		match_id: String,
	},
	MatchData {
		match_id: String,
		op_code: u8,
		data: Value,
	},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
	Authenticated {
		user_id: String,
	},
	MatchJoined {
		match_id: String,
	},
	MatchData {
		match_id: String,
		op_code: u8,
		data: Value,
	},
	MatchLeft {
		match_id: String,
	},
	Error {
		message: String,
	},
}

pub fn encode_message<T: Serialize>(msg: &T) -> serde_json::Result<Vec<u8>> {
	let json = serde_json::to_string(msg)?;
	let len = json.len() as u32;
	let mut buf = len.to_be_bytes().to_vec();
	buf.extend(json.as_bytes());
	Ok(buf)
}

pub fn decode_length(buf: &[u8]) -> Option<u32> {
	if buf.len() < 4 {
		return None;
	}
	Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Reads one length-prefixed frame. `Ok(None)` means the peer closed cleanly.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>> {
	let mut header = [0u8; 4];
	match reader.read_exact(&mut header).await {
		Ok(_) => {}
		Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
		Err(e) => return Err(e),
	}

	let len = u32::from_be_bytes(header);
	if len > MAX_FRAME_LEN {
		return Err(std::io::Error::new(
			std::io::ErrorKind::InvalidData,
			format!("frame of {} bytes exceeds limit", len),
		));
	}

	let mut body = vec![0u8; len as usize];
	reader.read_exact(&mut body).await?;
	Ok(Some(body))
}

pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> crate::error::Result<()>
where
	W: AsyncWrite + Unpin,
	T: Serialize,
{
	let data = encode_message(msg)?;
	writer.write_all(&data).await?;
	writer.flush().await?;
	Ok(())
}

/// Builds the match-data payload for an outbound action, tagged with a
/// client id derived from the send time.
pub fn encode_action(action: &GameAction, now_ms: i64) -> serde_json::Result<Value> {
	let mut value = serde_json::to_value(action)?;
	if let Value::Object(map) = &mut value {
		map.insert("cid".to_string(), Value::String(format!("action_{}", now_ms)));
	}
	Ok(value)
}

/// Decodes an inbound `{event, data}` envelope.
///
/// Payloads may arrive as an object or as a JSON string. Capitalized keys are
/// accepted, and a missing `data` means the whole object is the payload.
pub fn decode_envelope(payload: &Value) -> Option<ServerEvent> {
	let parsed;
	let envelope = match payload {
		Value::String(text) => {
			parsed = serde_json::from_str::<Value>(text).ok()?;
			&parsed
		}
		other => other,
	};

	let object = envelope.as_object()?;
	let kind = object
		.get("event")
		.or_else(|| object.get("Event"))
		.and_then(Value::as_str)?;
	let data = object.get("data").or_else(|| object.get("Data")).unwrap_or(envelope);

	Some(ServerEvent::from_parts(kind, data))
}
