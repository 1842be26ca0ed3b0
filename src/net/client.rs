use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::error::{HarnessError, Result};
use crate::logging;
use crate::net::protocol::*;

/// Outbound half of the match connection.
#[async_trait]
pub trait MatchSink: Send + Sync {
	async fn send_match_data(&self, match_id: &str, op_code: u8, data: Value) -> Result<()>;
}

/// Cloneable writer shared by the controller and the tasks it spawns.
#[derive(Clone)]
pub struct SocketSender {
	writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
}

impl SocketSender {
	pub async fn send(&self, msg: &ClientMessage) -> Result<()> {
		let mut guard = self.writer.lock().await;
		let writer = guard.as_mut().ok_or(HarnessError::NotConnected)?;
		if let Err(e) = write_message(writer, msg).await {
			*guard = None;
			return Err(e);
		}
		Ok(())
	}

	pub async fn close(&self) {
		self.writer.lock().await.take();
	}
}

#[async_trait]
impl MatchSink for SocketSender {
	async fn send_match_data(&self, match_id: &str, op_code: u8, data: Value) -> Result<()> {
		self.send(&ClientMessage::MatchData {
			match_id: match_id.to_string(),
			op_code,
			data,
		})
		.await
	}
}

pub struct SocketClient {
	sender: SocketSender,
	rx: mpsc::UnboundedReceiver<ServerMessage>,
	reader: JoinHandle<()>,
}

impl SocketClient {
	pub async fn connect(addr: &str) -> Result<Self> {
		let stream = TcpStream::connect(addr).await?;
		stream.set_nodelay(true)?;
		logging::net::connected(addr);

		let (read_half, write_half) = stream.into_split();
		let (tx, rx) = mpsc::unbounded_channel();
		let reader = tokio::spawn(read_loop(read_half, tx));

		Ok(Self {
			sender: SocketSender {
				writer: Arc::new(Mutex::new(Some(write_half))),
			},
			rx,
			reader,
		})
	}

	pub fn sender(&self) -> SocketSender {
		self.sender.clone()
	}

	pub async fn send(&self, msg: &ClientMessage) -> Result<()> {
		self.sender.send(msg).await
	}

	/// Waits for the next server message. `None` once the connection is gone.
	pub async fn recv(&mut self) -> Option<ServerMessage> {
		self.rx.recv().await
	}

	pub fn try_recv(&mut self) -> Option<ServerMessage> {
		self.rx.try_recv().ok()
	}

	pub async fn authenticate(&self, token: &str) -> Result<()> {
		self.send(&ClientMessage::Authenticate {
			token: token.to_string(),
		})
		.await
	}

	pub async fn join_match(&self, match_id: &str) -> Result<()> {
		self.send(&ClientMessage::MatchJoin {
			match_id: match_id.to_string(),
		})
		.await
	}

	pub async fn leave_match(&self, match_id: &str) -> Result<()> {
		self.send(&ClientMessage::MatchLeave {
			match_id: match_id.to_string(),
		})
		.await
	}

	pub async fn disconnect(&mut self) {
		self.sender.close().await;
		self.reader.abort();
		logging::net::disconnected("client closed");
	}
}

impl Drop for SocketClient {
	fn drop(&mut self) {
		self.reader.abort();
	}
}

async fn read_loop(mut reader: OwnedReadHalf, tx: mpsc::UnboundedSender<ServerMessage>) {
	loop {
		match read_frame(&mut reader).await {
			Ok(Some(frame)) => match serde_json::from_slice::<ServerMessage>(&frame) {
				Ok(msg) => {
					if tx.send(msg).is_err() {
						return;
					}
				}
				Err(e) => logging::net::frame_dropped(&e.to_string()),
			},
			Ok(None) => {
				logging::net::disconnected("server closed connection");
				return;
			}
			Err(e) => {
				logging::net::disconnected(&e.to_string());
				return;
			}
		}
	}
}
