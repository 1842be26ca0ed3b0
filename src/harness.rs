//! The match controller: owns the socket connection and the single
//! [`MatchView`], feeds inbound events through the [`Reconciler`], and carries
//! out the effects it requests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::card::{CardColor, CardId};
use crate::config::HarnessSettings;
use crate::countdown::{Countdown, TimeDisplay, now_ms};
use crate::error::{HarnessError, Result};
use crate::event_log::{EventLog, LogLevel, Notification};
use crate::events::{Effect, GameAction, Reconciler, ServerEvent};
use crate::logging;
use crate::mode::{GameMode, MatchType};
use crate::net::client::{MatchSink, SocketClient};
use crate::net::protocol::{OP_GAME, ServerMessage, decode_envelope, encode_action};
use crate::session::{AppContext, MatchService};
use crate::view::MatchView;

/// How long to wait for the server to confirm authentication or a match join.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MatchController {
	socket: SocketClient,
	sink: Arc<dyn MatchSink>,
	service: Arc<dyn MatchService>,
	reconciler: Reconciler,
	view: MatchView,
	countdown: Countdown,
	log: EventLog,
	settings: HarnessSettings,
	pending_acks: Vec<JoinHandle<()>>,
	selected_card: Option<CardId>,
	connected: bool,
}

impl MatchController {
	/// Connects and authenticates the socket for an established session.
	pub async fn connect(ctx: &AppContext) -> Result<Self> {
		let socket = SocketClient::connect(&ctx.config.server.socket_addr()).await?;
		let service: Arc<dyn MatchService> = Arc::new(ctx.clone());
		let mut controller = Self::new(socket, service, ctx.user_id(), ctx.config.harness.clone());
		controller.authenticate(&ctx.session.token).await?;
		Ok(controller)
	}

	pub fn new(
		socket: SocketClient,
		service: Arc<dyn MatchService>,
		my_user_id: &str,
		settings: HarnessSettings,
	) -> Self {
		let sink: Arc<dyn MatchSink> = Arc::new(socket.sender());
		Self {
			socket,
			sink,
			service,
			reconciler: Reconciler::new(my_user_id),
			view: MatchView::new(),
			countdown: Countdown::new(),
			log: EventLog::new(settings.event_log_limit, settings.notification_ttl_ms),
			settings,
			pending_acks: Vec::new(),
			selected_card: None,
			connected: true,
		}
	}

	pub fn view(&self) -> &MatchView {
		&self.view
	}

	pub fn log(&self) -> &EventLog {
		&self.log
	}

	pub fn my_user_id(&self) -> &str {
		self.reconciler.my_user_id()
	}

	pub fn is_connected(&self) -> bool {
		self.connected
	}

	pub fn match_id(&self) -> Option<&str> {
		self.view.match_id.as_deref()
	}

	pub fn time_display(&self) -> TimeDisplay {
		self.countdown.display()
	}

	pub fn countdown(&self) -> &Countdown {
		&self.countdown
	}

	pub fn is_my_turn(&self) -> bool {
		self.view.is_my_turn(self.my_user_id())
	}

	pub fn selected_card(&self) -> Option<CardId> {
		self.selected_card
	}

	pub fn select_card(&mut self, card: Option<CardId>) {
		self.selected_card = card;
	}

	pub fn pending_acks(&self) -> usize {
		self.pending_acks.iter().filter(|t| !t.is_finished()).count()
	}

	/// Drops notifications past their lifetime.
	pub fn tick(&mut self) {
		self.log.expire();
		self.pending_acks.retain(|t| !t.is_finished());
	}

	pub fn take_notifications(&mut self) -> Vec<Notification> {
		self.log.take_notifications()
	}

	pub fn notify(&mut self, message: impl Into<String>, level: LogLevel) {
		let message = message.into();
		self.log.push("notice", message.clone(), level, None);
		self.log.notify(message, level);
	}

	async fn authenticate(&mut self, token: &str) -> Result<()> {
		self.socket.authenticate(token).await?;
		loop {
			match self.recv_handshake().await? {
				ServerMessage::Authenticated { user_id } => {
					if user_id != self.my_user_id() {
						tracing::warn!(server = %user_id, local = %self.my_user_id(), "socket identity differs from session");
					}
					self.log.push("socket", "Socket authenticated", LogLevel::Success, None);
					return Ok(());
				}
				ServerMessage::Error { message } => return Err(HarnessError::rpc("authenticate", message)),
				other => self.handle_message(other),
			}
		}
	}

	async fn recv_handshake(&mut self) -> Result<ServerMessage> {
		match tokio::time::timeout(HANDSHAKE_TIMEOUT, self.socket.recv()).await {
			Ok(Some(msg)) => Ok(msg),
			Ok(None) => {
				self.connected = false;
				Err(HarnessError::NotConnected)
			}
			Err(_) => Err(HarnessError::Io(std::io::Error::new(
				std::io::ErrorKind::TimedOut,
				"no reply from server",
			))),
		}
	}

	/// Creates a match (or finds a random one) and joins it.
	pub async fn create_match(&mut self, mode: GameMode, match_type: MatchType) -> Result<String> {
		let match_id = match match_type {
			MatchType::Private => self.service.create_match(mode).await,
			MatchType::Random => self.service.find_random_match(mode).await.map(|found| {
				let verb = if found.created { "Created" } else { "Found" };
				self.log.info("matchmaking", format!("{} random {} match", verb, mode.display_name()));
				found.match_id
			}),
		}
		.inspect_err(|e| self.notify(format!("Match creation failed: {}", e), LogLevel::Error))?;

		self.join_match(&match_id).await?;
		Ok(match_id)
	}

	/// Socket-level join. The view is only populated once the server confirms.
	pub async fn join_match(&mut self, match_id: &str) -> Result<()> {
		if match_id.trim().is_empty() {
			return Err(HarnessError::InvalidArgument("match id is required".to_string()));
		}
		if self.view.match_id.is_some() {
			self.leave_match().await?;
		}

		self.socket.join_match(match_id).await?;
		let mut early = Vec::new();
		loop {
			match self.recv_handshake().await? {
				ServerMessage::MatchJoined { match_id: joined } if joined == match_id => break,
				ServerMessage::Error { message } => {
					self.notify(format!("Join failed: {}", message), LogLevel::Error);
					return Err(HarnessError::rpc("match_join", message));
				}
				ServerMessage::MatchData { match_id: id, op_code, data } if id == match_id => {
					early.push((op_code, data));
				}
				other => self.handle_message(other),
			}
		}

		self.clear_match_state();
		self.view.match_id = Some(match_id.to_string());
		logging::set_match_id(Some(match_id));
		self.log.push("match_joined", format!("Joined match {}", match_id), LogLevel::Success, None);

		for (op_code, data) in early {
			self.handle_match_data(op_code, &data);
		}
		Ok(())
	}

	pub async fn add_bot(&mut self) -> Result<Value> {
		let match_id = self.match_id().ok_or(HarnessError::NoMatch)?.to_string();
		match self.service.add_bot(&match_id).await {
			Ok(result) => {
				self.log.push("bot_added", "Bot added", LogLevel::Success, Some(result.clone()));
				Ok(result)
			}
			Err(e) => {
				self.notify(format!("Add bot failed: {}", e), LogLevel::Error);
				Err(e)
			}
		}
	}

	pub async fn leave_match(&mut self) -> Result<()> {
		let Some(match_id) = self.view.match_id.clone() else {
			return Ok(());
		};
		let sent = self.socket.leave_match(&match_id).await;
		self.clear_match_state();
		logging::set_match_id(None);
		self.log.info("match_left", format!("Left match {}", match_id));
		sent
	}

	pub async fn disconnect(&mut self) {
		self.clear_match_state();
		logging::set_match_id(None);
		self.socket.disconnect().await;
		self.connected = false;
	}

	/// Cancels timers and pending acks, and empties the view.
	fn clear_match_state(&mut self) {
		self.countdown.reset();
		for task in self.pending_acks.drain(..) {
			task.abort();
		}
		self.selected_card = None;
		self.view.reset();
	}

	pub async fn start_game(&mut self) -> Result<()> {
		self.send_action(GameAction::StartGame).await
	}

	pub async fn play_card(&mut self, card: CardId, color: Option<CardColor>) -> Result<()> {
		if let Some(info) = card.info() {
			if info.needs_color() && color.is_none() {
				return Err(HarnessError::InvalidArgument(format!("{} needs a color", info.name())));
			}
		}
		let result = self.send_action(GameAction::play_card(card, color)).await;
		if result.is_ok() {
			self.selected_card = None;
		}
		result
	}

	pub async fn draw_card(&mut self) -> Result<()> {
		self.send_action(GameAction::DrawCard).await
	}

	pub async fn choose_swap_target(&mut self, target_user_id: &str) -> Result<()> {
		self.send_action(GameAction::ChooseSwapTarget {
			target_user_id: target_user_id.to_string(),
		})
		.await
	}

	pub async fn play_shield(&mut self) -> Result<()> {
		self.send_action(GameAction::PlayShield).await
	}

	pub async fn autoplay_turn(&mut self) -> Result<()> {
		self.send_action(GameAction::AutoplayTurn).await
	}

	/// Sends an action for the current match. Failures become notifications
	/// and never touch the view.
	pub async fn send_action(&mut self, action: GameAction) -> Result<()> {
		let match_id = self.match_id().ok_or(HarnessError::NoMatch)?.to_string();
		let data = encode_action(&action, now_ms())?;

		match self.sink.send_match_data(&match_id, OP_GAME, data).await {
			Ok(()) => {
				logging::actions::sent(action.name(), &match_id);
				self.log.push(action.name(), format!("Sent: {}", action.description()), LogLevel::Info, None);
				Ok(())
			}
			Err(e) => {
				logging::actions::failed(action.name(), &e.to_string());
				self.notify(format!("Failed to {}: {}", action.description(), e), LogLevel::Error);
				Err(e)
			}
		}
	}

	/// Waits for the next server message and applies it. Returns `false` once
	/// the connection has closed.
	pub async fn process_next(&mut self) -> bool {
		match self.socket.recv().await {
			Some(msg) => {
				self.handle_message(msg);
				true
			}
			None => {
				self.on_connection_lost();
				false
			}
		}
	}

	/// Applies every message already received without waiting.
	pub fn drain(&mut self) -> usize {
		let mut handled = 0;
		while let Some(msg) = self.socket.try_recv() {
			self.handle_message(msg);
			handled += 1;
		}
		handled
	}

	fn on_connection_lost(&mut self) {
		if self.connected {
			self.connected = false;
			self.clear_match_state();
			logging::set_match_id(None);
			self.notify("Disconnected from server", LogLevel::Error);
		}
	}

	pub fn handle_message(&mut self, msg: ServerMessage) {
		match msg {
			ServerMessage::MatchData { match_id, op_code, data } => {
				if self.match_id() == Some(match_id.as_str()) {
					self.handle_match_data(op_code, &data);
				} else {
					tracing::debug!(%match_id, "match data for another match dropped");
				}
			}
			ServerMessage::MatchLeft { match_id } => {
				if self.match_id() == Some(match_id.as_str()) {
					self.clear_match_state();
					logging::set_match_id(None);
					self.notify("Removed from match", LogLevel::Warning);
				}
			}
			ServerMessage::Error { message } => {
				self.notify(format!("Server error: {}", message), LogLevel::Error);
			}
			other @ (ServerMessage::Authenticated { .. } | ServerMessage::MatchJoined { .. }) => {
				tracing::debug!(?other, "late handshake reply ignored");
			}
		}
	}

	fn handle_match_data(&mut self, op_code: u8, data: &Value) {
		if op_code != OP_GAME {
			tracing::debug!(op_code, "unhandled op code");
			return;
		}
		match decode_envelope(data) {
			Some(event) => self.apply_event(event),
			None => logging::net::frame_dropped("undecodable event envelope"),
		}
	}

	pub fn apply_event(&mut self, event: ServerEvent) {
		self.log.push(event.kind(), format!("Event: {}", event.kind()), LogLevel::Info, None);
		let effects = self.reconciler.apply(&mut self.view, &event);
		for effect in effects {
			self.run_effect(effect);
		}
	}

	fn run_effect(&mut self, effect: Effect) {
		match effect {
			Effect::Notify(message) => self.notify(message, LogLevel::Info),
			Effect::Joined => {
				let id = self.match_id().unwrap_or("-").to_string();
				self.notify(format!("Joined match {}", id), LogLevel::Success);
			}
			Effect::AnimationBarrier { event_id } => self.schedule_animation_ack(event_id),
			Effect::StartCountdown { deadline_ms } => self.countdown.start(deadline_ms),
			Effect::ClearSelection => self.selected_card = None,
		}
	}

	fn schedule_animation_ack(&mut self, event_id: Value) {
		let Some(match_id) = self.match_id().map(str::to_string) else {
			return;
		};
		let sink = self.sink.clone();
		let delay = Duration::from_millis(self.settings.animation_delay_ms);

		self.pending_acks.retain(|t| !t.is_finished());
		self.pending_acks.push(tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			let label = match &event_id {
				Value::String(s) => s.clone(),
				other => other.to_string(),
			};
			let action = GameAction::AnimationComplete { event_id };
			let sent = match encode_action(&action, now_ms()) {
				Ok(data) => sink.send_match_data(&match_id, OP_GAME, data).await,
				Err(e) => Err(e.into()),
			};
			match sent {
				Ok(()) => logging::actions::animation_ack(&label),
				Err(e) => logging::actions::failed(action.name(), &e.to_string()),
			}
		}));
	}
}

impl Drop for MatchController {
	fn drop(&mut self) {
		for task in &self.pending_acks {
			task.abort();
		}
	}
}
