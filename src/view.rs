use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::card::{CardColor, CardId};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
	pub user_id: String,
	pub username: String,
	pub hand_size: u32,
	pub is_bot: bool,
	pub is_connected: bool,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl PlayerView {
	pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
		Self {
			user_id: user_id.into(),
			username: username.into(),
			is_connected: true,
			..Default::default()
		}
	}

	pub fn from_value(value: &Value) -> Option<Self> {
		let patch = value.as_object()?;
		let mut player = PlayerView::default();
		player.apply_patch(patch);
		Some(player)
	}

	/// Field-by-field merge. Values of the wrong type leave the field alone.
	pub fn apply_patch(&mut self, patch: &Map<String, Value>) {
		for (key, value) in patch {
			match key.as_str() {
				"userId" => {
					if let Some(id) = value.as_str() {
						self.user_id = id.to_string();
					}
				}
				"username" => {
					if let Some(name) = value.as_str() {
						self.username = name.to_string();
					}
				}
				"handSize" => {
					if let Some(size) = value.as_u64() {
						self.hand_size = size as u32;
					}
				}
				"isBot" => {
					if let Some(flag) = value.as_bool() {
						self.is_bot = flag;
					}
				}
				"isConnected" => {
					if let Some(flag) = value.as_bool() {
						self.is_connected = flag;
					}
				}
				_ => {
					self.extra.insert(key.clone(), value.clone());
				}
			}
		}
	}

	pub fn display_name(&self) -> &str {
		if self.username.is_empty() { &self.user_id } else { &self.username }
	}

	pub fn has_uno(&self) -> bool {
		self.hand_size == 1
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
	pub score: i64,
	pub username: Option<String>,
}

impl ScoreEntry {
	/// Scores arrive either as a bare number or as `{score, username}`.
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::Number(n) => n.as_i64().map(|score| ScoreEntry { score, username: None }),
			Value::Object(map) => {
				let score = map.get("score").and_then(Value::as_i64)?;
				let username = map.get("username").and_then(Value::as_str).map(str::to_string);
				Some(ScoreEntry { score, username })
			}
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
	pub match_id: Option<String>,
	pub game_mode: Option<String>,
	pub match_type: Option<String>,

	pub players: Vec<PlayerView>,
	#[serde(rename = "currentPlayer")]
	pub current_player_index: Option<usize>,
	pub current_player_name: Option<String>,

	pub is_game_started: bool,

	pub my_hand: Vec<CardId>,
	pub top_discard_card: Option<CardId>,
	pub current_color: Option<CardColor>,
	pub playable_cards: Vec<CardId>,

	pub turn_end_time: Option<i64>,
	pub time_left: u64,

	pub draw_stack: u32,
	pub red_fury_active: bool,
	pub shield_window_active: bool,
	pub swap_request_active: bool,
	pub available_swap_targets: Vec<String>,

	pub scores: BTreeMap<String, ScoreEntry>,
	pub winner: Option<String>,
	pub game_ended: bool,

	#[serde(skip)]
	pub join_announced: bool,
	pub extra: BTreeMap<String, Value>,
}

impl MatchView {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}

	pub fn current_player(&self) -> Option<&PlayerView> {
		self.current_player_index.and_then(|i| self.players.get(i))
	}

	pub fn player(&self, user_id: &str) -> Option<&PlayerView> {
		self.players.iter().find(|p| p.user_id == user_id)
	}

	pub fn player_mut(&mut self, user_id: &str) -> Option<&mut PlayerView> {
		self.players.iter_mut().find(|p| p.user_id == user_id)
	}

	pub fn player_name<'a>(&'a self, user_id: &'a str) -> &'a str {
		self.player(user_id).map(|p| p.display_name()).unwrap_or(user_id)
	}

	/// Keeps the previous name when the index does not resolve.
	pub fn recompute_current_player_name(&mut self) {
		if let Some(name) = self.current_player().map(|p| p.username.clone()) {
			self.current_player_name = Some(name);
		}
	}

	pub fn is_my_turn(&self, my_user_id: &str) -> bool {
		self.current_player().map(|p| p.user_id == my_user_id).unwrap_or(false)
	}

	/// Playable hints are only shown to the local user on their own turn.
	pub fn playable_hint(&self, my_user_id: &str) -> &[CardId] {
		if self.is_my_turn(my_user_id) { &self.playable_cards[..] } else { &[] }
	}

	pub fn is_playable(&self, card: CardId, my_user_id: &str) -> bool {
		self.playable_hint(my_user_id).contains(&card)
	}

	pub fn opponents<'a>(&'a self, my_user_id: &'a str) -> impl Iterator<Item = &'a PlayerView> + 'a {
		self.players.iter().filter(move |p| p.user_id != my_user_id)
	}

	/// Score lines resolved to display names, highest first.
	pub fn score_lines(&self) -> Vec<(String, i64)> {
		let mut lines: Vec<(String, i64)> = self
			.scores
			.iter()
			.map(|(user_id, entry)| {
				let name = entry
					.username
					.clone()
					.unwrap_or_else(|| self.player_name(user_id).to_string());
				(name, entry.score)
			})
			.collect();
		lines.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
		lines
	}
}
