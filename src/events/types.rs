use serde::Serialize;
use serde_json::{Map, Value};

use crate::card::{CardColor, CardId};
use crate::view::PlayerView;

/// Lenient field readers. A missing or mistyped field reads as `None`.
pub(crate) mod fields {
	use super::*;

	pub fn string(data: &Value, key: &str) -> Option<String> {
		data.get(key).and_then(Value::as_str).map(str::to_string)
	}

	pub fn int(data: &Value, key: &str) -> Option<i64> {
		data.get(key).and_then(Value::as_i64)
	}

	pub fn uint(data: &Value, key: &str) -> Option<u64> {
		data.get(key).and_then(Value::as_u64)
	}

	pub fn boolean(data: &Value, key: &str) -> Option<bool> {
		data.get(key).and_then(Value::as_bool)
	}

	pub fn cards(data: &Value, key: &str) -> Option<Vec<CardId>> {
		data.get(key)
			.and_then(Value::as_array)
			.map(|items| items.iter().filter_map(CardId::from_value).collect())
	}

	pub fn card(data: &Value, key: &str) -> Option<CardId> {
		data.get(key).and_then(CardId::from_value)
	}

	pub fn color(data: &Value, key: &str) -> Option<CardColor> {
		data.get(key).and_then(CardColor::from_value)
	}

	pub fn players(data: &Value, key: &str) -> Option<Vec<PlayerView>> {
		data.get(key)
			.and_then(Value::as_array)
			.map(|items| items.iter().filter_map(PlayerView::from_value).collect())
	}

	/// User ids given either as strings or as objects with a `userId`.
	pub fn user_ids(data: &Value, key: &str) -> Option<Vec<String>> {
		data.get(key).and_then(Value::as_array).map(|items| {
			items
				.iter()
				.filter_map(|item| match item {
					Value::String(id) => Some(id.clone()),
					Value::Object(map) => map.get("userId").and_then(Value::as_str).map(str::to_string),
					_ => None,
				})
				.collect()
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerJoined {
	pub player_id: Option<String>,
	/// The player's fields as sent, keyed by wire name.
	pub patch: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LobbyState {
	pub players: Option<Vec<PlayerView>>,
	pub game_mode: Option<String>,
	pub match_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameStarted {
	pub current_player: Option<usize>,
	pub username: Option<String>,
	pub turn_end_time: Option<i64>,
	pub time_left: Option<u64>,
	pub top_discard_card: Option<CardId>,
	pub current_color: Option<CardColor>,
	pub players: Option<Vec<PlayerView>>,
}

/// Shared payload of `card_played` and `card_drawn`.
#[derive(Debug, Clone, PartialEq)]
pub struct CardMove {
	pub player_id: Option<String>,
	pub player_name: Option<String>,
	pub card_id: Option<CardId>,
	pub top_discard_card: Option<CardId>,
	pub current_color: Option<CardColor>,
	pub draw_stack: Option<u32>,
	pub new_hand_size: Option<u32>,
	pub new_hand: Option<Vec<CardId>>,
	pub cards_drawn: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateDelta {
	pub changes: Map<String, Value>,
	pub event_type: Option<String>,
	pub version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameEnded {
	pub winner: Option<String>,
	pub scores: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
	PlayerJoined(PlayerJoined),
	LobbyState(LobbyState),
	MatchReady,
	CardsDistributed { event_id: Option<Value> },
	GameStarted(GameStarted),
	PrivateHand { hand: Option<Vec<CardId>> },
	PlayableCards { player_id: Option<String>, playable_cards: Option<Vec<CardId>> },
	CardPlayed(CardMove),
	CardDrawn(CardMove),
	StateDelta(StateDelta),
	TimerSync { turn_end_time: Option<i64>, time_left: Option<u64> },
	SwapRequest { player_id: Option<String>, available_targets: Option<Vec<String>> },
	SwapSelectionPending { message: Option<String> },
	SwapComplete { requester: Option<String>, target: Option<String> },
	SwapTimeout { message: Option<String> },
	GameEnded(GameEnded),
	PlayerLeft { player_id: Option<String>, player_name: Option<String> },
	Unknown { kind: String, data: Value },
}

impl ServerEvent {
	pub fn from_parts(kind: &str, data: &Value) -> Self {
		use fields::*;

		match kind {
			"player_joined" => {
				let player_id = string(data, "playerId").or_else(|| string(data, "userId"));
				let mut patch = data.as_object().cloned().unwrap_or_default();
				patch.remove("playerId");
				if let Some(id) = &player_id {
					patch.insert("userId".to_string(), Value::String(id.clone()));
				}
				ServerEvent::PlayerJoined(PlayerJoined { player_id, patch })
			}
			"lobby_state" => ServerEvent::LobbyState(LobbyState {
				players: players(data, "players"),
				game_mode: string(data, "gameMode"),
				match_type: string(data, "matchType"),
			}),
			"match_ready" => ServerEvent::MatchReady,
			"cards_distributed" => ServerEvent::CardsDistributed {
				event_id: data.get("eventId").filter(|v| !v.is_null()).cloned(),
			},
			"game_started" => {
				let state = data.get("gameState").cloned().unwrap_or(Value::Null);
				ServerEvent::GameStarted(GameStarted {
					current_player: uint(data, "currentPlayer").map(|i| i as usize),
					username: string(data, "username"),
					turn_end_time: int(data, "turnEndTime"),
					time_left: uint(data, "timeLeft"),
					top_discard_card: card(&state, "topDiscardCard"),
					current_color: color(&state, "currentColor"),
					players: players(&state, "players"),
				})
			}
			"private_hand" => ServerEvent::PrivateHand { hand: cards(data, "hand") },
			"playable_cards" => ServerEvent::PlayableCards {
				player_id: string(data, "playerId"),
				playable_cards: cards(data, "playableCards"),
			},
			"card_played" => ServerEvent::CardPlayed(CardMove::from_value(data)),
			"card_drawn" => ServerEvent::CardDrawn(CardMove::from_value(data)),
			"state_delta" => ServerEvent::StateDelta(StateDelta {
				changes: data.get("changes").and_then(Value::as_object).cloned().unwrap_or_default(),
				event_type: string(data, "eventType"),
				version: uint(data, "version"),
			}),
			"timer_sync" => ServerEvent::TimerSync {
				turn_end_time: int(data, "turnEndTime"),
				time_left: uint(data, "timeLeft"),
			},
			"swap_request" => ServerEvent::SwapRequest {
				player_id: string(data, "playerId"),
				available_targets: user_ids(data, "availableTargets"),
			},
			"swap_selection_pending" => ServerEvent::SwapSelectionPending { message: string(data, "message") },
			"swap_complete" => ServerEvent::SwapComplete {
				requester: string(data, "requester"),
				target: string(data, "target"),
			},
			"swap_timeout" => ServerEvent::SwapTimeout { message: string(data, "message") },
			"game_ended" => ServerEvent::GameEnded(GameEnded {
				winner: string(data, "winnerName").or_else(|| string(data, "winner")),
				scores: data.get("scores").and_then(Value::as_object).cloned(),
			}),
			"player_left" => ServerEvent::PlayerLeft {
				player_id: string(data, "playerId"),
				player_name: string(data, "playerName"),
			},
			other => ServerEvent::Unknown {
				kind: other.to_string(),
				data: data.clone(),
			},
		}
	}

	pub fn kind(&self) -> &str {
		match self {
			ServerEvent::PlayerJoined(_) => "player_joined",
			ServerEvent::LobbyState(_) => "lobby_state",
			ServerEvent::MatchReady => "match_ready",
			ServerEvent::CardsDistributed { .. } => "cards_distributed",
			ServerEvent::GameStarted(_) => "game_started",
			ServerEvent::PrivateHand { .. } => "private_hand",
			ServerEvent::PlayableCards { .. } => "playable_cards",
			ServerEvent::CardPlayed(_) => "card_played",
			ServerEvent::CardDrawn(_) => "card_drawn",
			ServerEvent::StateDelta(_) => "state_delta",
			ServerEvent::TimerSync { .. } => "timer_sync",
			ServerEvent::SwapRequest { .. } => "swap_request",
			ServerEvent::SwapSelectionPending { .. } => "swap_selection_pending",
			ServerEvent::SwapComplete { .. } => "swap_complete",
			ServerEvent::SwapTimeout { .. } => "swap_timeout",
			ServerEvent::GameEnded(_) => "game_ended",
			ServerEvent::PlayerLeft { .. } => "player_left",
			ServerEvent::Unknown { kind, .. } => kind,
		}
	}
}

impl CardMove {
	pub fn from_value(data: &Value) -> Self {
		use fields::*;

		Self {
			player_id: string(data, "playerId"),
			player_name: string(data, "playerName"),
			card_id: card(data, "cardId"),
			top_discard_card: card(data, "topDiscardCard"),
			current_color: color(data, "currentColor"),
			draw_stack: uint(data, "drawStack").map(|n| n as u32),
			new_hand_size: uint(data, "newHandSize").map(|n| n as u32),
			new_hand: cards(data, "newHand"),
			cards_drawn: uint(data, "cardsDrawn").map(|n| n as u32),
		}
	}
}

/// Outbound game actions, sent as match data for the current match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GameAction {
	AnimationComplete {
		#[serde(rename = "eventId")]
		event_id: Value,
	},
	StartGame,
	PlayCard {
		#[serde(rename = "cardId")]
		card_id: CardId,
		#[serde(skip_serializing_if = "Option::is_none")]
		color: Option<u8>,
	},
	DrawCard,
	ChooseSwapTarget {
		#[serde(rename = "targetUserId")]
		target_user_id: String,
	},
	PlayShield,
	AutoplayTurn,
}

impl GameAction {
	pub fn play_card(card_id: CardId, color: Option<CardColor>) -> Self {
		GameAction::PlayCard {
			card_id,
			color: color.map(|c| c.index()),
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			GameAction::AnimationComplete { .. } => "animation_complete",
			GameAction::StartGame => "start_game",
			GameAction::PlayCard { .. } => "play_card",
			GameAction::DrawCard => "draw_card",
			GameAction::ChooseSwapTarget { .. } => "choose_swap_target",
			GameAction::PlayShield => "play_shield",
			GameAction::AutoplayTurn => "autoplay_turn",
		}
	}

	pub fn description(&self) -> String {
		match self {
			GameAction::AnimationComplete { .. } => "animation complete".to_string(),
			GameAction::StartGame => "start game".to_string(),
			GameAction::PlayCard { card_id, color: Some(color) } => {
				let color = CardColor::from_index(u64::from(*color)).map(|c| c.name()).unwrap_or("?");
				format!("play {} as {}", card_id.name(), color)
			}
			GameAction::PlayCard { card_id, color: None } => format!("play {}", card_id.name()),
			GameAction::DrawCard => "draw card".to_string(),
			GameAction::ChooseSwapTarget { target_user_id } => format!("swap hands with {}", target_user_id),
			GameAction::PlayShield => "play shield".to_string(),
			GameAction::AutoplayTurn => "auto-play turn".to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_unknown_kind_is_kept() {
		let event = ServerEvent::from_parts("confetti", &json!({"x": 1}));
		assert_eq!(event.kind(), "confetti");
		assert!(matches!(event, ServerEvent::Unknown { .. }));
	}

	#[test]
	fn test_state_delta_fields() {
		let event = ServerEvent::from_parts(
			"state_delta",
			&json!({"changes": {"drawStack": 2}, "eventType": "turn_change", "version": 14}),
		);
		let ServerEvent::StateDelta(delta) = event else {
			panic!("expected state_delta");
		};
		assert_eq!(delta.event_type.as_deref(), Some("turn_change"));
		assert_eq!(delta.version, Some(14));
		assert_eq!(delta.changes.get("drawStack"), Some(&json!(2)));
	}

	#[test]
	fn test_card_played_fields() {
		let event = ServerEvent::from_parts(
			"card_played",
			&json!({"playerId": "u1", "cardId": 12, "newHandSize": 4, "currentColor": 1, "drawStack": "x"}),
		);
		let ServerEvent::CardPlayed(played) = event else {
			panic!("expected card_played");
		};
		assert_eq!(played.player_id.as_deref(), Some("u1"));
		assert_eq!(played.card_id, Some(CardId(12)));
		assert_eq!(played.new_hand_size, Some(4));
		assert_eq!(played.current_color, Some(CardColor::Blue));
		assert_eq!(played.draw_stack, None);
	}

	#[test]
	fn test_game_started_reads_nested_state() {
		let event = ServerEvent::from_parts(
			"game_started",
			&json!({
				"currentPlayer": 1,
				"turnEndTime": 5000,
				"gameState": {"topDiscardCard": {"id": 40}, "players": [{"userId": "a"}, {"userId": "b"}]}
			}),
		);
		let ServerEvent::GameStarted(started) = event else {
			panic!("expected game_started");
		};
		assert_eq!(started.current_player, Some(1));
		assert_eq!(started.top_discard_card, Some(CardId(40)));
		assert_eq!(started.players.map(|p| p.len()), Some(2));
		assert_eq!(started.current_color, None);
	}

	#[test]
	fn test_non_array_hand_reads_as_none() {
		let event = ServerEvent::from_parts("private_hand", &json!({"hand": "oops"}));
		assert_eq!(event, ServerEvent::PrivateHand { hand: None });
	}

	#[test]
	fn test_player_joined_patch_takes_player_id() {
		let event = ServerEvent::from_parts("player_joined", &json!({"playerId": "u9", "username": "Nia"}));
		let ServerEvent::PlayerJoined(joined) = event else {
			panic!("expected player_joined");
		};
		assert_eq!(joined.player_id.as_deref(), Some("u9"));
		assert_eq!(joined.patch.get("userId"), Some(&json!("u9")));
		assert_eq!(joined.patch.get("username"), Some(&json!("Nia")));
		assert!(!joined.patch.contains_key("playerId"));
	}

	#[test]
	fn test_swap_targets_accept_objects() {
		let event = ServerEvent::from_parts(
			"swap_request",
			&json!({"playerId": "me", "availableTargets": ["a", {"userId": "b"}, 3]}),
		);
		assert_eq!(
			event,
			ServerEvent::SwapRequest {
				player_id: Some("me".to_string()),
				available_targets: Some(vec!["a".to_string(), "b".to_string()]),
			}
		);
	}

	#[test]
	fn test_action_serialization() {
		let json = serde_json::to_value(GameAction::play_card(CardId(101), Some(CardColor::Green))).unwrap();
		assert_eq!(json, json!({"action": "play_card", "cardId": 101, "color": 2}));

		let json = serde_json::to_value(GameAction::play_card(CardId(5), None)).unwrap();
		assert_eq!(json, json!({"action": "play_card", "cardId": 5}));

		let json = serde_json::to_value(GameAction::ChooseSwapTarget { target_user_id: "u2".to_string() }).unwrap();
		assert_eq!(json, json!({"action": "choose_swap_target", "targetUserId": "u2"}));

		let json = serde_json::to_value(GameAction::AutoplayTurn).unwrap();
		assert_eq!(json, json!({"action": "autoplay_turn"}));
	}

	#[test]
	fn test_action_description() {
		assert_eq!(GameAction::DrawCard.description(), "draw card");
		assert_eq!(GameAction::play_card(CardId(0), None).description(), "play Red 0");
	}
}
