use serde_json::{Map, Value};

use crate::card::{CardColor, CardId};
use crate::events::types::*;
use crate::logging;
use crate::view::{MatchView, PlayerView, ScoreEntry};

/// Seconds granted when a game starts without announcing a turn length.
const DEFAULT_TURN_SECS: u64 = 60;

/// Keys a `state_delta` may never touch. `playableCards` belongs to the
/// `playable_cards` event; the terminal fields belong to `game_ended`.
const DELTA_EXCLUDED: [&str; 4] = ["playableCards", "winner", "scores", "gameEnded"];

/// Side effects requested by the reconciler and carried out by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
	Notify(String),
	Joined,
	AnimationBarrier { event_id: Value },
	StartCountdown { deadline_ms: i64 },
	ClearSelection,
}

/// Folds server events into a [`MatchView`].
///
/// The local user id is fixed for the life of the reconciler, so player-scoped
/// events are filtered against the identity the session started with.
pub struct Reconciler {
	my_user_id: String,
}

impl Reconciler {
	pub fn new(my_user_id: impl Into<String>) -> Self {
		Self {
			my_user_id: my_user_id.into(),
		}
	}

	pub fn my_user_id(&self) -> &str {
		&self.my_user_id
	}

	fn is_me(&self, user_id: Option<&str>) -> bool {
		user_id == Some(self.my_user_id.as_str())
	}

	pub fn apply(&mut self, view: &mut MatchView, event: &ServerEvent) -> Vec<Effect> {
		logging::reconciler::event(event.kind());
		let mut effects = Vec::new();

		match event {
			ServerEvent::PlayerJoined(joined) => {
				if let Some(id) = &joined.player_id {
					match view.player_mut(id) {
						Some(existing) => existing.apply_patch(&joined.patch),
						None => {
							let mut player = PlayerView::new(id.clone(), String::new());
							player.apply_patch(&joined.patch);
							view.players.push(player);
						}
					}
				}

				if self.is_me(joined.player_id.as_deref()) {
					if !view.join_announced {
						view.join_announced = true;
						effects.push(Effect::Joined);
					}
				} else if let Some(id) = &joined.player_id {
					effects.push(Effect::Notify(format!("{} joined the match", view.player_name(id))));
				}
			}

			ServerEvent::LobbyState(lobby) => {
				if let Some(players) = &lobby.players {
					view.players = players.clone();
					view.recompute_current_player_name();
				}
				if let Some(mode) = &lobby.game_mode {
					view.game_mode = Some(mode.clone());
				}
				if let Some(kind) = &lobby.match_type {
					view.match_type = Some(kind.clone());
				}
			}

			ServerEvent::MatchReady => {
				effects.push(Effect::Notify("Match is ready".to_string()));
			}

			ServerEvent::CardsDistributed { event_id } => {
				effects.push(Effect::AnimationBarrier {
					event_id: event_id.clone().unwrap_or(Value::Null),
				});
			}

			ServerEvent::GameStarted(started) => {
				view.is_game_started = true;
				if let Some(players) = &started.players {
					view.players = players.clone();
				}
				if let Some(index) = started.current_player {
					view.current_player_index = Some(index);
				}
				match &started.username {
					Some(name) => view.current_player_name = Some(name.clone()),
					None => view.recompute_current_player_name(),
				}
				if let Some(card) = started.top_discard_card {
					view.top_discard_card = Some(card);
				}
				if let Some(color) = started.current_color {
					view.current_color = Some(color);
				}
				view.time_left = started.time_left.unwrap_or(DEFAULT_TURN_SECS);
				if let Some(deadline) = started.turn_end_time {
					view.turn_end_time = Some(deadline);
					effects.push(Effect::StartCountdown { deadline_ms: deadline });
				}
				effects.push(Effect::Notify("Game started!".to_string()));
			}

			ServerEvent::PrivateHand { hand } => {
				if let Some(hand) = hand {
					view.my_hand = hand.clone();
				}
			}

			ServerEvent::PlayableCards { player_id, playable_cards } => {
				if self.is_me(player_id.as_deref()) {
					if let Some(cards) = playable_cards {
						view.playable_cards = cards.clone();
					}
				}
			}

			ServerEvent::CardPlayed(played) => {
				self.apply_card_move(view, played);
				let name = acting_name(view, played);
				effects.push(Effect::Notify(format!("{} played a card", name)));
			}

			ServerEvent::CardDrawn(drawn) => {
				self.apply_card_move(view, drawn);
				let name = acting_name(view, drawn);
				let count = drawn.cards_drawn.unwrap_or(1);
				let noun = if count == 1 { "card" } else { "cards" };
				effects.push(Effect::Notify(format!("{} drew {} {}", name, count, noun)));
			}

			ServerEvent::StateDelta(delta) => {
				logging::reconciler::delta(delta.event_type.as_deref(), delta.version);
				self.apply_delta(view, &delta.changes, delta.event_type.as_deref(), &mut effects);
			}

			ServerEvent::TimerSync { turn_end_time, time_left } => {
				let mut changes = Map::new();
				if let Some(deadline) = turn_end_time {
					changes.insert("turnEndTime".to_string(), Value::from(*deadline));
				}
				if let Some(secs) = time_left {
					changes.insert("timeLeft".to_string(), Value::from(*secs));
				}
				self.apply_delta(view, &changes, Some("timer_sync"), &mut effects);
			}

			ServerEvent::SwapRequest { player_id, available_targets } => {
				if self.is_me(player_id.as_deref()) {
					view.swap_request_active = true;
					view.available_swap_targets = available_targets.clone().unwrap_or_default();
					effects.push(Effect::Notify("Choose a player to swap hands with".to_string()));
				} else if let Some(id) = player_id {
					effects.push(Effect::Notify(format!(
						"{} is choosing a swap target",
						view.player_name(id)
					)));
				}
			}

			ServerEvent::SwapSelectionPending { message } => {
				let text = message.clone().unwrap_or_else(|| "Waiting for swap selection".to_string());
				effects.push(Effect::Notify(text));
			}

			ServerEvent::SwapComplete { requester, target } => {
				clear_swap(view);
				let text = match (requester, target) {
					(Some(from), Some(to)) => {
						format!("{} swapped hands with {}", view.player_name(from), view.player_name(to))
					}
					_ => "Hands swapped".to_string(),
				};
				effects.push(Effect::Notify(text));
			}

			ServerEvent::SwapTimeout { message } => {
				clear_swap(view);
				let text = message.clone().unwrap_or_else(|| "Swap selection timed out".to_string());
				effects.push(Effect::Notify(text));
			}

			ServerEvent::GameEnded(ended) => {
				if view.game_ended {
					logging::reconciler::terminal_ignored(event.kind());
				} else {
					view.game_ended = true;
					view.winner = ended.winner.clone();
					if let Some(scores) = &ended.scores {
						view.scores = scores
							.iter()
							.filter_map(|(id, raw)| ScoreEntry::from_value(raw).map(|entry| (id.clone(), entry)))
							.collect();
					}
					logging::reconciler::game_ended(view.winner.as_deref());
					let text = match &view.winner {
						Some(winner) => format!("Game over! {} wins", winner),
						None => "Game over!".to_string(),
					};
					effects.push(Effect::Notify(text));
				}
			}

			ServerEvent::PlayerLeft { player_id, player_name } => {
				let name = match (player_name, player_id) {
					(Some(name), _) => name.clone(),
					(None, Some(id)) => view.player_name(id).to_string(),
					(None, None) => "A player".to_string(),
				};
				if let Some(id) = player_id {
					view.players.retain(|p| &p.user_id != id);
					view.recompute_current_player_name();
				}
				effects.push(Effect::Notify(format!("{} left the match", name)));
			}

			ServerEvent::Unknown { kind, .. } => {
				logging::reconciler::unknown_event(kind);
			}
		}

		effects
	}

	fn apply_card_move(&self, view: &mut MatchView, card_move: &CardMove) {
		if let (Some(id), Some(size)) = (&card_move.player_id, card_move.new_hand_size) {
			if let Some(player) = view.player_mut(id) {
				player.hand_size = size;
			}
		}
		if let Some(card) = card_move.top_discard_card.or(card_move.card_id) {
			view.top_discard_card = Some(card);
		}
		if let Some(color) = card_move.current_color {
			view.current_color = Some(color);
		}
		if let Some(stack) = card_move.draw_stack {
			view.draw_stack = stack;
		}
		if self.is_me(card_move.player_id.as_deref()) {
			if let Some(hand) = &card_move.new_hand {
				view.my_hand = hand.clone();
			}
		}
	}

	fn apply_delta(
		&self,
		view: &mut MatchView,
		changes: &Map<String, Value>,
		event_type: Option<&str>,
		effects: &mut Vec<Effect>,
	) {
		for (key, value) in changes {
			if DELTA_EXCLUDED.contains(&key.as_str()) {
				logging::reconciler::dropped_key("state_delta", key);
				continue;
			}
			merge_delta_key(view, key, value);
		}

		match event_type {
			Some("game_started") => {
				view.is_game_started = true;
				view.recompute_current_player_name();
				if let Some(deadline) = delta_deadline(changes) {
					effects.push(Effect::StartCountdown { deadline_ms: deadline });
				}
				effects.push(Effect::Notify("Game started!".to_string()));
			}
			Some("turn_change") => {
				view.recompute_current_player_name();
				if let Some(deadline) = delta_deadline(changes) {
					effects.push(Effect::StartCountdown { deadline_ms: deadline });
				}
				effects.push(Effect::ClearSelection);
			}
			Some("timer_sync") => {
				if let Some(deadline) = delta_deadline(changes) {
					effects.push(Effect::StartCountdown { deadline_ms: deadline });
				}
			}
			_ => {
				if changes.contains_key("currentPlayer") || changes.contains_key("players") {
					view.recompute_current_player_name();
				}
			}
		}
	}
}

fn delta_deadline(changes: &Map<String, Value>) -> Option<i64> {
	changes.get("turnEndTime").and_then(Value::as_i64)
}

fn acting_name(view: &MatchView, card_move: &CardMove) -> String {
	if let Some(name) = &card_move.player_name {
		return name.clone();
	}
	match &card_move.player_id {
		Some(id) => view.player_name(id).to_string(),
		None => "Someone".to_string(),
	}
}

fn clear_swap(view: &mut MatchView) {
	view.swap_request_active = false;
	view.available_swap_targets.clear();
}

/// Players inside a delta arrive as a sparse map of user id to patch.
fn merge_player_map(view: &mut MatchView, patches: &Map<String, Value>) {
	for (user_id, patch) in patches {
		let Some(patch) = patch.as_object() else {
			continue;
		};
		match view.player_mut(user_id) {
			Some(player) => player.apply_patch(patch),
			None => {
				let mut player = PlayerView::new(user_id.clone(), String::new());
				player.apply_patch(patch);
				if player.user_id.is_empty() {
					player.user_id = user_id.clone();
				}
				view.players.push(player);
			}
		}
	}
}

fn merge_delta_key(view: &mut MatchView, key: &str, value: &Value) {
	match key {
		"players" => match value {
			Value::Object(patches) => merge_player_map(view, patches),
			Value::Array(items) => {
				view.players = items.iter().filter_map(PlayerView::from_value).collect();
			}
			_ => {}
		},
		"currentPlayer" => {
			if let Some(index) = value.as_u64() {
				view.current_player_index = Some(index as usize);
			}
		}
		"currentPlayerName" => {
			if let Some(name) = value.as_str() {
				view.current_player_name = Some(name.to_string());
			}
		}
		"isGameStarted" => {
			if let Some(flag) = value.as_bool() {
				view.is_game_started = flag;
			}
		}
		"myHand" => {
			if let Some(items) = value.as_array() {
				view.my_hand = items.iter().filter_map(CardId::from_value).collect();
			}
		}
		"topDiscardCard" => {
			if let Some(card) = CardId::from_value(value) {
				view.top_discard_card = Some(card);
			}
		}
		"currentColor" => {
			if let Some(color) = CardColor::from_value(value) {
				view.current_color = Some(color);
			}
		}
		"turnEndTime" => {
			if let Some(deadline) = value.as_i64() {
				view.turn_end_time = Some(deadline);
			}
		}
		"timeLeft" => {
			if let Some(secs) = value.as_u64() {
				view.time_left = secs;
			}
		}
		"drawStack" => {
			if let Some(stack) = value.as_u64() {
				view.draw_stack = stack as u32;
			}
		}
		"redFuryActive" => {
			if let Some(flag) = value.as_bool() {
				view.red_fury_active = flag;
			}
		}
		"shieldWindowActive" => {
			if let Some(flag) = value.as_bool() {
				view.shield_window_active = flag;
			}
		}
		"swapRequestActive" => {
			if let Some(flag) = value.as_bool() {
				view.swap_request_active = flag;
			}
		}
		"availableSwapTargets" => {
			let wrapped = serde_json::json!({ "targets": value });
			if let Some(targets) = fields::user_ids(&wrapped, "targets") {
				view.available_swap_targets = targets;
			}
		}
		"matchId" => {
			if let Some(id) = value.as_str() {
				view.match_id = Some(id.to_string());
			}
		}
		"gameMode" => {
			if let Some(mode) = value.as_str() {
				view.game_mode = Some(mode.to_string());
			}
		}
		"matchType" => {
			if let Some(kind) = value.as_str() {
				view.match_type = Some(kind.to_string());
			}
		}
		other => {
			view.extra.insert(other.to_string(), value.clone());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn event(kind: &str, data: Value) -> ServerEvent {
		ServerEvent::from_parts(kind, &data)
	}

	fn two_player_view() -> MatchView {
		let mut view = MatchView::new();
		let mut alice = PlayerView::new("A", "Alice");
		alice.hand_size = 7;
		let mut bob = PlayerView::new("B", "Bob");
		bob.hand_size = 7;
		view.players = vec![alice, bob];
		view.current_player_index = Some(0);
		view.current_player_name = Some("Alice".to_string());
		view.my_hand = vec![CardId(1), CardId(30), CardId(100)];
		view.playable_cards = vec![CardId(1), CardId(100)];
		view
	}

	#[test]
	fn test_delta_preserves_untouched_fields() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();
		let before = view.clone();

		reconciler.apply(&mut view, &event("state_delta", json!({"changes": {"topDiscardCard": 44}})));

		assert_eq!(view.top_discard_card, Some(CardId(44)));
		assert_eq!(view.playable_cards, before.playable_cards);
		assert_eq!(view.my_hand, before.my_hand);
		assert_eq!(view.players, before.players);
	}

	#[test]
	fn test_delta_never_touches_playable_cards() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		reconciler.apply(
			&mut view,
			&event("state_delta", json!({"changes": {"playableCards": [30], "drawStack": 2}})),
		);

		assert_eq!(view.playable_cards, vec![CardId(1), CardId(100)]);
		assert_eq!(view.draw_stack, 2);
		assert!(!view.extra.contains_key("playableCards"));
	}

	#[test]
	fn test_playable_cards_filtered_by_user() {
		let mut reconciler = Reconciler::new("B");
		let mut view = two_player_view();
		let before = view.clone();

		reconciler.apply(&mut view, &event("playable_cards", json!({"playerId": "A", "playableCards": [30]})));
		assert_eq!(view, before);

		reconciler.apply(&mut view, &event("playable_cards", json!({"playerId": "B", "playableCards": [30]})));
		assert_eq!(view.playable_cards, vec![CardId(30)]);
	}

	#[test]
	fn test_players_map_merge() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		reconciler.apply(
			&mut view,
			&event(
				"state_delta",
				json!({"changes": {"players": {"A": {"handSize": 3}, "C": {"username": "Cy", "isBot": true}}}}),
			),
		);

		assert_eq!(view.players.len(), 3);
		let alice = view.player("A").unwrap();
		assert_eq!(alice.hand_size, 3);
		assert_eq!(alice.username, "Alice");
		assert!(alice.is_connected);

		let bob = view.player("B").unwrap();
		assert_eq!(bob.hand_size, 7);

		let cy = view.player("C").unwrap();
		assert_eq!(cy.user_id, "C");
		assert_eq!(cy.username, "Cy");
		assert!(cy.is_bot);
		assert_eq!(view.players[2].user_id, "C");
	}

	#[test]
	fn test_join_announced_once() {
		let mut reconciler = Reconciler::new("A");
		let mut view = MatchView::new();
		let joined = event("player_joined", json!({"playerId": "A", "username": "Alice"}));

		let first = reconciler.apply(&mut view, &joined);
		let second = reconciler.apply(&mut view, &joined);

		let count = first.iter().chain(second.iter()).filter(|e| **e == Effect::Joined).count();
		assert_eq!(count, 1);
		assert_eq!(view.players.len(), 1);
	}

	#[test]
	fn test_other_player_join_notifies() {
		let mut reconciler = Reconciler::new("A");
		let mut view = MatchView::new();

		let effects = reconciler.apply(&mut view, &event("player_joined", json!({"playerId": "B", "username": "Bob"})));
		assert_eq!(effects, vec![Effect::Notify("Bob joined the match".to_string())]);
		assert!(!view.join_announced);
	}

	#[test]
	fn test_swap_lifecycle() {
		for closing in ["swap_complete", "swap_timeout"] {
			let mut reconciler = Reconciler::new("A");
			let mut view = two_player_view();

			reconciler.apply(&mut view, &event("swap_request", json!({"playerId": "A", "availableTargets": ["B"]})));
			assert!(view.swap_request_active);
			assert_eq!(view.available_swap_targets, vec!["B".to_string()]);

			reconciler.apply(&mut view, &event(closing, json!({})));
			assert!(!view.swap_request_active);
			assert!(view.available_swap_targets.is_empty());
		}
	}

	#[test]
	fn test_swap_request_for_other_player() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		let effects =
			reconciler.apply(&mut view, &event("swap_request", json!({"playerId": "B", "availableTargets": ["A"]})));
		assert!(!view.swap_request_active);
		assert_eq!(effects, vec![Effect::Notify("Bob is choosing a swap target".to_string())]);
	}

	#[test]
	fn test_terminal_state_is_write_once() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		reconciler.apply(
			&mut view,
			&event("game_ended", json!({"winnerName": "Alice", "scores": {"A": 0, "B": {"score": 45, "username": "Bob"}}})),
		);
		assert!(view.game_ended);
		assert_eq!(view.winner.as_deref(), Some("Alice"));
		let scores = view.scores.clone();
		assert_eq!(scores.get("B").map(|s| s.score), Some(45));

		reconciler.apply(&mut view, &event("card_played", json!({"playerId": "B", "cardId": 5, "newHandSize": 0})));
		reconciler.apply(&mut view, &event("card_drawn", json!({"playerId": "A", "cardsDrawn": 2})));
		reconciler.apply(&mut view, &event("playable_cards", json!({"playerId": "A", "playableCards": []})));
		reconciler.apply(
			&mut view,
			&event("state_delta", json!({"changes": {"winner": "Bob", "scores": {"B": 999}, "gameEnded": false}})),
		);
		reconciler.apply(&mut view, &event("game_ended", json!({"winnerName": "Bob", "scores": {"B": 1}})));

		assert!(view.game_ended);
		assert_eq!(view.winner.as_deref(), Some("Alice"));
		assert_eq!(view.scores, scores);
	}

	#[test]
	fn test_turn_change_recomputes_name() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		let effects = reconciler.apply(
			&mut view,
			&event("state_delta", json!({"changes": {"currentPlayer": 1}, "eventType": "turn_change"})),
		);

		assert_eq!(view.current_player_index, Some(1));
		assert_eq!(view.current_player_name.as_deref(), Some("Bob"));
		assert_eq!(view.playable_cards, vec![CardId(1), CardId(100)]);
		assert!(effects.contains(&Effect::ClearSelection));
		assert!(!effects.iter().any(|e| matches!(e, Effect::StartCountdown { .. })));
	}

	#[test]
	fn test_turn_change_restarts_countdown() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		let effects = reconciler.apply(
			&mut view,
			&event(
				"state_delta",
				json!({"changes": {"currentPlayer": 1, "turnEndTime": 90_000}, "eventType": "turn_change"}),
			),
		);

		assert_eq!(view.turn_end_time, Some(90_000));
		assert!(effects.contains(&Effect::StartCountdown { deadline_ms: 90_000 }));
	}

	#[test]
	fn test_legacy_timer_sync_matches_delta() {
		let mut legacy_view = two_player_view();
		let mut delta_view = two_player_view();
		let mut reconciler = Reconciler::new("A");

		let legacy = reconciler.apply(
			&mut legacy_view,
			&event("timer_sync", json!({"turnEndTime": 70_000, "timeLeft": 12})),
		);
		let delta = reconciler.apply(
			&mut delta_view,
			&event(
				"state_delta",
				json!({"changes": {"turnEndTime": 70_000, "timeLeft": 12}, "eventType": "timer_sync"}),
			),
		);

		assert_eq!(legacy_view, delta_view);
		assert_eq!(legacy, delta);
		assert_eq!(legacy, vec![Effect::StartCountdown { deadline_ms: 70_000 }]);
	}

	#[test]
	fn test_game_started_event() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		let effects = reconciler.apply(
			&mut view,
			&event(
				"game_started",
				json!({"currentPlayer": 1, "turnEndTime": 50_000, "gameState": {"topDiscardCard": 7, "currentColor": 3}}),
			),
		);

		assert!(view.is_game_started);
		assert_eq!(view.current_player_name.as_deref(), Some("Bob"));
		assert_eq!(view.top_discard_card, Some(CardId(7)));
		assert_eq!(view.current_color, Some(CardColor::Yellow));
		assert_eq!(view.time_left, DEFAULT_TURN_SECS);
		assert!(effects.contains(&Effect::StartCountdown { deadline_ms: 50_000 }));
	}

	#[test]
	fn test_cards_distributed_requests_barrier() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();
		let before = view.clone();

		let effects = reconciler.apply(&mut view, &event("cards_distributed", json!({"eventId": "evt-9"})));
		assert_eq!(effects, vec![Effect::AnimationBarrier { event_id: json!("evt-9") }]);
		assert_eq!(view, before);
	}

	#[test]
	fn test_card_played_updates_view() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		let effects = reconciler.apply(
			&mut view,
			&event(
				"card_played",
				json!({"playerId": "A", "cardId": 30, "newHandSize": 2, "currentColor": 1, "newHand": [1, 100]}),
			),
		);

		assert_eq!(view.top_discard_card, Some(CardId(30)));
		assert_eq!(view.current_color, Some(CardColor::Blue));
		assert_eq!(view.player("A").unwrap().hand_size, 2);
		assert_eq!(view.my_hand, vec![CardId(1), CardId(100)]);
		assert_eq!(effects, vec![Effect::Notify("Alice played a card".to_string())]);
	}

	#[test]
	fn test_other_players_new_hand_is_ignored() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		let effects = reconciler.apply(
			&mut view,
			&event("card_drawn", json!({"playerId": "B", "newHandSize": 9, "newHand": [5, 6], "cardsDrawn": 2})),
		);

		assert_eq!(view.my_hand, vec![CardId(1), CardId(30), CardId(100)]);
		assert_eq!(view.player("B").unwrap().hand_size, 9);
		assert_eq!(effects, vec![Effect::Notify("Bob drew 2 cards".to_string())]);
	}

	#[test]
	fn test_malformed_payloads_are_no_ops() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();
		let before = view.clone();

		reconciler.apply(&mut view, &event("private_hand", json!({"hand": "nope"})));
		reconciler.apply(&mut view, &event("lobby_state", json!({"players": 3})));
		reconciler.apply(&mut view, &event("state_delta", json!({"changes": "bad"})));
		reconciler.apply(&mut view, &event("state_delta", json!({"changes": {"currentPlayer": "x", "drawStack": -1}})));
		reconciler.apply(&mut view, &event("mystery", json!({"a": 1})));

		assert_eq!(view, before);
	}

	#[test]
	fn test_unmodelled_delta_keys_are_kept() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		reconciler.apply(&mut view, &event("state_delta", json!({"changes": {"direction": -1}})));
		assert_eq!(view.extra.get("direction"), Some(&json!(-1)));
	}

	#[test]
	fn test_player_left_removes_player() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		let effects = reconciler.apply(&mut view, &event("player_left", json!({"playerId": "B"})));
		assert!(view.player("B").is_none());
		assert_eq!(effects, vec![Effect::Notify("Bob left the match".to_string())]);
	}

	#[test]
	fn test_player_left_recomputes_current_name() {
		let mut reconciler = Reconciler::new("B");
		let mut view = two_player_view();

		reconciler.apply(&mut view, &event("player_left", json!({"playerId": "A"})));
		assert_eq!(view.players[0].user_id, "B");
		assert_eq!(view.current_player_name.as_deref(), Some("Bob"));
	}

	#[test]
	fn test_players_patch_recomputes_current_name() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();

		reconciler.apply(
			&mut view,
			&event("state_delta", json!({"changes": {"players": {"A": {"username": "Alicia"}}}})),
		);
		assert_eq!(view.players[0].username, "Alicia");
		assert_eq!(view.current_player_name.as_deref(), Some("Alicia"));
	}

	#[test]
	fn test_game_started_delta_without_deadline_keeps_countdown() {
		let mut reconciler = Reconciler::new("A");
		let mut view = two_player_view();
		view.turn_end_time = Some(1_000);

		let effects = reconciler.apply(
			&mut view,
			&event("state_delta", json!({"changes": {"currentPlayer": 1}, "eventType": "game_started"})),
		);
		assert!(view.is_game_started);
		assert_eq!(effects, vec![Effect::Notify("Game started!".to_string())]);

		let effects = reconciler.apply(
			&mut view,
			&event(
				"state_delta",
				json!({"changes": {"turnEndTime": 80_000}, "eventType": "game_started"}),
			),
		);
		assert!(effects.contains(&Effect::StartCountdown { deadline_ms: 80_000 }));
	}

	#[test]
	fn test_lobby_state_replaces_players() {
		let mut reconciler = Reconciler::new("A");
		let mut view = MatchView::new();

		reconciler.apply(
			&mut view,
			&event(
				"lobby_state",
				json!({"players": [{"userId": "A", "username": "Alice"}], "gameMode": "2v2", "matchType": "private"}),
			),
		);

		assert_eq!(view.players.len(), 1);
		assert_eq!(view.game_mode.as_deref(), Some("2v2"));
		assert_eq!(view.match_type.as_deref(), Some("private"));
	}
}
