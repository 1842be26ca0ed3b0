use crossterm::event::KeyCode;

use crate::card::{CardColor, CardId};
use crate::mode::{GameMode, MatchType};

/// What the local user can currently act on.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyContext<'a> {
	pub hand: &'a [CardId],
	pub selected: Option<CardId>,
	pub swap_targets: &'a [String],
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
	CreateMatch { mode: GameMode, match_type: MatchType },
	JoinMatch(String),
	StartGame,
	Select(Option<CardId>),
	PlayCard { card: CardId, color: Option<CardColor> },
	DrawCard,
	PlayShield,
	Autoplay,
	SwapTarget(String),
	AddBot,
	LeaveMatch,
	ToggleLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputState {
	Lobby { mode: GameMode },
	EnteringMatchId { mode: GameMode, buffer: String },
	Playing,
	ChoosingColor { card: CardId, cursor: usize },
	ChoosingSwapTarget { cursor: usize },
}

#[derive(Debug, PartialEq)]
pub enum InputEffect {
	None,
	SetPrompt(String),
	Command(UiCommand),
	Quit,
}

impl Default for InputState {
	fn default() -> Self {
		Self::Lobby { mode: GameMode::default() }
	}
}

impl InputState {
	pub fn in_match(&self) -> bool {
		matches!(self, Self::Playing | Self::ChoosingColor { .. } | Self::ChoosingSwapTarget { .. })
	}

	pub fn enter_lobby(mode: GameMode) -> (Self, InputEffect) {
		(Self::Lobby { mode }, InputEffect::SetPrompt(lobby_prompt(mode)))
	}

	pub fn enter_playing() -> (Self, InputEffect) {
		(Self::Playing, InputEffect::SetPrompt(playing_prompt().to_string()))
	}

	pub fn enter_swap_choice() -> (Self, InputEffect) {
		(
			Self::ChoosingSwapTarget { cursor: 0 },
			InputEffect::SetPrompt("Swap hands with: ←→ choose  Enter confirm".to_string()),
		)
	}

	pub fn handle_key(self, key: KeyCode, ctx: &KeyContext) -> (Self, InputEffect) {
		match self {
			Self::Lobby { mode } => handle_lobby(mode, key),
			Self::EnteringMatchId { mode, buffer } => handle_entering_match_id(mode, buffer, key),
			Self::Playing => handle_playing(key, ctx),
			Self::ChoosingColor { card, cursor } => handle_choosing_color(card, cursor, key),
			Self::ChoosingSwapTarget { cursor } => handle_choosing_swap(cursor, key, ctx),
		}
	}
}

fn handle_lobby(mode: GameMode, key: KeyCode) -> (InputState, InputEffect) {
	let command = |match_type| {
		(
			InputState::Lobby { mode },
			InputEffect::Command(UiCommand::CreateMatch { mode, match_type }),
		)
	};

	match key {
		KeyCode::Char('c') => command(MatchType::Private),
		KeyCode::Char('r') => command(MatchType::Random),
		KeyCode::Char('j') => (
			InputState::EnteringMatchId { mode, buffer: String::new() },
			InputEffect::SetPrompt("Match id: ".to_string()),
		),
		KeyCode::Char('m') | KeyCode::Tab => {
			let next = next_mode(mode);
			InputState::enter_lobby(next)
		}
		KeyCode::Char('v') => (InputState::Lobby { mode }, InputEffect::Command(UiCommand::ToggleLayout)),
		KeyCode::Char('q') | KeyCode::Esc => (InputState::Lobby { mode }, InputEffect::Quit),
		_ => (InputState::Lobby { mode }, InputEffect::None),
	}
}

fn handle_entering_match_id(mode: GameMode, mut buffer: String, key: KeyCode) -> (InputState, InputEffect) {
	match key {
		KeyCode::Char(c) if !c.is_whitespace() => {
			buffer.push(c);
			let prompt = format!("Match id: {}", buffer);
			(InputState::EnteringMatchId { mode, buffer }, InputEffect::SetPrompt(prompt))
		}
		KeyCode::Backspace => {
			buffer.pop();
			let prompt = format!("Match id: {}", buffer);
			(InputState::EnteringMatchId { mode, buffer }, InputEffect::SetPrompt(prompt))
		}
		KeyCode::Enter if !buffer.is_empty() => {
			(InputState::Lobby { mode }, InputEffect::Command(UiCommand::JoinMatch(buffer)))
		}
		KeyCode::Esc => InputState::enter_lobby(mode),
		_ => (InputState::EnteringMatchId { mode, buffer }, InputEffect::None),
	}
}

fn handle_playing(key: KeyCode, ctx: &KeyContext) -> (InputState, InputEffect) {
	let command = |cmd| (InputState::Playing, InputEffect::Command(cmd));

	match key {
		KeyCode::Left | KeyCode::Char('h') => command(UiCommand::Select(step_selection(ctx, -1))),
		KeyCode::Right | KeyCode::Char('l') => command(UiCommand::Select(step_selection(ctx, 1))),
		KeyCode::Enter => match ctx.selected.filter(|card| ctx.hand.contains(card)) {
			Some(card) if card.info().is_some_and(|info| info.needs_color()) => (
				InputState::ChoosingColor { card, cursor: 0 },
				InputEffect::SetPrompt(color_prompt(0)),
			),
			Some(card) => command(UiCommand::PlayCard { card, color: None }),
			None => (InputState::Playing, InputEffect::SetPrompt("Select a card first (←→)".to_string())),
		},
		KeyCode::Char('d') => command(UiCommand::DrawCard),
		KeyCode::Char('s') => command(UiCommand::StartGame),
		KeyCode::Char('b') => command(UiCommand::AddBot),
		KeyCode::Char('p') => command(UiCommand::PlayShield),
		KeyCode::Char('a') => command(UiCommand::Autoplay),
		KeyCode::Char('x') => command(UiCommand::LeaveMatch),
		KeyCode::Char('v') => command(UiCommand::ToggleLayout),
		KeyCode::Char('q') | KeyCode::Esc => (InputState::Playing, InputEffect::Quit),
		_ => (InputState::Playing, InputEffect::None),
	}
}

fn handle_choosing_color(card: CardId, cursor: usize, key: KeyCode) -> (InputState, InputEffect) {
	let choose = |color: CardColor| {
		(
			InputState::Playing,
			InputEffect::Command(UiCommand::PlayCard { card, color: Some(color) }),
		)
	};
	let count = CardColor::CHOOSABLE.len();

	match key {
		KeyCode::Char(c) => match CardColor::parse(&c.to_string()).filter(|color| *color != CardColor::Wild) {
			Some(color) => choose(color),
			None => (InputState::ChoosingColor { card, cursor }, InputEffect::None),
		},
		KeyCode::Left => {
			let cursor = (cursor + count - 1) % count;
			(InputState::ChoosingColor { card, cursor }, InputEffect::SetPrompt(color_prompt(cursor)))
		}
		KeyCode::Right => {
			let cursor = (cursor + 1) % count;
			(InputState::ChoosingColor { card, cursor }, InputEffect::SetPrompt(color_prompt(cursor)))
		}
		KeyCode::Enter => choose(CardColor::CHOOSABLE[cursor % count]),
		KeyCode::Esc => InputState::enter_playing(),
		_ => (InputState::ChoosingColor { card, cursor }, InputEffect::None),
	}
}

fn handle_choosing_swap(cursor: usize, key: KeyCode, ctx: &KeyContext) -> (InputState, InputEffect) {
	let count = ctx.swap_targets.len();
	if count == 0 {
		return InputState::enter_playing();
	}

	match key {
		KeyCode::Left | KeyCode::Up => {
			let cursor = (cursor + count - 1) % count;
			(InputState::ChoosingSwapTarget { cursor }, InputEffect::None)
		}
		KeyCode::Right | KeyCode::Down => {
			let cursor = (cursor + 1) % count;
			(InputState::ChoosingSwapTarget { cursor }, InputEffect::None)
		}
		KeyCode::Char(c @ '1'..='9') => {
			let index = (c as usize) - ('1' as usize);
			match ctx.swap_targets.get(index) {
				Some(target) => (InputState::Playing, InputEffect::Command(UiCommand::SwapTarget(target.clone()))),
				None => (InputState::ChoosingSwapTarget { cursor }, InputEffect::None),
			}
		}
		KeyCode::Enter => {
			let target = ctx.swap_targets[cursor % count].clone();
			(InputState::Playing, InputEffect::Command(UiCommand::SwapTarget(target)))
		}
		KeyCode::Char('q') => (InputState::ChoosingSwapTarget { cursor }, InputEffect::Quit),
		_ => (InputState::ChoosingSwapTarget { cursor }, InputEffect::None),
	}
}

fn step_selection(ctx: &KeyContext, step: isize) -> Option<CardId> {
	if ctx.hand.is_empty() {
		return None;
	}
	let len = ctx.hand.len() as isize;
	let next = match ctx.selected.and_then(|card| ctx.hand.iter().position(|c| *c == card)) {
		Some(i) => (i as isize + step).rem_euclid(len),
		None if step < 0 => len - 1,
		None => 0,
	};
	ctx.hand.get(next as usize).copied()
}

fn next_mode(mode: GameMode) -> GameMode {
	let all = GameMode::ALL;
	let i = all.iter().position(|m| *m == mode).unwrap_or(0);
	all[(i + 1) % all.len()]
}

fn lobby_prompt(mode: GameMode) -> String {
	format!("Mode: {}  [m]ode  [c]reate  [r]andom  [j]oin  [q]uit", mode.display_name())
}

fn playing_prompt() -> &'static str {
	"←→ select  Enter play  [d]raw  [s]tart  [b]ot  [p]shield  [a]uto  [x] leave  [v]iew"
}

fn color_prompt(cursor: usize) -> String {
	let parts: Vec<String> = CardColor::CHOOSABLE
		.iter()
		.enumerate()
		.map(|(i, color)| {
			if i == cursor {
				format!("[{}]", color.name())
			} else {
				color.name().to_string()
			}
		})
		.collect();
	format!("Choose color: {}  (r/b/g/y, Esc cancel)", parts.join(" "))
}

#[cfg(test)]
mod tests {
	use super::*;

	const HAND: [CardId; 3] = [CardId(1), CardId(26), CardId(100)];

	fn ctx(selected: Option<CardId>) -> KeyContext<'static> {
		KeyContext { hand: &HAND, selected, swap_targets: &[] }
	}

	#[test]
	fn test_lobby_q_quits() {
		let (state, effect) = InputState::default().handle_key(KeyCode::Char('q'), &ctx(None));
		assert!(matches!(state, InputState::Lobby { .. }));
		assert_eq!(effect, InputEffect::Quit);
	}

	#[test]
	fn test_lobby_cycles_mode_and_creates() {
		let (state, _) = InputState::default().handle_key(KeyCode::Char('m'), &ctx(None));
		assert_eq!(state, InputState::Lobby { mode: GameMode::ThreePlayer });

		let (_, effect) = state.handle_key(KeyCode::Char('r'), &ctx(None));
		assert_eq!(
			effect,
			InputEffect::Command(UiCommand::CreateMatch {
				mode: GameMode::ThreePlayer,
				match_type: MatchType::Random
			})
		);
	}

	#[test]
	fn test_entering_match_id() {
		let (mut state, _) = InputState::default().handle_key(KeyCode::Char('j'), &ctx(None));
		for c in "m1x".chars() {
			state = state.handle_key(KeyCode::Char(c), &ctx(None)).0;
		}
		state = state.handle_key(KeyCode::Backspace, &ctx(None)).0;
		let (state, effect) = state.handle_key(KeyCode::Enter, &ctx(None));
		assert!(matches!(state, InputState::Lobby { .. }));
		assert_eq!(effect, InputEffect::Command(UiCommand::JoinMatch("m1".to_string())));
	}

	#[test]
	fn test_empty_match_id_is_not_submitted() {
		let state = InputState::EnteringMatchId { mode: GameMode::TwoPlayer, buffer: String::new() };
		let (state, effect) = state.handle_key(KeyCode::Enter, &ctx(None));
		assert!(matches!(state, InputState::EnteringMatchId { .. }));
		assert_eq!(effect, InputEffect::None);
	}

	#[test]
	fn test_selection_wraps() {
		let (_, effect) = InputState::Playing.handle_key(KeyCode::Right, &ctx(None));
		assert_eq!(effect, InputEffect::Command(UiCommand::Select(Some(CardId(1)))));

		let (_, effect) = InputState::Playing.handle_key(KeyCode::Right, &ctx(Some(CardId(100))));
		assert_eq!(effect, InputEffect::Command(UiCommand::Select(Some(CardId(1)))));

		let (_, effect) = InputState::Playing.handle_key(KeyCode::Left, &ctx(None));
		assert_eq!(effect, InputEffect::Command(UiCommand::Select(Some(CardId(100)))));
	}

	#[test]
	fn test_enter_plays_selected_card() {
		let (state, effect) = InputState::Playing.handle_key(KeyCode::Enter, &ctx(Some(CardId(26))));
		assert_eq!(state, InputState::Playing);
		assert_eq!(effect, InputEffect::Command(UiCommand::PlayCard { card: CardId(26), color: None }));
	}

	#[test]
	fn test_enter_without_selection_prompts() {
		let (_, effect) = InputState::Playing.handle_key(KeyCode::Enter, &ctx(Some(CardId(55))));
		assert!(matches!(effect, InputEffect::SetPrompt(_)));
	}

	#[test]
	fn test_wild_asks_for_color() {
		let (state, effect) = InputState::Playing.handle_key(KeyCode::Enter, &ctx(Some(CardId(100))));
		assert_eq!(state, InputState::ChoosingColor { card: CardId(100), cursor: 0 });
		assert!(matches!(effect, InputEffect::SetPrompt(_)));

		let (state, effect) = state.handle_key(KeyCode::Char('g'), &ctx(Some(CardId(100))));
		assert_eq!(state, InputState::Playing);
		assert_eq!(
			effect,
			InputEffect::Command(UiCommand::PlayCard { card: CardId(100), color: Some(CardColor::Green) })
		);
	}

	#[test]
	fn test_color_cursor_and_cancel() {
		let state = InputState::ChoosingColor { card: CardId(100), cursor: 0 };
		let (state, _) = state.handle_key(KeyCode::Left, &ctx(None));
		assert_eq!(state, InputState::ChoosingColor { card: CardId(100), cursor: 3 });

		let (_, effect) = state.clone().handle_key(KeyCode::Enter, &ctx(None));
		assert_eq!(
			effect,
			InputEffect::Command(UiCommand::PlayCard { card: CardId(100), color: Some(CardColor::Yellow) })
		);

		let (state, _) = state.handle_key(KeyCode::Esc, &ctx(None));
		assert_eq!(state, InputState::Playing);
	}

	#[test]
	fn test_swap_target_choice() {
		let targets = vec!["B".to_string(), "C".to_string()];
		let ctx = KeyContext { hand: &HAND, selected: None, swap_targets: &targets };

		let (state, _) = InputState::ChoosingSwapTarget { cursor: 0 }.handle_key(KeyCode::Right, &ctx);
		let (state, effect) = state.handle_key(KeyCode::Enter, &ctx);
		assert_eq!(state, InputState::Playing);
		assert_eq!(effect, InputEffect::Command(UiCommand::SwapTarget("C".to_string())));

		let (_, effect) = InputState::ChoosingSwapTarget { cursor: 0 }.handle_key(KeyCode::Char('1'), &ctx);
		assert_eq!(effect, InputEffect::Command(UiCommand::SwapTarget("B".to_string())));
	}

	#[test]
	fn test_swap_without_targets_returns_to_playing() {
		let (state, _) = InputState::ChoosingSwapTarget { cursor: 0 }.handle_key(KeyCode::Enter, &ctx(None));
		assert_eq!(state, InputState::Playing);
	}
}
