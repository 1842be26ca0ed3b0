use crossterm::event::KeyCode;
use ratatui::{
	Frame,
	layout::{Constraint, Direction, Layout, Rect},
	style::{Color, Modifier, Style},
	text::Line,
	widgets::{Block, Borders, Paragraph},
};

use crate::card::CardId;
use crate::config::LayoutMode;
use crate::countdown::TimeDisplay;
use crate::event_log::EventLog;
use crate::harness::MatchController;
use crate::theme::Theme;
use crate::tui::input::{InputEffect, InputState, KeyContext, UiCommand};
use crate::tui::widgets::{BoardWidget, EventLogWidget};
use crate::view::MatchView;

#[derive(Debug, PartialEq)]
pub enum GameUIAction {
	None,
	Command(UiCommand),
	Quit,
}

/// Everything the screen needs from the controller for one frame.
pub struct BoardState<'a> {
	pub view: &'a MatchView,
	pub my_user_id: &'a str,
	pub log: &'a EventLog,
	pub timer: TimeDisplay,
	pub selected: Option<CardId>,
}

impl<'a> BoardState<'a> {
	pub fn from_controller(controller: &'a MatchController) -> Self {
		Self {
			view: controller.view(),
			my_user_id: controller.my_user_id(),
			log: controller.log(),
			timer: controller.time_display(),
			selected: controller.selected_card(),
		}
	}

	fn key_context(&self) -> KeyContext<'a> {
		KeyContext {
			hand: &self.view.my_hand,
			selected: self.selected,
			swap_targets: if self.view.swap_request_active { self.view.available_swap_targets.as_slice() } else { &[] },
		}
	}
}

pub struct GameUI {
	pub input_state: InputState,
	pub status_message: Option<String>,
	pub layout: LayoutMode,
	pub theme: Theme,
	pub username: String,
}

impl GameUI {
	pub fn new(theme: Theme, layout: LayoutMode, username: impl Into<String>) -> Self {
		let mut ui = Self {
			input_state: InputState::default(),
			status_message: None,
			layout,
			theme,
			username: username.into(),
		};
		let (state, effect) = InputState::enter_lobby(Default::default());
		ui.input_state = state;
		ui.apply_effect(effect);
		ui
	}

	/// Moves the input state along with the match: joining or leaving a
	/// match, and swap requests opening or closing.
	pub fn sync(&mut self, view: &MatchView) {
		let in_match = view.match_id.is_some();
		let transition = match &self.input_state {
			InputState::Lobby { .. } | InputState::EnteringMatchId { .. } if in_match => Some(InputState::enter_playing()),
			state if state.in_match() && !in_match => Some(InputState::enter_lobby(Default::default())),
			InputState::Playing if view.swap_request_active => Some(InputState::enter_swap_choice()),
			InputState::ChoosingSwapTarget { .. } if !view.swap_request_active => Some(InputState::enter_playing()),
			_ => None,
		};

		if let Some((state, effect)) = transition {
			self.input_state = state;
			self.apply_effect(effect);
		}
	}

	pub fn handle_key(&mut self, key: KeyCode, board: &BoardState) -> GameUIAction {
		let old_state = std::mem::take(&mut self.input_state);
		let (new_state, effect) = old_state.handle_key(key, &board.key_context());
		self.input_state = new_state;
		self.process_effect(effect)
	}

	pub fn set_status(&mut self, message: impl Into<String>) {
		self.status_message = Some(message.into());
	}

	fn apply_effect(&mut self, effect: InputEffect) {
		if let InputEffect::SetPrompt(prompt) = effect {
			self.status_message = Some(prompt);
		}
	}

	fn process_effect(&mut self, effect: InputEffect) -> GameUIAction {
		match effect {
			InputEffect::None => GameUIAction::None,
			InputEffect::SetPrompt(prompt) => {
				self.status_message = Some(prompt);
				GameUIAction::None
			}
			InputEffect::Command(UiCommand::ToggleLayout) => {
				self.layout = self.layout.toggle();
				GameUIAction::None
			}
			InputEffect::Command(command) => GameUIAction::Command(command),
			InputEffect::Quit => GameUIAction::Quit,
		}
	}

	pub fn render(&self, frame: &mut Frame, area: Rect, board: &BoardState) {
		let layout = Layout::default()
			.direction(Direction::Vertical)
			.constraints([Constraint::Min(10), Constraint::Length(3)])
			.split(area);

		let main_area = layout[0];
		let status_area = layout[1];

		if board.view.match_id.is_some() {
			let widget = BoardWidget::new(board.view, board.my_user_id, board.log, &self.theme)
				.timer(board.timer.clone())
				.selected(board.selected)
				.layout(self.layout);
			frame.render_widget(widget, main_area);
		} else {
			self.render_lobby(frame, main_area, board);
		}

		let my_turn = board.view.is_my_turn(board.my_user_id) && !board.view.game_ended;
		let (status_title, status_style) = match &self.input_state {
			InputState::ChoosingColor { .. } => (
				" Choose Color ",
				Style::default().fg(self.theme.selected()).add_modifier(Modifier::BOLD),
			),
			InputState::ChoosingSwapTarget { .. } => (
				" Swap Hands ",
				Style::default().fg(self.theme.selected()).add_modifier(Modifier::BOLD),
			),
			InputState::Playing if board.view.game_ended => (
				" Game Over ",
				Style::default().fg(self.theme.winner()).add_modifier(Modifier::BOLD),
			),
			InputState::Playing if my_turn => (
				" Your Turn ",
				Style::default().fg(self.theme.current_player()).add_modifier(Modifier::BOLD),
			),
			InputState::Lobby { .. } | InputState::EnteringMatchId { .. } => (" Lobby ", Style::default()),
			_ => (" Status ", Style::default().fg(Color::Gray)),
		};

		let status_text = match &self.input_state {
			InputState::ChoosingSwapTarget { cursor } => swap_line(board, *cursor),
			_ => self.status_message.clone().unwrap_or_default(),
		};

		let status = Paragraph::new(status_text)
			.style(status_style)
			.block(Block::default().borders(Borders::ALL).border_style(status_style).title(status_title));
		frame.render_widget(status, status_area);
	}

	fn render_lobby(&self, frame: &mut Frame, area: Rect, board: &BoardState) {
		let chunks = Layout::default()
			.direction(Direction::Vertical)
			.constraints([Constraint::Length(5), Constraint::Min(3)])
			.split(area);

		let mode = match &self.input_state {
			InputState::Lobby { mode } | InputState::EnteringMatchId { mode, .. } => mode.display_name(),
			_ => "-",
		};
		let lines = vec![
			Line::styled(
				format!("Signed in as {} ({})", self.username, board.my_user_id),
				Style::default().add_modifier(Modifier::BOLD),
			),
			Line::raw(format!("Game mode: {}", mode)),
			Line::styled("Create a private match, find a random one, or join by id.", Style::default().fg(Color::DarkGray)),
		];
		let welcome = Paragraph::new(lines).block(
			Block::default()
				.borders(Borders::ALL)
				.border_style(Style::default().fg(self.theme.board_border()))
				.title(" UNO Test Harness "),
		);
		frame.render_widget(welcome, chunks[0]);
		frame.render_widget(EventLogWidget::new(board.log, &self.theme), chunks[1]);
	}
}

fn swap_line(board: &BoardState, cursor: usize) -> String {
	board
		.view
		.available_swap_targets
		.iter()
		.enumerate()
		.map(|(i, id)| {
			let name = board.view.player_name(id);
			if i == cursor { format!("[{}. {}]", i + 1, name) } else { format!("{}. {}", i + 1, name) }
		})
		.collect::<Vec<_>>()
		.join("  ")
}
