use ratatui::{
	buffer::Buffer,
	layout::Rect,
	style::{Color, Modifier, Style},
	text::{Line, Span},
	widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::card::{CardColor, CardId};
use crate::config::LayoutMode;
use crate::countdown::TimeDisplay;
use crate::event_log::EventLog;
use crate::theme::Theme;
use crate::tui::layout::BoardLayout;
use crate::view::{MatchView, PlayerView};

fn card_style(card: CardId, theme: &Theme) -> Style {
	match card.info() {
		Some(info) => Style::default().fg(theme.card(info.color)).add_modifier(Modifier::BOLD),
		None => Style::default().fg(Color::DarkGray),
	}
}

fn card_label(card: CardId) -> String {
	match card.info() {
		Some(info) if info.color == CardColor::Wild => format!("[{}]", info.kind.symbol()),
		Some(info) => format!("[{}{}]", &info.color.name()[..1], info.kind.symbol()),
		None => "[??]".to_string(),
	}
}

fn render_card(card: CardId, theme: &Theme) -> Span<'static> {
	Span::styled(card_label(card), card_style(card, theme))
}

fn truncate(name: &str, max: usize) -> String {
	if name.chars().count() > max {
		let mut short: String = name.chars().take(max.saturating_sub(1)).collect();
		short.push('…');
		short
	} else {
		name.to_string()
	}
}

fn player_badges(player: &PlayerView, theme: &Theme) -> Vec<Span<'static>> {
	let mut spans = Vec::new();
	if player.has_uno() {
		spans.push(Span::styled(" UNO!", Style::default().fg(theme.uno()).add_modifier(Modifier::BOLD)));
	}
	if player.is_bot {
		spans.push(Span::styled(" bot", Style::default().fg(Color::DarkGray)));
	}
	if !player.is_connected {
		spans.push(Span::styled(" offline", Style::default().fg(theme.disconnected())));
	}
	spans
}

pub struct PlayerWidget<'a> {
	player: &'a PlayerView,
	theme: &'a Theme,
	is_current: bool,
	is_winner: bool,
}

impl<'a> PlayerWidget<'a> {
	pub fn new(player: &'a PlayerView, theme: &'a Theme) -> Self {
		Self { player, theme, is_current: false, is_winner: false }
	}

	pub fn current(mut self, is_current: bool) -> Self {
		self.is_current = is_current;
		self
	}

	pub fn winner(mut self, is_winner: bool) -> Self {
		self.is_winner = is_winner;
		self
	}
}

impl Widget for PlayerWidget<'_> {
	fn render(self, area: Rect, buf: &mut Buffer) {
		let accent = if self.is_winner {
			Some(self.theme.winner())
		} else if self.is_current {
			Some(self.theme.current_player())
		} else {
			None
		};

		let border_style = match accent {
			Some(color) => Style::default().fg(color).add_modifier(Modifier::BOLD),
			None if !self.player.is_connected => Style::default().fg(self.theme.disconnected()),
			None => Style::default().fg(self.theme.opponent_border()),
		};

		let title_style = accent
			.map(|color| Style::default().fg(color).add_modifier(Modifier::BOLD))
			.unwrap_or_default();

		let name = truncate(self.player.display_name(), area.width.saturating_sub(4) as usize);
		let mut block = Block::default()
			.borders(Borders::ALL)
			.border_style(border_style)
			.title(Span::styled(name, title_style));

		if self.is_winner {
			block = block.title_top(Line::from(Span::styled("★", Style::default().fg(self.theme.winner()))).right_aligned());
		} else if self.is_current {
			block = block.title_top(Line::from(Span::styled("▶", title_style)).right_aligned());
		}

		let inner = block.inner(area);
		block.render(area, buf);

		if inner.height == 0 || inner.width < 4 {
			return;
		}

		let cards = "▮".repeat(self.player.hand_size.min(inner.width as u32 / 2) as usize);
		let hand_line = Line::from(vec![
			Span::styled(cards, Style::default().fg(self.theme.card(CardColor::Wild))),
			Span::raw(format!(" {}", self.player.hand_size)),
		]);
		let badge_line = Line::from(player_badges(self.player, self.theme));

		Paragraph::new(vec![hand_line, badge_line]).render(inner, buf);
	}
}

/// Opponents on a single line, for the compact layout.
pub struct OpponentsLine<'a> {
	view: &'a MatchView,
	my_user_id: &'a str,
	theme: &'a Theme,
}

impl<'a> OpponentsLine<'a> {
	pub fn new(view: &'a MatchView, my_user_id: &'a str, theme: &'a Theme) -> Self {
		Self { view, my_user_id, theme }
	}
}

impl Widget for OpponentsLine<'_> {
	fn render(self, area: Rect, buf: &mut Buffer) {
		let current = self.view.current_player().map(|p| p.user_id.as_str());
		let mut spans = Vec::new();

		for player in self.view.opponents(self.my_user_id) {
			if !spans.is_empty() {
				spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
			}
			let style = if current == Some(player.user_id.as_str()) {
				Style::default().fg(self.theme.current_player()).add_modifier(Modifier::BOLD)
			} else {
				Style::default()
			};
			spans.push(Span::styled(format!("{} ({})", truncate(player.display_name(), 14), player.hand_size), style));
			spans.extend(player_badges(player, self.theme));
		}

		if spans.is_empty() {
			spans.push(Span::styled("Waiting for opponents…", Style::default().fg(Color::DarkGray)));
		}

		Paragraph::new(Line::from(spans)).render(area, buf);
	}
}

/// Top of the discard pile, the active color and any pending penalties.
pub struct PileWidget<'a> {
	view: &'a MatchView,
	theme: &'a Theme,
	bordered: bool,
}

impl<'a> PileWidget<'a> {
	pub fn new(view: &'a MatchView, theme: &'a Theme) -> Self {
		Self { view, theme, bordered: true }
	}

	pub fn bordered(mut self, bordered: bool) -> Self {
		self.bordered = bordered;
		self
	}
}

impl Widget for PileWidget<'_> {
	fn render(self, area: Rect, buf: &mut Buffer) {
		let mut spans = vec![Span::styled("Discard ", Style::default().fg(Color::DarkGray))];

		match self.view.top_discard_card {
			Some(card) => {
				spans.push(render_card(card, self.theme));
				spans.push(Span::raw(format!(" {}", card.name())));
			}
			None => spans.push(Span::styled("--", Style::default().fg(Color::DarkGray))),
		}

		if let Some(color) = self.view.current_color {
			spans.push(Span::styled("  Color ", Style::default().fg(Color::DarkGray)));
			spans.push(Span::styled(
				color.name(),
				Style::default().fg(self.theme.card(color)).add_modifier(Modifier::BOLD),
			));
		}

		if self.view.draw_stack > 0 {
			spans.push(Span::styled(
				format!("  Draw stack +{}", self.view.draw_stack),
				Style::default().fg(self.theme.uno()).add_modifier(Modifier::BOLD),
			));
		}
		if self.view.red_fury_active {
			spans.push(Span::styled("  RED FURY", Style::default().fg(self.theme.card(CardColor::Red))));
		}
		if self.view.shield_window_active {
			spans.push(Span::styled("  Shield window", Style::default().fg(self.theme.selected())));
		}

		let paragraph = Paragraph::new(Line::from(spans));
		if self.bordered {
			paragraph
				.block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(self.theme.board_border())))
				.render(area, buf);
		} else {
			paragraph.render(area, buf);
		}
	}
}

pub struct HandWidget<'a> {
	cards: &'a [CardId],
	playable: &'a [CardId],
	selected: Option<CardId>,
	theme: &'a Theme,
	my_turn: bool,
}

impl<'a> HandWidget<'a> {
	pub fn new(cards: &'a [CardId], theme: &'a Theme) -> Self {
		Self { cards, playable: &[], selected: None, theme, my_turn: false }
	}

	pub fn playable(mut self, playable: &'a [CardId]) -> Self {
		self.playable = playable;
		self
	}

	pub fn selected(mut self, selected: Option<CardId>) -> Self {
		self.selected = selected;
		self
	}

	pub fn my_turn(mut self, my_turn: bool) -> Self {
		self.my_turn = my_turn;
		self
	}
}

impl Widget for HandWidget<'_> {
	fn render(self, area: Rect, buf: &mut Buffer) {
		let border_style = if self.my_turn {
			Style::default().fg(self.theme.current_player()).add_modifier(Modifier::BOLD)
		} else {
			Style::default().fg(self.theme.hand_border())
		};
		let block = Block::default()
			.borders(Borders::ALL)
			.border_type(self.theme.hand_border_type())
			.border_style(border_style)
			.title(format!(" Your Hand ({}) ", self.cards.len()));

		let mut spans = Vec::with_capacity(self.cards.len() * 2);
		for card in self.cards {
			let mut style = card_style(*card, self.theme);
			if self.playable.contains(card) {
				style = style.add_modifier(Modifier::UNDERLINED);
			} else if self.my_turn && !self.playable.is_empty() {
				style = style.add_modifier(Modifier::DIM);
			}
			if self.selected == Some(*card) {
				style = style.bg(self.theme.selected()).fg(Color::Black);
			}
			spans.push(Span::styled(card_label(*card), style));
			spans.push(Span::raw(" "));
		}

		let mut lines = vec![Line::from(spans)];
		if let Some(card) = self.selected {
			lines.push(Line::styled(card.name(), Style::default().fg(self.theme.selected())));
		}

		Paragraph::new(lines)
			.wrap(Wrap { trim: false })
			.block(block)
			.render(area, buf);
	}
}

pub struct EventLogWidget<'a> {
	log: &'a EventLog,
	theme: &'a Theme,
}

impl<'a> EventLogWidget<'a> {
	pub fn new(log: &'a EventLog, theme: &'a Theme) -> Self {
		Self { log, theme }
	}
}

impl Widget for EventLogWidget<'_> {
	fn render(self, area: Rect, buf: &mut Buffer) {
		let block = Block::default()
			.borders(Borders::ALL)
			.border_style(Style::default().fg(self.theme.log_border()))
			.title(" Event Log ");

		let inner = block.inner(area);
		block.render(area, buf);

		let notices: Vec<Line> = self
			.log
			.notifications()
			.iter()
			.map(|n| Line::styled(format!("» {}", n.message), Style::default().fg(self.theme.level(n.level)).add_modifier(Modifier::BOLD)))
			.collect();

		let max_lines = (inner.height as usize).saturating_sub(notices.len());
		let mut lines: Vec<Line> = self
			.log
			.recent(max_lines)
			.map(|entry| {
				Line::from(vec![
					Span::styled(format!("{} ", entry.timestamp()), Style::default().fg(Color::DarkGray)),
					Span::styled(entry.message.clone(), Style::default().fg(self.theme.level(entry.level))),
				])
			})
			.collect();
		lines.extend(notices);

		Paragraph::new(lines).render(inner, buf);
	}
}

pub struct ScoresWidget<'a> {
	view: &'a MatchView,
	theme: &'a Theme,
}

impl<'a> ScoresWidget<'a> {
	pub fn new(view: &'a MatchView, theme: &'a Theme) -> Self {
		Self { view, theme }
	}
}

impl Widget for ScoresWidget<'_> {
	fn render(self, area: Rect, buf: &mut Buffer) {
		let winner = self.view.winner.as_deref().unwrap_or("nobody");
		let block = Block::default()
			.borders(Borders::ALL)
			.border_style(Style::default().fg(self.theme.winner()))
			.title(format!(" Game Over - {} wins ", winner));

		let lines: Vec<Line> = self
			.view
			.score_lines()
			.into_iter()
			.map(|(name, score)| {
				let style = if name == winner {
					Style::default().fg(self.theme.winner()).add_modifier(Modifier::BOLD)
				} else {
					Style::default()
				};
				Line::styled(format!("{:<20} {:>5}", name, score), style)
			})
			.collect();

		Paragraph::new(lines).block(block).render(area, buf);
	}
}

/// The whole match screen: header, opponents, pile, hand and log.
pub struct BoardWidget<'a> {
	view: &'a MatchView,
	my_user_id: &'a str,
	log: &'a EventLog,
	theme: &'a Theme,
	timer: TimeDisplay,
	selected: Option<CardId>,
	mode: LayoutMode,
}

impl<'a> BoardWidget<'a> {
	pub fn new(view: &'a MatchView, my_user_id: &'a str, log: &'a EventLog, theme: &'a Theme) -> Self {
		Self {
			view,
			my_user_id,
			log,
			theme,
			timer: TimeDisplay::new(0),
			selected: None,
			mode: LayoutMode::default(),
		}
	}

	pub fn timer(mut self, timer: TimeDisplay) -> Self {
		self.timer = timer;
		self
	}

	pub fn selected(mut self, selected: Option<CardId>) -> Self {
		self.selected = selected;
		self
	}

	pub fn layout(mut self, mode: LayoutMode) -> Self {
		self.mode = mode;
		self
	}

	fn header_line(&self) -> Line<'static> {
		let match_id = self.view.match_id.as_deref().unwrap_or("-");
		let mut spans = vec![Span::styled(
			format!(" Match {} ", truncate(match_id, 12)),
			Style::default().add_modifier(Modifier::BOLD),
		)];

		if let Some(mode) = &self.view.game_mode {
			spans.push(Span::styled(format!("[{}] ", mode), Style::default().fg(Color::DarkGray)));
		}

		if !self.view.is_game_started {
			spans.push(Span::styled("Waiting to start", Style::default().fg(Color::DarkGray)));
			return Line::from(spans);
		}

		let turn = if self.view.is_my_turn(self.my_user_id) {
			Span::styled("Your turn", Style::default().fg(self.theme.current_player()).add_modifier(Modifier::BOLD))
		} else {
			let name = self.view.current_player_name.clone().unwrap_or_else(|| "-".to_string());
			Span::raw(format!("{}'s turn", name))
		};
		spans.push(turn);

		let timer_style = Style::default().fg(self.theme.timer(self.timer.is_warning));
		let timer_style = if self.timer.is_warning { timer_style.add_modifier(Modifier::BOLD) } else { timer_style };
		spans.push(Span::styled(format!("  ⏱ {}", self.timer.display), timer_style));
		Line::from(spans)
	}
}

impl Widget for BoardWidget<'_> {
	fn render(self, area: Rect, buf: &mut Buffer) {
		let opponents: Vec<&PlayerView> = self.view.opponents(self.my_user_id).collect();
		let layout = BoardLayout::compute(area, opponents.len(), self.mode);

		Paragraph::new(self.header_line()).render(layout.header, buf);

		match self.mode {
			LayoutMode::Expanded => {
				let current = self.view.current_player().map(|p| p.user_id.as_str());
				let winner = self.view.winner.as_deref();
				for (player, seat) in opponents.iter().zip(layout.seats.iter()) {
					let is_winner = winner.is_some_and(|w| w == player.display_name() || w == player.user_id);
					PlayerWidget::new(player, self.theme)
						.current(current == Some(player.user_id.as_str()))
						.winner(is_winner)
						.render(*seat, buf);
				}
			}
			LayoutMode::Compact => {
				if let Some(seat) = layout.seats.first() {
					OpponentsLine::new(self.view, self.my_user_id, self.theme).render(*seat, buf);
				}
			}
		}

		PileWidget::new(self.view, self.theme)
			.bordered(self.mode == LayoutMode::Expanded)
			.render(layout.pile, buf);

		HandWidget::new(&self.view.my_hand, self.theme)
			.playable(self.view.playable_hint(self.my_user_id))
			.selected(self.selected)
			.my_turn(self.view.is_my_turn(self.my_user_id))
			.render(layout.hand, buf);

		if self.view.game_ended {
			ScoresWidget::new(self.view, self.theme).render(layout.log, buf);
		} else {
			EventLogWidget::new(self.log, self.theme).render(layout.log, buf);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ratatui::{Terminal, backend::TestBackend};

	fn buffer_text(buf: &Buffer) -> String {
		let area = buf.area;
		let mut text = String::new();
		for y in 0..area.height {
			for x in 0..area.width {
				text.push_str(buf[(x, y)].symbol());
			}
			text.push('\n');
		}
		text
	}

	fn sample_view() -> MatchView {
		let mut view = MatchView::new();
		view.match_id = Some("m1".to_string());
		view.is_game_started = true;
		view.players = vec![PlayerView::new("A", "Alice"), PlayerView::new("B", "Bob")];
		view.players[1].hand_size = 1;
		view.current_player_index = Some(0);
		view.current_player_name = Some("Alice".to_string());
		view.my_hand = vec![CardId(1), CardId(100)];
		view.playable_cards = vec![CardId(1)];
		view.top_discard_card = Some(CardId(2));
		view.current_color = Some(CardColor::Red);
		view.draw_stack = 2;
		view
	}

	#[test]
	fn test_card_label() {
		assert_eq!(card_label(CardId(1)), "[R1]");
		assert_eq!(card_label(CardId(100)), "[W]");
		assert_eq!(card_label(CardId(103)), "[+4]");
		assert_eq!(card_label(CardId(500)), "[??]");
	}

	#[test]
	fn test_truncate() {
		assert_eq!(truncate("Alexandria", 6), "Alexa…");
		assert_eq!(truncate("Bob", 6), "Bob");
	}

	#[test]
	fn test_board_renders_expanded() {
		let view = sample_view();
		let log = EventLog::new(10, 3000);
		let theme = Theme::default();
		let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
		terminal
			.draw(|f| {
				let widget = BoardWidget::new(&view, "A", &log, &theme).timer(TimeDisplay::new(42));
				f.render_widget(widget, f.area());
			})
			.unwrap();

		let text = buffer_text(terminal.backend().buffer());
		assert!(text.contains("Your turn"));
		assert!(text.contains("00:42"));
		assert!(text.contains("Bob"));
		assert!(text.contains("UNO!"));
		assert!(text.contains("Your Hand (2)"));
		assert!(text.contains("Draw stack +2"));
	}

	#[test]
	fn test_board_renders_compact_and_scores() {
		let mut view = sample_view();
		view.game_ended = true;
		view.winner = Some("Alice".to_string());
		view.scores.insert("A".to_string(), crate::view::ScoreEntry { score: 30, username: None });

		let log = EventLog::new(10, 3000);
		let theme = Theme::default();
		let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
		terminal
			.draw(|f| {
				let widget = BoardWidget::new(&view, "B", &log, &theme).layout(LayoutMode::Compact);
				f.render_widget(widget, f.area());
			})
			.unwrap();

		let text = buffer_text(terminal.backend().buffer());
		assert!(text.contains("Alice's turn"));
		assert!(text.contains("Alice (0)"));
		assert!(text.contains("Game Over - Alice wins"));
	}
}
