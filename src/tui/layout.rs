use ratatui::layout::Rect;

use crate::config::LayoutMode;

pub struct BoardLayout {
	pub header: Rect,
	pub seats: Vec<Rect>,
	pub pile: Rect,
	pub hand: Rect,
	pub log: Rect,
}

impl BoardLayout {
	/// Splits the board into stacked bands. Expanded mode gives each opponent
	/// a boxed seat; compact mode squeezes them onto one line.
	pub fn compute(area: Rect, num_opponents: usize, mode: LayoutMode) -> Self {
		let (seat_height, pile_height, hand_height) = match mode {
			LayoutMode::Expanded => (5, 3, 6),
			LayoutMode::Compact => (1, 1, 3),
		};

		let mut y = area.y;
		let mut take = |height: u16| {
			let bottom = area.y + area.height;
			let h = height.min(bottom.saturating_sub(y));
			let rect = Rect::new(area.x, y, area.width, h);
			y += h;
			rect
		};

		let header = take(1);
		let seat_row = take(seat_height);
		let pile = take(pile_height);
		let hand = take(hand_height);
		let log = take(area.height);

		let seats = match mode {
			LayoutMode::Expanded => layout_row(seat_row, num_opponents),
			LayoutMode::Compact => vec![seat_row],
		};

		Self { header, seats, pile, hand, log }
	}
}

fn layout_row(area: Rect, n: usize) -> Vec<Rect> {
	let n = n.clamp(1, 3) as u16;
	let width = area.width / n;

	(0..n)
		.map(|i| Rect::new(area.x + i * width, area.y, width, area.height))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_expanded_gives_each_opponent_a_seat() {
		let layout = BoardLayout::compute(Rect::new(0, 0, 90, 40), 3, LayoutMode::Expanded);
		assert_eq!(layout.seats.len(), 3);
		assert_eq!(layout.seats[0].width, 30);
		assert_eq!(layout.seats[2].x, 60);
		assert_eq!(layout.hand.height, 6);
		assert_eq!(layout.log.y, 1 + 5 + 3 + 6);
		assert_eq!(layout.log.height, 40 - 15);
	}

	#[test]
	fn test_compact_uses_one_line_for_opponents() {
		let layout = BoardLayout::compute(Rect::new(0, 0, 80, 24), 3, LayoutMode::Compact);
		assert_eq!(layout.seats.len(), 1);
		assert_eq!(layout.seats[0].height, 1);
		assert_eq!(layout.log.height, 24 - 6);
	}

	#[test]
	fn test_small_area_does_not_overflow() {
		let layout = BoardLayout::compute(Rect::new(0, 0, 40, 8), 1, LayoutMode::Expanded);
		assert!(layout.hand.y + layout.hand.height <= 8);
		assert_eq!(layout.log.height, 0);
	}
}
