//! Card catalog for the 110-card deck the server deals.
//!
//! Ids 0–99 are four colored blocks of 25 (one 0, two each of 1–9, two Skip,
//! two Reverse, two Draw Two). Ids 100–109 are the wild and special cards.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DECK_SIZE: u32 = 110;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCard {
	Id(u32),
	Object { id: u32 },
}

impl<'de> Deserialize<'de> for CardId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		match RawCard::deserialize(deserializer)? {
			RawCard::Id(id) | RawCard::Object { id } => Ok(CardId(id)),
		}
	}
}

impl CardId {
	/// Accepts either a bare id or an object carrying an `id` field.
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::Number(n) => n.as_u64().and_then(|id| u32::try_from(id).ok()).map(CardId),
			Value::Object(map) => map.get("id").and_then(CardId::from_value),
			_ => None,
		}
	}

	pub fn info(&self) -> Option<CardInfo> {
		CardInfo::lookup(*self)
	}

	pub fn name(&self) -> String {
		self.info()
			.map(|info| info.name())
			.unwrap_or_else(|| "Unknown Card".to_string())
	}
}

impl fmt::Display for CardId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardColor {
	Red,
	Blue,
	Green,
	Yellow,
	Wild,
}

impl CardColor {
	pub const CHOOSABLE: [CardColor; 4] = [CardColor::Red, CardColor::Blue, CardColor::Green, CardColor::Yellow];

	pub fn from_index(index: u64) -> Option<Self> {
		match index {
			0 => Some(CardColor::Red),
			1 => Some(CardColor::Blue),
			2 => Some(CardColor::Green),
			3 => Some(CardColor::Yellow),
			4 => Some(CardColor::Wild),
			_ => None,
		}
	}

	/// The server sends colors as indices; older builds sent names.
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::Number(n) => n.as_u64().and_then(CardColor::from_index),
			Value::String(s) => CardColor::parse(s),
			_ => None,
		}
	}

	pub fn parse(s: &str) -> Option<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"0" | "r" | "red" => Some(CardColor::Red),
			"1" | "b" | "blue" => Some(CardColor::Blue),
			"2" | "g" | "green" => Some(CardColor::Green),
			"3" | "y" | "yellow" => Some(CardColor::Yellow),
			"4" | "w" | "wild" => Some(CardColor::Wild),
			_ => None,
		}
	}

	pub fn index(&self) -> u8 {
		match self {
			CardColor::Red => 0,
			CardColor::Blue => 1,
			CardColor::Green => 2,
			CardColor::Yellow => 3,
			CardColor::Wild => 4,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			CardColor::Red => "Red",
			CardColor::Blue => "Blue",
			CardColor::Green => "Green",
			CardColor::Yellow => "Yellow",
			CardColor::Wild => "Wild",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
	Number(u8),
	Skip,
	Reverse,
	DrawTwo,
	Wild,
	WildDrawFour,
	BlueThunder,
	Shield,
	SkipBlast,
	RedFury,
}

impl CardKind {
	pub fn name(&self) -> &'static str {
		match self {
			CardKind::Number(_) => "Number",
			CardKind::Skip => "Skip",
			CardKind::Reverse => "Reverse",
			CardKind::DrawTwo => "Draw Two",
			CardKind::Wild => "Wild",
			CardKind::WildDrawFour => "Wild Draw Four",
			CardKind::BlueThunder => "Blue Thunder",
			CardKind::Shield => "Shield",
			CardKind::SkipBlast => "Skip Blast",
			CardKind::RedFury => "Red Fury",
		}
	}

	/// Short face label for narrow displays.
	pub fn symbol(&self) -> String {
		match self {
			CardKind::Number(value) => value.to_string(),
			CardKind::Skip => "⊘".to_string(),
			CardKind::Reverse => "⇄".to_string(),
			CardKind::DrawTwo => "+2".to_string(),
			CardKind::Wild => "W".to_string(),
			CardKind::WildDrawFour => "+4".to_string(),
			CardKind::BlueThunder => "BT".to_string(),
			CardKind::Shield => "SH".to_string(),
			CardKind::SkipBlast => "SB".to_string(),
			CardKind::RedFury => "RF".to_string(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardInfo {
	pub id: CardId,
	pub color: CardColor,
	pub kind: CardKind,
	pub points: u32,
	pub can_stack: bool,
	pub is_seven_o: bool,
}

impl CardInfo {
	pub fn lookup(id: CardId) -> Option<Self> {
		let raw = id.0;
		if raw >= DECK_SIZE {
			return None;
		}

		if raw < 100 {
			let color = CardColor::from_index(u64::from(raw / 25))?;
			let (kind, points) = match raw % 25 {
				0 => (CardKind::Number(0), 0),
				offset @ 1..=18 => {
					let value = ((offset + 1) / 2) as u8;
					(CardKind::Number(value), u32::from(value))
				}
				19 | 20 => (CardKind::Skip, 20),
				21 | 22 => (CardKind::Reverse, 20),
				_ => (CardKind::DrawTwo, 20),
			};
			return Some(Self {
				id,
				color,
				kind,
				points,
				can_stack: kind == CardKind::DrawTwo,
				is_seven_o: matches!(kind, CardKind::Number(0) | CardKind::Number(7)),
			});
		}

		let (color, kind, points) = match raw {
			100..=102 => (CardColor::Wild, CardKind::Wild, 50),
			103..=105 => (CardColor::Wild, CardKind::WildDrawFour, 50),
			106 => (CardColor::Blue, CardKind::BlueThunder, 30),
			107 => (CardColor::Wild, CardKind::Shield, 40),
			108 => (CardColor::Wild, CardKind::SkipBlast, 50),
			_ => (CardColor::Red, CardKind::RedFury, 40),
		};
		Some(Self {
			id,
			color,
			kind,
			points,
			can_stack: kind == CardKind::WildDrawFour,
			is_seven_o: false,
		})
	}

	pub fn name(&self) -> String {
		match self.kind {
			CardKind::Number(value) => format!("{} {}", self.color.name(), value),
			CardKind::Wild | CardKind::WildDrawFour => self.kind.name().to_string(),
			_ if self.color == CardColor::Wild => self.kind.name().to_string(),
			_ => format!("{} {}", self.color.name(), self.kind.name()),
		}
	}

	pub fn is_wild(&self) -> bool {
		matches!(self.kind, CardKind::Wild | CardKind::WildDrawFour)
	}

	/// Wild cards need a chosen color when played.
	pub fn needs_color(&self) -> bool {
		self.is_wild()
	}

	pub fn is_action(&self) -> bool {
		!matches!(self.kind, CardKind::Number(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_number_cards() {
		let zero = CardId(0).info().unwrap();
		assert_eq!(zero.kind, CardKind::Number(0));
		assert!(zero.is_seven_o);
		assert_eq!(zero.name(), "Red 0");

		let seven = CardId(13).info().unwrap();
		assert_eq!(seven.kind, CardKind::Number(7));
		assert!(seven.is_seven_o);
		assert_eq!(seven.points, 7);

		assert_eq!(CardId(18).name(), "Red 9");
		assert_eq!(CardId(25).name(), "Blue 0");
		assert_eq!(CardId(93).name(), "Yellow 9");
	}

	#[test]
	fn test_action_cards() {
		assert_eq!(CardId(19).name(), "Red Skip");
		assert_eq!(CardId(46).name(), "Blue Reverse");

		let draw_two = CardId(23).info().unwrap();
		assert_eq!(draw_two.kind, CardKind::DrawTwo);
		assert!(draw_two.can_stack);
		assert!(draw_two.is_action());
	}

	#[test]
	fn test_wild_and_special_cards() {
		assert_eq!(CardId(100).name(), "Wild");
		assert_eq!(CardId(103).name(), "Wild Draw Four");
		assert!(CardId(103).info().unwrap().can_stack);
		assert_eq!(CardId(106).name(), "Blue Blue Thunder");
		assert_eq!(CardId(107).name(), "Shield");
		assert_eq!(CardId(108).name(), "Skip Blast");
		assert_eq!(CardId(109).name(), "Red Red Fury");
		assert!(CardId(101).info().unwrap().needs_color());
		assert!(!CardId(107).info().unwrap().needs_color());
	}

	#[test]
	fn test_out_of_range() {
		assert!(CardId(110).info().is_none());
		assert_eq!(CardId(500).name(), "Unknown Card");
	}

	#[test]
	fn test_card_id_accepts_number_or_object() {
		let ids: Vec<CardId> = serde_json::from_value(json!([5, {"id": 42, "color": 1}])).unwrap();
		assert_eq!(ids, vec![CardId(5), CardId(42)]);

		assert_eq!(CardId::from_value(&json!({"id": 7})), Some(CardId(7)));
		assert_eq!(CardId::from_value(&json!("7")), None);
	}

	#[test]
	fn test_color_parsing() {
		assert_eq!(CardColor::from_value(&json!(2)), Some(CardColor::Green));
		assert_eq!(CardColor::from_value(&json!("yellow")), Some(CardColor::Yellow));
		assert_eq!(CardColor::from_value(&json!(9)), None);
		assert_eq!(CardColor::parse("B"), Some(CardColor::Blue));
	}
}
