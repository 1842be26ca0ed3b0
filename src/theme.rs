use std::fs;

use ratatui::style::Color;
use ratatui::widgets::BorderType;
use serde::{Deserialize, Serialize};

use crate::card::CardColor;
use crate::config::find_config;
use crate::event_log::LogLevel;

pub const THEME_FILE: &str = "theme.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
	pub hand_border_style: String,
	pub hand_border_color: String,

	pub current_player_color: String,
	pub opponent_border_color: String,
	pub disconnected_color: String,
	pub uno_color: String,
	pub winner_color: String,

	pub red_card_color: String,
	pub blue_card_color: String,
	pub green_card_color: String,
	pub yellow_card_color: String,
	pub wild_card_color: String,

	pub playable_color: String,
	pub selected_color: String,
	pub timer_color: String,
	pub timer_warning_color: String,

	pub board_border_color: String,
	pub log_border_color: String,

	pub info_color: String,
	pub success_color: String,
	pub warning_color: String,
	pub error_color: String,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			hand_border_style: "double".to_string(),
			hand_border_color: "cyan".to_string(),

			current_player_color: "yellow".to_string(),
			opponent_border_color: "white".to_string(),
			disconnected_color: "dark_gray".to_string(),
			uno_color: "light_red".to_string(),
			winner_color: "green".to_string(),

			red_card_color: "red".to_string(),
			blue_card_color: "light_blue".to_string(),
			green_card_color: "green".to_string(),
			yellow_card_color: "yellow".to_string(),
			wild_card_color: "magenta".to_string(),

			playable_color: "white".to_string(),
			selected_color: "cyan".to_string(),
			timer_color: "green".to_string(),
			timer_warning_color: "red".to_string(),

			board_border_color: "green".to_string(),
			log_border_color: "blue".to_string(),

			info_color: "gray".to_string(),
			success_color: "green".to_string(),
			warning_color: "yellow".to_string(),
			error_color: "red".to_string(),
		}
	}
}

impl Theme {
	/// The first `theme.toml` on the config search path, or the defaults.
	pub fn load() -> Self {
		find_config(THEME_FILE)
			.and_then(|path| fs::read_to_string(path).ok())
			.and_then(|contents| toml::from_str(&contents).ok())
			.unwrap_or_default()
	}

	pub fn hand_border_type(&self) -> BorderType {
		parse_border_type(&self.hand_border_style)
	}

	pub fn hand_border(&self) -> Color {
		parse_color(&self.hand_border_color)
	}

	pub fn current_player(&self) -> Color {
		parse_color(&self.current_player_color)
	}

	pub fn opponent_border(&self) -> Color {
		parse_color(&self.opponent_border_color)
	}

	pub fn disconnected(&self) -> Color {
		parse_color(&self.disconnected_color)
	}

	pub fn uno(&self) -> Color {
		parse_color(&self.uno_color)
	}

	pub fn winner(&self) -> Color {
		parse_color(&self.winner_color)
	}

	pub fn card(&self, color: CardColor) -> Color {
		let name = match color {
			CardColor::Red => &self.red_card_color,
			CardColor::Blue => &self.blue_card_color,
			CardColor::Green => &self.green_card_color,
			CardColor::Yellow => &self.yellow_card_color,
			CardColor::Wild => &self.wild_card_color,
		};
		parse_color(name)
	}

	pub fn playable(&self) -> Color {
		parse_color(&self.playable_color)
	}

	pub fn selected(&self) -> Color {
		parse_color(&self.selected_color)
	}

	pub fn timer(&self, warning: bool) -> Color {
		if warning {
			parse_color(&self.timer_warning_color)
		} else {
			parse_color(&self.timer_color)
		}
	}

	pub fn board_border(&self) -> Color {
		parse_color(&self.board_border_color)
	}

	pub fn log_border(&self) -> Color {
		parse_color(&self.log_border_color)
	}

	pub fn level(&self, level: LogLevel) -> Color {
		let name = match level {
			LogLevel::Info => &self.info_color,
			LogLevel::Success => &self.success_color,
			LogLevel::Warning => &self.warning_color,
			LogLevel::Error => &self.error_color,
		};
		parse_color(name)
	}
}

fn parse_color(s: &str) -> Color {
	match s.to_lowercase().as_str() {
		"black" => Color::Black,
		"red" => Color::Red,
		"green" => Color::Green,
		"yellow" => Color::Yellow,
		"blue" => Color::Blue,
		"magenta" => Color::Magenta,
		"cyan" => Color::Cyan,
		"gray" | "grey" => Color::Gray,
		"dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Color::DarkGray,
		"light_red" | "lightred" => Color::LightRed,
		"light_green" | "lightgreen" => Color::LightGreen,
		"light_yellow" | "lightyellow" => Color::LightYellow,
		"light_blue" | "lightblue" => Color::LightBlue,
		"light_magenta" | "lightmagenta" => Color::LightMagenta,
		"light_cyan" | "lightcyan" => Color::LightCyan,
		"white" => Color::White,
		other => other
			.strip_prefix('#')
			.and_then(|hex| u32::from_str_radix(hex, 16).ok())
			.map(|rgb| Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8))
			.unwrap_or(Color::White),
	}
}

fn parse_border_type(s: &str) -> BorderType {
	match s.to_lowercase().as_str() {
		"double" => BorderType::Double,
		"thick" => BorderType::Thick,
		"rounded" => BorderType::Rounded,
		_ => BorderType::Plain,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_color_names() {
		assert_eq!(parse_color("red"), Color::Red);
		assert_eq!(parse_color("LIGHT_BLUE"), Color::LightBlue);
		assert_eq!(parse_color("darkgrey"), Color::DarkGray);
		assert_eq!(parse_color("chartreuse"), Color::White);
	}

	#[test]
	fn test_parse_color_hex() {
		assert_eq!(parse_color("#FF0000"), Color::Rgb(255, 0, 0));
		assert_eq!(parse_color("#00ff80"), Color::Rgb(0, 255, 128));
	}

	#[test]
	fn test_card_colors() {
		let theme = Theme::default();
		assert_eq!(theme.card(CardColor::Red), Color::Red);
		assert_eq!(theme.card(CardColor::Wild), Color::Magenta);
		assert_eq!(theme.timer(true), Color::Red);
	}

	#[test]
	fn test_partial_theme_keeps_defaults() {
		let theme: Theme = toml::from_str("red_card_color = \"#aa0000\"").unwrap();
		assert_eq!(theme.card(CardColor::Red), Color::Rgb(0xaa, 0, 0));
		assert_eq!(theme.card(CardColor::Green), Color::Green);
		assert_eq!(theme.hand_border_type(), BorderType::Double);
	}
}
