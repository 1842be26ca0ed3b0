use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
	#[default]
	#[serde(rename = "2p")]
	TwoPlayer,
	#[serde(rename = "3p")]
	ThreePlayer,
	#[serde(rename = "4p")]
	FourPlayer,
	#[serde(rename = "2v2")]
	Teams,
}

impl GameMode {
	pub const ALL: [GameMode; 4] = [GameMode::TwoPlayer, GameMode::ThreePlayer, GameMode::FourPlayer, GameMode::Teams];

	pub fn code(&self) -> &'static str {
		match self {
			GameMode::TwoPlayer => "2p",
			GameMode::ThreePlayer => "3p",
			GameMode::FourPlayer => "4p",
			GameMode::Teams => "2v2",
		}
	}

	pub fn player_count(&self) -> usize {
		match self {
			GameMode::TwoPlayer => 2,
			GameMode::ThreePlayer => 3,
			GameMode::FourPlayer | GameMode::Teams => 4,
		}
	}

	pub fn display_name(&self) -> &'static str {
		match self {
			GameMode::TwoPlayer => "2 Players",
			GameMode::ThreePlayer => "3 Players",
			GameMode::FourPlayer => "4 Players",
			GameMode::Teams => "2v2 Team",
		}
	}
}

impl fmt::Display for GameMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}

impl FromStr for GameMode {
	type Err = HarnessError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		GameMode::ALL
			.into_iter()
			.find(|mode| mode.code().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| HarnessError::InvalidArgument(format!("unknown game mode '{}' (2p, 3p, 4p, 2v2)", s)))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
	#[default]
	Private,
	Random,
}

impl MatchType {
	pub fn code(&self) -> &'static str {
		match self {
			MatchType::Private => "private",
			MatchType::Random => "random",
		}
	}
}

impl FromStr for MatchType {
	type Err = HarnessError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"private" => Ok(MatchType::Private),
			"random" => Ok(MatchType::Random),
			other => Err(HarnessError::InvalidArgument(format!("unknown match type '{}'", other))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_player_counts() {
		let counts: Vec<usize> = GameMode::ALL.iter().map(|m| m.player_count()).collect();
		assert_eq!(counts, vec![2, 3, 4, 4]);
	}

	#[test]
	fn test_parse_modes() {
		assert_eq!("2v2".parse::<GameMode>().unwrap(), GameMode::Teams);
		assert_eq!(" 3P ".parse::<GameMode>().unwrap(), GameMode::ThreePlayer);
		assert!("5p".parse::<GameMode>().is_err());
		assert_eq!("Random".parse::<MatchType>().unwrap(), MatchType::Random);
	}

	#[test]
	fn test_display_names() {
		assert_eq!(GameMode::Teams.display_name(), "2v2 Team");
		assert_eq!(GameMode::FourPlayer.to_string(), "4p");
	}
}
