use include_dir::{Dir, include_dir};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::APP_DIR;

static CONFIG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/config");

/// Writes the bundled config files into the user's config directory, leaving
/// any file that already exists untouched. Returns the directory used.
pub fn ensure_config() -> Option<PathBuf> {
	let user_config = dirs::config_dir()?;
	let dest = user_config.join(APP_DIR);

	extract_dir(&CONFIG_DIR, &dest);
	Some(dest)
}

fn extract_dir(dir: &Dir, dest: &Path) {
	for file in dir.files() {
		let file_dest = dest.join(file.path());
		if !file_dest.exists() {
			if let Some(parent) = file_dest.parent() {
				let _ = fs::create_dir_all(parent);
			}
			if let Err(e) = fs::write(&file_dest, file.contents()) {
				tracing::warn!(path = %file_dest.display(), error = %e, "could not write default config");
			}
		}
	}

	for subdir in dir.dirs() {
		extract_dir(subdir, dest);
	}
}

pub fn bundled_config() -> Option<&'static str> {
	CONFIG_DIR.get_file(crate::config::CONFIG_FILE)?.contents_utf8()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::HarnessConfig;

	#[test]
	fn test_bundled_config_parses() {
		let content = bundled_config().expect("bundled harness.toml");
		let config = HarnessConfig::parse(content).unwrap();
		assert_eq!(config.harness.animation_delay_ms, 2000);
		assert_eq!(config.server.socket_port, "7351");
	}

	#[test]
	fn test_extract_skips_existing_files() {
		let dest = std::env::temp_dir().join(format!("uno-harness-defaults-{}", std::process::id()));
		let _ = fs::remove_dir_all(&dest);
		fs::create_dir_all(&dest).unwrap();
		fs::write(dest.join(crate::config::CONFIG_FILE), "# mine").unwrap();

		extract_dir(&CONFIG_DIR, &dest);

		let content = fs::read_to_string(dest.join(crate::config::CONFIG_FILE)).unwrap();
		assert_eq!(content, "# mine");
		let _ = fs::remove_dir_all(&dest);
	}
}
