use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HarnessError, Result};

pub const CONFIG_FILE: &str = "harness.toml";
pub const APP_DIR: &str = "uno-harness";

fn config_paths(filename: &str) -> Vec<PathBuf> {
	let mut paths = Vec::new();

	if let Some(home) = std::env::var_os("HOME") {
		let user_config = PathBuf::from(home).join(".config").join(APP_DIR).join(filename);
		paths.push(user_config);
	}

	paths.push(PathBuf::from("config").join(filename));

	paths
}

pub(crate) fn find_config(filename: &str) -> Option<PathBuf> {
	config_paths(filename).into_iter().find(|p| p.exists())
}

pub fn resolve_config(filename: &str) -> Result<PathBuf> {
	find_config(filename).ok_or_else(|| {
		let searched: Vec<_> = config_paths(filename)
			.iter()
			.map(|p| p.display().to_string())
			.collect();
		HarnessError::Config(format!("Config file '{}' not found. Searched: {}", filename, searched.join(", ")))
	})
}

/// Ports may be written as numbers or strings; an empty string means the
/// scheme's standard port.
fn de_port<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum RawPort {
		Number(u16),
		Text(String),
	}

	Ok(match RawPort::deserialize(deserializer)? {
		RawPort::Number(n) => n.to_string(),
		RawPort::Text(s) => s.trim().to_string(),
	})
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port", deserialize_with = "de_port")]
	pub port: String,
	#[serde(default = "default_socket_port", deserialize_with = "de_port")]
	pub socket_port: String,
	#[serde(default)]
	pub use_ssl: bool,
	#[serde(default = "default_server_key")]
	pub server_key: String,
	#[serde(default = "default_http_key")]
	pub http_key: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> String { "7350".to_string() }
fn default_socket_port() -> String { "7351".to_string() }
fn default_server_key() -> String { "defaultkey".to_string() }
fn default_http_key() -> String { "defaulthttpkey".to_string() }

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
			socket_port: default_socket_port(),
			use_ssl: false,
			server_key: default_server_key(),
			http_key: default_http_key(),
		}
	}
}

impl ServerConfig {
	/// The HTTP port, or an empty string when it is the scheme's default.
	pub fn normalized_port(&self) -> &str {
		match (self.use_ssl, self.port.as_str()) {
			(true, "443") | (false, "80") => "",
			(_, port) => port,
		}
	}

	pub fn scheme(&self) -> &'static str {
		if self.use_ssl { "https" } else { "http" }
	}

	pub fn http_url(&self) -> String {
		let port = self.normalized_port();
		if port.is_empty() {
			format!("{}://{}", self.scheme(), self.host)
		} else {
			format!("{}://{}:{}", self.scheme(), self.host, port)
		}
	}

	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.host, self.socket_port)
	}

	pub fn is_production(&self) -> bool {
		self.host != "localhost" && self.host != "127.0.0.1"
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessSettings {
	#[serde(default = "default_animation_delay")]
	pub animation_delay_ms: u64,
	#[serde(default = "default_notification_ttl")]
	pub notification_ttl_ms: u64,
	#[serde(default = "default_follow_poll")]
	pub follow_poll_secs: u64,
	#[serde(default = "default_event_log_limit")]
	pub event_log_limit: usize,
}

fn default_animation_delay() -> u64 { 2000 }
fn default_notification_ttl() -> u64 { 3000 }
fn default_follow_poll() -> u64 { 10 }
fn default_event_log_limit() -> usize { 500 }

impl Default for HarnessSettings {
	fn default() -> Self {
		Self {
			animation_delay_ms: default_animation_delay(),
			notification_ttl_ms: default_notification_ttl(),
			follow_poll_secs: default_follow_poll(),
			event_log_limit: default_event_log_limit(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
	Compact,
	#[default]
	Expanded,
}

impl LayoutMode {
	pub fn toggle(self) -> Self {
		match self {
			LayoutMode::Compact => LayoutMode::Expanded,
			LayoutMode::Expanded => LayoutMode::Compact,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UiConfig {
	#[serde(default)]
	pub layout: LayoutMode,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
	#[serde(default)]
	pub dir: Option<PathBuf>,
}

impl LoggingConfig {
	pub fn resolve_dir(&self) -> PathBuf {
		self.dir.clone().unwrap_or_else(|| {
			dirs::data_local_dir()
				.map(|d| d.join(APP_DIR).join("logs"))
				.unwrap_or_else(|| PathBuf::from("logs"))
		})
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
	#[serde(default)]
	pub server: ServerConfig,
	#[serde(default)]
	pub harness: HarnessSettings,
	#[serde(default)]
	pub ui: UiConfig,
	#[serde(default)]
	pub logging: LoggingConfig,
}

impl HarnessConfig {
	pub fn parse(content: &str) -> Result<Self> {
		toml::from_str(content).map_err(|e| HarnessError::Config(format!("Failed to parse harness config: {}", e)))
	}

	/// Applies `UNO_*` overrides through `lookup`, normally `std::env::var`.
	pub fn apply_overrides<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(host) = lookup("UNO_SERVER_HOST") {
			self.server.host = host;
		}
		if let Some(port) = lookup("UNO_SERVER_PORT") {
			self.server.port = port.trim().to_string();
		}
		if let Some(port) = lookup("UNO_SOCKET_PORT") {
			self.server.socket_port = port.trim().to_string();
		}
		if let Some(ssl) = lookup("UNO_USE_SSL") {
			self.server.use_ssl = ssl.trim().eq_ignore_ascii_case("true");
		}
		if let Some(key) = lookup("UNO_SERVER_KEY") {
			self.server.server_key = key;
		}
		if let Some(key) = lookup("UNO_HTTP_KEY") {
			self.server.http_key = key;
		}
	}
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HarnessConfig> {
	let content = fs::read_to_string(&path)
		.map_err(|e| HarnessError::Config(format!("Failed to read {}: {}", path.as_ref().display(), e)))?;
	HarnessConfig::parse(&content)
}

/// Loads the first config file found (or built-in defaults) and applies the
/// environment overrides.
pub fn load_config_auto() -> Result<HarnessConfig> {
	let mut config = match find_config(CONFIG_FILE) {
		Some(path) => load_config(path)?,
		None => HarnessConfig::default(),
	};
	config.apply_overrides(|key| std::env::var(key).ok());
	Ok(config)
}
