use std::path::Path;
use std::sync::Mutex;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static MATCH_ID: Mutex<String> = Mutex::new(String::new());

/// Installs the file subscriber. The returned guard must outlive the program's
/// logging; dropping it flushes and stops the writer.
pub fn init(dir: &Path) -> std::io::Result<WorkerGuard> {
	std::fs::create_dir_all(dir)?;
	let appender = tracing_appender::rolling::daily(dir, "uno-harness.log");
	let (writer, guard) = tracing_appender::non_blocking(appender);

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let file_layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);

	// A second init in the same process (tests, repeated runs) is not an error.
	let _ = tracing_subscriber::registry().with(filter).with(file_layer).try_init();

	tracing::info!(dir = %dir.display(), "logging initialized");
	Ok(guard)
}

pub fn set_match_id(match_id: Option<&str>) {
	if let Ok(mut current) = MATCH_ID.lock() {
		current.clear();
		if let Some(id) = match_id {
			current.push_str(id);
		}
	}
}

fn match_id() -> String {
	MATCH_ID
		.lock()
		.map(|id| if id.is_empty() { "--------".to_string() } else { id.clone() })
		.unwrap_or_default()
}

pub fn log(module: &str, log_type: &str, message: &str) {
	tracing::info!(module, kind = log_type, match_id = %match_id(), "{}", message);
}

pub fn warn(module: &str, log_type: &str, message: &str) {
	tracing::warn!(module, kind = log_type, match_id = %match_id(), "{}", message);
}

pub fn log_verbatim(module: &str, log_type: &str, label: &str, content: &str) {
	let single_line = content.replace('\n', " ").replace('\r', "");
	tracing::debug!(module, kind = log_type, match_id = %match_id(), "{}: <<<{}>>>", label, single_line);
}

pub mod reconciler {
	use super::{log, warn};

	pub fn event(kind: &str) {
		tracing::debug!(module = "Reconciler", kind = "EVENT", "{}", kind);
	}

	pub fn delta(event_type: Option<&str>, version: Option<u64>) {
		tracing::debug!(
			module = "Reconciler",
			kind = "DELTA",
			"type={} version={}",
			event_type.unwrap_or("-"),
			version.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
		);
	}

	pub fn unknown_event(kind: &str) {
		warn("Reconciler", "UNKNOWN", kind);
	}

	pub fn dropped_key(event: &str, key: &str) {
		tracing::debug!(module = "Reconciler", kind = "DROP", "{}: ignored key {}", event, key);
	}

	pub fn terminal_ignored(event: &str) {
		log("Reconciler", "TERMINAL", &format!("{} after game end ignored", event));
	}

	pub fn game_ended(winner: Option<&str>) {
		log("Reconciler", "GAME", &format!("ended winner={}", winner.unwrap_or("-")));
	}
}

pub mod net {
	use super::{log, log_verbatim, warn};

	pub fn connected(addr: &str) {
		log("Net", "CONNECT", addr);
	}

	pub fn disconnected(reason: &str) {
		log("Net", "DISCONNECT", reason);
	}

	pub fn frame_dropped(reason: &str) {
		warn("Net", "DROP", reason);
	}

	pub fn rpc_call(rpc_id: &str) {
		log("Net", "RPC", rpc_id);
	}

	pub fn rpc_failed(rpc_id: &str, error: &str) {
		warn("Net", "RPC", &format!("{} failed: {}", rpc_id, error));
	}

	pub fn payload(direction: &str, content: &str) {
		log_verbatim("Net", "PAYLOAD", direction, content);
	}
}

pub mod actions {
	use super::{log, warn};

	pub fn sent(action: &str, match_id: &str) {
		log("Action", "SEND", &format!("{} -> {}", action, match_id));
	}

	pub fn failed(action: &str, error: &str) {
		warn("Action", "FAIL", &format!("{}: {}", action, error));
	}

	pub fn animation_ack(event_id: &str) {
		log("Action", "ACK", &format!("animation_complete eventId={}", event_id));
	}
}

pub mod tui {
	use super::log;

	pub fn input(key: &str) {
		tracing::trace!(module = "TUI", kind = "INPUT", "{}", key);
	}

	pub fn action(action_desc: &str) {
		log("TUI", "ACTION", action_desc);
	}
}
