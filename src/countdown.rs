use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Seconds at or below which the display turns into a warning.
pub const WARNING_SECS: u64 = 10;

pub fn now_ms() -> i64 {
	chrono::Utc::now().timestamp_millis()
}

/// Whole seconds left until `deadline_ms`, floored at zero.
pub fn seconds_remaining(deadline_ms: i64, now_ms: i64) -> u64 {
	(deadline_ms.saturating_sub(now_ms).max(0) / 1000) as u64
}

pub fn format_time(secs: u64) -> String {
	format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeDisplay {
	pub display: String,
	pub is_warning: bool,
	pub is_expired: bool,
}

impl TimeDisplay {
	pub fn new(secs: u64) -> Self {
		Self {
			display: format_time(secs),
			is_warning: (1..=WARNING_SECS).contains(&secs),
			is_expired: secs == 0,
		}
	}
}

/// Ticks once per second toward a deadline, publishing the remaining seconds.
///
/// Starting a new countdown aborts the previous tick task, so only the most
/// recently announced deadline is ever published.
pub struct Countdown {
	tx: watch::Sender<u64>,
	task: Option<JoinHandle<()>>,
}

impl Countdown {
	pub fn new() -> Self {
		let (tx, _) = watch::channel(0);
		Self { tx, task: None }
	}

	pub fn subscribe(&self) -> watch::Receiver<u64> {
		self.tx.subscribe()
	}

	pub fn seconds(&self) -> u64 {
		*self.tx.borrow()
	}

	pub fn display(&self) -> TimeDisplay {
		TimeDisplay::new(self.seconds())
	}

	pub fn is_running(&self) -> bool {
		self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
	}

	pub fn start(&mut self, deadline_ms: i64) {
		self.cancel();
		self.tx.send_replace(seconds_remaining(deadline_ms, now_ms()));

		let tx = self.tx.clone();
		self.task = Some(tokio::spawn(async move {
			let mut ticker = tokio::time::interval(Duration::from_secs(1));
			loop {
				ticker.tick().await;
				let secs = seconds_remaining(deadline_ms, now_ms());
				tx.send_replace(secs);
				if secs == 0 {
					break;
				}
			}
		}));
	}

	pub fn cancel(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}

	/// Cancels and zeroes the published value.
	pub fn reset(&mut self) {
		self.cancel();
		self.tx.send_replace(0);
	}
}

impl Default for Countdown {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Countdown {
	fn drop(&mut self) {
		self.cancel();
	}
}
