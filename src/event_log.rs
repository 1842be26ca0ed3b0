use std::collections::VecDeque;

use chrono::{DateTime, Duration, Local};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
	Info,
	Success,
	Warning,
	Error,
}

impl LogLevel {
	pub fn tag(&self) -> &'static str {
		match self {
			LogLevel::Info => "INFO",
			LogLevel::Success => "OK",
			LogLevel::Warning => "WARN",
			LogLevel::Error => "ERR",
		}
	}
}

#[derive(Debug, Clone)]
pub struct LogEntry {
	pub at: DateTime<Local>,
	pub kind: String,
	pub message: String,
	pub level: LogLevel,
	pub details: Option<Value>,
}

impl LogEntry {
	pub fn timestamp(&self) -> String {
		self.at.format("%H:%M:%S").to_string()
	}
}

#[derive(Debug, Clone)]
pub struct Notification {
	pub message: String,
	pub level: LogLevel,
	pub expires_at: DateTime<Local>,
}

/// Rolling log of server events and action outcomes, plus the transient
/// notifications shown on top of the board.
pub struct EventLog {
	entries: VecDeque<LogEntry>,
	limit: usize,
	notifications: Vec<Notification>,
	notification_ttl: Duration,
}

impl EventLog {
	pub fn new(limit: usize, notification_ttl_ms: u64) -> Self {
		Self {
			entries: VecDeque::new(),
			limit: limit.max(1),
			notifications: Vec::new(),
			notification_ttl: Duration::milliseconds(notification_ttl_ms as i64),
		}
	}

	pub fn push(&mut self, kind: &str, message: impl Into<String>, level: LogLevel, details: Option<Value>) {
		if self.entries.len() == self.limit {
			self.entries.pop_front();
		}
		self.entries.push_back(LogEntry {
			at: Local::now(),
			kind: kind.to_string(),
			message: message.into(),
			level,
			details,
		});
	}

	pub fn info(&mut self, kind: &str, message: impl Into<String>) {
		self.push(kind, message, LogLevel::Info, None);
	}

	pub fn error(&mut self, kind: &str, message: impl Into<String>) {
		self.push(kind, message, LogLevel::Error, None);
	}

	pub fn notify(&mut self, message: impl Into<String>, level: LogLevel) {
		self.notify_at(message, level, Local::now());
	}

	fn notify_at(&mut self, message: impl Into<String>, level: LogLevel, now: DateTime<Local>) {
		self.notifications.push(Notification {
			message: message.into(),
			level,
			expires_at: now + self.notification_ttl,
		});
	}

	pub fn expire(&mut self) {
		self.expire_at(Local::now());
	}

	fn expire_at(&mut self, now: DateTime<Local>) {
		self.notifications.retain(|n| n.expires_at > now);
	}

	pub fn notifications(&self) -> &[Notification] {
		&self.notifications
	}

	/// Removes and returns every pending notification, expired or not.
	pub fn take_notifications(&mut self) -> Vec<Notification> {
		std::mem::take(&mut self.notifications)
	}

	pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
		self.entries.iter()
	}

	pub fn recent(&self, count: usize) -> impl Iterator<Item = &LogEntry> {
		self.entries.iter().skip(self.entries.len().saturating_sub(count))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
		self.notifications.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_log_is_bounded() {
		let mut log = EventLog::new(3, 3000);
		for i in 0..5 {
			log.info("state_delta", format!("delta {}", i));
		}
		assert_eq!(log.len(), 3);
		let messages: Vec<&str> = log.entries().map(|e| e.message.as_str()).collect();
		assert_eq!(messages, vec!["delta 2", "delta 3", "delta 4"]);
	}

	#[test]
	fn test_recent_takes_tail() {
		let mut log = EventLog::new(10, 3000);
		log.info("a", "one");
		log.info("b", "two");
		log.error("c", "three");
		let recent: Vec<&str> = log.recent(2).map(|e| e.kind.as_str()).collect();
		assert_eq!(recent, vec!["b", "c"]);
		assert_eq!(log.recent(2).last().map(|e| e.level), Some(LogLevel::Error));
	}

	#[test]
	fn test_notifications_expire() {
		let mut log = EventLog::new(10, 3000);
		let start = Local::now();
		log.notify_at("Bob joined the match", LogLevel::Info, start);

		log.expire_at(start + Duration::milliseconds(2999));
		assert_eq!(log.notifications().len(), 1);

		log.expire_at(start + Duration::milliseconds(3000));
		assert!(log.notifications().is_empty());
	}

	#[test]
	fn test_take_notifications_drains() {
		let mut log = EventLog::new(10, 3000);
		log.notify("Game started!", LogLevel::Success);
		log.notify("Alice played a card", LogLevel::Info);

		let taken = log.take_notifications();
		assert_eq!(taken.len(), 2);
		assert_eq!(taken[0].message, "Game started!");
		assert!(log.notifications().is_empty());
		assert!(log.is_empty());
	}
}
