use std::future::Future;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{HarnessError, Result};
use crate::session::AppContext;

pub const DEFAULT_PAGE: u32 = 20;
pub const DEFAULT_MESSAGE_PAGE: u32 = 50;

/// Items of a list field in an RPC result, or an empty list.
pub fn list_field<'a>(result: &'a Value, key: &str) -> &'a [Value] {
	result.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

/// Follow requests addressed to `my_user_id`.
pub fn received_requests(result: &Value, my_user_id: &str) -> Vec<Value> {
	list_field(result, "requests")
		.iter()
		.filter(|req| {
			["toUserId", "to_user_id"]
				.iter()
				.any(|key| req.get(*key).and_then(Value::as_str) == Some(my_user_id))
		})
		.cloned()
		.collect()
}

pub async fn create_post(ctx: &AppContext, content: &str, media_url: &str) -> Result<Value> {
	if content.trim().is_empty() {
		return Err(HarnessError::InvalidArgument("post content is required".to_string()));
	}
	ctx.call("social/create_post", json!({"content": content, "media_url": media_url}))
		.await
}

pub async fn get_feed(ctx: &AppContext, limit: u32, cursor: &str) -> Result<Value> {
	ctx.call("social/get_feed", json!({"limit": limit, "cursor": cursor})).await
}

pub async fn like_post(ctx: &AppContext, post_id: &str) -> Result<Value> {
	ctx.call("social/like_post", json!({"post_id": post_id})).await
}

pub async fn unlike_post(ctx: &AppContext, post_id: &str) -> Result<Value> {
	ctx.call("social/unlike_post", json!({"post_id": post_id})).await
}

pub async fn add_comment(ctx: &AppContext, post_id: &str, content: &str) -> Result<Value> {
	ctx.call("social/add_comment", json!({"post_id": post_id, "content": content}))
		.await
}

pub async fn get_comments(ctx: &AppContext, post_id: &str, limit: u32) -> Result<Value> {
	ctx.call("social/get_comments", json!({"post_id": post_id, "limit": limit}))
		.await
}

pub async fn send_follow_request(ctx: &AppContext, target_user_id: &str) -> Result<Value> {
	if target_user_id.trim().is_empty() {
		return Err(HarnessError::InvalidArgument("target user id is required".to_string()));
	}
	ctx.call("social/send_follow_request", json!({"target_user_id": target_user_id}))
		.await
}

pub async fn accept_follow_request(ctx: &AppContext, from_user_id: &str) -> Result<Value> {
	ctx.call("social/accept_follow_request", json!({"from_user_id": from_user_id}))
		.await
}

pub async fn get_follow_requests(ctx: &AppContext) -> Result<Value> {
	ctx.call("social/get_follow_requests", json!({})).await
}

pub async fn search_users(ctx: &AppContext, query: &str, limit: u32) -> Result<Value> {
	ctx.call("social/search_users", json!({"query": query, "limit": limit})).await
}

pub mod chat {
	use super::*;

	pub async fn create_channel(
		ctx: &AppContext,
		channel_type: &str,
		name: &str,
		participant_ids: &[String],
	) -> Result<Value> {
		ctx.call(
			"chat/create_channel",
			json!({"channel_type": channel_type, "name": name, "participant_ids": participant_ids}),
		)
		.await
	}

	pub async fn get_channels(ctx: &AppContext) -> Result<Value> {
		ctx.call("chat/get_channels", json!({})).await
	}

	pub async fn send_message(
		ctx: &AppContext,
		channel_id: &str,
		content: &str,
		message_type: &str,
		media_url: &str,
	) -> Result<Value> {
		ctx.call(
			"chat/send_message",
			json!({
				"channel_id": channel_id,
				"content": content,
				"message_type": message_type,
				"media_url": media_url,
			}),
		)
		.await
	}

	pub async fn get_messages(ctx: &AppContext, channel_id: &str, limit: u32, cursor: &str) -> Result<Value> {
		ctx.call(
			"chat/get_messages",
			json!({"channel_id": channel_id, "limit": limit, "cursor": cursor}),
		)
		.await
	}
}

/// Periodic background fetch whose results arrive on a channel.
///
/// The first fetch runs immediately. Dropping the poller or calling
/// [`Poller::cancel`] stops it.
pub struct Poller {
	task: JoinHandle<()>,
}

impl Poller {
	pub fn spawn<F, Fut>(period: Duration, mut fetch: F) -> (Self, mpsc::UnboundedReceiver<Result<Value>>)
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = Result<Value>> + Send + 'static,
	{
		let (tx, rx) = mpsc::unbounded_channel();
		let task = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(period);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				if tx.send(fetch().await).is_err() {
					break;
				}
			}
		});
		(Self { task }, rx)
	}

	/// Polls `social/get_follow_requests` for the context's session.
	pub fn follow_requests(ctx: AppContext, period: Duration) -> (Self, mpsc::UnboundedReceiver<Result<Value>>) {
		Self::spawn(period, move || {
			let ctx = ctx.clone();
			async move { get_follow_requests(&ctx).await }
		})
	}

	pub fn cancel(&self) {
		self.task.abort();
	}

	pub fn is_running(&self) -> bool {
		!self.task.is_finished()
	}
}

impl Drop for Poller {
	fn drop(&mut self) {
		self.task.abort();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn test_received_requests_filters_by_recipient() {
		let result = json!({
			"requests": [
				{"fromUserId": "x", "toUserId": "me"},
				{"from_user_id": "y", "to_user_id": "me"},
				{"fromUserId": "me", "toUserId": "z"}
			]
		});
		let received = received_requests(&result, "me");
		assert_eq!(received.len(), 2);
		assert!(received_requests(&json!({}), "me").is_empty());
	}

	#[test]
	fn test_list_field() {
		let result = json!({"posts": [{"id": 1}, {"id": 2}], "users": "nope"});
		assert_eq!(list_field(&result, "posts").len(), 2);
		assert!(list_field(&result, "users").is_empty());
		assert!(list_field(&result, "channels").is_empty());
	}

	#[tokio::test]
	async fn test_poller_fetches_until_cancelled() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let (poller, mut rx) = Poller::spawn(Duration::from_millis(10), move || {
			let n = counter.fetch_add(1, Ordering::SeqCst);
			async move { Ok(json!({"n": n})) }
		});

		let first = rx.recv().await.unwrap().unwrap();
		assert_eq!(first["n"], 0);
		let second = rx.recv().await.unwrap().unwrap();
		assert_eq!(second["n"], 1);

		poller.cancel();
		tokio::time::sleep(Duration::from_millis(30)).await;
		assert!(!poller.is_running());

		let seen = calls.load(Ordering::SeqCst);
		tokio::time::sleep(Duration::from_millis(40)).await;
		assert_eq!(calls.load(Ordering::SeqCst), seen);
	}
}
