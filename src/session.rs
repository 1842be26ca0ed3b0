//! Session establishment and the per-session application context.
//!
//! Everything that needs the local identity reads it from [`AppContext`],
//! which is built once a login succeeds and dropped on logout.

use async_trait::async_trait;
use rand::Rng;
use serde_json::{Value, json};

use crate::config::HarnessConfig;
use crate::countdown::now_ms;
use crate::error::{HarnessError, Result};
use crate::mode::{GameMode, MatchType};
use crate::net::rpc::RpcClient;

const HOUR_MS: i64 = 60 * 60 * 1000;
const WEEK_MS: i64 = 7 * 24 * HOUR_MS;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
	pub token: String,
	pub refresh_token: String,
	pub user_id: String,
	pub username: String,
	pub created_at_ms: i64,
	pub expires_at_ms: i64,
	pub refresh_expires_at_ms: i64,
}

fn first_str(data: &Value, keys: &[&str]) -> Option<String> {
	keys.iter()
		.find_map(|key| data.get(*key).and_then(Value::as_str))
		.filter(|s| !s.is_empty())
		.map(str::to_string)
}

/// Expiry stamps may be epoch seconds or epoch milliseconds.
fn first_epoch_ms(data: &Value, keys: &[&str]) -> Option<i64> {
	keys.iter()
		.find_map(|key| data.get(*key).and_then(Value::as_i64))
		.map(|t| if t < 100_000_000_000 { t * 1000 } else { t })
}

impl Session {
	pub fn from_rpc_data(data: &Value, now_ms: i64) -> Result<Self> {
		let token = first_str(data, &["sessionToken", "token", "session_token"])
			.ok_or_else(|| HarnessError::InvalidArgument("login response carried no session token".to_string()))?;
		let user_id = first_str(data, &["userId", "user_id"])
			.ok_or_else(|| HarnessError::InvalidArgument("login response carried no user id".to_string()))?;

		Ok(Self {
			token,
			refresh_token: first_str(data, &["refreshToken", "refresh_token"]).unwrap_or_default(),
			username: first_str(data, &["username"]).unwrap_or_else(|| user_id.clone()),
			user_id,
			created_at_ms: now_ms,
			expires_at_ms: first_epoch_ms(data, &["expiresAt", "expires_at"]).unwrap_or(now_ms + HOUR_MS),
			refresh_expires_at_ms: first_epoch_ms(data, &["refreshExpiresAt", "refresh_expires_at"])
				.unwrap_or(now_ms + WEEK_MS),
		})
	}

	pub fn is_expired(&self, now_ms: i64) -> bool {
		now_ms >= self.expires_at_ms
	}
}

/// A completed login: the session plus the raw account data returned with it.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
	pub session: Session,
	pub data: Value,
}

fn require(field: &str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(HarnessError::InvalidArgument(format!("{} is required", field)));
	}
	Ok(())
}

pub fn generate_device_id() -> String {
	const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
	let mut rng = rand::rng();
	let suffix: String = (0..9)
		.map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
		.collect();
	format!("device_{}", suffix)
}

/// Calls made before a session exists, authorized with the server HTTP key.
pub mod auth {
	use super::*;

	async fn login(rpc: &RpcClient, rpc_id: &str, payload: Value) -> Result<AuthOutcome> {
		let data = rpc.call_unauthenticated(rpc_id, &payload).await?;
		let session = Session::from_rpc_data(&data, now_ms()).map_err(|e| HarnessError::rpc(rpc_id, e.to_string()))?;
		tracing::info!(rpc_id, user_id = %session.user_id, "session established");
		Ok(AuthOutcome { session, data })
	}

	pub async fn device_login(rpc: &RpcClient, device_id: &str) -> Result<AuthOutcome> {
		require("device id", device_id)?;
		login(rpc, "auth/device_login", json!({"device_id": device_id, "username": ""})).await
	}

	pub async fn check_username_available(rpc: &RpcClient, username: &str) -> Result<Value> {
		require("username", username)?;
		rpc.call_unauthenticated("auth/check_username_available", &json!({"username": username}))
			.await
	}

	pub async fn register_email(rpc: &RpcClient, username: &str, email: &str, password: &str) -> Result<Value> {
		require("username", username)?;
		require("email", email)?;
		require("password", password)?;
		rpc.call_unauthenticated(
			"auth/register_email",
			&json!({"username": username, "email": email, "password": password}),
		)
		.await
	}

	pub async fn verify_registration_otp(rpc: &RpcClient, email: &str, otp: &str) -> Result<AuthOutcome> {
		require("email", email)?;
		require("otp", otp)?;
		login(rpc, "auth/verify_registration_otp", json!({"email": email, "otp": otp})).await
	}

	pub async fn skip_verification(rpc: &RpcClient, email: &str) -> Result<AuthOutcome> {
		require("email", email)?;
		login(rpc, "auth/skip_verification", json!({"email": email})).await
	}

	pub async fn resend_otp(rpc: &RpcClient, email: &str) -> Result<Value> {
		require("email", email)?;
		rpc.call_unauthenticated("auth/resend_otp", &json!({"email": email})).await
	}

	pub async fn login_email(rpc: &RpcClient, email: &str, password: &str) -> Result<AuthOutcome> {
		require("email", email)?;
		require("password", password)?;
		login(rpc, "auth/login_email", json!({"email": email, "password": password})).await
	}

	pub async fn send_otp(rpc: &RpcClient, email: &str, password: &str) -> Result<Value> {
		require("email", email)?;
		require("password", password)?;
		rpc.call_unauthenticated("auth/send_otp", &json!({"email": email, "password": password}))
			.await
	}

	pub async fn verify_otp(rpc: &RpcClient, email: &str, otp: &str) -> Result<AuthOutcome> {
		require("email", email)?;
		require("otp", otp)?;
		login(rpc, "auth/verify_otp", json!({"email": email, "otp": otp})).await
	}

	pub async fn google_login(rpc: &RpcClient, id_token: &str) -> Result<AuthOutcome> {
		require("id token", id_token)?;
		login(rpc, "auth/google_login", json!({"id_token": id_token})).await
	}
}

/// Result of `find_or_create_random_match`.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomMatch {
	pub match_id: String,
	/// True when the server created a new match rather than joining one.
	pub created: bool,
	pub message: Option<String>,
}

/// Match RPCs. The controller depends on this seam rather than on HTTP.
#[async_trait]
pub trait MatchService: Send + Sync {
	async fn create_match(&self, mode: GameMode) -> Result<String>;
	async fn find_random_match(&self, mode: GameMode) -> Result<RandomMatch>;
	async fn add_bot(&self, match_id: &str) -> Result<Value>;
}

fn match_id_of(rpc_id: &str, data: &Value) -> Result<String> {
	data.get("matchId")
		.and_then(Value::as_str)
		.filter(|id| !id.is_empty())
		.map(str::to_string)
		.ok_or_else(|| HarnessError::rpc(rpc_id, format!("no matchId in response: {}", data)))
}

/// Identity and RPC access for one logged-in session.
#[derive(Clone)]
pub struct AppContext {
	pub config: HarnessConfig,
	pub rpc: RpcClient,
	pub session: Session,
}

/// How a binary signs in at startup.
#[derive(Debug, Clone)]
pub enum Credentials {
	Device(String),
	Email { email: String, password: String },
}

impl AppContext {
	pub fn new(config: HarnessConfig, rpc: RpcClient, session: Session) -> Self {
		Self { config, rpc, session }
	}

	/// Logs in and builds the context for the resulting session.
	pub async fn sign_in(config: HarnessConfig, credentials: &Credentials) -> Result<Self> {
		let rpc = RpcClient::new(&config.server);
		let outcome = match credentials {
			Credentials::Device(device_id) => auth::device_login(&rpc, device_id).await?,
			Credentials::Email { email, password } => auth::login_email(&rpc, email, password).await?,
		};
		Ok(Self::new(config, rpc, outcome.session))
	}

	pub fn user_id(&self) -> &str {
		&self.session.user_id
	}

	pub fn username(&self) -> &str {
		&self.session.username
	}

	/// Authenticated RPC. An expired session fails locally with
	/// [`HarnessError::NotAuthenticated`] instead of reaching the server.
	pub async fn call(&self, rpc_id: &str, payload: Value) -> Result<Value> {
		if self.session.is_expired(now_ms()) {
			return Err(HarnessError::NotAuthenticated);
		}
		self.rpc.call_with_session(&self.session.token, rpc_id, &payload).await
	}

	pub async fn link_email(&self, email: &str, password: &str) -> Result<Value> {
		require("email", email)?;
		require("password", password)?;
		self.call("auth/link_email", json!({"email": email, "password": password})).await
	}

	pub async fn verify_email_link(&self, otp: &str) -> Result<Value> {
		require("otp", otp)?;
		self.call("auth/verify_email_link", json!({"otp": otp})).await
	}

	pub async fn get_profile(&self) -> Result<Value> {
		self.call("auth/get_profile", json!({})).await
	}

	pub async fn update_profile(&self, display_name: &str, bio: &str, country: &str) -> Result<Value> {
		self.call(
			"auth/update_profile",
			json!({"display_name": display_name, "bio": bio, "country": country}),
		)
		.await
	}

	/// Still allowed once the session token has expired.
	pub async fn refresh_session(&self) -> Result<Value> {
		self.rpc.call_with_session(&self.session.token, "auth/refresh_session", &json!({})).await
	}

	pub async fn online_status(&self, user_ids: &[String]) -> Result<Value> {
		self.call("presence/get_online_status", json!({"user_ids": user_ids})).await
	}

	pub async fn online_friends(&self) -> Result<Value> {
		self.call("presence/get_online_friends", json!({})).await
	}
}

#[async_trait]
impl MatchService for AppContext {
	async fn create_match(&self, mode: GameMode) -> Result<String> {
		let rpc_id = "create_uno_match";
		let data = self
			.call(rpc_id, json!({"gameMode": mode.code(), "matchType": MatchType::Private.code()}))
			.await?;
		if !data.get("success").and_then(Value::as_bool).unwrap_or(false) {
			let message = data
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("Match creation failed");
			return Err(HarnessError::rpc(rpc_id, message));
		}
		match_id_of(rpc_id, &data)
	}

	async fn find_random_match(&self, mode: GameMode) -> Result<RandomMatch> {
		let rpc_id = "find_or_create_random_match";
		let data = self.call(rpc_id, json!({"gameMode": mode.code()})).await?;
		Ok(RandomMatch {
			match_id: match_id_of(rpc_id, &data)?,
			created: data.get("success").and_then(Value::as_bool).unwrap_or(false),
			message: data.get("message").and_then(Value::as_str).map(str::to_string),
		})
	}

	async fn add_bot(&self, match_id: &str) -> Result<Value> {
		require("match id", match_id)?;
		self.call("add_bot_to_match", json!({"matchId": match_id})).await
	}
}
