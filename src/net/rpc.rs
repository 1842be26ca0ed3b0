use serde_json::{Value, json};

use crate::config::ServerConfig;
use crate::error::{HarnessError, Result};
use crate::logging;

/// How a call identifies itself to the server.
#[derive(Debug, Clone, Copy)]
pub enum RpcAuth<'a> {
	/// Session bearer token.
	Session(&'a str),
	/// Server-wide HTTP key, for calls made before a session exists.
	HttpKey,
}

#[derive(Clone)]
pub struct RpcClient {
	http: reqwest::Client,
	base_url: String,
	http_key: String,
}

impl RpcClient {
	pub fn new(server: &ServerConfig) -> Self {
		Self {
			http: reqwest::Client::new(),
			base_url: server.http_url(),
			http_key: server.http_key.clone(),
		}
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub fn endpoint(&self, rpc_id: &str) -> String {
		format!("{}/v2/rpc/{}?unwrap=", self.base_url, rpc_id)
	}

	pub async fn call(&self, rpc_id: &str, payload: &Value, auth: RpcAuth<'_>) -> Result<Value> {
		logging::net::rpc_call(rpc_id);
		logging::net::payload("request", &payload.to_string());

		let mut request = self.http.post(self.endpoint(rpc_id)).json(payload);
		request = match auth {
			RpcAuth::Session(token) => request.bearer_auth(token),
			RpcAuth::HttpKey => request.query(&[("http_key", self.http_key.as_str())]),
		};

		let response = request.send().await.inspect_err(|e| logging::net::rpc_failed(rpc_id, &e.to_string()))?;
		let status = response.status();
		let text = response.text().await?;
		logging::net::payload("response", &text);

		if !status.is_success() {
			let message = http_error_message(status.as_u16(), &text);
			logging::net::rpc_failed(rpc_id, &message);
			return Err(HarnessError::rpc(rpc_id, message));
		}

		let body = if text.trim().is_empty() {
			Value::Object(Default::default())
		} else {
			serde_json::from_str(&text).unwrap_or(Value::String(text))
		};
		parse_rpc_response(rpc_id, body).inspect_err(|e| logging::net::rpc_failed(rpc_id, &e.to_string()))
	}

	pub async fn call_unauthenticated(&self, rpc_id: &str, payload: &Value) -> Result<Value> {
		self.call(rpc_id, payload, RpcAuth::HttpKey).await
	}

	pub async fn call_with_session(&self, token: &str, rpc_id: &str, payload: &Value) -> Result<Value> {
		self.call(rpc_id, payload, RpcAuth::Session(token)).await
	}
}

fn http_error_message(status: u16, text: &str) -> String {
	serde_json::from_str::<Value>(text)
		.ok()
		.and_then(|body| {
			body.get("message")
				.or_else(|| body.get("error"))
				.and_then(Value::as_str)
				.map(str::to_string)
		})
		.unwrap_or_else(|| format!("HTTP {}: {}", status, text))
}

/// Normalizes an RPC body: string payloads are parsed, an `error` without
/// `success` is raised, and a `data` wrapper is unwrapped.
pub fn parse_rpc_response(rpc_id: &str, body: Value) -> Result<Value> {
	let body = match body {
		Value::String(text) => serde_json::from_str(&text)
			.map_err(|_| HarnessError::rpc(rpc_id, "invalid response from server"))?,
		Value::Null => json!({}),
		other => other,
	};

	let succeeded = body.get("success").and_then(Value::as_bool).unwrap_or(false);
	if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
		if !succeeded {
			return Err(HarnessError::rpc(rpc_id, error_message(error)));
		}
	}

	match body {
		Value::Object(mut map) if map.get("data").is_some_and(|d| !d.is_null()) => {
			Ok(map.remove("data").unwrap_or(Value::Null))
		}
		other => Ok(other),
	}
}

fn error_message(error: &Value) -> String {
	match error {
		Value::String(message) => message.clone(),
		Value::Object(map) => map
			.get("message")
			.or_else(|| map.get("error"))
			.and_then(Value::as_str)
			.map(str::to_string)
			.unwrap_or_else(|| error.to_string()),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_plain_object() {
		let body = parse_rpc_response("x", json!({"success": true, "matchId": "m1"})).unwrap();
		assert_eq!(body["matchId"], "m1");
	}

	#[test]
	fn test_parse_string_payload() {
		let body = parse_rpc_response("x", json!(r#"{"success": true, "matchId": "m2"}"#)).unwrap();
		assert_eq!(body["matchId"], "m2");

		assert!(parse_rpc_response("x", json!("{broken")).is_err());
	}

	#[test]
	fn test_parse_unwraps_data() {
		let body = parse_rpc_response("auth/get_profile", json!({"success": true, "data": {"username": "neo"}})).unwrap();
		assert_eq!(body, json!({"username": "neo"}));
	}

	#[test]
	fn test_parse_error_shapes() {
		let err = parse_rpc_response("auth/login_email", json!({"error": "bad password"})).unwrap_err();
		assert_eq!(err.to_string(), "rpc auth/login_email failed: bad password");

		let err = parse_rpc_response("x", json!({"success": false, "error": {"message": "nope"}})).unwrap_err();
		assert!(err.to_string().ends_with("nope"));

		let ok = parse_rpc_response("x", json!({"success": true, "error": "ignored"}));
		assert!(ok.is_ok());
	}

	#[test]
	fn test_http_error_message() {
		assert_eq!(http_error_message(400, r#"{"message": "bad key"}"#), "bad key");
		assert_eq!(http_error_message(502, "gateway"), "HTTP 502: gateway");
	}

	#[test]
	fn test_endpoint() {
		let server = ServerConfig {
			host: "example.org".to_string(),
			port: "443".to_string(),
			use_ssl: true,
			..ServerConfig::default()
		};
		let client = RpcClient::new(&server);
		assert_eq!(client.endpoint("auth/device_login"), "https://example.org/v2/rpc/auth/device_login?unwrap=");
	}
}
