use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
	#[error("transport error: {0}")]
	Io(#[from] std::io::Error),

	#[error("http error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("invalid json: {0}")]
	Json(#[from] serde_json::Error),

	#[error("rpc {rpc_id} failed: {message}")]
	Rpc { rpc_id: String, message: String },

	#[error("socket is not connected")]
	NotConnected,

	#[error("not in a match")]
	NoMatch,

	#[error("no active session")]
	NotAuthenticated,

	#[error("config error: {0}")]
	Config(String),

	#[error("{0}")]
	InvalidArgument(String),
}

impl HarnessError {
	pub fn rpc(rpc_id: &str, message: impl Into<String>) -> Self {
		HarnessError::Rpc {
			rpc_id: rpc_id.to_string(),
			message: message.into(),
		}
	}
}

pub type Result<T> = std::result::Result<T, HarnessError>;
