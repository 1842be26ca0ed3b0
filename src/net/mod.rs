pub mod client;
pub mod protocol;
pub mod rpc;

pub use client::{MatchSink, SocketClient, SocketSender};
pub use protocol::{ClientMessage, ServerMessage};
pub use rpc::RpcClient;
