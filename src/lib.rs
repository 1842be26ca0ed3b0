//! Test harness for a multiplayer UNO game server.
//!
//! Account, matchmaking, social and chat calls go to the server's HTTP RPC
//! endpoint (`/v2/rpc/{id}`). Live match traffic uses the length-prefixed JSON
//! socket protocol in [`net::protocol`]. That framing is this crate's own, so
//! match play needs a server or gateway that speaks it; the RPC side works
//! against the backend directly.

#![allow(clippy::collapsible_if)]
#![allow(clippy::large_enum_variant)]

pub mod card;
pub mod config;
pub mod countdown;
pub mod defaults;
pub mod error;
pub mod event_log;
pub mod events;
pub mod harness;
pub mod logging;
pub mod mode;
pub mod net;
pub mod session;
pub mod social;
pub mod theme;
pub mod tui;
pub mod view;
