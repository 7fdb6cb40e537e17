//! Realtime chat delivery
//!
//! - `events`: websocket wire format
//! - `registry`: room membership keyed by conversation id
//! - `gateway`: axum websocket handler and per-connection session

mod events;
mod gateway;
mod registry;

pub use events::{ClientEvent, JoinChat, MessageReceived, SendMessage, ServerEvent};
pub use gateway::{ChatSession, SessionState, ws_handler};
pub use registry::{ChatRoomRegistry, ConnectionId, EventSender, Room};
