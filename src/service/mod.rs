//! Service layer
//!
//! Contains business logic separated from HTTP handlers and the
//! websocket gateway. Services take explicit user ids on every call.

mod chat;
mod connection;
mod feed;

pub use chat::ChatService;
pub use connection::ConnectionService;
pub use feed::{FeedPage, FeedQuery, FeedService};
