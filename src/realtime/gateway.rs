//! Websocket gateway
//!
//! One task per connection reads client frames and drives a
//! [`ChatSession`]; a writer task drains the session's outbound channel
//! into the socket. The session itself never touches the socket, so it
//! can be exercised with plain channels.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::events::{ClientEvent, JoinChat, MessageReceived, SendMessage, ServerEvent};
use super::registry::{ChatRoomRegistry, ConnectionId, EventSender, Room};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{ConversationId, UserProfile};
use crate::error::AppError;
use crate::metrics::WS_CONNECTIONS_ACTIVE;
use crate::service::ChatService;

/// Lifecycle of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Joined(ConversationId),
    Disconnected,
}

/// Per-connection protocol state machine
pub struct ChatSession {
    connection_id: ConnectionId,
    user_id: String,
    /// Sender's stored profile, used to decorate outgoing messages
    profile: Option<UserProfile>,
    state: SessionState,
    outbound: EventSender,
    registry: Arc<ChatRoomRegistry>,
    chat: Arc<ChatService>,
}

impl ChatSession {
    pub fn new(
        user_id: String,
        profile: Option<UserProfile>,
        registry: Arc<ChatRoomRegistry>,
        chat: Arc<ChatService>,
        outbound: EventSender,
    ) -> Self {
        Self {
            connection_id: registry.next_connection_id(),
            user_id,
            profile,
            state: SessionState::Connected,
            outbound,
            registry,
            chat,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle one text frame
    ///
    /// Failures are reported back to this connection as `error` events;
    /// the connection stays open.
    pub async fn handle_frame(&mut self, frame: &str) {
        let event = match ClientEvent::parse(frame) {
            Ok(event) => event,
            Err(error) => {
                self.reject(error);
                return;
            }
        };

        if let Err(error) = self.handle_event(event).await {
            if error.status().is_server_error() {
                tracing::error!(
                    connection_id = self.connection_id,
                    user_id = %self.user_id,
                    %error,
                    "Realtime event failed"
                );
            } else {
                tracing::debug!(
                    connection_id = self.connection_id,
                    user_id = %self.user_id,
                    code = error.code(),
                    "Realtime event rejected"
                );
            }
            self.push(ServerEvent::error(&error));
        }
    }

    /// Drop a frame that could not be decoded
    pub fn reject(&self, error: AppError) {
        tracing::warn!(
            connection_id = self.connection_id,
            user_id = %self.user_id,
            %error,
            "Dropping malformed frame"
        );
        self.push(ServerEvent::error(&error));
    }

    /// Apply a parsed event
    ///
    /// # Errors
    /// - `Unauthorized` if the event claims another identity, or on sending
    ///   to an unconnected user
    /// - `Validation` for rejected message text
    pub async fn handle_event(&mut self, event: ClientEvent) -> Result<(), AppError> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }

        if event.user_id() != self.user_id {
            return Err(AppError::Unauthorized);
        }

        match event {
            ClientEvent::JoinChat(join) => self.join(join).await,
            ClientEvent::SendMessage(send) => self.send_message(send).await,
        }
    }

    async fn join(&mut self, event: JoinChat) -> Result<(), AppError> {
        let conversation_id = ConversationId::between(&self.user_id, &event.target_user_id);

        let previous = match &self.state {
            SessionState::Joined(current) => Some(current.clone()),
            _ => None,
        };
        if previous.as_ref() != Some(&conversation_id) {
            if let Some(previous) = previous {
                self.registry.leave(&previous, self.connection_id).await;
            }
            self.enter(conversation_id.clone()).await;
        }

        self.push(ServerEvent::Joined {
            conversation_id: conversation_id.to_string(),
        });
        Ok(())
    }

    async fn enter(&mut self, conversation_id: ConversationId) {
        self.registry
            .join(&conversation_id, self.connection_id, self.outbound.clone())
            .await;
        tracing::info!(
            connection_id = self.connection_id,
            user_id = %self.user_id,
            conversation_id = %conversation_id,
            "Joined chat"
        );
        self.state = SessionState::Joined(conversation_id);
    }

    async fn send_message(&mut self, event: SendMessage) -> Result<(), AppError> {
        let conversation_id = ConversationId::between(&self.user_id, &event.target_user_id);

        let room = self.registry.begin_delivery(&conversation_id).await;
        let result = self.deliver(&room, &conversation_id, &event).await;
        self.registry.end_delivery(&conversation_id, &room).await;
        result
    }

    /// Persist then broadcast under the room's delivery lock
    async fn deliver(
        &self,
        room: &Room,
        conversation_id: &ConversationId,
        event: &SendMessage,
    ) -> Result<(), AppError> {
        let _delivery = room.delivery_lock().await;

        let message = self
            .chat
            .send(&self.user_id, &event.target_user_id, &event.text)
            .await?;

        let received = ServerEvent::MessageReceived(MessageReceived::new(
            message,
            self.profile.as_ref(),
            event,
        ));

        let delivered = room.broadcast(&received).await;
        tracing::debug!(
            connection_id = self.connection_id,
            conversation_id = %conversation_id,
            delivered,
            "Message relayed"
        );

        Ok(())
    }

    /// Leave the current room; further events are ignored
    pub async fn disconnect(&mut self) {
        if let SessionState::Joined(conversation_id) = &self.state {
            self.registry.leave(conversation_id, self.connection_id).await;
        }
        self.state = SessionState::Disconnected;
    }

    fn push(&self, event: ServerEvent) {
        if self.outbound.send(event).is_err() {
            tracing::debug!(connection_id = self.connection_id, "Outbound channel closed");
        }
    }
}

/// GET /ws
///
/// Upgrade an authenticated request to the realtime chat protocol.
pub async fn ws_handler(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_connection(state, session.user_id, socket))
}

async fn run_connection(state: AppState, user_id: String, socket: WebSocket) {
    let profile = match state.db.get_user(&user_id).await {
        Ok(profile) => profile,
        Err(error) => {
            tracing::warn!(%error, user_id = %user_id, "Could not load sender profile");
            None
        }
    };

    let (mut sink, mut stream) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut session = ChatSession::new(
        user_id,
        profile,
        state.rooms.clone(),
        state.chat.clone(),
        outbound,
    );
    let connection_id = session.connection_id();

    WS_CONNECTIONS_ACTIVE.inc();
    tracing::info!(connection_id, "Websocket connected");

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(error) => {
                    tracing::error!(%error, "Failed to encode server event");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => session.handle_frame(&text).await,
            Ok(WsMessage::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => session.handle_frame(&text).await,
                Err(_) => session.reject(AppError::Validation(
                    "Binary frames must carry UTF-8 JSON".to_string(),
                )),
            },
            Ok(WsMessage::Close(_)) => break,
            // Ping/pong are answered by axum
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(connection_id, %error, "Websocket read failed");
                break;
            }
        }
    }

    session.disconnect().await;
    drop(session);
    writer.abort();

    WS_CONNECTIONS_ACTIVE.dec();
    tracing::info!(connection_id, "Websocket disconnected");
}
