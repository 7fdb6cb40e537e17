//! Chat room registry
//!
//! In-memory membership table keyed by conversation id. Holds only the
//! outbound channel of each live connection; sockets belong to their
//! connection task.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{Mutex, MutexGuard, RwLock, mpsc};

use super::events::ServerEvent;
use crate::data::ConversationId;
use crate::metrics::CHAT_ROOMS_ACTIVE;

/// Process-unique id of a websocket connection
pub type ConnectionId = u64;

/// Outbound event channel of one connection
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Live members of one conversation
#[derive(Default)]
pub struct Room {
    members: Mutex<HashMap<ConnectionId, EventSender>>,
    /// Held across persist + broadcast so delivery order matches
    /// acceptance order within the room
    delivery: Mutex<()>,
    /// Deliveries between `begin_delivery` and `end_delivery`; a room
    /// with any in flight stays registered even when it has no members
    in_flight: AtomicUsize,
}

impl Room {
    /// Serialize deliveries in this room
    pub async fn delivery_lock(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().await
    }

    /// Push an event to every member
    ///
    /// Returns the number of connections the event was queued for.
    /// Members whose task already ended are skipped; they are removed
    /// when that task leaves.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let members = self.members.lock().await;
        let mut delivered = 0;
        for (connection_id, sender) in members.iter() {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(connection_id, "Skipping closed connection");
            }
        }
        delivered
    }

    pub async fn member_count(&self) -> usize {
        self.members.lock().await.len()
    }

    pub fn pending_deliveries(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Chat room registry
pub struct ChatRoomRegistry {
    /// Rooms: conversation id -> members
    rooms: RwLock<HashMap<ConversationId, Arc<Room>>>,
    next_connection_id: AtomicU64,
}

impl ChatRoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Allocate an id for a new connection
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a connection in a room, creating the room if needed
    ///
    /// Joining a room the connection is already in is a no-op.
    pub async fn join(
        &self,
        conversation_id: &ConversationId,
        connection_id: ConnectionId,
        sender: EventSender,
    ) -> Arc<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(Room::default()))
            .clone();
        room.members.lock().await.insert(connection_id, sender);
        CHAT_ROOMS_ACTIVE.set(rooms.len() as i64);

        tracing::debug!(
            conversation_id = %conversation_id,
            connection_id,
            "Connection joined room"
        );
        room
    }

    /// Remove a connection from a room, dropping the room once empty
    pub async fn leave(&self, conversation_id: &ConversationId, connection_id: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(conversation_id).cloned() else {
            return;
        };

        let now_empty = {
            let mut members = room.members.lock().await;
            members.remove(&connection_id);
            members.is_empty() && room.pending_deliveries() == 0
        };
        if now_empty {
            rooms.remove(conversation_id);
        }
        CHAT_ROOMS_ACTIVE.set(rooms.len() as i64);

        tracing::debug!(
            conversation_id = %conversation_id,
            connection_id,
            room_dropped = now_empty,
            "Connection left room"
        );
    }

    /// Pin the room of a conversation for one delivery
    ///
    /// Creates the room if nobody has joined yet. Until the matching
    /// [`end_delivery`](Self::end_delivery) the room stays registered, so
    /// connections joining meanwhile land in the same room and receive
    /// the broadcast.
    pub async fn begin_delivery(&self, conversation_id: &ConversationId) -> Arc<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(Room::default()))
            .clone();
        room.in_flight.fetch_add(1, Ordering::SeqCst);
        CHAT_ROOMS_ACTIVE.set(rooms.len() as i64);
        room
    }

    /// Release a room pinned by [`begin_delivery`](Self::begin_delivery),
    /// dropping it if it is now empty
    pub async fn end_delivery(&self, conversation_id: &ConversationId, room: &Arc<Room>) {
        let mut rooms = self.rooms.write().await;
        let remaining = room.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0
            && room.members.lock().await.is_empty()
            && rooms
                .get(conversation_id)
                .is_some_and(|current| Arc::ptr_eq(current, room))
        {
            rooms.remove(conversation_id);
        }
        CHAT_ROOMS_ACTIVE.set(rooms.len() as i64);
    }

    /// Look up a live room
    pub async fn room(&self, conversation_id: &ConversationId) -> Option<Arc<Room>> {
        self.rooms.read().await.get(conversation_id).cloned()
    }

    pub async fn member_count(&self, conversation_id: &ConversationId) -> usize {
        match self.room(conversation_id).await {
            Some(room) => room.member_count().await,
            None => 0,
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for ChatRoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
