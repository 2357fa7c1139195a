//! WebSocket room server.
//!
//! Clients connect to `{room_path_prefix}{room}` and optionally pass
//! `?id=<connection id>` to resume a seat. Each room is served by one actor
//! task that owns the room's `Session` and processes events strictly in
//! arrival order, so no two messages for the same room ever interleave.
//! Rooms load their state from the `RoomStore` on first use and are dropped
//! again once their last connection closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ServerConfig;
use crate::engine::models::{ClientMessage, ConnectionId, ServerMessage};
use crate::engine::room_code::{generate_connection_id, parse_connection_id, RoomCode};
use crate::engine::session::{Outbound, Session};
use crate::games::hive_mind::puzzles::{first_puzzle, puzzle_by_id};
use crate::storage::{FileStore, MemoryStore, RoomStore, StorageError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

type Outgoing = mpsc::UnboundedSender<ServerMessage>;

/// Input to a room actor. `serial` tells apart two sockets that share a
/// connection id; only the newest one is live.
#[derive(Debug)]
enum RoomEvent {
    Connect {
        conn: ConnectionId,
        serial: u64,
        tx: Outgoing,
    },
    Message {
        conn: ConnectionId,
        serial: u64,
        msg: ClientMessage,
    },
    Close {
        conn: ConnectionId,
        serial: u64,
    },
}

/// Registry of live rooms.
pub struct RoomHub {
    config: ServerConfig,
    store: Arc<dyn RoomStore>,
    rooms: Mutex<HashMap<RoomCode, mpsc::UnboundedSender<RoomEvent>>>,
    next_serial: AtomicU64,
}

impl RoomHub {
    pub fn new(config: ServerConfig, store: Arc<dyn RoomStore>) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            rooms: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
        })
    }

    /// Hub backed by a `FileStore` under `config.data_dir`, or by memory
    /// when no directory is configured.
    pub fn from_config(config: ServerConfig) -> Result<Arc<Self>, ServerError> {
        let store: Arc<dyn RoomStore> = match &config.data_dir {
            Some(dir) => {
                let store = FileStore::open(dir)?;
                tracing::info!(dir = %store.dir().display(), "persisting rooms to disk");
                Arc::new(store)
            }
            None => {
                tracing::info!("no data_dir configured, rooms live in memory");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of rooms with a running actor.
    pub async fn live_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Register a socket with its room, starting the room actor if needed.
    /// Returns the sender the socket uses for its own messages.
    async fn connect(
        self: &Arc<Self>,
        room: &RoomCode,
        conn: ConnectionId,
        serial: u64,
        tx: Outgoing,
    ) -> mpsc::UnboundedSender<RoomEvent> {
        let mut rooms = self.rooms.lock().await;
        let mut event = RoomEvent::Connect { conn, serial, tx };
        if let Some(existing) = rooms.get(room) {
            // The actor may have shut down between lookups; fall through and
            // start a fresh one if so.
            match existing.send(event) {
                Ok(()) => return existing.clone(),
                Err(mpsc::error::SendError(returned)) => event = returned,
            }
        }

        let (room_tx, room_rx) = mpsc::unbounded_channel();
        // The receiver is alive until the actor below returns.
        let _ = room_tx.send(event);
        rooms.insert(room.clone(), room_tx.clone());
        tokio::spawn(run_room(self.clone(), room.clone(), room_rx));
        tracing::info!(room = %room, "room opened");
        room_tx
    }
}

/// Accept connections forever.
pub async fn serve(listener: TcpListener, hub: Arc<RoomHub>) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, prefix = %hub.config.normalized_prefix(), "accepting websocket connections");
    loop {
        let (stream, peer) = listener.accept().await?;
        let hub = hub.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(hub, stream).await {
                tracing::debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}

/// Split a request target into room code and optional connection id.
/// Returns None when the path is not a room under `prefix`.
pub(crate) fn parse_room_target(
    prefix: &str,
    path: &str,
    query: Option<&str>,
) -> Option<(RoomCode, Option<ConnectionId>)> {
    let rest = path.strip_prefix(prefix)?.trim_end_matches('/');
    if rest.contains('/') {
        return None;
    }
    let room = RoomCode::parse(rest).ok()?;
    let conn = query.and_then(|q| {
        q.split('&')
            .filter_map(|pair| pair.strip_prefix("id="))
            .find_map(parse_connection_id)
    });
    Some((room, conn))
}

fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("no such room".into()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

async fn handle_connection(hub: Arc<RoomHub>, stream: TcpStream) -> Result<(), ServerError> {
    let prefix = hub.config.normalized_prefix();
    let mut target = None;
    let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        match parse_room_target(&prefix, req.uri().path(), req.uri().query()) {
            Some(found) => {
                target = Some(found);
                Ok(resp)
            }
            None => Err(not_found()),
        }
    })
    .await?;
    let Some((room, requested)) = target else {
        return Ok(());
    };

    let conn = requested.unwrap_or_else(|| generate_connection_id(&mut rand::thread_rng()));
    let serial = hub.next_serial.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(room = %room, conn = %conn, serial, "socket open");

    let (tx, rx) = mpsc::unbounded_channel();
    let room_tx = hub.connect(&room, conn.clone(), serial, tx.clone()).await;

    let (mut write, mut read) = ws.split();
    let writer = tokio::spawn(async move {
        let mut outgoing = UnboundedReceiverStream::new(rx);
        while let Some(msg) = outgoing.next().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode server message");
                    continue;
                }
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    let mut result = Ok(());
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    let event = RoomEvent::Message {
                        conn: conn.clone(),
                        serial,
                        msg,
                    };
                    if room_tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(room = %room, conn = %conn, error = %e, "malformed client message");
                    let _ = tx.send(ServerMessage::Error {
                        message: format!("Malformed message: {e}"),
                    });
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                result = Err(e.into());
                break;
            }
        }
    }

    let _ = room_tx.send(RoomEvent::Close {
        conn: conn.clone(),
        serial,
    });
    drop(tx);
    let _ = writer.await;
    tracing::debug!(room = %room, conn = %conn, serial, "socket closed");
    result
}

/// Room actor: owns the session and the sockets attached to it.
async fn run_room(hub: Arc<RoomHub>, room: RoomCode, mut events: mpsc::UnboundedReceiver<RoomEvent>) {
    let mut session = load_session(&hub, &room).await;
    let mut sockets: HashMap<ConnectionId, (u64, Outgoing)> = HashMap::new();

    while let Some(event) = events.recv().await {
        match event {
            RoomEvent::Connect { conn, serial, tx } => {
                let _ = tx.send(session.snapshot());
                if sockets.insert(conn.clone(), (serial, tx)).is_some() {
                    tracing::debug!(room = %room, conn = %conn, "connection id reused, replacing socket");
                }
            }
            RoomEvent::Message { conn, serial, msg } if is_live(&sockets, &conn, serial) => {
                let kind = msg.kind();
                let transition = session.handle(&conn, msg);
                tracing::debug!(room = %room, conn = %conn, kind, persist = transition.persist, "handled message");
                deliver(&sockets, &conn, transition.messages);
                if transition.persist {
                    persist(&hub, &room, &session).await;
                }
            }
            RoomEvent::Close { conn, serial } if is_live(&sockets, &conn, serial) => {
                sockets.remove(&conn);
                let transition = session.disconnect(&conn);
                deliver(&sockets, &conn, transition.messages);
                if transition.persist {
                    persist(&hub, &room, &session).await;
                }
            }
            // Superseded socket.
            RoomEvent::Message { .. } | RoomEvent::Close { .. } => {}
        }
        // Checked after every event: the last live close may find stale
        // events still queued, and those must get a chance to close the room.
        if sockets.is_empty() && close_if_idle(&hub, &room, &events).await {
            break;
        }
    }
    tracing::info!(room = %room, "room closed");
}

fn is_live(sockets: &HashMap<ConnectionId, (u64, Outgoing)>, conn: &str, serial: u64) -> bool {
    matches!(sockets.get(conn), Some((live, _)) if *live == serial)
}

fn deliver(sockets: &HashMap<ConnectionId, (u64, Outgoing)>, sender: &str, messages: Vec<Outbound>) {
    for outbound in messages {
        match outbound {
            Outbound::Broadcast(msg) => {
                for (_, tx) in sockets.values() {
                    let _ = tx.send(msg.clone());
                }
            }
            Outbound::Reply(msg) => {
                if let Some((_, tx)) = sockets.get(sender) {
                    let _ = tx.send(msg);
                }
            }
        }
    }
}

/// Unregister the room unless any event is already queued. Connects are sent
/// while holding the hub lock, so nothing new can arrive after this check.
async fn close_if_idle(
    hub: &Arc<RoomHub>,
    room: &RoomCode,
    events: &mpsc::UnboundedReceiver<RoomEvent>,
) -> bool {
    let mut rooms = hub.rooms.lock().await;
    if !events.is_empty() {
        return false;
    }
    rooms.remove(room);
    true
}

async fn load_session(hub: &Arc<RoomHub>, room: &RoomCode) -> Session {
    let store = hub.store.clone();
    let key = room.clone();
    let loaded = tokio::task::spawn_blocking(move || store.load(&key)).await;
    match loaded {
        Ok(Ok(Some(state))) => {
            tracing::info!(room = %room, puzzle = state.puzzle_id, "restored room state");
            Session::restore(state)
        }
        Ok(Ok(None)) => fresh_session(&hub.config),
        Ok(Err(e)) => {
            tracing::warn!(room = %room, error = %e, "failed to load room state, starting fresh");
            fresh_session(&hub.config)
        }
        Err(e) => {
            tracing::warn!(room = %room, error = %e, "room load task failed, starting fresh");
            fresh_session(&hub.config)
        }
    }
}

fn fresh_session(config: &ServerConfig) -> Session {
    let puzzle = puzzle_by_id(config.starting_puzzle).unwrap_or_else(first_puzzle);
    Session::new(puzzle)
}

/// Save the current state. Failures are logged; the room keeps running on
/// its in-memory state.
async fn persist(hub: &Arc<RoomHub>, room: &RoomCode, session: &Session) {
    let store = hub.store.clone();
    let key = room.clone();
    let state = session.state().clone();
    match tokio::task::spawn_blocking(move || store.save(&key, &state)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(room = %room, error = %e, "failed to persist room state"),
        Err(e) => tracing::warn!(room = %room, error = %e, "persist task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_room_target() {
        let prefix = "/parties/main/";
        let (room, conn) = parse_room_target(prefix, "/parties/main/ABCD", None).unwrap();
        assert_eq!(room.as_str(), "ABCD");
        assert_eq!(conn, None);

        let (_, conn) =
            parse_room_target(prefix, "/parties/main/ABCD/", Some("v=2&id=alice")).unwrap();
        assert_eq!(conn.as_deref(), Some("alice"));
    }

    #[test]
    fn test_parse_room_target_rejects() {
        let prefix = "/parties/main/";
        assert!(parse_room_target(prefix, "/parties/main/", None).is_none());
        assert!(parse_room_target(prefix, "/other/ABCD", None).is_none());
        assert!(parse_room_target(prefix, "/parties/main/AB/CD", None).is_none());
        assert!(parse_room_target(prefix, "/parties/main/AB%20CD", None).is_none());
    }

    #[test]
    fn test_bad_connection_id_is_ignored() {
        let (_, conn) =
            parse_room_target("/", "/ROOM", Some("id=has%20space")).unwrap();
        assert_eq!(conn, None);
    }

    #[test]
    fn test_deliver_routes_reply_and_broadcast() {
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        let mut sockets = HashMap::new();
        sockets.insert("a".to_string(), (1, a_tx));
        sockets.insert("b".to_string(), (2, b_tx));

        let error = ServerMessage::Error {
            message: "Not joined".into(),
        };
        let left = ServerMessage::PlayerLeft {
            player_id: "c".into(),
        };
        deliver(
            &sockets,
            "a",
            vec![Outbound::Reply(error.clone()), Outbound::Broadcast(left.clone())],
        );

        assert_eq!(a_rx.try_recv().unwrap(), error);
        assert_eq!(a_rx.try_recv().unwrap(), left);
        assert_eq!(b_rx.try_recv().unwrap(), left);
        assert!(b_rx.try_recv().is_err());

        assert!(is_live(&sockets, "a", 1));
        assert!(!is_live(&sockets, "a", 2));
        assert!(!is_live(&sockets, "z", 1));
    }

    #[tokio::test]
    async fn test_room_closes_after_stale_events_drain() {
        let hub = RoomHub::new(ServerConfig::default(), Arc::new(MemoryStore::new()));
        let room = RoomCode::parse("LEAK").unwrap();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, _new_rx) = mpsc::unbounded_channel();

        // Single-threaded test runtime: the actor runs only once we yield,
        // so every event below is queued before it handles the first one.
        let room_tx = hub.connect(&room, "alice".into(), 1, old_tx).await;
        hub.connect(&room, "alice".into(), 2, new_tx).await;
        for _ in 0..100 {
            let event = RoomEvent::Message {
                conn: "alice".into(),
                serial: 1,
                msg: ClientMessage::Reset,
            };
            room_tx.send(event).unwrap();
        }
        room_tx
            .send(RoomEvent::Close {
                conn: "alice".into(),
                serial: 2,
            })
            .unwrap();
        room_tx
            .send(RoomEvent::Close {
                conn: "alice".into(),
                serial: 1,
            })
            .unwrap();
        drop(room_tx);

        for _ in 0..100 {
            if hub.live_rooms().await == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(hub.live_rooms().await, 0);
    }
}
