//! Live connection to player mapping with snapshot fan-out.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::{Mutex, RwLock, watch};

use crate::{
    game::entities::PlayerId,
    net::{messages::ServerMessage, utils},
    table::{TableError, TableHandle},
};

/// Transport-level connection handle.
pub type ConnectionId = u64;

/// One serialized, newline-terminated server message.
pub type Line = std::sync::Arc<str>;

/// Latest game state for one connection. `None` until the first broadcast.
pub type Outbox = watch::Receiver<Option<Line>>;

/// A registered push connection.
#[derive(Debug)]
struct Session {
    player_id: PlayerId,
    outbox: watch::Sender<Option<Line>>,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Outboxes that now hold the snapshot
    pub delivered: usize,
    /// Outboxes whose writer has already stopped
    pub dead: usize,
}

/// Registry of joined push connections.
///
/// Each connection holds only the most recent game state; a writer that falls
/// behind skips straight to the newest one. Broadcasts are serialized so a
/// snapshot taken earlier can never replace one taken later.
#[derive(Debug)]
pub struct SessionRegistry {
    table: TableHandle,
    sessions: RwLock<HashMap<ConnectionId, Session>>,
    broadcast_lock: Mutex<()>,
    next_connection_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new(table: TableHandle) -> Self {
        Self {
            table,
            sessions: RwLock::new(HashMap::new()),
            broadcast_lock: Mutex::new(()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    /// Allocate an id for a freshly accepted connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Track a connection whose player has already been seated, returning
    /// the outbox its writer should drain.
    pub async fn register(&self, connection_id: ConnectionId, player_id: PlayerId) -> Outbox {
        let (outbox, receiver) = watch::channel(None);
        self.sessions
            .write()
            .await
            .insert(connection_id, Session { player_id, outbox });
        log::debug!("Connection {connection_id} registered");
        receiver
    }

    /// Stop tracking a connection, returning the player it carried.
    ///
    /// The outbox closes once its last queued state has been seen.
    pub async fn deregister(&self, connection_id: ConnectionId) -> Option<PlayerId> {
        self.sessions
            .write()
            .await
            .remove(&connection_id)
            .map(|session| session.player_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Tear down a closed connection: deregister it, remove its player from
    /// the table and let everyone else see the departure.
    ///
    /// Only a connection's own read loop calls this, so a player is removed
    /// at most once.
    pub async fn disconnect(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<PlayerId>, TableError> {
        let Some(player_id) = self.deregister(connection_id).await else {
            return Ok(None);
        };

        self.table.remove_player(player_id.clone()).await?;
        self.broadcast().await?;
        Ok(Some(player_id))
    }

    /// Send the latest snapshot to every registered connection.
    ///
    /// A closed outbox is logged and left in place; its reader removes it.
    pub async fn broadcast(&self) -> Result<BroadcastReport, TableError> {
        let _guard = self.broadcast_lock.lock().await;

        let snapshot = self.table.snapshot().await?;
        let message = ServerMessage::GameState { data: snapshot };
        let line: Line = match utils::encode_line(&message) {
            Ok(line) => line.into(),
            Err(e) => {
                log::error!("Failed to serialize game state: {e}");
                return Ok(BroadcastReport::default());
            }
        };

        let mut report = BroadcastReport::default();
        let sessions = self.sessions.read().await;
        for (connection_id, session) in sessions.iter() {
            match session.outbox.send(Some(line.clone())) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    log::warn!(
                        "Failed to send to connection {connection_id}; it will be removed when its reader exits"
                    );
                    report.dead += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        game::entities::{Action, RoundState},
        table::{TableActor, TableConfig},
    };

    fn registry(required_players: usize) -> SessionRegistry {
        SessionRegistry::new(TableActor::spawn(TableConfig {
            required_players,
            ..TableConfig::default()
        }))
    }

    async fn join(registry: &SessionRegistry, name: &str) -> (ConnectionId, Outbox) {
        let connection_id = registry.next_connection_id();
        registry
            .table()
            .add_player(name.into(), Some(name.into()))
            .await
            .unwrap()
            .unwrap();
        let outbox = registry.register(connection_id, name.into()).await;
        (connection_id, outbox)
    }

    async fn next_state(outbox: &mut Outbox) -> crate::game::entities::GameSnapshot {
        outbox.changed().await.unwrap();
        let line = outbox.borrow_and_update().clone().unwrap();
        assert!(line.ends_with('\n'));
        match utils::decode_line(line.trim_end()).unwrap() {
            ServerMessage::GameState { data } => data,
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        let registry = registry(3);
        let (_, mut rx_a) = join(&registry, "a").await;
        let (_, mut rx_b) = join(&registry, "b").await;

        let report = registry.broadcast().await.unwrap();
        assert_eq!(report.delivered, 2);

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(next_state(rx).await.players.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_dead_connection_stays_registered() {
        let registry = registry(3);
        let (_, rx_a) = join(&registry, "a").await;
        let (_, _rx_b) = join(&registry, "b").await;
        drop(rx_a);

        let report = registry.broadcast().await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dead, 1);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_slow_connection_sees_latest_state() {
        let registry = registry(2);
        let (_, mut rx_a) = join(&registry, "a").await;
        registry.broadcast().await.unwrap();
        let (_, _rx_b) = join(&registry, "b").await;
        registry.broadcast().await.unwrap();
        registry
            .table()
            .handle_action("a".into(), Action::RaiseNumber { number: 2 })
            .await
            .unwrap()
            .unwrap();
        registry.broadcast().await.unwrap();

        // Nothing was read in between; only the newest state is pending.
        let state = next_state(&mut rx_a).await;
        assert_eq!(state.round_state, RoundState::WaitingForNumbers);
        assert_eq!(state.players[&PlayerId::new("a")].raised_number, Some(2));
        assert!(!rx_a.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_deregistered_outbox_delivers_pending_state_then_closes() {
        let registry = registry(2);
        let (conn_a, mut rx_a) = join(&registry, "a").await;
        registry.broadcast().await.unwrap();
        registry.deregister(conn_a).await;

        assert_eq!(next_state(&mut rx_a).await.players.len(), 1);
        assert!(rx_a.changed().await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_removes_player_and_notifies_others() {
        let registry = registry(2);
        let (conn_a, _rx_a) = join(&registry, "a").await;
        let (_, mut rx_b) = join(&registry, "b").await;

        let removed = registry.disconnect(conn_a).await.unwrap();
        assert_eq!(removed, Some(PlayerId::new("a")));
        assert_eq!(registry.len().await, 1);
        assert!(
            !registry
                .table()
                .contains_player("a".into())
                .await
                .unwrap()
        );

        let state = next_state(&mut rx_b).await;
        assert_eq!(state.round_state, RoundState::WaitingForPlayers);
        assert!(!state.players.contains_key(&PlayerId::new("a")));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let registry = registry(2);
        let (conn_a, _rx_a) = join(&registry, "a").await;
        assert!(registry.disconnect(conn_a).await.unwrap().is_some());
        assert_eq!(registry.disconnect(conn_a).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let registry = registry(2);
        let first = registry.next_connection_id();
        let second = registry.next_connection_id();
        assert_ne!(first, second);
    }
}
