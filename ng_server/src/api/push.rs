//! Persistent push adapter.
//!
//! One task per accepted connection reads the handshake and then action
//! lines. A second task per connection writes the connection's latest game
//! state to the socket, so a slow client never holds up a broadcast and
//! skips straight to the newest state when it falls behind.

use log::{debug, error, info, warn};
use number_guess::{
    entities::{Action, PlayerId},
    messages::{ClientHello, ServerMessage},
    session::{ConnectionId, Outbox},
    utils,
};
use std::net::SocketAddr;
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

use super::AppState;
use crate::{logging, metrics};

const ADAPTER: &str = "push";

/// Accept connections forever, one task each.
pub async fn serve(listener: TcpListener, state: AppState) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer, state).await;
                });
            }
            Err(e) => warn!("Failed to accept push connection: {e}"),
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: AppState) {
    let connection_id = state.registry.next_connection_id();
    metrics::push_connections_total();
    debug!("Push connection {connection_id} accepted from {peer}");

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let Some(player_id) = join(&mut reader, &mut write_half, connection_id, &state).await else {
        let _ = write_half.shutdown().await;
        return;
    };

    let outbox = state
        .registry
        .register(connection_id, player_id.clone())
        .await;
    metrics::push_connections_active(state.registry.len().await);
    logging::log_connection_event("joined", connection_id, Some(player_id.as_str()));

    tokio::spawn(write_outbox(write_half, outbox, connection_id));
    state.broadcast().await;

    read_actions(&mut reader, &player_id, connection_id, &state).await;

    // Dropping the registry entry closes the outbox, which lets the writer
    // task flush the pending state and close the socket.
    match state.registry.disconnect(connection_id).await {
        Ok(Some(_)) => {}
        Ok(None) => warn!("Connection {connection_id} was already deregistered"),
        Err(e) => error!("Failed to remove player {player_id}: {e}"),
    }
    metrics::push_connections_active(state.registry.len().await);
    logging::log_connection_event("closed", connection_id, Some(player_id.as_str()));
}

/// Run the handshake. Returns the seated player, or `None` once the client
/// has been told why it cannot join.
async fn join(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    connection_id: ConnectionId,
    state: &AppState,
) -> Option<PlayerId> {
    let line = match utils::read_line_async(reader).await {
        Ok(Some(line)) => line,
        Ok(None) => {
            debug!("Connection {connection_id} closed before handshake");
            return None;
        }
        Err(e) => {
            warn!("Connection {connection_id} handshake read failed: {e}");
            return None;
        }
    };

    let hello: ClientHello = match utils::decode_line(&line) {
        Ok(hello) => hello,
        Err(e) => {
            info!("Connection {connection_id} sent an invalid handshake: {e}");
            metrics::push_handshakes_rejected("invalid_handshake");
            send_direct(writer, &ServerMessage::error("Invalid handshake")).await;
            return None;
        }
    };

    let player_id = PlayerId::generate();
    match state
        .registry
        .table()
        .add_player(player_id.clone(), hello.username())
        .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            info!("Connection {connection_id} refused: {e}");
            metrics::push_handshakes_rejected("join_refused");
            send_direct(writer, &ServerMessage::error(e.to_string())).await;
            return None;
        }
        Err(e) => {
            error!("Connection {connection_id} cannot join: {e}");
            send_direct(writer, &ServerMessage::error("Game is unavailable")).await;
            return None;
        }
    }

    let welcome = ServerMessage::Welcome {
        player_id: player_id.clone(),
    };
    if !send_direct(writer, &welcome).await {
        // Seated but unreachable; undo the join so the seat frees up.
        if let Err(e) = state.registry.table().remove_player(player_id).await {
            error!("Failed to undo join for connection {connection_id}: {e}");
        }
        state.broadcast().await;
        return None;
    }

    Some(player_id)
}

/// Write a message straight to the socket, bypassing the outbox.
async fn send_direct(writer: &mut OwnedWriteHalf, message: &ServerMessage) -> bool {
    let line = match utils::encode_line(message) {
        Ok(line) => line,
        Err(e) => {
            error!("Failed to serialize {message}: {e}");
            return false;
        }
    };
    match writer.write_all(line.as_bytes()).await {
        Ok(()) => true,
        Err(e) => {
            debug!("Failed to send {message}: {e}");
            false
        }
    }
}

async fn read_actions(
    reader: &mut BufReader<OwnedReadHalf>,
    player_id: &PlayerId,
    connection_id: ConnectionId,
    state: &AppState,
) {
    loop {
        match utils::read_line_async(reader).await {
            Ok(Some(line)) => {
                if handle_line(&line, player_id, state).await {
                    state.broadcast().await;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Connection {connection_id} read failed: {e}");
                break;
            }
        }
    }
}

/// Apply one action line. Returns whether a broadcast should follow.
async fn handle_line(line: &str, player_id: &PlayerId, state: &AppState) -> bool {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            debug!("Dropping malformed line from {player_id}: {e}");
            return false;
        }
    };

    let action: Action = match serde_json::from_value(value) {
        Ok(action) => action,
        Err(e) => {
            debug!("Ignoring unrecognised action from {player_id}: {e}");
            metrics::actions_total(ADAPTER, false);
            return true;
        }
    };

    match state
        .registry
        .table()
        .handle_action(player_id.clone(), action)
        .await
    {
        Ok(result) => metrics::actions_total(ADAPTER, result.is_ok()),
        Err(e) => error!("Failed to apply action from {player_id}: {e}"),
    }
    true
}

/// Write each new state to the socket until the outbox closes.
async fn write_outbox(mut writer: OwnedWriteHalf, mut outbox: Outbox, connection_id: ConnectionId) {
    while outbox.changed().await.is_ok() {
        let pending = outbox.borrow_and_update().clone();
        let Some(line) = pending else {
            continue;
        };
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Connection {connection_id} write failed: {e}");
            break;
        }
    }
    let _ = writer.shutdown().await;
}
