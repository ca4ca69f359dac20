//! Stateless poll adapter.
//!
//! Each connection carries exactly one request. Nothing is remembered between
//! requests apart from the game itself; the caller's identity comes from the
//! `X-Player-ID` header on every call.

use number_guess::{
    UserError,
    entities::{Action, PlayerId, Username},
    messages::{ConnectRequest, ConnectResponse, StatusResponse},
    table::TableError,
};
use serde_json::Value;
use std::{net::SocketAddr, time::Instant};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    time::timeout,
};

use super::{
    AppState,
    http::{self, Request, RequestError, Response},
};
use crate::{logging, metrics};

const ADAPTER: &str = "poll";

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
            Err(e) => log::warn!("Failed to accept poll connection: {e}"),
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: AppState) {
    let start = Instant::now();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // One deadline covers the head and the body.
    let read = timeout(
        state.config.poll_header_timeout,
        http::read_request(&mut reader),
    )
    .await;

    let (request, response) = match read {
        Ok(Ok(request)) => {
            let response = route(&state, &request).await;
            (Some(request), response)
        }
        Ok(Err(RequestError::Malformed(message))) => (None, Response::error(400, message)),
        Ok(Err(RequestError::Closed)) => return,
        Ok(Err(RequestError::Io(e))) => {
            log::debug!("Poll request from {peer} failed: {e}");
            return;
        }
        Err(_) => {
            log::debug!("Poll request from {peer} timed out");
            return;
        }
    };

    if let Err(e) = write_half.write_all(&response.to_bytes()).await {
        log::debug!("Failed to write poll response to {peer}: {e}");
    }
    let _ = write_half.shutdown().await;

    let (method, path, player_id) = match &request {
        Some(request) => (
            request.method.as_str(),
            request.path.as_str(),
            request.header(http::PLAYER_ID_HEADER),
        ),
        None => ("-", "-", None),
    };
    let elapsed = start.elapsed();
    logging::log_api_request(
        method,
        path,
        response.status,
        elapsed.as_millis() as u64,
        player_id,
    );
    metrics::poll_requests_total(method, path, response.status);
    metrics::poll_request_duration_ms(path, elapsed.as_secs_f64() * 1000.0);
}

/// Dispatch one parsed request. POST bodies are parsed before routing.
pub async fn route(state: &AppState, request: &Request) -> Response {
    let body = match request.method.as_str() {
        "GET" => Value::Null,
        "POST" => match parse_body(&request.body) {
            Some(body) => body,
            None => return Response::error(400, "Invalid JSON in request body"),
        },
        _ => return Response::error(400, "Unsupported method"),
    };

    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/connect") => connect(state, body).await,
        ("GET", "/gamestate") => game_state(state, request).await,
        ("POST", "/action") => action(state, request, body).await,
        ("POST", "/disconnect") => disconnect(state, request).await,
        (_, path) => Response::error(404, format!("Endpoint {path} not found")),
    }
}

/// An empty body counts as `{}`.
fn parse_body(body: &[u8]) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Some(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(body).ok()
}

fn unavailable(e: TableError) -> Response {
    log::error!("Table unavailable: {e}");
    Response::error(503, "Game is unavailable")
}

async fn connect(state: &AppState, body: Value) -> Response {
    let username = serde_json::from_value::<ConnectRequest>(body)
        .ok()
        .and_then(|request| request.username)
        .map(|username| Username::new(&username))
        .filter(|username| !username.is_empty());
    let Some(username) = username else {
        return Response::error(400, "Username is required");
    };

    let player_id = PlayerId::generate();
    match state
        .registry
        .table()
        .add_player(player_id.clone(), Some(username))
        .await
    {
        Ok(Ok(())) => {
            state.broadcast().await;
            Response::json(
                200,
                &ConnectResponse {
                    player_id,
                    message: "Welcome!".to_string(),
                },
            )
        }
        Ok(Err(e)) => Response::error(409, e.to_string()),
        Err(e) => unavailable(e),
    }
}

async fn game_state(state: &AppState, request: &Request) -> Response {
    if request.player_id().is_none() {
        return Response::error(400, "X-Player-ID header is required");
    }

    match state.registry.table().snapshot().await {
        Ok(snapshot) => Response::json(200, &snapshot),
        Err(e) => unavailable(e),
    }
}

async fn action(state: &AppState, request: &Request, body: Value) -> Response {
    let Some(player_id) = request.player_id() else {
        return Response::error(401, "X-Player-ID header is required");
    };
    let table = state.registry.table();

    let result = match serde_json::from_value::<Action>(body) {
        Ok(action) => table.handle_action(player_id.clone(), action).await,
        Err(e) => match table.contains_player(player_id.clone()).await {
            Ok(true) => {
                log::debug!("Unparseable action body from {player_id}: {e}");
                Ok(Err(UserError::UnrecognizedAction))
            }
            Ok(false) => Ok(Err(UserError::UserDoesNotExist)),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(Err(UserError::UserDoesNotExist)) => {
            Response::error(404, UserError::UserDoesNotExist.to_string())
        }
        Ok(outcome) => {
            metrics::actions_total(ADAPTER, outcome.is_ok());
            if let Err(e) = outcome {
                log::debug!("Ignored action from {player_id}: {e}");
            }
            state.broadcast().await;
            Response::json(
                200,
                &StatusResponse {
                    status: "Action received".to_string(),
                },
            )
        }
        Err(e) => unavailable(e),
    }
}

async fn disconnect(state: &AppState, request: &Request) -> Response {
    let Some(player_id) = request.player_id() else {
        return Response::error(401, "X-Player-ID header is required");
    };

    match state.registry.table().remove_player(player_id.clone()).await {
        Ok(removed) => {
            if removed {
                state.broadcast().await;
            }
            Response::json(
                200,
                &StatusResponse {
                    status: format!("Player {player_id} disconnected"),
                },
            )
        }
        Err(e) => unavailable(e),
    }
}
