/// Integration tests for the push adapter
///
/// Each test runs a real server on ephemeral ports in a background thread and
/// drives it with blocking clients.
use ng_server::{
    api::Server,
    config::{ServerConfig, ServerMode},
};
use number_guess::{
    Client,
    entities::RoundState,
    messages::ServerMessage,
    utils,
};
use std::{
    io::{BufReader, Write},
    net::{SocketAddr, TcpStream},
    sync::mpsc,
    thread,
    time::Duration,
};

fn start_server(mode: ServerMode, required_players: usize) -> (SocketAddr, Option<SocketAddr>) {
    let config = ServerConfig {
        mode,
        push_bind: "127.0.0.1:0".parse().unwrap(),
        poll_bind: "127.0.0.1:0".parse().unwrap(),
        required_players,
        ..ServerConfig::default()
    };

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let server = Server::bind(&config).await.unwrap();
            tx.send((server.push_addr(), server.poll_addr())).unwrap();
            server.run(std::future::pending()).await.unwrap();
        });
    });

    let (push_addr, poll_addr) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    (push_addr.unwrap(), poll_addr)
}

#[test]
fn test_two_players_play_a_round() {
    let (addr, _) = start_server(ServerMode::Push, 2);

    let mut alice = Client::connect("alice", &addr).unwrap();
    let alice_id = alice.player_id.clone();
    let lobby = alice
        .wait_for_state(|s| s.players.contains_key(&alice_id))
        .unwrap();
    assert_eq!(lobby.round_state, RoundState::WaitingForPlayers);

    let mut bob = Client::connect("bob", &addr).unwrap();
    let bob_id = bob.player_id.clone();
    let started = bob
        .wait_for_state(|s| s.round_state == RoundState::WaitingForNumbers)
        .unwrap();
    assert_eq!(started.current_round, 1);
    assert_eq!(started.active_player_id, Some(alice_id.clone()));
    alice
        .wait_for_state(|s| s.round_state == RoundState::WaitingForNumbers)
        .unwrap();

    alice.raise_number(2).unwrap();
    bob.wait_for_state(|s| s.active_player_id.as_ref() == Some(&bob_id))
        .unwrap();
    bob.raise_number(1).unwrap();

    let guessing = alice
        .wait_for_state(|s| s.round_state == RoundState::WaitingForGuesses)
        .unwrap();
    assert_eq!(guessing.active_player_id, Some(alice_id.clone()));
    assert_eq!(guessing.actual_total, None);

    alice.make_guess(3).unwrap();
    let over = bob
        .wait_for_state(|s| s.round_state == RoundState::RoundOver)
        .unwrap();
    assert_eq!(over.actual_total, Some(3));
    assert_eq!(over.players[&alice_id].score, 1);
    assert!(over.round_message.contains("guessed correctly (3)"));

    bob.start_new_round().unwrap();
    let next = alice
        .wait_for_state(|s| s.current_round == 2 && s.round_state == RoundState::WaitingForNumbers)
        .unwrap();
    assert_eq!(next.players[&alice_id].score, 1);
    assert_eq!(next.active_player_id, Some(alice_id));
}

#[test]
fn test_full_game_rejects_join() {
    let (addr, _) = start_server(ServerMode::Push, 2);
    let _alice = Client::connect("alice", &addr).unwrap();
    let _bob = Client::connect("bob", &addr).unwrap();

    let error = Client::connect("carol", &addr).err().unwrap();
    assert_eq!(error.to_string(), "Game is full.");
}

#[test]
fn test_invalid_handshake_closes_connection() {
    let (addr, _) = start_server(ServerMode::Push, 2);

    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream.write_all(b"hello there\n").unwrap();

    let mut reader = BufReader::new(stream);
    let line = utils::read_line(&mut reader).unwrap().unwrap();
    assert_eq!(
        utils::decode_line::<ServerMessage>(&line).unwrap(),
        ServerMessage::error("Invalid handshake")
    );
    assert!(utils::read_line(&mut reader).unwrap().is_none());
}

#[test]
fn test_malformed_lines_are_dropped() {
    let (addr, _) = start_server(ServerMode::Push, 2);
    let mut alice = Client::connect("alice", &addr).unwrap();
    let mut bob = Client::connect("bob", &addr).unwrap();
    alice
        .wait_for_state(|s| s.round_state == RoundState::WaitingForNumbers)
        .unwrap();

    alice.send_raw("this is not json").unwrap();
    alice.send_raw(r#"{"action": "dance"}"#).unwrap();
    alice.raise_number(1).unwrap();

    // The connection survived both bad lines and the raise went through.
    let bob_id = bob.player_id.clone();
    let snapshot = bob
        .wait_for_state(|s| s.active_player_id.as_ref() == Some(&bob_id))
        .unwrap();
    assert_eq!(snapshot.players[&alice.player_id].raised_number, Some(1));
}

#[test]
fn test_departure_is_broadcast() {
    let (addr, _) = start_server(ServerMode::Push, 2);
    let mut alice = Client::connect("alice", &addr).unwrap();
    let bob = Client::connect("bob", &addr).unwrap();
    alice
        .wait_for_state(|s| s.round_state == RoundState::WaitingForNumbers)
        .unwrap();

    let bob_id = bob.player_id.clone();
    drop(bob);

    let snapshot = alice
        .wait_for_state(|s| !s.players.contains_key(&bob_id))
        .unwrap();
    assert_eq!(snapshot.round_state, RoundState::WaitingForPlayers);
    assert_eq!(snapshot.current_round, 0);
    assert_eq!(
        snapshot.round_message,
        "A player disconnected. Waiting for players."
    );
}

#[test]
fn test_poll_join_reaches_push_client() {
    let (addr, poll_addr) = start_server(ServerMode::Both, 2);
    let poll_addr = poll_addr.unwrap();
    let mut alice = Client::connect("alice", &addr).unwrap();

    let body = r#"{"username": "bob"}"#;
    let mut stream = TcpStream::connect(poll_addr).unwrap();
    write!(
        stream,
        "POST /connect HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
    .unwrap();
    let mut response = String::new();
    std::io::Read::read_to_string(&mut stream, &mut response).unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));

    let snapshot = alice
        .wait_for_state(|s| s.players.len() == 2)
        .unwrap();
    assert_eq!(snapshot.round_state, RoundState::WaitingForNumbers);
    assert!(
        snapshot
            .player_usernames
            .values()
            .any(|name| name.as_str() == "bob")
    );
}
