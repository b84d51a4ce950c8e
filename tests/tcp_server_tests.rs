mod common;

use std::sync::Arc;

use common::{mirrored_fleet, standard_fleet};
use seabattle::protocol::{AttackRequest, JoinRoomRequest, RegisterRequest, SubmitFleetRequest};
use seabattle::server::serve_connection;
use seabattle::transport::frame::{read_frame, write_frame};
use seabattle::transport::Transport;
use seabattle::{
    AttackStatus, Command, Dispatcher, Envelope, Hub, Registry, Server, ServerConfig,
    ServerMessage, TcpTransport,
};
use serde_json::json;
use tokio::io::AsyncWriteExt;

async fn start_server() -> anyhow::Result<std::net::SocketAddr> {
    let server = Server::bind(ServerConfig {
        bind: "127.0.0.1:0".to_string(),
        seed: Some(5),
        ..ServerConfig::default()
    })
    .await?;
    let addr = server.local_addr()?;
    tokio::spawn(server.run());
    Ok(addr)
}

async fn send(t: &mut TcpTransport, command: Command) -> anyhow::Result<()> {
    t.send(command.to_envelope()?).await
}

async fn recv(t: &mut TcpTransport) -> anyhow::Result<ServerMessage> {
    Ok(ServerMessage::from_envelope(t.recv().await?)?)
}

async fn login(addr: std::net::SocketAddr, name: &str) -> anyhow::Result<TcpTransport> {
    let mut t = TcpTransport::connect(addr).await?;
    send(
        &mut t,
        Command::Register(RegisterRequest {
            name: name.to_string(),
            password: "pw".to_string(),
        }),
    )
    .await?;
    match recv(&mut t).await? {
        ServerMessage::Register(r) => assert!(!r.error, "{}", r.error_text),
        other => panic!("expected register, got {:?}", other),
    }
    assert!(matches!(recv(&mut t).await?, ServerMessage::UpdateLeaderboard(_)));
    assert!(matches!(recv(&mut t).await?, ServerMessage::UpdateRooms(_)));
    Ok(t)
}

#[tokio::test(flavor = "multi_thread")]
async fn two_players_play_over_tcp() -> anyhow::Result<()> {
    let addr = start_server().await?;
    let mut alice = login(addr, "alice").await?;
    let mut bob = login(addr, "bob").await?;
    // bob's registration is broadcast to alice too.
    assert!(matches!(recv(&mut alice).await?, ServerMessage::UpdateLeaderboard(_)));
    assert!(matches!(recv(&mut alice).await?, ServerMessage::UpdateRooms(_)));

    send(&mut alice, Command::CreateRoom).await?;
    for t in [&mut alice, &mut bob] {
        match recv(t).await? {
            ServerMessage::UpdateRooms(rooms) => assert_eq!(rooms.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    send(&mut bob, Command::JoinRoom(JoinRoomRequest { room_id: 0 })).await?;
    let mut game_ids = Vec::new();
    for t in [&mut alice, &mut bob] {
        match recv(t).await? {
            ServerMessage::CreateGame(c) => game_ids.push((c.game_id, c.player_index)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(recv(t).await?, ServerMessage::UpdateRooms(vec![]));
    }
    assert_eq!(game_ids, vec![(0, 0), (0, 1)]);

    send(
        &mut alice,
        Command::SubmitFleet(SubmitFleetRequest {
            game_id: 0,
            player_index: 0,
            ships: standard_fleet(),
        }),
    )
    .await?;
    send(
        &mut bob,
        Command::SubmitFleet(SubmitFleetRequest {
            game_id: 0,
            player_index: 1,
            ships: mirrored_fleet(),
        }),
    )
    .await?;
    for t in [&mut alice, &mut bob] {
        match recv(t).await? {
            ServerMessage::StartGame(s) => assert_eq!(s.current_player_index, 0),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(recv(t).await?, ServerMessage::Turn(turn) if turn.current_player == 0));
    }

    send(
        &mut alice,
        Command::Attack(AttackRequest {
            game_id: 0,
            x: 0,
            y: 0,
            player_index: 0,
        }),
    )
    .await?;
    for t in [&mut alice, &mut bob] {
        match recv(t).await? {
            ServerMessage::Attack(a) => assert_eq!(a.status, AttackStatus::Miss),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(recv(t).await?, ServerMessage::Turn(turn) if turn.current_player == 1));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnect_is_broadcast_and_reconnect_works() -> anyhow::Result<()> {
    let addr = start_server().await?;
    let mut alice = login(addr, "alice").await?;
    let mut bob = login(addr, "bob").await?;
    recv(&mut alice).await?;
    recv(&mut alice).await?;

    send(&mut alice, Command::CreateRoom).await?;
    recv(&mut alice).await?;
    recv(&mut bob).await?;

    drop(alice);
    assert_eq!(recv(&mut bob).await?, ServerMessage::UpdateRooms(vec![]));

    let _alice = login(addr, "alice").await?;
    Ok(())
}

#[tokio::test]
async fn garbage_frames_do_not_kill_the_connection() -> anyhow::Result<()> {
    let hub = Hub::new(Dispatcher::new(Registry::with_seed(1)));
    let (mut client, server_side) = tokio::io::duplex(4096);
    let config = Arc::new(ServerConfig::default());
    let task = tokio::spawn(serve_connection(hub.clone(), server_side, config));

    let junk = b"not json";
    client.write_all(&(junk.len() as u32).to_be_bytes()).await?;
    client.write_all(junk).await?;
    write_frame(&mut client, &Envelope::new("fly", json!(null)), 1024).await?;
    write_frame(
        &mut client,
        &Envelope::new("register", json!({"name": "carol", "password": "x"})),
        1024,
    )
    .await?;

    let body = read_frame(&mut client, 4096).await?.expect("register reply");
    let reply: Envelope = serde_json::from_slice(&body)?;
    assert_eq!(reply.kind, "register");
    assert_eq!(reply.payload["name"], "carol");
    assert_eq!(reply.payload["error"], false);
    assert_eq!(hub.connection_count(), 1);

    drop(client);
    task.await??;
    assert_eq!(hub.connection_count(), 0);
    Ok(())
}

#[tokio::test]
async fn oversized_frame_closes_the_connection() -> anyhow::Result<()> {
    let hub = Hub::new(Dispatcher::new(Registry::with_seed(1)));
    let (mut client, server_side) = tokio::io::duplex(4096);
    let config = Arc::new(ServerConfig {
        max_frame_size: 16,
        ..ServerConfig::default()
    });
    let task = tokio::spawn(serve_connection(hub.clone(), server_side, config));

    client.write_all(&1000u32.to_be_bytes()).await?;
    task.await??;
    assert_eq!(hub.connection_count(), 0);
    assert!(read_frame(&mut client, 4096).await?.is_none());
    Ok(())
}
