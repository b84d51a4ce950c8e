#![allow(dead_code)]

use seabattle::protocol::RegisterRequest;
use seabattle::{
    Command, ConnectionId, Delivery, Dispatcher, PlayerIndex, Position, Registry, ServerMessage,
    Ship, ShipClass,
};

/// Fixed legal fleet occupying rows 0, 2 and 4:
///
/// ```text
/// ####.###..
/// ..........
/// ###.##.##.
/// ..........
/// ##.#.#.#.#
/// ```
pub fn standard_fleet() -> Vec<Ship> {
    use ShipClass::*;
    [
        (Huge, 0, 0),
        (Large, 5, 0),
        (Large, 0, 2),
        (Medium, 4, 2),
        (Medium, 7, 2),
        (Medium, 0, 4),
        (Small, 3, 4),
        (Small, 5, 4),
        (Small, 7, 4),
        (Small, 9, 4),
    ]
    .into_iter()
    .map(|(class, x, y)| Ship::new(class, Position::new(x, y), false))
    .collect()
}

/// `standard_fleet` flipped top to bottom, so rows 0 to 4 are empty.
pub fn mirrored_fleet() -> Vec<Ship> {
    standard_fleet()
        .into_iter()
        .map(|s| Ship::new(s.class, Position::new(s.position.x, 9 - s.position.y), false))
        .collect()
}

pub fn messages_for(deliveries: &[Delivery], conn: ConnectionId) -> Vec<ServerMessage> {
    deliveries
        .iter()
        .filter(|d| d.connection == conn)
        .map(|d| d.message.clone())
        .collect()
}

pub fn register(d: &mut Dispatcher, conn: ConnectionId, name: &str) -> PlayerIndex {
    let out = d
        .handle(
            conn,
            Command::Register(RegisterRequest {
                name: name.to_string(),
                password: "secret".to_string(),
            }),
        )
        .unwrap();
    match &messages_for(&out, conn)[0] {
        ServerMessage::Register(r) if !r.error => r.index,
        other => panic!("registration failed: {:?}", other),
    }
}

pub fn dispatcher() -> Dispatcher {
    Dispatcher::new(Registry::with_seed(42))
}
