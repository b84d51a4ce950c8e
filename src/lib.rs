mod bitboard;
mod board;
mod common;
mod config;
pub mod dispatcher;
mod game;
mod logging;
pub mod protocol;
pub mod registry;
#[cfg(feature = "server")]
pub mod server;
mod ship;
#[cfg(feature = "server")]
pub mod transport;

pub use bitboard::{BitBoard, BitBoardError};
pub use board::*;
pub use common::*;
pub use config::*;
pub use dispatcher::{Audience, Delivery, Dispatcher, Outbound};
pub use game::*;
pub use logging::{init_logging, LOG_ENV};
pub use protocol::{Command, Envelope, ProtocolError, ServerMessage};
pub use registry::{FleetPlacement, LeaderboardEntry, Registration, Registry, Room, RoomMember};
#[cfg(feature = "server")]
pub use server::{Hub, Server};
pub use ship::*;
#[cfg(feature = "server")]
pub use transport::tcp::TcpTransport;
