//! Wire records exchanged with clients.
//!
//! Every frame carries an [`Envelope`]: a `kind` string and a JSON
//! `payload`. Inbound envelopes decode into a [`Command`]; handlers answer
//! with [`ServerMessage`]s, which encode back into envelopes.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{AttackStatus, GameId, PlayerIndex, RoomId};
use crate::registry::{LeaderboardEntry, Registration, Room};
use crate::ship::{Position, Ship};

/// Command kinds, as they appear on the wire.
pub mod kind {
    pub const REGISTER: &str = "register";
    pub const UPDATE_LEADERBOARD: &str = "update-leaderboard";
    pub const UPDATE_ROOMS: &str = "update-rooms";
    pub const CREATE_ROOM: &str = "create-room";
    pub const JOIN_ROOM: &str = "join-room";
    pub const CREATE_GAME: &str = "create-game";
    pub const SUBMIT_FLEET: &str = "submit-fleet";
    pub const START_GAME: &str = "start-game";
    pub const TURN: &str = "turn";
    pub const ATTACK: &str = "attack";
    pub const RANDOM_ATTACK: &str = "random-attack";
    pub const FINISH: &str = "finish";
    pub const START_SOLO_GAME: &str = "start-solo-game";
}

/// One framed record: `{"kind": ..., "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.payload)
    }
}

/// Errors decoding an inbound envelope.
#[derive(Debug)]
pub enum ProtocolError {
    UnknownKind(String),
    Malformed { kind: String, source: serde_json::Error },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownKind(kind) => write!(f, "unknown command kind {:?}", kind),
            ProtocolError::Malformed { kind, source } => {
                write!(f, "malformed {} payload: {}", kind, source)
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Malformed { source, .. } => Some(source),
            ProtocolError::UnknownKind(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFleetRequest {
    pub game_id: GameId,
    pub player_index: PlayerIndex,
    pub ships: Vec<Ship>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRequest {
    pub game_id: GameId,
    pub x: u8,
    pub y: u8,
    pub player_index: PlayerIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomAttackRequest {
    pub game_id: GameId,
    pub player_index: PlayerIndex,
}

/// Inbound commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum Command {
    Register(RegisterRequest),
    CreateRoom,
    JoinRoom(JoinRoomRequest),
    SubmitFleet(SubmitFleetRequest),
    Attack(AttackRequest),
    RandomAttack(RandomAttackRequest),
    StartSoloGame,
}

impl Command {
    /// Decodes an inbound envelope. Payloads of payload-less commands are
    /// ignored whatever they hold.
    pub fn decode(envelope: &Envelope) -> Result<Command, ProtocolError> {
        fn payload<T: serde::de::DeserializeOwned>(env: &Envelope) -> Result<T, ProtocolError> {
            serde_json::from_value(env.payload.clone()).map_err(|source| ProtocolError::Malformed {
                kind: env.kind.clone(),
                source,
            })
        }

        match envelope.kind.as_str() {
            kind::REGISTER => Ok(Command::Register(payload(envelope)?)),
            kind::CREATE_ROOM => Ok(Command::CreateRoom),
            kind::JOIN_ROOM => Ok(Command::JoinRoom(payload(envelope)?)),
            kind::SUBMIT_FLEET => Ok(Command::SubmitFleet(payload(envelope)?)),
            kind::ATTACK => Ok(Command::Attack(payload(envelope)?)),
            kind::RANDOM_ATTACK => Ok(Command::RandomAttack(payload(envelope)?)),
            kind::START_SOLO_GAME => Ok(Command::StartSoloGame),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGame {
    pub game_id: GameId,
    pub player_index: PlayerIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    /// The recipient's own fleet.
    pub ships: Vec<Ship>,
    pub current_player_index: PlayerIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub current_player: PlayerIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackResult {
    pub position: Position,
    /// The attacker.
    pub current_player: PlayerIndex,
    pub status: AttackStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finish {
    pub win_player: PlayerIndex,
}

/// Outbound messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    Register(Registration),
    UpdateLeaderboard(Vec<LeaderboardEntry>),
    UpdateRooms(Vec<Room>),
    CreateGame(CreateGame),
    StartGame(StartGame),
    Turn(Turn),
    Attack(AttackResult),
    Finish(Finish),
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Register(_) => kind::REGISTER,
            ServerMessage::UpdateLeaderboard(_) => kind::UPDATE_LEADERBOARD,
            ServerMessage::UpdateRooms(_) => kind::UPDATE_ROOMS,
            ServerMessage::CreateGame(_) => kind::CREATE_GAME,
            ServerMessage::StartGame(_) => kind::START_GAME,
            ServerMessage::Turn(_) => kind::TURN,
            ServerMessage::Attack(_) => kind::ATTACK,
            ServerMessage::Finish(_) => kind::FINISH,
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(envelope)?)
    }
}
