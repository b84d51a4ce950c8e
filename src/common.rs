//! Common types: identifiers, attack results and error enums.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::bitboard::BitBoardError;
use crate::ship::Position;

/// Stable index of a registered player; the bot uses `BOT_PLAYER_INDEX`.
pub type PlayerIndex = i32;
pub type GameId = usize;
pub type RoomId = usize;

/// Identity the transport assigns to one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Result of an attack on a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttackStatus {
    Miss,
    /// Ship damaged but still afloat.
    Hit,
    Sunk,
    /// The last ship cell on the board was opened.
    FleetDestroyed,
    AlreadyOpened,
}

impl AttackStatus {
    /// Whether the turn passes to the other participant.
    pub fn passes_turn(self) -> bool {
        matches!(self, AttackStatus::Miss | AttackStatus::AlreadyOpened)
    }
}

/// Status plus the cells auto-revealed around a sunk ship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    pub status: AttackStatus,
    pub revealed: Vec<Position>,
}

impl AttackOutcome {
    pub fn status(status: AttackStatus) -> Self {
        Self {
            status,
            revealed: Vec::new(),
        }
    }
}

/// Errors returned by Board operations.
#[derive(Debug, PartialEq, Eq)]
pub enum BoardError {
    BitBoardError(BitBoardError),
    /// Attack target or ship cell lies off the grid.
    OutOfBounds,
    /// Ship length outside 1..=4.
    InvalidLength(u8),
    /// No legal placement left for a ship during generation.
    UnableToPlaceShip,
}

impl From<BitBoardError> for BoardError {
    fn from(err: BitBoardError) -> Self {
        BoardError::BitBoardError(err)
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::BitBoardError(e) => write!(f, "BitBoard error: {}", e),
            BoardError::OutOfBounds => write!(f, "Position is out of bounds"),
            BoardError::InvalidLength(len) => write!(f, "Invalid ship length {}", len),
            BoardError::UnableToPlaceShip => write!(f, "Unable to place ship"),
        }
    }
}

impl std::error::Error for BoardError {}

/// Errors returned by Registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    UnknownGame(GameId),
    UnknownPlayer(PlayerIndex),
    /// Player index is not one of the game's two participants.
    NotParticipant { game: GameId, player: PlayerIndex },
    /// Fleet does not match the fixed composition or breaks placement rules.
    FleetRejected,
    /// Participant already has ships placed.
    FleetAlreadyPlaced,
    Board(BoardError),
}

impl From<BoardError> for RegistryError {
    fn from(err: BoardError) -> Self {
        RegistryError::Board(err)
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownGame(id) => write!(f, "Unknown game {}", id),
            RegistryError::UnknownPlayer(idx) => write!(f, "Unknown player {}", idx),
            RegistryError::NotParticipant { game, player } => {
                write!(f, "Player {} is not part of game {}", player, game)
            }
            RegistryError::FleetRejected => write!(f, "Fleet rejected"),
            RegistryError::FleetAlreadyPlaced => write!(f, "Fleet already placed"),
            RegistryError::Board(e) => write!(f, "Board error: {}", e),
        }
    }
}

impl std::error::Error for RegistryError {}
