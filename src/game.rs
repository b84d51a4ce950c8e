use crate::board::Board;
use crate::common::PlayerIndex;
use crate::config::BOT_PLAYER_INDEX;
use crate::ship::Ship;

/// Lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    AwaitingFleets,
    InProgress,
    Finished,
}

/// One participant's slice of a game.
#[derive(Debug)]
pub struct PlayerGameState {
    pub index: PlayerIndex,
    /// Own fleet, as submitted or generated.
    pub ships: Vec<Ship>,
    /// This participant's view of the enemy grid; their shots land here.
    pub opponent_board: Board,
    pub is_bot: bool,
}

impl PlayerGameState {
    pub fn new(index: PlayerIndex) -> Self {
        Self {
            index,
            ships: Vec::new(),
            opponent_board: Board::new(),
            is_bot: index == BOT_PLAYER_INDEX,
        }
    }

    pub fn has_fleet(&self) -> bool {
        !self.ships.is_empty()
    }
}

/// One match between two participants.
#[derive(Debug)]
pub struct Game {
    pub participants: [PlayerGameState; 2],
    pub turn_owner: PlayerIndex,
    pub is_single_player: bool,
    pub status: GameStatus,
}

impl Game {
    /// A fresh game; `first` moves first.
    pub fn new(first: PlayerIndex, second: PlayerIndex) -> Self {
        Self {
            participants: [PlayerGameState::new(first), PlayerGameState::new(second)],
            turn_owner: first,
            is_single_player: second == BOT_PLAYER_INDEX,
            status: GameStatus::AwaitingFleets,
        }
    }

    pub fn participant(&self, index: PlayerIndex) -> Option<&PlayerGameState> {
        self.participants.iter().find(|p| p.index == index)
    }

    pub fn participant_mut(&mut self, index: PlayerIndex) -> Option<&mut PlayerGameState> {
        self.participants.iter_mut().find(|p| p.index == index)
    }

    /// Index of the participant that is not `index`.
    pub fn opponent_of(&self, index: PlayerIndex) -> Option<PlayerIndex> {
        if self.participant(index).is_none() {
            return None;
        }
        self.participants
            .iter()
            .map(|p| p.index)
            .find(|&i| i != index)
    }

    pub fn is_bot_turn(&self) -> bool {
        self.is_single_player && self.turn_owner == BOT_PLAYER_INDEX
    }

    pub fn human_indices(&self) -> impl Iterator<Item = PlayerIndex> + '_ {
        self.participants.iter().filter(|p| !p.is_bot).map(|p| p.index)
    }
}
