//! In-memory store of players, rooms, games and the leaderboard.
//!
//! Players, games and room ids are arena-style integer handles into
//! append-only storage; nothing is ever renumbered. Only rooms are removed.

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::common::{AttackOutcome, AttackStatus, ConnectionId, GameId, PlayerIndex, RegistryError, RoomId};
use crate::config::{BOT_NAME, BOT_PLAYER_INDEX};
use crate::board::Board;
use crate::game::{Game, GameStatus};
use crate::ship::{Position, Ship};

/// A registered player. Never removed, so reconnection and win history
/// survive disconnects.
#[derive(Debug)]
pub struct Player {
    pub name: String,
    password: String,
    /// `None` while offline.
    pub connection: Option<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub player_index: PlayerIndex,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: RoomId,
    pub members: Vec<RoomMember>,
}

/// Win tally, keyed by display name so it survives reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub display_name: String,
    pub win_count: u32,
}

/// Outcome of a registration attempt, sent back verbatim to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub index: PlayerIndex,
    pub error: bool,
    pub error_text: String,
}

/// What `submit_fleet` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetPlacement {
    /// Stored; still waiting for the other side.
    Waiting,
    /// Both boards populated, game is in progress.
    Started,
}

pub struct Registry {
    players: Vec<Player>,
    rooms: Vec<Room>,
    next_room_id: RoomId,
    games: Vec<Game>,
    leaderboard: Vec<LeaderboardEntry>,
    rng: SmallRng,
}

impl Registry {
    pub fn new(rng: SmallRng) -> Self {
        Self {
            players: Vec::new(),
            rooms: Vec::new(),
            next_room_id: 0,
            games: Vec::new(),
            leaderboard: Vec::new(),
            rng,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    /// Creates a player on first sight of `name`, otherwise checks the
    /// password and rebinds the connection. A connection carries at most
    /// one player; a second registration on it is refused.
    pub fn register_or_reconnect(
        &mut self,
        name: &str,
        password: &str,
        connection: ConnectionId,
    ) -> Registration {
        if let Some(bound) = self.player_by_connection(connection) {
            let current = self.player(bound).map(|p| p.name.clone()).unwrap_or_default();
            debug!("{} already bound to {}, refusing {}", connection, current, name);
            return Registration {
                name: name.to_string(),
                index: bound,
                error: true,
                error_text: format!("Connection already logged in as {}", current),
            };
        }

        let existing = self.players.iter().position(|p| p.name == name);
        let Some(idx) = existing else {
            let index = self.players.len() as PlayerIndex;
            self.players.push(Player {
                name: name.to_string(),
                password: password.to_string(),
                connection: Some(connection),
            });
            info!("registered player {} as #{} on {}", name, index, connection);
            return Registration {
                name: name.to_string(),
                index,
                error: false,
                error_text: String::new(),
            };
        };

        let index = idx as PlayerIndex;
        let player = &mut self.players[idx];
        let failure = |text: String| Registration {
            name: name.to_string(),
            index,
            error: true,
            error_text: text,
        };
        if player.password != password {
            debug!("wrong password for {} on {}", name, connection);
            return failure("Wrong password".to_string());
        }
        if player.connection.is_some() {
            debug!("{} already logged in, refusing {}", name, connection);
            return failure(format!("Player {} already logged in", name));
        }
        player.connection = Some(connection);
        info!("player {} (#{}) reconnected on {}", name, index, connection);
        Registration {
            name: name.to_string(),
            index,
            error: false,
            error_text: String::new(),
        }
    }

    pub fn player(&self, index: PlayerIndex) -> Option<&Player> {
        usize::try_from(index).ok().and_then(|i| self.players.get(i))
    }

    /// Index of the player currently bound to `connection`.
    pub fn player_by_connection(&self, connection: ConnectionId) -> Option<PlayerIndex> {
        self.players
            .iter()
            .position(|p| p.connection == Some(connection))
            .map(|i| i as PlayerIndex)
    }

    pub fn connection_of(&self, index: PlayerIndex) -> Option<ConnectionId> {
        self.player(index).and_then(|p| p.connection)
    }

    /// Connections of every online player, in registration order.
    pub fn connected(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().filter_map(|p| p.connection)
    }

    /// Clears the connection bound to `connection` and drops the rooms its
    /// player created. Returns whether a player was found.
    pub fn disconnect(&mut self, connection: ConnectionId) -> bool {
        let Some(index) = self.player_by_connection(connection) else {
            return false;
        };
        if let Some(player) = self.players.get_mut(index as usize) {
            player.connection = None;
            info!("player {} (#{}) went offline", player.name, index);
        }
        self.close_room_by_creator(index);
        true
    }

    pub fn open_room(&mut self, index: PlayerIndex) -> Result<RoomId, RegistryError> {
        let name = self
            .player(index)
            .ok_or(RegistryError::UnknownPlayer(index))?
            .name
            .clone();
        let room_id = self.next_room_id;
        self.next_room_id += 1;
        self.rooms.push(Room {
            room_id,
            members: vec![RoomMember {
                player_index: index,
                player_name: name,
            }],
        });
        debug!("player #{} opened room {}", index, room_id);
        Ok(room_id)
    }

    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.room_id == room_id)
    }

    /// Rooms still waiting for a second player.
    pub fn open_rooms(&self) -> Vec<Room> {
        self.rooms
            .iter()
            .filter(|r| r.members.len() == 1)
            .cloned()
            .collect()
    }

    pub fn close_room_by_creator(&mut self, index: PlayerIndex) {
        self.rooms
            .retain(|r| r.members.first().map(|m| m.player_index) != Some(index));
    }

    pub fn close_room_by_id(&mut self, room_id: RoomId) {
        self.rooms.retain(|r| r.room_id != room_id);
    }

    /// New two-player game; `first` has the opening turn.
    pub fn pair_players(&mut self, first: PlayerIndex, second: PlayerIndex) -> GameId {
        let game_id = self.games.len();
        self.games.push(Game::new(first, second));
        info!("game {} created: #{} vs #{}", game_id, first, second);
        game_id
    }

    /// New game against the bot; the human moves first.
    pub fn start_solo_game(&mut self, index: PlayerIndex) -> GameId {
        let game_id = self.games.len();
        self.games.push(Game::new(index, BOT_PLAYER_INDEX));
        info!("solo game {} created for #{}", game_id, index);
        game_id
    }

    pub fn game(&self, game_id: GameId) -> Result<&Game, RegistryError> {
        self.games.get(game_id).ok_or(RegistryError::UnknownGame(game_id))
    }

    fn game_mut(&mut self, game_id: GameId) -> Result<&mut Game, RegistryError> {
        self.games
            .get_mut(game_id)
            .ok_or(RegistryError::UnknownGame(game_id))
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// Stores a participant's fleet and, once both sides are ready, places
    /// each fleet on the opposing board.
    pub fn submit_fleet(
        &mut self,
        game_id: GameId,
        index: PlayerIndex,
        ships: Vec<Ship>,
    ) -> Result<FleetPlacement, RegistryError> {
        if !Board::is_fleet_legal(&ships) {
            return Err(RegistryError::FleetRejected);
        }
        let Registry { games, rng, .. } = self;
        let game = games.get_mut(game_id).ok_or(RegistryError::UnknownGame(game_id))?;
        let participant = game
            .participant_mut(index)
            .ok_or(RegistryError::NotParticipant { game: game_id, player: index })?;
        if participant.has_fleet() {
            return Err(RegistryError::FleetAlreadyPlaced);
        }
        participant.ships = ships;

        let ready = game.is_single_player || game.participants.iter().all(|p| p.has_fleet());
        if !ready {
            return Ok(FleetPlacement::Waiting);
        }

        let [first, second] = &mut game.participants;
        if game.is_single_player {
            // The bot's fleet lands straight on the human's target board.
            second.ships = first.opponent_board.generate_fleet(rng)?;
        } else {
            first.opponent_board.place_ships(&second.ships)?;
        }
        second.opponent_board.place_ships(&first.ships)?;
        game.status = GameStatus::InProgress;
        info!("game {} started, #{} to move", game_id, game.turn_owner);
        Ok(FleetPlacement::Started)
    }

    /// Opens `pos` on the attacker's view of the enemy grid. Marks the game
    /// finished when the last enemy ship cell goes.
    pub fn resolve_attack(
        &mut self,
        game_id: GameId,
        attacker: PlayerIndex,
        pos: Position,
    ) -> Result<AttackOutcome, RegistryError> {
        let game = self.game_mut(game_id)?;
        let state = game
            .participant_mut(attacker)
            .ok_or(RegistryError::NotParticipant { game: game_id, player: attacker })?;
        let outcome = state.opponent_board.resolve_attack(pos)?;
        if outcome.status == AttackStatus::FleetDestroyed {
            game.status = GameStatus::Finished;
        }
        Ok(outcome)
    }

    /// Hands the turn to whoever is not `attacker`.
    pub fn advance_turn(
        &mut self,
        game_id: GameId,
        attacker: PlayerIndex,
    ) -> Result<PlayerIndex, RegistryError> {
        let game = self.game_mut(game_id)?;
        let next = game
            .opponent_of(attacker)
            .ok_or(RegistryError::NotParticipant { game: game_id, player: attacker })?;
        game.turn_owner = next;
        Ok(next)
    }

    /// Bumps the winner's tally and returns the whole leaderboard.
    pub fn record_win(&mut self, index: PlayerIndex) -> Result<&[LeaderboardEntry], RegistryError> {
        let name = if index == BOT_PLAYER_INDEX {
            BOT_NAME.to_string()
        } else {
            self.player(index)
                .ok_or(RegistryError::UnknownPlayer(index))?
                .name
                .clone()
        };
        match self.leaderboard.iter_mut().find(|e| e.display_name == name) {
            Some(entry) => entry.win_count += 1,
            None => self.leaderboard.push(LeaderboardEntry {
                display_name: name,
                win_count: 1,
            }),
        }
        Ok(&self.leaderboard)
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    /// Random closed cell on `index`'s view of the enemy grid.
    pub fn pick_random_target(
        &mut self,
        game_id: GameId,
        index: PlayerIndex,
    ) -> Result<Option<Position>, RegistryError> {
        let Registry { games, rng, .. } = self;
        let game = games.get(game_id).ok_or(RegistryError::UnknownGame(game_id))?;
        let state = game
            .participant(index)
            .ok_or(RegistryError::NotParticipant { game: game_id, player: index })?;
        Ok(state.opponent_board.pick_random_unopened_cell(rng))
    }

    /// The bot's next shot.
    pub fn pick_bot_target(&mut self, game_id: GameId) -> Result<Option<Position>, RegistryError> {
        self.pick_random_target(game_id, BOT_PLAYER_INDEX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: ConnectionId = ConnectionId(1);
    const BOB: ConnectionId = ConnectionId(2);

    #[test]
    fn reconnect_rules() {
        let mut reg = Registry::with_seed(7);
        let first = reg.register_or_reconnect("alice", "pw", ALICE);
        assert!(!first.error);
        assert_eq!(first.index, 0);

        let dup = reg.register_or_reconnect("alice", "pw", BOB);
        assert!(dup.error);
        assert_eq!(dup.error_text, "Player alice already logged in");

        let wrong = reg.register_or_reconnect("alice", "nope", BOB);
        assert_eq!(wrong.error_text, "Wrong password");

        assert!(reg.disconnect(ALICE));
        assert!(!reg.disconnect(ALICE));
        let back = reg.register_or_reconnect("alice", "pw", BOB);
        assert!(!back.error);
        assert_eq!(back.index, 0);
        assert_eq!(reg.connection_of(0), Some(BOB));
    }

    #[test]
    fn room_ids_are_not_reused() {
        let mut reg = Registry::with_seed(7);
        reg.register_or_reconnect("alice", "pw", ALICE);
        let a = reg.open_room(0).unwrap();
        reg.close_room_by_id(a);
        let b = reg.open_room(0).unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.open_room(5), Err(RegistryError::UnknownPlayer(5)));
    }

    #[test]
    fn turn_alternates_between_participants() {
        let mut reg = Registry::with_seed(7);
        let game = reg.pair_players(3, 8);
        assert_eq!(reg.game(game).unwrap().turn_owner, 3);
        assert_eq!(reg.advance_turn(game, 3).unwrap(), 8);
        assert_eq!(reg.advance_turn(game, 8).unwrap(), 3);
        assert!(reg.advance_turn(game, 4).is_err());
    }

    #[test]
    fn one_player_per_connection() {
        let mut reg = Registry::with_seed(7);
        reg.register_or_reconnect("alice", "pw", ALICE);
        let second = reg.register_or_reconnect("carol", "pw", ALICE);
        assert!(second.error);
        assert_eq!(second.index, 0);
        assert_eq!(second.error_text, "Connection already logged in as alice");
        assert!(reg.player(1).is_none());
        assert_eq!(reg.connected().count(), 1);

        assert!(reg.disconnect(ALICE));
        let carol = reg.register_or_reconnect("carol", "pw", BOB);
        assert!(!carol.error);
        assert_eq!(carol.index, 1);
    }

    #[test]
    fn wins_accumulate_by_display_name() {
        let mut reg = Registry::with_seed(7);
        reg.register_or_reconnect("alice", "pw", ALICE);
        reg.record_win(0).unwrap();
        reg.record_win(BOT_PLAYER_INDEX).unwrap();
        let board = reg.record_win(0).unwrap().to_vec();
        assert_eq!(
            board,
            vec![
                LeaderboardEntry {
                    display_name: "alice".into(),
                    win_count: 2
                },
                LeaderboardEntry {
                    display_name: BOT_NAME.into(),
                    win_count: 1
                },
            ]
        );

        reg.disconnect(ALICE);
        reg.register_or_reconnect("alice", "pw", BOB);
        let board = reg.record_win(0).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].win_count, 3);
        assert_eq!(reg.record_win(9), Err(RegistryError::UnknownPlayer(9)));
    }
}
