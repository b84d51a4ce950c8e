//! Routes decoded commands to handlers and fans their results out.
//!
//! Handlers take the registry and a typed request and return declarative
//! [`Outbound`] messages; no handler touches a connection. The dispatcher
//! resolves each audience into per-connection [`Delivery`] values, in order,
//! so the caller only has to write them out.

use log::{debug, info, warn};

use crate::common::{AttackStatus, ConnectionId, GameId, PlayerIndex, RegistryError};
use crate::config::{BOARD_SIZE, BOT_PLAYER_INDEX};
use crate::game::GameStatus;
use crate::protocol::{
    AttackRequest, AttackResult, Command, CreateGame, Envelope, Finish, JoinRoomRequest,
    RandomAttackRequest, RegisterRequest, ServerMessage, StartGame, SubmitFleetRequest, Turn,
};
use crate::registry::{FleetPlacement, Registry};
use crate::ship::Position;

/// Who an outbound message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The connection the command came in on, registered or not.
    Origin,
    Player(PlayerIndex),
    /// Both human participants of a game.
    Participants(GameId),
    /// Every connected player.
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl Outbound {
    fn new(audience: Audience, message: ServerMessage) -> Self {
        Self { audience, message }
    }
}

/// A message bound for one concrete connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub connection: ConnectionId,
    pub message: ServerMessage,
}

pub struct Dispatcher {
    registry: Registry,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Decodes and handles one inbound envelope. Unknown kinds and
    /// malformed payloads are dropped without a reply.
    pub fn dispatch(
        &mut self,
        origin: ConnectionId,
        envelope: &Envelope,
    ) -> anyhow::Result<Vec<Delivery>> {
        debug!("<- {} {}", origin, envelope);
        match Command::decode(envelope) {
            Ok(command) => self.handle(origin, command),
            Err(e) => {
                warn!("{}: dropping command: {}", origin, e);
                Ok(Vec::new())
            }
        }
    }

    /// Runs one command to completion, including any bot turns it sets off.
    pub fn handle(
        &mut self,
        origin: ConnectionId,
        command: Command,
    ) -> anyhow::Result<Vec<Delivery>> {
        let reg = &mut self.registry;
        let outbound = match command {
            Command::Register(req) => register(reg, origin, req),
            Command::CreateRoom => create_room(reg, origin)?,
            Command::JoinRoom(req) => join_room(reg, origin, req),
            Command::SubmitFleet(req) => submit_fleet(reg, origin, req)?,
            Command::Attack(req) => attack(reg, origin, req)?,
            Command::RandomAttack(req) => random_attack(reg, origin, req)?,
            Command::StartSoloGame => start_solo_game(reg, origin),
        };
        Ok(self.resolve(origin, outbound))
    }

    /// Transport hook for a closed connection. Broadcasts the room list when
    /// a player actually went offline.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Delivery> {
        if !self.registry.disconnect(connection) {
            return Vec::new();
        }
        let update = rooms_update(&self.registry);
        self.resolve(connection, vec![update])
    }

    /// Expands audiences into deliveries, skipping offline players and the
    /// bot.
    fn resolve(&self, origin: ConnectionId, outbound: Vec<Outbound>) -> Vec<Delivery> {
        let reg = &self.registry;
        let mut deliveries = Vec::new();
        for Outbound { audience, message } in outbound {
            let targets: Vec<ConnectionId> = match audience {
                Audience::Origin => vec![origin],
                Audience::Player(index) => reg.connection_of(index).into_iter().collect(),
                Audience::Participants(game_id) => match reg.game(game_id) {
                    Ok(game) => game
                        .human_indices()
                        .filter_map(|i| reg.connection_of(i))
                        .collect(),
                    Err(_) => Vec::new(),
                },
                Audience::Everyone => reg.connected().collect(),
            };
            for connection in targets {
                debug!("-> {} {}", connection, message.kind());
                deliveries.push(Delivery {
                    connection,
                    message: message.clone(),
                });
            }
        }
        deliveries
    }
}

fn dropped(origin: ConnectionId, why: &str) -> Vec<Outbound> {
    debug!("{}: ignored, {}", origin, why);
    Vec::new()
}

fn rooms_update(reg: &Registry) -> Outbound {
    Outbound::new(Audience::Everyone, ServerMessage::UpdateRooms(reg.open_rooms()))
}

fn register(reg: &mut Registry, origin: ConnectionId, req: RegisterRequest) -> Vec<Outbound> {
    let result = reg.register_or_reconnect(&req.name, &req.password, origin);
    let accepted = !result.error;
    let mut out = vec![Outbound::new(Audience::Origin, ServerMessage::Register(result))];
    if accepted {
        out.push(Outbound::new(
            Audience::Everyone,
            ServerMessage::UpdateLeaderboard(reg.leaderboard().to_vec()),
        ));
        out.push(rooms_update(reg));
    }
    out
}

fn create_room(reg: &mut Registry, origin: ConnectionId) -> anyhow::Result<Vec<Outbound>> {
    let Some(index) = reg.player_by_connection(origin) else {
        return Ok(dropped(origin, "create-room before register"));
    };
    reg.open_room(index)?;
    Ok(vec![rooms_update(reg)])
}

fn join_room(reg: &mut Registry, origin: ConnectionId, req: JoinRoomRequest) -> Vec<Outbound> {
    let Some(joiner) = reg.player_by_connection(origin) else {
        return dropped(origin, "join-room before register");
    };
    let Some(creator) = reg
        .room(req.room_id)
        .and_then(|room| room.members.first())
        .map(|m| m.player_index)
    else {
        return dropped(origin, "no such room");
    };
    if creator == joiner {
        return dropped(origin, "joining own room");
    }

    let game_id = reg.pair_players(creator, joiner);
    reg.close_room_by_id(req.room_id);
    // Both players are now busy; their other waiting rooms go too.
    reg.close_room_by_creator(creator);
    reg.close_room_by_creator(joiner);

    let create = |player_index| {
        Outbound::new(
            Audience::Player(player_index),
            ServerMessage::CreateGame(CreateGame {
                game_id,
                player_index,
            }),
        )
    };
    vec![create(creator), create(joiner), rooms_update(reg)]
}

fn submit_fleet(
    reg: &mut Registry,
    origin: ConnectionId,
    req: SubmitFleetRequest,
) -> anyhow::Result<Vec<Outbound>> {
    if reg.player_by_connection(origin) != Some(req.player_index) {
        return Ok(dropped(origin, "fleet for another player"));
    }
    let game_id = req.game_id;
    match reg.submit_fleet(game_id, req.player_index, req.ships) {
        Ok(FleetPlacement::Waiting) => Ok(Vec::new()),
        Ok(FleetPlacement::Started) => {
            let game = reg.game(game_id)?;
            let mut out: Vec<Outbound> = game
                .participants
                .iter()
                .filter(|p| !p.is_bot)
                .map(|p| {
                    Outbound::new(
                        Audience::Player(p.index),
                        ServerMessage::StartGame(StartGame {
                            ships: p.ships.clone(),
                            current_player_index: game.turn_owner,
                        }),
                    )
                })
                .collect();
            out.push(Outbound::new(
                Audience::Participants(game_id),
                ServerMessage::Turn(Turn {
                    current_player: game.turn_owner,
                }),
            ));
            Ok(out)
        }
        Err(
            e @ (RegistryError::UnknownGame(_)
            | RegistryError::NotParticipant { .. }
            | RegistryError::FleetRejected
            | RegistryError::FleetAlreadyPlaced),
        ) => {
            warn!("{}: fleet for game {} refused: {}", origin, game_id, e);
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn attack(
    reg: &mut Registry,
    origin: ConnectionId,
    req: AttackRequest,
) -> anyhow::Result<Vec<Outbound>> {
    if reg.player_by_connection(origin) != Some(req.player_index) {
        return Ok(dropped(origin, "attack for another player"));
    }
    let mut out = resolve_attack(reg, req.game_id, req.player_index, Position::new(req.x, req.y))?;
    out.extend(play_bot_turns(reg, req.game_id)?);
    Ok(out)
}

fn random_attack(
    reg: &mut Registry,
    origin: ConnectionId,
    req: RandomAttackRequest,
) -> anyhow::Result<Vec<Outbound>> {
    if reg.player_by_connection(origin) != Some(req.player_index) {
        return Ok(dropped(origin, "attack for another player"));
    }
    let target = match reg.pick_random_target(req.game_id, req.player_index) {
        Ok(Some(target)) => target,
        Ok(None) => return Ok(dropped(origin, "board fully open")),
        Err(e) => {
            warn!("{}: random attack on game {} refused: {}", origin, req.game_id, e);
            return Ok(Vec::new());
        }
    };
    attack(
        reg,
        origin,
        AttackRequest {
            game_id: req.game_id,
            x: target.x,
            y: target.y,
            player_index: req.player_index,
        },
    )
}

fn start_solo_game(reg: &mut Registry, origin: ConnectionId) -> Vec<Outbound> {
    let Some(index) = reg.player_by_connection(origin) else {
        return dropped(origin, "start-solo-game before register");
    };
    let game_id = reg.start_solo_game(index);
    reg.close_room_by_creator(index);
    vec![
        Outbound::new(
            Audience::Player(index),
            ServerMessage::CreateGame(CreateGame {
                game_id,
                player_index: index,
            }),
        ),
        rooms_update(reg),
    ]
}

/// One attack by `attacker`, including turn handover, auto-revealed misses
/// and the finish notice. Out-of-turn and out-of-phase attacks yield
/// nothing.
fn resolve_attack(
    reg: &mut Registry,
    game_id: GameId,
    attacker: PlayerIndex,
    pos: Position,
) -> anyhow::Result<Vec<Outbound>> {
    let Ok(game) = reg.game(game_id) else {
        debug!("attack on unknown game {}", game_id);
        return Ok(Vec::new());
    };
    if game.participant(attacker).is_none()
        || game.status != GameStatus::InProgress
        || game.turn_owner != attacker
        || pos.x >= BOARD_SIZE
        || pos.y >= BOARD_SIZE
    {
        debug!("game {}: attack by #{} at {:?} ignored", game_id, attacker, pos);
        return Ok(Vec::new());
    }

    let outcome = reg.resolve_attack(game_id, attacker, pos)?;
    if outcome.status.passes_turn() {
        reg.advance_turn(game_id, attacker)?;
    }
    let turn = ServerMessage::Turn(Turn {
        current_player: reg.game(game_id)?.turn_owner,
    });
    let to_game = |message| Outbound::new(Audience::Participants(game_id), message);
    let shot = |position, status| {
        to_game(ServerMessage::Attack(AttackResult {
            position,
            current_player: attacker,
            status,
        }))
    };

    let mut out = Vec::new();
    if outcome.status != AttackStatus::AlreadyOpened {
        out.push(shot(pos, outcome.status));
    }
    out.push(to_game(turn.clone()));
    for cell in outcome.revealed {
        out.push(shot(cell, AttackStatus::Miss));
        out.push(to_game(turn.clone()));
    }

    if outcome.status == AttackStatus::FleetDestroyed {
        let leaderboard = reg.record_win(attacker)?.to_vec();
        info!("game {} won by #{}", game_id, attacker);
        out.push(to_game(ServerMessage::Finish(Finish {
            win_player: attacker,
        })));
        out.push(to_game(ServerMessage::UpdateLeaderboard(leaderboard)));
    }
    Ok(out)
}

/// Plays the bot until it misses or wins. Each shot opens a closed cell, so
/// the loop ends.
fn play_bot_turns(reg: &mut Registry, game_id: GameId) -> anyhow::Result<Vec<Outbound>> {
    let mut out = Vec::new();
    loop {
        let bot_to_move = match reg.game(game_id) {
            Ok(game) => game.is_bot_turn() && game.status == GameStatus::InProgress,
            Err(_) => false,
        };
        if !bot_to_move {
            break;
        }
        let Some(target) = reg.pick_bot_target(game_id)? else {
            break;
        };
        let step = resolve_attack(reg, game_id, BOT_PLAYER_INDEX, target)?;
        if step.is_empty() {
            break;
        }
        out.extend(step);
    }
    Ok(out)
}
