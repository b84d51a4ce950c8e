//! Plays solo games headlessly against the bot and prints a JSON summary.
//!
//! Usage: `sim [games] [seed]`

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::json;

use seabattle::protocol::{RandomAttackRequest, RegisterRequest, SubmitFleetRequest};
use seabattle::{
    init_logging, Board, Command, ConnectionId, Dispatcher, GameId, PlayerIndex, Registry,
    ServerMessage, BOT_PLAYER_INDEX,
};

const DEFAULT_GAMES: usize = 100;
/// Upper bound on human shots per game; a board has only 100 cells.
const MAX_SHOTS: usize = 100;

const CONN: ConnectionId = ConnectionId(0);

struct Outcome {
    winner: PlayerIndex,
    shots: usize,
}

fn messages(dispatcher: &mut Dispatcher, command: Command) -> anyhow::Result<Vec<ServerMessage>> {
    Ok(dispatcher
        .handle(CONN, command)?
        .into_iter()
        .map(|d| d.message)
        .collect())
}

fn play_one(
    dispatcher: &mut Dispatcher,
    index: PlayerIndex,
    rng: &mut SmallRng,
) -> anyhow::Result<Outcome> {
    let game_id: GameId = messages(dispatcher, Command::StartSoloGame)?
        .into_iter()
        .find_map(|m| match m {
            ServerMessage::CreateGame(c) => Some(c.game_id),
            _ => None,
        })
        .ok_or_else(|| anyhow::anyhow!("no create-game for solo game"))?;

    let ships = Board::new().generate_fleet(rng)?;
    messages(
        dispatcher,
        Command::SubmitFleet(SubmitFleetRequest {
            game_id,
            player_index: index,
            ships,
        }),
    )?;

    for shots in 1..=MAX_SHOTS {
        let replies = messages(
            dispatcher,
            Command::RandomAttack(RandomAttackRequest {
                game_id,
                player_index: index,
            }),
        )?;
        let finish = replies.iter().find_map(|m| match m {
            ServerMessage::Finish(f) => Some(f.win_player),
            _ => None,
        });
        if let Some(winner) = finish {
            return Ok(Outcome { winner, shots });
        }
    }
    Err(anyhow::anyhow!("game {} did not finish", game_id))
}

fn main() -> anyhow::Result<()> {
    init_logging(None);
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 3 {
        eprintln!("Usage: {} [games] [seed]", args[0]);
        std::process::exit(1);
    }
    let games: usize = match args.get(1) {
        Some(n) => n.parse()?,
        None => DEFAULT_GAMES,
    };
    let seed: u64 = match args.get(2) {
        Some(s) => s.parse()?,
        None => 0,
    };

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut dispatcher = Dispatcher::new(Registry::with_seed(seed.wrapping_add(1)));
    let index = messages(
        &mut dispatcher,
        Command::Register(RegisterRequest {
            name: "sim".to_string(),
            password: "sim".to_string(),
        }),
    )?
    .into_iter()
    .find_map(|m| match m {
        ServerMessage::Register(r) if !r.error => Some(r.index),
        _ => None,
    })
    .ok_or_else(|| anyhow::anyhow!("registration failed"))?;

    let mut bot_wins = 0usize;
    let mut human_wins = 0usize;
    let mut total_shots = 0usize;
    for _ in 0..games {
        let outcome = play_one(&mut dispatcher, index, &mut rng)?;
        if outcome.winner == BOT_PLAYER_INDEX {
            bot_wins += 1;
        } else {
            human_wins += 1;
        }
        total_shots += outcome.shots;
    }

    let average = if games == 0 {
        0.0
    } else {
        total_shots as f64 / games as f64
    };
    let result = json!({
        "games": games,
        "botWins": bot_wins,
        "humanWins": human_wins,
        "averageAttacks": average,
    });
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
