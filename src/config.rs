use core::time::Duration;

use crate::common::PlayerIndex;
use crate::ship::ShipClass;

pub const BOARD_SIZE: u8 = 10;
pub const NUM_SHIPS: usize = 10;

/// Fleet every player places: one huge, two large, three medium, four small.
pub const FLEET: [ShipClass; NUM_SHIPS] = [
    ShipClass::Huge,
    ShipClass::Large,
    ShipClass::Large,
    ShipClass::Medium,
    ShipClass::Medium,
    ShipClass::Medium,
    ShipClass::Small,
    ShipClass::Small,
    ShipClass::Small,
    ShipClass::Small,
];

/// Total number of ship cells in the standard fleet.
pub const TOTAL_SHIP_CELLS: usize = 4 + 3 + 3 + 2 + 2 + 2 + 1 + 1 + 1 + 1;

/// Participant index reserved for the scripted opponent.
pub const BOT_PLAYER_INDEX: PlayerIndex = -1;

/// Leaderboard name under which bot wins are recorded.
pub const BOT_NAME: &str = "bot";

/// Default listen address for the server binary.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Maximum frame size (64 KiB); a full fleet submission is well under 2 KiB.
pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// Default time allowed for writing one frame to a client.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime settings for the TCP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub max_frame_size: u32,
    pub write_timeout: Duration,
    /// Fixed RNG seed for reproducible bot fleets and random attacks.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_frame_size: MAX_FRAME_SIZE,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            seed: None,
        }
    }
}
