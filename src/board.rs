//! Target grid: ship placement, attack resolution and random generation.
//!
//! A `Board` is one participant's view of the enemy grid. It holds the
//! enemy ships, which cells have been opened so far, and how many ship
//! cells have been hit.

use core::fmt;

use rand::Rng;

use crate::common::{AttackOutcome, AttackStatus, BoardError};
use crate::config::{BOARD_SIZE, FLEET, NUM_SHIPS};
use crate::ship::{neighbors_of, Footprint, Position, Ship, ShipClass, BB};

const CELLS: usize = BOARD_SIZE as usize * BOARD_SIZE as usize;

pub struct Board {
    ships: Vec<Ship>,
    ship_masks: Vec<BB>,
    /// Index into `ships` for every occupied cell.
    occupants: [Option<u8>; CELLS],
    ship_map: BB,
    opened: BB,
    hit_count: usize,
    ship_cells: usize,
}

impl Board {
    /// Empty board: no ships, every cell closed.
    pub fn new() -> Self {
        Board {
            ships: Vec::with_capacity(NUM_SHIPS),
            ship_masks: Vec::with_capacity(NUM_SHIPS),
            occupants: [None; CELLS],
            ship_map: BB::new(),
            opened: BB::new(),
            hit_count: 0,
            ship_cells: 0,
        }
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Mask of every ship cell.
    pub fn ship_map(&self) -> BB {
        self.ship_map
    }

    /// Mask of every opened cell.
    pub fn opened(&self) -> BB {
        self.opened
    }

    pub fn is_opened(&self, pos: Position) -> Result<bool, BoardError> {
        Ok(self.opened.get(pos)?)
    }

    /// Ship cells revealed so far.
    pub fn hit_count(&self) -> usize {
        self.hit_count
    }

    /// Summed length of all ships placed on this board.
    pub fn total_ship_cells(&self) -> usize {
        self.ship_cells
    }

    /// True once ships are placed and every ship cell has been hit.
    pub fn is_destroyed(&self) -> bool {
        self.ship_cells > 0 && self.hit_count == self.ship_cells
    }

    /// Marks every cell under every ship as occupied.
    ///
    /// Legality is the caller's concern; only cells leaving the grid are
    /// rejected. Open state is untouched.
    pub fn place_ships(&mut self, ships: &[Ship]) -> Result<(), BoardError> {
        for ship in ships {
            let cells = ship.cells()?;
            let slot = self.ships.len() as u8;
            for &cell in &cells {
                self.occupants[cell_index(cell)] = Some(slot);
            }
            let mask = BB::from_positions(cells)?;
            self.ship_map |= mask;
            self.ship_masks.push(mask);
            self.ships.push(*ship);
            self.ship_cells += ship.length as usize;
        }
        Ok(())
    }

    /// True iff the ship fits on the grid and neither its cells nor their
    /// 8-neighbourhood touch a ship already on this board.
    pub fn is_placement_legal(&self, ship: &Ship) -> bool {
        match neighbors_of(ship, Footprint::Include) {
            Ok(cells) => cells
                .into_iter()
                .all(|pos| !self.ship_map.get(pos).unwrap_or(true)),
            Err(_) => false,
        }
    }

    /// Checks a submitted fleet: the fixed composition, each ship's class
    /// matching its length, and no two ships touching.
    pub fn is_fleet_legal(ships: &[Ship]) -> bool {
        if ships.len() != NUM_SHIPS {
            return false;
        }
        let mut wanted: Vec<ShipClass> = FLEET.to_vec();
        for ship in ships {
            if ShipClass::from_length(ship.length) != Some(ship.class) {
                return false;
            }
            match wanted.iter().position(|c| *c == ship.class) {
                Some(i) => {
                    wanted.swap_remove(i);
                }
                None => return false,
            }
        }
        let mut scratch = Board::new();
        for ship in ships {
            if !scratch.is_placement_legal(ship) || scratch.place_ships(&[*ship]).is_err() {
                return false;
            }
        }
        true
    }

    /// Places a complete random fleet and returns it.
    ///
    /// Each ship in turn is drawn uniformly from every legal placement left
    /// on the board, then placed before the next one is drawn.
    pub fn generate_fleet<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<Ship>, BoardError> {
        let mut fleet = Vec::with_capacity(NUM_SHIPS);
        for class in FLEET {
            let candidates = self.legal_placements(class);
            if candidates.is_empty() {
                return Err(BoardError::UnableToPlaceShip);
            }
            let ship = candidates[rng.random_range(0..candidates.len())];
            self.place_ships(&[ship])?;
            fleet.push(ship);
        }
        Ok(fleet)
    }

    fn legal_placements(&self, class: ShipClass) -> Vec<Ship> {
        let mut out = Vec::new();
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                for vertical in [false, true] {
                    let ship = Ship::new(class, Position::new(x, y), vertical);
                    if self.is_placement_legal(&ship) {
                        out.push(ship);
                    }
                }
            }
        }
        out
    }

    /// Opens `pos` and reports what was there.
    pub fn resolve_attack(&mut self, pos: Position) -> Result<AttackOutcome, BoardError> {
        if !BB::in_bounds(pos) {
            return Err(BoardError::OutOfBounds);
        }
        if self.opened.get(pos)? {
            return Ok(AttackOutcome::status(AttackStatus::AlreadyOpened));
        }
        self.opened.set(pos)?;

        let slot = match self.occupants[cell_index(pos)] {
            Some(slot) => slot as usize,
            None => return Ok(AttackOutcome::status(AttackStatus::Miss)),
        };
        self.hit_count += 1;

        if !self.opened.contains_all(&self.ship_masks[slot]) {
            return Ok(AttackOutcome::status(AttackStatus::Hit));
        }

        // Sunk: open the closed ring around it. No-touching means none of
        // these cells can hold a ship.
        let mut revealed = Vec::new();
        for cell in neighbors_of(&self.ships[slot], Footprint::Exclude)? {
            if !self.opened.get(cell)? {
                self.opened.set(cell)?;
                revealed.push(cell);
            }
        }
        let status = if self.hit_count == self.ship_cells {
            AttackStatus::FleetDestroyed
        } else {
            AttackStatus::Sunk
        };
        Ok(AttackOutcome { status, revealed })
    }

    /// Uniformly random closed cell, or `None` when the board is fully open.
    pub fn pick_random_unopened_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let closed = !self.opened;
        let count = closed.count_ones();
        if count == 0 {
            return None;
        }
        closed.positions().nth(rng.random_range(0..count))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Board {{ hits: {}/{}, ships: {} }}",
            self.hit_count,
            self.ship_cells,
            self.ships.len()
        )?;
        write!(f, "ship_map:\n{:?}opened:\n{:?}", self.ship_map, self.opened)
    }
}

#[inline]
fn cell_index(pos: Position) -> usize {
    pos.y as usize * BOARD_SIZE as usize + pos.x as usize
}
