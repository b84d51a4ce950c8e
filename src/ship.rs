//! Ship definitions, grid positions and the shared neighbourhood scan.

use serde::{Deserialize, Serialize};

use crate::bitboard::BitBoard;
use crate::common::BoardError;
use crate::config::BOARD_SIZE;

pub(crate) type BB = BitBoard<u128, { BOARD_SIZE as usize }>;

/// Offsets of the 8-neighbourhood, row by row.
const NEIGHBOR_OFFSETS: [(i16, i16); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A cell on the grid, 0-indexed from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Shifts by `(dx, dy)`, returning `None` when the result leaves the grid.
    pub fn offset(self, dx: i16, dy: i16) -> Option<Position> {
        let x = self.x as i16 + dx;
        let y = self.y as i16 + dy;
        let size = BOARD_SIZE as i16;
        if (0..size).contains(&x) && (0..size).contains(&y) {
            Some(Position::new(x as u8, y as u8))
        } else {
            None
        }
    }
}

/// Size class of a ship; each class has a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipClass {
    Small,
    Medium,
    Large,
    Huge,
}

impl ShipClass {
    pub const fn length(self) -> u8 {
        match self {
            ShipClass::Small => 1,
            ShipClass::Medium => 2,
            ShipClass::Large => 3,
            ShipClass::Huge => 4,
        }
    }

    pub fn from_length(length: u8) -> Option<Self> {
        match length {
            1 => Some(ShipClass::Small),
            2 => Some(ShipClass::Medium),
            3 => Some(ShipClass::Large),
            4 => Some(ShipClass::Huge),
            _ => None,
        }
    }
}

/// A ship as sent over the wire: origin, orientation, length and class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub position: Position,
    /// `true` extends the ship along y, `false` along x.
    pub direction: bool,
    pub length: u8,
    #[serde(rename = "type")]
    pub class: ShipClass,
}

/// Whether a neighbourhood scan keeps the ship's own cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footprint {
    Include,
    Exclude,
}

impl Ship {
    pub fn new(class: ShipClass, position: Position, vertical: bool) -> Self {
        Self {
            position,
            direction: vertical,
            length: class.length(),
            class,
        }
    }

    pub fn is_vertical(&self) -> bool {
        self.direction
    }

    /// Cells covered by the ship, origin first.
    pub fn cells(&self) -> Result<Vec<Position>, BoardError> {
        if !(1..=4).contains(&self.length) {
            return Err(BoardError::InvalidLength(self.length));
        }
        (0..self.length as i16)
            .map(|i| {
                let (dx, dy) = if self.direction { (0, i) } else { (i, 0) };
                self.position.offset(dx, dy).ok_or(BoardError::OutOfBounds)
            })
            .collect()
    }

    /// Occupancy mask of the ship.
    pub fn mask(&self) -> Result<BB, BoardError> {
        Ok(BB::from_positions(self.cells()?)?)
    }
}

/// In-bounds cells touching `ship`, each listed once in scan order.
///
/// With `Footprint::Include` the ship's own cells come first; with
/// `Footprint::Exclude` they are never returned even when one ship cell
/// neighbours another.
pub fn neighbors_of(ship: &Ship, footprint: Footprint) -> Result<Vec<Position>, BoardError> {
    let cells = ship.cells()?;
    let own = BB::from_positions(cells.iter().copied())?;
    let mut seen = BB::new();
    let mut out = Vec::new();

    if footprint == Footprint::Include {
        out.extend(cells.iter().copied());
    }
    seen |= own;

    for cell in &cells {
        for (dx, dy) in NEIGHBOR_OFFSETS {
            if let Some(pos) = cell.offset(dx, dy) {
                if !seen.get(pos)? {
                    seen.set(pos)?;
                    out.push(pos);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_and_vertical_cells() {
        let h = Ship::new(ShipClass::Large, Position::new(2, 5), false);
        assert_eq!(
            h.cells().unwrap(),
            vec![Position::new(2, 5), Position::new(3, 5), Position::new(4, 5)]
        );
        let v = Ship::new(ShipClass::Medium, Position::new(9, 8), true);
        assert_eq!(v.cells().unwrap(), vec![Position::new(9, 8), Position::new(9, 9)]);
    }

    #[test]
    fn ship_off_grid_is_rejected() {
        let ship = Ship::new(ShipClass::Huge, Position::new(8, 0), false);
        assert_eq!(ship.cells(), Err(BoardError::OutOfBounds));
        let bad = Ship {
            length: 5,
            ..Ship::new(ShipClass::Huge, Position::new(0, 0), false)
        };
        assert_eq!(bad.cells(), Err(BoardError::InvalidLength(5)));
    }

    #[test]
    fn corner_neighbourhood_is_clipped() {
        let ship = Ship::new(ShipClass::Small, Position::new(0, 0), false);
        let around = neighbors_of(&ship, Footprint::Exclude).unwrap();
        assert_eq!(
            around,
            vec![Position::new(1, 0), Position::new(0, 1), Position::new(1, 1)]
        );
        let with_self = neighbors_of(&ship, Footprint::Include).unwrap();
        assert_eq!(with_self.len(), 4);
        assert_eq!(with_self[0], Position::new(0, 0));
    }

    #[test]
    fn neighbourhood_has_no_duplicates() {
        let ship = Ship::new(ShipClass::Huge, Position::new(3, 3), true);
        let around = neighbors_of(&ship, Footprint::Exclude).unwrap();
        // (4 + 2) * 3 - 4 own cells
        assert_eq!(around.len(), 14);
        let mask = BB::from_positions(around.iter().copied()).unwrap();
        assert_eq!(mask.count_ones(), around.len());
        assert!((mask & ship.mask().unwrap()).is_empty());
    }

    #[test]
    fn wire_shape() {
        let ship = Ship::new(ShipClass::Medium, Position::new(1, 2), true);
        let json = serde_json::to_value(ship).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "position": {"x": 1, "y": 2},
                "direction": true,
                "length": 2,
                "type": "medium"
            })
        );
    }
}
