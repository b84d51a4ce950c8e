mod common;

use common::standard_fleet;
use rand::{rngs::SmallRng, SeedableRng};
use seabattle::{
    AttackStatus, Board, BoardError, Position, Ship, ShipClass, BOARD_SIZE, TOTAL_SHIP_CELLS,
};

fn placed() -> Board {
    let mut board = Board::new();
    board.place_ships(&standard_fleet()).unwrap();
    board
}

#[test]
fn standard_fleet_is_legal() {
    assert!(Board::is_fleet_legal(&standard_fleet()));
    assert_eq!(placed().total_ship_cells(), TOTAL_SHIP_CELLS);
}

#[test]
fn fleet_composition_is_enforced() {
    let mut fleet = standard_fleet();
    fleet[9] = Ship::new(ShipClass::Medium, Position::new(9, 6), true);
    assert!(!Board::is_fleet_legal(&fleet));

    // Class and length must agree.
    let mut fleet = standard_fleet();
    fleet[6].length = 2;
    assert!(!Board::is_fleet_legal(&fleet));

    let mut fleet = standard_fleet();
    fleet.push(Ship::new(ShipClass::Small, Position::new(9, 9), false));
    assert!(!Board::is_fleet_legal(&fleet));
}

#[test]
fn placement_rejects_touching_and_off_grid_ships() {
    let board = placed();
    // Diagonal contact with the huge ship at (0..=3, 0).
    assert!(!board.is_placement_legal(&Ship::new(ShipClass::Small, Position::new(4, 1), false)));
    assert!(!board.is_placement_legal(&Ship::new(ShipClass::Small, Position::new(0, 1), false)));
    assert!(board.is_placement_legal(&Ship::new(ShipClass::Huge, Position::new(0, 6), false)));
    assert!(!board.is_placement_legal(&Ship::new(ShipClass::Huge, Position::new(7, 8), false)));
    assert!(!board.is_placement_legal(&Ship::new(ShipClass::Large, Position::new(9, 8), true)));
}

#[test]
fn attack_statuses() {
    let mut board = placed();
    assert_eq!(
        board.resolve_attack(Position::new(9, 9)).unwrap().status,
        AttackStatus::Miss
    );
    assert_eq!(
        board.resolve_attack(Position::new(0, 0)).unwrap().status,
        AttackStatus::Hit
    );
    assert_eq!(
        board.resolve_attack(Position::new(0, 0)).unwrap().status,
        AttackStatus::AlreadyOpened
    );
    assert_eq!(board.hit_count(), 1);
    assert_eq!(
        board.resolve_attack(Position::new(BOARD_SIZE, 0)),
        Err(BoardError::OutOfBounds)
    );
}

#[test]
fn sinking_a_corner_ship_reveals_only_in_bounds_cells() {
    let mut board = Board::new();
    board
        .place_ships(&[Ship::new(ShipClass::Small, Position::new(9, 9), false)])
        .unwrap();
    let outcome = board.resolve_attack(Position::new(9, 9)).unwrap();
    // Only ship on the board, so sinking it destroys the fleet.
    assert_eq!(outcome.status, AttackStatus::FleetDestroyed);
    let mut revealed = outcome.revealed;
    revealed.sort_by_key(|p| (p.y, p.x));
    assert_eq!(
        revealed,
        vec![Position::new(8, 8), Position::new(9, 8), Position::new(8, 9)]
    );
    assert!(board.is_destroyed());
}

#[test]
fn already_open_ring_cells_are_not_revealed_twice() {
    let mut board = placed();
    board.resolve_attack(Position::new(4, 3)).unwrap();
    let outcome = board.resolve_attack(Position::new(3, 4)).unwrap();
    assert_eq!(outcome.status, AttackStatus::Sunk);
    assert_eq!(outcome.revealed.len(), 7);
    assert!(!outcome.revealed.contains(&Position::new(4, 3)));
}

#[test]
fn random_target_is_always_closed() {
    let mut rng = SmallRng::seed_from_u64(3);
    let mut board = placed();
    let mut opened = 0;
    while let Some(pos) = board.pick_random_unopened_cell(&mut rng) {
        assert!(!board.is_opened(pos).unwrap());
        board.resolve_attack(pos).unwrap();
        opened += 1;
        assert!(opened <= 100);
    }
    assert_eq!(board.opened().count_ones(), 100);
    assert!(board.is_destroyed());
}

#[test]
fn generation_fills_an_empty_board() {
    let mut rng = SmallRng::seed_from_u64(11);
    let mut board = Board::new();
    let fleet = board.generate_fleet(&mut rng).unwrap();
    assert_eq!(board.ships(), fleet.as_slice());
    assert!(Board::is_fleet_legal(&fleet));
}
