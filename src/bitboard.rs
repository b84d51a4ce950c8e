//! A fixed-size cell mask using const generics.
//!
//! A grid of `N×N` cells is packed into an unsigned integer `T`, one bit per
//! cell, indexed as `y * N + x`. The board keeps one mask for opened cells
//! and one for ship cells, so most per-cell questions are a single shift.

use core::ops::{BitAnd, BitOr, BitOrAssign, Not};
use core::{fmt, mem};
use num_traits::{PrimInt, Unsigned, Zero};

use crate::ship::Position;

/// Errors returned by bitboard operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitBoardError {
    /// Coordinate lies outside `[0..N)`.
    OutOfBounds { x: usize, y: usize },
}

impl fmt::Display for BitBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitBoardError::OutOfBounds { x, y } => {
                write!(f, "OutOfBounds: x={}, y={}", x, y)
            }
        }
    }
}

impl std::error::Error for BitBoardError {}

/// A fixed-size N×N bitboard stored in the unsigned integer `T`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitBoard<T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    bits: T,
}

impl<T, const N: usize> BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    const BOARD_BITS: usize = N * N;

    #[inline]
    fn mask() -> T {
        if Self::BOARD_BITS == mem::size_of::<T>() * 8 {
            !T::zero()
        } else {
            (T::one() << Self::BOARD_BITS) - T::one()
        }
    }

    /// Empty bitboard.
    #[inline]
    pub fn new() -> Self {
        BitBoard { bits: T::zero() }
    }

    /// Number of set cells.
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_zero()
    }

    /// Whether `pos` lies on the grid.
    #[inline]
    pub fn in_bounds(pos: Position) -> bool {
        (pos.x as usize) < N && (pos.y as usize) < N
    }

    /// Gets the bit at `pos`.
    pub fn get(&self, pos: Position) -> Result<bool, BitBoardError> {
        let idx = Self::index(pos)?;
        Ok(((self.bits >> idx) & T::one()) != T::zero())
    }

    /// Sets the bit at `pos`.
    pub fn set(&mut self, pos: Position) -> Result<(), BitBoardError> {
        let idx = Self::index(pos)?;
        self.bits = self.bits | (T::one() << idx);
        Ok(())
    }

    /// True when every cell set in `other` is also set here.
    pub fn contains_all(&self, other: &Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Builds a mask from an iterator of positions.
    pub fn from_positions<I>(iter: I) -> Result<Self, BitBoardError>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut board = Self::new();
        for pos in iter {
            board.set(pos)?;
        }
        Ok(board)
    }

    /// Iterator over set cells in row-major order.
    pub fn positions(&self) -> Positions<'_, T, N> {
        Positions { board: self, idx: 0 }
    }

    #[inline]
    fn index(pos: Position) -> Result<usize, BitBoardError> {
        if !Self::in_bounds(pos) {
            return Err(BitBoardError::OutOfBounds {
                x: pos.x as usize,
                y: pos.y as usize,
            });
        }
        Ok(pos.y as usize * N + pos.x as usize)
    }
}

impl<T, const N: usize> Default for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..N {
            for x in 0..N {
                let bit = if ((self.bits >> (y * N + x)) & T::one()) != T::zero() {
                    '■'
                } else {
                    '□'
                };
                write!(f, "{} ", bit)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Iterator over the set cells of a bitboard.
pub struct Positions<'a, T, const N: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    board: &'a BitBoard<T, N>,
    idx: usize,
}

impl<'a, T, const N: usize> Iterator for Positions<'a, T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Item = Position;

    fn next(&mut self) -> Option<Self::Item> {
        while self.idx < N * N {
            let idx = self.idx;
            self.idx += 1;
            if ((self.board.bits >> idx) & T::one()) != T::zero() {
                return Some(Position::new((idx % N) as u8, (idx / N) as u8));
            }
        }
        None
    }
}

impl<T, const N: usize> BitAnd for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        BitBoard { bits: self.bits & rhs.bits }
    }
}

impl<T, const N: usize> BitOr for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        BitBoard { bits: self.bits | rhs.bits }
    }
}

impl<T, const N: usize> BitOrAssign for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits = self.bits | rhs.bits;
    }
}

/// Inverts within board bounds.
impl<T, const N: usize> Not for BitBoard<T, N>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        BitBoard { bits: !self.bits & Self::mask() }
    }
}
