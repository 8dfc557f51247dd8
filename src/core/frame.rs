//! 8x8 sensor frames and their hex encoding.
//!
//! The VL53L8CH firmware prints each 64-zone buffer as 128 uppercase hex
//! characters, one byte per zone, row-major. This module decodes such a token
//! into a [`Grid8x8`] and re-encodes grids in the same format.

use std::fmt::Write as FmtWrite;

use thiserror::Error;

/// Number of rows and columns in a sensor frame.
pub const GRID_SIZE: usize = 8;

/// Number of zones (cells) in a sensor frame.
pub const ZONE_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Length of a hex-encoded frame token (two characters per zone).
pub const HEX_FRAME_LEN: usize = ZONE_COUNT * 2;

/// Target status codes reported for a trustworthy range reading.
pub const VALID_STATUS_CODES: [u8; 2] = [5, 9];

/// A hex token that could not be decoded into a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedFrame {
    #[error("expected {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("non-hex character {found:?} at offset {offset}")]
    NonHex { offset: usize, found: char },
}

/// Result type for frame decoding.
pub type Result<T> = std::result::Result<T, MalformedFrame>;

/// Returns true if a target status code marks a valid detection.
#[inline]
pub fn is_valid_status(code: u8) -> bool {
    VALID_STATUS_CODES.contains(&code)
}

/// An 8x8 grid of raw sensor bytes, row-major.
///
/// The same representation holds distance frames and target status frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grid8x8 {
    cells: [[u8; GRID_SIZE]; GRID_SIZE],
}

impl Grid8x8 {
    /// Creates a grid with every cell set to zero.
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Creates a grid with every cell set to `value`.
    pub fn filled(value: u8) -> Self {
        Self {
            cells: [[value; GRID_SIZE]; GRID_SIZE],
        }
    }

    /// Creates a grid from explicit rows.
    pub fn from_rows(cells: [[u8; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { cells }
    }

    /// Builds a grid from 64 bytes; byte `k` lands at row `k / 8`, column `k % 8`.
    pub fn from_bytes(bytes: &[u8; ZONE_COUNT]) -> Self {
        let mut cells = [[0u8; GRID_SIZE]; GRID_SIZE];
        for (k, &byte) in bytes.iter().enumerate() {
            cells[k / GRID_SIZE][k % GRID_SIZE] = byte;
        }
        Self { cells }
    }

    /// Value at (`row`, `col`).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    /// Rows of the grid.
    #[inline]
    pub fn rows(&self) -> &[[u8; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }

    /// Iterates cells in row-major order (zone id order).
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.cells.iter().flat_map(|row| row.iter().copied())
    }

    /// Returns true if every cell is zero (the unknown-status sentinel).
    pub fn is_all_zero(&self) -> bool {
        self.iter().all(|v| v == 0)
    }

    /// Number of cells holding a valid target status code.
    pub fn valid_count(&self) -> usize {
        self.iter().filter(|&v| is_valid_status(v)).count()
    }

    /// Encodes the grid as 128 uppercase hex characters, as the firmware prints it.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(HEX_FRAME_LEN);
        for byte in self.iter() {
            // Writing into a String cannot fail.
            let _ = write!(out, "{:02X}", byte);
        }
        out
    }
}

/// Decode a 128-character hex token into an 8x8 grid.
///
/// Hex digits are accepted in either case.
///
/// # Errors
///
/// Returns [`MalformedFrame::Length`] if the token is not exactly 128
/// characters long and [`MalformedFrame::NonHex`] if any character is not a
/// hex digit. No partial grid is produced on failure.
pub fn decode_hex_frame(hex: &str) -> Result<Grid8x8> {
    let actual = hex.chars().count();
    if actual != HEX_FRAME_LEN {
        return Err(MalformedFrame::Length {
            expected: HEX_FRAME_LEN,
            actual,
        });
    }

    let mut digits = [0u8; HEX_FRAME_LEN];
    for (offset, (slot, ch)) in digits.iter_mut().zip(hex.chars()).enumerate() {
        *slot = ch
            .to_digit(16)
            .map(|v| v as u8)
            .ok_or(MalformedFrame::NonHex { offset, found: ch })?;
    }

    let mut bytes = [0u8; ZONE_COUNT];
    for (byte, pair) in bytes.iter_mut().zip(digits.chunks_exact(2)) {
        *byte = (pair[0] << 4) | pair[1];
    }

    Ok(Grid8x8::from_bytes(&bytes))
}
