//! Puzzle identity: the composite `(date, grid_size)` key.
//!
//! Every daily puzzle instance is addressed by a single string token,
//! `"{YYYY-MM-DD}-{N}x{N}"`, which doubles as the local-store key and
//! the server-side `puzzle_id`.

use crate::error::{Result, SyncError};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Square grid dimension, rendered `"5x5"` on the wire and in keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridSize(pub u8);

/// The grid sizes published each day.
pub const GRID_SIZES: [GridSize; 4] = [GridSize(4), GridSize(5), GridSize(6), GridSize(7)];

/// Days in an active week.
pub const WEEK_DAYS: u8 = 7;

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.0, self.0)
    }
}

impl FromStr for GridSize {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| SyncError::InvalidGridSize(s.to_string()))?;
        let w: u8 = w
            .parse()
            .map_err(|_| SyncError::InvalidGridSize(s.to_string()))?;
        let h: u8 = h
            .parse()
            .map_err(|_| SyncError::InvalidGridSize(s.to_string()))?;
        if w != h || w == 0 {
            return Err(SyncError::InvalidGridSize(s.to_string()));
        }
        Ok(GridSize(w))
    }
}

impl Serialize for GridSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GridSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Composite identifier naming one daily puzzle instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PuzzleKey {
    pub date: NaiveDate,
    pub grid_size: GridSize,
}

impl PuzzleKey {
    pub fn new(date: NaiveDate, grid_size: GridSize) -> Self {
        Self { date, grid_size }
    }
}

impl fmt::Display for PuzzleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.date.format("%Y-%m-%d"), self.grid_size)
    }
}

impl FromStr for PuzzleKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        // The date itself contains '-', so split off the size from the right.
        let (date_str, size_str) = s
            .rsplit_once('-')
            .ok_or_else(|| SyncError::InvalidKey(s.to_string()))?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| SyncError::InvalidKey(s.to_string()))?;
        let grid_size = size_str
            .parse()
            .map_err(|_| SyncError::InvalidKey(s.to_string()))?;
        Ok(Self { date, grid_size })
    }
}

impl Serialize for PuzzleKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PuzzleKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Enumerate every puzzle key for the week starting at `week_start`.
///
/// The cross product of 7 days and the published grid sizes, 28 keys,
/// ordered by date then size. This is the full set a bulk sync covers.
pub fn week_keys(week_start: NaiveDate) -> Vec<PuzzleKey> {
    let mut keys = Vec::with_capacity(WEEK_DAYS as usize * GRID_SIZES.len());
    for day in 0..WEEK_DAYS {
        let date = week_start + chrono::Days::new(day as u64);
        for size in GRID_SIZES {
            keys.push(PuzzleKey::new(date, size));
        }
    }
    keys
}
