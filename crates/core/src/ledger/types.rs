use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::EntryId;
use crate::messenger::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(VoteDirection::Up),
            "down" => Some(VoteDirection::Down),
            _ => None,
        }
    }
}

/// One member's vote on one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub member_id: UserId,
    pub entry_id: EntryId,
    pub direction: VoteDirection,
}

/// Aggregate votes for an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub up: u64,
    pub down: u64,
}

impl Tally {
    /// Partition ratings by direction.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a RatingRecord>) -> Self {
        records
            .into_iter()
            .fold(Tally::default(), |mut tally, record| {
                match record.direction {
                    VoteDirection::Up => tally.up += 1,
                    VoteDirection::Down => tally.down += 1,
                }
                tally
            })
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "👍 {} 👎 {}", self.up, self.down)
    }
}
