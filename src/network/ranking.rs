//! Ranking Table
//!
//! Win / played counters per (group, size) bracket.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

/// One player's record in a bracket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRow {
    pub nick: String,
    pub wins: u32,
    pub games_played: u32,
}

/// Persisted form of one bracket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingBucket {
    pub group: u32,
    pub size: usize,
    pub rows: Vec<RankingRow>,
}

/// All brackets.
#[derive(Clone, Debug, Default)]
pub struct RankingTable {
    buckets: BTreeMap<(u32, usize), BTreeMap<String, RankingRow>>,
}

impl RankingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted buckets.
    pub fn from_buckets(buckets: Vec<RankingBucket>) -> Self {
        let mut table = Self::new();
        for bucket in buckets {
            let rows = table.buckets.entry((bucket.group, bucket.size)).or_default();
            for row in bucket.rows {
                rows.insert(row.nick.clone(), row);
            }
        }
        table
    }

    /// Persisted form.
    pub fn to_buckets(&self) -> Vec<RankingBucket> {
        self.buckets
            .iter()
            .map(|((group, size), rows)| RankingBucket {
                group: *group,
                size: *size,
                rows: rows.values().cloned().collect(),
            })
            .collect()
    }

    /// Record a decided match.
    pub fn record(&mut self, group: u32, size: usize, winner: &str, loser: &str) {
        let rows = self.buckets.entry((group, size)).or_default();
        for nick in [winner, loser] {
            let row = rows.entry(nick.to_string()).or_insert_with(|| RankingRow {
                nick: nick.to_string(),
                wins: 0,
                games_played: 0,
            });
            row.games_played += 1;
            if nick == winner {
                row.wins += 1;
            }
        }
    }

    /// Best `limit` rows: most wins, then fewest games, then nick.
    pub fn top(&self, group: u32, size: usize, limit: usize) -> Vec<RankingRow> {
        let Some(rows) = self.buckets.get(&(group, size)) else {
            return Vec::new();
        };
        let mut rows: Vec<RankingRow> = rows.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(a.games_played.cmp(&b.games_played))
                .then_with(|| a.nick.cmp(&b.nick))
        });
        rows.truncate(limit);
        rows
    }
}
