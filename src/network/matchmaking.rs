//! Matchmaking Queue
//!
//! Waiting sessions keyed by (group, size, first-to-move preference),
//! oldest first. Stale entries are purged lazily by the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Deserialize};

use crate::game::state::FirstPlayer;

/// One waiting session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Creator of the waiting session.
    pub nick: String,
    pub group: u32,
    pub size: usize,
    pub first_preference: FirstPlayer,
    pub session_id: String,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Whether a joiner with these parameters pairs with this entry.
    pub fn compatible(&self, group: u32, size: usize, first: FirstPlayer) -> bool {
        self.group == group && self.size == size && self.first_preference == first
    }
}

/// FIFO of waiting sessions.
#[derive(Clone, Debug)]
pub struct MatchmakingQueue {
    entries: Vec<QueueEntry>,
    ttl: Duration,
}

impl MatchmakingQueue {
    /// Empty queue with a stale threshold.
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Vec::new(), ttl }
    }

    /// Queue restored from a snapshot.
    pub fn with_entries(ttl: Duration, mut entries: Vec<QueueEntry>) -> Self {
        entries.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));
        Self { entries, ttl }
    }

    /// Waiting entries, oldest first.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries older than the threshold and return them.
    pub fn purge_stale(&mut self, now: DateTime<Utc>) -> Vec<QueueEntry> {
        let ttl = self.ttl;
        let (stale, fresh): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|e| now - e.enqueued_at > ttl);
        self.entries = fresh;
        stale
    }

    /// Remove every entry created by `nick`.
    pub fn cancel_for(&mut self, nick: &str) -> Vec<QueueEntry> {
        let (mine, rest): (Vec<_>, Vec<_>) = self.entries.drain(..).partition(|e| e.nick == nick);
        self.entries = rest;
        mine
    }

    /// Remove the entry of a session, if queued.
    pub fn remove_session(&mut self, session_id: &str) -> Option<QueueEntry> {
        let pos = self.entries.iter().position(|e| e.session_id == session_id)?;
        Some(self.entries.remove(pos))
    }

    /// Take the oldest compatible entry not created by `nick`.
    pub fn take_compatible(
        &mut self,
        group: u32,
        size: usize,
        first: FirstPlayer,
        nick: &str,
    ) -> Option<QueueEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.nick != nick && e.compatible(group, size, first))?;
        Some(self.entries.remove(pos))
    }

    /// Append a new waiting session.
    pub fn enqueue(&mut self, entry: QueueEntry) {
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn entry(nick: &str, group: u32, size: usize, first: FirstPlayer, at: i64) -> QueueEntry {
        QueueEntry {
            nick: nick.into(),
            group,
            size,
            first_preference: first,
            session_id: format!("s-{}", nick),
            enqueued_at: t(at),
        }
    }

    #[test]
    fn test_take_compatible_matches_all_three_keys() {
        let mut q = MatchmakingQueue::new(Duration::minutes(2));
        q.enqueue(entry("ana", 1, 9, FirstPlayer::Blue, 0));
        q.enqueue(entry("eva", 1, 9, FirstPlayer::Red, 1));

        assert!(q.take_compatible(2, 9, FirstPlayer::Blue, "rui").is_none());
        assert!(q.take_compatible(1, 7, FirstPlayer::Blue, "rui").is_none());
        let got = q.take_compatible(1, 9, FirstPlayer::Red, "rui").unwrap();
        assert_eq!(got.nick, "eva");
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_never_pairs_with_self() {
        let mut q = MatchmakingQueue::new(Duration::minutes(2));
        q.enqueue(entry("ana", 1, 9, FirstPlayer::Blue, 0));
        assert!(q.take_compatible(1, 9, FirstPlayer::Blue, "ana").is_none());
    }

    #[test]
    fn test_oldest_first() {
        let mut q = MatchmakingQueue::new(Duration::minutes(2));
        q.enqueue(entry("ana", 1, 9, FirstPlayer::Blue, 0));
        q.enqueue(entry("eva", 1, 9, FirstPlayer::Blue, 5));
        assert_eq!(q.take_compatible(1, 9, FirstPlayer::Blue, "rui").unwrap().nick, "ana");
    }

    #[test]
    fn test_purge_stale() {
        let mut q = MatchmakingQueue::new(Duration::minutes(2));
        q.enqueue(entry("ana", 1, 9, FirstPlayer::Blue, 0));
        q.enqueue(entry("eva", 1, 9, FirstPlayer::Blue, 100));

        let stale = q.purge_stale(t(150));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].nick, "ana");
        assert_eq!(q.entries()[0].nick, "eva");
    }

    #[test]
    fn test_cancel_and_remove() {
        let mut q = MatchmakingQueue::new(Duration::minutes(2));
        q.enqueue(entry("ana", 1, 9, FirstPlayer::Blue, 0));
        q.enqueue(entry("eva", 1, 5, FirstPlayer::Blue, 1));

        assert_eq!(q.cancel_for("ana").len(), 1);
        assert!(q.remove_session("s-ana").is_none());
        assert!(q.remove_session("s-eva").is_some());
        assert!(q.is_empty());
    }
}
