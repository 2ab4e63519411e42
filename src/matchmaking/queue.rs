//! Matchmaking queue implementation

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Player in the matchmaking queue
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub user_id: Uuid,
    pub display_name: String,
    pub queued_at: Instant,
}

impl QueuedPlayer {
    pub fn new(user_id: Uuid, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            queued_at: Instant::now(),
        }
    }

    /// How long this player has been waiting
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

/// FIFO queue pairing players into duels. A duel needs exactly two
/// fighters, so pairing never starts early or oversubscribes.
pub struct DuelQueue {
    queue: VecDeque<QueuedPlayer>,
}

impl DuelQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Add a player to the queue
    pub fn enqueue(&mut self, player: QueuedPlayer) {
        // Remove if already in queue (rejoin)
        self.queue.retain(|p| p.user_id != player.user_id);
        self.queue.push_back(player);
    }

    /// Remove a player from the queue
    pub fn dequeue(&mut self, user_id: Uuid) -> Option<QueuedPlayer> {
        if let Some(pos) = self.queue.iter().position(|p| p.user_id == user_id) {
            self.queue.remove(pos)
        } else {
            None
        }
    }

    /// Check if a player is in the queue
    pub fn contains(&self, user_id: &Uuid) -> bool {
        self.queue.iter().any(|p| &p.user_id == user_id)
    }

    /// Get queue length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take the two longest-waiting players that are still connected.
    /// Returns None without touching the queue if fewer than two
    /// connected players are waiting.
    pub fn take_connected_pair(
        &mut self,
        connected: &HashSet<Uuid>,
    ) -> Option<(QueuedPlayer, QueuedPlayer)> {
        let indices: Vec<usize> = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, p)| connected.contains(&p.user_id))
            .map(|(i, _)| i)
            .take(2)
            .collect();

        if let [first, second] = indices[..] {
            // Remove the later index first so the earlier stays valid
            let b = self.queue.remove(second)?;
            let a = self.queue.remove(first)?;
            Some((a, b))
        } else {
            None
        }
    }
}

impl Default for DuelQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> QueuedPlayer {
        QueuedPlayer::new(Uuid::new_v4(), name.to_string())
    }

    #[test]
    fn rejoin_moves_a_player_to_the_back() {
        let mut queue = DuelQueue::new();
        let a = player("a");
        let b = player("b");
        queue.enqueue(a.clone());
        queue.enqueue(b.clone());
        queue.enqueue(QueuedPlayer::new(a.user_id, "a2".to_string()));

        assert_eq!(queue.len(), 2);
        let connected: HashSet<Uuid> = [a.user_id, b.user_id].into_iter().collect();
        let (first, second) = queue.take_connected_pair(&connected).unwrap();
        assert_eq!(first.user_id, b.user_id);
        assert_eq!(second.user_id, a.user_id);
    }

    #[test]
    fn pairing_skips_disconnected_players() {
        let mut queue = DuelQueue::new();
        let gone = player("gone");
        let a = player("a");
        let b = player("b");
        queue.enqueue(gone.clone());
        queue.enqueue(a.clone());
        queue.enqueue(b.clone());

        let connected: HashSet<Uuid> = [a.user_id, b.user_id].into_iter().collect();
        let (first, second) = queue.take_connected_pair(&connected).unwrap();
        assert_eq!(first.user_id, a.user_id);
        assert_eq!(second.user_id, b.user_id);
        // the disconnected player stays queued
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(&gone.user_id));
    }

    #[test]
    fn a_single_waiter_is_never_paired() {
        let mut queue = DuelQueue::new();
        let a = player("a");
        queue.enqueue(a.clone());

        let connected: HashSet<Uuid> = [a.user_id].into_iter().collect();
        assert!(queue.take_connected_pair(&connected).is_none());
        assert_eq!(queue.len(), 1);
    }
}
