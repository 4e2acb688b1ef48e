use rand::Rng;

use crate::types::{DrawMode, ParticipantId};

/// Candidates still eligible to win. Drawing swaps the picked slot with the last one
/// and pops it, so every draw is O(1).
struct Pool {
    candidates: Vec<ParticipantId>,
}

impl Pool {
    fn new<'a>(participants: impl IntoIterator<Item = &'a ParticipantId>) -> Self {
        Self {
            candidates: participants.into_iter().cloned().collect(),
        }
    }

    fn exclude(&mut self, id: &ParticipantId) {
        if let Some(idx) = self.candidates.iter().position(|c| c == id) {
            self.candidates.swap_remove(idx);
        }
    }

    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<ParticipantId> {
        if self.candidates.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.candidates.len());
        Some(self.candidates.swap_remove(idx))
    }
}

/// Draw up to `winner_count` distinct winners.
///
/// In fake mode the predetermined winner always comes first, whether or not they joined;
/// the remaining slots are drawn from the other participants. Fake mode without a
/// predetermined winner draws like real mode.
pub fn select_winners<'a, R: Rng + ?Sized>(
    participants: impl IntoIterator<Item = &'a ParticipantId>,
    winner_count: u32,
    mode: DrawMode,
    fake_winner_id: Option<&ParticipantId>,
    rng: &mut R,
) -> Vec<ParticipantId> {
    let target = winner_count as usize;
    let mut winners = Vec::with_capacity(target);
    if target == 0 {
        return winners;
    }

    let mut pool = Pool::new(participants);
    if let (DrawMode::Fake, Some(fake)) = (mode, fake_winner_id) {
        pool.exclude(fake);
        winners.push(fake.clone());
    }

    while winners.len() < target {
        match pool.draw(rng) {
            Some(id) => winners.push(id),
            None => break,
        }
    }
    winners
}
