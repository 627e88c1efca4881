use std::collections::VecDeque;

use crate::types::HISTORY_LEN;

/// Ventana de votación sobre las salidas del clasificador temporal.
///
/// Solo se alimenta en los frames donde el clasificador realmente se ejecutó,
/// así la ventana nunca mezcla "clase 0" con "no clasificado".
#[derive(Debug, Clone)]
pub struct GestureVotes {
    window: VecDeque<usize>,
    capacity: usize,
}

impl GestureVotes {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(HISTORY_LEN),
            capacity: HISTORY_LEN,
        }
    }

    pub fn push(&mut self, class_id: usize) {
        self.window.push_back(class_id);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    /// Id más frecuente de la ventana. En caso de empate gana el que aparece
    /// primero en la ventana actual.
    pub fn most_common(&self) -> Option<usize> {
        // (id, votos) en orden de primera aparición
        let mut counts: Vec<(usize, usize)> = Vec::new();
        for &id in &self.window {
            match counts.iter_mut().find(|(seen, _)| *seen == id) {
                Some((_, votes)) => *votes += 1,
                None => counts.push((id, 1)),
            }
        }

        let mut winner: Option<(usize, usize)> = None;
        for (id, votes) in counts {
            if winner.map_or(true, |(_, best)| votes > best) {
                winner = Some((id, votes));
            }
        }
        winner.map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.window.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

impl Default for GestureVotes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(ids: &[usize]) -> GestureVotes {
        let mut v = GestureVotes::new();
        for &id in ids {
            v.push(id);
        }
        v
    }

    #[test]
    fn empty_window_has_no_winner() {
        assert_eq!(GestureVotes::new().most_common(), None);
    }

    #[test]
    fn majority_wins() {
        assert_eq!(votes(&[1, 1, 1, 2, 2]).most_common(), Some(1));
        assert_eq!(votes(&[3, 2, 2, 0, 2]).most_common(), Some(2));
    }

    #[test]
    fn tie_goes_to_first_encountered() {
        assert_eq!(votes(&[1, 1, 2, 2]).most_common(), Some(1));
        assert_eq!(votes(&[2, 1, 1, 2]).most_common(), Some(2));
        assert_eq!(votes(&[0, 3]).most_common(), Some(0));
    }

    #[test]
    fn window_is_limited_to_16() {
        let mut v = votes(&[1; 10]);
        for _ in 0..12 {
            v.push(2);
        }
        assert_eq!(v.len(), HISTORY_LEN);
        assert_eq!(v.to_vec(), [vec![1; 4], vec![2; 12]].concat());
        assert_eq!(v.most_common(), Some(2));
    }

    #[test]
    fn evicted_votes_no_longer_count() {
        // Los primeros votos de 3 salen de la ventana
        let mut v = votes(&[3; 9]);
        for _ in 0..HISTORY_LEN {
            v.push(0);
        }
        assert_eq!(v.most_common(), Some(0));
        v.clear();
        assert!(v.is_empty());
    }
}
