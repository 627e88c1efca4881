use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frames por segundo como media móvil de los últimos intervalos entre frames
pub struct FpsCounter {
    intervals: VecDeque<Duration>,
    capacity: usize,
    last: Option<Instant>,
}

impl FpsCounter {
    pub const DEFAULT_WINDOW: usize = 10;

    pub fn new(capacity: usize) -> Self {
        Self {
            intervals: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            last: None,
        }
    }

    /// Marca un frame ahora y devuelve los FPS actuales
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        if let Some(prev) = self.last {
            if self.intervals.len() == self.capacity {
                self.intervals.pop_front();
            }
            self.intervals.push_back(now.saturating_duration_since(prev));
        }
        self.last = Some(now);
        self.fps()
    }

    pub fn fps(&self) -> f32 {
        if self.intervals.is_empty() {
            return 0.0;
        }
        let total: Duration = self.intervals.iter().sum();
        let mean = total.as_secs_f32() / self.intervals.len() as f32;
        if mean <= 0.0 {
            0.0
        } else {
            (1.0 / mean * 100.0).round() / 100.0
        }
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_no_rate() {
        let mut fps = FpsCounter::default();
        assert_eq!(fps.tick_at(Instant::now()), 0.0);
    }

    #[test]
    fn steady_interval_gives_rate() {
        let mut fps = FpsCounter::default();
        let start = Instant::now();
        for i in 0..5 {
            fps.tick_at(start + Duration::from_millis(40 * i));
        }
        assert_eq!(fps.fps(), 25.0);
    }

    #[test]
    fn only_last_intervals_count() {
        let mut fps = FpsCounter::new(2);
        let start = Instant::now();
        fps.tick_at(start);
        fps.tick_at(start + Duration::from_millis(500));
        fps.tick_at(start + Duration::from_millis(600));
        fps.tick_at(start + Duration::from_millis(700));
        assert_eq!(fps.fps(), 10.0);
    }
}
