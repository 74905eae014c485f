use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Default)]
/// Produces human-like pauses between browser actions.
pub struct BehavioralEngine {}

impl BehavioralEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// Pick a duration uniformly between `min` and `max` milliseconds.
    pub fn pick_delay(&self, min: u64, max: u64) -> Duration {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        if hi == 0 {
            return Duration::ZERO;
        }
        let mut rng = OsRng;
        Duration::from_millis(rng.gen_range(lo..=hi))
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        let d = self.pick_delay(min, max);
        if !d.is_zero() {
            sleep(d).await;
        }
    }
}
