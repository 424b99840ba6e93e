use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Time and randomness as seen by the coordinator.
///
/// Everything that would otherwise read the wall clock or a global RNG (room
/// ids, answer draws, round scores, round deadlines) goes through this, so a
/// test can pin both.
pub trait Environment: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Uniform integer in `0..upper`. `upper` must be non-zero.
    fn random_below(&self, upper: usize) -> usize;
}

/// Wall clock and thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn random_below(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Hand-driven clock and seeded RNG for tests and simulations.
pub struct ManualEnvironment {
    now: Mutex<DateTime<Utc>>,
    rng: Mutex<StdRng>,
}

impl ManualEnvironment {
    pub fn new(start: DateTime<Utc>, seed: u64) -> Self {
        Self {
            now: Mutex::new(start),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Starts at the current wall-clock time.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Utc::now(), seed)
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

    pub fn advance_millis(&self, millis: i64) {
        self.advance(Duration::milliseconds(millis));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = to;
    }
}

impl Environment for ManualEnvironment {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn random_below(&self, upper: usize) -> usize {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen_range(0..upper)
    }
}
