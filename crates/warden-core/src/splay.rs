//! Startup splay
//!
//! Many agents kicking off on the same schedule would stampede whatever
//! they pull configuration from. A randomized delay before the first run
//! desynchronizes them. The delay is applied once per agent; later runs of
//! the same agent do not splay again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rand::Rng;

/// Applies the configured startup splay delay
#[derive(Debug)]
pub struct Splayer {
    limit: Duration,
    splayed: AtomicBool,
}

impl Splayer {
    /// Create a splayer with the given upper bound. A zero limit disables
    /// splaying entirely.
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            splayed: AtomicBool::new(false),
        }
    }

    /// Sleep a random delay up to the limit, once per agent
    pub fn splay(&self) {
        if self.limit.is_zero() {
            return;
        }
        if self.splayed.swap(true, Ordering::SeqCst) {
            return;
        }

        let delay = rand::thread_rng().gen_range(Duration::ZERO..=self.limit);
        tracing::info!("sleeping for {}s (splay is enabled)", delay.as_secs());
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_zero_limit_never_sleeps() {
        let splayer = Splayer::new(Duration::ZERO);
        let started = Instant::now();
        splayer.splay();
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_delay_stays_within_limit() {
        let splayer = Splayer::new(Duration::from_millis(100));
        let started = Instant::now();
        splayer.splay();
        assert!(started.elapsed() <= Duration::from_millis(500));
    }

    #[test]
    fn test_splays_only_once() {
        let splayer = Splayer::new(Duration::from_millis(100));
        splayer.splay();

        let started = Instant::now();
        splayer.splay();
        assert!(
            started.elapsed() < Duration::from_millis(50),
            "second run must not splay again"
        );
    }
}
