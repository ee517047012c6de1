use rand::Rng;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::indicators::registry::SourceType;

/// Jittered pause before upstream requests.
pub struct RateLimiter {
    enabled: bool,
}

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Wait appropriate duration based on the data source
    pub async fn wait(&self, source: SourceType) {
        if !self.enabled {
            return;
        }
        sleep(Self::delay_for(source)).await;
    }

    fn delay_for(source: SourceType) -> Duration {
        let mut rng = rand::thread_rng();
        let millis = match source {
            // FRED allows 120 req/min per key; jitter keeps parallel chains apart
            SourceType::Fred => rng.gen_range(250..750),
            SourceType::Yahoo => rng.gen_range(100..300),
            // Scraped pages: minimal delay to prevent burst flood
            SourceType::Multpl | SourceType::PutCallPage => 100,
            SourceType::Calculated => 0,
        };
        Duration::from_millis(millis)
    }
}

/// Back-off window opened after an upstream answers HTTP 429.
pub struct Cooldown {
    window: Duration,
    until: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self { window, until: Mutex::new(None) }
    }

    pub async fn is_active(&self) -> bool {
        let guard = self.until.lock().await;
        matches!(*guard, Some(until) if Instant::now() < until)
    }

    pub async fn trip(&self) {
        *self.until.lock().await = Some(Instant::now() + self.window);
    }

    /// Time left in the current window, if any.
    pub async fn remaining(&self) -> Option<Duration> {
        let guard = self.until.lock().await;
        guard.and_then(|until| until.checked_duration_since(Instant::now()))
    }
}
