use std::time::Duration;

/// Linear reconnect backoff: attempt `n` waits `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay unit multiplied by the attempt number.
    pub base_delay: Duration,
    /// Attempts allowed before giving up until the next successful open
    /// or an explicit reconnect.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(2000),
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_linearly() {
        let cfg = ReconnectConfig::default();
        let delays: Vec<u64> = (1..=5)
            .map(|n| u64::try_from(cfg.delay_for(n).as_millis()).unwrap_or(u64::MAX))
            .collect();
        assert_eq!(delays, vec![2000, 4000, 6000, 8000, 10_000]);
    }
}
