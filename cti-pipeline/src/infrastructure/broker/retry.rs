// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Exponential backoff for broker reconnect attempts (§5): base delay 1s,
//! capped at 60s, with jitter to keep every component from hammering the
//! broker back in lockstep after an outage.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self { base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(60), jitter: 0.3 }
    }
}

/// `attempt` is 1-indexed: the delay before the first reconnect try.
pub fn calculate_delay(config: &BackoffConfig, attempt: u32) -> Duration {
    let pow = attempt.saturating_sub(1).min(16);
    let delay = config.base_delay.saturating_mul(2_u32.saturating_pow(pow));
    let capped = delay.min(config.max_delay);
    if config.jitter > 0.0 {
        apply_jitter(capped, config.jitter)
    } else {
        capped
    }
}

fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    use rand::Rng;
    let jitter_range = 2.0 * jitter;
    let mut rng = rand::rng();
    let random_value: f64 = rng.random();
    let random_factor = (1.0 - jitter + random_value * jitter_range).max(0.0);
    let millis = (delay.as_millis() as f64 * random_factor).round() as u64;
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_attempt_without_jitter() {
        let config = BackoffConfig { base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(60), jitter: 0.0 };
        assert_eq!(calculate_delay(&config, 1), Duration::from_secs(1));
        assert_eq!(calculate_delay(&config, 2), Duration::from_secs(2));
        assert_eq!(calculate_delay(&config, 3), Duration::from_secs(4));
    }

    #[test]
    fn caps_at_max_delay() {
        let config = BackoffConfig { base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(10), jitter: 0.0 };
        assert_eq!(calculate_delay(&config, 10), Duration::from_secs(10));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = BackoffConfig { base_delay: Duration::from_secs(10), max_delay: Duration::from_secs(60), jitter: 0.5 };
        for attempt in 1..5 {
            let delay = calculate_delay(&config, attempt);
            assert!(delay <= config.max_delay.mul_f64(1.5) + Duration::from_millis(1));
        }
    }
}
