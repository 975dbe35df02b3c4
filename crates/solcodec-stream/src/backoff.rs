//! Reconnect delay policy for the stream connection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay between a channel failure and the next connection attempt.
///
/// ```yaml
/// reconnect: { kind: exponential, initial_ms: 500, max_ms: 30000, multiplier: 2.0 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Same delay before every attempt.
    Fixed {
        #[serde(rename = "delay_ms", with = "millis")]
        delay: Duration,
    },
    /// `initial * multiplier^(attempt-1)`, capped at `max`.
    Exponential {
        #[serde(rename = "initial_ms", with = "millis")]
        initial: Duration,
        #[serde(rename = "max_ms", with = "millis")]
        max: Duration,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
    },
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed {
            delay: Duration::from_secs(1),
        }
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        ReconnectPolicy::Fixed { delay }
    }

    pub fn exponential(initial: Duration, max: Duration) -> Self {
        ReconnectPolicy::Exponential {
            initial,
            max,
            multiplier: default_multiplier(),
        }
    }

    /// Delay before the `attempt`-th consecutive reconnect (1-based).
    /// Attempt counts reset once a connection is established.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            ReconnectPolicy::Fixed { delay } => delay,
            ReconnectPolicy::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exp = attempt.saturating_sub(1).min(63) as i32;
                let ms = initial.as_millis() as f64 * multiplier.max(1.0).powi(exp);
                let capped = ms.min(max.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
