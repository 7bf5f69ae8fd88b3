use std::time::{Duration, Instant};

use crate::effects::ChannelEffect;
use crate::error::{DmxError, Result};

/// Linear ramp of one channel from a start value to a target.
///
/// Progress is recomputed from the start timestamp on every sample, so a
/// late sample lands on the value the ramp should have reached by then.
/// Values round to the nearest step with halves away from zero, which on
/// the 0..=255 range matches plain round-half-up.
pub struct Fade {
    from: u8,
    to: u8,
    started_at: Instant,
    duration: Duration,
}

impl Fade {
    pub fn new(from: u8, to: u8, duration_ms: u64, started_at: Instant) -> Result<Fade> {
        if duration_ms == 0 {
            return Err(DmxError::InvalidDuration);
        }
        Ok(Fade {
            from,
            to,
            started_at,
            duration: Duration::from_millis(duration_ms),
        })
    }
}

impl ChannelEffect for Fade {
    fn sample(&self, now: Instant) -> (u8, bool) {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed >= self.duration {
            return (self.to, true);
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let value = f64::from(self.from) + (f64::from(self.to) - f64::from(self.from)) * progress;
        (value.round() as u8, false)
    }

    fn target(&self) -> u8 {
        self.to
    }
}
