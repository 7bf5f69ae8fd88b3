use std::thread;
use std::time::{Duration, Instant};

/// Paces a loop at a fixed rate. The next deadline is always the previous
/// deadline plus one interval, so jitter in the loop body does not
/// accumulate into drift.
pub struct IntervalTimer {
    interval: Duration,
    deadline: Instant,
}

impl IntervalTimer {
    pub fn new(freq_hz: u32) -> IntervalTimer {
        let interval = Duration::from_secs_f64(1.0 / f64::from(freq_hz.max(1)));
        IntervalTimer {
            interval,
            deadline: Instant::now() + interval,
        }
    }

    /// Sleeps until the next deadline. A loop body that overran by less than
    /// one interval is caught up on the following iterations; one that fell
    /// a whole interval or more behind resynchronizes from now instead of
    /// bursting through the missed frames.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if now < self.deadline {
            thread::sleep(self.deadline - now);
            self.deadline += self.interval;
            return;
        }

        let behind = now - self.deadline;
        if behind >= self.interval {
            let skipped = behind.as_micros() / self.interval.as_micros().max(1) + 1;
            log::warn!("Skipped {} frame(s), resynchronizing", skipped);
            self.deadline = now + self.interval;
        } else {
            self.deadline += self.interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paces_at_requested_rate() {
        let mut timer = IntervalTimer::new(100);
        let start = Instant::now();
        for _ in 0..5 {
            timer.wait();
        }
        let elapsed = start.elapsed();
        // 5 ticks at 100 Hz are 50 ms; leave headroom for a slow machine.
        assert!(elapsed >= Duration::from_millis(40), "ran too fast: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(250), "ran too slow: {:?}", elapsed);
    }

    #[test]
    fn resynchronizes_after_long_stall() {
        let mut timer = IntervalTimer::new(100);
        thread::sleep(Duration::from_millis(60));

        // The stall covered several intervals; the timer must not burn them
        // down as zero-length sleeps.
        let start = Instant::now();
        timer.wait();
        timer.wait();
        assert!(start.elapsed() >= Duration::from_millis(8));
    }
}
