pub(crate) mod fade;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::framebuffer::{channel_index, FrameBuffer};
use self::fade::Fade;

/// One animation bound to a single channel.
///
/// Effects are pure functions of wall time, so the scheduler can sample
/// them at whatever cadence it actually gets scheduled at.
pub trait ChannelEffect: Send {
    /// Value the channel should show at `now`, and whether the effect has
    /// run to completion.
    fn sample(&self, now: Instant) -> (u8, bool);

    /// Value the channel is pinned to when the effect completes.
    fn target(&self) -> u8;
}

/// Owns at most one active effect per channel and applies them to the frame
/// buffer on every tick. A channel with no entry here is static.
pub struct EffectScheduler {
    buffer: Arc<FrameBuffer>,
    jobs: HashMap<u16, Box<dyn ChannelEffect>>,
}

impl EffectScheduler {
    pub fn new(buffer: Arc<FrameBuffer>) -> EffectScheduler {
        EffectScheduler {
            buffer,
            jobs: HashMap::new(),
        }
    }

    /// Replaces whatever ran on `channel` with `effect`. Nothing is written
    /// until the next tick.
    pub fn start(&mut self, channel: u16, effect: Box<dyn ChannelEffect>) -> Result<()> {
        channel_index(channel)?;
        self.jobs.insert(channel, effect);
        Ok(())
    }

    pub fn start_fade(
        &mut self,
        channel: u16,
        from: u8,
        to: u8,
        duration_ms: u64,
        now: Instant,
    ) -> Result<()> {
        channel_index(channel)?;
        let fade = Fade::new(from, to, duration_ms, now)?;
        self.start(channel, Box::new(fade))
    }

    /// Removes the effect on `channel` if there is one; the last value it
    /// wrote stays in the buffer. Calling this on a static channel is fine.
    pub fn cancel(&mut self, channel: u16) {
        self.jobs.remove(&channel);
    }

    pub fn cancel_all(&mut self) {
        self.jobs.clear();
    }

    pub fn is_active(&self, channel: u16) -> bool {
        self.jobs.contains_key(&channel)
    }

    /// Advances every active effect to `now` and returns how many channels
    /// changed. A completed effect is pinned to its exact target, removed,
    /// and always counted as changed.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut changed = 0;
        let mut finished = Vec::new();

        for (&channel, effect) in &self.jobs {
            let index = usize::from(channel - 1);
            let (value, done) = effect.sample(now);
            if done {
                if self.buffer.replace(index, effect.target()).is_ok() {
                    changed += 1;
                }
                finished.push(channel);
            } else if let Ok(previous) = self.buffer.replace(index, value) {
                if previous != value {
                    changed += 1;
                }
            }
        }

        for channel in finished {
            self.jobs.remove(&channel);
        }

        changed
    }
}
