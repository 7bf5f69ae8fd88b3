use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::artnetoutput::ArtnetOutput;
use crate::config::Config;
use crate::effects::EffectScheduler;
use crate::error::{DmxError, Result};
use crate::framebuffer::{channel_index, FrameBuffer, DMX_CHANNELS};
use crate::intervaltimer::IntervalTimer;
use crate::transmitter::Transmitter;

/// Cadence of the effect tick driver. Independent of the wire frame rate
/// and at least as fast, so fades are never under-sampled.
const TICK_RATE_HZ: u32 = 40;

/// The control surface of the dimmer core. Direct channel edits, fades and
/// the sender lifecycle all go through here; the effect scheduler and the
/// transmitter behind it share nothing but the frame buffer.
///
/// Lock order is scheduler first, then buffer, everywhere. Holding the
/// scheduler lock across cancel-then-write is what makes a direct edit win
/// against a tick running concurrently.
pub struct DmxControl {
    buffer: Arc<FrameBuffer>,
    scheduler: Arc<Mutex<EffectScheduler>>,
    transmitter: Transmitter,
    ticker: Option<Ticker>,
}

struct Ticker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl DmxControl {
    /// Brings up the whole core: Art-Net session, transmitter, effect tick
    /// driver. On failure everything already started is torn down again, so
    /// the caller can correct the configuration and retry.
    pub fn start(config: &Config) -> Result<DmxControl> {
        let buffer = Arc::new(FrameBuffer::new());
        let scheduler = Arc::new(Mutex::new(EffectScheduler::new(Arc::clone(&buffer))));

        let output = ArtnetOutput::new(&config.node_address, config.universe)?;
        let mut transmitter = Transmitter::new();
        transmitter.start(output, Arc::clone(&buffer), config.frame_rate)?;

        let running = Arc::new(AtomicBool::new(true));
        let tick_flag = Arc::clone(&running);
        let tick_scheduler = Arc::clone(&scheduler);
        let spawned = thread::Builder::new()
            .name("effects".to_string())
            .spawn(move || {
                let mut timer = IntervalTimer::new(TICK_RATE_HZ);
                while tick_flag.load(Ordering::Acquire) {
                    let changed = tick_scheduler.lock().unwrap().tick(Instant::now());
                    if changed > 0 {
                        log::trace!("Tick changed {} channel(s)", changed);
                    }
                    timer.wait();
                }
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                transmitter.stop();
                return Err(DmxError::ConnectFailed(format!(
                    "cannot spawn effects thread: {}",
                    err
                )));
            }
        };

        Ok(DmxControl {
            buffer,
            scheduler,
            transmitter,
            ticker: Some(Ticker { running, handle }),
        })
    }

    /// Writes a channel directly. A fade running on that channel is
    /// cancelled first; direct edits always win over an animation in
    /// flight.
    pub fn set_channel(&self, channel: u16, value: u8) -> Result<()> {
        let index = channel_index(channel)?;
        let mut scheduler = self.scheduler.lock().unwrap();
        scheduler.cancel(channel);
        self.buffer.set(index, value)
    }

    pub fn get_channel(&self, channel: u16) -> Result<u8> {
        self.buffer.get(channel_index(channel)?)
    }

    /// Fades `channel` from its current value to `target`. Replaces a fade
    /// already running there.
    pub fn request_fade(&self, channel: u16, target: u8, duration_ms: u64) -> Result<()> {
        let index = channel_index(channel)?;
        let mut scheduler = self.scheduler.lock().unwrap();
        let from = self.buffer.get(index)?;
        scheduler.start_fade(channel, from, target, duration_ms, Instant::now())
    }

    /// Stops the fade on `channel`; the value it last wrote stays.
    pub fn cancel_fade(&self, channel: u16) -> Result<()> {
        channel_index(channel)?;
        self.scheduler.lock().unwrap().cancel(channel);
        Ok(())
    }

    pub fn cancel_all_fades(&self) {
        self.scheduler.lock().unwrap().cancel_all();
    }

    pub fn is_active(&self, channel: u16) -> Result<bool> {
        channel_index(channel)?;
        Ok(self.scheduler.lock().unwrap().is_active(channel))
    }

    /// Takes the whole universe to zero: as a fade over `duration_ms`, or
    /// immediately when `duration_ms` is zero.
    pub fn blackout(&self, duration_ms: u64) -> Result<()> {
        let now = Instant::now();
        let mut scheduler = self.scheduler.lock().unwrap();
        for channel in 1..=DMX_CHANNELS {
            let index = usize::from(channel - 1);
            let current = self.buffer.get(index)?;
            if duration_ms == 0 {
                scheduler.cancel(channel);
                self.buffer.set(index, 0)?;
            } else if current != 0 {
                scheduler.start_fade(channel, current, 0, duration_ms, now)?;
            } else {
                // Already dark, but an upward fade may be in flight.
                scheduler.cancel(channel);
            }
        }
        Ok(())
    }

    /// Drives a set of channels to the given levels, fading over
    /// `duration_ms` or snapping when it is zero.
    pub fn apply_preset(&self, levels: &[(u16, u8)], duration_ms: u64) -> Result<()> {
        // A rejected preset must not be half applied.
        for &(channel, _) in levels {
            channel_index(channel)?;
        }

        let now = Instant::now();
        let mut scheduler = self.scheduler.lock().unwrap();
        for &(channel, level) in levels {
            let index = usize::from(channel - 1);
            if duration_ms == 0 {
                scheduler.cancel(channel);
                self.buffer.set(index, level)?;
            } else {
                let from = self.buffer.get(index)?;
                scheduler.start_fade(channel, from, level, duration_ms, now)?;
            }
        }
        Ok(())
    }

    /// Frames the transmitter could not deliver since start.
    pub fn failed_frames(&self) -> u64 {
        self.transmitter.failed_sends()
    }

    /// Orderly teardown: tick driver first so no further effect writes can
    /// land, then all fades, then the transmitter.
    pub fn shutdown(mut self) {
        self.shutdown_in_place();
    }

    fn shutdown_in_place(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.running.store(false, Ordering::Release);
            if ticker.handle.join().is_err() {
                log::error!("Effects thread panicked");
            }
        }
        if let Ok(mut scheduler) = self.scheduler.lock() {
            scheduler.cancel_all();
        }
        self.transmitter.stop();
    }
}

impl Drop for DmxControl {
    fn drop(&mut self) {
        self.shutdown_in_place();
    }
}
