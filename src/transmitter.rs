use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::artnetoutput::ArtnetOutput;
use crate::error::{DmxError, Result};
use crate::framebuffer::FrameBuffer;
use crate::intervaltimer::IntervalTimer;

/// Art-Net caps the refresh rate of a full 512 slot universe at 44 frames
/// per second.
pub const MAX_FRAME_RATE: u32 = 44;

/// Continuously ships the frame buffer to the lighting node from its own
/// thread. A dropped frame is logged and counted but never stops the loop;
/// losing one frame beats stalling the bus.
pub struct Transmitter {
    worker: Option<Worker>,
    failed_sends: Arc<AtomicU64>,
}

struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Transmitter {
    pub fn new() -> Transmitter {
        Transmitter {
            worker: None,
            failed_sends: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Begins the periodic send loop. Fails before any thread exists, so a
    /// failed start leaves nothing running.
    pub fn start(
        &mut self,
        mut output: ArtnetOutput,
        buffer: Arc<FrameBuffer>,
        frame_rate: u32,
    ) -> Result<()> {
        if frame_rate < 1 || frame_rate > MAX_FRAME_RATE {
            return Err(DmxError::OutOfRange {
                what: "frame rate",
                value: i64::from(frame_rate),
                min: 1,
                max: i64::from(MAX_FRAME_RATE),
            });
        }
        if self.worker.is_some() {
            return Err(DmxError::ConnectFailed(
                "transmitter is already running".to_string(),
            ));
        }

        let running = Arc::new(AtomicBool::new(true));
        let loop_flag = Arc::clone(&running);
        let failures = Arc::clone(&self.failed_sends);

        let handle = thread::Builder::new()
            .name("transmitter".to_string())
            .spawn(move || {
                let mut timer = IntervalTimer::new(frame_rate);
                while loop_flag.load(Ordering::Acquire) {
                    let frame = buffer.snapshot();
                    if let Err(err) = output.send_frame(&frame) {
                        failures.fetch_add(1, Ordering::Relaxed);
                        log::warn!("Dropped a frame: {}", err);
                    }
                    timer.wait();
                }
            })
            .map_err(|err| {
                DmxError::ConnectFailed(format!("cannot spawn transmitter thread: {}", err))
            })?;

        log::info!("Transmitter running at {} fps", frame_rate);
        self.worker = Some(Worker { running, handle });
        Ok(())
    }

    /// Signals the loop to end and waits for the in-flight send to finish.
    /// Bounded by one frame interval plus the socket send timeout. Safe to
    /// call repeatedly or when the transmitter never started.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.running.store(false, Ordering::Release);
            if worker.handle.join().is_err() {
                log::error!("Transmitter thread panicked");
            }
            log::info!(
                "Transmitter stopped, {} failed send(s) total",
                self.failed_sends.load(Ordering::Relaxed)
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Frames that could not be delivered since start. Diagnostics only.
    pub fn failed_sends(&self) -> u64 {
        self.failed_sends.load(Ordering::Relaxed)
    }
}
