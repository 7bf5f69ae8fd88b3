//! Headless DMX dimmer core: a 512 channel frame buffer, a per-channel
//! effect engine and a continuously pacing Art-Net transmitter, fronted by
//! [`DmxControl`].

pub(crate) mod artnetoutput;
pub(crate) mod config;
pub(crate) mod dmxcontrol;
pub(crate) mod effects;
pub(crate) mod error;
pub(crate) mod framebuffer;
pub(crate) mod intervaltimer;
pub(crate) mod transmitter;

pub use config::Config;
pub use dmxcontrol::DmxControl;
pub use error::{DmxError, Result};
pub use framebuffer::{DMX_CHANNELS, DMX_SLOTS};
