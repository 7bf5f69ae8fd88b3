use thiserror::Error;

/// Result type for all dimmer core operations.
pub type Result<T> = std::result::Result<T, DmxError>;

/// Errors of the dimmer core.
#[derive(Error, Debug)]
pub enum DmxError {
    /// A caller-supplied number is outside its valid bounds. Rejected before
    /// any mutation takes place.
    #[error("{what} {value} is outside {min}..={max}")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A fade was requested with a duration of zero. Instantaneous changes
    /// go through a direct channel write instead.
    #[error("fade duration must be greater than zero")]
    InvalidDuration,

    /// The outbound Art-Net session could not be established.
    #[error("cannot open Art-Net session: {0}")]
    ConnectFailed(String),

    /// A single frame failed to transmit. Counted and logged inside the send
    /// loop, never fatal to it.
    #[error("frame transmission failed: {0}")]
    SendFailed(#[from] std::io::Error),
}
