use std::io;

/// All errors the acquisition core can surface to a caller.
///
/// Kinds mirror the error-handling design: transport failures are non-fatal
/// in the streaming path and only ever logged there; [`Error::Config`] and
/// [`Error::StateRegression`] are the two kinds that cause a packet or a
/// configuration call to be rejected outright.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A socket operation failed. Fatal during bind, non-fatal (logged and
    /// retried) once streaming.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// A command was sent and no `Response` echo arrived within the
    /// configured timeout.
    #[error("timed out waiting for a response to {command}")]
    Timeout { command: &'static str },

    /// An inbound frame was too short for its variant, or carried an id this
    /// codec does not recognize.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    /// The device reported a `cumulative_count` behind what the host has
    /// already tracked. The protocol does not define rewinding, so the
    /// packet carrying this is dropped.
    #[error(
        "device {device_order} reported cumulative_count {reported}, behind tracked {tracked}"
    )]
    StateRegression {
        device_order: u32,
        tracked: u64,
        reported: u64,
    },

    /// A configuration value was rejected before any command was sent:
    /// an out-of-range rate/dec/deca, an empty or over-long scan list, a
    /// scan list not starting at channel 1, or an unknown range tag.
    #[error("configuration error: {0}")]
    Config(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
