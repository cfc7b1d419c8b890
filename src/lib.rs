//! Host-side acquisition core for the DI-4108-E class of network-attached
//! data loggers: wire codec, session control state machine, and channel
//! demultiplexer.

pub mod codec;
pub mod config;
pub mod control;
pub mod demux;
pub mod device_state;
pub mod error;
pub mod rate;
pub mod scanlist;
pub mod session;
pub mod supervisor;
pub mod transport;

pub use error::{Error, Result};
pub use session::Session;
