//! Wire protocol codec: outbound command framing, inbound frame
//! classification, and ADC word decoding.
//!
//! Consider: the wire layout is part of the device's interface, fixed by the
//! vendor's "Data Acquisition Communications Protocol" document, not by us.
//! We keep the field names close to that document rather than inventing
//! our own vocabulary for them.

mod frame;
mod word;

pub use frame::{
    CommandCode, Inbound, OutboundFrame, OutboundHeader, DQADCDATA_ID, DQCOMMAND_ID, DQRESPONSE_ID,
};
pub use word::decode_word;
