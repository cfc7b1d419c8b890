/// Tag of every outbound command frame.
pub const DQCOMMAND_ID: u32 = 0x31415926;
/// Tag of an inbound ASCII response frame.
pub const DQRESPONSE_ID: u32 = 0x21712818;
/// Tag of an inbound ADC stream frame.
pub const DQADCDATA_ID: u32 = 0x14142135;

const OUTBOUND_HEADER_LEN: usize = 24;

/// Command codes used by this core. The full device enum has more entries
/// (sync group commands, USB drive commands, ...); only those this core
/// emits are named here.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCode {
    SyncStart = 1,
    SyncStop = 6,
    Connect = 10,
    Disconnect = 11,
    KeepAlive = 12,
    SecondCommand = 13,
}

impl CommandCode {
    /// Human-readable name, used only in [`crate::Error::Timeout`].
    pub const fn name(self) -> &'static str {
        match self {
            CommandCode::SyncStart => "SYNCSTART",
            CommandCode::SyncStop => "SYNCSTOP",
            CommandCode::Connect => "CONNECT",
            CommandCode::Disconnect => "DISCONNECT",
            CommandCode::KeepAlive => "KEEPALIVE",
            CommandCode::SecondCommand => "SECONDCOMMAND",
        }
    }

    fn try_from_u32(v: u32) -> Option<Self> {
        Some(match v {
            1 => CommandCode::SyncStart,
            6 => CommandCode::SyncStop,
            10 => CommandCode::Connect,
            11 => CommandCode::Disconnect,
            12 => CommandCode::KeepAlive,
            13 => CommandCode::SecondCommand,
            _ => return None,
        })
    }
}

/// An outbound command frame: 24 bytes of little-endian header followed by
/// an ASCII payload (for sub-commands, terminated by `\r`; the terminator
/// is part of `payload` and is not added implicitly).
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub group_key: u32,
    pub command: CommandCode,
    pub par1: u32,
    pub par2: u32,
    pub par3: u32,
    pub payload: String,
}

/// The header fields of a frame produced by [`OutboundFrame::decode_header`],
/// used to check a round trip through [`OutboundFrame::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundHeader {
    pub group_key: u32,
    pub command: CommandCode,
    pub par1: u32,
    pub par2: u32,
    pub par3: u32,
}

impl OutboundFrame {
    /// Encode into the wire format: six little-endian `u32` fields, then the
    /// payload bytes with no length prefix.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(OUTBOUND_HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&DQCOMMAND_ID.to_le_bytes());
        buf.extend_from_slice(&self.group_key.to_le_bytes());
        buf.extend_from_slice(&(self.command as u32).to_le_bytes());
        buf.extend_from_slice(&self.par1.to_le_bytes());
        buf.extend_from_slice(&self.par2.to_le_bytes());
        buf.extend_from_slice(&self.par3.to_le_bytes());
        buf.extend_from_slice(self.payload.as_bytes());
        buf
    }

    /// Decode just the 24-byte header of a buffer produced by [`Self::encode`].
    ///
    /// Returns `None` if the buffer is shorter than the header, the id does
    /// not match [`DQCOMMAND_ID`], or the command field is not one of
    /// [`CommandCode`]'s variants.
    pub fn decode_header(buf: &[u8]) -> Option<OutboundHeader> {
        if buf.len() < OUTBOUND_HEADER_LEN {
            return None;
        }
        let id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if id != DQCOMMAND_ID {
            return None;
        }
        let group_key = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let command = CommandCode::try_from_u32(u32::from_le_bytes(buf[8..12].try_into().unwrap()))?;
        let par1 = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        let par2 = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        let par3 = u32::from_le_bytes(buf[20..24].try_into().unwrap());
        Some(OutboundHeader {
            group_key,
            command,
            par1,
            par2,
            par3,
        })
    }
}

/// A classified inbound frame. `Unknown` covers both unrecognized ids and
/// frames too short for the variant their id implies; both are dropped by
/// the caller with a warning, never a hard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    Response {
        group_key: u32,
        order: u32,
        payload: &'a [u8],
    },
    AdcData {
        group_key: u32,
        order: u32,
        cumulative_count: u32,
        /// Raw little-endian 16-bit sample words, not yet decoded to voltages.
        payload: &'a [u8],
    },
    Unknown,
}

/// Classify and parse one inbound datagram.
///
/// `group_key`/`order` default to 0 for frames shorter than 12 bytes, per
/// the wire format note that short frames imply no sync-group context.
/// `order` is *not* clamped here: clamping to `[0, sync_device_count]` is a
/// multi-device session concern, not a codec concern, and is applied by the
/// caller that knows how many devices are synchronized.
pub fn decode_inbound(buf: &[u8]) -> Inbound<'_> {
    if buf.len() < 4 {
        return Inbound::Unknown;
    }
    let id = u32::from_le_bytes(buf[0..4].try_into().unwrap());

    let group_key = if buf.len() >= 8 {
        u32::from_le_bytes(buf[4..8].try_into().unwrap())
    } else {
        0
    };
    let order = if buf.len() >= 12 {
        u32::from_le_bytes(buf[8..12].try_into().unwrap())
    } else {
        0
    };

    match id {
        DQRESPONSE_ID => {
            if buf.len() < 16 {
                return Inbound::Unknown;
            }
            let payload_len = u32::from_le_bytes(buf[12..16].try_into().unwrap()) as usize;
            match buf.get(16..16 + payload_len) {
                Some(payload) => Inbound::Response {
                    group_key,
                    order,
                    payload,
                },
                None => Inbound::Unknown,
            }
        }
        DQADCDATA_ID => {
            if buf.len() < 20 {
                return Inbound::Unknown;
            }
            let cumulative_count = u32::from_le_bytes(buf[12..16].try_into().unwrap());
            let payload_sample_count = u32::from_le_bytes(buf[16..20].try_into().unwrap()) as usize;
            let needed = 20 + payload_sample_count * 2;
            match buf.get(20..needed) {
                Some(payload) => Inbound::AdcData {
                    group_key,
                    order,
                    cumulative_count,
                    payload,
                },
                None => Inbound::Unknown,
            }
        }
        _ => Inbound::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_header() {
        let frame = OutboundFrame {
            group_key: 0x0BAD_F00D,
            command: CommandCode::Connect,
            par1: 1235,
            par2: 1,
            par3: 0,
            payload: "192.168.1.3".into(),
        };
        let bytes = frame.encode();
        let header = OutboundFrame::decode_header(&bytes).unwrap();
        assert_eq!(header.group_key, frame.group_key);
        assert_eq!(header.command, frame.command);
        assert_eq!(header.par1, frame.par1);
        assert_eq!(header.par2, frame.par2);
        assert_eq!(header.par3, frame.par3);
    }

    #[test]
    fn decode_header_rejects_short_or_foreign() {
        assert!(OutboundFrame::decode_header(&[0; 10]).is_none());
        let mut bogus = vec![0u8; 24];
        bogus[0..4].copy_from_slice(&DQRESPONSE_ID.to_le_bytes());
        assert!(OutboundFrame::decode_header(&bogus).is_none());
    }

    #[test]
    fn unknown_id_produces_unknown() {
        let buf = [0xAAu8; 32];
        assert_eq!(decode_inbound(&buf), Inbound::Unknown);
    }

    #[test]
    fn short_frame_defaults_group_and_order() {
        // 8 bytes: id + group_key, no room for `order`.
        let mut buf = DQRESPONSE_ID.to_le_bytes().to_vec();
        buf.extend_from_slice(&7u32.to_le_bytes());
        assert_eq!(decode_inbound(&buf), Inbound::Unknown); // still short for payload_len
    }

    #[test]
    fn adc_data_round_trip() {
        let mut buf = DQADCDATA_ID.to_le_bytes().to_vec();
        buf.extend_from_slice(&1u32.to_le_bytes()); // group_key
        buf.extend_from_slice(&0u32.to_le_bytes()); // order
        buf.extend_from_slice(&4u32.to_le_bytes()); // cumulative_count
        buf.extend_from_slice(&2u32.to_le_bytes()); // payload_sample_count
        buf.extend_from_slice(&0x0010u16.to_le_bytes());
        buf.extend_from_slice(&0x0020u16.to_le_bytes());

        match decode_inbound(&buf) {
            Inbound::AdcData {
                cumulative_count,
                payload,
                ..
            } => {
                assert_eq!(cumulative_count, 4);
                assert_eq!(payload.len(), 4);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn malformed_adc_data_is_dropped() {
        let mut buf = DQADCDATA_ID.to_le_bytes().to_vec();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(&5u32.to_le_bytes()); // claims 5 samples
        buf.extend_from_slice(&0x0010u16.to_le_bytes()); // only 1 provided
        assert_eq!(decode_inbound(&buf), Inbound::Unknown);
    }
}
