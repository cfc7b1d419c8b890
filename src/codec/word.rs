/// Decode one 16-bit ADC word into a scaled voltage.
///
/// The device packs a 14-bit ADC value plus 2 marker bits into 16 bits. The
/// low 2 bits are masked off first; the sign bit of the *masked* value then
/// decides two's-complement sign extension. This order (mask, then sign)
/// is a quirk of the source protocol and must be preserved: computing the
/// sign from the unmasked `raw` would give the wrong answer whenever the
/// marker bits disagree with bit 2 of the payload.
pub fn decode_word(raw: u16, range_volts: f32) -> f32 {
    let masked = raw & 0xFFFC;
    let signed: i32 = if masked & 0x8000 != 0 {
        -(((masked ^ 0xFFFF) as i32) + 1)
    } else {
        masked as i32
    };
    range_volts * signed as f32 / 32768.0
}

#[cfg(test)]
mod tests {
    use super::decode_word;

    #[test]
    fn twos_complement_scenarios() {
        assert!((decode_word(0xFFFC, 10.0) - (-10.0 * 4.0 / 32768.0)).abs() < 1e-6);
        assert_eq!(decode_word(0x8000, 10.0), -10.0);
        assert!((decode_word(0x7FFC, 10.0) - (10.0 * 32764.0 / 32768.0)).abs() < 1e-4);
    }

    #[test]
    fn zero_is_zero() {
        assert_eq!(decode_word(0x0000, 5.0), 0.0);
        // Marker bits alone decode to zero voltage regardless of range.
        assert_eq!(decode_word(0x0003, 5.0), 0.0);
    }

    #[test]
    fn word_decoding_property() {
        // For all u16, voltage == range * sign_extend(w & 0xFFFC) / 32768.
        for raw in (0u32..=0xFFFF).step_by(97) {
            let raw = raw as u16;
            let masked = raw & 0xFFFC;
            let expect_signed = if masked & 0x8000 != 0 {
                masked as i32 - 0x10000
            } else {
                masked as i32
            };
            let expect = 3.3f32 * expect_signed as f32 / 32768.0;
            assert!((decode_word(raw, 3.3) - expect).abs() < 1e-3, "raw={raw:#06x}");
        }
    }
}
