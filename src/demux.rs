//! The channel-carryover demultiplexer.
//!
//! Distributes one ADC datagram's payload words into per-channel queues,
//! accounting for any gap the device reports between datagrams.
//!
//! Open question resolved here (see DESIGN.md): the device's
//! `cumulative_count` field is read as the running sample total *after* the
//! packet carrying it, not at packet entry. Reading it the other way (as a
//! pure pre-payload snapshot) double-counts this packet's own payload
//! against the gap, which the worked scenario in the spec's gap-repair test
//! rules out.

use crate::codec::decode_word;
use crate::device_state::DeviceState;
use crate::error::Error;
use crate::scanlist::ScanList;

/// Literal fill word the vendor reference uses for synthesized samples.
/// Its semantics are murky ("event marker"); see DESIGN.md for the policy
/// choice to decode it like any other word rather than substitute NaN.
const FILL_WORD: u16 = 0x0003;

impl DeviceState {
    /// Ingest one ADC datagram's payload.
    ///
    /// `cumulative_count` and `payload` come straight out of
    /// [`crate::codec::Inbound::AdcData`]. `loss_log_threshold` gates how
    /// often a loss notice is logged (0 disables the notice entirely).
    pub fn ingest_adc_payload(
        &mut self,
        scan_list: &ScanList,
        cumulative_count: u32,
        payload: &[u8],
        loss_log_threshold: u32,
    ) -> Result<(), Error> {
        let tracked = self.cumulative_samples_received;
        let cumulative_count = u64::from(cumulative_count);
        let sample_count = (payload.len() / 2) as u64;
        let expected_without_gap = tracked + sample_count;

        if cumulative_count < expected_without_gap {
            log::error!(
                "device {} cumulative_count regressed: reported {}, tracked {} (+{} this packet); dropping packet",
                self.order, cumulative_count, tracked, sample_count,
            );
            return Err(Error::StateRegression {
                device_order: self.order,
                tracked,
                reported: cumulative_count,
            });
        }

        let missing = cumulative_count - expected_without_gap;
        let scan_len = scan_list.len();

        if missing > 0 {
            for k in 0..missing {
                let slot_i = (k as usize + self.carryover_index) % scan_len;
                let voltage = decode_word(FILL_WORD, scan_list.range_volts(slot_i));
                self.queues[slot_i].push_back(voltage);
            }
            self.cumulative_missing_samples += missing;
            self.loss_since_notify += missing as u32;
            self.carryover_index = (self.carryover_index + missing as usize) % scan_len;

            if loss_log_threshold > 0 && self.loss_since_notify >= loss_log_threshold {
                log::info!(
                    "device {} has lost {} samples total ({} since last notice, threshold {})",
                    self.order,
                    self.cumulative_missing_samples,
                    self.loss_since_notify,
                    loss_log_threshold,
                );
                self.loss_since_notify = 0;
            }
        }

        for j in 0..sample_count as usize {
            let slot_i = (j + self.carryover_index) % scan_len;
            let offset = j * 2;
            let raw = u16::from_le_bytes([payload[offset], payload[offset + 1]]);
            let voltage = decode_word(raw, scan_list.range_volts(slot_i));
            self.queues[slot_i].push_back(voltage);
        }

        if sample_count > 0 {
            self.carryover_index = (self.carryover_index + sample_count as usize) % scan_len;
        }

        self.cumulative_samples_received = cumulative_count;
        self.packets_received += 1;

        Ok(())
    }
}
