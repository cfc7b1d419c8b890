//! Per-device cumulative-count tracking, carryover, and per-channel output
//! queues.
//!
//! Design note: the source keeps one differently-named buffer member per
//! physical channel and a branch that picks among them. We instead index a
//! single `Vec` of queues by scan-list position directly — the branch
//! disappears because the scan list already tells us, for any slot index,
//! which queue a sample belongs in.

use std::collections::VecDeque;

/// State synchronized for one device in the sync group. Only `order == 0`
/// is exercised by a single-device session, but the type itself does not
/// assume a single device.
#[derive(Debug)]
pub struct DeviceState {
    pub(crate) order: u32,
    pub(crate) cumulative_samples_received: u64,
    pub(crate) cumulative_missing_samples: u64,
    pub(crate) carryover_index: usize,
    pub(crate) queues: Vec<VecDeque<f32>>,
    pub(crate) packets_received: u64,
    /// Loss, in samples, accumulated since the last threshold-crossing log.
    pub(crate) loss_since_notify: u32,
}

impl DeviceState {
    /// Create a fresh device-state record for a scan list of the given
    /// length. Called at configure-time and again on each new connection
    /// (the record does not survive a reconnect).
    pub fn new(order: u32, scan_list_len: usize) -> Self {
        DeviceState {
            order,
            cumulative_samples_received: 0,
            cumulative_missing_samples: 0,
            carryover_index: 0,
            queues: (0..scan_list_len).map(|_| VecDeque::new()).collect(),
            packets_received: 0,
            loss_since_notify: 0,
        }
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn cumulative_samples_received(&self) -> u64 {
        self.cumulative_samples_received
    }

    pub fn cumulative_missing_samples(&self) -> u64 {
        self.cumulative_missing_samples
    }

    pub fn carryover_index(&self) -> usize {
        self.carryover_index
    }

    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// The output queue for scan-list position `slot`. Appended to by the
    /// demultiplexer, drained by the consumer; the core never drains it.
    pub fn queue(&self, slot: usize) -> &VecDeque<f32> {
        &self.queues[slot]
    }

    /// Drain all currently buffered samples for one scan-list position.
    /// This is the consumer's side of the "queues are not owned here"
    /// contract: the core only appends.
    pub fn drain_queue(&mut self, slot: usize) -> std::collections::vec_deque::Drain<'_, f32> {
        self.queues[slot].drain(..)
    }

    /// Sum of all per-channel queue lengths, exposed for the I3 invariant
    /// property: this equals `cumulative_samples_received` whenever the
    /// consumer has not drained anything.
    pub fn total_queued(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }
}

/// Clamp a device `order` reported on the wire into `[0, sync_device_count]`,
/// per the wire format note. This is a session concern (only the session
/// knows how many devices are synchronized), not a codec concern.
pub fn clamp_order(order: u32, sync_device_count: u32) -> u32 {
    order.min(sync_device_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_empty() {
        let state = DeviceState::new(0, 2);
        assert_eq!(state.cumulative_samples_received(), 0);
        assert_eq!(state.total_queued(), 0);
    }

    #[test]
    fn clamp_order_saturates() {
        assert_eq!(clamp_order(9, 4), 4);
        assert_eq!(clamp_order(2, 4), 2);
    }
}
