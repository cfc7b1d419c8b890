//! Background threads: one reading ADC/response datagrams off the
//! response/data socket, one sending periodic `KEEPALIVE` frames on the
//! command socket.
//!
//! Each is coordinated through its own [`TaskControl`]: a flag plus a
//! condvar that lets the owner distinguish "pause, you may be resumed"
//! (state moves to `Paused`, the task blocks until told otherwise) from
//! "stop for good" (state moves to `Terminated`, the task observes this and
//! exits) without the thread busy-polling either way. `stop()` only pauses
//! the receive task; `disconnect()` terminates and joins both.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::codec::{decode_inbound, Inbound};
use crate::control::Control;
use crate::device_state::{clamp_order, DeviceState};
use crate::scanlist::ScanList;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Running,
    Paused,
    Terminated,
}

/// A pause/terminate signal for one background task.
struct TaskControl {
    state: Mutex<TaskState>,
    condvar: Condvar,
}

impl TaskControl {
    fn new() -> Self {
        TaskControl {
            state: Mutex::new(TaskState::Running),
            condvar: Condvar::new(),
        }
    }

    /// Pause the task. The flag stays set (the task is still alive, just
    /// not doing work); no wakeup is sent, since a paused task is expected
    /// to notice on its own next poll rather than be interrupted mid-wait.
    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == TaskState::Running {
            *state = TaskState::Paused;
        }
    }

    fn resume(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == TaskState::Paused {
            *state = TaskState::Running;
        }
        self.condvar.notify_all();
    }

    /// Terminate the task and wake it immediately, including out of a
    /// paused wait.
    fn terminate(&self) {
        *self.state.lock().unwrap() = TaskState::Terminated;
        self.condvar.notify_all();
    }

    /// Block while paused. Returns `false` once terminated (the caller
    /// should exit its loop), `true` if running (possibly after having
    /// waited out a pause).
    fn wait_while_paused(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        while *state == TaskState::Paused {
            state = self.condvar.wait(state).unwrap();
        }
        *state != TaskState::Terminated
    }

    /// Sleep for `timeout`, waking early if terminated. Returns `false` if
    /// terminated during the sleep.
    fn sleep_or_terminate(&self, timeout: Duration) -> bool {
        let state = self.state.lock().unwrap();
        let (state, _) = self.condvar.wait_timeout(state, timeout).unwrap();
        *state != TaskState::Terminated
    }
}

/// Callback invoked once per ingested ADC datagram, after the demultiplexer
/// has appended to the relevant device's queues. Runs on the receive
/// thread; it must not block for long or it will delay subsequent packets.
pub type DataCallback = Box<dyn FnMut(&mut DeviceState) + Send>;

/// Owns the response/data-socket receive thread and the command-socket
/// keep-alive thread for one session.
pub struct Supervisor {
    receive_control: Arc<TaskControl>,
    keepalive_control: Arc<TaskControl>,
    receive_thread: Option<JoinHandle<()>>,
    keep_alive_thread: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Spawn both threads. `devices` is shared with the session so the
    /// consumer can inspect queues between calls; this is why it is a
    /// `Mutex<Vec<DeviceState>>` rather than owned outright by the thread.
    pub fn spawn(
        response_transport: Arc<dyn Transport>,
        devices: Arc<Mutex<Vec<DeviceState>>>,
        scan_list: ScanList,
        loss_log_threshold: u32,
        mut on_data: DataCallback,
        control: Arc<Mutex<Control>>,
        keep_alive_interval: Duration,
    ) -> Self {
        let receive_control = Arc::new(TaskControl::new());
        let keepalive_control = Arc::new(TaskControl::new());

        let receive_task = Arc::clone(&receive_control);
        let receive_thread = std::thread::spawn(move || {
            let mut buf = vec![0u8; 65536];
            while receive_task.wait_while_paused() {
                let n = match response_transport.recv(&mut buf) {
                    Ok(n) => n,
                    Err(e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut =>
                    {
                        continue;
                    }
                    Err(e) => {
                        log::warn!("response socket read failed: {e}");
                        continue;
                    }
                };

                match decode_inbound(&buf[..n]) {
                    Inbound::AdcData {
                        order,
                        cumulative_count,
                        payload,
                        ..
                    } => {
                        let mut devices = devices.lock().unwrap();
                        let sync_device_count = devices.len().saturating_sub(1) as u32;
                        let order = clamp_order(order, sync_device_count) as usize;
                        let Some(device) = devices.get_mut(order) else {
                            log::warn!("ADC data for unknown device order {order}; dropping");
                            continue;
                        };
                        match device.ingest_adc_payload(
                            &scan_list,
                            cumulative_count,
                            payload,
                            loss_log_threshold,
                        ) {
                            Ok(()) => on_data(device),
                            Err(e) => log::error!("dropping packet: {e}"),
                        }
                    }
                    Inbound::Response { .. } => {
                        log::warn!("command response received on response socket after streaming started; ignoring");
                    }
                    Inbound::Unknown => {
                        log::warn!("unrecognized datagram on response socket; dropping");
                    }
                }
            }
        });

        let keepalive_task = Arc::clone(&keepalive_control);
        let keep_alive_thread = std::thread::spawn(move || {
            while keepalive_task.wait_while_paused() {
                if !keepalive_task.sleep_or_terminate(keep_alive_interval) {
                    break;
                }
                if let Err(e) = control.lock().unwrap().keep_alive() {
                    log::warn!("keep-alive send failed: {e}");
                }
            }
        });

        Supervisor {
            receive_control,
            keepalive_control,
            receive_thread: Some(receive_thread),
            keep_alive_thread: Some(keep_alive_thread),
        }
    }

    /// Pause the receive task without terminating it. Used by `stop()`:
    /// the session is no longer streaming but has not disconnected, so the
    /// task should be resumable rather than joined.
    pub fn pause_receive(&self) {
        self.receive_control.pause();
    }

    /// Resume a previously paused receive task.
    pub fn resume_receive(&self) {
        self.receive_control.resume();
    }

    /// Terminate and join both tasks. Safe to call once; a second call is a
    /// no-op since the threads have already been taken.
    pub fn shutdown(&mut self) {
        self.receive_control.terminate();
        self.keepalive_control.terminate();
        if let Some(handle) = self.receive_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.keep_alive_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A drain sink that simply buffers decoded samples, used by callers that
/// want to poll rather than receive a push callback.
pub fn buffering_callback(sink: Arc<Mutex<VecDeque<f32>>>, slot: usize) -> DataCallback {
    Box::new(move |device: &mut DeviceState| {
        let mut sink = sink.lock().unwrap();
        sink.extend(device.drain_queue(slot));
    })
}
