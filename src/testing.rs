//! In-tree test doubles shared by this crate's own unit tests.
//!
//! Kept under `src/` (rather than `tests/`) because the driver's and
//! canvas's `#[cfg(test)]` unit tests need a `Transport` impl that never
//! touches real hardware, and a `#[cfg(test)]` module is visible from
//! any other in-crate test module without a separate crate boundary.

use std::time::Duration;

use crate::error::Result;
use crate::transport::Transport;

/// Records every command/data exchange and answers `wait_ready` instantly.
///
/// `busy_for` lets a test force a bounded number of "still busy" polls
/// before `wait_ready` reports ready, to exercise timeout handling.
#[derive(Debug, Default)]
pub struct MockTransport {
    commands: Vec<u8>,
    data_log: Vec<Vec<u8>>,
    reset_count: u32,
    busy_for: u32,
    read_responses: Vec<Vec<u8>>,
    fail_reads: bool,
}

impl MockTransport {
    /// A transport with no canned busy delay and no queued read replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command byte written, in order.
    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    /// Every data payload written, in order, one entry per `write_command`
    /// call (including zero-length ones).
    pub fn data_log(&self) -> &[Vec<u8>] {
        &self.data_log
    }

    /// Forget all recorded commands/data without resetting busy/read state.
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.data_log.clear();
    }

    /// Number of `hardware_reset` calls observed.
    pub fn reset_count(&self) -> u32 {
        self.reset_count
    }

    /// Force the next `busy_polls` calls to `wait_ready` to report busy
    /// before returning ready, to drive a test toward a timeout.
    pub fn set_busy_for(&mut self, busy_polls: u32) {
        self.busy_for = busy_polls;
    }

    /// Queue a canned reply for the next `read_data` call.
    pub fn push_read_response(&mut self, bytes: Vec<u8>) {
        self.read_responses.push(bytes);
    }

    /// Make every subsequent `read_data` call fail, simulating a
    /// no-MISO board.
    pub fn fail_reads(&mut self) {
        self.fail_reads = true;
    }
}

impl Transport for MockTransport {
    fn write_command(&mut self, cmd: u8, data: &[u8]) -> Result<()> {
        self.commands.push(cmd);
        self.data_log.push(data.to_vec());
        Ok(())
    }

    fn read_data(&mut self, _cmd: u8, len: usize) -> Result<Vec<u8>> {
        if self.fail_reads {
            return Err(crate::error::EpdError::Unsupported {
                feature: "read_data",
            });
        }
        if let Some(resp) = self.read_responses.pop() {
            return Ok(resp);
        }
        Ok(vec![0u8; len])
    }

    fn hardware_reset(&mut self, _pulse: Duration, _recovery: Duration) -> Result<()> {
        self.reset_count += 1;
        Ok(())
    }

    fn wait_ready(&mut self, timeout: Duration, operation: &'static str) -> Result<Duration> {
        if self.busy_for > 0 {
            self.busy_for -= 1;
            return Err(crate::error::EpdError::Timeout { operation: operation });
        }
        let _ = timeout;
        Ok(Duration::from_millis(0))
    }
}
