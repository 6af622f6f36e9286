//! Acknowledged command transport
//!
//! Writes one command, then polls the link until the generator answers with a single byte or
//! the wait budget runs out. A line feed (0x0A) means the command was accepted. Input still
//! pending from an earlier exchange is dropped before the write, so the byte that is checked
//! is always the first one received after it.

use std::thread;
use std::time::Duration;

use super::{
    formatter::DeviceCommand, serial::SerialLink, ACK_BYTE, DEFAULT_ACK_MAX_POLLS,
    DEFAULT_ACK_POLL_INTERVAL_MS,
};
use crate::AwgError;

/// Polling parameters for the acknowledgment wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckTiming {
    /// Delay between two checks of the receive buffer
    pub poll_interval: Duration,
    /// Number of empty checks tolerated before giving up
    pub max_polls: u32,
}

impl Default for AckTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_ACK_POLL_INTERVAL_MS),
            max_polls: DEFAULT_ACK_MAX_POLLS,
        }
    }
}

impl AckTiming {
    /// Total time a dispatch may wait for its acknowledgment
    pub fn budget(&self) -> Duration {
        self.poll_interval * self.max_polls
    }
}

/// Serial transport with single-byte acknowledgment.
///
/// Holds the link exclusively; `&mut self` on every dispatch keeps one command in flight.
pub struct AckTransport<L> {
    link: L,
    timing: AckTiming,
    last_command: String,
    last_reply: Vec<u8>,
}

impl<L: SerialLink> AckTransport<L> {
    /// Create a transport with the default ~1s wait budget
    pub fn new(link: L) -> Self {
        Self::with_timing(link, AckTiming::default())
    }

    pub fn with_timing(link: L, timing: AckTiming) -> Self {
        Self {
            link,
            timing,
            last_command: String::new(),
            last_reply: Vec::new(),
        }
    }

    pub fn timing(&self) -> AckTiming {
        self.timing
    }

    /// Write `bytes` and wait for the acknowledgment
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), AwgError> {
        self.last_command = String::from_utf8_lossy(bytes).into_owned();
        self.last_reply.clear();

        let stale = self.link.discard_input()?;
        if stale > 0 {
            tracing::debug!(bytes = stale, "dropped stale input before dispatch");
        }

        tracing::debug!(command = %self.last_command.escape_debug(), "dispatch");
        self.link.write_all(bytes)?;

        let mut polls = 0u32;
        while self.link.bytes_to_read()? == 0 {
            if polls >= self.timing.max_polls {
                return Err(AwgError::AckTimeout {
                    waited_ms: self.timing.budget().as_millis() as u64,
                });
            }
            polls += 1;
            thread::sleep(self.timing.poll_interval);
        }

        let reply = self.link.read_byte()?;
        self.last_reply.push(reply);
        tracing::trace!(reply = reply, polls, "acknowledgment received");

        if reply == ACK_BYTE {
            Ok(())
        } else {
            Err(AwgError::AckRejected(reply))
        }
    }

    /// Render a command and send it. Formatting errors abort before anything is written.
    pub fn send_command(&mut self, command: &DeviceCommand) -> Result<(), AwgError> {
        let bytes = command.render()?;
        self.send(&bytes)
    }

    /// Write `bytes` and report whether the generator acknowledged them
    pub fn dispatch(&mut self, bytes: &[u8]) -> bool {
        match self.send(bytes) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(command = %self.last_command.escape_debug(), "command failed: {e}");
                false
            }
        }
    }

    /// Text of the last command written
    pub fn last_command(&self) -> &str {
        &self.last_command
    }

    /// Raw reply to the last command (empty if nothing arrived)
    pub fn last_reply(&self) -> &[u8] {
        &self.last_reply
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Link that answers the n-th write with the n-th scripted reply, after a number of empty
    /// polls. Writes past the end of the script stay unanswered.
    struct ScriptedLink {
        written: Vec<u8>,
        script: VecDeque<Vec<u8>>,
        replies: VecDeque<u8>,
        delay: u32,
        empty_polls: u32,
    }

    impl ScriptedLink {
        fn new(script: &[&[u8]], delay: u32) -> Self {
            Self {
                written: Vec::new(),
                script: script.iter().map(|r| r.to_vec()).collect(),
                replies: VecDeque::new(),
                delay,
                empty_polls: 0,
            }
        }
    }

    impl SerialLink for ScriptedLink {
        fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            self.written.extend_from_slice(data);
            if let Some(reply) = self.script.pop_front() {
                self.replies.extend(reply);
            }
            self.empty_polls = self.delay;
            Ok(())
        }

        fn bytes_to_read(&mut self) -> io::Result<u32> {
            if self.empty_polls > 0 {
                self.empty_polls -= 1;
                return Ok(0);
            }
            Ok(self.replies.len() as u32)
        }

        fn read_byte(&mut self) -> io::Result<u8> {
            self.replies
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no data"))
        }

        fn discard_input(&mut self) -> io::Result<usize> {
            let dropped = self.replies.len();
            self.replies.clear();
            Ok(dropped)
        }
    }

    fn fast() -> AckTiming {
        AckTiming {
            poll_interval: Duration::ZERO,
            max_polls: 10,
        }
    }

    #[test]
    fn test_ack_accepted() {
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"\n"], 0), fast());
        assert!(transport.dispatch(b"WMN1\n"));
        assert_eq!(transport.link().written, b"WMN1\n".to_vec());
        assert_eq!(transport.last_command(), "WMN1\n");
        assert_eq!(transport.last_reply(), b"\n");
    }

    #[test]
    fn test_ack_after_some_polls() {
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"\n"], 7), fast());
        assert!(transport.send(b"WMN0\n").is_ok());
    }

    #[test]
    fn test_wrong_byte_rejected() {
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"E"], 0), fast());
        let err = transport.send(b"WMW01\n").unwrap_err();
        assert!(matches!(err, AwgError::AckRejected(b'E')));
        assert_eq!(transport.last_reply(), b"E");
    }

    #[test]
    fn test_only_first_byte_counts() {
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"\r\n"], 0), fast());
        assert!(!transport.dispatch(b"WMW01\n"));
    }

    #[test]
    fn test_leftover_bytes_are_not_an_ack() {
        // First reply is "\r\n": rejected on '\r', and the '\n' stays in the buffer
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"\r\n"], 0), fast());
        assert!(matches!(
            transport.send(b"WMN1\n"),
            Err(AwgError::AckRejected(b'\r'))
        ));
        assert_eq!(transport.link().replies.len(), 1);

        // The generator stays silent; the leftover '\n' must not confirm the next command
        let err = transport.send(b"WMF00002000000000\n").unwrap_err();
        assert!(matches!(err, AwgError::AckTimeout { .. }));
        assert!(transport.last_reply().is_empty());
    }

    #[test]
    fn test_late_ack_does_not_leak_into_next_dispatch() {
        // The reply shows up only after the budget has run out
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"\n"], 11), fast());
        assert!(!transport.dispatch(b"WMN1\n"));

        transport.link_mut().delay = 0;
        assert!(matches!(
            transport.send(b"WMN0\n"),
            Err(AwgError::AckTimeout { .. })
        ));
    }

    #[test]
    fn test_timeout() {
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[], 0), fast());
        let err = transport.send(b"WMF00001000000000\n").unwrap_err();
        assert!(matches!(err, AwgError::AckTimeout { .. }));
        assert_eq!(transport.last_command(), "WMF00001000000000\n");
        assert!(transport.last_reply().is_empty());
    }

    #[test]
    fn test_ack_arriving_after_budget_is_timeout() {
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"\n"], 11), fast());
        assert!(!transport.dispatch(b"WMN1\n"));
    }

    #[test]
    fn test_diagnostics_overwritten() {
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"X"], 0), fast());
        assert!(!transport.dispatch(b"first\n"));
        assert_eq!(transport.last_reply(), b"X");

        assert!(!transport.dispatch(b"second\n"));
        assert_eq!(transport.last_command(), "second\n");
        assert!(transport.last_reply().is_empty());
    }

    #[test]
    fn test_format_error_writes_nothing() {
        let mut transport = AckTransport::with_timing(ScriptedLink::new(&[b"\n"], 0), fast());
        let cmd = DeviceCommand::with_param("WMA%u.%03u\n", 1);
        assert!(matches!(
            transport.send_command(&cmd),
            Err(AwgError::FormatMismatch { .. })
        ));
        assert!(transport.link().written.is_empty());
    }

    #[test]
    fn test_default_budget_is_about_one_second() {
        let timing = AckTiming::default();
        assert_eq!(timing.budget(), Duration::from_millis(1000));
    }
}
