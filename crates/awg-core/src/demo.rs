//! Demo Mode - Simulated generator for testing
//!
//! An in-memory [`SerialLink`] that behaves like a FeelTech generator on the other end of the
//! cable: every line-feed terminated command is recorded and answered with a line feed.
//! Rejections and silence can be scripted per command prefix or injected at random.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io;

use crate::protocol::{SerialLink, ACK_BYTE};

/// Reply sent for commands the simulator rejects
pub const REJECT_BYTE: u8 = b'E';

/// How the simulator answers a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Ack,
    Reject,
    Silent,
}

/// Simulated generator
pub struct SimulatedAwg {
    pending: Vec<u8>,
    replies: VecDeque<u8>,
    received: Vec<String>,
    reject_prefixes: Vec<String>,
    silent_prefixes: Vec<String>,
    /// Probability of a random non-answer
    drop_rate: f64,
    rng: StdRng,
}

impl Default for SimulatedAwg {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAwg {
    /// Simulator that acknowledges every command
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            replies: VecDeque::new(),
            received: Vec::new(),
            reject_prefixes: Vec::new(),
            silent_prefixes: Vec::new(),
            drop_rate: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reject (answer with `E`) every command starting with `prefix`
    pub fn reject_commands(mut self, prefix: &str) -> Self {
        self.reject_prefixes.push(prefix.to_string());
        self
    }

    /// Never answer commands starting with `prefix`
    pub fn ignore_commands(mut self, prefix: &str) -> Self {
        self.silent_prefixes.push(prefix.to_string());
        self
    }

    /// Leave a random share of commands unanswered, reproducibly for a given seed
    pub fn with_drop_rate(mut self, rate: f64, seed: u64) -> Self {
        self.drop_rate = rate.clamp(0.0, 1.0);
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Commands received so far, line feed stripped
    pub fn received(&self) -> &[String] {
        &self.received
    }

    pub fn clear_received(&mut self) {
        self.received.clear();
    }

    fn answer_for(&mut self, command: &str) -> Answer {
        if self.silent_prefixes.iter().any(|p| command.starts_with(p.as_str())) {
            return Answer::Silent;
        }
        if self.reject_prefixes.iter().any(|p| command.starts_with(p.as_str())) {
            return Answer::Reject;
        }
        if self.drop_rate > 0.0 && self.rng.gen_bool(self.drop_rate) {
            return Answer::Silent;
        }
        Answer::Ack
    }

    fn complete_command(&mut self) {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();

        let answer = self.answer_for(&line);
        tracing::trace!(command = %line, ?answer, "simulator received command");
        match answer {
            Answer::Ack => self.replies.push_back(ACK_BYTE),
            Answer::Reject => self.replies.push_back(REJECT_BYTE),
            Answer::Silent => {}
        }
        self.received.push(line);
    }
}

impl SerialLink for SimulatedAwg {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        for &byte in data {
            if byte == b'\n' {
                self.complete_command();
            } else {
                self.pending.push(byte);
            }
        }
        Ok(())
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.replies.len() as u32)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.replies
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no reply pending"))
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        let dropped = self.replies.len();
        self.replies.clear();
        Ok(dropped)
    }
}
