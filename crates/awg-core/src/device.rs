//! Generator device
//!
//! [`AwgDevice`] ties a dialect to an acknowledged transport and mirrors every confirmed
//! setting in a [`ChannelStateStore`]. Setters report success as a plain `bool`; cached state is
//! only written after the generator acknowledged the command.

use serde::Serialize;
use std::fmt;

use crate::dialect::{AwgModel, Dialect};
use crate::protocol::{AckTiming, AckTransport, DeviceCommand, SerialLink};
use crate::state::{Channel, ChannelStateStore, DeviceState, Waveform};
use crate::AwgError;

/// Configurable attribute of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Output,
    Waveform,
    Frequency,
    Phase,
    Amplitude,
    Offset,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Output,
        Attribute::Waveform,
        Attribute::Frequency,
        Attribute::Phase,
        Attribute::Amplitude,
        Attribute::Offset,
    ];

    fn bit(self, channel: Channel) -> u16 {
        let index = self as usize;
        let base = match channel {
            Channel::One => 0,
            Channel::Two => Attribute::ALL.len(),
        };
        1 << (base + index)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Output => "output",
            Attribute::Waveform => "waveform",
            Attribute::Frequency => "frequency",
            Attribute::Phase => "phase",
            Attribute::Amplitude => "amplitude",
            Attribute::Offset => "offset",
        };
        f.write_str(name)
    }
}

const ALL_CONFIRMED: u16 = (1 << 12) - 1;

/// Where the device stands relative to what was requested of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Nothing confirmed yet
    Constructed,
    /// Some settings confirmed, or some requests failed
    PartiallyConfigured,
    /// Every field confirmed and equal to the last requested value
    Configured,
}

/// One step of [`AwgDevice::initialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InitStep {
    /// Output forced off before anything else changes
    OutputOff(Channel),
    Waveform(Channel),
    Frequency(Channel),
    Phase(Channel),
    Amplitude(Channel),
    Offset(Channel),
    /// Output set to the requested value
    Output(Channel),
}

/// Order in which `initialize` applies a configuration. Outputs are off while the waveform is
/// being changed so no half-configured signal reaches a live output.
pub const INIT_SEQUENCE: [InitStep; 14] = [
    InitStep::OutputOff(Channel::One),
    InitStep::OutputOff(Channel::Two),
    InitStep::Waveform(Channel::One),
    InitStep::Waveform(Channel::Two),
    InitStep::Frequency(Channel::One),
    InitStep::Frequency(Channel::Two),
    InitStep::Phase(Channel::One),
    InitStep::Phase(Channel::Two),
    InitStep::Amplitude(Channel::One),
    InitStep::Amplitude(Channel::Two),
    InitStep::Offset(Channel::One),
    InitStep::Offset(Channel::Two),
    InitStep::Output(Channel::One),
    InitStep::Output(Channel::Two),
];

/// Why a setter returned `false`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub reason: String,
    /// Command written for the request, `None` if it was refused before any I/O
    pub command: Option<String>,
    /// Bytes received in answer to that command
    pub reply: Vec<u8>,
}

/// A step of `initialize` that failed, with the diagnostics of that step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: InitStep,
    #[serde(flatten)]
    pub failure: Failure,
}

/// Outcome of a bulk initialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// Steps that were attempted
    pub attempted: usize,
    /// Steps that failed, in the order they ran
    pub failed: Vec<StepFailure>,
}

impl InitReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_steps(&self) -> Vec<InitStep> {
        self.failed.iter().map(|f| f.step).collect()
    }

    pub fn into_result(self) -> Result<(), AwgError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(AwgError::PartialInit {
                failed: self.failed.len(),
                total: self.attempted,
            })
        }
    }
}

/// A two-channel waveform generator on a serial link
pub struct AwgDevice<L> {
    transport: AckTransport<L>,
    dialect: Box<dyn Dialect>,
    defaults: DeviceState,
    store: ChannelStateStore,
    requested: DeviceState,
    confirmed: u16,
    last_failure: Option<Failure>,
}

impl<L: SerialLink> AwgDevice<L> {
    /// Create a device with the default acknowledgment timing
    pub fn new(link: L, dialect: Box<dyn Dialect>) -> Self {
        Self::with_transport(AckTransport::new(link), dialect)
    }

    /// Create a device for a model, with explicit acknowledgment timing
    pub fn for_model(link: L, model: AwgModel, timing: AckTiming) -> Self {
        Self::with_transport(AckTransport::with_timing(link, timing), model.dialect())
    }

    pub fn with_transport(transport: AckTransport<L>, dialect: Box<dyn Dialect>) -> Self {
        Self {
            transport,
            dialect,
            defaults: DeviceState::factory_defaults(),
            store: ChannelStateStore::new(),
            requested: DeviceState::unconfirmed(),
            confirmed: 0,
            last_failure: None,
        }
    }

    pub fn model(&self) -> AwgModel {
        self.dialect.model()
    }

    /// Copy of the defaults template
    pub fn defaults(&self) -> DeviceState {
        self.defaults
    }

    /// Last confirmed configuration
    pub fn state(&self) -> &ChannelStateStore {
        &self.store
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.confirmed == 0 {
            Lifecycle::Constructed
        } else if self.confirmed == ALL_CONFIRMED && self.store.snapshot() == self.requested {
            Lifecycle::Configured
        } else {
            Lifecycle::PartiallyConfigured
        }
    }

    /// Text of the last command written to the generator
    pub fn last_command(&self) -> &str {
        self.transport.last_command()
    }

    /// Raw reply to the last command
    pub fn last_reply(&self) -> &[u8] {
        self.transport.last_reply()
    }

    /// Diagnostics of the most recent setter, if it failed
    pub fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    pub fn transport(&self) -> &AckTransport<L> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut AckTransport<L> {
        &mut self.transport
    }

    /// Give the serial link back
    pub fn into_link(self) -> L {
        self.transport.into_inner()
    }

    fn send(
        &mut self,
        attribute: Attribute,
        channel: Channel,
        command: Result<DeviceCommand, AwgError>,
    ) -> bool {
        let bytes = match command.and_then(|cmd| cmd.render()) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(attribute, channel, e, false),
        };
        match self.transport.send(&bytes) {
            Ok(()) => {
                self.confirmed |= attribute.bit(channel);
                self.last_failure = None;
                true
            }
            Err(e) => self.fail(attribute, channel, e, true),
        }
    }

    fn fail(
        &mut self,
        attribute: Attribute,
        channel: Channel,
        e: AwgError,
        written: bool,
    ) -> bool {
        tracing::warn!(%channel, %attribute, "set failed: {e}");
        self.last_failure = Some(Failure {
            reason: e.to_string(),
            command: written.then(|| self.transport.last_command().to_string()),
            reply: if written {
                self.transport.last_reply().to_vec()
            } else {
                Vec::new()
            },
        });
        false
    }

    pub fn set_channel_output(&mut self, channel: Channel, enabled: bool) -> bool {
        self.requested.channel_mut(channel).output = enabled;
        let command = self.dialect.output_command(channel, enabled);
        if !self.send(Attribute::Output, channel, command) {
            return false;
        }
        self.store.set_output(channel, enabled);
        true
    }

    pub fn set_channel_waveform(&mut self, channel: Channel, waveform: Waveform) -> bool {
        self.requested.channel_mut(channel).waveform = waveform;
        let command = self.dialect.waveform_command(channel, waveform);
        if !self.send(Attribute::Waveform, channel, command) {
            return false;
        }
        self.store.set_waveform(channel, waveform);
        true
    }

    pub fn set_channel_frequency(&mut self, channel: Channel, hz: u32) -> bool {
        self.requested.channel_mut(channel).frequency_hz = hz;
        let command = self.dialect.frequency_command(channel, hz);
        if !self.send(Attribute::Frequency, channel, command) {
            return false;
        }
        self.store.set_frequency_hz(channel, hz);
        true
    }

    /// Phase in tenths of a degree
    pub fn set_channel_phase(&mut self, channel: Channel, deci_degrees: u32) -> bool {
        self.requested.channel_mut(channel).phase_deci_degrees = deci_degrees;
        let command = self.dialect.phase_command(channel, deci_degrees);
        if !self.send(Attribute::Phase, channel, command) {
            return false;
        }
        self.store.set_phase_deci_degrees(channel, deci_degrees);
        true
    }

    pub fn set_channel_amplitude(&mut self, channel: Channel, mv: u32) -> bool {
        self.requested.channel_mut(channel).amplitude_mv = mv;
        let command = self.dialect.amplitude_command(channel, mv);
        if !self.send(Attribute::Amplitude, channel, command) {
            return false;
        }
        self.store.set_amplitude_mv(channel, mv);
        true
    }

    pub fn set_channel_offset(&mut self, channel: Channel, mv: i32) -> bool {
        self.requested.channel_mut(channel).offset_mv = mv;
        let command = self.dialect.offset_command(channel, mv);
        if !self.send(Attribute::Offset, channel, command) {
            return false;
        }
        self.store.set_offset_mv(channel, mv);
        true
    }

    fn apply_step(&mut self, step: InitStep, settings: &DeviceState) -> bool {
        match step {
            InitStep::OutputOff(ch) => self.set_channel_output(ch, false),
            InitStep::Waveform(ch) => self.set_channel_waveform(ch, settings.channel(ch).waveform),
            InitStep::Frequency(ch) => {
                self.set_channel_frequency(ch, settings.channel(ch).frequency_hz)
            }
            InitStep::Phase(ch) => {
                self.set_channel_phase(ch, settings.channel(ch).phase_deci_degrees)
            }
            InitStep::Amplitude(ch) => {
                self.set_channel_amplitude(ch, settings.channel(ch).amplitude_mv)
            }
            InitStep::Offset(ch) => self.set_channel_offset(ch, settings.channel(ch).offset_mv),
            InitStep::Output(ch) => self.set_channel_output(ch, settings.channel(ch).output),
        }
    }

    /// Apply a full configuration and report which steps failed.
    ///
    /// A failing step does not stop the sequence; later steps still run, so the cached state
    /// afterwards reflects exactly the steps that succeeded.
    pub fn initialize_report(&mut self, settings: &DeviceState) -> InitReport {
        let mut report = InitReport::default();
        for step in INIT_SEQUENCE {
            report.attempted += 1;
            if !self.apply_step(step, settings) {
                let failure = self.last_failure.clone().unwrap_or_default();
                report.failed.push(StepFailure { step, failure });
            }
        }

        if report.is_ok() {
            tracing::info!(model = %self.model(), "device initialized");
        } else {
            tracing::warn!(
                model = %self.model(),
                failed = report.failed.len(),
                "device initialization incomplete: {:?}",
                report.failed_steps()
            );
        }
        report
    }

    /// Apply a full configuration. `true` only if every step was acknowledged.
    pub fn initialize(&mut self, settings: DeviceState) -> bool {
        self.initialize_report(&settings).is_ok()
    }
}
