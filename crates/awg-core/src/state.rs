//! Channel state
//!
//! Value types describing a two-channel generator configuration, and the store that mirrors
//! what the hardware has confirmed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AwgError;

/// Output channel of the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Main channel (CH1)
    One,
    /// Secondary channel (CH2)
    Two,
}

impl Channel {
    /// Both channels in application order
    pub const ALL: [Channel; 2] = [Channel::One, Channel::Two];

    /// 1-based channel number as printed on the front panel
    pub fn number(self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }
}

impl TryFrom<u8> for Channel {
    type Error = AwgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Channel::One),
            2 => Ok(Channel::Two),
            other => Err(AwgError::InvalidChannel(other)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.number())
    }
}

/// Waveform shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    /// Not yet confirmed by hardware
    #[default]
    Undefined,
    Sine,
    Square,
    Rectangle,
    Trapezoid,
    Cmos,
    AdjustablePulse,
    Dc,
    Triangle,
    RampUp,
    RampDown,
}

impl FromStr for Waveform {
    type Err = AwgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Waveform::Sine),
            "square" | "sq" => Ok(Waveform::Square),
            "rectangle" | "rect" => Ok(Waveform::Rectangle),
            "trapezoid" => Ok(Waveform::Trapezoid),
            "cmos" => Ok(Waveform::Cmos),
            "adjustable_pulse" | "pulse" => Ok(Waveform::AdjustablePulse),
            "dc" => Ok(Waveform::Dc),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            "ramp_up" | "ramp" => Ok(Waveform::RampUp),
            "ramp_down" => Ok(Waveform::RampDown),
            _ => Err(AwgError::UnknownWaveform(s.to_string())),
        }
    }
}

/// Configuration of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelState {
    /// Output enabled
    pub output: bool,
    /// Waveform shape
    pub waveform: Waveform,
    /// Frequency in Hz
    pub frequency_hz: u32,
    /// Phase in tenths of a degree (125 = 12.5°)
    pub phase_deci_degrees: u32,
    /// Peak-to-peak amplitude in mV
    pub amplitude_mv: u32,
    /// DC offset in mV
    pub offset_mv: i32,
}

impl ChannelState {
    /// Sentinel for a channel nothing has been confirmed on yet
    pub const UNCONFIRMED: ChannelState = ChannelState {
        output: false,
        waveform: Waveform::Undefined,
        frequency_hz: 0,
        phase_deci_degrees: 0,
        amplitude_mv: 0,
        offset_mv: 0,
    };

    /// Factory template: output off, 1 kHz sine, 0°, 1 Vpp, no offset
    pub const DEFAULT: ChannelState = ChannelState {
        output: false,
        waveform: Waveform::Sine,
        frequency_hz: 1000,
        phase_deci_degrees: 0,
        amplitude_mv: 1000,
        offset_mv: 0,
    };
}

/// Configuration of both channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceState {
    pub ch1: ChannelState,
    pub ch2: ChannelState,
}

impl DeviceState {
    /// State of a device nothing has been confirmed on yet
    pub const fn unconfirmed() -> Self {
        Self {
            ch1: ChannelState::UNCONFIRMED,
            ch2: ChannelState::UNCONFIRMED,
        }
    }

    /// The fixed defaults table
    pub const fn factory_defaults() -> Self {
        Self {
            ch1: ChannelState::DEFAULT,
            ch2: ChannelState::DEFAULT,
        }
    }

    pub fn channel(&self, channel: Channel) -> &ChannelState {
        match channel {
            Channel::One => &self.ch1,
            Channel::Two => &self.ch2,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelState {
        match channel {
            Channel::One => &mut self.ch1,
            Channel::Two => &mut self.ch2,
        }
    }

    /// Load a settings file (JSON)
    pub fn from_json(content: &str) -> Result<Self, AwgError> {
        serde_json::from_str(content).map_err(|e| AwgError::Config(e.to_string()))
    }
}

/// Last configuration confirmed by the hardware.
///
/// Writes are crate-private: only the device calls them, and only after the matching command
/// was acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStateStore {
    state: DeviceState,
}

impl Default for ChannelStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelStateStore {
    /// Create a store with every field unconfirmed
    pub fn new() -> Self {
        Self {
            state: DeviceState::unconfirmed(),
        }
    }

    /// Snapshot of both channels
    pub fn snapshot(&self) -> DeviceState {
        self.state
    }

    pub fn output(&self, channel: Channel) -> bool {
        self.state.channel(channel).output
    }

    pub fn waveform(&self, channel: Channel) -> Waveform {
        self.state.channel(channel).waveform
    }

    pub fn frequency_hz(&self, channel: Channel) -> u32 {
        self.state.channel(channel).frequency_hz
    }

    pub fn phase_deci_degrees(&self, channel: Channel) -> u32 {
        self.state.channel(channel).phase_deci_degrees
    }

    pub fn amplitude_mv(&self, channel: Channel) -> u32 {
        self.state.channel(channel).amplitude_mv
    }

    pub fn offset_mv(&self, channel: Channel) -> i32 {
        self.state.channel(channel).offset_mv
    }

    pub(crate) fn set_output(&mut self, channel: Channel, enabled: bool) {
        self.state.channel_mut(channel).output = enabled;
    }

    pub(crate) fn set_waveform(&mut self, channel: Channel, waveform: Waveform) {
        self.state.channel_mut(channel).waveform = waveform;
    }

    pub(crate) fn set_frequency_hz(&mut self, channel: Channel, hz: u32) {
        self.state.channel_mut(channel).frequency_hz = hz;
    }

    pub(crate) fn set_phase_deci_degrees(&mut self, channel: Channel, phase: u32) {
        self.state.channel_mut(channel).phase_deci_degrees = phase;
    }

    pub(crate) fn set_amplitude_mv(&mut self, channel: Channel, mv: u32) {
        self.state.channel_mut(channel).amplitude_mv = mv;
    }

    pub(crate) fn set_offset_mv(&mut self, channel: Channel, mv: i32) {
        self.state.channel_mut(channel).offset_mv = mv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_from_number() {
        assert_eq!(Channel::try_from(1).unwrap(), Channel::One);
        assert_eq!(Channel::try_from(2).unwrap(), Channel::Two);
        assert!(matches!(
            Channel::try_from(3),
            Err(AwgError::InvalidChannel(3))
        ));
        assert!(Channel::try_from(0).is_err());
    }

    #[test]
    fn test_new_store_is_unconfirmed() {
        let store = ChannelStateStore::new();
        for ch in Channel::ALL {
            assert_eq!(store.waveform(ch), Waveform::Undefined);
            assert_eq!(store.frequency_hz(ch), 0);
            assert!(!store.output(ch));
        }
    }

    #[test]
    fn test_store_writes_only_touch_one_channel() {
        let mut store = ChannelStateStore::new();
        store.set_frequency_hz(Channel::Two, 5000);
        store.set_offset_mv(Channel::Two, -250);

        assert_eq!(store.frequency_hz(Channel::Two), 5000);
        assert_eq!(store.offset_mv(Channel::Two), -250);
        assert_eq!(store.snapshot().ch1, ChannelState::UNCONFIRMED);
    }

    #[test]
    fn test_store_last_write_wins() {
        let mut store = ChannelStateStore::new();
        store.set_amplitude_mv(Channel::One, 500);
        store.set_amplitude_mv(Channel::One, 2500);
        assert_eq!(store.amplitude_mv(Channel::One), 2500);
    }

    #[test]
    fn test_settings_json() {
        let json = r#"{
            "ch1": {"output": true, "waveform": "square", "frequency_hz": 2000,
                    "phase_deci_degrees": 900, "amplitude_mv": 3300, "offset_mv": -100},
            "ch2": {"output": false, "waveform": "ramp_down", "frequency_hz": 50,
                    "phase_deci_degrees": 0, "amplitude_mv": 100, "offset_mv": 0}
        }"#;
        let state = DeviceState::from_json(json).unwrap();
        assert_eq!(state.ch1.waveform, Waveform::Square);
        assert_eq!(state.ch1.offset_mv, -100);
        assert_eq!(state.ch2.waveform, Waveform::RampDown);

        assert!(DeviceState::from_json("{").is_err());
    }

    #[test]
    fn test_waveform_from_str() {
        assert_eq!("Sine".parse::<Waveform>().unwrap(), Waveform::Sine);
        assert_eq!("tri".parse::<Waveform>().unwrap(), Waveform::Triangle);
        assert!("sawtooth-ish".parse::<Waveform>().is_err());
    }
}
