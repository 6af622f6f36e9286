//! FeelTech FY6800 / FY6900 command set
//!
//! Channel 1 commands start with `WM`, channel 2 with `WF`. Every command ends with a line
//! feed, and the generator answers each one with a bare line feed.

use super::{AwgModel, Dialect};
use crate::protocol::DeviceCommand;
use crate::state::{Channel, Waveform};
use crate::AwgError;

/// Largest frequency that fits the 8-digit Hz field of the `W?F` command
const MAX_FREQUENCY_HZ: u32 = 99_999_999;

/// Phase is given in tenths of a degree and must stay below a full turn
const MAX_PHASE_DECI_DEGREES: u32 = 3599;

struct Templates {
    waveform: &'static str,
    output: &'static str,
    // Frequency is sent in µHz: 8 digits of Hz followed by six zeros
    frequency: &'static str,
    amplitude: &'static str,
    offset: &'static str,
    offset_negative: &'static str,
    phase: &'static str,
}

static MAIN: Templates = Templates {
    waveform: "WMW%02u\n",
    output: "WMN%u\n",
    frequency: "WMF%08u000000\n",
    amplitude: "WMA%u.%03u\n",
    offset: "WMO%u.%03u\n",
    offset_negative: "WMO-%u.%03u\n",
    phase: "WMP%u.%u\n",
};

static AUX: Templates = Templates {
    waveform: "WFW%02u\n",
    output: "WFN%u\n",
    frequency: "WFF%08u000000\n",
    amplitude: "WFA%u.%03u\n",
    offset: "WFO%u.%03u\n",
    offset_negative: "WFO-%u.%03u\n",
    phase: "WFP%u.%u\n",
};

/// FeelTech dialect
#[derive(Debug, Clone, Copy)]
pub struct FeelTech {
    model: AwgModel,
}

impl FeelTech {
    pub fn new(model: AwgModel) -> Self {
        Self { model }
    }

    fn templates(channel: Channel) -> &'static Templates {
        match channel {
            Channel::One => &MAIN,
            Channel::Two => &AUX,
        }
    }

    fn waveform_code(waveform: Waveform) -> Option<u32> {
        let code = match waveform {
            Waveform::Sine => 0,
            Waveform::Square => 1,
            Waveform::Rectangle => 2,
            Waveform::Trapezoid => 3,
            Waveform::Cmos => 4,
            Waveform::AdjustablePulse => 5,
            Waveform::Dc => 6,
            Waveform::Triangle => 7,
            Waveform::RampUp => 8,
            Waveform::RampDown => 9,
            Waveform::Undefined => return None,
        };
        Some(code)
    }
}

impl Dialect for FeelTech {
    fn model(&self) -> AwgModel {
        self.model
    }

    fn waveform_command(
        &self,
        channel: Channel,
        waveform: Waveform,
    ) -> Result<DeviceCommand, AwgError> {
        let code = Self::waveform_code(waveform).ok_or(AwgError::UnsupportedWaveform(waveform))?;
        Ok(DeviceCommand::with_param(
            Self::templates(channel).waveform,
            code,
        ))
    }

    fn output_command(&self, channel: Channel, enabled: bool) -> Result<DeviceCommand, AwgError> {
        Ok(DeviceCommand::with_param(
            Self::templates(channel).output,
            u32::from(enabled),
        ))
    }

    fn frequency_command(&self, channel: Channel, hz: u32) -> Result<DeviceCommand, AwgError> {
        if hz > MAX_FREQUENCY_HZ {
            return Err(AwgError::OutOfRange {
                what: "frequency",
                value: i64::from(hz),
            });
        }
        Ok(DeviceCommand::with_param(
            Self::templates(channel).frequency,
            hz,
        ))
    }

    fn phase_command(
        &self,
        channel: Channel,
        deci_degrees: u32,
    ) -> Result<DeviceCommand, AwgError> {
        if deci_degrees > MAX_PHASE_DECI_DEGREES {
            return Err(AwgError::OutOfRange {
                what: "phase",
                value: i64::from(deci_degrees),
            });
        }
        Ok(DeviceCommand::with_params(
            Self::templates(channel).phase,
            deci_degrees / 10,
            deci_degrees % 10,
        ))
    }

    fn amplitude_command(&self, channel: Channel, mv: u32) -> Result<DeviceCommand, AwgError> {
        Ok(DeviceCommand::with_params(
            Self::templates(channel).amplitude,
            mv / 1000,
            mv % 1000,
        ))
    }

    fn offset_command(&self, channel: Channel, mv: i32) -> Result<DeviceCommand, AwgError> {
        let templates = Self::templates(channel);
        let template = if mv < 0 {
            templates.offset_negative
        } else {
            templates.offset
        };
        let magnitude = mv.unsigned_abs();
        Ok(DeviceCommand::with_params(
            template,
            magnitude / 1000,
            magnitude % 1000,
        ))
    }
}
