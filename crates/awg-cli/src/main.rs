use anyhow::{bail, Context, Result};
use awg_core::demo::SimulatedAwg;
use awg_core::protocol::{list_ports, open_port, SerialLink};
use awg_core::{AwgConfig, AwgDevice, AwgModel, Channel, DeviceState, Waveform};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "awgctl")]
#[command(about = "Control a FeelTech waveform generator over its serial port", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, overrides the configuration file
    #[arg(short, long)]
    port: Option<String>,

    /// Generator model (fy6800, fy6900)
    #[arg(short, long)]
    model: Option<AwgModel>,

    /// Talk to a simulated generator instead of real hardware
    #[arg(long)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    Ports,

    /// Print the default configuration as JSON
    Defaults,

    /// Apply a full configuration (defaults unless a settings file is given)
    Init {
        /// Settings file (JSON, same layout as `defaults` prints)
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Change a single channel attribute
    Set {
        #[command(subcommand)]
        attribute: SetCommand,
    },
}

#[derive(Subcommand)]
enum SetCommand {
    /// Output on/off
    Output {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        channel: u8,
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        enabled: bool,
    },
    /// Waveform shape (sine, square, triangle, ...)
    Waveform {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        channel: u8,
        waveform: Waveform,
    },
    /// Frequency in Hz
    Frequency {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        channel: u8,
        hz: u32,
    },
    /// Phase in tenths of a degree
    Phase {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        channel: u8,
        deci_degrees: u32,
    },
    /// Amplitude in mV
    Amplitude {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        channel: u8,
        mv: u32,
    },
    /// Offset in mV
    Offset {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=2))]
        channel: u8,
        #[arg(allow_negative_numbers = true)]
        mv: i32,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut out = io::stdout().lock();
    let mut diag = io::stderr().lock();
    match run(Cli::parse(), &mut out, &mut diag) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let _ = writeln!(diag, "Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Run one command. `Ok(false)` means the generator did not accept everything it was sent;
/// the diagnostics for that have already been written to `diag`.
fn run(cli: Cli, out: &mut dyn Write, diag: &mut dyn Write) -> Result<bool> {
    let mut config = match &cli.config {
        Some(path) => AwgConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AwgConfig::default(),
    };
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(port) = cli.port.clone() {
        config.port = Some(port);
    }
    tracing::debug!(model = %config.model, port = ?config.port, demo = cli.demo, "configuration");

    match cli.command {
        Commands::Ports => {
            for port in list_ports() {
                let marker = if port.is_ch340() { "*" } else { " " };
                match (port.vid, port.pid) {
                    (Some(vid), Some(pid)) => writeln!(
                        out,
                        "{marker} {}  [{vid:04x}:{pid:04x}] {}",
                        port.name,
                        port.product.unwrap_or_default()
                    )?,
                    _ => writeln!(out, "{marker} {}", port.name)?,
                }
            }
            Ok(true)
        }
        Commands::Defaults => {
            writeln!(
                out,
                "{}",
                serde_json::to_string_pretty(&DeviceState::factory_defaults())?
            )?;
            Ok(true)
        }
        command => {
            if cli.demo {
                let mut awg =
                    AwgDevice::for_model(SimulatedAwg::new(), config.model, config.ack_timing());
                execute(&mut awg, command, out, diag)
            } else {
                let Some(name) = config.port.as_deref() else {
                    bail!("No serial port given (use --port or set \"port\" in the config file)");
                };
                let port = open_port(name, Some(config.baud_rate))
                    .with_context(|| format!("Failed to open {name}"))?;
                let mut awg = AwgDevice::for_model(port, config.model, config.ack_timing());
                execute(&mut awg, command, out, diag)
            }
        }
    }
}

fn execute<L: SerialLink>(
    awg: &mut AwgDevice<L>,
    command: Commands,
    out: &mut dyn Write,
    diag: &mut dyn Write,
) -> Result<bool> {
    let ok = match command {
        Commands::Init { settings } => {
            let settings = match settings {
                Some(path) => {
                    let content = fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    DeviceState::from_json(&content)?
                }
                None => awg.defaults(),
            };
            let report = awg.initialize_report(&settings);
            if !report.is_ok() {
                writeln!(diag, "{}", serde_json::to_string_pretty(&report)?)?;
            }
            report.is_ok()
        }
        Commands::Set { attribute } => {
            let ok = apply_set(awg, attribute)?;
            if let Some(failure) = awg.last_failure() {
                writeln!(diag, "{}", serde_json::to_string_pretty(failure)?)?;
            }
            ok
        }
        Commands::Ports | Commands::Defaults => true,
    };

    writeln!(
        out,
        "{}",
        serde_json::to_string_pretty(&awg.state().snapshot())?
    )?;
    Ok(ok)
}

fn apply_set<L: SerialLink>(awg: &mut AwgDevice<L>, command: SetCommand) -> Result<bool> {
    let ok = match command {
        SetCommand::Output { channel, enabled } => {
            awg.set_channel_output(Channel::try_from(channel)?, enabled)
        }
        SetCommand::Waveform { channel, waveform } => {
            awg.set_channel_waveform(Channel::try_from(channel)?, waveform)
        }
        SetCommand::Frequency { channel, hz } => {
            awg.set_channel_frequency(Channel::try_from(channel)?, hz)
        }
        SetCommand::Phase {
            channel,
            deci_degrees,
        } => awg.set_channel_phase(Channel::try_from(channel)?, deci_degrees),
        SetCommand::Amplitude { channel, mv } => {
            awg.set_channel_amplitude(Channel::try_from(channel)?, mv)
        }
        SetCommand::Offset { channel, mv } => {
            awg.set_channel_offset(Channel::try_from(channel)?, mv)
        }
    };
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn awgctl(args: &[&str]) -> (Result<bool>, String, String) {
        let cli = Cli::parse_from(std::iter::once("awgctl").chain(args.iter().copied()));
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let result = run(cli, &mut out, &mut diag);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    #[test]
    fn test_demo_set_succeeds() {
        let (result, out, diag) = awgctl(&["--demo", "set", "frequency", "1", "2000"]);
        assert!(result.unwrap());
        assert!(diag.is_empty());

        let state = DeviceState::from_json(&out).unwrap();
        assert_eq!(state.ch1.frequency_hz, 2000);
    }

    #[test]
    fn test_demo_set_failure_is_reported() {
        let (result, out, diag) = awgctl(&["--demo", "set", "phase", "2", "3600"]);
        assert!(!result.unwrap());
        assert!(diag.contains("phase out of range"));
        assert!(diag.contains("\"command\": null"));

        let state = DeviceState::from_json(&out).unwrap();
        assert_eq!(state.ch2.phase_deci_degrees, 0);
    }

    #[test]
    fn test_demo_init_with_defaults() {
        let (result, out, diag) = awgctl(&["--demo", "init"]);
        assert!(result.unwrap());
        assert!(diag.is_empty());
        assert_eq!(
            DeviceState::from_json(&out).unwrap(),
            DeviceState::factory_defaults()
        );
    }

    #[test]
    fn test_demo_init_lists_failed_steps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = DeviceState::factory_defaults();
        settings.ch1.frequency_hz = 100_000_000;
        fs::write(&path, serde_json::to_string(&settings).unwrap()).unwrap();

        let (result, out, diag) =
            awgctl(&["--demo", "init", "--settings", path.to_str().unwrap()]);
        assert!(!result.unwrap());
        assert!(diag.contains("\"Frequency\": \"One\""));
        assert!(diag.contains("frequency out of range"));
        assert!(!diag.contains("WFN0"));

        let state = DeviceState::from_json(&out).unwrap();
        assert_eq!(state.ch1.frequency_hz, 0);
        assert_eq!(state.ch2.frequency_hz, 1000);
    }

    #[test]
    fn test_missing_port_is_an_error() {
        let (result, out, _) = awgctl(&["set", "output", "1", "on"]);
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_defaults_printed_as_json() {
        let (result, out, _) = awgctl(&["defaults"]);
        assert!(result.unwrap());
        assert_eq!(
            DeviceState::from_json(&out).unwrap(),
            DeviceState::factory_defaults()
        );
    }
}
