//! Command Formatter
//!
//! Renders ASCII command templates into the exact bytes written to the generator.
//!
//! Template placeholders (printf subset):
//! - %u, %d : decimal rendering of the next parameter
//! - %08u   : zero-padded to the given width
//! - %lu    : length modifiers are accepted and ignored
//! - %%     : literal percent sign
//!
//! The placeholder count must match the number of parameters, and at most two parameters are
//! allowed per command. Both are checked before anything is rendered, as is the field width
//! (at most [`MAX_WIDTH`]).

use crate::AwgError;

/// Maximum number of parameters a single command can carry
pub const MAX_PARAMS: usize = 2;

/// Widest field a placeholder may request
pub const MAX_WIDTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(char),
    Number { width: usize, zero_pad: bool },
}

/// A command template bound to its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    template: &'static str,
    params: Vec<u32>,
}

impl DeviceCommand {
    /// Command without parameters
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            params: Vec::new(),
        }
    }

    /// Command with a single parameter
    pub fn with_param(template: &'static str, param: u32) -> Self {
        Self {
            template,
            params: vec![param],
        }
    }

    /// Command with two parameters
    pub fn with_params(template: &'static str, first: u32, second: u32) -> Self {
        Self {
            template,
            params: vec![first, second],
        }
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn params(&self) -> &[u32] {
        &self.params
    }

    /// Render into wire bytes
    pub fn render(&self) -> Result<Vec<u8>, AwgError> {
        format_command(self.template, &self.params)
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>, AwgError> {
    let unsupported = |conversion: char| AwgError::UnsupportedPlaceholder {
        template: template.to_string(),
        conversion,
    };

    let mut segments = Vec::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            segments.push(Segment::Literal(c));
            continue;
        }

        if chars.peek() == Some(&'%') {
            chars.next();
            segments.push(Segment::Literal('%'));
            continue;
        }

        let zero_pad = chars.next_if_eq(&'0').is_some();
        let mut width = 0usize;
        while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
            width = width * 10 + d.to_digit(10).unwrap_or_default() as usize;
            if width > MAX_WIDTH {
                return Err(AwgError::WidthTooLarge {
                    template: template.to_string(),
                    max: MAX_WIDTH,
                });
            }
        }
        while chars.next_if_eq(&'l').is_some() {}

        match chars.next() {
            Some('u') | Some('d') => segments.push(Segment::Number { width, zero_pad }),
            Some(other) => return Err(unsupported(other)),
            None => return Err(unsupported('%')),
        }
    }

    Ok(segments)
}

/// Number of integer placeholders in a template
pub fn placeholder_count(template: &str) -> Result<usize, AwgError> {
    Ok(parse_template(template)?
        .iter()
        .filter(|s| matches!(s, Segment::Number { .. }))
        .count())
}

/// Render a template with its parameters.
///
/// The returned buffer is exactly as long as the rendered text.
pub fn format_command(template: &str, params: &[u32]) -> Result<Vec<u8>, AwgError> {
    if params.len() > MAX_PARAMS {
        return Err(AwgError::TooManyParams(params.len()));
    }

    let segments = parse_template(template)?;
    let placeholders = segments
        .iter()
        .filter(|s| matches!(s, Segment::Number { .. }))
        .count();
    if placeholders != params.len() {
        return Err(AwgError::FormatMismatch {
            template: template.to_string(),
            placeholders,
            params: params.len(),
        });
    }

    let mut rendered = String::with_capacity(template.len() + 10 * params.len());
    let mut values = params.iter();
    for segment in segments {
        match segment {
            Segment::Literal(c) => rendered.push(c),
            Segment::Number { width, zero_pad } => {
                // Count was checked above, so a value is always present
                let value = values.next().copied().unwrap_or_default();
                if zero_pad {
                    rendered.push_str(&format!("{:0width$}", value, width = width));
                } else {
                    rendered.push_str(&format!("{:width$}", value, width = width));
                }
            }
        }
    }

    Ok(rendered.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_placeholders() {
        let cmd = format_command("RMF\n", &[]).unwrap();
        assert_eq!(cmd, b"RMF\n".to_vec());
    }

    #[test]
    fn test_single_placeholder() {
        let cmd = format_command("WMN%u\n", &[1]).unwrap();
        assert_eq!(cmd, b"WMN1\n".to_vec());
    }

    #[test]
    fn test_two_placeholders_with_padding() {
        let cmd = format_command("WMA%u.%03u\n", &[2, 50]).unwrap();
        assert_eq!(cmd, b"WMA2.050\n".to_vec());
    }

    #[test]
    fn test_zero_padded_frequency() {
        let cmd = format_command("WMF%08u000000\n", &[1000]).unwrap();
        assert_eq!(cmd, b"WMF00001000000000\n".to_vec());
        assert_eq!(cmd.len(), 18);
    }

    #[test]
    fn test_space_padding_and_length_modifier() {
        let cmd = format_command("[%4lu]", &[42]).unwrap();
        assert_eq!(cmd, b"[  42]".to_vec());
    }

    #[test]
    fn test_literal_percent() {
        let cmd = format_command("DUTY%u%%", &[50]).unwrap();
        assert_eq!(cmd, b"DUTY50%".to_vec());
    }

    #[test]
    fn test_max_value() {
        let cmd = format_command("%u", &[u32::MAX]).unwrap();
        assert_eq!(cmd, b"4294967295".to_vec());
    }

    #[test]
    fn test_mismatch_too_few_params() {
        let err = format_command("WMA%u.%03u\n", &[2]).unwrap_err();
        assert!(matches!(
            err,
            AwgError::FormatMismatch {
                placeholders: 2,
                params: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_mismatch_too_many_params() {
        let err = format_command("WMN%u\n", &[1, 2]).unwrap_err();
        assert!(matches!(err, AwgError::FormatMismatch { .. }));

        let err = format_command("%u%u%u", &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, AwgError::TooManyParams(3)));
    }

    #[test]
    fn test_unsupported_conversion() {
        let err = format_command("WMS%s\n", &[1]).unwrap_err();
        assert!(matches!(
            err,
            AwgError::UnsupportedPlaceholder { conversion: 's', .. }
        ));

        let err = format_command("trailing%", &[]).unwrap_err();
        assert!(matches!(err, AwgError::UnsupportedPlaceholder { .. }));
    }

    #[test]
    fn test_oversized_width_rejected() {
        let err = format_command("%99999999999999999999u", &[1]).unwrap_err();
        assert!(matches!(
            err,
            AwgError::WidthTooLarge {
                max: MAX_WIDTH,
                ..
            }
        ));
        assert!(matches!(
            format_command("WMF%0999999999u\n", &[1]),
            Err(AwgError::WidthTooLarge { .. })
        ));
        assert!(placeholder_count("%33u").is_err());

        let widest = format_command("%032u", &[7]).unwrap();
        assert_eq!(widest.len(), MAX_WIDTH);
    }

    #[test]
    fn test_placeholder_count() {
        assert_eq!(placeholder_count("WMO-%u.%03u\n").unwrap(), 2);
        assert_eq!(placeholder_count("100%%\n").unwrap(), 0);
    }

    #[test]
    fn test_device_command_render() {
        let cmd = DeviceCommand::with_params("WFP%u.%u\n", 12, 5);
        assert_eq!(cmd.params(), &[12, 5]);
        assert_eq!(cmd.render().unwrap(), b"WFP12.5\n".to_vec());
    }
}
