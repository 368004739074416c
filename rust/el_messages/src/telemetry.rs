//! Telemetry lines streamed from the MCU to the host.
//!
//! Every sample is one line of comma-separated ASCII:
//!
//! ```text
//! <angle °, 4 decimals>,<duty %, 4 decimals>,<ms since start>,\n
//! ```
//!
//! A line containing [`END_MARKER`] announces the end of a run.

use core::fmt::{self, Display, Formatter, Write};

/// Announces the end of a run. The host stops expecting samples once it sees this.
pub const END_MARKER: &str = "Fim";

/// Capacity of a formatted telemetry line, including the newline.
///
/// The longest line a 32-bit pulse count can produce is well under this.
pub const LINE_CAPACITY: usize = 48;

/// One measurement/actuation cycle as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Shaft angle in degrees.
    pub angle_deg: f32,
    /// Duty cycle applied to the actuator, in percent.
    pub duty_percent: f32,
    /// Milliseconds since the run started.
    pub time_ms: u32,
}

impl Sample {
    /// Writes the sample as a telemetry line, newline included.
    pub fn write_line<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "{:.4},{:.4},{},\n",
            self.angle_deg, self.duty_percent, self.time_ms
        )
    }

    /// Formats the sample into a fixed-capacity buffer so the MCU never allocates.
    pub fn to_line(&self) -> Result<heapless::String<LINE_CAPACITY>, fmt::Error> {
        let mut line = heapless::String::new();
        self.write_line(&mut line)?;
        Ok(line)
    }

    /// Writes the human-readable form used by the host's data file.
    pub fn write_record<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "Angle: {:.4}, Duty_cycle: {:.4}%, Timer: {}ms",
            self.angle_deg, self.duty_percent, self.time_ms
        )
    }
}

/// A line received from the MCU that the host understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Report {
    Sample(Sample),
    End,
}

impl Report {
    /// Parses one received line, with or without its line terminator.
    ///
    /// Any line containing a comma is treated as a sample. Other lines are only meaningful if they
    /// carry the end marker; anything else (boot messages, log output) is [`ParseError::NotTelemetry`].
    pub fn parse(line: &str) -> Result<Report, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.contains(',') {
            let mut fields = line.split(',').map(str::trim);
            let angle_deg = fields
                .next()
                .ok_or(ParseError::MissingField)?
                .parse()
                .map_err(|_| ParseError::InvalidAngle)?;
            let duty_percent = fields
                .next()
                .ok_or(ParseError::MissingField)?
                .parse()
                .map_err(|_| ParseError::InvalidDuty)?;
            let time_ms = fields
                .next()
                .ok_or(ParseError::MissingField)?
                .parse()
                .map_err(|_| ParseError::InvalidTime)?;
            Ok(Report::Sample(Sample {
                angle_deg,
                duty_percent,
                time_ms,
            }))
        } else if line.contains(END_MARKER) {
            Ok(Report::End)
        } else {
            Err(ParseError::NotTelemetry)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The line is neither a sample nor an end marker.
    NotTelemetry,
    /// A sample line has fewer than three fields.
    MissingField,
    InvalidAngle,
    InvalidDuty,
    InvalidTime,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NotTelemetry => write!(f, "not a telemetry line"),
            ParseError::MissingField => write!(f, "sample line has fewer than 3 fields"),
            ParseError::InvalidAngle => write!(f, "angle is not a number"),
            ParseError::InvalidDuty => write!(f, "duty cycle is not a number"),
            ParseError::InvalidTime => write!(f, "timestamp is not a whole number"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_format() {
        let sample = Sample {
            angle_deg: -12.6,
            duty_percent: 30.0,
            time_ms: 1234,
        };
        let line = sample.to_line().unwrap();
        assert_eq!(line.as_str(), "-12.6000,30.0000,1234,\n");
    }

    /// A full multi-turn angle, full duty, and the largest timestamp must still fit the line buffer.
    #[test]
    fn test_worst_case_line_fits() {
        let sample = Sample {
            angle_deg: -77_309_411.0,
            duty_percent: 100.0,
            time_ms: u32::MAX,
        };
        let line = sample.to_line().unwrap();
        assert!(line.ends_with(",\n"));
    }

    #[test]
    fn test_parse_sample() {
        let report = Report::parse("-12.6000,30.0000,1234,\n").unwrap();
        assert_eq!(
            report,
            Report::Sample(Sample {
                angle_deg: -12.6,
                duty_percent: 30.0,
                time_ms: 1234,
            })
        );
    }

    /// The host must accept exactly what the MCU writes.
    #[test]
    fn test_parse_own_output() {
        let sample = Sample {
            angle_deg: 45.0,
            duty_percent: 0.0,
            time_ms: 0,
        };
        let line = sample.to_line().unwrap();
        assert_eq!(Report::parse(&line), Ok(Report::Sample(sample)));
    }

    #[test]
    fn test_parse_end_and_noise() {
        assert_eq!(Report::parse("I (200345) encoder: Fim\r\n"), Ok(Report::End));
        assert_eq!(Report::parse("Fim"), Ok(Report::End));
        assert_eq!(
            Report::parse("Embassy initialized!"),
            Err(ParseError::NotTelemetry)
        );
        assert_eq!(Report::parse(""), Err(ParseError::NotTelemetry));
    }

    #[test]
    fn test_parse_malformed_samples() {
        assert_eq!(Report::parse("1.0,2.0"), Err(ParseError::MissingField));
        assert_eq!(Report::parse("abc,2.0,3,"), Err(ParseError::InvalidAngle));
        assert_eq!(Report::parse("1.0,,3,"), Err(ParseError::InvalidDuty));
        assert_eq!(Report::parse("1.0,2.0,3.5,"), Err(ParseError::InvalidTime));
        assert_eq!(Report::parse("1.0,2.0,-3,"), Err(ParseError::InvalidTime));
    }

    #[test]
    fn test_record_line() {
        let sample = Sample {
            angle_deg: 1.5,
            duty_percent: 30.0,
            time_ms: 7,
        };
        let mut record = String::new();
        sample.write_record(&mut record).unwrap();
        assert_eq!(record, "Angle: 1.5000, Duty_cycle: 30.0000%, Timer: 7ms");
    }
}
