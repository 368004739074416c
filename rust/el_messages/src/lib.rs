#![cfg_attr(not(test), no_std)]
#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod duty;
pub mod encoder;
pub mod session;
pub mod telemetry;

pub use command::Command;
pub use duty::{DutyScaler, IDLE_DUTY_PERCENT, PWM_FREQUENCY_HZ, PWM_PERIOD, RUN_DUTY_PERCENT};
pub use encoder::{EncoderScale, LimitEvent};
pub use session::{SampleClock, Session, SessionConfig, Step, StopReason};
pub use telemetry::{END_MARKER, ParseError, Report, Sample};

/// Baud rate of the serial link between the MCU and the host.
///
/// Keep this up to date with the host's default in ../host_tui/src/config/mod.rs
pub const BAUD_RATE: u32 = 921_600;
