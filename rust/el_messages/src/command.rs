use core::fmt::{Display, Formatter, Result};

/// Single-byte commands from the host PC to the microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin a run: the MCU starts sampling and streaming telemetry.
    Start,
    /// End the current run.
    Stop,
}

impl Command {
    pub const START_BYTE: u8 = b's';
    pub const STOP_BYTE: u8 = b'e';

    /// Decodes a received byte. Bytes that are not commands are ignored by the MCU.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::START_BYTE => Some(Command::Start),
            Self::STOP_BYTE => Some(Command::Stop),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Command::Start => Self::START_BYTE,
            Command::Stop => Self::STOP_BYTE,
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Command::Start => write!(f, "Start experiment"),
            Command::Stop => write!(f, "Stop experiment"),
        }
    }
}
