//! Runtime configuration of the host interface, read from the environment.
//!
//! ```text
//! EL_PORT=/dev/ttyUSB0 EL_BAUD=921600 EL_OUTPUT=received_data.txt EL_PLOT=plot.svg \
//!     cargo run -p host_tui
//! ```

use std::path::PathBuf;

use color_eyre::{Result, eyre::WrapErr};

pub const PORT_VAR: &str = "EL_PORT";
pub const BAUD_VAR: &str = "EL_BAUD";
pub const OUTPUT_VAR: &str = "EL_OUTPUT";
pub const PLOT_VAR: &str = "EL_PLOT";

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
// Keep this up to date with ../../el_messages/src/lib.rs BAUD_RATE
pub const DEFAULT_BAUD_RATE: u32 = el_messages::BAUD_RATE;
pub const DEFAULT_OUTPUT: &str = "received_data.txt";
pub const DEFAULT_PLOT: &str = "plot.svg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Serial port the MCU is connected to.
    pub port: String,
    pub baud_rate: u32,
    /// File the recorded samples are saved to.
    pub output: PathBuf,
    /// SVG figure of the whole recording.
    pub plot_output: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if [`BAUD_VAR`] is set but is not a whole number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key-value source, falling back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let baud_rate = match lookup(BAUD_VAR) {
            Some(baud) => baud
                .trim()
                .parse()
                .wrap_err_with(|| format!("{BAUD_VAR} must be a whole number, got {baud:?}"))?,
            None => DEFAULT_BAUD_RATE,
        };
        Ok(Self {
            port: lookup(PORT_VAR).unwrap_or_else(|| DEFAULT_PORT.to_owned()),
            baud_rate,
            output: lookup(OUTPUT_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            plot_output: lookup(PLOT_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PLOT)),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_in(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.baud_rate, 921_600);
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.plot_output, PathBuf::from(DEFAULT_PLOT));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_in(&[
            (PORT_VAR, "COM3"),
            (BAUD_VAR, " 115200 "),
            (OUTPUT_VAR, "/tmp/run1.txt"),
            (PLOT_VAR, "/tmp/run1.svg"),
        ]))
        .unwrap();
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.output, PathBuf::from("/tmp/run1.txt"));
        assert_eq!(config.plot_output, PathBuf::from("/tmp/run1.svg"));
    }

    #[test]
    fn test_invalid_baud() {
        assert!(Config::from_lookup(lookup_in(&[(BAUD_VAR, "fast")])).is_err());
    }
}
