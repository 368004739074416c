//! Duty cycle commands and their PWM compare values.

/// PWM frequency of the actuator output.
pub const PWM_FREQUENCY_HZ: u32 = 100;

/// The compare value corresponding to a 100% PWM duty cycle.
///
/// 160 MHz / 8000 / 100 Hz leaves a whole-numbered timer prescaler, see the firmware's `gpio::pwm`.
pub const PWM_PERIOD: u16 = 8000;

/// Constant duty cycle applied while a run is in progress.
pub const RUN_DUTY_PERCENT: f32 = 30.0;

/// Duty cycle applied when a run starts and after it ends.
pub const IDLE_DUTY_PERCENT: f32 = 0.0;

/// Voltage of the supply switched by the PWM output.
pub const SUPPLY_VOLTS: u16 = 24;

/// Highest voltage the actuator (cooler fan) is rated for.
pub const ACTUATOR_RATED_VOLTS: u16 = 16;

/// Maps a duty cycle in percent onto PWM compare values.
///
/// The supply is higher than the actuator rating, so 100% is scaled down to
/// `rated_volts / supply_volts` of the PWM period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyScaler {
    pub full_scale: u16,
    pub supply_volts: u16,
    pub rated_volts: u16,
}

impl DutyScaler {
    pub const fn new(full_scale: u16) -> Self {
        Self {
            full_scale,
            supply_volts: SUPPLY_VOLTS,
            rated_volts: ACTUATOR_RATED_VOLTS,
        }
    }

    /// The compare value of a 100% command.
    pub fn ceiling(&self) -> u16 {
        if self.supply_volts == 0 {
            return 0;
        }
        let rated = self.rated_volts.min(self.supply_volts);
        (u32::from(self.full_scale) * u32::from(rated) / u32::from(self.supply_volts)) as u16
    }

    /// The duty cycle actually applied for a command: clamped to 0..=100, and 0 for NaN or
    /// infinite commands.
    pub fn sanitize(duty_percent: f32) -> f32 {
        if duty_percent.is_finite() {
            duty_percent.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// The compare value for `duty_percent` after [`Self::sanitize`], truncated.
    pub fn counts(&self, duty_percent: f32) -> u16 {
        (Self::sanitize(duty_percent) * f32::from(self.ceiling()) / 100.0) as u16
    }
}

impl Default for DutyScaler {
    fn default() -> Self {
        Self::new(PWM_PERIOD)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ceiling_respects_rating() {
        assert_eq!(DutyScaler::new(8000).ceiling(), 5333);
        // 13-bit LEDC resolution.
        assert_eq!(DutyScaler::new(8191).ceiling(), 5460);
    }

    #[test]
    fn test_counts() {
        let scaler = DutyScaler::new(8191);
        assert_eq!(scaler.counts(0.0), 0);
        assert_eq!(scaler.counts(30.0), 1638);
        assert_eq!(scaler.counts(100.0), 5460);

        let scaler = DutyScaler::default();
        assert_eq!(scaler.counts(RUN_DUTY_PERCENT), 1599);
        assert_eq!(scaler.counts(IDLE_DUTY_PERCENT), 0);
    }

    #[test]
    fn test_counts_clamped() {
        let scaler = DutyScaler::default();
        assert_eq!(scaler.counts(150.0), scaler.ceiling());
        assert_eq!(scaler.counts(-5.0), 0);
    }

    #[test]
    fn test_non_finite_is_off() {
        let scaler = DutyScaler::default();
        for duty in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(scaler.counts(duty), 0);
            assert_eq!(DutyScaler::sanitize(duty), 0.0);
        }
        assert_eq!(DutyScaler::sanitize(150.0), 100.0);
        assert_eq!(DutyScaler::sanitize(-5.0), 0.0);
        assert_eq!(DutyScaler::sanitize(RUN_DUTY_PERCENT), RUN_DUTY_PERCENT);
    }

    /// An actuator rated above the supply can take the whole period.
    #[test]
    fn test_rating_above_supply() {
        let scaler = DutyScaler {
            full_scale: 1000,
            supply_volts: 12,
            rated_volts: 24,
        };
        assert_eq!(scaler.ceiling(), 1000);
    }
}
