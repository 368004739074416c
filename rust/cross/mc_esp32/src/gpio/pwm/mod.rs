//! This module contains the PWM output constants and the actuator driven by the PWM output.
//!
use el_messages::DutyScaler;
use esp_hal::{mcpwm::operator::PwmPin, peripherals::MCPWM0, time::Rate};

// PWM output constants
/// The MOSFET switching the cooler is driven at 100 Hz.
pub const FREQUENCY: Rate = Rate::from_hz(el_messages::PWM_FREQUENCY_HZ);

/// This prescaler is what lowers the peripheral clock frequency down to a level that is usable by the timer.
///
/// The timer has its own prescaler, which it can determine automatically as long as the equation
///
/// `timer_prescaler` = `160_000_000` / ([`PERIPHERAL_CLOCK_PRESCALER`] + 1) / ([`PERIOD`] + 1) / [`FREQUENCY`] - 1
///
/// results in a value in the range 0..[`u8::MAX`].
///
/// With no peripheral prescaling, `timer_prescaler` = `160_000_000` / `8000` / `100` - 1 = `199`.
pub const PERIPHERAL_CLOCK_PRESCALER: u8 = 0;

/// The value corresponding to 100% PWM period - 1.
///
/// [`el_messages::PWM_PERIOD`] is the closest value to the 8191 steps of a 13-bit resolution
/// that still results in a whole-numbered `timer_prescaler`.
/// If it did not, [`esp_hal`](esp_hal::mcpwm::PeripheralClockConfig::timer_clock_with_frequency) would round it,
/// resulting in a loss of PWM output accuracy.
pub const PERIOD: u16 = el_messages::PWM_PERIOD - 1;

/// The PWM-driven actuator (cooler fan behind a MOSFET).
pub struct Actuator {
    pin: PwmPin<'static, MCPWM0<'static>, 0, true>,
    scaler: DutyScaler,
    duty_percent: f32,
}

impl Actuator {
    /// Wraps an already started PWM pin. The output is set to 0% immediately.
    pub fn new(pin: PwmPin<'static, MCPWM0<'static>, 0, true>, scaler: DutyScaler) -> Self {
        let mut actuator = Self {
            pin,
            scaler,
            duty_percent: 0.0,
        };
        actuator.set_duty(0.0);
        actuator
    }

    /// Applies a duty cycle in percent, scaled to the actuator rating.
    ///
    /// See [`DutyScaler::sanitize`] for out of range commands. [`Self::duty_percent`] reports the
    /// value actually applied.
    pub fn set_duty(&mut self, duty_percent: f32) {
        let duty_percent = DutyScaler::sanitize(duty_percent);
        self.pin.set_timestamp(self.scaler.counts(duty_percent));
        self.duty_percent = duty_percent;
    }

    /// The last applied duty cycle in percent.
    #[inline]
    pub fn duty_percent(&self) -> f32 {
        self.duty_percent
    }
}
