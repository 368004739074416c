//! Quadrature decoding of the rotary encoder with the PCNT peripheral.
//!
//! Both channels of one unit count, each one on the edges of one phase while the other phase
//! selects the direction, so every edge of A and B is counted (4 counts per encoder line).

use core::{
    cell::RefCell,
    sync::atomic::{AtomicI32, Ordering},
};

use critical_section::Mutex;
use el_messages::encoder::{
    COUNTER_HIGH_LIMIT, COUNTER_LOW_LIMIT, GLITCH_FILTER_CYCLES, read_total_count,
};
use esp_hal::{
    gpio::{Input, InputConfig, InputPin, Pull},
    pcnt::{
        channel::{CtrlMode, EdgeMode},
        unit::{Counter, Unit},
    },
};

/// The pulse counter unit decoding the encoder, shared with the interrupt handler.
pub static ENCODER_UNIT: Mutex<RefCell<Option<Unit<'static, 0>>>> =
    Mutex::new(RefCell::new(None));

/// Counts accumulated by the interrupt handler each time the hardware counter hits a limit.
pub static OVERFLOW: AtomicI32 = AtomicI32::new(0);

/// Provides the accumulated pulse count of the encoder.
pub struct QuadratureEncoder {
    counter: Counter<'static, 0>,
    // The pins must outlive the PCNT signal routing.
    _phase_a: Input<'static>,
    _phase_b: Input<'static>,
}

impl QuadratureEncoder {
    /// Configures `unit` for full quadrature decoding of `phase_a`/`phase_b` and hands the unit to
    /// [`crate::gpio::interrupt_handler`].
    ///
    /// The unit is left paused; call [`Self::clear`] and [`Self::start`] when a run begins.
    ///
    /// # Panics
    /// Panics if the counter limits or glitch filter are out of range for the hardware, which
    /// would mean the constants in [`el_messages::encoder`] are wrong.
    pub fn new(
        unit: Unit<'static, 0>,
        phase_a: impl InputPin + 'static,
        phase_b: impl InputPin + 'static,
    ) -> Self {
        unit.set_low_limit(Some(COUNTER_LOW_LIMIT))
            .expect("Low counter limit should be valid");
        unit.set_high_limit(Some(COUNTER_HIGH_LIMIT))
            .expect("High counter limit should be valid");
        unit.set_filter(Some(GLITCH_FILTER_CYCLES))
            .expect("Glitch filter should fit in 10 bits");
        unit.clear();

        let config = InputConfig::default().with_pull(Pull::Up);
        let phase_a = Input::new(phase_a, config);
        let phase_b = Input::new(phase_b, config);
        let signal_a = phase_a.peripheral_input();
        let signal_b = phase_b.peripheral_input();

        // Channel 0 counts edges of A. Rising edges count down unless B is low.
        let ch0 = &unit.channel0;
        ch0.set_edge_signal(signal_a.clone());
        ch0.set_ctrl_signal(signal_b.clone());
        ch0.set_ctrl_mode(CtrlMode::Reverse, CtrlMode::Keep);
        ch0.set_input_mode(EdgeMode::Increment, EdgeMode::Decrement);

        // Channel 1 counts edges of B. Rising edges count up unless A is low.
        let ch1 = &unit.channel1;
        ch1.set_edge_signal(signal_b);
        ch1.set_ctrl_signal(signal_a);
        ch1.set_ctrl_mode(CtrlMode::Reverse, CtrlMode::Keep);
        ch1.set_input_mode(EdgeMode::Decrement, EdgeMode::Increment);

        unit.listen();
        let counter = unit.counter.clone();
        critical_section::with(|cs| ENCODER_UNIT.borrow_ref_mut(cs).replace(unit));

        Self {
            counter,
            _phase_a: phase_a,
            _phase_b: phase_b,
        }
    }

    /// Resets the hardware count and the overflow accumulator to zero.
    pub fn clear(&mut self) {
        critical_section::with(|cs| {
            if let Some(unit) = ENCODER_UNIT.borrow_ref_mut(cs).as_mut() {
                unit.clear();
            }
            OVERFLOW.store(0, Ordering::SeqCst);
        });
    }

    /// Starts (or resumes) counting.
    pub fn start(&mut self) {
        critical_section::with(|cs| {
            if let Some(unit) = ENCODER_UNIT.borrow_ref_mut(cs).as_mut() {
                unit.resume();
            }
        });
    }

    /// Stops counting. The count is kept until the next [`Self::clear`].
    pub fn pause(&mut self) {
        critical_section::with(|cs| {
            if let Some(unit) = ENCODER_UNIT.borrow_ref_mut(cs).as_mut() {
                unit.pause();
            }
        });
    }

    /// The pulse count since the last [`Self::clear`], including counter overflows.
    #[inline]
    pub fn count(&self) -> i32 {
        read_total_count(|| OVERFLOW.load(Ordering::SeqCst), || self.counter.get())
    }
}
