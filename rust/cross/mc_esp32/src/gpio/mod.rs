use core::sync::atomic::Ordering;

use el_messages::LimitEvent;
use esp_hal::handler;

use crate::gpio::encoder::{ENCODER_UNIT, OVERFLOW};

pub mod encoder;
pub mod pwm;

/// The handler for all pulse counter interrupts.
///
/// Only the encoder's unit listens for events, and only for its count limits. When the hardware
/// count resets at a limit, the limit is added to [`OVERFLOW`] so the total count stays continuous.
#[handler]
pub fn interrupt_handler() {
    critical_section::with(|cs| {
        let mut unit = ENCODER_UNIT.borrow_ref_mut(cs);
        let Some(unit) = unit.as_mut() else {
            // The interrupt fired before the encoder was set up.
            return;
        };
        if !unit.interrupt_is_set() {
            return;
        }
        let events = unit.events();
        let limit = if events.high_limit {
            Some(LimitEvent::High)
        } else if events.low_limit {
            Some(LimitEvent::Low)
        } else {
            None
        };
        if let Some(limit) = limit {
            OVERFLOW.fetch_add(limit.overflow_step(), Ordering::SeqCst);
        }
        unit.reset_interrupt();
    });
}
