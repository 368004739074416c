//! Conversion from quadrature pulse counts to shaft angle.

/// Lines on the encoder disc.
pub const ENCODER_LINES: u32 = 2500;

/// Pulses per revolution when every edge of both phases is counted.
pub const PPR: u32 = ENCODER_LINES * 4;

/// The pulse counter wraps back to zero when it reaches either limit.
pub const COUNTER_HIGH_LIMIT: i16 = 10_000;
pub const COUNTER_LOW_LIMIT: i16 = -10_000;

/// Pulses shorter than this are treated as glitches and ignored.
pub const GLITCH_FILTER_NS: u32 = 1000;

/// [`GLITCH_FILTER_NS`] in APB clock cycles (80 MHz), the unit the PCNT filter is configured in.
///
/// The hardware filter register is 10 bits wide.
pub const GLITCH_FILTER_CYCLES: u16 = {
    let cycles = GLITCH_FILTER_NS * 80 / 1000;
    if cycles > 1023 { 1023 } else { cycles as u16 }
};

/// Counting direction relative to the physical rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Normal,
    /// The encoder is mounted so that positive counts mean negative angles.
    Inverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderScale {
    pub pulses_per_revolution: u32,
    pub direction: Direction,
}

impl EncoderScale {
    /// The scale of the lab rig: 2500-line encoder, mounted inverted.
    pub const RIG: EncoderScale = EncoderScale {
        pulses_per_revolution: PPR,
        direction: Direction::Inverted,
    };

    /// Shaft angle in degrees for an accumulated pulse count.
    pub fn angle_degrees(&self, count: i32) -> f32 {
        let degrees = 360.0 * count as f32 / self.pulses_per_revolution as f32;
        match self.direction {
            Direction::Normal => degrees,
            Direction::Inverted => -degrees,
        }
    }
}

impl Default for EncoderScale {
    fn default() -> Self {
        Self::RIG
    }
}

/// A counter limit was reached and the hardware count was reset to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitEvent {
    High,
    Low,
}

impl LimitEvent {
    /// The amount that must be added to the overflow accumulator to keep the total count continuous.
    pub fn overflow_step(self) -> i32 {
        match self {
            LimitEvent::High => i32::from(COUNTER_HIGH_LIMIT),
            LimitEvent::Low => i32::from(COUNTER_LOW_LIMIT),
        }
    }
}

/// Combines the accumulated overflow with the current hardware count.
#[inline]
pub fn total_count(overflow: i32, raw: i16) -> i32 {
    overflow.wrapping_add(i32::from(raw))
}

/// Reads the overflow and the hardware count as one consistent total.
///
/// The limit interrupt can reset the hardware count between the two reads, so the overflow is
/// read again afterwards and the pair is retried until it did not change.
pub fn read_total_count(
    mut load_overflow: impl FnMut() -> i32,
    mut read_raw: impl FnMut() -> i16,
) -> i32 {
    loop {
        let overflow = load_overflow();
        let raw = read_raw();
        if load_overflow() == overflow {
            return total_count(overflow, raw);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rig_angle() {
        let scale = EncoderScale::RIG;
        assert_eq!(scale.angle_degrees(0), 0.0);
        // A quarter turn in the counting direction reads as -90°.
        assert_eq!(scale.angle_degrees(2500), -90.0);
        assert_eq!(scale.angle_degrees(-2500), 90.0);
        assert_eq!(scale.angle_degrees(-10_000), 360.0);
    }

    #[test]
    fn test_normal_direction() {
        let scale = EncoderScale {
            pulses_per_revolution: 400,
            direction: Direction::Normal,
        };
        assert_eq!(scale.angle_degrees(100), 90.0);
    }

    /// Crossing the high limit twice and coming back below it must not jump the total.
    #[test]
    fn test_overflow_keeps_count_continuous() {
        let mut overflow = 0;
        // Hardware count reaches 10_000 and resets.
        overflow += LimitEvent::High.overflow_step();
        assert_eq!(total_count(overflow, 0), 10_000);
        assert_eq!(total_count(overflow, 1), 10_001);
        overflow += LimitEvent::High.overflow_step();
        assert_eq!(total_count(overflow, 250), 20_250);
        // Reversing past zero of the hardware counter.
        assert_eq!(total_count(overflow, -5), 19_995);
        overflow += LimitEvent::Low.overflow_step();
        assert_eq!(total_count(overflow, 0), 10_000);
    }

    #[test]
    fn test_read_across_a_wrap() {
        // The interrupt fires right after the first overflow read: the stale overflow would be
        // paired with the reset hardware count.
        let overflows = [0, 10_000, 10_000, 10_000];
        let raws = [0, 2];
        let (mut o, mut r) = (0, 0);
        let total = read_total_count(
            || {
                o += 1;
                overflows[o - 1]
            },
            || {
                r += 1;
                raws[r - 1]
            },
        );
        assert_eq!(total, 10_002);
        assert_eq!((o, r), (4, 2));
    }

    #[test]
    fn test_read_without_wrap() {
        assert_eq!(read_total_count(|| -10_000, || -3), -10_003);
    }

    #[test]
    fn test_glitch_filter_cycles() {
        assert_eq!(GLITCH_FILTER_CYCLES, 80);
    }
}
