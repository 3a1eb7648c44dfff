// Hall pattern driver
// Samples the Hall lines every main-loop iteration and programs the expected/current pair
// so the position interface can classify the next transition.

use crate::fmt::*;
use crate::hall::pattern::{HallCode, HallPattern};
use crate::posif::{CaptureTimer, HallInputs, PositionInterface};

pub struct PatternDriver {
    /// Number of sentinel readings (0 / 7) replaced by the fallback code
    substitutions: u32,
    /// Last pattern handed to the position interface
    last_pattern: Option<HallPattern>,
}

impl PatternDriver {
    pub const fn new() -> Self {
        Self {
            substitutions: 0,
            last_pattern: None,
        }
    }

    /// Read the Hall lines, look up the table and latch the pattern
    ///
    /// Sentinel readings are replaced by `HallCode::FALLBACK` before lookup, so the
    /// sentinel pair is never programmed.
    ///
    /// # Returns
    /// The pattern that was programmed
    pub fn update<I, P>(&mut self, inputs: &mut I, posif: &mut P) -> HallPattern
    where
        I: HallInputs + ?Sized,
        P: PositionInterface + ?Sized,
    {
        let raw = inputs.read_code();
        let code = if raw.is_valid() {
            raw
        } else {
            self.substitutions = self.substitutions.wrapping_add(1);
            debug!(
                "Hall sensor fault code {}, using fallback {}",
                raw.bits(),
                HallCode::FALLBACK.bits()
            );
            HallCode::FALLBACK
        };

        let pattern = HallPattern::lookup(code);
        posif.set_hall_patterns(pattern.pack());
        posif.update_hall_pattern();

        if self.last_pattern != Some(pattern) {
            trace!(
                "Hall pattern: current={}, expected={}",
                pattern.current.bits(),
                pattern.expected.bits()
            );
            self.last_pattern = Some(pattern);
        }

        pattern
    }

    /// Arm the measurement once warm-up has elapsed
    ///
    /// Starts the position interface, programs the first pattern and then starts the
    /// capture timer, so the first capture is classified against a latched pattern.
    pub fn start_measurement<I, P, T>(
        &mut self,
        inputs: &mut I,
        posif: &mut P,
        timer: &mut T,
    ) -> HallPattern
    where
        I: HallInputs + ?Sized,
        P: PositionInterface + ?Sized,
        T: CaptureTimer + ?Sized,
    {
        posif.start();
        let pattern = self.update(inputs, posif);
        timer.start();
        pattern
    }

    /// Sentinel readings replaced so far
    pub fn substitutions(&self) -> u32 {
        self.substitutions
    }

    pub fn last_pattern(&self) -> Option<HallPattern> {
        self.last_pattern
    }
}

impl Default for PatternDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hall::pattern::HALL_SEQUENCE;
    use crate::posif::mock::{MockInputs, MockPosif, MockTimer};

    #[test]
    fn test_programs_successor_for_valid_codes() {
        let mut driver = PatternDriver::new();
        let mut posif = MockPosif::default();

        for (i, &current) in HALL_SEQUENCE.iter().enumerate() {
            let next = HALL_SEQUENCE[(i + 1) % HALL_SEQUENCE.len()];
            let mut inputs = MockInputs(HallCode::from_bits(current));

            let pattern = driver.update(&mut inputs, &mut posif);

            assert_eq!(pattern.current.bits(), current);
            assert_eq!(pattern.expected.bits(), next);
            assert_eq!(posif.active, Some((next << 3) | current));
        }

        assert_eq!(driver.substitutions(), 0);
        assert_eq!(posif.latches, HALL_SEQUENCE.len());
    }

    #[test]
    fn test_sentinel_codes_use_fallback() {
        let mut driver = PatternDriver::new();
        let mut posif = MockPosif::default();

        for raw in [0u8, 7] {
            let mut inputs = MockInputs(HallCode::from_bits(raw));
            let pattern = driver.update(&mut inputs, &mut posif);

            assert!(!pattern.is_sentinel());
            assert_eq!(pattern, HallPattern::lookup(HallCode::FALLBACK));
        }

        // 1 -> 3
        assert_eq!(posif.programmed, [0b011_001, 0b011_001]);
        assert!(!posif.programmed.contains(&0));
        assert_eq!(driver.substitutions(), 2);
    }

    #[test]
    fn test_every_update_latches() {
        let mut driver = PatternDriver::new();
        let mut posif = MockPosif::default();
        let mut inputs = MockInputs(HallCode::from_bits(2));

        for _ in 0..3 {
            driver.update(&mut inputs, &mut posif);
        }

        assert_eq!(posif.programmed.len(), 3);
        assert_eq!(posif.latches, 3);
        assert_eq!(driver.last_pattern(), Some(HallPattern::new(6, 2)));
    }

    #[test]
    fn test_start_measurement_arms_everything() {
        let mut driver = PatternDriver::new();
        let mut posif = MockPosif::default();
        let mut timer = MockTimer::default();
        let mut inputs = MockInputs(HallCode::from_bits(0));

        let pattern = driver.start_measurement(&mut inputs, &mut posif, &mut timer);

        assert!(posif.started);
        assert!(timer.started);
        // Fallback applies on the arming path too
        assert_eq!(pattern, HallPattern::lookup(HallCode::FALLBACK));
        assert_eq!(posif.active, Some(0b011_001));
        assert_eq!(driver.substitutions(), 1);
    }
}
