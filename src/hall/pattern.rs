// Hall code and commutation pattern table
// Encodes the legal Hall sequence 1 -> 3 -> 2 -> 6 -> 4 -> 5 -> 1

use crate::posif::HallEvent;

/// One of the three Hall sensor lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub enum HallLine {
    H1,
    H2,
    H3,
}

impl HallLine {
    pub const ALL: [HallLine; 3] = [HallLine::H1, HallLine::H2, HallLine::H3];

    /// Bit position of this line inside a `HallCode`
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            HallLine::H1 => 0,
            HallLine::H2 => 1,
            HallLine::H3 => 2,
        }
    }
}

/// Raw 3-bit Hall reading: bit0 = H1, bit1 = H2, bit2 = H3
///
/// 0 (all low) and 7 (all high) are sensor fault / disconnected states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub struct HallCode(u8);

impl HallCode {
    /// Code substituted for the sentinel readings 0 and 7
    pub const FALLBACK: HallCode = HallCode(1);

    /// Build a code from the low three bits of `bits`
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    /// Compose `h1 | h2 << 1 | h3 << 2`
    #[inline]
    pub const fn from_lines(h1: bool, h2: bool, h3: bool) -> Self {
        Self((h1 as u8) | ((h2 as u8) << 1) | ((h3 as u8) << 2))
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Level of a single line in this code
    #[inline]
    pub const fn line(self, line: HallLine) -> bool {
        (self.0 >> line.bit()) & 1 != 0
    }

    /// `true` for 1..=6
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 != 7
    }

    /// Replace a sentinel reading with `FALLBACK`
    #[inline]
    pub const fn or_fallback(self) -> Self {
        if self.is_valid() {
            self
        } else {
            Self::FALLBACK
        }
    }
}

/// Legal commutation cycle, one electrical revolution
pub const HALL_SEQUENCE: [u8; 6] = [1, 3, 2, 6, 4, 5];

/// Expected-next / current pair programmed into the position interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", not(test)), derive(defmt::Format))]
pub struct HallPattern {
    pub expected: HallCode,
    pub current: HallCode,
}

/// Pattern table indexed by current code
/// Sentinel codes 0 and 7 have no valid successor and map to (0, 0)
pub const HALL_PATTERN_TABLE: [HallPattern; 8] = [
    HallPattern::SENTINEL,  // 0b000: fault
    HallPattern::new(3, 1), // 0b001: 1 -> 3
    HallPattern::new(6, 2), // 0b010: 2 -> 6
    HallPattern::new(2, 3), // 0b011: 3 -> 2
    HallPattern::new(5, 4), // 0b100: 4 -> 5
    HallPattern::new(1, 5), // 0b101: 5 -> 1
    HallPattern::new(4, 6), // 0b110: 6 -> 4
    HallPattern::SENTINEL,  // 0b111: fault
];

impl HallPattern {
    pub const SENTINEL: HallPattern = HallPattern::new(0, 0);

    pub const fn new(expected: u8, current: u8) -> Self {
        Self {
            expected: HallCode::from_bits(expected),
            current: HallCode::from_bits(current),
        }
    }

    /// Table entry for `code` (sentinel for 0 and 7)
    #[inline]
    pub const fn lookup(code: HallCode) -> Self {
        HALL_PATTERN_TABLE[code.bits() as usize]
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// Hardware register layout: `expected << 3 | current`
    #[inline]
    pub const fn pack(self) -> u8 {
        (self.expected.bits() << 3) | self.current.bits()
    }

    #[inline]
    pub const fn unpack(packed: u8) -> Self {
        Self {
            expected: HallCode::from_bits(packed >> 3),
            current: HallCode::from_bits(packed),
        }
    }

    /// Compare the code seen after an edge against this pattern
    ///
    /// Expected code is a correct transition, the current code again raises nothing,
    /// anything else is a wrong transition.
    #[inline]
    pub fn classify(&self, code: HallCode) -> Option<HallEvent> {
        if code == self.expected {
            Some(HallEvent::Correct)
        } else if code == self.current {
            None
        } else {
            Some(HallEvent::Wrong)
        }
    }
}
