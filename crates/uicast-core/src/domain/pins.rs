//! Digital I/O pin state of a polled hardware port.

use std::fmt;

/// Identifies one 8-pin port on the controlled device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(pub u8);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Levels of the eight pins of a port.
///
/// Bit `i` of the port's integer value is pin `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinState(pub [bool; 8]);

impl PinState {
    pub fn from_bits(value: u8) -> Self {
        let mut pins = [false; 8];
        for (i, pin) in pins.iter_mut().enumerate() {
            *pin = (value >> i) & 1 == 1;
        }
        Self(pins)
    }

    pub fn bits(&self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &on)| if on { acc | (1 << i) } else { acc })
    }

    pub fn get(&self, pin: usize) -> bool {
        self.0.get(pin).copied().unwrap_or(false)
    }

    /// Returns the port value with `pin` flipped.
    pub fn toggled(&self, pin: usize) -> u8 {
        if pin >= 8 {
            return self.bits();
        }
        self.bits() ^ (1 << pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bits_decodes_low_bit_first() {
        // 15 = 0b0000_1111: pins 0..=3 high
        let pins = PinState::from_bits(15);
        assert_eq!(
            pins.0,
            [true, true, true, true, false, false, false, false]
        );
    }

    #[test]
    fn test_bits_inverts_from_bits() {
        for value in [0u8, 1, 0x80, 0xA5, 0xFF] {
            assert_eq!(PinState::from_bits(value).bits(), value);
        }
    }

    #[test]
    fn test_toggled_flips_single_pin() {
        let pins = PinState::from_bits(0b0000_0001);
        assert_eq!(pins.toggled(0), 0);
        assert_eq!(pins.toggled(3), 0b0000_1001);
    }

    #[test]
    fn test_toggled_out_of_range_is_unchanged() {
        let pins = PinState::from_bits(0x42);
        assert_eq!(pins.toggled(8), 0x42);
        assert!(!pins.get(8));
    }
}
