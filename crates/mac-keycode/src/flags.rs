//! CGEventFlags modifier bitmask.
//!
//! Bit positions follow CoreGraphics: the generic modifier bits live in the
//! upper half of the low word, the device-dependent (left/right) bits from
//! IOKit's `NX_DEVICE*KEYMASK` live in the low bits.

use bitflags::bitflags;

use crate::Key;

bitflags! {
    /// Modifier flags carried by a keyboard event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
    pub struct Flags: u64 {
        /// Left control (device bit).
        const LEFT_CONTROL = 0x0000_0001;
        /// Left shift (device bit).
        const LEFT_SHIFT = 0x0000_0002;
        /// Right shift (device bit).
        const RIGHT_SHIFT = 0x0000_0004;
        /// Left command (device bit).
        const LEFT_COMMAND = 0x0000_0008;
        /// Right command (device bit).
        const RIGHT_COMMAND = 0x0000_0010;
        /// Left option (device bit).
        const LEFT_OPTION = 0x0000_0020;
        /// Right option (device bit).
        const RIGHT_OPTION = 0x0000_0040;
        /// Right control (device bit).
        const RIGHT_CONTROL = 0x0000_2000;
        /// Caps lock is engaged.
        const ALPHA_SHIFT = 1 << 16;
        /// Either shift key.
        const SHIFT = 1 << 17;
        /// Either control key.
        const CONTROL = 1 << 18;
        /// Either option key.
        const OPTION = 1 << 19;
        /// Either command key.
        const COMMAND = 1 << 20;
        /// Key is on the numeric keypad.
        const NUMERIC_PAD = 1 << 21;
        /// Help key.
        const HELP = 1 << 22;
        /// Secondary fn.
        const FUNCTION = 1 << 23;
    }
}

impl Flags {
    /// Bits that participate in generic (side-agnostic) matching.
    pub const GENERIC_MASK: Self = Self::SHIFT
        .union(Self::CONTROL)
        .union(Self::OPTION)
        .union(Self::COMMAND)
        .union(Self::FUNCTION);

    /// Device-dependent left/right bits.
    pub const DEVICE_MASK: Self = Self::LEFT_CONTROL
        .union(Self::LEFT_SHIFT)
        .union(Self::RIGHT_SHIFT)
        .union(Self::LEFT_COMMAND)
        .union(Self::RIGHT_COMMAND)
        .union(Self::LEFT_OPTION)
        .union(Self::RIGHT_OPTION)
        .union(Self::RIGHT_CONTROL);

    /// Reduce raw event flags to the bits used for matching against `key_code`.
    ///
    /// Caps lock, keypad and help bits never participate. The fn bit is dropped
    /// for keys on which macOS reports it implicitly. Device bits are kept only
    /// when `left_right_specific` is set, and only alongside their generic bit.
    pub fn normalized(self, key_code: u16, left_right_specific: bool) -> Self {
        let mut out = self & Self::GENERIC_MASK;
        if Key::from_keycode(key_code).is_some_and(Key::implies_function_flag) {
            out.remove(Self::FUNCTION);
        }
        if left_right_specific {
            let pairs = [
                (Self::CONTROL, Self::LEFT_CONTROL | Self::RIGHT_CONTROL),
                (Self::SHIFT, Self::LEFT_SHIFT | Self::RIGHT_SHIFT),
                (Self::OPTION, Self::LEFT_OPTION | Self::RIGHT_OPTION),
                (Self::COMMAND, Self::LEFT_COMMAND | Self::RIGHT_COMMAND),
            ];
            for (generic, device) in pairs {
                if out.contains(generic) {
                    out |= self & device;
                }
            }
        }
        out
    }

    /// True if any of shift/control/option/command/fn is held.
    pub fn has_modifiers(self) -> bool {
        self.intersects(Self::GENERIC_MASK)
    }

    /// True if any device-dependent left/right bit is present.
    pub fn is_side_specific(self) -> bool {
        self.intersects(Self::DEVICE_MASK)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn generic_drops_device_bits_and_caps() {
        let raw = Flags::COMMAND | Flags::LEFT_COMMAND | Flags::ALPHA_SHIFT;
        assert_eq!(raw.normalized(Key::K as u16, false), Flags::COMMAND);
        assert_eq!(
            raw.normalized(Key::K as u16, true),
            Flags::COMMAND | Flags::LEFT_COMMAND
        );
    }

    #[test]
    fn implicit_fn_is_stripped_for_arrows_only() {
        let raw = Flags::FUNCTION | Flags::SHIFT;
        assert_eq!(raw.normalized(Key::LeftArrow as u16, false), Flags::SHIFT);
        assert_eq!(raw.normalized(Key::A as u16, false), raw);
    }

    #[test]
    fn orphan_device_bits_are_ignored() {
        // A device bit without its generic bit does not survive normalization.
        let raw = Flags::RIGHT_OPTION | Flags::SHIFT;
        assert_eq!(raw.normalized(Key::A as u16, true), Flags::SHIFT);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(bits in any::<u64>(), code in 0u16..0x80, specific in any::<bool>()) {
            let f = Flags::from_bits_retain(bits);
            let once = f.normalized(code, specific);
            prop_assert_eq!(once.normalized(code, specific), once);
        }

        #[test]
        fn generic_is_a_subset_of_specific(bits in any::<u64>(), code in 0u16..0x80) {
            let f = Flags::from_bits_retain(bits);
            let generic = f.normalized(code, false);
            let specific = f.normalized(code, true);
            prop_assert!(specific.contains(generic));
            prop_assert_eq!(specific & Flags::GENERIC_MASK, generic);
        }
    }
}
