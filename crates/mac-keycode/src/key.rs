//! Virtual keycode table (HIToolbox `kVK_*` values).

/// Declares the `Key` enum together with its name and keycode lookup tables.
macro_rules! define_keys {
    ( $( $name:ident = $code:literal, )* ) => {
        /// A macOS virtual keycode.
        #[repr(u16)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[allow(missing_docs)]
        pub enum Key {
            $( $name = $code, )*
        }

        impl Key {
            /// Every key in keycode order.
            pub const ALL: &'static [Self] = &[ $( Self::$name, )* ];

            /// Returns the canonical name for this key (the enum variant string).
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name), )*
                }
            }

            /// Looks up a `Key` from a hardware virtual keycode (HIToolbox kVK value).
            pub fn from_keycode(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$name), )*
                    _ => None,
                }
            }
        }
    };
}

define_keys! {
    A = 0x00,
    S = 0x01,
    D = 0x02,
    F = 0x03,
    H = 0x04,
    G = 0x05,
    Z = 0x06,
    X = 0x07,
    C = 0x08,
    V = 0x09,
    B = 0x0B,
    Q = 0x0C,
    W = 0x0D,
    E = 0x0E,
    R = 0x0F,
    Y = 0x10,
    T = 0x11,
    Digit1 = 0x12,
    Digit2 = 0x13,
    Digit3 = 0x14,
    Digit4 = 0x15,
    Digit6 = 0x16,
    Digit5 = 0x17,
    Equal = 0x18,
    Digit9 = 0x19,
    Digit7 = 0x1A,
    Minus = 0x1B,
    Digit8 = 0x1C,
    Digit0 = 0x1D,
    RightBracket = 0x1E,
    O = 0x1F,
    U = 0x20,
    LeftBracket = 0x21,
    I = 0x22,
    P = 0x23,
    Return = 0x24,
    L = 0x25,
    J = 0x26,
    Quote = 0x27,
    K = 0x28,
    Semicolon = 0x29,
    Backslash = 0x2A,
    Comma = 0x2B,
    Slash = 0x2C,
    N = 0x2D,
    M = 0x2E,
    Period = 0x2F,
    Tab = 0x30,
    Space = 0x31,
    Grave = 0x32,
    Delete = 0x33,
    Escape = 0x35,
    RightCommand = 0x36,
    Command = 0x37,
    Shift = 0x38,
    CapsLock = 0x39,
    Option = 0x3A,
    Control = 0x3B,
    RightShift = 0x3C,
    RightOption = 0x3D,
    RightControl = 0x3E,
    Function = 0x3F,
    F17 = 0x40,
    KeypadDecimal = 0x41,
    KeypadMultiply = 0x43,
    KeypadPlus = 0x45,
    KeypadClear = 0x47,
    VolumeUp = 0x48,
    VolumeDown = 0x49,
    Mute = 0x4A,
    KeypadDivide = 0x4B,
    KeypadEnter = 0x4C,
    KeypadMinus = 0x4E,
    F18 = 0x4F,
    F19 = 0x50,
    KeypadEquals = 0x51,
    Keypad0 = 0x52,
    Keypad1 = 0x53,
    Keypad2 = 0x54,
    Keypad3 = 0x55,
    Keypad4 = 0x56,
    Keypad5 = 0x57,
    Keypad6 = 0x58,
    Keypad7 = 0x59,
    F20 = 0x5A,
    Keypad8 = 0x5B,
    Keypad9 = 0x5C,
    F5 = 0x60,
    F6 = 0x61,
    F7 = 0x62,
    F3 = 0x63,
    F8 = 0x64,
    F9 = 0x65,
    F11 = 0x67,
    F13 = 0x69,
    F16 = 0x6A,
    F14 = 0x6B,
    F10 = 0x6D,
    ContextualMenu = 0x6E,
    F12 = 0x6F,
    F15 = 0x71,
    Help = 0x72,
    Home = 0x73,
    PageUp = 0x74,
    ForwardDelete = 0x75,
    F4 = 0x76,
    End = 0x77,
    F2 = 0x78,
    PageDown = 0x79,
    F1 = 0x7A,
    LeftArrow = 0x7B,
    RightArrow = 0x7C,
    DownArrow = 0x7D,
    UpArrow = 0x7E,
}

impl Key {
    /// Case-insensitive lookup of a `Key` from its name.
    ///
    /// Accepts strings like "Tab", "tab", or "TAB".
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// True for keys on which macOS sets the secondary-fn flag on its own
    /// (arrows, function row, navigation cluster).
    pub fn implies_function_flag(self) -> bool {
        matches!(
            self,
            Self::LeftArrow
                | Self::RightArrow
                | Self::UpArrow
                | Self::DownArrow
                | Self::Home
                | Self::End
                | Self::PageUp
                | Self::PageDown
                | Self::ForwardDelete
                | Self::Help
                | Self::F1
                | Self::F2
                | Self::F3
                | Self::F4
                | Self::F5
                | Self::F6
                | Self::F7
                | Self::F8
                | Self::F9
                | Self::F10
                | Self::F11
                | Self::F12
                | Self::F13
                | Self::F14
                | Self::F15
                | Self::F16
                | Self::F17
                | Self::F18
                | Self::F19
                | Self::F20
        )
    }

    /// True for the physical modifier keys (these arrive as flagsChanged events).
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Command
                | Self::RightCommand
                | Self::Shift
                | Self::RightShift
                | Self::Option
                | Self::RightOption
                | Self::Control
                | Self::RightControl
                | Self::CapsLock
                | Self::Function
        )
    }
}
