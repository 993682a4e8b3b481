//! Terminal modes (ANSI + DEC private).
//!
//! Boolean modes are bitflags; modes with more than two values (mouse
//! tracking, mouse encoding, keypad, compatibility level) are enums. Screen
//! switching (47/1047/1049), column mode (3), and VT52 (2) need emulator
//! cooperation and are handled there; this module only stores the result.

use bitflags::bitflags;

bitflags! {
    /// DEC private boolean modes (`CSI ? Pm h` / `CSI ? Pm l`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DecModes: u32 {
        /// DECCKM (1): application cursor keys.
        const APPLICATION_CURSOR = 1 << 0;
        /// DECSCNM (5): reverse video.
        const REVERSE_VIDEO = 1 << 1;
        /// DECOM (6): cursor addressing relative to the margins.
        const ORIGIN = 1 << 2;
        /// DECAWM (7): autowrap at the right margin.
        const AUTOWRAP = 1 << 3;
        /// DECARM (8): keyboard auto-repeat.
        const AUTO_REPEAT = 1 << 4;
        /// att610 (12): blinking cursor.
        const CURSOR_BLINK = 1 << 5;
        /// DECTCEM (25): cursor visible.
        const CURSOR_VISIBLE = 1 << 6;
        /// DECBKM (67): backarrow key sends BS instead of DEL.
        const BACKARROW_SENDS_BS = 1 << 7;
        /// DECLRMM (69): left/right margins enabled.
        const HORIZONTAL_MARGINS = 1 << 8;
        /// 1004: focus in/out reports.
        const FOCUS_EVENTS = 1 << 9;
        /// 1007: alternate scroll (wheel sends cursor keys on the alt screen).
        const ALT_SCROLL = 1 << 10;
        /// 2004: bracketed paste.
        const BRACKETED_PASTE = 1 << 11;
    }
}

bitflags! {
    /// ANSI standard modes (`CSI Pm h` / `CSI Pm l`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnsiModes: u8 {
        /// KAM (2): keyboard locked.
        const KEYBOARD_LOCK = 1 << 0;
        /// IRM (4): insert mode.
        const INSERT = 1 << 1;
        /// SRM (12): local echo off.
        const SEND_RECEIVE = 1 << 2;
        /// LNM (20): line feed also returns the carriage.
        const LINEFEED_NEWLINE = 1 << 3;
    }
}

/// Mouse tracking mode; the value is the DEC mode number that enables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseTracking {
    #[default]
    None,
    X10,
    Normal,
    Highlight,
    ButtonEvent,
    AnyEvent,
}

impl MouseTracking {
    #[must_use]
    pub fn from_mode(mode: u16) -> Option<Self> {
        match mode {
            9 => Some(Self::X10),
            1000 => Some(Self::Normal),
            1001 => Some(Self::Highlight),
            1002 => Some(Self::ButtonEvent),
            1003 => Some(Self::AnyEvent),
            _ => None,
        }
    }

    /// The enabling DEC mode number, or `None` when tracking is off.
    #[must_use]
    pub fn mode(self) -> Option<u16> {
        match self {
            Self::None => None,
            Self::X10 => Some(9),
            Self::Normal => Some(1000),
            Self::Highlight => Some(1001),
            Self::ButtonEvent => Some(1002),
            Self::AnyEvent => Some(1003),
        }
    }
}

/// Mouse report encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseEncoding {
    #[default]
    Default,
    Utf8,
    Sgr,
    Urxvt,
}

impl MouseEncoding {
    #[must_use]
    pub fn from_mode(mode: u16) -> Option<Self> {
        match mode {
            1005 => Some(Self::Utf8),
            1006 => Some(Self::Sgr),
            1015 => Some(Self::Urxvt),
            _ => None,
        }
    }

    #[must_use]
    pub fn mode(self) -> Option<u16> {
        match self {
            Self::Default => None,
            Self::Utf8 => Some(1005),
            Self::Sgr => Some(1006),
            Self::Urxvt => Some(1015),
        }
    }
}

/// Keypad mode (DECKPAM / DECKPNM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeypadMode {
    #[default]
    Numeric,
    Application,
}

/// Conformance level (DECANM, DECSCL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompatLevel {
    Vt52,
    Vt100,
    #[default]
    Vt400,
}

/// Combined mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes {
    pub dec: DecModes,
    pub ansi: AnsiModes,
    pub mouse_tracking: MouseTracking,
    pub mouse_encoding: MouseEncoding,
    pub keypad: KeypadMode,
    pub compat_level: CompatLevel,
    /// DECCOLM (3): 132-column mode requested.
    pub column_132: bool,
    /// XTMODKEYS `modifyOtherKeys` level.
    pub modify_other_keys: u16,
}

impl Default for Modes {
    fn default() -> Self {
        Self::new()
    }
}

impl Modes {
    /// Power-on defaults: autowrap, visible cursor, auto-repeat.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dec: DecModes::AUTOWRAP | DecModes::CURSOR_VISIBLE | DecModes::AUTO_REPEAT,
            ansi: AnsiModes::empty(),
            mouse_tracking: MouseTracking::None,
            mouse_encoding: MouseEncoding::Default,
            keypad: KeypadMode::Numeric,
            compat_level: CompatLevel::Vt400,
            column_132: false,
            modify_other_keys: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn origin_mode(&self) -> bool {
        self.dec.contains(DecModes::ORIGIN)
    }

    #[must_use]
    pub fn autowrap(&self) -> bool {
        self.dec.contains(DecModes::AUTOWRAP)
    }

    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.dec.contains(DecModes::CURSOR_VISIBLE)
    }

    #[must_use]
    pub fn reverse_video(&self) -> bool {
        self.dec.contains(DecModes::REVERSE_VIDEO)
    }

    #[must_use]
    pub fn application_cursor_keys(&self) -> bool {
        self.dec.contains(DecModes::APPLICATION_CURSOR)
    }

    #[must_use]
    pub fn horizontal_margins(&self) -> bool {
        self.dec.contains(DecModes::HORIZONTAL_MARGINS)
    }

    #[must_use]
    pub fn bracketed_paste(&self) -> bool {
        self.dec.contains(DecModes::BRACKETED_PASTE)
    }

    #[must_use]
    pub fn focus_events(&self) -> bool {
        self.dec.contains(DecModes::FOCUS_EVENTS)
    }

    #[must_use]
    pub fn alt_scroll(&self) -> bool {
        self.dec.contains(DecModes::ALT_SCROLL)
    }

    /// Whether the backarrow key sends DEL (the default) rather than BS.
    #[must_use]
    pub fn backspace_sends_delete(&self) -> bool {
        !self.dec.contains(DecModes::BACKARROW_SENDS_BS)
    }

    #[must_use]
    pub fn insert_mode(&self) -> bool {
        self.ansi.contains(AnsiModes::INSERT)
    }

    #[must_use]
    pub fn linefeed_newline(&self) -> bool {
        self.ansi.contains(AnsiModes::LINEFEED_NEWLINE)
    }

    // ── By number ───────────────────────────────────────────────────────

    /// Set a DEC private mode by number. Returns `true` if recognized.
    pub fn set_dec_mode(&mut self, mode: u16, enabled: bool) -> bool {
        if let Some(flag) = Self::dec_flag_for_mode(mode) {
            self.dec.set(flag, enabled);
            return true;
        }
        if let Some(tracking) = MouseTracking::from_mode(mode) {
            if enabled {
                self.mouse_tracking = tracking;
            } else if self.mouse_tracking == tracking {
                self.mouse_tracking = MouseTracking::None;
            }
            return true;
        }
        if let Some(encoding) = MouseEncoding::from_mode(mode) {
            if enabled {
                self.mouse_encoding = encoding;
            } else if self.mouse_encoding == encoding {
                self.mouse_encoding = MouseEncoding::Default;
            }
            return true;
        }
        false
    }

    /// Query a DEC private mode: `Some(set)` if recognized.
    #[must_use]
    pub fn dec_mode(&self, mode: u16) -> Option<bool> {
        if let Some(flag) = Self::dec_flag_for_mode(mode) {
            return Some(self.dec.contains(flag));
        }
        if let Some(tracking) = MouseTracking::from_mode(mode) {
            return Some(self.mouse_tracking == tracking);
        }
        if let Some(encoding) = MouseEncoding::from_mode(mode) {
            return Some(self.mouse_encoding == encoding);
        }
        match mode {
            2 => Some(self.compat_level != CompatLevel::Vt52),
            3 => Some(self.column_132),
            _ => None,
        }
    }

    /// Set an ANSI mode by number. Returns `true` if recognized.
    pub fn set_ansi_mode(&mut self, mode: u16, enabled: bool) -> bool {
        let Some(flag) = Self::ansi_flag_for_mode(mode) else {
            return false;
        };
        self.ansi.set(flag, enabled);
        true
    }

    #[must_use]
    pub fn ansi_mode(&self, mode: u16) -> Option<bool> {
        Self::ansi_flag_for_mode(mode).map(|flag| self.ansi.contains(flag))
    }

    fn dec_flag_for_mode(mode: u16) -> Option<DecModes> {
        match mode {
            1 => Some(DecModes::APPLICATION_CURSOR),
            5 => Some(DecModes::REVERSE_VIDEO),
            6 => Some(DecModes::ORIGIN),
            7 => Some(DecModes::AUTOWRAP),
            8 => Some(DecModes::AUTO_REPEAT),
            12 => Some(DecModes::CURSOR_BLINK),
            25 => Some(DecModes::CURSOR_VISIBLE),
            67 => Some(DecModes::BACKARROW_SENDS_BS),
            69 => Some(DecModes::HORIZONTAL_MARGINS),
            1004 => Some(DecModes::FOCUS_EVENTS),
            1007 => Some(DecModes::ALT_SCROLL),
            2004 => Some(DecModes::BRACKETED_PASTE),
            _ => None,
        }
    }

    fn ansi_flag_for_mode(mode: u16) -> Option<AnsiModes> {
        match mode {
            2 => Some(AnsiModes::KEYBOARD_LOCK),
            4 => Some(AnsiModes::INSERT),
            12 => Some(AnsiModes::SEND_RECEIVE),
            20 => Some(AnsiModes::LINEFEED_NEWLINE),
            _ => None,
        }
    }
}
