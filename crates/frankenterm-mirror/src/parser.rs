//! VT/ANSI/VT52 parser.
//!
//! A deterministic state machine that turns the host's output stream into
//! [`Handler`] records. It covers:
//!
//! - printable graphemes (UTF-8 mode) and printable bytes (legacy byte mode)
//! - C0 controls, and C1 controls in byte mode
//! - ESC sequences, including charset designation and locking/single shifts
//! - CSI sequences with private (`?`, `>`) and intermediate (`!`, ` `, `'`,
//!   `"`, `$`) variants
//! - OSC and DCS strings terminated by BEL or ST
//! - the VT52 escape grammar while VT52 compatibility is active
//!
//! Input is decoded as UTF-8 and segmented into extended grapheme clusters
//! until a non-UTF-8 character set is designated. From then on bytes are
//! fed one at a time ("byte mode") until every G slot holds UTF-8 again.
//! Parser state persists across [`Parser::process`] calls, so sequences and
//! UTF-8 characters may be split anywhere.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, info, trace, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::charset::Charset;
use crate::error::ParseError;
use crate::handler::{Action, EraseMode, Handler};

/// Most numeric parameters kept for one sequence.
pub const MAX_PARAMS: usize = 16;
/// Byte cap for OSC and DCS payloads.
pub const MAX_STRING_ARG: usize = 4095;
const HISTORY_LEN: usize = 5;

/// Parser FSM state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParserState {
    #[default]
    Normal,
    Escape,
    EscapeVt52,
    EscSpace,
    EscHash,
    EscPct,
    SelectCharset,
    Csi,
    CsiPriv,
    CsiQuote,
    CsiDblQuote,
    CsiBang,
    CsiSpace,
    CsiGt,
    CsiDollar,
    Dcs,
    DcsEsc,
    Osc,
    OscEsc,
    Vt52CursorRow,
    Vt52CursorCol,
}

impl ParserState {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Escape => "Escape",
            Self::EscapeVt52 => "Escape_VT52",
            Self::EscSpace => "Esc_Space",
            Self::EscHash => "Esc_Hash",
            Self::EscPct => "Esc_Pct",
            Self::SelectCharset => "Select_Charset",
            Self::Csi => "CSI",
            Self::CsiPriv => "CSI_Priv",
            Self::CsiQuote => "CSI_Quote",
            Self::CsiDblQuote => "CSI_DblQuote",
            Self::CsiBang => "CSI_Bang",
            Self::CsiSpace => "CSI_SPC",
            Self::CsiGt => "CSI_GT",
            Self::CsiDollar => "CSI_Dollar",
            Self::Dcs => "DCS",
            Self::DcsEsc => "DCS_Esc",
            Self::Osc => "OSC",
            Self::OscEsc => "OSC_Esc",
            Self::Vt52CursorRow => "VT52_Cursor_Row",
            Self::Vt52CursorCol => "VT52_Cursor_Col",
        }
    }

    fn is_string(self) -> bool {
        matches!(self, Self::Osc | Self::OscEsc | Self::Dcs | Self::DcsEsc)
    }
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// VT/ANSI parser state.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    state: ParserState,
    /// The character being processed.
    ch: char,
    params: Vec<u16>,
    /// `colon[i]`: `params[i]` was introduced by `:`.
    colon: Vec<bool>,
    private: bool,
    arg: String,
    /// Text of the sequence in progress.
    seq: String,
    history: VecDeque<char>,
    scs_dst: char,
    scs_mod: Option<char>,
    vt52_row: u16,
    /// Slots currently designated to a non-UTF-8 set.
    legacy_slots: [bool; 4],
    /// `ESC % @` selected ISO 2022 byte handling.
    legacy_docs: bool,
    vt_mode: bool,
    vt52: bool,
    /// Incomplete UTF-8 tail carried to the next call.
    pending: Vec<u8>,
    last_graphic: Option<String>,
    last_error: Option<ParseError>,
}

impl Parser {
    /// Create a new parser in the ground state, UTF-8 mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Whether input is currently processed byte by byte.
    #[must_use]
    pub fn is_vt_mode(&self) -> bool {
        self.vt_mode
    }

    /// Whether the VT52 escape grammar is active.
    #[must_use]
    pub fn is_vt52(&self) -> bool {
        self.vt52
    }

    /// The most recent diagnostic, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&ParseError> {
        self.last_error.as_ref()
    }

    /// Feed a chunk of output and return the recognized operations in order.
    #[must_use]
    pub fn process(&mut self, input: &[u8]) -> Vec<Handler> {
        let mut out = Vec::new();
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(input);

        let mut pos = 0;
        while pos < data.len() {
            if self.vt_mode {
                let b = data[pos];
                pos += 1;
                self.advance(char::from(b), true, &mut out);
            } else {
                pos += self.process_utf8(&data[pos..], &mut out);
            }
        }
        out
    }

    /// Decode and dispatch UTF-8 text. Returns the number of bytes consumed;
    /// stops early when a charset designation switches to byte mode.
    fn process_utf8(&mut self, bytes: &[u8], out: &mut Vec<Handler>) -> usize {
        let (text, invalid) = match std::str::from_utf8(bytes) {
            Ok(text) => (text, None),
            Err(err) => {
                let valid = err.valid_up_to();
                let text = std::str::from_utf8(&bytes[..valid]).unwrap_or_default();
                (text, Some((valid, err.error_len())))
            }
        };

        for (idx, grapheme) in text.grapheme_indices(true) {
            self.input_grapheme(grapheme, out);
            if self.vt_mode {
                debug!(state = %self.state, "parser switched to byte mode");
                return idx + grapheme.len();
            }
        }

        match invalid {
            None => bytes.len(),
            Some((valid, Some(bad))) => {
                self.input_grapheme("\u{fffd}", out);
                valid + bad
            }
            Some((valid, None)) => {
                self.pending = bytes[valid..].to_vec();
                bytes.len()
            }
        }
    }

    fn input_grapheme(&mut self, grapheme: &str, out: &mut Vec<Handler>) {
        let mut chars = grapheme.chars();
        let Some(first) = chars.next() else {
            return;
        };
        if chars.next().is_none() {
            self.advance(first, false, out);
            return;
        }

        match self.state {
            ParserState::Osc | ParserState::Dcs => {
                self.seq.push_str(grapheme);
                self.push_arg(grapheme);
            }
            ParserState::Normal if grapheme == "\r\n" => {
                self.advance('\r', false, out);
                self.advance('\n', false, out);
            }
            ParserState::Normal => {
                for ch in grapheme.chars() {
                    self.append_history(ch);
                }
                self.ch = first;
                self.print(Action::Print(grapheme.to_owned()), grapheme, out);
            }
            _ => {
                for ch in grapheme.chars() {
                    self.advance(ch, false, out);
                }
            }
        }
    }

    /// Advance the state machine by one character. In byte mode `ch` is the
    /// byte's Latin-1 reading.
    fn advance(&mut self, ch: char, byte_mode: bool, out: &mut Vec<Handler>) {
        if self.state == ParserState::Normal && ch == '\0' {
            return;
        }
        self.ch = ch;
        self.append_history(ch);

        if byte_mode && ('\u{80}'..='\u{9f}').contains(&ch) && self.c1_in_state(ch, out) {
            return;
        }
        if self.state != ParserState::Normal {
            self.seq.push(ch);
        }

        match self.state {
            ParserState::Normal => self.advance_normal(ch, byte_mode, out),
            ParserState::Escape => self.advance_escape(ch, out),
            ParserState::EscapeVt52 => self.advance_vt52(ch, out),
            ParserState::EscSpace => self.advance_esc_space(ch),
            ParserState::EscHash => self.advance_esc_hash(ch, out),
            ParserState::EscPct => self.advance_esc_pct(ch, out),
            ParserState::SelectCharset => self.advance_select_charset(ch, out),
            ParserState::Csi => self.advance_csi(ch, out),
            ParserState::CsiPriv => self.advance_csi_priv(ch, out),
            ParserState::CsiGt => self.advance_csi_gt(ch, out),
            ParserState::CsiBang
            | ParserState::CsiSpace
            | ParserState::CsiQuote
            | ParserState::CsiDblQuote
            | ParserState::CsiDollar => self.advance_csi_intermediate(ch, out),
            ParserState::Osc => self.advance_osc(ch, out),
            ParserState::OscEsc => self.advance_osc_esc(ch, out),
            ParserState::Dcs => self.advance_dcs(ch),
            ParserState::DcsEsc => self.advance_dcs_esc(ch, out),
            ParserState::Vt52CursorRow => {
                self.vt52_row = vt52_coordinate(ch);
                self.set_state(ParserState::Vt52CursorCol);
            }
            ParserState::Vt52CursorCol => {
                let row = self.vt52_row;
                self.finish(
                    Action::Vt52CursorAddress {
                        row,
                        col: vt52_coordinate(ch),
                    },
                    out,
                );
            }
        }
    }

    // ── Ground state ────────────────────────────────────────────────────

    fn advance_normal(&mut self, ch: char, byte_mode: bool, out: &mut Vec<Handler>) {
        match ch {
            '\x1b' => self.begin_escape(),
            '\r' => self.control(Action::CarriageReturn, out),
            '\n' | '\x0b' | '\x0c' => self.control(Action::LineFeed, out),
            '\t' => self.control(Action::Tab, out),
            '\x08' => self.control(Action::Backspace, out),
            '\x07' => self.control(Action::Bell, out),
            '\x0e' => self.control(Action::ShiftOut, out),
            '\x0f' => self.control(Action::ShiftIn, out),
            '\0'..='\x1f' | '\x7f' => trace!(ch = ?ch, "ignoring control character"),
            _ if byte_mode => {
                let b = ch as u32 as u8;
                let text = ch.to_string();
                self.print(Action::PrintByte(b), &text, out);
            }
            '\u{80}'..='\u{9f}' => trace!(ch = ?ch, "ignoring C1 code point in UTF-8 mode"),
            _ => {
                let text = ch.to_string();
                self.print(Action::Print(text.clone()), &text, out);
            }
        }
    }

    /// C1 controls, recognized in byte mode only. Returns true when `ch` was
    /// consumed.
    fn c1_in_state(&mut self, ch: char, out: &mut Vec<Handler>) -> bool {
        if self.state.is_string() {
            if ch == '\u{9c}' {
                self.seq.push(ch);
                match self.state {
                    ParserState::Osc | ParserState::OscEsc => self.dispatch_osc(out),
                    _ => self.dispatch_dcs(out),
                }
            } else {
                self.seq.push(ch);
                self.push_arg_char(ch);
            }
            return true;
        }
        if self.state != ParserState::Normal {
            debug!(state = %self.state, seq = ?self.seq, "C1 control aborts sequence");
            self.set_state(ParserState::Normal);
        }
        self.seq.clear();
        self.seq.push(ch);
        match ch {
            '\u{84}' => self.finish(Action::Index, out),
            '\u{85}' => self.finish(Action::NextLine, out),
            '\u{88}' => self.finish(Action::SetTabStop, out),
            '\u{8d}' => self.finish(Action::ReverseIndex, out),
            '\u{8e}' => self.finish(Action::SingleShift(2), out),
            '\u{8f}' => self.finish(Action::SingleShift(3), out),
            '\u{90}' => self.begin_string(ParserState::Dcs),
            '\u{9b}' => self.begin_csi(),
            '\u{9c}' => self.seq.clear(),
            '\u{9d}' => self.begin_string(ParserState::Osc),
            _ => {
                trace!(ch = ?ch, "ignoring C1 control");
                self.seq.clear();
            }
        }
        true
    }

    // ── ESC ─────────────────────────────────────────────────────────────

    fn begin_escape(&mut self) {
        self.seq.clear();
        self.seq.push('\x1b');
        self.state = if self.vt52 {
            ParserState::EscapeVt52
        } else {
            ParserState::Escape
        };
    }

    fn begin_csi(&mut self) {
        self.params.clear();
        self.params.push(0);
        self.colon.clear();
        self.colon.push(false);
        self.private = false;
        self.state = ParserState::Csi;
    }

    fn begin_string(&mut self, state: ParserState) {
        self.arg.clear();
        self.state = state;
    }

    fn advance_escape(&mut self, ch: char, out: &mut Vec<Handler>) {
        match ch {
            '\x18' | '\x1a' => self.set_state(ParserState::Normal),
            '\x1b' => self.begin_escape(),
            ' ' => self.set_state(ParserState::EscSpace),
            '#' => self.set_state(ParserState::EscHash),
            '%' => self.set_state(ParserState::EscPct),
            '[' => self.begin_csi(),
            ']' => self.begin_string(ParserState::Osc),
            'P' => self.begin_string(ParserState::Dcs),
            '(' | ')' | '*' | '+' | '-' | '.' | '/' | ',' | '$' => {
                self.scs_dst = ch;
                self.scs_mod = None;
                self.set_state(ParserState::SelectCharset);
            }
            'D' => self.finish(Action::Index, out),
            'E' => self.finish(Action::NextLine, out),
            'H' => self.finish(Action::SetTabStop, out),
            'M' => self.finish(Action::ReverseIndex, out),
            'N' => self.finish(Action::SingleShift(2), out),
            'O' => self.finish(Action::SingleShift(3), out),
            'c' => {
                self.legacy_slots = [false; 4];
                self.legacy_docs = false;
                self.vt52 = false;
                self.update_vt_mode();
                self.finish(Action::FullReset, out);
            }
            '7' => self.finish(Action::SaveCursor, out),
            '8' => self.finish(Action::RestoreCursor, out),
            '6' => self.finish(Action::BackIndex, out),
            '9' => self.finish(Action::ForwardIndex, out),
            '=' => self.finish(Action::KeypadApplication, out),
            '>' => self.finish(Action::KeypadNumeric, out),
            'n' => self.finish(Action::LockingShift { slot: 2, right: false }, out),
            'o' => self.finish(Action::LockingShift { slot: 3, right: false }, out),
            '~' => self.finish(Action::LockingShift { slot: 1, right: true }, out),
            '}' => self.finish(Action::LockingShift { slot: 2, right: true }, out),
            '|' => self.finish(Action::LockingShift { slot: 3, right: true }, out),
            // lone ST
            '\\' => self.set_state(ParserState::Normal),
            _ => self.unhandled(),
        }
    }

    fn advance_esc_space(&mut self, ch: char) {
        match ch {
            'F' => debug!("S7C1T: send 7-bit controls"),
            'G' => debug!("S8C1T: send 8-bit controls"),
            'L' | 'M' | 'N' => debug!(level = ?ch, "ANSI conformance level"),
            _ => return self.unhandled(),
        }
        self.set_state(ParserState::Normal);
    }

    fn advance_esc_hash(&mut self, ch: char, out: &mut Vec<Handler>) {
        match ch {
            '8' => self.finish(Action::ScreenAlignment, out),
            '3' | '4' | '5' | '6' => {
                debug!(seq = ?self.seq, "line size change not supported");
                self.set_state(ParserState::Normal);
            }
            _ => self.unhandled(),
        }
    }

    fn advance_esc_pct(&mut self, ch: char, out: &mut Vec<Handler>) {
        match ch {
            '@' => {
                self.legacy_docs = true;
                self.update_vt_mode();
                self.finish(Action::SelectUtf8(false), out);
            }
            'G' => {
                self.legacy_docs = false;
                self.update_vt_mode();
                self.finish(Action::SelectUtf8(true), out);
            }
            _ => self.unhandled(),
        }
    }

    fn advance_select_charset(&mut self, ch: char, out: &mut Vec<Handler>) {
        if ch < '\x30' {
            self.scs_mod = Some(ch);
            return;
        }
        let (slot, ninety_six) = match self.scs_dst {
            '(' => (0, false),
            ')' => (1, false),
            '*' => (2, false),
            '+' => (3, false),
            '-' => (1, true),
            '.' => (2, true),
            '/' => (3, true),
            _ => {
                debug!(seq = ?self.seq, "ISO 2022 designation absorbed");
                self.set_state(ParserState::Normal);
                return;
            }
        };
        let percent = self.scs_mod == Some('%');
        let Some(charset) = Charset::from_designation(ch, ninety_six, percent) else {
            return self.unhandled();
        };
        self.legacy_slots[usize::from(slot)] = charset != Charset::Utf8;
        self.update_vt_mode();
        self.finish(Action::DesignateCharset { slot, charset }, out);
    }

    fn update_vt_mode(&mut self) {
        self.vt_mode = self.legacy_docs || self.legacy_slots.iter().any(|&s| s);
    }

    // ── VT52 ────────────────────────────────────────────────────────────

    fn advance_vt52(&mut self, ch: char, out: &mut Vec<Handler>) {
        match ch {
            '\x1b' => self.begin_escape(),
            'A' => self.finish(Action::CursorUp(1), out),
            'B' => self.finish(Action::CursorDown(1), out),
            'C' => self.finish(Action::CursorForward(1), out),
            'D' => self.finish(Action::CursorBackward(1), out),
            'F' => self.finish(Action::Vt52Graphics(true), out),
            'G' => self.finish(Action::Vt52Graphics(false), out),
            'H' => self.finish(Action::CursorPosition { row: 1, col: 1 }, out),
            'I' => self.finish(Action::ReverseIndex, out),
            'J' => self.finish(Action::EraseInDisplay(EraseMode::Below), out),
            'K' => self.finish(Action::EraseInLine(EraseMode::Below), out),
            'Y' => self.set_state(ParserState::Vt52CursorRow),
            'Z' => self.finish(Action::Vt52Identify, out),
            '=' => self.finish(Action::KeypadApplication, out),
            '>' => self.finish(Action::KeypadNumeric, out),
            '<' => {
                self.vt52 = false;
                self.finish(Action::Vt52EnterAnsi, out);
            }
            _ => self.unhandled(),
        }
    }

    // ── CSI ─────────────────────────────────────────────────────────────

    /// Accumulate digits and separators. Returns true when `ch` was one.
    fn collect_numeric(&mut self, ch: char) -> bool {
        match ch {
            '0'..='9' => {
                let digit = u32::from(ch) - u32::from('0');
                let Some(slot) = self.params.last_mut() else {
                    return true;
                };
                let value = u32::from(*slot) * 10 + digit;
                match u16::try_from(value) {
                    Ok(v) if v < u16::MAX => *slot = v,
                    _ => {
                        warn!(value, seq = ?self.seq, "numeric parameter too large");
                        self.fail(ParseError::NumberTooLarge);
                    }
                }
                true
            }
            ';' | ':' => {
                if self.params.len() < MAX_PARAMS {
                    self.params.push(0);
                    self.colon.push(ch == ':');
                } else {
                    warn!(max = MAX_PARAMS, seq = ?self.seq, "too many parameters");
                    self.fail(ParseError::TooManyParameters);
                }
                true
            }
            _ => false,
        }
    }

    /// C0 controls that execute inside a control sequence. Returns true
    /// when `ch` was one.
    fn csi_control(&mut self, ch: char, out: &mut Vec<Handler>) -> bool {
        let action = match ch {
            '\x08' => {
                self.undo_last_param_char();
                return true;
            }
            '\x07' | '\x7f' => return true,
            '\x18' | '\x1a' => {
                self.set_state(ParserState::Normal);
                return true;
            }
            '\x1b' => {
                debug!(seq = ?self.seq, "ESC interrupts control sequence");
                self.begin_escape();
                return true;
            }
            '\t' => Action::Tab,
            '\r' => Action::CarriageReturn,
            '\n' | '\x0b' | '\x0c' => Action::LineFeed,
            _ => return false,
        };
        self.seq.pop();
        out.push(Handler::new(action, ch, ch.to_string()));
        true
    }

    /// Backspace while collecting parameters: drop an empty trailing slot
    /// right after `;`, otherwise the last digit.
    fn undo_last_param_char(&mut self) {
        self.seq.pop();
        let previous = self.history.iter().rev().nth(1).copied();
        if matches!(previous, Some(';' | ':')) && self.params.len() > 1 {
            self.params.pop();
            self.colon.pop();
        } else if let Some(slot) = self.params.last_mut() {
            *slot /= 10;
        }
        self.seq.pop();
    }

    fn param(&self, n: usize, default: u16) -> u16 {
        match self.params.get(n) {
            Some(&v) if v >= 1 => v,
            _ => default,
        }
    }

    fn raw_param(&self, n: usize) -> u16 {
        self.params.get(n).copied().unwrap_or(0)
    }

    fn advance_csi(&mut self, ch: char, out: &mut Vec<Handler>) {
        if self.collect_numeric(ch) || self.csi_control(ch, out) {
            return;
        }
        let n = self.param(0, 1);
        let action = match ch {
            '?' => {
                self.private = true;
                return self.set_state(ParserState::CsiPriv);
            }
            '>' => return self.set_state(ParserState::CsiGt),
            '!' => return self.set_state(ParserState::CsiBang),
            ' ' => return self.set_state(ParserState::CsiSpace),
            '\'' => return self.set_state(ParserState::CsiQuote),
            '"' => return self.set_state(ParserState::CsiDblQuote),
            '$' => return self.set_state(ParserState::CsiDollar),
            'A' => Action::CursorUp(n),
            'B' => Action::CursorDown(n),
            'C' => Action::CursorForward(n),
            'D' => Action::CursorBackward(n),
            'E' => Action::CursorNextLine(n),
            'F' => Action::CursorPrevLine(n),
            'G' | '`' => Action::CursorColumn(n),
            'a' => Action::CursorColumnRelative(n),
            'd' => Action::CursorRow(n),
            'e' => Action::CursorRowRelative(n),
            'H' | 'f' => Action::CursorPosition {
                row: self.param(0, 1),
                col: self.param(1, 1),
            },
            'I' => Action::TabForward(n),
            'Z' => Action::TabBackward(n),
            'g' => Action::TabClear(self.raw_param(0)),
            'J' | 'K' => {
                let Some(mode) = EraseMode::from_param(self.raw_param(0)) else {
                    return self.malformed("erase mode");
                };
                if ch == 'J' {
                    Action::EraseInDisplay(mode)
                } else {
                    Action::EraseInLine(mode)
                }
            }
            'X' => Action::EraseChars(n),
            '@' => Action::InsertChars(n),
            'P' => Action::DeleteChars(n),
            'L' => Action::InsertLines(n),
            'M' => Action::DeleteLines(n),
            'S' => Action::ScrollUp(n),
            'T' => Action::ScrollDown(n),
            'b' => {
                let Some(grapheme) = self.last_graphic.clone() else {
                    info!(seq = ?self.seq, "REP without a preceding graphic character");
                    return self.set_state(ParserState::Normal);
                };
                Action::Repeat { grapheme, count: n }
            }
            'c' if self.raw_param(0) == 0 => Action::PrimaryAttributes,
            'h' | 'l' => Action::SetMode {
                private: false,
                modes: self.params.clone(),
                enable: ch == 'h',
            },
            'm' => Action::Sgr {
                params: self.params.clone(),
                colon: self.colon.clone(),
            },
            'n' => Action::DeviceStatus {
                private: false,
                code: self.raw_param(0),
            },
            'r' => Action::SetScrollRegion {
                top: self.raw_param(0),
                bottom: self.raw_param(1),
            },
            's' => Action::SetLeftRightMargins {
                left: self.raw_param(0),
                right: self.raw_param(1),
            },
            'u' => Action::RestoreCursorSco,
            't' => Action::WindowOps(self.params.clone()),
            _ => return self.unhandled(),
        };
        self.finish(action, out);
    }

    fn advance_csi_priv(&mut self, ch: char, out: &mut Vec<Handler>) {
        if self.collect_numeric(ch) || self.csi_control(ch, out) {
            return;
        }
        let action = match ch {
            'h' | 'l' => {
                let enable = ch == 'h';
                if !enable && self.params.contains(&2) {
                    self.vt52 = true;
                }
                Action::SetMode {
                    private: true,
                    modes: self.params.clone(),
                    enable,
                }
            }
            'n' => Action::DeviceStatus {
                private: true,
                code: self.raw_param(0),
            },
            'J' | 'K' => {
                let Some(mode) = EraseMode::from_param(self.raw_param(0)) else {
                    return self.malformed("selective erase mode");
                };
                if ch == 'J' {
                    Action::EraseInDisplay(mode)
                } else {
                    Action::EraseInLine(mode)
                }
            }
            '$' => return self.set_state(ParserState::CsiDollar),
            _ => return self.unhandled(),
        };
        self.finish(action, out);
    }

    fn advance_csi_gt(&mut self, ch: char, out: &mut Vec<Handler>) {
        if self.collect_numeric(ch) || self.csi_control(ch, out) {
            return;
        }
        let action = match ch {
            'c' => Action::SecondaryAttributes,
            'm' => Action::ModifyKeys {
                resource: self.raw_param(0),
                value: (self.params.len() > 1).then(|| self.raw_param(1)),
            },
            'n' => Action::ModifyKeys {
                resource: self.raw_param(0),
                value: None,
            },
            _ => return self.unhandled(),
        };
        self.finish(action, out);
    }

    fn advance_csi_intermediate(&mut self, ch: char, out: &mut Vec<Handler>) {
        if self.csi_control(ch, out) {
            return;
        }
        let action = match (self.state, ch) {
            (ParserState::CsiBang, 'p') => {
                self.legacy_slots = [false; 4];
                self.legacy_docs = false;
                self.update_vt_mode();
                Action::SoftReset
            }
            (ParserState::CsiSpace, 'q') => Action::SetCursorStyle(self.raw_param(0)),
            (ParserState::CsiQuote, '}') => Action::InsertColumns(self.param(0, 1)),
            (ParserState::CsiQuote, '~') => Action::DeleteColumns(self.param(0, 1)),
            (ParserState::CsiDblQuote, 'p') => Action::SetConformance {
                level: self.raw_param(0),
                c1: self.raw_param(1),
            },
            (ParserState::CsiDollar, 'p') => Action::RequestMode {
                private: self.private,
                mode: self.raw_param(0),
            },
            _ => return self.unhandled(),
        };
        self.finish(action, out);
    }

    // ── OSC / DCS ───────────────────────────────────────────────────────

    fn push_arg_char(&mut self, ch: char) {
        if self.arg.len() + ch.len_utf8() <= MAX_STRING_ARG {
            self.arg.push(ch);
        } else {
            self.overflow();
        }
    }

    fn push_arg(&mut self, s: &str) {
        if self.arg.len() + s.len() <= MAX_STRING_ARG {
            self.arg.push_str(s);
        } else {
            self.overflow();
        }
    }

    fn overflow(&mut self) {
        warn!(
            state = %self.state,
            len = self.arg.len(),
            "string argument overflow"
        );
        self.fail(ParseError::StringOverflow);
    }

    fn advance_osc(&mut self, ch: char, out: &mut Vec<Handler>) {
        match ch {
            '\x07' => self.dispatch_osc(out),
            '\x1b' => self.set_state(ParserState::OscEsc),
            '\x18' | '\x1a' => self.set_state(ParserState::Normal),
            _ => self.push_arg_char(ch),
        }
    }

    fn advance_osc_esc(&mut self, ch: char, out: &mut Vec<Handler>) {
        if ch == '\\' {
            self.dispatch_osc(out);
        } else {
            self.push_arg_char('\x1b');
            self.push_arg_char(ch);
            if self.state == ParserState::OscEsc {
                self.state = ParserState::Osc;
            }
        }
    }

    fn advance_dcs(&mut self, ch: char) {
        match ch {
            '\x1b' => self.set_state(ParserState::DcsEsc),
            '\x18' | '\x1a' => self.set_state(ParserState::Normal),
            _ => self.push_arg_char(ch),
        }
    }

    fn advance_dcs_esc(&mut self, ch: char, out: &mut Vec<Handler>) {
        if ch == '\\' {
            self.dispatch_dcs(out);
        } else {
            self.push_arg_char('\x1b');
            self.push_arg_char(ch);
            if self.state == ParserState::DcsEsc {
                self.state = ParserState::Dcs;
            }
        }
    }

    fn dispatch_osc(&mut self, out: &mut Vec<Handler>) {
        let arg = std::mem::take(&mut self.arg);
        let (ps, pt) = arg.split_once(';').unwrap_or((arg.as_str(), ""));
        let Ok(cmd) = ps.parse::<u16>() else {
            warn!(ps, seq = ?self.seq, "OSC: can't parse Ps parameter");
            self.last_error = Some(ParseError::Malformed {
                what: "OSC",
                seq: arg.clone(),
            });
            return self.set_state(ParserState::Normal);
        };
        let pt = pt.to_owned();
        let action = match cmd {
            0 | 1 | 2 => Action::SetTitle {
                icon: cmd != 2,
                title: cmd != 1,
                text: pt,
            },
            4 => Action::Palette(pt),
            104 => Action::ResetPalette(pt),
            8 => {
                let Some((params, url)) = pt.split_once(';') else {
                    return self.malformed("OSC 8");
                };
                Action::Hyperlink {
                    params: params.to_owned(),
                    url: url.to_owned(),
                }
            }
            10..=19 => Action::DynamicColor { code: cmd, arg: pt },
            112 => Action::ResetCursorColor,
            52 => {
                let Some((targets, data)) = pt.split_once(';') else {
                    return self.malformed("OSC 52");
                };
                Action::SelectionData {
                    targets: targets.to_owned(),
                    data: data.to_owned(),
                }
            }
            _ => {
                warn!(cmd, arg = ?pt, "unhandled OSC");
                self.last_error = Some(ParseError::Unhandled {
                    state: self.state.name(),
                    seq: self.seq.clone(),
                });
                return self.set_state(ParserState::Normal);
            }
        };
        self.finish(action, out);
    }

    fn dispatch_dcs(&mut self, out: &mut Vec<Handler>) {
        let arg = std::mem::take(&mut self.arg);
        match arg.strip_prefix("$q") {
            Some(setting) => self.finish(Action::RequestStatus(setting.to_owned()), out),
            None => {
                warn!(arg = ?arg, "unhandled DCS");
                self.last_error = Some(ParseError::Unhandled {
                    state: self.state.name(),
                    seq: self.seq.clone(),
                });
                self.set_state(ParserState::Normal);
            }
        }
    }

    // ── Emission and recovery ───────────────────────────────────────────

    fn append_history(&mut self, ch: char) {
        self.history.push_back(ch);
        if self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }
    }

    fn set_state(&mut self, state: ParserState) {
        if state == ParserState::Normal {
            self.params.clear();
            self.colon.clear();
            self.arg.clear();
            self.seq.clear();
            self.private = false;
        }
        self.state = state;
    }

    /// Emit a handler for the completed sequence and return to ground.
    fn finish(&mut self, action: Action, out: &mut Vec<Handler>) {
        let seq = std::mem::take(&mut self.seq);
        out.push(Handler::new(action, self.ch, seq));
        self.set_state(ParserState::Normal);
    }

    /// Emit a single-character control from the ground state.
    fn control(&mut self, action: Action, out: &mut Vec<Handler>) {
        out.push(Handler::new(action, self.ch, self.ch.to_string()));
    }

    fn print(&mut self, action: Action, text: &str, out: &mut Vec<Handler>) {
        self.last_graphic = Some(text.to_owned());
        out.push(Handler::new(action, self.ch, text));
    }

    fn unhandled(&mut self) {
        warn!(state = %self.state, seq = ?self.seq, "unhandled input");
        self.last_error = Some(ParseError::Unhandled {
            state: self.state.name(),
            seq: self.seq.clone(),
        });
        self.set_state(ParserState::Normal);
    }

    fn malformed(&mut self, what: &'static str) {
        warn!(what, seq = ?self.seq, "malformed sequence");
        self.last_error = Some(ParseError::Malformed {
            what,
            seq: self.seq.clone(),
        });
        self.set_state(ParserState::Normal);
    }

    fn fail(&mut self, err: ParseError) {
        self.last_error = Some(err);
        self.set_state(ParserState::Normal);
    }
}

fn vt52_coordinate(ch: char) -> u16 {
    u16::try_from(u32::from(ch).saturating_sub(0x20)).unwrap_or(u16::MAX)
}
