//! Parsed operations.
//!
//! The parser turns input into [`Handler`] records. Each record carries a
//! closed [`Action`] with its parameters already resolved (defaults applied),
//! the character that completed the sequence, and the sequence text as
//! received. Handlers are inert until [`Handler::apply`] runs them against an
//! [`Emulator`](crate::Emulator), so a batch can be inspected, logged, or
//! replayed.

use crate::charset::Charset;
use crate::emulator::Emulator;

/// Which screen-erase variant ED/EL selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EraseMode {
    /// From the cursor to the end (0).
    Below,
    /// From the start to the cursor, inclusive (1).
    Above,
    /// Everything (2).
    All,
    /// Scrollback only (ED 3).
    Saved,
}

impl EraseMode {
    #[must_use]
    pub fn from_param(p: u16) -> Option<Self> {
        match p {
            0 => Some(Self::Below),
            1 => Some(Self::Above),
            2 => Some(Self::All),
            3 => Some(Self::Saved),
            _ => None,
        }
    }
}

/// One terminal operation with resolved parameters.
///
/// Counts are at least 1. Row/column targets are 1-based as received; the
/// emulator translates and clamps them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ── Printing ────────────────────────────────────────────────────────
    /// A grapheme cluster received in UTF-8 mode.
    Print(String),
    /// A byte received in legacy byte mode; mapped through GL/GR.
    PrintByte(u8),
    /// REP: print `grapheme` `count` more times.
    Repeat { grapheme: String, count: u16 },

    // ── C0 / C1 controls ────────────────────────────────────────────────
    Bell,
    Backspace,
    Tab,
    /// LF, VT, FF.
    LineFeed,
    CarriageReturn,
    /// SO: invoke G1 into GL.
    ShiftOut,
    /// SI: invoke G0 into GL.
    ShiftIn,
    /// IND.
    Index,
    /// NEL.
    NextLine,
    /// RI.
    ReverseIndex,
    /// HTS.
    SetTabStop,
    /// SS2 / SS3: the G slot for the next printable only.
    SingleShift(u8),
    /// LS2/LS3 (into GL) and LS1R/LS2R/LS3R (into GR).
    LockingShift { slot: u8, right: bool },

    // ── ESC ─────────────────────────────────────────────────────────────
    /// DECSC.
    SaveCursor,
    /// DECRC.
    RestoreCursor,
    /// RIS.
    FullReset,
    /// DECKPAM.
    KeypadApplication,
    /// DECKPNM.
    KeypadNumeric,
    /// DECALN.
    ScreenAlignment,
    /// DECBI.
    BackIndex,
    /// DECFI.
    ForwardIndex,
    /// SCS: designate `charset` into G`slot`.
    DesignateCharset { slot: u8, charset: Charset },
    /// DOCS: `true` for `ESC % G`, `false` for `ESC % @`.
    SelectUtf8(bool),

    // ── Cursor motion ───────────────────────────────────────────────────
    /// CUU.
    CursorUp(u16),
    /// CUD.
    CursorDown(u16),
    /// CUF.
    CursorForward(u16),
    /// CUB.
    CursorBackward(u16),
    /// CNL.
    CursorNextLine(u16),
    /// CPL.
    CursorPrevLine(u16),
    /// CHA / HPA (1-based).
    CursorColumn(u16),
    /// HPR.
    CursorColumnRelative(u16),
    /// VPA (1-based).
    CursorRow(u16),
    /// VPR.
    CursorRowRelative(u16),
    /// CUP / HVP (1-based).
    CursorPosition { row: u16, col: u16 },

    // ── Tabs ────────────────────────────────────────────────────────────
    /// CHT.
    TabForward(u16),
    /// CBT.
    TabBackward(u16),
    /// TBC with its raw parameter.
    TabClear(u16),

    // ── Editing ─────────────────────────────────────────────────────────
    /// ED.
    EraseInDisplay(EraseMode),
    /// EL.
    EraseInLine(EraseMode),
    /// ECH.
    EraseChars(u16),
    /// ICH.
    InsertChars(u16),
    /// DCH.
    DeleteChars(u16),
    /// IL.
    InsertLines(u16),
    /// DL.
    DeleteLines(u16),
    /// SU.
    ScrollUp(u16),
    /// SD.
    ScrollDown(u16),
    /// DECIC.
    InsertColumns(u16),
    /// DECDC.
    DeleteColumns(u16),

    // ── Margins ─────────────────────────────────────────────────────────
    /// DECSTBM. Zero means "default" for either bound.
    SetScrollRegion { top: u16, bottom: u16 },
    /// `CSI Pl ; Pr s`: DECSLRM when DECLRMM is set, otherwise SCOSC.
    SetLeftRightMargins { left: u16, right: u16 },
    /// SCORC.
    RestoreCursorSco,

    // ── Modes and renditions ────────────────────────────────────────────
    /// SM / RM (`private == false`) and DECSET / DECRST.
    SetMode { private: bool, modes: Vec<u16>, enable: bool },
    /// DECRQM.
    RequestMode { private: bool, mode: u16 },
    /// SGR with the separator kind of every parameter (`true` for `:`).
    Sgr { params: Vec<u16>, colon: Vec<bool> },

    // ── Reports and settings ────────────────────────────────────────────
    /// DSR / DECXCPR.
    DeviceStatus { private: bool, code: u16 },
    /// DA1.
    PrimaryAttributes,
    /// DA2.
    SecondaryAttributes,
    /// DECSTR.
    SoftReset,
    /// DECSCL.
    SetConformance { level: u16, c1: u16 },
    /// DECSCUSR.
    SetCursorStyle(u16),
    /// XTWINOPS.
    WindowOps(Vec<u16>),
    /// XTMODKEYS.
    ModifyKeys { resource: u16, value: Option<u16> },

    // ── OSC ─────────────────────────────────────────────────────────────
    /// OSC 0/1/2.
    SetTitle { icon: bool, title: bool, text: String },
    /// OSC 4 with its raw `index;spec` list.
    Palette(String),
    /// OSC 104 with its raw index list.
    ResetPalette(String),
    /// OSC 8.
    Hyperlink { params: String, url: String },
    /// OSC 10-19.
    DynamicColor { code: u16, arg: String },
    /// OSC 112.
    ResetCursorColor,
    /// OSC 52.
    SelectionData { targets: String, data: String },

    // ── DCS ─────────────────────────────────────────────────────────────
    /// DECRQSS with the setting selector (the text after `$q`).
    RequestStatus(String),

    // ── VT52 ────────────────────────────────────────────────────────────
    /// `ESC Y row col`, 0-based.
    Vt52CursorAddress { row: u16, col: u16 },
    /// `ESC Z`.
    Vt52Identify,
    /// `ESC <`.
    Vt52EnterAnsi,
    /// `ESC F` / `ESC G`.
    Vt52Graphics(bool),
}

impl Action {
    /// Short mnemonic for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Print(_) | Self::PrintByte(_) => "graphemes",
            Self::Repeat { .. } => "csi-rep",
            Self::Bell => "c0-bel",
            Self::Backspace => "c0-bs",
            Self::Tab => "c0-ht",
            Self::LineFeed => "c0-lf",
            Self::CarriageReturn => "c0-cr",
            Self::ShiftOut => "c0-so",
            Self::ShiftIn => "c0-si",
            Self::Index => "esc-ind",
            Self::NextLine => "esc-nel",
            Self::ReverseIndex => "esc-ri",
            Self::SetTabStop => "esc-hts",
            Self::SingleShift(_) => "esc-ss",
            Self::LockingShift { .. } => "esc-ls",
            Self::SaveCursor => "esc-decsc",
            Self::RestoreCursor => "esc-decrc",
            Self::FullReset => "esc-ris",
            Self::KeypadApplication => "esc-deckpam",
            Self::KeypadNumeric => "esc-deckpnm",
            Self::ScreenAlignment => "esc-decaln",
            Self::BackIndex => "esc-decbi",
            Self::ForwardIndex => "esc-decfi",
            Self::DesignateCharset { .. } => "esc-scs",
            Self::SelectUtf8(_) => "esc-docs",
            Self::CursorUp(_) => "csi-cuu",
            Self::CursorDown(_) => "csi-cud",
            Self::CursorForward(_) => "csi-cuf",
            Self::CursorBackward(_) => "csi-cub",
            Self::CursorNextLine(_) => "csi-cnl",
            Self::CursorPrevLine(_) => "csi-cpl",
            Self::CursorColumn(_) => "csi-cha",
            Self::CursorColumnRelative(_) => "csi-hpr",
            Self::CursorRow(_) => "csi-vpa",
            Self::CursorRowRelative(_) => "csi-vpr",
            Self::CursorPosition { .. } => "csi-cup",
            Self::TabForward(_) => "csi-cht",
            Self::TabBackward(_) => "csi-cbt",
            Self::TabClear(_) => "csi-tbc",
            Self::EraseInDisplay(_) => "csi-ed",
            Self::EraseInLine(_) => "csi-el",
            Self::EraseChars(_) => "csi-ech",
            Self::InsertChars(_) => "csi-ich",
            Self::DeleteChars(_) => "csi-dch",
            Self::InsertLines(_) => "csi-il",
            Self::DeleteLines(_) => "csi-dl",
            Self::ScrollUp(_) => "csi-su",
            Self::ScrollDown(_) => "csi-sd",
            Self::InsertColumns(_) => "csi-decic",
            Self::DeleteColumns(_) => "csi-decdc",
            Self::SetScrollRegion { .. } => "csi-decstbm",
            Self::SetLeftRightMargins { .. } => "csi-decslrm",
            Self::RestoreCursorSco => "csi-scorc",
            Self::SetMode { private: true, enable: true, .. } => "csi-decset",
            Self::SetMode { private: true, enable: false, .. } => "csi-decrst",
            Self::SetMode { private: false, enable: true, .. } => "csi-sm",
            Self::SetMode { private: false, enable: false, .. } => "csi-rm",
            Self::RequestMode { .. } => "csi-decrqm",
            Self::Sgr { .. } => "csi-sgr",
            Self::DeviceStatus { .. } => "csi-dsr",
            Self::PrimaryAttributes => "csi-da1",
            Self::SecondaryAttributes => "csi-da2",
            Self::SoftReset => "csi-decstr",
            Self::SetConformance { .. } => "csi-decscl",
            Self::SetCursorStyle(_) => "csi-decscusr",
            Self::WindowOps(_) => "csi-xtwinops",
            Self::ModifyKeys { .. } => "csi-xtmodkeys",
            Self::SetTitle { .. } => "osc-0,1,2",
            Self::Palette(_) => "osc-4",
            Self::ResetPalette(_) => "osc-104",
            Self::Hyperlink { .. } => "osc-8",
            Self::DynamicColor { .. } => "osc-10x",
            Self::ResetCursorColor => "osc-112",
            Self::SelectionData { .. } => "osc-52",
            Self::RequestStatus(_) => "dcs-decrqss",
            Self::Vt52CursorAddress { .. } => "vt52-cup",
            Self::Vt52Identify => "vt52-decid",
            Self::Vt52EnterAnsi => "vt52-ansi",
            Self::Vt52Graphics(_) => "vt52-graphics",
        }
    }
}

/// A parsed, not yet applied, operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub action: Action,
    /// The character that completed the sequence.
    pub ch: char,
    /// The sequence text as received, for diagnostics.
    pub sequence: String,
}

impl Handler {
    #[must_use]
    pub fn new(action: Action, ch: char, sequence: impl Into<String>) -> Self {
        Self {
            action,
            ch,
            sequence: sequence.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.action.name()
    }

    /// Run the operation against `emu`.
    pub fn apply(&self, emu: &mut Emulator) {
        emu.dispatch(&self.action);
    }
}
