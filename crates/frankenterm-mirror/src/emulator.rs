//! Terminal emulator: applies parsed operations to a pair of screens.
//!
//! [`Emulator`] owns the primary and alternate [`Framebuffer`]s, the cursor,
//! modes, tab stops, character sets, saved-cursor records, and the reply
//! buffer for host-bound reports. Output from the host goes in through
//! [`Emulator::handle_stream`]; replies come out through
//! [`Emulator::take_reply`].
//!
//! Every operation resolves its defaults in the parser and clamps here: the
//! cursor never leaves the screen, and motion stops at the margins when it
//! starts inside them.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::cell::LinkId;
use crate::charset::{Charset, CharsetState};
use crate::config::EmulatorConfig;
use crate::framebuffer::{CursorStyle, Framebuffer};
use crate::handler::{Action, EraseMode, Handler};
use crate::input::UserInput;
use crate::modes::{CompatLevel, KeypadMode, Modes};
use crate::parser::Parser;
use crate::renditions::{Renditions, format_color_spec, palette_rgb, parse_color_spec};

/// Primary device attributes: VT420 with 132 columns, selective erase,
/// national replacement sets, technical characters, and ANSI color.
pub const DA1_REPLY: &str = "\x1b[?64;1;9;15;21;22c";
/// Secondary device attributes.
pub const DA2_REPLY: &str = "\x1b[>64;0;0c";
/// VT52 identify reply.
pub const VT52_IDENTIFY_REPLY: &str = "\x1b/Z";

/// Which screen buffer is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    #[default]
    Primary,
    Alternate,
}

impl Screen {
    fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Alternate => 1,
        }
    }
}

/// State captured by DECSC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCursor {
    pub row: u16,
    pub col: u16,
    pub last_col: bool,
    pub renditions: Renditions,
    pub origin: bool,
    pub autowrap: bool,
    pub charsets: CharsetState,
    pub link: String,
}

#[derive(Debug)]
pub struct Emulator {
    screens: [Framebuffer; 2],
    active: Screen,
    parser: Parser,
    cursor_row: u16,
    cursor_col: u16,
    /// Pending wrap: the last print filled the rightmost column.
    last_col: bool,
    renditions: Renditions,
    /// Target of the open OSC 8 hyperlink; empty when none.
    link_url: String,
    modes: Modes,
    /// `None` means the default stop every 8 columns.
    tabs: Option<Vec<u16>>,
    charsets: CharsetState,
    /// DECSC records, one per screen.
    saved_dec: [Option<SavedCursor>; 2],
    saved_sco: Option<(u16, u16)>,
    selection: BTreeMap<char, String>,
    selection_generation: u64,
    last_selection: Option<(String, String)>,
    palette: BTreeMap<u8, (u8, u8, u8)>,
    dynamic_colors: BTreeMap<u16, (u8, u8, u8)>,
    reply: String,
    user_input: UserInput,
}

impl Clone for Emulator {
    /// Snapshot copy. The parser starts fresh and the selection store is
    /// empty; the selection generation and last payload carry over so a
    /// renderer can still tell whether a selection is pending.
    fn clone(&self) -> Self {
        Self {
            screens: self.screens.clone(),
            active: self.active,
            parser: Parser::new(),
            cursor_row: self.cursor_row,
            cursor_col: self.cursor_col,
            last_col: self.last_col,
            renditions: self.renditions,
            link_url: self.link_url.clone(),
            modes: self.modes,
            tabs: self.tabs.clone(),
            charsets: self.charsets,
            saved_dec: self.saved_dec.clone(),
            saved_sco: self.saved_sco,
            selection: BTreeMap::new(),
            selection_generation: self.selection_generation,
            last_selection: self.last_selection.clone(),
            palette: self.palette.clone(),
            dynamic_colors: self.dynamic_colors.clone(),
            reply: self.reply.clone(),
            user_input: self.user_input.clone(),
        }
    }
}

impl Emulator {
    /// An emulator of `cols x rows` keeping `save_lines` rows of scrollback.
    #[must_use]
    pub fn new(cols: u16, rows: u16, save_lines: usize) -> Self {
        Self::with_config(
            &EmulatorConfig::default()
                .with_size(cols, rows)
                .with_save_lines(save_lines),
        )
    }

    #[must_use]
    pub fn with_config(config: &EmulatorConfig) -> Self {
        let cfg = config.normalized();
        Self {
            screens: [
                Framebuffer::new(cfg.cols, cfg.rows, cfg.save_lines, cfg.title_stack_limit),
                Framebuffer::new(cfg.cols, cfg.rows, 0, cfg.title_stack_limit),
            ],
            active: Screen::Primary,
            parser: Parser::new(),
            cursor_row: 0,
            cursor_col: 0,
            last_col: false,
            renditions: Renditions::default(),
            link_url: String::new(),
            modes: Modes::new(),
            tabs: None,
            charsets: CharsetState::default(),
            saved_dec: [None, None],
            saved_sco: None,
            selection: BTreeMap::new(),
            selection_generation: 0,
            last_selection: None,
            palette: BTreeMap::new(),
            dynamic_colors: BTreeMap::new(),
            reply: String::new(),
            user_input: UserInput::new(),
        }
    }

    // ── Input / output ──────────────────────────────────────────────────

    /// Parse `input` and apply every resulting operation.
    pub fn handle_stream(&mut self, input: &[u8]) {
        let handlers = self.parser.process(input);
        for hd in &handlers {
            hd.apply(self);
        }
    }

    /// Apply one parsed operation.
    pub fn handle(&mut self, hd: &Handler) {
        hd.apply(self);
    }

    /// Translate keystrokes from the client for the host application.
    pub fn handle_user_input(&mut self, keys: &str) -> String {
        let app = self.modes.application_cursor_keys();
        keys.graphemes(true)
            .map(|g| self.user_input.parse(g, app))
            .collect()
    }

    /// Drain the host-bound reply bytes accumulated so far.
    pub fn take_reply(&mut self) -> String {
        std::mem::take(&mut self.reply)
    }

    /// Peek at pending reply bytes without draining them.
    #[must_use]
    pub fn pending_reply(&self) -> &str {
        &self.reply
    }

    #[must_use]
    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// The active screen buffer.
    #[must_use]
    pub fn fb(&self) -> &Framebuffer {
        &self.screens[self.active.index()]
    }

    pub(crate) fn fb_mut(&mut self) -> &mut Framebuffer {
        &mut self.screens[self.active.index()]
    }

    /// The primary screen, which also carries the titles and bell counter.
    #[must_use]
    pub fn primary(&self) -> &Framebuffer {
        &self.screens[0]
    }

    fn primary_mut(&mut self) -> &mut Framebuffer {
        &mut self.screens[0]
    }

    #[must_use]
    pub fn active_screen(&self) -> Screen {
        self.active
    }

    #[must_use]
    pub fn is_alternate_screen(&self) -> bool {
        self.active == Screen::Alternate
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.fb().cols()
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.fb().rows()
    }

    #[must_use]
    pub fn cursor_row(&self) -> u16 {
        self.cursor_row
    }

    #[must_use]
    pub fn cursor_col(&self) -> u16 {
        self.cursor_col
    }

    /// Whether the next printable wraps first.
    #[must_use]
    pub fn pending_wrap(&self) -> bool {
        self.last_col
    }

    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.modes.cursor_visible()
    }

    #[must_use]
    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    #[must_use]
    pub fn renditions(&self) -> &Renditions {
        &self.renditions
    }

    #[must_use]
    pub fn charsets(&self) -> &CharsetState {
        &self.charsets
    }

    #[must_use]
    pub fn saved_cursor(&self) -> Option<&SavedCursor> {
        self.saved_dec[self.active.index()].as_ref()
    }

    #[must_use]
    pub fn window_title(&self) -> &str {
        self.primary().window_title()
    }

    #[must_use]
    pub fn icon_name(&self) -> &str {
        self.primary().icon_name()
    }

    /// Prefix the window title (and the icon name when it equals the title).
    pub fn prefix_window_title(&mut self, prefix: &str) {
        self.primary_mut().prefix_window_title(prefix);
    }

    /// Effective tab stops, ascending, all within the screen width.
    #[must_use]
    pub fn tab_stops(&self) -> Vec<u16> {
        let width = self.width();
        match &self.tabs {
            None => (8..width).step_by(8).collect(),
            Some(stops) => stops.iter().copied().filter(|&c| c < width).collect(),
        }
    }

    /// Selection payload (base64) stored for clipboard `target`.
    #[must_use]
    pub fn selection(&self, target: char) -> Option<&str> {
        self.selection.get(&target).map(String::as_str)
    }

    /// Bumped on every accepted OSC 52 store.
    #[must_use]
    pub fn selection_generation(&self) -> u64 {
        self.selection_generation
    }

    /// Targets and payload of the most recent OSC 52 store.
    #[must_use]
    pub fn last_selection(&self) -> Option<(&str, &str)> {
        self.last_selection
            .as_ref()
            .map(|(t, d)| (t.as_str(), d.as_str()))
    }

    /// Palette entry, honoring OSC 4 overrides.
    #[must_use]
    pub fn palette_color(&self, index: u8) -> (u8, u8, u8) {
        self.palette
            .get(&index)
            .copied()
            .unwrap_or_else(|| palette_rgb(index))
    }

    /// Dynamic color `code` (10-19), honoring OSC 10-19 overrides.
    #[must_use]
    pub fn dynamic_color(&self, code: u16) -> (u8, u8, u8) {
        self.dynamic_colors
            .get(&code)
            .copied()
            .unwrap_or_else(|| default_dynamic_color(code))
    }

    /// Link id used for newly printed cells on the active screen.
    fn current_link(&mut self) -> LinkId {
        if self.link_url.is_empty() {
            return 0;
        }
        let idx = self.active.index();
        self.screens[idx].links_mut().intern(&self.link_url)
    }

    // ── Resize ──────────────────────────────────────────────────────────

    /// Resize both screens. Rows that would push the cursor off the bottom
    /// move into scrollback. Zero dimensions are rejected.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if cols == 0 || rows == 0 {
            warn!(cols, rows, "resize: rejecting zero dimension");
            return;
        }
        let active = self.active.index();
        let mut cursor_row = self.cursor_row;
        for (i, fb) in self.screens.iter_mut().enumerate() {
            let new_row = fb.resize(cols, rows, self.cursor_row);
            if i == active {
                cursor_row = new_row;
            }
        }
        self.cursor_row = cursor_row;
        self.last_col = false;
        self.clamp_cursor();
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    pub(crate) fn dispatch(&mut self, action: &Action) {
        match action {
            Action::Print(g) => {
                let mapped = self.charsets.map_grapheme(g).into_owned();
                self.print(&mapped);
            }
            Action::PrintByte(b) => {
                let ch = self.charsets.map_byte(*b);
                self.print(ch.encode_utf8(&mut [0; 4]));
            }
            Action::Repeat { grapheme, count } => {
                let cells = usize::from(self.width()) * usize::from(self.height());
                for _ in 0..usize::from(*count).min(cells) {
                    self.print(grapheme);
                }
            }

            Action::Bell => self.primary_mut().ring_bell(),
            Action::Backspace => self.cursor_backward(1),
            Action::Tab => self.tab_forward(1),
            Action::LineFeed => {
                self.index();
                if self.modes.linefeed_newline() {
                    self.carriage_return();
                }
            }
            Action::CarriageReturn => self.carriage_return(),
            Action::ShiftOut => self.charsets.gl = 1,
            Action::ShiftIn => self.charsets.gl = 0,
            Action::Index => self.index(),
            Action::NextLine => {
                self.carriage_return();
                self.index();
            }
            Action::ReverseIndex => self.reverse_index(),
            Action::SetTabStop => self.set_tab_stop(),
            Action::SingleShift(slot) => self.charsets.single_shift = Some(usize::from(*slot)),
            Action::LockingShift { slot, right } => {
                if *right {
                    self.charsets.gr = usize::from(*slot);
                } else {
                    self.charsets.gl = usize::from(*slot);
                }
            }

            Action::SaveCursor => self.save_cursor(),
            Action::RestoreCursor => self.restore_cursor(),
            Action::FullReset => self.full_reset(),
            Action::KeypadApplication => self.modes.keypad = KeypadMode::Application,
            Action::KeypadNumeric => self.modes.keypad = KeypadMode::Numeric,
            Action::ScreenAlignment => self.screen_alignment(),
            Action::BackIndex => self.back_index(),
            Action::ForwardIndex => self.forward_index(),
            Action::DesignateCharset { slot, charset } => {
                self.charsets.g[usize::from(*slot) & 3] = *charset;
            }
            Action::SelectUtf8(utf8) => debug!(utf8, "DOCS"),

            Action::CursorUp(n) => self.cursor_up(*n),
            Action::CursorDown(n) => self.cursor_down(*n),
            Action::CursorForward(n) => self.cursor_forward(*n),
            Action::CursorBackward(n) => self.cursor_backward(*n),
            Action::CursorNextLine(n) => {
                self.cursor_down(*n);
                self.carriage_return();
            }
            Action::CursorPrevLine(n) => {
                self.cursor_up(*n);
                self.carriage_return();
            }
            Action::CursorColumn(col) => self.goto_col(*col),
            Action::CursorColumnRelative(n) => {
                self.cursor_col = self.cursor_col.saturating_add(*n).min(self.width() - 1);
                self.last_col = false;
            }
            Action::CursorRow(row) => self.goto_row(*row),
            Action::CursorRowRelative(n) => {
                self.cursor_row = self.cursor_row.saturating_add(*n).min(self.height() - 1);
                self.last_col = false;
            }
            Action::CursorPosition { row, col } => {
                self.goto_row(*row);
                self.goto_col(*col);
            }

            Action::TabForward(n) => self.tab_forward(*n),
            Action::TabBackward(n) => self.tab_backward(*n),
            Action::TabClear(p) => self.tab_clear(*p),

            Action::EraseInDisplay(mode) => self.erase_in_display(*mode),
            Action::EraseInLine(mode) => self.erase_in_line(*mode),
            Action::EraseChars(n) => {
                let (row, col, blank) = (self.cursor_row, self.cursor_col, self.blank());
                let end = col.saturating_add(*n).min(self.width());
                self.fb_mut().row_mut(row).erase(col, end, blank);
            }
            Action::InsertChars(n) => self.insert_chars(*n),
            Action::DeleteChars(n) => self.delete_chars(*n),
            Action::InsertLines(n) => self.insert_lines(*n),
            Action::DeleteLines(n) => self.delete_lines(*n),
            Action::ScrollUp(n) => {
                let (top, bottom, left, right, blank) = self.region();
                self.fb_mut().scroll_up(top, bottom, left, right, *n, blank, false);
            }
            Action::ScrollDown(n) => {
                let (top, bottom, left, right, blank) = self.region();
                self.fb_mut().scroll_down(top, bottom, left, right, *n, blank);
            }
            Action::InsertColumns(n) => {
                if self.in_vertical_region() && self.in_horizontal_region() {
                    let (top, bottom, _, right, blank) = self.region();
                    let col = self.cursor_col;
                    self.fb_mut().insert_columns(top, bottom, col, right, *n, blank);
                }
            }
            Action::DeleteColumns(n) => {
                if self.in_vertical_region() && self.in_horizontal_region() {
                    let (top, bottom, _, right, blank) = self.region();
                    let col = self.cursor_col;
                    self.fb_mut().delete_columns(top, bottom, col, right, *n, blank);
                }
            }

            Action::SetScrollRegion { top, bottom } => self.set_scroll_region(*top, *bottom),
            Action::SetLeftRightMargins { left, right } => {
                if self.modes.horizontal_margins() {
                    self.set_left_right_margins(*left, *right);
                } else {
                    self.saved_sco = Some((self.cursor_row, self.cursor_col));
                }
            }
            Action::RestoreCursorSco => match self.saved_sco {
                Some((row, col)) => {
                    self.cursor_row = row;
                    self.cursor_col = col;
                    self.last_col = false;
                }
                None => info!("SCORC: no saved cursor"),
            },

            Action::SetMode {
                private,
                modes,
                enable,
            } => {
                for &mode in modes {
                    if *private {
                        self.set_private_mode(mode, *enable);
                    } else if !self.modes.set_ansi_mode(mode, *enable) {
                        warn!(mode, enable, "SM/RM: unrecognized mode");
                    }
                }
            }
            Action::RequestMode { private, mode } => self.request_mode(*private, *mode),
            Action::Sgr { params, colon } => self.renditions.apply_sgr(params, colon),

            Action::DeviceStatus { private, code } => self.device_status(*private, *code),
            Action::PrimaryAttributes => self.reply.push_str(DA1_REPLY),
            Action::SecondaryAttributes => self.reply.push_str(DA2_REPLY),
            Action::SoftReset => self.soft_reset(),
            Action::SetConformance { level, c1 } => {
                let compat = match level {
                    61 => CompatLevel::Vt100,
                    62..=65 => CompatLevel::Vt400,
                    _ => {
                        warn!(level, "DECSCL: unsupported conformance level");
                        return;
                    }
                };
                debug!(level, c1, "DECSCL");
                self.soft_reset();
                self.modes.compat_level = compat;
            }
            Action::SetCursorStyle(p) => match CursorStyle::from_param(*p) {
                Some(style) => {
                    for fb in &mut self.screens {
                        fb.set_cursor_style(style);
                    }
                }
                None => warn!(param = p, "DECSCUSR: unknown cursor style"),
            },
            Action::WindowOps(params) => self.window_ops(params),
            Action::ModifyKeys { resource, value } => {
                if *resource == 4 {
                    self.modes.modify_other_keys = value.unwrap_or(0);
                } else {
                    debug!(resource, ?value, "XTMODKEYS: ignored resource");
                }
            }

            Action::SetTitle { icon, title, text } => {
                let fb = self.primary_mut();
                if *icon {
                    fb.set_icon_name(text);
                }
                if *title {
                    fb.set_window_title(text);
                }
            }
            Action::Palette(arg) => self.set_palette(arg),
            Action::ResetPalette(arg) => {
                if arg.is_empty() {
                    self.palette.clear();
                }
                for idx in arg.split(';').filter_map(|s| s.parse::<u8>().ok()) {
                    self.palette.remove(&idx);
                }
            }
            Action::Hyperlink { params, url } => {
                debug!(params, url, "OSC 8");
                self.link_url.clone_from(url);
            }
            Action::DynamicColor { code, arg } => self.set_dynamic_colors(*code, arg),
            Action::ResetCursorColor => {
                self.dynamic_colors.remove(&12);
                for fb in &mut self.screens {
                    fb.set_cursor_color(None);
                }
            }
            Action::SelectionData { targets, data } => self.selection_data(targets, data),

            Action::RequestStatus(setting) => self.request_status(setting),

            Action::Vt52CursorAddress { row, col } => {
                self.cursor_row = (*row).min(self.height() - 1);
                self.cursor_col = (*col).min(self.width() - 1);
                self.last_col = false;
            }
            Action::Vt52Identify => self.reply.push_str(VT52_IDENTIFY_REPLY),
            Action::Vt52EnterAnsi => self.modes.compat_level = CompatLevel::Vt400,
            Action::Vt52Graphics(on) => {
                self.charsets.g[0] = if *on {
                    Charset::DecSpecial
                } else {
                    Charset::Utf8
                };
                self.charsets.gl = 0;
            }
        }
        self.clamp_cursor();
    }

    // ── Geometry helpers ────────────────────────────────────────────────

    fn blank(&self) -> Renditions {
        self.renditions.background()
    }

    fn top(&self) -> u16 {
        self.fb().margin_top()
    }

    fn bottom(&self) -> u16 {
        self.fb().margin_bottom()
    }

    fn left(&self) -> u16 {
        self.fb().margin_left()
    }

    fn right(&self) -> u16 {
        self.fb().margin_right()
    }

    fn region(&self) -> (u16, u16, u16, u16, Renditions) {
        (self.top(), self.bottom(), self.left(), self.right(), self.blank())
    }

    fn in_vertical_region(&self) -> bool {
        self.cursor_row >= self.top() && self.cursor_row < self.bottom()
    }

    fn in_horizontal_region(&self) -> bool {
        self.cursor_col >= self.left() && self.cursor_col < self.right()
    }

    /// Place the cursor at a 0-based position, clamped to the screen.
    pub(crate) fn set_cursor(&mut self, row: u16, col: u16) {
        self.cursor_row = row;
        self.cursor_col = col;
        self.last_col = false;
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        self.cursor_row = self.cursor_row.min(self.height() - 1);
        self.cursor_col = self.cursor_col.min(self.width() - 1);
    }

    // ── Cursor motion ───────────────────────────────────────────────────

    fn cursor_up(&mut self, n: u16) {
        let limit = if self.cursor_row >= self.top() { self.top() } else { 0 };
        self.cursor_row = self.cursor_row.saturating_sub(n).max(limit);
        self.last_col = false;
    }

    fn cursor_down(&mut self, n: u16) {
        let limit = if self.cursor_row < self.bottom() {
            self.bottom() - 1
        } else {
            self.height() - 1
        };
        self.cursor_row = self.cursor_row.saturating_add(n).min(limit);
        self.last_col = false;
    }

    fn cursor_forward(&mut self, n: u16) {
        let limit = if self.cursor_col < self.right() {
            self.right() - 1
        } else {
            self.width() - 1
        };
        self.cursor_col = self.cursor_col.saturating_add(n).min(limit);
        self.last_col = false;
    }

    fn cursor_backward(&mut self, n: u16) {
        let limit = if self.cursor_col >= self.left() { self.left() } else { 0 };
        self.cursor_col = self.cursor_col.saturating_sub(n).max(limit);
        self.last_col = false;
    }

    /// 1-based column, relative to the left margin in origin mode.
    fn goto_col(&mut self, col: u16) {
        let (base, limit) = if self.modes.origin_mode() {
            (self.left(), self.right() - 1)
        } else {
            (0, self.width() - 1)
        };
        self.cursor_col = base.saturating_add(col.saturating_sub(1)).min(limit);
        self.last_col = false;
    }

    /// 1-based row, relative to the top margin in origin mode.
    fn goto_row(&mut self, row: u16) {
        let (base, limit) = if self.modes.origin_mode() {
            (self.top(), self.bottom() - 1)
        } else {
            (0, self.height() - 1)
        };
        self.cursor_row = base.saturating_add(row.saturating_sub(1)).min(limit);
        self.last_col = false;
    }

    fn home_cursor(&mut self) {
        self.goto_row(1);
        self.goto_col(1);
    }

    fn carriage_return(&mut self) {
        self.cursor_col = if self.cursor_col >= self.left() {
            self.left()
        } else {
            0
        };
        self.last_col = false;
    }

    /// Move down one row, scrolling the region when on its bottom row.
    fn index(&mut self) {
        if self.cursor_row + 1 == self.bottom() {
            if self.in_horizontal_region() {
                let (top, bottom, left, right, blank) = self.region();
                let into_history = self.active == Screen::Primary;
                self.fb_mut()
                    .scroll_up(top, bottom, left, right, 1, blank, into_history);
            }
        } else if self.cursor_row + 1 < self.height() {
            self.cursor_row += 1;
        }
        self.last_col = false;
    }

    fn reverse_index(&mut self) {
        if self.cursor_row == self.top() {
            if self.in_horizontal_region() {
                let (top, bottom, left, right, blank) = self.region();
                self.fb_mut().scroll_down(top, bottom, left, right, 1, blank);
            }
        } else if self.cursor_row > 0 {
            self.cursor_row -= 1;
        }
        self.last_col = false;
    }

    fn back_index(&mut self) {
        if self.cursor_col == self.left() {
            if self.in_vertical_region() {
                let (top, bottom, left, right, blank) = self.region();
                self.fb_mut().insert_columns(top, bottom, left, right, 1, blank);
            }
        } else if self.cursor_col > 0 {
            self.cursor_col -= 1;
        }
        self.last_col = false;
    }

    fn forward_index(&mut self) {
        if self.cursor_col + 1 == self.right() {
            if self.in_vertical_region() {
                let (top, bottom, left, right, blank) = self.region();
                self.fb_mut().delete_columns(top, bottom, left, right, 1, blank);
            }
        } else if self.cursor_col + 1 < self.width() {
            self.cursor_col += 1;
        }
        self.last_col = false;
    }

    // ── Printing ────────────────────────────────────────────────────────

    fn print(&mut self, grapheme: &str) {
        let width = UnicodeWidthStr::width(grapheme).min(2) as u16;
        if width == 0 {
            self.combine(grapheme);
            return;
        }
        let autowrap = self.modes.autowrap();
        if self.last_col && autowrap {
            self.wrap_line();
        }

        let (left, right) = self.line_bounds();
        let width = if right - left < 2 { 1 } else { width };
        if width == 2 && self.cursor_col + 1 >= right {
            if autowrap {
                let (row, col, blank) = (self.cursor_row, self.cursor_col, self.blank());
                if let Some(cell) = self.fb_mut().cell_mut(row, col) {
                    cell.reset(blank);
                    cell.set_early_wrap(true);
                }
                self.wrap_line();
            } else {
                self.cursor_col = right - 2;
            }
        }

        let (_, right) = self.line_bounds();
        let (row, col) = (self.cursor_row, self.cursor_col);
        let (renditions, blank) = (self.renditions, self.blank());
        let link = self.current_link();
        let insert = self.modes.insert_mode();

        let line = self.fb_mut().row_mut(row);
        let wrapped = line.wrap();
        if insert {
            line.insert_cells(col, width, right, blank);
        }
        line.split_wide_at(usize::from(col), blank);
        line.split_wide_at(usize::from(col + width), blank);
        let cells = line.cells_mut();
        if let Some(cell) = cells.get_mut(usize::from(col)) {
            cell.set_grapheme(grapheme, renditions, width == 2, link);
        }
        if width == 2 {
            if let Some(cell) = cells.get_mut(usize::from(col) + 1) {
                cell.set_continuation(renditions, link);
            }
        }
        if wrapped {
            line.set_wrap(true);
        }

        if col + width >= right {
            self.cursor_col = right - 1;
            self.last_col = true;
        } else {
            self.cursor_col = col + width;
            self.last_col = false;
        }
    }

    /// Horizontal bounds that apply to the cursor: the margins when it is
    /// inside them, otherwise the screen.
    fn line_bounds(&self) -> (u16, u16) {
        if self.in_horizontal_region() {
            (self.left(), self.right())
        } else {
            (0, self.width())
        }
    }

    /// Attach a zero-width grapheme to the cell before the cursor.
    fn combine(&mut self, marks: &str) {
        let row = self.cursor_row;
        let mut col = if self.last_col || self.cursor_col == 0 {
            self.cursor_col
        } else {
            self.cursor_col - 1
        };
        let fb = self.fb_mut();
        if col > 0 && fb.cell(row, col).is_some_and(|c| c.is_continuation()) {
            col -= 1;
        }
        if let Some(cell) = fb.cell_mut(row, col) {
            cell.append_combining(marks);
        }
    }

    fn wrap_line(&mut self) {
        let row = self.cursor_row;
        self.fb_mut().row_mut(row).set_wrap(true);
        self.carriage_return();
        self.index();
        self.last_col = false;
    }

    // ── Tabs ────────────────────────────────────────────────────────────

    fn tab_forward(&mut self, n: u16) {
        let limit = if self.cursor_col < self.right() {
            self.right() - 1
        } else {
            self.width() - 1
        };
        let stops = self.tab_stops();
        for _ in 0..n.min(self.width()) {
            match stops.iter().find(|&&s| s > self.cursor_col) {
                Some(&stop) if stop <= limit => self.cursor_col = stop,
                _ => {
                    self.cursor_col = limit;
                    break;
                }
            }
        }
        self.last_col = false;
    }

    fn tab_backward(&mut self, n: u16) {
        let limit = if self.cursor_col >= self.left() { self.left() } else { 0 };
        let stops = self.tab_stops();
        for _ in 0..n.min(self.width()) {
            match stops.iter().rev().find(|&&s| s < self.cursor_col) {
                Some(&stop) if stop >= limit => self.cursor_col = stop,
                _ => {
                    self.cursor_col = limit;
                    break;
                }
            }
        }
        self.last_col = false;
    }

    fn set_tab_stop(&mut self) {
        let col = self.cursor_col;
        let mut stops = self.tab_stops();
        if let Err(pos) = stops.binary_search(&col) {
            stops.insert(pos, col);
        }
        self.tabs = Some(stops);
    }

    fn tab_clear(&mut self, p: u16) {
        match p {
            0 => {
                let col = self.cursor_col;
                let mut stops = self.tab_stops();
                stops.retain(|&s| s != col);
                self.tabs = Some(stops);
            }
            3 => self.tabs = Some(Vec::new()),
            _ => debug!(param = p, "TBC: ignored"),
        }
    }

    // ── Erase / insert / delete ─────────────────────────────────────────

    fn erase_in_line(&mut self, mode: EraseMode) {
        let (row, col, width, blank) = (self.cursor_row, self.cursor_col, self.width(), self.blank());
        let line = self.fb_mut().row_mut(row);
        match mode {
            EraseMode::Below => line.erase(col, width, blank),
            EraseMode::Above => line.erase(0, col + 1, blank),
            EraseMode::All => line.erase(0, width, blank),
            EraseMode::Saved => debug!("EL 3: ignored"),
        }
    }

    fn erase_in_display(&mut self, mode: EraseMode) {
        let (row, height, blank) = (self.cursor_row, self.height(), self.blank());
        match mode {
            EraseMode::Below => {
                self.erase_in_line(EraseMode::Below);
                self.fb_mut().erase_rows(row + 1, height, blank);
            }
            EraseMode::Above => {
                self.fb_mut().erase_rows(0, row, blank);
                self.erase_in_line(EraseMode::Above);
            }
            EraseMode::All => self.fb_mut().erase_rows(0, height, blank),
            EraseMode::Saved => self.fb_mut().clear_history(),
        }
    }

    fn insert_chars(&mut self, n: u16) {
        let (_, right) = self.line_bounds();
        let (row, col, blank) = (self.cursor_row, self.cursor_col, self.blank());
        self.fb_mut().row_mut(row).insert_cells(col, n, right, blank);
        self.last_col = false;
    }

    fn delete_chars(&mut self, n: u16) {
        let (_, right) = self.line_bounds();
        let (row, col, blank) = (self.cursor_row, self.cursor_col, self.blank());
        self.fb_mut().row_mut(row).delete_cells(col, n, right, blank);
        self.last_col = false;
    }

    fn insert_lines(&mut self, n: u16) {
        if !(self.in_vertical_region() && self.in_horizontal_region()) {
            return;
        }
        let (_, bottom, left, right, blank) = self.region();
        let row = self.cursor_row;
        self.fb_mut().scroll_down(row, bottom, left, right, n, blank);
        self.cursor_col = left;
        self.last_col = false;
    }

    fn delete_lines(&mut self, n: u16) {
        if !(self.in_vertical_region() && self.in_horizontal_region()) {
            return;
        }
        let (_, bottom, left, right, blank) = self.region();
        let row = self.cursor_row;
        self.fb_mut()
            .scroll_up(row, bottom, left, right, n, blank, false);
        self.cursor_col = left;
        self.last_col = false;
    }

    fn screen_alignment(&mut self) {
        let fb = self.fb_mut();
        fb.reset_vertical_margins();
        fb.reset_horizontal_margins();
        let rows = fb.rows();
        for r in 0..rows {
            for cell in fb.row_mut(r).cells_mut() {
                cell.set_grapheme("E", Renditions::default(), false, 0);
            }
        }
        self.cursor_row = 0;
        self.cursor_col = 0;
        self.last_col = false;
    }

    // ── Margins ─────────────────────────────────────────────────────────

    fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let height = self.height();
        let top = top.max(1);
        let bottom = if bottom == 0 { height } else { bottom.min(height) };
        if top >= bottom {
            warn!(top, bottom, "DECSTBM: invalid scrolling region");
            return;
        }
        self.fb_mut().set_vertical_margins(top - 1, bottom);
        self.home_cursor();
    }

    fn set_left_right_margins(&mut self, left: u16, right: u16) {
        let width = self.width();
        let left = left.max(1);
        let right = if right == 0 { width } else { right.min(width) };
        if left >= right {
            warn!(left, right, "DECSLRM: invalid margins");
            return;
        }
        self.fb_mut().set_horizontal_margins(left - 1, right);
        self.home_cursor();
    }

    // ── Modes ───────────────────────────────────────────────────────────

    fn set_private_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            2 => {
                if !enable {
                    self.modes.compat_level = CompatLevel::Vt52;
                    debug!("entering VT52 mode");
                }
            }
            3 => {
                self.modes.column_132 = enable;
                let (height, blank) = (self.height(), self.blank());
                let fb = self.fb_mut();
                fb.reset_vertical_margins();
                fb.reset_horizontal_margins();
                fb.erase_rows(0, height, blank);
                self.cursor_row = 0;
                self.cursor_col = 0;
                self.last_col = false;
            }
            6 => {
                self.modes.set_dec_mode(6, enable);
                self.home_cursor();
            }
            69 => {
                self.modes.set_dec_mode(69, enable);
                if !enable {
                    for fb in &mut self.screens {
                        fb.reset_horizontal_margins();
                    }
                }
            }
            47 => self.switch_screen(if enable {
                Screen::Alternate
            } else {
                Screen::Primary
            }),
            1047 => {
                if enable {
                    self.switch_screen(Screen::Alternate);
                } else {
                    if self.is_alternate_screen() {
                        self.clear_alternate();
                    }
                    self.switch_screen(Screen::Primary);
                }
            }
            1048 => {
                if enable {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if enable {
                    if !self.is_alternate_screen() {
                        self.save_cursor();
                        self.switch_screen(Screen::Alternate);
                        self.clear_alternate();
                    }
                } else if self.is_alternate_screen() {
                    self.switch_screen(Screen::Primary);
                    self.restore_cursor();
                }
            }
            _ => {
                if !self.modes.set_dec_mode(mode, enable) {
                    warn!(mode, enable, "DECSET/DECRST: unrecognized mode");
                }
            }
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        if self.active == screen {
            return;
        }
        debug!(?screen, "switching screen buffer");
        self.active = screen;
        self.last_col = false;
        self.clamp_cursor();
    }

    fn clear_alternate(&mut self) {
        let blank = self.blank();
        let alt = &mut self.screens[Screen::Alternate.index()];
        let rows = alt.rows();
        alt.erase_rows(0, rows, blank);
    }

    fn request_mode(&mut self, private: bool, mode: u16) {
        let state = if private {
            match mode {
                47 | 1047 | 1049 => Some(self.is_alternate_screen()),
                _ => self.modes.dec_mode(mode),
            }
        } else {
            self.modes.ansi_mode(mode)
        };
        let value = match state {
            Some(true) => 1,
            Some(false) => 2,
            None => 0,
        };
        let marker = if private { "?" } else { "" };
        self.reply
            .push_str(&format!("\x1b[{marker}{mode};{value}$y"));
    }

    // ── Save / restore ──────────────────────────────────────────────────

    fn save_cursor(&mut self) {
        self.saved_dec[self.active.index()] = Some(SavedCursor {
            row: self.cursor_row,
            col: self.cursor_col,
            last_col: self.last_col,
            renditions: self.renditions,
            origin: self.modes.origin_mode(),
            autowrap: self.modes.autowrap(),
            charsets: self.charsets,
            link: self.link_url.clone(),
        });
    }

    fn restore_cursor(&mut self) {
        let Some(saved) = self.saved_dec[self.active.index()].clone() else {
            info!("DECRC: restore before any save, ignoring");
            return;
        };
        self.cursor_row = saved.row;
        self.cursor_col = saved.col;
        self.last_col = saved.last_col;
        self.renditions = saved.renditions;
        self.modes.set_dec_mode(6, saved.origin);
        self.modes.set_dec_mode(7, saved.autowrap);
        self.charsets = saved.charsets;
        self.link_url = saved.link;
        self.clamp_cursor();
    }

    // ── Resets ──────────────────────────────────────────────────────────

    fn soft_reset(&mut self) {
        self.modes.set_ansi_mode(4, false);
        self.modes.set_dec_mode(6, false);
        self.modes.set_dec_mode(25, true);
        self.modes.set_dec_mode(1, false);
        self.modes.keypad = KeypadMode::Numeric;
        let fb = self.fb_mut();
        fb.reset_vertical_margins();
        fb.reset_horizontal_margins();
        self.renditions = Renditions::default();
        self.charsets = CharsetState::default();
        self.saved_dec = [None, None];
    }

    fn full_reset(&mut self) {
        for fb in &mut self.screens {
            fb.reset();
        }
        self.primary_mut().clear_titles();
        self.active = Screen::Primary;
        self.cursor_row = 0;
        self.cursor_col = 0;
        self.last_col = false;
        self.renditions = Renditions::default();
        self.link_url.clear();
        self.modes.reset();
        self.tabs = None;
        self.charsets = CharsetState::default();
        self.saved_dec = [None, None];
        self.saved_sco = None;
        self.palette.clear();
        self.dynamic_colors.clear();
    }

    // ── Reports ─────────────────────────────────────────────────────────

    fn device_status(&mut self, private: bool, code: u16) {
        match (private, code) {
            (false, 5) => self.reply.push_str("\x1b[0n"),
            (_, 6) => {
                let (mut row, mut col) = (self.cursor_row + 1, self.cursor_col + 1);
                if self.modes.origin_mode() {
                    row = row.saturating_sub(self.top());
                    col = col.saturating_sub(self.left());
                }
                let marker = if private { "?" } else { "" };
                self.reply.push_str(&format!("\x1b[{marker}{row};{col}R"));
            }
            _ => warn!(private, code, "DSR: unsupported report"),
        }
    }

    fn window_ops(&mut self, params: &[u16]) {
        let p = |i: usize| params.get(i).copied().unwrap_or(0);
        match p(0) {
            8 => {
                let rows = if p(1) == 0 { self.height() } else { p(1) };
                let cols = if p(2) == 0 { self.width() } else { p(2) };
                self.resize(cols, rows);
            }
            18 => {
                let reply = format!("\x1b[8;{};{}t", self.height(), self.width());
                self.reply.push_str(&reply);
            }
            22 => self.primary_mut().push_title(),
            23 => {
                let which = p(1);
                if !self.primary_mut().pop_title(which != 2, which != 1) {
                    info!("XTWINOPS 23: title stack is empty");
                }
            }
            op => debug!(op, "XTWINOPS: ignored"),
        }
    }

    fn set_palette(&mut self, arg: &str) {
        let mut parts = arg.split(';');
        while let (Some(idx), Some(spec)) = (parts.next(), parts.next()) {
            let Ok(idx) = idx.parse::<u8>() else {
                warn!(idx, "OSC 4: bad palette index");
                continue;
            };
            if spec == "?" {
                let rgb = format_color_spec(self.palette_color(idx));
                self.reply.push_str(&format!("\x1b]4;{idx};{rgb}\x1b\\"));
            } else if let Some(rgb) = parse_color_spec(spec) {
                self.palette.insert(idx, rgb);
            } else {
                warn!(idx, spec, "OSC 4: can't parse color");
            }
        }
    }

    fn set_dynamic_colors(&mut self, code: u16, arg: &str) {
        for (code, spec) in (code..=19).zip(arg.split(';')) {
            if spec == "?" {
                let rgb = format_color_spec(self.dynamic_color(code));
                self.reply.push_str(&format!("\x1b]{code};{rgb}\x1b\\"));
            } else if let Some(rgb) = parse_color_spec(spec) {
                self.dynamic_colors.insert(code, rgb);
                if code == 12 {
                    for fb in &mut self.screens {
                        fb.set_cursor_color(Some(rgb));
                    }
                }
            } else {
                warn!(code, spec, "OSC 10-19: can't parse color");
            }
        }
    }

    fn selection_data(&mut self, targets: &str, data: &str) {
        let targets = if targets.is_empty() { "s0" } else { targets };
        if data == "?" {
            let first = targets.chars().next().unwrap_or('s');
            let payload = self.selection.get(&first).cloned().unwrap_or_default();
            self.reply
                .push_str(&format!("\x1b]52;{first};{payload}\x1b\\"));
            return;
        }
        if !data.is_empty() && STANDARD.decode(data).is_err() {
            warn!(targets, len = data.len(), "OSC 52: invalid base64 payload");
            return;
        }
        for target in targets.chars() {
            self.selection.insert(target, data.to_owned());
        }
        self.selection_generation += 1;
        self.last_selection = Some((targets.to_owned(), data.to_owned()));
    }

    fn request_status(&mut self, setting: &str) {
        let body = match setting {
            "m" => Some(format!("{}m", self.renditions.sgr_params())),
            "r" => Some(format!("{};{}r", self.top() + 1, self.bottom())),
            "s" => Some(format!("{};{}s", self.left() + 1, self.right())),
            " q" => Some(format!("{} q", self.fb().cursor_style().param())),
            "\"p" => {
                let level = match self.modes.compat_level {
                    CompatLevel::Vt400 => 64,
                    CompatLevel::Vt100 | CompatLevel::Vt52 => 61,
                };
                Some(format!("{level};1\"p"))
            }
            _ => None,
        };
        match body {
            Some(body) => self.reply.push_str(&format!("\x1bP1$r{body}\x1b\\")),
            None => {
                warn!(setting, "DECRQSS: unsupported setting");
                self.reply.push_str(&format!("\x1bP0$r{setting}\x1b\\"));
            }
        }
    }
}

fn default_dynamic_color(code: u16) -> (u8, u8, u8) {
    match code {
        11 | 14 | 16 | 17 => (0, 0, 0),
        _ => (229, 229, 229),
    }
}
