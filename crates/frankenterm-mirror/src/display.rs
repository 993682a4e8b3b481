//! Differential renderer.
//!
//! [`Display::new_frame`] compares two [`Emulator`] snapshots and produces the
//! control sequences that turn a terminal showing the first into one showing
//! the second. The output is plain VT text: it can be written to a real
//! terminal or fed to another `Emulator` to reproduce the target state.
//!
//! # Frame layout
//!
//! A frame is emitted in a fixed order so that each step can rely on what the
//! previous steps established:
//!
//! 1. hide the cursor if any row will be repainted;
//! 2. reset the margins, so printing and scrolling cover the whole screen;
//! 3. bell, title stack, titles, and modes;
//! 4. alternate-screen switch and/or clear screen;
//! 5. a scroll shortcut when the screen scrolled as a whole;
//! 6. changed rows, cell run by cell run;
//! 7. tab stops, margins, cursor position, renditions, cursor visibility;
//! 8. pending clipboard (OSC 52) data.
//!
//! The replica is assumed to use UTF-8 with default character sets, origin
//! mode off, insert mode off, and autowrap on. The renderer never changes
//! those.

use std::fmt::Write as _;

use tracing::trace;

use crate::capabilities::TerminalCapabilities;
use crate::cell::{Cell, LinkSet};
use crate::emulator::Emulator;
use crate::error::CapabilityError;
use crate::framebuffer::TitleEntry;
use crate::renditions::{Renditions, format_color_spec};
use crate::row::Row;

/// DEC private modes transported as plain set/reset flags.
const FLAG_MODES: [u16; 4] = [5, 1004, 1007, 2004];
/// Mouse tracking modes, most inclusive first.
const MOUSE_TRACKING_MODES: [u16; 5] = [1003, 1002, 1001, 1000, 9];
const MOUSE_ENCODING_MODES: [u16; 3] = [1015, 1006, 1005];

/// Largest cursor delta worth expressing with CR/LF or backspaces.
const RELATIVE_MOVE_LIMIT: u16 = 5;
/// Shortest blank run worth an ECH instead of spaces.
const ECH_MIN_RUN: usize = 5;

/// Margins as `(top, bottom, left, right)` with exclusive ends.
type Margins = (u16, u16, u16, u16);

/// Differential renderer for one output terminal.
#[derive(Debug, Clone)]
pub struct Display {
    has_ech: bool,
    has_bce: bool,
    has_title: bool,
    smcup: Option<String>,
    rmcup: Option<String>,
}

impl Default for Display {
    fn default() -> Self {
        Self::new(&TerminalCapabilities::default())
    }
}

impl Display {
    #[must_use]
    pub fn new(caps: &TerminalCapabilities) -> Self {
        Self {
            has_ech: caps.ech,
            has_bce: caps.bce,
            has_title: caps.title,
            smcup: caps.smcup.clone(),
            rmcup: caps.rmcup.clone(),
        }
    }

    /// A renderer for the terminal named by `TERM`.
    pub fn from_env() -> Result<Self, CapabilityError> {
        TerminalCapabilities::from_env().map(|caps| Self::new(&caps))
    }

    /// Sequence that prepares the output terminal for a session: enter the
    /// alternate screen and application cursor-key mode.
    #[must_use]
    pub fn open(&self) -> String {
        let mut out = self.smcup.clone().unwrap_or_default();
        out.push_str("\x1b[?1h");
        out
    }

    /// Sequence that restores the output terminal after a session.
    #[must_use]
    pub fn close(&self) -> String {
        let mut out = String::from("\x1b[?1l\x1b[0m\x1b[?25h");
        for mode in MOUSE_TRACKING_MODES.iter().chain(&MOUSE_ENCODING_MODES) {
            let _ = write!(out, "\x1b[?{mode}l");
        }
        out.push_str(self.rmcup.as_deref().unwrap_or_default());
        out
    }

    /// Control sequences that turn a terminal showing `last` into one
    /// showing `f`.
    ///
    /// With `initialized == false` nothing is assumed about the terminal: the
    /// screen is cleared and everything is sent. A size change between the
    /// two snapshots has the same effect.
    #[must_use]
    pub fn new_frame(&self, initialized: bool, last: &Emulator, f: &Emulator) -> String {
        let (width, height) = (f.width(), f.height());
        let initialized = initialized && last.width() == width && last.height() == height;
        let alt_changed = if initialized {
            last.is_alternate_screen() != f.is_alternate_screen()
        } else {
            f.is_alternate_screen()
        };
        let clear = !initialized || alt_changed;
        let scroll = if clear { 0 } else { scroll_shift(last, f) };

        let baseline = Baseline {
            last: (!clear).then_some(last),
            scroll,
            blank: Row::new(width, Renditions::default()),
            no_links: LinkSet::new(),
        };
        let dirty: Vec<u16> = (0..height)
            .filter(|&r| baseline.row(r).0 != f.fb().row(r))
            .collect();
        let repaint = clear || scroll > 0 || !dirty.is_empty();

        let mut frame = if initialized {
            FrameState::resume(last)
        } else {
            FrameState::unknown(width, height)
        };

        if repaint {
            frame.set_cursor_visible(false);
            self.normalize_margins(&mut frame, initialized);
        }

        if initialized && f.primary().bell_count() != last.primary().bell_count() {
            frame.append("\x07");
        }
        if self.has_title {
            self.update_titles(&mut frame, initialized, last, f);
        }
        self.update_modes(&mut frame, initialized, last, f);

        if alt_changed {
            frame.append(if f.is_alternate_screen() {
                "\x1b[?1049h"
            } else {
                "\x1b[?1049l"
            });
            // The newly active buffer brings its own margins and the
            // restore may move the cursor or change renditions.
            frame.rendition = None;
            frame.cursor = None;
            frame.margins = None;
            self.normalize_margins(&mut frame, true);
        }
        if clear {
            frame.update_rendition(&Renditions::default());
            frame.append("\x1b[H\x1b[2J");
            frame.cursor = Some((0, 0));
        }

        if scroll > 0 {
            trace!(scroll, "scrolling replica instead of repainting");
            frame.append_move(height - 1, 0);
            frame.update_rendition(&Renditions::default());
            for _ in 0..scroll {
                frame.append("\n");
            }
        }

        for &r in &dirty {
            let (old, old_links) = baseline.row(r);
            self.put_row(&mut frame, r, f.fb().row(r), f.fb().links(), old, old_links);
        }
        frame.update_link(None);

        let old_tabs = if initialized {
            last.tab_stops()
        } else {
            (8..width).step_by(8).collect()
        };
        let new_tabs = f.tab_stops();
        if new_tabs != old_tabs {
            frame.append("\x1b[3g");
            for &stop in &new_tabs {
                frame.append(&format!("\x1b[{}G\x1bH", stop + 1));
            }
            if let (Some((row, _)), Some(&stop)) = (frame.cursor, new_tabs.last()) {
                frame.cursor = Some((row, stop));
            }
        }

        self.update_margins(&mut frame, f);
        frame.append_move(f.cursor_row(), f.cursor_col());
        frame.update_rendition(f.renditions());
        frame.set_cursor_visible(f.cursor_visible());

        if f.selection_generation() != last.selection_generation() {
            if let Some((targets, data)) = f.last_selection() {
                frame.append(&format!("\x1b]52;{targets};{data}\x07"));
            }
        }

        frame.out
    }

    /// Put the output terminal's margins back to the full screen.
    fn normalize_margins(&self, frame: &mut FrameState, known: bool) {
        let full = frame.full_margins();
        match frame.margins {
            Some(m) if known && m == full => {}
            Some(m) if known => {
                if (m.0, m.1) != (full.0, full.1) {
                    frame.append("\x1b[r");
                }
                if (m.2, m.3) != (full.2, full.3) {
                    frame.append("\x1b[s");
                }
                frame.cursor = Some((0, 0));
            }
            _ => {
                if frame.lr_mode == Some(true) {
                    frame.append("\x1b[s");
                } else if frame.lr_mode.is_none() {
                    frame.append("\x1b[?69l");
                    frame.lr_mode = Some(false);
                }
                frame.append("\x1b[r");
                frame.cursor = Some((0, 0));
            }
        }
        frame.margins = Some(full);
    }

    fn update_margins(&self, frame: &mut FrameState, f: &Emulator) {
        let fb = f.fb();
        let target = (
            fb.margin_top(),
            fb.margin_bottom(),
            fb.margin_left(),
            fb.margin_right(),
        );
        let current = frame.margins.unwrap_or_else(|| frame.full_margins());
        if frame.margins.is_none() || (current.0, current.1) != (target.0, target.1) {
            frame.append(&format!("\x1b[{};{}r", target.0 + 1, target.1));
            frame.cursor = Some((0, 0));
        }
        if (current.2, current.3) != (target.2, target.3) && frame.lr_mode == Some(true) {
            frame.append(&format!("\x1b[{};{}s", target.2 + 1, target.3));
            frame.cursor = Some((0, 0));
        }
        frame.margins = Some(target);
    }

    fn update_titles(&self, frame: &mut FrameState, initialized: bool, last: &Emulator, f: &Emulator) {
        let (old_stack, mut current): (&[TitleEntry], Option<TitleEntry>) = if initialized {
            (
                last.primary().title_stack(),
                Some(TitleEntry {
                    icon: last.icon_name().to_owned(),
                    title: last.window_title().to_owned(),
                }),
            )
        } else {
            (&[], None)
        };
        let new_stack = f.primary().title_stack();
        let common = old_stack
            .iter()
            .zip(new_stack)
            .take_while(|(a, b)| a == b)
            .count();
        for entry in old_stack[common..].iter().rev() {
            frame.append("\x1b[23t");
            current = Some(entry.clone());
        }
        for entry in &new_stack[common..] {
            set_titles(frame, &mut current, entry);
            frame.append("\x1b[22t");
        }
        if f.primary().is_title_initialized() {
            let target = TitleEntry {
                icon: f.icon_name().to_owned(),
                title: f.window_title().to_owned(),
            };
            set_titles(frame, &mut current, &target);
        }
    }

    fn update_modes(&self, frame: &mut FrameState, initialized: bool, last: &Emulator, f: &Emulator) {
        let old = initialized.then(|| last.modes());
        let new = f.modes();

        for mode in FLAG_MODES {
            let on = new.dec_mode(mode).unwrap_or(false);
            if old.and_then(|m| m.dec_mode(mode)) != Some(on) {
                frame.append(&set_mode(mode, on));
            }
        }

        let lr = new.horizontal_margins();
        if frame.lr_mode != Some(lr) {
            frame.append(&set_mode(69, lr));
            if !lr {
                if let Some(m) = frame.margins.as_mut() {
                    m.2 = 0;
                    m.3 = frame.width;
                }
            }
            frame.lr_mode = Some(lr);
        }

        let old_tracking = old.map(|m| m.mouse_tracking);
        if old_tracking != Some(new.mouse_tracking) {
            match old_tracking {
                Some(t) => {
                    if let Some(mode) = t.mode() {
                        frame.append(&set_mode(mode, false));
                    }
                }
                None => {
                    for mode in MOUSE_TRACKING_MODES {
                        frame.append(&set_mode(mode, false));
                    }
                }
            }
            if let Some(mode) = new.mouse_tracking.mode() {
                frame.append(&set_mode(mode, true));
            }
        }

        let old_encoding = old.map(|m| m.mouse_encoding);
        if old_encoding != Some(new.mouse_encoding) {
            match old_encoding {
                Some(e) => {
                    if let Some(mode) = e.mode() {
                        frame.append(&set_mode(mode, false));
                    }
                }
                None => {
                    for mode in MOUSE_ENCODING_MODES {
                        frame.append(&set_mode(mode, false));
                    }
                }
            }
            if let Some(mode) = new.mouse_encoding.mode() {
                frame.append(&set_mode(mode, true));
            }
        }

        let style = f.fb().cursor_style();
        if !initialized || last.fb().cursor_style() != style {
            frame.append(&format!("\x1b[{} q", style.param()));
        }
        let color = f.fb().cursor_color();
        if (initialized && last.fb().cursor_color() != color) || (!initialized && color.is_some()) {
            match color {
                Some(rgb) => frame.append(&format!("\x1b]12;{}\x07", format_color_spec(rgb))),
                None => frame.append("\x1b]112\x07"),
            }
        }
    }

    /// Repaint the cells of one row that differ from what the terminal shows.
    fn put_row(
        &self,
        frame: &mut FrameState,
        row: u16,
        new: &Row,
        links: &LinkSet,
        old: &Row,
        old_links: &LinkSet,
    ) {
        let cells = new.cells();
        let old_cells = old.cells();
        let len = cells.len();
        let mut col = 0;
        while col < len {
            let cell = &cells[col];
            if cell.is_continuation() {
                col += 1;
                continue;
            }
            let end = (col + usize::from(cell.width())).min(len);
            let unchanged = (col..end).all(|c| {
                old_cells
                    .get(c)
                    .is_some_and(|o| cells_match(o, old_links, &cells[c], links))
            });
            if unchanged {
                col = end;
                continue;
            }

            if self.erasable(cell) {
                let run = cells[col..]
                    .iter()
                    .take_while(|c| self.erasable(c) && c.renditions() == cell.renditions())
                    .count();
                if col + run == len {
                    frame.append_move(row, col as u16);
                    frame.update_rendition(cell.renditions());
                    frame.append("\x1b[K");
                    break;
                }
                if self.has_ech && run >= ECH_MIN_RUN {
                    frame.append_move(row, col as u16);
                    frame.update_rendition(cell.renditions());
                    frame.append(&format!("\x1b[{run}X"));
                    col += run;
                    continue;
                }
            }

            frame.append_move(row, col as u16);
            frame.update_link(links.get(cell.link()));
            frame.update_rendition(cell.renditions());
            cell.write_printable(&mut frame.out);
            frame.advance(cell.width());
            col = end;
        }
    }

    /// Whether an erase can reproduce the cell.
    fn erasable(&self, cell: &Cell) -> bool {
        cell.is_empty()
            && !cell.is_continuation()
            && cell.link() == 0
            && *cell.renditions() == cell.renditions().background()
            && (self.has_bce || cell.renditions().is_default())
    }
}

/// What the output terminal shows before the rows are repainted: the
/// previous frame shifted by `scroll` rows, or blank after a clear.
struct Baseline<'a> {
    last: Option<&'a Emulator>,
    scroll: u16,
    blank: Row,
    no_links: LinkSet,
}

impl Baseline<'_> {
    fn row(&self, r: u16) -> (&Row, &LinkSet) {
        if let Some(last) = self.last {
            if let Some(src) = r.checked_add(self.scroll).filter(|&src| src < last.height()) {
                return (last.fb().row(src), last.fb().links());
            }
        }
        (&self.blank, &self.no_links)
    }
}

/// Rows the screen scrolled up by, when replaying that scroll is cheaper than
/// repainting. Zero otherwise.
fn scroll_shift(last: &Emulator, f: &Emulator) -> u16 {
    if last.is_alternate_screen() != f.is_alternate_screen() {
        return 0;
    }
    let height = f.height();
    let delta = f.fb().scroll_count().saturating_sub(last.fb().scroll_count());
    let Ok(delta) = u16::try_from(delta) else {
        return 0;
    };
    if delta == 0 || delta >= height {
        return 0;
    }
    let shifted = (0..height - delta)
        .filter(|&r| f.fb().row(r) == last.fb().row(r + delta))
        .count();
    let unshifted = (0..height)
        .filter(|&r| f.fb().row(r) == last.fb().row(r))
        .count();
    if shifted > unshifted { delta } else { 0 }
}

/// Whether two cells look the same, including their hyperlink targets.
fn cells_match(a: &Cell, a_links: &LinkSet, b: &Cell, b_links: &LinkSet) -> bool {
    a.contents_match(b)
        && a.renditions() == b.renditions()
        && a.is_wide() == b.is_wide()
        && a.is_continuation() == b.is_continuation()
        && a_links.get(a.link()) == b_links.get(b.link())
}

fn set_mode(mode: u16, on: bool) -> String {
    format!("\x1b[?{mode}{}", if on { 'h' } else { 'l' })
}

/// Emit the OSC sequences that change the terminal's titles from `current`
/// to `target`, preferring OSC 0 when icon and title agree.
fn set_titles(frame: &mut FrameState, current: &mut Option<TitleEntry>, target: &TitleEntry) {
    if current.as_ref() == Some(target) {
        return;
    }
    if target.icon == target.title {
        frame.append(&format!("\x1b]0;{}\x07", target.title));
    } else {
        let (icon_known, title_known) = match current {
            Some(cur) => (cur.icon == target.icon, cur.title == target.title),
            None => (false, false),
        };
        if !icon_known {
            frame.append(&format!("\x1b]1;{}\x07", target.icon));
        }
        if !title_known {
            frame.append(&format!("\x1b]2;{}\x07", target.title));
        }
    }
    *current = Some(target.clone());
}

/// What the renderer knows about the output terminal while building a frame.
/// `None` means unknown.
#[derive(Debug)]
struct FrameState {
    out: String,
    width: u16,
    height: u16,
    /// Column may equal `width`: the cursor sits on the last column with a
    /// wrap pending.
    cursor: Option<(u16, u16)>,
    rendition: Option<Renditions>,
    cursor_visible: Option<bool>,
    margins: Option<Margins>,
    lr_mode: Option<bool>,
    link: Option<String>,
}

impl FrameState {
    fn unknown(width: u16, height: u16) -> Self {
        Self {
            out: String::new(),
            width,
            height,
            cursor: None,
            rendition: None,
            cursor_visible: None,
            margins: None,
            lr_mode: None,
            link: None,
        }
    }

    /// State left behind by the frame that drew `last`.
    fn resume(last: &Emulator) -> Self {
        let fb = last.fb();
        Self {
            out: String::new(),
            width: last.width(),
            height: last.height(),
            cursor: Some((last.cursor_row(), last.cursor_col())),
            rendition: Some(*last.renditions()),
            cursor_visible: Some(last.cursor_visible()),
            margins: Some((
                fb.margin_top(),
                fb.margin_bottom(),
                fb.margin_left(),
                fb.margin_right(),
            )),
            lr_mode: Some(last.modes().horizontal_margins()),
            link: None,
        }
    }

    fn full_margins(&self) -> Margins {
        (0, self.height, 0, self.width)
    }

    fn append(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn append_move(&mut self, row: u16, col: u16) {
        if self.cursor == Some((row, col)) {
            return;
        }
        let absolute = format!("\x1b[{};{}H", row + 1, col + 1);
        let relative = match self.cursor {
            Some((r, c)) if self.margins == Some(self.full_margins()) => {
                if col == 0 && row >= r && row - r < RELATIVE_MOVE_LIMIT {
                    let mut s = String::from("\r");
                    s.extend(std::iter::repeat_n('\n', usize::from(row - r)));
                    Some(s)
                } else if row == r && col < c && c < self.width && c - col < RELATIVE_MOVE_LIMIT {
                    Some("\x08".repeat(usize::from(c - col)))
                } else if row == r && col > c && c < self.width {
                    Some(match col - c {
                        1 => "\x1b[C".to_owned(),
                        n => format!("\x1b[{n}C"),
                    })
                } else {
                    None
                }
            }
            _ => None,
        };
        match relative {
            Some(rel) if rel.len() < absolute.len() => self.out.push_str(&rel),
            _ => self.out.push_str(&absolute),
        }
        self.cursor = Some((row, col));
    }

    fn advance(&mut self, cols: u16) {
        if let Some((row, col)) = self.cursor {
            self.cursor = Some((row, (col + cols).min(self.width)));
        }
    }

    fn update_rendition(&mut self, r: &Renditions) {
        if self.rendition.as_ref() != Some(r) {
            self.out.push_str(&r.sgr());
            self.rendition = Some(*r);
        }
    }

    fn update_link(&mut self, url: Option<&str>) {
        if self.link.as_deref() == url {
            return;
        }
        match url {
            Some(url) => {
                let _ = write!(self.out, "\x1b]8;;{url}\x1b\\");
                self.link = Some(url.to_owned());
            }
            None => {
                self.out.push_str("\x1b]8;;\x1b\\");
                self.link = None;
            }
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        if self.cursor_visible != Some(visible) {
            self.out
                .push_str(if visible { "\x1b[?25h" } else { "\x1b[?25l" });
            self.cursor_visible = Some(visible);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emu_with(input: &str) -> Emulator {
        let mut e = Emulator::new(20, 6, 10);
        e.handle_stream(input.as_bytes());
        e
    }

    /// Drive a fresh replica through `frames` and return it.
    fn replay(display: &Display, frames: &[&Emulator]) -> Emulator {
        let first = frames[0];
        let mut replica = Emulator::new(first.width(), first.height(), 0);
        let blank = Emulator::new(first.width(), first.height(), 0);
        replica.handle_stream(display.new_frame(false, &blank, first).as_bytes());
        for pair in frames.windows(2) {
            replica.handle_stream(display.new_frame(true, pair[0], pair[1]).as_bytes());
        }
        replica
    }

    fn assert_same_screen(a: &Emulator, b: &Emulator) {
        assert_eq!((a.cursor_row(), a.cursor_col()), (b.cursor_row(), b.cursor_col()));
        for r in 0..a.height() {
            for c in 0..a.width() {
                let (x, y) = (a.fb().cell(r, c).unwrap(), b.fb().cell(r, c).unwrap());
                assert!(
                    cells_match(x, a.fb().links(), y, b.fb().links()),
                    "cell ({r},{c}) differs: {x:?} vs {y:?}"
                );
            }
        }
    }

    #[test]
    fn unchanged_frame_is_empty() {
        let d = Display::default();
        let e = emu_with("\x1b[31mhello\r\nworld\x1b]0;t\x07\x1b[?2004h");
        assert_eq!(d.new_frame(true, &e, &e), "");
        assert_eq!(d.new_frame(true, &e, &e.clone()), "");
    }

    #[test]
    fn cursor_only_change_moves_cursor() {
        let d = Display::default();
        let a = emu_with("abc");
        let mut b = a.clone();
        b.handle_stream(b"\x1b[4;9H");
        assert_eq!(d.new_frame(true, &a, &b), "\x1b[4;9H");
    }

    #[test]
    fn repaint_hides_then_shows_cursor() {
        let d = Display::default();
        let a = emu_with("");
        let b = emu_with("hi");
        let out = d.new_frame(true, &a, &b);
        assert!(out.starts_with("\x1b[?25l"), "{out:?}");
        assert!(out.ends_with("\x1b[?25h"), "{out:?}");
        assert!(out.contains("hi"));
    }

    #[test]
    fn renditions_are_sent_once_per_run() {
        let d = Display::default();
        let a = emu_with("");
        let b = emu_with("\x1b[1mab\x1b[0mc");
        let out = d.new_frame(true, &a, &b);
        assert_eq!(out.matches("\x1b[0;1m").count(), 1, "{out:?}");
        assert!(out.contains("\x1b[0;1mab\x1b[0mc"), "{out:?}");
    }

    #[test]
    fn bell_and_title() {
        let d = Display::default();
        let a = emu_with("");
        let b = emu_with("\x07\x1b]2;build\x07");
        let out = d.new_frame(true, &a, &b);
        assert!(out.contains('\x07'));
        assert!(out.contains("\x1b]0;build\x07") || out.contains("\x1b]2;build\x07"));
    }

    #[test]
    fn no_title_without_capability() {
        let caps = TerminalCapabilities::lookup("linux").unwrap();
        let d = Display::new(&caps);
        let a = emu_with("");
        let b = emu_with("\x1b]2;build\x07");
        assert!(!d.new_frame(true, &a, &b).contains("build"));
    }

    #[test]
    fn full_screen_scroll_uses_linefeeds() {
        let d = Display::default();
        let a = emu_with("1\r\n2\r\n3\r\n4\r\n5\r\n6");
        let mut b = a.clone();
        b.handle_stream(b"\r\n7");
        let out = d.new_frame(true, &a, &b);
        assert_eq!(out, "\x1b[?25l\r\n7\x1b[?25h");
        let replica = replay(&d, &[&a, &b]);
        assert_same_screen(&replica, &b);
    }

    #[test]
    fn uninitialized_frame_clears_first() {
        let d = Display::default();
        let blank = emu_with("");
        let e = emu_with("x");
        let out = d.new_frame(false, &blank, &e);
        assert!(out.contains("\x1b[H\x1b[2J"));
    }

    #[test]
    fn alt_screen_switch_is_sent() {
        let d = Display::default();
        let a = emu_with("main");
        let mut b = a.clone();
        b.handle_stream(b"\x1b[?1049hfull");
        let out = d.new_frame(true, &a, &b);
        assert!(out.contains("\x1b[?1049h"));
        let replica = replay(&d, &[&a, &b]);
        assert!(replica.is_alternate_screen());
        assert_same_screen(&replica, &b);
    }

    #[test]
    fn round_trip_through_margins_and_wide_chars() {
        let d = Display::default();
        let a = emu_with("中文 text\x1b[2;5r\x1b[3;1Hregion");
        let mut b = a.clone();
        b.handle_stream("\x1b[5;1H\n\nmore\x1b[1;2H界\x1b[44m\x1b[K".as_bytes());
        let replica = replay(&d, &[&a, &b]);
        assert_same_screen(&replica, &b);
        assert_eq!(replica.fb().margin_top(), 1);
        assert_eq!(replica.fb().margin_bottom(), 5);
    }

    #[test]
    fn tab_stops_are_transported() {
        let d = Display::default();
        let a = emu_with("");
        let b = emu_with("\x1b[3g\x1b[1;4H\x1bH\x1b[1;11H\x1bH\x1b[H");
        let replica = replay(&d, &[&a, &b]);
        assert_eq!(replica.tab_stops(), vec![3, 10]);
        assert_same_screen(&replica, &b);
    }

    #[test]
    fn hyperlinks_are_reproduced_and_closed() {
        let d = Display::default();
        let a = emu_with("");
        let b = emu_with("\x1b]8;;http://x.example\x07link\x1b]8;;\x07 plain");
        let out = d.new_frame(true, &a, &b);
        assert!(out.contains("\x1b]8;;http://x.example\x1b\\link"));
        assert!(out.contains("\x1b]8;;\x1b\\"));
        let replica = replay(&d, &[&a, &b]);
        assert_same_screen(&replica, &b);
    }

    #[test]
    fn selection_is_forwarded_once() {
        let d = Display::default();
        let a = emu_with("");
        let b = emu_with("\x1b]52;c;aGk=\x07");
        let out = d.new_frame(true, &a, &b);
        assert!(out.contains("\x1b]52;c;aGk=\x07"));
        assert_eq!(d.new_frame(true, &b, &b.clone()), "");
    }

    #[test]
    fn modes_are_transported() {
        let d = Display::default();
        let a = emu_with("");
        let b = emu_with("\x1b[?2004h\x1b[?1002h\x1b[?1006h\x1b[?25l\x1b[5 q");
        let replica = replay(&d, &[&a, &b]);
        assert!(replica.modes().bracketed_paste());
        assert_eq!(replica.modes().mouse_tracking, b.modes().mouse_tracking);
        assert_eq!(replica.modes().mouse_encoding, b.modes().mouse_encoding);
        assert!(!replica.cursor_visible());
        assert_eq!(replica.fb().cursor_style(), b.fb().cursor_style());
    }

    #[test]
    fn open_and_close() {
        let d = Display::default();
        assert_eq!(d.open(), "\x1b[?1049h\x1b[?1h");
        let close = d.close();
        assert!(close.starts_with("\x1b[?1l\x1b[0m\x1b[?25h"));
        assert!(close.ends_with("\x1b[?1049l"));
    }
}
