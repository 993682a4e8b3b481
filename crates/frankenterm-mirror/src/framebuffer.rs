//! One screen buffer: visible rows, scrollback ring, margins, cursor
//! appearance, titles, and bell counter.
//!
//! Rows live in a ring of `rows + save_lines` entries. `scroll_head` is the
//! physical index of screen row 0; history row `k` (1 = most recent) sits at
//! `scroll_head - k`. A full-screen scroll that feeds history only advances
//! the head and blanks the row that wraps around to the bottom.

use crate::cell::{Cell, LinkSet};
use crate::renditions::Renditions;
use crate::row::Row;

/// Hard cap on scrollback depth.
pub const SAVE_LINES_LIMIT: usize = 50_000;

/// Cursor shape selected with DECSCUSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorStyle {
    #[default]
    BlinkBlock,
    SteadyBlock,
    BlinkUnderline,
    SteadyUnderline,
    BlinkBar,
    SteadyBar,
}

impl CursorStyle {
    /// DECSCUSR parameter to style. `0` and `1` are both blinking block.
    #[must_use]
    pub fn from_param(p: u16) -> Option<Self> {
        match p {
            0 | 1 => Some(Self::BlinkBlock),
            2 => Some(Self::SteadyBlock),
            3 => Some(Self::BlinkUnderline),
            4 => Some(Self::SteadyUnderline),
            5 => Some(Self::BlinkBar),
            6 => Some(Self::SteadyBar),
            _ => None,
        }
    }

    #[must_use]
    pub fn param(self) -> u16 {
        match self {
            Self::BlinkBlock => 1,
            Self::SteadyBlock => 2,
            Self::BlinkUnderline => 3,
            Self::SteadyUnderline => 4,
            Self::BlinkBar => 5,
            Self::SteadyBar => 6,
        }
    }
}

/// A saved icon name / window title pair (XTWINOPS 22/23).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TitleEntry {
    pub icon: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct Framebuffer {
    rows: Vec<Row>,
    cols: u16,
    n_rows: u16,
    save_lines: usize,
    scroll_head: usize,
    history_len: usize,
    scroll_count: u64,
    margin_top: u16,
    margin_bottom: u16,
    margin_left: u16,
    margin_right: u16,
    cursor_style: CursorStyle,
    cursor_color: Option<(u8, u8, u8)>,
    window_title: String,
    icon_name: String,
    title_initialized: bool,
    title_stack: Vec<TitleEntry>,
    title_stack_limit: usize,
    bell_count: u64,
    links: LinkSet,
}

impl Framebuffer {
    #[must_use]
    pub fn new(cols: u16, rows: u16, save_lines: usize, title_stack_limit: usize) -> Self {
        let cols = cols.max(1);
        let n_rows = rows.max(1);
        let save_lines = save_lines.min(SAVE_LINES_LIMIT);
        let ring = usize::from(n_rows) + save_lines;
        Self {
            rows: (0..ring).map(|_| Row::new(cols, Renditions::default())).collect(),
            cols,
            n_rows,
            save_lines,
            scroll_head: 0,
            history_len: 0,
            scroll_count: 0,
            margin_top: 0,
            margin_bottom: n_rows,
            margin_left: 0,
            margin_right: cols,
            cursor_style: CursorStyle::default(),
            cursor_color: None,
            window_title: String::new(),
            icon_name: String::new(),
            title_initialized: false,
            title_stack: Vec::new(),
            title_stack_limit,
            bell_count: 0,
            links: LinkSet::new(),
        }
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.n_rows
    }

    pub fn save_lines(&self) -> usize {
        self.save_lines
    }

    fn phys(&self, row: u16) -> usize {
        (self.scroll_head + usize::from(row)) % self.rows.len()
    }

    /// Screen row `row` (0-based). Out-of-range rows clamp to the last row.
    pub fn row(&self, row: u16) -> &Row {
        &self.rows[self.phys(row.min(self.n_rows - 1))]
    }

    pub fn row_mut(&mut self, row: u16) -> &mut Row {
        let idx = self.phys(row.min(self.n_rows - 1));
        &mut self.rows[idx]
    }

    pub fn cell(&self, row: u16, col: u16) -> Option<&Cell> {
        if row >= self.n_rows {
            return None;
        }
        self.row(row).cell(col)
    }

    pub fn cell_mut(&mut self, row: u16, col: u16) -> Option<&mut Cell> {
        if row >= self.n_rows || col >= self.cols {
            return None;
        }
        self.row_mut(row).cell_mut(col)
    }

    /// Visible rows, top to bottom.
    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        (0..self.n_rows).map(move |r| self.row(r))
    }

    // ── Scrollback ──────────────────────────────────────────────────────

    /// Number of rows currently held in scrollback.
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// History row `k`, where 1 is the most recently scrolled-off row.
    pub fn history_row(&self, k: usize) -> Option<&Row> {
        if k == 0 || k > self.history_len {
            return None;
        }
        let len = self.rows.len();
        Some(&self.rows[(self.scroll_head + len - k) % len])
    }

    pub fn clear_history(&mut self) {
        self.history_len = 0;
    }

    /// Monotonic count of full-screen upward scrolls. The display diff uses
    /// the difference between two snapshots to replay scrolling cheaply.
    pub fn scroll_count(&self) -> u64 {
        self.scroll_count
    }

    // ── Margins ─────────────────────────────────────────────────────────

    pub fn margin_top(&self) -> u16 {
        self.margin_top
    }

    /// Exclusive bottom margin.
    pub fn margin_bottom(&self) -> u16 {
        self.margin_bottom
    }

    pub fn margin_left(&self) -> u16 {
        self.margin_left
    }

    /// Exclusive right margin.
    pub fn margin_right(&self) -> u16 {
        self.margin_right
    }

    /// Set the scrolling region. Returns false (and leaves the region
    /// unchanged) unless `top < bottom <= rows`.
    pub fn set_vertical_margins(&mut self, top: u16, bottom: u16) -> bool {
        if top >= bottom || bottom > self.n_rows {
            return false;
        }
        self.margin_top = top;
        self.margin_bottom = bottom;
        true
    }

    /// Set the left/right margins. Returns false unless `left < right <= cols`.
    pub fn set_horizontal_margins(&mut self, left: u16, right: u16) -> bool {
        if left >= right || right > self.cols {
            return false;
        }
        self.margin_left = left;
        self.margin_right = right;
        true
    }

    pub fn reset_vertical_margins(&mut self) {
        self.margin_top = 0;
        self.margin_bottom = self.n_rows;
    }

    pub fn reset_horizontal_margins(&mut self) {
        self.margin_left = 0;
        self.margin_right = self.cols;
    }

    pub fn has_default_margins(&self) -> bool {
        self.margin_top == 0
            && self.margin_bottom == self.n_rows
            && self.margin_left == 0
            && self.margin_right == self.cols
    }

    // ── Scrolling ───────────────────────────────────────────────────────

    /// Scroll the region `[top, bottom) x [left, right)` up by `n` rows.
    ///
    /// When the region is the whole screen and `into_history` is set, the
    /// departing rows are kept as scrollback.
    #[allow(clippy::too_many_arguments)]
    pub fn scroll_up(
        &mut self,
        top: u16,
        bottom: u16,
        left: u16,
        right: u16,
        n: u16,
        blank: Renditions,
        into_history: bool,
    ) {
        let bottom = bottom.min(self.n_rows);
        let right = right.min(self.cols);
        if top >= bottom || left >= right {
            return;
        }
        let n = n.min(bottom - top);
        if n == 0 {
            return;
        }
        let full_width = left == 0 && right == self.cols;
        let full_screen = full_width && top == 0 && bottom == self.n_rows;

        if full_screen {
            self.scroll_count += u64::from(n);
        }

        if full_screen && into_history {
            for _ in 0..n {
                if self.save_lines > 0 {
                    self.history_len = (self.history_len + 1).min(self.save_lines);
                }
                self.scroll_head = (self.scroll_head + 1) % self.rows.len();
                let bottom_row = self.phys(self.n_rows - 1);
                self.rows[bottom_row].reset(blank);
            }
            return;
        }

        if full_width {
            for r in top..bottom - n {
                let (a, b) = (self.phys(r), self.phys(r + n));
                self.rows.swap(a, b);
            }
            for r in bottom - n..bottom {
                self.row_mut(r).reset(blank);
            }
        } else {
            for r in top..bottom - n {
                let src = self.row(r + n).clone();
                let dst = self.row_mut(r);
                dst.copy_span_from(&src, left, right, blank);
            }
            for r in bottom - n..bottom {
                self.row_mut(r).erase(left, right, blank);
            }
        }

        if top > 0 {
            self.row_mut(top - 1).set_wrap(false);
        }
        if bottom - n > 0 {
            self.row_mut(bottom - n - 1).set_wrap(false);
        }
    }

    /// Scroll the region `[top, bottom) x [left, right)` down by `n` rows.
    pub fn scroll_down(
        &mut self,
        top: u16,
        bottom: u16,
        left: u16,
        right: u16,
        n: u16,
        blank: Renditions,
    ) {
        let bottom = bottom.min(self.n_rows);
        let right = right.min(self.cols);
        if top >= bottom || left >= right {
            return;
        }
        let n = n.min(bottom - top);
        if n == 0 {
            return;
        }

        if left == 0 && right == self.cols {
            for r in (top + n..bottom).rev() {
                let (a, b) = (self.phys(r), self.phys(r - n));
                self.rows.swap(a, b);
            }
            for r in top..top + n {
                self.row_mut(r).reset(blank);
            }
        } else {
            for r in (top + n..bottom).rev() {
                let src = self.row(r - n).clone();
                let dst = self.row_mut(r);
                dst.copy_span_from(&src, left, right, blank);
            }
            for r in top..top + n {
                self.row_mut(r).erase(left, right, blank);
            }
        }

        if top > 0 {
            self.row_mut(top - 1).set_wrap(false);
        }
        self.row_mut(bottom - 1).set_wrap(false);
    }

    /// Insert `n` blank columns at `col` in rows `[top, bottom)`, shifting
    /// cells toward `right`.
    pub fn insert_columns(&mut self, top: u16, bottom: u16, col: u16, right: u16, n: u16, blank: Renditions) {
        for r in top..bottom.min(self.n_rows) {
            self.row_mut(r).insert_cells(col, n, right, blank);
        }
    }

    /// Delete `n` columns at `col` in rows `[top, bottom)`, pulling cells
    /// from `right`.
    pub fn delete_columns(&mut self, top: u16, bottom: u16, col: u16, right: u16, n: u16, blank: Renditions) {
        for r in top..bottom.min(self.n_rows) {
            self.row_mut(r).delete_cells(col, n, right, blank);
        }
    }

    /// Blank whole rows `[from, to)`.
    pub fn erase_rows(&mut self, from: u16, to: u16, blank: Renditions) {
        for r in from..to.min(self.n_rows) {
            self.row_mut(r).reset(blank);
        }
    }

    /// Blank the screen and drop scrollback. Titles and counters survive.
    pub fn reset(&mut self) {
        for row in &mut self.rows {
            row.reset(Renditions::default());
        }
        self.history_len = 0;
        self.reset_vertical_margins();
        self.reset_horizontal_margins();
        self.cursor_style = CursorStyle::default();
        self.cursor_color = None;
        self.links.clear();
    }

    /// Resize to `cols x rows`.
    ///
    /// When shrinking would leave `cursor_row` off screen, the rows above it
    /// move into scrollback instead. Returns the cursor's new row. Margins
    /// are reset.
    pub fn resize(&mut self, cols: u16, rows: u16, cursor_row: u16) -> u16 {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let blank = Renditions::default();
        let cursor_row = cursor_row.min(self.n_rows - 1);

        let mut history: Vec<Row> = (1..=self.history_len)
            .rev()
            .filter_map(|k| self.history_row(k).cloned())
            .collect();
        let mut screen: Vec<Row> = self.visible_rows().cloned().collect();

        let shift = if cursor_row >= rows {
            cursor_row + 1 - rows
        } else {
            0
        };
        let pushed: Vec<Row> = screen.drain(..usize::from(shift)).collect();
        if self.save_lines > 0 {
            history.extend(pushed);
        }
        screen.truncate(usize::from(rows));
        while screen.len() < usize::from(rows) {
            screen.push(Row::new(cols, blank));
        }
        if history.len() > self.save_lines {
            history.drain(..history.len() - self.save_lines);
        }
        for row in screen.iter_mut().chain(history.iter_mut()) {
            if row.width() != cols {
                row.resize(cols, blank);
            }
        }

        let ring = usize::from(rows) + self.save_lines;
        let spare = ring - screen.len() - history.len();
        let history_len = history.len();
        let mut ring_rows = screen;
        ring_rows.extend((0..spare).map(|_| Row::new(cols, blank)));
        ring_rows.extend(history);

        self.rows = ring_rows;
        self.cols = cols;
        self.n_rows = rows;
        self.scroll_head = 0;
        self.history_len = history_len;
        self.reset_vertical_margins();
        self.reset_horizontal_margins();
        cursor_row - shift
    }

    // ── Cursor appearance ───────────────────────────────────────────────

    pub fn cursor_style(&self) -> CursorStyle {
        self.cursor_style
    }

    pub fn set_cursor_style(&mut self, style: CursorStyle) {
        self.cursor_style = style;
    }

    pub fn cursor_color(&self) -> Option<(u8, u8, u8)> {
        self.cursor_color
    }

    pub fn set_cursor_color(&mut self, color: Option<(u8, u8, u8)>) {
        self.cursor_color = color;
    }

    // ── Titles and bell ─────────────────────────────────────────────────

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn icon_name(&self) -> &str {
        &self.icon_name
    }

    pub fn is_title_initialized(&self) -> bool {
        self.title_initialized
    }

    pub fn set_window_title(&mut self, title: &str) {
        self.window_title = title.to_owned();
        self.title_initialized = true;
    }

    pub fn set_icon_name(&mut self, icon: &str) {
        self.icon_name = icon.to_owned();
        self.title_initialized = true;
    }

    pub fn clear_titles(&mut self) {
        self.window_title.clear();
        self.icon_name.clear();
    }

    /// Prefix the window title, keeping the icon name equal to it when the
    /// two were equal.
    pub fn prefix_window_title(&mut self, prefix: &str) {
        if self.icon_name == self.window_title {
            self.icon_name.insert_str(0, prefix);
        }
        self.window_title.insert_str(0, prefix);
    }

    pub fn title_stack(&self) -> &[TitleEntry] {
        &self.title_stack
    }

    /// Save the current icon/title. A full stack drops its oldest entry.
    pub fn push_title(&mut self) {
        if self.title_stack_limit == 0 {
            return;
        }
        if self.title_stack.len() >= self.title_stack_limit {
            self.title_stack.remove(0);
        }
        self.title_stack.push(TitleEntry {
            icon: self.icon_name.clone(),
            title: self.window_title.clone(),
        });
    }

    /// Restore the most recently pushed icon/title. Returns false when the
    /// stack is empty.
    pub fn pop_title(&mut self, icon: bool, title: bool) -> bool {
        let Some(entry) = self.title_stack.pop() else {
            return false;
        };
        if icon {
            self.set_icon_name(&entry.icon);
        }
        if title {
            self.set_window_title(&entry.title);
        }
        true
    }

    pub fn bell_count(&self) -> u64 {
        self.bell_count
    }

    pub fn ring_bell(&mut self) {
        self.bell_count += 1;
    }

    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut LinkSet {
        &mut self.links
    }
}
