//! Prediction-path access to the emulator.
//!
//! Local echo prediction works in 0-based coordinates relative to the active
//! area and tolerates sloppy positions: a negative or past-the-end coordinate
//! falls back to the cursor's, and the result is clamped against an inclusive
//! bound. At that bound there is no cell, so lookups return `None`. The
//! control-sequence path never goes through here.

use crate::cell::Cell;
use crate::emulator::Emulator;

/// Outcome of checking a prediction against the confirmed screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Validity {
    Pending,
    Correct,
    CorrectNoCredit,
    IncorrectOrExpired,
    Inactive,
}

impl Emulator {
    /// Put the cursor at a 0-based screen position, clamped to the screen.
    pub fn move_cursor(&mut self, row: u16, col: u16) {
        self.set_cursor(row, col);
    }

    /// Cursor row relative to the scrolling region when origin mode is set.
    #[must_use]
    pub fn overlay_cursor_row(&self) -> u16 {
        if self.modes().origin_mode() {
            self.cursor_row().saturating_sub(self.fb().margin_top())
        } else {
            self.cursor_row()
        }
    }

    /// Height of the scrolling region.
    #[must_use]
    pub fn active_height(&self) -> u16 {
        self.fb().margin_bottom() - self.fb().margin_top()
    }

    /// Width between the left and right margins when they are enabled,
    /// otherwise the screen width.
    #[must_use]
    pub fn active_width(&self) -> u16 {
        if self.modes().horizontal_margins() {
            self.fb().margin_right() - self.fb().margin_left()
        } else {
            self.width()
        }
    }

    #[must_use]
    pub fn overlay_cell(&self, row: i32, col: i32) -> Option<&Cell> {
        let (row, col) = self.overlay_position(row, col);
        self.fb().cell(row, col)
    }

    pub fn overlay_cell_mut(&mut self, row: i32, col: i32) -> Option<&mut Cell> {
        let (row, col) = self.overlay_position(row, col);
        self.fb_mut().cell_mut(row, col)
    }

    fn overlay_position(&self, row: i32, col: i32) -> (u16, u16) {
        let fb = self.fb();
        let row = if row < 0 || row > i32::from(self.active_height()) {
            i32::from(self.overlay_cursor_row())
        } else {
            row
        };
        let col = if col < 0 || col > i32::from(self.active_width()) {
            i32::from(self.cursor_col())
        } else {
            col
        };
        let row = if self.modes().origin_mode() {
            row.clamp(0, i32::from(fb.margin_bottom())) + i32::from(fb.margin_top())
        } else {
            row.clamp(0, i32::from(fb.rows()))
        };
        let col = col.clamp(0, i32::from(fb.cols()));
        (
            u16::try_from(row).unwrap_or(u16::MAX),
            u16::try_from(col).unwrap_or(u16::MAX),
        )
    }
}

/// A predicted cursor position that becomes visible once its epoch is
/// confirmed and is judged once the host acknowledges its frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalCursorMove {
    pub row: u16,
    pub col: u16,
    pub active: bool,
    pub expiration_frame: u64,
    pub tentative_until_epoch: u64,
}

impl ConditionalCursorMove {
    #[must_use]
    pub fn new(row: u16, col: u16, expiration_frame: u64, tentative_until_epoch: u64) -> Self {
        Self {
            row,
            col,
            active: true,
            expiration_frame,
            tentative_until_epoch,
        }
    }

    /// Whether the prediction still waits for its epoch.
    #[must_use]
    pub fn tentative(&self, confirmed_epoch: u64) -> bool {
        self.tentative_until_epoch > confirmed_epoch
    }

    pub fn reset(&mut self) {
        self.active = false;
    }

    /// Show the predicted cursor on `emu`.
    pub fn apply(&self, emu: &mut Emulator, confirmed_epoch: u64) {
        if self.active && !self.tentative(confirmed_epoch) {
            emu.move_cursor(self.row, self.col);
        }
    }

    /// Judge the prediction against the confirmed screen `emu`.
    #[must_use]
    pub fn validity(&self, emu: &Emulator, late_ack: u64) -> Validity {
        if !self.active {
            return Validity::Inactive;
        }
        if self.row >= emu.active_height() || self.col >= emu.active_width() {
            return Validity::IncorrectOrExpired;
        }
        if late_ack < self.expiration_frame {
            return Validity::Pending;
        }
        if emu.cursor_col() == self.col && emu.overlay_cursor_row() == self.row {
            Validity::Correct
        } else {
            Validity::IncorrectOrExpired
        }
    }
}
