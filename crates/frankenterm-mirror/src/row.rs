//! A fixed-width row of cells with a generation counter.
//!
//! Every mutation through [`Row::cells_mut`] or the editing helpers stamps a
//! fresh generation drawn from a process-wide counter. Clones keep the
//! generation, so two rows with the same generation are known to be equal
//! without comparing cells.

use crate::cell::Cell;
use crate::renditions::Renditions;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GEN: AtomicU64 = AtomicU64::new(1);

fn next_gen() -> u64 {
    NEXT_GEN.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Eq)]
pub struct Row {
    cells: Vec<Cell>,
    generation: u64,
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation || self.cells == other.cells
    }
}

impl Row {
    /// A row of `cols` blank cells.
    #[must_use]
    pub fn new(cols: u16, blank: Renditions) -> Self {
        Self {
            cells: vec![Cell::blank(blank); usize::from(cols)],
            generation: next_gen(),
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable access to the cells. Stamps a new generation.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        self.touch();
        &mut self.cells
    }

    pub fn cell(&self, col: u16) -> Option<&Cell> {
        self.cells.get(usize::from(col))
    }

    pub fn cell_mut(&mut self, col: u16) -> Option<&mut Cell> {
        self.touch();
        self.cells.get_mut(usize::from(col))
    }

    pub fn width(&self) -> u16 {
        self.cells.len() as u16
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation = next_gen();
    }

    /// Whether the row's text continues on the next row.
    pub fn wrap(&self) -> bool {
        self.cells.last().is_some_and(Cell::wrap)
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        if self.wrap() != wrap {
            self.touch();
            if let Some(last) = self.cells.last_mut() {
                last.set_wrap(wrap);
            }
        }
    }

    /// Blank every cell.
    pub fn reset(&mut self, blank: Renditions) {
        self.touch();
        for cell in &mut self.cells {
            cell.reset(blank);
        }
    }

    /// Change the width, truncating or padding with blanks.
    pub fn resize(&mut self, cols: u16, blank: Renditions) {
        self.touch();
        self.cells.resize(usize::from(cols), Cell::blank(blank));
        self.fix_trailing_wide();
    }

    // ── Erase operations ────────────────────────────────────────────────

    /// Erase cells in `[start, end)`, also erasing the other half of any wide
    /// grapheme cut by either edge.
    pub fn erase(&mut self, start: u16, end: u16, blank: Renditions) {
        let len = self.cells.len();
        let start = usize::from(start).min(len);
        let end = usize::from(end).min(len);
        if start >= end {
            return;
        }
        self.touch();
        let start = if self.cells[start].is_continuation() && start > 0 {
            start - 1
        } else {
            start
        };
        let end = if end < len && self.cells[end].is_continuation() {
            end + 1
        } else {
            end
        };
        for cell in &mut self.cells[start..end] {
            cell.reset(blank);
        }
    }

    // ── Insert / delete within margins ──────────────────────────────────

    /// Insert `n` blank cells at `col`, shifting cells up to `right`
    /// (exclusive) to the right. Cells pushed past `right` are lost.
    pub fn insert_cells(&mut self, col: u16, n: u16, right: u16, blank: Renditions) {
        let right = usize::from(right).min(self.cells.len());
        let col = usize::from(col);
        if col >= right || n == 0 {
            return;
        }
        self.touch();
        self.split_wide_at(col, blank);
        let n = usize::from(n).min(right - col);
        self.cells[col..right].rotate_right(n);
        for cell in &mut self.cells[col..col + n] {
            cell.reset(blank);
        }
        self.fix_wide_edge(right, blank);
    }

    /// Delete `n` cells at `col`, pulling cells from `right` (exclusive)
    /// leftward and filling the gap with blanks.
    pub fn delete_cells(&mut self, col: u16, n: u16, right: u16, blank: Renditions) {
        let right = usize::from(right).min(self.cells.len());
        let col = usize::from(col);
        if col >= right || n == 0 {
            return;
        }
        self.touch();
        self.split_wide_at(col, blank);
        let n = usize::from(n).min(right - col);
        self.split_wide_at(col + n, blank);
        self.cells[col..right].rotate_left(n);
        for cell in &mut self.cells[right - n..right] {
            cell.reset(blank);
        }
        self.fix_wide_edge(right, blank);
    }

    /// Copy the span `[left, right)` of `other` into the same columns.
    ///
    /// Wide pairs cut by either edge are blanked on both sides, so the
    /// copied span and the cells around it stay paired.
    pub fn copy_span_from(&mut self, other: &Row, left: u16, right: u16, blank: Renditions) {
        let (left, right) = (usize::from(left), usize::from(right));
        if left >= right || right > other.cells.len() || right > self.cells.len() {
            return;
        }
        let mut span = other.cells[left..right].to_vec();
        if span.first().is_some_and(Cell::is_continuation) {
            span[0].reset(blank);
        }
        if let Some(last) = span.last_mut() {
            if last.is_wide() {
                last.reset(blank);
            }
        }
        self.touch();
        self.split_wide_at(left, blank);
        self.split_wide_at(right, blank);
        self.cells[left..right].clone_from_slice(&span);
        self.fix_wide_edge(left, blank);
        self.fix_wide_edge(right, blank);
    }

    /// If `col` splits a wide grapheme, blank both halves.
    pub fn split_wide_at(&mut self, col: usize, blank: Renditions) {
        if col > 0 && col < self.cells.len() && self.cells[col].is_continuation() {
            self.touch();
            self.cells[col - 1].reset(blank);
            self.cells[col].reset(blank);
        }
    }

    /// Blank a wide leading cell sitting just before `edge` whose
    /// continuation fell outside, and an orphaned continuation at `edge`.
    fn fix_wide_edge(&mut self, edge: usize, blank: Renditions) {
        if edge > 0 && edge <= self.cells.len() && self.cells[edge - 1].is_wide() {
            let orphan = edge == self.cells.len() || !self.cells[edge].is_continuation();
            if orphan {
                self.cells[edge - 1].reset(blank);
            }
        }
        if edge < self.cells.len()
            && self.cells[edge].is_continuation()
            && (edge == 0 || !self.cells[edge - 1].is_wide())
        {
            self.cells[edge].reset(blank);
        }
    }

    fn fix_trailing_wide(&mut self) {
        if let Some(last) = self.cells.last_mut() {
            if last.is_wide() {
                let renditions = last.renditions().background();
                last.reset(renditions);
            }
        }
    }
}
