//! Emulator construction parameters.

use crate::framebuffer::SAVE_LINES_LIMIT;

/// Default depth of the XTWINOPS title stack.
pub const DEFAULT_TITLE_STACK_LIMIT: usize = 10;

/// Size and history settings for a new [`Emulator`](crate::Emulator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub cols: u16,
    pub rows: u16,
    /// Scrollback depth of the primary screen. The alternate screen keeps
    /// none.
    pub save_lines: usize,
    pub title_stack_limit: usize,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            save_lines: 0,
            title_stack_limit: DEFAULT_TITLE_STACK_LIMIT,
        }
    }
}

impl EmulatorConfig {
    #[must_use]
    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    #[must_use]
    pub fn with_save_lines(mut self, save_lines: usize) -> Self {
        self.save_lines = save_lines;
        self
    }

    #[must_use]
    pub fn with_title_stack_limit(mut self, limit: usize) -> Self {
        self.title_stack_limit = limit;
        self
    }

    /// The configuration with zero dimensions raised to 1 and scrollback
    /// capped at [`SAVE_LINES_LIMIT`].
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.cols == 0 || self.rows == 0 {
            tracing::warn!(cols = self.cols, rows = self.rows, "zero screen dimension, using 1");
        }
        if self.save_lines > SAVE_LINES_LIMIT {
            tracing::warn!(
                save_lines = self.save_lines,
                limit = SAVE_LINES_LIMIT,
                "scrollback depth capped"
            );
        }
        Self {
            cols: self.cols.max(1),
            rows: self.rows.max(1),
            save_lines: self.save_lines.min(SAVE_LINES_LIMIT),
            title_stack_limit: self.title_stack_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EmulatorConfig::default();
        assert_eq!((cfg.cols, cfg.rows), (80, 24));
        assert_eq!(cfg.save_lines, 0);
        assert_eq!(cfg.title_stack_limit, DEFAULT_TITLE_STACK_LIMIT);
    }

    #[test]
    fn builders_chain() {
        let cfg = EmulatorConfig::default()
            .with_size(132, 50)
            .with_save_lines(1000)
            .with_title_stack_limit(3);
        assert_eq!((cfg.cols, cfg.rows, cfg.save_lines, cfg.title_stack_limit), (132, 50, 1000, 3));
    }

    #[test]
    fn normalized_clamps() {
        let cfg = EmulatorConfig::default()
            .with_size(0, 0)
            .with_save_lines(SAVE_LINES_LIMIT + 1)
            .normalized();
        assert_eq!((cfg.cols, cfg.rows), (1, 1));
        assert_eq!(cfg.save_lines, SAVE_LINES_LIMIT);
    }
}
