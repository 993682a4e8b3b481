//! Property-based invariant tests.
//!
//! These hold for any input:
//!
//! 1. The parser never panics, whatever bytes it is fed.
//! 2. The cursor stays on screen after any operation sequence.
//! 3. Wide graphemes always occupy a leading cell plus a continuation.
//! 4. Diffing a frame against itself produces nothing.
//! 5. A replica fed the renderer's output shows the same screen, titles,
//!    tab stops and margins.

use frankenterm_mirror::{Display, Emulator, Parser, Row};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

/// Small enough for fast tests, large enough for edge cases.
fn dims() -> impl Strategy<Value = (u16, u16)> {
    (1u16..=100, 1u16..=40)
}

/// Output fragments of the kind shells and full-screen programs emit.
const TOKENS: &[&str] = &[
    "a", "hello", "x y", "  ", "\r\n", "\r", "\n", "\t", "\x08",
    "中", "日本", "😀", "e\u{301}",
    "\x1b[31m", "\x1b[1;44m", "\x1b[7m", "\x1b[0m", "\x1b[38;5;208m",
    "\x1b[H", "\x1b[3;5H", "\x1b[10;2H", "\x1b[2A", "\x1b[3C", "\x1b[40G",
    "\x1b[K", "\x1b[1K", "\x1b[2J", "\x1b[J", "\x1b[3X",
    "\x1b[2@", "\x1b[2P", "\x1b[L", "\x1b[M", "\x1b[S", "\x1b[T",
    "\x1b[2;4r", "\x1b[r", "\x1bM", "\x1bD", "\x1bE",
    "\x1b7", "\x1b8", "\x1b[?25l", "\x1b[?25h",
    // Left/right margins, including wide graphemes crossing their edges.
    "\x1b[?69h", "\x1b[?69l", "\x1b[3;8s", "\x1b[2;5s", "\x1b[s", "a中",
    // Alternate screen and private modes.
    "\x1b[?1049h", "\x1b[?1049l", "\x1b[?5h", "\x1b[?5l", "\x1b[?6h", "\x1b[?6l",
    "\x1b[?7l", "\x1b[?7h", "\x1b[?2004h", "\x1b[?1000h", "\x1b[?1006h",
    // Titles and the title stack.
    "\x1b]0;shell\x07", "\x1b]2;vim\x1b\\", "\x1b]1;icon\x07", "\x1b[22;0t", "\x1b[23;0t",
    // Tab stops.
    "\x1bH", "\x1b[g", "\x1b[3g",
    // Hyperlinks.
    "\x1b]8;;https://a.example\x1b\\", "\x1b]8;;\x1b\\",
];

fn output_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(TOKENS), 0..80).prop_map(|tokens| tokens.concat())
}

fn ascii_output_text() -> impl Strategy<Value = String> {
    let ascii: Vec<&'static str> = TOKENS.iter().copied().filter(|t| t.is_ascii()).collect();
    prop::collection::vec(prop::sample::select(ascii), 0..80).prop_map(|tokens| tokens.concat())
}

fn assert_wide_pairs(row: &Row) -> Result<(), TestCaseError> {
    let cells = row.cells();
    for (c, cell) in cells.iter().enumerate() {
        if cell.is_wide() {
            prop_assert!(
                cells.get(c + 1).is_some_and(|next| next.is_continuation()),
                "wide cell at {c} without continuation"
            );
        }
        if cell.is_continuation() {
            prop_assert!(
                c > 0 && cells[c - 1].is_wide(),
                "continuation at {c} without wide cell"
            );
        }
    }
    Ok(())
}

fn assert_same_screen(want: &Emulator, got: &Emulator) -> Result<(), TestCaseError> {
    prop_assert_eq!(
        (got.cursor_row(), got.cursor_col()),
        (want.cursor_row(), want.cursor_col())
    );
    let (want_links, got_links) = (want.fb().links(), got.fb().links());
    for r in 0..want.height() {
        let (a, b) = (want.fb().row(r).cells(), got.fb().row(r).cells());
        prop_assert_eq!(a.len(), b.len());
        for (c, (x, y)) in a.iter().zip(b).enumerate() {
            prop_assert!(
                x.contents_match(y)
                    && x.renditions() == y.renditions()
                    && x.is_wide() == y.is_wide()
                    && want_links.get(x.link()) == got_links.get(y.link()),
                "cell ({}, {}): want {:?}, got {:?}",
                r,
                c,
                x,
                y
            );
        }
    }
    Ok(())
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn parser_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
        let mut parser = Parser::new();
        let _ = parser.process(&bytes);
        let _ = parser.process(b"\x1b\\\x18plain");
    }

    #[test]
    fn parser_is_chunking_independent_for_ascii(
        text in ascii_output_text(),
        split in 0usize..200,
    ) {
        let split = split.min(text.len());
        let mut whole = Emulator::new(40, 12, 0);
        whole.handle_stream(text.as_bytes());
        let mut parts = Emulator::new(40, 12, 0);
        parts.handle_stream(&text.as_bytes()[..split]);
        parts.handle_stream(&text.as_bytes()[split..]);
        assert_same_screen(&whole, &parts)?;
    }

    #[test]
    fn cursor_stays_on_screen(
        (cols, rows) in dims(),
        bytes in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let mut emu = Emulator::new(cols, rows, 10);
        emu.handle_stream(&bytes);
        prop_assert!(emu.cursor_row() < emu.height());
        prop_assert!(emu.cursor_col() < emu.width());
        prop_assert_eq!(emu.fb().rows(), emu.height());
    }

    #[test]
    fn cursor_stays_on_screen_across_resizes(
        (cols, rows) in dims(),
        (cols2, rows2) in dims(),
        text in output_text(),
    ) {
        let mut emu = Emulator::new(cols, rows, 50);
        emu.handle_stream(text.as_bytes());
        emu.resize(cols2, rows2);
        prop_assert_eq!((emu.width(), emu.height()), (cols2, rows2));
        prop_assert!(emu.cursor_row() < rows2);
        prop_assert!(emu.cursor_col() < cols2);
        emu.handle_stream(text.as_bytes());
        prop_assert!(emu.cursor_row() < rows2);
        prop_assert!(emu.cursor_col() < cols2);
    }

    #[test]
    fn wide_graphemes_stay_paired((cols, rows) in dims(), text in output_text()) {
        let mut emu = Emulator::new(cols, rows, 0);
        emu.handle_stream(text.as_bytes());
        for r in 0..emu.height() {
            assert_wide_pairs(emu.fb().row(r))?;
        }
    }

    #[test]
    fn unchanged_frame_diffs_to_nothing(
        (cols, rows) in dims(),
        bytes in prop::collection::vec(any::<u8>(), 0..256),
        text in output_text(),
    ) {
        let mut emu = Emulator::new(cols, rows, 0);
        emu.handle_stream(&bytes);
        emu.handle_stream(text.as_bytes());
        let display = Display::default();
        prop_assert_eq!(display.new_frame(true, &emu, &emu), "");
        prop_assert_eq!(display.new_frame(true, &emu, &emu.clone()), "");
    }

    #[test]
    fn replica_matches_after_each_frame(
        cols in 4u16..=60,
        rows in 2u16..=20,
        chunks in prop::collection::vec(output_text(), 1..5),
    ) {
        let display = Display::default();
        let mut host = Emulator::new(cols, rows, 20);
        let mut shown = host.clone();
        let mut replica = Emulator::new(cols, rows, 0);
        replica.handle_stream(display.new_frame(false, &shown, &host).as_bytes());
        for chunk in &chunks {
            host.handle_stream(chunk.as_bytes());
            let out = display.new_frame(true, &shown, &host);
            replica.handle_stream(out.as_bytes());
            shown = host.clone();
            assert_same_screen(&host, &replica)?;
            prop_assert_eq!(replica.cursor_visible(), host.cursor_visible());
            prop_assert_eq!(replica.is_alternate_screen(), host.is_alternate_screen());
            prop_assert_eq!(replica.window_title(), host.window_title());
            prop_assert_eq!(replica.icon_name(), host.icon_name());
            prop_assert_eq!(replica.primary().title_stack(), host.primary().title_stack());
            prop_assert_eq!(replica.tab_stops(), host.tab_stops());
            prop_assert_eq!(
                (replica.fb().margin_left(), replica.fb().margin_right()),
                (host.fb().margin_left(), host.fb().margin_right())
            );
        }
    }
}
