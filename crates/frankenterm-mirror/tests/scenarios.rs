//! End-to-end scenarios through the public API: parse, emulate, render.

use frankenterm_mirror::{Display, Emulator, Parser, ParserState};

fn feed(emu: &mut Emulator, input: &str) {
    emu.handle_stream(input.as_bytes());
}

fn row_text(emu: &Emulator, row: u16) -> String {
    emu.fb()
        .row(row)
        .cells()
        .iter()
        .filter(|c| !c.is_continuation())
        .map(|c| if c.is_empty() { " " } else { c.contents() })
        .collect::<String>()
        .trim_end()
        .to_owned()
}

#[test]
fn normal_wrap_line_and_its_diff() {
    let mut emu = Emulator::new(80, 40, 40);
    feed(&mut emu, "\x1b[11;74Houtput ");
    assert_eq!((emu.cursor_row(), emu.cursor_col()), (10, 79));
    assert!(emu.pending_wrap());

    feed(&mut emu, "for normal wrap line.");
    assert_eq!((emu.cursor_row(), emu.cursor_col()), (11, 21));
    assert_eq!(row_text(&emu, 10), format!("{}output", " ".repeat(73)));
    assert_eq!(row_text(&emu, 11), "for normal wrap line.");
    assert!(emu.fb().row(10).wrap());

    let blank = Emulator::new(80, 40, 40);
    let out = Display::default().new_frame(true, &blank, &emu);
    assert_eq!(
        out,
        "\x1b[?25l\x1b[11;74Houtput\r\nfor\x1b[Cnormal\x1b[Cwrap\x1b[Cline.\x1b[?25h"
    );

    let mut replica = Emulator::new(80, 40, 0);
    replica.handle_stream(out.as_bytes());
    assert_eq!(row_text(&replica, 10), row_text(&emu, 10));
    assert_eq!(row_text(&replica, 11), row_text(&emu, 11));
    assert_eq!(
        (replica.cursor_row(), replica.cursor_col()),
        (emu.cursor_row(), emu.cursor_col())
    );
}

#[test]
fn alternate_screen_round_trip_restores_cursor() {
    let mut emu = Emulator::new(80, 24, 100);
    feed(&mut emu, "prompt$ \x1b[6;8H");
    assert_eq!((emu.cursor_row(), emu.cursor_col()), (5, 7));

    feed(&mut emu, "\x1b[?1049h");
    assert!(emu.is_alternate_screen());
    assert_eq!(row_text(&emu, 0), "");
    feed(&mut emu, "\x1b[20;30Hediting\x1b[1;1H~");

    feed(&mut emu, "\x1b[?1049l");
    assert!(!emu.is_alternate_screen());
    assert_eq!((emu.cursor_row(), emu.cursor_col()), (5, 7));
    assert_eq!(row_text(&emu, 0), "prompt$");
    assert_eq!(row_text(&emu, 19), "");
}

#[test]
fn malformed_osc_is_dropped() {
    let mut parser = Parser::new();
    let handlers = parser.process(b"\x1b]m;?\x1b\\");
    assert!(handlers.is_empty());
    assert_eq!(parser.state(), ParserState::Normal);
    let err = parser.last_error().map(ToString::to_string).unwrap_or_default();
    assert!(err.contains("can't parse"), "{err}");

    let after = parser.process(b"ok");
    assert_eq!(after.len(), 2);
}

#[test]
fn forward_tab_uses_next_stop() {
    let mut emu = Emulator::new(80, 24, 0);
    feed(&mut emu, "\x1b[3g\x1b[8G\x1bH\x1b[18G\x1bH\x1b[28G\x1bH");
    assert_eq!(emu.tab_stops(), vec![7, 17, 27]);
    feed(&mut emu, "\x1b[21G\t");
    assert_eq!(emu.cursor_col(), 27);
    feed(&mut emu, "\t");
    assert_eq!(emu.cursor_col(), 79);
}

#[test]
fn default_tab_stops_every_eight_columns() {
    let mut emu = Emulator::new(80, 24, 0);
    feed(&mut emu, "\x1b[21G\t");
    assert_eq!(emu.cursor_col(), 24);
    feed(&mut emu, "\x1b[2I");
    assert_eq!(emu.cursor_col(), 40);
    feed(&mut emu, "\x1b[Z");
    assert_eq!(emu.cursor_col(), 32);
}

#[test]
fn replies_are_collected_for_the_host() {
    let mut emu = Emulator::new(80, 24, 0);
    feed(&mut emu, "\x1b[5;10H\x1b[6n\x1b[c");
    assert_eq!(emu.take_reply(), "\x1b[5;10R\x1b[?64;1;9;15;21;22c");
    assert_eq!(emu.take_reply(), "");
}
