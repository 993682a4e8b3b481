//! Replays a terminal session frame by frame and checks that a replica fed
//! only the renderer's output ends up showing the same screen.

use frankenterm_mirror::{Display, Emulator, TerminalCapabilities};

fn assert_same_screen(want: &Emulator, got: &Emulator, step: &str) {
    assert_eq!(
        (got.cursor_row(), got.cursor_col()),
        (want.cursor_row(), want.cursor_col()),
        "cursor after {step}"
    );
    assert_eq!(got.is_alternate_screen(), want.is_alternate_screen(), "{step}");
    assert_eq!(got.cursor_visible(), want.cursor_visible(), "{step}");
    for r in 0..want.height() {
        for c in 0..want.width() {
            let (a, b) = match (want.fb().cell(r, c), got.fb().cell(r, c)) {
                (Some(a), Some(b)) => (a, b),
                _ => panic!("missing cell ({r},{c}) after {step}"),
            };
            assert!(
                a.contents_match(b)
                    && a.renditions() == b.renditions()
                    && a.is_wide() == b.is_wide()
                    && want.fb().links().get(a.link()) == got.fb().links().get(b.link()),
                "cell ({r},{c}) after {step}: want {a:?}, got {b:?}"
            );
        }
    }
}

struct Session {
    display: Display,
    host: Emulator,
    shown: Emulator,
    replica: Emulator,
    bytes_sent: usize,
}

impl Session {
    fn new(display: Display, cols: u16, rows: u16) -> Self {
        let host = Emulator::new(cols, rows, 200);
        let shown = host.clone();
        let mut replica = Emulator::new(cols, rows, 0);
        let first = display.new_frame(false, &shown, &host);
        replica.handle_stream(first.as_bytes());
        Self {
            display,
            host,
            shown,
            replica,
            bytes_sent: first.len(),
        }
    }

    fn step(&mut self, input: &str) {
        self.host.handle_stream(input.as_bytes());
        let out = self.display.new_frame(true, &self.shown, &self.host);
        self.bytes_sent += out.len();
        self.replica.handle_stream(out.as_bytes());
        self.shown = self.host.clone();
        assert_same_screen(&self.host, &self.replica, &format!("{input:?}"));
    }
}

const SHELL_STEPS: &[&str] = &[
    "\x1b]0;user@host: ~\x07user@host:~$ ",
    "ls --color\r\n",
    "\x1b[0m\x1b[01;34mbin\x1b[0m  \x1b[01;34msrc\x1b[0m  Cargo.toml  README.md\r\n",
    "user@host:~$ ",
    "cat notes.txt\r\n",
    "première ligne\r\n日本語のテキスト\r\nsecond line\r\n",
    "user@host:~$ ",
    "\x07",
    "echo \x1b]8;;https://example.com\x1b\\link\x1b]8;;\x1b\\\r\n",
    "user@host:~$ ",
];

const EDITOR_STEPS: &[&str] = &[
    "vim notes.txt\r\n",
    "\x1b[?1049h\x1b[22;0;0t\x1b[?1h\x1b=\x1b[H\x1b[2J\x1b[1;23r\x1b[?12h\x1b[?25l",
    "\x1b[1;1Hpremière ligne\x1b[2;1H日本語のテキスト\x1b[3;1Hsecond line",
    "\x1b[4;1H\x1b[94m~\x1b[5;1H~\x1b[6;1H~\x1b[0m\x1b[24;1H\x1b[7m\"notes.txt\" 3L\x1b[0m\x1b[1;1H\x1b[?25h",
    "\x1b[?25l\x1b[3;1H\x1b[Lnew line\x1b[3;9H\x1b[?25h",
    "\x1b[?25l\x1b[23;1H\n\x1b[22;1Hscrolled\x1b[?25h",
    "\x1b[2;4H\x1b[2P\x1b[1@x",
    "\x1b[?25l\x1b[24;1H\x1b[K:wq\r\x1b[?1l\x1b>\x1b[r\x1b[?1049l\x1b[23;0;0t\x1b[?25h",
    "user@host:~$ ",
];

#[test]
fn shell_session_round_trips() {
    let mut s = Session::new(Display::default(), 60, 8);
    for step in SHELL_STEPS {
        s.step(step);
    }
    assert_eq!(s.replica.window_title(), "user@host: ~");
    assert_eq!(s.replica.primary().bell_count(), 1);
}

#[test]
fn editor_session_round_trips() {
    let mut s = Session::new(Display::default(), 80, 24);
    for step in SHELL_STEPS.iter().chain(EDITOR_STEPS) {
        s.step(step);
    }
    assert!(!s.replica.is_alternate_screen());
    assert!(!s.replica.modes().application_cursor_keys());
}

#[test]
fn terminal_without_bce_or_ech_still_round_trips() {
    let caps = TerminalCapabilities::lookup("vt100").unwrap();
    let mut s = Session::new(Display::new(&caps), 40, 10);
    for step in [
        "\x1b[44mblue background\x1b[K\r\n",
        "\x1b[2J\x1b[H",
        "\x1b[0mplain      gap\r\n",
        "\x1b[41m\x1b[3;1H\x1b[20X",
    ] {
        s.step(step);
    }
}

#[test]
fn long_output_scrolls_cheaply() {
    let mut s = Session::new(Display::default(), 40, 12);
    for i in 0..12 {
        s.step(&format!("line {i}\r\n"));
    }
    let before = s.bytes_sent;
    s.step("line 12\r\n");
    assert!(s.bytes_sent - before < 40, "{} bytes", s.bytes_sent - before);
}

#[test]
fn resize_repaints_everything() {
    let mut s = Session::new(Display::default(), 30, 6);
    s.step("before resize\r\n$ ");

    s.host.resize(40, 8);
    let out = s.display.new_frame(true, &s.shown, &s.host);
    let mut replica = Emulator::new(40, 8, 0);
    replica.handle_stream(out.as_bytes());
    assert!(out.contains("\x1b[H\x1b[2J"));
    assert_same_screen(&s.host, &replica, "resize");
}
