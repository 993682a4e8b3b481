//! Keystroke translation.
//!
//! The client terminal runs in application cursor-key mode, so arrow keys
//! arrive as `ESC O A`..`ESC O D`. When the application on the host has not
//! asked for that mode, they are rewritten to `ESC [ A`..`ESC [ D`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    Escape,
    Ss3,
}

/// Stateful translator for one keystroke stream.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    state: State,
}

impl UserInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one grapheme. Multi-codepoint graphemes pass through
    /// unchanged.
    pub fn parse(&mut self, grapheme: &str, application_cursor_keys: bool) -> String {
        let mut chars = grapheme.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            let prefix = if self.state == State::Ss3 { "O" } else { "" };
            self.state = State::Ground;
            return format!("{prefix}{grapheme}");
        };

        match self.state {
            State::Ground => {
                if ch == '\x1b' {
                    self.state = State::Escape;
                }
                ch.to_string()
            }
            State::Escape => match ch {
                'O' => {
                    self.state = State::Ss3;
                    String::new()
                }
                '\x1b' => ch.to_string(),
                _ => {
                    self.state = State::Ground;
                    ch.to_string()
                }
            },
            State::Ss3 => {
                self.state = State::Ground;
                if !application_cursor_keys && ('A'..='D').contains(&ch) {
                    format!("[{ch}")
                } else {
                    format!("O{ch}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(input: &str, app: bool) -> String {
        let mut ui = UserInput::new();
        input
            .chars()
            .map(|c| ui.parse(c.encode_utf8(&mut [0; 4]), app))
            .collect()
    }

    #[test]
    fn arrows_become_csi_in_ansi_mode() {
        assert_eq!(translate("\x1bOA\x1bOD", false), "\x1b[A\x1b[D");
    }

    #[test]
    fn arrows_stay_ss3_in_application_mode() {
        assert_eq!(translate("\x1bOB", true), "\x1bOB");
    }

    #[test]
    fn other_ss3_keys_are_untouched() {
        assert_eq!(translate("\x1bOP", false), "\x1bOP");
    }

    #[test]
    fn plain_text_and_alt_keys_pass_through() {
        assert_eq!(translate("ls\r", false), "ls\r");
        assert_eq!(translate("\x1bx", false), "\x1bx");
        assert_eq!(translate("\x1b\x1bOA", false), "\x1b\x1b[A");
    }

    #[test]
    fn multi_codepoint_grapheme_passes_through() {
        let mut ui = UserInput::new();
        assert_eq!(ui.parse("e\u{301}", false), "e\u{301}");
        ui.parse("\x1b", false);
        ui.parse("O", false);
        assert_eq!(ui.parse("👍🏽", false), "O👍🏽");
        assert_eq!(ui.parse("A", false), "A");
    }
}
