//! Terminal capability lookup by `TERM` name.
//!
//! The renderer needs a handful of facts about the terminal it draws on:
//!
//! | Capability | Effect on output |
//! |---|---|
//! | `bce` | blank runs with a background color may be erased instead of printed |
//! | `ech` | `CSI n X` may be used for runs of blanks |
//! | `title` | OSC 0/1/2 titles and the title stack are sent |
//! | `smcup` / `rmcup` | strings that enter and leave the alternate screen |
//!
//! Only the base name of `TERM` matters: `xterm-256color`, `xterm-kitty` and
//! `xterm` all resolve to the xterm entry. Unknown names are an error rather
//! than a silent fallback, since a wrong `bce` guess corrupts the screen.

use std::env;

use tracing::debug;

use crate::error::CapabilityError;

const XTERM_SMCUP: &str = "\x1b[?1049h";
const XTERM_RMCUP: &str = "\x1b[?1049l";
const RXVT_SMCUP: &str = "\x1b7\x1b[?47h";
const RXVT_RMCUP: &str = "\x1b[2J\x1b[?47l\x1b8";

/// What a terminal family supports.
#[derive(Debug, Clone, Copy)]
struct Entry {
    names: &'static [&'static str],
    bce: bool,
    ech: bool,
    title: bool,
    smcup: Option<&'static str>,
    rmcup: Option<&'static str>,
}

const ENTRIES: &[Entry] = &[
    Entry {
        names: &["xterm", "alacritty", "foot", "wezterm", "ghostty", "contour", "rio", "st", "kitty"],
        bce: true,
        ech: true,
        title: true,
        smcup: Some(XTERM_SMCUP),
        rmcup: Some(XTERM_RMCUP),
    },
    Entry {
        names: &["screen", "tmux"],
        bce: false,
        ech: true,
        title: true,
        smcup: Some(XTERM_SMCUP),
        rmcup: Some(XTERM_RMCUP),
    },
    Entry {
        names: &["rxvt", "urxvt", "kterm", "eterm", "putty"],
        bce: true,
        ech: true,
        title: true,
        smcup: Some(RXVT_SMCUP),
        rmcup: Some(RXVT_RMCUP),
    },
    Entry {
        names: &["linux", "cygwin"],
        bce: true,
        ech: true,
        title: false,
        smcup: None,
        rmcup: None,
    },
    Entry {
        names: &["vt220", "vt320", "vt420", "vt520", "ansi"],
        bce: false,
        ech: true,
        title: false,
        smcup: None,
        rmcup: None,
    },
    Entry {
        names: &["vt100", "vt102", "dumb"],
        bce: false,
        ech: false,
        title: false,
        smcup: None,
        rmcup: None,
    },
];

/// Capabilities of the terminal the renderer draws on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCapabilities {
    /// The `TERM` value these were resolved from.
    pub term: String,
    /// Background color erase.
    pub bce: bool,
    /// Erase-character (`ECH`) support.
    pub ech: bool,
    /// Window title support.
    pub title: bool,
    pub smcup: Option<String>,
    pub rmcup: Option<String>,
}

impl Default for TerminalCapabilities {
    /// An xterm-compatible terminal.
    fn default() -> Self {
        Self {
            term: "xterm".to_owned(),
            bce: true,
            ech: true,
            title: true,
            smcup: Some(XTERM_SMCUP.to_owned()),
            rmcup: Some(XTERM_RMCUP.to_owned()),
        }
    }
}

impl TerminalCapabilities {
    /// Resolve capabilities for a `TERM` value.
    pub fn lookup(term: &str) -> Result<Self, CapabilityError> {
        if term.is_empty() {
            return Err(CapabilityError::Missing);
        }
        let base = base_name(term);
        let Some(entry) = ENTRIES.iter().find(|e| e.names.contains(&base.as_str())) else {
            return Err(CapabilityError::Unknown(term.to_owned()));
        };
        debug!(term, bce = entry.bce, ech = entry.ech, title = entry.title, "terminal capabilities");
        Ok(Self {
            term: term.to_owned(),
            bce: entry.bce,
            ech: entry.ech,
            title: entry.title,
            smcup: entry.smcup.map(str::to_owned),
            rmcup: entry.rmcup.map(str::to_owned),
        })
    }

    /// Resolve capabilities from the `TERM` environment variable.
    pub fn from_env() -> Result<Self, CapabilityError> {
        Self::lookup(&env::var("TERM").unwrap_or_default())
    }
}

/// Family name of a `TERM` value: lowercased, up to the first `-` or `.`.
fn base_name(term: &str) -> String {
    term.split(['-', '.'])
        .next()
        .unwrap_or(term)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xterm_variants_share_an_entry() {
        for term in ["xterm", "xterm-256color", "xterm-kitty", "XTERM-direct"] {
            let caps = TerminalCapabilities::lookup(term).expect(term);
            assert!(caps.bce && caps.ech && caps.title, "{term}");
            assert_eq!(caps.smcup.as_deref(), Some("\x1b[?1049h"));
            assert_eq!(caps.term, term);
        }
    }

    #[test]
    fn multiplexers_lack_bce() {
        for term in ["screen", "screen.xterm-256color", "tmux-256color"] {
            let caps = TerminalCapabilities::lookup(term).expect(term);
            assert!(!caps.bce, "{term}");
            assert!(caps.title, "{term}");
        }
    }

    #[test]
    fn linux_console_has_no_title() {
        let caps = TerminalCapabilities::lookup("linux").unwrap();
        assert!(caps.bce);
        assert!(!caps.title);
        assert_eq!(caps.smcup, None);
    }

    #[test]
    fn dumb_terminal_has_nothing() {
        let caps = TerminalCapabilities::lookup("dumb").unwrap();
        assert!(!caps.bce && !caps.ech && !caps.title);
    }

    #[test]
    fn empty_term_is_missing() {
        assert_eq!(TerminalCapabilities::lookup(""), Err(CapabilityError::Missing));
    }

    #[test]
    fn unknown_term_is_an_error() {
        assert_eq!(
            TerminalCapabilities::lookup("hal9000"),
            Err(CapabilityError::Unknown("hal9000".into()))
        );
    }

    #[test]
    fn default_is_xterm() {
        assert_eq!(
            TerminalCapabilities::default(),
            TerminalCapabilities::lookup("xterm").unwrap()
        );
    }
}
