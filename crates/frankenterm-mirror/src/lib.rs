#![forbid(unsafe_code)]

//! Terminal state mirroring.
//!
//! `frankenterm-mirror` models a VT-compatible terminal well enough to keep a
//! faithful copy of what an application drew, and to reproduce that copy on
//! another terminal with as few bytes as possible.
//!
//! # Primary responsibilities
//!
//! - **Parser**: byte stream to [`Handler`] records, UTF-8 decoding and
//!   grapheme clustering included.
//! - **Emulator**: applies each record to a primary and an alternate
//!   [`Framebuffer`], tracking cursor, modes, tab stops, charsets, titles,
//!   colors, and the replies owed to the host.
//! - **Display**: given the frame last shown and the frame wanted, produces
//!   the escape sequences that turn one into the other.
//! - **Overlay** and **input**: coordinate access for local echo prediction
//!   and keystroke translation for the client.
//!
//! # Design principles
//!
//! - **No I/O**: the caller supplies bytes and ships the output.
//! - **Deterministic**: identical input produces identical state and output.
//! - **Malformed input recovers**: the parser logs and returns to ground;
//!   the only fallible call is terminal capability lookup.

pub mod capabilities;
pub mod cell;
pub mod charset;
pub mod config;
pub mod display;
pub mod emulator;
pub mod error;
pub mod framebuffer;
pub mod handler;
pub mod input;
pub mod modes;
pub mod overlay;
pub mod parser;
pub mod renditions;
pub mod row;

pub use capabilities::TerminalCapabilities;
pub use cell::{Cell, CellFlags, LinkId, LinkSet};
pub use charset::{Charset, CharsetState};
pub use config::EmulatorConfig;
pub use display::Display;
pub use emulator::{Emulator, SavedCursor, Screen};
pub use error::{CapabilityError, ParseError};
pub use framebuffer::{CursorStyle, Framebuffer, TitleEntry};
pub use handler::{Action, EraseMode, Handler};
pub use input::UserInput;
pub use modes::{CompatLevel, KeypadMode, Modes, MouseEncoding, MouseTracking};
pub use overlay::{ConditionalCursorMove, Validity};
pub use parser::{Parser, ParserState};
pub use renditions::{Color, Renditions, SgrFlags, UnderlineStyle};
pub use row::Row;
