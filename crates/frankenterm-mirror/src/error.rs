//! Error types.

use std::fmt;

/// Terminal capability lookup failure. The only error a caller of this crate
/// has to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// `TERM` is unset or empty.
    Missing,
    /// `TERM` names a terminal with no known capabilities.
    Unknown(String),
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "TERM is not set"),
            Self::Unknown(term) => write!(f, "unknown terminal type {term:?}"),
        }
    }
}

impl std::error::Error for CapabilityError {}

/// The parser's most recent diagnostic.
///
/// Never returned as a failure: the parser logs it, recovers to the ground
/// state, and keeps it for [`Parser::last_error`](crate::Parser::last_error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A numeric parameter reached 65535.
    NumberTooLarge,
    /// More parameters than the parser keeps.
    TooManyParameters,
    /// An OSC or DCS payload exceeded its byte cap.
    StringOverflow,
    /// No operation matches the final character in this state.
    Unhandled { state: &'static str, seq: String },
    /// The sequence was recognized but its arguments are malformed.
    Malformed { what: &'static str, seq: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NumberTooLarge => write!(f, "numeric parameter too large"),
            Self::TooManyParameters => write!(f, "too many parameters"),
            Self::StringOverflow => write!(f, "string argument overflow"),
            Self::Unhandled { state, seq } => write!(f, "unhandled input in {state}: {seq:?}"),
            Self::Malformed { what, seq } => write!(f, "{what}: can't parse {seq:?}"),
        }
    }
}

impl std::error::Error for ParseError {}
