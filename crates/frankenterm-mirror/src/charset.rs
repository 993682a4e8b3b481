//! Legacy character sets and G0–G3 designation state.
//!
//! Tables translate the 7-bit position of a byte (0x20-0x7F) to Unicode. A
//! byte arriving through GR (0xA0-0xFF) is looked up by its low seven bits.

/// A designatable character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    /// US-ASCII in GL, Latin-1 in GR. Selecting it means "UTF-8" to the parser.
    #[default]
    Utf8,
    /// DEC Special Graphics (`0`): line drawing.
    DecSpecial,
    /// DEC Supplemental (`<`, `%5`).
    DecSupplemental,
    /// DEC Technical (`>`).
    DecTechnical,
    /// ISO 8859-1 right half (96-set `A`).
    IsoLatin1,
    /// ISO United Kingdom (94-set `A`).
    IsoUk,
}

impl Charset {
    /// Resolve a designation final byte. `ninety_six` is true for the
    /// `-./` designators; `percent` when the final was preceded by `%`.
    #[must_use]
    pub fn from_designation(final_byte: char, ninety_six: bool, percent: bool) -> Option<Self> {
        match (final_byte, ninety_six, percent) {
            ('B', _, false) => Some(Self::Utf8),
            ('0', false, false) => Some(Self::DecSpecial),
            ('<', false, false) | ('5', false, true) => Some(Self::DecSupplemental),
            ('>', false, false) => Some(Self::DecTechnical),
            ('A', true, false) => Some(Self::IsoLatin1),
            ('A', false, false) => Some(Self::IsoUk),
            _ => None,
        }
    }

    /// Translate a 7-bit position (0x20-0x7F).
    #[must_use]
    pub fn lookup(self, b: u8, via_gr: bool) -> char {
        let b = b & 0x7f;
        match self {
            Self::Utf8 => {
                if via_gr {
                    char::from(b | 0x80)
                } else {
                    char::from(b)
                }
            }
            Self::DecSpecial => match b {
                0x5f..=0x7e => DEC_SPECIAL[usize::from(b - 0x5f)],
                _ => char::from(b),
            },
            Self::DecSupplemental => {
                let key = b | 0x80;
                DEC_SUPPLEMENTAL
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map_or(char::from(key), |&(_, c)| c)
            }
            Self::DecTechnical => match b {
                0x20..=0x7f => DEC_TECHNICAL[usize::from(b - 0x20)],
                _ => char::from(b),
            },
            Self::IsoLatin1 => char::from(b | 0x80),
            Self::IsoUk => {
                if b == 0x23 {
                    '£'
                } else {
                    char::from(b)
                }
            }
        }
    }
}

const DEC_SPECIAL: [char; 32] = [
    '\u{00a0}', '◆', '▒', '␉', '␌', '␍', '␊', '°', '±', '␤', '␋', '┘', '┐', '┌', '└', '┼', '⎺',
    '⎻', '─', '⎼', '⎽', '├', '┤', '┴', '┬', '│', '≤', '≥', 'π', '≠', '£', '·',
];

const DEC_SUPPLEMENTAL: [(u8, char); 19] = [
    (0xa0, ' '),
    (0xa6, '&'),
    (0xa8, '¤'),
    (0xac, ','),
    (0xad, '-'),
    (0xae, '.'),
    (0xaf, '/'),
    (0xb4, '4'),
    (0xb8, '8'),
    (0xbe, '>'),
    (0xd0, 'P'),
    (0xd7, 'Œ'),
    (0xdd, 'Ÿ'),
    (0xde, '^'),
    (0xf0, 'p'),
    (0xf7, 'œ'),
    (0xfd, 'ÿ'),
    (0xfe, '~'),
    (0xff, '\u{7f}'),
];

const DEC_TECHNICAL: [char; 96] = [
    ' ', '⎷', '┌', '─', '⌠', '⌡', '│', '⎡', '⎣', '⎤', '⎦', '⎛', '⎝', '⎞', '⎠', '⎨', //
    '⎬', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', ' ', '≤', '≠', '≥', '∫', //
    '∴', '∝', '∞', '÷', 'Δ', '∇', 'Φ', 'Γ', '∼', '≃', 'Θ', '×', 'Λ', '⇔', '⇒', '≡', //
    'Π', 'Ψ', ' ', 'Σ', ' ', ' ', '√', 'Ω', 'Ξ', 'Υ', '⊂', '⊃', '∩', '∪', '∧', '∨', //
    '¬', 'α', 'β', 'χ', 'δ', 'ε', 'φ', 'γ', 'η', 'ι', 'θ', 'κ', 'λ', ' ', 'ν', '∂', //
    'π', 'ψ', 'ρ', 'σ', 'τ', ' ', 'ƒ', 'ω', 'ξ', 'υ', 'ζ', '←', '↑', '→', '↓', '\u{7f}',
];

/// G0–G3 slots plus the GL/GR invocation and pending single shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharsetState {
    pub g: [Charset; 4],
    pub gl: usize,
    pub gr: usize,
    pub single_shift: Option<usize>,
}

impl Default for CharsetState {
    fn default() -> Self {
        Self {
            g: [Charset::Utf8; 4],
            gl: 0,
            gr: 2,
            single_shift: None,
        }
    }
}

impl CharsetState {
    /// Whether every slot holds the UTF-8/ASCII set.
    #[must_use]
    pub fn all_utf8(&self) -> bool {
        self.g.iter().all(|&c| c == Charset::Utf8)
    }

    /// Translate a raw byte received in byte-oriented mode.
    pub fn map_byte(&mut self, b: u8) -> char {
        let shift = self.single_shift.take();
        if b >= 0xa0 {
            self.g[self.gr].lookup(b, true)
        } else if (0x20..0x7f).contains(&b) {
            self.g[shift.unwrap_or(self.gl)].lookup(b, false)
        } else {
            char::from(b)
        }
    }

    /// Translate a grapheme received in UTF-8 mode. Only single printable
    /// ASCII characters go through GL; everything else is literal.
    pub fn map_grapheme<'a>(&mut self, grapheme: &'a str) -> std::borrow::Cow<'a, str> {
        let shift = self.single_shift.take();
        let mut chars = grapheme.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            let set = self.g[shift.unwrap_or(self.gl)];
            if let Ok(b @ 0x20..=0x7e) = u8::try_from(ch) {
                if set != Charset::Utf8 {
                    return std::borrow::Cow::Owned(set.lookup(b, false).to_string());
                }
            }
        }
        std::borrow::Cow::Borrowed(grapheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn designation_finals() {
        assert_eq!(Charset::from_designation('0', false, false), Some(Charset::DecSpecial));
        assert_eq!(Charset::from_designation('B', false, false), Some(Charset::Utf8));
        assert_eq!(Charset::from_designation('A', true, false), Some(Charset::IsoLatin1));
        assert_eq!(Charset::from_designation('A', false, false), Some(Charset::IsoUk));
        assert_eq!(Charset::from_designation('5', false, true), Some(Charset::DecSupplemental));
        assert_eq!(Charset::from_designation('Z', false, false), None);
    }

    #[test]
    fn dec_special_line_drawing() {
        assert_eq!(Charset::DecSpecial.lookup(b'q', false), '─');
        assert_eq!(Charset::DecSpecial.lookup(b'x', false), '│');
        assert_eq!(Charset::DecSpecial.lookup(b'l', false), '┌');
        assert_eq!(Charset::DecSpecial.lookup(b'`', false), '◆');
        assert_eq!(Charset::DecSpecial.lookup(b'A', false), 'A');
    }

    #[test]
    fn uk_pound_only_replaces_hash() {
        assert_eq!(Charset::IsoUk.lookup(b'#', false), '£');
        assert_eq!(Charset::IsoUk.lookup(b'a', false), 'a');
    }

    #[test]
    fn supplemental_overrides_and_latin1_passthrough() {
        assert_eq!(Charset::DecSupplemental.lookup(0xd7, true), 'Œ');
        assert_eq!(Charset::DecSupplemental.lookup(0xe9, true), 'é');
        assert_eq!(Charset::DecSupplemental.lookup(0x57, false), 'Œ');
    }

    #[test]
    fn technical_table() {
        assert_eq!(Charset::DecTechnical.lookup(0x61, false), 'α');
        assert_eq!(Charset::DecTechnical.lookup(0x7e, false), '↓');
    }

    #[test]
    fn gr_defaults_to_latin1() {
        let mut state = CharsetState::default();
        assert_eq!(state.map_byte(0xe9), 'é');
        assert_eq!(state.map_byte(b'a'), 'a');
    }

    #[test]
    fn single_shift_applies_once() {
        let mut state = CharsetState::default();
        state.g[2] = Charset::DecSpecial;
        state.single_shift = Some(2);
        assert_eq!(state.map_byte(b'q'), '─');
        assert_eq!(state.map_byte(b'q'), 'q');
    }

    #[test]
    fn grapheme_mapping_only_touches_ascii() {
        let mut state = CharsetState::default();
        state.g[0] = Charset::DecSpecial;
        assert_eq!(state.map_grapheme("q"), "─");
        assert_eq!(state.map_grapheme("é"), "é");
        assert_eq!(state.map_grapheme("qq"), "qq");
        assert_eq!(state.map_grapheme("~"), "·");
        assert_eq!(state.map_grapheme("\u{7f}"), "\u{7f}");
        assert_eq!(state.map_grapheme("\u{a0}"), "\u{a0}");
    }
}
