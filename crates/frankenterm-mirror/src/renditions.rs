//! Character renditions: colors and SGR attributes.
//!
//! A [`Renditions`] value is what SGR (`CSI ... m`) manipulates and what every
//! [`Cell`](crate::Cell) carries. It can be applied from parsed SGR parameters
//! and rendered back into a self-contained SGR sequence for the display diff.

use bitflags::bitflags;
use std::fmt::Write as _;

bitflags! {
    /// Boolean SGR attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SgrFlags: u16 {
        const BOLD          = 1 << 0;
        const FAINT         = 1 << 1;
        const ITALIC        = 1 << 2;
        const BLINK         = 1 << 3;
        const RAPID_BLINK   = 1 << 4;
        const INVERSE       = 1 << 5;
        const INVISIBLE     = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

/// Underline style (SGR 4 with an optional `:n` sub-parameter, SGR 21).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

impl UnderlineStyle {
    fn from_param(p: u16) -> Self {
        match p {
            0 => Self::None,
            2 => Self::Double,
            3 => Self::Curly,
            4 => Self::Dotted,
            5 => Self::Dashed,
            _ => Self::Single,
        }
    }

    fn param(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Single => 1,
            Self::Double => 2,
            Self::Curly => 3,
            Self::Dotted => 4,
            Self::Dashed => 5,
        }
    }
}

/// A foreground, background, or underline color.
///
/// The enum itself is the validity flag: only `Rgb` carries a 24-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / 49 / 59).
    #[default]
    Default,
    /// Palette index 0-255. 0-7 are the ANSI colors, 8-15 their bright forms.
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Resolve to an RGB triple using the xterm default palette.
    #[must_use]
    pub fn to_rgb(self, default: (u8, u8, u8)) -> (u8, u8, u8) {
        match self {
            Self::Default => default,
            Self::Indexed(i) => palette_rgb(i),
            Self::Rgb(r, g, b) => (r, g, b),
        }
    }
}

/// Complete rendition state of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Renditions {
    pub flags: SgrFlags,
    pub underline: UnderlineStyle,
    pub fg: Color,
    pub bg: Color,
    pub underline_color: Color,
}

impl Renditions {
    /// Renditions carrying only a background color, used for erased cells
    /// (background color erase).
    #[must_use]
    pub fn with_background(bg: Color) -> Self {
        Self {
            bg,
            ..Self::default()
        }
    }

    /// The background-only part of these renditions.
    #[must_use]
    pub fn background(&self) -> Self {
        Self::with_background(self.bg)
    }

    /// Whether this is the canonical unstyled value.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Apply an SGR parameter list.
    ///
    /// `colon[i]` is true when `params[i]` was introduced by `:` rather than
    /// `;`, making it a sub-parameter of the preceding value. An empty list is
    /// treated as `0` (reset).
    pub fn apply_sgr(&mut self, params: &[u16], colon: &[bool]) {
        if params.is_empty() {
            *self = Self::default();
            return;
        }

        let is_sub = |i: usize| colon.get(i).copied().unwrap_or(false);
        let mut i = 0;
        while i < params.len() {
            // Group a value with its colon-separated sub-parameters.
            let mut end = i + 1;
            while end < params.len() && is_sub(end) {
                end += 1;
            }
            let group = &params[i..end];

            if group.len() > 1 {
                self.apply_sub_group(group);
                i = end;
                continue;
            }

            let p = params[i];
            match p {
                38 | 48 | 58 => {
                    let (color, used) = extended_color(&params[i + 1..]);
                    if let Some(color) = color {
                        self.set_extended(p, color);
                    } else {
                        tracing::warn!(params = ?params, "SGR: malformed extended color");
                    }
                    i += 1 + used;
                    continue;
                }
                _ => self.apply_single(p),
            }
            i += 1;
        }
    }

    fn set_extended(&mut self, selector: u16, color: Color) {
        match selector {
            38 => self.fg = color,
            48 => self.bg = color,
            _ => self.underline_color = color,
        }
    }

    fn apply_sub_group(&mut self, group: &[u16]) {
        match group[0] {
            4 => self.underline = UnderlineStyle::from_param(group[1]),
            38 | 48 | 58 => {
                let color = match group[1] {
                    5 if group.len() >= 3 => Some(Color::Indexed(clamp_u8(group[2]))),
                    // 38:2:<colorspace>:r:g:b or the common 38:2:r:g:b
                    2 if group.len() >= 6 => Some(rgb(&group[3..6])),
                    2 if group.len() == 5 => Some(rgb(&group[2..5])),
                    _ => None,
                };
                match color {
                    Some(color) => self.set_extended(group[0], color),
                    None => tracing::warn!(group = ?group, "SGR: malformed colon color"),
                }
            }
            // Other sub-parameters are not meaningful; use the leading value.
            p => self.apply_single(p),
        }
    }

    fn apply_single(&mut self, p: u16) {
        match p {
            0 => *self = Self::default(),
            1 => self.flags.insert(SgrFlags::BOLD),
            2 => self.flags.insert(SgrFlags::FAINT),
            3 => self.flags.insert(SgrFlags::ITALIC),
            4 => self.underline = UnderlineStyle::Single,
            5 => self.flags.insert(SgrFlags::BLINK),
            6 => self.flags.insert(SgrFlags::RAPID_BLINK),
            7 => self.flags.insert(SgrFlags::INVERSE),
            8 => self.flags.insert(SgrFlags::INVISIBLE),
            9 => self.flags.insert(SgrFlags::STRIKETHROUGH),
            21 => self.underline = UnderlineStyle::Double,
            22 => self.flags.remove(SgrFlags::BOLD | SgrFlags::FAINT),
            23 => self.flags.remove(SgrFlags::ITALIC),
            24 => self.underline = UnderlineStyle::None,
            25 => self.flags.remove(SgrFlags::BLINK | SgrFlags::RAPID_BLINK),
            27 => self.flags.remove(SgrFlags::INVERSE),
            28 => self.flags.remove(SgrFlags::INVISIBLE),
            29 => self.flags.remove(SgrFlags::STRIKETHROUGH),
            30..=37 => self.fg = Color::Indexed((p - 30) as u8),
            39 => self.fg = Color::Default,
            40..=47 => self.bg = Color::Indexed((p - 40) as u8),
            49 => self.bg = Color::Default,
            59 => self.underline_color = Color::Default,
            90..=97 => self.fg = Color::Indexed((p - 90 + 8) as u8),
            100..=107 => self.bg = Color::Indexed((p - 100 + 8) as u8),
            _ => tracing::debug!(param = p, "SGR: ignoring unsupported attribute"),
        }
    }

    /// The parameter list (without `CSI` and `m`) that recreates these
    /// renditions from a reset state. Always starts with `0`.
    #[must_use]
    pub fn sgr_params(&self) -> String {
        let mut out = String::from("0");
        let f = self.flags;
        if f.contains(SgrFlags::BOLD) {
            out.push_str(";1");
        }
        if f.contains(SgrFlags::FAINT) {
            out.push_str(";2");
        }
        if f.contains(SgrFlags::ITALIC) {
            out.push_str(";3");
        }
        match self.underline {
            UnderlineStyle::None => {}
            UnderlineStyle::Single => out.push_str(";4"),
            style => {
                let _ = write!(out, ";4:{}", style.param());
            }
        }
        if f.contains(SgrFlags::BLINK) {
            out.push_str(";5");
        }
        if f.contains(SgrFlags::RAPID_BLINK) {
            out.push_str(";6");
        }
        if f.contains(SgrFlags::INVERSE) {
            out.push_str(";7");
        }
        if f.contains(SgrFlags::INVISIBLE) {
            out.push_str(";8");
        }
        if f.contains(SgrFlags::STRIKETHROUGH) {
            out.push_str(";9");
        }
        push_color(&mut out, self.fg, 30, 90, 38);
        push_color(&mut out, self.bg, 40, 100, 48);
        match self.underline_color {
            Color::Default => {}
            Color::Indexed(i) => {
                let _ = write!(out, ";58:5:{i}");
            }
            Color::Rgb(r, g, b) => {
                let _ = write!(out, ";58:2::{r}:{g}:{b}");
            }
        }
        out
    }

    /// A complete SGR sequence that sets exactly these renditions.
    #[must_use]
    pub fn sgr(&self) -> String {
        format!("\x1b[{}m", self.sgr_params())
    }
}

fn push_color(out: &mut String, color: Color, base: u16, bright: u16, extended: u16) {
    match color {
        Color::Default => {}
        Color::Indexed(i) if i < 8 => {
            let _ = write!(out, ";{}", base + u16::from(i));
        }
        Color::Indexed(i) if i < 16 => {
            let _ = write!(out, ";{}", bright + u16::from(i - 8));
        }
        Color::Indexed(i) => {
            let _ = write!(out, ";{extended};5;{i}");
        }
        Color::Rgb(r, g, b) => {
            let _ = write!(out, ";{extended};2;{r};{g};{b}");
        }
    }
}

fn clamp_u8(v: u16) -> u8 {
    v.min(255) as u8
}

fn rgb(v: &[u16]) -> Color {
    Color::Rgb(clamp_u8(v[0]), clamp_u8(v[1]), clamp_u8(v[2]))
}

/// Parse the `;`-separated tail of SGR 38/48/58. Returns the color (if the
/// form is valid) and how many parameters were consumed.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(5) => match rest.get(1) {
            Some(&i) => (Some(Color::Indexed(clamp_u8(i))), 2),
            None => (None, rest.len()),
        },
        Some(2) if rest.len() >= 4 => (Some(rgb(&rest[1..4])), 4),
        Some(_) | None => (None, rest.len()),
    }
}

// ── Palette ─────────────────────────────────────────────────────────────

const ANSI_16: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// RGB value of an xterm 256-color palette entry.
#[must_use]
pub fn palette_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0..=15 => ANSI_16[usize::from(index)],
        16..=231 => {
            let i = index - 16;
            (
                CUBE_LEVELS[usize::from(i / 36)],
                CUBE_LEVELS[usize::from((i / 6) % 6)],
                CUBE_LEVELS[usize::from(i % 6)],
            )
        }
        _ => {
            let level = 8 + (index - 232) * 10;
            (level, level, level)
        }
    }
}

/// Parse an X11 color specification as accepted by OSC 4 and OSC 10-19:
/// `rgb:r/g/b` (1-4 hex digits per channel) or `#rgb`, `#rrggbb`,
/// `#rrrgggbbb`, `#rrrrggggbbbb`. Named colors are not supported.
#[must_use]
pub fn parse_color_spec(spec: &str) -> Option<(u8, u8, u8)> {
    if let Some(body) = spec.strip_prefix("rgb:") {
        let mut parts = body.split('/');
        let r = scale_hex(parts.next()?)?;
        let g = scale_hex(parts.next()?)?;
        let b = scale_hex(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        return Some((r, g, b));
    }
    let hex = spec.strip_prefix('#')?;
    if hex.is_empty() || hex.len() % 3 != 0 || hex.len() > 12 {
        return None;
    }
    let n = hex.len() / 3;
    Some((
        scale_hex(&hex[..n])?,
        scale_hex(&hex[n..2 * n])?,
        scale_hex(&hex[2 * n..])?,
    ))
}

fn scale_hex(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 4 || !digits.is_ascii() {
        return None;
    }
    let v = u32::from_str_radix(digits, 16).ok()?;
    let max = (1u32 << (4 * digits.len() as u32)) - 1;
    Some(((v * 255 + max / 2) / max) as u8)
}

/// Format an RGB triple as the 16-bit-per-channel X11 form used in color
/// query replies.
#[must_use]
pub fn format_color_spec((r, g, b): (u8, u8, u8)) -> String {
    let w = |c: u8| u32::from(c) * 257;
    format!("rgb:{:04x}/{:04x}/{:04x}", w(r), w(g), w(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(params: &[u16]) -> Renditions {
        let mut r = Renditions::default();
        r.apply_sgr(params, &vec![false; params.len()]);
        r
    }

    #[test]
    fn empty_sgr_resets() {
        let mut r = apply(&[1, 31]);
        r.apply_sgr(&[], &[]);
        assert!(r.is_default());
    }

    #[test]
    fn basic_attributes_and_colors() {
        let r = apply(&[1, 3, 4, 7, 31, 44]);
        assert!(r.flags.contains(SgrFlags::BOLD | SgrFlags::ITALIC | SgrFlags::INVERSE));
        assert_eq!(r.underline, UnderlineStyle::Single);
        assert_eq!(r.fg, Color::Indexed(1));
        assert_eq!(r.bg, Color::Indexed(4));
    }

    #[test]
    fn bright_colors_map_to_upper_palette() {
        let r = apply(&[91, 102]);
        assert_eq!(r.fg, Color::Indexed(9));
        assert_eq!(r.bg, Color::Indexed(10));
    }

    #[test]
    fn semicolon_extended_colors() {
        let r = apply(&[38, 5, 196, 48, 2, 10, 20, 30, 1]);
        assert_eq!(r.fg, Color::Indexed(196));
        assert_eq!(r.bg, Color::Rgb(10, 20, 30));
        assert!(r.flags.contains(SgrFlags::BOLD));
    }

    #[test]
    fn colon_extended_colors_with_and_without_colorspace() {
        let mut r = Renditions::default();
        r.apply_sgr(&[38, 2, 0, 1, 2, 3], &[false, true, true, true, true, true]);
        assert_eq!(r.fg, Color::Rgb(1, 2, 3));
        r.apply_sgr(&[48, 2, 4, 5, 6], &[false, true, true, true, true]);
        assert_eq!(r.bg, Color::Rgb(4, 5, 6));
        r.apply_sgr(&[58, 5, 100], &[false, true, true]);
        assert_eq!(r.underline_color, Color::Indexed(100));
    }

    #[test]
    fn underline_sub_style() {
        let mut r = Renditions::default();
        r.apply_sgr(&[4, 3], &[false, true]);
        assert_eq!(r.underline, UnderlineStyle::Curly);
        r.apply_sgr(&[24], &[false]);
        assert_eq!(r.underline, UnderlineStyle::None);
    }

    #[test]
    fn truncated_extended_color_is_ignored() {
        let r = apply(&[38, 2, 1]);
        assert_eq!(r.fg, Color::Default);
    }

    #[test]
    fn intensity_reset_clears_bold_and_faint() {
        let r = apply(&[1, 2, 22]);
        assert!(!r.flags.intersects(SgrFlags::BOLD | SgrFlags::FAINT));
    }

    #[test]
    fn sgr_output_reproduces_renditions() {
        let original = apply(&[1, 5, 8, 38, 5, 200, 48, 2, 1, 2, 3, 93]);
        let mut reparsed = Renditions::default();
        let params: Vec<u16> = original
            .sgr_params()
            .split(';')
            .map(|p| p.parse().unwrap())
            .collect();
        reparsed.apply_sgr(&params, &vec![false; params.len()]);
        assert_eq!(reparsed, original);
    }

    #[test]
    fn sgr_string_format() {
        assert_eq!(Renditions::default().sgr(), "\x1b[0m");
        assert_eq!(apply(&[1, 31]).sgr(), "\x1b[0;1;31m");
        assert_eq!(apply(&[38, 5, 100]).sgr(), "\x1b[0;38;5;100m");
    }

    #[test]
    fn palette_cube_and_gray() {
        assert_eq!(palette_rgb(1), (205, 0, 0));
        assert_eq!(palette_rgb(16), (0, 0, 0));
        assert_eq!(palette_rgb(231), (255, 255, 255));
        assert_eq!(palette_rgb(196), (255, 0, 0));
        assert_eq!(palette_rgb(232), (8, 8, 8));
        assert_eq!(palette_rgb(255), (238, 238, 238));
    }

    #[test]
    fn color_spec_parsing() {
        assert_eq!(parse_color_spec("rgb:ff/00/80"), Some((255, 0, 128)));
        assert_eq!(parse_color_spec("rgb:ffff/0000/0000"), Some((255, 0, 0)));
        assert_eq!(parse_color_spec("#0f0"), Some((0, 255, 0)));
        assert_eq!(parse_color_spec("#102030"), Some((16, 32, 48)));
        assert_eq!(parse_color_spec("red"), None);
        assert_eq!(parse_color_spec("rgb:1/2"), None);
    }

    #[test]
    fn color_spec_formatting() {
        assert_eq!(format_color_spec((255, 0, 1)), "rgb:ffff/0000/0101");
    }
}
