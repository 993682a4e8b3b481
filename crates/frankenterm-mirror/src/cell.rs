//! Screen cell: the fundamental unit of a [`Row`](crate::Row).
//!
//! A cell holds at most one grapheme cluster plus its [`Renditions`]. Wide
//! graphemes occupy two adjacent cells: the leading cell carries the text and
//! [`CellFlags::WIDE`], the trailing one is an empty
//! [`CellFlags::WIDE_CONTINUATION`] placeholder.

use crate::renditions::Renditions;
use bitflags::bitflags;
use std::collections::HashMap;

/// Upper bound on the UTF-8 length of a cell's contents. Combining marks
/// beyond it are dropped.
pub const MAX_CELL_BYTES: usize = 32;

bitflags! {
    /// Cell-level flags that are orthogonal to renditions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// Leading (left) cell of a 2-column grapheme.
        const WIDE              = 1 << 0;
        /// Trailing (right) half of a 2-column grapheme. Carries no content.
        const WIDE_CONTINUATION = 1 << 1;
        /// Set on the last cell of a row whose text continues on the next row.
        const WRAP              = 1 << 2;
        /// Set on a last-column blank left behind when a wide grapheme
        /// wrapped early because it did not fit.
        const EARLY_WRAP        = 1 << 3;
        /// Contents start with a combining mark that was applied to a blank
        /// cell; rendering prefixes a no-break space.
        const FALLBACK          = 1 << 4;
    }
}

/// Hyperlink identifier for OSC 8 links. Zero means "no link".
pub type LinkId = u16;

/// A single screen position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    contents: String,
    renditions: Renditions,
    flags: CellFlags,
    link: LinkId,
}

impl Cell {
    /// An empty cell with the given renditions.
    #[must_use]
    pub fn blank(renditions: Renditions) -> Self {
        Self {
            contents: String::new(),
            renditions,
            flags: CellFlags::empty(),
            link: 0,
        }
    }

    /// A cell holding `grapheme` with the given renditions.
    #[must_use]
    pub fn with_grapheme(grapheme: &str, renditions: Renditions) -> Self {
        let mut cell = Self::blank(renditions);
        cell.contents.push_str(grapheme);
        cell
    }

    /// The grapheme stored in this cell (empty for blanks and continuations).
    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn renditions(&self) -> &Renditions {
        &self.renditions
    }

    pub fn set_renditions(&mut self, renditions: Renditions) {
        self.renditions = renditions;
    }

    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    pub fn link(&self) -> LinkId {
        self.link
    }

    pub fn set_link(&mut self, link: LinkId) {
        self.link = link;
    }

    /// Whether the cell has no contents.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Whether the cell renders as blank space: empty, a plain space, or a
    /// lone no-break space.
    pub fn is_blank(&self) -> bool {
        self.contents.is_empty() || self.contents == " " || self.contents == "\u{a0}"
    }

    pub fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE)
    }

    pub fn is_continuation(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    /// Display width in columns: 2 for a wide leading cell, otherwise 1.
    pub fn width(&self) -> u16 {
        if self.is_wide() { 2 } else { 1 }
    }

    pub fn wrap(&self) -> bool {
        self.flags.contains(CellFlags::WRAP)
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        self.flags.set(CellFlags::WRAP, wrap);
    }

    pub fn early_wrap(&self) -> bool {
        self.flags.contains(CellFlags::EARLY_WRAP)
    }

    pub fn set_early_wrap(&mut self, early: bool) {
        self.flags.set(CellFlags::EARLY_WRAP, early);
    }

    pub fn is_fallback(&self) -> bool {
        self.flags.contains(CellFlags::FALLBACK)
    }

    /// Erase the cell, leaving only `renditions` (normally background-only).
    pub fn reset(&mut self, renditions: Renditions) {
        self.contents.clear();
        self.renditions = renditions;
        self.flags = CellFlags::empty();
        self.link = 0;
    }

    /// Overwrite the cell with a grapheme.
    pub fn set_grapheme(&mut self, grapheme: &str, renditions: Renditions, wide: bool, link: LinkId) {
        self.contents.clear();
        self.contents.push_str(grapheme);
        self.renditions = renditions;
        self.flags = if wide {
            CellFlags::WIDE
        } else {
            CellFlags::empty()
        };
        self.link = link;
    }

    /// Turn the cell into the continuation half of a wide grapheme.
    pub fn set_continuation(&mut self, renditions: Renditions, link: LinkId) {
        self.contents.clear();
        self.renditions = renditions;
        self.flags = CellFlags::WIDE_CONTINUATION;
        self.link = link;
    }

    /// Append a zero-width combining sequence to the cell.
    ///
    /// When the cell was empty the result is flagged [`CellFlags::FALLBACK`].
    pub fn append_combining(&mut self, marks: &str) {
        if self.contents.len() + marks.len() > MAX_CELL_BYTES {
            return;
        }
        if self.contents.is_empty() {
            self.flags.insert(CellFlags::FALLBACK);
        }
        self.contents.push_str(marks);
    }

    /// Write the text a terminal must receive to draw this cell.
    pub fn write_printable(&self, out: &mut String) {
        if self.contents.is_empty() {
            out.push(' ');
        } else {
            if self.is_fallback() {
                out.push('\u{a0}');
            }
            out.push_str(&self.contents);
        }
    }

    /// Compare visible contents only, treating all blank forms as equal.
    #[must_use]
    pub fn contents_match(&self, other: &Self) -> bool {
        (self.is_blank() && other.is_blank()) || self.printable_eq(other)
    }

    fn printable_eq(&self, other: &Self) -> bool {
        let mut a = String::new();
        let mut b = String::new();
        self.write_printable(&mut a);
        other.write_printable(&mut b);
        a == b
    }
}

// ── Link set ────────────────────────────────────────────────────────────

/// Interning table for OSC 8 hyperlink targets.
///
/// Cells store compact [`LinkId`]s; this table maps them back to URLs. IDs are
/// stable for the lifetime of the table, so two snapshots of the same
/// framebuffer agree on them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    urls: Vec<String>,
    lookup: HashMap<String, LinkId>,
}

impl LinkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a URL and return its ID. Empty URLs map to 0 ("no link"), as
    /// does a full table.
    pub fn intern(&mut self, url: &str) -> LinkId {
        if url.is_empty() {
            return 0;
        }
        if let Some(&id) = self.lookup.get(url) {
            return id;
        }
        let Ok(id) = LinkId::try_from(self.urls.len() + 1) else {
            tracing::warn!(len = self.urls.len(), "link set full, dropping hyperlink");
            return 0;
        };
        self.urls.push(url.to_owned());
        self.lookup.insert(url.to_owned(), id);
        id
    }

    /// URL for a link ID.
    pub fn get(&self, id: LinkId) -> Option<&str> {
        let idx = usize::from(id).checked_sub(1)?;
        self.urls.get(idx).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.urls.clear();
        self.lookup.clear();
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renditions::Color;

    #[test]
    fn default_cell_is_empty_and_narrow() {
        let cell = Cell::default();
        assert!(cell.is_empty());
        assert!(cell.is_blank());
        assert_eq!(cell.width(), 1);
        assert_eq!(cell.link(), 0);
    }

    #[test]
    fn reset_keeps_only_given_renditions() {
        let red = Renditions::with_background(Color::Indexed(1));
        let mut cell = Cell::with_grapheme("x", Renditions::default());
        cell.set_wrap(true);
        cell.set_link(3);
        cell.reset(red);
        assert!(cell.is_empty());
        assert!(!cell.wrap());
        assert_eq!(cell.link(), 0);
        assert_eq!(cell.renditions().bg, Color::Indexed(1));
    }

    #[test]
    fn wide_and_continuation_flags() {
        let mut lead = Cell::default();
        lead.set_grapheme("中", Renditions::default(), true, 0);
        let mut cont = Cell::default();
        cont.set_continuation(Renditions::default(), 0);
        assert!(lead.is_wide());
        assert_eq!(lead.width(), 2);
        assert!(cont.is_continuation());
        assert!(cont.is_empty());
    }

    #[test]
    fn combining_on_blank_is_fallback() {
        let mut cell = Cell::default();
        cell.append_combining("\u{301}");
        assert!(cell.is_fallback());
        let mut out = String::new();
        cell.write_printable(&mut out);
        assert_eq!(out, "\u{a0}\u{301}");
    }

    #[test]
    fn combining_on_letter_extends_grapheme() {
        let mut cell = Cell::with_grapheme("e", Renditions::default());
        cell.append_combining("\u{301}");
        assert!(!cell.is_fallback());
        assert_eq!(cell.contents(), "e\u{301}");
    }

    #[test]
    fn combining_respects_byte_cap() {
        let mut cell = Cell::with_grapheme("a", Renditions::default());
        for _ in 0..40 {
            cell.append_combining("\u{301}");
        }
        assert!(cell.contents().len() <= MAX_CELL_BYTES);
    }

    #[test]
    fn blank_forms_match() {
        let empty = Cell::default();
        let space = Cell::with_grapheme(" ", Renditions::default());
        let nbsp = Cell::with_grapheme("\u{a0}", Renditions::default());
        assert!(empty.contents_match(&space));
        assert!(space.contents_match(&nbsp));
        assert!(!empty.contents_match(&Cell::with_grapheme("a", Renditions::default())));
    }

    #[test]
    fn fallback_matches_its_printed_form() {
        let mut fallback = Cell::default();
        fallback.append_combining("\u{301}");
        let printed = Cell::with_grapheme("\u{a0}\u{301}", Renditions::default());
        assert!(fallback.contents_match(&printed));
    }

    #[test]
    fn link_set_interns_and_dedups() {
        let mut links = LinkSet::new();
        assert_eq!(links.intern(""), 0);
        let a = links.intern("https://a.example");
        let b = links.intern("https://b.example");
        assert_ne!(a, 0);
        assert_ne!(a, b);
        assert_eq!(links.intern("https://a.example"), a);
        assert_eq!(links.get(a), Some("https://a.example"));
        assert_eq!(links.get(0), None);
        assert_eq!(links.len(), 2);
        links.clear();
        assert!(links.is_empty());
    }
}
