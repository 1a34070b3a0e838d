//! Half-open byte ranges over a document's source text.

/// Byte span `[begin, end)` into a `Document` source buffer.
///
/// Invariant: `begin <= end`, and both ends sit on UTF-8 boundaries of the
/// buffer that produced the span. Spans carry no reference to that buffer;
/// resolve them through the owning document (`Document::text`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub begin: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end, "span begin must be <= end");
        Self { begin, end }
    }

    /// Zero-length span at `pos`.
    #[inline]
    pub fn empty_at(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    #[inline]
    pub fn len(self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.begin == self.end
    }

    /// True when `pos` lies inside the span (the end is exclusive).
    #[inline]
    pub fn contains(self, pos: usize) -> bool {
        pos >= self.begin && pos < self.end
    }

    /// True when `other` lies entirely within this span.
    #[inline]
    pub fn encloses(self, other: Span) -> bool {
        other.begin >= self.begin && other.end <= self.end
    }

    /// Slice `source` with this span.
    ///
    /// Returns `None` if the span is out of range or not on character
    /// boundaries of `source`.
    pub fn slice(self, source: &str) -> Option<&str> {
        source.get(self.begin..self.end)
    }
}
