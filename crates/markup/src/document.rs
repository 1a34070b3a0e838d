//! The document: source text plus everything discovered about it so far.

use std::borrow::Cow;
use std::sync::Arc;

use memchr::{memchr, memrchr};
use tools::{LineIndex, RowColumn};

use crate::attributes::AttributeList;
use crate::cache::TagCache;
use crate::char_ref::{self, CharacterReference};
use crate::config::ParserConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::scan::ScanState;
use crate::span::Span;
use crate::tag::{Tag, TagArena, TagFilter, TagId};

/// An immutable markup buffer with a growing memo of recognized tags.
///
/// All queries take `&mut self` because they may populate the cache. A
/// document is not meant to be shared between threads while queried.
pub struct Document {
    source: String,
    /// ASCII-lowercased copy of `source` with ignored spans blanked out;
    /// all recognition runs on this text.
    pub(crate) parse_text: String,
    pub(crate) config: Arc<ParserConfig>,
    pub(crate) arena: TagArena,
    pub(crate) cache: TagCache,
    /// Present only while an exhaustive scan is running.
    pub(crate) scan: Option<ScanState>,
    diagnostics: Vec<Diagnostic>,
    line_index: Option<LineIndex>,
}

impl Document {
    /// Document using a snapshot of the global configuration.
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_shared_config(source, ParserConfig::global())
    }

    pub fn with_config(source: impl Into<String>, config: ParserConfig) -> Self {
        Self::with_shared_config(source, Arc::new(config))
    }

    pub fn with_shared_config(source: impl Into<String>, config: Arc<ParserConfig>) -> Self {
        let source = source.into();
        let parse_text = source.to_ascii_lowercase();
        Self {
            source,
            parse_text,
            config,
            arena: TagArena::default(),
            cache: TagCache::default(),
            scan: None,
            diagnostics: Vec::new(),
            line_index: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Source text covered by `span`.
    pub fn text(&self, span: Span) -> Option<&str> {
        span.slice(&self.source)
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.arena.get(id)
    }

    pub fn tag_span(&self, id: TagId) -> Option<Span> {
        self.arena.get(id).map(Tag::span)
    }

    /// Source text of a tag; empty for implicit end tags.
    pub fn tag_text(&self, id: TagId) -> Option<&str> {
        self.tag_span(id).and_then(|span| self.text(span))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn row_column(&mut self, pos: usize) -> RowColumn {
        let source = &self.source;
        self.line_index
            .get_or_insert_with(|| LineIndex::new(source))
            .row_column(source, pos)
    }

    pub(crate) fn report(&mut self, kind: DiagnosticKind, position: usize, message: String) {
        let diagnostic = Diagnostic {
            position,
            location: self.row_column(position),
            kind,
            message,
        };
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }

    /// Number of tags constructed so far (cached or not).
    pub fn constructed_tag_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of positions memoized by the cache.
    pub fn cached_position_count(&self) -> usize {
        self.cache.len()
    }

    /// Forget everything recognized so far. Tag handles stay resolvable.
    pub fn clear_cache(&mut self) {
        log::debug!(target: "markup.cache", "clear cache ({} entries)", self.cache.len());
        self.cache.clear();
    }

    /// Exclude `span` from recognition (for instance a region a caller has
    /// already handled). Clears the cache; returns `false` if the span is not
    /// on character boundaries of the source.
    pub fn ignore_when_parsing(&mut self, span: Span) -> bool {
        let end = span.end.min(self.source.len());
        if span.begin > end
            || !self.source.is_char_boundary(span.begin)
            || !self.source.is_char_boundary(end)
        {
            return false;
        }
        self.parse_text
            .replace_range(span.begin..end, &" ".repeat(end - span.begin));
        self.clear_cache();
        true
    }

    /// First tag beginning at or after `from`, without filtering.
    pub(crate) fn next_tag_from(&mut self, from: usize) -> Option<TagId> {
        if let Some(index) = self.cache.first_at_or_after(from) {
            return self
                .cache
                .ordered()
                .and_then(|ordered| ordered.get(index))
                .map(|(_, id)| *id);
        }
        let mut search = from;
        while search < self.parse_text.len() {
            let rel = memchr(b'<', &self.parse_text.as_bytes()[search..])?;
            let pos = search + rel;
            if let Some(id) = self.tag_at(pos) {
                return Some(id);
            }
            search = pos + 1;
        }
        None
    }

    /// Like `next_tag_from`, but skips tags that an earlier tag swallowed.
    fn next_outermost_tag_from(&mut self, from: usize) -> Option<TagId> {
        let mut cursor = from;
        loop {
            let id = self.next_tag_from(cursor)?;
            if self.outermost_tag(id) == id {
                return Some(id);
            }
            cursor = self.tag_span(id)?.begin + 1;
        }
    }

    /// The tag actually present at the start of `id`: `id` itself, or an
    /// earlier tag whose span covers it.
    ///
    /// On demand, a `<` inside a quoted attribute value constructs a tag of
    /// its own. A tag is covered exactly when the outermost tag of the
    /// nearest earlier non-server tag covers it. Answers are memoized per
    /// position; a walk stops at the first memoized tag.
    pub(crate) fn outermost_tag(&mut self, id: TagId) -> TagId {
        if self.cache.is_complete() || self.arena.get(id).is_none_or(Tag::is_server_tag) {
            return id;
        }
        let mut pending = Vec::new();
        let mut current = id;
        let mut cover = loop {
            let Some(begin) = self.tag_span(current).map(|span| span.begin) else {
                break None;
            };
            if let Some(known) = self.cache.cover(begin) {
                break Some(known);
            }
            pending.push((begin, current));
            match self.non_server_tag_before(begin) {
                Some(earlier) => current = earlier,
                None => break None,
            }
        };
        while let Some((begin, tag)) = pending.pop() {
            let covered = cover
                .filter(|c| self.tag_span(*c).is_some_and(|span| span.contains(begin)))
                .unwrap_or(tag);
            self.cache.insert_cover(begin, covered);
            cover = Some(covered);
        }
        cover.unwrap_or(id)
    }

    fn non_server_tag_before(&mut self, pos: usize) -> Option<TagId> {
        let mut limit = pos.min(self.parse_text.len());
        while let Some(lt) = memrchr(b'<', &self.parse_text.as_bytes()[..limit]) {
            if let Some(id) = self.tag_at(lt) {
                if self.arena.get(id).is_some_and(|tag| !tag.is_server_tag()) {
                    return Some(id);
                }
            }
            limit = lt;
        }
        None
    }

    /// First tag matching `filter` that begins at or after `pos`.
    ///
    /// Tags found inside another tag's span are skipped when discovered on
    /// demand.
    pub fn tag_after(&mut self, pos: usize, filter: TagFilter<'_>) -> Option<TagId> {
        let mut cursor = pos;
        loop {
            let id = self.next_outermost_tag_from(cursor)?;
            let tag = self.arena.get(id)?;
            if filter.matches(tag) {
                return Some(id);
            }
            let span = tag.span();
            cursor = if self.cache.is_complete() {
                span.begin + 1
            } else {
                span.end.max(span.begin + 1)
            };
        }
    }

    /// Last tag matching `filter` that begins at or before `pos`.
    pub fn tag_before(&mut self, pos: usize, filter: TagFilter<'_>) -> Option<TagId> {
        let mut limit = pos.saturating_add(1).min(self.parse_text.len());
        while let Some(lt) = memrchr(b'<', &self.parse_text.as_bytes()[..limit]) {
            if let Some(id) = self.tag_at(lt) {
                if self.outermost_tag(id) == id
                    && self.arena.get(id).is_some_and(|tag| filter.matches(tag))
                {
                    return Some(id);
                }
            }
            limit = lt;
        }
        None
    }

    /// The tag whose span contains `pos`.
    pub fn enclosing_tag(&mut self, pos: usize) -> Option<TagId> {
        let mut limit = pos.saturating_add(1).min(self.parse_text.len());
        while let Some(lt) = memrchr(b'<', &self.parse_text.as_bytes()[..limit]) {
            if let Some(id) = self.tag_at(lt) {
                let id = self.outermost_tag(id);
                if self.tag_span(id).is_some_and(|span| span.contains(pos)) {
                    return Some(id);
                }
            }
            limit = lt;
        }
        None
    }

    /// Tags lying entirely within `span`, in source order.
    pub fn all_tags_in(&mut self, span: Span) -> Vec<TagId> {
        let mut tags = Vec::new();
        let mut cursor = span.begin;
        while let Some(id) = self.next_outermost_tag_from(cursor) {
            let Some(tag_span) = self.tag_span(id) else {
                break;
            };
            if tag_span.begin >= span.end {
                break;
            }
            if span.encloses(tag_span) {
                tags.push(id);
            }
            cursor = if self.cache.is_complete() {
                tag_span.begin + 1
            } else {
                tag_span.end.max(tag_span.begin + 1)
            };
        }
        tags
    }

    /// Every tag in the document, running the exhaustive scan if needed.
    pub fn all_tags(&mut self) -> Vec<TagId> {
        self.full_scan();
        self.cache
            .ordered()
            .map(|ordered| ordered.iter().map(|(_, id)| *id).collect())
            .unwrap_or_default()
    }

    pub fn attributes_of(&self, start_tag: TagId) -> Option<&AttributeList> {
        self.arena.get(start_tag)?.as_start()?.attributes.as_ref()
    }

    /// Decoded value of the first attribute named `key`.
    pub fn attribute_value(&self, start_tag: TagId, key: &str) -> Option<String> {
        let span = self.attributes_of(start_tag)?.get(key)?.value_span?;
        let raw = self.text(span)?;
        Some(char_ref::decode_with(raw, true, &self.config).into_owned())
    }

    /// Character reference beginning at `pos`, using the profile's rules for
    /// text outside attribute values.
    pub fn character_reference_at(&self, pos: usize) -> Option<CharacterReference> {
        char_ref::reference_at(&self.source, pos, self.config.profile.unterminated(false))
    }

    pub fn decode<'t>(&self, text: &'t str) -> Cow<'t, str> {
        char_ref::decode_with(text, false, &self.config)
    }

    pub fn decode_attribute_value<'t>(&self, text: &'t str) -> Cow<'t, str> {
        char_ref::decode_with(text, true, &self.config)
    }

    pub fn encode<'t>(&self, text: &'t str) -> Cow<'t, str> {
        char_ref::encode_with(text, &self.config)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.source.len())
            .field("tags", &self.arena.len())
            .field("cached", &self.cache.len())
            .field("complete", &self.cache.is_complete())
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}
