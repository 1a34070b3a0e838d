//! Exhaustive left-to-right scan and the node stream built on top of it.
//!
//! The scan visits every `<` once. Instead of enclosure checks it keeps a
//! watermark: a non-server tag is only accepted at or after the end of the
//! previous one, and after the start tag of a raw-text element only comments
//! and that element's end tag are accepted until the end tag is found.

use std::collections::BTreeMap;
use std::sync::Arc;

use memchr::memchr;

use crate::char_ref::{self, CharacterReference};
use crate::chars::{char_at, is_name_char};
use crate::diagnostics::DiagnosticKind;
use crate::document::Document;
use crate::html_policy::{decodes_references_in_content, is_raw_text_element};
use crate::span::Span;
use crate::tag::{Tag, TagId};
use crate::tag_type::{TagKind, TagType};

/// State that exists only while `full_scan` runs.
#[derive(Debug)]
pub(crate) struct ScanState {
    pub(crate) watermark: Watermark,
    /// Server-only recognition results, shared between attribute parsing and
    /// the scan loop so a nested server tag is constructed once.
    pub(crate) server_tags: BTreeMap<usize, Option<TagId>>,
}

impl ScanState {
    fn new() -> Self {
        Self {
            watermark: Watermark::At(0),
            server_tags: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Watermark {
    At(usize),
    RawText { element: String, resume: usize },
}

impl Watermark {
    pub(crate) fn admits(&self, tag_type: &TagType, parse_text: &str, pos: usize) -> bool {
        match self {
            Watermark::At(mark) => pos >= *mark,
            Watermark::RawText { element, resume } => {
                pos >= *resume
                    && (tag_type == &TagType::comment()
                        || closes_raw_text(tag_type, parse_text, pos, element))
            }
        }
    }

    /// Move past a freshly accepted non-server tag.
    fn advance(&mut self, tag: &Tag) {
        let end = tag.span().end;
        let next = match (&*self, tag) {
            (Watermark::RawText { element, .. }, Tag::End(end_tag))
                if end_tag.tag_type.is_normal() && end_tag.name == *element =>
            {
                Watermark::At(end)
            }
            (Watermark::RawText { element, .. }, _) => Watermark::RawText {
                element: element.clone(),
                resume: end,
            },
            (Watermark::At(_), Tag::Start(start))
                if start.tag_type.is_normal()
                    && !start.self_closing
                    && is_raw_text_element(&start.name) =>
            {
                Watermark::RawText {
                    element: start.name.clone(),
                    resume: end,
                }
            }
            (Watermark::At(mark), _) => Watermark::At((*mark).max(end)),
        };
        *self = next;
    }
}

fn closes_raw_text(tag_type: &TagType, parse_text: &str, pos: usize, element: &str) -> bool {
    if !tag_type.is_normal() || tag_type.kind() != TagKind::End {
        return false;
    }
    let name_begin = pos + 2;
    parse_text
        .get(name_begin..)
        .is_some_and(|rest| rest.starts_with(element))
        && !char_at(parse_text, name_begin + element.len()).is_some_and(is_name_char)
}

/// One step of a sequential walk over the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Tag(TagId),
    CharacterReference(CharacterReference),
    Text,
}

impl Document {
    /// Recognize every tag in one pass and mark the cache complete.
    ///
    /// Afterwards every query is answered from the scan result; nothing is
    /// constructed on demand until the cache is cleared. Entries recognized
    /// on demand before the scan are discarded.
    pub fn full_scan(&mut self) {
        if self.cache.is_complete() {
            return;
        }
        if !self.cache.is_empty() {
            let discarded = self.cache.len();
            self.report(
                DiagnosticKind::DiscardedCache,
                0,
                format!("full scan discards {discarded} positions recognized on demand"),
            );
            self.cache.clear();
        }

        let config = Arc::clone(&self.config);
        self.scan = Some(ScanState::new());
        let mut ordered = Vec::new();
        let mut special = Vec::new();
        let mut search = 0;
        while let Some(rel) = memchr(b'<', &self.parse_text.as_bytes()[search..]) {
            let pos = search + rel;
            search = pos + 1;
            let memo = self
                .scan
                .as_ref()
                .and_then(|scan| scan.server_tags.get(&pos).copied().flatten());
            let Some(id) = memo.or_else(|| self.recognize(pos, false)) else {
                continue;
            };
            let Some(tag) = self.arena.get(id) else {
                continue;
            };
            if !tag.is_server_tag() {
                if let Some(scan) = &mut self.scan {
                    scan.watermark.advance(tag);
                }
                if let Some(index) = config
                    .suppressing_types
                    .iter()
                    .position(|t| t == tag.tag_type())
                {
                    special.push((pos, index, id));
                }
            }
            ordered.push((pos, id));
        }
        self.scan = None;

        log::debug!(target: "markup.scan", "full scan found {} tags", ordered.len());
        self.cache.install_scan(ordered, special);
    }

    /// Sequential walk: every top-level tag plus the text between tags, with
    /// character references split out of the text.
    ///
    /// Tags nested inside another tag's span (server tags inside attribute
    /// values) are not part of the walk, so the node spans tile the document.
    pub fn nodes(&mut self) -> Vec<Node> {
        self.full_scan();
        let ordered: Vec<TagId> = self
            .cache
            .ordered()
            .map(|ordered| ordered.iter().map(|(_, id)| *id).collect())
            .unwrap_or_default();

        let mut nodes = Vec::new();
        let mut cursor = 0;
        let mut raw_element: Option<String> = None;
        for id in ordered {
            let Some(tag) = self.arena.get(id) else {
                continue;
            };
            let span = tag.span();
            if span.begin < cursor {
                continue;
            }
            self.push_text(&mut nodes, Span::new(cursor, span.begin), raw_element.is_none());
            nodes.push(Node {
                span,
                kind: NodeKind::Tag(id),
            });
            cursor = span.end;

            match tag {
                Tag::Start(start)
                    if start.tag_type.is_normal()
                        && !start.self_closing
                        && is_raw_text_element(&start.name)
                        && !decodes_references_in_content(&start.name) =>
                {
                    raw_element = Some(start.name.clone());
                }
                Tag::End(end) if raw_element.as_deref() == Some(end.name.as_str()) => {
                    raw_element = None;
                }
                _ => {}
            }
        }
        self.push_text(&mut nodes, Span::new(cursor, self.len()), raw_element.is_none());
        nodes
    }

    fn push_text(&self, nodes: &mut Vec<Node>, span: Span, split_references: bool) {
        if span.is_empty() {
            return;
        }
        let mut text_begin = span.begin;
        if split_references {
            let settings = self.config.profile.unterminated(false);
            let mut search = span.begin;
            while let Some(rel) = memchr(b'&', &self.source().as_bytes()[search..span.end]) {
                let pos = search + rel;
                search = pos + 1;
                let Some(reference) = char_ref::reference_at(self.source(), pos, settings) else {
                    continue;
                };
                if reference.span.end > span.end {
                    continue;
                }
                if text_begin < pos {
                    nodes.push(Node {
                        span: Span::new(text_begin, pos),
                        kind: NodeKind::Text,
                    });
                }
                nodes.push(Node {
                    span: reference.span,
                    kind: NodeKind::CharacterReference(reference),
                });
                text_begin = reference.span.end;
                search = text_begin;
            }
        }
        if text_begin < span.end {
            nodes.push(Node {
                span: Span::new(text_begin, span.end),
                kind: NodeKind::Text,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;

    fn doc(source: &str) -> Document {
        Document::with_config(source, ParserConfig::default())
    }

    fn tag_texts(doc: &mut Document) -> Vec<String> {
        let ids = doc.all_tags();
        ids.iter()
            .filter_map(|id| doc.tag_text(*id))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn scan_finds_tags_in_source_order() {
        let mut doc = doc("<!DOCTYPE html><p class=a>x<!-- <b> --></p>");
        assert_eq!(
            tag_texts(&mut doc),
            vec!["<!DOCTYPE html>", "<p class=a>", "<!-- <b> -->", "</p>"]
        );
    }

    #[test]
    fn complete_cache_answers_without_constructing() {
        let mut doc = doc("<p><!-- <b> --></p>");
        doc.full_scan();
        let constructed = doc.constructed_tag_count();
        assert_eq!(doc.tag_at(8), None);
        assert!(doc.tag_at(3).is_some());
        assert_eq!(doc.constructed_tag_count(), constructed);
        assert_eq!(doc.cached_position_count(), 3);
    }

    #[test]
    fn raw_text_hides_markup_until_matching_end_tag() {
        let mut doc = doc(r#"<script>if (a<b) w("<p>")</scripts></script><p>"#);
        assert_eq!(tag_texts(&mut doc), vec!["<script>", "</script>", "<p>"]);
    }

    #[test]
    fn comments_inside_raw_text_keep_it_armed() {
        let mut doc = doc("<style><!-- </style> --><i></style>");
        assert_eq!(
            tag_texts(&mut doc),
            vec!["<style>", "<!-- </style> -->", "</style>"]
        );
    }

    #[test]
    fn server_tags_are_found_inside_other_tags() {
        let mut doc = doc(r#"<a href="<%= url %>">x</a>"#);
        assert_eq!(tag_texts(&mut doc), vec![r#"<a href="<%= url %>">"#, "<%= url %>", "</a>"]);
        // Reused from attribute parsing, not constructed twice.
        assert_eq!(doc.constructed_tag_count(), 3);
    }

    #[test]
    fn scanning_a_populated_cache_is_reported() {
        let mut doc = doc("<p>a</p>");
        doc.tag_at(0);
        doc.full_scan();
        assert!(
            doc.diagnostics()
                .iter()
                .any(|d| d.kind == DiagnosticKind::DiscardedCache)
        );
        doc.full_scan();
        let count = doc
            .diagnostics()
            .iter()
            .filter(|d| d.kind == DiagnosticKind::DiscardedCache)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn clearing_the_cache_returns_to_on_demand() {
        let mut doc = doc("<p><!-- <b> --></p>");
        doc.full_scan();
        doc.clear_cache();
        assert_eq!(doc.tag_at(8), None);
        assert!(doc.tag_at(15).is_some());
        assert!(doc.diagnostics().is_empty());
    }

    #[test]
    fn nodes_tile_the_source() {
        let source = "a &amp; b<p title='&lt;'>c&#33;d<!-- &amp; --></p>&zz;";
        let mut doc = doc(source);
        let nodes = doc.nodes();
        let rebuilt: String = nodes
            .iter()
            .filter_map(|node| doc.text(node.span))
            .collect();
        assert_eq!(rebuilt, source);

        let references: Vec<char> = nodes
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::CharacterReference(r) => Some(r.character),
                _ => None,
            })
            .collect();
        assert_eq!(references, vec!['&', '!']);
    }

    #[test]
    fn nested_server_tags_are_not_walked() {
        let mut doc = doc(r#"<a href="<%= url %>">x</a>"#);
        let kinds: Vec<&str> = doc
            .nodes()
            .iter()
            .map(|node| match node.kind {
                NodeKind::Tag(_) => "tag",
                NodeKind::CharacterReference(_) => "ref",
                NodeKind::Text => "text",
            })
            .collect();
        assert_eq!(kinds, vec!["tag", "text", "tag"]);
    }

    #[test]
    fn references_stay_text_inside_scripts_but_not_titles() {
        let mut doc = doc("<script>&amp;</script><title>&amp;</title>");
        let nodes = doc.nodes();
        assert!(matches!(nodes[1].kind, NodeKind::Text));
        assert_eq!(nodes[1].span, Span::new(8, 13));
        assert!(matches!(nodes[4].kind, NodeKind::CharacterReference(_)));
    }
}
