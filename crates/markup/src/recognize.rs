//! Tag recognition: deciding which tag, if any, begins at a position.
//!
//! Candidates come from the registry in precedence order. A candidate is
//! skipped when its position is invalid under the current regime, and
//! otherwise asked to construct itself; the first success wins. Construction
//! that runs out of text (`Incomplete`) only rejects that one candidate.
//!
//! Two validity regimes exist. During an exhaustive scan a watermark decides
//! (see `scan`). On demand, a non-server tag is invalid when an instance of a
//! markup-suppressing type (comments and CDATA sections by default) encloses
//! it; those instances are found by a backward delimiter search and memoized
//! in the special tier of the cache.

use std::sync::Arc;

use crate::chars::find_from;
use crate::diagnostics::DiagnosticKind;
use crate::document::Document;
use crate::span::Span;
use crate::tag::{Tag, TagId};
use crate::tag_type::{ConstructContext, Incomplete, Syntax, TagType, construct_builtin};

impl Document {
    /// The tag beginning at `pos`, if any.
    pub fn tag_at(&mut self, pos: usize) -> Option<TagId> {
        if let Some(cached) = self.cache.get(pos) {
            return cached;
        }
        let found = self.recognize(pos, false);
        self.cache.insert(pos, found);
        found
    }

    /// The server tag beginning at `pos`, if any.
    pub fn server_tag_at(&mut self, pos: usize) -> Option<TagId> {
        if !self.server_delimiter_at(pos) {
            return None;
        }
        if let Some(scan) = &self.scan {
            if let Some(found) = scan.server_tags.get(&pos) {
                return *found;
            }
            let found = self.recognize(pos, true);
            if let Some(scan) = &mut self.scan {
                scan.server_tags.insert(pos, found);
            }
            return found;
        }
        match self.cache.get(pos) {
            Some(Some(id)) if self.arena.get(id).is_some_and(Tag::is_server_tag) => Some(id),
            Some(None) => None,
            Some(Some(_)) if self.cache.is_complete() => None,
            // A non-server type won full recognition here.
            Some(Some(_)) => {
                if let Some(known) = self.cache.server_tag(pos) {
                    return known;
                }
                let found = self.recognize(pos, true);
                self.cache.insert_server_tag(pos, found);
                found
            }
            None => {
                if let Some(known) = self.cache.server_tag(pos) {
                    return known;
                }
                let found = self.recognize(pos, true);
                match found {
                    Some(_) => self.cache.insert(pos, found),
                    None => self.cache.insert_server_tag(pos, None),
                }
                found
            }
        }
    }

    /// End of the server tag at `pos`.
    pub(crate) fn server_tag_end(&mut self, pos: usize) -> Option<usize> {
        let id = self.server_tag_at(pos)?;
        self.tag_span(id).map(|span| span.end)
    }

    fn server_delimiter_at(&self, pos: usize) -> bool {
        let text = self.parse_text.as_bytes();
        self.config
            .registry
            .by_precedence()
            .any(|t| t.is_server_tag() && t.matches_at(text, pos))
    }

    pub(crate) fn construct_context(&self) -> ConstructContext<'_> {
        ConstructContext {
            source: self.source(),
            parse_text: self.parse_text.as_bytes(),
        }
    }

    /// Run the candidate loop at `pos` without consulting the position cache.
    pub(crate) fn recognize(&mut self, pos: usize, server_only: bool) -> Option<TagId> {
        let config = Arc::clone(&self.config);
        let candidates: Vec<TagType> = config
            .registry
            .candidates_at(self.parse_text.as_bytes(), pos)
            .cloned()
            .collect();

        for tag_type in &candidates {
            if server_only && !tag_type.is_server_tag() {
                continue;
            }
            if tag_type.is_unregistered() && !config.recognize_unregistered {
                continue;
            }
            let suppressing = config.suppressing_types.iter().position(|t| t == tag_type);
            if self.scan.is_none() {
                if let Some(index) = suppressing {
                    if let Some(known) = self.cache.special(pos, index) {
                        match known {
                            Some(id) => return Some(id),
                            None => continue,
                        }
                    }
                }
            }
            if !self.is_valid_position(tag_type, pos) {
                if let (Some(index), None) = (suppressing, &self.scan) {
                    self.cache.insert_special(pos, index, None);
                }
                continue;
            }
            match self.construct(tag_type, pos) {
                Ok(Some(tag)) => {
                    log::trace!(
                        target: "markup.tags",
                        "{} `{}` at {}..{}",
                        tag_type.name(),
                        tag.name(),
                        tag.span().begin,
                        tag.span().end
                    );
                    let id = self.arena.alloc(tag);
                    if let (Some(index), None) = (suppressing, &self.scan) {
                        self.cache.insert_special(pos, index, Some(id));
                    }
                    return Some(id);
                }
                Ok(None) => {}
                Err(Incomplete) => {
                    let closing = tag_type.closing_delimiter().to_string();
                    self.report(
                        DiagnosticKind::NoClosingDelimiter,
                        pos,
                        format!("{} has no closing delimiter `{closing}`", tag_type.name()),
                    );
                }
            }
        }
        None
    }

    fn is_valid_position(&mut self, tag_type: &TagType, pos: usize) -> bool {
        if let Syntax::Custom(syntax) = tag_type.syntax() {
            if !syntax.accepts_position(&self.construct_context(), pos) {
                return false;
            }
        }
        if tag_type.is_server_tag() {
            return true;
        }
        if let Some(scan) = &self.scan {
            return scan.watermark.admits(tag_type, &self.parse_text, pos);
        }
        !self.is_enclosed(pos, tag_type, 0)
    }

    /// Whether an instance of a suppressing type other than `candidate`
    /// encloses `pos`.
    fn is_enclosed(&mut self, pos: usize, candidate: &TagType, depth: usize) -> bool {
        let config = Arc::clone(&self.config);
        if depth >= config.max_enclosure_depth {
            self.report(
                DiagnosticKind::EnclosureDepthExceeded,
                pos,
                format!(
                    "suppression checks nested deeper than {}; position treated as not enclosed",
                    config.max_enclosure_depth
                ),
            );
            return false;
        }
        for (index, suppressing) in config.suppressing_types.iter().enumerate() {
            if suppressing == candidate {
                continue;
            }
            let enclosing = self.nearest_special_before(pos, index, suppressing, depth);
            if enclosing.is_some_and(|span| span.contains(pos)) {
                return true;
            }
        }
        false
    }

    /// Span of the nearest valid instance of `tag_type` starting before `pos`.
    fn nearest_special_before(
        &mut self,
        pos: usize,
        index: usize,
        tag_type: &TagType,
        depth: usize,
    ) -> Option<Span> {
        let mut before = pos;
        loop {
            let begin = self.cache.delimiter_before(
                index,
                self.parse_text.as_bytes(),
                tag_type.start_lower(),
                before,
            )?;
            if let Some(id) = self.special_tag_at(begin, index, tag_type, depth) {
                return self.tag_span(id);
            }
            before = begin;
        }
    }

    fn special_tag_at(
        &mut self,
        pos: usize,
        index: usize,
        tag_type: &TagType,
        depth: usize,
    ) -> Option<TagId> {
        if let Some(known) = self.cache.special(pos, index) {
            return known;
        }
        let found = if self.is_enclosed(pos, tag_type, depth + 1) {
            None
        } else {
            match self.construct(tag_type, pos) {
                Ok(Some(tag)) => Some(self.arena.alloc(tag)),
                Ok(None) | Err(Incomplete) => None,
            }
        };
        self.cache.insert_special(pos, index, found);
        found
    }

    /// Ask `tag_type` to build a tag at `pos`.
    pub(crate) fn construct(
        &mut self,
        tag_type: &TagType,
        pos: usize,
    ) -> Result<Option<Tag>, Incomplete> {
        match tag_type.syntax() {
            Syntax::Builtin(builtin) => construct_builtin(self, *builtin, tag_type, pos),
            Syntax::Delimited => self.construct_delimited(tag_type, pos),
            Syntax::Custom(syntax) => {
                let ctx = self.construct_context();
                let Some(construction) = syntax.construct(&ctx, tag_type, pos)? else {
                    return Ok(None);
                };
                let end = construction.end;
                if end <= pos || end > self.len() || !self.source().is_char_boundary(end) {
                    return Ok(None);
                }
                let name = construction
                    .name
                    .unwrap_or_else(|| tag_type.descriptor().name_prefix.to_string());
                Ok(Some(Tag::opaque(tag_type, Span::new(pos, end), name)))
            }
        }
    }

    /// Opaque construct ending at the first closing delimiter.
    pub(crate) fn construct_delimited(
        &self,
        tag_type: &TagType,
        pos: usize,
    ) -> Result<Option<Tag>, Incomplete> {
        let body = pos + tag_type.start_lower().len();
        let closing = tag_type.closing_lower();
        let end = find_from(self.parse_text.as_bytes(), body, closing).ok_or(Incomplete)?;
        let end = end + closing.len();
        let name = tag_type.descriptor().name_prefix.to_string();
        Ok(Some(Tag::opaque(tag_type, Span::new(pos, end), name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::tag_type::{Construction, CustomSyntax, TagTypeDescriptor};

    fn doc(source: &str) -> Document {
        Document::with_config(source, ParserConfig::default())
    }

    fn type_name(doc: &Document, id: Option<TagId>) -> Option<String> {
        id.and_then(|id| doc.tag(id)).map(|tag| tag.tag_type().name().to_string())
    }

    #[test]
    fn first_successful_candidate_wins() {
        let mut doc = doc("<%-- c --%><% x %><p>");
        let first = doc.tag_at(0);
        assert_eq!(type_name(&doc, first).as_deref(), Some("server comment"));
        let common = doc.tag_at(11);
        assert_eq!(type_name(&doc, common).as_deref(), Some("common server tag"));
        assert_eq!(doc.tag_span(common.unwrap()), Some(Span::new(11, 18)));
    }

    #[test]
    fn tags_inside_comments_are_suppressed_on_demand() {
        let mut doc = doc("<!-- <p> --><p>");
        assert_eq!(doc.tag_at(5), None);
        assert!(doc.tag_at(12).is_some());
    }

    #[test]
    fn comment_is_not_checked_against_itself() {
        let mut doc = doc("<!-- a <!-- b -->");
        let inner = doc.tag_at(7).unwrap();
        assert_eq!(doc.tag_span(inner), Some(Span::new(7, 17)));
    }

    #[test]
    fn server_tags_are_valid_inside_comments() {
        let mut doc = doc("<!-- <% x %> -->");
        assert!(doc.server_tag_at(5).is_some());
        assert!(doc.tag_at(5).is_some());
    }

    #[test]
    fn cdata_inside_comment_and_comment_inside_cdata() {
        let mut doc = doc("<![CDATA[ <!-- ]]> <p> -->");
        // The comment opener sits inside the CDATA section, so it is not a
        // comment and does not hide the <p>.
        assert_eq!(doc.tag_at(10), None);
        assert!(doc.tag_at(19).is_some());
    }

    #[test]
    fn server_tag_behind_another_type_is_memoized() {
        let (block, _) = TagType::delimited_pair(
            TagTypeDescriptor::new("mason block", "<%perl", ">"),
            TagTypeDescriptor::new("mason block end", "</%perl", ">"),
        );
        let mut config = ParserConfig::default();
        config.registry.register(block.clone()).unwrap();
        let mut doc = Document::with_config("<%perl> x %>", config);
        let winner = doc.tag_at(0).unwrap();
        assert_eq!(doc.tag(winner).unwrap().tag_type(), &block);

        let server = doc.server_tag_at(0).unwrap();
        assert_eq!(doc.tag_span(server), Some(Span::new(0, 12)));
        let constructed = doc.constructed_tag_count();
        for _ in 0..3 {
            assert_eq!(doc.server_tag_at(0), Some(server));
        }
        assert_eq!(doc.constructed_tag_count(), constructed);
        assert_eq!(doc.tag_at(0), Some(winner));
    }

    #[test]
    fn unclosed_server_tag_is_reported_once() {
        let mut doc = doc("<% never closed");
        assert_eq!(doc.server_tag_at(0), None);
        assert_eq!(doc.server_tag_at(0), None);
        let kinds: Vec<_> = doc.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::NoClosingDelimiter]);
    }

    #[test]
    fn missing_closing_delimiter_is_logged_and_skipped() {
        let mut doc = doc("<!-- never closed");
        assert_eq!(doc.tag_at(0), None);
        let kinds: Vec<_> = doc.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::NoClosingDelimiter]);
    }

    #[test]
    fn misses_are_cached() {
        let mut doc = doc("a < b");
        assert_eq!(doc.tag_at(2), None);
        let constructed = doc.constructed_tag_count();
        assert_eq!(doc.tag_at(2), None);
        assert_eq!(doc.constructed_tag_count(), constructed);
        assert_eq!(doc.cached_position_count(), 1);
    }

    #[test]
    fn suppressing_instances_are_shared_between_tiers() {
        let mut doc = doc("<!-- <p> -->");
        assert_eq!(doc.tag_at(5), None);
        let constructed = doc.constructed_tag_count();
        assert!(doc.tag_at(0).is_some());
        assert_eq!(doc.constructed_tag_count(), constructed);
    }

    #[test]
    fn unregistered_tags_are_opt_in() {
        let mut doc = Document::with_config("<1x>", ParserConfig::default());
        assert_eq!(doc.tag_at(0), None);
        let config = ParserConfig {
            recognize_unregistered: true,
            ..ParserConfig::default()
        };
        let mut doc = Document::with_config("<1x>", config);
        let id = doc.tag_at(0).unwrap();
        assert!(doc.tag(id).unwrap().tag_type().is_unregistered());
    }

    #[test]
    fn enclosure_depth_is_capped() {
        let config = ParserConfig {
            max_enclosure_depth: 1,
            ..ParserConfig::default()
        };
        let mut doc = Document::with_config("<![CDATA[ <!-- ]]> <p> -->", config);
        // Past the cap the comment opener counts as not enclosed by the CDATA
        // section, so the comment hides the <p>.
        assert_eq!(doc.tag_at(19), None);
        assert!(
            doc.diagnostics()
                .iter()
                .any(|d| d.kind == DiagnosticKind::EnclosureDepthExceeded)
        );
    }

    struct Mustache;

    impl CustomSyntax for Mustache {
        fn construct(
            &self,
            ctx: &ConstructContext<'_>,
            _tag_type: &TagType,
            pos: usize,
        ) -> Result<Option<Construction>, Incomplete> {
            let close = ctx.find(pos + 3, "}}").ok_or(Incomplete)?;
            let name = ctx.source()[pos + 3..close].trim().to_string();
            Ok(Some(Construction {
                end: close + 2,
                name: Some(name),
            }))
        }
    }

    #[test]
    fn custom_syntax_shadows_builtins() {
        let mustache = TagType::custom(
            TagTypeDescriptor::new("mustache", "<{{", "}}").server(),
            Arc::new(Mustache),
        );
        let mut config = ParserConfig::default();
        config.registry.register(mustache.clone()).unwrap();
        let mut doc = Document::with_config("<{{ user }}>", config);
        let id = doc.tag_at(0).unwrap();
        let tag = doc.tag(id).unwrap();
        assert_eq!(tag.tag_type(), &mustache);
        assert_eq!(tag.name(), "user");
        assert_eq!(tag.span(), Span::new(0, 11));
    }

    #[test]
    fn delimited_custom_types() {
        let (start, end) = TagType::delimited_pair(
            TagTypeDescriptor::new("mason block", "<%perl", ">"),
            TagTypeDescriptor::new("mason block end", "</%perl", ">"),
        );
        let mut config = ParserConfig::default();
        config.registry.register(start.clone()).unwrap();
        config.registry.register(end.clone()).unwrap();
        let mut doc = Document::with_config("<%perl> x </%perl>", config);
        let id = doc.tag_at(0).unwrap();
        assert_eq!(doc.tag(id).unwrap().tag_type(), &start);
        assert_eq!(doc.tag_span(id), Some(Span::new(0, 7)));
        let id = doc.tag_at(10).unwrap();
        assert!(doc.tag(id).unwrap().as_end().is_some());
    }
}
