//! Element boundaries: pairing a start tag with its end tag.
//!
//! Resolution walks forward over recognized tags with an explicit frame
//! stack. A frame is pushed for every nested element whose end has to be
//! known before the enclosing search can continue, so deeply nested input
//! never recurses. Results are memoized on the start tag.

use crate::diagnostics::DiagnosticKind;
use crate::document::Document;
use crate::html_policy::{EndTagPolicy, OptionalEnd, end_tag_policy, forbids_self_nesting};
use crate::span::Span;
use crate::tag::{EndTag, Tag, TagFilter, TagId};
use crate::tag_type::TagType;

/// Memoized resolution result stored on a start tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ElementBounds {
    pub(crate) end_tag: Option<TagId>,
    /// Exclusive end of the element.
    pub(crate) end: usize,
}

/// A start tag together with its (possibly implicit) end tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Element {
    pub start_tag: TagId,
    /// `None` for single-tag elements and for a missing required end tag.
    pub end_tag: Option<TagId>,
    pub span: Span,
    content: Span,
}

impl Element {
    /// Text between the start and end tags; empty when there is no end tag.
    pub fn content(&self) -> Span {
        self.content
    }
}

enum Search {
    /// Look for `</name>`, resolving nested same-name elements first.
    Required {
        report_missing: bool,
        forbid_nesting: bool,
    },
    Optional(&'static OptionalEnd),
    /// Non-normal start type with a dedicated end type.
    Paired(TagType),
}

struct Frame {
    start: TagId,
    span: Span,
    name: String,
    tag_type: TagType,
    search: Search,
    cursor: usize,
}

enum Step {
    Finish(TagId),
    CloseAt { pos: usize, self_nested: bool },
    Descend(TagId),
    Skip(usize),
    RunOff,
}

impl Document {
    /// The element started by `start_tag`; `None` if `start_tag` is not a
    /// start tag of this document.
    pub fn element(&mut self, start_tag: TagId) -> Option<Element> {
        let memo = self.arena.get(start_tag)?.as_start()?.element;
        let bounds = match memo {
            Some(bounds) => bounds,
            None => self.resolve(start_tag)?,
        };
        self.element_from(start_tag, bounds)
    }

    /// The element whose start tag begins at `pos`.
    pub fn element_at(&mut self, pos: usize) -> Option<Element> {
        let id = self.tag_at(pos)?;
        self.arena.get(id)?.as_start()?;
        self.element(id)
    }

    /// The innermost element whose span contains `pos`.
    pub fn enclosing_element(&mut self, pos: usize) -> Option<Element> {
        let mut at = pos;
        loop {
            let id = self.tag_before(at, TagFilter::Any)?;
            let begin = self.tag_span(id)?.begin;
            if self.arena.get(id).is_some_and(|tag| tag.as_start().is_some()) {
                if let Some(element) = self.element(id) {
                    if element.span.contains(pos) {
                        return Some(element);
                    }
                }
            }
            at = begin.checked_sub(1)?;
        }
    }

    /// Every element with the given start tag name, in source order. Runs
    /// the full scan.
    pub fn all_elements(&mut self, name: &str) -> Vec<Element> {
        let filter = TagFilter::StartNamed(name);
        let starts: Vec<TagId> = self
            .all_tags()
            .into_iter()
            .filter(|id| self.arena.get(*id).is_some_and(|tag| filter.matches(tag)))
            .collect();
        starts
            .into_iter()
            .filter_map(|id| self.element(id))
            .collect()
    }

    /// The element terminated by `end_tag`.
    ///
    /// Unclaimed normal end tags are matched by resolving preceding start
    /// tags of the same name, nearest first.
    pub fn element_of_end_tag(&mut self, end_tag: TagId) -> Option<Element> {
        let end = self.arena.get(end_tag)?.as_end()?;
        if let Some(start) = end.element {
            return self.element(start);
        }
        if !end.tag_type.is_normal() {
            return None;
        }
        let name = end.name.clone();
        let mut before = end.span.begin;
        while let Some(at) = before.checked_sub(1) {
            let start = self.tag_before(at, TagFilter::StartNamed(&name))?;
            self.element(start);
            if let Some(owner) = self.claimed_by(end_tag) {
                return self.element(owner);
            }
            before = self.tag_span(start)?.begin;
        }
        None
    }

    fn claimed_by(&self, end_tag: TagId) -> Option<TagId> {
        self.arena.get(end_tag)?.as_end()?.element
    }

    fn element_from(&self, start_tag: TagId, bounds: ElementBounds) -> Option<Element> {
        let start = self.tag_span(start_tag)?;
        let content = match bounds.end_tag.and_then(|id| self.tag_span(id)) {
            Some(end) => Span::new(start.end, end.begin),
            None => Span::empty_at(start.end),
        };
        Some(Element {
            start_tag,
            end_tag: bounds.end_tag,
            span: Span::new(start.begin, bounds.end),
            content,
        })
    }

    fn resolve(&mut self, root: TagId) -> Option<ElementBounds> {
        let mut stack: Vec<Frame> = self.open(root).into_iter().collect();
        while let Some(top) = stack.len().checked_sub(1) {
            match self.step(&stack[top]) {
                Step::Skip(next) => stack[top].cursor = next,
                Step::Descend(child) => {
                    let known = self
                        .arena
                        .get(child)
                        .and_then(Tag::as_start)
                        .and_then(|tag| tag.element.map(|bounds| bounds.end.max(tag.span.end)));
                    match known {
                        Some(end) => stack[top].cursor = end,
                        None => stack.extend(self.open(child)),
                    }
                }
                Step::Finish(end_tag) => {
                    if let Some(frame) = stack.pop() {
                        let end = self.tag_span(end_tag).map_or(frame.span.end, |span| span.end);
                        self.finish(&frame, Some(end_tag), end);
                    }
                }
                Step::CloseAt { pos, self_nested } => {
                    if let Some(frame) = stack.pop() {
                        if self_nested {
                            self.report(
                                DiagnosticKind::ForbiddenSelfNesting,
                                pos,
                                format!(
                                    "<{}> may not contain another <{}>; closed implicitly",
                                    frame.name, frame.name
                                ),
                            );
                        }
                        let end_tag = self.implicit_end(&frame, pos);
                        self.finish(&frame, Some(end_tag), pos);
                    }
                }
                Step::RunOff => {
                    if let Some(frame) = stack.pop() {
                        self.run_off(&frame);
                    }
                }
            }
        }
        self.arena.get(root)?.as_start()?.element
    }

    /// Frame for `start`, or `None` after memoizing a single-tag element.
    fn open(&mut self, start: TagId) -> Option<Frame> {
        let tag = self.arena.get(start)?.as_start()?;
        let search = if tag.tag_type.is_normal() {
            match end_tag_policy(&tag.name) {
                EndTagPolicy::Forbidden => None,
                EndTagPolicy::Undefined if tag.self_closing => None,
                EndTagPolicy::Undefined => Some(Search::Required {
                    report_missing: false,
                    forbid_nesting: false,
                }),
                EndTagPolicy::Required => Some(Search::Required {
                    report_missing: true,
                    forbid_nesting: forbids_self_nesting(&tag.name),
                }),
                EndTagPolicy::Optional(policy) => Some(Search::Optional(policy)),
            }
        } else {
            tag.tag_type.corresponding_end_type().cloned().map(Search::Paired)
        };
        let span = tag.span;
        match search {
            Some(search) => Some(Frame {
                start,
                span,
                name: tag.name.clone(),
                tag_type: tag.tag_type.clone(),
                search,
                cursor: span.end,
            }),
            None => {
                self.memoize(start, ElementBounds { end_tag: None, end: span.end });
                None
            }
        }
    }

    fn step(&mut self, frame: &Frame) -> Step {
        let Some(id) = self.next_tag_from(frame.cursor) else {
            return Step::RunOff;
        };
        let Some(tag) = self.arena.get(id) else {
            return Step::RunOff;
        };
        let span = tag.span();
        let skip = Step::Skip(span.end.max(span.begin + 1));
        match &frame.search {
            Search::Paired(end_type) => {
                if tag.tag_type() == end_type {
                    Step::Finish(id)
                } else if tag.tag_type() == &frame.tag_type && tag.as_start().is_some() {
                    Step::Descend(id)
                } else {
                    skip
                }
            }
            Search::Required { forbid_nesting, .. } => {
                if tag.is_normal_end() && tag.name() == frame.name {
                    Step::Finish(id)
                } else if tag.is_normal_start() && tag.name() == frame.name {
                    if *forbid_nesting {
                        Step::CloseAt {
                            pos: span.begin,
                            self_nested: true,
                        }
                    } else {
                        Step::Descend(id)
                    }
                } else {
                    skip
                }
            }
            Search::Optional(policy) => {
                let name = tag.name();
                let close = Step::CloseAt {
                    pos: span.begin,
                    self_nested: false,
                };
                if tag.is_normal_end() {
                    if name == frame.name {
                        Step::Finish(id)
                    } else if policy.terminating_end.contains(name) {
                        close
                    } else {
                        skip
                    }
                } else if tag.is_normal_start() {
                    if policy.terminating_start.contains(name) {
                        close
                    } else if policy.nonterminating.contains(name) {
                        Step::Descend(id)
                    } else {
                        skip
                    }
                } else {
                    skip
                }
            }
        }
    }

    fn run_off(&mut self, frame: &Frame) {
        match &frame.search {
            Search::Optional(_) => {
                let end = self.len();
                let end_tag = self.implicit_end(frame, end);
                self.finish(frame, Some(end_tag), end);
            }
            Search::Required { report_missing, .. } => {
                if *report_missing {
                    self.report(
                        DiagnosticKind::MissingRequiredEndTag,
                        frame.span.begin,
                        format!("<{}> has no required end tag", frame.name),
                    );
                }
                self.finish(frame, None, frame.span.end);
            }
            Search::Paired(end_type) => {
                let message = format!("{} has no matching {}", frame.tag_type.name(), end_type.name());
                self.report(DiagnosticKind::MissingRequiredEndTag, frame.span.begin, message);
                self.finish(frame, None, frame.span.end);
            }
        }
    }

    /// Zero-length end tag standing for an implied closure at `pos`. It lives
    /// in the arena only; the position cache never returns it.
    fn implicit_end(&mut self, frame: &Frame, pos: usize) -> TagId {
        let tag_type = frame
            .tag_type
            .corresponding_end_type()
            .cloned()
            .unwrap_or_else(TagType::normal_end);
        self.arena.alloc(Tag::End(EndTag {
            span: Span::empty_at(pos),
            name: frame.name.clone(),
            tag_type,
            implicit: true,
            element: Some(frame.start),
        }))
    }

    fn finish(&mut self, frame: &Frame, end_tag: Option<TagId>, end: usize) {
        if let Some(end_tag) = end_tag {
            let previous = match self.arena.get_mut(end_tag) {
                Some(Tag::End(tag)) => tag.element.replace(frame.start),
                _ => None,
            };
            if previous.is_some_and(|previous| previous != frame.start) {
                let pos = self.tag_span(end_tag).map_or(end, |span| span.begin);
                self.report(
                    DiagnosticKind::EndTagTerminatesMultiple,
                    pos,
                    format!("</{}> terminates more than one element", frame.name),
                );
            }
        }
        log::trace!(
            target: "markup.elements",
            "<{}> at {} spans {}..{end}",
            frame.name,
            frame.span.begin,
            frame.span.begin
        );
        self.memoize(frame.start, ElementBounds { end_tag, end });
    }

    fn memoize(&mut self, start: TagId, bounds: ElementBounds) {
        let duplicate = match self.arena.get_mut(start) {
            Some(Tag::Start(tag)) if tag.element.is_some() => true,
            Some(Tag::Start(tag)) => {
                tag.element = Some(bounds);
                false
            }
            _ => false,
        };
        if duplicate {
            let pos = self.tag_span(start).map_or(0, |span| span.begin);
            self.report(
                DiagnosticKind::DuplicateResolution,
                pos,
                "element resolved twice; keeping the first result".to_string(),
            );
        }
    }
}
