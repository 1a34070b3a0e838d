//! Recognized tags and the per-document arena that owns them.

use crate::attributes::AttributeList;
use crate::element::ElementBounds;
use crate::span::Span;
use crate::tag_type::{TagKind, TagType};

/// Handle to a tag owned by a `Document`.
///
/// Handles stay valid for the lifetime of the document, including across
/// cache clears (the arena only grows).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(u32);

impl TagId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub struct StartTag {
    pub span: Span,
    /// Lower-cased name; the original case stays in the source text.
    pub name: String,
    pub tag_type: TagType,
    pub attributes: Option<AttributeList>,
    /// The tag ended with `/>`.
    pub self_closing: bool,
    pub(crate) element: Option<ElementBounds>,
}

#[derive(Clone, Debug)]
pub struct EndTag {
    pub span: Span,
    pub name: String,
    pub tag_type: TagType,
    /// Zero-length end tag standing for an implied closure; it has no text.
    pub implicit: bool,
    pub(crate) element: Option<TagId>,
}

#[derive(Clone, Debug)]
pub enum Tag {
    Start(StartTag),
    End(EndTag),
}

impl Tag {
    pub fn span(&self) -> Span {
        match self {
            Tag::Start(tag) => tag.span,
            Tag::End(tag) => tag.span,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Start(tag) => &tag.name,
            Tag::End(tag) => &tag.name,
        }
    }

    pub fn tag_type(&self) -> &TagType {
        match self {
            Tag::Start(tag) => &tag.tag_type,
            Tag::End(tag) => &tag.tag_type,
        }
    }

    pub fn is_server_tag(&self) -> bool {
        self.tag_type().is_server_tag()
    }

    pub fn as_start(&self) -> Option<&StartTag> {
        match self {
            Tag::Start(tag) => Some(tag),
            Tag::End(_) => None,
        }
    }

    pub fn as_end(&self) -> Option<&EndTag> {
        match self {
            Tag::End(tag) => Some(tag),
            Tag::Start(_) => None,
        }
    }

    /// Start tag of the generic `<name ...>` type.
    pub(crate) fn is_normal_start(&self) -> bool {
        matches!(self, Tag::Start(tag) if tag.tag_type.is_normal())
    }

    pub(crate) fn is_normal_end(&self) -> bool {
        matches!(self, Tag::End(tag) if tag.tag_type.is_normal())
    }

    /// Build a tag of `tag_type`'s kind.
    pub(crate) fn opaque(tag_type: &TagType, span: Span, name: String) -> Tag {
        match tag_type.kind() {
            TagKind::Start => Tag::Start(StartTag {
                span,
                name,
                tag_type: tag_type.clone(),
                attributes: None,
                self_closing: false,
                element: None,
            }),
            TagKind::End => Tag::End(EndTag {
                span,
                name,
                tag_type: tag_type.clone(),
                implicit: false,
                element: None,
            }),
        }
    }
}

/// Which tags a positional query should stop at.
#[derive(Clone, Copy, Debug)]
pub enum TagFilter<'a> {
    Any,
    OfType(&'a TagType),
    /// Start or end tags with this name (ASCII case-insensitive).
    Named(&'a str),
    StartNamed(&'a str),
    EndNamed(&'a str),
}

impl TagFilter<'_> {
    pub fn matches(&self, tag: &Tag) -> bool {
        match *self {
            TagFilter::Any => true,
            TagFilter::OfType(tag_type) => tag.tag_type() == tag_type,
            TagFilter::Named(name) => tag.name().eq_ignore_ascii_case(name),
            TagFilter::StartNamed(name) => {
                matches!(tag, Tag::Start(_)) && tag.name().eq_ignore_ascii_case(name)
            }
            TagFilter::EndNamed(name) => {
                matches!(tag, Tag::End(_)) && tag.name().eq_ignore_ascii_case(name)
            }
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TagArena {
    tags: Vec<Tag>,
}

impl TagArena {
    pub(crate) fn alloc(&mut self, tag: Tag) -> TagId {
        let id = TagId(u32::try_from(self.tags.len()).unwrap_or(u32::MAX));
        self.tags.push(tag);
        id
    }

    pub(crate) fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: TagId) -> Option<&mut Tag> {
        self.tags.get_mut(id.index())
    }

    pub(crate) fn len(&self) -> usize {
        self.tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(name: &str, begin: usize, end: usize) -> Tag {
        Tag::opaque(&TagType::normal_start(), Span::new(begin, end), name.to_string())
    }

    #[test]
    fn opaque_follows_type_kind() {
        let end = Tag::opaque(&TagType::normal_end(), Span::new(0, 4), "p".into());
        assert!(end.as_end().is_some());
        assert!(end.is_normal_end());
        let comment = Tag::opaque(&TagType::comment(), Span::new(0, 7), "!--".into());
        assert!(comment.as_start().is_some());
        assert!(!comment.is_normal_start());
    }

    #[test]
    fn filters() {
        let div = start("div", 0, 5);
        assert!(TagFilter::Any.matches(&div));
        assert!(TagFilter::Named("DIV").matches(&div));
        assert!(TagFilter::StartNamed("div").matches(&div));
        assert!(!TagFilter::EndNamed("div").matches(&div));
        assert!(TagFilter::OfType(&TagType::normal_start()).matches(&div));
        assert!(!TagFilter::OfType(&TagType::comment()).matches(&div));
    }

    #[test]
    fn arena_handles_are_sequential() {
        let mut arena = TagArena::default();
        let a = arena.alloc(start("a", 0, 3));
        let b = arena.alloc(start("b", 3, 6));
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(arena.get(b).map(Tag::name), Some("b"));
        assert_eq!(arena.len(), 2);
    }
}
