//! Tag types: the syntaxes the recognizer can try at a `<`.
//!
//! Built-in syntaxes form a closed set dispatched by `Builtin`; anything else
//! plugs in through `CustomSyntax` (or the default delimited construction).
//! A `TagType` is a cheap handle whose identity is pointer identity, so two
//! types with identical delimiters are still distinct.

mod builtin;
mod registry;

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::chars::find_from;

pub(crate) use builtin::construct_builtin;
pub use registry::{RegistryError, TagTypeRegistry};

/// Whether a tag type produces start tags or end tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
    Start,
    End,
}

/// Static description of a tag syntax.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagTypeDescriptor {
    pub name: Cow<'static, str>,
    pub start_delimiter: Cow<'static, str>,
    pub closing_delimiter: Cow<'static, str>,
    pub is_server_tag: bool,
    /// Name reported by tags of this type unless the syntax reads its own
    /// (normal tags use the element name).
    pub name_prefix: Cow<'static, str>,
    pub kind: TagKind,
    pub has_attributes: bool,
}

impl TagTypeDescriptor {
    /// Descriptor for an opaque start-like construct.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        start_delimiter: impl Into<Cow<'static, str>>,
        closing_delimiter: impl Into<Cow<'static, str>>,
    ) -> Self {
        let start_delimiter = start_delimiter.into();
        let name_prefix = Cow::Owned(
            start_delimiter
                .strip_prefix('<')
                .unwrap_or(&start_delimiter)
                .to_ascii_lowercase(),
        );
        Self {
            name: name.into(),
            start_delimiter,
            closing_delimiter: closing_delimiter.into(),
            is_server_tag: false,
            name_prefix,
            kind: TagKind::Start,
            has_attributes: false,
        }
    }

    pub fn server(mut self) -> Self {
        self.is_server_tag = true;
        self
    }

    pub fn end(mut self) -> Self {
        self.kind = TagKind::End;
        self
    }
}

/// "No closing delimiter before the end of the buffer."
///
/// Returned by speculative construction; the recognizer treats it as a
/// rejection of that one type at that one position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("no closing delimiter before end of buffer")]
pub struct Incomplete;

/// Read-only view handed to custom syntaxes.
pub struct ConstructContext<'a> {
    pub(crate) source: &'a str,
    pub(crate) parse_text: &'a [u8],
}

impl<'a> ConstructContext<'a> {
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Position of `delimiter` (matched ASCII case-insensitively) at or after
    /// `from`, ignoring any spans excluded from parsing.
    pub fn find(&self, from: usize, delimiter: &str) -> Option<usize> {
        find_from(self.parse_text, from, delimiter.to_ascii_lowercase().as_bytes())
    }
}

/// Successful construction by a custom syntax.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Construction {
    /// Exclusive end of the tag.
    pub end: usize,
    /// Tag name; defaults to the descriptor's name prefix.
    pub name: Option<String>,
}

/// Extension point for tag syntaxes the engine does not know.
pub trait CustomSyntax: Send + Sync {
    /// Try to build a tag of `tag_type` beginning at `pos`, where the start
    /// delimiter is already known to match.
    fn construct(
        &self,
        ctx: &ConstructContext<'_>,
        tag_type: &TagType,
        pos: usize,
    ) -> Result<Option<Construction>, Incomplete>;

    /// Extra position filter applied on top of the engine's validity rules.
    fn accepts_position(&self, _ctx: &ConstructContext<'_>, _pos: usize) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Builtin {
    NormalStart,
    NormalEnd,
    Comment,
    CdataSection,
    DocumentType,
    MarkupDeclaration,
    XmlDeclaration,
    ProcessingInstruction,
    ServerComment,
    ServerCommon,
    Php,
    UnregisteredStart,
    UnregisteredEnd,
}

pub(crate) enum Syntax {
    Builtin(Builtin),
    /// Opaque: ends at the first closing delimiter.
    Delimited,
    Custom(Arc<dyn CustomSyntax>),
}

struct Inner {
    descriptor: TagTypeDescriptor,
    start_lower: Box<[u8]>,
    closing_lower: Box<[u8]>,
    syntax: Syntax,
    corresponding_end: Option<TagType>,
}

#[derive(Clone)]
pub struct TagType(Arc<Inner>);

impl TagType {
    fn build(
        descriptor: TagTypeDescriptor,
        syntax: Syntax,
        corresponding_end: Option<TagType>,
    ) -> Self {
        let start_lower = descriptor.start_delimiter.to_ascii_lowercase().into_bytes();
        let closing_lower = descriptor.closing_delimiter.to_ascii_lowercase().into_bytes();
        TagType(Arc::new(Inner {
            start_lower: start_lower.into_boxed_slice(),
            closing_lower: closing_lower.into_boxed_slice(),
            descriptor,
            syntax,
            corresponding_end,
        }))
    }

    /// User-defined type that ends at its closing delimiter.
    pub fn delimited(descriptor: TagTypeDescriptor) -> Self {
        Self::build(descriptor, Syntax::Delimited, None)
    }

    /// User-defined start/end pair; elements of `start` end at the next tag of `end`.
    pub fn delimited_pair(start: TagTypeDescriptor, end: TagTypeDescriptor) -> (Self, Self) {
        let end = Self::build(end.end(), Syntax::Delimited, None);
        let start = Self::build(start, Syntax::Delimited, Some(end.clone()));
        (start, end)
    }

    pub fn custom(descriptor: TagTypeDescriptor, syntax: Arc<dyn CustomSyntax>) -> Self {
        Self::build(descriptor, Syntax::Custom(syntax), None)
    }

    pub fn descriptor(&self) -> &TagTypeDescriptor {
        &self.0.descriptor
    }

    pub fn name(&self) -> &str {
        &self.0.descriptor.name
    }

    pub fn start_delimiter(&self) -> &str {
        &self.0.descriptor.start_delimiter
    }

    pub fn closing_delimiter(&self) -> &str {
        &self.0.descriptor.closing_delimiter
    }

    pub fn is_server_tag(&self) -> bool {
        self.0.descriptor.is_server_tag
    }

    pub fn kind(&self) -> TagKind {
        self.0.descriptor.kind
    }

    pub fn corresponding_end_type(&self) -> Option<&TagType> {
        self.0.corresponding_end.as_ref()
    }

    /// True for the generic `<name ...>` start and `</name>` end types.
    pub fn is_normal(&self) -> bool {
        matches!(
            self.builtin(),
            Some(Builtin::NormalStart | Builtin::NormalEnd)
        )
    }

    pub fn is_unregistered(&self) -> bool {
        matches!(
            self.builtin(),
            Some(Builtin::UnregisteredStart | Builtin::UnregisteredEnd)
        )
    }

    pub(crate) fn builtin(&self) -> Option<Builtin> {
        match self.0.syntax {
            Syntax::Builtin(builtin) => Some(builtin),
            _ => None,
        }
    }

    pub(crate) fn syntax(&self) -> &Syntax {
        &self.0.syntax
    }

    pub(crate) fn start_lower(&self) -> &[u8] {
        &self.0.start_lower
    }

    pub(crate) fn closing_lower(&self) -> &[u8] {
        &self.0.closing_lower
    }

    pub(crate) fn matches_at(&self, parse_text: &[u8], pos: usize) -> bool {
        parse_text
            .get(pos..)
            .is_some_and(|rest| rest.starts_with(self.start_lower()))
    }
}

impl PartialEq for TagType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TagType {}

impl fmt::Debug for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TagType").field(&self.name()).finish()
    }
}

struct Builtins {
    normal_start: TagType,
    normal_end: TagType,
    comment: TagType,
    cdata_section: TagType,
    document_type: TagType,
    markup_element: TagType,
    markup_attlist: TagType,
    markup_entity: TagType,
    markup_notation: TagType,
    xml_declaration: TagType,
    processing_instruction: TagType,
    server_comment: TagType,
    server_common: TagType,
    php: TagType,
    unregistered_start: TagType,
    unregistered_end: TagType,
}

fn builtin(
    builtin: Builtin,
    name: &'static str,
    start: &'static str,
    closing: &'static str,
    name_prefix: &'static str,
) -> TagTypeDescriptor {
    let kind = match builtin {
        Builtin::NormalEnd | Builtin::UnregisteredEnd => TagKind::End,
        _ => TagKind::Start,
    };
    TagTypeDescriptor {
        name: Cow::Borrowed(name),
        start_delimiter: Cow::Borrowed(start),
        closing_delimiter: Cow::Borrowed(closing),
        is_server_tag: matches!(
            builtin,
            Builtin::ServerComment | Builtin::ServerCommon | Builtin::Php
        ),
        name_prefix: Cow::Borrowed(name_prefix),
        kind,
        has_attributes: builtin == Builtin::NormalStart,
    }
}

static BUILTINS: LazyLock<Builtins> = LazyLock::new(|| {
    let make = |b: Builtin, name, start, closing, prefix| {
        TagType::build(builtin(b, name, start, closing, prefix), Syntax::Builtin(b), None)
    };
    let normal_end = make(Builtin::NormalEnd, "normal end tag", "</", ">", "");
    let normal_start = TagType::build(
        builtin(Builtin::NormalStart, "normal start tag", "<", ">", ""),
        Syntax::Builtin(Builtin::NormalStart),
        Some(normal_end.clone()),
    );
    Builtins {
        normal_start,
        normal_end,
        comment: make(Builtin::Comment, "comment", "<!--", "-->", "!--"),
        cdata_section: make(
            Builtin::CdataSection,
            "CDATA section",
            "<![CDATA[",
            "]]>",
            "![cdata[",
        ),
        document_type: make(
            Builtin::DocumentType,
            "document type declaration",
            "<!DOCTYPE",
            ">",
            "!doctype",
        ),
        markup_element: make(
            Builtin::MarkupDeclaration,
            "element declaration",
            "<!ELEMENT",
            ">",
            "!element",
        ),
        markup_attlist: make(
            Builtin::MarkupDeclaration,
            "attribute list declaration",
            "<!ATTLIST",
            ">",
            "!attlist",
        ),
        markup_entity: make(
            Builtin::MarkupDeclaration,
            "entity declaration",
            "<!ENTITY",
            ">",
            "!entity",
        ),
        markup_notation: make(
            Builtin::MarkupDeclaration,
            "notation declaration",
            "<!NOTATION",
            ">",
            "!notation",
        ),
        xml_declaration: make(
            Builtin::XmlDeclaration,
            "XML declaration",
            "<?xml",
            "?>",
            "?xml",
        ),
        processing_instruction: make(
            Builtin::ProcessingInstruction,
            "XML processing instruction",
            "<?",
            "?>",
            "?",
        ),
        server_comment: make(
            Builtin::ServerComment,
            "server comment",
            "<%--",
            "--%>",
            "%--",
        ),
        server_common: make(
            Builtin::ServerCommon,
            "common server tag",
            "<%",
            "%>",
            "%",
        ),
        php: make(Builtin::Php, "PHP tag", "<?php", "?>", "?php"),
        unregistered_start: make(
            Builtin::UnregisteredStart,
            "unregistered start tag",
            "<",
            ">",
            "",
        ),
        unregistered_end: make(
            Builtin::UnregisteredEnd,
            "unregistered end tag",
            "</",
            ">",
            "",
        ),
    }
});

impl TagType {
    pub fn normal_start() -> Self {
        BUILTINS.normal_start.clone()
    }

    pub fn normal_end() -> Self {
        BUILTINS.normal_end.clone()
    }

    pub fn comment() -> Self {
        BUILTINS.comment.clone()
    }

    pub fn cdata_section() -> Self {
        BUILTINS.cdata_section.clone()
    }

    pub fn document_type() -> Self {
        BUILTINS.document_type.clone()
    }

    pub fn element_declaration() -> Self {
        BUILTINS.markup_element.clone()
    }

    pub fn attlist_declaration() -> Self {
        BUILTINS.markup_attlist.clone()
    }

    pub fn entity_declaration() -> Self {
        BUILTINS.markup_entity.clone()
    }

    pub fn notation_declaration() -> Self {
        BUILTINS.markup_notation.clone()
    }

    pub fn xml_declaration() -> Self {
        BUILTINS.xml_declaration.clone()
    }

    pub fn processing_instruction() -> Self {
        BUILTINS.processing_instruction.clone()
    }

    pub fn server_comment() -> Self {
        BUILTINS.server_comment.clone()
    }

    pub fn server_common() -> Self {
        BUILTINS.server_common.clone()
    }

    /// `<?php ... ?>`; not registered by default.
    pub fn php() -> Self {
        BUILTINS.php.clone()
    }

    pub fn unregistered_start() -> Self {
        BUILTINS.unregistered_start.clone()
    }

    pub fn unregistered_end() -> Self {
        BUILTINS.unregistered_end.clone()
    }

    /// Built-in types registered in a default registry, in registration order.
    pub(crate) fn default_registered() -> Vec<TagType> {
        vec![
            Self::normal_start(),
            Self::normal_end(),
            Self::comment(),
            Self::cdata_section(),
            Self::document_type(),
            Self::element_declaration(),
            Self::attlist_declaration(),
            Self::entity_declaration(),
            Self::notation_declaration(),
            Self::xml_declaration(),
            Self::processing_instruction(),
            Self::server_comment(),
            Self::server_common(),
        ]
    }

    pub(crate) fn sentinel_for(parse_text: &[u8], pos: usize) -> &'static TagType {
        if parse_text.get(pos..).is_some_and(|rest| rest.starts_with(b"</")) {
            &BUILTINS.unregistered_end
        } else {
            &BUILTINS.unregistered_start
        }
    }
}
