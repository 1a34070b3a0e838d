pub mod char_ref;
pub mod perf_fixtures;

mod attributes;
mod cache;
mod chars;
mod config;
mod diagnostics;
mod document;
mod element;
mod html_policy;
#[cfg(all(test, feature = "perf-tests"))]
mod perf_guards;
mod recognize;
mod scan;
mod span;
mod tag;
mod tag_type;

pub use crate::attributes::{Attribute, AttributeList};
pub use crate::char_ref::{CharacterReference, ReferenceKind, decode, decode_attribute_value, encode};
pub use crate::config::{
    CompatibilityProfile, DEFAULT_MAX_ATTRIBUTE_ERRORS, DEFAULT_MAX_ENCLOSURE_DEPTH,
    ParserConfig, ProfileParseError, Threshold, UnterminatedSettings,
};
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use crate::document::Document;
pub use crate::element::Element;
pub use crate::scan::{Node, NodeKind};
pub use crate::span::Span;
pub use crate::tag::{EndTag, StartTag, Tag, TagFilter, TagId};
pub use crate::tag_type::{
    ConstructContext, Construction, CustomSyntax, Incomplete, RegistryError, TagKind, TagType,
    TagTypeDescriptor, TagTypeRegistry,
};
pub use tools::RowColumn;
