//! Diagnostics produced while recognizing markup.
//!
//! Nothing in the engine fails on malformed input; instead every deviation is
//! reported here, retained on the document and forwarded to the `log` facade.

use tools::RowColumn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Syntax deviation that never affects acceptance.
    IgnorableSyntax,
    /// Counted syntax deviation; too many of them reject the construct.
    MinorSyntax,
    /// Syntax deviation that rejects the enclosing construct immediately.
    MajorSyntax,
    /// The minor error count exceeded the configured maximum.
    TooManyErrors,
    /// The end of the buffer was reached before the closing delimiter.
    NoClosingDelimiter,
    MissingRequiredEndTag,
    /// An end tag was associated with more than one element.
    EndTagTerminatesMultiple,
    /// A start tag of a name that may not nest was found inside itself.
    ForbiddenSelfNesting,
    /// An element was resolved a second time for the same start tag.
    DuplicateResolution,
    /// An exhaustive scan replaced an already populated cache.
    DiscardedCache,
    /// Markup-suppression enclosure checks nested deeper than allowed.
    EnclosureDepthExceeded,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::IgnorableSyntax
            | DiagnosticKind::MinorSyntax
            | DiagnosticKind::MajorSyntax
            | DiagnosticKind::TooManyErrors
            | DiagnosticKind::NoClosingDelimiter
            | DiagnosticKind::DuplicateResolution => Severity::Info,
            DiagnosticKind::MissingRequiredEndTag
            | DiagnosticKind::EndTagTerminatesMultiple
            | DiagnosticKind::ForbiddenSelfNesting
            | DiagnosticKind::DiscardedCache
            | DiagnosticKind::EnclosureDepthExceeded => Severity::Warn,
        }
    }

    pub(crate) fn log_target(self) -> &'static str {
        match self {
            DiagnosticKind::IgnorableSyntax
            | DiagnosticKind::MinorSyntax
            | DiagnosticKind::MajorSyntax
            | DiagnosticKind::TooManyErrors => "markup.attributes",
            DiagnosticKind::NoClosingDelimiter | DiagnosticKind::EnclosureDepthExceeded => {
                "markup.tags"
            }
            DiagnosticKind::MissingRequiredEndTag
            | DiagnosticKind::EndTagTerminatesMultiple
            | DiagnosticKind::ForbiddenSelfNesting
            | DiagnosticKind::DuplicateResolution => "markup.elements",
            DiagnosticKind::DiscardedCache => "markup.cache",
        }
    }
}

/// A single diagnostic with its source position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: usize,
    pub location: RowColumn,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub(crate) fn emit(&self) {
        let target = self.kind.log_target();
        match self.severity() {
            Severity::Info => log::info!(target: target, "{} {}", self.location, self.message),
            Severity::Warn => log::warn!(target: target, "{} {}", self.location, self.message),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.location, self.message)
    }
}
