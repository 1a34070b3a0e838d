//! Attribute list parsing.
//!
//! A character-driven state machine that tolerates real-world syntax errors.
//! Deviations are graded: *ignorable* ones are only logged, *minor* ones are
//! counted and reject the list once the count exceeds the allowed maximum,
//! *major* ones (a stray `<`) reject it immediately.

use crate::chars::{char_at, is_name_char, is_name_start, is_whitespace};
use crate::diagnostics::DiagnosticKind;
use crate::document::Document;
use crate::html_policy::end_tag_policy;
use crate::span::Span;
use crate::tag_type::Incomplete;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// From the first character of the name to the end of the value
    /// (closing quote included).
    pub span: Span,
    /// Name as written.
    pub name: String,
    /// Lower-cased name.
    pub key: String,
    /// `None` when the attribute has no `=`; an empty span when `=` is not
    /// followed by a value.
    pub value_span: Option<Span>,
    pub value_span_with_quotes: Option<Span>,
    pub quote: Option<char>,
}

impl Attribute {
    pub fn has_value(&self) -> bool {
        self.value_span.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeList {
    /// From the first non-whitespace character after the tag name to the end
    /// of the last attribute.
    pub span: Span,
    pub attributes: Vec<Attribute>,
    /// A server tag appeared between attributes rather than inside a value.
    pub server_tag_outside_value: bool,
}

impl AttributeList {
    /// First attribute with the given key (ASCII case-insensitive).
    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.key.eq_ignore_ascii_case(key))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

/// Successful parse of an attribute list inside a start tag.
#[derive(Debug)]
pub(crate) struct ParsedAttributes {
    pub list: AttributeList,
    /// Position of the terminating `>` (or the maximum end).
    pub terminator: usize,
    pub self_closing: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    AfterTagName,
    BetweenAttributes,
    InName,
    AfterName,
    StartValue,
    InValue,
    AfterValueFinalQuote,
}

enum Stop {
    Rejected,
    Incomplete,
}

struct AttributeParser<'d, 'n> {
    doc: &'d mut Document,
    element: Option<&'n str>,
    max_end: Option<usize>,
    max_errors: usize,
    errors: usize,
    missing_whitespace_seen: bool,
    state: State,
    attributes: Vec<Attribute>,
    list_begin: Option<usize>,
    server_tag_outside_value: bool,
    self_closing: bool,
    name_begin: usize,
    name_end: usize,
    open_quote: usize,
    value_begin: usize,
    quote: Option<char>,
}

impl<'d, 'n> AttributeParser<'d, 'n> {
    fn context(&self) -> String {
        match self.element {
            Some(name) => format!("<{name}>"),
            None => "attribute list".to_string(),
        }
    }

    fn ignorable(&mut self, pos: usize, message: String) {
        self.doc
            .report(DiagnosticKind::IgnorableSyntax, pos, format!("{message} in {}", self.context()));
    }

    fn minor(&mut self, pos: usize, message: String) -> Result<(), Stop> {
        self.errors += 1;
        let context = self.context();
        self.doc
            .report(DiagnosticKind::MinorSyntax, pos, format!("{message} in {context}"));
        if self.errors > self.max_errors {
            self.doc.report(
                DiagnosticKind::TooManyErrors,
                pos,
                format!("{context} rejected: too many errors ({})", self.errors),
            );
            return Err(Stop::Rejected);
        }
        Ok(())
    }

    fn major(&mut self, pos: usize, message: String) -> Stop {
        let context = self.context();
        self.doc.report(
            DiagnosticKind::MajorSyntax,
            pos,
            format!("{message} in {context}; rejected"),
        );
        Stop::Rejected
    }

    fn begin_content(&mut self, pos: usize) {
        self.list_begin.get_or_insert(pos);
    }

    fn push(&mut self, value: Option<(Span, Span, Option<char>)>) {
        let name_span = Span::new(self.name_begin, self.name_end);
        let name = name_span.slice(self.doc.source()).unwrap_or_default().to_string();
        let end = value.map_or(self.name_end, |(_, with_quotes, _)| with_quotes.end);
        self.attributes.push(Attribute {
            span: Span::new(self.name_begin, end),
            key: name.to_ascii_lowercase(),
            name,
            value_span: value.map(|(value, _, _)| value),
            value_span_with_quotes: value.map(|(_, with_quotes, _)| with_quotes),
            quote: value.and_then(|(_, _, quote)| quote),
        });
    }

    fn push_without_value(&mut self) {
        self.push(None);
    }

    fn push_value(&mut self, end: usize) {
        let value = Span::new(self.value_begin, end);
        let with_quotes = match self.quote {
            Some(quote) if self.doc.source()[end..].starts_with(quote) => {
                Span::new(self.open_quote, end + quote.len_utf8())
            }
            Some(_) => Span::new(self.open_quote, end),
            None => value,
        };
        self.push(Some((value, with_quotes, self.quote)));
    }

    fn push_missing_value(&mut self, pos: usize) -> Result<(), Stop> {
        let message = format!("missing value for attribute `{}`", self.pending_name());
        if self.errors == 0 {
            self.ignorable(pos, message);
        } else {
            self.minor(pos, message)?;
        }
        let empty = Span::empty_at(pos);
        self.push(Some((empty, empty, None)));
        Ok(())
    }

    fn pending_name(&self) -> &str {
        self.doc
            .source()
            .get(self.name_begin..self.name_end)
            .unwrap_or_default()
    }

    fn slash_before_terminator(&self, c: char, next: usize) -> bool {
        c == '/'
            && (self.max_end == Some(next) || self.doc.parse_text.as_bytes().get(next) == Some(&b'>'))
    }

    fn self_closing_slash(&mut self, pos: usize) {
        self.self_closing = true;
        if let Some(name) = self.element {
            if end_tag_policy(name).ignores_self_closing_syntax() {
                self.ignorable(pos, "self-closing syntax `/>` ignored".to_string());
            }
        }
    }

    fn run(mut self, start: usize) -> Result<ParsedAttributes, Stop> {
        let mut pos = start;
        let terminator = loop {
            if self.max_end.is_some_and(|max_end| pos >= max_end) {
                break pos;
            }
            let in_quoted_value = self.state == State::InValue && self.quote.is_some();
            let Some(c) = char_at(&self.doc.parse_text, pos) else {
                return Err(Stop::Incomplete);
            };
            if c == '>' && !in_quoted_value {
                break pos;
            }
            if c == '<' {
                if let Some(end) = self.doc.server_tag_end(pos) {
                    self.server_tag(pos);
                    pos = end;
                    continue;
                }
                if !in_quoted_value {
                    return Err(self.major(pos, "`<` not allowed here".to_string()));
                }
            }
            let next = pos + c.len_utf8();
            self.step(c, pos, next)?;
            pos = next;
        };
        self.finish(terminator)?;

        let list_begin = self.list_begin.unwrap_or(terminator);
        let list_end = self
            .attributes
            .last()
            .map_or(list_begin, |attribute| attribute.span.end.max(list_begin));
        Ok(ParsedAttributes {
            list: AttributeList {
                span: Span::new(list_begin, list_end),
                attributes: self.attributes,
                server_tag_outside_value: self.server_tag_outside_value,
            },
            terminator,
            self_closing: self.self_closing,
        })
    }

    /// Server tags are filler: part of a name or value they interrupt,
    /// otherwise skipped and flagged.
    fn server_tag(&mut self, pos: usize) {
        match self.state {
            State::InName | State::InValue => {}
            State::StartValue => {
                self.value_begin = pos;
                self.quote = None;
                self.state = State::InValue;
            }
            State::AfterTagName | State::AfterValueFinalQuote => {
                self.begin_content(pos);
                self.server_tag_outside_value = true;
                self.state = State::BetweenAttributes;
            }
            State::BetweenAttributes | State::AfterName => {
                self.begin_content(pos);
                self.server_tag_outside_value = true;
            }
        }
    }

    fn step(&mut self, c: char, pos: usize, next: usize) -> Result<(), Stop> {
        match self.state {
            State::AfterTagName | State::BetweenAttributes => {
                if is_whitespace(c) {
                    self.state = State::BetweenAttributes;
                } else if self.slash_before_terminator(c, next) {
                    self.self_closing_slash(pos);
                } else if is_name_start(c) {
                    self.begin_content(pos);
                    self.name_begin = pos;
                    self.state = State::InName;
                } else {
                    self.begin_content(pos);
                    self.state = State::BetweenAttributes;
                    self.minor(pos, format!("invalid character `{c}` before attribute name"))?;
                }
            }
            State::InName => {
                if is_name_char(c) {
                    return Ok(());
                }
                self.name_end = pos;
                if is_whitespace(c) {
                    self.state = State::AfterName;
                } else if c == '=' {
                    self.state = State::StartValue;
                } else if self.slash_before_terminator(c, next) {
                    self.push_without_value();
                    self.state = State::BetweenAttributes;
                    self.self_closing_slash(pos);
                } else {
                    self.state = State::AfterName;
                    self.minor(pos, format!("invalid character `{c}` in attribute name"))?;
                }
            }
            State::AfterName => {
                if is_whitespace(c) {
                    return Ok(());
                }
                if c == '=' {
                    self.state = State::StartValue;
                    return Ok(());
                }
                self.push_without_value();
                if self.slash_before_terminator(c, next) {
                    self.state = State::BetweenAttributes;
                    self.self_closing_slash(pos);
                } else if is_name_start(c) {
                    self.name_begin = pos;
                    self.state = State::InName;
                } else {
                    self.state = State::BetweenAttributes;
                    self.minor(pos, format!("invalid character `{c}` after attribute name"))?;
                }
            }
            State::StartValue => {
                if is_whitespace(c) {
                    return Ok(());
                }
                if c == '"' || c == '\'' {
                    self.quote = Some(c);
                    self.open_quote = pos;
                    self.value_begin = next;
                    self.state = State::InValue;
                } else if self.slash_before_terminator(c, next) {
                    self.push_missing_value(pos)?;
                    self.state = State::BetweenAttributes;
                    self.self_closing_slash(pos);
                } else {
                    self.quote = None;
                    self.value_begin = pos;
                    self.state = State::InValue;
                }
            }
            State::InValue => match self.quote {
                Some(quote) => {
                    if c == quote {
                        self.push_value(pos);
                        self.state = State::AfterValueFinalQuote;
                    }
                }
                None => {
                    if is_whitespace(c) {
                        self.push_value(pos);
                        self.state = State::BetweenAttributes;
                    } else if c == '"' || c == '\'' {
                        self.minor(pos, format!("quote `{c}` inside unquoted attribute value"))?;
                    }
                }
            },
            State::AfterValueFinalQuote => {
                if is_whitespace(c) {
                    self.state = State::BetweenAttributes;
                } else if self.slash_before_terminator(c, next) {
                    self.state = State::BetweenAttributes;
                    self.self_closing_slash(pos);
                } else if is_name_start(c) {
                    let message = "missing whitespace after quoted attribute value".to_string();
                    if self.missing_whitespace_seen {
                        self.minor(pos, message)?;
                    } else {
                        self.missing_whitespace_seen = true;
                        self.ignorable(pos, message);
                    }
                    self.name_begin = pos;
                    self.state = State::InName;
                } else {
                    self.state = State::BetweenAttributes;
                    self.minor(pos, format!("invalid character `{c}` after attribute value"))?;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self, terminator: usize) -> Result<(), Stop> {
        match self.state {
            State::InName => {
                self.name_end = terminator;
                self.push_without_value();
            }
            State::AfterName => self.push_without_value(),
            State::StartValue => self.push_missing_value(terminator)?,
            State::InValue => {
                if self.quote.is_some() {
                    self.minor(terminator, "quoted attribute value is never closed".to_string())?;
                }
                self.push_value(terminator);
            }
            State::AfterTagName | State::BetweenAttributes | State::AfterValueFinalQuote => {}
        }
        Ok(())
    }
}

impl Document {
    /// Parse the attribute list of a start tag named `element`, beginning
    /// right after the tag name.
    pub(crate) fn parse_attribute_list(
        &mut self,
        start: usize,
        max_end: Option<usize>,
        max_errors: usize,
        element: Option<&str>,
    ) -> Result<Option<ParsedAttributes>, Incomplete> {
        let parser = AttributeParser {
            doc: self,
            element,
            max_end,
            max_errors,
            errors: 0,
            missing_whitespace_seen: false,
            state: State::AfterTagName,
            attributes: Vec::new(),
            list_begin: None,
            server_tag_outside_value: false,
            self_closing: false,
            name_begin: start,
            name_end: start,
            open_quote: start,
            value_begin: start,
            quote: None,
        };
        match parser.run(start) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(Stop::Rejected) => Ok(None),
            Err(Stop::Incomplete) => Err(Incomplete),
        }
    }

    /// Parse an attribute list starting at `pos`, terminated by `>` or by
    /// `max_end`.
    ///
    /// Returns `None` when the list is rejected (a major error, more than
    /// `max_errors` minor errors, or no terminator before the end of the
    /// text).
    pub fn parse_attributes(
        &mut self,
        pos: usize,
        max_end: Option<usize>,
        max_errors: usize,
    ) -> Option<AttributeList> {
        match self.parse_attribute_list(pos, max_end, max_errors, None) {
            Ok(parsed) => parsed.map(|parsed| parsed.list),
            Err(Incomplete) => {
                self.report(
                    DiagnosticKind::NoClosingDelimiter,
                    pos,
                    "attribute list has no closing `>`".to_string(),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;

    fn parse(source: &str, max_errors: usize) -> (Option<AttributeList>, Document) {
        let mut doc = Document::with_config(source, ParserConfig::default());
        let list = doc.parse_attributes(0, None, max_errors);
        (list, doc)
    }

    fn values(doc: &Document, list: &AttributeList) -> Vec<(String, Option<String>)> {
        list.iter()
            .map(|a| {
                let value = a.value_span.and_then(|s| doc.text(s)).map(str::to_string);
                (a.name.clone(), value)
            })
            .collect()
    }

    fn kinds(doc: &Document) -> Vec<DiagnosticKind> {
        doc.diagnostics().iter().map(|d| d.kind).collect()
    }

    #[test]
    fn quoted_unquoted_and_bare_attributes() {
        let (list, doc) = parse(r#" href="a b" id=x checked title='t'>"#, 2);
        let list = list.unwrap();
        assert_eq!(
            values(&doc, &list),
            vec![
                ("href".into(), Some("a b".into())),
                ("id".into(), Some("x".into())),
                ("checked".into(), None),
                ("title".into(), Some("t".into())),
            ]
        );
        assert_eq!(list.span, Span::new(1, 34));
        assert_eq!(list.get("HREF").unwrap().quote, Some('"'));
        assert_eq!(list.get("href").unwrap().value_span_with_quotes, Some(Span::new(6, 11)));
        assert!(doc.diagnostics().is_empty());
    }

    #[test]
    fn names_keep_case_keys_are_lowered() {
        let (list, _) = parse(" onClick=go()>", 2);
        let attribute = &list.unwrap().attributes[0];
        assert_eq!(attribute.name, "onClick");
        assert_eq!(attribute.key, "onclick");
    }

    #[test]
    fn duplicate_keys_are_kept_and_first_wins() {
        let (list, doc) = parse(" a=1 A=2>", 2);
        let list = list.unwrap();
        assert_eq!(list.len(), 2);
        let first = list.get("a").and_then(|a| a.value_span).unwrap();
        assert_eq!(doc.text(first), Some("1"));
    }

    #[test]
    fn missing_value_is_ignorable_without_prior_errors() {
        let (list, doc) = parse(" a= >", 2);
        let list = list.unwrap();
        assert_eq!(list.attributes[0].value_span, Some(Span::empty_at(4)));
        assert_eq!(kinds(&doc), vec![DiagnosticKind::IgnorableSyntax]);
    }

    #[test]
    fn missing_value_after_an_error_is_minor() {
        let (list, doc) = parse(" a$ b=>", 2);
        assert!(list.is_some());
        assert_eq!(kinds(&doc), vec![DiagnosticKind::MinorSyntax, DiagnosticKind::MinorSyntax]);
    }

    #[test]
    fn missing_whitespace_is_ignorable_once() {
        let (list, doc) = parse(r#" a="1"b="2"c="3">"#, 2);
        assert_eq!(list.unwrap().len(), 3);
        assert_eq!(
            kinds(&doc),
            vec![DiagnosticKind::IgnorableSyntax, DiagnosticKind::MinorSyntax]
        );
    }

    #[test]
    fn too_many_minor_errors_reject() {
        let (list, doc) = parse(" a$ b$ c$>", 2);
        assert!(list.is_none());
        assert_eq!(kinds(&doc).last(), Some(&DiagnosticKind::TooManyErrors));

        let (list, _) = parse(" a$ b$ c$>", 3);
        assert_eq!(list.unwrap().len(), 3);
    }

    #[test]
    fn stray_lt_is_major_outside_quotes() {
        let (list, doc) = parse(" a=1 <b>", 10);
        assert!(list.is_none());
        assert_eq!(kinds(&doc), vec![DiagnosticKind::MajorSyntax]);

        let (list, doc) = parse(r#" title="a<b">"#, 0);
        let list = list.unwrap();
        assert_eq!(values(&doc, &list)[0].1.as_deref(), Some("a<b"));
    }

    #[test]
    fn gt_inside_quotes_does_not_terminate() {
        let (list, doc) = parse(r#" expr="a > b" x>"#, 2);
        let list = list.unwrap();
        assert_eq!(values(&doc, &list)[0].1.as_deref(), Some("a > b"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn quote_inside_unquoted_value_is_minor() {
        let (list, doc) = parse(" a=b\"c>", 2);
        assert_eq!(values(&doc, &list.unwrap())[0].1.as_deref(), Some("b\"c"));
        assert_eq!(kinds(&doc), vec![DiagnosticKind::MinorSyntax]);
    }

    #[test]
    fn unterminated_quote_is_no_closing_delimiter() {
        let (list, doc) = parse(r#" a="b>text"#, 2);
        assert!(list.is_none());
        assert_eq!(kinds(&doc), vec![DiagnosticKind::NoClosingDelimiter]);
    }

    #[test]
    fn end_of_buffer_without_terminator_is_no_closing_delimiter() {
        let (list, doc) = parse(" a=1 b", 2);
        assert!(list.is_none());
        assert_eq!(kinds(&doc), vec![DiagnosticKind::NoClosingDelimiter]);
    }

    #[test]
    fn max_end_terminates() {
        let mut doc = Document::with_config(" a=1 b=2 c=3", ParserConfig::default());
        let list = doc.parse_attributes(0, Some(8), 2).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.span, Span::new(1, 8));
    }

    #[test]
    fn server_tags_are_filler() {
        let (list, doc) = parse(r#" href="<%= url %>" <% if x %>checked <% end %>>"#, 0);
        let list = list.unwrap();
        assert_eq!(values(&doc, &list)[0].1.as_deref(), Some("<%= url %>"));
        assert!(list.server_tag_outside_value);
        assert_eq!(list.attributes[1].name, "checked");

        let (list, _) = parse(" a=<%= v %>>", 0);
        let list = list.unwrap();
        assert!(!list.server_tag_outside_value);
        assert_eq!(list.attributes[0].value_span, Some(Span::new(3, 11)));
    }

    #[test]
    fn slash_before_terminator_is_self_closing() {
        let mut doc = Document::with_config("<br/><div a=1 />", ParserConfig::default());
        let parsed = doc.parse_attribute_list(3, None, 2, Some("br")).unwrap().unwrap();
        assert!(parsed.self_closing);
        assert_eq!(parsed.terminator, 4);
        assert!(doc.diagnostics().is_empty());

        let parsed = doc.parse_attribute_list(9, None, 2, Some("div")).unwrap().unwrap();
        assert!(parsed.self_closing);
        assert_eq!(parsed.list.len(), 1);
        assert_eq!(kinds(&doc), vec![DiagnosticKind::IgnorableSyntax]);
    }

    #[test]
    fn slash_is_part_of_an_unquoted_value() {
        let mut doc = Document::with_config("<a href=/x/>t</a>", ParserConfig::default());
        let parsed = doc.parse_attribute_list(2, None, 2, Some("a")).unwrap().unwrap();
        assert!(!parsed.self_closing);
        assert_eq!(parsed.terminator, 11);
        assert_eq!(doc.text(parsed.list.attributes[0].value_span.unwrap()), Some("/x/"));
        assert!(doc.diagnostics().is_empty());
    }

    #[test]
    fn empty_list_spans_the_terminator_position() {
        let (list, _) = parse("   >", 2);
        let list = list.unwrap();
        assert!(list.is_empty());
        assert_eq!(list.span, Span::empty_at(3));
    }
}
