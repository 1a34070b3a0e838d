//! Construction of the built-in tag syntaxes.

use memchr::memchr;

use super::{Builtin, Incomplete, TagType};
use crate::chars::{char_at, find_from, is_whitespace, name_end};
use crate::document::Document;
use crate::span::Span;
use crate::tag::{EndTag, StartTag, Tag};

pub(crate) fn construct_builtin(
    doc: &mut Document,
    builtin: Builtin,
    tag_type: &TagType,
    pos: usize,
) -> Result<Option<Tag>, Incomplete> {
    match builtin {
        Builtin::NormalStart => normal_start(doc, tag_type, pos),
        Builtin::NormalEnd => normal_end(doc, tag_type, pos),
        Builtin::UnregisteredStart | Builtin::UnregisteredEnd => unregistered(doc, tag_type, pos),
        Builtin::Comment
        | Builtin::CdataSection
        | Builtin::ServerComment
        | Builtin::ServerCommon
        | Builtin::Php => doc.construct_delimited(tag_type, pos),
        Builtin::DocumentType | Builtin::MarkupDeclaration => declaration(doc, tag_type, pos),
        Builtin::XmlDeclaration => {
            let body = pos + tag_type.start_lower().len();
            if !char_at(&doc.parse_text, body).is_some_and(is_whitespace) {
                return Ok(None);
            }
            doc.construct_delimited(tag_type, pos)
        }
        Builtin::ProcessingInstruction => {
            let body = pos + tag_type.start_lower().len();
            let Some(target_end) = name_end(&doc.parse_text, body) else {
                return Ok(None);
            };
            let mut tag = match doc.construct_delimited(tag_type, pos)? {
                Some(tag) => tag,
                None => return Ok(None),
            };
            if let Tag::Start(start) = &mut tag {
                let target = &doc.source()[body..target_end];
                start.name = format!("?{}", target.to_ascii_lowercase());
            }
            Ok(Some(tag))
        }
    }
}

/// `<name attributes>`
fn normal_start(
    doc: &mut Document,
    tag_type: &TagType,
    pos: usize,
) -> Result<Option<Tag>, Incomplete> {
    let name_begin = pos + 1;
    let Some(name_end) = name_end(&doc.parse_text, name_begin) else {
        return Ok(None);
    };
    let name = doc.parse_text[name_begin..name_end].to_string();
    let max_errors = doc.config.max_attribute_errors;
    let Some(parsed) = doc.parse_attribute_list(name_end, None, max_errors, Some(&name))? else {
        return Ok(None);
    };
    Ok(Some(Tag::Start(StartTag {
        span: Span::new(pos, parsed.terminator + 1),
        name,
        tag_type: tag_type.clone(),
        attributes: Some(parsed.list),
        self_closing: parsed.self_closing,
        element: None,
    })))
}

/// `</name>`; anything up to the `>` is tolerated except a `<` that does not
/// start a server tag.
fn normal_end(
    doc: &mut Document,
    tag_type: &TagType,
    pos: usize,
) -> Result<Option<Tag>, Incomplete> {
    let name_begin = pos + 2;
    let Some(name_end) = name_end(&doc.parse_text, name_begin) else {
        return Ok(None);
    };
    let mut cursor = name_end;
    loop {
        let rest = &doc.parse_text.as_bytes()[cursor..];
        let gt = memchr(b'>', rest).map(|rel| cursor + rel);
        let lt = memchr(b'<', rest).map(|rel| cursor + rel);
        match (gt, lt) {
            (None, _) => return Err(Incomplete),
            (Some(gt), Some(lt)) if lt < gt => match doc.server_tag_end(lt) {
                Some(end) => cursor = end,
                None => return Ok(None),
            },
            (Some(gt), _) => {
                return Ok(Some(Tag::End(EndTag {
                    span: Span::new(pos, gt + 1),
                    name: doc.parse_text[name_begin..name_end].to_string(),
                    tag_type: tag_type.clone(),
                    implicit: false,
                    element: None,
                })));
            }
        }
    }
}

/// Declarations end at the first `>` outside a quoted string.
fn declaration(
    doc: &Document,
    tag_type: &TagType,
    pos: usize,
) -> Result<Option<Tag>, Incomplete> {
    let body = pos + tag_type.start_lower().len();
    let bytes = doc.parse_text.as_bytes();
    match bytes.get(body) {
        Some(b) if b.is_ascii_whitespace() => {}
        Some(b'>') if tag_type == &TagType::document_type() => {}
        Some(_) => return Ok(None),
        None => return Err(Incomplete),
    }
    let mut cursor = body;
    while let Some(&b) = bytes.get(cursor) {
        match b {
            b'>' => {
                let name = tag_type.descriptor().name_prefix.to_string();
                return Ok(Some(Tag::opaque(tag_type, Span::new(pos, cursor + 1), name)));
            }
            b'"' | b'\'' => {
                let close = memchr(b, &bytes[cursor + 1..]).ok_or(Incomplete)?;
                cursor += close + 2;
            }
            _ => cursor += 1,
        }
    }
    Err(Incomplete)
}

/// Sentinel construction: `<` or `</` followed by a non-whitespace
/// character, up to the next `>`.
fn unregistered(
    doc: &Document,
    tag_type: &TagType,
    pos: usize,
) -> Result<Option<Tag>, Incomplete> {
    let name_begin = pos + tag_type.start_lower().len();
    match char_at(&doc.parse_text, name_begin) {
        Some(c) if !is_whitespace(c) && c != '>' && c != '<' => {}
        _ => return Ok(None),
    }
    let close = find_from(doc.parse_text.as_bytes(), name_begin, b">").ok_or(Incomplete)?;
    let name_len = doc.parse_text[name_begin..close]
        .find(|c: char| is_whitespace(c) || c == '/')
        .unwrap_or(close - name_begin);
    let name = doc.parse_text[name_begin..name_begin + name_len].to_string();
    Ok(Some(Tag::opaque(tag_type, Span::new(pos, close + 1), name)))
}
