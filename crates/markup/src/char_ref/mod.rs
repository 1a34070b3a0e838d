//! Character reference codec.
//!
//! Recognizes `&name;`, `&#123;` and `&#x7B;` references (with or without the
//! trailing `;`, subject to the active compatibility profile), decodes text
//! containing them and encodes text into them.

mod entities;

use std::borrow::Cow;

use memchr::memchr;

use crate::config::{ParserConfig, UnterminatedSettings};
use crate::span::Span;

const MAX_DECIMAL_DIGITS: usize = 7; // 1114111
const MAX_HEX_DIGITS: usize = 6; // 10FFFF

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Named,
    Decimal,
    Hex,
}

/// A recognized character reference.
///
/// Only references that decode to a Unicode scalar value are ever
/// constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharacterReference {
    pub span: Span,
    pub character: char,
    pub kind: ReferenceKind,
    /// Whether the reference ends with `;`.
    pub terminated: bool,
}

impl CharacterReference {
    pub fn code_point(&self) -> u32 {
        self.character as u32
    }

    /// The character this reference stands for, after optional
    /// non-breaking-space conversion.
    pub fn decoded(&self, convert_nbsp: bool) -> char {
        if convert_nbsp && self.character == '\u{00A0}' {
            ' '
        } else {
            self.character
        }
    }
}

/// Recognize a character reference starting at the `&` at `pos`.
///
/// Unterminated references are accepted only when `unterminated` allows the
/// decoded code point for the reference kind.
pub fn reference_at(
    text: &str,
    pos: usize,
    unterminated: &UnterminatedSettings,
) -> Option<CharacterReference> {
    let bytes = text.as_bytes();
    if bytes.get(pos) != Some(&b'&') {
        return None;
    }

    let (kind, end, code_point) = if bytes.get(pos + 1) == Some(&b'#') {
        let (kind, digits_start) = match bytes.get(pos + 2) {
            Some(b'x' | b'X') => (ReferenceKind::Hex, pos + 3),
            _ => (ReferenceKind::Decimal, pos + 2),
        };
        let (radix, max_digits) = match kind {
            ReferenceKind::Hex => (16, MAX_HEX_DIGITS),
            _ => (10, MAX_DECIMAL_DIGITS),
        };
        let digits = bytes[digits_start.min(bytes.len())..]
            .iter()
            .take_while(|b| char::from(**b).is_digit(radix))
            .count();
        if digits == 0 || digits > max_digits {
            return None;
        }
        let end = digits_start + digits;
        let code_point = u32::from_str_radix(&text[digits_start..end], radix).ok()?;
        (kind, end, code_point)
    } else {
        let name_start = pos + 1;
        if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
            return None;
        }
        let len = bytes[name_start..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();
        if len > entities::MAX_NAME_LEN {
            return None;
        }
        let end = name_start + len;
        let code_point = entities::code_point_for(&text[name_start..end])?;
        (ReferenceKind::Named, end, code_point)
    };

    // Surrogates, values past U+10FFFF and NUL are never decoded.
    let character = char::from_u32(code_point).filter(|c| *c != '\0')?;
    let terminated = bytes.get(end) == Some(&b';');
    if !terminated && !unterminated.threshold(kind).accepts(code_point) {
        return None;
    }
    Some(CharacterReference {
        span: Span::new(pos, end + usize::from(terminated)),
        character,
        kind,
        terminated,
    })
}

/// Decode every character reference in `text` using `config`'s profile for
/// the given context.
pub fn decode_with<'t>(
    text: &'t str,
    inside_attribute_value: bool,
    config: &ParserConfig,
) -> Cow<'t, str> {
    let settings = config.profile.unterminated(inside_attribute_value);
    let bytes = text.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut search = 0;

    while let Some(rel) = memchr(b'&', &bytes[search..]) {
        let amp = search + rel;
        match reference_at(text, amp, settings) {
            Some(reference) => {
                let out = out.get_or_insert_with(|| String::with_capacity(text.len()));
                out.push_str(&text[copied..amp]);
                out.push(reference.decoded(config.convert_nbsp));
                copied = reference.span.end;
                search = reference.span.end;
            }
            None => search = amp + 1,
        }
    }

    match out {
        Some(mut out) => {
            out.push_str(&text[copied..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(text),
    }
}

/// Escape markup-significant characters and everything above U+007F.
pub fn encode_with<'t>(text: &'t str, config: &ParserConfig) -> Cow<'t, str> {
    let mut out: Option<String> = None;
    let mut copied = 0;

    for (i, c) in text.char_indices() {
        let code_point = c as u32;
        let replacement: Cow<'static, str> = if c == '\'' {
            if !config.encode_apostrophe {
                continue;
            }
            Cow::Borrowed("&#39;")
        } else if let Some(name) = entities::name_for(code_point) {
            Cow::Owned(format!("&{name};"))
        } else if code_point > 127 {
            Cow::Owned(format!("&#{code_point};"))
        } else {
            continue;
        };
        let out = out.get_or_insert_with(|| String::with_capacity(text.len() + 16));
        out.push_str(&text[copied..i]);
        out.push_str(&replacement);
        copied = i + c.len_utf8();
    }

    match out {
        Some(mut out) => {
            out.push_str(&text[copied..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(text),
    }
}

/// Decode text outside attribute values with the global configuration.
pub fn decode(text: &str) -> String {
    decode_with(text, false, &ParserConfig::global()).into_owned()
}

/// Decode an attribute value with the global configuration.
pub fn decode_attribute_value(text: &str) -> String {
    decode_with(text, true, &ParserConfig::global()).into_owned()
}

/// Encode with the global configuration.
pub fn encode(text: &str) -> String {
    encode_with(text, &ParserConfig::global()).into_owned()
}
