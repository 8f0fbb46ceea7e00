//! Text forms of primitives, enums and condensed arrays.
//!
//! Condensed arrays are a single comma separated run of tokens:
//!
//! | element | token |
//! |---------|-------|
//! | null | empty |
//! | empty string | `\_` |
//! | `,` inside a string | `` \` `` |
//! | `\` inside a string | `\\` |
//!
//! Every other character is written as is.
//!
//! ```
//! use wv_reflect::serial::codec::{decode_condensed, encode_condensed};
//!
//! let items = [Some("hello,"), Some("homer"), Some(""), Some("!"), None, Some("what?")];
//! let text = encode_condensed(items);
//! assert_eq!(text, r"hello\`,homer,\_,!,,what?");
//!
//! let decoded = decode_condensed(&text);
//! assert_eq!(decoded.iter().map(Option::as_deref).collect::<Vec<_>>(), items);
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::DeserializeError;
use crate::info::{EnumInfo, Ty};
use crate::value::Value;

const ESCAPE: char = '\\';
const SEPARATOR: char = ',';
const ESCAPED_SEPARATOR: char = '`';
const EMPTY_MARKER: char = '_';

// -----------------------------------------------------------------------------
// Primitives

/// Returns the text form of a primitive or string value.
///
/// `None` for nulls, enums and references.
pub fn format_primitive(value: &Value) -> Option<String> {
    let text = match value {
        Value::Bool(v) => v.to_string(),
        Value::Char(v) => v.to_string(),
        Value::I8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U8(v) => v.to_string(),
        Value::U16(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::Str(v) => v.to_string(),
        Value::Null | Value::Enum { .. } | Value::Ref(_) => return None,
    };
    Some(text)
}

/// Parses the text form of a primitive or string of type `ty`.
///
/// Booleans ignore case, numbers ignore surrounding whitespace.
pub fn parse_primitive(ty: &Ty, text: &str) -> Result<Value, DeserializeError> {
    fn num<T: core::str::FromStr>(ty: &Ty, text: &str) -> Result<T, DeserializeError> {
        text.trim().parse().map_err(|_| invalid(ty, text))
    }

    let value = match ty {
        Ty::Bool => match text.trim() {
            t if t.eq_ignore_ascii_case("true") => Value::Bool(true),
            t if t.eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => return Err(invalid(ty, text)),
        },
        Ty::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(invalid(ty, text)),
            }
        }
        Ty::I8 => Value::I8(num(ty, text)?),
        Ty::I16 => Value::I16(num(ty, text)?),
        Ty::I32 => Value::I32(num(ty, text)?),
        Ty::I64 => Value::I64(num(ty, text)?),
        Ty::U8 => Value::U8(num(ty, text)?),
        Ty::U16 => Value::U16(num(ty, text)?),
        Ty::U32 => Value::U32(num(ty, text)?),
        Ty::U64 => Value::U64(num(ty, text)?),
        Ty::F32 => Value::F32(num(ty, text)?),
        Ty::F64 => Value::F64(num(ty, text)?),
        Ty::String => Value::from(text),
        _ => return Err(invalid(ty, text)),
    };
    Ok(value)
}

#[cold]
fn invalid(ty: &Ty, text: &str) -> DeserializeError {
    DeserializeError::InvalidPrimitive {
        ty: ty.to_string(),
        text: text.into(),
    }
}

// -----------------------------------------------------------------------------
// Enums

/// Returns the text form of `bits` for the enum `info`.
///
/// A variant with exactly that value wins. Flag enums are otherwise split
/// into variants, largest values first, and listed smallest first as
/// `A, B`. Zero and values that cannot be named are written as numbers.
pub fn format_enum(info: &EnumInfo, bits: i64) -> String {
    if let Some(name) = info.name_of(bits) {
        return name.to_string();
    }
    if !info.is_flags() || bits == 0 {
        return bits.to_string();
    }

    let mut candidates: Vec<_> = info
        .variants()
        .iter()
        .filter(|v| v.value() != 0 && v.value() & bits == v.value())
        .collect();
    candidates.sort_by_key(|v| core::cmp::Reverse(v.value()));

    let mut remaining = bits;
    let mut picked = Vec::new();
    for variant in candidates {
        if remaining & variant.value() == variant.value() {
            remaining &= !variant.value();
            picked.push(variant);
        }
    }
    if remaining != 0 {
        return bits.to_string();
    }

    picked.sort_by_key(|v| v.value());
    picked
        .iter()
        .map(|v| v.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parses a number, a variant name or a comma separated list of variant names.
pub fn parse_enum(info: &EnumInfo, text: &str) -> Result<i64, DeserializeError> {
    let text = text.trim();
    if let Ok(bits) = text.parse::<i64>() {
        return Ok(bits);
    }
    let mut bits = 0;
    for name in text.split(SEPARATOR) {
        bits |= info
            .value_of(name.trim())
            .ok_or_else(|| DeserializeError::InvalidEnum {
                ty: info.path().into(),
                text: text.into(),
            })?;
    }
    Ok(bits)
}

// -----------------------------------------------------------------------------
// Condensed arrays

/// Joins tokens into condensed text. `None` is a null element.
pub fn encode_condensed<'s>(items: impl IntoIterator<Item = Option<&'s str>>) -> String {
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        match item {
            None => {}
            Some("") => {
                out.push(ESCAPE);
                out.push(EMPTY_MARKER);
            }
            Some(s) => {
                for c in s.chars() {
                    match c {
                        SEPARATOR => {
                            out.push(ESCAPE);
                            out.push(ESCAPED_SEPARATOR);
                        }
                        ESCAPE => {
                            out.push(ESCAPE);
                            out.push(ESCAPE);
                        }
                        c => out.push(c),
                    }
                }
            }
        }
    }
    out
}

/// Splits condensed text into tokens. Empty tokens are `None`.
///
/// Empty text holds no tokens at all. Unknown escapes decode to the
/// escaped character.
pub fn decode_condensed(text: &str) -> Vec<Option<String>> {
    let mut out = Vec::new();
    if text.is_empty() {
        return out;
    }

    let mut token = String::new();
    // An escape makes a token non-null even when it adds no character.
    let mut present = false;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            SEPARATOR => {
                out.push(present.then(|| core::mem::take(&mut token)));
                token.clear();
                present = false;
            }
            ESCAPE => {
                present = true;
                match chars.next() {
                    Some(EMPTY_MARKER) => {}
                    Some(ESCAPED_SEPARATOR) => token.push(SEPARATOR),
                    Some(other) => token.push(other),
                    None => token.push(ESCAPE),
                }
            }
            c => {
                present = true;
                token.push(c);
            }
        }
    }
    out.push(present.then_some(token));
    out
}
