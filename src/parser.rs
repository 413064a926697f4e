//! Recursive-descent object parser over lexer tokens.
//!
//! All parsing functions return nom `IResult`s. [`parse_indirect_object`]
//! reads a complete `N G obj ... endobj` block as found at an xref offset.

use crate::error::{Error, Result};
use crate::lexer::{is_whitespace, token, Token};
use crate::object::{Dict, Object, ObjectRef};
use nom::IResult;

fn nom_error(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Decode escape sequences in a raw literal string.
///
/// Handles `\n \r \t \b \f \( \) \\`, octal `\ddd` and line continuations.
/// An unknown escape drops the backslash.
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut value = (next - b'0') as u32;
                let mut digits = 1;
                while digits < 3 && i < raw.len() && (b'0'..=b'7').contains(&raw[i]) {
                    value = value * 8 + (raw[i] - b'0') as u32;
                    i += 1;
                    digits += 1;
                }
                out.push((value & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }

    out
}

/// Parse one PDF object.
///
/// `N G R` triples become [`Object::Reference`]; a dictionary followed by
/// `stream` becomes [`Object::Stream`].
///
/// ```
/// use pdf_sigcheck::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /ByteRange [0 10 20 30] >>").unwrap();
/// assert!(obj.as_dict().is_some());
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, tok) = token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Integer(id) => {
            if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if id >= 0 && (0..=u16::MAX as i64).contains(&gen) {
                        return Ok((after_r, Object::Reference(ObjectRef::new(id as u32, gen as u16))));
                    }
                }
            }
            Ok((rest, Object::Integer(id)))
        },
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),
        Token::HexString(raw) => match decode_hex(raw) {
            Ok(bytes) => Ok((rest, Object::String(bytes))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::HexDigit))),
        },
        Token::Name(name) => Ok((rest, Object::Name(name))),
        Token::ArrayStart => parse_array(rest),
        Token::DictStart => {
            let (after_dict, dict) = parse_dictionary(rest)?;
            match token(after_dict) {
                Ok((stream_input, Token::StreamStart)) => {
                    let (after_stream, data) = parse_stream_data(stream_input, &dict)?;
                    Ok((
                        after_stream,
                        Object::Stream {
                            dict,
                            data: bytes::Bytes::copy_from_slice(data),
                        },
                    ))
                },
                _ => Ok((after_dict, Object::Dictionary(dict))),
            }
        },
        _ => Err(nom_error(input, nom::error::ErrorKind::Tag)),
    }
}

/// Parse `N G obj <object> endobj`.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (rest, id) = match token(input)? {
        (rest, Token::Integer(id)) if id >= 0 => (rest, id as u32),
        _ => return Err(nom_error(input, nom::error::ErrorKind::Digit)),
    };
    let (rest, gen) = match token(rest)? {
        (rest, Token::Integer(gen)) if (0..=u16::MAX as i64).contains(&gen) => (rest, gen as u16),
        _ => return Err(nom_error(input, nom::error::ErrorKind::Digit)),
    };
    let rest = match token(rest)? {
        (rest, Token::ObjStart) => rest,
        _ => return Err(nom_error(input, nom::error::ErrorKind::Tag)),
    };
    let (rest, object) = parse_object(rest)?;
    // A missing endobj is tolerated.
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => rest,
    };
    Ok((rest, (ObjectRef::new(id, gen), object)))
}

/// Stream data follows `stream` plus one EOL. A direct /Length is trusted when
/// `endstream` follows it; otherwise the data runs to the next `endstream`.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dict) -> IResult<&'a [u8], &'a [u8]> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        input
    };

    if let Some(length) = dict.get("Length").and_then(|o| o.as_integer()) {
        if length >= 0 && (length as usize) <= input.len() {
            let (data, after) = input.split_at(length as usize);
            if let Ok((rest, Token::StreamEnd)) = token(after) {
                return Ok((rest, data));
            }
            log::debug!("stream /Length {} does not end at endstream, scanning", length);
        }
    }

    let pos = find_endstream(input).ok_or_else(|| nom_error(input, nom::error::ErrorKind::Eof))?;
    let mut end = pos;
    while end > 0 && matches!(input[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    Ok((&input[pos + b"endstream".len()..], &input[..end]))
}

fn find_endstream(input: &[u8]) -> Option<usize> {
    input.windows(9).position(|w| w == b"endstream")
}

fn parse_array(mut input: &[u8]) -> IResult<&[u8], Object> {
    let mut items = Vec::new();
    loop {
        if let Ok((rest, Token::ArrayEnd)) = token(input) {
            return Ok((rest, Object::Array(items)));
        }
        let (rest, item) = parse_object(input)?;
        items.push(item);
        input = rest;
    }
}

fn parse_dictionary(mut input: &[u8]) -> IResult<&[u8], Dict> {
    let mut dict = Dict::new();
    loop {
        match token(input)? {
            (rest, Token::DictEnd) => return Ok((rest, dict)),
            (rest, Token::Name(key)) => {
                let (rest, value) = parse_object(rest)?;
                dict.insert(key, value);
                input = rest;
            },
            _ => return Err(nom_error(input, nom::error::ErrorKind::Tag)),
        }
    }
}

/// Decode hex digits to bytes, ignoring whitespace. An odd trailing digit is
/// padded with 0.
///
/// ```
/// use pdf_sigcheck::parser::decode_hex;
///
/// assert_eq!(decode_hex(b"48 65 6C 6C 6F").unwrap(), b"Hello");
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes.iter().copied().filter(|c| !is_whitespace(*c)).collect();
    let mut out = Vec::with_capacity(digits.len().div_ceil(2));

    for chunk in digits.chunks(2) {
        let hi = hex_value(chunk[0])?;
        let lo = match chunk.get(1) {
            Some(&c) => hex_value(c)?,
            None => 0,
        };
        out.push(hi << 4 | lo);
    }

    Ok(out)
}

fn hex_value(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::Decode(format!("invalid hex digit: 0x{:02X}", c))),
    }
}
