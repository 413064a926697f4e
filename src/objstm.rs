//! Object streams (/Type /ObjStm, PDF 1.5+).
//!
//! The decoded stream starts with /N pairs `objnum offset` followed, at byte
//! /First, by the objects themselves. Xref entries of type 2 point here by
//! stream number and index.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::Object;
use crate::parser::parse_object;

/// Objects unpacked from one object stream, in stream order.
#[derive(Debug, Clone, Default)]
pub struct ObjectStream {
    objects: Vec<(u32, Object)>,
}

impl ObjectStream {
    /// Decode and parse an object stream.
    pub fn parse(stream_obj: &Object) -> Result<Self> {
        let dict = match stream_obj {
            Object::Stream { dict, .. } => dict,
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "Stream".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };
        if let Some(kind) = dict.get("Type").and_then(|o| o.as_name()) {
            if kind != "ObjStm" {
                return Err(Error::InvalidPdf(format!("expected /Type /ObjStm, got /Type /{}", kind)));
            }
        }

        let n = dict
            .get("N")
            .and_then(|o| o.as_integer())
            .filter(|n| (0..=1_000_000).contains(n))
            .ok_or_else(|| Error::InvalidPdf("object stream missing or invalid /N".to_string()))?
            as usize;
        let first = dict
            .get("First")
            .and_then(|o| o.as_integer())
            .filter(|f| *f >= 0)
            .ok_or_else(|| Error::InvalidPdf("object stream missing or invalid /First".to_string()))?
            as usize;

        let decoded = stream_obj.decode_stream_data()?;
        if decoded.len() < first {
            return Err(Error::InvalidPdf(format!(
                "object stream data too short: {} bytes, /First is {}",
                decoded.len(),
                first
            )));
        }

        let pairs = parse_pairs(&decoded[..first], n)?;
        let body = &decoded[first..];
        let mut objects = Vec::with_capacity(pairs.len());
        for (obj_num, offset) in pairs {
            let Some(slice) = body.get(offset..) else {
                log::warn!("object {} offset {} beyond object stream data", obj_num, offset);
                continue;
            };
            match parse_object(slice) {
                Ok((_, object)) => objects.push((obj_num, object)),
                Err(e) => log::warn!("failed to parse object {} in object stream: {:?}", obj_num, e),
            }
        }

        Ok(Self { objects })
    }

    /// Object at `index` if it has the expected number.
    pub fn get(&self, index: usize, obj_num: u32) -> Option<&Object> {
        match self.objects.get(index) {
            Some((num, object)) if *num == obj_num => Some(object),
            _ => self.objects.iter().find(|(num, _)| *num == obj_num).map(|(_, o)| o),
        }
    }

    /// Number of objects parsed.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the stream held no readable objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn parse_pairs(mut data: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count);
    for i in 0..count {
        let mut next_int = || -> Result<i64> {
            match token(data) {
                Ok((rest, Token::Integer(value))) if value >= 0 => {
                    data = rest;
                    Ok(value)
                },
                _ => Err(Error::ParseError {
                    offset: 0,
                    reason: format!("invalid object stream header at pair {}", i),
                }),
            }
        };
        let obj_num = next_int()? as u32;
        let offset = next_int()? as usize;
        pairs.push((obj_num, offset));
    }
    Ok(pairs)
}
