//! Cross-reference parsing over an in-memory document.
//!
//! Handles traditional `xref` tables, cross-reference streams (PDF 1.5+),
//! hybrid files (`/XRefStm`) and the `/Prev` chain written by every
//! incremental update. The newest section wins for each object number.

use crate::error::{Error, Result};
use crate::lexer::{is_whitespace, skip_ws};
use crate::object::{Dict, Object};
use crate::parser::{parse_indirect_object, parse_object};
use std::collections::{HashMap, HashSet};

/// Longest `/Prev` chain followed before giving up.
const MAX_XREF_CHAIN: usize = 512;

/// Cross-reference table entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntryType {
    /// Entry for a free object
    Free,
    /// Object stored at a byte offset
    Uncompressed,
    /// Object stored inside an object stream
    Compressed,
}

/// Cross-reference table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XRefEntry {
    /// Type of entry
    pub entry_type: XRefEntryType,
    /// Byte offset (uncompressed) or object stream number (compressed)
    pub offset: u64,
    /// Generation number (uncompressed) or index within the stream (compressed)
    pub generation: u16,
}

impl XRefEntry {
    /// Object stored at a byte offset.
    pub fn uncompressed(offset: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Uncompressed,
            offset,
            generation,
        }
    }

    /// Object stored in an object stream.
    pub fn compressed(stream_obj_num: u64, index_in_stream: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Compressed,
            offset: stream_obj_num,
            generation: index_in_stream,
        }
    }

    /// Free entry.
    pub fn free(next_free: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Free,
            offset: next_free,
            generation,
        }
    }
}

/// Merged view of every cross-reference section reachable from `startxref`.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: HashMap<u32, XRefEntry>,
    trailer: Option<Dict>,
    sections: Vec<u64>,
}

impl CrossRefTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest trailer dictionary (for xref streams, the stream dictionary).
    pub fn trailer(&self) -> Option<&Dict> {
        self.trailer.as_ref()
    }

    /// Add an entry unless a newer section already defined this object.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.entry(object_number).or_insert(entry);
    }

    /// Get an entry by object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Byte offsets of the sections read, newest first.
    pub fn sections(&self) -> &[u64] {
        &self.sections
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries were read.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge an older section: existing (newer) entries are kept.
    fn merge_older(&mut self, older: CrossRefTable) {
        for (obj_num, entry) in older.entries {
            self.entries.entry(obj_num).or_insert(entry);
        }
        if self.trailer.is_none() {
            self.trailer = older.trailer;
        }
    }
}

/// Find the offset written after the last `startxref` keyword.
pub fn find_xref_offset(data: &[u8]) -> Result<u64> {
    let tail_start = data.len().saturating_sub(2048);
    let tail = &data[tail_start..];
    let pos = tail
        .windows(9)
        .rposition(|w| w == b"startxref")
        .ok_or(Error::InvalidXref)?;
    let after = skip_ws(&tail[pos + 9..]);
    let digits: Vec<u8> = after.iter().copied().take_while(|c| c.is_ascii_digit()).collect();
    std::str::from_utf8(&digits)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or(Error::InvalidXref)
}

/// Parse the cross-reference section at `offset` and every older section.
pub fn parse_xref_chain(data: &[u8], offset: u64) -> Result<CrossRefTable> {
    let mut table = CrossRefTable::new();
    let mut visited = HashSet::new();
    let mut next = Some(offset);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            log::warn!("xref /Prev chain loops back to offset {}", offset);
            break;
        }
        if visited.len() > MAX_XREF_CHAIN {
            return Err(Error::InvalidPdf(format!("xref /Prev chain longer than {}", MAX_XREF_CHAIN)));
        }

        let section = parse_xref_section(data, offset)?;
        log::debug!("xref section at {} with {} entries", offset, section.len());
        next = section
            .trailer()
            .and_then(|t| t.get("Prev"))
            .and_then(|p| p.as_integer())
            .filter(|p| *p >= 0)
            .map(|p| p as u64);
        table.sections.push(offset);
        table.merge_older(section);
    }

    Ok(table)
}

/// Parse a single section (no `/Prev` following), detecting its format.
pub fn parse_xref_section(data: &[u8], offset: u64) -> Result<CrossRefTable> {
    let start = usize::try_from(offset).map_err(|_| Error::InvalidXref)?;
    if start >= data.len() {
        return Err(Error::InvalidPdf(format!("xref offset {} beyond end of file", offset)));
    }
    let input = skip_ws(&data[start..]);

    if input.starts_with(b"xref") {
        let mut table = parse_traditional_xref(&input[4..], start)?;
        let hybrid = table
            .trailer()
            .and_then(|t| t.get("XRefStm"))
            .and_then(|o| o.as_integer())
            .and_then(|n| u64::try_from(n).ok());
        if let Some(stm_offset) = hybrid {
            match parse_xref_stream(data, stm_offset) {
                Ok(stream_table) => {
                    for (num, entry) in stream_table.entries {
                        table.add_entry(num, entry);
                    }
                },
                Err(e) => log::warn!("ignoring unreadable /XRefStm at {}: {}", stm_offset, e),
            }
        }
        Ok(table)
    } else if input.first().is_some_and(|c| c.is_ascii_digit()) {
        parse_xref_stream(data, offset)
    } else {
        Err(Error::InvalidXref)
    }
}

/// Whitespace separated words of a traditional table, ending at `trailer`.
struct Words<'a> {
    input: &'a [u8],
}

impl<'a> Words<'a> {
    fn peek_is(&self, word: &[u8]) -> bool {
        skip_ws(self.input).starts_with(word)
    }

    fn next_word(&mut self) -> Option<&'a [u8]> {
        let input = skip_ws(self.input);
        let len = input.iter().take_while(|c| !is_whitespace(**c)).count();
        if len == 0 {
            return None;
        }
        self.input = &input[len..];
        Some(&input[..len])
    }

    fn next_number(&mut self) -> Result<u64> {
        let word = self.next_word().ok_or(Error::InvalidXref)?;
        std::str::from_utf8(word)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(Error::InvalidXref)
    }
}

/// Parse the body of a traditional table; `input` starts after `xref`.
fn parse_traditional_xref(input: &[u8], offset: usize) -> Result<CrossRefTable> {
    let mut table = CrossRefTable::new();
    let mut words = Words { input };

    while !words.peek_is(b"trailer") {
        let first = words.next_number()?;
        let count = words.next_number()?;
        if count > 10_000_000 {
            return Err(Error::InvalidPdf(format!("xref subsection count {} too large", count)));
        }
        for i in 0..count {
            let field1 = words.next_number()?;
            let field2 = words.next_number()?;
            let kind = words.next_word().ok_or(Error::InvalidXref)?;
            let num = object_number(first, i)?;
            let entry = match kind {
                b"n" => XRefEntry::uncompressed(field1, field2 as u16),
                b"f" => XRefEntry::free(field1, field2 as u16),
                _ => {
                    return Err(Error::ParseError {
                        offset,
                        reason: format!("invalid xref entry flag '{}'", String::from_utf8_lossy(kind)),
                    })
                },
            };
            table.add_entry(num, entry);
        }
    }

    let after_keyword = &skip_ws(words.input)[b"trailer".len()..];
    let (_, trailer) = parse_object(after_keyword).map_err(|e| Error::ParseError {
        offset,
        reason: format!("unreadable trailer: {}", e),
    })?;
    match trailer {
        Object::Dictionary(dict) => table.trailer = Some(dict),
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: other.type_name().to_string(),
            })
        },
    }
    Ok(table)
}

/// Parse a cross-reference stream object located at `offset`.
fn parse_xref_stream(data: &[u8], offset: u64) -> Result<CrossRefTable> {
    let start = usize::try_from(offset).map_err(|_| Error::InvalidXref)?;
    let slice = data.get(start..).ok_or(Error::InvalidXref)?;
    let (_, (_, object)) = parse_indirect_object(slice).map_err(|e| Error::ParseError {
        offset: start,
        reason: format!("unreadable xref stream: {}", e),
    })?;

    let dict = match &object {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };
    if let Some(kind) = dict.get("Type").and_then(|o| o.as_name()) {
        if kind != "XRef" {
            return Err(Error::InvalidPdf(format!("expected /Type /XRef, got /Type /{}", kind)));
        }
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|o| o.as_array())
        .map(|arr| arr.iter().filter_map(|o| o.as_integer()).map(|w| w.max(0) as usize).collect())
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|w| *w > 8) {
        return Err(Error::InvalidPdf("invalid /W array in xref stream".to_string()));
    }
    let (w1, w2, w3) = (widths[0], widths[1], widths[2]);
    let entry_size = w1 + w2 + w3;
    if entry_size == 0 {
        return Err(Error::InvalidPdf("empty /W array in xref stream".to_string()));
    }

    let size = dict
        .get("Size")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::InvalidPdf("missing /Size in xref stream".to_string()))?;
    let ranges: Vec<(u64, u64)> = match dict.get("Index").and_then(|o| o.as_array()) {
        Some(index) => index
            .chunks_exact(2)
            .map(|pair| {
                let first = pair[0].as_integer().and_then(|n| u64::try_from(n).ok());
                let count = pair[1].as_integer().and_then(|n| u64::try_from(n).ok());
                first.zip(count).ok_or(Error::InvalidXref)
            })
            .collect::<Result<Vec<_>>>()?,
        None => vec![(0, u64::try_from(size).unwrap_or(0))],
    };

    let decoded = object.decode_stream_data()?;
    let mut table = CrossRefTable::new();
    let mut rows = decoded.chunks_exact(entry_size);

    for (first, count) in ranges {
        for i in 0..count {
            let row = rows
                .next()
                .ok_or_else(|| Error::InvalidPdf("truncated xref stream data".to_string()))?;
            let kind = if w1 == 0 { 1 } else { read_int(&row[..w1]) };
            let field2 = read_int(&row[w1..w1 + w2]);
            let field3 = read_int(&row[w1 + w2..]);
            let num = object_number(first, i)?;
            let entry = match kind {
                0 => XRefEntry::free(field2, field3 as u16),
                1 => XRefEntry::uncompressed(field2, field3 as u16),
                2 => XRefEntry::compressed(field2, field3 as u16),
                other => {
                    log::debug!("skipping xref stream entry of unknown type {}", other);
                    continue;
                },
            };
            table.add_entry(num, entry);
        }
    }

    table.trailer = Some(dict.clone());
    Ok(table)
}

/// Object number `i` of a subsection starting at `first`.
fn object_number(first: u64, i: u64) -> Result<u32> {
    first
        .checked_add(i)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(Error::InvalidXref)
}

/// Big-endian integer of up to eight bytes.
fn read_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
