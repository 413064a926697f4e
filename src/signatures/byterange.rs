//! `/ByteRange` handling.
//!
//! The ByteRange is an array of four integers
//! `[offset1, length1, offset2, length2]`: two spans of file bytes that were
//! hashed. The gap between them holds the hex `/Contents` value, `<` and `>`
//! included.

use crate::object::Object;
use crate::parser::decode_hex;
use std::ops::Range;

/// The two signed spans of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start of the first span (0 for any well-formed signature)
    pub offset1: usize,
    /// Length of the first span
    pub length1: usize,
    /// Start of the second span
    pub offset2: usize,
    /// Length of the second span
    pub length2: usize,
}

impl ByteRange {
    /// Build from the four raw values.
    pub fn new(offset1: usize, length1: usize, offset2: usize, length2: usize) -> Self {
        Self {
            offset1,
            length1,
            offset2,
            length2,
        }
    }

    /// Read a `/ByteRange` array: exactly four non-negative integers.
    pub fn from_object(obj: &Object) -> Result<Self, String> {
        let items = obj.as_array().ok_or_else(|| format!("/ByteRange is {}, not an array", obj.type_name()))?;
        if items.len() != 4 {
            return Err(format!("/ByteRange has {} values, expected 4", items.len()));
        }
        let mut values = [0usize; 4];
        for (slot, item) in values.iter_mut().zip(items) {
            *slot = item
                .as_integer()
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| "/ByteRange values must be non-negative integers".to_string())?;
        }
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Offset just past the second span.
    pub fn end(&self) -> usize {
        self.offset2.saturating_add(self.length2)
    }

    /// The placeholder between the spans.
    pub fn gap(&self) -> Range<usize> {
        self.offset1 + self.length1..self.offset2
    }

    /// Check the spans against a file of `file_len` bytes.
    ///
    /// The first span starts the file, the spans are ordered and
    /// non-overlapping, and the second ends inside the file.
    pub fn validate(&self, file_len: usize) -> Result<(), String> {
        if self.offset1 != 0 {
            return Err(format!("/ByteRange must start at 0, got {}", self.offset1));
        }
        let first_end = self
            .offset1
            .checked_add(self.length1)
            .ok_or_else(|| "/ByteRange first span overflows".to_string())?;
        if first_end > self.offset2 {
            return Err(format!(
                "/ByteRange first span ends at {} after second span start {}",
                first_end, self.offset2
            ));
        }
        let end = self
            .offset2
            .checked_add(self.length2)
            .ok_or_else(|| "/ByteRange second span overflows".to_string())?;
        if end > file_len {
            return Err(format!("/ByteRange ends at {} beyond file length {}", end, file_len));
        }
        Ok(())
    }

    /// True when the second span ends exactly at `file_len`.
    pub fn covers(&self, file_len: usize) -> bool {
        self.end() == file_len
    }

    /// Concatenation of both spans.
    pub fn signed_bytes(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        let first = data
            .get(self.offset1..self.offset1 + self.length1)
            .ok_or_else(|| "first /ByteRange span exceeds file".to_string())?;
        let second = data
            .get(self.offset2..self.end())
            .ok_or_else(|| "second /ByteRange span exceeds file".to_string())?;
        let mut signed = Vec::with_capacity(first.len() + second.len());
        signed.extend_from_slice(first);
        signed.extend_from_slice(second);
        Ok(signed)
    }

    /// Decode the hex string sitting in the gap.
    ///
    /// The gap must be exactly `<hex>`; anything else means the spans do not
    /// frame this signature's `/Contents`.
    pub fn contents(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        let gap = data
            .get(self.gap())
            .ok_or_else(|| "/ByteRange gap exceeds file".to_string())?;
        match gap {
            [b'<', hex @ .., b'>'] => decode_hex(hex).map_err(|e| format!("bad /Contents hex: {}", e)),
            _ => Err("/ByteRange gap is not the /Contents hex string".to_string()),
        }
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} {} {} {}]", self.offset1, self.length1, self.offset2, self.length2)
    }
}
