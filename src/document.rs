//! In-memory PDF document model.
//!
//! Verification works on the exact bytes that were signed, so the document is
//! always a borrowed byte slice and is never mutated.

use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::objstm::ObjectStream;
use crate::parser::parse_indirect_object;
use crate::xref::{find_xref_offset, parse_xref_chain, CrossRefTable, XRefEntryType};
use std::collections::{HashMap, HashSet};

/// Maximum recursion depth for object resolution
const MAX_RECURSION_DEPTH: u32 = 100;

/// A parsed PDF document over a borrowed byte buffer.
///
/// # Example
///
/// ```no_run
/// use pdf_sigcheck::document::PdfDocument;
///
/// let bytes = std::fs::read("signed.pdf")?;
/// let mut doc = PdfDocument::from_bytes(&bytes)?;
/// let catalog = doc.catalog()?;
/// assert!(catalog.as_dict().is_some());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PdfDocument<'a> {
    data: &'a [u8],
    version: (u8, u8),
    xref: CrossRefTable,
    trailer: Dict,
    object_cache: HashMap<ObjectRef, Object>,
    stream_cache: HashMap<u32, ObjectStream>,
    resolving: HashSet<ObjectRef>,
    depth: u32,
}

impl std::fmt::Debug for PdfDocument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("len", &self.data.len())
            .field("version", &self.version)
            .field("xref_entries", &self.xref.len())
            .field("xref_sections", &self.xref.sections().len())
            .finish_non_exhaustive()
    }
}

impl<'a> PdfDocument<'a> {
    /// Parse the header, the cross-reference chain and the trailer.
    ///
    /// Any failure here is document-level: the file is malformed, truncated or
    /// encrypted and no signature in it can be examined.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
        let version = parse_header(data)?;
        let start = find_xref_offset(data)?;
        let xref = parse_xref_chain(data, start)?;
        let trailer = xref
            .trailer()
            .cloned()
            .ok_or_else(|| Error::InvalidPdf("no trailer dictionary".to_string()))?;

        if trailer.contains_key("Encrypt") {
            return Err(Error::Unsupported("encrypted documents".to_string()));
        }
        if !trailer.contains_key("Root") {
            return Err(Error::InvalidPdf("Trailer missing /Root entry".to_string()));
        }

        log::debug!(
            "opened PDF {}.{}: {} bytes, {} xref section(s), {} objects",
            version.0,
            version.1,
            data.len(),
            xref.sections().len(),
            xref.len()
        );

        Ok(Self {
            data,
            version,
            xref,
            trailer,
            object_cache: HashMap::new(),
            stream_cache: HashMap::new(),
            resolving: HashSet::new(),
            depth: 0,
        })
    }

    /// PDF version from the header.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// The bytes this document was parsed from.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Newest trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Number of cross-reference sections reached through `/Prev`.
    pub fn xref_section_count(&self) -> usize {
        self.xref.sections().len()
    }

    /// Load an indirect object, following the newest xref entry for it.
    pub fn load_object(&mut self, obj_ref: ObjectRef) -> Result<Object> {
        if let Some(cached) = self.object_cache.get(&obj_ref) {
            return Ok(cached.clone());
        }
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(Error::RecursionLimitExceeded(MAX_RECURSION_DEPTH));
        }
        if !self.resolving.insert(obj_ref) {
            return Err(Error::CircularReference(obj_ref));
        }

        self.depth += 1;
        let result = self.load_uncached(obj_ref);
        self.depth -= 1;
        self.resolving.remove(&obj_ref);

        let object = result?;
        self.object_cache.insert(obj_ref, object.clone());
        Ok(object)
    }

    fn load_uncached(&mut self, obj_ref: ObjectRef) -> Result<Object> {
        let entry = self
            .xref
            .get(obj_ref.id)
            .cloned()
            .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))?;

        match entry.entry_type {
            XRefEntryType::Uncompressed => self.load_uncompressed(obj_ref, entry.offset),
            XRefEntryType::Compressed => {
                let stream_num =
                    u32::try_from(entry.offset).map_err(|_| Error::ObjectNotFound(obj_ref.id, obj_ref.gen))?;
                self.load_compressed(obj_ref, stream_num, entry.generation)
            },
            XRefEntryType::Free => Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen)),
        }
    }

    fn load_uncompressed(&self, obj_ref: ObjectRef, offset: u64) -> Result<Object> {
        let start = usize::try_from(offset).map_err(|_| Error::ObjectNotFound(obj_ref.id, obj_ref.gen))?;
        let slice = self.data.get(start..).ok_or(Error::UnexpectedEof)?;
        let (_, (found, object)) = parse_indirect_object(slice).map_err(|e| Error::ParseError {
            offset: start,
            reason: format!("object {}: {}", obj_ref, e),
        })?;
        if found.id != obj_ref.id {
            return Err(Error::ParseError {
                offset: start,
                reason: format!("expected object {}, found {}", obj_ref, found),
            });
        }
        Ok(object)
    }

    fn load_compressed(&mut self, obj_ref: ObjectRef, stream_num: u32, index: u16) -> Result<Object> {
        if !self.stream_cache.contains_key(&stream_num) {
            let stream = self.load_object(ObjectRef::new(stream_num, 0))?;
            let parsed = ObjectStream::parse(&stream)?;
            log::debug!("object stream {} holds {} objects", stream_num, parsed.len());
            self.stream_cache.insert(stream_num, parsed);
        }
        self.stream_cache
            .get(&stream_num)
            .and_then(|s| s.get(index as usize, obj_ref.id))
            .cloned()
            .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))
    }

    /// Dereference `obj` if it is a reference; otherwise return a copy.
    pub fn resolve(&mut self, obj: &Object) -> Result<Object> {
        match obj {
            Object::Reference(r) => self.load_object(*r),
            other => Ok(other.clone()),
        }
    }

    /// Dereference `obj` and require a dictionary (or stream dictionary).
    pub fn resolve_dict(&mut self, obj: &Object) -> Result<Dict> {
        let resolved = self.resolve(obj)?;
        match resolved {
            Object::Dictionary(d) => Ok(d),
            Object::Stream { dict, .. } => Ok(dict),
            other => Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// The document catalog (trailer /Root).
    pub fn catalog(&mut self) -> Result<Object> {
        let root = self
            .trailer
            .get("Root")
            .cloned()
            .ok_or_else(|| Error::InvalidPdf("Trailer missing /Root entry".to_string()))?;
        let catalog = self.resolve(&root)?;
        if catalog.as_dict().is_none() {
            return Err(Error::InvalidPdf("/Root is not a dictionary".to_string()));
        }
        Ok(catalog)
    }
}

/// Parse the `%PDF-M.m` header, allowing leading garbage in the first KB.
pub fn parse_header(data: &[u8]) -> Result<(u8, u8)> {
    let window = &data[..data.len().min(1024)];
    let pos = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| Error::InvalidHeader(String::from_utf8_lossy(&data[..data.len().min(8)]).into_owned()))?;

    let version = &data[pos + 5..];
    match version {
        [major, b'.', minor, ..] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Ok((major - b'0', minor - b'0'))
        },
        _ => Err(Error::InvalidHeader(
            String::from_utf8_lossy(&data[pos..data.len().min(pos + 8)]).into_owned(),
        )),
    }
}
