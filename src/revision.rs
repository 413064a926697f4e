//! Incremental revisions and signature field location.
//!
//! Every incremental save appends objects, an xref section, `startxref` and a
//! `%%EOF` marker. A signature belongs to the save whose bytes its
//! `/ByteRange` ends in; the bytes of that save are the file truncated at the
//! end of the range.

use crate::acroform::{signature_fields, FormSignature, SignatureValue};
use crate::date::parse_pdf_date;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Dict, Object};
use crate::signatures::{ByteRange, CertificationLevel, SignatureField, SignatureSubFilter};

const EOF_MARKER: &[u8] = b"%%EOF";
const STARTXREF: &[u8] = b"startxref";

/// End offsets of the incremental saves in a file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Revisions {
    ends: Vec<usize>,
    markers: Vec<usize>,
}

impl Revisions {
    /// Find every save in `data`.
    ///
    /// A save is a `%%EOF` marker with a `startxref` keyword between it and
    /// the previous save. The save ends after the marker and one optional
    /// end-of-line.
    pub fn scan(data: &[u8]) -> Self {
        let mut revisions = Self::default();
        let mut block_start = 0;
        let mut pos = 0;
        let mut searched = 0;
        let mut last_startxref: Option<usize> = None;

        while let Some(found) = find(&data[pos..], EOF_MARKER) {
            let marker = pos + found;
            let marker_end = marker + EOF_MARKER.len();
            if let Some(at) = rfind(&data[searched..marker], STARTXREF) {
                last_startxref = Some(searched + at);
            }
            searched = marker;
            if last_startxref.is_some_and(|at| at >= block_start) {
                let end = marker_end + eol_len(&data[marker_end..]);
                revisions.markers.push(marker_end);
                revisions.ends.push(end);
                block_start = end;
            }
            pos = marker_end;
        }

        log::debug!("found {} revision(s) in {} bytes", revisions.ends.len(), data.len());
        revisions
    }

    /// Number of saves.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// True when no save marker was found.
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// End offset of 1-based revision `index`.
    pub fn end_of(&self, index: usize) -> Option<usize> {
        index.checked_sub(1).and_then(|i| self.ends.get(i)).copied()
    }

    /// 1-based revision a range ending at `offset` was signed in: the number
    /// of saves whose marker lies entirely before `offset`.
    pub fn index_for(&self, offset: usize) -> usize {
        self.markers.iter().take_while(|m| **m <= offset).count()
    }

    /// Bytes of 1-based revision `index`.
    pub fn extract<'d>(&self, data: &'d [u8], index: usize) -> Option<&'d [u8]> {
        self.end_of(index).and_then(|end| data.get(..end))
    }
}

/// Number of incremental saves in `data`.
pub fn total_revisions(data: &[u8]) -> usize {
    Revisions::scan(data).len()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn eol_len(rest: &[u8]) -> usize {
    match rest {
        [b'\r', b'\n', ..] => 2,
        [b'\r', ..] | [b'\n', ..] => 1,
        _ => 0,
    }
}

/// Every signed field of a document, located.
#[derive(Debug)]
pub struct LocatedFields {
    /// Saves in the whole file
    pub total_revisions: usize,
    /// Signed fields in form order with their location result
    pub fields: Vec<(String, Result<SignatureField>)>,
}

/// Finds signature fields and the revisions they belong to.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevisionLocator;

impl RevisionLocator {
    /// Locate the signed field `field_name`.
    pub fn locate(data: &[u8], field_name: &str) -> Result<SignatureField> {
        let located = Self::locate_all(data)?;
        located
            .fields
            .into_iter()
            .find(|(name, _)| name == field_name)
            .map(|(_, field)| field)
            .unwrap_or_else(|| Err(Error::field(field_name, "missing signature dictionary")))
    }

    /// Locate every signed field.
    ///
    /// The outer error is document-level: the file cannot be parsed. Each
    /// field carries its own result so one bad field does not hide the rest.
    pub fn locate_all(data: &[u8]) -> Result<LocatedFields> {
        let mut doc = PdfDocument::from_bytes(data)?;
        let revisions = Revisions::scan(data);
        let forms = signature_fields(&mut doc)?;

        let mut fields: Vec<(String, Result<SignatureField>)> = forms
            .into_iter()
            .filter(FormSignature::is_signed)
            .map(|form| {
                let field = locate_field(&mut doc, &revisions, &form);
                if let Err(e) = &field {
                    log::warn!("{}", e);
                }
                (form.name, field)
            })
            .collect();

        let last_end = fields
            .iter()
            .filter_map(|(_, f)| f.as_ref().ok())
            .map(|f| f.byte_range.end())
            .max();
        for field in fields.iter_mut().filter_map(|(_, f)| f.as_mut().ok()) {
            field.is_last_signature = Some(field.byte_range.end()) == last_end;
        }

        Ok(LocatedFields {
            total_revisions: revisions.len(),
            fields,
        })
    }

    /// Names of the signed fields, in form order.
    pub fn signature_names(data: &[u8]) -> Result<Vec<String>> {
        let mut doc = PdfDocument::from_bytes(data)?;
        Ok(signature_fields(&mut doc)?
            .into_iter()
            .filter(FormSignature::is_signed)
            .map(|f| f.name)
            .collect())
    }

    /// The bytes of the revision `field_name` signed.
    pub fn extract_revision<'d>(data: &'d [u8], field_name: &str) -> Result<&'d [u8]> {
        let field = Self::locate(data, field_name)?;
        data.get(..field.byte_range.end())
            .ok_or_else(|| Error::field(field_name, "revision extends past end of file"))
    }
}

fn locate_field(doc: &mut PdfDocument<'_>, revisions: &Revisions, form: &FormSignature) -> Result<SignatureField> {
    let name = form.name.as_str();
    let data = doc.data();
    let dict = match &form.signature {
        SignatureValue::Signed(dict) => dict,
        SignatureValue::Unreadable(reason) => {
            return Err(Error::field(name, format!("unreadable signature dictionary: {}", reason)))
        },
        SignatureValue::Unsigned => return Err(Error::field(name, "missing signature dictionary")),
    };

    let range_obj = dict
        .get("ByteRange")
        .ok_or_else(|| Error::field(name, "signature dictionary has no /ByteRange"))?;
    let range_obj = doc.resolve(range_obj).map_err(|e| Error::field(name, e.to_string()))?;
    let byte_range = ByteRange::from_object(&range_obj).map_err(|e| Error::field(name, e))?;
    byte_range.validate(data.len()).map_err(|e| Error::field(name, e))?;
    let contents = byte_range.contents(data).map_err(|e| Error::field(name, e))?;

    let revision_index = revisions.index_for(byte_range.end());
    if revision_index == 0 {
        return Err(Error::field(
            name,
            format!("no %%EOF marker at or before signed range end {}", byte_range.end()),
        ));
    }

    let text = |key: &str| dict.get(key).and_then(Object::as_text);
    let field = SignatureField {
        name: name.to_string(),
        byte_range,
        revision_index,
        total_revisions: revisions.len(),
        is_last_signature: false,
        covers_whole_document: byte_range.covers(data.len()),
        signing_time: text("M").as_deref().and_then(parse_pdf_date),
        sub_filter: dict
            .get("SubFilter")
            .and_then(Object::as_name)
            .and_then(SignatureSubFilter::from_pdf_name),
        signer_name: text("Name"),
        reason: text("Reason"),
        location: text("Location"),
        certification_level: certification_level(doc, dict),
        contents,
    };
    log::debug!(
        "signature '{}' covers {} in revision {}/{}",
        field.name,
        field.byte_range,
        field.revision_index,
        field.total_revisions
    );
    Ok(field)
}

/// DocMDP level from the signature's `/Reference` entries.
fn certification_level(doc: &mut PdfDocument<'_>, dict: &Dict) -> CertificationLevel {
    let references = match dict.get("Reference").map(|r| doc.resolve(r)) {
        Some(Ok(Object::Array(refs))) => refs,
        _ => return CertificationLevel::NotCertified,
    };
    for reference in &references {
        let Ok(reference) = doc.resolve_dict(reference) else {
            continue;
        };
        if reference.get("TransformMethod").and_then(Object::as_name) != Some("DocMDP") {
            continue;
        }
        let p = reference
            .get("TransformParams")
            .and_then(|tp| doc.resolve_dict(tp).ok())
            .and_then(|tp| tp.get("P").and_then(Object::as_integer))
            .unwrap_or(2);
        return CertificationLevel::from_permission(p);
    }
    CertificationLevel::NotCertified
}
