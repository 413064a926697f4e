//! Signature field discovery in the interactive form.
//!
//! Fields live under catalog `/AcroForm /Fields`, nested through `/Kids`.
//! A field's fully qualified name joins the partial `/T` names of its
//! ancestors with `.`; `/FT` is inherited.

use crate::document::PdfDocument;
use crate::error::Result;
use crate::object::{Dict, Object, ObjectRef};
use std::collections::HashSet;

/// Deepest field hierarchy walked.
const MAX_FIELD_DEPTH: usize = 32;

/// The `/V` entry of a signature field.
#[derive(Debug, Clone)]
pub enum SignatureValue {
    /// No `/V`: the field is waiting to be signed
    Unsigned,
    /// The signature dictionary
    Signed(Dict),
    /// `/V` is present but does not resolve to a dictionary
    Unreadable(String),
}

/// A `/FT /Sig` form field.
#[derive(Debug, Clone)]
pub struct FormSignature {
    /// Fully qualified field name
    pub name: String,
    /// The field value
    pub signature: SignatureValue,
}

impl FormSignature {
    /// True when the field has a `/V`, readable or not.
    pub fn is_signed(&self) -> bool {
        !matches!(self.signature, SignatureValue::Unsigned)
    }
}

/// Enumerate every signature field in document order.
///
/// A document without an interactive form has no fields. Unreadable field
/// objects are skipped with a warning; only a broken catalog is an error.
pub fn signature_fields(doc: &mut PdfDocument<'_>) -> Result<Vec<FormSignature>> {
    let catalog = doc.catalog()?;
    let Some(acroform) = catalog.as_dict().and_then(|d| d.get("AcroForm")).cloned() else {
        log::debug!("document has no /AcroForm");
        return Ok(Vec::new());
    };
    let form = match doc.resolve_dict(&acroform) {
        Ok(form) => form,
        Err(e) => {
            log::warn!("unreadable /AcroForm: {}", e);
            return Ok(Vec::new());
        },
    };
    let fields = match form.get("Fields").map(|f| doc.resolve(f)).transpose()? {
        Some(Object::Array(fields)) => fields,
        _ => return Ok(Vec::new()),
    };

    let mut walker = FieldWalker {
        visited: HashSet::new(),
        found: Vec::new(),
    };
    for field in &fields {
        walker.walk(doc, field, "", None, 0);
    }
    log::debug!("found {} signature field(s)", walker.found.len());
    Ok(walker.found)
}

struct FieldWalker {
    visited: HashSet<ObjectRef>,
    found: Vec<FormSignature>,
}

impl FieldWalker {
    fn walk(&mut self, doc: &mut PdfDocument<'_>, field: &Object, parent: &str, inherited_ft: Option<&str>, depth: usize) {
        if depth > MAX_FIELD_DEPTH {
            log::warn!("form field hierarchy deeper than {}, stopping", MAX_FIELD_DEPTH);
            return;
        }
        if let Object::Reference(r) = field {
            if !self.visited.insert(*r) {
                log::warn!("form field {} visited twice, skipping", r);
                return;
            }
        }
        let dict = match doc.resolve_dict(field) {
            Ok(dict) => dict,
            Err(e) => {
                log::warn!("skipping unreadable form field: {}", e);
                return;
            },
        };

        let name = match dict.get("T").and_then(|t| t.as_text()) {
            Some(partial) if parent.is_empty() => partial,
            Some(partial) => format!("{}.{}", parent, partial),
            None => parent.to_string(),
        };
        let ft = dict.get("FT").and_then(|o| o.as_name()).or(inherited_ft).map(str::to_string);

        let kids = dict
            .get("Kids")
            .and_then(|k| doc.resolve(k).ok())
            .and_then(|k| k.as_array().cloned())
            .unwrap_or_default();
        // Kids without /T are widget annotations of this field, not child fields.
        let child_fields: Vec<Object> = kids
            .into_iter()
            .filter(|kid| doc.resolve_dict(kid).map(|d| d.contains_key("T")).unwrap_or(false))
            .collect();

        if !child_fields.is_empty() {
            for kid in &child_fields {
                self.walk(doc, kid, &name, ft.as_deref(), depth + 1);
            }
            return;
        }

        if ft.as_deref() != Some("Sig") {
            return;
        }
        let signature = match dict.get("V") {
            Some(Object::Null) | None => SignatureValue::Unsigned,
            Some(v) => match doc.resolve_dict(v) {
                Ok(sig) => SignatureValue::Signed(sig),
                Err(e) => {
                    log::warn!("signature field '{}' has unreadable /V: {}", name, e);
                    SignatureValue::Unreadable(e.to_string())
                },
            },
        };
        self.found.push(FormSignature { name, signature });
    }
}
