//! X.509 certificates and trust anchors.
//!
//! [`Certificate`] keeps the fields policy and chain checks look at, plus the
//! raw DER so signatures can be checked against an issuer later.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use x509_parser::extensions::ParsedExtension;
use x509_parser::error::PEMError;
use x509_parser::pem::Pem;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Key usage bit flags, bit `i` being X.509 KeyUsage bit `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyUsageBits(pub u16);

impl KeyUsageBits {
    /// Bit 0, digitalSignature.
    pub fn digital_signature(self) -> bool {
        self.0 & 0x1 != 0
    }

    /// Bit 1, nonRepudiation (contentCommitment).
    pub fn non_repudiation(self) -> bool {
        self.0 & 0x2 != 0
    }

    /// No bit set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A parsed, immutable X.509 certificate.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    subject_raw: Vec<u8>,
    issuer_raw: Vec<u8>,
    serial: Vec<u8>,
    common_name: Option<String>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    key_usage: Option<KeyUsageBits>,
    critical_extensions: BTreeSet<String>,
    subject_key_id: Option<Vec<u8>>,
    public_key: Vec<u8>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("not_after", &self.not_after)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, x509) = X509Certificate::from_der(der).map_err(|e| Error::Certificate(e.to_string()))?;

        let key_usage = x509
            .key_usage()
            .map_err(|e| Error::Certificate(format!("bad key usage extension: {}", e)))?
            .map(|ext| KeyUsageBits(ext.value.flags));
        let critical_extensions = x509
            .extensions()
            .iter()
            .filter(|ext| ext.critical)
            .map(|ext| ext.oid.to_id_string())
            .collect();
        let subject_key_id = x509.extensions().iter().find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::SubjectKeyIdentifier(kid) => Some(kid.0.to_vec()),
            _ => None,
        });
        let common_name = x509
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);

        Ok(Self {
            der: der.to_vec(),
            subject: x509.subject().to_string(),
            issuer: x509.issuer().to_string(),
            subject_raw: x509.subject().as_raw().to_vec(),
            issuer_raw: x509.issuer().as_raw().to_vec(),
            serial: x509.raw_serial().to_vec(),
            common_name,
            not_before: timestamp(x509.validity().not_before.timestamp())?,
            not_after: timestamp(x509.validity().not_after.timestamp())?,
            key_usage,
            critical_extensions,
            subject_key_id,
            public_key: x509.public_key().raw.to_vec(),
        })
    }

    /// Parse every certificate in a PEM bundle, or a single DER certificate.
    pub fn parse_all(bytes: &[u8]) -> Result<Vec<Self>> {
        if !looks_like_pem(bytes) {
            return Ok(vec![Self::from_der(bytes)?]);
        }
        let mut certs = Vec::new();
        for pem in Pem::iter_from_buffer(bytes) {
            let pem = match pem {
                Ok(pem) => pem,
                Err(PEMError::MissingHeader) => break,
                Err(e) => return Err(Error::Certificate(format!("bad PEM block: {}", e))),
            };
            if pem.label == "CERTIFICATE" || pem.label == "TRUSTED CERTIFICATE" {
                certs.push(Self::from_der(&pem.contents)?);
            }
        }
        Ok(certs)
    }

    /// Raw DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name (RFC 4514 style).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// First subject common name, if any.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Raw big-endian serial number.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// End of the validity window.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Key usage flags; `None` when the extension is absent.
    pub fn key_usage(&self) -> Option<KeyUsageBits> {
        self.key_usage
    }

    /// OIDs (dotted form) of every extension marked critical.
    pub fn critical_extensions(&self) -> &BTreeSet<String> {
        &self.critical_extensions
    }

    /// Subject key identifier, if present.
    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.subject_key_id.as_deref()
    }

    /// DER SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key
    }

    /// Subject and issuer names are byte-identical.
    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    /// `issuer` is named as this certificate's issuer.
    pub fn names_issuer(&self, issuer: &Certificate) -> bool {
        self.issuer_raw == issuer.subject_raw
    }

    /// Check this certificate's signature with `issuer`'s public key.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> std::result::Result<(), String> {
        let (_, child) = X509Certificate::from_der(&self.der).map_err(|e| e.to_string())?;
        let (_, parent) = X509Certificate::from_der(&issuer.der).map_err(|e| e.to_string())?;
        child
            .verify_signature(Some(parent.public_key()))
            .map_err(|e| e.to_string())
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| Error::Certificate(format!("validity timestamp out of range: {}", secs)))
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    bytes.windows(11).any(|w| w == b"-----BEGIN ")
}

/// Certificates a verifier trusts as chain terminators.
///
/// Merged by the caller from platform stores and/or files; lookups go by
/// subject name as in an OpenSSL store.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchors {
    by_subject: HashMap<Vec<u8>, Vec<Certificate>>,
    count: usize,
}

impl TrustAnchors {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a certificate; exact duplicates are ignored.
    pub fn add(&mut self, cert: Certificate) {
        let bucket = self.by_subject.entry(cert.subject_raw.clone()).or_default();
        if !bucket.contains(&cert) {
            bucket.push(cert);
            self.count += 1;
        }
    }

    /// Add every certificate in a PEM bundle or DER file.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let certs = Certificate::parse_all(&bytes)
            .map_err(|e| Error::Certificate(format!("{}: {}", path.display(), e)))?;
        let added = certs.len();
        for cert in certs {
            self.add(cert);
        }
        log::debug!("loaded {} trust anchor(s) from {}", added, path.display());
        Ok(added)
    }

    /// Load several files into a new set.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut anchors = Self::new();
        for path in paths {
            anchors.add_file(path)?;
        }
        Ok(anchors)
    }

    /// Exact (DER) membership.
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.by_subject
            .get(&cert.subject_raw)
            .is_some_and(|bucket| bucket.contains(cert))
    }

    /// Anchors whose subject matches `cert`'s issuer name.
    pub fn issuers_of<'s>(&'s self, cert: &Certificate) -> impl Iterator<Item = &'s Certificate> + 's {
        self.by_subject.get(&cert.issuer_raw).into_iter().flatten()
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when no anchor is loaded.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl FromIterator<Certificate> for TrustAnchors {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        let mut anchors = Self::new();
        for cert in iter {
            anchors.add(cert);
        }
        anchors
    }
}
