//! Digital signature types and data structures.

use super::byterange::ByteRange;
use chrono::{DateTime, Utc};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;

/// Digest algorithm declared by a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    /// SHA-1 (deprecated, but still common in legacy PDFs)
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Look an algorithm up by dotted OID.
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            "1.3.14.3.2.26" => Some(DigestAlgorithm::Sha1),
            "2.16.840.1.101.3.4.2.1" => Some(DigestAlgorithm::Sha256),
            "2.16.840.1.101.3.4.2.2" => Some(DigestAlgorithm::Sha384),
            "2.16.840.1.101.3.4.2.3" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Dotted OID.
    pub fn oid(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "1.3.14.3.2.26",
            DigestAlgorithm::Sha256 => "2.16.840.1.101.3.4.2.1",
            DigestAlgorithm::Sha384 => "2.16.840.1.101.3.4.2.2",
            DigestAlgorithm::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Hash `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signature sub-filter type (signature format).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureSubFilter {
    /// adbe.pkcs7.detached - PKCS#7 detached signature
    Pkcs7Detached,
    /// adbe.pkcs7.sha1 - PKCS#7 over the SHA-1 digest of the range
    Pkcs7Sha1,
    /// ETSI.CAdES.detached - PAdES CAdES signature
    CadesDetached,
    /// ETSI.RFC3161 - Document timestamp
    Rfc3161,
}

impl SignatureSubFilter {
    /// Get the PDF name for this sub-filter.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SignatureSubFilter::Pkcs7Detached => "adbe.pkcs7.detached",
            SignatureSubFilter::Pkcs7Sha1 => "adbe.pkcs7.sha1",
            SignatureSubFilter::CadesDetached => "ETSI.CAdES.detached",
            SignatureSubFilter::Rfc3161 => "ETSI.RFC3161",
        }
    }

    /// Parse a PDF name into a sub-filter type.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "adbe.pkcs7.detached" => Some(SignatureSubFilter::Pkcs7Detached),
            "adbe.pkcs7.sha1" => Some(SignatureSubFilter::Pkcs7Sha1),
            "ETSI.CAdES.detached" => Some(SignatureSubFilter::CadesDetached),
            "ETSI.RFC3161" => Some(SignatureSubFilter::Rfc3161),
            _ => None,
        }
    }
}

/// DocMDP certification level (`/TransformParams /P`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificationLevel {
    /// Approval signature
    #[default]
    NotCertified,
    /// P = 1
    NoChangesAllowed,
    /// P = 2
    FormFilling,
    /// P = 3
    FormFillingAndAnnotations,
}

impl CertificationLevel {
    /// Level for a `/P` value; values outside 1..=3 mean P = 2.
    pub fn from_permission(p: i64) -> Self {
        match p {
            1 => CertificationLevel::NoChangesAllowed,
            3 => CertificationLevel::FormFillingAndAnnotations,
            _ => CertificationLevel::FormFilling,
        }
    }

    /// True for any certifying signature.
    pub fn is_certified(&self) -> bool {
        *self != CertificationLevel::NotCertified
    }
}

impl fmt::Display for CertificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CertificationLevel::NotCertified => "not certified",
            CertificationLevel::NoChangesAllowed => "no changes allowed",
            CertificationLevel::FormFilling => "form filling",
            CertificationLevel::FormFillingAndAnnotations => "form filling and annotations",
        })
    }
}

/// A located signature field.
#[derive(Debug, Clone)]
pub struct SignatureField {
    /// Fully qualified field name
    pub name: String,
    /// Signed spans of the file
    pub byte_range: ByteRange,
    /// 1-based save revision the signature was produced in
    pub revision_index: usize,
    /// Revisions in the file being examined
    pub total_revisions: usize,
    /// No other signature in the file covers more of it
    pub is_last_signature: bool,
    /// The second span ends at the end of the file
    pub covers_whole_document: bool,
    /// `/M` from the signature dictionary
    pub signing_time: Option<DateTime<Utc>>,
    /// `/SubFilter`, if recognised
    pub sub_filter: Option<SignatureSubFilter>,
    /// `/Name`
    pub signer_name: Option<String>,
    /// `/Reason`
    pub reason: Option<String>,
    /// `/Location`
    pub location: Option<String>,
    /// DocMDP level when this is a certification signature
    pub certification_level: CertificationLevel,
    /// Decoded `/Contents`
    pub contents: Vec<u8>,
}

/// Status code for one signature, higher is worse.
///
/// Codes of 100 and above are errors, 10 to 99 warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValidationCode {
    /// Signature and chain are fine
    Valid = 0,
    /// No timestamp token: time comes from the signer's clock
    NoTimestampToken = 40,
    /// Issuer chain does not reach a trust anchor
    CertificateCantBeVerified = 60,
    /// A chain certificate has expired
    CertificateExpired = 61,
    /// A chain certificate is not yet valid
    CertificateNotYetValid = 62,
    /// A chain certificate was reported revoked
    CertificateRevoked = 63,
    /// A chain certificate has an unsupported critical extension
    CertificateUnsupportedCriticalExtension = 64,
    /// Some other chain problem
    CertificateProblem = 66,
    /// Content was appended after the last signature
    UnsignedContent = 70,
    /// Changes were made after a certifying signature
    CertificationBroken = 110,
    /// The signed revision was altered or the signature is invalid
    RevisionModified = 120,
}

impl ValidationCode {
    /// Numeric value.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Code of 100 or more.
    pub fn is_error(self) -> bool {
        self.code() >= 100
    }

    /// Code between 10 and 99.
    pub fn is_warning(self) -> bool {
        (10..100).contains(&self.code())
    }

    /// Code for a chain failure message, by its leading words.
    pub fn for_chain_failure(message: &str) -> Self {
        let message = message.trim().to_ascii_lowercase();
        if message.starts_with(super::chain::CANT_BE_VERIFIED) {
            ValidationCode::CertificateCantBeVerified
        } else if message.starts_with(super::chain::EXPIRED) {
            ValidationCode::CertificateExpired
        } else if message.starts_with(super::chain::NOT_YET_VALID) {
            ValidationCode::CertificateNotYetValid
        } else if message.starts_with(super::revocation::REVOKED) {
            ValidationCode::CertificateRevoked
        } else if message.starts_with(super::chain::UNSUPPORTED_CRITICAL_EXTENSION) {
            ValidationCode::CertificateUnsupportedCriticalExtension
        } else {
            ValidationCode::CertificateProblem
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValidationCode::Valid => "signature valid",
            ValidationCode::NoTimestampToken => "no timestamp token",
            ValidationCode::CertificateCantBeVerified => "certificate can't be verified",
            ValidationCode::CertificateExpired => "certificate expired",
            ValidationCode::CertificateNotYetValid => "certificate not yet valid",
            ValidationCode::CertificateRevoked => "certificate revoked",
            ValidationCode::CertificateUnsupportedCriticalExtension => "unsupported critical extension",
            ValidationCode::CertificateProblem => "certificate problem",
            ValidationCode::UnsignedContent => "unsigned content after signature",
            ValidationCode::CertificationBroken => "certification broken",
            ValidationCode::RevisionModified => "signed revision modified",
        };
        write!(f, "{} ({})", text, self.code())
    }
}

/// Outcome of verifying one signature field. Built once, never changed.
#[derive(Debug, Clone)]
pub struct SignatureVerification {
    /// Field name
    pub name: String,
    /// Signer certificate subject, when the signature could be parsed
    pub subject: Option<String>,
    /// Signed signing-time attribute, else `/M`
    pub signing_time: Option<DateTime<Utc>>,
    /// 1-based save revision
    pub revision_index: usize,
    /// Revisions in the examined file
    pub total_revisions: usize,
    /// Signature is the newest one in the file
    pub is_last_signature: bool,
    /// The signed range reaches the end of the file
    pub covers_whole_document: bool,
    /// Digest mismatch, bad signature value, or unparseable container
    pub modified: bool,
    /// Chain problems in the order found; empty means a clean chain
    pub chain_failures: Vec<String>,
    /// DocMDP level
    pub certification_level: CertificationLevel,
    /// An RFC 3161 timestamp token is attached
    pub timestamp_token_present: bool,
    /// The container carries a CRL
    pub crl_present: bool,
    /// The container carries an archived OCSP response
    pub ocsp_present: bool,
    /// The signer certificate is itself a trust anchor, valid at the check time
    pub signer_directly_trusted: bool,
    /// Declared digest algorithm
    pub digest_algorithm: Option<DigestAlgorithm>,
    /// Signature format
    pub sub_filter: Option<SignatureSubFilter>,
    /// `/Name`
    pub signer_name: Option<String>,
    /// `/Reason`
    pub reason: Option<String>,
    /// `/Location`
    pub location: Option<String>,
}

impl SignatureVerification {
    /// Result for a field whose signature could not be examined at all.
    pub fn unverifiable(field: &SignatureField, reason: impl Into<String>) -> Self {
        Self {
            name: field.name.clone(),
            subject: None,
            signing_time: field.signing_time,
            revision_index: field.revision_index,
            total_revisions: field.total_revisions,
            is_last_signature: field.is_last_signature,
            covers_whole_document: field.covers_whole_document,
            modified: true,
            chain_failures: vec![reason.into()],
            certification_level: field.certification_level,
            timestamp_token_present: false,
            crl_present: false,
            ocsp_present: false,
            signer_directly_trusted: false,
            digest_algorithm: None,
            sub_filter: field.sub_filter,
            signer_name: field.signer_name.clone(),
            reason: field.reason.clone(),
            location: field.location.clone(),
        }
    }

    /// Result for a signed field that could not be located in the file.
    pub fn unlocatable(name: impl Into<String>, total_revisions: usize, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject: None,
            signing_time: None,
            revision_index: 0,
            total_revisions,
            is_last_signature: false,
            covers_whole_document: false,
            modified: true,
            chain_failures: vec![reason.into()],
            certification_level: CertificationLevel::NotCertified,
            timestamp_token_present: false,
            crl_present: false,
            ocsp_present: false,
            signer_directly_trusted: false,
            digest_algorithm: None,
            sub_filter: None,
            signer_name: None,
            reason: None,
            location: None,
        }
    }

    /// Status code for this signature.
    pub fn validation_code(&self) -> ValidationCode {
        let level = self.certification_level;
        if self.modified {
            ValidationCode::RevisionModified
        } else if !self.is_last_signature && level == CertificationLevel::NoChangesAllowed {
            ValidationCode::CertificationBroken
        } else if self.is_last_signature && !self.covers_whole_document && level.is_certified() {
            ValidationCode::CertificationBroken
        } else if self.is_last_signature && !self.covers_whole_document {
            ValidationCode::UnsignedContent
        } else if let Some(first) = self.chain_failures.first() {
            ValidationCode::for_chain_failure(first)
        } else if !self.timestamp_token_present {
            ValidationCode::NoTimestampToken
        } else {
            ValidationCode::Valid
        }
    }

    /// Not modified and the chain validated.
    pub fn passed(&self) -> bool {
        !self.modified && self.chain_failures.is_empty()
    }
}
