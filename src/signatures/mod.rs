//! PDF digital signature verification.
//!
//! Handles the signature dictionaries a signer leaves in a PDF: the
//! `/ByteRange` spans, the CMS (PKCS#7) container in `/Contents` and the
//! certificate chain it carries.
//!
//! ## Signature Types Supported
//!
//! - PKCS#7 detached signatures (adbe.pkcs7.detached)
//! - PKCS#7 SHA-1 signatures (adbe.pkcs7.sha1)
//! - PAdES signatures (ETSI.CAdES.detached)
//!
//! RSA PKCS#1 v1.5 signer keys with SHA-1 or SHA-2 digests are verified;
//! anything else is reported as a signature that could not be checked.
//!
//! ## Example
//!
//! ```no_run
//! use pdf_sigcheck::certificate::TrustAnchors;
//! use pdf_sigcheck::revision::RevisionLocator;
//! use pdf_sigcheck::signatures::SignatureVerifier;
//!
//! let bytes = std::fs::read("signed.pdf")?;
//! let field = RevisionLocator::locate(&bytes, "Signature1")?;
//! let anchors = TrustAnchors::from_files(&["ca.pem"])?;
//! let result = SignatureVerifier::new(anchors).verify(&bytes, &field);
//! println!("{}: modified={}", result.name, result.modified);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## PDF Specification Reference
//!
//! - ISO 32000-1:2008 Section 12.8 - Digital Signatures
//! - RFC 5652 - Cryptographic Message Syntax

mod byterange;
pub mod chain;
pub mod revocation;
mod types;
mod verifier;

pub use byterange::ByteRange;
pub use chain::ChainBuilder;
pub use revocation::{RevocationChecker, RevocationStatus, RevokedSerials};
pub use types::{
    CertificationLevel, DigestAlgorithm, SignatureField, SignatureSubFilter, SignatureVerification,
    ValidationCode,
};
pub use verifier::{SignatureVerifier, VerifierOptions, UNPARSEABLE_SIGNATURE};
