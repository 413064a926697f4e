// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::manual_find)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Sigcheck
//!
//! Verification of digitally signed PDF documents across incremental
//! revisions, and keystore key selection for signing.
//!
//! ## Core Features
//!
//! ### Verification
//! - **Revision Location**: maps every signature to the incremental save it
//!   signed and counts the saves in the file (ISO 32000-1:2008 §7.5.6)
//! - **Integrity**: checks the CMS message digest over the `/ByteRange` spans
//!   and the signer's RSA signature (RFC 5652)
//! - **Certificate Chains**: builds the signer's chain to configured trust
//!   anchors, checking validity periods and critical extensions
//! - **Document Runs**: verifies every signature of a document, with
//!   fail-fast and process exit codes for batch tools
//!
//! ### Signing Support
//! - **Certificate Policy**: validity, key usage and critical extension checks
//! - **Key Selection**: picks keystore aliases usable for signing, trying
//!   no password, an empty password, then the supplied one
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_sigcheck::{VerificationRun, VerifierConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerifierConfig::new().with_trust_anchor_file("ca.pem");
//! let run = VerificationRun::from_config(&config)?;
//!
//! let bytes = std::fs::read("signed.pdf")?;
//! let report = run.run(&bytes)?;
//! for result in &report.results {
//!     println!("{}: {}", result.name, result.validation_code());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod xref;

// Stream decoders
pub mod decoders;

// Forms and dates
pub mod acroform;
pub mod date;

// Certificates and keys
pub mod certificate;
pub mod keystore;
pub mod policy;

// Signatures
pub mod revision;
pub mod run;
pub mod signatures;

// Configuration
pub mod config;

// Re-exports
pub use certificate::{Certificate, TrustAnchors};
pub use config::VerifierConfig;
pub use document::PdfDocument;
pub use error::{Error, Result};
pub use keystore::{KeyAliasSelector, Keystore, KeystoreEntry, PemKeystore};
pub use policy::{AcceptancePolicy, CertificatePolicyFilter};
pub use revision::RevisionLocator;
pub use run::{RunReport, VerificationRun};
pub use signatures::{SignatureField, SignatureVerification, SignatureVerifier, ValidationCode};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
