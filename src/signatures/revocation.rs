//! Revocation extension point.
//!
//! No checker is installed by default. A caller that has CRLs or an OCSP
//! client plugs one in through [`VerifierOptions`](super::VerifierOptions).

use crate::certificate::Certificate;
use chrono::{DateTime, Utc};

/// Prefix of chain failures reported for revoked certificates.
pub const REVOKED: &str = "revoked";

/// What a checker knows about one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationStatus {
    /// Not revoked at the given time
    Good,
    /// Revoked, with the checker's explanation
    Revoked(String),
    /// No revocation information available
    Unknown,
}

/// Looks up revocation status for chain certificates.
pub trait RevocationChecker: Send + Sync {
    /// Status of `cert` (issued by `issuer`) at time `at`.
    fn status(&self, cert: &Certificate, issuer: &Certificate, at: DateTime<Utc>) -> RevocationStatus;
}

/// Checker backed by a fixed list of revoked serial numbers.
#[derive(Debug, Clone, Default)]
pub struct RevokedSerials {
    serials: Vec<Vec<u8>>,
}

impl RevokedSerials {
    /// Revoke the given raw serial numbers.
    pub fn new(serials: Vec<Vec<u8>>) -> Self {
        Self { serials }
    }
}

impl RevocationChecker for RevokedSerials {
    fn status(&self, cert: &Certificate, _issuer: &Certificate, _at: DateTime<Utc>) -> RevocationStatus {
        if self.serials.iter().any(|s| s == cert.serial()) {
            RevocationStatus::Revoked(format!("serial listed as revoked for {}", cert.subject()))
        } else {
            RevocationStatus::Good
        }
    }
}
