//! Certificate acceptance policy.
//!
//! [`CertificatePolicyFilter::accepts`] is a pure function over a
//! certificate, a policy and a point in time. Every failing check is reported,
//! not just the first.

use crate::certificate::Certificate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Key usage.
pub const OID_KEY_USAGE: &str = "2.5.29.15";
/// Subject alternative name.
pub const OID_SUBJECT_ALT_NAME: &str = "2.5.29.17";
/// Basic constraints.
pub const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";
/// Certificate issuer.
pub const OID_CERTIFICATE_ISSUER: &str = "2.5.29.29";
/// Extended key usage.
pub const OID_EXTENDED_KEY_USAGE: &str = "2.5.29.37";

/// Which checks a certificate must pass to be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptancePolicy {
    /// Reject certificates outside their validity window
    pub check_validity: bool,
    /// Reject certificates whose key usage excludes signing
    pub check_key_usage: bool,
    /// Reject certificates with critical extensions not listed below
    pub check_critical_extensions: bool,
    /// Critical extension OIDs (dotted form) this verifier understands
    pub supported_critical_extension_oids: BTreeSet<String>,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            check_validity: true,
            check_key_usage: true,
            check_critical_extensions: true,
            supported_critical_extension_oids: [
                OID_KEY_USAGE,
                OID_SUBJECT_ALT_NAME,
                OID_BASIC_CONSTRAINTS,
                OID_CERTIFICATE_ISSUER,
                OID_EXTENDED_KEY_USAGE,
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl AcceptancePolicy {
    /// A policy that accepts every certificate.
    pub fn permissive() -> Self {
        Self {
            check_validity: false,
            check_key_usage: false,
            check_critical_extensions: false,
            ..Self::default()
        }
    }

    /// Toggle the validity window check.
    pub fn with_validity_check(mut self, enabled: bool) -> Self {
        self.check_validity = enabled;
        self
    }

    /// Toggle the key usage check.
    pub fn with_key_usage_check(mut self, enabled: bool) -> Self {
        self.check_key_usage = enabled;
        self
    }

    /// Toggle the critical extension check.
    pub fn with_critical_extension_check(mut self, enabled: bool) -> Self {
        self.check_critical_extensions = enabled;
        self
    }

    /// Add an understood critical extension OID.
    pub fn with_supported_extension(mut self, oid: impl Into<String>) -> Self {
        self.supported_critical_extension_oids.insert(oid.into());
        self
    }

    /// True when `oid` is listed as understood.
    pub fn supports_extension(&self, oid: &str) -> bool {
        self.supported_critical_extension_oids.contains(oid)
    }
}

/// Why a certificate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reason {
    /// `now` is before notBefore
    NotYetValid,
    /// `now` is after notAfter
    Expired,
    /// Key usage present but neither digitalSignature nor nonRepudiation
    NotIntendedForSigning,
    /// A critical extension the policy does not list
    UnsupportedCriticalExtension(String),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::NotYetValid => write!(f, "not yet valid"),
            Reason::Expired => write!(f, "expired"),
            Reason::NotIntendedForSigning => write!(f, "not intended for signing"),
            Reason::UnsupportedCriticalExtension(oid) => {
                write!(f, "unsupported critical extension {}", oid)
            },
        }
    }
}

/// Evaluates certificates against an [`AcceptancePolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificatePolicyFilter;

impl CertificatePolicyFilter {
    /// Accept `cert` under `policy` at time `now`, or list every reason not to.
    pub fn accepts(
        cert: &Certificate,
        policy: &AcceptancePolicy,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), Vec<Reason>> {
        let mut reasons = Vec::new();

        if policy.check_validity {
            if now < cert.not_before() {
                reasons.push(Reason::NotYetValid);
            } else if now > cert.not_after() {
                reasons.push(Reason::Expired);
            }
        }

        if policy.check_key_usage {
            if let Some(usage) = cert.key_usage() {
                if !usage.is_empty() && !usage.digital_signature() && !usage.non_repudiation() {
                    reasons.push(Reason::NotIntendedForSigning);
                }
            }
        }

        if policy.check_critical_extensions {
            reasons.extend(
                cert.critical_extensions()
                    .iter()
                    .filter(|oid| !policy.supports_extension(oid))
                    .map(|oid| Reason::UnsupportedCriticalExtension(oid.clone())),
            );
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(reasons)
        }
    }
}

/// Join reasons for a log line.
pub fn describe(reasons: &[Reason]) -> String {
    reasons.iter().map(Reason::to_string).collect::<Vec<_>>().join(", ")
}
