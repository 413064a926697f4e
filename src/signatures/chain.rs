//! Certificate path building from a signer to a trust anchor.
//!
//! The walk never aborts on a problem: every issue found on the way is
//! collected as a message, so a caller sees the whole picture. Messages start
//! with one of the prefixes below, which
//! [`ValidationCode::for_chain_failure`](super::ValidationCode::for_chain_failure)
//! keys on.

use super::revocation::{RevocationChecker, RevocationStatus, REVOKED};
use crate::certificate::{Certificate, TrustAnchors};
use crate::policy::AcceptancePolicy;
use chrono::{DateTime, Utc};

/// No path to a trust anchor.
pub const CANT_BE_VERIFIED: &str = "can't be verified";
/// A chain certificate ended its validity before the check time.
pub const EXPIRED: &str = "expired";
/// A chain certificate starts its validity after the check time.
pub const NOT_YET_VALID: &str = "not yet valid";
/// A chain certificate marks an extension critical that is not understood.
pub const UNSUPPORTED_CRITICAL_EXTENSION: &str = "unsupported critical extension";

/// Longest chain walked.
const MAX_CHAIN_LENGTH: usize = 16;

/// Walks issuer links through embedded certificates and trust anchors.
pub struct ChainBuilder<'a> {
    anchors: &'a TrustAnchors,
    policy: &'a AcceptancePolicy,
    revocation: Option<&'a dyn RevocationChecker>,
}

impl<'a> ChainBuilder<'a> {
    /// Builder over the given anchors, using the policy's supported extensions.
    pub fn new(anchors: &'a TrustAnchors, policy: &'a AcceptancePolicy) -> Self {
        Self {
            anchors,
            policy,
            revocation: None,
        }
    }

    /// Consult `checker` for every issued certificate in the path.
    pub fn with_revocation(mut self, checker: Option<&'a dyn RevocationChecker>) -> Self {
        self.revocation = checker;
        self
    }

    /// The signer is itself a trust anchor and valid at `at`.
    pub fn directly_trusted(&self, signer: &Certificate, at: DateTime<Utc>) -> bool {
        self.anchors.contains(signer) && signer.not_before() <= at && at <= signer.not_after()
    }

    /// Walk from `signer` upwards and return every problem found.
    ///
    /// `embedded` are the certificates shipped with the signature; `at` is
    /// the time validity windows are checked against.
    pub fn failures(&self, signer: &Certificate, embedded: &[Certificate], at: DateTime<Utc>) -> Vec<String> {
        let mut failures = Vec::new();
        let mut path: Vec<&Certificate> = Vec::new();
        let mut current = signer;

        loop {
            self.check_certificate(current, at, &mut failures);
            path.push(current);

            if self.anchors.contains(current) {
                log::debug!("chain of {} certificate(s) ends at trust anchor {}", path.len(), current.subject());
                break;
            }
            if path.len() >= MAX_CHAIN_LENGTH {
                failures.push(format!("certificate chain longer than {} certificates", MAX_CHAIN_LENGTH));
                break;
            }

            let issuer = match self.find_issuer(current, embedded) {
                Ok(issuer) => issuer,
                Err(problem) => {
                    failures.push(problem);
                    break;
                },
            };

            if let Some(checker) = self.revocation {
                if let RevocationStatus::Revoked(why) = checker.status(current, issuer, at) {
                    failures.push(format!("{}: {} ({})", REVOKED, current.subject(), why));
                }
            }

            if path.iter().any(|c| *c == issuer) {
                failures.push(format!("certificate chain loops back to {}", issuer.subject()));
                break;
            }
            current = issuer;
        }

        for failure in &failures {
            log::warn!("certificate chain of {}: {}", signer.subject(), failure);
        }
        failures
    }

    fn check_certificate(&self, cert: &Certificate, at: DateTime<Utc>, failures: &mut Vec<String>) {
        if at < cert.not_before() {
            failures.push(format!("{}: {} (not before {})", NOT_YET_VALID, cert.subject(), cert.not_before()));
        } else if at > cert.not_after() {
            failures.push(format!("{}: {} (not after {})", EXPIRED, cert.subject(), cert.not_after()));
        }
        for oid in cert.critical_extensions() {
            if !self.policy.supports_extension(oid) {
                failures.push(format!("{} {} in {}", UNSUPPORTED_CRITICAL_EXTENSION, oid, cert.subject()));
            }
        }
    }

    /// The certificate that signed `cert`, anchors first.
    fn find_issuer<'c>(&self, cert: &Certificate, embedded: &'c [Certificate]) -> Result<&'c Certificate, String>
    where
        'a: 'c,
    {
        let anchors: &'c TrustAnchors = self.anchors;
        let mut named = anchors
            .issuers_of(cert)
            .chain(embedded.iter().filter(|c| cert.names_issuer(c) && *c != cert))
            .peekable();

        if named.peek().is_none() {
            if cert.is_self_issued() && cert.verify_issued_by(cert).is_ok() {
                return Err(format!(
                    "{}: self-signed certificate {} is not a trust anchor",
                    CANT_BE_VERIFIED,
                    cert.subject()
                ));
            }
            return Err(format!(
                "{}: issuer {} of {} not found",
                CANT_BE_VERIFIED,
                cert.issuer(),
                cert.subject()
            ));
        }

        let mut last_error = String::new();
        for candidate in named {
            match cert.verify_issued_by(candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) => last_error = e,
            }
        }
        Err(format!(
            "bad signature on {} from issuer {}: {}",
            cert.subject(),
            cert.issuer(),
            last_error
        ))
    }
}
