//! Document-level verification.
//!
//! A run locates every signed field, verifies each in form order and reports
//! the number of saves in the file. Only a structural failure of the document
//! is an error; everything about individual signatures is in the report.

use crate::config::VerifierConfig;
use crate::error::Result;
use crate::revision::RevisionLocator;
use crate::signatures::{SignatureVerification, SignatureVerifier, ValidationCode};
use chrono::{DateTime, Utc};

/// Every signature passed.
pub const EXIT_ALL_PASSED: i32 = 0;
/// Some signatures failed.
pub const EXIT_SOME_FAILED: i32 = 3;
/// Every signature failed.
pub const EXIT_ALL_FAILED: i32 = 4;
/// A document could not be read or parsed.
pub const EXIT_UNREADABLE: i32 = 5;
/// Any other error (keystore, configuration).
pub const EXIT_OTHER_ERROR: i32 = 6;

/// Outcome of verifying one document.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Saves in the file
    pub total_revisions: usize,
    /// One entry per signed field, in form order
    pub results: Vec<SignatureVerification>,
    /// Fail-fast stopped before every field was verified
    pub stopped_early: bool,
}

impl RunReport {
    /// Worst validation code; [`ValidationCode::Valid`] without signatures.
    pub fn result_code(&self) -> ValidationCode {
        self.results
            .iter()
            .map(SignatureVerification::validation_code)
            .max()
            .unwrap_or(ValidationCode::Valid)
    }

    /// Results that were modified or have chain failures.
    pub fn failures(&self) -> impl Iterator<Item = &SignatureVerification> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// True when every signature passed.
    pub fn all_passed(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Process exit code for a set of results.
pub fn exit_code(results: &[SignatureVerification]) -> i32 {
    let failed = results.iter().filter(|r| !r.passed()).count();
    if failed == 0 {
        EXIT_ALL_PASSED
    } else if failed == results.len() {
        EXIT_ALL_FAILED
    } else {
        EXIT_SOME_FAILED
    }
}

/// Exit code when fail-fast stopped on `failed`: its validation code.
pub fn fail_fast_exit_code(failed: &SignatureVerification) -> i32 {
    failed.validation_code().code()
}

/// Verifies every signature in a document.
#[derive(Debug, Clone, Default)]
pub struct VerificationRun {
    verifier: SignatureVerifier,
    fail_fast: bool,
}

impl VerificationRun {
    /// Run with the given verifier.
    pub fn new(verifier: SignatureVerifier) -> Self {
        Self {
            verifier,
            fail_fast: false,
        }
    }

    /// Build from configuration, loading its trust anchor files.
    pub fn from_config(config: &VerifierConfig) -> Result<Self> {
        let anchors = config.load_trust_anchors()?;
        log::debug!("{} trust anchor(s) configured", anchors.len());
        let verifier = SignatureVerifier::new(anchors).with_options(config.verifier_options());
        Ok(Self::new(verifier).with_fail_fast(config.fail_fast))
    }

    /// Stop at the first signature that does not pass.
    pub fn with_fail_fast(mut self, enable: bool) -> Self {
        self.fail_fast = enable;
        self
    }

    /// Verify every signature against the current time.
    pub fn run(&self, data: &[u8]) -> Result<RunReport> {
        self.run_at(data, Utc::now())
    }

    /// Verify every signature; `now` stands in for unknown signing times.
    pub fn run_at(&self, data: &[u8], now: DateTime<Utc>) -> Result<RunReport> {
        let located = RevisionLocator::locate_all(data)?;
        let mut report = RunReport {
            total_revisions: located.total_revisions,
            results: Vec::with_capacity(located.fields.len()),
            stopped_early: false,
        };

        let count = located.fields.len();
        for (name, field) in located.fields {
            let result = match field {
                Ok(field) => self.verifier.verify_at(data, &field, now),
                Err(e) => SignatureVerification::unlocatable(name, located.total_revisions, e.to_string()),
            };
            let failed = !result.passed();
            report.results.push(result);
            if failed && self.fail_fast {
                report.stopped_early = report.results.len() < count;
                log::info!("fail-fast: stopping after '{}'", report.results.last().map_or("", |r| r.name.as_str()));
                break;
            }
        }

        log::info!(
            "{} signature(s) in {} revision(s), result {}",
            report.results.len(),
            report.total_revisions,
            report.result_code()
        );
        Ok(report)
    }

    /// Bytes of the revision `field_name` signed, ready to write out.
    pub fn extract_revision(data: &[u8], field_name: &str) -> Result<Vec<u8>> {
        RevisionLocator::extract_revision(data, field_name).map(<[u8]>::to_vec)
    }

    /// Number of signed fields.
    pub fn count(data: &[u8]) -> Result<usize> {
        Ok(RevisionLocator::signature_names(data)?.len())
    }

    /// Names of signed fields.
    pub fn names(data: &[u8]) -> Result<Vec<String>> {
        RevisionLocator::signature_names(data)
    }
}
