//! Configuration for verification runs and key selection.
//!
//! Loaded from JSON or built in code; passed explicitly to the operations
//! that need it.

use crate::certificate::TrustAnchors;
use crate::error::{Error, Result};
use crate::keystore::SigningBackend;
use crate::policy::AcceptancePolicy;
use crate::signatures::VerifierOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Verifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Certificate acceptance policy
    pub policy: AcceptancePolicy,
    /// PEM or DER files holding trust anchors
    pub trust_anchor_files: Vec<PathBuf>,
    /// Stop at the first failing signature.
    pub fail_fast: bool,
    /// Check chain validity at the signing time instead of now.
    pub check_validity_at_signing_time: bool,
    /// Signing service implementation
    pub signing_backend: SigningBackend,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            policy: AcceptancePolicy::default(),
            trust_anchor_files: Vec::new(),
            fail_fast: false,
            check_validity_at_signing_time: true,
            signing_backend: SigningBackend::default(),
        }
    }

    /// Read a JSON configuration file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Set the acceptance policy.
    pub fn with_policy(mut self, policy: AcceptancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add a trust anchor file.
    pub fn with_trust_anchor_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.trust_anchor_files.push(path.into());
        self
    }

    /// Enable fail-fast.
    pub fn with_fail_fast(mut self, enable: bool) -> Self {
        self.fail_fast = enable;
        self
    }

    /// Choose the chain validity check time.
    pub fn with_validity_at_signing_time(mut self, enable: bool) -> Self {
        self.check_validity_at_signing_time = enable;
        self
    }

    /// Load every configured trust anchor file.
    pub fn load_trust_anchors(&self) -> Result<TrustAnchors> {
        TrustAnchors::from_files(&self.trust_anchor_files)
    }

    /// Options for a [`SignatureVerifier`](crate::signatures::SignatureVerifier).
    pub fn verifier_options(&self) -> VerifierOptions {
        VerifierOptions {
            policy: self.policy.clone(),
            check_at_signing_time: self.check_validity_at_signing_time,
            revocation: None,
        }
    }
}
