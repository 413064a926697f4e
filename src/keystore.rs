//! Keystore entries and signing key selection.
//!
//! A keystore is anything that yields [`KeystoreEntry`] values. The crate
//! ships [`PemKeystore`], which reads PEM bundles of private keys and
//! certificates. [`KeyAliasSelector`] filters key entries through the
//! [`CertificatePolicyFilter`] and never fails: no eligible key is an empty
//! list. Loading failures are [`Error::Keystore`] or
//! [`Error::NoCredentialWorked`] and happen before selection.

use crate::certificate::Certificate;
use crate::error::{Error, Result};
use crate::policy::{describe, AcceptancePolicy, CertificatePolicyFilter};
use chrono::{DateTime, Utc};
use pkcs1::DecodeRsaPrivateKey;
use pkcs8::EncryptedPrivateKeyInfo;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use x509_parser::error::PEMError;
use x509_parser::pem::Pem;

/// Opaque handle to an entry's private key.
#[derive(Clone)]
pub struct PrivateKeyHandle {
    key: RsaPrivateKey,
}

impl std::fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKeyHandle(..)")
    }
}

impl PrivateKeyHandle {
    /// Wrap an RSA key.
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// The wrapped key.
    pub fn rsa(&self) -> &RsaPrivateKey {
        &self.key
    }

    /// True when `cert` carries this key's public half.
    pub fn matches(&self, cert: &Certificate) -> bool {
        RsaPublicKey::from(&self.key)
            .to_public_key_der()
            .map(|der| der.as_bytes() == cert.public_key_der())
            .unwrap_or(false)
    }
}

/// One alias in a keystore.
#[derive(Debug, Clone)]
pub struct KeystoreEntry {
    /// Unique within its keystore
    pub alias: String,
    /// False for certificate-only (trusted certificate) entries
    pub is_key_entry: bool,
    /// The entry's own certificate
    pub leaf: Certificate,
    /// Leaf first, root last
    pub chain: Vec<Certificate>,
    /// Present for key entries loaded with their key material
    pub private_key: Option<PrivateKeyHandle>,
}

impl KeystoreEntry {
    /// A certificate-only entry.
    pub fn certificate(alias: impl Into<String>, cert: Certificate) -> Self {
        Self {
            alias: alias.into(),
            is_key_entry: false,
            chain: vec![cert.clone()],
            leaf: cert,
            private_key: None,
        }
    }

    /// A key entry with its chain (leaf first).
    pub fn key(alias: impl Into<String>, chain: Vec<Certificate>, private_key: Option<PrivateKeyHandle>) -> Result<Self> {
        let leaf = chain
            .first()
            .cloned()
            .ok_or_else(|| Error::Keystore("key entry without a certificate".to_string()))?;
        Ok(Self {
            alias: alias.into(),
            is_key_entry: true,
            leaf,
            chain,
            private_key,
        })
    }
}

/// Source of keystore entries.
pub trait Keystore {
    /// Entries in enumeration order.
    fn entries(&self) -> &[KeystoreEntry];

    /// Look an entry up by alias.
    fn entry(&self, alias: &str) -> Option<&KeystoreEntry> {
        self.entries().iter().find(|e| e.alias == alias)
    }

    /// Aliases of certificate-only entries.
    fn certificate_aliases(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|e| !e.is_key_entry)
            .map(|e| e.alias.clone())
            .collect()
    }
}

/// A password to try when opening protected key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// No password at all
    None,
    /// The empty password
    Empty,
    /// The caller's password
    Supplied(String),
}

impl Credential {
    /// Password bytes, `None` for [`Credential::None`].
    pub fn password(&self) -> Option<&[u8]> {
        match self {
            Credential::None => None,
            Credential::Empty => Some(b""),
            Credential::Supplied(p) => Some(p.as_bytes()),
        }
    }
}

/// Ordered credentials: none, empty, then the supplied password if any.
#[derive(Debug, Clone)]
pub struct CredentialAttempts {
    attempts: Vec<Credential>,
}

impl CredentialAttempts {
    /// Attempts for an optional supplied password.
    pub fn new(supplied: Option<&str>) -> Self {
        let mut attempts = vec![Credential::None, Credential::Empty];
        if let Some(p) = supplied.filter(|p| !p.is_empty()) {
            attempts.push(Credential::Supplied(p.to_string()));
        }
        Self { attempts }
    }

    /// The attempts, in order.
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.attempts.iter()
    }

    /// Run `open` with each credential until one succeeds.
    ///
    /// Later credentials are not tried once one works. Exhaustion yields
    /// [`Error::NoCredentialWorked`].
    pub fn first_success<T>(&self, mut open: impl FnMut(&Credential) -> Result<T>) -> Result<T> {
        for (i, credential) in self.attempts.iter().enumerate() {
            match open(credential) {
                Ok(value) => {
                    log::debug!("credential attempt {} succeeded", i + 1);
                    return Ok(value);
                },
                Err(e) => log::debug!("credential attempt {} failed: {}", i + 1, e),
            }
        }
        Err(Error::NoCredentialWorked {
            attempts: self.attempts.len(),
        })
    }
}

/// Make aliases unique, renaming repeats to `alias-1`, `alias-2`, ...
/// in first-seen order.
pub fn dedup_aliases<'a, I>(aliases: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for alias in aliases {
        let mut candidate = alias.to_string();
        let mut n = 0;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{}-{}", alias, n);
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Keystore read from a PEM bundle.
///
/// A `PRIVATE KEY`, `RSA PRIVATE KEY` or `ENCRYPTED PRIVATE KEY` block starts
/// a key entry; the `CERTIFICATE` blocks after it form its chain. Certificates
/// before the first key are certificate-only entries.
#[derive(Debug, Clone, Default)]
pub struct PemKeystore {
    entries: Vec<KeystoreEntry>,
}

enum KeyBlock {
    Plain(RsaPrivateKey),
    Encrypted(Vec<u8>),
}

struct PendingKey {
    key: KeyBlock,
    chain: Vec<Certificate>,
}

impl PemKeystore {
    /// Read a bundle from disk.
    pub fn open(path: impl AsRef<Path>, password: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::Keystore(format!("{}: {}", path.display(), e)))?;
        Self::load(&bytes, password)
    }

    /// Parse a bundle. Encrypted keys are opened with the first credential that works.
    pub fn load(bytes: &[u8], password: Option<&str>) -> Result<Self> {
        let mut loose = Vec::new();
        let mut pending: Vec<PendingKey> = Vec::new();

        for block in Pem::iter_from_buffer(bytes) {
            let block = match block {
                Ok(block) => block,
                Err(PEMError::MissingHeader) => break,
                Err(e) => return Err(Error::Keystore(format!("bad PEM block: {}", e))),
            };
            match block.label.as_str() {
                "CERTIFICATE" | "TRUSTED CERTIFICATE" => {
                    let cert = Certificate::from_der(&block.contents)
                        .map_err(|e| Error::Keystore(format!("bad certificate: {}", e)))?;
                    match pending.last_mut() {
                        Some(key) => key.chain.push(cert),
                        None => loose.push(cert),
                    }
                },
                "PRIVATE KEY" => {
                    let key = RsaPrivateKey::from_pkcs8_der(&block.contents)
                        .map_err(|e| Error::Keystore(format!("unsupported private key: {}", e)))?;
                    pending.push(PendingKey {
                        key: KeyBlock::Plain(key),
                        chain: Vec::new(),
                    });
                },
                "RSA PRIVATE KEY" => {
                    let key = RsaPrivateKey::from_pkcs1_der(&block.contents)
                        .map_err(|e| Error::Keystore(format!("unsupported private key: {}", e)))?;
                    pending.push(PendingKey {
                        key: KeyBlock::Plain(key),
                        chain: Vec::new(),
                    });
                },
                "ENCRYPTED PRIVATE KEY" => pending.push(PendingKey {
                    key: KeyBlock::Encrypted(block.contents),
                    chain: Vec::new(),
                }),
                other => log::debug!("ignoring PEM block '{}'", other),
            }
        }

        if loose.is_empty() && pending.is_empty() {
            return Err(Error::Keystore("no keys or certificates found".to_string()));
        }

        let has_encrypted = pending.iter().any(|p| matches!(p.key, KeyBlock::Encrypted(_)));
        let keys: Vec<RsaPrivateKey> = if has_encrypted {
            CredentialAttempts::new(password).first_success(|credential| open_keys(&pending, credential))?
        } else {
            open_keys(&pending, &Credential::None)?
        };

        let mut raw = Vec::new();
        for cert in loose {
            let alias = default_alias(&cert);
            raw.push(KeystoreEntry::certificate(alias, cert));
        }
        for (pending_key, key) in pending.into_iter().zip(keys) {
            let handle = PrivateKeyHandle::new(key);
            let mut chain = pending_key.chain;
            if let Some(pos) = chain.iter().position(|c| handle.matches(c)) {
                let leaf = chain.remove(pos);
                chain.insert(0, leaf);
            }
            let alias = chain.first().map(default_alias).unwrap_or_default();
            raw.push(KeystoreEntry::key(alias, chain, Some(handle))?);
        }

        let unique = dedup_aliases(raw.iter().map(|e| e.alias.as_str()));
        for (entry, alias) in raw.iter_mut().zip(unique) {
            entry.alias = alias;
        }
        log::debug!("loaded {} keystore entries", raw.len());
        Ok(Self { entries: raw })
    }

    /// Build a keystore from entries, de-duplicating their aliases.
    pub fn from_entries(mut entries: Vec<KeystoreEntry>) -> Self {
        let unique = dedup_aliases(entries.iter().map(|e| e.alias.as_str()));
        for (entry, alias) in entries.iter_mut().zip(unique) {
            entry.alias = alias;
        }
        Self { entries }
    }
}

impl Keystore for PemKeystore {
    fn entries(&self) -> &[KeystoreEntry] {
        &self.entries
    }
}

fn open_keys(pending: &[PendingKey], credential: &Credential) -> Result<Vec<RsaPrivateKey>> {
    pending
        .iter()
        .map(|p| match &p.key {
            KeyBlock::Plain(key) => Ok(key.clone()),
            KeyBlock::Encrypted(der) => {
                let password = credential
                    .password()
                    .ok_or_else(|| Error::Keystore("key is password protected".to_string()))?;
                let info = EncryptedPrivateKeyInfo::try_from(der.as_slice())
                    .map_err(|e| Error::Keystore(format!("bad encrypted key: {}", e)))?;
                let document = info
                    .decrypt(password)
                    .map_err(|e| Error::Keystore(format!("cannot decrypt key: {}", e)))?;
                RsaPrivateKey::from_pkcs8_der(document.as_bytes())
                    .map_err(|e| Error::Keystore(format!("unsupported private key: {}", e)))
            },
        })
        .collect()
}

fn default_alias(cert: &Certificate) -> String {
    cert.common_name()
        .map(str::to_string)
        .unwrap_or_else(|| cert.subject().to_string())
}

/// Chooses signing keys from keystore entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyAliasSelector;

impl KeyAliasSelector {
    /// Aliases of key entries whose leaf passes `policy` at `now`.
    ///
    /// Input order is kept. Repeated aliases are made unique first, so every
    /// returned alias names exactly one entry.
    pub fn select_aliases(entries: &[KeystoreEntry], policy: &AcceptancePolicy, now: DateTime<Utc>) -> Vec<String> {
        let unique = dedup_aliases(entries.iter().map(|e| e.alias.as_str()));
        entries
            .iter()
            .zip(unique)
            .filter(|(entry, _)| entry.is_key_entry)
            .filter_map(|(entry, alias)| match CertificatePolicyFilter::accepts(&entry.leaf, policy, now) {
                Ok(()) => Some(alias),
                Err(reasons) => {
                    log::warn!("key '{}' rejected: {}", alias, describe(&reasons));
                    None
                },
            })
            .collect()
    }

    /// Pick one signing alias: `requested` if eligible, else the eligible
    /// alias at `index`, else the first eligible one.
    pub fn choose_key_alias(
        entries: &[KeystoreEntry],
        policy: &AcceptancePolicy,
        now: DateTime<Utc>,
        requested: Option<&str>,
        index: Option<usize>,
    ) -> Option<String> {
        let eligible = Self::select_aliases(entries, policy, now);
        let chosen = match requested {
            Some(alias) if eligible.iter().any(|a| a == alias) => Some(alias.to_string()),
            _ => index
                .and_then(|i| eligible.get(i).cloned())
                .or_else(|| eligible.first().cloned()),
        };
        match &chosen {
            Some(alias) => log::info!("using key alias '{}'", alias),
            None => log::info!("no eligible signing key"),
        }
        chosen
    }
}

/// Signature service implementation a signer is configured with.
///
/// Selected once from configuration; verification does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigningBackend {
    /// Detached CMS built in-process
    #[default]
    Legacy,
    /// External signature service framework
    Modern,
}

impl std::str::FromStr for SigningBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(SigningBackend::Legacy),
            "modern" => Ok(SigningBackend::Modern),
            other => Err(Error::Config(format!("unknown signing backend '{}'", other))),
        }
    }
}
