//! PDF signature verification.
//!
//! Verification reports facts: integrity (`modified`) and trust
//! (`chain_failures`) are independent and neither stops the other from
//! being evaluated.

use super::chain::ChainBuilder;
use super::revocation::RevocationChecker;
use super::types::{DigestAlgorithm, SignatureField, SignatureSubFilter, SignatureVerification};
use crate::certificate::{Certificate, TrustAnchors};
use crate::policy::AcceptancePolicy;
use chrono::{DateTime, TimeZone, Utc};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::revocation::RevocationInfoChoice;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use der::asn1::OctetString;
use der::oid::AssociatedOid;
use der::{Any, Decode, Encode, SliceReader, TagNumber, Tagged};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;
use spki::SubjectPublicKeyInfoRef;
use std::sync::Arc;
use x509_cert::time::Time;

const OID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
const OID_MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";
const OID_SIGNING_TIME: &str = "1.2.840.113549.1.9.5";
const OID_TIMESTAMP_TOKEN: &str = "1.2.840.113549.1.9.16.2.14";
const OID_ADBE_REVOCATION_ARCHIVAL: &str = "1.2.840.113583.1.1.8";
const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";

/// RSA PKCS#1 v1.5 signature algorithm OIDs accepted on a signer info.
const RSA_SIGNATURE_OIDS: &[&str] = &[
    OID_RSA_ENCRYPTION,
    "1.2.840.113549.1.1.5",
    "1.2.840.113549.1.1.11",
    "1.2.840.113549.1.1.12",
    "1.2.840.113549.1.1.13",
];

/// Chain entry used when the CMS container cannot be decoded.
pub const UNPARSEABLE_SIGNATURE: &str = "unparseable signature";

/// How signatures are checked beyond the cryptography.
#[derive(Clone)]
pub struct VerifierOptions {
    /// Supported critical extensions for chain certificates
    pub policy: AcceptancePolicy,
    /// Check chain validity at the signing time when one is known
    pub check_at_signing_time: bool,
    /// Revocation lookups; none by default
    pub revocation: Option<Arc<dyn RevocationChecker>>,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            policy: AcceptancePolicy::default(),
            check_at_signing_time: true,
            revocation: None,
        }
    }
}

impl std::fmt::Debug for VerifierOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierOptions")
            .field("policy", &self.policy)
            .field("check_at_signing_time", &self.check_at_signing_time)
            .field("revocation", &self.revocation.is_some())
            .finish()
    }
}

/// Verifier for PDF digital signatures.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    anchors: TrustAnchors,
    options: VerifierOptions,
}

impl SignatureVerifier {
    /// Create a verifier that trusts `anchors`.
    pub fn new(anchors: TrustAnchors) -> Self {
        Self {
            anchors,
            options: VerifierOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: VerifierOptions) -> Self {
        self.options = options;
        self
    }

    /// The trust anchors in use.
    pub fn anchors(&self) -> &TrustAnchors {
        &self.anchors
    }

    /// Verify one located field against the current time.
    pub fn verify(&self, data: &[u8], field: &SignatureField) -> SignatureVerification {
        self.verify_at(data, field, Utc::now())
    }

    /// Verify one located field; `now` is used when no signing time is known.
    pub fn verify_at(&self, data: &[u8], field: &SignatureField, now: DateTime<Utc>) -> SignatureVerification {
        let signed = match field.byte_range.signed_bytes(data) {
            Ok(signed) => signed,
            Err(reason) => return SignatureVerification::unverifiable(field, reason),
        };
        let parsed = match ParsedSignature::parse(&field.contents) {
            Ok(parsed) => parsed,
            Err(reason) => {
                log::warn!("signature '{}' could not be decoded: {}", field.name, reason);
                return SignatureVerification::unverifiable(field, UNPARSEABLE_SIGNATURE);
            },
        };

        let integrity = match &parsed.signer {
            Some(signer) => parsed.check_integrity(signer, &signed, field.sub_filter),
            None => Err("signer certificate not included in signature".to_string()),
        };
        let modified = match &integrity {
            Ok(()) => false,
            Err(reason) => {
                log::warn!("signature '{}' does not match its byte range: {}", field.name, reason);
                true
            },
        };

        let signing_time = parsed.signing_time.or(field.signing_time);
        let check_time = match signing_time {
            Some(t) if self.options.check_at_signing_time => t,
            _ => now,
        };

        let chain = ChainBuilder::new(&self.anchors, &self.options.policy)
            .with_revocation(self.options.revocation.as_deref());
        let (chain_failures, signer_directly_trusted) = match &parsed.signer {
            Some(signer) => (
                chain.failures(signer, &parsed.certificates, check_time),
                chain.directly_trusted(signer, check_time),
            ),
            None => (vec![integrity.clone().err().unwrap_or_default()], false),
        };

        let verification = SignatureVerification {
            name: field.name.clone(),
            subject: parsed.signer.as_ref().map(|c| c.subject().to_string()),
            signing_time,
            revision_index: field.revision_index,
            total_revisions: field.total_revisions,
            is_last_signature: field.is_last_signature,
            covers_whole_document: field.covers_whole_document,
            modified,
            chain_failures,
            certification_level: field.certification_level,
            timestamp_token_present: parsed.timestamp_token,
            crl_present: parsed.crl_present,
            ocsp_present: parsed.ocsp_present,
            signer_directly_trusted,
            digest_algorithm: parsed.digest_algorithm,
            sub_filter: field.sub_filter,
            signer_name: field.signer_name.clone(),
            reason: field.reason.clone(),
            location: field.location.clone(),
        };
        log::info!(
            "signature '{}' (revision {}/{}): {}",
            verification.name,
            verification.revision_index,
            verification.total_revisions,
            verification.validation_code()
        );
        verification
    }
}

/// The parts of a CMS SignedData a PDF verifier needs.
struct ParsedSignature {
    digest_algorithm: Option<DigestAlgorithm>,
    digest_oid: String,
    signature_oid: String,
    certificates: Vec<Certificate>,
    signer: Option<Certificate>,
    signed_attributes: Option<Vec<u8>>,
    message_digest: Option<Vec<u8>>,
    signing_time: Option<DateTime<Utc>>,
    signature: Vec<u8>,
    encapsulated: Option<Vec<u8>>,
    timestamp_token: bool,
    crl_present: bool,
    ocsp_present: bool,
}

impl ParsedSignature {
    /// Decode a `/Contents` value. Zero padding after the DER is ignored.
    fn parse(contents: &[u8]) -> Result<Self, String> {
        let mut reader = SliceReader::new(contents).map_err(|e| e.to_string())?;
        let info = ContentInfo::decode(&mut reader).map_err(|e| e.to_string())?;
        if info.content_type.to_string() != OID_SIGNED_DATA {
            return Err(format!("content type {} is not signed data", info.content_type));
        }
        let signed: SignedData = info.content.decode_as().map_err(|e| e.to_string())?;

        let embedded: Vec<x509_cert::Certificate> = signed
            .certificates
            .iter()
            .flat_map(|set| set.0.iter())
            .filter_map(|choice| match choice {
                CertificateChoices::Certificate(cert) => Some(cert.clone()),
                _ => None,
            })
            .collect();
        let mut certificates = Vec::with_capacity(embedded.len());
        for cert in &embedded {
            let der = cert.to_der().map_err(|e| e.to_string())?;
            certificates.push(Certificate::from_der(&der).map_err(|e| e.to_string())?);
        }

        let signer_info = signed
            .signer_infos
            .0
            .iter()
            .next()
            .ok_or_else(|| "no signer info".to_string())?;
        let signer_index = find_signer(signer_info, &embedded, &certificates);

        let digest_oid = signer_info.digest_alg.oid.to_string();
        let mut message_digest = None;
        let mut signing_time = None;
        let mut archived_crl = false;
        let mut ocsp_present = false;
        let signed_attributes = match &signer_info.signed_attrs {
            Some(attrs) => {
                for attr in attrs.iter() {
                    let Some(value) = attr.values.iter().next() else {
                        continue;
                    };
                    match attr.oid.to_string().as_str() {
                        OID_MESSAGE_DIGEST => {
                            let digest: OctetString = value.decode_as().map_err(|e| e.to_string())?;
                            message_digest = Some(digest.as_bytes().to_vec());
                        },
                        OID_SIGNING_TIME => {
                            let der = value.to_der().map_err(|e| e.to_string())?;
                            signing_time = Time::from_der(&der)
                                .ok()
                                .and_then(|t| i64::try_from(t.to_unix_duration().as_secs()).ok())
                                .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
                        },
                        OID_ADBE_REVOCATION_ARCHIVAL => {
                            // SEQUENCE { crl [0], ocsp [1], otherRevInfo [2] }, all optional
                            let entries: Vec<Any> = value.decode_as().map_err(|e| e.to_string())?;
                            let has = |n: TagNumber| {
                                entries.iter().any(|e| e.tag().is_context_specific() && e.tag().number() == n)
                            };
                            archived_crl |= has(TagNumber::N0);
                            ocsp_present |= has(TagNumber::N1);
                        },
                        _ => {},
                    }
                }
                Some(attrs.to_der().map_err(|e| e.to_string())?)
            },
            None => None,
        };

        let timestamp_token = signer_info
            .unsigned_attrs
            .as_ref()
            .is_some_and(|attrs| attrs.iter().any(|a| a.oid.to_string() == OID_TIMESTAMP_TOKEN));

        let encapsulated = match &signed.encap_content_info.econtent {
            Some(content) => {
                let octets: OctetString = content.decode_as().map_err(|e| e.to_string())?;
                Some(octets.as_bytes().to_vec())
            },
            None => None,
        };

        let crl_present = archived_crl
            || signed
                .crls
                .as_ref()
                .is_some_and(|crls| crls.0.iter().any(|c| matches!(c, RevocationInfoChoice::Crl(_))));

        Ok(Self {
            digest_algorithm: DigestAlgorithm::from_oid(&digest_oid),
            digest_oid,
            signature_oid: signer_info.signature_algorithm.oid.to_string(),
            signer: signer_index.map(|i| certificates[i].clone()),
            certificates,
            signed_attributes,
            message_digest,
            signing_time,
            signature: signer_info.signature.as_bytes().to_vec(),
            encapsulated,
            timestamp_token,
            crl_present,
            ocsp_present,
        })
    }

    /// Recompute the digest over `signed` and check the signature value.
    fn check_integrity(
        &self,
        signer: &Certificate,
        signed: &[u8],
        sub_filter: Option<SignatureSubFilter>,
    ) -> Result<(), String> {
        let algorithm = self
            .digest_algorithm
            .ok_or_else(|| format!("unsupported digest algorithm {}", self.digest_oid))?;

        // adbe.pkcs7.sha1 signs a SignedData whose content is SHA-1 of the range.
        let content = match (&self.encapsulated, sub_filter) {
            (Some(inner), Some(SignatureSubFilter::Pkcs7Sha1)) => {
                if inner.as_slice() != DigestAlgorithm::Sha1.digest(signed).as_slice() {
                    return Err("encapsulated SHA-1 digest does not match byte range".to_string());
                }
                inner.as_slice()
            },
            (Some(inner), _) => {
                if inner.as_slice() != signed {
                    return Err("encapsulated content in detached signature differs from byte range".to_string());
                }
                inner.as_slice()
            },
            (None, _) => signed,
        };
        let content_digest = algorithm.digest(content);

        let message = match &self.signed_attributes {
            Some(attributes) => {
                let declared = self
                    .message_digest
                    .as_ref()
                    .ok_or_else(|| "signed attributes lack a message digest".to_string())?;
                if declared != &content_digest {
                    return Err(format!("{} digest of signed content does not match", algorithm));
                }
                algorithm.digest(attributes)
            },
            None => content_digest,
        };

        if !RSA_SIGNATURE_OIDS.contains(&self.signature_oid.as_str()) {
            return Err(format!("unsupported signature algorithm {}", self.signature_oid));
        }
        let spki = SubjectPublicKeyInfoRef::from_der(signer.public_key_der()).map_err(|e| e.to_string())?;
        if spki.algorithm.oid.to_string() != OID_RSA_ENCRYPTION {
            return Err(format!("unsupported signer key algorithm {}", spki.algorithm.oid));
        }
        let key = RsaPublicKey::from_public_key_der(signer.public_key_der())
            .map_err(|e| format!("signer key is not RSA: {}", e))?;
        match algorithm {
            DigestAlgorithm::Sha1 => verify_prehash::<Sha1>(key, &message, &self.signature),
            DigestAlgorithm::Sha256 => verify_prehash::<Sha256>(key, &message, &self.signature),
            DigestAlgorithm::Sha384 => verify_prehash::<Sha384>(key, &message, &self.signature),
            DigestAlgorithm::Sha512 => verify_prehash::<Sha512>(key, &message, &self.signature),
        }
    }
}

fn verify_prehash<D>(key: RsaPublicKey, prehash: &[u8], signature: &[u8]) -> Result<(), String>
where
    D: Digest + AssociatedOid,
{
    let signature = Signature::try_from(signature).map_err(|e| e.to_string())?;
    VerifyingKey::<D>::new(key)
        .verify_prehash(prehash, &signature)
        .map_err(|_| "signature value does not verify".to_string())
}

fn find_signer(info: &SignerInfo, embedded: &[x509_cert::Certificate], parsed: &[Certificate]) -> Option<usize> {
    match &info.sid {
        SignerIdentifier::IssuerAndSerialNumber(id) => embedded.iter().position(|cert| {
            cert.tbs_certificate.issuer == id.issuer && cert.tbs_certificate.serial_number == id.serial_number
        }),
        SignerIdentifier::SubjectKeyIdentifier(ski) => parsed
            .iter()
            .position(|cert| cert.subject_key_id() == Some(ski.0.as_bytes())),
    }
}
