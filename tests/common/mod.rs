//! Shared fixtures: keys, certificates, CMS containers and signed PDFs.
//!
//! Keys are pre-generated 2048-bit RSA keys under `tests/fixtures/keys`
//! (`signer-encrypted.pem` is `signer.pem` under the password `secret`).
//! Certificates, CMS containers and PDFs are built per test.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::revocation::{RevocationInfoChoice, RevocationInfoChoices};
use cms::signed_data::{CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos};
use der::asn1::{BitString, ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::pem::LineEnding;
use der::{Any, Decode, Encode, EncodePem};
use pdf_sigcheck::certificate::{Certificate, TrustAnchors};
use rand::Rng;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use signature::{SignatureEncoding, Signer};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::str::FromStr;
use x509_cert::attr::Attribute;
use x509_cert::certificate::{Certificate as X509Certificate, TbsCertificate, Version};
use x509_cert::crl::{CertificateList, TbsCertList};
use x509_cert::ext::pkix::BasicConstraints;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};

pub const ROOT_KEY_PEM: &str = include_str!("../fixtures/keys/root.pem");
pub const SIGNER_KEY_PEM: &str = include_str!("../fixtures/keys/signer.pem");
pub const SIGNER_ENCRYPTED_KEY_PEM: &str = include_str!("../fixtures/keys/signer-encrypted.pem");
pub const OTHER_KEY_PEM: &str = include_str!("../fixtures/keys/other.pem");
pub const OTHER_RSA_KEY_PEM: &str = include_str!("../fixtures/keys/other-rsa.pem");
pub const SIGNER_KEY_PASSWORD: &str = "secret";

/// A critical extension nothing supports.
pub const PRIVATE_CRITICAL_OID: &str = "1.3.6.1.4.1.55555.1.1";

const OID_KEY_USAGE: &str = "2.5.29.15";
const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";
const OID_SUBJECT_KEY_ID: &str = "2.5.29.14";
const OID_SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_SHA256: &str = "2.16.840.1.101.3.4.2.1";
const OID_DATA: &str = "1.2.840.113549.1.7.1";
const OID_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
const OID_CONTENT_TYPE: &str = "1.2.840.113549.1.9.3";
const OID_MESSAGE_DIGEST: &str = "1.2.840.113549.1.9.4";
const OID_SIGNING_TIME: &str = "1.2.840.113549.1.9.5";
const OID_TIMESTAMP_TOKEN: &str = "1.2.840.113549.1.9.16.2.14";
const OID_ADBE_REVOCATION_ARCHIVAL: &str = "1.2.840.113583.1.1.8";

/// adbe-revocationInfoArchival holding one empty OCSP response list.
const ARCHIVED_OCSP: &[u8] = &[0x30, 0x04, 0xA1, 0x02, 0x30, 0x00];

/// Bytes reserved for `/Contents`.
pub const CONTENTS_SIZE: usize = 8192;

pub fn key(pem: &str) -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(pem).unwrap()
}

fn oid(text: &str) -> ObjectIdentifier {
    ObjectIdentifier::new(text).unwrap()
}

fn algorithm(text: &str) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: oid(text),
        parameters: None,
    }
}

/// Midnight UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn utc_time(at: DateTime<Utc>) -> Time {
    let secs = u64::try_from(at.timestamp()).unwrap();
    Time::UtcTime(UtcTime::from_unix_duration(std::time::Duration::from_secs(secs)).unwrap())
}

fn extension(id: &str, critical: bool, value: Vec<u8>) -> Extension {
    Extension {
        extn_id: oid(id),
        critical,
        extn_value: OctetString::new(value).unwrap(),
    }
}

/// Key usage bits as (unused bits, first byte) of the DER BIT STRING.
#[derive(Debug, Clone, Copy)]
pub struct KeyUsage(pub u8, pub u8);

impl KeyUsage {
    /// digitalSignature + nonRepudiation
    pub const SIGNING: KeyUsage = KeyUsage(6, 0xC0);
    /// digitalSignature only
    pub const DIGITAL_SIGNATURE: KeyUsage = KeyUsage(7, 0x80);
    /// keyEncipherment only
    pub const KEY_ENCIPHERMENT: KeyUsage = KeyUsage(5, 0x20);
    /// keyCertSign + cRLSign
    pub const CERT_SIGN: KeyUsage = KeyUsage(1, 0x06);
}

/// Builds X.509 v3 certificates.
#[derive(Debug, Clone)]
pub struct CertBuilder {
    subject: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    key_usage: Option<KeyUsage>,
    ca: bool,
    private_critical: bool,
}

impl CertBuilder {
    pub fn new(subject: &str) -> Self {
        let now = Utc::now();
        Self {
            subject: subject.to_string(),
            not_before: now - Duration::days(30),
            not_after: now + Duration::days(365),
            key_usage: Some(KeyUsage::SIGNING),
            ca: false,
            private_critical: false,
        }
    }

    pub fn ca(mut self) -> Self {
        self.ca = true;
        self.key_usage = Some(KeyUsage::CERT_SIGN);
        self.not_before = Utc::now() - Duration::days(365);
        self.not_after = Utc::now() + Duration::days(3650);
        self
    }

    pub fn validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn key_usage(mut self, usage: Option<KeyUsage>) -> Self {
        self.key_usage = usage;
        self
    }

    pub fn private_critical_extension(mut self) -> Self {
        self.private_critical = true;
        self
    }

    /// Issue a certificate for `subject_key`, signed by `issuer` or self-signed.
    pub fn issue(&self, subject_key: &RsaPrivateKey, issuer: Option<(&X509Certificate, &RsaPrivateKey)>) -> X509Certificate {
        let public = RsaPublicKey::from(subject_key);
        let spki_der = public.to_public_key_der().unwrap();
        let spki = SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes()).unwrap();
        let subject = Name::from_str(&self.subject).unwrap();
        let (issuer_name, signing_key) = match issuer {
            Some((cert, key)) => (cert.tbs_certificate.subject.clone(), key.clone()),
            None => (subject.clone(), subject_key.clone()),
        };

        let mut extensions = Vec::new();
        if self.ca {
            let constraints = BasicConstraints {
                ca: true,
                path_len_constraint: None,
            };
            extensions.push(extension(OID_BASIC_CONSTRAINTS, true, constraints.to_der().unwrap()));
        }
        if let Some(KeyUsage(unused, bits)) = self.key_usage {
            let value = BitString::new(unused, vec![bits]).unwrap().to_der().unwrap();
            extensions.push(extension(OID_KEY_USAGE, true, value));
        }
        let key_id = Sha256::digest(spki_der.as_bytes());
        let key_id = OctetString::new(key_id[..20].to_vec()).unwrap().to_der().unwrap();
        extensions.push(extension(OID_SUBJECT_KEY_ID, false, key_id));
        if self.private_critical {
            extensions.push(extension(PRIVATE_CRITICAL_OID, true, vec![0x05, 0x00]));
        }

        let mut serial = [0u8; 8];
        rand::thread_rng().fill(&mut serial[..]);
        serial[0] = (serial[0] & 0x7F) | 0x01;

        let tbs = TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&serial).unwrap(),
            signature: algorithm(OID_SHA256_WITH_RSA),
            issuer: issuer_name,
            validity: Validity {
                not_before: utc_time(self.not_before),
                not_after: utc_time(self.not_after),
            },
            subject,
            subject_public_key_info: spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        };
        let signature = SigningKey::<Sha256>::new(signing_key).sign(&tbs.to_der().unwrap());
        X509Certificate {
            tbs_certificate: tbs,
            signature_algorithm: algorithm(OID_SHA256_WITH_RSA),
            signature: BitString::from_bytes(&signature.to_vec()).unwrap(),
        }
    }
}

/// A signing key with its certificate and the certificates to embed.
#[derive(Debug, Clone)]
pub struct Identity {
    pub key: RsaPrivateKey,
    pub cert: X509Certificate,
    pub chain: Vec<X509Certificate>,
}

impl Identity {
    pub fn der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }

    pub fn pem(&self) -> String {
        self.cert.to_pem(LineEnding::LF).unwrap()
    }

    pub fn certificate(&self) -> Certificate {
        Certificate::from_der(&self.der()).unwrap()
    }

    pub fn anchors(&self) -> TrustAnchors {
        std::iter::once(self.certificate()).collect()
    }
}

/// Self-signed CA on the root key.
pub fn root_ca() -> Identity {
    let key = key(ROOT_KEY_PEM);
    let cert = CertBuilder::new("CN=Sigcheck Test Root,O=Sigcheck Tests")
        .ca()
        .validity(at(2010, 1, 1), Utc::now() + Duration::days(3650))
        .issue(&key, None);
    Identity {
        key,
        chain: vec![cert.clone()],
        cert,
    }
}

/// Leaf on the signer key issued by `root` from `builder`.
pub fn issue_signer(root: &Identity, builder: &CertBuilder) -> Identity {
    let key = key(SIGNER_KEY_PEM);
    let cert = builder.issue(&key, Some((&root.cert, &root.key)));
    Identity {
        key,
        chain: vec![cert.clone(), root.cert.clone()],
        cert,
    }
}

/// Valid signing leaf issued by `root`.
pub fn signer(root: &Identity) -> Identity {
    issue_signer(root, &CertBuilder::new("CN=Test Signer,O=Sigcheck Tests"))
}

/// Self-signed leaf on the other key.
pub fn self_signed_signer() -> Identity {
    let key = key(OTHER_KEY_PEM);
    let cert = CertBuilder::new("CN=Lone Signer").issue(&key, None);
    Identity {
        key,
        chain: vec![cert.clone()],
        cert,
    }
}

/// How a CMS container is built.
#[derive(Debug, Clone)]
pub struct CmsOptions {
    pub signing_time: Option<DateTime<Utc>>,
    pub timestamp: bool,
    pub embed_chain: bool,
    /// Encapsulate SHA-1 of the content, as adbe.pkcs7.sha1 does
    pub sha1_content: bool,
    /// Encapsulate the content itself
    pub attached_content: bool,
    /// Ship a CRL in the SignedData
    pub crl: bool,
    /// Archive an OCSP response in the signed attributes
    pub ocsp: bool,
}

impl Default for CmsOptions {
    fn default() -> Self {
        Self {
            signing_time: Some(Utc::now()),
            timestamp: true,
            embed_chain: true,
            sha1_content: false,
            attached_content: false,
            crl: false,
            ocsp: false,
        }
    }
}

fn attribute(id: &str, value_der: &[u8]) -> Attribute {
    Attribute {
        oid: oid(id),
        values: SetOfVec::try_from(vec![Any::from_der(value_der).unwrap()]).unwrap(),
    }
}

/// DER ContentInfo holding a SignedData over `content`.
pub fn build_cms(identity: &Identity, content: &[u8], options: &CmsOptions) -> Vec<u8> {
    let (econtent, signed_content) = if options.sha1_content {
        let inner = sha1::Sha1::digest(content).to_vec();
        let octets = OctetString::new(inner.clone()).unwrap().to_der().unwrap();
        (Some(Any::from_der(&octets).unwrap()), inner)
    } else if options.attached_content {
        let octets = OctetString::new(content.to_vec()).unwrap().to_der().unwrap();
        (Some(Any::from_der(&octets).unwrap()), content.to_vec())
    } else {
        (None, content.to_vec())
    };

    let digest = Sha256::digest(&signed_content).to_vec();
    let mut attributes = vec![
        attribute(OID_CONTENT_TYPE, &oid(OID_DATA).to_der().unwrap()),
        attribute(OID_MESSAGE_DIGEST, &OctetString::new(digest).unwrap().to_der().unwrap()),
    ];
    if let Some(at) = options.signing_time {
        attributes.push(attribute(OID_SIGNING_TIME, &utc_time(at).to_der().unwrap()));
    }
    if options.ocsp {
        attributes.push(attribute(OID_ADBE_REVOCATION_ARCHIVAL, ARCHIVED_OCSP));
    }
    let signed_attrs = SetOfVec::try_from(attributes).unwrap();
    let signature = SigningKey::<Sha256>::new(identity.key.clone()).sign(&signed_attrs.to_der().unwrap());

    let unsigned_attrs = if options.timestamp {
        Some(SetOfVec::try_from(vec![attribute(OID_TIMESTAMP_TOKEN, &[0x05, 0x00])]).unwrap())
    } else {
        None
    };

    let signer_info = SignerInfo {
        version: CmsVersion::V1,
        sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: identity.cert.tbs_certificate.issuer.clone(),
            serial_number: identity.cert.tbs_certificate.serial_number.clone(),
        }),
        digest_alg: algorithm(OID_SHA256),
        signed_attrs: Some(signed_attrs),
        signature_algorithm: algorithm(OID_RSA_ENCRYPTION),
        signature: OctetString::new(signature.to_vec()).unwrap(),
        unsigned_attrs,
    };

    let embedded: Vec<CertificateChoices> = if options.embed_chain {
        identity.chain.iter().cloned().map(CertificateChoices::Certificate).collect()
    } else {
        vec![CertificateChoices::Certificate(identity.cert.clone())]
    };

    let signed_data = SignedData {
        version: CmsVersion::V1,
        digest_algorithms: SetOfVec::try_from(vec![algorithm(OID_SHA256)]).unwrap(),
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: oid(OID_DATA),
            econtent,
        },
        certificates: Some(CertificateSet(SetOfVec::try_from(embedded).unwrap())),
        crls: options
            .crl
            .then(|| RevocationInfoChoices(SetOfVec::try_from(vec![RevocationInfoChoice::Crl(empty_crl(identity))]).unwrap())),
        signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info]).unwrap()),
    };

    ContentInfo {
        content_type: oid(OID_SIGNED_DATA),
        content: Any::from_der(&signed_data.to_der().unwrap()).unwrap(),
    }
    .to_der()
    .unwrap()
}

/// A CRL from the signer's issuer revoking nothing.
fn empty_crl(identity: &Identity) -> CertificateList {
    let tbs_cert_list = TbsCertList {
        version: Version::V2,
        signature: algorithm(OID_SHA256_WITH_RSA),
        issuer: identity.cert.tbs_certificate.issuer.clone(),
        this_update: utc_time(Utc::now()),
        next_update: None,
        revoked_certificates: None,
        crl_extensions: None,
    };
    let signature = SigningKey::<Sha256>::new(identity.key.clone()).sign(&tbs_cert_list.to_der().unwrap());
    CertificateList {
        tbs_cert_list,
        signature_algorithm: algorithm(OID_SHA256_WITH_RSA),
        signature: BitString::from_bytes(&signature.to_vec()).unwrap(),
    }
}

/// What to put in a signature field.
#[derive(Debug, Clone)]
pub struct SignatureSpec<'a> {
    pub name: &'a str,
    pub identity: &'a Identity,
    pub cms: CmsOptions,
    pub sub_filter: &'a str,
    /// DocMDP `/P` for a certification signature
    pub docmdp: Option<i64>,
    /// `/M` in the signature dictionary
    pub modification_date: Option<DateTime<Utc>>,
    /// Write a three-element `/ByteRange` and no container
    pub malformed_byte_range: bool,
    /// Write bytes that are not CMS into `/Contents`
    pub garbage_contents: bool,
}

impl<'a> SignatureSpec<'a> {
    pub fn new(name: &'a str, identity: &'a Identity) -> Self {
        Self {
            name,
            identity,
            cms: CmsOptions::default(),
            sub_filter: "adbe.pkcs7.detached",
            docmdp: None,
            modification_date: Some(Utc::now()),
            malformed_byte_range: false,
            garbage_contents: false,
        }
    }

    /// No signing time anywhere in the signature.
    pub fn without_signing_time(mut self) -> Self {
        self.cms.signing_time = None;
        self.modification_date = None;
        self
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

fn pdf_date(at: DateTime<Utc>) -> String {
    at.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> usize {
    from + haystack[from..].windows(needle.len()).position(|w| w == needle).unwrap()
}

/// Writes a one-page PDF and appends incremental updates to it.
///
/// Object 1 is the catalog, 4 the AcroForm; each signature adds a field and
/// a signature dictionary in its own save.
#[derive(Debug, Clone)]
pub struct PdfBuilder {
    data: Vec<u8>,
    last_xref: usize,
    next_object: u32,
    fields: Vec<u32>,
    base_pending: bool,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    /// First save: catalog, pages, one page and an empty form.
    pub fn new() -> Self {
        let mut builder = Self::unsaved();
        builder.save(&[]);
        builder
    }

    /// No save yet: the first `sign` or update also writes the catalog, pages
    /// and form, so the first signature lands in revision 1.
    pub fn unsaved() -> Self {
        Self {
            data: b"%PDF-1.7\n".to_vec(),
            last_xref: 0,
            next_object: 5,
            fields: Vec::new(),
            base_pending: true,
        }
    }

    fn fields_dict(&self) -> String {
        let refs: Vec<String> = self.fields.iter().map(|n| format!("{} 0 R", n)).collect();
        format!("<< /Fields [{}] /SigFlags 3 >>", refs.join(" "))
    }

    /// Append objects, an xref section, the trailer and `%%EOF`. Returns
    /// the offsets of `objects`.
    fn save(&mut self, objects: &[(u32, String)]) -> Vec<usize> {
        let first = self.last_xref == 0;
        let mut objects = objects.to_vec();
        let mut skip = 0;
        if std::mem::take(&mut self.base_pending) {
            let mut base = vec![
                (1, "<< /Type /Catalog /Pages 2 0 R /AcroForm 4 0 R >>".to_string()),
                (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string()),
                (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string()),
            ];
            if !objects.iter().any(|(num, _)| *num == 4) {
                base.push((4, self.fields_dict()));
            }
            skip = base.len();
            base.extend(objects);
            objects = base;
        }

        let mut offsets = Vec::new();
        for (num, body) in &objects {
            offsets.push(self.data.len());
            self.data.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", num, body).as_bytes());
        }

        let xref = self.data.len();
        let mut table = String::from("xref\n");
        if first {
            table.push_str("0 1\n0000000000 65535 f \n");
        }
        for ((num, _), offset) in objects.iter().zip(&offsets) {
            table.push_str(&format!("{} 1\n{:010} 00000 n \n", num, offset));
        }
        let prev = if first {
            String::new()
        } else {
            format!(" /Prev {}", self.last_xref)
        };
        table.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R{} >>\nstartxref\n{}\n%%EOF\n",
            self.next_object, prev, xref
        ));
        self.data.extend_from_slice(table.as_bytes());
        self.last_xref = xref;
        offsets.split_off(skip)
    }

    /// Append an unsigned signature field.
    pub fn unsigned_field(mut self, name: &str) -> Self {
        let field = self.next_object;
        self.next_object += 1;
        self.fields.push(field);
        let objects = vec![
            (
                field,
                format!("<< /FT /Sig /T ({}) /Type /Annot /Subtype /Widget /Rect [0 0 0 0] /P 3 0 R >>", name),
            ),
            (4, self.fields_dict()),
        ];
        self.save(&objects);
        self
    }

    /// Append a save with a new info dictionary and no signature.
    pub fn unsigned_update(mut self) -> Self {
        let info = self.next_object;
        self.next_object += 1;
        self.save(&[(info, "<< /Producer (Later Edit) >>".to_string())]);
        self
    }

    /// Append a save holding a signed field for `spec`.
    pub fn sign(mut self, spec: &SignatureSpec<'_>) -> Self {
        let field = self.next_object;
        let sig = field + 1;
        self.next_object += 2;
        self.fields.push(field);

        let mut dict = format!(
            "<< /Type /Sig /Filter /Adobe.PPKLite /SubFilter /{} /Name (Test Signer) /Reason (Approval) /Location (Lab {})",
            spec.sub_filter, spec.name
        );
        if let Some(at) = spec.modification_date {
            dict.push_str(&format!(" /M ({})", pdf_date(at)));
        }
        if let Some(p) = spec.docmdp {
            dict.push_str(&format!(
                " /Reference [<< /Type /SigRef /TransformMethod /DocMDP /TransformParams << /Type /TransformParams /P {} >> >>]",
                p
            ));
        }
        if spec.malformed_byte_range {
            dict.push_str(" /ByteRange [0 10 20]");
        } else {
            dict.push_str(" /ByteRange [0 0000000000 0000000000 0000000000]");
        }
        dict.push_str(&format!(" /Contents <{}> >>", "0".repeat(CONTENTS_SIZE * 2)));

        let objects = vec![
            (
                field,
                format!(
                    "<< /FT /Sig /T ({}) /Type /Annot /Subtype /Widget /Rect [0 0 0 0] /F 132 /P 3 0 R /V {} 0 R >>",
                    spec.name, sig
                ),
            ),
            (4, self.fields_dict()),
            (sig, dict),
        ];
        let offsets = self.save(&objects);
        if spec.malformed_byte_range {
            return self;
        }

        let sig_start = offsets[2];
        let contents_start = find(&self.data, b"/Contents <", sig_start) + b"/Contents ".len();
        let contents_end = find(&self.data, b">", contents_start) + 1;
        let range = format!(
            "[0 {:010} {:010} {:010}]",
            contents_start,
            contents_end,
            self.data.len() - contents_end
        );
        let range_start = find(&self.data, b"/ByteRange [", sig_start) + b"/ByteRange ".len();
        self.data[range_start..range_start + range.len()].copy_from_slice(range.as_bytes());

        let container = if spec.garbage_contents {
            b"this is not a CMS container".to_vec()
        } else {
            let mut signed = self.data[..contents_start].to_vec();
            signed.extend_from_slice(&self.data[contents_end..]);
            build_cms(spec.identity, &signed, &spec.cms)
        };
        let encoded = hex(&container);
        assert!(encoded.len() <= CONTENTS_SIZE * 2, "signature container too large");
        self.data[contents_start + 1..contents_start + 1 + encoded.len()].copy_from_slice(encoded.as_bytes());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// One-signature document.
pub fn signed_pdf(identity: &Identity, name: &str) -> Vec<u8> {
    PdfBuilder::new().sign(&SignatureSpec::new(name, identity)).build()
}

/// Two signatures, each in its own save.
pub fn twice_signed_pdf(identity: &Identity) -> Vec<u8> {
    PdfBuilder::new()
        .sign(&SignatureSpec::new("Signature1", identity))
        .sign(&SignatureSpec::new("Signature2", identity))
        .build()
}

/// `count` signatures, the first one in the initial save.
pub fn signed_from_first_save(identity: &Identity, count: usize) -> Vec<u8> {
    let mut builder = PdfBuilder::unsaved();
    for i in 1..=count {
        builder = builder.sign(&SignatureSpec::new(&format!("Signature{}", i), identity));
    }
    builder.build()
}

/// Replace the first `from` with `to` (same length), keeping every offset.
pub fn patch(data: &mut [u8], from: &[u8], to: &[u8]) {
    assert_eq!(from.len(), to.len());
    let at = find(data, from, 0);
    data[at..at + to.len()].copy_from_slice(to);
}

/// Change the page in the first save.
pub fn tamper_first_revision(data: &mut [u8]) {
    patch(data, b"612 792", b"613 792");
}

/// PEM bundle: the signer key followed by its chain.
pub fn keystore_bundle(key_pem: &str, chain: &[&X509Certificate]) -> String {
    let mut out = key_pem.to_string();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    for cert in chain {
        out.push_str(&cert.to_pem(LineEnding::LF).unwrap());
    }
    out
}

/// Write `contents` to a temporary file kept alive by the returned handle.
pub fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}
