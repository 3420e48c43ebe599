//! Certificate parsing and encoding.
//!
//! Certificates travel as PEM `CERTIFICATE` blocks. [`ParsedCertificate`]
//! exposes the fields the authority and its callers read most often, next
//! to the full decoded structure.

pub mod extensions;
pub mod params;

use std::net::IpAddr;

use der::asn1::{GeneralizedTime, UtcTime};
use der::{Decode, Encode, EncodePem};
use time::OffsetDateTime;
use x509_cert::Certificate;
use x509_cert::name::Name;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::Time;

use crate::error::{Result, TlsCaError};
use crate::identity::Identity;
use extensions::{SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension};

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_PEM_LABEL: &str = "CERTIFICATE";

/// First year written as `GeneralizedTime` instead of `UTCTime` (RFC 5280 4.1.2.5).
const GENERALIZED_TIME_CUTOFF_YEAR: i32 = 2050;

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRsa,
    /// ECDSA over P-256 with SHA-256.
    EcdsaWithSha256,
    /// ECDSA over P-384 with SHA-384.
    EcdsaWithSha384,
    /// Ed25519.
    Ed25519,
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            // RFC 4055 requires explicit NULL parameters for PKCS#1 v1.5.
            SignatureAlgorithm::Sha256WithRsa => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(der::asn1::Any::null()),
            },
            SignatureAlgorithm::EcdsaWithSha256 => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            SignatureAlgorithm::EcdsaWithSha384 => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
            SignatureAlgorithm::Ed25519 => AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc8410::ID_ED_25519,
                parameters: None,
            },
        }
    }
}

/// A decoded certificate with its commonly used fields pulled out.
#[derive(Debug, Clone)]
pub struct ParsedCertificate {
    /// The full decoded certificate.
    pub inner: Certificate,
    pub subject: Name,
    pub issuer: Name,
    /// Big-endian serial number with leading zeros stripped.
    pub serial_number: Vec<u8>,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    /// DNS names from the subject alternative name extension, in order.
    pub dns_names: Vec<String>,
    /// IP addresses from the subject alternative name extension, in order.
    pub ip_addresses: Vec<IpAddr>,
    pub public_key: SubjectPublicKeyInfoOwned,
}

impl ParsedCertificate {
    /// Pulls the commonly used fields out of a decoded certificate.
    pub fn from_certificate(inner: Certificate) -> Result<Self> {
        let tbs = &inner.tbs_certificate;
        let san = find_extension::<SubjectAltName>(&inner)?.unwrap_or_default();

        Ok(Self {
            subject: tbs.subject.clone(),
            issuer: tbs.issuer.clone(),
            serial_number: tbs.serial_number.as_bytes().to_vec(),
            not_before: from_x509_time(&tbs.validity.not_before)?,
            not_after: from_x509_time(&tbs.validity.not_after)?,
            dns_names: san.dns_names,
            ip_addresses: san.ip_addresses,
            public_key: tbs.subject_public_key_info.clone(),
            inner,
        })
    }

    /// DER encoding of the subject public key info.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        self.public_key
            .to_der()
            .map_err(|e| TlsCaError::EncodingError(e.to_string()))
    }

    /// DER encoding of the whole certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| TlsCaError::EncodingError(e.to_string()))
    }

    /// PEM encoding of the whole certificate.
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        encode_certificate_pem(&self.inner)
    }

    /// Decodes the identity carried in the subject. It expires at `notAfter`.
    pub fn identity(&self) -> Result<Identity> {
        Identity::from_subject(&self.subject, self.not_after)
    }

    /// The subject key identifier extension value, if the certificate has one.
    pub fn subject_key_identifier(&self) -> Result<Option<Vec<u8>>> {
        Ok(find_extension::<SubjectKeyIdentifier>(&self.inner)?.map(|ski| ski.0))
    }
}

/// Parses the first `CERTIFICATE` block in `pem_bytes`.
///
/// # Errors
///
/// Returns [`TlsCaError::DecodeError`] when the input is not PEM, holds no
/// certificate block, or the block is not a valid certificate.
pub fn parse_certificate_pem(pem_bytes: &[u8]) -> Result<ParsedCertificate> {
    let blocks = pem::parse_many(pem_bytes)?;
    let block = blocks
        .iter()
        .find(|block| block.tag() == CERTIFICATE_PEM_LABEL)
        .ok_or_else(|| TlsCaError::DecodeError("no CERTIFICATE block found".to_string()))?;
    parse_certificate_der(block.contents())
}

/// Parses a DER-encoded certificate.
pub fn parse_certificate_der(der_bytes: &[u8]) -> Result<ParsedCertificate> {
    ParsedCertificate::from_certificate(Certificate::from_der(der_bytes)?)
}

/// Encodes `certificate` as a PEM `CERTIFICATE` block with `LF` line endings.
pub fn encode_certificate_pem(certificate: &Certificate) -> Result<Vec<u8>> {
    certificate
        .to_pem(pkcs8::LineEnding::LF)
        .map(String::into_bytes)
        .map_err(|e| TlsCaError::EncodingError(e.to_string()))
}

/// Finds and decodes the extension `E`, if present.
pub(crate) fn find_extension<E: ToAndFromX509Extension>(
    certificate: &Certificate,
) -> Result<Option<E>> {
    certificate
        .tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|extension| extension.extn_id == E::OID)
        .map(|extension| E::from_x509_extension_value(extension.extn_value.as_bytes()))
        .transpose()
}

/// Converts an instant to the X.509 time encoding RFC 5280 asks for.
///
/// Sub-second precision is dropped.
pub(crate) fn to_x509_time(instant: OffsetDateTime) -> Result<Time> {
    let since_epoch = std::time::Duration::try_from(instant - OffsetDateTime::UNIX_EPOCH)
        .map_err(|_| TlsCaError::ValidationError(format!("{instant} is before 1970")))?;
    let encoding_error = |e: der::Error| TlsCaError::EncodingError(format!("{instant}: {e}"));

    if instant.year() < GENERALIZED_TIME_CUTOFF_YEAR {
        UtcTime::from_unix_duration(since_epoch)
            .map(Time::UtcTime)
            .map_err(encoding_error)
    } else {
        GeneralizedTime::from_unix_duration(since_epoch)
            .map(Time::GeneralTime)
            .map_err(encoding_error)
    }
}

pub(crate) fn from_x509_time(time: &Time) -> Result<OffsetDateTime> {
    let seconds = i64::try_from(time.to_unix_duration().as_secs())
        .map_err(|e| TlsCaError::DecodeError(e.to_string()))?;
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| TlsCaError::DecodeError(e.to_string()))
}
