//! The certificate authority that signs identity certificates.

use std::fmt;
use std::sync::Arc;

use der::flagset::FlagSet;
use rand::RngCore;
use time::Duration;
use tracing::{debug, info};

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages,
    SubjectAltName, SubjectKeyIdentifier,
};
use crate::cert::params::{CertificateRequest, DistinguishedName, ExtensionParam, Validity};
use crate::cert::{
    CERTIFICATE_PEM_LABEL, ParsedCertificate, encode_certificate_pem, parse_certificate_der,
    parse_certificate_pem,
};
use crate::clock::Clock;
use crate::error::{Result, TlsCaError};
use crate::key::{CertSigner, KeyPair, parse_private_key_pem};
use crate::tbs_certificate::{TbsCertificate, random_serial_number};

/// A certificate chain and the private key of its leaf.
#[derive(Debug, Clone)]
pub struct TlsCertificate {
    /// DER certificates, leaf first.
    pub certificate_chain: Vec<Vec<u8>>,
    pub private_key: KeyPair,
}

impl TlsCertificate {
    /// Loads every `CERTIFICATE` block of `cert_pem`, in order, and the first
    /// private key of `key_pem`.
    ///
    /// # Errors
    ///
    /// Returns [`TlsCaError::KeyFormatError`] when either input is malformed
    /// or holds no certificate or key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let blocks =
            pem::parse_many(cert_pem).map_err(|e| TlsCaError::KeyFormatError(e.to_string()))?;
        let certificate_chain: Vec<Vec<u8>> = blocks
            .into_iter()
            .filter(|block| block.tag() == CERTIFICATE_PEM_LABEL)
            .map(pem::Pem::into_contents)
            .collect();
        if certificate_chain.is_empty() {
            return Err(TlsCaError::KeyFormatError(
                "no CERTIFICATE block found".to_string(),
            ));
        }

        Ok(Self {
            certificate_chain,
            private_key: parse_private_key_pem(key_pem)?,
        })
    }
}

/// Signs certificates that carry an [`Identity`](crate::identity::Identity) in their subject.
///
/// An authority never changes after construction and can be shared between
/// threads behind an `Arc` or by cloning.
#[derive(Clone)]
pub struct CertAuthority {
    cert: ParsedCertificate,
    signer: Arc<dyn CertSigner>,
}

impl fmt::Debug for CertAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertAuthority")
            .field("subject", &self.cert.subject.to_string())
            .field("not_after", &self.cert.not_after)
            .finish_non_exhaustive()
    }
}

impl CertAuthority {
    /// Creates an authority from a PEM certificate and a PEM private key.
    ///
    /// # Errors
    ///
    /// Returns [`TlsCaError::KeyFormatError`] when either input cannot be
    /// parsed, the key type is unsupported, or the key does not belong to
    /// the certificate.
    pub fn from_keys(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let key = parse_private_key_pem(key_pem)?;
        Self::from_cert_and_signer(cert_pem, key)
    }

    /// Creates an authority from a PEM certificate and an already loaded signer.
    pub fn from_cert_and_signer(
        cert_pem: &[u8],
        signer: impl CertSigner + 'static,
    ) -> Result<Self> {
        let cert = parse_certificate_pem(cert_pem).map_err(TlsCaError::into_key_format)?;
        Self::new(cert, Arc::new(signer))
    }

    /// Creates an authority from a loaded chain. The leaf is the CA certificate.
    pub fn from_tls_certificate(tls_certificate: TlsCertificate) -> Result<Self> {
        let leaf = tls_certificate
            .certificate_chain
            .first()
            .ok_or_else(|| TlsCaError::KeyFormatError("certificate chain is empty".to_string()))?;
        let cert = parse_certificate_der(leaf).map_err(TlsCaError::into_key_format)?;
        Self::new(cert, Arc::new(tls_certificate.private_key))
    }

    fn new(cert: ParsedCertificate, signer: Arc<dyn CertSigner>) -> Result<Self> {
        let public_key = signer.public_key_info().map_err(TlsCaError::into_key_format)?;
        if public_key != cert.public_key {
            return Err(TlsCaError::KeyFormatError(
                "private key does not match the CA certificate public key".to_string(),
            ));
        }

        info!(
            subject = %cert.subject,
            algorithm = %signer.signature_algorithm().oid,
            "loaded certificate authority"
        );
        Ok(Self { cert, signer })
    }

    /// The CA certificate.
    pub fn certificate(&self) -> &ParsedCertificate {
        &self.cert
    }

    /// Issues a certificate and returns it PEM encoded.
    ///
    /// The serial number comes from the thread-local random generator.
    ///
    /// # Errors
    ///
    /// * [`TlsCaError::SigningError`] when `not_after` is not after the
    ///   request clock's current time, or the signer fails.
    /// * [`TlsCaError::ValidationError`] when a DNS name is not ASCII.
    pub fn generate_certificate(&self, request: &CertificateRequest) -> Result<Vec<u8>> {
        self.generate_certificate_with_rng(request, &mut rand::rng())
    }

    /// Same as [`generate_certificate`](Self::generate_certificate), with the
    /// serial number drawn from `rng`.
    pub fn generate_certificate_with_rng<R: RngCore + ?Sized>(
        &self,
        request: &CertificateRequest,
        rng: &mut R,
    ) -> Result<Vec<u8>> {
        let validity = Validity::starting_at(request.clock.now(), request.not_after)?;

        let authority_key_id = match self.cert.subject_key_identifier()? {
            Some(key_identifier) => key_identifier,
            None => SubjectKeyIdentifier::from_public_key(&self.cert.public_key).0,
        };

        let mut extensions = vec![
            ExtensionParam::from_extension(
                &BasicConstraints {
                    is_ca: false,
                    max_path_length: None,
                },
                true,
            )?,
            ExtensionParam::from_extension(&subject_key_usage(request), true)?,
        ];
        if !request.usages.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                &ExtendedKeyUsage {
                    usage: request.usages.clone(),
                },
                false,
            )?);
        }
        extensions.push(ExtensionParam::from_extension(
            &AuthorityKeyIdentifier {
                key_identifier: authority_key_id,
            },
            false,
        )?);
        let san = SubjectAltName::from_names(&request.dns_names);
        if !san.is_empty() {
            extensions.push(ExtensionParam::from_extension(&san, false)?);
        }

        let tbs = TbsCertificate {
            serial_number: random_serial_number(rng),
            signature_algorithm: self.signer.signature_algorithm(),
            issuer: self.cert.subject.clone(),
            validity,
            subject: request.subject.clone(),
            subject_public_key_info: request.public_key.clone(),
            extensions,
        };

        let certificate = tbs.sign(self.signer.as_ref())?;
        debug!(
            serial = %certificate.tbs_certificate.serial_number,
            subject = %tbs.subject,
            not_before = %validity.not_before,
            not_after = %validity.not_after,
            "issued certificate"
        );
        encode_certificate_pem(&certificate)
    }
}

/// Creates a self-signed CA certificate for `signer`, valid for `ttl` from `clock`'s now.
///
/// The certificate carries `CA:TRUE`, a key usage allowing certificate and
/// CRL signing, and a subject key identifier. Load it together with the
/// signer's key through [`CertAuthority::from_keys`] or
/// [`CertAuthority::from_cert_and_signer`].
pub fn generate_self_signed_ca(
    signer: &dyn CertSigner,
    subject: &DistinguishedName,
    ttl: Duration,
    clock: &dyn Clock,
) -> Result<Vec<u8>> {
    let now = clock.now();
    let validity = Validity::starting_at(now, now + ttl)?;
    let public_key = signer.public_key_info()?;
    let name = subject.as_x509_name()?;

    let key_usage: FlagSet<KeyUsages> =
        KeyUsages::KeyCertSign | KeyUsages::CRLSign | KeyUsages::DigitalSignature;
    let extensions = vec![
        ExtensionParam::from_extension(
            &BasicConstraints {
                is_ca: true,
                max_path_length: None,
            },
            true,
        )?,
        ExtensionParam::from_extension(&KeyUsage(key_usage), true)?,
        ExtensionParam::from_extension(&SubjectKeyIdentifier::from_public_key(&public_key), false)?,
    ];

    let tbs = TbsCertificate {
        serial_number: random_serial_number(&mut rand::rng()),
        signature_algorithm: signer.signature_algorithm(),
        issuer: name.clone(),
        validity,
        subject: name,
        subject_public_key_info: public_key,
        extensions,
    };

    let certificate = tbs.sign(signer)?;
    info!(subject = %tbs.subject, not_after = %validity.not_after, "created self-signed CA");
    encode_certificate_pem(&certificate)
}

/// Key encipherment only applies to RSA subject keys.
fn subject_key_usage(request: &CertificateRequest) -> KeyUsage {
    if request.public_key.algorithm.oid == const_oid::db::rfc5912::RSA_ENCRYPTION {
        KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
    } else {
        KeyUsage(KeyUsages::DigitalSignature.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::ToAndFromX509Extension;
    use crate::cert::find_extension;
    use crate::clock::FakeClock;
    use x509_cert::name::Name;

    const EC_CA_CERT: &[u8] = include_bytes!("../tests/fixtures/ec_ca_cert.pem");
    const EC_CA_KEY: &[u8] = include_bytes!("../tests/fixtures/ec_ca_key.pem");

    fn request(clock: Arc<FakeClock>, dns_names: Vec<String>) -> CertificateRequest {
        let key = KeyPair::generate_ecdsa_p256();
        CertificateRequest::builder()
            .clock(clock.clone())
            .public_key(key.public_key_info().unwrap())
            .subject(Name::default())
            .not_after(clock.now() + Duration::hours(1))
            .dns_names(dns_names)
            .build()
    }

    #[test]
    fn test_issued_certificate_profile() {
        let ca = CertAuthority::from_keys(EC_CA_CERT, EC_CA_KEY).unwrap();
        let clock = Arc::new(FakeClock::new());
        let pem = ca
            .generate_certificate(&request(clock.clone(), vec!["localhost".to_string()]))
            .unwrap();
        let parsed = parse_certificate_pem(&pem).unwrap();

        assert_eq!(parsed.issuer, ca.certificate().subject);
        assert_eq!(parsed.not_before, clock.now());
        assert_eq!(parsed.not_after, clock.now() + Duration::hours(1));
        assert_eq!(parsed.serial_number.len(), 16);

        let bc = find_extension::<BasicConstraints>(&parsed.inner).unwrap().unwrap();
        assert!(!bc.is_ca);
        let ku = find_extension::<KeyUsage>(&parsed.inner).unwrap().unwrap();
        assert_eq!(ku, KeyUsage(KeyUsages::DigitalSignature.into()));
        let aki = find_extension::<AuthorityKeyIdentifier>(&parsed.inner).unwrap().unwrap();
        assert_eq!(
            Some(aki.key_identifier),
            ca.certificate().subject_key_identifier().unwrap()
        );
        let eku = find_extension::<ExtendedKeyUsage>(&parsed.inner).unwrap().unwrap();
        assert_eq!(eku.usage.len(), 2);

        let critical: Vec<_> = parsed
            .inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .filter(|ext| ext.critical)
            .map(|ext| ext.extn_id)
            .collect();
        assert_eq!(critical, vec![BasicConstraints::OID, KeyUsage::OID]);
    }

    #[test]
    fn test_key_encipherment_only_for_rsa_subjects() {
        let ca = CertAuthority::from_keys(EC_CA_CERT, EC_CA_KEY).unwrap();
        let clock = Arc::new(FakeClock::new());
        let rsa_key = KeyPair::generate_rsa(2048).unwrap();
        let ed_key = KeyPair::generate_ed25519();

        let usage_for = |key: &KeyPair| {
            let request = CertificateRequest::builder()
                .clock(clock.clone())
                .public_key(key.public_key_info().unwrap())
                .subject(Name::default())
                .not_after(clock.now() + Duration::hours(1))
                .build();
            let parsed = parse_certificate_pem(&ca.generate_certificate(&request).unwrap()).unwrap();
            find_extension::<KeyUsage>(&parsed.inner).unwrap().unwrap()
        };

        assert_eq!(
            usage_for(&rsa_key),
            KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
        );
        assert_eq!(usage_for(&ed_key), KeyUsage(KeyUsages::DigitalSignature.into()));
    }

    #[test]
    fn test_no_san_extension_without_names() {
        let ca = CertAuthority::from_keys(EC_CA_CERT, EC_CA_KEY).unwrap();
        let pem = ca
            .generate_certificate(&request(Arc::new(FakeClock::new()), Vec::new()))
            .unwrap();
        let parsed = parse_certificate_pem(&pem).unwrap();
        assert!(find_extension::<SubjectAltName>(&parsed.inner).unwrap().is_none());
    }

    #[test]
    fn test_expired_request_is_signing_error() {
        let ca = CertAuthority::from_keys(EC_CA_CERT, EC_CA_KEY).unwrap();
        let clock = Arc::new(FakeClock::new());
        let mut req = request(clock.clone(), Vec::new());
        req.not_after = clock.now();
        assert!(matches!(
            ca.generate_certificate(&req),
            Err(TlsCaError::SigningError(_))
        ));
    }

    #[test]
    fn test_non_ascii_dns_name_is_validation_error() {
        let ca = CertAuthority::from_keys(EC_CA_CERT, EC_CA_KEY).unwrap();
        let req = request(Arc::new(FakeClock::new()), vec!["bücher.example".to_string()]);
        assert!(matches!(
            ca.generate_certificate(&req),
            Err(TlsCaError::ValidationError(_))
        ));
    }

    #[test]
    fn test_self_signed_ca_round_trip() {
        let key = KeyPair::generate_ecdsa_p384();
        let clock = FakeClock::new();
        let dn = DistinguishedName::builder()
            .common_name("Example Root".to_string())
            .organization("example.com".to_string())
            .build();
        let ca_pem = generate_self_signed_ca(&key, &dn, Duration::days(365), &clock).unwrap();

        let parsed = parse_certificate_pem(&ca_pem).unwrap();
        assert_eq!(parsed.subject, parsed.issuer);
        assert_eq!(parsed.not_before, clock.now());
        let bc = find_extension::<BasicConstraints>(&parsed.inner).unwrap().unwrap();
        assert!(bc.is_ca);
        assert_eq!(
            parsed.subject_key_identifier().unwrap(),
            Some(SubjectKeyIdentifier::from_public_key(&parsed.public_key).0)
        );

        let ca = CertAuthority::from_cert_and_signer(&ca_pem, key).unwrap();
        assert_eq!(ca.certificate().subject, parsed.subject);
    }

    #[test]
    fn test_empty_chain_is_key_format_error() {
        let tls = TlsCertificate {
            certificate_chain: Vec::new(),
            private_key: KeyPair::generate_ed25519(),
        };
        assert!(matches!(
            CertAuthority::from_tls_certificate(tls),
            Err(TlsCaError::KeyFormatError(_))
        ));
    }

    #[test]
    fn test_tls_certificate_requires_certificate_block() {
        assert!(matches!(
            TlsCertificate::from_pem(EC_CA_KEY, EC_CA_KEY),
            Err(TlsCaError::KeyFormatError(_))
        ));
    }

    #[test]
    fn test_authority_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CertAuthority>();
    }
}
