#![allow(dead_code)]

use std::sync::Arc;

use time::Duration;
use tlsca::authority::{CertAuthority, TlsCertificate};
use tlsca::cert::params::CertificateRequest;
use tlsca::clock::{Clock, FakeClock};
use tlsca::identity::Identity;
use tlsca::key::{CertSigner, KeyPair, parse_private_key_pem};

pub const EC_CA_CERT: &[u8] = include_bytes!("fixtures/ec_ca_cert.pem");
pub const EC_CA_KEY: &[u8] = include_bytes!("fixtures/ec_ca_key.pem");
pub const EC_CA_KEY_PKCS8: &[u8] = include_bytes!("fixtures/ec_ca_key_pkcs8.pem");
pub const RSA_CA_CERT: &[u8] = include_bytes!("fixtures/rsa_ca_cert.pem");
pub const RSA_CA_KEY: &[u8] = include_bytes!("fixtures/rsa_ca_key.pem");
pub const ED25519_CA_CERT: &[u8] = include_bytes!("fixtures/ed25519_ca_cert.pem");
pub const ED25519_CA_KEY: &[u8] = include_bytes!("fixtures/ed25519_ca_key.pem");
pub const OTHER_EC_KEY: &[u8] = include_bytes!("fixtures/other_ec_key.pem");

/// The same CA loaded through each of the three constructors.
pub fn authorities(cert_pem: &[u8], key_pem: &[u8]) -> Vec<(&'static str, CertAuthority)> {
    vec![
        (
            "from_keys",
            CertAuthority::from_keys(cert_pem, key_pem).unwrap(),
        ),
        (
            "from_cert_and_signer",
            CertAuthority::from_cert_and_signer(cert_pem, parse_private_key_pem(key_pem).unwrap())
                .unwrap(),
        ),
        (
            "from_tls_certificate",
            CertAuthority::from_tls_certificate(TlsCertificate::from_pem(cert_pem, key_pem).unwrap())
                .unwrap(),
        ),
    ]
}

pub fn ec_authority() -> CertAuthority {
    CertAuthority::from_keys(EC_CA_CERT, EC_CA_KEY).unwrap()
}

pub fn fake_clock() -> Arc<FakeClock> {
    Arc::new(FakeClock::new())
}

/// A request for `identity` expiring one hour after `clock`'s now.
pub fn request_for(
    identity: &Identity,
    clock: Arc<FakeClock>,
    dns_names: Vec<String>,
) -> (CertificateRequest, KeyPair) {
    let key = KeyPair::generate_ecdsa_p256();
    let not_after = clock.now() + Duration::hours(1);
    let request = CertificateRequest::builder()
        .clock(clock)
        .public_key(key.public_key_info().unwrap())
        .subject(identity.subject().unwrap())
        .not_after(not_after)
        .dns_names(dns_names)
        .build();
    (request, key)
}
